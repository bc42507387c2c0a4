use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
#[cfg(test)]
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::Result;
use crate::model::InvoiceData;

pub const DRAFT_FILE: &str = "draft.json";

/// Key-value persistence for the single working draft.
pub trait InvoiceStore: Send {
    fn save(&self, data: &InvoiceData) -> Result<()>;
    /// Absent, unreadable and corrupt drafts all come back as `None`.
    fn load(&self) -> Option<InvoiceData>;
    fn clear(&self) -> Result<()>;
}

pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(root: &Path) -> Self {
        Self { path: root.join(DRAFT_FILE) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl InvoiceStore for FileStore {
    /// Writes a sibling temp file and renames it over the draft, so an
    /// interrupted save leaves the previous draft intact.
    fn save(&self, data: &InvoiceData) -> Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;
        let json = serde_json::to_string_pretty(data)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        debug!(path = %self.path.display(), invoice = %data.invoice_number, "draft saved");
        Ok(())
    }

    fn load(&self) -> Option<InvoiceData> {
        let content = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str::<InvoiceData>(&content) {
            Ok(mut data) => {
                data.recompute();
                Some(data)
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unreadable draft");
                None
            }
        }
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process store. Clones share the same slot.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Option<InvoiceData>>>,
    saves: Arc<Mutex<usize>>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
impl InvoiceStore for MemoryStore {
    fn save(&self, data: &InvoiceData) -> Result<()> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(data.clone());
        *self.saves.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(())
    }

    fn load(&self) -> Option<InvoiceData> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn clear(&self) -> Result<()> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}
