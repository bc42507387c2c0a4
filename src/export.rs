use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use slug::slugify;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tera::Tera;
use tracing::{debug, info};

use crate::error::{InvoiceError, Result};
use crate::model::InvoiceData;
use crate::preview::{self, PreviewContext};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Paper {
    #[default]
    UsLetter,
    A4,
}

impl Paper {
    /// Name understood by Typst's `page(paper: ..)`.
    pub fn typst_name(&self) -> &'static str {
        match self {
            Paper::UsLetter => "us-letter",
            Paper::A4 => "a4",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ExportOptions {
    pub paper: Paper,
    pub orientation: Orientation,
    pub margin_in: f64,
    /// Raster fidelity for image snapshots, as a multiple of 96 ppi.
    pub image_scale: u32,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { paper: Paper::UsLetter, orientation: Orientation::Portrait, margin_in: 0.5, image_scale: 2 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Pdf,
    Png,
}

/// File stem for the exported document, safe to use as a path component.
pub fn document_stem(data: &InvoiceData) -> String {
    data.document_name().replace(['/', '\\'], "-")
}

/// `output/<year>/<client>` under the data root.
pub fn output_dir(root: &Path, data: &InvoiceData) -> PathBuf {
    let client = slugify(data.client.display_name());
    let client = if client.is_empty() { "unassigned".to_string() } else { client };
    root.join("output").join(data.issue_date.format("%Y").to_string()).join(client)
}

pub fn compile_args(typ_path: &Path, out_path: &Path, format: ExportFormat, options: &ExportOptions) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["compile".into(), typ_path.into(), out_path.into()];
    if format == ExportFormat::Png {
        args.push("--format".into());
        args.push("png".into());
        args.push("--ppi".into());
        args.push((96 * options.image_scale.max(1)).to_string().into());
    }
    args
}

pub fn typst_available() -> bool {
    Command::new("typst").arg("--version").output().is_ok()
}

/// Render the preview and hand it to `typst`. The invoice itself is never modified.
pub fn export(
    tera: &Tera,
    data: &InvoiceData,
    options: &ExportOptions,
    out_dir: &Path,
    format: ExportFormat,
) -> Result<PathBuf> {
    if !typst_available() {
        return Err(InvoiceError::Export(
            "'typst' is not installed. Please install it (https://typst.app or `cargo install typst-cli`).".into(),
        ));
    }
    fs::create_dir_all(out_dir)?;

    let logo_name = match &data.logo {
        Some(logo) => copy_logo(Path::new(logo), out_dir)?,
        None => None,
    };

    let context = PreviewContext::build(data, options, logo_name);
    let rendered = preview::render_typst(tera, &context)?;

    let stem = document_stem(data);
    let typ_path = out_dir.join(format!("{}.typ", stem));
    fs::write(&typ_path, rendered)?;

    let (out_path, reported) = match format {
        ExportFormat::Pdf => {
            let pdf = out_dir.join(format!("{}.pdf", stem));
            (pdf.clone(), pdf)
        }
        ExportFormat::Png => (out_dir.join(format!("{}-{{p}}.png", stem)), out_dir.join(format!("{}-1.png", stem))),
    };

    let args = compile_args(&typ_path, &out_path, format, options);
    debug!(?args, "running typst");
    let output = Command::new("typst").args(&args).output()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(InvoiceError::Export(format!("typst compile failed: {}", stderr.trim())));
    }

    info!(path = %reported.display(), "document exported");
    Ok(reported)
}

fn copy_logo(logo: &Path, out_dir: &Path) -> Result<Option<String>> {
    if !logo.is_file() {
        tracing::warn!(path = %logo.display(), "logo not found, exporting without it");
        return Ok(None);
    }
    let ext = logo.extension().map(|e| e.to_string_lossy().to_lowercase()).unwrap_or_else(|| "png".into());
    let name = format!("logo.{}", ext);
    fs::copy(logo, out_dir.join(&name))?;
    Ok(Some(name))
}

// Helper: Open file and reveal in Finder/Explorer
pub fn open_and_reveal(path: &Path) {
    #[cfg(target_os = "macos")]
    Command::new("open").arg("-R").arg(path).spawn().ok();

    #[cfg(target_os = "windows")]
    Command::new("explorer").arg(format!("/select,{}", path.to_string_lossy())).spawn().ok();

    #[cfg(target_os = "linux")]
    Command::new("xdg-open").arg(path).spawn().ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn data() -> InvoiceData {
        InvoiceData::new("INV-202401-042", NaiveDate::from_ymd_opt(2024, 1, 20).unwrap())
    }

    #[test]
    fn test_document_stem() {
        assert_eq!(document_stem(&data()), "invoice-INV-202401-042");
        let odd = data().apply(crate::session::Edit::InvoiceNumber("2024/07".into()));
        assert_eq!(document_stem(&odd), "invoice-2024-07");
    }

    #[test]
    fn test_output_dir_groups_by_year_and_client() {
        let root = Path::new("/data");
        assert_eq!(output_dir(root, &data()), PathBuf::from("/data/output/2024/unassigned"));

        let mut d = data();
        d.client.company = "Client Company Inc".into();
        assert_eq!(output_dir(root, &d), PathBuf::from("/data/output/2024/client-company-inc"));
    }

    #[test]
    fn test_compile_args() {
        let options = ExportOptions::default();
        let pdf = compile_args(Path::new("a.typ"), Path::new("a.pdf"), ExportFormat::Pdf, &options);
        assert_eq!(pdf, vec![OsString::from("compile"), "a.typ".into(), "a.pdf".into()]);

        let png = compile_args(Path::new("a.typ"), Path::new("a-{p}.png"), ExportFormat::Png, &options);
        assert_eq!(&png[3..], &[OsString::from("--format"), "png".into(), "--ppi".into(), "192".into()]);
    }

    #[test]
    fn test_options_serialise_with_typst_names() {
        let options = ExportOptions { paper: Paper::A4, orientation: Orientation::Landscape, ..Default::default() };
        let toml_str = toml::to_string(&options).unwrap();
        assert!(toml_str.contains("paper = \"a4\""));
        assert!(toml_str.contains("orientation = \"landscape\""));
        assert_eq!(Paper::UsLetter.typst_name(), "us-letter");
    }
}
