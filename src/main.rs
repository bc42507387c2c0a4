mod autosave;
mod calc;
mod config;
mod error;
mod export;
mod form;
mod identity;
mod import;
mod line_items;
mod model;
mod preview;
mod session;
mod store;

use chrono::Local;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use inquire::{Confirm, Select, Text};
use std::fs;
use std::path::{Path, PathBuf};
use tera::Tera;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::autosave::Autosaver;
use crate::config::Settings;
use crate::error::Result;
use crate::export::{ExportFormat, ExportOptions, Orientation, Paper};
use crate::form::MenuAction;
use crate::identity::NumberPattern;
use crate::line_items::RawItem;
use crate::model::{Currency, InvoiceData, Template};
use crate::session::{Edit, Party};
use crate::store::{FileStore, InvoiceStore};

// ==========================================
// Structs & Enums
// ==========================================

#[derive(Parser)]
#[command(name = "invoice-builder", about = "Build contractor invoices from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new invoice (replaces the saved draft)
    New,
    /// Continue editing the saved draft
    Edit,
    /// Preview the saved draft
    Show,
    /// Replace the draft's line items with rows from a CSV file
    Import {
        /// CSV/TSV file with description, quantity and rate columns (opens a file picker if omitted)
        file: Option<PathBuf>,
    },
    /// Export the saved draft as a document
    Export {
        /// Render a PNG snapshot instead of a PDF
        #[arg(long)]
        png: bool,
        #[arg(long, value_enum)]
        paper: Option<Paper>,
        #[arg(long, value_enum)]
        orientation: Option<Orientation>,
        /// Do not open the exported file
        #[arg(long)]
        no_open: bool,
    },
    /// Discard the saved draft
    Clear,
    /// Print a freshly generated invoice number
    Number {
        #[arg(long, value_enum)]
        pattern: Option<NumberPattern>,
    },
    /// Configure data directory and defaults
    Config,
}

struct App {
    settings: Settings,
    root: PathBuf,
    store: FileStore,
    tera: Tera,
}

// ==========================================
// Main Function
// ==========================================

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "invoice_builder=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        Cli::command().print_help().ok();
        return;
    };

    if let Err(e) = run(command) {
        if form::is_cancel(&e) {
            println!("Operation cancelled.");
        } else {
            eprintln!("❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run(command: Commands) -> Result<()> {
    let config_path = config::config_path();

    // 1. Initialize configuration
    let settings = match command {
        Commands::Config => return setup_config_wizard(&config_path).map(|_| ()),
        _ => match config::load_settings_from(&config_path) {
            Some(settings) => settings,
            None => setup_config_wizard(&config_path)?,
        },
    };

    let root = settings.root();
    fs::create_dir_all(&root)?;
    let tera = preview::load_templates(&root).or_else(|e| {
        warn!(error = %e, "falling back to the built-in template");
        preview::embedded_templates()
    })?;
    let app = App { store: FileStore::new(&root), settings, root, tera };

    let today = Local::now().date_naive();
    match command {
        Commands::New => {
            if app.store.load().is_some()
                && !Confirm::new("A saved draft exists. Discard it and start a new invoice?")
                    .with_default(false)
                    .prompt()?
            {
                println!("Keeping the existing draft. Run `invoice-builder edit` to continue it.");
                return Ok(());
            }
            app.store.clear()?;
            let data = fresh_draft(&app, today)?;
            run_session(&app, data)
        }
        Commands::Edit => {
            let data = match app.store.load() {
                Some(data) => data,
                None => {
                    println!("✨ No saved draft, starting a new invoice.");
                    fresh_draft(&app, today)?
                }
            };
            run_session(&app, data)
        }
        Commands::Show => {
            match app.store.load() {
                Some(data) => preview::print_preview(&data),
                None => println!("❌ No saved draft. Run `invoice-builder new` first."),
            }
            Ok(())
        }
        Commands::Import { file } => {
            let data = match app.store.load() {
                Some(data) => data,
                None => fresh_draft(&app, today)?,
            };
            let Some(rows) = import_rows(file)? else {
                return Ok(());
            };
            let data = data.apply(Edit::ReplaceItems(rows));
            app.store.save(&data)?;
            preview::print_preview(&data);
            Ok(())
        }
        Commands::Export { png, paper, orientation, no_open } => {
            let Some(data) = app.store.load() else {
                println!("❌ No saved draft. Run `invoice-builder new` first.");
                return Ok(());
            };
            let mut options = app.settings.export.clone();
            if let Some(paper) = paper {
                options.paper = paper;
            }
            if let Some(orientation) = orientation {
                options.orientation = orientation;
            }
            let format = if png { ExportFormat::Png } else { ExportFormat::Pdf };
            export_invoice(&app, &data, &options, format, !no_open);
            Ok(())
        }
        Commands::Clear => {
            if Confirm::new("Discard the saved draft?").with_default(false).prompt()? {
                app.store.clear()?;
                println!("🗑  Removed {}", app.store.path().display());
            }
            Ok(())
        }
        Commands::Number { pattern } => {
            let pattern = pattern.unwrap_or(app.settings.number_pattern);
            println!("{}", identity::generate_invoice_number(pattern, today, &mut rand::thread_rng()));
            Ok(())
        }
        Commands::Config => Ok(()),
    }
}

fn fresh_draft(app: &App, today: chrono::NaiveDate) -> Result<InvoiceData> {
    let contractor = config::load_contractor(&app.root)?;
    Ok(session::fresh_invoice(&app.settings, &contractor, today, &mut rand::thread_rng()))
}

// ==========================================
// 1. Editing Session
// ==========================================

fn run_session(app: &App, mut data: InvoiceData) -> Result<()> {
    let autosaver = Autosaver::spawn(Box::new(FileStore::new(&app.root)), app.settings.quiet_window());
    autosaver.schedule(&data);
    println!("💾 Changes are saved automatically to {}", app.store.path().display());

    loop {
        let totals = data.totals();
        println!(
            "\n🧾 {} · {} item(s) · Total {}",
            data.invoice_number,
            data.line_items.len(),
            data.currency.format_amount(totals.total)
        );

        let action = match form::choose_action() {
            Ok(action) => action,
            Err(e) if form::is_cancel(&e) => break,
            Err(e) => return Err(e),
        };

        let step: Result<Vec<Edit>> = match action {
            MenuAction::Details => form::details(&data),
            MenuAction::Contractor => form::contact(&data, Party::Contractor),
            MenuAction::Client => form::contact(&data, Party::Client),
            MenuAction::AddItem => {
                let index = data.line_items.len();
                let with_item = data.apply(Edit::AddItem);
                form::item_fields(&with_item, index).map(|mut edits| {
                    edits.insert(0, Edit::AddItem);
                    edits
                })
            }
            MenuAction::EditItem => {
                form::pick_item(&data, "Select Item to Edit:").and_then(|i| form::item_fields(&data, i))
            }
            MenuAction::DuplicateItem => {
                form::pick_item(&data, "Select Item to Duplicate:").map(|i| vec![Edit::DuplicateItem(i)])
            }
            MenuAction::RemoveItem => {
                if data.line_items.len() <= 1 {
                    println!("⚠️  An invoice needs at least one line item.");
                    Ok(Vec::new())
                } else {
                    form::pick_item(&data, "Select Item to Remove:").map(|i| vec![Edit::RemoveItem(i)])
                }
            }
            MenuAction::ImportItems => prompt_import(),
            MenuAction::Tax => form::tax(&data),
            MenuAction::Payment => form::payment(&data),
            MenuAction::Appearance => form::appearance(&data),
            MenuAction::Preview => {
                preview::print_preview(&data);
                Ok(Vec::new())
            }
            MenuAction::Export => {
                export_invoice(app, &data, &app.settings.export, ExportFormat::Pdf, true);
                Ok(Vec::new())
            }
            MenuAction::Reset => start_over(app, &autosaver, &data).map(|next| {
                if let Some(next) = next {
                    data = next;
                }
                Vec::new()
            }),
            MenuAction::Done => break,
        };

        match step {
            Ok(edits) if edits.is_empty() => {}
            Ok(edits) => {
                let touched_contractor = edits.iter().any(|e| matches!(e, Edit::Contact(Party::Contractor, ..)));
                for edit in edits {
                    data = data.apply(edit);
                }
                autosaver.schedule(&data);
                if touched_contractor {
                    if let Err(e) = offer_profile_update(app, &data) {
                        println!("{}", form::notice(&e));
                    }
                }
            }
            Err(e) => println!("{}", form::notice(&e)),
        }
    }

    drop(autosaver);
    println!("✅ Draft saved. Run `invoice-builder export` to produce the PDF.");
    Ok(())
}

/// The fresh invoice, or `None` when the user backs out. If the stored draft
/// cannot be removed the current invoice stays scheduled for saving.
fn start_over(app: &App, autosaver: &Autosaver, data: &InvoiceData) -> Result<Option<InvoiceData>> {
    if !Confirm::new("Clear this invoice and start over?").with_default(false).prompt()? {
        return Ok(None);
    }
    autosaver.discard();
    if let Err(e) = app.store.clear() {
        autosaver.schedule(data);
        return Err(e);
    }
    let next = data.reset(&app.settings, Local::now().date_naive(), &mut rand::thread_rng());
    autosaver.schedule(&next);
    println!("♻️  Started invoice {}", next.invoice_number);
    Ok(Some(next))
}

fn offer_profile_update(app: &App, data: &InvoiceData) -> Result<()> {
    if Confirm::new("Save these details as your default profile for new invoices?")
        .with_default(true)
        .prompt()?
    {
        config::save_contractor(&app.root, &data.contractor)?;
        println!("✅ Profile updated.");
    }
    Ok(())
}

// ==========================================
// 2. Import & Export
// ==========================================

fn prompt_import() -> Result<Vec<Edit>> {
    let path = Text::new("CSV file path (Leave empty to browse):").prompt()?;
    let file = if path.trim().is_empty() { None } else { Some(PathBuf::from(path.trim())) };
    Ok(import_rows(file)?.map(|rows| vec![Edit::ReplaceItems(rows)]).unwrap_or_default())
}

/// Parsed rows, or `None` when nothing should change. Parse failures are
/// reported here and never reach the draft.
fn import_rows(file: Option<PathBuf>) -> Result<Option<Vec<RawItem>>> {
    let path = match file {
        Some(path) => path,
        None => {
            println!("📂 Opening file picker...");
            match rfd::FileDialog::new()
                .set_title("Select CSV File")
                .add_filter("Spreadsheet", &["csv", "tsv", "txt"])
                .pick_file()
            {
                Some(path) => path,
                None => {
                    println!("❌ No file selected.");
                    return Ok(None);
                }
            }
        }
    };

    let text = fs::read_to_string(&path)?;
    match import::parse_rows(&text) {
        Ok(rows) => {
            println!("✅ Imported {} item(s) from {}", rows.len(), path.display());
            Ok(Some(rows))
        }
        Err(e) => {
            println!("❌ Import failed: {}", e);
            Ok(None)
        }
    }
}

fn export_invoice(app: &App, data: &InvoiceData, options: &ExportOptions, format: ExportFormat, open: bool) {
    let out_dir = export::output_dir(&app.root, data);
    let what = match format {
        ExportFormat::Pdf => "PDF",
        ExportFormat::Png => "PNG snapshot",
    };
    println!("\n🔨 Compiling {}...", what);
    match export::export(&app.tera, data, options, &out_dir, format) {
        Ok(path) => {
            println!("✅ {} Generated: {:?}", what, path);
            if open {
                export::open_and_reveal(&path);
            }
        }
        Err(e) => println!("❌ {}", e),
    }
}

// ==========================================
// 3. Config
// ==========================================

fn setup_config_wizard(path: &Path) -> Result<Settings> {
    println!("\n⚙️  --- Configuration Setup ---");
    let current = config::load_settings_from(path).unwrap_or_default();

    println!("📂 Opening folder picker...");
    let picked_path = rfd::FileDialog::new().set_title("Select Invoice Data Directory").pick_folder();

    let data_root = if let Some(path) = picked_path {
        path.to_string_lossy().to_string()
    } else {
        println!("❌ No folder selected. Falling back to manual input.");
        Text::new("Enter Data Directory:").with_default(&current.data_root).prompt()?
    };

    let currency = Select::new("Default Currency:", Currency::ALL.to_vec())
        .with_starting_cursor(Currency::ALL.iter().position(|c| *c == current.currency).unwrap_or(0))
        .prompt()?;
    let template = Select::new("Default Template:", Template::ALL.to_vec())
        .with_starting_cursor(Template::ALL.iter().position(|t| *t == current.template).unwrap_or(0))
        .prompt()?;
    let patterns = NumberPattern::value_variants().to_vec();
    let number_pattern = Select::new("Invoice Number Pattern:", patterns.clone())
        .with_starting_cursor(patterns.iter().position(|p| *p == current.number_pattern).unwrap_or(0))
        .prompt()?;

    let settings = Settings { data_root, currency, template, number_pattern, ..current };
    config::save_settings_to(path, &settings)?;
    println!("✅ Settings saved.");
    Ok(settings)
}
