use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use kinesio_core::{
    analysis::build_request,
    config::{patient_data_dir_from_env_value, save_delay_from_env_value},
    constants::{DEFAULT_BACKUP_FOLDER_NAME, DEFAULT_STORAGE_KEY},
    exports::{backup_export, document_export, spreadsheet_export},
    record::{add_entry, MediaFile},
    remote::{LocalFolderGateway, RemoteBackupService, UserProfile},
    synthesis::{summarize, Block, Report},
    CoreConfig, DebouncedSaver, ExportFile, NonEmptyText, PatientStore,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "kinesio")]
#[command(about = "Kinesio shoulder-intake patient record CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all patients
    List,
    /// Create a new patient with placeholder names
    Create,
    /// Print the summary view of a patient
    Show {
        /// Patient id
        id: String,
    },
    /// Change a patient's names (saved through the autosave controller)
    SetName {
        /// Patient id
        id: String,
        /// Last name
        last_name: String,
        /// First name
        first_name: String,
    },
    /// Delete a patient permanently
    Delete {
        /// Patient id
        id: String,
    },
    /// Write a JSON backup of every patient
    ExportBackup {
        /// Output directory (defaults to the current directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Replace every patient with the contents of a backup file
    ImportBackup {
        /// Backup file path
        file: PathBuf,
    },
    /// Write the word-processor document for a patient
    ExportDoc {
        /// Patient id
        id: String,
        /// Output directory (defaults to the current directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Write the spreadsheet for a patient
    ExportXlsx {
        /// Patient id
        id: String,
        /// Output directory (defaults to the current directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Attach an image or document to a patient's studies
    Attach {
        /// Patient id
        id: String,
        /// File to attach
        file: PathBuf,
    },
    /// Print the request that AI analysis would send for a patient
    Prompt {
        /// Patient id
        id: String,
    },
    /// Mirror every patient to the backup folder
    Mirror,
    /// Replace every patient with the records in the backup folder
    Restore,
}

/// Builds the core configuration from `KINESIO_*` environment variables.
fn config_from_env() -> anyhow::Result<CoreConfig> {
    let data_dir = patient_data_dir_from_env_value(std::env::var("KINESIO_DATA_DIR").ok());
    let save_delay = save_delay_from_env_value(std::env::var("KINESIO_SAVE_DELAY_MS").ok())?;
    Ok(CoreConfig::new(
        data_dir,
        NonEmptyText::new(DEFAULT_STORAGE_KEY)?,
        save_delay,
        NonEmptyText::new(DEFAULT_BACKUP_FOLDER_NAME)?,
    )?)
}

fn remote_service(store: &PatientStore) -> anyhow::Result<RemoteBackupService> {
    let root = std::env::var("KINESIO_BACKUP_DIR")
        .context("KINESIO_BACKUP_DIR must point at the backup folder root")?;
    let profile = UserProfile {
        name: std::env::var("USER").unwrap_or_else(|_| "local".into()),
        email: String::new(),
        picture: None,
    };
    let gateway = LocalFolderGateway::new(root, profile);
    Ok(RemoteBackupService::new(store.clone(), Arc::new(gateway)))
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn write_export(file: ExportFile, out: Option<PathBuf>) -> anyhow::Result<()> {
    let dir = out.unwrap_or_else(|| PathBuf::from("."));
    let path = dir.join(&file.filename);
    std::fs::write(&path, &file.bytes)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn print_report(report: &Report) {
    println!("{}", report.title);
    for section in &report.sections {
        println!();
        println!("== {} ==", section.title);
        for block in &section.blocks {
            match block {
                Block::Field { label, value } => println!("{label}: {value}"),
                Block::Items { label, items } => {
                    if let Some(label) = label {
                        println!("{label}:");
                    }
                    for item in items {
                        println!("  - {item}");
                    }
                }
                Block::Entries { headers, rows } | Block::Table { headers, rows } => {
                    println!("{}", headers.join(" | "));
                    for row in rows {
                        println!("{}", row.join(" | "));
                    }
                }
                Block::Text { heading, text } => {
                    if let Some(heading) = heading {
                        println!("{heading}:");
                    }
                    println!("{text}");
                }
            }
        }
    }
}

fn read_file(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("kinesio_core=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let cfg = Arc::new(config_from_env()?);
    let store = PatientStore::open(cfg.clone());

    match cli.command {
        Some(Commands::List) => {
            let patients = store.list_all();
            if patients.is_empty() {
                println!("No patients found.");
            } else {
                for patient in patients {
                    println!(
                        "ID: {}, Name: {} {}, Created: {}, Status: {}",
                        patient.id,
                        patient.identity.first_name,
                        patient.identity.last_name,
                        patient.created_at,
                        patient.status.label()
                    );
                }
            }
        }
        Some(Commands::Create) => {
            let record = store.create()?;
            println!("Created patient with id: {}", record.id);
        }
        Some(Commands::Show { id }) => {
            let record = store
                .get(&id)
                .with_context(|| format!("patient {id} not found"))?;
            print_report(&summarize(&record, today()));
        }
        Some(Commands::SetName {
            id,
            last_name,
            first_name,
        }) => {
            let mut record = store
                .get(&id)
                .with_context(|| format!("patient {id} not found"))?;
            record.identity.last_name = last_name;
            record.identity.first_name = first_name;

            let saver = DebouncedSaver::new(store.clone(), cfg.save_delay());
            saver.notify(record);
            saver.flush()?;
            println!("Updated patient {id}");
        }
        Some(Commands::Delete { id }) => {
            if store.remove(&id)? {
                println!("Deleted patient {id}");
            } else {
                anyhow::bail!("patient {id} not found");
            }
        }
        Some(Commands::ExportBackup { out }) => {
            write_export(backup_export(&store, today())?, out)?;
        }
        Some(Commands::ImportBackup { file }) => {
            let text = String::from_utf8(read_file(&file)?).context("backup must be UTF-8 text")?;
            let records = store.import(&text)?;
            println!("Imported {} patients", records.len());
        }
        Some(Commands::ExportDoc { id, out }) => {
            let record = store
                .get(&id)
                .with_context(|| format!("patient {id} not found"))?;
            write_export(document_export(&record, today())?, out)?;
        }
        Some(Commands::ExportXlsx { id, out }) => {
            let record = store
                .get(&id)
                .with_context(|| format!("patient {id} not found"))?;
            write_export(spreadsheet_export(&record, today())?, out)?;
        }
        Some(Commands::Attach { id, file }) => {
            let mut record = store
                .get(&id)
                .with_context(|| format!("patient {id} not found"))?;
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .context("attachment path has no file name")?;
            let media = MediaFile::from_bytes(name, &read_file(&file)?);
            println!("Attached {} ({})", media.name, media.mime_type);
            add_entry(&mut record.studies_and_evolution.media, media)?;
            store.save(record)?;
        }
        Some(Commands::Prompt { id }) => {
            let record = store
                .get(&id)
                .with_context(|| format!("patient {id} not found"))?;
            let request = build_request(&record);
            println!("{}", request.system_instruction);
            println!();
            println!("{}", request.prompt);
        }
        Some(Commands::Mirror) => {
            let report = remote_service(&store)?.mirror().await?;
            println!(
                "Mirrored: {} created, {} updated, {} deleted",
                report.created, report.updated, report.deleted
            );
        }
        Some(Commands::Restore) => {
            let records = remote_service(&store)?.restore().await?;
            println!("Restored {} patients", records.len());
        }
        None => {
            println!("Use 'kinesio --help' for commands");
        }
    }

    Ok(())
}
