//! Lockbox CLI - Command line interface for the password vault.
//!
//! Every command opens a fresh session, unlocks the vault with a prompted
//! passphrase, performs one operation and exits.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use lockbox_common::Passphrase;
use lockbox_vault::{
    generate_passphrase, CredentialField, CredentialRecord, EngineConfig, RecordDraft, RecordId,
    VaultManager, VaultSession, CONFIG_FILENAME, TEMPLATE_PASSWORD_LENGTH,
};

#[derive(Parser)]
#[command(name = "lockbox")]
#[command(about = "Lockbox - Local encrypted password vault")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Engine configuration file (JSON).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Data directory for the local storage provider.
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new vault.
    Register,

    /// List the records in the vault.
    List,

    /// Show one record.
    Show {
        /// Record id.
        id: u64,

        /// Print hidden field values instead of masking them.
        #[arg(short, long)]
        reveal: bool,
    },

    /// Add a record, or replace one when --id is given.
    Add {
        /// Id of an existing record to replace.
        #[arg(long)]
        id: Option<u64>,

        /// Record title.
        #[arg(short, long)]
        title: String,

        /// Record description.
        #[arg(short = 'D', long, default_value = "")]
        description: String,

        /// Visible field as name=value. Repeatable.
        #[arg(short, long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,

        /// Hidden field as name=value. Repeatable.
        #[arg(short, long = "secret", value_parser = parse_field)]
        secrets: Vec<(String, String)>,

        /// Add a generated "Password" field.
        #[arg(short, long)]
        generate_password: bool,
    },

    /// Remove a record.
    Remove {
        /// Record id.
        id: u64,
    },

    /// Change the vault passphrase.
    ChangePassphrase,

    /// Export the vault to a backup file.
    Export {
        /// Also copy the export to this path.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import a vault from a backup file.
    Import {
        /// Backup file produced by `export`.
        #[arg(short, long)]
        file: PathBuf,

        /// Overwrite a vault already stored for the passphrase.
        #[arg(long)]
        replace: bool,
    },

    /// Print a random password.
    Generate {
        /// Number of characters.
        #[arg(short, long, default_value_t = 32)]
        length: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(cli.config.as_deref(), cli.data_dir.as_deref())?;

    match cli.command {
        Commands::Register => cmd_register(&config).await,

        Commands::List => cmd_list(&config).await,

        Commands::Show { id, reveal } => cmd_show(&config, id, reveal).await,

        Commands::Add {
            id,
            title,
            description,
            fields,
            secrets,
            generate_password,
        } => {
            let mut draft = RecordDraft::new(title, description);
            draft.id = id.map(RecordId::new).transpose().context("Invalid record id")?;
            for (name, value) in fields {
                draft.fields.push(CredentialField::visible(name, value));
            }
            for (name, value) in secrets {
                draft.fields.push(CredentialField::secret(name, value));
            }
            if generate_password {
                draft.fields.push(CredentialField::secret(
                    "Password",
                    generate_passphrase(TEMPLATE_PASSWORD_LENGTH),
                ));
            }
            cmd_add(&config, draft).await
        }

        Commands::Remove { id } => cmd_remove(&config, id).await,

        Commands::ChangePassphrase => cmd_change_passphrase(&config).await,

        Commands::Export { output } => cmd_export(&config, output.as_deref()).await,

        Commands::Import { file, replace } => cmd_import(&config, &file, replace).await,

        Commands::Generate { length } => {
            println!("{}", generate_passphrase(length));
            Ok(())
        }
    }
}

/// Parse a `name=value` field argument.
fn parse_field(arg: &str) -> std::result::Result<(String, String), String> {
    arg.split_once('=')
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected name=value, got '{}'", arg))
}

/// Build the engine configuration from the command line.
///
/// Without `--config`, a `lockbox.json` in the data directory is used when
/// present.
fn load_config(path: Option<&Path>, data_dir: Option<&Path>) -> Result<EngineConfig> {
    let mut config = match (path, data_dir) {
        (Some(path), _) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        (None, Some(dir)) if dir.join(CONFIG_FILENAME).is_file() => {
            EngineConfig::load(dir.join(CONFIG_FILENAME)).context("Failed to load configuration")?
        }
        _ => EngineConfig::default(),
    };

    if let Some(dir) = data_dir {
        config.set_data_dir(dir);
    }

    debug!(
        cipher = %config.cipher,
        storage = %config.storage.provider,
        "Loaded configuration"
    );
    Ok(config)
}

/// Prompt for a passphrase securely.
fn prompt_passphrase(prompt: &str) -> Result<Passphrase> {
    let passphrase = rpassword::prompt_password(prompt).context("Failed to read passphrase")?;
    Ok(Passphrase::new(passphrase))
}

/// Open a session and unlock the vault.
async fn unlock(config: &EngineConfig) -> Result<VaultSession> {
    let manager = VaultManager::new();
    let mut session = manager
        .open_session(config)
        .context("Failed to open session")?;

    let passphrase = prompt_passphrase("Enter passphrase: ")?;
    session
        .login(&passphrase)
        .await
        .context("Failed to unlock vault")?;
    Ok(session)
}

fn print_record(record: &CredentialRecord, reveal: bool) {
    println!("{} (id {})", record.target_name, record.id);
    if !record.description.is_empty() {
        println!("  {}", record.description);
    }
    println!(
        "  Last update: {}",
        record.last_update.format("%Y-%m-%d %H:%M:%S UTC")
    );
    for field in &record.fields {
        let value = if field.hidden && !reveal {
            "********"
        } else {
            field.value.as_str()
        };
        println!("  {}: {}", field.name, value);
    }
}

/// Create a new vault.
async fn cmd_register(config: &EngineConfig) -> Result<()> {
    let manager = VaultManager::new();
    let mut session = manager
        .open_session(config)
        .context("Failed to open session")?;

    let passphrase = prompt_passphrase("Enter passphrase: ")?;
    let confirmation = prompt_passphrase("Confirm passphrase: ")?;

    session
        .register(&passphrase, &confirmation)
        .await
        .context("Failed to create vault")?;

    println!("Vault created successfully!");
    println!("  Cipher: {}", session.cipher().name());
    println!("  Storage: {}", session.storage().name());
    Ok(())
}

/// List records.
async fn cmd_list(config: &EngineConfig) -> Result<()> {
    let session = unlock(config).await?;
    let records = session.vault().map(|v| v.records()).unwrap_or_default();

    if records.is_empty() {
        println!("Vault is empty.");
    } else {
        for record in records {
            println!(
                "  [{:>16}] {} ({} fields)",
                record.id,
                record.target_name,
                record.fields.len()
            );
        }
    }

    Ok(())
}

/// Show a record.
async fn cmd_show(config: &EngineConfig, id: u64, reveal: bool) -> Result<()> {
    let id = RecordId::new(id).context("Invalid record id")?;
    let session = unlock(config).await?;

    let record = session
        .record(id)
        .with_context(|| format!("No record with id {}", id))?;
    print_record(&record, reveal);
    Ok(())
}

/// Add or replace a record.
async fn cmd_add(config: &EngineConfig, draft: RecordDraft) -> Result<()> {
    let mut session = unlock(config).await?;

    if let Some(id) = draft.id {
        if session.record(id).is_none() {
            anyhow::bail!("No record with id {}", id);
        }
    }

    let record = session
        .save_record(draft)
        .await
        .context("Failed to save record")?;

    info!(id = %record.id, "Record saved");
    print_record(&record, false);
    Ok(())
}

/// Remove a record.
async fn cmd_remove(config: &EngineConfig, id: u64) -> Result<()> {
    let id = RecordId::new(id).context("Invalid record id")?;
    let mut session = unlock(config).await?;

    if session
        .delete_record(id)
        .await
        .context("Failed to remove record")?
    {
        println!("Removed record {}", id);
    } else {
        anyhow::bail!("No record with id {}", id);
    }
    Ok(())
}

/// Change the vault passphrase.
async fn cmd_change_passphrase(config: &EngineConfig) -> Result<()> {
    let mut session = unlock(config).await?;

    let old = prompt_passphrase("Current passphrase: ")?;
    let new = prompt_passphrase("New passphrase: ")?;
    let confirmation = prompt_passphrase("Confirm new passphrase: ")?;

    session
        .change_passphrase(&old, &new, &confirmation)
        .await
        .context("Failed to change passphrase")?;

    println!("Passphrase changed successfully!");
    Ok(())
}

/// Export the vault.
async fn cmd_export(config: &EngineConfig, output: Option<&Path>) -> Result<()> {
    let mut session = unlock(config).await?;

    let export = session.export().await.context("Failed to export vault")?;

    println!("Exported {}", export.receipt.file_name);
    println!("  Location: {}", export.receipt.location);

    if let Some(output) = output {
        let bytes = export.envelope.to_bytes()?;
        tokio::fs::write(output, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", output.display()))?;
        println!("  Copied to: {}", output.display());
    }
    Ok(())
}

/// Import a vault from a backup file.
async fn cmd_import(config: &EngineConfig, file: &Path, replace: bool) -> Result<()> {
    info!("Importing vault from: {}", file.display());

    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let manager = VaultManager::new();
    let mut session = manager
        .open_session(config)
        .context("Failed to open session")?;

    let passphrase = prompt_passphrase("Passphrase of the backup: ")?;
    let imported = if replace {
        session.import_replacing(&bytes, &passphrase).await
    } else {
        session.import(&bytes, &passphrase).await
    };
    let vault = imported.context("Failed to import vault (use --replace to overwrite)")?;

    println!("Imported {} records.", vault.len());
    Ok(())
}
