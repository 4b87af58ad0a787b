// ============================================================================
// src/main.rs – field_vault CLI
// ============================================================================

mod ui;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dialoguer::Password;
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use zeroize::Zeroizing;

use field_vault::config::Config;
use field_vault::{
    change_password, FieldStore, FieldValue, FileStore, KdfParams, PasswordVault, RecordStore,
    VaultError,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Password-protected private fields")]
struct Cli {
    /// Config file (TOML, or YAML by extension)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Store file; overrides `[store] path`
    #[arg(short, long, value_name = "PATH")]
    store: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show whether a password is set and how many fields are encrypted.
    Status,
    /// Check a password against the stored record.
    Check,
    /// Set the first password and encrypt every field.
    SetPassword,
    /// Re-encrypt every field under a new password.
    ChangePassword,
    /// Decrypt every field and remove the password.
    ClearPassword,
    /// Store a field, encrypted when a password is set.
    Put { name: String, value: String },
    /// Print a field, decrypting it if needed.
    Get { name: String },
    /// List fields without decrypting them.
    List,
    /// Delete a field.
    Remove { name: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = Config::load_or_default(cli.config.as_deref())?;
    init_tracing(&cfg.log.filter, cli.verbose)?;

    let result = run(cli, cfg);
    if let Err(err) = &result {
        if matches!(err.downcast_ref::<VaultError>(), Some(VaultError::WrongPassword)) {
            ui::error("bad password");
            std::process::exit(2);
        }
    }
    result
}

fn init_tracing(default_filter: &str, verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_filter))
            .with_context(|| format!("invalid log filter: {default_filter}"))?
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("install tracing subscriber")?;
    Ok(())
}

fn run(cli: Cli, cfg: Config) -> Result<()> {
    let path = cli.store.unwrap_or(cfg.store.path);
    debug!(store = %path.display(), "opening store");
    let mut store =
        FileStore::open(&path).with_context(|| format!("open store: {}", path.display()))?;

    match cli.command {
        Command::Status => status(&store),
        Command::Check => {
            unlock(&store, cfg.kdf)?;
            ui::success("password ok");
            Ok(())
        }
        Command::SetPassword => set_password(&mut store, cfg.kdf),
        Command::ChangePassword => {
            let old = prompt_password("Current password")?;
            let new = prompt_new_password()?;
            let report = change_password(
                &mut store,
                Some(old.as_str()),
                Some(new.as_str()),
                cfg.kdf,
                None,
            )?;
            ui::success(&format!(
                "password changed; {} fields re-encrypted",
                report.encrypted
            ));
            Ok(())
        }
        Command::ClearPassword => {
            let old = prompt_password("Current password")?;
            let report = change_password(&mut store, Some(old.as_str()), None, cfg.kdf, None)?;
            ui::warn(&format!(
                "password removed; {} fields are now stored in plain text",
                report.decrypted
            ));
            Ok(())
        }
        Command::Put { name, value } => put(&mut store, cfg.kdf, &name, &value),
        Command::Get { name } => get(&store, cfg.kdf, &name),
        Command::List => {
            for (name, value) in store.fields()? {
                ui::field_row(&name, &value);
            }
            Ok(())
        }
        Command::Remove { name } => {
            if store.remove_field(&name)? {
                ui::success(&format!("removed {name}"));
            } else {
                ui::warn(&format!("no field named {name}"));
            }
            Ok(())
        }
    }
}

fn status(store: &FileStore) -> Result<()> {
    ui::banner("field_vault");
    ui::info(&format!("store: {}", store.path().display()));
    let vault = PasswordVault::new();
    if vault.has_password(store)? {
        ui::info("password: set");
    } else {
        ui::info("password: not set");
    }
    let total = store.fields()?.len();
    let encrypted = store.encrypted_payload_count()?;
    ui::info(&format!("fields: {total} ({encrypted} encrypted)"));
    Ok(())
}

fn set_password(store: &mut FileStore, params: KdfParams) -> Result<()> {
    if PasswordVault::new().has_password(&*store)? {
        bail!("a password is already set; use change-password");
    }
    let new = prompt_new_password()?;
    let report = change_password(store, None, Some(new.as_str()), params, None)?;
    ui::success(&format!("password set; {} fields encrypted", report.encrypted));
    Ok(())
}

fn put(store: &mut FileStore, params: KdfParams, name: &str, value: &str) -> Result<()> {
    let stored = if PasswordVault::new().has_password(&*store)? {
        let mut vault = unlock(store, params)?;
        let code = vault.encrypt(value)?;
        vault.forget_password();
        FieldValue::Encrypted(code)
    } else {
        ui::warn("no password set; storing in plain text");
        FieldValue::Plain(value.to_owned())
    };
    store.set_field(name, stored)?;
    ui::success(&format!("stored {name}"));
    Ok(())
}

fn get(store: &FileStore, params: KdfParams, name: &str) -> Result<()> {
    let value = store
        .field(name)?
        .with_context(|| format!("no field named {name}"))?;
    match value {
        FieldValue::Plain(text) => println!("{text}"),
        FieldValue::Encrypted(code) => {
            let mut vault = unlock(store, params)?;
            let text = Zeroizing::new(vault.decrypt(&code)?);
            vault.forget_password();
            println!("{}", text.as_str());
        }
    }
    Ok(())
}

/// Prompt for the password and check it against the stored record.
fn unlock(store: &FileStore, params: KdfParams) -> Result<PasswordVault> {
    let mut vault = PasswordVault::with_params(params);
    if !vault.has_password(store)? {
        bail!("no password is set");
    }
    let password = prompt_password("Password")?;
    vault.set_password(&password);
    if !vault.check_password(store)? {
        return Err(VaultError::WrongPassword.into());
    }
    Ok(vault)
}

fn prompt_password(prompt: &str) -> Result<Zeroizing<String>> {
    let password = Password::new()
        .with_prompt(prompt)
        .interact()
        .context("read password")?;
    Ok(Zeroizing::new(password))
}

fn prompt_new_password() -> Result<Zeroizing<String>> {
    let password = Password::new()
        .with_prompt("New password")
        .with_confirmation("Repeat new password", "Passwords do not match")
        .allow_empty_password(false)
        .interact()
        .context("read new password")?;
    Ok(Zeroizing::new(password))
}
