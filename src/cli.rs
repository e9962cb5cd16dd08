// src/cli.rs
use crate::cache::{CacheStorage, HttpFetcher, OfflineWorker, Served, WorkerRegistration};
use crate::config::{self, Config, StoragePaths};
use crate::directory::{dob_password, Confirm, Dashboard};
use crate::error::{AppError, AppResult, DirectoryError};
use crate::notice::{self, Notice};
use crate::store::FileStore;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use log;
use rpassword;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

/// Local account dashboard: users, their saved credentials, and an offline
/// copy of the web shell.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// Keep data, session and cache under this directory
    #[clap(long, global = true, value_parser)]
    pub data_dir: Option<PathBuf>,
    /// Read configuration from this file instead of the platform default
    #[clap(long, global = true, value_parser)]
    pub config: Option<PathBuf>,
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an account
    Register {
        #[clap(short, long)]
        username: String,
        /// Use a date of birth (YYYY-MM-DD) as the password, stored as DD-MM-YYYY
        #[clap(long)]
        dob: Option<NaiveDate>,
    },
    /// Log in and start a session
    Login {
        #[clap(short, long)]
        username: String,
    },
    /// End the current session
    Logout,
    /// Show who is logged in
    Whoami,
    /// Change the logged-in user's password
    Passwd,
    /// Permanently delete the logged-in account
    Remove {
        #[clap(short, long)]
        username: String,
    },
    /// Record a credential for the logged-in user
    Add {
        #[clap(short, long)]
        purpose: String,
        #[clap(short, long)]
        username: String,
    },
    /// List the logged-in user's credentials, newest first
    List,
    /// List registered usernames
    Users,
    /// Manage the offline shell cache
    Cache {
        #[clap(subcommand)]
        action: CacheCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Install the configured cache version and retire older ones
    Update,
    /// Fetch a URL through the cache
    Fetch {
        url: String,
        /// Write the body here instead of stdout
        #[clap(short, long, value_parser)]
        output: Option<PathBuf>,
    },
    /// Show cached versions and their contents
    Status,
}

struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{} (y/N): ", prompt);
        if let Err(e) = io::stdout().flush() {
            log::error!("Failed to flush stdout for confirmation: {}", e);
            return false;
        }
        let mut answer = String::new();
        if let Err(e) = io::stdin().read_line(&mut answer) {
            log::error!("Failed to read confirmation: {}", e);
            return false;
        }
        answer.trim().eq_ignore_ascii_case("y")
    }
}

fn prompt_secret(prompt: &str) -> AppResult<String> {
    rpassword::prompt_password(prompt).map_err(|e| {
        log::error!("Failed to read password: {}", e);
        AppError::Cli(format!("Failed to read password: {}", e))
    })
}

fn open_dashboard(paths: &StoragePaths) -> AppResult<Dashboard<FileStore, FileStore>> {
    let persistent = FileStore::open(&paths.data)?;
    let session = FileStore::open(&paths.session)?;
    Ok(Dashboard::new(persistent, session))
}

/// Prints the notice for an operation outcome and passes rejections on.
fn report(outcome: Result<Notice, DirectoryError>, removing_account: bool) -> AppResult<()> {
    match outcome {
        Ok(notice) => {
            println!("{}", notice);
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", notice::rejection(&e, removing_account));
            Err(e.into())
        }
    }
}

pub fn handle_cli_command(cli: Cli) -> AppResult<()> {
    log::debug!("Handling CLI command: {:?}", cli.command);
    let config: Config = config::load_config(cli.config.as_deref());
    let paths = config
        .storage_paths(cli.data_dir.as_deref())
        .ok_or_else(|| AppError::Cli("Could not determine a data directory; pass --data-dir".to_string()))?;
    log::debug!("Using storage paths {:?}", paths);

    match cli.command {
        Commands::Register { username, dob } => {
            let password = match dob {
                Some(dob) => dob_password(dob),
                None => {
                    let password = prompt_secret("Password: ")?;
                    let confirm = prompt_secret("Confirm password: ")?;
                    if password != confirm {
                        log::warn!("Registration aborted: passwords do not match.");
                        return Err(AppError::Cli("Passwords do not match.".to_string()));
                    }
                    password
                }
            };
            let mut dash = open_dashboard(&paths)?;
            report(
                dash.register(&username, &password).map(|_| Notice::success(notice::REGISTERED)),
                false,
            )
        }
        Commands::Login { username } => {
            let password = prompt_secret("Password: ")?;
            let mut dash = open_dashboard(&paths)?;
            report(
                dash.login(&username, &password).map(|user| {
                    Notice::success(&format!("{} Hello, {}", notice::LOGGED_IN, user.username))
                }),
                false,
            )
        }
        Commands::Logout => {
            let mut dash = open_dashboard(&paths)?;
            report(dash.logout().map(|_| Notice::success(notice::LOGGED_OUT)), false)
        }
        Commands::Whoami => {
            let mut dash = open_dashboard(&paths)?;
            report(
                dash.current_user().map(|user| {
                    Notice::success(&format!(
                        "Hello, {} ({} saved credential(s))",
                        user.username,
                        user.details.len()
                    ))
                }),
                false,
            )
        }
        Commands::Passwd => {
            let current = prompt_secret("Current password: ")?;
            let next = prompt_secret("New password: ")?;
            let mut dash = open_dashboard(&paths)?;
            report(
                dash.change_password(&current, &next)
                    .map(|_| Notice::success(notice::PASSWORD_CHANGED)),
                false,
            )
        }
        Commands::Remove { username } => {
            let password = prompt_secret("Password: ")?;
            let mut dash = open_dashboard(&paths)?;
            report(
                dash.remove_account(&username, &password, &StdinConfirm)
                    .map(|_| Notice::success(notice::ACCOUNT_REMOVED)),
                true,
            )
        }
        Commands::Add { purpose, username } => {
            let pass = prompt_secret("Secret to store: ")?;
            let mut dash = open_dashboard(&paths)?;
            report(
                dash.append_entry(&username, &pass, &purpose)
                    .map(|_| Notice::success(notice::ENTRY_SAVED)),
                false,
            )
        }
        Commands::List => {
            let mut dash = open_dashboard(&paths)?;
            let entries = match dash.list_entries() {
                Ok(entries) => entries,
                Err(e) => return report(Err(e), false),
            };
            if entries.is_empty() {
                println!("No entries yet. Use 'add' to record one.");
            } else {
                println!("{:<24} {:<24} {}", "PURPOSE", "USERNAME", "PASSWORD");
                for entry in &entries {
                    println!("{:<24} {:<24} {}", entry.purpose, entry.username, entry.pass);
                }
            }
            log::info!("Listed {} entries.", entries.len());
            Ok(())
        }
        Commands::Users => {
            let dash = open_dashboard(&paths)?;
            let db = dash.list_users()?;
            if db.users.is_empty() {
                println!("No registered users.");
            }
            for name in db.usernames() {
                println!("{}", name);
            }
            Ok(())
        }
        Commands::Cache { action } => handle_cache_command(action, &config, &paths),
    }
}

fn handle_cache_command(action: CacheCommand, config: &Config, paths: &StoragePaths) -> AppResult<()> {
    let storage = CacheStorage::open(&paths.cache)?;
    let manifest = config.cache.manifest();
    let current = OfflineWorker::resume(&config.cache.version, manifest.clone(), &storage)?;

    match action {
        CacheCommand::Update => {
            let fetcher = HttpFetcher::new()?;
            let mut registration = WorkerRegistration::new(storage);
            registration.update(OfflineWorker::new(&config.cache.version, manifest), &fetcher)?;
            let keys = registration.storage().keys()?;
            println!("Offline cache {} installed and active. Caches: {:?}", config.cache.version, keys);
            Ok(())
        }
        CacheCommand::Fetch { url, output } => {
            let fetcher = HttpFetcher::new()?;
            let registration = WorkerRegistration::with_active(storage, current);
            let served = registration.handle_fetch(&url, &fetcher)?;
            let source = match &served {
                Served::Cache(_) => "cache",
                Served::Network(_) => "network",
            };
            let asset = served.asset();
            eprintln!("{} {} ({} bytes, from {})", asset.status, asset.url, asset.body.len(), source);
            match output {
                Some(path) => fs::write(&path, &asset.body).map_err(|e| {
                    AppError::Cli(format!("Failed to write {:?}: {}", path, e))
                })?,
                None => io::stdout()
                    .write_all(&asset.body)
                    .map_err(|e| AppError::Cli(format!("Failed to write to stdout: {}", e)))?,
            }
            Ok(())
        }
        CacheCommand::Status => {
            println!("Configured version: {} ({:?})", current.version(), current.state());
            let keys = storage.keys()?;
            if keys.is_empty() {
                println!("No caches present. Run 'cache update' to install one.");
            }
            for key in keys {
                let urls = storage.open_cache(&key)?.urls()?;
                println!("{} ({} asset(s))", key, urls.len());
                for url in urls {
                    println!("  {}", url);
                }
            }
            Ok(())
        }
    }
}
