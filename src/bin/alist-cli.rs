//! alist-cli - manage AList servers from the command line
//!
//! Usage:
//!   alist-cli auth login <host> <username> <password>   Log in and store a token
//!   alist-cli fs ls <path>                              List a remote directory
//!   alist-cli fs upload <local> <remote>                Upload a file
//!
//! Tokens persist in a JSON file under the user config directory; fs and
//! admin commands look up the token for the path's server automatically.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use directories::ProjectDirs;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use alistlib::{AlistClient, AlistPath, AlistError, Credentials, Registry, ServerIdentity};

#[derive(Parser)]
#[command(name = "alist-cli")]
#[command(about = "AList file-storage client", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage server logins
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },

    /// Filesystem operations
    Fs {
        #[command(subcommand)]
        command: FsCommands,
    },

    /// Admin operations
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },
}

#[derive(Subcommand)]
enum AuthCommands {
    /// Log in and store the token locally
    Login {
        /// Server URL, e.g. http://localhost:5244
        host: String,
        username: String,
        password: String,
        /// One-time code for accounts with 2FA enabled
        #[arg(long)]
        otp: Option<String>,
    },

    /// Remove the stored token for a server
    Logout { host: String },

    /// List servers with stored tokens
    List {
        /// Also print the tokens
        #[arg(short, long)]
        token: bool,
    },
}

#[derive(Subcommand)]
enum FsCommands {
    /// List a directory (or stat a single file)
    Ls {
        /// Fully-qualified remote path, e.g. http://host:5244/local
        path: String,
    },

    /// Print a text file's contents
    Cat { path: String },

    /// Create a directory
    Mkdir {
        path: String,
        /// Create missing parents as needed
        #[arg(short, long)]
        parents: bool,
    },

    /// Remove a file or an empty directory
    Rm {
        path: String,
        /// Do not error when the path is already absent
        #[arg(long)]
        missing_ok: bool,
    },

    /// Upload a local file to a remote path
    Upload {
        local: PathBuf,
        remote: String,
        /// Defer the write to a server-side task
        #[arg(long)]
        as_task: bool,
    },

    /// Download a remote file to a local path
    Download { remote: String, local: PathBuf },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Storage backend management
    Storage {
        #[command(subcommand)]
        command: StorageCommands,
    },
}

#[derive(Subcommand)]
enum StorageCommands {
    /// List storage backends
    List { host: String },

    /// Delete a storage backend by id
    Delete { host: String, id: i64 },
}

fn auth_file() -> Result<PathBuf, AlistError> {
    let dirs = ProjectDirs::from("", "", "alist-cli")
        .ok_or_else(|| AlistError::Custom("cannot locate a config directory".to_string()))?;
    Ok(dirs.config_dir().join("auth.json"))
}

fn load_auth() -> Result<HashMap<String, String>, AlistError> {
    let file = auth_file()?;
    if !file.exists() {
        return Ok(HashMap::new());
    }
    let text = std::fs::read_to_string(&file)
        .map_err(|e| AlistError::Custom(format!("cannot read {}: {e}", file.display())))?;
    Ok(serde_json::from_str(&text)?)
}

fn save_auth(auth: &HashMap<String, String>) -> Result<(), AlistError> {
    let file = auth_file()?;
    if let Some(parent) = file.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| AlistError::Custom(format!("cannot create {}: {e}", parent.display())))?;
    }
    let text = serde_json::to_string_pretty(auth)?;
    std::fs::write(&file, text)
        .map_err(|e| AlistError::Custom(format!("cannot write {}: {e}", file.display())))
}

/// Canonical config key for a server URL.
fn server_key(url: &str) -> Result<String, AlistError> {
    Ok(ServerIdentity::parse(url)?.to_string())
}

/// Bind `path` to a client authenticated with the stored token.
async fn bind_path(registry: &Registry, path: &str) -> Result<AlistPath, AlistError> {
    let key = server_key(path)?;
    let auth = load_auth()?;
    let token = auth
        .get(&key)
        .ok_or_else(|| AlistError::Auth(format!("not logged in to {key}; run auth login")))?;
    registry.login(&key, Credentials::Token(token.clone())).await?;
    registry.path(path)
}

async fn admin_client(host: &str) -> Result<Arc<AlistClient>, AlistError> {
    let key = server_key(host)?;
    let auth = load_auth()?;
    let token = auth
        .get(&key)
        .ok_or_else(|| AlistError::Auth(format!("not logged in to {key}; run auth login")))?;
    let client = Arc::new(AlistClient::new(&key)?);
    client.set_token(token.clone());
    Ok(client)
}

fn beautify_size(byte_size: u64) -> String {
    let mut size = byte_size as f64;
    for unit in ["B", "KB", "MB"] {
        if size < 1024.0 {
            return format!("{size:.2}{unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.2}GB")
}

async fn run(command: Commands) -> Result<(), AlistError> {
    let registry = Registry::new();

    match command {
        Commands::Auth { command } => run_auth(command).await,
        Commands::Fs { command } => run_fs(&registry, command).await,
        Commands::Admin { command } => run_admin(command).await,
    }
}

async fn run_auth(command: AuthCommands) -> Result<(), AlistError> {
    match command {
        AuthCommands::Login {
            host,
            username,
            password,
            otp,
        } => {
            let key = server_key(&host)?;
            let client = AlistClient::new(&key)?;
            let me = client.login(&username, &password, otp.as_deref()).await?;
            let token = client
                .token()
                .ok_or_else(|| AlistError::Auth("login produced no token".to_string()))?;

            let mut auth = load_auth()?;
            auth.insert(key.clone(), token);
            save_auth(&auth)?;
            println!("logged in to {key} as {}", me.username);
        }
        AuthCommands::Logout { host } => {
            let key = server_key(&host)?;
            let mut auth = load_auth()?;
            if auth.remove(&key).is_none() {
                println!("no stored login for {key}");
                return Ok(());
            }
            save_auth(&auth)?;
            println!("logged out of {key}");
        }
        AuthCommands::List { token } => {
            let auth = load_auth()?;
            if auth.is_empty() {
                println!("not logged in to any server");
                return Ok(());
            }
            let mut hosts: Vec<_> = auth.iter().collect();
            hosts.sort();
            for (host, stored) in hosts {
                if token {
                    println!("{host}: {stored}");
                } else {
                    println!("{host}");
                }
            }
        }
    }
    Ok(())
}

async fn run_fs(registry: &Registry, command: FsCommands) -> Result<(), AlistError> {
    match command {
        FsCommands::Ls { path } => {
            let path = bind_path(registry, &path).await?;
            let entries = if path.is_dir().await? {
                path.iterdir().await?
            } else {
                vec![path]
            };

            let mut total = 0u64;
            for entry in entries {
                let meta = entry.stat().await?;
                total += meta.size;
                let kind = if meta.is_dir { "dir" } else { "file" };
                println!(
                    "{kind:<8}{:<10}{:<20} {}",
                    beautify_size(meta.size),
                    meta.modified.format("%Y-%m-%d %H:%M:%S"),
                    entry.name(),
                );
            }
            println!("total: {}", beautify_size(total));
        }
        FsCommands::Cat { path } => {
            let path = bind_path(registry, &path).await?;
            print!("{}", path.read_text().await?);
        }
        FsCommands::Mkdir { path, parents } => {
            let path = bind_path(registry, &path).await?;
            path.mkdir(parents, false).await?;
            println!("created {path}");
        }
        FsCommands::Rm { path, missing_ok } => {
            let path = bind_path(registry, &path).await?;
            match path.unlink(missing_ok).await {
                Err(AlistError::IsADirectory(_)) => path.rmdir(missing_ok).await?,
                other => other?,
            }
            println!("removed {path}");
        }
        FsCommands::Upload {
            local,
            remote,
            as_task,
        } => {
            let data = tokio::fs::read(&local)
                .await
                .map_err(|e| AlistError::Custom(format!("cannot read {}: {e}", local.display())))?;
            let remote = bind_path(registry, &remote).await?;
            let meta = remote.write_bytes(data, as_task).await?;
            println!("uploaded {} ({})", remote, beautify_size(meta.size));
        }
        FsCommands::Download { remote, local } => {
            let remote = bind_path(registry, &remote).await?;
            let data = remote.read_bytes().await?;
            tokio::fs::write(&local, &data)
                .await
                .map_err(|e| AlistError::Custom(format!("cannot write {}: {e}", local.display())))?;
            println!("downloaded {} ({})", local.display(), beautify_size(data.len() as u64));
        }
    }
    Ok(())
}

async fn run_admin(command: AdminCommands) -> Result<(), AlistError> {
    match command {
        AdminCommands::Storage { command } => match command {
            StorageCommands::List { host } => {
                let client = admin_client(&host).await?;
                let page = client
                    .admin_storage_list()
                    .await?
                    .into_data("/api/admin/storage/list")?;
                for storage in page.content.unwrap_or_default() {
                    println!(
                        "{:<6}{:<24}{:<16}{}",
                        storage.id, storage.mount_path, storage.driver, storage.status
                    );
                }
            }
            StorageCommands::Delete { host, id } => {
                let client = admin_client(&host).await?;
                client
                    .admin_storage_delete(id)
                    .await?
                    .ensure_ok("/api/admin/storage/delete")?;
                println!("deleted storage {id}");
            }
        },
    }
    Ok(())
}


#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("warning: logging already initialized");
    }

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
