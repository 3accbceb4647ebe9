//! Licensor command-line tool.
//!
//! Issues and verifies device-bound license tokens, and runs the remote
//! authority used by online and dual verification.
//!
//! Usage:
//!   licensor keygen --out-dir keys
//!   licensor issue --private-key keys/private_key.pem --aes-key keys/aes_key.bin \
//!       --expiry 2026-12-31 --out license.lic
//!   licensor verify --public-key keys/public_key.pem --aes-key keys/aes_key.bin \
//!       --license license.lic
//!   licensor token --db licensor.db --app-id my-app
//!   licensor serve --db licensor.db --require-token

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use licensor_crypto::{generate_signing_key, SymmetricKey};
use licensor_license::{
    derive_device_id, issue, load_token_from_file, parse_expiry_date, DeviceInfo, IssuerKeys,
    LicenseType, OnlineConfig, Verifier, VerifierKeys, VerifyContext, VerifyResult,
};
use licensor_server::auth::{new_token_record, TokenType};
use licensor_server::keyfiles::{write_key_files, AES_KEY_FILE, PRIVATE_KEY_FILE, PUBLIC_KEY_FILE};
use licensor_server::sqlite::SqliteStore;
use licensor_server::store::{LicenseRecord, LicenseStore, TokenStore};
use licensor_server::{build_router, AppState};
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "licensor")]
#[command(about = "Issue and verify device-bound license tokens")]
struct Args {
    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate an RSA-4096 key pair and an AES-256 key
    Keygen {
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,

        /// Overwrite existing key files
        #[arg(long)]
        force: bool,
    },

    /// Issue a license token
    Issue {
        #[arg(long, default_value = "private_key.pem")]
        private_key: PathBuf,

        #[arg(long, default_value = "aes_key.bin")]
        aes_key: PathBuf,

        /// Device to bind to (defaults to this machine)
        #[arg(long)]
        device_id: Option<String>,

        /// Expiry date, YYYY-MM-DD (midnight UTC)
        #[arg(long)]
        expiry: String,

        #[arg(long = "type", value_enum, default_value_t = Mode::Offline)]
        license_type: Mode,

        /// Feature to unlock (repeatable)
        #[arg(long = "feature")]
        features: Vec<String>,

        /// Write the token here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Also record the license in this database for the server
        #[arg(long, env = "LICENSOR_DB")]
        db: Option<PathBuf>,
    },

    /// Verify a license token
    Verify {
        #[arg(long, value_enum, default_value_t = Mode::Offline)]
        mode: Mode,

        /// License token file (offline and dual)
        #[arg(short, long, default_value = "license.lic")]
        license: PathBuf,

        #[arg(long, default_value = "public_key.pem")]
        public_key: PathBuf,

        #[arg(long, default_value = "aes_key.bin")]
        aes_key: PathBuf,

        /// Device to verify for (defaults to this machine)
        #[arg(long)]
        device_id: Option<String>,

        /// Authority base URL (online and dual)
        #[arg(long, env = "LICENSOR_API_URL")]
        api_url: Option<String>,

        #[arg(long, env = "LICENSOR_APP_ID", default_value = "")]
        app_id: String,

        /// Request timeout in seconds
        #[arg(long, default_value = "10")]
        timeout: u64,

        /// Extra attempts after a transport failure
        #[arg(long, default_value = "0")]
        retries: u32,

        #[arg(long, env = "LICENSOR_API_TOKEN", hide_env_values = true)]
        api_token: Option<String>,
    },

    /// Print this machine's device id
    DeviceId {
        /// Also print OS, hostname and architecture
        #[arg(long)]
        info: bool,
    },

    /// Create an API token in the database, or revoke one
    Token {
        #[arg(long, env = "LICENSOR_DB", default_value = "licensor.db")]
        db: PathBuf,

        #[arg(long = "type", default_value = "client")]
        token_type: TokenType,

        #[arg(long, default_value = "")]
        app_id: String,

        /// Days until expiry, 0 for no practical expiry
        #[arg(long, default_value = "0")]
        days: u32,

        /// Revoke this token instead of creating one
        #[arg(long, value_name = "TOKEN", conflicts_with_all = ["token_type", "app_id", "days"])]
        revoke: Option<String>,
    },

    /// Run the remote authority
    Serve {
        #[arg(long, default_value = "0.0.0.0")]
        bind: IpAddr,

        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Record database, shared with `issue --db` and `token`
        #[arg(long, env = "LICENSOR_DB", default_value = "licensor.db")]
        db: PathBuf,

        /// Require a bearer token on every API request
        #[arg(long)]
        require_token: bool,

        /// Public key for checking license keys sent to verify/dual
        #[arg(long, requires = "aes_key")]
        public_key: Option<PathBuf>,

        #[arg(long, requires = "public_key")]
        aes_key: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    Offline,
    Online,
    Dual,
}

impl From<Mode> for LicenseType {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Offline => LicenseType::Offline,
            Mode::Online => LicenseType::Online,
            Mode::Dual => LicenseType::Dual,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_ascii_lowercase()));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    match args.command {
        Command::Keygen { out_dir, force } => keygen(&out_dir, force),
        Command::Issue {
            private_key,
            aes_key,
            device_id,
            expiry,
            license_type,
            features,
            out,
            db,
        } => {
            let keys = IssuerKeys::load(&private_key, &aes_key)
                .context("Failed to load issuer keys")?;
            let device_id = resolve_device_id(device_id)?;
            let expiry_date = parse_expiry_date(&expiry)?;

            let token = issue(
                &device_id,
                license_type.into(),
                expiry_date,
                features,
                keys.signing_key(),
                keys.symmetric_key(),
            )?;

            if let Some(path) = db {
                let store = SqliteStore::open(&path).context("Failed to open record database")?;
                let id = store.save_license(LicenseRecord {
                    id: 0,
                    device_id: device_id.clone(),
                    license_key: token.clone(),
                    license_type: license_type.into(),
                    expiry_date,
                    created_at: Utc::now(),
                })?;
                info!("Recorded license {} in {:?}", id, path);
            }

            match out {
                Some(path) => {
                    fs::write(&path, &token).context("Failed to write license file")?;
                    info!("License written to {:?}", path);
                }
                None => println!("{token}"),
            }
            Ok(())
        }
        Command::Verify {
            mode,
            license,
            public_key,
            aes_key,
            device_id,
            api_url,
            app_id,
            timeout,
            retries,
            api_token,
        } => {
            let device_id = resolve_device_id(device_id)?;
            let online_config = || -> Result<OnlineConfig> {
                let api_url = api_url
                    .clone()
                    .context("--api-url is required for online and dual verification")?;
                let mut config = OnlineConfig::new(api_url, app_id.clone())
                    .with_retries(retries)
                    .with_timeout(Duration::from_secs(timeout));
                config.api_token = api_token.clone();
                Ok(config)
            };
            let offline_keys = || {
                VerifierKeys::load(&public_key, &aes_key).context("Failed to load verifier keys")
            };

            let verifier = match mode {
                Mode::Offline => Verifier::offline(offline_keys()?),
                Mode::Online => Verifier::online(online_config()?)?,
                Mode::Dual => Verifier::dual(offline_keys()?, online_config()?)?,
            };

            let token = match mode {
                Mode::Online => None,
                Mode::Offline | Mode::Dual => Some(load_token_from_file(&license)?),
            };
            let ctx = VerifyContext {
                token: token.as_deref(),
                device_id: &device_id,
            };

            match verifier.verify(ctx).await {
                Ok(result) => {
                    print_result(&result)?;
                    Ok(())
                }
                Err(rejection) => {
                    if let Some(result) = &rejection.result {
                        print_result(result)?;
                    }
                    bail!("License verification failed: {}", rejection.error)
                }
            }
        }
        Command::DeviceId { info } => {
            println!("{}", derive_device_id()?);
            if info {
                let device = DeviceInfo::collect()?;
                println!("{}", serde_json::to_string_pretty(&device)?);
            }
            Ok(())
        }
        Command::Token {
            db,
            token_type,
            app_id,
            days,
            revoke,
        } => {
            let store = SqliteStore::open(&db).context("Failed to open record database")?;
            if let Some(token) = revoke {
                if !store.revoke_token(&token)? {
                    bail!("No such token in {:?}", db);
                }
                info!("Revoked token in {:?}", db);
                return Ok(());
            }

            if token_type == TokenType::Client && app_id.is_empty() {
                bail!("--app-id is required for client tokens");
            }
            let record = new_token_record(token_type, &app_id, days);
            let token = record.token.clone();
            let id = store.save_token(record)?;
            info!("Added {} token {} to {:?}", token_type, id, db);
            println!("{token}");
            Ok(())
        }
        Command::Serve {
            bind,
            port,
            db,
            require_token,
            public_key,
            aes_key,
        } => {
            let keys = match (public_key, aes_key) {
                (Some(public_key), Some(aes_key)) => Some(
                    VerifierKeys::load(&public_key, &aes_key)
                        .context("Failed to load verifier keys")?,
                ),
                _ => None,
            };
            serve(bind, port, &db, require_token, keys).await
        }
    }
}

fn keygen(out_dir: &Path, force: bool) -> Result<()> {
    if !force {
        if let Some(existing) = [PRIVATE_KEY_FILE, PUBLIC_KEY_FILE, AES_KEY_FILE]
            .into_iter()
            .map(|name| out_dir.join(name))
            .find(|path| path.exists())
        {
            bail!("{:?} already exists (use --force to overwrite)", existing);
        }
    }

    info!("Generating RSA-4096 key pair, this can take a while...");
    let signing_key = generate_signing_key()?;
    let symmetric_key = SymmetricKey::generate();

    write_key_files(out_dir, &signing_key, &symmetric_key, force)
        .context("Failed to write key files")?;

    info!("Keys written to {:?}", out_dir);
    warn!("Keep private_key.pem secret; distribute public_key.pem and aes_key.bin to verifiers");
    Ok(())
}

async fn serve(
    bind: IpAddr,
    port: u16,
    db: &Path,
    require_token: bool,
    keys: Option<VerifierKeys>,
) -> Result<()> {
    info!("Using record database {:?}", db);
    let store = Arc::new(SqliteStore::open(db).context("Failed to open record database")?);

    let mut state = AppState::new(store).with_token_enforcement(require_token);
    match keys {
        Some(keys) => state = state.with_verifier_keys(keys),
        None => info!("No verifier keys given; verify/dual will not inspect license keys"),
    }
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind((bind, port))
        .await
        .with_context(|| format!("Failed to bind {bind}:{port}"))?;
    info!("License authority listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await.context("HTTP server failed")?;
    Ok(())
}

fn resolve_device_id(device_id: Option<String>) -> Result<String> {
    match device_id {
        Some(id) => Ok(id),
        None => derive_device_id().context("Failed to derive device id"),
    }
}

fn print_result(result: &VerifyResult) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}
