use crate::services::signing::Credentials;
use anyhow::{Context, Result, bail};
use clap::Parser;
use std::env;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Store folder every archive object is uploaded under.
    pub namespace: String,
    pub max_upload_bytes: usize,
    pub credentials: Credentials,
    pub api_base: String,
    pub delivery_host: String,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Document archive API backed by Cloudinary")]
pub struct Args {
    /// Host to bind to (overrides ARCHIVE_STORE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides ARCHIVE_STORE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides ARCHIVE_STORE_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Store folder for uploaded objects (overrides ARCHIVE_STORE_NAMESPACE)
    #[arg(long)]
    pub namespace: Option<String>,

    /// Largest accepted upload in bytes (overrides ARCHIVE_STORE_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("ARCHIVE_STORE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = parse_env("ARCHIVE_STORE_PORT", 3000u16)?;
        let env_db = env::var("ARCHIVE_STORE_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/meta/archives.db".into());
        let env_namespace =
            env::var("ARCHIVE_STORE_NAMESPACE").unwrap_or_else(|_| "app_archives".into());
        let env_max_upload =
            parse_env("ARCHIVE_STORE_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;

        // Store credentials are read here once and never per request.
        let credentials = Credentials {
            cloud_name: require_env("CLOUDINARY_CLOUD_NAME")?,
            api_key: require_env("CLOUDINARY_API_KEY")?,
            api_secret: require_env("CLOUDINARY_API_SECRET")?,
        };
        let api_base = env::var("CLOUDINARY_API_BASE")
            .unwrap_or_else(|_| "https://api.cloudinary.com".into());
        let delivery_host = env::var("CLOUDINARY_DELIVERY_HOST")
            .unwrap_or_else(|_| "res.cloudinary.com".into())
            .to_ascii_lowercase();

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            database_url: args.database_url.unwrap_or(env_db),
            namespace: args.namespace.unwrap_or(env_namespace),
            max_upload_bytes: args.max_upload_bytes.unwrap_or(env_max_upload),
            credentials,
            api_base,
            delivery_host,
        };

        if cfg.namespace.trim_matches('/').is_empty() {
            bail!("namespace must not be empty");
        }

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_env<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}

fn require_env(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        Ok(_) | Err(env::VarError::NotPresent) => bail!("{} must be set", name),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}
