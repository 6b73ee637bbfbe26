use anyhow::{Context, Result, bail};
use clap::Parser;
use std::env;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    /// Shared secret for `x-api-key` on the upload endpoint. `None` disables the check.
    pub api_key: Option<String>,
    pub imagekit: ImageKitConfig,
}

/// Credentials and endpoints for the external image host.
#[derive(Debug, Clone)]
pub struct ImageKitConfig {
    pub public_key: String,
    pub private_key: String,
    pub url_endpoint: String,
    pub upload_endpoint: String,
}

const DEFAULT_UPLOAD_ENDPOINT: &str = "https://upload.imagekit.io/api/v1/files/upload";

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Image upload backend with flat-file metadata storage")]
pub struct Args {
    /// Host to bind to (overrides IMAGEGEN_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides IMAGEGEN_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where metadata records are stored (overrides IMAGEGEN_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Shared secret required in the x-api-key header (overrides BACKEND_API_KEY)
    #[arg(long)]
    pub api_key: Option<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    ///
    /// The ImageKit credentials have no sane defaults; all missing ones are
    /// reported in a single error so the caller decides whether to abort.
    pub fn from_env_and_args() -> Result<Self> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("IMAGEGEN_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("IMAGEGEN_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing IMAGEGEN_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading IMAGEGEN_PORT"),
        };
        let env_storage =
            env::var("IMAGEGEN_STORAGE_DIR").unwrap_or_else(|_| "./storage/metadata".into());
        let env_api_key = env::var("BACKEND_API_KEY").ok();

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            api_key: args.api_key.or(env_api_key).filter(|key| !key.is_empty()),
            imagekit: ImageKitConfig::from_env()?,
        };

        Ok(cfg)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl ImageKitConfig {
    /// Read the ImageKit credentials, reporting every absent variable at once.
    fn from_env() -> Result<Self> {
        let read = |name: &'static str| env::var(name).ok().filter(|value| !value.is_empty());

        let public_key = read("IMAGEKIT_PUBLIC_KEY");
        let private_key = read("IMAGEKIT_PRIVATE_KEY");
        let url_endpoint = read("IMAGEKIT_URL_ENDPOINT");

        let missing: Vec<&str> = [
            ("IMAGEKIT_PUBLIC_KEY", &public_key),
            ("IMAGEKIT_PRIVATE_KEY", &private_key),
            ("IMAGEKIT_URL_ENDPOINT", &url_endpoint),
        ]
        .iter()
        .filter(|(_, value)| value.is_none())
        .map(|(name, _)| *name)
        .collect();

        let (Some(public_key), Some(private_key), Some(url_endpoint)) =
            (public_key, private_key, url_endpoint)
        else {
            bail!(
                "missing required environment variables: {}",
                missing.join(", ")
            );
        };

        Ok(Self {
            public_key,
            private_key,
            url_endpoint,
            upload_endpoint: env::var("IMAGEKIT_UPLOAD_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_UPLOAD_ENDPOINT.into()),
        })
    }
}
