use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tokio::{
    fs::{OpenOptions, create_dir_all, read_to_string},
    io::AsyncWriteExt,
};
use vigil_bridge::config::Config;

/// Overrides the WebSocket URL of the `server` section.
pub const SERVER_URL_ENV: &str = "VIGIL_SERVER_URL";
/// Overrides the HTTP base URL of the `server` section.
pub const HTTP_URL_ENV: &str = "VIGIL_HTTP_URL";

/// Errors that can occur while loading or resolving application configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to determine the user's configuration or data directories. This
    /// usually occurs when required environment variables are missing (e.g.,
    /// `$HOME` on Unix or `%APPDATA%` on Windows).
    #[error("failed to obtain user's directories")]
    DirectoriesNotFound,
    /// An I/O error occurred while reading or writing the configuration file.
    #[error("failed to read config: {0}")]
    IoError(#[from] std::io::Error),
    /// The configuration file contains invalid TOML or does not match the expected structure.
    #[error("failed to deserialize config: {0}")]
    DeserializeError(#[from] toml::de::Error),
    /// Failed to serialize the configuration to TOML (e.g., when saving changes).
    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

/// Directories the backend reads from and writes to.
#[derive(Debug, Clone)]
pub struct Paths {
    pub config_file: PathBuf,
    /// Holds the persisted key-value store and downloaded exports.
    pub data_dir: PathBuf,
}

impl Paths {
    pub fn exports_dir(&self) -> PathBuf {
        self.data_dir.join("exports")
    }

    pub fn store_file(&self) -> PathBuf {
        self.data_dir.join("state.json")
    }

    /// Paths relative to the working directory, for systems without a home
    /// directory.
    pub fn local() -> Self {
        Self {
            config_file: PathBuf::from("config.toml"),
            data_dir: PathBuf::from("data"),
        }
    }
}

fn build_project_dirs() -> Result<Paths, ConfigError> {
    match ProjectDirs::from("dev", "vigil", "vigil") {
        Some(dirs) => Ok(Paths {
            config_file: dirs.config_dir().join("config.toml"),
            data_dir: dirs.data_dir().to_path_buf(),
        }),
        None => Err(ConfigError::DirectoriesNotFound),
    }
}

/// Loads the application configuration from the user's config directory,
/// applying environment overrides. Returns the config and the resolved paths.
pub async fn load_config() -> Result<(Config, Paths), ConfigError> {
    let paths = build_project_dirs()?;
    let mut config = load_config_from(&paths.config_file).await?;
    apply_overrides(&mut config, |name| std::env::var(name).ok());
    Ok((config, paths))
}

/// Loads `config.toml` from `path`, writing the defaults there first if the
/// file does not exist yet.
pub async fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    log::info!("Loading configuration from {path:?}");
    if path.exists() {
        let contents = read_to_string(path).await?;
        let config: Config = toml::from_str(&contents)?;
        return Ok(config);
    }

    let config = Config::default();
    if let Some(parent) = path.parent() {
        create_dir_all(parent).await?;
    }

    let contents = toml::to_string_pretty(&config)?;
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(contents.as_bytes()).await?;
    file.sync_all().await?;

    Ok(config)
}

/// Replaces server URLs with values found through `lookup`.
pub fn apply_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(url) = lookup(SERVER_URL_ENV).filter(|url| !url.is_empty()) {
        log::info!("Using socket URL from {SERVER_URL_ENV}");
        config.server.socket_url = url;
    }
    if let Some(url) = lookup(HTTP_URL_ENV).filter(|url| !url.is_empty()) {
        log::info!("Using HTTP URL from {HTTP_URL_ENV}");
        config.server.http_url = url;
    }
}

/// Saves the configuration as pretty-printed TOML, overwriting `path`.
pub async fn save_config_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent).await?;
    }

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .await?;

    let contents = toml::to_string_pretty(config)?;
    file.write_all(contents.as_bytes()).await?;
    file.sync_all().await?;

    Ok(())
}
