use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::info;

#[rego_derive::rego_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

/// Loads configuration from a file plus environment overrides.
///
/// 1. **Base File**: `path`, or `server` (any supported extension, e.g. `server.toml`)
///    in the working directory. An explicit path must exist; the default file is optional,
///    so a bare deployment runs on defaults.
/// 2. **Environment Overrides**: variables prefixed with `REGO__`, nested with double
///    underscores (`REGO__DATABASE__URL` maps to `database.url`).
///
/// # Errors
/// Returns an error if an explicit file is missing, a source fails to parse, or
/// the merged values do not deserialize into `T`.
///
/// # Example
/// ```rust
/// use rego_kernel::config::load_config;
///
/// #[derive(Default, serde::Deserialize)]
/// struct AppConfig {
///     port: u16,
/// }
///
/// let cfg: AppConfig = load_config(Some("config/local")).unwrap_or_default();
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let required = path.is_some();
    let effective_path = path.map_or_else(|| PathBuf::from("server"), |p| p.as_ref().to_path_buf());

    let builder = Config::builder()
        .add_source(File::from(effective_path.as_path()).required(required))
        .add_source(
            Environment::with_prefix("REGO")
                .prefix_separator("__")
                .separator("__")
                .convert_case(config::Case::Snake)
                .try_parsing(true),
        );

    info!(path = %effective_path.display(), required, "Loading config");

    let config = builder
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")?;

    Ok(config)
}
