//! Compass configuration.
//!
//! Loaded from `~/.compass/config.toml`. Every key is optional and a missing
//! file means all defaults. `COMPASS_*` environment variables override the file:
//!
//! ```toml
//! data-dir = "/srv/compass"
//! bind = "0.0.0.0:5001"
//! server-url = "https://compass.example.com"
//! token = "..."
//! log-filter = "compass=debug,tower_http=info"
//! max-upload-bytes = 5242880
//! ```

use std::{env, fs, io, path::PathBuf};

use serde::Deserialize;

use crate::storage::Storage;

pub const DEFAULT_BIND: &str = "127.0.0.1:5001";
pub const DEFAULT_LOG_FILTER: &str = "compass=info,tower_http=info";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine home directory")]
    NoHome,

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// The file as written; absent keys fall back to the environment or defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct FileConfig {
    data_dir: Option<PathBuf>,
    bind: Option<String>,
    server_url: Option<String>,
    token: Option<String>,
    log_filter: Option<String>,
    max_upload_bytes: Option<usize>,
}

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Where the database, assets, and working draft live.
    pub data_dir: PathBuf,

    /// Address `compass serve` listens on.
    pub bind: String,

    /// When set, journey commands go to this server instead of local storage.
    pub server_url: Option<String>,

    /// Session token for the remote server.
    pub token: Option<String>,

    pub log_filter: String,

    pub max_upload_bytes: usize,
}

impl Config {
    /// Load config from `~/.compass/config.toml` and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path().ok_or(ConfigError::NoHome)?;
        let file = match fs::read_to_string(&path) {
            Ok(contents) => toml::from_str(&contents)
                .map_err(|source| ConfigError::Parse { path, source })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => FileConfig::default(),
            Err(source) => return Err(ConfigError::Read { path, source }),
        };
        Self::resolve(file, |var| env::var(var).ok())
    }

    /// The config file path: `~/.compass/config.toml`.
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".compass").join("config.toml"))
    }

    fn resolve(
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let var = |name: &str| env(name).filter(|v| !v.is_empty());

        let data_dir = match var("COMPASS_DATA_DIR").map(PathBuf::from).or(file.data_dir) {
            Some(dir) => dir,
            None => Storage::default_root().ok_or(ConfigError::NoHome)?,
        };

        let server_url = var("COMPASS_SERVER_URL").or(file.server_url);
        if let Some(url) = &server_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            return Err(ConfigError::Invalid {
                key: "server-url",
                reason: format!("'{url}' is not an http(s) URL"),
            });
        }

        Ok(Self {
            data_dir,
            bind: var("COMPASS_BIND")
                .or(file.bind)
                .unwrap_or_else(|| DEFAULT_BIND.to_string()),
            server_url,
            token: var("COMPASS_TOKEN").or(file.token),
            log_filter: file
                .log_filter
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
            max_upload_bytes: file.max_upload_bytes.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
        })
    }

    /// Resolve the session token: explicit `--token`, then `COMPASS_TOKEN`,
    /// then the config file. The last two are already merged at load time.
    pub fn resolve_token(&self, explicit: Option<&str>) -> Option<String> {
        explicit
            .filter(|t| !t.is_empty())
            .map(String::from)
            .or_else(|| self.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> FileConfig {
        toml::from_str(toml).unwrap()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config = Config::resolve(
            parse("data-dir = \"/tmp/compass\""),
            no_env,
        )
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/compass"));
        assert_eq!(config.bind, DEFAULT_BIND);
        assert_eq!(config.server_url, None);
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
    }

    #[test]
    fn file_keys_are_kebab_case() {
        let config = Config::resolve(
            parse(
                r#"
                data-dir = "/srv/compass"
                bind = "0.0.0.0:8080"
                server-url = "https://compass.example.com"
                token = "from-file"
                log-filter = "compass=debug"
                max-upload-bytes = 1024
                "#,
            ),
            no_env,
        )
        .unwrap();
        assert_eq!(config.bind, "0.0.0.0:8080");
        assert_eq!(config.server_url.as_deref(), Some("https://compass.example.com"));
        assert_eq!(config.token.as_deref(), Some("from-file"));
        assert_eq!(config.log_filter, "compass=debug");
        assert_eq!(config.max_upload_bytes, 1024);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<FileConfig>("colour = \"blue\"").is_err());
    }

    #[test]
    fn environment_overrides_file() {
        let env = |var: &str| match var {
            "COMPASS_DATA_DIR" => Some("/env/data".to_string()),
            "COMPASS_BIND" => Some("127.0.0.1:9000".to_string()),
            "COMPASS_TOKEN" => Some("from-env".to_string()),
            "COMPASS_SERVER_URL" => Some(String::new()),
            _ => None,
        };
        let config = Config::resolve(
            parse(
                r#"
                data-dir = "/file/data"
                token = "from-file"
                server-url = "http://file.example.com"
                "#,
            ),
            env,
        )
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/env/data"));
        assert_eq!(config.bind, "127.0.0.1:9000");
        assert_eq!(config.token.as_deref(), Some("from-env"));
        // Empty variables count as unset.
        assert_eq!(config.server_url.as_deref(), Some("http://file.example.com"));
    }

    #[test]
    fn server_url_must_be_http() {
        let err = Config::resolve(
            parse("data-dir = \"/d\"\nserver-url = \"compass.example.com\""),
            no_env,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn explicit_token_wins() {
        let config = Config::resolve(parse("data-dir = \"/d\"\ntoken = \"saved\""), no_env).unwrap();
        assert_eq!(config.resolve_token(Some("flag")).as_deref(), Some("flag"));
        assert_eq!(config.resolve_token(None).as_deref(), Some("saved"));
        assert_eq!(config.resolve_token(Some("")).as_deref(), Some("saved"));
    }
}
