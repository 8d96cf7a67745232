use std::{fs, path::PathBuf};

use common::session::Session;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

pub const APP_NAME: &str = "envcrypt";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DEFAULT_API_URL: &str = "https://api.envcrypt.dev";
pub const DEFAULT_LOG_LEVEL: &str = "warn";
/// Overrides `api_url` from the config file
pub const API_URL_ENV: &str = "ENVCRYPT_API_URL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// The logged-in user, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub email: String,
    pub user_id: Uuid,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            log_level: default_log_level(),
            session: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the envcrypt directory (~/.envcrypt)
    pub envcrypt_dir: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the envcrypt directory path (custom or default ~/.envcrypt)
    pub fn envcrypt_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }
        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new envcrypt directory with a config file
    pub fn init(custom_path: Option<PathBuf>, config: AppConfig) -> Result<Self, StateError> {
        let envcrypt_dir = Self::envcrypt_dir(custom_path)?;
        let config_path = envcrypt_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Err(StateError::AlreadyInitialized);
        }

        fs::create_dir_all(&envcrypt_dir)?;
        let state = Self {
            envcrypt_dir,
            config_path,
            config,
        };
        state.save()?;
        Ok(state)
    }

    /// Load existing state from the envcrypt directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let envcrypt_dir = Self::envcrypt_dir(custom_path)?;
        let config_path = envcrypt_dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            return Err(StateError::NotInitialized);
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            envcrypt_dir,
            config_path,
            config,
        })
    }

    /// Load existing state, or defaults if `init` has not been run
    pub fn load_or_default(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        match Self::load(custom_path.clone()) {
            Err(StateError::NotInitialized) => {
                let envcrypt_dir = Self::envcrypt_dir(custom_path)?;
                Ok(Self {
                    config_path: envcrypt_dir.join(CONFIG_FILE_NAME),
                    envcrypt_dir,
                    config: AppConfig::default(),
                })
            }
            other => other,
        }
    }

    pub fn save(&self) -> Result<(), StateError> {
        fs::create_dir_all(&self.envcrypt_dir)?;
        let config_toml = toml::to_string_pretty(&self.config)?;
        fs::write(&self.config_path, config_toml)?;
        Ok(())
    }

    /// Resolve the API base url
    ///
    /// Priority: explicit `--remote` > `ENVCRYPT_API_URL` > config `api_url`.
    pub fn api_url(&self, explicit: Option<Url>) -> Result<Url, StateError> {
        if let Some(url) = explicit {
            return Ok(url);
        }
        let configured = std::env::var(API_URL_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| self.config.api_url.clone());
        Url::parse(&configured).map_err(|e| StateError::InvalidApiUrl(configured, e))
    }

    /// The logged-in user
    pub fn session(&self) -> Result<Session, StateError> {
        self.config
            .session
            .as_ref()
            .map(|s| Session::new(s.email.clone(), s.user_id))
            .ok_or(StateError::NotLoggedIn)
    }

    pub fn set_session(&mut self, session: Option<&Session>) -> Result<(), StateError> {
        self.config.session = session.map(|s| SessionConfig {
            email: s.email.clone(),
            user_id: s.user_id,
        });
        self.save()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("envcrypt directory not initialized. Run 'envcrypt init' first")]
    NotInitialized,

    #[error("envcrypt directory already initialized")]
    AlreadyInitialized,

    #[error("not logged in. Run 'envcrypt login' first")]
    NotLoggedIn,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("invalid api url {0:?}: {1}")]
    InvalidApiUrl(String, url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_init_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("envcrypt");

        let state = AppState::init(Some(path.clone()), AppConfig::default()).unwrap();
        assert!(state.config_path.exists());

        let loaded = AppState::load(Some(path.clone())).unwrap();
        assert_eq!(loaded.config, AppConfig::default());

        assert!(matches!(
            AppState::init(Some(path), AppConfig::default()),
            Err(StateError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_load_uninitialized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing");
        assert!(matches!(
            AppState::load(Some(path.clone())),
            Err(StateError::NotInitialized)
        ));

        let state = AppState::load_or_default(Some(path)).unwrap();
        assert_eq!(state.config.api_url, DEFAULT_API_URL);
        assert!(matches!(state.session(), Err(StateError::NotLoggedIn)));
    }

    #[test]
    fn test_session_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_path_buf();
        let mut state = AppState::init(Some(path.clone()), AppConfig::default()).unwrap();

        let session = Session::new("alice@example.com", Uuid::new_v4());
        state.set_session(Some(&session)).unwrap();
        assert_eq!(AppState::load(Some(path.clone())).unwrap().session().unwrap(), session);

        state.set_session(None).unwrap();
        assert!(AppState::load(Some(path)).unwrap().session().is_err());
    }

    #[test]
    fn test_config_fills_defaults() {
        let config: AppConfig = toml::from_str("api_url = \"http://localhost:8000\"\n").unwrap();
        assert_eq!(config.api_url, "http://localhost:8000");
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert!(config.session.is_none());
    }

    #[test]
    fn test_explicit_remote_wins() {
        let state = AppState {
            envcrypt_dir: PathBuf::from("/tmp"),
            config_path: PathBuf::from("/tmp/config.toml"),
            config: AppConfig::default(),
        };
        let explicit = Url::parse("http://example.com:9999").unwrap();
        assert_eq!(state.api_url(Some(explicit.clone())).unwrap(), explicit);
    }
}
