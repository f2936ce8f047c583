use std::{
    collections::BTreeMap,
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use derive_getters::Getters;
use serde::{Deserialize, Serialize};

use super::{AuthConfig, ConfigError, RunState, data_home};
use crate::atomic_file;

const ARCHIVES_DIR: &str = "archives";
const DEFAULT_IMAP_PORT: u16 = 993;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct ImapConfig {
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    auth: AuthConfig,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
    /// Folders to export. Empty means every selectable folder.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    mailboxes: Vec<String>,
}

impl ImapConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_port() -> u16 {
    DEFAULT_IMAP_PORT
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
pub struct AccountConfig {
    /// Mailbox owner, used to tell sent from received mail.
    address: String,
    source: String,
    sink: String,
    #[serde(default)]
    archives_dir: PathBuf,
    #[serde(default)]
    tmp_dir: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    imap: Option<ImapConfig>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    options: BTreeMap<String, toml::Value>,
    #[getter(skip)]
    #[serde(flatten)]
    extra: toml::Table,
    #[getter(skip)]
    #[serde(default)]
    run: RunState,
}

impl AccountConfig {
    /// Whether an option is set to a truthy value (`true`, non-zero or `"1"`).
    pub fn option_enabled(&self, key: &str) -> bool {
        match self.options.get(key) {
            Some(toml::Value::Boolean(enabled)) => *enabled,
            Some(toml::Value::Integer(value)) => *value != 0,
            Some(toml::Value::String(value)) => {
                matches!(value.trim(), "1" | "true" | "yes" | "on")
            }
            _ => false,
        }
    }
}

/// An account file on disk together with its parsed contents.
///
/// The `[run]` section is the only part the application modifies, every update is written back
/// atomically before the call returns.
#[derive(Debug)]
pub struct ConfigFile {
    path: PathBuf,
    account: AccountConfig,
}

impl ConfigFile {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let mut account: AccountConfig =
            toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?;

        if account.archives_dir.as_os_str().is_empty() {
            account.archives_dir = data_home()?.join(ARCHIVES_DIR);
        }
        if account.tmp_dir.as_os_str().is_empty() {
            account.tmp_dir = env::temp_dir().join(env!("CARGO_PKG_NAME"));
        }

        Ok(Self { path, account })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name without extension, names the final package.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map_or_else(|| "archive".to_string(), |stem| stem.to_string_lossy().into_owned())
    }

    pub fn account(&self) -> &AccountConfig {
        &self.account
    }

    pub fn run(&self) -> &RunState {
        &self.account.run
    }

    pub fn update_run(&mut self, update: impl FnOnce(&mut RunState)) -> Result<(), ConfigError> {
        update(&mut self.account.run);
        self.save()
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let contents = toml::to_string(&self.account)?;

        atomic_file::write(&self.path, contents.as_bytes()).map_err(|source| ConfigError::Write {
            path: self.path.clone(),
            source,
        })
    }
}
