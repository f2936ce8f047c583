mod account;
mod auth;
mod run_state;

use std::{
    env, io,
    path::{Path, PathBuf},
};

use thiserror::Error;

pub use account::{AccountConfig, ConfigFile, ImapConfig};
pub use auth::AuthConfig;
pub use run_state::{RunState, SyncState};

const ACCOUNTS_DIR: &str = "accounts";
const ACCOUNT_EXTENSION: &str = "toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("neither XDG_{0}_HOME nor HOME is set")]
    NoHome(&'static str),
    #[error("cannot read account file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("cannot parse account file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("cannot serialize account file: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("cannot write account file {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("account has neither password nor password_cmd")]
    MissingPassword,
    #[error("cannot run password_cmd `{command}`: {source}")]
    PasswordCommand { command: String, source: io::Error },
    #[error("password_cmd `{0}` did not print a password")]
    EmptyPassword(String),
    #[error("source `{0}` requires an [imap] section")]
    MissingImap(String),
}

/// Location of an account file.
///
/// `account` is either a path to an existing file or a name resolved as
/// `<config dir>/accounts/<account>.toml`.
pub fn account_file(config_dir: Option<&Path>, account: &str) -> Result<PathBuf, ConfigError> {
    let direct = PathBuf::from(account);
    if direct.is_file() {
        return Ok(direct);
    }
    let config_dir = match config_dir {
        Some(config_dir) => config_dir.to_path_buf(),
        None => config_home()?,
    };

    Ok(config_dir
        .join(ACCOUNTS_DIR)
        .join(format!("{account}.{ACCOUNT_EXTENSION}")))
}

pub fn config_home() -> Result<PathBuf, ConfigError> {
    xdg_home("CONFIG", ".config")
}

pub fn data_home() -> Result<PathBuf, ConfigError> {
    xdg_home("DATA", ".local/share")
}

fn xdg_home(kind: &'static str, fallback: &str) -> Result<PathBuf, ConfigError> {
    let mut home = if let Some(xdg_home) = env::var_os(format!("XDG_{kind}_HOME")) {
        PathBuf::from(xdg_home)
    } else {
        let mut home = PathBuf::from(env::var_os("HOME").ok_or(ConfigError::NoHome(kind))?);
        home.push(fallback);
        home
    };
    home.push(env!("CARGO_PKG_NAME"));

    Ok(home)
}
