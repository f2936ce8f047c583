use std::process::Command;

use derive_getters::Getters;
use serde::{Deserialize, Serialize};

use super::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct PlainAuthConfig {
    user: String,
    #[getter(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password: Option<String>,
    #[getter(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password_cmd: Option<String>,
}

impl PlainAuthConfig {
    /// Literal `password` wins over `password_cmd`, whose trimmed stdout is used otherwise.
    pub fn password(&self) -> Result<String, ConfigError> {
        if let Some(password) = &self.password {
            return Ok(password.clone());
        }
        let password_cmd = self
            .password_cmd
            .as_deref()
            .ok_or(ConfigError::MissingPassword)?;

        let mut cmd_parts = password_cmd.split_whitespace();
        let program = cmd_parts.next().ok_or(ConfigError::MissingPassword)?;
        let output = Command::new(program)
            .args(cmd_parts)
            .output()
            .map_err(|source| ConfigError::PasswordCommand {
                command: password_cmd.to_string(),
                source,
            })?;
        let password = String::from_utf8_lossy(&output.stdout)
            .trim_end()
            .to_string();
        if !output.status.success() || password.is_empty() {
            return Err(ConfigError::EmptyPassword(password_cmd.to_string()));
        }

        Ok(password)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuthConfig {
    Plain(PlainAuthConfig),
}
