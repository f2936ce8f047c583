mod imap;
mod synthetic;

use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter},
    str::FromStr,
};

use thiserror::Error;

pub use imap::{ImapError, ImapSource};
pub use synthetic::SyntheticSource;

use crate::{
    config::{AccountConfig, ConfigError},
    message::{FolderName, Message, MessageBuilderError, MessageId},
};

/// Message count per folder.
pub type FolderCounts = BTreeMap<FolderName, u32>;
/// Message ids per folder, in the order they should be exported.
pub type MessageListing = BTreeMap<FolderName, Vec<MessageId>>;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Imap(#[from] ImapError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("unknown source adapter \"{0}\", expected one of: {names}", names = SourceKind::names())]
    Unknown(String),
    #[error("folder {0} does not exist")]
    UnknownFolder(FolderName),
    #[error("e-mail ({id}) does not exist in folder {folder}")]
    UnknownMessage { folder: FolderName, id: MessageId },
    #[error("cannot assemble e-mail: {0}")]
    Message(#[from] MessageBuilderError),
}

impl SourceError {
    /// Whether only the affected message is lost, as opposed to the whole connection.
    pub fn is_message_scoped(&self) -> bool {
        matches!(self, Self::UnknownMessage { .. } | Self::Message(_))
    }
}

/// Origin of the messages to export.
///
/// A source is driven by exactly one engine task, calls never overlap.
pub trait Source {
    async fn list_folders(&mut self) -> Result<FolderCounts, SourceError>;

    async fn list_message_ids(&mut self) -> Result<MessageListing, SourceError>;

    async fn fetch_message(
        &mut self,
        id: &MessageId,
        folder: &FolderName,
    ) -> Result<Message, SourceError>;

    /// Option keys that must not be enabled together with this source.
    fn disallowed_options(&self) -> &'static [&'static str] {
        &[]
    }

    async fn pre_hook(&mut self) -> Result<(), SourceError> {
        Ok(())
    }

    async fn post_hook(&mut self) -> Result<(), SourceError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Imap,
    Synthetic,
}

impl SourceKind {
    pub const ALL: [Self; 2] = [Self::Imap, Self::Synthetic];

    pub fn names() -> String {
        Self::ALL.map(Self::name).join(", ")
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Imap => "imap",
            Self::Synthetic => "test",
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            Self::Imap => "reads every selectable folder of an IMAP account over TLS",
            Self::Synthetic => "serves three built-in e-mails in Inbox and Sent",
        }
    }

    pub fn required_keys(self) -> &'static [&'static str] {
        match self {
            Self::Imap => &["imap.host", "imap.auth.user"],
            Self::Synthetic => &[],
        }
    }

    pub fn optional_keys(self) -> &'static [&'static str] {
        match self {
            Self::Imap => &[
                "imap.port",
                "imap.timeout_secs",
                "imap.mailboxes",
                "imap.auth.password",
                "imap.auth.password_cmd",
            ],
            Self::Synthetic => &["address"],
        }
    }

    pub async fn connect(self, account: &AccountConfig) -> Result<AnySource, SourceError> {
        match self {
            Self::Imap => {
                let imap = account
                    .imap()
                    .as_ref()
                    .ok_or_else(|| ConfigError::MissingImap(self.name().to_string()))?;
                Ok(AnySource::Imap(ImapSource::connect(imap).await?))
            }
            Self::Synthetic => Ok(AnySource::Synthetic(SyntheticSource::demo(
                account.address(),
            ))),
        }
    }
}

impl Display for SourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SourceKind {
    type Err = SourceError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| SourceError::Unknown(name.to_string()))
    }
}

/// Any registered source, selected by name at startup.
#[derive(Debug)]
pub enum AnySource {
    Imap(ImapSource),
    Synthetic(SyntheticSource),
}

impl Source for AnySource {
    async fn list_folders(&mut self) -> Result<FolderCounts, SourceError> {
        match self {
            Self::Imap(source) => source.list_folders().await,
            Self::Synthetic(source) => source.list_folders().await,
        }
    }

    async fn list_message_ids(&mut self) -> Result<MessageListing, SourceError> {
        match self {
            Self::Imap(source) => source.list_message_ids().await,
            Self::Synthetic(source) => source.list_message_ids().await,
        }
    }

    async fn fetch_message(
        &mut self,
        id: &MessageId,
        folder: &FolderName,
    ) -> Result<Message, SourceError> {
        match self {
            Self::Imap(source) => source.fetch_message(id, folder).await,
            Self::Synthetic(source) => source.fetch_message(id, folder).await,
        }
    }

    fn disallowed_options(&self) -> &'static [&'static str] {
        match self {
            Self::Imap(source) => source.disallowed_options(),
            Self::Synthetic(source) => source.disallowed_options(),
        }
    }

    async fn pre_hook(&mut self) -> Result<(), SourceError> {
        match self {
            Self::Imap(source) => source.pre_hook().await,
            Self::Synthetic(source) => source.pre_hook().await,
        }
    }

    async fn post_hook(&mut self) -> Result<(), SourceError> {
        match self {
            Self::Imap(source) => source.post_hook().await,
            Self::Synthetic(source) => source.post_hook().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::*;

    use super::*;

    #[rstest]
    #[case("imap", SourceKind::Imap)]
    #[case("IMAP", SourceKind::Imap)]
    #[case("test", SourceKind::Synthetic)]
    fn test_source_kind_from_name(#[case] name: &str, #[case] expected: SourceKind) {
        assert_eq!(name.parse::<SourceKind>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_source_is_rejected() {
        let error = "pop3".parse::<SourceKind>().unwrap_err();

        assert_eq!(
            error.to_string(),
            "unknown source adapter \"pop3\", expected one of: imap, test"
        );
    }

    #[test]
    fn test_message_scoped_errors() {
        let missing = SourceError::UnknownMessage {
            folder: "Inbox".into(),
            id: 1.into(),
        };

        assert!(missing.is_message_scoped());
        assert!(!SourceError::Unknown("x".to_string()).is_message_scoped());
    }
}
