mod codec;
mod connection;

use std::{collections::BTreeMap, io};

use log::{debug, info, warn};
use thiserror::Error;
use tokio_native_tls::native_tls;

use codec::{Response, Status};
use connection::{Connection, quote};

use super::{FolderCounts, MessageListing, Source, SourceError};
use crate::{
    config::{AuthConfig, ImapConfig},
    message::{FolderName, Message, MessageId},
};

#[derive(Debug, Error)]
pub enum ImapError {
    #[error("network error: {0}")]
    Io(#[from] io::Error),
    #[error("tls error: {0}")]
    Tls(#[from] native_tls::Error),
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),
    #[error("server closed the connection{}", .0.as_deref().map(|reason| format!(": {reason}")).unwrap_or_default())]
    Closed(Option<String>),
    #[error("unexpected greeting {0}")]
    UnexpectedGreeting(String),
    #[error("server answered {command} with {status:?}: {}", .information.as_deref().unwrap_or_default())]
    Rejected {
        command: String,
        status: Status,
        information: Option<String>,
    },
}

/// Read-only IMAP source. Folders are opened with `EXAMINE`, bodies fetched with `BODY.PEEK[]`,
/// so the server state (including `\Seen` flags) is left untouched.
#[derive(Debug)]
pub struct ImapSource {
    connection: Connection,
    /// Only these folders are exported when not empty.
    wanted: Vec<FolderName>,
    /// Normalized name to the name the server knows the folder by.
    mailboxes: BTreeMap<FolderName, String>,
    examined: Option<FolderName>,
}

impl ImapSource {
    pub async fn connect(config: &ImapConfig) -> Result<Self, SourceError> {
        let mut connection =
            Connection::connect_to(config.host(), config.port(), config.timeout()).await?;
        match config.auth() {
            AuthConfig::Plain(plain) => {
                let password = plain.password()?;
                connection
                    .send(&format!("LOGIN {} {}", quote(plain.user()), quote(&password)))
                    .await?;
                info!("logged in to {} as {}", config.host(), plain.user());
            }
        }

        Ok(Self {
            connection,
            wanted: config
                .mailboxes()
                .iter()
                .map(|mailbox| FolderName::from(mailbox.as_str()))
                .collect(),
            mailboxes: BTreeMap::new(),
            examined: None,
        })
    }

    async fn discover(&mut self) -> Result<(), SourceError> {
        let responses = self.connection.send("LIST \"\" \"*\"").await?;
        self.mailboxes.clear();
        for response in responses {
            let Response::List {
                name,
                delimiter,
                selectable,
            } = response
            else {
                continue;
            };
            if !selectable {
                debug!("skipping unselectable folder {name}");
                continue;
            }
            let folder = FolderName::normalize(&name, delimiter);
            if !self.wanted.is_empty() && !self.wanted.contains(&folder) {
                debug!("skipping unconfigured folder {folder}");
                continue;
            }
            if let Some(existing) = self.mailboxes.get(&folder) {
                warn!("folders {existing} and {name} both map to {folder}, keeping {existing}");
                continue;
            }
            self.mailboxes.insert(folder, name);
        }
        for wanted in &self.wanted {
            if !self.mailboxes.contains_key(wanted) {
                warn!("configured folder {wanted} does not exist on the server");
            }
        }

        Ok(())
    }

    /// Opens `folder` read-only and returns its message count.
    async fn examine(&mut self, folder: &FolderName) -> Result<u32, SourceError> {
        let name = self
            .mailboxes
            .get(folder)
            .ok_or_else(|| SourceError::UnknownFolder(folder.clone()))?;
        let command = format!("EXAMINE {}", quote(name));
        self.examined = None;
        let responses = self.connection.send(&command).await?;
        self.examined = Some(folder.clone());

        Ok(responses
            .iter()
            .find_map(|response| match response {
                Response::Exists(exists) => Some(*exists),
                _ => None,
            })
            .unwrap_or_default())
    }

    async fn uids(&mut self) -> Result<Vec<MessageId>, SourceError> {
        let responses = self.connection.send("UID FETCH 1:* (UID)").await?;
        let mut uids: Vec<u32> = responses
            .iter()
            .filter_map(|response| match response {
                Response::Fetch { uid, .. } => *uid,
                _ => None,
            })
            .collect();
        uids.sort_unstable();
        uids.dedup();

        Ok(uids.into_iter().map(MessageId::from).collect())
    }
}

impl Source for ImapSource {
    async fn list_folders(&mut self) -> Result<FolderCounts, SourceError> {
        self.discover().await?;
        let folders: Vec<FolderName> = self.mailboxes.keys().cloned().collect();
        let mut counts = FolderCounts::new();
        for folder in folders {
            let exists = self.examine(&folder).await?;
            counts.insert(folder, exists);
        }

        Ok(counts)
    }

    async fn list_message_ids(&mut self) -> Result<MessageListing, SourceError> {
        if self.mailboxes.is_empty() {
            self.discover().await?;
        }
        let folders: Vec<FolderName> = self.mailboxes.keys().cloned().collect();
        let mut listing = MessageListing::new();
        for folder in folders {
            let ids = if self.examine(&folder).await? == 0 {
                Vec::new()
            } else {
                self.uids().await?
            };
            debug!("folder {folder} holds {} e-mail(s)", ids.len());
            listing.insert(folder, ids);
        }

        Ok(listing)
    }

    async fn fetch_message(
        &mut self,
        id: &MessageId,
        folder: &FolderName,
    ) -> Result<Message, SourceError> {
        let unknown = || SourceError::UnknownMessage {
            folder: folder.clone(),
            id: id.clone(),
        };
        let uid: u32 = id.as_str().parse().map_err(|_| unknown())?;
        if self.examined.as_ref() != Some(folder) {
            self.examine(folder).await?;
        }

        let responses = self
            .connection
            .send(&format!("UID FETCH {uid} (BODY.PEEK[])"))
            .await?;
        let body = responses
            .into_iter()
            .find_map(|response| match response {
                Response::Fetch {
                    uid: Some(fetched),
                    body: Some(body),
                } if fetched == uid => Some(body),
                _ => None,
            })
            .ok_or_else(unknown)?;

        Ok(Message::parse(body, folder.clone(), id.clone())?)
    }

    async fn post_hook(&mut self) -> Result<(), SourceError> {
        match self.connection.send("LOGOUT").await {
            Ok(_) | Err(ImapError::Closed(_)) => Ok(()),
            Err(error) => {
                warn!("logout failed: {error}");
                Ok(())
            }
        }
    }
}
