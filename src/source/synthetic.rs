use std::collections::BTreeMap;

use log::info;

use super::{FolderCounts, MessageListing, Source, SourceError};
use crate::message::{FolderName, Message, MessageId};

/// In-memory source with a fixed set of messages.
#[derive(Debug, Default)]
pub struct SyntheticSource {
    folders: BTreeMap<FolderName, Vec<(MessageId, Vec<u8>)>>,
    fetched: Vec<(FolderName, MessageId)>,
    hooks: Vec<&'static str>,
}

impl SyntheticSource {
    /// `Inbox` with two received messages and `Sent` with one message sent by `address`.
    pub fn demo(address: &str) -> Self {
        Self::default()
            .with_message(
                "Inbox",
                1,
                &raw_message(
                    "Alice Example <alice@example.com>",
                    address,
                    "Welcome aboard",
                    "Mon, 8 Jan 2024 09:15:00 +0100",
                    "Glad to have you with us.",
                ),
            )
            .with_message(
                "Inbox",
                2,
                &raw_message(
                    "Bob <bob@example.com>",
                    address,
                    "Lunch on Friday?",
                    "Tue, 9 Jan 2024 11:30:00 +0100",
                    "Usual place at noon?",
                ),
            )
            .with_message(
                "Sent",
                3,
                &raw_message(
                    address,
                    "Bob <bob@example.com>",
                    "Re: Lunch on Friday?",
                    "Tue, 9 Jan 2024 12:02:00 +0100",
                    "Sounds good.",
                ),
            )
    }

    pub fn with_message(mut self, folder: &str, id: u32, raw: &str) -> Self {
        self.folders
            .entry(FolderName::from(folder))
            .or_default()
            .push((id.into(), raw.as_bytes().to_vec()));
        self
    }

    pub fn with_folder(mut self, folder: &str) -> Self {
        self.folders.entry(FolderName::from(folder)).or_default();
        self
    }

    /// Every fetch in call order.
    pub fn fetched(&self) -> &[(FolderName, MessageId)] {
        &self.fetched
    }

    pub fn hooks(&self) -> &[&'static str] {
        &self.hooks
    }
}

impl Source for SyntheticSource {
    async fn list_folders(&mut self) -> Result<FolderCounts, SourceError> {
        Ok(self
            .folders
            .iter()
            .map(|(folder, messages)| {
                let count = u32::try_from(messages.len()).unwrap_or(u32::MAX);
                (folder.clone(), count)
            })
            .collect())
    }

    async fn list_message_ids(&mut self) -> Result<MessageListing, SourceError> {
        Ok(self
            .folders
            .iter()
            .map(|(folder, messages)| {
                let ids = messages.iter().map(|(id, _)| id.clone()).collect();
                (folder.clone(), ids)
            })
            .collect())
    }

    async fn fetch_message(
        &mut self,
        id: &MessageId,
        folder: &FolderName,
    ) -> Result<Message, SourceError> {
        let messages = self
            .folders
            .get(folder)
            .ok_or_else(|| SourceError::UnknownFolder(folder.clone()))?;
        let (_, raw) = messages
            .iter()
            .find(|(candidate, _)| candidate == id)
            .ok_or_else(|| SourceError::UnknownMessage {
                folder: folder.clone(),
                id: id.clone(),
            })?;
        let message = Message::parse(raw.clone(), folder.clone(), id.clone())?;
        self.fetched.push((folder.clone(), id.clone()));

        Ok(message)
    }

    async fn pre_hook(&mut self) -> Result<(), SourceError> {
        info!("synthetic source ready");
        self.hooks.push("pre");
        Ok(())
    }

    async fn post_hook(&mut self) -> Result<(), SourceError> {
        self.hooks.push("post");
        Ok(())
    }
}

fn raw_message(from: &str, to: &str, subject: &str, date: &str, body: &str) -> String {
    format!(
        "From: {from}\r\nTo: {to}\r\nSubject: {subject}\r\nDate: {date}\r\n\
         MIME-Version: 1.0\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{body}\r\n"
    )
}
