use log::debug;

use super::{Sink, SinkContext, SinkError};
use crate::{atomic_file, layout::RAW_SOURCE_EXTENSION, message::Message};

/// Stores messages as their untouched source.
#[derive(Debug)]
pub struct EmlSink {
    context: SinkContext,
}

impl EmlSink {
    pub fn new(context: SinkContext) -> Self {
        Self { context }
    }
}

impl Sink for EmlSink {
    fn context(&self) -> &SinkContext {
        &self.context
    }

    fn persist(&mut self, message: &Message) -> Result<(), SinkError> {
        let filename = self.context.filename(message);
        let path = self
            .context
            .layout()
            .message_path(message, &filename, RAW_SOURCE_EXTENSION);

        debug!("writing e-mail ({}) to {}", message.id(), path.display());
        atomic_file::write(&path, message.raw()).map_err(SinkError::io(path))
    }

    /// The output already is the raw source.
    fn disallowed_options(&self) -> &'static [&'static str] {
        &["keep_source"]
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use assertables::*;
    use tempfile::tempdir;

    use super::*;
    use crate::{
        layout::ArchiveLayout,
        message::{FolderName, MessageBuilder},
        source::FolderCounts,
    };

    #[test]
    fn test_persist_writes_raw_source_into_folder() {
        let dir = tempdir().unwrap();
        let layout = ArchiveLayout::new(dir.path(), dir.path(), "me@example.com", "work");
        let mut sink = EmlSink::new(SinkContext::new(layout.clone(), "me@example.com"));
        let message = MessageBuilder::default()
            .folder("Inbox")
            .id("9")
            .raw(b"Subject: hi\r\n\r\nbody\r\n".to_vec())
            .build()
            .unwrap();
        let folders = FolderCounts::from([(FolderName::from("Inbox"), 1)]);

        assert_ok!(sink.prepare_folders(&folders));
        assert_ok!(sink.persist(&message));

        let written = fs::read(layout.root().join("Inbox/email-9.eml")).unwrap();
        assert_eq!(written, message.raw());
    }

    #[test]
    fn test_persist_fails_without_prepared_folder() {
        let dir = tempdir().unwrap();
        let layout = ArchiveLayout::new(dir.path(), dir.path(), "me@example.com", "work");
        let mut sink = EmlSink::new(SinkContext::new(layout, "me@example.com"));
        let message = MessageBuilder::default()
            .folder("Nowhere")
            .id("1")
            .build()
            .unwrap();

        assert_err!(sink.persist(&message));
    }
}
