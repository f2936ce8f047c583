use std::path::PathBuf;

use log::info;

use super::{Sink, SinkContext, SinkError};
use crate::{message::Message, source::FolderCounts};

/// Writes nothing. Useful to try a source configuration.
#[derive(Debug)]
pub struct LogSink {
    context: SinkContext,
}

impl LogSink {
    pub fn new(context: SinkContext) -> Self {
        Self { context }
    }
}

impl Sink for LogSink {
    fn context(&self) -> &SinkContext {
        &self.context
    }

    fn prepare_folders(&mut self, folders: &FolderCounts) -> Result<(), SinkError> {
        for (folder, count) in folders {
            info!("would create folder {folder} for {count} e-mail(s)");
        }

        Ok(())
    }

    fn persist(&mut self, message: &Message) -> Result<(), SinkError> {
        info!(
            "would save e-mail ({}) in folder {} as {} ({} recipient(s), {} attachment(s))",
            message.id(),
            message.folder(),
            self.context.filename(message),
            message.recipients().count(),
            message.attachments().len()
        );

        Ok(())
    }

    fn persist_fallback(&mut self, message: &Message) -> Result<PathBuf, SinkError> {
        let path = self
            .context
            .layout()
            .raw_source_path(message, &self.context.filename(message));
        info!("would save raw e-mail ({}) to {}", message.id(), path.display());

        Ok(path)
    }
}
