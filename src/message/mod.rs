mod filename;
mod folder;
mod id;
mod mail;

pub use filename::{derive_filename, sanitize};
pub use folder::FolderName;
pub use id::MessageId;
pub use mail::{Address, Message, MessageBuilderError};
#[cfg(test)]
pub use mail::{Attachment, MessageBuilder};
