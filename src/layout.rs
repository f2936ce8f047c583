use std::{
    fs, io,
    path::{Path, PathBuf},
};

use derive_getters::Getters;

use crate::{
    atomic_file,
    config::ConfigFile,
    message::{FolderName, Message},
};

pub const LEDGER_FILE: &str = "saved_emails.json";
pub const LOG_FILE: &str = "export.log";
pub const RAW_SOURCE_DIR: &str = ".eml";
pub const RAW_SOURCE_EXTENSION: &str = "eml";
pub const PACKAGE_EXTENSION: &str = "tar.gz";

/// Where an account's export lives on disk.
///
/// ```text
/// <archives_dir>/<address>/               archive root
///     saved_emails.json                   ledger
///     export.log
///     <folder>/<filename>.<ext>           sink output
///     <folder>/.eml/<filename>.eml        retained or fallback raw source
/// <archives_dir>/<config stem>.tar.gz     final package
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct ArchiveLayout {
    archives_dir: PathBuf,
    tmp_dir: PathBuf,
    root: PathBuf,
    stem: String,
}

impl ArchiveLayout {
    pub fn new(archives_dir: &Path, tmp_dir: &Path, address: &str, stem: &str) -> Self {
        let root = archives_dir.join(address.trim().replace(['/', '\\', '\0'], "_"));

        Self {
            archives_dir: archives_dir.to_path_buf(),
            tmp_dir: tmp_dir.to_path_buf(),
            root,
            stem: stem.to_string(),
        }
    }

    pub fn from_config(config: &ConfigFile) -> Self {
        let account = config.account();

        Self::new(
            account.archives_dir(),
            account.tmp_dir(),
            account.address(),
            &config.stem(),
        )
    }

    pub fn create_dirs(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root)?;
        fs::create_dir_all(&self.tmp_dir)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.root.join(LEDGER_FILE)
    }

    pub fn log_path(&self) -> PathBuf {
        self.root.join(LOG_FILE)
    }

    pub fn package_path(&self) -> PathBuf {
        self.archives_dir
            .join(format!("{}.{PACKAGE_EXTENSION}", self.stem))
    }

    pub fn folder_dir(&self, folder: &FolderName) -> PathBuf {
        self.root.join(folder.to_relative_path())
    }

    pub fn message_path(&self, message: &Message, filename: &str, extension: &str) -> PathBuf {
        self.folder_dir(message.folder())
            .join(format!("{filename}.{extension}"))
    }

    pub fn raw_source_path(&self, message: &Message, filename: &str) -> PathBuf {
        self.folder_dir(message.folder())
            .join(RAW_SOURCE_DIR)
            .join(format!("{filename}.{RAW_SOURCE_EXTENSION}"))
    }

    /// Stores the untouched source of `message` below its folder's raw source directory.
    pub fn write_raw_source(&self, message: &Message, filename: &str) -> io::Result<PathBuf> {
        let path = self.raw_source_path(message, filename);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        atomic_file::write(&path, message.raw())?;

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::message::MessageBuilder;

    #[test]
    fn test_paths_follow_layout() {
        let layout = ArchiveLayout::new(
            Path::new("/archives"),
            Path::new("/tmp/staging"),
            "me@example.com",
            "work",
        );
        let message = MessageBuilder::default()
            .folder(FolderName::normalize("INBOX.Sub", Some('.')))
            .id("3")
            .build()
            .unwrap();

        assert_eq!(layout.root(), Path::new("/archives/me@example.com"));
        assert_eq!(
            layout.ledger_path(),
            Path::new("/archives/me@example.com/saved_emails.json")
        );
        assert_eq!(layout.package_path(), Path::new("/archives/work.tar.gz"));
        assert_eq!(
            layout.message_path(&message, "email-3", "html"),
            Path::new("/archives/me@example.com/INBOX/Sub/email-3.html")
        );
        assert_eq!(
            layout.raw_source_path(&message, "email-3"),
            Path::new("/archives/me@example.com/INBOX/Sub/.eml/email-3.eml")
        );
    }

    #[test]
    fn test_address_cannot_escape_archives_dir() {
        let layout = ArchiveLayout::new(Path::new("/archives"), Path::new("/tmp"), "../x", "a");

        assert_eq!(layout.root(), Path::new("/archives/.._x"));
    }

    #[test]
    fn test_write_raw_source_creates_directories() {
        let dir = tempdir().unwrap();
        let layout = ArchiveLayout::new(dir.path(), dir.path(), "me@example.com", "work");
        let message = MessageBuilder::default()
            .folder("Inbox")
            .id("1")
            .raw(b"Subject: hi\r\n\r\nbody".to_vec())
            .build()
            .unwrap();

        let path = layout.write_raw_source(&message, "email-1").unwrap();

        assert_eq!(fs::read(path).unwrap(), message.raw());
    }
}
