use std::{
    collections::{BTreeMap, BTreeSet},
    fs, io,
    path::{Path, PathBuf},
};

use log::{debug, warn};
use thiserror::Error;

use crate::{
    atomic_file,
    message::{FolderName, MessageId},
};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("cannot serialize ledger: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("cannot write ledger {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Durable record of every message that has been persisted, keyed by folder.
///
/// Saved as a JSON object mapping folder names to arrays of message ids.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    saved: BTreeMap<FolderName, BTreeSet<MessageId>>,
}

impl Ledger {
    /// Reads the ledger at `path`. Missing files start empty, unreadable ones are reported and
    /// start empty as well.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let saved = match fs::read(&path) {
            Ok(contents) => serde_json::from_slice(&contents).unwrap_or_else(|error| {
                warn!(
                    "ledger {} is corrupt, starting with an empty one: {error}",
                    path.display()
                );
                BTreeMap::new()
            }),
            Err(error) if error.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(error) => {
                warn!(
                    "cannot read ledger {}, starting with an empty one: {error}",
                    path.display()
                );
                BTreeMap::new()
            }
        };

        Self { path, saved }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_saved(&self, folder: &FolderName, id: &MessageId) -> bool {
        self.saved.get(folder).is_some_and(|ids| ids.contains(id))
    }

    /// Records a saved message and writes the ledger through before returning.
    pub fn mark_saved(&mut self, folder: &FolderName, id: &MessageId) -> Result<(), LedgerError> {
        if self
            .saved
            .entry(folder.clone())
            .or_default()
            .insert(id.clone())
        {
            self.flush()?;
        }
        debug!("marked e-mail ({id}) in folder {folder} as saved");

        Ok(())
    }

    pub fn flush(&self) -> Result<(), LedgerError> {
        let contents = serde_json::to_vec_pretty(&self.saved)?;

        atomic_file::write(&self.path, &contents).map_err(|source| LedgerError::Write {
            path: self.path.clone(),
            source,
        })
    }

    /// Number of saved messages over all folders.
    pub fn len(&self) -> usize {
        self.saved.values().map(BTreeSet::len).sum()
    }

    pub fn folders(&self) -> impl Iterator<Item = (&FolderName, usize)> {
        self.saved.iter().map(|(folder, ids)| (folder, ids.len()))
    }
}

#[cfg(test)]
mod tests {
    use assertables::*;
    use rstest::*;
    use tempfile::{TempDir, tempdir};

    use super::*;

    #[fixture]
    fn dir() -> TempDir {
        tempdir().unwrap()
    }

    #[rstest]
    fn test_missing_ledger_is_empty(dir: TempDir) {
        let ledger = Ledger::load(dir.path().join("saved_emails.json"));

        assert_eq!(ledger.len(), 0);
        assert!(!ledger.is_saved(&"Inbox".into(), &1.into()));
    }

    #[rstest]
    fn test_mark_saved_is_durable(dir: TempDir) {
        let path = dir.path().join("saved_emails.json");
        let mut ledger = Ledger::load(&path);

        assert_ok!(ledger.mark_saved(&"Inbox".into(), &1.into()));
        assert_ok!(ledger.mark_saved(&"Inbox".into(), &2.into()));
        assert_ok!(ledger.mark_saved(&"Sent".into(), &1.into()));

        let reloaded = Ledger::load(&path);
        assert_eq!(reloaded.len(), 3);
        assert!(reloaded.is_saved(&"Sent".into(), &1.into()));
        assert!(!reloaded.is_saved(&"Sent".into(), &2.into()));
        assert_eq!(
            reloaded.folders().collect::<Vec<_>>(),
            vec![(&FolderName::from("Inbox"), 2), (&FolderName::from("Sent"), 1)]
        );
    }

    #[rstest]
    fn test_mark_saved_twice_keeps_one_entry(dir: TempDir) {
        let mut ledger = Ledger::load(dir.path().join("saved_emails.json"));

        assert_ok!(ledger.mark_saved(&"Inbox".into(), &1.into()));
        assert_ok!(ledger.mark_saved(&"Inbox".into(), &1.into()));

        assert_eq!(ledger.len(), 1);
    }

    #[rstest]
    fn test_ledger_is_plain_json(dir: TempDir) {
        let path = dir.path().join("saved_emails.json");
        let mut ledger = Ledger::load(&path);
        ledger.mark_saved(&"Inbox".into(), &7.into()).unwrap();

        let json: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();

        assert_eq!(json, serde_json::json!({ "Inbox": ["7"] }));
    }

    #[rstest]
    fn test_corrupt_ledger_starts_empty(dir: TempDir) {
        let path = dir.path().join("saved_emails.json");
        fs::write(&path, "{ not json").unwrap();

        let ledger = Ledger::load(&path);

        assert_eq!(ledger.len(), 0);
    }

    #[rstest]
    fn test_unwritable_ledger_reports_error(dir: TempDir) {
        let mut ledger = Ledger::load(dir.path().join("missing/saved_emails.json"));

        assert_err!(ledger.mark_saved(&"Inbox".into(), &1.into()));
    }
}
