use std::{
    fmt::{Display, Formatter, Result},
    path::PathBuf,
};

use serde::{Deserialize, Serialize};
use utf7_imap::decode_utf7_imap;

pub const SEPARATOR: char = '/';

/// Placeholder for segments that would otherwise be empty or escape the archive root.
const REPLACEMENT_SEGMENT: &str = "_";

/// Canonical name of a mailbox folder, e.g. `Inbox/Projects`.
///
/// Always valid UTF-8, segments are joined by [`SEPARATOR`], contains no NUL bytes and no empty,
/// `.` or `..` segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderName(String);

impl FolderName {
    /// Normalizes a folder name as reported by a source protocol.
    ///
    /// `raw` may be IMAP modified UTF-7, an `&` without a closing `-` is kept as is. `delimiter`
    /// is the hierarchy delimiter the protocol announced for this folder.
    pub fn normalize(raw: &str, delimiter: Option<char>) -> Self {
        let decoded = decode_utf7_imap(raw.to_string());
        let canonical: String = decoded
            .chars()
            .filter(|c| *c != '\0')
            .map(|c| {
                if Some(c) == delimiter || c == '\\' {
                    SEPARATOR
                } else {
                    c
                }
            })
            .collect();
        let segments: Vec<&str> = canonical
            .split(SEPARATOR)
            .filter(|segment| !segment.is_empty())
            .map(|segment| match segment {
                "." | ".." => REPLACEMENT_SEGMENT,
                segment => segment,
            })
            .collect();

        if segments.is_empty() {
            Self(REPLACEMENT_SEGMENT.to_string())
        } else {
            Self(segments.join("/"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Location of this folder relative to an archive root.
    pub fn to_relative_path(&self) -> PathBuf {
        self.0.split(SEPARATOR).collect()
    }
}

impl From<&str> for FolderName {
    fn from(value: &str) -> Self {
        Self::normalize(value, Some(SEPARATOR))
    }
}

impl Display for FolderName {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        self.0.fmt(f)
    }
}
