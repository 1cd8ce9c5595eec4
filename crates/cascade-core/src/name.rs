//! Directory entry names.

use std::ffi::{OsStr, OsString};
use std::fmt;

use compact_str::CompactString;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The name of one directory entry.
///
/// Names that are not valid UTF-8 keep their raw form so that paths joined
/// from them still reach the entry. The printable form is then lossy and
/// only meant for display.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryName {
    display: CompactString,
    raw: Option<OsString>,
}

impl EntryName {
    /// A name that is valid UTF-8.
    pub fn new(name: impl Into<CompactString>) -> Self {
        Self {
            display: name.into(),
            raw: None,
        }
    }

    /// A name as read from the filesystem.
    pub fn from_os(name: OsString) -> Self {
        match name.into_string() {
            Ok(name) => Self::new(name),
            Err(raw) => Self {
                display: CompactString::from(raw.to_string_lossy()),
                raw: Some(raw),
            },
        }
    }

    /// Printable form.
    pub fn as_str(&self) -> &str {
        &self.display
    }

    /// The name as it is stored on disk. Use this to build paths.
    pub fn as_os_str(&self) -> &OsStr {
        match &self.raw {
            Some(raw) => raw,
            None => OsStr::new(self.display.as_str()),
        }
    }

    /// Whether the printable form differs from the stored name.
    pub fn is_lossy(&self) -> bool {
        self.raw.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.as_os_str().is_empty()
    }
}

impl AsRef<OsStr> for EntryName {
    fn as_ref(&self) -> &OsStr {
        self.as_os_str()
    }
}

impl AsRef<std::path::Path> for EntryName {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(self.as_os_str())
    }
}

impl From<&str> for EntryName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for EntryName {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<CompactString> for EntryName {
    fn from(name: CompactString) -> Self {
        Self::new(name)
    }
}

impl From<OsString> for EntryName {
    fn from(name: OsString) -> Self {
        Self::from_os(name)
    }
}

impl PartialEq<str> for EntryName {
    fn eq(&self, other: &str) -> bool {
        !self.is_lossy() && self.display == other
    }
}

impl PartialEq<&str> for EntryName {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

impl fmt::Display for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl Serialize for EntryName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.display)
    }
}

impl<'de> Deserialize<'de> for EntryName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        CompactString::deserialize(deserializer).map(Self::new)
    }
}
