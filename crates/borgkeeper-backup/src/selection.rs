//! Choosing the archive to restore

use borgkeeper_core::{Error, Result};
use borgkeeper_repo::ArchiveEntry;
use std::fmt;

/// How the archive to restore is picked
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    /// Exact archive name
    Name(String),
    /// 1-based position in the newest-first listing
    Index(usize),
    /// Index override that is not a number; rejected when resolved
    InvalidIndex(String),
    /// Most recent archive
    #[default]
    Latest,
}

impl Selection {
    /// Build from optional overrides; a name takes precedence over an index
    pub fn from_overrides(name: Option<String>, index: Option<String>) -> Self {
        let name = name.filter(|n| !n.trim().is_empty());
        let index = index.filter(|i| !i.trim().is_empty());
        match (name, index) {
            (Some(name), _) => Self::Name(name.trim().to_string()),
            (None, Some(index)) => match index.trim().parse() {
                Ok(index) => Self::Index(index),
                Err(_) => Self::InvalidIndex(index.trim().to_string()),
            },
            (None, None) => Self::Latest,
        }
    }

    /// Resolve against a newest-first listing
    pub fn resolve<'a>(&self, archives: &'a [ArchiveEntry]) -> Result<&'a ArchiveEntry> {
        if archives.is_empty() {
            return Err(Error::NoArchives);
        }

        match self {
            Self::Name(name) => archives
                .iter()
                .find(|a| &a.name == name)
                .ok_or_else(|| Error::not_found(name.clone())),
            Self::Index(index) => {
                if *index < 1 || *index > archives.len() {
                    return Err(Error::range(*index, archives.len()));
                }
                Ok(&archives[index - 1])
            }
            Self::InvalidIndex(value) => Err(Error::invalid_index(value.clone())),
            Self::Latest => Ok(&archives[0]),
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "name '{}'", name),
            Self::Index(index) => write!(f, "index {}", index),
            Self::InvalidIndex(value) => write!(f, "index '{}'", value),
            Self::Latest => f.write_str("latest"),
        }
    }
}
