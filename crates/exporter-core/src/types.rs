//! Common types for export operations.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Visibility of a destination repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    #[default]
    Private,
}

impl Visibility {
    pub fn is_private(&self) -> bool {
        matches!(self, Self::Private)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Self::Public),
            "private" => Ok(Self::Private),
            other => Err(format!("Invalid visibility specifier '{other}'")),
        }
    }
}

/// What an export does when the destination name is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Leave the existing repository alone and skip the project.
    #[default]
    Skip,
    /// Delete the existing repository and export anew.
    Overwrite,
    /// Accepted for compatibility; behaves like [`ConflictPolicy::Skip`].
    Porcelain,
}

impl ConflictPolicy {
    /// Whether an existing destination repository is replaced.
    pub fn overwrites(&self) -> bool {
        matches!(self, Self::Overwrite)
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => write!(f, "skip"),
            Self::Overwrite => write!(f, "overwrite"),
            Self::Porcelain => write!(f, "porcelain"),
        }
    }
}

/// One project to export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDescriptor {
    /// Project name on the source host.
    pub source: String,
    /// Repository name on the destination host.
    pub destination: String,
    pub visibility: Visibility,
}

impl ProjectDescriptor {
    pub fn new(
        source: impl Into<String>,
        destination: impl Into<String>,
        visibility: Visibility,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            visibility,
        }
    }

    /// Task identity, `<source>-><destination>`.
    pub fn id(&self) -> String {
        format!("{}->{}", self.source, self.destination)
    }

    /// Label shown next to the progress bar.
    pub fn label(&self) -> String {
        if self.source == self.destination {
            format!("[{}]", self.source)
        } else {
            format!("[{} -> {}]", self.source, self.destination)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility_parse() {
        assert_eq!("public".parse::<Visibility>(), Ok(Visibility::Public));
        assert_eq!("private".parse::<Visibility>(), Ok(Visibility::Private));
        assert_eq!(
            "secret".parse::<Visibility>(),
            Err("Invalid visibility specifier 'secret'".to_string())
        );
    }

    #[test]
    fn test_descriptor_identity() {
        let renamed = ProjectDescriptor::new("alpha", "beta", Visibility::Public);
        assert_eq!(renamed.id(), "alpha->beta");
        assert_eq!(renamed.label(), "[alpha -> beta]");

        let same = ProjectDescriptor::new("alpha", "alpha", Visibility::Private);
        assert_eq!(same.label(), "[alpha]");
    }

    #[test]
    fn test_only_overwrite_replaces() {
        assert!(ConflictPolicy::Overwrite.overwrites());
        assert!(!ConflictPolicy::Skip.overwrites());
        assert!(!ConflictPolicy::Porcelain.overwrites());
    }
}
