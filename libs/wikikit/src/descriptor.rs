use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use semver::Version;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while building a module descriptor.
#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("module name must not be empty")]
    EmptyName,
    #[error("invalid version bound '{value}'")]
    InvalidVersion {
        value: String,
        #[source]
        source: semver::Error,
    },
}

/// Metadata record describing an installable extension unit (plugin,
/// filter, editor, ...).
///
/// A descriptor's identity is its `name`: equality, ordering and hashing
/// use the name alone, so collections of descriptors sort and deduplicate
/// by module name regardless of the attached metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleDescriptor {
    pub name: String,
    /// Lowest engine version the module declares support for.
    /// `None` means unbounded below.
    #[serde(default)]
    pub min_version: Option<Version>,
    /// Highest engine version the module declares support for.
    /// `None` means unbounded above.
    #[serde(default)]
    pub max_version: Option<Version>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub author_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ModuleDescriptor {
    /// Descriptor for `name` with no version bounds and no metadata.
    pub fn new(name: impl Into<String>) -> Result<Self, DescriptorError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DescriptorError::EmptyName);
        }
        Ok(Self {
            name,
            min_version: None,
            max_version: None,
            author: None,
            author_url: None,
            description: None,
        })
    }

    pub fn with_min_version(mut self, v: Version) -> Self {
        self.min_version = Some(v);
        self
    }

    pub fn with_max_version(mut self, v: Version) -> Self {
        self.max_version = Some(v);
        self
    }

    /// Parse both bounds from version strings, e.g. `("2.8.0", "3.0.0")`.
    pub fn with_version_range(self, min: &str, max: &str) -> Result<Self, DescriptorError> {
        Ok(self
            .with_min_version(parse_version(min)?)
            .with_max_version(parse_version(max)?))
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_author_url(mut self, url: impl Into<String>) -> Self {
        self.author_url = Some(url.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Parse a version bound, keeping the offending input in the error.
pub fn parse_version(value: &str) -> Result<Version, DescriptorError> {
    Version::parse(value).map_err(|source| DescriptorError::InvalidVersion {
        value: value.to_string(),
        source,
    })
}

impl PartialEq for ModuleDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ModuleDescriptor {}

impl PartialOrd for ModuleDescriptor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ModuleDescriptor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

impl Hash for ModuleDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.min_version, &self.max_version) {
            (None, None) => write!(f, "{}", self.name),
            (Some(min), None) => write!(f, "{} (>= {})", self.name, min),
            (None, Some(max)) => write!(f, "{} (<= {})", self.name, max),
            (Some(min), Some(max)) => write!(f, "{} ({min}..={max})", self.name),
        }
    }
}
