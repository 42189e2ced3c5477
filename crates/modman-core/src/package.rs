use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ModError;

const MAX_PACKAGE_ID_LEN: usize = 100;

/// Opaque catalog key for one add-on package.
///
/// The identifier doubles as the name of the package's install and staging
/// directories, so it is restricted to a path-safe character set.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageId(String);

impl PackageId {
    pub fn parse(value: impl Into<String>) -> Result<Self, ModError> {
        let value = value.into();
        validate_package_id(&value)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn validate_package_id(value: &str) -> Result<(), ModError> {
    let invalid = |reason| ModError::InvalidPackageId {
        value: value.to_string(),
        reason,
    };

    if value.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if value.len() > MAX_PACKAGE_ID_LEN {
        return Err(invalid("must be at most 100 characters"));
    }
    if value.starts_with('.') {
        return Err(invalid("must not start with '.'"));
    }
    if !value
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.')
    {
        return Err(invalid(
            "may only contain ASCII letters, digits, '-', '_' and '.'",
        ));
    }

    Ok(())
}

impl TryFrom<String> for PackageId {
    type Error = ModError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<PackageId> for String {
    fn from(value: PackageId) -> Self {
        value.0
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: String,
    #[serde(rename = "repo")]
    pub id: PackageId,
}

/// The published list of installable packages.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Catalog {
    #[serde(rename = "mods", default)]
    pub entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn from_json_slice(input: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(input)
    }

    pub fn find(&self, id: &PackageId) -> Option<&CatalogEntry> {
        self.entries.iter().find(|entry| &entry.id == id)
    }

    /// Looks an entry up by identifier first, then by case-insensitive display name.
    pub fn lookup(&self, query: &str) -> Option<&CatalogEntry> {
        self.entries
            .iter()
            .find(|entry| entry.id.as_str() == query)
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|entry| entry.name.eq_ignore_ascii_case(query))
            })
    }
}
