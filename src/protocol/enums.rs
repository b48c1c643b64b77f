//! Enumerations scoped to an interface.
//!
//! Built once from the protocol description and shared read-only.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::validator::{self, EnumKind};
use crate::types::{Error, Result};
use crate::validation::{validate_non_empty, validate_since};

fn default_since() -> u32 {
    1
}

/// One named constant of an enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumEntry {
    pub name: String,
    /// Declared value. Negative values travel as the low 32 bits of their
    /// two's-complement form.
    pub value: i64,
    #[serde(default = "default_since")]
    pub since: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated_since: Option<u32>,
}

impl EnumEntry {
    pub fn new(name: impl Into<String>, value: i64, since: u32) -> Self {
        Self {
            name: name.into(),
            value,
            since,
            deprecated_since: None,
        }
    }

    pub fn deprecated(mut self, since: u32) -> Self {
        self.deprecated_since = Some(since);
        self
    }

    /// Value as it appears on the wire.
    pub fn wire_value(&self) -> u32 {
        self.value as u32
    }

    /// Whether the entry is deprecated at `version`. Deprecated entries are
    /// still accepted by validation.
    pub fn is_deprecated_at(&self, version: u32) -> bool {
        self.deprecated_since.is_some_and(|d| version >= d)
    }
}

/// A named set of constants with a validity rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enumeration {
    pub name: String,
    #[serde(default)]
    pub kind: EnumKind,
    #[serde(default)]
    pub entries: Vec<EnumEntry>,
}

impl Enumeration {
    pub fn new(name: impl Into<String>, kind: EnumKind) -> Self {
        Self {
            name: name.into(),
            kind,
            entries: Vec::new(),
        }
    }

    pub fn scalar(name: impl Into<String>) -> Self {
        Self::new(name, EnumKind::Scalar)
    }

    pub fn bitfield(name: impl Into<String>) -> Self {
        Self::new(name, EnumKind::Bitfield)
    }

    pub fn entry(mut self, entry: EnumEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Look up an entry by name.
    pub fn get(&self, name: &str) -> Option<&EnumEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Look up the entry carrying a wire value (first match for scalars).
    pub fn find_value(&self, value: u32) -> Option<&EnumEntry> {
        self.entries.iter().find(|e| e.wire_value() == value)
    }

    fn wire_table(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.entries.iter().map(|e| (e.wire_value(), e.since))
    }

    /// Whether `value` is legal for an object bound at `version`.
    pub fn accepts(&self, value: u32, version: u32) -> bool {
        validator::accepts(self.kind, self.wire_table(), value, version)
    }

    /// Alias matching the generated call-site name.
    pub fn is_valid(&self, value: u32, version: u32) -> bool {
        self.accepts(value, version)
    }

    /// OR of all flags available at `version` (meaningful for bitfields).
    pub fn allowed_mask(&self, version: u32) -> u32 {
        validator::allowed_mask(self.wire_table(), version)
    }

    /// Construction-time consistency check against the owning interface.
    pub(crate) fn check(&self, interface: &str, max_version: u32) -> Result<()> {
        validate_non_empty(&self.name, &format!("{}: enum name", interface))?;
        let mut seen = HashSet::new();
        for entry in &self.entries {
            let field = format!("{}.{}.{}", interface, self.name, entry.name);
            validate_non_empty(&entry.name, &format!("{}.{}: entry name", interface, self.name))?;
            if !seen.insert(entry.name.as_str()) {
                return Err(Error::invalid_descriptor(format!("{} declared twice", field)));
            }
            validate_since(entry.since, max_version, &field)?;
            if let Some(deprecated) = entry.deprecated_since {
                if deprecated < entry.since {
                    return Err(Error::invalid_descriptor(format!(
                        "{} is deprecated at version {} before it exists (since {})",
                        field, deprecated, entry.since
                    )));
                }
            }
            if entry.value < i64::from(i32::MIN) || entry.value > i64::from(u32::MAX) {
                return Err(Error::invalid_descriptor(format!(
                    "{} value {} does not fit in 32 bits",
                    field, entry.value
                )));
            }
            let value = entry.wire_value();
            if self.kind == EnumKind::Bitfield && value.count_ones() > 1 {
                return Err(Error::invalid_descriptor(format!(
                    "{} value {:#x} is not a single flag",
                    field, value
                )));
            }
        }
        Ok(())
    }
}
