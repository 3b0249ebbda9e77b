use std::fmt;

use crate::error::ModelError;

/// Identifier of a source document within one conversion request.
///
/// Trimmed and non-empty. Document ids order the deterministic tie-break
/// chain during fusion, so they compare lexicographically.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(value: impl Into<String>) -> Result<Self, ModelError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ModelError::InvalidDocumentId(value));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builder-assigned local identifier of a resource inside a bundle graph.
///
/// Monotonically increasing per builder, rendered as `res-<n>`. The rendered
/// form is a wire-compatibility contract: cross-references inside a
/// serialized bundle use exactly this string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocalId(u32);

impl LocalId {
    pub fn index(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "res-{}", self.0)
    }
}

impl serde::Serialize for LocalId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for LocalId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let digits = s
            .strip_prefix("res-")
            .ok_or_else(|| serde::de::Error::custom("LocalId must start with 'res-'"))?;
        let index: u32 = digits.parse().map_err(serde::de::Error::custom)?;
        Ok(Self(index))
    }
}

/// Allocates monotonically increasing local ids for one bundle graph.
#[derive(Debug, Default)]
pub struct LocalIdAllocator {
    next: u32,
}

impl LocalIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> LocalId {
        self.next += 1;
        LocalId(self.next)
    }
}
