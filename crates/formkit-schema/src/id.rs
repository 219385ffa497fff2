//! Node identifiers
//!
//! Provides [`NodeId`] and the [`IdSource`] trait used by the node factory
//! to mint fresh identifiers.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt::{self, Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use ulid::Ulid;

/// Process-unique node identifier (`x-id`)
///
/// Assigned once at creation and never reassigned. The inner string is
/// opaque: documents loaded from storage may carry ids minted elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Wrap an existing identifier
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the inner string
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Source of fresh node identifiers
pub trait IdSource: Send + Sync + fmt::Debug {
    /// Mint a new identifier, distinct from every id previously returned
    fn next_id(&self) -> NodeId;
}

/// ULID-backed id source (default)
#[derive(Debug, Clone, Copy, Default)]
pub struct UlidIds;

impl IdSource for UlidIds {
    #[inline]
    fn next_id(&self) -> NodeId {
        NodeId(Ulid::new().to_string().to_lowercase())
    }
}

/// Deterministic id source producing `<prefix>-1`, `<prefix>-2`, ...
///
/// Used for fixtures and snapshot-style tests.
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialIds {
    /// Create sequence with prefix
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl IdSource for SequentialIds {
    fn next_id(&self) -> NodeId {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        NodeId(format!("{}-{}", self.prefix, n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ulid_ids_are_distinct() {
        let ids = UlidIds;
        let minted: HashSet<NodeId> = (0..1000).map(|_| ids.next_id()).collect();
        assert_eq!(minted.len(), 1000);
    }

    #[test]
    fn sequential_ids_count_up() {
        let ids = SequentialIds::new("n");
        assert_eq!(ids.next_id().as_str(), "n-1");
        assert_eq!(ids.next_id().as_str(), "n-2");
    }

    #[test]
    fn node_id_serializes_as_plain_string() {
        let id = NodeId::new("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
    }
}
