// crates/shardrow-core/src/core/identifiers.rs
// ============================================================================
// Module: Shardrow Identifiers
// Description: Canonical opaque identifiers for entities and cells.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde, uuid
// ============================================================================

//! ## Overview
//! Entities are addressed by an opaque, fixed-format UUID string minted once
//! at creation and never reassigned. Cells are addressed within an entity by
//! name; the reserved name `base` identifies the primary attribute set.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

// ============================================================================
// SECTION: Entity Identifier
// ============================================================================

/// Width of the identifier prefix hashed into the entity shardable value.
const SHARD_PREFIX_LEN: usize = 4;

/// Globally unique entity identifier.
///
/// # Invariants
/// - Opaque UTF-8 string in canonical UUID form; never reassigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityUuid(String);

impl EntityUuid {
    /// Mints a fresh random (v4) entity identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wraps an existing identifier value.
    #[must_use]
    pub fn new(uuid: impl Into<String>) -> Self {
        Self(uuid.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derives the integer used for entity shard routing.
    ///
    /// The first four hex characters of the identifier are parsed base-16,
    /// spreading entities uniformly across shards.
    #[must_use]
    pub fn shardable_value(&self) -> u64 {
        self.0
            .get(.. SHARD_PREFIX_LEN)
            .and_then(|prefix| u64::from_str_radix(prefix, 16).ok())
            .unwrap_or(0)
    }
}

impl fmt::Display for EntityUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for EntityUuid {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for EntityUuid {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Cell Name
// ============================================================================

/// Reserved name of the base cell present on every entity.
pub const BASE_CELL: &str = "base";

/// Name of a versioned cell within an entity.
///
/// # Invariants
/// - Opaque UTF-8 string; `base` is reserved for the primary attribute set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellName(String);

impl CellName {
    /// Returns the reserved base cell name.
    #[must_use]
    pub fn base() -> Self {
        Self(BASE_CELL.to_string())
    }

    /// Creates a new cell name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true when this is the reserved base cell name.
    #[must_use]
    pub fn is_base(&self) -> bool {
        self.0 == BASE_CELL
    }
}

impl fmt::Display for CellName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for CellName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CellName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
