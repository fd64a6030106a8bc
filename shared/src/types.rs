//! Common types used across the platform

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Organization (tenant) scope.
///
/// Every persistence call and every service operation is scoped by an
/// explicit `OrgId`; there is no implicit default organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrgId(pub Uuid);

impl OrgId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OrgId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OrgId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Non-fatal data-integrity finding.
///
/// Warnings are accumulated and reported alongside successful results or by
/// the integrity scan; they never abort the operation that produced them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityWarning {
    pub code: WarningCode,
    pub entity: String,
    pub entity_id: Option<Uuid>,
    pub message: String,
}

impl IntegrityWarning {
    pub fn new(
        code: WarningCode,
        entity: impl Into<String>,
        entity_id: Option<Uuid>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            entity: entity.into(),
            entity_id,
            message: message.into(),
        }
    }
}

/// Warning categories surfaced by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningCode {
    /// Bulk ingredient percentages of a recipe do not sum to 100
    PercentSumOff,
    /// Packaging resolved through the name heuristic instead of capacity
    PackagingFallback,
    /// No packaging item matched; cost degraded to zero
    PackagingUnmatched,
    /// A stock item went below zero
    NegativeStock,
    /// A recipe or pack references an entity that no longer exists
    OrphanReference,
    /// Stored quantity/WAC disagrees with a full movement replay
    LedgerDrift,
    /// Sized packaging item has no capacity recorded
    MissingCapacity,
}

/// A successful result carrying non-fatal warnings
#[derive(Debug, Clone, Serialize)]
pub struct WithWarnings<T> {
    pub value: T,
    pub warnings: Vec<IntegrityWarning>,
}

impl<T> WithWarnings<T> {
    pub fn new(value: T, warnings: Vec<IntegrityWarning>) -> Self {
        Self { value, warnings }
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
