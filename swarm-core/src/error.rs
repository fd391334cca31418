//! Error types for swarm operations

use crate::{AgentStatus, EntityType};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Client-side input errors. Raised before any mutation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Field {field} too short: minimum {min} characters, got {actual}")]
    TooShort {
        field: String,
        min: usize,
        actual: usize,
    },

    #[error("Field {field} too long: maximum {max} characters, got {actual}")]
    TooLong {
        field: String,
        max: usize,
        actual: usize,
    },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Value for {field} out of range [{min}, {max}]: {actual}")]
    OutOfRange {
        field: String,
        min: i64,
        max: i64,
        actual: i64,
    },

    #[error("Invalid escalation type: {0}")]
    InvalidEscalationType(String),
}

/// Result type alias for input validation.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Expected outcomes of racing writers or uniqueness rules.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConflictError {
    #[error("Slug already registered: {slug}")]
    DuplicateSlug { slug: String },

    #[error("{entity_type:?} {id} is already claimed")]
    AlreadyClaimed { entity_type: EntityType, id: Uuid },

    #[error("Agent {agent_id} already holds {held} bounties (limit {limit})")]
    ClaimLimitExceeded {
        agent_id: Uuid,
        held: usize,
        limit: usize,
    },

    #[error("Proposal {id} is already resolved")]
    AlreadyResolved { id: Uuid },

    #[error("Agent {agent_id} already has pending proposal {proposal_id}")]
    PendingProposalExists { agent_id: Uuid, proposal_id: Uuid },
}

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Entity not found: {entity_type:?} with id {id}")]
    NotFound { entity_type: EntityType, id: Uuid },

    #[error("Insert failed for {entity_type:?}: {reason}")]
    InsertFailed { entity_type: EntityType, reason: String },

    #[error("Update failed for {entity_type:?} with id {id}: {reason}")]
    UpdateFailed {
        entity_type: EntityType,
        id: Uuid,
        reason: String,
    },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Authentication errors.
///
/// Carries a single variant so callers cannot tell a malformed token from
/// an unknown one.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid credential")]
    InvalidCredential,
}

/// Operations attempted from the wrong state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("{entity_type:?} {id} is not claimed by agent {agent_id}")]
    NotClaimedByYou {
        entity_type: EntityType,
        id: Uuid,
        agent_id: Uuid,
    },

    #[error("{entity_type:?} {id} is {actual}, expected {expected}")]
    InvalidState {
        entity_type: EntityType,
        id: Uuid,
        expected: String,
        actual: String,
    },

    #[error("Proposal {id} is not an escalation")]
    NotAnEscalation { id: Uuid },

    #[error("Proposal {id} is a {submission_type} and takes no review")]
    NotReviewable { id: Uuid, submission_type: String },

    #[error("Illegal transition: {event} while {from}")]
    IllegalTransition { from: AgentStatus, event: String },
}

/// Failures reported by external collaborators.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("Reward ledger failed: {reason}")]
    LedgerFailed { reason: String },

    #[error("Wake notification failed: {reason}")]
    NotificationFailed { reason: String },

    #[error("Proposal drafting failed: {reason}")]
    DraftFailed { reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all swarm errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SwarmError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Conflict: {0}")]
    Conflict(#[from] ConflictError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for swarm operations.
pub type SwarmResult<T> = Result<T, SwarmError>;

/// Coarse classification of a [`SwarmError`], suitable for mapping onto a
/// transport status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Unauthorized,
    Conflict,
    InvalidState,
    Collaborator,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Conflict => "conflict",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::Collaborator => "collaborator",
            ErrorKind::Internal => "internal",
        };
        f.write_str(s)
    }
}

impl SwarmError {
    /// Shorthand for a missing entity.
    pub fn not_found(entity_type: EntityType, id: Uuid) -> Self {
        SwarmError::Storage(StorageError::NotFound { entity_type, id })
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SwarmError::Validation(_) => ErrorKind::Validation,
            SwarmError::Conflict(_) => ErrorKind::Conflict,
            SwarmError::Storage(StorageError::NotFound { .. }) => ErrorKind::NotFound,
            SwarmError::Storage(_) => ErrorKind::Internal,
            SwarmError::Auth(_) => ErrorKind::Unauthorized,
            SwarmError::State(_) => ErrorKind::InvalidState,
            SwarmError::Collaborator(_) => ErrorKind::Collaborator,
            SwarmError::Config(_) => ErrorKind::Internal,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, SwarmError::Conflict(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SwarmError::Storage(StorageError::NotFound { .. }))
    }
}

// =============================================================================
// TESTS
// =============================================================================
