//! Swarm Core - Entity Types
//!
//! Data types shared by every swarm crate: identities, db-string enums, the
//! agent status state machine, proposals, board items, messages, the error
//! taxonomy and configuration. No storage or I/O lives here.

pub mod agent;
pub mod config;
pub mod constants;
pub mod enums;
pub mod error;
pub mod identity;
pub mod message;
pub mod proposal;
pub mod wake;
pub mod work;

pub use agent::{
    normalize_display_name, normalize_objective, validate_role, validate_slug, Agent,
    AgentCounters, AgentEvent, CounterDelta,
};
pub use config::{ClaimLeasePolicy, SwarmConfig};
pub use enums::*;
pub use error::{
    AuthError, CollaboratorError, ConfigError, ConflictError, ErrorKind, StateError,
    StorageError, SwarmError, SwarmResult, ValidationError, ValidationResult,
};
pub use identity::{
    new_entity_id, AgentId, BountyId, EntityId, MessageId, ProposalId, QuestId, Timestamp,
};
pub use message::{InboxQuery, Message};
pub use proposal::{Escalation, NewProposal, Proposal, Submission, SubmissionPayload};
pub use wake::WakeLogEntry;
pub use work::{
    Bounty, BountyFilter, BountySpec, Quest, QuestFilter, QuestSpec, WorkFilter, WorkItemRules,
};
