//! Swarm Agents - Coordination Services
//!
//! Services over a [`swarm_storage::SwarmStore`]:
//! - Agent registration and credential authentication
//! - The proposal / escalation workflow that drives agent status
//! - Quest and bounty boards with exclusive claims
//! - Direct and broadcast messaging
//! - The autonomy matcher and its background task
//!
//! Services are synchronous and cheap to clone; they share the store and
//! configuration behind `Arc`s.

mod board;
pub mod bounty_board;
pub mod matcher;
pub mod matcher_task;
pub mod messaging;
pub mod quest_board;
pub mod registry;
pub mod sinks;
pub mod workflow;

pub use bounty_board::BountyBoard;
pub use matcher::{AutonomyMatcher, MatchError, MatchReport};
pub use matcher_task::{matcher_task, MatcherMetrics, MatcherSnapshot};
pub use messaging::MessagingChannel;
pub use quest_board::QuestBoard;
pub use registry::{hash_credential, AgentCredential, AgentRegistry, NewAgent, Registration};
pub use sinks::{
    NoopWakeNotifier, ProposalDrafter, RewardGrant, RewardLedger, RewardSource,
    TracingWakeNotifier, WakeNotifier,
};
pub use workflow::ProposalWorkflow;
