//! Collaborators the coordination services call out to.
//!
//! The reward ledger is required: every completed work item pays through
//! it. Wake notification is best-effort. Proposal drafting is opaque; the
//! workflow only sees the submission it produces.

use serde::{Deserialize, Serialize};
use swarm_core::{Agent, AgentId, BountyId, CollaboratorError, EntityId, QuestId, Submission, WakeReason};

// ============================================================================
// REWARD LEDGER
// ============================================================================

/// Work item a reward was earned on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum RewardSource {
    Quest(QuestId),
    Bounty(BountyId),
}

impl RewardSource {
    pub fn item_id(&self) -> EntityId {
        match self {
            RewardSource::Quest(id) | RewardSource::Bounty(id) => *id,
        }
    }
}

/// One payout request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardGrant {
    pub agent_id: AgentId,
    pub owner_wallet: Option<String>,
    pub amount: u64,
    pub source: RewardSource,
}

/// Credits agents (or their owners) for completed work.
pub trait RewardLedger: Send + Sync {
    fn credit(&self, grant: &RewardGrant) -> Result<(), CollaboratorError>;
}

// ============================================================================
// WAKE NOTIFIER
// ============================================================================

/// Rouses an agent process after work was handed to it.
pub trait WakeNotifier: Send + Sync {
    fn enqueue_wake(
        &self,
        agent_id: AgentId,
        reason: WakeReason,
        work_item_id: Option<EntityId>,
    ) -> Result<(), CollaboratorError>;
}

/// Discards every wake request.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopWakeNotifier;

impl WakeNotifier for NoopWakeNotifier {
    fn enqueue_wake(
        &self,
        _agent_id: AgentId,
        _reason: WakeReason,
        _work_item_id: Option<EntityId>,
    ) -> Result<(), CollaboratorError> {
        Ok(())
    }
}

/// Emits each wake request as a tracing event, for deployments where agents
/// poll instead of being pushed to.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingWakeNotifier;

impl WakeNotifier for TracingWakeNotifier {
    fn enqueue_wake(
        &self,
        agent_id: AgentId,
        reason: WakeReason,
        work_item_id: Option<EntityId>,
    ) -> Result<(), CollaboratorError> {
        tracing::info!(
            agent_id = %agent_id,
            reason = %reason,
            work_item_id = ?work_item_id,
            "Wake requested"
        );
        Ok(())
    }
}

// ============================================================================
// PROPOSAL DRAFTER
// ============================================================================

/// Produces a proposal on an agent's behalf when it is woken.
pub trait ProposalDrafter: Send + Sync {
    fn draft(&self, agent: &Agent) -> Result<Submission, CollaboratorError>;
}
