//! Wake log: an append-only record of why each agent was woken.

use crate::{AgentId, EntityId, ProposalId, Timestamp, WakeReason};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct WakeLogEntry {
    pub entry_id: EntityId,
    pub agent_id: AgentId,
    pub reason: WakeReason,
    pub proposal_id: Option<ProposalId>,
    /// Quest or bounty the wake relates to.
    pub work_item_id: Option<EntityId>,
    pub created_at: Timestamp,
}

impl WakeLogEntry {
    pub fn new(entry_id: EntityId, agent_id: AgentId, reason: WakeReason, now: Timestamp) -> Self {
        Self {
            entry_id,
            agent_id,
            reason,
            proposal_id: None,
            work_item_id: None,
            created_at: now,
        }
    }

    pub fn with_proposal(mut self, proposal_id: ProposalId) -> Self {
        self.proposal_id = Some(proposal_id);
        self
    }

    pub fn with_work_item(mut self, work_item_id: EntityId) -> Self {
        self.work_item_id = Some(work_item_id);
        self
    }
}
