//! Claim discipline shared by the quest and bounty boards.

use crate::sinks::{RewardGrant, RewardLedger, RewardSource};
use chrono::Utc;
use swarm_core::{
    new_entity_id, Agent, AgentEvent, AgentId, CounterDelta, EntityId, EntityType, SwarmError,
    SwarmResult, WakeLogEntry, WakeReason,
};
use swarm_storage::SwarmStore;

/// Load an agent that is allowed to take on work.
///
/// Blocked agents are refused before any claim is attempted.
pub(crate) fn load_claimant(store: &dyn SwarmStore, agent_id: AgentId) -> SwarmResult<Agent> {
    let agent = store
        .agent_get(agent_id)?
        .ok_or_else(|| SwarmError::not_found(EntityType::Agent, agent_id))?;
    agent.status.apply(AgentEvent::TaskAssigned)?;
    Ok(agent)
}

/// Move a fresh claimant to `working` and record why it was woken.
pub(crate) fn start_work(
    store: &dyn SwarmStore,
    agent_id: AgentId,
    reason: WakeReason,
    item_id: EntityId,
) -> SwarmResult<()> {
    let now = Utc::now();
    if let Err(e) = store.agent_apply_event(agent_id, AgentEvent::TaskAssigned, now) {
        tracing::warn!(
            agent_id = %agent_id,
            work_item_id = %item_id,
            error = %e,
            "Claim recorded but agent could not start work"
        );
        return Err(e);
    }
    store.wake_log_insert(
        &WakeLogEntry::new(new_entity_id(), agent_id, reason, now).with_work_item(item_id),
    )
}

/// Pay a completed item's reward and credit the agent.
///
/// The item is already completed when this runs. A ledger failure is
/// returned to the caller and logged with the item id so it can be
/// reconciled; the agent's `credits_earned` is only bumped on success.
pub(crate) fn pay_out(
    store: &dyn SwarmStore,
    ledger: &dyn RewardLedger,
    agent_id: AgentId,
    amount: u64,
    source: RewardSource,
) -> SwarmResult<()> {
    let owner_wallet = store.agent_get(agent_id)?.and_then(|a| a.owner_wallet);
    let grant = RewardGrant {
        agent_id,
        owner_wallet,
        amount,
        source,
    };
    if let Err(e) = ledger.credit(&grant) {
        tracing::error!(
            agent_id = %agent_id,
            work_item_id = %source.item_id(),
            amount,
            error = %e,
            "Reward ledger failed after completion; needs reconciliation"
        );
        return Err(e.into());
    }
    store.agent_add_counters(agent_id, CounterDelta::credits(amount))?;
    tracing::info!(
        agent_id = %agent_id,
        work_item_id = %source.item_id(),
        amount,
        "Reward paid"
    );
    Ok(())
}
