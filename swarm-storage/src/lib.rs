//! Swarm Storage - Storage Trait and In-Memory Implementation
//!
//! Defines the storage abstraction for swarm entities. Services never lock
//! anything themselves: every race between writers is settled here, by
//! conditional updates that either apply or report what they found.

pub mod memory;

pub use memory::InMemoryStore;

use swarm_core::{
    Agent, AgentCounters, AgentEvent, AgentId, AgentStatus, Bounty, BountyFilter, BountyId,
    BountyStatus, CounterDelta, EntityId, InboxQuery, Message, MessageId, Proposal, ProposalId,
    ProposalStatus, Quest, QuestFilter, QuestId, SwarmResult, Timestamp, WakeLogEntry,
};

// ============================================================================
// OUTCOME TYPES
// ============================================================================

/// Result of a conditional update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CasOutcome<T> {
    /// The precondition held and the update was written. Carries the new row.
    Applied(T),
    /// The row exists but the precondition did not hold. Carries the row as
    /// it was found.
    Mismatch(T),
    /// No row with that id.
    Missing,
}

impl<T> CasOutcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, CasOutcome::Applied(_))
    }

    pub fn applied(self) -> Option<T> {
        match self {
            CasOutcome::Applied(row) => Some(row),
            _ => None,
        }
    }
}

/// Result of the atomic bounty claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BountyClaimOutcome {
    Claimed(Bounty),
    /// The bounty was no longer open.
    AlreadyClaimed(Bounty),
    /// The agent already holds `held` bounties, at or above the limit.
    LimitReached { held: usize },
    Missing,
}

/// Status before and after an applied agent event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub from: AgentStatus,
    pub to: AgentStatus,
}

impl StatusChange {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Fields written when a proposal leaves `submitted` or `passed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalUpdate {
    pub status: ProposalStatus,
    /// Replaces the stored feedback when set.
    pub feedback: Option<String>,
    /// Added to the proposal's reported token usage.
    pub tokens_used: Option<u64>,
    pub resolved_at: Timestamp,
}

/// What an agent purge removed or released.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub agent_id: AgentId,
    pub proposals_deleted: usize,
    pub messages_deleted: usize,
    pub wake_log_deleted: usize,
    /// In-flight quests and bounties returned to `open`.
    pub claims_reopened: Vec<EntityId>,
    /// Completed items whose holder was cleared.
    pub completed_detached: usize,
    /// Quests whose `created_by` was cleared.
    pub quests_orphaned: usize,
}

// ============================================================================
// STORAGE TRAIT
// ============================================================================

/// Storage trait for swarm entities.
///
/// Reads return `Ok(None)` for missing rows. Conditional operations report
/// a missing row through their outcome type rather than an error.
pub trait SwarmStore: Send + Sync {
    // === Agent Operations ===

    /// Insert a new agent. Fails with `DuplicateSlug` if the slug is taken.
    fn agent_insert(&self, agent: &Agent) -> SwarmResult<()>;

    fn agent_get(&self, id: AgentId) -> SwarmResult<Option<Agent>>;

    fn agent_get_by_slug(&self, slug: &str) -> SwarmResult<Option<Agent>>;

    fn agent_get_by_credential_hash(&self, hash: &str) -> SwarmResult<Option<Agent>>;

    /// Apply a state-machine event and refresh `last_active_at`.
    ///
    /// The transition is decided against the stored status under the write
    /// guard; an illegal transition leaves the row untouched.
    fn agent_apply_event(
        &self,
        id: AgentId,
        event: AgentEvent,
        now: Timestamp,
    ) -> SwarmResult<StatusChange>;

    /// Atomically add to the agent's counters. Returns the new totals.
    fn agent_add_counters(&self, id: AgentId, delta: CounterDelta) -> SwarmResult<AgentCounters>;

    /// Idle agents, least recently active first.
    fn agent_list_idle(&self, limit: usize) -> SwarmResult<Vec<Agent>>;

    /// Delete the agent and everything it owns, releasing held work.
    fn agent_purge(&self, id: AgentId) -> SwarmResult<PurgeReport>;

    // === Proposal Operations ===

    fn proposal_insert(&self, proposal: &Proposal) -> SwarmResult<()>;

    /// Record a submission and move its author through the submission's
    /// state-machine event as one step, adding `delta` to the author's
    /// counters.
    ///
    /// With `exclusive`, a proposal-kind submission is refused with
    /// `PendingProposalExists` while the author has one awaiting review. The
    /// transition is decided against the stored status. Any failure leaves
    /// both tables untouched.
    fn proposal_submit(
        &self,
        proposal: &Proposal,
        exclusive: bool,
        delta: CounterDelta,
        now: Timestamp,
    ) -> SwarmResult<StatusChange>;

    fn proposal_get(&self, id: ProposalId) -> SwarmResult<Option<Proposal>>;

    /// Proposals by `author`, newest first.
    fn proposal_list_by_author(&self, author: AgentId, limit: usize) -> SwarmResult<Vec<Proposal>>;

    /// Write `update` only if the proposal's status is one of `expected`.
    fn proposal_transition(
        &self,
        id: ProposalId,
        expected: &[ProposalStatus],
        update: ProposalUpdate,
    ) -> SwarmResult<CasOutcome<Proposal>>;

    // === Quest Operations ===

    fn quest_insert(&self, quest: &Quest) -> SwarmResult<()>;

    fn quest_get(&self, id: QuestId) -> SwarmResult<Option<Quest>>;

    /// Quests matching `filter`, priority descending then oldest first.
    fn quest_list(&self, filter: &QuestFilter) -> SwarmResult<Vec<Quest>>;

    /// `open → claimed` for `agent`.
    fn quest_claim_if_open(
        &self,
        id: QuestId,
        agent: AgentId,
        auto_assigned: bool,
        now: Timestamp,
    ) -> SwarmResult<CasOutcome<Quest>>;

    /// `claimed → completed`, only for the holder.
    fn quest_complete(
        &self,
        id: QuestId,
        agent: AgentId,
        proof: Option<String>,
        now: Timestamp,
    ) -> SwarmResult<CasOutcome<Quest>>;

    /// Reopen claimed quests whose claim predates `cutoff`.
    fn quest_release_expired(&self, cutoff: Timestamp) -> SwarmResult<Vec<QuestId>>;

    // === Bounty Operations ===

    fn bounty_insert(&self, bounty: &Bounty) -> SwarmResult<()>;

    fn bounty_get(&self, id: BountyId) -> SwarmResult<Option<Bounty>>;

    /// Bounties matching `filter`, newest first.
    fn bounty_list(&self, filter: &BountyFilter) -> SwarmResult<Vec<Bounty>>;

    /// `open → claimed` for `agent`, provided the agent holds fewer than
    /// `limit` bounties. Both checks run under one write guard.
    fn bounty_claim_if_open(
        &self,
        id: BountyId,
        agent: AgentId,
        limit: usize,
        now: Timestamp,
    ) -> SwarmResult<BountyClaimOutcome>;

    /// `from → to`, only for the holder.
    fn bounty_advance(
        &self,
        id: BountyId,
        agent: AgentId,
        from: BountyStatus,
        to: BountyStatus,
    ) -> SwarmResult<CasOutcome<Bounty>>;

    /// Any held status `→ completed`, only for the holder.
    fn bounty_complete(
        &self,
        id: BountyId,
        agent: AgentId,
        proof: Option<String>,
        now: Timestamp,
    ) -> SwarmResult<CasOutcome<Bounty>>;

    /// Reopen held bounties whose claim predates `cutoff`.
    fn bounty_release_expired(&self, cutoff: Timestamp) -> SwarmResult<Vec<BountyId>>;

    // === Message Operations ===

    fn message_insert(&self, message: &Message) -> SwarmResult<()>;

    /// Inbox page, oldest first, at most `limit` rows.
    fn message_list(&self, query: &InboxQuery, limit: usize) -> SwarmResult<Vec<Message>>;

    fn message_unread_count(&self, agent: AgentId) -> SwarmResult<usize>;

    /// Mark direct messages to `agent` as read. Returns how many changed.
    fn message_mark_read(
        &self,
        agent: AgentId,
        ids: &[MessageId],
        now: Timestamp,
    ) -> SwarmResult<usize>;

    // === Wake Log Operations ===

    fn wake_log_insert(&self, entry: &WakeLogEntry) -> SwarmResult<()>;

    /// Wake log rows for `agent`, oldest first.
    fn wake_log_list(&self, agent: AgentId) -> SwarmResult<Vec<WakeLogEntry>>;
}
