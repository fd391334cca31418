//! In-memory implementation of [`SwarmStore`].
//!
//! Each table is a `RwLock`-guarded map. Single-table operations take one
//! guard. Multi-table operations take their guards in declaration order
//! (agents, proposals, quests, bounties, messages, wake log).

use crate::{
    BountyClaimOutcome, CasOutcome, ProposalUpdate, PurgeReport, StatusChange, SwarmStore,
};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use swarm_core::{
    Agent, AgentCounters, AgentEvent, AgentId, AgentStatus, Bounty, BountyFilter, BountyId,
    BountyStatus, ConflictError, CounterDelta, EntityType, InboxQuery, Message, MessageId,
    Proposal, ProposalId, ProposalStatus, Quest, QuestFilter, QuestId, QuestStatus,
    StorageError, SwarmError, SwarmResult, Timestamp, WakeLogEntry,
};
use uuid::Uuid;

fn read_guard<T>(lock: &RwLock<T>) -> SwarmResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| SwarmError::from(StorageError::LockPoisoned))
}

fn write_guard<T>(lock: &RwLock<T>) -> SwarmResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| SwarmError::from(StorageError::LockPoisoned))
}

fn already_exists(entity_type: EntityType) -> SwarmError {
    SwarmError::from(StorageError::InsertFailed {
        entity_type,
        reason: "already exists".to_string(),
    })
}

fn reopen_quest(quest: &mut Quest) {
    quest.status = QuestStatus::Open;
    quest.claimed_by = None;
    quest.claimed_at = None;
    quest.auto_assigned = false;
}

fn reopen_bounty(bounty: &mut Bounty) {
    bounty.status = BountyStatus::Open;
    bounty.claimed_by = None;
    bounty.claimed_at = None;
}

fn claimed_before(claimed_at: Option<Timestamp>, cutoff: Timestamp) -> bool {
    claimed_at.map_or(false, |at| at < cutoff)
}

/// In-memory store for tests and single-process deployments.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    agents: Arc<RwLock<HashMap<Uuid, Agent>>>,
    proposals: Arc<RwLock<HashMap<Uuid, Proposal>>>,
    quests: Arc<RwLock<HashMap<Uuid, Quest>>>,
    bounties: Arc<RwLock<HashMap<Uuid, Bounty>>>,
    messages: Arc<RwLock<HashMap<Uuid, Message>>>,
    wake_log: Arc<RwLock<HashMap<Uuid, WakeLogEntry>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn agent_count(&self) -> SwarmResult<usize> {
        Ok(read_guard(&self.agents)?.len())
    }

    pub fn proposal_count(&self) -> SwarmResult<usize> {
        Ok(read_guard(&self.proposals)?.len())
    }

    pub fn message_count(&self) -> SwarmResult<usize> {
        Ok(read_guard(&self.messages)?.len())
    }
}

impl SwarmStore for InMemoryStore {
    // === Agent Operations ===

    fn agent_insert(&self, agent: &Agent) -> SwarmResult<()> {
        let mut agents = write_guard(&self.agents)?;
        if agents.contains_key(&agent.agent_id) {
            return Err(already_exists(EntityType::Agent));
        }
        if agents.values().any(|a| a.slug == agent.slug) {
            return Err(ConflictError::DuplicateSlug {
                slug: agent.slug.clone(),
            }
            .into());
        }
        agents.insert(agent.agent_id, agent.clone());
        Ok(())
    }

    fn agent_get(&self, id: AgentId) -> SwarmResult<Option<Agent>> {
        Ok(read_guard(&self.agents)?.get(&id).cloned())
    }

    fn agent_get_by_slug(&self, slug: &str) -> SwarmResult<Option<Agent>> {
        let agents = read_guard(&self.agents)?;
        Ok(agents.values().find(|a| a.slug == slug).cloned())
    }

    fn agent_get_by_credential_hash(&self, hash: &str) -> SwarmResult<Option<Agent>> {
        let agents = read_guard(&self.agents)?;
        Ok(agents.values().find(|a| a.credential_hash == hash).cloned())
    }

    fn agent_apply_event(
        &self,
        id: AgentId,
        event: AgentEvent,
        now: Timestamp,
    ) -> SwarmResult<StatusChange> {
        let mut agents = write_guard(&self.agents)?;
        let agent = agents
            .get_mut(&id)
            .ok_or_else(|| SwarmError::not_found(EntityType::Agent, id))?;
        let from = agent.status;
        let to = from.apply(event)?;
        agent.status = to;
        agent.last_active_at = now;
        Ok(StatusChange { from, to })
    }

    fn agent_add_counters(&self, id: AgentId, delta: CounterDelta) -> SwarmResult<AgentCounters> {
        let mut agents = write_guard(&self.agents)?;
        let agent = agents
            .get_mut(&id)
            .ok_or_else(|| SwarmError::not_found(EntityType::Agent, id))?;
        agent.counters.add(delta);
        Ok(agent.counters)
    }

    fn agent_list_idle(&self, limit: usize) -> SwarmResult<Vec<Agent>> {
        let agents = read_guard(&self.agents)?;
        let mut idle: Vec<Agent> = agents
            .values()
            .filter(|a| a.status == AgentStatus::Idle)
            .cloned()
            .collect();
        idle.sort_by_key(|a| (a.last_active_at, a.created_at, a.agent_id));
        idle.truncate(limit);
        Ok(idle)
    }

    fn agent_purge(&self, id: AgentId) -> SwarmResult<PurgeReport> {
        let mut agents = write_guard(&self.agents)?;
        if !agents.contains_key(&id) {
            return Err(SwarmError::not_found(EntityType::Agent, id));
        }
        let mut proposals = write_guard(&self.proposals)?;
        let mut quests = write_guard(&self.quests)?;
        let mut bounties = write_guard(&self.bounties)?;
        let mut messages = write_guard(&self.messages)?;
        let mut wake_log = write_guard(&self.wake_log)?;

        let mut report = PurgeReport {
            agent_id: id,
            ..PurgeReport::default()
        };

        let before = proposals.len();
        proposals.retain(|_, p| p.author_id != id);
        report.proposals_deleted = before - proposals.len();

        let before = messages.len();
        messages.retain(|_, m| !m.involves(id));
        report.messages_deleted = before - messages.len();

        let before = wake_log.len();
        wake_log.retain(|_, e| e.agent_id != id);
        report.wake_log_deleted = before - wake_log.len();

        for quest in quests.values_mut() {
            if quest.created_by == Some(id) {
                quest.created_by = None;
                report.quests_orphaned += 1;
            }
            if quest.is_held_by(id) {
                if quest.status == QuestStatus::Completed {
                    quest.claimed_by = None;
                    report.completed_detached += 1;
                } else {
                    reopen_quest(quest);
                    report.claims_reopened.push(quest.quest_id);
                }
            }
        }

        for bounty in bounties.values_mut() {
            if bounty.is_held_by(id) {
                if bounty.status == BountyStatus::Completed {
                    bounty.claimed_by = None;
                    report.completed_detached += 1;
                } else {
                    reopen_bounty(bounty);
                    report.claims_reopened.push(bounty.bounty_id);
                }
            }
        }
        report.claims_reopened.sort();

        agents.remove(&id);
        tracing::debug!(
            agent_id = %id,
            proposals = report.proposals_deleted,
            reopened = report.claims_reopened.len(),
            "Purged agent"
        );
        Ok(report)
    }

    // === Proposal Operations ===

    fn proposal_insert(&self, proposal: &Proposal) -> SwarmResult<()> {
        let mut proposals = write_guard(&self.proposals)?;
        if proposals.contains_key(&proposal.proposal_id) {
            return Err(already_exists(EntityType::Proposal));
        }
        proposals.insert(proposal.proposal_id, proposal.clone());
        Ok(())
    }

    fn proposal_submit(
        &self,
        proposal: &Proposal,
        exclusive: bool,
        delta: CounterDelta,
        now: Timestamp,
    ) -> SwarmResult<StatusChange> {
        let mut agents = write_guard(&self.agents)?;
        let mut proposals = write_guard(&self.proposals)?;

        let author = proposal.author_id;
        let agent = agents
            .get_mut(&author)
            .ok_or_else(|| SwarmError::not_found(EntityType::Agent, author))?;
        let from = agent.status;
        let to = from.apply(proposal.payload.event())?;

        if proposals.contains_key(&proposal.proposal_id) {
            return Err(already_exists(EntityType::Proposal));
        }
        if exclusive && proposal.submission_type().awaits_review() {
            let pending = proposals
                .values()
                .filter(|p| p.author_id == author && p.is_pending_review())
                .min_by_key(|p| (p.created_at, p.proposal_id));
            if let Some(pending) = pending {
                return Err(ConflictError::PendingProposalExists {
                    agent_id: author,
                    proposal_id: pending.proposal_id,
                }
                .into());
            }
        }

        proposals.insert(proposal.proposal_id, proposal.clone());
        agent.counters.add(delta);
        agent.status = to;
        agent.last_active_at = now;
        Ok(StatusChange { from, to })
    }

    fn proposal_get(&self, id: ProposalId) -> SwarmResult<Option<Proposal>> {
        Ok(read_guard(&self.proposals)?.get(&id).cloned())
    }

    fn proposal_list_by_author(&self, author: AgentId, limit: usize) -> SwarmResult<Vec<Proposal>> {
        let proposals = read_guard(&self.proposals)?;
        let mut rows: Vec<Proposal> = proposals
            .values()
            .filter(|p| p.author_id == author)
            .cloned()
            .collect();
        rows.sort_by_key(|p| Reverse((p.created_at, p.proposal_id)));
        rows.truncate(limit);
        Ok(rows)
    }

    fn proposal_transition(
        &self,
        id: ProposalId,
        expected: &[ProposalStatus],
        update: ProposalUpdate,
    ) -> SwarmResult<CasOutcome<Proposal>> {
        let mut proposals = write_guard(&self.proposals)?;
        let Some(proposal) = proposals.get_mut(&id) else {
            return Ok(CasOutcome::Missing);
        };
        if !expected.contains(&proposal.status) {
            return Ok(CasOutcome::Mismatch(proposal.clone()));
        }
        proposal.status = update.status;
        if let Some(feedback) = update.feedback {
            proposal.feedback = Some(feedback);
        }
        if let Some(tokens) = update.tokens_used {
            proposal.tokens_used = Some(proposal.tokens_used.unwrap_or(0).saturating_add(tokens));
        }
        proposal.resolved_at.get_or_insert(update.resolved_at);
        Ok(CasOutcome::Applied(proposal.clone()))
    }

    // === Quest Operations ===

    fn quest_insert(&self, quest: &Quest) -> SwarmResult<()> {
        let mut quests = write_guard(&self.quests)?;
        if quests.contains_key(&quest.quest_id) {
            return Err(already_exists(EntityType::Quest));
        }
        quests.insert(quest.quest_id, quest.clone());
        Ok(())
    }

    fn quest_get(&self, id: QuestId) -> SwarmResult<Option<Quest>> {
        Ok(read_guard(&self.quests)?.get(&id).cloned())
    }

    fn quest_list(&self, filter: &QuestFilter) -> SwarmResult<Vec<Quest>> {
        let quests = read_guard(&self.quests)?;
        let mut rows: Vec<Quest> = quests.values().filter(|q| filter.admits(q)).cloned().collect();
        rows.sort_by_key(|q| (Reverse(q.priority), q.created_at, q.quest_id));
        if let Some(limit) = filter.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    fn quest_claim_if_open(
        &self,
        id: QuestId,
        agent: AgentId,
        auto_assigned: bool,
        now: Timestamp,
    ) -> SwarmResult<CasOutcome<Quest>> {
        let mut quests = write_guard(&self.quests)?;
        let Some(quest) = quests.get_mut(&id) else {
            return Ok(CasOutcome::Missing);
        };
        if quest.status != QuestStatus::Open {
            return Ok(CasOutcome::Mismatch(quest.clone()));
        }
        quest.status = QuestStatus::Claimed;
        quest.claimed_by = Some(agent);
        quest.claimed_at = Some(now);
        quest.auto_assigned = auto_assigned;
        Ok(CasOutcome::Applied(quest.clone()))
    }

    fn quest_complete(
        &self,
        id: QuestId,
        agent: AgentId,
        proof: Option<String>,
        now: Timestamp,
    ) -> SwarmResult<CasOutcome<Quest>> {
        let mut quests = write_guard(&self.quests)?;
        let Some(quest) = quests.get_mut(&id) else {
            return Ok(CasOutcome::Missing);
        };
        if quest.status != QuestStatus::Claimed || !quest.is_held_by(agent) {
            return Ok(CasOutcome::Mismatch(quest.clone()));
        }
        quest.status = QuestStatus::Completed;
        quest.completed_at = Some(now);
        quest.proof = proof;
        Ok(CasOutcome::Applied(quest.clone()))
    }

    fn quest_release_expired(&self, cutoff: Timestamp) -> SwarmResult<Vec<QuestId>> {
        let mut quests = write_guard(&self.quests)?;
        let mut released: Vec<QuestId> = quests
            .values_mut()
            .filter(|q| q.status == QuestStatus::Claimed && claimed_before(q.claimed_at, cutoff))
            .map(|q| {
                reopen_quest(q);
                q.quest_id
            })
            .collect();
        released.sort();
        Ok(released)
    }

    // === Bounty Operations ===

    fn bounty_insert(&self, bounty: &Bounty) -> SwarmResult<()> {
        let mut bounties = write_guard(&self.bounties)?;
        if bounties.contains_key(&bounty.bounty_id) {
            return Err(already_exists(EntityType::Bounty));
        }
        bounties.insert(bounty.bounty_id, bounty.clone());
        Ok(())
    }

    fn bounty_get(&self, id: BountyId) -> SwarmResult<Option<Bounty>> {
        Ok(read_guard(&self.bounties)?.get(&id).cloned())
    }

    fn bounty_list(&self, filter: &BountyFilter) -> SwarmResult<Vec<Bounty>> {
        let bounties = read_guard(&self.bounties)?;
        let mut rows: Vec<Bounty> = bounties
            .values()
            .filter(|b| filter.admits(b))
            .cloned()
            .collect();
        rows.sort_by_key(|b| Reverse((b.created_at, b.bounty_id)));
        if let Some(limit) = filter.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    fn bounty_claim_if_open(
        &self,
        id: BountyId,
        agent: AgentId,
        limit: usize,
        now: Timestamp,
    ) -> SwarmResult<BountyClaimOutcome> {
        let mut bounties = write_guard(&self.bounties)?;
        if !bounties.contains_key(&id) {
            return Ok(BountyClaimOutcome::Missing);
        }
        let held = bounties
            .values()
            .filter(|b| b.is_held_by(agent) && b.status.is_held())
            .count();
        if held >= limit {
            return Ok(BountyClaimOutcome::LimitReached { held });
        }
        let Some(bounty) = bounties.get_mut(&id) else {
            return Ok(BountyClaimOutcome::Missing);
        };
        if bounty.status != BountyStatus::Open {
            return Ok(BountyClaimOutcome::AlreadyClaimed(bounty.clone()));
        }
        bounty.status = BountyStatus::Claimed;
        bounty.claimed_by = Some(agent);
        bounty.claimed_at = Some(now);
        Ok(BountyClaimOutcome::Claimed(bounty.clone()))
    }

    fn bounty_advance(
        &self,
        id: BountyId,
        agent: AgentId,
        from: BountyStatus,
        to: BountyStatus,
    ) -> SwarmResult<CasOutcome<Bounty>> {
        let mut bounties = write_guard(&self.bounties)?;
        let Some(bounty) = bounties.get_mut(&id) else {
            return Ok(CasOutcome::Missing);
        };
        if bounty.status != from || !bounty.is_held_by(agent) {
            return Ok(CasOutcome::Mismatch(bounty.clone()));
        }
        bounty.status = to;
        Ok(CasOutcome::Applied(bounty.clone()))
    }

    fn bounty_complete(
        &self,
        id: BountyId,
        agent: AgentId,
        proof: Option<String>,
        now: Timestamp,
    ) -> SwarmResult<CasOutcome<Bounty>> {
        let mut bounties = write_guard(&self.bounties)?;
        let Some(bounty) = bounties.get_mut(&id) else {
            return Ok(CasOutcome::Missing);
        };
        if !bounty.status.is_held() || !bounty.is_held_by(agent) {
            return Ok(CasOutcome::Mismatch(bounty.clone()));
        }
        bounty.status = BountyStatus::Completed;
        bounty.completed_at = Some(now);
        bounty.proof = proof;
        Ok(CasOutcome::Applied(bounty.clone()))
    }

    fn bounty_release_expired(&self, cutoff: Timestamp) -> SwarmResult<Vec<BountyId>> {
        let mut bounties = write_guard(&self.bounties)?;
        let mut released: Vec<BountyId> = bounties
            .values_mut()
            .filter(|b| b.status.is_held() && claimed_before(b.claimed_at, cutoff))
            .map(|b| {
                reopen_bounty(b);
                b.bounty_id
            })
            .collect();
        released.sort();
        Ok(released)
    }

    // === Message Operations ===

    fn message_insert(&self, message: &Message) -> SwarmResult<()> {
        let mut messages = write_guard(&self.messages)?;
        if messages.contains_key(&message.message_id) {
            return Err(already_exists(EntityType::Message));
        }
        messages.insert(message.message_id, message.clone());
        Ok(())
    }

    fn message_list(&self, query: &InboxQuery, limit: usize) -> SwarmResult<Vec<Message>> {
        let messages = read_guard(&self.messages)?;
        let mut rows: Vec<Message> = messages
            .values()
            .filter(|m| query.admits(m))
            .cloned()
            .collect();
        rows.sort_by_key(|m| (m.created_at, m.message_id));
        rows.truncate(limit);
        Ok(rows)
    }

    fn message_unread_count(&self, agent: AgentId) -> SwarmResult<usize> {
        let messages = read_guard(&self.messages)?;
        Ok(messages.values().filter(|m| m.is_unread_by(agent)).count())
    }

    fn message_mark_read(
        &self,
        agent: AgentId,
        ids: &[MessageId],
        now: Timestamp,
    ) -> SwarmResult<usize> {
        let mut messages = write_guard(&self.messages)?;
        let mut marked = 0;
        for id in ids {
            if let Some(message) = messages.get_mut(id) {
                if message.is_unread_by(agent) {
                    message.read_at = Some(now);
                    marked += 1;
                }
            }
        }
        Ok(marked)
    }

    // === Wake Log Operations ===

    fn wake_log_insert(&self, entry: &WakeLogEntry) -> SwarmResult<()> {
        let mut wake_log = write_guard(&self.wake_log)?;
        if wake_log.contains_key(&entry.entry_id) {
            return Err(already_exists(EntityType::WakeLog));
        }
        wake_log.insert(entry.entry_id, entry.clone());
        Ok(())
    }

    fn wake_log_list(&self, agent: AgentId) -> SwarmResult<Vec<WakeLogEntry>> {
        let wake_log = read_guard(&self.wake_log)?;
        let mut rows: Vec<WakeLogEntry> = wake_log
            .values()
            .filter(|e| e.agent_id == agent)
            .cloned()
            .collect();
        rows.sort_by_key(|e| (e.created_at, e.entry_id));
        Ok(rows)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use std::sync::Barrier;
    use std::thread;
    use swarm_core::{
        new_entity_id, BountySpec, MessageType, NewProposal, ProposalCategory, QuestSpec,
        StateError, SubmissionPayload, WakeReason,
    };

    fn make_agent(slug: &str) -> Agent {
        let now = Utc::now();
        Agent {
            agent_id: new_entity_id(),
            slug: slug.to_string(),
            display_name: slug.to_uppercase(),
            role: "general".to_string(),
            objective: None,
            status: AgentStatus::Idle,
            credential_hash: format!("hash-{slug}"),
            owner_wallet: None,
            counters: AgentCounters::default(),
            created_at: now,
            last_active_at: now,
        }
    }

    fn make_proposal(author: AgentId, payload: SubmissionPayload) -> Proposal {
        Proposal::new(
            new_entity_id(),
            author,
            NewProposal {
                title: "Fix login bug".to_string(),
                content: "Users cannot log in after a password reset.".to_string(),
                category: ProposalCategory::Bug,
                payload,
                tokens_used: None,
            },
            Utc::now(),
        )
    }

    fn make_quest(priority: i32) -> Quest {
        Quest::new(
            new_entity_id(),
            QuestSpec::new("Write tests", "Cover the claim path end to end.", 10)
                .with_priority(priority),
            Utc::now(),
        )
    }

    fn make_bounty() -> Bounty {
        Bounty::new(
            new_entity_id(),
            BountySpec::new("Audit ledger", "Review the ledger sink for gaps.", 100),
            Utc::now(),
        )
    }

    #[test]
    fn test_agent_insert_and_lookup() {
        let store = InMemoryStore::new();
        let agent = make_agent("bob");
        store.agent_insert(&agent).unwrap();

        assert_eq!(store.agent_get(agent.agent_id).unwrap(), Some(agent.clone()));
        assert_eq!(store.agent_get_by_slug("bob").unwrap(), Some(agent.clone()));
        assert_eq!(
            store.agent_get_by_credential_hash("hash-bob").unwrap(),
            Some(agent)
        );
        assert_eq!(store.agent_get_by_slug("alice").unwrap(), None);
    }

    #[test]
    fn test_duplicate_slug_is_conflict() {
        let store = InMemoryStore::new();
        store.agent_insert(&make_agent("bob")).unwrap();
        let err = store.agent_insert(&make_agent("bob")).unwrap_err();
        assert_eq!(
            err,
            SwarmError::Conflict(ConflictError::DuplicateSlug {
                slug: "bob".to_string()
            })
        );
        assert_eq!(store.agent_count().unwrap(), 1);
    }

    #[test]
    fn test_illegal_event_leaves_agent_untouched() {
        let store = InMemoryStore::new();
        let mut agent = make_agent("bob");
        agent.status = AgentStatus::Blocked;
        store.agent_insert(&agent).unwrap();

        let later = agent.last_active_at + Duration::seconds(30);
        let err = store
            .agent_apply_event(agent.agent_id, AgentEvent::TaskAssigned, later)
            .unwrap_err();
        assert!(matches!(
            err,
            SwarmError::State(StateError::IllegalTransition { .. })
        ));

        let stored = store.agent_get(agent.agent_id).unwrap().unwrap();
        assert_eq!(stored.status, AgentStatus::Blocked);
        assert_eq!(stored.last_active_at, agent.last_active_at);
    }

    #[test]
    fn test_apply_event_refreshes_last_active() {
        let store = InMemoryStore::new();
        let agent = make_agent("bob");
        store.agent_insert(&agent).unwrap();

        let later = agent.last_active_at + Duration::seconds(30);
        let change = store
            .agent_apply_event(agent.agent_id, AgentEvent::WorkUpdateSubmitted, later)
            .unwrap();
        assert!(!change.changed());
        let stored = store.agent_get(agent.agent_id).unwrap().unwrap();
        assert_eq!(stored.last_active_at, later);
    }

    #[test]
    fn test_list_idle_orders_by_last_active() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let mut recent = make_agent("recent");
        recent.last_active_at = now;
        let mut stale = make_agent("stale");
        stale.last_active_at = now - Duration::hours(2);
        let mut busy = make_agent("busy");
        busy.status = AgentStatus::Working;
        busy.last_active_at = now - Duration::hours(5);
        for agent in [&recent, &stale, &busy] {
            store.agent_insert(agent).unwrap();
        }

        let idle = store.agent_list_idle(10).unwrap();
        let slugs: Vec<&str> = idle.iter().map(|a| a.slug.as_str()).collect();
        assert_eq!(slugs, vec!["stale", "recent"]);
        assert_eq!(store.agent_list_idle(1).unwrap().len(), 1);
    }

    #[test]
    fn test_submit_refuses_second_pending() {
        let store = InMemoryStore::new();
        let bob = make_agent("bob");
        store.agent_insert(&bob).unwrap();
        let author = bob.agent_id;
        let now = Utc::now();

        let first = make_proposal(author, SubmissionPayload::Proposal);
        let change = store
            .proposal_submit(&first, true, CounterDelta::submitted(), now)
            .unwrap();
        assert_eq!(change.to, AgentStatus::Waiting);

        let second = make_proposal(author, SubmissionPayload::SmallTelosProposal);
        let err = store
            .proposal_submit(&second, true, CounterDelta::submitted(), now)
            .unwrap_err();
        assert_eq!(
            err,
            SwarmError::Conflict(ConflictError::PendingProposalExists {
                agent_id: author,
                proposal_id: first.proposal_id,
            })
        );
        assert_eq!(
            store.agent_get(author).unwrap().unwrap().counters.proposals_submitted,
            1
        );

        // Work updates never count as pending.
        let update = make_proposal(author, SubmissionPayload::WorkUpdate);
        store
            .proposal_submit(&update, true, CounterDelta::submitted(), now)
            .unwrap();
        assert_eq!(store.proposal_count().unwrap(), 2);
    }

    #[test]
    fn test_submit_from_blocked_writes_nothing() {
        let store = InMemoryStore::new();
        let mut bob = make_agent("bob");
        bob.status = AgentStatus::Blocked;
        store.agent_insert(&bob).unwrap();

        let proposal = make_proposal(bob.agent_id, SubmissionPayload::Proposal);
        let later = bob.last_active_at + Duration::seconds(30);
        let err = store
            .proposal_submit(&proposal, true, CounterDelta::submitted(), later)
            .unwrap_err();
        assert!(matches!(
            err,
            SwarmError::State(StateError::IllegalTransition { .. })
        ));

        assert_eq!(store.proposal_count().unwrap(), 0);
        let stored = store.agent_get(bob.agent_id).unwrap().unwrap();
        assert_eq!(stored.status, AgentStatus::Blocked);
        assert_eq!(stored.counters, AgentCounters::default());
        assert_eq!(stored.last_active_at, bob.last_active_at);
    }

    #[test]
    fn test_submit_for_unknown_author_is_not_found() {
        let store = InMemoryStore::new();
        let proposal = make_proposal(new_entity_id(), SubmissionPayload::Proposal);
        let err = store
            .proposal_submit(&proposal, false, CounterDelta::submitted(), Utc::now())
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.proposal_count().unwrap(), 0);
    }

    #[test]
    fn test_proposal_transition_first_writer_wins() {
        let store = InMemoryStore::new();
        let proposal = make_proposal(new_entity_id(), SubmissionPayload::Proposal);
        store.proposal_insert(&proposal).unwrap();

        let update = |status| ProposalUpdate {
            status,
            feedback: None,
            tokens_used: None,
            resolved_at: Utc::now(),
        };
        let first = store
            .proposal_transition(
                proposal.proposal_id,
                &[ProposalStatus::Submitted],
                update(ProposalStatus::Passed),
            )
            .unwrap();
        assert!(first.is_applied());

        let second = store
            .proposal_transition(
                proposal.proposal_id,
                &[ProposalStatus::Submitted],
                update(ProposalStatus::Rejected),
            )
            .unwrap();
        match second {
            CasOutcome::Mismatch(current) => assert_eq!(current.status, ProposalStatus::Passed),
            other => panic!("expected mismatch, got {other:?}"),
        }

        let missing = store
            .proposal_transition(
                new_entity_id(),
                &[ProposalStatus::Submitted],
                update(ProposalStatus::Passed),
            )
            .unwrap();
        assert_eq!(missing, CasOutcome::Missing);
    }

    #[test]
    fn test_quest_list_orders_by_priority_then_age() {
        let store = InMemoryStore::new();
        let low = make_quest(1);
        let mut high_old = make_quest(5);
        high_old.created_at = Utc::now() - Duration::hours(1);
        let high_new = make_quest(5);
        for quest in [&low, &high_old, &high_new] {
            store.quest_insert(quest).unwrap();
        }

        let listed = store.quest_list(&QuestFilter::default()).unwrap();
        let ids: Vec<QuestId> = listed.iter().map(|q| q.quest_id).collect();
        assert_eq!(ids, vec![high_old.quest_id, high_new.quest_id, low.quest_id]);
    }

    #[test]
    fn test_concurrent_quest_claim_single_winner() {
        let store = Arc::new(InMemoryStore::new());
        let quest = make_quest(0);
        store.quest_insert(&quest).unwrap();

        let claimers = 16;
        let barrier = Arc::new(Barrier::new(claimers));
        let handles: Vec<_> = (0..claimers)
            .map(|_| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                let quest_id = quest.quest_id;
                thread::spawn(move || {
                    barrier.wait();
                    store
                        .quest_claim_if_open(quest_id, new_entity_id(), false, Utc::now())
                        .unwrap()
                        .is_applied()
                })
            })
            .collect();

        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(wins, 1);
    }

    #[test]
    fn test_quest_complete_requires_holder() {
        let store = InMemoryStore::new();
        let quest = make_quest(0);
        store.quest_insert(&quest).unwrap();
        let holder = new_entity_id();
        store
            .quest_claim_if_open(quest.quest_id, holder, false, Utc::now())
            .unwrap();

        let other = store
            .quest_complete(quest.quest_id, new_entity_id(), None, Utc::now())
            .unwrap();
        assert!(matches!(other, CasOutcome::Mismatch(_)));

        let done = store
            .quest_complete(quest.quest_id, holder, Some("PR #12".to_string()), Utc::now())
            .unwrap()
            .applied()
            .unwrap();
        assert_eq!(done.status, QuestStatus::Completed);
        assert_eq!(done.proof.as_deref(), Some("PR #12"));
    }

    #[test]
    fn test_bounty_claim_limit() {
        let store = InMemoryStore::new();
        let agent = new_entity_id();
        let bounties: Vec<Bounty> = (0..4).map(|_| make_bounty()).collect();
        for bounty in &bounties {
            store.bounty_insert(bounty).unwrap();
        }

        for bounty in &bounties[..3] {
            let outcome = store
                .bounty_claim_if_open(bounty.bounty_id, agent, 3, Utc::now())
                .unwrap();
            assert!(matches!(outcome, BountyClaimOutcome::Claimed(_)));
        }
        let fourth = store
            .bounty_claim_if_open(bounties[3].bounty_id, agent, 3, Utc::now())
            .unwrap();
        assert_eq!(fourth, BountyClaimOutcome::LimitReached { held: 3 });

        store
            .bounty_complete(bounties[0].bounty_id, agent, None, Utc::now())
            .unwrap();
        let retry = store
            .bounty_claim_if_open(bounties[3].bounty_id, agent, 3, Utc::now())
            .unwrap();
        assert!(matches!(retry, BountyClaimOutcome::Claimed(_)));
    }

    #[test]
    fn test_bounty_advance_is_conditional() {
        let store = InMemoryStore::new();
        let bounty = make_bounty();
        store.bounty_insert(&bounty).unwrap();
        let agent = new_entity_id();
        store
            .bounty_claim_if_open(bounty.bounty_id, agent, 3, Utc::now())
            .unwrap();

        let skipped = store
            .bounty_advance(bounty.bounty_id, agent, BountyStatus::InProgress, BountyStatus::Review)
            .unwrap();
        assert!(matches!(skipped, CasOutcome::Mismatch(_)));

        let started = store
            .bounty_advance(bounty.bounty_id, agent, BountyStatus::Claimed, BountyStatus::InProgress)
            .unwrap();
        assert!(started.is_applied());
    }

    #[test]
    fn test_release_expired_claims() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let stale = make_quest(0);
        let fresh = make_quest(0);
        store.quest_insert(&stale).unwrap();
        store.quest_insert(&fresh).unwrap();
        store
            .quest_claim_if_open(stale.quest_id, new_entity_id(), true, now - Duration::hours(3))
            .unwrap();
        store
            .quest_claim_if_open(fresh.quest_id, new_entity_id(), false, now)
            .unwrap();

        let released = store
            .quest_release_expired(now - Duration::hours(1))
            .unwrap();
        assert_eq!(released, vec![stale.quest_id]);
        let reopened = store.quest_get(stale.quest_id).unwrap().unwrap();
        assert_eq!(reopened.status, QuestStatus::Open);
        assert!(!reopened.auto_assigned);
    }

    #[test]
    fn test_purge_cascade() {
        let store = InMemoryStore::new();
        let bob = make_agent("bob");
        let alice = make_agent("alice");
        store.agent_insert(&bob).unwrap();
        store.agent_insert(&alice).unwrap();
        let now = Utc::now();

        store
            .proposal_insert(&make_proposal(bob.agent_id, SubmissionPayload::Proposal))
            .unwrap();
        store
            .message_insert(&Message::new(
                new_entity_id(),
                alice.agent_id,
                Some(bob.agent_id),
                "hello bob".to_string(),
                MessageType::Message,
                now,
            ))
            .unwrap();
        store
            .wake_log_insert(&WakeLogEntry::new(
                new_entity_id(),
                bob.agent_id,
                WakeReason::ProposalSubmitted,
                now,
            ))
            .unwrap();

        let authored = Quest::new(
            new_entity_id(),
            QuestSpec::new("Write tests", "Cover the claim path end to end.", 10)
                .created_by(bob.agent_id),
            now,
        );
        let in_flight = make_quest(0);
        let finished = make_quest(0);
        for quest in [&authored, &in_flight, &finished] {
            store.quest_insert(quest).unwrap();
        }
        store
            .quest_claim_if_open(in_flight.quest_id, bob.agent_id, false, now)
            .unwrap();
        store
            .quest_claim_if_open(finished.quest_id, bob.agent_id, false, now)
            .unwrap();
        store
            .quest_complete(finished.quest_id, bob.agent_id, None, now)
            .unwrap();

        let report = store.agent_purge(bob.agent_id).unwrap();
        assert_eq!(report.proposals_deleted, 1);
        assert_eq!(report.messages_deleted, 1);
        assert_eq!(report.wake_log_deleted, 1);
        assert_eq!(report.claims_reopened, vec![in_flight.quest_id]);
        assert_eq!(report.completed_detached, 1);
        assert_eq!(report.quests_orphaned, 1);

        assert!(store.agent_get(bob.agent_id).unwrap().is_none());
        assert!(store.agent_get(alice.agent_id).unwrap().is_some());
        let finished = store.quest_get(finished.quest_id).unwrap().unwrap();
        assert_eq!(finished.status, QuestStatus::Completed);
        assert_eq!(finished.claimed_by, None);
        let authored = store.quest_get(authored.quest_id).unwrap().unwrap();
        assert_eq!(authored.created_by, None);

        assert!(store.agent_purge(bob.agent_id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_mark_read_only_touches_recipient() {
        let store = InMemoryStore::new();
        let alice = new_entity_id();
        let bob = new_entity_id();
        let now = Utc::now();
        let direct = Message::new(
            new_entity_id(),
            alice,
            Some(bob),
            "handoff ready".to_string(),
            MessageType::Handoff,
            now,
        );
        let broadcast = Message::new(
            new_entity_id(),
            alice,
            None,
            "status".to_string(),
            MessageType::StatusUpdate,
            now,
        );
        store.message_insert(&direct).unwrap();
        store.message_insert(&broadcast).unwrap();

        assert_eq!(store.message_unread_count(bob).unwrap(), 1);
        assert_eq!(
            store
                .message_mark_read(alice, &[direct.message_id], now)
                .unwrap(),
            0
        );
        assert_eq!(
            store
                .message_mark_read(bob, &[direct.message_id, broadcast.message_id], now)
                .unwrap(),
            1
        );
        assert_eq!(store.message_unread_count(bob).unwrap(), 0);
    }
}
