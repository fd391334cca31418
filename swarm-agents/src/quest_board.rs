//! Quest Board
//!
//! Quests are posted open, claimed by exactly one agent (directly or by the
//! matcher), and paid out through the reward ledger on completion.

use crate::board::{load_claimant, pay_out, start_work};
use crate::sinks::{RewardLedger, RewardSource};
use chrono::Utc;
use std::sync::Arc;
use swarm_core::{
    new_entity_id, validate_role, AgentId, ConflictError, EntityType, Quest, QuestFilter, QuestId,
    QuestSpec, QuestStatus, StateError, SwarmConfig, SwarmError, SwarmResult, Timestamp,
    WakeReason, WorkItemRules,
};
use swarm_storage::{CasOutcome, SwarmStore};

#[derive(Clone)]
pub struct QuestBoard {
    store: Arc<dyn SwarmStore>,
    config: Arc<SwarmConfig>,
    ledger: Arc<dyn RewardLedger>,
}

impl QuestBoard {
    pub fn new(
        store: Arc<dyn SwarmStore>,
        config: Arc<SwarmConfig>,
        ledger: Arc<dyn RewardLedger>,
    ) -> Self {
        Self {
            store,
            config,
            ledger,
        }
    }

    fn rules(&self) -> WorkItemRules {
        WorkItemRules {
            min_title_len: self.config.min_title_len,
            min_description_len: self.config.min_content_len,
            reward_min: self.config.quest_reward_min,
            reward_max: self.config.quest_reward_max,
        }
    }

    pub fn create(&self, mut spec: QuestSpec) -> SwarmResult<Quest> {
        let (title, description) = self.rules().check(&spec.title, &spec.description, spec.reward)?;
        spec.title = title;
        spec.description = description;
        if let Some(role) = spec.role_match.as_deref() {
            validate_role(role)?;
        }
        if let Some(author) = spec.created_by {
            if self.store.agent_get(author)?.is_none() {
                return Err(SwarmError::not_found(EntityType::Agent, author));
            }
        }

        let quest = Quest::new(new_entity_id(), spec, Utc::now());
        self.store.quest_insert(&quest)?;
        tracing::info!(
            quest_id = %quest.quest_id,
            reward = quest.reward,
            priority = quest.priority,
            "Quest posted"
        );
        Ok(quest)
    }

    pub fn claim(&self, quest_id: QuestId, agent_id: AgentId) -> SwarmResult<Quest> {
        self.claim_with(quest_id, agent_id, false)
    }

    pub(crate) fn claim_with(
        &self,
        quest_id: QuestId,
        agent_id: AgentId,
        auto_assigned: bool,
    ) -> SwarmResult<Quest> {
        load_claimant(self.store.as_ref(), agent_id)?;

        let quest = match self
            .store
            .quest_claim_if_open(quest_id, agent_id, auto_assigned, Utc::now())?
        {
            CasOutcome::Applied(quest) => quest,
            CasOutcome::Mismatch(_) => {
                tracing::debug!(quest_id = %quest_id, agent_id = %agent_id, "Quest already claimed");
                return Err(ConflictError::AlreadyClaimed {
                    entity_type: EntityType::Quest,
                    id: quest_id,
                }
                .into());
            }
            CasOutcome::Missing => return Err(SwarmError::not_found(EntityType::Quest, quest_id)),
        };

        start_work(
            self.store.as_ref(),
            agent_id,
            WakeReason::QuestAssigned,
            quest_id,
        )?;
        tracing::info!(
            quest_id = %quest_id,
            agent_id = %agent_id,
            auto_assigned,
            "Quest claimed"
        );
        Ok(quest)
    }

    /// Complete a held quest and pay its reward. Returns the amount paid.
    pub fn complete(
        &self,
        quest_id: QuestId,
        agent_id: AgentId,
        proof: Option<String>,
    ) -> SwarmResult<u64> {
        let proof = proof.map(|p| p.trim().to_string()).filter(|p| !p.is_empty());
        let quest = match self
            .store
            .quest_complete(quest_id, agent_id, proof, Utc::now())?
        {
            CasOutcome::Applied(quest) => quest,
            CasOutcome::Mismatch(current) if !current.is_held_by(agent_id) => {
                return Err(StateError::NotClaimedByYou {
                    entity_type: EntityType::Quest,
                    id: quest_id,
                    agent_id,
                }
                .into());
            }
            CasOutcome::Mismatch(current) => {
                return Err(StateError::InvalidState {
                    entity_type: EntityType::Quest,
                    id: quest_id,
                    expected: QuestStatus::Claimed.to_string(),
                    actual: current.status.to_string(),
                }
                .into());
            }
            CasOutcome::Missing => return Err(SwarmError::not_found(EntityType::Quest, quest_id)),
        };

        tracing::info!(quest_id = %quest_id, agent_id = %agent_id, "Quest completed");
        pay_out(
            self.store.as_ref(),
            self.ledger.as_ref(),
            agent_id,
            quest.reward,
            RewardSource::Quest(quest_id),
        )?;
        Ok(quest.reward)
    }

    pub fn get(&self, quest_id: QuestId) -> SwarmResult<Quest> {
        self.store
            .quest_get(quest_id)?
            .ok_or_else(|| SwarmError::not_found(EntityType::Quest, quest_id))
    }

    /// Quests by priority (highest first), then age.
    pub fn list(&self, filter: &QuestFilter) -> SwarmResult<Vec<Quest>> {
        let mut filter = filter.clone();
        filter.limit = Some(filter.limit.unwrap_or(self.config.board_list_limit));
        self.store.quest_list(&filter)
    }

    /// Reopen quests held past the configured claim lease.
    pub fn recover_expired_claims(&self, now: Timestamp) -> SwarmResult<Vec<QuestId>> {
        let Some(cutoff) = self.config.claim_lease.cutoff(now) else {
            return Ok(Vec::new());
        };
        let released = self.store.quest_release_expired(cutoff)?;
        if !released.is_empty() {
            tracing::info!(count = released.len(), "Reopened expired quest claims");
        }
        Ok(released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{AgentRegistry, NewAgent};
    use crate::test_support::MemoryLedger;
    use swarm_core::{AgentStatus, ValidationError};
    use swarm_storage::InMemoryStore;

    const DESCRIPTION: &str = "Write regression tests for the login flow.";

    struct Fixture {
        board: QuestBoard,
        registry: AgentRegistry,
        ledger: Arc<MemoryLedger>,
    }

    fn fixture_with(config: SwarmConfig, ledger: MemoryLedger) -> Fixture {
        let store: Arc<dyn SwarmStore> = Arc::new(InMemoryStore::new());
        let ledger = Arc::new(ledger);
        Fixture {
            board: QuestBoard::new(Arc::clone(&store), Arc::new(config), ledger.clone()),
            registry: AgentRegistry::new(store),
            ledger,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(SwarmConfig::default(), MemoryLedger::default())
    }

    fn agent(fx: &Fixture, slug: &str) -> AgentId {
        fx.registry
            .register(NewAgent::new(slug, slug))
            .unwrap()
            .agent
            .agent_id
    }

    #[test]
    fn test_create_validates() {
        let fx = fixture();
        let err = fx.board.create(QuestSpec::new("Test", DESCRIPTION, 10)).unwrap_err();
        assert!(matches!(err, SwarmError::Validation(ValidationError::TooShort { .. })));

        let err = fx
            .board
            .create(QuestSpec::new("Login tests", DESCRIPTION, 0))
            .unwrap_err();
        assert!(matches!(err, SwarmError::Validation(ValidationError::OutOfRange { .. })));

        let err = fx
            .board
            .create(QuestSpec::new("Login tests", DESCRIPTION, 10).created_by(new_entity_id()))
            .unwrap_err();
        assert!(err.is_not_found());

        let quest = fx
            .board
            .create(QuestSpec::new("  Login tests  ", DESCRIPTION, 10))
            .unwrap();
        assert_eq!(quest.title, "Login tests");
        assert_eq!(quest.status, QuestStatus::Open);
    }

    #[test]
    fn test_claim_then_complete_pays_once() {
        let fx = fixture();
        let bob = agent(&fx, "bob");
        let quest = fx
            .board
            .create(QuestSpec::new("Login tests", DESCRIPTION, 25))
            .unwrap();

        let claimed = fx.board.claim(quest.quest_id, bob).unwrap();
        assert_eq!(claimed.claimed_by, Some(bob));
        assert!(!claimed.auto_assigned);
        assert_eq!(fx.registry.get(bob).unwrap().status, AgentStatus::Working);

        let paid = fx
            .board
            .complete(quest.quest_id, bob, Some("PR #12".into()))
            .unwrap();
        assert_eq!(paid, 25);
        assert_eq!(fx.ledger.total(), 25);
        assert_eq!(fx.registry.get(bob).unwrap().counters.credits_earned, 25);

        let err = fx.board.complete(quest.quest_id, bob, None).unwrap_err();
        assert!(matches!(err, SwarmError::State(StateError::InvalidState { .. })));
        assert_eq!(fx.ledger.total(), 25);
    }

    #[test]
    fn test_claim_taken_quest_conflicts() {
        let fx = fixture();
        let bob = agent(&fx, "bob");
        let alice = agent(&fx, "alice");
        let quest = fx
            .board
            .create(QuestSpec::new("Login tests", DESCRIPTION, 25))
            .unwrap();
        fx.board.claim(quest.quest_id, bob).unwrap();

        let err = fx.board.claim(quest.quest_id, alice).unwrap_err();
        assert!(err.is_conflict());
        let err = fx.board.complete(quest.quest_id, alice, None).unwrap_err();
        assert!(matches!(err, SwarmError::State(StateError::NotClaimedByYou { .. })));
        assert_eq!(fx.registry.get(alice).unwrap().status, AgentStatus::Idle);
    }

    #[test]
    fn test_ledger_failure_keeps_completion() {
        let fx = fixture_with(SwarmConfig::default(), MemoryLedger::failing());
        let bob = agent(&fx, "bob");
        let quest = fx
            .board
            .create(QuestSpec::new("Login tests", DESCRIPTION, 25))
            .unwrap();
        fx.board.claim(quest.quest_id, bob).unwrap();

        let err = fx.board.complete(quest.quest_id, bob, None).unwrap_err();
        assert!(matches!(err, SwarmError::Collaborator(_)));
        assert_eq!(fx.board.get(quest.quest_id).unwrap().status, QuestStatus::Completed);
        assert_eq!(fx.registry.get(bob).unwrap().counters.credits_earned, 0);
    }

    #[test]
    fn test_recover_expired_claims() {
        let fx = fixture_with(
            SwarmConfig::default().with_claim_lease(std::time::Duration::from_secs(3600)),
            MemoryLedger::default(),
        );
        let bob = agent(&fx, "bob");
        let quest = fx
            .board
            .create(QuestSpec::new("Login tests", DESCRIPTION, 25))
            .unwrap();
        fx.board.claim(quest.quest_id, bob).unwrap();

        assert!(fx.board.recover_expired_claims(Utc::now()).unwrap().is_empty());
        let later = Utc::now() + chrono::Duration::hours(2);
        assert_eq!(fx.board.recover_expired_claims(later).unwrap(), vec![quest.quest_id]);

        let reopened = fx.board.get(quest.quest_id).unwrap();
        assert_eq!(reopened.status, QuestStatus::Open);
        assert_eq!(reopened.claimed_by, None);
    }

    #[test]
    fn test_no_lease_never_recovers() {
        let fx = fixture();
        let bob = agent(&fx, "bob");
        let quest = fx
            .board
            .create(QuestSpec::new("Login tests", DESCRIPTION, 25))
            .unwrap();
        fx.board.claim(quest.quest_id, bob).unwrap();
        let far = Utc::now() + chrono::Duration::days(365);
        assert!(fx.board.recover_expired_claims(far).unwrap().is_empty());
    }

    #[test]
    fn test_list_by_priority() {
        let fx = fixture();
        let low = fx
            .board
            .create(QuestSpec::new("Low priority", DESCRIPTION, 5).with_priority(1))
            .unwrap();
        let high = fx
            .board
            .create(QuestSpec::new("High priority", DESCRIPTION, 5).with_priority(9))
            .unwrap();
        let listed = fx.board.list(&QuestFilter::default()).unwrap();
        let ids: Vec<_> = listed.iter().map(|q| q.quest_id).collect();
        assert_eq!(ids, vec![high.quest_id, low.quest_id]);
    }
}
