//! Bounty Board
//!
//! Bounties are claimed explicitly, subject to a per-agent cap, and move
//! `claimed → in_progress → review → completed` under their holder.

use crate::board::{load_claimant, pay_out, start_work};
use crate::sinks::{RewardLedger, RewardSource};
use chrono::Utc;
use std::sync::Arc;
use swarm_core::{
    new_entity_id, validate_role, AgentId, Bounty, BountyFilter, BountyId, BountySpec,
    BountyStatus, ConflictError, EntityType, StateError, SwarmConfig, SwarmError, SwarmResult,
    Timestamp, WakeReason, WorkItemRules,
};
use swarm_storage::{BountyClaimOutcome, CasOutcome, SwarmStore};

#[derive(Clone)]
pub struct BountyBoard {
    store: Arc<dyn SwarmStore>,
    config: Arc<SwarmConfig>,
    ledger: Arc<dyn RewardLedger>,
}

impl BountyBoard {
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
            reward_min: self.config.bounty_reward_min,
            reward_max: self.config.bounty_reward_max,
        }
    }

    fn not_held(bounty_id: BountyId, agent_id: AgentId) -> SwarmError {
        StateError::NotClaimedByYou {
            entity_type: EntityType::Bounty,
            id: bounty_id,
            agent_id,
        }
        .into()
    }

    fn invalid_state(bounty_id: BountyId, expected: &str, actual: BountyStatus) -> SwarmError {
        StateError::InvalidState {
            entity_type: EntityType::Bounty,
            id: bounty_id,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
        .into()
    }

    pub fn create(&self, mut spec: BountySpec) -> SwarmResult<Bounty> {
        let (title, description) = self.rules().check(&spec.title, &spec.description, spec.reward)?;
        spec.title = title;
        spec.description = description;
        if let Some(role) = spec.required_role.as_deref() {
            validate_role(role)?;
        }

        let bounty = Bounty::new(new_entity_id(), spec, Utc::now());
        self.store.bounty_insert(&bounty)?;
        tracing::info!(bounty_id = %bounty.bounty_id, reward = bounty.reward, "Bounty posted");
        Ok(bounty)
    }

    pub fn claim(&self, bounty_id: BountyId, agent_id: AgentId) -> SwarmResult<Bounty> {
        load_claimant(self.store.as_ref(), agent_id)?;

        let limit = self.config.bounty_claim_limit;
        let bounty = match self
            .store
            .bounty_claim_if_open(bounty_id, agent_id, limit, Utc::now())?
        {
            BountyClaimOutcome::Claimed(bounty) => bounty,
            BountyClaimOutcome::AlreadyClaimed(_) => {
                tracing::debug!(bounty_id = %bounty_id, agent_id = %agent_id, "Bounty already claimed");
                return Err(ConflictError::AlreadyClaimed {
                    entity_type: EntityType::Bounty,
                    id: bounty_id,
                }
                .into());
            }
            BountyClaimOutcome::LimitReached { held } => {
                tracing::debug!(agent_id = %agent_id, held, limit, "Bounty claim limit reached");
                return Err(ConflictError::ClaimLimitExceeded {
                    agent_id,
                    held,
                    limit,
                }
                .into());
            }
            BountyClaimOutcome::Missing => {
                return Err(SwarmError::not_found(EntityType::Bounty, bounty_id));
            }
        };

        start_work(
            self.store.as_ref(),
            agent_id,
            WakeReason::BountyClaimed,
            bounty_id,
        )?;
        tracing::info!(bounty_id = %bounty_id, agent_id = %agent_id, "Bounty claimed");
        Ok(bounty)
    }

    fn advance(
        &self,
        bounty_id: BountyId,
        agent_id: AgentId,
        from: BountyStatus,
        to: BountyStatus,
    ) -> SwarmResult<Bounty> {
        match self.store.bounty_advance(bounty_id, agent_id, from, to)? {
            CasOutcome::Applied(bounty) => {
                tracing::info!(
                    bounty_id = %bounty_id,
                    agent_id = %agent_id,
                    status = %to,
                    "Bounty advanced"
                );
                Ok(bounty)
            }
            CasOutcome::Mismatch(current) if !current.is_held_by(agent_id) => {
                Err(Self::not_held(bounty_id, agent_id))
            }
            CasOutcome::Mismatch(current) => {
                Err(Self::invalid_state(bounty_id, from.as_db_str(), current.status))
            }
            CasOutcome::Missing => Err(SwarmError::not_found(EntityType::Bounty, bounty_id)),
        }
    }

    /// `claimed → in_progress`.
    pub fn start(&self, bounty_id: BountyId, agent_id: AgentId) -> SwarmResult<Bounty> {
        self.advance(
            bounty_id,
            agent_id,
            BountyStatus::Claimed,
            BountyStatus::InProgress,
        )
    }

    /// `in_progress → review`.
    pub fn submit_for_review(&self, bounty_id: BountyId, agent_id: AgentId) -> SwarmResult<Bounty> {
        self.advance(
            bounty_id,
            agent_id,
            BountyStatus::InProgress,
            BountyStatus::Review,
        )
    }

    /// Complete a held bounty and pay its reward. Returns the amount paid.
    pub fn complete(
        &self,
        bounty_id: BountyId,
        agent_id: AgentId,
        proof: Option<String>,
    ) -> SwarmResult<u64> {
        let proof = proof.map(|p| p.trim().to_string()).filter(|p| !p.is_empty());
        let bounty = match self
            .store
            .bounty_complete(bounty_id, agent_id, proof, Utc::now())?
        {
            CasOutcome::Applied(bounty) => bounty,
            CasOutcome::Mismatch(current) if !current.is_held_by(agent_id) => {
                return Err(Self::not_held(bounty_id, agent_id));
            }
            CasOutcome::Mismatch(current) => {
                return Err(Self::invalid_state(
                    bounty_id,
                    "claimed, in_progress or review",
                    current.status,
                ));
            }
            CasOutcome::Missing => {
                return Err(SwarmError::not_found(EntityType::Bounty, bounty_id));
            }
        };

        tracing::info!(bounty_id = %bounty_id, agent_id = %agent_id, "Bounty completed");
        pay_out(
            self.store.as_ref(),
            self.ledger.as_ref(),
            agent_id,
            bounty.reward,
            RewardSource::Bounty(bounty_id),
        )?;
        Ok(bounty.reward)
    }

    pub fn get(&self, bounty_id: BountyId) -> SwarmResult<Bounty> {
        self.store
            .bounty_get(bounty_id)?
            .ok_or_else(|| SwarmError::not_found(EntityType::Bounty, bounty_id))
    }

    /// Bounties, newest first.
    pub fn list(&self, filter: &BountyFilter) -> SwarmResult<Vec<Bounty>> {
        let mut filter = filter.clone();
        filter.limit = Some(filter.limit.unwrap_or(self.config.board_list_limit));
        self.store.bounty_list(&filter)
    }

    /// Reopen bounties held past the configured claim lease.
    pub fn recover_expired_claims(&self, now: Timestamp) -> SwarmResult<Vec<BountyId>> {
        let Some(cutoff) = self.config.claim_lease.cutoff(now) else {
            return Ok(Vec::new());
        };
        let released = self.store.bounty_release_expired(cutoff)?;
        if !released.is_empty() {
            tracing::info!(count = released.len(), "Reopened expired bounty claims");
        }
        Ok(released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{AgentRegistry, NewAgent};
    use crate::test_support::MemoryLedger;
    use swarm_core::AgentStatus;
    use swarm_storage::InMemoryStore;

    const DESCRIPTION: &str = "Audit the reward contract for overflow bugs.";

    struct Fixture {
        board: BountyBoard,
        registry: AgentRegistry,
        ledger: Arc<MemoryLedger>,
    }

    fn fixture() -> Fixture {
        let store: Arc<dyn SwarmStore> = Arc::new(InMemoryStore::new());
        let ledger = Arc::new(MemoryLedger::default());
        Fixture {
            board: BountyBoard::new(
                Arc::clone(&store),
                Arc::new(SwarmConfig::default()),
                ledger.clone(),
            ),
            registry: AgentRegistry::new(store),
            ledger,
        }
    }

    fn agent(fx: &Fixture, slug: &str) -> AgentId {
        fx.registry
            .register(NewAgent::new(slug, slug))
            .unwrap()
            .agent
            .agent_id
    }

    fn post(fx: &Fixture, title: &str, reward: u64) -> BountyId {
        fx.board
            .create(BountySpec::new(title, DESCRIPTION, reward))
            .unwrap()
            .bounty_id
    }

    #[test]
    fn test_full_lifecycle() {
        let fx = fixture();
        let bob = agent(&fx, "bob");
        let id = post(&fx, "Contract audit", 500);

        assert_eq!(fx.board.claim(id, bob).unwrap().status, BountyStatus::Claimed);
        assert_eq!(fx.registry.get(bob).unwrap().status, AgentStatus::Working);
        assert_eq!(fx.board.start(id, bob).unwrap().status, BountyStatus::InProgress);
        assert_eq!(
            fx.board.submit_for_review(id, bob).unwrap().status,
            BountyStatus::Review
        );
        assert_eq!(fx.board.complete(id, bob, Some("report.pdf".into())).unwrap(), 500);

        let bounty = fx.board.get(id).unwrap();
        assert_eq!(bounty.status, BountyStatus::Completed);
        assert_eq!(bounty.proof.as_deref(), Some("report.pdf"));
        assert_eq!(fx.ledger.total(), 500);
    }

    #[test]
    fn test_claim_limit() {
        let fx = fixture();
        let bob = agent(&fx, "bob");
        let ids: Vec<_> = (0..4).map(|i| post(&fx, &format!("Audit part {i}"), 10)).collect();

        for id in &ids[..3] {
            fx.board.claim(*id, bob).unwrap();
        }
        let err = fx.board.claim(ids[3], bob).unwrap_err();
        assert_eq!(
            err,
            SwarmError::Conflict(ConflictError::ClaimLimitExceeded {
                agent_id: bob,
                held: 3,
                limit: 3,
            })
        );
        assert_eq!(fx.board.get(ids[3]).unwrap().status, BountyStatus::Open);

        fx.board.complete(ids[0], bob, None).unwrap();
        fx.board.claim(ids[3], bob).unwrap();
    }

    #[test]
    fn test_advance_checks_holder_and_state() {
        let fx = fixture();
        let bob = agent(&fx, "bob");
        let alice = agent(&fx, "alice");
        let id = post(&fx, "Contract audit", 50);
        fx.board.claim(id, bob).unwrap();

        let err = fx.board.start(id, alice).unwrap_err();
        assert!(matches!(err, SwarmError::State(StateError::NotClaimedByYou { .. })));

        let err = fx.board.submit_for_review(id, bob).unwrap_err();
        assert!(matches!(err, SwarmError::State(StateError::InvalidState { .. })));

        let err = fx.board.claim(id, alice).unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_complete_open_bounty_is_not_held() {
        let fx = fixture();
        let bob = agent(&fx, "bob");
        let id = post(&fx, "Contract audit", 50);
        let err = fx.board.complete(id, bob, None).unwrap_err();
        assert!(matches!(err, SwarmError::State(StateError::NotClaimedByYou { .. })));
        assert_eq!(fx.ledger.total(), 0);
    }
}
