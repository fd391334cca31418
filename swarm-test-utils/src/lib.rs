//! Swarm Test Utilities
//!
//! Shared test infrastructure for the swarm workspace:
//! - A wired-up [`TestSwarm`] over the in-memory store
//! - Recording fakes for the reward ledger, wake notifier and drafter
//! - Proptest generators for identifiers, enums and submissions
//! - Fixtures and assertions for common scenarios

pub use swarm_storage::InMemoryStore;

pub use swarm_core::{
    Agent, AgentEvent, AgentId, AgentStatus, BountyId, BountySpec, CollaboratorError, EntityId,
    ErrorKind, ProposalId, QuestId, QuestSpec, Submission, SubmissionType, SwarmConfig,
    SwarmError, SwarmResult, WakeReason,
};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use swarm_agents::{
    AgentRegistry, AutonomyMatcher, BountyBoard, MessagingChannel, NewAgent, ProposalDrafter,
    ProposalWorkflow, QuestBoard, Registration, RewardGrant, RewardLedger, WakeNotifier,
};
use swarm_storage::SwarmStore;
use tracing_subscriber::EnvFilter;

// ============================================================================
// TRACING
// ============================================================================

/// Install a test-friendly subscriber once per process. `RUST_LOG` overrides
/// the default filter.
pub fn init_test_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("swarm_agents=debug,swarm_storage=debug,warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// RECORDING FAKES
// ============================================================================

/// Reward ledger that keeps every accepted grant. Can be switched into a
/// failing mode to exercise the post-completion error path.
#[derive(Debug, Default)]
pub struct RecordingLedger {
    grants: Mutex<Vec<RewardGrant>>,
    failing: AtomicBool,
}

impl RecordingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn grants(&self) -> Vec<RewardGrant> {
        lock(&self.grants).clone()
    }

    pub fn total_paid(&self) -> u64 {
        lock(&self.grants).iter().map(|g| g.amount).sum()
    }
}

impl RewardLedger for RecordingLedger {
    fn credit(&self, grant: &RewardGrant) -> Result<(), CollaboratorError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CollaboratorError::LedgerFailed {
                reason: "ledger unavailable".to_string(),
            });
        }
        lock(&self.grants).push(grant.clone());
        Ok(())
    }
}

/// One recorded wake request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WakeRequest {
    pub agent_id: AgentId,
    pub reason: WakeReason,
    pub work_item_id: Option<EntityId>,
}

#[derive(Debug, Default)]
pub struct RecordingWakeNotifier {
    requests: Mutex<Vec<WakeRequest>>,
    failing: AtomicBool,
}

impl RecordingWakeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<WakeRequest> {
        lock(&self.requests).clone()
    }
}

impl WakeNotifier for RecordingWakeNotifier {
    fn enqueue_wake(
        &self,
        agent_id: AgentId,
        reason: WakeReason,
        work_item_id: Option<EntityId>,
    ) -> Result<(), CollaboratorError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CollaboratorError::NotificationFailed {
                reason: "wake queue unavailable".to_string(),
            });
        }
        lock(&self.requests).push(WakeRequest {
            agent_id,
            reason,
            work_item_id,
        });
        Ok(())
    }
}

/// Drafter that always returns the same submission, or always fails.
#[derive(Debug, Clone)]
pub struct FixedDrafter {
    result: Result<Submission, CollaboratorError>,
}

impl FixedDrafter {
    pub fn new(submission: Submission) -> Self {
        Self {
            result: Ok(submission),
        }
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            result: Err(CollaboratorError::DraftFailed {
                reason: reason.into(),
            }),
        }
    }
}

impl ProposalDrafter for FixedDrafter {
    fn draft(&self, _agent: &Agent) -> Result<Submission, CollaboratorError> {
        self.result.clone()
    }
}

// ============================================================================
// HARNESS
// ============================================================================

/// Every service wired to one in-memory store.
pub struct TestSwarm {
    pub store: Arc<InMemoryStore>,
    pub config: Arc<SwarmConfig>,
    pub registry: AgentRegistry,
    pub workflow: ProposalWorkflow,
    pub quests: QuestBoard,
    pub bounties: BountyBoard,
    pub messaging: MessagingChannel,
    pub matcher: AutonomyMatcher,
    pub ledger: Arc<RecordingLedger>,
    pub notifier: Arc<RecordingWakeNotifier>,
}

impl TestSwarm {
    pub fn new() -> Self {
        Self::with_config(SwarmConfig::default())
    }

    pub fn with_config(config: SwarmConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let dyn_store: Arc<dyn SwarmStore> = store.clone();
        let config = Arc::new(config);
        let ledger = Arc::new(RecordingLedger::new());
        let notifier = Arc::new(RecordingWakeNotifier::new());

        let quests = QuestBoard::new(Arc::clone(&dyn_store), Arc::clone(&config), ledger.clone());
        let bounties =
            BountyBoard::new(Arc::clone(&dyn_store), Arc::clone(&config), ledger.clone());
        let matcher = AutonomyMatcher::new(
            Arc::clone(&dyn_store),
            Arc::clone(&config),
            quests.clone(),
            notifier.clone(),
        );

        Self {
            registry: AgentRegistry::new(Arc::clone(&dyn_store)),
            workflow: ProposalWorkflow::new(Arc::clone(&dyn_store), Arc::clone(&config)),
            messaging: MessagingChannel::new(Arc::clone(&dyn_store), Arc::clone(&config)),
            quests,
            bounties,
            matcher,
            ledger,
            notifier,
            config,
            store,
        }
    }

    /// Register an agent and return its id.
    #[track_caller]
    pub fn register(&self, slug: &str, role: &str) -> AgentId {
        self.register_full(slug, role).agent.agent_id
    }

    #[track_caller]
    pub fn register_full(&self, slug: &str, role: &str) -> Registration {
        match self
            .registry
            .register(NewAgent::new(slug, fixtures::display_name(slug)).with_role(role))
        {
            Ok(registration) => registration,
            Err(e) => panic!("failed to register {slug}: {e}"),
        }
    }

    #[track_caller]
    pub fn agent(&self, agent_id: AgentId) -> Agent {
        match self.registry.get(agent_id) {
            Ok(agent) => agent,
            Err(e) => panic!("agent {agent_id} missing: {e}"),
        }
    }

    #[track_caller]
    pub fn status(&self, agent_id: AgentId) -> AgentStatus {
        self.agent(agent_id).status
    }
}

impl Default for TestSwarm {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for swarm types.

    use super::*;
    use proptest::prelude::*;
    use swarm_core::ReviewDecision;

    /// A slug accepted by registration.
    pub fn arb_slug() -> impl Strategy<Value = String> {
        "[a-z0-9][a-z0-9_-]{1,20}"
    }

    pub fn arb_role() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("general".to_string()),
            Just("qa_tester".to_string()),
            Just("builder".to_string()),
            Just("researcher".to_string()),
        ]
    }

    pub fn arb_submission_type() -> impl Strategy<Value = SubmissionType> {
        prop::sample::select(SubmissionType::ALL.to_vec())
    }

    pub fn arb_review_decision() -> impl Strategy<Value = ReviewDecision> {
        prop_oneof![Just(ReviewDecision::Passed), Just(ReviewDecision::Rejected)]
    }

    /// A submission that passes validation under the default config.
    pub fn arb_valid_submission() -> impl Strategy<Value = Submission> {
        (
            "[A-Za-z][A-Za-z ]{4,60}[A-Za-z]",
            "[A-Za-z][A-Za-z .,]{20,200}[A-Za-z.]",
            arb_submission_type(),
            proptest::option::of(0u64..100_000),
        )
            .prop_map(|(title, content, submission_type, tokens)| {
                let mut submission = Submission::proposal(title, content).with_type(submission_type);
                submission.tokens_used = tokens;
                submission
            })
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Canned inputs that satisfy the default validation rules.

    use super::*;

    pub const SAMPLE_CONTENT: &str =
        "Users are logged out when the session cookie expires mid-request.";

    pub fn display_name(slug: &str) -> String {
        let mut chars = slug.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => "Agent".to_string(),
        }
    }

    pub fn proposal(title: &str) -> Submission {
        Submission::proposal(title, SAMPLE_CONTENT)
    }

    pub fn submission(title: &str, submission_type: SubmissionType) -> Submission {
        proposal(title).with_type(submission_type)
    }

    pub fn quest_spec(title: &str, reward: u64) -> QuestSpec {
        QuestSpec::new(title, "Reproduce, fix and cover the failure with a test.", reward)
    }

    pub fn bounty_spec(title: &str, reward: u64) -> BountySpec {
        BountySpec::new(title, "Deliver a written report with reproduction steps.", reward)
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions on swarm error categories.

    use super::*;

    #[track_caller]
    pub fn assert_kind<T: std::fmt::Debug>(result: &SwarmResult<T>, kind: ErrorKind) {
        match result {
            Err(e) => assert_eq!(e.kind(), kind, "wrong error kind for {e:?}"),
            Ok(value) => panic!("Expected {kind:?} error, got Ok({value:?})"),
        }
    }

    #[track_caller]
    pub fn assert_conflict<T: std::fmt::Debug>(result: &SwarmResult<T>) {
        assert_kind(result, ErrorKind::Conflict);
    }

    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &SwarmResult<T>) {
        assert_kind(result, ErrorKind::NotFound);
    }
}
