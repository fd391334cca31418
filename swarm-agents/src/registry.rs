//! Agent Registry
//!
//! Registration, credential authentication, status events and purge.
//! Credentials are random tokens returned once; only their SHA-256 digest
//! is stored.

use chrono::Utc;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;
use swarm_core::constants::{CREDENTIAL_BYTES, CREDENTIAL_PREFIX, DEFAULT_ROLE};
use swarm_core::{
    new_entity_id, normalize_display_name, normalize_objective, validate_role, validate_slug,
    Agent, AgentCounters, AgentEvent, AgentId, AgentStatus, AuthError, EntityType, SwarmError,
    SwarmResult,
};
use swarm_storage::{PurgeReport, StatusChange, SwarmStore};

/// Plaintext bearer credential. Only handed out by [`AgentRegistry::register`].
#[derive(Clone)]
pub struct AgentCredential(SecretString);

impl AgentCredential {
    fn new(token: String) -> Self {
        Self(SecretString::new(token.into()))
    }

    /// Expose the token (to hand it to the agent, once).
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for AgentCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AgentCredential([REDACTED])")
    }
}

/// Registration request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewAgent {
    pub slug: String,
    pub display_name: String,
    pub objective: Option<String>,
    pub role: Option<String>,
    pub owner_wallet: Option<String>,
}

impl NewAgent {
    pub fn new(slug: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            display_name: display_name.into(),
            ..Self::default()
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_objective(mut self, objective: impl Into<String>) -> Self {
        self.objective = Some(objective.into());
        self
    }

    pub fn with_owner_wallet(mut self, wallet: impl Into<String>) -> Self {
        self.owner_wallet = Some(wallet.into());
        self
    }
}

/// A freshly registered agent and its one-time credential.
#[derive(Debug, Clone)]
pub struct Registration {
    pub agent: Agent,
    pub credential: AgentCredential,
}

/// Hex SHA-256 digest of a credential, as stored.
pub fn hash_credential(credential: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(credential.as_bytes());
    hex::encode(hasher.finalize())
}

fn generate_credential() -> String {
    let mut bytes = [0u8; CREDENTIAL_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    format!("{}{}", CREDENTIAL_PREFIX, hex::encode(bytes))
}

/// Cheap shape check so obviously malformed tokens never reach the store.
fn is_well_formed(credential: &str) -> bool {
    credential
        .strip_prefix(CREDENTIAL_PREFIX)
        .map_or(false, |body| {
            body.len() == CREDENTIAL_BYTES * 2 && body.bytes().all(|b| b.is_ascii_hexdigit())
        })
}

#[derive(Clone)]
pub struct AgentRegistry {
    store: Arc<dyn SwarmStore>,
}

impl AgentRegistry {
    pub fn new(store: Arc<dyn SwarmStore>) -> Self {
        Self { store }
    }

    pub fn register(&self, request: NewAgent) -> SwarmResult<Registration> {
        let slug = request.slug.trim().to_lowercase();
        validate_slug(&slug)?;
        let display_name = normalize_display_name(&request.display_name)?;
        let objective = normalize_objective(request.objective.as_deref())?;
        let role = request
            .role
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_ROLE)
            .to_string();
        validate_role(&role)?;
        let owner_wallet = request
            .owner_wallet
            .map(|w| w.trim().to_string())
            .filter(|w| !w.is_empty());

        let token = generate_credential();
        let now = Utc::now();
        let agent = Agent {
            agent_id: new_entity_id(),
            slug,
            display_name,
            role,
            objective,
            status: AgentStatus::Idle,
            credential_hash: hash_credential(&token),
            owner_wallet,
            counters: AgentCounters::default(),
            created_at: now,
            last_active_at: now,
        };
        self.store.agent_insert(&agent)?;

        tracing::info!(
            agent_id = %agent.agent_id,
            slug = %agent.slug,
            role = %agent.role,
            "Agent registered"
        );

        Ok(Registration {
            agent,
            credential: AgentCredential::new(token),
        })
    }

    /// Resolve a bearer credential to its agent.
    ///
    /// Missing, malformed and unknown tokens all fail the same way.
    pub fn authenticate(&self, credential: &str) -> SwarmResult<Agent> {
        let credential = credential.trim();
        if !is_well_formed(credential) {
            return Err(AuthError::InvalidCredential.into());
        }
        self.store
            .agent_get_by_credential_hash(&hash_credential(credential))?
            .ok_or_else(|| AuthError::InvalidCredential.into())
    }

    pub(crate) fn apply_event(&self, agent_id: AgentId, event: AgentEvent) -> SwarmResult<StatusChange> {
        let change = self.store.agent_apply_event(agent_id, event, Utc::now())?;
        log_status_change(agent_id, event, change);
        Ok(change)
    }

    pub fn purge(&self, agent_id: AgentId) -> SwarmResult<PurgeReport> {
        let report = self.store.agent_purge(agent_id)?;
        tracing::info!(
            agent_id = %agent_id,
            proposals_deleted = report.proposals_deleted,
            messages_deleted = report.messages_deleted,
            claims_reopened = report.claims_reopened.len(),
            "Agent purged"
        );
        Ok(report)
    }

    pub fn get(&self, agent_id: AgentId) -> SwarmResult<Agent> {
        self.store
            .agent_get(agent_id)?
            .ok_or_else(|| SwarmError::not_found(EntityType::Agent, agent_id))
    }

    pub fn get_by_slug(&self, slug: &str) -> SwarmResult<Option<Agent>> {
        self.store.agent_get_by_slug(&slug.trim().to_lowercase())
    }
}

pub(crate) fn log_status_change(agent_id: AgentId, event: AgentEvent, change: StatusChange) {
    if change.changed() {
        tracing::info!(
            agent_id = %agent_id,
            event = %event,
            from = %change.from,
            to = %change.to,
            "Agent status changed"
        );
    }
}
