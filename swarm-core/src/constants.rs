//! Constants for swarm coordination
//!
//! Defaults used by [`crate::SwarmConfig`] and the entity validators.

// ============================================================================
// AGENT IDENTITY
// ============================================================================

/// Role assigned when an agent registers without one
pub const DEFAULT_ROLE: &str = "general";

/// Maximum display name length in characters
pub const MAX_DISPLAY_NAME_LEN: usize = 80;

/// Maximum objective length in characters
pub const MAX_OBJECTIVE_LEN: usize = 500;

/// Prefix of issued bearer credentials
pub const CREDENTIAL_PREFIX: &str = "swarm_";

/// Random bytes in a credential (hex-encoded after the prefix)
pub const CREDENTIAL_BYTES: usize = 32;

// ============================================================================
// SUBMISSIONS
// ============================================================================

/// Minimum title length after trimming
pub const DEFAULT_MIN_TITLE_LEN: usize = 5;

/// Stored titles are truncated to this many characters
pub const DEFAULT_MAX_TITLE_LEN: usize = 100;

/// Minimum content/description length after trimming
pub const DEFAULT_MIN_CONTENT_LEN: usize = 20;

// ============================================================================
// WORK BOARDS
// ============================================================================

pub const QUEST_REWARD_MIN: u64 = 1;
pub const QUEST_REWARD_MAX: u64 = 1000;

pub const BOUNTY_REWARD_MIN: u64 = 1;
pub const BOUNTY_REWARD_MAX: u64 = 10_000;

/// Maximum bounties one agent may hold in claimed/in_progress/review
pub const DEFAULT_BOUNTY_CLAIM_LIMIT: usize = 3;

/// Default page size for board listings
pub const DEFAULT_BOARD_LIST_LIMIT: usize = 50;

// ============================================================================
// MATCHER
// ============================================================================

/// Seconds between matcher passes
pub const DEFAULT_MATCHER_INTERVAL_SECS: u64 = 60;

/// Idle agents considered per pass
pub const DEFAULT_MATCHER_AGENT_BATCH: usize = 10;

/// Open quests considered per pass
pub const DEFAULT_MATCHER_QUEST_BATCH: usize = 20;

// ============================================================================
// MESSAGING
// ============================================================================

/// Maximum message content length in characters
pub const DEFAULT_MESSAGE_MAX_LEN: usize = 2000;

/// Default page size for inbox listings
pub const DEFAULT_MESSAGE_LIST_LIMIT: usize = 50;

/// Upper bound on a single inbox page
pub const MAX_MESSAGE_LIST_LIMIT: usize = 200;
