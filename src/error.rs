//! Crate-wide error types, one enum per subsystem.
//!
//! Each subsystem owns its error type rather than funnelling everything
//! through a single catch-all; callers that need to collect several kinds
//! reach for `anyhow` at the boundary (CLI, tick loop).

use std::time::Duration;

/// Errors from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("database pool error: {0}")]
    Pool(String),

    #[error("database query failed: {0}")]
    Query(#[from] tokio_postgres::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("row not found")]
    NotFound,

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors from the hormone (event) bus. Subscriber panics are caught and
/// logged rather than surfaced here; this enum exists mainly so `emit`
/// and `subscribe` share a uniform `Result` shape with the rest of the
/// crate.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("cascade depth {depth} exceeded max {max}; event {event} dropped")]
    CascadeDepthExceeded {
        event: String,
        depth: u32,
        max: u32,
    },
}

/// Errors from the external text-generation service.
///
/// Call sites specified as "fallback by emptiness" convert these to
/// `None`/`""` at the boundary and never let them reach the tick loop;
/// the type exists so the client itself is unit-testable.
#[derive(Debug, thiserror::Error)]
pub enum TextModelError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("no response body")]
    Empty,
}

/// Errors from agent capability execution and lifecycle management.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("unknown capability: {0}")]
    UnknownCapability(String),

    #[error("agent capacity exceeded: {active}/{max} active")]
    CapacityExceeded { active: usize, max: usize },

    #[error("capability denied by user")]
    Denied,

    #[error("path escapes workspace root: {0}")]
    PathEscape(String),

    #[error("subprocess timed out after {0:?}")]
    Timeout(Duration),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Store(#[from] DatabaseError),
}

/// User-facing validation errors. Surfaced to API callers without being
/// logged at `error` level.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("unknown seed id: {0}")]
    UnknownSeed(String),

    #[error("unknown sprout id: {0}")]
    UnknownSprout(String),

    #[error("unknown agent type: {0}")]
    UnknownAgentType(String),

    #[error("seed {0} is already composted")]
    AlreadyComposted(String),

    #[error("seed {0} is not composted, cannot resurrect")]
    NotComposted(String),

    #[error("invalid setting path: {0}")]
    InvalidSettingPath(String),

    #[error("invalid setting value for {path}: {reason}")]
    InvalidSettingValue { path: String, reason: String },
}

pub type DbResult<T> = std::result::Result<T, DatabaseError>;
pub type BusResult<T> = std::result::Result<T, BusError>;
pub type TextModelResult<T> = std::result::Result<T, TextModelError>;
pub type AgentResult<T> = std::result::Result<T, AgentError>;
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;
