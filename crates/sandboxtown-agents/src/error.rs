//! Error types for the sandboxtown-agents crate.
//!
//! The taxonomy follows the status machine's contract: configuration errors
//! are fatal at construction, domain errors are precondition violations from
//! an upstream collaborator, and internal invariant errors indicate a logic
//! defect. None of them is ever used for normal control flow; a hysteresis
//! "hold" is an ordinary return value.

use sandboxtown_types::AgentId;

/// Errors that can occur during agent state operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AgentError {
    /// Invalid contagion or threshold configuration (e.g. weight outside
    /// `[0, 1]`). Fatal, never retried.
    #[error("invalid configuration: {reason}")]
    Config {
        /// Description of what is wrong with the configuration.
        reason: String,
    },

    /// A signal value outside its declared domain reached the evaluator.
    #[error("signal `{field}` out of domain [0, 1]: {value}")]
    Domain {
        /// Name of the offending signal field.
        field: &'static str,
        /// The value that was rejected.
        value: f64,
    },

    /// A value that must be in range after clamping was not. Indicates a
    /// logic defect; must not be swallowed.
    #[error("internal invariant violated: {context}")]
    InternalInvariant {
        /// Description of the violated invariant.
        context: String,
    },

    /// Agent with the given ID is not part of the roster.
    #[error("agent not found: {0}")]
    AgentNotFound(AgentId),

    /// A per-step batch did not contain exactly one entry per agent.
    #[error("expected {expected} entries (one per agent), got {actual}")]
    RosterMismatch {
        /// Number of agents in the roster.
        expected: usize,
        /// Number of entries supplied.
        actual: usize,
    },

    /// A counter overflowed.
    #[error("arithmetic overflow: {context}")]
    ArithmeticOverflow {
        /// Description of what was being computed.
        context: String,
    },
}
