//! Error types for the spatial index and the world.
//!
//! Numerically degenerate geometry is never an error; the solver flags it on
//! the result instead. Everything here indicates a broken structural
//! invariant or a bad request from the caller.

use crate::objects::rigid_body::BodyId;

/// Structural failures inside a spatial index. These are bugs, not data.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum IndexError {
    /// Attaching `child` under `parent` would make a node its own ancestor.
    #[error("attaching node {child} under node {parent} would create a cycle")]
    CycleDetected {
        /// The node that would become the parent.
        parent: usize,
        /// The node being attached.
        child: usize,
    },

    /// The holder is not linked into any leaf.
    #[error("holder {0} is not attached to a leaf")]
    DetachedHolder(usize),

    /// An arena slot was used after it was freed.
    #[error("node {0} has been freed")]
    StaleNode(usize),

    /// A holder slot was used after it was freed.
    #[error("holder {0} has been freed")]
    StaleHolder(usize),

    /// A leaf-only operation was applied to an inner node.
    #[error("node {0} is not a leaf")]
    NotALeaf(usize),

    /// Cached bounds, counts or links disagree with the subtree.
    #[error("node {node} is inconsistent: {reason}")]
    Inconsistent {
        /// Offending node.
        node: usize,
        /// What did not match.
        reason: String,
    },
}

/// Errors surfaced by [`crate::world::World`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum PhysicsError {
    /// The broad phase reported a structural failure.
    #[error("spatial index failure: {0}")]
    Index(#[from] IndexError),

    /// No body with this id exists in the world.
    #[error("unknown body {0:?}")]
    UnknownBody(BodyId),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
