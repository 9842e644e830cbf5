//! Error Handling
//!
//! This module provides the error types for the universal circuit compiler
//! using `thiserror`. Every variant is a hard pipeline abort: apart from
//! malformed input, each one indicates a bug in the construction rather than
//! runtime variability, so there is no recovery path.
//!
//! # Error Categories
//! - **Input errors**: gate-list parsing, Bristol parsing
//! - **Construction errors**: colouring invariants, edge embedding
//! - **Validation errors**: per-block and end-to-end embedding checks
//! - **Programming errors**: Zhao lookup-table misses

use thiserror::Error;

/// Compiler error types.
///
/// Uses `thiserror` for error handling with detailed messages. All variants
/// cite the failing component and entity id where one exists.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UcError {
    /// Gate-list input rejected before the core pipeline runs.
    ///
    /// Occurs when a line of the textual gate list cannot be parsed or the
    /// declared structure is inconsistent (missing wires, bad arity, ...).
    #[error("malformed input: {0}")]
    InputMalformed(String),

    /// The two-colouring terminated with uncoloured edges but no startable
    /// vertex. Cannot occur on well-formed fanin/fanout-2 graphs.
    #[error("coloring invariant violated: {remaining} edges left uncolored")]
    ColoringInvariantViolated { remaining: u32 },

    /// The embedder could not place an edge on either channel of a split.
    #[error("edge embedding impossible for node {node} in {context}")]
    EmbeddingImpossible { node: u32, context: &'static str },

    /// A block failed its local embedding validation walk.
    #[error("block validation failed: {0}")]
    BlockValidationFailed(String),

    /// The end-to-end edge-embedding check found a mismatched edge.
    #[error("edge embedding check failed: expected {expected} -> {dest}, walked back to {found}")]
    EdgeEmbeddingFailed {
        expected: u32,
        dest: u32,
        found: u32,
    },

    /// The Zhao programming table has no entry for a permutation key.
    #[error("programming table miss: {0}")]
    ProgrammingTableMiss(String),
}

impl From<std::io::Error> for UcError {
    #[cold] // Error paths are cold
    fn from(err: std::io::Error) -> Self {
        UcError::InputMalformed(format!("IO error: {}", err))
    }
}
