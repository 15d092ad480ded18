//! Identifier generation for nodes, buttons and edges
//!
//! Ids combine a millisecond timestamp with a counter owned by an
//! [`IdGenerator`]. The generator is passed explicitly to every operation
//! that creates ids, so there is no shared global counter.
//!
//! These ids only need to be unique within an editing session. They are not
//! security tokens.

use chrono::Utc;

use crate::constants::prefixes;

/// Produces practically-unique string ids for one editing session
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    counter: u64,
}

impl IdGenerator {
    /// Create a generator starting at counter zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a generator that continues after `counter`
    ///
    /// Useful when resuming a session whose ids were produced elsewhere.
    pub fn starting_at(counter: u64) -> Self {
        Self { counter }
    }

    /// Generate a new id of the form `{prefix}_{millis}_{counter}`
    pub fn generate_id(&mut self, prefix: &str) -> String {
        self.counter += 1;
        format!("{}_{}_{}", prefix, Utc::now().timestamp_millis(), self.counter)
    }

    /// Number of ids handed out so far
    pub fn issued(&self) -> u64 {
        self.counter
    }
}

/// Deterministic button id derived from the owning node and list position
///
/// Only unique for the default buttons of a freshly created node. Buttons
/// added later get ids from [`IdGenerator::generate_id`], since positions are
/// reused after a removal.
pub fn generate_button_id(node_id: &str, index: usize) -> String {
    format!("{}_btn_{}", node_id, index)
}

/// Edge id for the connection leaving `source` through `handle`
///
/// A handle has at most one outgoing edge, so the triple is unique within a
/// flow. Source and handle are length-prefixed (`edge_1.a_3.b_c_d`) because
/// node and button ids may themselves contain underscores.
pub fn generate_edge_id(source: &str, handle: &str, target: &str) -> String {
    format!(
        "{}_{}.{}_{}.{}_{}",
        prefixes::EDGE,
        source.len(),
        source,
        handle.len(),
        handle,
        target
    )
}
