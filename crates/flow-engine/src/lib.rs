//! Flow Engine - Editing model for button-driven chat automations
//!
//! A flow is a small directed graph: one trigger node, message nodes whose
//! quick reply buttons branch the conversation, and end nodes. This crate
//! holds the editing side of it:
//!
//! - Pure graph mutations (every edit returns a new flow)
//! - Validation with structured, severity-tagged issues
//! - Automatic fixes for the issues that have an obvious repair
//! - Deterministic auto-layout
//! - Publication lifecycle gated on validation
//! - Compressed snapshot-based undo/redo
//!
//! # Example
//!
//! ```ignore
//! use flow_engine::{add_message_node, create_empty_flow, validate_flow, IdGenerator};
//!
//! let mut ids = IdGenerator::new();
//! let flow = create_empty_flow(&mut ids, 42, "workspace-1");
//! let flow = add_message_node(&flow, &mut ids, None);
//!
//! for issue in validate_flow(&flow) {
//!     println!("{}", issue);
//! }
//! ```

pub mod builder;
pub mod config;
pub mod constants;
pub mod error;
pub mod history;
pub mod ids;
pub mod layout;
pub mod lifecycle;
pub mod mutations;
pub mod store;
pub mod types;
pub mod validation;

// Re-export key types
pub use builder::FlowBuilder;
pub use config::{FlowLimits, LayoutConfig};
pub use error::{FlowError, Result};
pub use history::{EditSession, FlowHistory, Restored};
pub use ids::{generate_button_id, generate_edge_id, IdGenerator};
pub use layout::{calculate_auto_layout, calculate_auto_layout_with};
pub use lifecycle::{archive, pause, publish};
pub use mutations::{
    add_button, add_edge, add_end_node, add_message_node, create_empty_flow, delete_node,
    remove_button, remove_edge, update_button, update_node, update_node_position, ButtonPatch,
    EndPatch, MessagePatch, NodePatch, TriggerPatch,
};
pub use store::{FlowMetadata, FlowStore};
pub use types::{
    AutomationFlow, ButtonAction, EndNodeData, FlowEdge, FlowNode, FlowStatus, MessageButton,
    MessageNodeData, NodeData, NodeKind, Position, TriggerConfig, TriggerNodeData, TriggerType,
};
pub use validation::{
    apply_auto_fixes, apply_auto_fixes_with, can_publish, has_errors, validate_flow,
    validate_flow_with, IssueCode, Severity, ValidationIssue,
};
