//! Flow engine constants
//!
//! Single source of truth for the WhatsApp message limits, graph ceilings
//! and layout metrics used by the editor operations and the validator.

/// Per-field length limits imposed by the WhatsApp interactive message API
pub mod limits {
    /// Maximum number of buttons on a single message node
    pub const MAX_BUTTONS: usize = 3;
    /// Maximum message body length
    pub const MAX_BODY_LENGTH: usize = 1024;
    /// Maximum header length
    pub const MAX_HEADER_LENGTH: usize = 60;
    /// Maximum footer length
    pub const MAX_FOOTER_LENGTH: usize = 60;
    /// Maximum button label length
    pub const MAX_BUTTON_LABEL_LENGTH: usize = 20;
    /// Maximum flow name length
    pub const MAX_NAME_LENGTH: usize = 100;
}

/// Structural ceilings for a single flow
pub mod graph {
    /// Longest allowed path (in edges) from the trigger node
    pub const MAX_DEPTH: usize = 10;
    /// Maximum number of nodes in a flow
    pub const MAX_NODES: usize = 50;
}

/// Handle names used on edges
pub mod handles {
    /// Source handle of trigger nodes
    pub const OUTPUT: &str = "output";
    /// Target handle of every node
    pub const INPUT: &str = "input";
}

/// Canvas metrics used for placement and auto-layout
pub mod layout {
    /// Position of the trigger node in a fresh flow
    pub const START_X: f64 = 250.0;
    pub const START_Y: f64 = 50.0;
    /// Nominal rendered node height
    pub const NODE_HEIGHT: f64 = 200.0;
    /// Gap left below the bottom-most node when appending a node
    pub const NODE_MARGIN: f64 = 80.0;
    /// Distance between siblings on the same depth level
    pub const HORIZONTAL_SPACING: f64 = 350.0;
    /// Distance between depth levels
    pub const VERTICAL_SPACING: f64 = 300.0;
}

/// Default content for newly created nodes and flows
pub mod defaults {
    /// Name given to a flow created from scratch
    pub const FLOW_NAME: &str = "Untitled automation";
    /// Body text of a new message node
    pub const MESSAGE_BODY: &str = "Hi! How can we help you today?";
    /// Closing message of a new end node
    pub const END_MESSAGE: &str = "Thank you for contacting us!";
    /// Number of quick reply buttons on a new message node
    pub const BUTTONS_PER_MESSAGE: usize = 2;
    /// Label prefix for generated buttons ("Option 1", "Option 2", ...)
    pub const BUTTON_LABEL_PREFIX: &str = "Option";
}

/// Identifier prefixes
pub mod prefixes {
    pub const TRIGGER: &str = "trigger";
    pub const MESSAGE: &str = "message";
    pub const END: &str = "end";
    pub const BUTTON: &str = "btn";
    pub const EDGE: &str = "edge";
}
