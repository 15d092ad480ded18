//! Tunable limits and layout metrics
//!
//! Defaults come from [`crate::constants`]. Every field has a serde default
//! so a partial JSON file only overrides what it names.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{graph, layout, limits};
use crate::error::Result;

/// Ceilings enforced by the validator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlowLimits {
    pub max_buttons: usize,
    pub max_body_length: usize,
    pub max_header_length: usize,
    pub max_footer_length: usize,
    pub max_button_label_length: usize,
    pub max_name_length: usize,
    pub max_depth: usize,
    pub max_nodes: usize,
}

impl Default for FlowLimits {
    fn default() -> Self {
        Self {
            max_buttons: limits::MAX_BUTTONS,
            max_body_length: limits::MAX_BODY_LENGTH,
            max_header_length: limits::MAX_HEADER_LENGTH,
            max_footer_length: limits::MAX_FOOTER_LENGTH,
            max_button_label_length: limits::MAX_BUTTON_LABEL_LENGTH,
            max_name_length: limits::MAX_NAME_LENGTH,
            max_depth: graph::MAX_DEPTH,
            max_nodes: graph::MAX_NODES,
        }
    }
}

impl FlowLimits {
    /// Load limits from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let limits = serde_json::from_str(&content)?;
        log::debug!("Loaded flow limits from {:?}", path.as_ref());
        Ok(limits)
    }
}

/// Spacing used by the auto-layout pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    pub start_x: f64,
    pub start_y: f64,
    pub horizontal_spacing: f64,
    pub vertical_spacing: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            start_x: layout::START_X,
            start_y: layout::START_Y,
            horizontal_spacing: layout::HORIZONTAL_SPACING,
            vertical_spacing: layout::VERTICAL_SPACING,
        }
    }
}
