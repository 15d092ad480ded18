//! Cosmetic auto-layout
//!
//! Places nodes by their depth-first position from the trigger: depth picks
//! the row, sibling order picks the offset from the parent's column. Nodes
//! the trigger cannot reach are stacked in a column to the right.
//!
//! Positions depend only on the graph structure, never on the previous
//! positions, so running the layout twice gives the same result.

use std::collections::{HashMap, HashSet};

use crate::config::LayoutConfig;
use crate::types::{AutomationFlow, FlowNode, NodeData, Position};

/// Lay out a flow with the default spacing
pub fn calculate_auto_layout(flow: &AutomationFlow) -> AutomationFlow {
    calculate_auto_layout_with(flow, &LayoutConfig::default())
}

/// Lay out a flow
///
/// Returns the flow unchanged when it has no trigger node.
pub fn calculate_auto_layout_with(flow: &AutomationFlow, config: &LayoutConfig) -> AutomationFlow {
    let mut next = flow.clone();
    let Some(trigger) = flow.trigger_node() else {
        log::warn!("calculate_auto_layout: flow has no trigger node, positions left as they are");
        return next;
    };

    let mut positions: HashMap<&str, Position> = HashMap::new();
    let mut visited: HashSet<&str> = HashSet::new();
    place(
        flow,
        trigger,
        Position::new(config.start_x, config.start_y),
        config,
        &mut visited,
        &mut positions,
    );

    let right_edge = positions
        .values()
        .map(|p| p.x)
        .fold(config.start_x, f64::max);
    let mut stray_row = 0.0;
    for node in &flow.nodes {
        if !positions.contains_key(node.id.as_str()) {
            positions.insert(
                node.id.as_str(),
                Position::new(
                    right_edge + config.horizontal_spacing,
                    config.start_y + stray_row * config.vertical_spacing,
                ),
            );
            stray_row += 1.0;
        }
    }

    for node in &mut next.nodes {
        if let Some(position) = positions.get(node.id.as_str()) {
            node.position = *position;
        }
    }
    log::debug!("Laid out {} nodes", positions.len());
    next
}

/// Children of a node in display order
///
/// Message nodes list their buttons' targets in button order; other nodes
/// follow edge order.
fn children<'a>(flow: &'a AutomationFlow, node: &'a FlowNode) -> Vec<&'a str> {
    match &node.data {
        NodeData::Message(data) => data
            .buttons
            .iter()
            .filter_map(|b| flow.edge_from_handle(&node.id, &b.id))
            .map(|e| e.target.as_str())
            .collect(),
        _ => flow
            .outgoing_edges(&node.id)
            .map(|e| e.target.as_str())
            .collect(),
    }
}

fn place<'a>(
    flow: &'a AutomationFlow,
    node: &'a FlowNode,
    at: Position,
    config: &LayoutConfig,
    visited: &mut HashSet<&'a str>,
    positions: &mut HashMap<&'a str, Position>,
) {
    if !visited.insert(node.id.as_str()) {
        return;
    }
    positions.insert(node.id.as_str(), at);

    let pending: Vec<&FlowNode> = children(flow, node)
        .into_iter()
        .filter(|id| !visited.contains(id))
        .filter_map(|id| flow.find_node(id))
        .collect();
    let centre = (pending.len() as f64 - 1.0) / 2.0;
    for (index, child) in pending.into_iter().enumerate() {
        let child_at = Position::new(
            at.x + (index as f64 - centre) * config.horizontal_spacing,
            at.y + config.vertical_spacing,
        );
        place(flow, child, child_at, config, visited, positions);
    }
}
