//! Editor operations on automation flows
//!
//! Every operation borrows the current flow and returns a new one; the
//! input is never modified. Refused operations (deleting the trigger, a
//! fourth button, connecting out of an end node, ...) log a warning and
//! return an unchanged copy.
//!
//! All operations keep quick reply buttons and edges in step: a quick reply
//! button has a target exactly when one edge leaves its node through the
//! button's id.

use crate::constants::{defaults, layout, limits, prefixes};
use crate::ids::{generate_button_id, generate_edge_id, IdGenerator};
use crate::types::{
    AutomationFlow, ButtonAction, EndNodeData, FlowEdge, FlowNode, MessageButton,
    MessageNodeData, NodeData, NodeId, NodeKind, Position, TriggerNodeData, TriggerType,
};

/// Partial update for a trigger node
#[derive(Debug, Clone, Default)]
pub struct TriggerPatch {
    pub trigger_type: Option<TriggerType>,
    pub template_id: Option<Option<String>>,
    pub keywords: Option<Option<Vec<String>>>,
}

/// Partial update for a message node
///
/// `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default)]
pub struct MessagePatch {
    pub header: Option<Option<String>>,
    pub body: Option<String>,
    pub footer: Option<Option<String>>,
    pub buttons: Option<Vec<MessageButton>>,
}

/// Partial update for an end node
#[derive(Debug, Clone, Default)]
pub struct EndPatch {
    pub message: Option<Option<String>>,
    pub show_satisfaction_survey: Option<Option<bool>>,
}

/// Partial node update; the variant must match the node kind
#[derive(Debug, Clone)]
pub enum NodePatch {
    Trigger(TriggerPatch),
    Message(MessagePatch),
    End(EndPatch),
}

/// Partial update for a button
#[derive(Debug, Clone, Default)]
pub struct ButtonPatch {
    pub label: Option<String>,
    pub action: Option<ButtonAction>,
}

/// Create a draft flow holding a single `any_reply` trigger node
pub fn create_empty_flow(
    ids: &mut IdGenerator,
    account_id: i64,
    workspace_id: impl Into<String>,
) -> AutomationFlow {
    let mut flow = AutomationFlow::new(defaults::FLOW_NAME, account_id, workspace_id);
    let trigger = TriggerNodeData::default();
    flow.trigger.sync_from(&trigger);
    flow.nodes.push(FlowNode::new(
        ids.generate_id(prefixes::TRIGGER),
        Position::new(layout::START_X, layout::START_Y),
        NodeData::Trigger(trigger),
    ));
    flow
}

/// Position directly below the bottom-most node
fn next_position(flow: &AutomationFlow) -> Position {
    flow.nodes
        .iter()
        .map(|n| n.position)
        .max_by(|a, b| a.y.total_cmp(&b.y))
        .map(|bottom| Position::new(bottom.x, bottom.y + layout::NODE_HEIGHT + layout::NODE_MARGIN))
        .unwrap_or_else(|| Position::new(layout::START_X, layout::START_Y))
}

fn button_label(index: usize) -> String {
    format!("{} {}", defaults::BUTTON_LABEL_PREFIX, index + 1)
}

/// Append a message node with two unconnected quick reply buttons
pub fn add_message_node(
    flow: &AutomationFlow,
    ids: &mut IdGenerator,
    position: Option<Position>,
) -> AutomationFlow {
    let mut next = flow.clone();
    let id = ids.generate_id(prefixes::MESSAGE);
    let buttons = (0..defaults::BUTTONS_PER_MESSAGE)
        .map(|i| MessageButton::quick_reply(generate_button_id(&id, i), button_label(i)))
        .collect();
    let data = MessageNodeData {
        header: None,
        body: defaults::MESSAGE_BODY.to_string(),
        footer: None,
        buttons,
    };
    log::debug!("Adding message node '{}'", id);
    next.nodes.push(FlowNode::new(
        id,
        position.unwrap_or_else(|| next_position(flow)),
        NodeData::Message(data),
    ));
    next
}

/// Append an end node with a default closing message
pub fn add_end_node(
    flow: &AutomationFlow,
    ids: &mut IdGenerator,
    position: Option<Position>,
) -> AutomationFlow {
    let mut next = flow.clone();
    let id = ids.generate_id(prefixes::END);
    let data = EndNodeData {
        message: Some(defaults::END_MESSAGE.to_string()),
        show_satisfaction_survey: Some(false),
    };
    log::debug!("Adding end node '{}'", id);
    next.nodes.push(FlowNode::new(
        id,
        position.unwrap_or_else(|| next_position(flow)),
        NodeData::End(data),
    ));
    next
}

/// What a successful patch touched
enum PatchOutcome {
    Trigger(TriggerNodeData),
    Buttons,
    Fields,
}

/// Apply `patch` to matching node data, handing it back on a kind mismatch
fn merge_patch(data: &mut NodeData, patch: NodePatch) -> Result<PatchOutcome, NodePatch> {
    match (data, patch) {
        (NodeData::Trigger(data), NodePatch::Trigger(patch)) => {
            if let Some(trigger_type) = patch.trigger_type {
                data.trigger_type = trigger_type;
            }
            if let Some(template_id) = patch.template_id {
                data.template_id = template_id;
            }
            if let Some(keywords) = patch.keywords {
                data.keywords = keywords;
            }
            Ok(PatchOutcome::Trigger(data.clone()))
        }
        (NodeData::Message(data), NodePatch::Message(patch)) => {
            if let Some(header) = patch.header {
                data.header = header;
            }
            if let Some(body) = patch.body {
                data.body = body;
            }
            if let Some(footer) = patch.footer {
                data.footer = footer;
            }
            match patch.buttons {
                Some(buttons) => {
                    data.buttons = buttons;
                    Ok(PatchOutcome::Buttons)
                }
                None => Ok(PatchOutcome::Fields),
            }
        }
        (NodeData::End(data), NodePatch::End(patch)) => {
            if let Some(message) = patch.message {
                data.message = message;
            }
            if let Some(survey) = patch.show_satisfaction_survey {
                data.show_satisfaction_survey = survey;
            }
            Ok(PatchOutcome::Fields)
        }
        (_, patch) => Err(patch),
    }
}

/// Merge `patch` into a node's data
///
/// Replacing a message node's buttons re-syncs that node's edges. Patching
/// the trigger node mirrors the change into `flow.trigger`.
pub fn update_node(flow: &AutomationFlow, node_id: &str, patch: NodePatch) -> AutomationFlow {
    let mut next = flow.clone();
    let Some(node) = next.find_node_mut(node_id) else {
        log::warn!("update_node: node '{}' not found", node_id);
        return next;
    };

    let kind = node.kind();
    match merge_patch(&mut node.data, patch) {
        Ok(PatchOutcome::Trigger(trigger)) => next.trigger.sync_from(&trigger),
        Ok(PatchOutcome::Buttons) => sync_button_edges(&mut next, node_id),
        Ok(PatchOutcome::Fields) => {}
        Err(patch) => {
            log::warn!(
                "update_node: patch {:?} does not match {} node '{}'",
                patch,
                kind,
                node_id
            );
        }
    }
    next
}

/// Move a node on the canvas
pub fn update_node_position(
    flow: &AutomationFlow,
    node_id: &str,
    position: Position,
) -> AutomationFlow {
    let mut next = flow.clone();
    match next.find_node_mut(node_id) {
        Some(node) => node.position = position,
        None => log::warn!("update_node_position: node '{}' not found", node_id),
    }
    next
}

/// Remove a node and every edge touching it
///
/// The trigger node cannot be deleted. Quick replies that pointed at the
/// removed node become unconnected.
pub fn delete_node(flow: &AutomationFlow, node_id: &str) -> AutomationFlow {
    let mut next = flow.clone();
    let Some(node) = next.find_node(node_id) else {
        log::warn!("delete_node: node '{}' not found", node_id);
        return next;
    };
    if node.is_trigger() {
        log::warn!("delete_node: refusing to delete trigger node '{}'", node_id);
        return next;
    }

    next.nodes.retain(|n| n.id != node_id);
    next.edges.retain(|e| e.source != node_id && e.target != node_id);
    for node in &mut next.nodes {
        if let Some(data) = node.as_message_mut() {
            for button in &mut data.buttons {
                if button.action.target() == Some(node_id) {
                    button.action = ButtonAction::quick_reply();
                }
            }
        }
    }
    log::debug!("Deleted node '{}'", node_id);
    next
}

/// Append an unconnected quick reply button to a message node
///
/// Refused once the node already has the maximum number of buttons.
pub fn add_button(flow: &AutomationFlow, ids: &mut IdGenerator, node_id: &str) -> AutomationFlow {
    let mut next = flow.clone();
    let Some(data) = next.find_node_mut(node_id).and_then(FlowNode::as_message_mut) else {
        log::warn!("add_button: '{}' is not a message node", node_id);
        return next;
    };
    if data.buttons.len() >= limits::MAX_BUTTONS {
        log::warn!(
            "add_button: node '{}' already has {} buttons",
            node_id,
            limits::MAX_BUTTONS
        );
        return next;
    }
    let label = button_label(data.buttons.len());
    data.buttons
        .push(MessageButton::quick_reply(ids.generate_id(prefixes::BUTTON), label));
    next
}

/// Merge `patch` into a button and re-sync its edge
pub fn update_button(
    flow: &AutomationFlow,
    node_id: &str,
    button_id: &str,
    patch: ButtonPatch,
) -> AutomationFlow {
    let mut next = flow.clone();
    let Some(button) = next
        .find_node_mut(node_id)
        .and_then(FlowNode::as_message_mut)
        .and_then(|data| data.find_button_mut(button_id))
    else {
        log::warn!("update_button: button '{}' not found on node '{}'", button_id, node_id);
        return next;
    };

    if let Some(label) = patch.label {
        button.label = label;
    }
    if let Some(action) = patch.action {
        button.action = action;
    }
    sync_button_edges(&mut next, node_id);
    next
}

/// Remove a button and the edge keyed to it
pub fn remove_button(flow: &AutomationFlow, node_id: &str, button_id: &str) -> AutomationFlow {
    let mut next = flow.clone();
    let Some(data) = next.find_node_mut(node_id).and_then(FlowNode::as_message_mut) else {
        log::warn!("remove_button: '{}' is not a message node", node_id);
        return next;
    };
    let before = data.buttons.len();
    data.buttons.retain(|b| b.id != button_id);
    if data.buttons.len() == before {
        log::warn!("remove_button: button '{}' not found on node '{}'", button_id, node_id);
        return next;
    }
    sync_button_edges(&mut next, node_id);
    next
}

/// Connect `source` (through `source_handle`) to `target`
///
/// Any earlier edge from the same handle is replaced. On message nodes the
/// handle must be a quick reply button, whose target is updated to match.
pub fn add_edge(
    flow: &AutomationFlow,
    source: &str,
    source_handle: &str,
    target: &str,
) -> AutomationFlow {
    let mut next = flow.clone();
    if next.find_node(target).is_none() {
        log::warn!("add_edge: target node '{}' not found", target);
        return next;
    }
    let Some(kind) = next.find_node(source).map(FlowNode::kind) else {
        log::warn!("add_edge: source node '{}' not found", source);
        return next;
    };

    match kind {
        NodeKind::End => {
            log::warn!("add_edge: end node '{}' cannot have outgoing edges", source);
            return next;
        }
        NodeKind::Message => {
            let Some(button) = next
                .find_node_mut(source)
                .and_then(FlowNode::as_message_mut)
                .and_then(|data| data.find_button_mut(source_handle))
                .filter(|b| b.action.is_quick_reply())
            else {
                log::warn!(
                    "add_edge: '{}' is not a quick reply button on node '{}'",
                    source_handle,
                    source
                );
                return next;
            };
            button.action = ButtonAction::quick_reply_to(target);
            sync_button_edges(&mut next, source);
        }
        NodeKind::Trigger => {
            next.edges
                .retain(|e| !(e.source == source && e.source_handle == source_handle));
            next.edges.push(FlowEdge::new(
                generate_edge_id(source, source_handle, target),
                source,
                source_handle,
                target,
            ));
        }
    }
    log::debug!("Connected '{}' ({}) -> '{}'", source, source_handle, target);
    next
}

/// Remove an edge and disconnect the button it belonged to
///
/// Every edge carrying `edge_id` is removed (hand-edited JSON may repeat an
/// id), and each source node is re-synced afterwards.
pub fn remove_edge(flow: &AutomationFlow, edge_id: &str) -> AutomationFlow {
    let mut next = flow.clone();
    let (removed, kept): (Vec<FlowEdge>, Vec<FlowEdge>) =
        next.edges.drain(..).partition(|e| e.id == edge_id);
    next.edges = kept;
    if removed.is_empty() {
        log::warn!("remove_edge: edge '{}' not found", edge_id);
        return next;
    }

    for edge in &removed {
        if let Some(button) = next
            .find_node_mut(&edge.source)
            .and_then(FlowNode::as_message_mut)
            .and_then(|data| data.find_button_mut(&edge.source_handle))
        {
            if button.action.target() == Some(edge.target.as_str()) {
                button.action = ButtonAction::quick_reply();
            }
        }
    }
    for edge in &removed {
        sync_button_edges(&mut next, &edge.source);
    }
    log::debug!("Removed {} edge(s) with id '{}'", removed.len(), edge_id);
    next
}

/// Make a message node's outgoing edges match its quick reply targets
///
/// Edges that already match are kept as they are (including rendering
/// hints); stale, duplicate or non-button edges leaving the node are dropped
/// and missing ones are created.
fn sync_button_edges(flow: &mut AutomationFlow, node_id: &str) {
    let Some(data) = flow.find_node(node_id).and_then(FlowNode::as_message) else {
        return;
    };
    let wanted: Vec<(String, NodeId)> = data
        .buttons
        .iter()
        .filter_map(|b| b.action.target().map(|t| (b.id.clone(), t.to_string())))
        .collect();

    let mut kept: Vec<String> = Vec::new();
    flow.edges.retain(|e| {
        if e.source != node_id {
            return true;
        }
        let matches = wanted
            .iter()
            .any(|(handle, target)| *handle == e.source_handle && *target == e.target);
        if matches && !kept.contains(&e.source_handle) {
            kept.push(e.source_handle.clone());
            true
        } else {
            false
        }
    });

    for (handle, target) in wanted {
        if !kept.contains(&handle) {
            flow.edges.push(FlowEdge::new(
                generate_edge_id(node_id, &handle, &target),
                node_id,
                handle,
                target,
            ));
        }
    }
}
