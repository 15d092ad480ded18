//! Flow validation
//!
//! Produces severity-tagged issues for a flow instead of failing, because a
//! flow is routinely invalid while it is being edited. A flow with no
//! `Error` issues may be published.
//!
//! Two graph walks start at the trigger node and are deliberately different:
//! reachability shares one visited set across the whole walk, while the
//! depth walk gives every path its own copy so diamonds are measured along
//! each branch and only true cycles are cut.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::FlowLimits;
use crate::types::{
    AutomationFlow, ButtonAction, ButtonId, FlowNode, MessageNodeData, NodeData, NodeId,
    NodeKind, TriggerType,
};

/// How serious an issue is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks publishing
    Error,
    /// Advisory
    Warning,
    /// Hint
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// The rule that produced an issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    EmptyName,
    NameTooLong,
    MissingTrigger,
    MultipleTriggers,
    MissingKeywords,
    MissingTemplate,
    EmptyBody,
    BodyTooLong,
    HeaderTooLong,
    FooterTooLong,
    NoButtons,
    TooManyButtons,
    EmptyButtonLabel,
    ButtonLabelTooLong,
    ButtonNotConnected,
    EmptyUrl,
    EmptyPhoneNumber,
    EndMessageTooLong,
    UnreachableNode,
    MaxDepthExceeded,
    TooManyNodes,
    DanglingEdge,
    EdgeFromEndNode,
    ButtonEdgeMismatch,
    NoEndNode,
}

/// A single finding about a flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: IssueCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub button_id: Option<ButtonId>,
    pub message: String,
    pub auto_fixable: bool,
}

impl ValidationIssue {
    fn new(severity: Severity, code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            node_id: None,
            button_id: None,
            message: message.into(),
            auto_fixable: false,
        }
    }

    fn error(code: IssueCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    fn warning(code: IssueCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    fn info(code: IssueCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, code, message)
    }

    fn on_node(mut self, node_id: &str) -> Self {
        self.node_id = Some(node_id.to_string());
        self
    }

    fn on_button(mut self, button_id: &str) -> Self {
        self.button_id = Some(button_id.to_string());
        self
    }

    fn fixable(mut self) -> Self {
        self.auto_fixable = true;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)?;
        if let Some(node_id) = &self.node_id {
            write!(f, " (node '{}'", node_id)?;
            if let Some(button_id) = &self.button_id {
                write!(f, ", button '{}'", button_id)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// Length in characters (Unicode scalar values)
fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Validate a flow against the default limits
pub fn validate_flow(flow: &AutomationFlow) -> Vec<ValidationIssue> {
    validate_flow_with(flow, &FlowLimits::default())
}

/// Validate a flow
///
/// Returns all issues found (not just the first), ordered by rule.
pub fn validate_flow_with(flow: &AutomationFlow, limits: &FlowLimits) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    validate_name(flow, limits, &mut issues);
    validate_triggers(flow, &mut issues);
    for node in &flow.nodes {
        match &node.data {
            NodeData::Message(data) => validate_message(node, data, limits, &mut issues),
            NodeData::End(data) => {
                if data
                    .message
                    .as_deref()
                    .is_some_and(|m| char_len(m) > limits.max_body_length)
                {
                    issues.push(
                        ValidationIssue::warning(
                            IssueCode::EndMessageTooLong,
                            format!(
                                "Closing message exceeds {} characters",
                                limits.max_body_length
                            ),
                        )
                        .on_node(&node.id),
                    );
                }
            }
            NodeData::Trigger(_) => {}
        }
    }
    validate_reachability(flow, &mut issues);
    validate_depth(flow, limits, &mut issues);
    if flow.nodes.len() > limits.max_nodes {
        issues.push(ValidationIssue::error(
            IssueCode::TooManyNodes,
            format!(
                "Flow has {} nodes; the maximum is {}",
                flow.nodes.len(),
                limits.max_nodes
            ),
        ));
    }
    validate_edges(flow, &mut issues);
    validate_end_presence(flow, &mut issues);

    issues
}

/// True if any issue blocks publishing
pub fn has_errors(issues: &[ValidationIssue]) -> bool {
    issues.iter().any(ValidationIssue::is_error)
}

/// True if the flow validates without errors
pub fn can_publish(flow: &AutomationFlow) -> bool {
    !has_errors(&validate_flow(flow))
}

fn validate_name(flow: &AutomationFlow, limits: &FlowLimits, issues: &mut Vec<ValidationIssue>) {
    if flow.name.trim().is_empty() {
        issues.push(ValidationIssue::error(IssueCode::EmptyName, "Flow name is required"));
    } else if char_len(&flow.name) > limits.max_name_length {
        issues.push(ValidationIssue::error(
            IssueCode::NameTooLong,
            format!("Flow name exceeds {} characters", limits.max_name_length),
        ));
    }
}

fn validate_triggers(flow: &AutomationFlow, issues: &mut Vec<ValidationIssue>) {
    let triggers: Vec<&FlowNode> = flow.trigger_nodes().collect();
    match triggers.len() {
        0 => issues.push(ValidationIssue::error(
            IssueCode::MissingTrigger,
            "Flow must have a trigger node",
        )),
        1 => {}
        _ => {
            for extra in &triggers[1..] {
                issues.push(
                    ValidationIssue::error(
                        IssueCode::MultipleTriggers,
                        "Flow can have only one trigger node",
                    )
                    .on_node(&extra.id),
                );
            }
        }
    }

    for node in triggers {
        let NodeData::Trigger(data) = &node.data else {
            continue;
        };
        match data.trigger_type {
            TriggerType::Keyword
                if data
                    .keywords
                    .as_ref()
                    .map_or(true, |k| k.iter().all(|w| w.trim().is_empty())) =>
            {
                issues.push(
                    ValidationIssue::warning(
                        IssueCode::MissingKeywords,
                        "Keyword trigger has no keywords",
                    )
                    .on_node(&node.id),
                );
            }
            TriggerType::SpecificTemplate
                if data.template_id.as_deref().map_or(true, |t| t.trim().is_empty()) =>
            {
                issues.push(
                    ValidationIssue::error(
                        IssueCode::MissingTemplate,
                        "Template trigger must select a template",
                    )
                    .on_node(&node.id),
                );
            }
            _ => {}
        }
    }
}

fn validate_message(
    node: &FlowNode,
    data: &MessageNodeData,
    limits: &FlowLimits,
    issues: &mut Vec<ValidationIssue>,
) {
    let node_id = node.id.as_str();

    if data.body.trim().is_empty() {
        issues.push(
            ValidationIssue::error(IssueCode::EmptyBody, "Message body is required")
                .on_node(node_id),
        );
    } else if char_len(&data.body) > limits.max_body_length {
        issues.push(
            ValidationIssue::error(
                IssueCode::BodyTooLong,
                format!("Message body exceeds {} characters", limits.max_body_length),
            )
            .on_node(node_id),
        );
    }

    if data
        .header
        .as_deref()
        .is_some_and(|h| char_len(h) > limits.max_header_length)
    {
        issues.push(
            ValidationIssue::warning(
                IssueCode::HeaderTooLong,
                format!("Header exceeds {} characters", limits.max_header_length),
            )
            .on_node(node_id)
            .fixable(),
        );
    }

    if data
        .footer
        .as_deref()
        .is_some_and(|f| char_len(f) > limits.max_footer_length)
    {
        issues.push(
            ValidationIssue::warning(
                IssueCode::FooterTooLong,
                format!("Footer exceeds {} characters", limits.max_footer_length),
            )
            .on_node(node_id)
            .fixable(),
        );
    }

    if data.buttons.is_empty() {
        issues.push(
            ValidationIssue::warning(
                IssueCode::NoButtons,
                "Message has no buttons, so the conversation ends here",
            )
            .on_node(node_id),
        );
    } else if data.buttons.len() > limits.max_buttons {
        issues.push(
            ValidationIssue::error(
                IssueCode::TooManyButtons,
                format!("Message can have at most {} buttons", limits.max_buttons),
            )
            .on_node(node_id),
        );
    }

    for button in &data.buttons {
        if button.label.trim().is_empty() {
            issues.push(
                ValidationIssue::error(IssueCode::EmptyButtonLabel, "Button label is required")
                    .on_node(node_id)
                    .on_button(&button.id),
            );
        } else if char_len(&button.label) > limits.max_button_label_length {
            issues.push(
                ValidationIssue::error(
                    IssueCode::ButtonLabelTooLong,
                    format!("Button label exceeds {} characters", limits.max_button_label_length),
                )
                .on_node(node_id)
                .on_button(&button.id)
                .fixable(),
            );
        }

        match &button.action {
            ButtonAction::QuickReply {
                target_node_id: None,
            } => issues.push(
                ValidationIssue::warning(
                    IssueCode::ButtonNotConnected,
                    format!("Button '{}' is not connected", button.label),
                )
                .on_node(node_id)
                .on_button(&button.id),
            ),
            ButtonAction::Url { url } if url.trim().is_empty() => issues.push(
                ValidationIssue::error(IssueCode::EmptyUrl, "URL button needs a URL")
                    .on_node(node_id)
                    .on_button(&button.id),
            ),
            ButtonAction::Call { phone_number } if phone_number.trim().is_empty() => issues.push(
                ValidationIssue::error(
                    IssueCode::EmptyPhoneNumber,
                    "Call button needs a phone number",
                )
                .on_node(node_id)
                .on_button(&button.id),
            ),
            _ => {}
        }
    }
}

/// Outgoing neighbours of every node, in edge order
fn adjacency(flow: &AutomationFlow) -> HashMap<&str, Vec<&str>> {
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in &flow.edges {
        adjacency
            .entry(edge.source.as_str())
            .or_default()
            .push(edge.target.as_str());
    }
    adjacency
}

/// Nodes reachable from `start`, sharing one visited set
pub(crate) fn reachable_from<'a>(flow: &'a AutomationFlow, start: &'a str) -> HashSet<&'a str> {
    let adjacency = adjacency(flow);
    let mut visited: HashSet<&str> = HashSet::new();
    let mut stack = vec![start];
    while let Some(node_id) = stack.pop() {
        if !visited.insert(node_id) {
            continue;
        }
        if let Some(targets) = adjacency.get(node_id) {
            stack.extend(targets.iter().copied().filter(|t| !visited.contains(t)));
        }
    }
    visited
}

fn validate_reachability(flow: &AutomationFlow, issues: &mut Vec<ValidationIssue>) {
    let Some(trigger) = flow.trigger_node() else {
        return;
    };
    let reachable = reachable_from(flow, &trigger.id);
    for node in &flow.nodes {
        if !node.is_trigger() && !reachable.contains(node.id.as_str()) {
            issues.push(
                ValidationIssue::warning(
                    IssueCode::UnreachableNode,
                    "Node is not connected to the flow",
                )
                .on_node(&node.id),
            );
        }
    }
}

/// Longest path in edges from `node_id`
///
/// `path` holds the nodes on the current path only; each call works on its
/// own copy. Exploration stops once `limit` is exceeded.
fn longest_path<'a>(
    adjacency: &HashMap<&'a str, Vec<&'a str>>,
    node_id: &'a str,
    path: &HashSet<&'a str>,
    limit: usize,
) -> usize {
    let mut path = path.clone();
    path.insert(node_id);

    let mut deepest = 0;
    for &child in adjacency.get(node_id).into_iter().flatten() {
        if path.contains(child) {
            continue;
        }
        deepest = deepest.max(1 + longest_path(adjacency, child, &path, limit));
        if deepest > limit {
            break;
        }
    }
    deepest
}

/// Longest path in edges from the trigger, or `None` without a trigger
pub fn flow_depth(flow: &AutomationFlow, limit: usize) -> Option<usize> {
    let trigger = flow.trigger_node()?;
    let adjacency = adjacency(flow);
    Some(longest_path(&adjacency, &trigger.id, &HashSet::new(), limit))
}

fn validate_depth(flow: &AutomationFlow, limits: &FlowLimits, issues: &mut Vec<ValidationIssue>) {
    if let Some(depth) = flow_depth(flow, limits.max_depth) {
        if depth > limits.max_depth {
            issues.push(ValidationIssue::error(
                IssueCode::MaxDepthExceeded,
                format!("Flow is deeper than the maximum of {} steps", limits.max_depth),
            ));
        }
    }
}

fn validate_edges(flow: &AutomationFlow, issues: &mut Vec<ValidationIssue>) {
    let kinds: HashMap<&str, NodeKind> = flow
        .nodes
        .iter()
        .map(|n| (n.id.as_str(), n.kind()))
        .collect();

    for edge in &flow.edges {
        for endpoint in [&edge.source, &edge.target] {
            if !kinds.contains_key(endpoint.as_str()) {
                issues.push(ValidationIssue::error(
                    IssueCode::DanglingEdge,
                    format!("Edge '{}' references unknown node '{}'", edge.id, endpoint),
                ));
            }
        }
        if kinds.get(edge.source.as_str()) == Some(&NodeKind::End) {
            issues.push(
                ValidationIssue::error(
                    IssueCode::EdgeFromEndNode,
                    "End node cannot continue the conversation",
                )
                .on_node(&edge.source),
            );
        }
    }

    for (node_id, button_id) in out_of_sync_buttons(flow) {
        issues.push(
            ValidationIssue::error(
                IssueCode::ButtonEdgeMismatch,
                "Button target and connection disagree",
            )
            .on_node(&node_id)
            .on_button(&button_id),
        );
    }
}

fn validate_end_presence(flow: &AutomationFlow, issues: &mut Vec<ValidationIssue>) {
    let has_messages = flow.nodes.iter().any(|n| n.kind() == NodeKind::Message);
    let has_end = flow.nodes.iter().any(|n| n.kind() == NodeKind::End);
    if has_messages && !has_end {
        issues.push(ValidationIssue::info(
            IssueCode::NoEndNode,
            "Consider adding an end node to close the conversation",
        ));
    }
}

/// Quick reply buttons whose target does not match their edges
///
/// A connected button must have exactly one edge leaving its node through
/// the button id, pointing at the same target; an unconnected one must
/// have none.
pub fn out_of_sync_buttons(flow: &AutomationFlow) -> Vec<(NodeId, ButtonId)> {
    let mut drift = Vec::new();
    for node in &flow.nodes {
        let Some(data) = node.as_message() else {
            continue;
        };
        for button in data.buttons.iter().filter(|b| b.action.is_quick_reply()) {
            let edges: Vec<_> = flow
                .outgoing_edges(&node.id)
                .filter(|e| e.source_handle == button.id)
                .collect();
            let in_sync = match button.action.target() {
                Some(target) => edges.len() == 1 && edges[0].target == target,
                None => edges.is_empty(),
            };
            if !in_sync {
                drift.push((node.id.clone(), button.id.clone()));
            }
        }
    }
    drift
}

fn truncate(text: &mut String, max: usize) {
    if char_len(text) > max {
        *text = text.chars().take(max).collect();
    }
}

/// Apply every auto-fix advertised by the validator, using default limits
pub fn apply_auto_fixes(flow: &AutomationFlow) -> AutomationFlow {
    apply_auto_fixes_with(flow, &FlowLimits::default())
}

/// Truncate oversized headers, footers and button labels
pub fn apply_auto_fixes_with(flow: &AutomationFlow, limits: &FlowLimits) -> AutomationFlow {
    let mut next = flow.clone();
    for node in &mut next.nodes {
        let Some(data) = node.as_message_mut() else {
            continue;
        };
        if let Some(header) = data.header.as_mut() {
            truncate(header, limits.max_header_length);
        }
        if let Some(footer) = data.footer.as_mut() {
            truncate(footer, limits.max_footer_length);
        }
        for button in &mut data.buttons {
            truncate(&mut button.label, limits.max_button_label_length);
        }
    }
    next
}
