//! Fluent builder for automation flows
//!
//! Provides a compact API for constructing flows with explicit ids, mainly
//! for tests, fixtures and tooling. Unlike the editor operations in
//! [`crate::mutations`], the builder does not refuse anything: it can build
//! invalid flows on purpose so the validator has something to report.

use crate::constants::{handles, layout};
use crate::ids::generate_edge_id;
use crate::types::{
    AutomationFlow, ButtonAction, EndNodeData, FlowEdge, FlowNode, MessageButton,
    MessageNodeData, NodeData, Position, TriggerNodeData, TriggerType,
};

/// Fluent builder for constructing automation flows
///
/// # Example
///
/// ```ignore
/// let flow = FlowBuilder::new("Welcome", 1, "ws-1")
///     .trigger("start", TriggerType::AnyReply)
///     .message("greet", "Hi! What do you need?")
///     .button("greet-sales", "Sales")
///     .end("bye")
///     .connect("start", "output", "greet")
///     .connect("greet", "greet-sales", "bye")
///     .build();
/// ```
pub struct FlowBuilder {
    flow: AutomationFlow,
}

impl FlowBuilder {
    /// Create a new flow builder
    pub fn new(name: impl Into<String>, account_id: i64, workspace_id: impl Into<String>) -> Self {
        Self {
            flow: AutomationFlow::new(name, account_id, workspace_id),
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.flow.description = Some(description.into());
        self
    }

    /// Stack nodes vertically in insertion order
    fn next_position(&self) -> Position {
        Position::new(
            layout::START_X,
            layout::START_Y + self.flow.nodes.len() as f64 * layout::VERTICAL_SPACING,
        )
    }

    fn push(mut self, id: impl Into<String>, data: NodeData) -> Self {
        let position = self.next_position();
        self.flow.nodes.push(FlowNode::new(id, position, data));
        self
    }

    /// Add a trigger node; the first one also sets `flow.trigger`
    pub fn trigger(mut self, id: impl Into<String>, trigger_type: TriggerType) -> Self {
        let data = TriggerNodeData {
            trigger_type,
            ..Default::default()
        };
        if self.flow.trigger_node().is_none() {
            self.flow.trigger.sync_from(&data);
        }
        self.push(id, NodeData::Trigger(data))
    }

    /// Set keywords on the most recently added trigger node
    pub fn with_keywords(mut self, keywords: &[&str]) -> Self {
        if let Some(FlowNode {
            data: NodeData::Trigger(data),
            ..
        }) = self.flow.nodes.last_mut()
        {
            data.keywords = Some(keywords.iter().map(|k| k.to_string()).collect());
            self.flow.trigger.keywords = data.keywords.clone();
        }
        self
    }

    /// Add a message node without buttons
    pub fn message(self, id: impl Into<String>, body: impl Into<String>) -> Self {
        self.push(
            id,
            NodeData::Message(MessageNodeData {
                body: body.into(),
                ..Default::default()
            }),
        )
    }

    /// Add an end node
    pub fn end(self, id: impl Into<String>) -> Self {
        self.push(id, NodeData::End(EndNodeData::default()))
    }

    fn last_message(&mut self) -> Option<&mut MessageNodeData> {
        self.flow.nodes.last_mut().and_then(FlowNode::as_message_mut)
    }

    /// Set the header of the most recently added message node
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        if let Some(data) = self.last_message() {
            data.header = Some(header.into());
        }
        self
    }

    /// Set the footer of the most recently added message node
    pub fn with_footer(mut self, footer: impl Into<String>) -> Self {
        if let Some(data) = self.last_message() {
            data.footer = Some(footer.into());
        }
        self
    }

    /// Add a button with any action to the most recently added message node
    pub fn button_with_action(
        mut self,
        id: impl Into<String>,
        label: impl Into<String>,
        action: ButtonAction,
    ) -> Self {
        if let Some(data) = self.last_message() {
            data.buttons.push(MessageButton {
                id: id.into(),
                label: label.into(),
                action,
            });
        }
        self
    }

    /// Add an unconnected quick reply button to the most recent message node
    pub fn button(self, id: impl Into<String>, label: impl Into<String>) -> Self {
        self.button_with_action(id, label, ButtonAction::quick_reply())
    }

    /// Connect `source` through `handle` to `target`
    ///
    /// When `handle` names a quick reply button on `source`, its target is
    /// set as well so the button and the edge agree.
    pub fn connect(mut self, source: &str, handle: &str, target: &str) -> Self {
        if let Some(button) = self
            .flow
            .find_node_mut(source)
            .and_then(FlowNode::as_message_mut)
            .and_then(|data| data.find_button_mut(handle))
        {
            if button.action.is_quick_reply() {
                button.action = ButtonAction::quick_reply_to(target);
            }
        }
        self.flow.edges.push(FlowEdge::new(
            generate_edge_id(source, handle, target),
            source,
            handle,
            target,
        ));
        self
    }

    /// Connect a trigger's output handle to `target`
    pub fn connect_trigger(self, trigger: &str, target: &str) -> Self {
        self.connect(trigger, handles::OUTPUT, target)
    }

    /// Build the flow without validation
    pub fn build(self) -> AutomationFlow {
        self.flow
    }
}
