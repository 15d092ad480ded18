//! Undo/redo for an editing session
//!
//! Editor operations return whole flows, so history keeps snapshots of the
//! flow after each edit, labelled with the edit that produced it. Snapshots
//! are zstd-compressed JSON. A refused operation hands back an equal flow;
//! pushing it again records nothing, so undo never steps over no-ops.

use crate::error::{FlowError, Result};
use crate::ids::IdGenerator;
use crate::types::AutomationFlow;

/// Default number of snapshots kept, the current one included
pub const DEFAULT_HISTORY_DEPTH: usize = 100;

const COMPRESSION_LEVEL: i32 = 3;

struct Checkpoint {
    label: String,
    data: Vec<u8>,
}

impl Checkpoint {
    fn capture(label: &str, flow: &AutomationFlow) -> Result<Self> {
        let json = serde_json::to_vec(flow)?;
        let data =
            zstd::encode_all(&json[..], COMPRESSION_LEVEL).map_err(FlowError::compression)?;
        Ok(Self {
            label: label.to_string(),
            data,
        })
    }

    fn restore(&self) -> Result<AutomationFlow> {
        let json = zstd::decode_all(&self.data[..]).map_err(FlowError::compression)?;
        Ok(serde_json::from_slice(&json)?)
    }
}

/// A flow brought back by undo or redo
#[derive(Debug, Clone, PartialEq)]
pub struct Restored {
    pub flow: AutomationFlow,
    /// The edit that was undone or redone
    pub label: String,
    pub can_undo: bool,
    pub can_redo: bool,
}

/// Labelled snapshots of a flow being edited
pub struct FlowHistory {
    undo: Vec<Checkpoint>,
    current: Option<Checkpoint>,
    redo: Vec<Checkpoint>,
    depth: usize,
}

impl FlowHistory {
    pub fn new(depth: usize) -> Self {
        Self {
            undo: Vec::new(),
            current: None,
            redo: Vec::new(),
            depth: depth.max(1),
        }
    }

    /// Record the flow produced by the edit `label`
    ///
    /// Returns false when the flow equals the current snapshot. Recording
    /// a new state discards the redo branch.
    pub fn push(&mut self, label: &str, flow: &AutomationFlow) -> Result<bool> {
        let checkpoint = Checkpoint::capture(label, flow)?;
        if self
            .current
            .as_ref()
            .is_some_and(|current| current.data == checkpoint.data)
        {
            log::debug!("History: '{}' left the flow unchanged", label);
            return Ok(false);
        }

        self.redo.clear();
        if let Some(previous) = self.current.replace(checkpoint) {
            self.undo.push(previous);
        }
        let overflow = (self.undo.len() + 1).saturating_sub(self.depth);
        self.undo.drain(..overflow);
        Ok(true)
    }

    /// Step back past the most recent edit
    pub fn undo(&mut self) -> Result<Option<Restored>> {
        let Some(previous) = self.undo.pop() else {
            return Ok(None);
        };
        let flow = previous.restore()?;
        let Some(undone) = self.current.replace(previous) else {
            return Ok(None);
        };
        let label = undone.label.clone();
        self.redo.push(undone);
        Ok(Some(self.restored(flow, label)))
    }

    /// Re-apply the most recently undone edit
    pub fn redo(&mut self) -> Result<Option<Restored>> {
        let Some(next) = self.redo.pop() else {
            return Ok(None);
        };
        let flow = next.restore()?;
        let label = next.label.clone();
        if let Some(previous) = self.current.replace(next) {
            self.undo.push(previous);
        }
        Ok(Some(self.restored(flow, label)))
    }

    fn restored(&self, flow: AutomationFlow, label: String) -> Restored {
        Restored {
            flow,
            label,
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
        }
    }

    /// The flow at the current position
    pub fn current(&self) -> Result<Option<AutomationFlow>> {
        self.current.as_ref().map(Checkpoint::restore).transpose()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Label of the edit `undo` would revert ("Undo add button")
    pub fn undo_label(&self) -> Option<&str> {
        self.can_undo()
            .then(|| self.current.as_ref().map(|c| c.label.as_str()))
            .flatten()
    }

    /// Label of the edit `redo` would re-apply
    pub fn redo_label(&self) -> Option<&str> {
        self.redo.last().map(|c| c.label.as_str())
    }

    /// Number of snapshots held, the current one included
    pub fn len(&self) -> usize {
        self.undo.len() + self.redo.len() + usize::from(self.current.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.current = None;
        self.redo.clear();
    }

    /// Total compressed size of all snapshots in bytes
    pub fn compressed_size(&self) -> usize {
        self.undo
            .iter()
            .chain(&self.current)
            .chain(&self.redo)
            .map(|c| c.data.len())
            .sum()
    }
}

impl Default for FlowHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_DEPTH)
    }
}

/// A flow being edited, with its id generator and undo history
///
/// # Example
///
/// ```ignore
/// let mut session = EditSession::new(create_empty_flow(&mut ids, 1, "ws"), ids)?;
/// session.apply("add message", |flow, ids| add_message_node(flow, ids, None))?;
/// session.undo()?;
/// ```
pub struct EditSession {
    flow: AutomationFlow,
    ids: IdGenerator,
    history: FlowHistory,
}

impl EditSession {
    pub fn new(flow: AutomationFlow, ids: IdGenerator) -> Result<Self> {
        Self::with_history(flow, ids, FlowHistory::default())
    }

    pub fn with_history(
        flow: AutomationFlow,
        ids: IdGenerator,
        mut history: FlowHistory,
    ) -> Result<Self> {
        history.clear();
        history.push("open", &flow)?;
        Ok(Self { flow, ids, history })
    }

    pub fn flow(&self) -> &AutomationFlow {
        &self.flow
    }

    pub fn history(&self) -> &FlowHistory {
        &self.history
    }

    /// Run an editor operation and record its result
    ///
    /// Returns false when the operation left the flow unchanged.
    pub fn apply<F>(&mut self, label: &str, edit: F) -> Result<bool>
    where
        F: FnOnce(&AutomationFlow, &mut IdGenerator) -> AutomationFlow,
    {
        let next = edit(&self.flow, &mut self.ids);
        let recorded = self.history.push(label, &next)?;
        self.flow = next;
        Ok(recorded)
    }

    /// Undo the last edit; returns its label
    pub fn undo(&mut self) -> Result<Option<String>> {
        Ok(self.history.undo()?.map(|restored| {
            self.flow = restored.flow;
            restored.label
        }))
    }

    /// Redo the last undone edit; returns its label
    pub fn redo(&mut self) -> Result<Option<String>> {
        Ok(self.history.redo()?.map(|restored| {
            self.flow = restored.flow;
            restored.label
        }))
    }

    /// Finish editing, handing back the flow and the generator
    pub fn into_parts(self) -> (AutomationFlow, IdGenerator) {
        (self.flow, self.ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutations::{
        add_button, add_end_node, add_message_node, create_empty_flow, delete_node,
    };

    fn named(name: &str) -> AutomationFlow {
        AutomationFlow::new(name, 1, "ws")
    }

    #[test]
    fn test_undo_and_redo_report_labels() {
        let mut history = FlowHistory::default();
        assert!(history.push("open", &named("a")).unwrap());
        assert!(history.push("rename", &named("b")).unwrap());
        assert_eq!(history.undo_label(), Some("rename"));

        let undone = history.undo().unwrap().unwrap();
        assert_eq!(undone.flow.name, "a");
        assert_eq!(undone.label, "rename");
        assert!(!undone.can_undo);
        assert!(undone.can_redo);
        assert!(history.undo().unwrap().is_none());

        assert_eq!(history.redo_label(), Some("rename"));
        let redone = history.redo().unwrap().unwrap();
        assert_eq!(redone.flow.name, "b");
        assert!(redone.can_undo);
        assert!(!redone.can_redo);
    }

    #[test]
    fn test_unchanged_flow_is_not_recorded() {
        let mut history = FlowHistory::new(10);
        let flow = named("same");
        assert!(history.push("open", &flow).unwrap());
        assert!(!history.push("refused edit", &flow.clone()).unwrap());
        assert_eq!(history.len(), 1);
        assert!(!history.can_undo());
    }

    #[test]
    fn test_push_discards_redo_branch() {
        let mut history = FlowHistory::new(10);
        history.push("open", &named("first")).unwrap();
        history.push("rename", &named("second")).unwrap();
        history.undo().unwrap();

        history.push("rename", &named("third")).unwrap();
        assert!(!history.can_redo());
        assert_eq!(history.current().unwrap().unwrap().name, "third");
    }

    #[test]
    fn test_depth_bounds_snapshots() {
        let mut history = FlowHistory::new(3);
        for i in 0..5 {
            history.push("rename", &named(&format!("flow_{}", i))).unwrap();
        }

        assert_eq!(history.len(), 3);
        history.undo().unwrap();
        let oldest = history.undo().unwrap().unwrap();
        assert_eq!(oldest.flow.name, "flow_2");
        assert!(!oldest.can_undo);
    }

    #[test]
    fn test_clear() {
        let mut history = FlowHistory::new(5);
        assert!(history.current().unwrap().is_none());
        history.push("open", &named("only")).unwrap();
        assert!(history.compressed_size() > 0);

        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.compressed_size(), 0);
    }

    #[test]
    fn test_session_skips_refused_operations() {
        let mut ids = IdGenerator::new();
        let flow = create_empty_flow(&mut ids, 1, "ws");
        let trigger_id = flow.nodes[0].id.clone();
        let mut session = EditSession::new(flow.clone(), ids).unwrap();

        assert!(session
            .apply("add message", |flow, ids| add_message_node(flow, ids, None))
            .unwrap());
        let message_id = session.flow().nodes[1].id.clone();
        assert!(session
            .apply("add button", |flow, ids| add_button(flow, ids, &message_id))
            .unwrap());
        // A fourth button is refused and leaves nothing to undo
        assert!(!session
            .apply("add button", |flow, ids| add_button(flow, ids, &message_id))
            .unwrap());
        assert!(!session
            .apply("delete trigger", |flow, _| delete_node(flow, &trigger_id))
            .unwrap());

        assert_eq!(session.undo().unwrap().as_deref(), Some("add button"));
        assert_eq!(session.undo().unwrap().as_deref(), Some("add message"));
        assert_eq!(session.flow(), &flow);
        assert!(session.undo().unwrap().is_none());

        assert_eq!(session.redo().unwrap().as_deref(), Some("add message"));
        assert_eq!(session.flow().nodes.len(), 2);
    }

    #[test]
    fn test_session_keeps_generating_fresh_ids_after_undo() {
        let mut ids = IdGenerator::new();
        let flow = create_empty_flow(&mut ids, 1, "ws");
        let mut session = EditSession::new(flow, ids).unwrap();

        session.apply("add end", |flow, ids| add_end_node(flow, ids, None)).unwrap();
        let first_end = session.flow().nodes[1].id.clone();
        session.undo().unwrap();
        session.apply("add end", |flow, ids| add_end_node(flow, ids, None)).unwrap();

        let (flow, ids) = session.into_parts();
        assert_ne!(flow.nodes[1].id, first_end);
        assert_eq!(ids.issued(), 3);
    }
}
