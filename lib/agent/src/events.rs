//! Stream events emitted while model nodes run.

use crate::node::AgentNode;
use serde::{Deserialize, Serialize};

/// One streamed fragment, tagged with the node that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEvent {
    /// The node whose model call produced the fragment.
    pub node: AgentNode,
    /// Reply text, if the fragment carried any.
    pub text: Option<String>,
    /// Raw tool call argument JSON, if the fragment carried any.
    pub partial_json: Option<String>,
    /// Stream index of the tool call `partial_json` belongs to.
    pub call_index: Option<usize>,
}

impl StreamEvent {
    /// Creates a text event.
    #[must_use]
    pub fn text(node: AgentNode, text: impl Into<String>) -> Self {
        Self {
            node,
            text: Some(text.into()),
            partial_json: None,
            call_index: None,
        }
    }

    /// Creates a tool argument event for the call at `index`.
    #[must_use]
    pub fn partial_json(node: AgentNode, index: usize, fragment: impl Into<String>) -> Self {
        Self {
            node,
            text: None,
            partial_json: Some(fragment.into()),
            call_index: Some(index),
        }
    }
}

/// Receives stream events in generation order.
///
/// Called synchronously from the run; implementations must not block.
pub trait RunObserver: Send {
    /// Handles one event.
    fn on_event(&mut self, event: StreamEvent);

    /// Called once a model reply has streamed completely.
    fn on_reply_end(&mut self, _node: AgentNode) {}
}

/// Observer that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreEvents;

impl RunObserver for IgnoreEvents {
    fn on_event(&mut self, _event: StreamEvent) {}
}

impl RunObserver for Vec<StreamEvent> {
    fn on_event(&mut self, event: StreamEvent) {
        self.push(event);
    }
}
