//! The mutable state threaded through one agent run.

use crate::error::AgentError;
use crate::node::AgentNode;
use sqlscout_conversation::{Conversation, Message};
use sqlscout_core::RunId;

/// State of a single run.
///
/// Created when the run starts and discarded when it ends. Nodes only add
/// messages; the one exception is a checked query superseding the generated
/// query it replaces.
#[derive(Debug, Clone)]
pub struct AgentRunState {
    /// The run ID.
    pub run_id: RunId,
    conversation: Conversation,
    steps: usize,
    budget: usize,
}

impl AgentRunState {
    /// Creates the state for a run answering `question` after `history`.
    #[must_use]
    pub fn new(history: &[Message], question: &str, budget: usize) -> Self {
        let mut conversation = Conversation::from_messages(history.iter().cloned());
        conversation.push(Message::user(question));
        Self {
            run_id: RunId::new(),
            conversation,
            steps: 0,
            budget,
        }
    }

    /// Counts one node execution against the budget.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::StepBudgetExceeded` once the budget is spent.
    pub fn begin_step(&mut self, node: AgentNode) -> Result<(), AgentError> {
        if self.steps >= self.budget {
            tracing::warn!(%node, budget = self.budget, "step budget exhausted");
            return Err(AgentError::StepBudgetExceeded {
                budget: self.budget,
            });
        }
        self.steps += 1;
        Ok(())
    }

    /// Returns how many nodes have executed.
    #[must_use]
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Returns the conversation so far.
    #[must_use]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Returns the last assistant message.
    #[must_use]
    pub fn last_assistant(&self) -> Option<&Message> {
        self.conversation.last_assistant()
    }

    /// Appends a message.
    pub fn push(&mut self, message: Message) {
        self.conversation.push(message);
    }

    /// Replaces the message with the same id.
    pub fn supersede(&mut self, message: Message) {
        self.conversation.supersede(message);
    }

    /// Ends the run, returning its conversation.
    #[must_use]
    pub fn into_conversation(self) -> Conversation {
        self.conversation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlscout_conversation::MessageRole;

    #[test]
    fn starts_with_history_then_question() {
        let history = vec![Message::user("earlier"), Message::assistant("answer")];
        let state = AgentRunState::new(&history, "How many rows?", 10);

        let messages = state.conversation().messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2].role, MessageRole::User);
        assert_eq!(messages[2].content, "How many rows?");
        assert_eq!(state.steps(), 0);
    }

    #[test]
    fn budget_allows_exactly_budget_steps() {
        let mut state = AgentRunState::new(&[], "q", 2);

        assert!(state.begin_step(AgentNode::ListTables).is_ok());
        assert!(state.begin_step(AgentNode::GetSchemaRequest).is_ok());
        assert_eq!(
            state.begin_step(AgentNode::GetSchemaExecute),
            Err(AgentError::StepBudgetExceeded { budget: 2 })
        );
        assert_eq!(state.steps(), 2);
    }
}
