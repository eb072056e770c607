//! The SQL agent executor.
//!
//! A run walks the node graph one node at a time:
//!
//! ```text
//! ListTables -> GetSchemaRequest -> GetSchemaExecute -> GenerateQuery
//!                                                        |        ^
//!                                           query call   v        |
//!                                                 CheckQuery -> RunQuery
//! ```
//!
//! `GenerateQuery` ends the run when its reply carries no run-query call.

use crate::context::AgentContext;
use crate::error::AgentError;
use crate::events::{RunObserver, StreamEvent};
use crate::node::{AgentNode, Transition};
use crate::run_state::AgentRunState;
use futures::StreamExt;
use sqlscout_core::Result;
use sqlscout_ai::{ChatRequest, ReplyAssembler, StreamChunk};
use sqlscout_conversation::{Conversation, Message, ToolCall, ToolResult};
use sqlscout_database::{LIST_TABLES_TOOL, QUERY_TOOL, SCHEMA_TOOL};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Runs questions through the agent state machine.
#[derive(Debug)]
pub struct SqlAgent {
    context: AgentContext,
}

/// Rebuilds the generated query message around the checked call.
///
/// The result keeps the generated message's id and the original call's id,
/// so it supersedes the generated message instead of following it.
pub(crate) fn supersede_query_call(generated: &Message, checked: &ToolCall) -> Option<Message> {
    let original = generated.tool_call_named(QUERY_TOOL)?;
    let mut message = generated.clone();
    message.tool_calls = vec![ToolCall::new(
        original.id.clone(),
        QUERY_TOOL,
        checked.arguments.clone(),
    )];
    Some(message)
}

impl SqlAgent {
    /// Creates an agent over a prepared context.
    #[must_use]
    pub fn new(context: AgentContext) -> Self {
        Self { context }
    }

    /// Returns the shared context.
    #[must_use]
    pub fn context(&self) -> &AgentContext {
        &self.context
    }

    /// Answers `question` after the given memory.
    ///
    /// Every streamed fragment is passed to `observer` as it arrives.
    /// Cancellation is honored before each node starts.
    ///
    /// # Errors
    ///
    /// Returns the first error that aborts the run. Tool failures other than
    /// connectivity are shown to the model instead.
    #[instrument(skip(self, history, observer, cancel), fields(run_id = tracing::field::Empty))]
    pub async fn run(
        &self,
        question: &str,
        history: &[Message],
        observer: &mut dyn RunObserver,
        cancel: &CancellationToken,
    ) -> Result<Conversation, AgentError> {
        let mut state = AgentRunState::new(history, question, self.context.config.step_budget);
        tracing::Span::current().record("run_id", tracing::field::display(state.run_id));

        let mut node = AgentNode::INITIAL;
        loop {
            if cancel.is_cancelled() {
                info!(%node, "run cancelled");
                return Err(AgentError::Cancelled { node }.into());
            }
            state.begin_step(node)?;
            debug!(%node, step = state.steps(), "executing node");

            let requests_query = self.execute(node, &mut state, observer).await?;
            match node.next(requests_query) {
                Transition::Next(next) => node = next,
                Transition::End => {
                    info!(steps = state.steps(), "run finished");
                    return Ok(state.into_conversation());
                }
            }
        }
    }

    async fn execute(
        &self,
        node: AgentNode,
        state: &mut AgentRunState,
        observer: &mut dyn RunObserver,
    ) -> Result<bool, AgentError> {
        match node {
            AgentNode::ListTables => self.list_tables(state).await?,
            AgentNode::GetSchemaRequest => self.request_schema(state, observer).await?,
            AgentNode::GetSchemaExecute => self.execute_schema(state).await?,
            AgentNode::GenerateQuery => return self.generate_query(state, observer).await,
            AgentNode::CheckQuery => self.check_query(state, observer).await?,
            AgentNode::RunQuery => self.run_query(state).await?,
        }
        Ok(false)
    }

    async fn list_tables(&self, state: &mut AgentRunState) -> Result<(), AgentError> {
        let node = AgentNode::ListTables;
        let call = ToolCall::new(
            format!("call_{}", state.run_id),
            LIST_TABLES_TOOL,
            serde_json::json!({}),
        );
        state.push(Message::assistant("").with_tool_call(call.clone()));

        let result = match self.context.list_tables.execute(call.arguments.clone()).await {
            Ok(value) => ToolResult::success(&call.id, &call.name, value),
            Err(err) => self.tool_failure(node, &call, err)?,
        };
        let summary = format!("Available tables: {}", result.content_text());
        state.push(Message::tool(result));
        state.push(Message::assistant(summary));
        Ok(())
    }

    async fn request_schema(
        &self,
        state: &mut AgentRunState,
        observer: &mut dyn RunObserver,
    ) -> Result<(), AgentError> {
        let node = AgentNode::GetSchemaRequest;
        let request = ChatRequest::new(state.conversation().messages().to_vec())
            .with_tools(vec![self.context.schema_definition.clone()])
            .forcing_tool_call();
        let reply = self.call_model(node, &request, observer).await?;
        if reply.tool_call_named(SCHEMA_TOOL).is_none() {
            return Err(missing_call(node, SCHEMA_TOOL).into());
        }
        state.push(reply);
        Ok(())
    }

    async fn execute_schema(&self, state: &mut AgentRunState) -> Result<(), AgentError> {
        let node = AgentNode::GetSchemaExecute;
        let calls = state
            .last_assistant()
            .map(|m| m.tool_calls.clone())
            .unwrap_or_default();
        if calls.is_empty() {
            return Err(missing_call(node, SCHEMA_TOOL).into());
        }
        for call in calls {
            let result = self.invoke(node, &call).await?;
            state.push(Message::tool(result));
        }
        Ok(())
    }

    async fn generate_query(
        &self,
        state: &mut AgentRunState,
        observer: &mut dyn RunObserver,
    ) -> Result<bool, AgentError> {
        let node = AgentNode::GenerateQuery;
        let mut messages = Vec::with_capacity(state.conversation().len() + 1);
        messages.push(Message::system(self.context.generator_prompt.as_str()));
        messages.extend_from_slice(state.conversation().messages());
        let request =
            ChatRequest::new(messages).with_tools(vec![self.context.query_definition.clone()]);

        let reply = self.call_model(node, &request, observer).await?;
        let requests_query = reply.tool_call_named(QUERY_TOOL).is_some();
        debug!(requests_query, "generator replied");
        state.push(reply);
        Ok(requests_query)
    }

    async fn check_query(
        &self,
        state: &mut AgentRunState,
        observer: &mut dyn RunObserver,
    ) -> Result<(), AgentError> {
        let node = AgentNode::CheckQuery;
        let generated = state
            .last_assistant()
            .cloned()
            .ok_or_else(|| missing_call(node, QUERY_TOOL))?;
        let sql = generated
            .tool_call_named(QUERY_TOOL)
            .ok_or_else(|| missing_call(node, QUERY_TOOL))?
            .str_argument("query")
            .ok_or_else(|| AgentError::InvalidToolArguments {
                node,
                reason: "run-query call has no 'query' string".to_string(),
            })?
            .to_string();

        let request = ChatRequest::new(vec![
            Message::system(self.context.checker_prompt.as_str()),
            Message::user(sql),
        ])
        .with_tools(vec![self.context.query_definition.clone()])
        .forcing_tool_call();
        let reply = self.call_model(node, &request, observer).await?;

        let checked = reply
            .tool_call_named(QUERY_TOOL)
            .and_then(|call| supersede_query_call(&generated, call))
            .ok_or_else(|| missing_call(node, QUERY_TOOL))?;
        state.supersede(checked);
        Ok(())
    }

    async fn run_query(&self, state: &mut AgentRunState) -> Result<(), AgentError> {
        let node = AgentNode::RunQuery;
        let call = state
            .last_assistant()
            .and_then(|m| m.tool_call_named(QUERY_TOOL))
            .cloned()
            .ok_or_else(|| missing_call(node, QUERY_TOOL))?;
        let result = self.invoke(node, &call).await?;
        state.push(Message::tool(result));
        Ok(())
    }

    async fn invoke(
        &self,
        node: AgentNode,
        call: &ToolCall,
    ) -> Result<ToolResult, AgentError> {
        match self.context.tools.invoke(call).await {
            Ok(value) => Ok(ToolResult::success(&call.id, &call.name, value)),
            Err(err) => self.tool_failure(node, call, err),
        }
    }

    /// Turns a tool error into a result the model can read, unless it is fatal.
    fn tool_failure(
        &self,
        node: AgentNode,
        call: &ToolCall,
        err: sqlscout_conversation::ToolError,
    ) -> Result<ToolResult, AgentError> {
        if err.is_fatal() {
            return Err(AgentError::Connectivity {
                reason: err.to_string(),
            }
            .into());
        }
        warn!(%node, tool = %call.name, error = %err, "tool call failed");
        Ok(ToolResult::failure(&call.id, &call.name, err.to_string()))
    }

    async fn call_model(
        &self,
        node: AgentNode,
        request: &ChatRequest,
        observer: &mut dyn RunObserver,
    ) -> Result<Message, AgentError> {
        let model_error = |reason: String| AgentError::ModelCall { node, reason };

        let mut stream = self
            .context
            .backend
            .stream(request)
            .await
            .map_err(|e| model_error(e.to_string()))?;

        let mut assembler = ReplyAssembler::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| model_error(e.to_string()))?;
            match &chunk {
                StreamChunk::Text { text } => observer.on_event(StreamEvent::text(node, text)),
                StreamChunk::ToolCallDelta {
                    index,
                    partial_json,
                } => {
                    observer.on_event(StreamEvent::partial_json(node, *index, partial_json));
                }
                StreamChunk::ToolCallStart { .. } => {}
            }
            assembler.push(&chunk);
        }
        observer.on_reply_end(node);

        let reply = assembler.finish().map_err(|e| model_error(e.to_string()))?;
        debug!(%node, tool_calls = reply.tool_calls.len(), "model replied");
        Ok(reply)
    }
}

fn missing_call(node: AgentNode, tool: &str) -> AgentError {
    AgentError::MissingToolCall {
        node,
        tool: tool.to_string(),
    }
}
