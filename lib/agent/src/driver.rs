//! Streaming session driver.
//!
//! Drives one agent run, classifying the generator's tokens into thinking and
//! answer text as they arrive and collecting the raw run-query arguments so
//! the executed SQL can be shown afterwards.

use crate::agent::SqlAgent;
use crate::error::{AgentError, ExtractionError};
use crate::events::{RunObserver, StreamEvent};
use crate::extract::extract_latest;
use crate::node::AgentNode;
use rootcause::prelude::Report;
use sqlscout_ai::FramingParser;
use sqlscout_conversation::{Message, Session};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// Receives live renders of a run.
pub trait LiveDisplay: Send {
    /// Shows the thinking and answer text accumulated so far.
    fn render(&mut self, thinking: &str, answer: &str);
}

/// The output of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    /// Reasoning text with framing markers removed.
    pub thinking: String,
    /// Final answer text.
    pub answer: String,
    /// Run-query argument fragments, joined call by call.
    pub raw_query: String,
}

impl Transcript {
    /// Returns the last query the run generated, which is the checked query
    /// that was executed.
    ///
    /// # Errors
    ///
    /// Returns `ExtractionError::MalformedFragment` if a fragment does not decode.
    pub fn executed_query(&self) -> Result<Option<String>, ExtractionError> {
        extract_latest(&self.raw_query)
    }
}

/// A failed run, with whatever was streamed before it failed.
#[derive(Debug)]
pub struct AskError {
    /// Thinking and answer text produced before the failure.
    pub partial: Transcript,
    /// Why the run failed.
    pub report: Report<AgentError>,
}

impl fmt::Display for AskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.report)
    }
}

impl std::error::Error for AskError {}

struct TranscriptObserver<'a> {
    parser: FramingParser,
    raw_query: String,
    /// Argument fragments of the reply in flight, keyed by call index.
    pending_calls: BTreeMap<usize, String>,
    display: &'a mut dyn LiveDisplay,
}

impl<'a> TranscriptObserver<'a> {
    fn new(display: &'a mut dyn LiveDisplay) -> Self {
        Self {
            parser: FramingParser::new(),
            raw_query: String::new(),
            pending_calls: BTreeMap::new(),
            display,
        }
    }

    fn flush_calls(&mut self) {
        for arguments in std::mem::take(&mut self.pending_calls).into_values() {
            self.raw_query.push_str(&arguments);
        }
    }

    fn finish(mut self) -> Transcript {
        self.flush_calls();
        self.parser.finish();
        self.display
            .render(self.parser.thinking(), self.parser.answer());
        Transcript {
            thinking: self.parser.thinking().to_string(),
            answer: self.parser.answer().to_string(),
            raw_query: self.raw_query,
        }
    }
}

impl RunObserver for TranscriptObserver<'_> {
    fn on_event(&mut self, event: StreamEvent) {
        let query_node = matches!(event.node, AgentNode::GenerateQuery | AgentNode::CheckQuery);
        if let Some(fragment) = &event.partial_json
            && query_node
        {
            self.pending_calls
                .entry(event.call_index.unwrap_or_default())
                .or_default()
                .push_str(fragment);
        }
        if let Some(text) = &event.text
            && event.node == AgentNode::GenerateQuery
        {
            self.parser.push(text);
            self.display
                .render(self.parser.thinking(), self.parser.answer());
        }
    }

    fn on_reply_end(&mut self, _node: AgentNode) {
        self.flush_calls();
    }
}

/// Runs `question` once, rendering to `display` after every generator token.
///
/// # Errors
///
/// Returns an `AskError` carrying the partial transcript if the run fails.
pub async fn ask(
    agent: &SqlAgent,
    question: &str,
    history: &[Message],
    display: &mut dyn LiveDisplay,
    cancel: &CancellationToken,
) -> Result<Transcript, AskError> {
    let mut observer = TranscriptObserver::new(display);
    let outcome = agent.run(question, history, &mut observer, cancel).await;
    let transcript = observer.finish();
    match outcome {
        Ok(_) => Ok(transcript),
        Err(report) => Err(AskError {
            partial: transcript,
            report,
        }),
    }
}

/// A chat session: serialized runs over shared memory.
#[derive(Debug)]
pub struct SessionDriver {
    agent: Arc<SqlAgent>,
    session: Mutex<Session>,
}

impl SessionDriver {
    /// Creates a session with empty memory.
    #[must_use]
    pub fn new(agent: Arc<SqlAgent>) -> Self {
        let memory_turns = agent.context().config().memory_turns;
        Self {
            agent,
            session: Mutex::new(Session::new(memory_turns)),
        }
    }

    /// Answers `question` with the session's recent memory.
    ///
    /// Runs on one session never overlap. A successful run adds the question
    /// and answer to memory; a failed run leaves memory untouched.
    ///
    /// # Errors
    ///
    /// Returns an `AskError` carrying the partial transcript if the run fails.
    #[instrument(skip(self, display, cancel))]
    pub async fn ask(
        &self,
        question: &str,
        display: &mut dyn LiveDisplay,
        cancel: &CancellationToken,
    ) -> Result<Transcript, AskError> {
        let mut session = self.session.lock().await;
        let history = session.recent_history().to_vec();
        let transcript = ask(&self.agent, question, &history, display, cancel).await?;
        session.record_exchange(question, transcript.answer.clone());
        debug!(session_id = %session.id, remembered = session.message_count(), "recorded exchange");
        Ok(transcript)
    }

    /// Forgets every earlier exchange.
    pub async fn clear_memory(&self) {
        self.session.lock().await.clear_memory();
    }

    /// Returns how many messages are remembered.
    pub async fn remembered(&self) -> usize {
        self.session.lock().await.message_count()
    }
}
