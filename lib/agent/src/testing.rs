//! In-memory collaborators for agent tests.

use crate::agent::SqlAgent;
use crate::config::AgentConfig;
use crate::context::AgentContext;
use async_trait::async_trait;
use futures::stream;
use sqlscout_ai::{ChatRequest, ChunkStream, LlmBackend, LlmError, StreamChunk};
use sqlscout_database::{DatabaseError, QueryRows, SqlDatabase};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type Reply = Vec<StreamChunk>;

fn text_chunks(text: &str) -> Reply {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(5)
        .map(|piece| StreamChunk::text(piece.iter().collect::<String>()))
        .collect()
}

/// A reply that only carries text.
pub(crate) fn answer(text: &str) -> Reply {
    text_chunks(text)
}

/// A reply that asks for the schema of `tables`.
pub(crate) fn schema_call(tables: &str) -> Reply {
    let arguments = serde_json::json!({ "table_names": tables }).to_string();
    vec![
        StreamChunk::tool_call_start(0, "call_schema", "sql_db_schema"),
        StreamChunk::tool_call_delta(0, arguments),
    ]
}

/// A reply with optional text followed by a run-query call, its arguments
/// streamed in two pieces.
pub(crate) fn query_call(text: &str, sql: &str) -> Reply {
    let arguments = serde_json::json!({ "query": sql }).to_string();
    let (head, tail) = arguments.split_at(arguments.len() / 2);
    let mut reply = text_chunks(text);
    reply.push(StreamChunk::tool_call_start(0, "call_query", "sql_db_query"));
    reply.push(StreamChunk::tool_call_delta(0, head));
    reply.push(StreamChunk::tool_call_delta(0, tail));
    reply
}

#[derive(Default)]
struct Script {
    replies: Mutex<VecDeque<Reply>>,
    repeat: Mutex<Option<Reply>>,
    calls: AtomicUsize,
}

/// Backend that streams pre-scripted replies in order.
#[derive(Clone, Default)]
pub(crate) struct ScriptedBackend {
    script: Arc<Script>,
}

impl ScriptedBackend {
    pub(crate) fn new(replies: Vec<Reply>) -> Self {
        let backend = Self::default();
        if let Ok(mut queue) = backend.script.replies.lock() {
            queue.extend(replies);
        }
        backend
    }

    /// Streams `reply` for every call after the script runs out.
    pub(crate) fn then_repeat(self, reply: Reply) -> Self {
        if let Ok(mut repeat) = self.script.repeat.lock() {
            *repeat = Some(reply);
        }
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.script.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    async fn stream(&self, _request: &ChatRequest) -> Result<ChunkStream, LlmError> {
        self.script.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .script
            .replies
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front());
        let reply = match next {
            Some(reply) => reply,
            None => self
                .script
                .repeat
                .lock()
                .ok()
                .and_then(|repeat| repeat.clone())
                .ok_or_else(|| LlmError::RequestFailed {
                    reason: "script exhausted".to_string(),
                })?,
        };
        let chunks: ChunkStream = Box::pin(stream::iter(reply.into_iter().map(Ok)));
        Ok(chunks)
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// Database with two tables whose queries all return a single count.
#[derive(Default)]
pub(crate) struct InMemoryDatabase {
    count: i64,
    unreachable: bool,
    executed: Mutex<Vec<String>>,
}

impl InMemoryDatabase {
    pub(crate) fn with_count(count: i64) -> Self {
        Self {
            count,
            ..Self::default()
        }
    }

    pub(crate) fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    pub(crate) fn executed(&self) -> Vec<String> {
        self.executed.lock().map(|e| e.clone()).unwrap_or_default()
    }

    fn check_reachable(&self) -> Result<(), DatabaseError> {
        if self.unreachable {
            return Err(DatabaseError::Connectivity {
                reason: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SqlDatabase for InMemoryDatabase {
    fn dialect(&self) -> &str {
        "sqlite"
    }

    async fn table_names(&self) -> Result<Vec<String>, DatabaseError> {
        self.check_reachable()?;
        Ok(vec!["orders".to_string(), "users".to_string()])
    }

    async fn table_info(&self, tables: &[String]) -> Result<String, DatabaseError> {
        self.check_reachable()?;
        Ok(tables
            .iter()
            .map(|t| format!("CREATE TABLE {t} (id INTEGER PRIMARY KEY)"))
            .collect::<Vec<_>>()
            .join("\n\n"))
    }

    async fn query(&self, sql: &str) -> Result<QueryRows, DatabaseError> {
        self.check_reachable()?;
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(sql.to_string());
        }
        Ok(QueryRows {
            columns: vec!["count".to_string()],
            rows: vec![vec![serde_json::json!(self.count)]],
        })
    }
}

pub(crate) fn test_agent(
    backend: ScriptedBackend,
    db: Arc<InMemoryDatabase>,
    config: AgentConfig,
) -> SqlAgent {
    let context = AgentContext::new(Arc::new(backend), db, config).expect("context builds");
    SqlAgent::new(context)
}
