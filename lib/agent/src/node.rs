//! Agent nodes and the transition table between them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A step of the agent state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentNode {
    /// Lists the database tables without consulting the model.
    ListTables,
    /// Asks the model which table schemas it needs.
    GetSchemaRequest,
    /// Fetches the requested schemas.
    GetSchemaExecute,
    /// Asks the model for a query or a final answer.
    GenerateQuery,
    /// Asks the model to double check the generated query.
    CheckQuery,
    /// Executes the checked query.
    RunQuery,
}

/// Where a run goes after a node completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Continue with the given node.
    Next(AgentNode),
    /// The run is finished.
    End,
}

impl AgentNode {
    /// The node every run starts at.
    pub const INITIAL: Self = Self::ListTables;

    /// Returns the node name used in logs and errors.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ListTables => "list_tables",
            Self::GetSchemaRequest => "get_schema_request",
            Self::GetSchemaExecute => "get_schema_execute",
            Self::GenerateQuery => "generate_query",
            Self::CheckQuery => "check_query",
            Self::RunQuery => "run_query",
        }
    }

    /// Looks up the outgoing edge.
    ///
    /// `reply_requests_query` is only consulted for `GenerateQuery`: its
    /// reply either carries a run-query call, which must be checked and
    /// executed, or it ends the run.
    #[must_use]
    pub fn next(self, reply_requests_query: bool) -> Transition {
        match self {
            Self::ListTables => Transition::Next(Self::GetSchemaRequest),
            Self::GetSchemaRequest => Transition::Next(Self::GetSchemaExecute),
            Self::GetSchemaExecute => Transition::Next(Self::GenerateQuery),
            Self::GenerateQuery if reply_requests_query => Transition::Next(Self::CheckQuery),
            Self::GenerateQuery => Transition::End,
            Self::CheckQuery => Transition::Next(Self::RunQuery),
            Self::RunQuery => Transition::Next(Self::GenerateQuery),
        }
    }
}

impl fmt::Display for AgentNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
