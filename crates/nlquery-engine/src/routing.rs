//! Node identifiers, the transition table, and the post-execution router.

use std::fmt;

use crate::state::WorkflowState;

/// Nodes of the workflow state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Node {
    GenerateQuery,
    ExecuteQuery,
    FixQuery,
    FormatResponse,
    Fail,
}

/// Where the engine goes after a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    Node(Node),
    Done,
}

/// Transition out of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Unconditional successor.
    Always(Next),
    /// Decided by [`route`].
    Routed,
}

/// Decision taken after ExecuteQuery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Fix,
    Format,
    Fail,
}

impl Node {
    pub const INITIAL: Node = Node::GenerateQuery;

    pub const ALL: [Node; 5] = [
        Node::GenerateQuery,
        Node::ExecuteQuery,
        Node::FixQuery,
        Node::FormatResponse,
        Node::Fail,
    ];

    /// The transition table. FixQuery loops back to ExecuteQuery, which is
    /// the only cycle; FormatResponse and Fail are the only edges into Done.
    #[must_use]
    pub const fn edge(self) -> Edge {
        match self {
            Node::GenerateQuery | Node::FixQuery => Edge::Always(Next::Node(Node::ExecuteQuery)),
            Node::ExecuteQuery => Edge::Routed,
            Node::FormatResponse | Node::Fail => Edge::Always(Next::Done),
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Node::GenerateQuery => "generate_query",
            Node::ExecuteQuery => "execute_query",
            Node::FixQuery => "fix_query",
            Node::FormatResponse => "format_response",
            Node::Fail => "fail",
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Route {
    /// Node a route leads to.
    #[must_use]
    pub const fn target(self) -> Node {
        match self {
            Route::Fix => Node::FixQuery,
            Route::Format => Node::FormatResponse,
            Route::Fail => Node::Fail,
        }
    }
}

/// Choose the next step after execution.
///
/// No error routes to Format. An error with `attempt` below `retry_ceiling`
/// routes to Fix, anything else to Fail, so at most `retry_ceiling` generate
/// and fix calls happen per run.
#[must_use]
pub fn route(state: &WorkflowState, retry_ceiling: u32) -> Route {
    match state.query_error() {
        None => Route::Format,
        Some(_) if state.attempt < retry_ceiling => Route::Fix,
        Some(_) => Route::Fail,
    }
}

/// Resolve the next step for `node` given the current state.
#[must_use]
pub fn next_step(node: Node, state: &WorkflowState, retry_ceiling: u32) -> Next {
    match node.edge() {
        Edge::Always(next) => next,
        Edge::Routed => Next::Node(route(state, retry_ceiling).target()),
    }
}
