// Turn graph runtime
// Walks a petgraph DiGraph of stages, threading ConversationState through

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use super::node::{GraphError, Node, NodeContext, NodeOutput};
use super::state::ConversationState;

const DEFAULT_STEP_LIMIT: usize = 16;

/// Label on an edge between two stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Taken when a stage continues without naming a branch.
    Next,
    /// Taken when a stage branches with this label.
    When(String),
}

impl Route {
    fn accepts(&self, label: Option<&str>) -> bool {
        match (self, label) {
            (Route::Next, None) => true,
            (Route::When(expected), Some(label)) => expected == label,
            _ => false,
        }
    }
}

pub struct GraphRuntime {
    graph: DiGraph<Box<dyn Node>, Route>,
    by_id: HashMap<String, NodeIndex>,
    entry: String,
    step_limit: usize,
}

impl GraphRuntime {
    fn empty() -> Self {
        Self {
            graph: DiGraph::new(),
            by_id: HashMap::new(),
            entry: String::new(),
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    pub fn node_ids(&self) -> Vec<&str> {
        self.graph.node_weights().map(|node| node.id()).collect()
    }

    pub fn has_cycle(&self) -> bool {
        petgraph::algo::is_cyclic_directed(&self.graph)
    }

    fn index_of(&self, id: &str, origin: &str) -> Result<NodeIndex, GraphError> {
        self.by_id
            .get(id)
            .copied()
            .ok_or_else(|| GraphError::new(origin, format!("unknown stage '{}'", id)))
    }

    /// Run stages from the entry until one returns `Final`.
    ///
    /// Every error carries the ids of the stages visited so far.
    pub async fn run(
        &self,
        mut state: ConversationState,
        ctx: &NodeContext,
    ) -> Result<ConversationState, GraphError> {
        let mut current = self.index_of(&self.entry, "runtime")?;
        let mut visited: Vec<String> = Vec::new();

        while visited.len() < self.step_limit {
            let node = &self.graph[current];
            let id = node.id();
            visited.push(id.to_string());
            tracing::debug!(
                "Stage {} [{}] ({}/{})",
                node.name(),
                id,
                visited.len(),
                self.step_limit
            );

            let (next_state, output) = match node.execute(state, ctx).await {
                Ok(result) => result,
                Err(err) => return Err(err.with_trace(visited)),
            };
            state = next_state;

            let next = match output {
                NodeOutput::Final => return Ok(state),
                NodeOutput::Continue(Some(target)) => self.index_of(&target, id),
                NodeOutput::Continue(None) => self.follow(current, None),
                NodeOutput::Branch(label) => self.follow(current, Some(&label)),
            };
            current = match next {
                Ok(next) => next,
                Err(err) => return Err(err.with_trace(visited)),
            };
        }

        Err(GraphError::new(
            "runtime",
            format!("step limit of {} reached", self.step_limit),
        )
        .with_trace(visited))
    }

    /// Pick the outgoing edge for `label`. A branch label with no edge of its
    /// own falls back to the `Next` edge when there is one.
    fn follow(&self, from: NodeIndex, label: Option<&str>) -> Result<NodeIndex, GraphError> {
        let id = self.graph[from].id();
        let mut fallback = None;

        for edge in self.graph.edges_directed(from, Direction::Outgoing) {
            if edge.weight().accepts(label) {
                return Ok(edge.target());
            }
            if *edge.weight() == Route::Next {
                fallback = Some(edge.target());
            }
        }

        match (label, fallback) {
            (Some(label), Some(target)) => {
                tracing::warn!("Stage {} has no '{}' edge, taking the default", id, label);
                Ok(target)
            }
            _ => Err(GraphError::new(
                id,
                format!("no edge for {}", label.unwrap_or("continue")),
            )),
        }
    }
}

/// Collects stages and edges, then validates them into a `GraphRuntime`.
pub struct GraphBuilder {
    runtime: GraphRuntime,
    edges: Vec<(String, String, Route)>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            runtime: GraphRuntime::empty(),
            edges: Vec::new(),
        }
    }

    pub fn entry(mut self, id: impl Into<String>) -> Self {
        self.runtime.entry = id.into();
        self
    }

    pub fn max_steps(mut self, limit: usize) -> Self {
        self.runtime.step_limit = limit;
        self
    }

    pub fn node(mut self, node: Box<dyn Node>) -> Self {
        let id = node.id().to_string();
        let index = self.runtime.graph.add_node(node);
        self.runtime.by_id.insert(id, index);
        self
    }

    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push((from.into(), to.into(), Route::Next));
        self
    }

    pub fn conditional_edge(
        mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        self.edges
            .push((from.into(), to.into(), Route::When(label.into())));
        self
    }

    pub fn build(self) -> Result<GraphRuntime, GraphError> {
        let Self { mut runtime, edges } = self;
        for (from, to, route) in edges {
            let source = runtime.index_of(&from, "builder")?;
            let target = runtime.index_of(&to, "builder")?;
            runtime.graph.add_edge(source, target, route);
        }
        runtime.index_of(&runtime.entry, "builder")?;
        Ok(runtime)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
