//! The immutable constraint graph and the shareable [`Schema`] handle.
//!
//! Nodes live in an arena indexed by [`NodeId`] and are keyed by canonical
//! schema position, so that references (including cyclic ones) resolve to a
//! single node instead of being expanded.

use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{LookupError, Result, SchemaError, SchemaResult};
use crate::events;
use crate::node::{ConstraintNode, NodeId};
use crate::pointer::Pointer;
use crate::reference::ResolvedDocument;
use crate::session::ValidationSession;

/// Assigns node ids to canonical positions in discovery order.
pub(crate) struct Positions<'d> {
    document: &'d ResolvedDocument,
    ids: HashMap<Pointer, NodeId>,
    order: Vec<Pointer>,
}

impl<'d> Positions<'d> {
    pub(crate) fn new(document: &'d ResolvedDocument) -> Self {
        Self {
            document,
            ids: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Id of the node for `position`, allocating one for a new position.
    pub(crate) fn intern(&mut self, position: &Pointer) -> NodeId {
        let canonical = self.document.canonical(position);
        if let Some(id) = self.ids.get(&canonical) {
            return *id;
        }
        let id = NodeId(self.order.len());
        self.ids.insert(canonical.clone(), id);
        self.order.push(canonical);
        id
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

/// Compiled schema: one [`ConstraintNode`] per reachable canonical position.
#[derive(Debug)]
pub struct ConstraintGraph {
    document: ResolvedDocument,
    nodes: Vec<ConstraintNode>,
    index: HashMap<Pointer, NodeId>,
}

impl ConstraintGraph {
    /// Resolve references in `document` and compile every reachable
    /// sub-schema.
    ///
    /// Closure runs in rounds: each round compiles the positions discovered
    /// by the previous one, until a round discovers nothing new. Any keyword
    /// error aborts the whole build.
    pub fn build(document: Value) -> SchemaResult<Self> {
        let document = ResolvedDocument::resolve(document)?;
        let mut positions = Positions::new(&document);
        let mut nodes: Vec<ConstraintNode> = Vec::new();

        let mut frontier = vec![positions.intern(&Pointer::root())];
        let mut round = 0usize;
        while !frontier.is_empty() {
            trace!(round, positions = frontier.len(), "graph closure round");
            let known = positions.len();
            for id in frontier {
                let position = positions.order[id.index()].clone();
                let value = document.document().pointer(position.as_str()).ok_or_else(|| {
                    SchemaError::reference(&position, "sub-schema position does not exist")
                })?;
                nodes.push(ConstraintNode::compile(&position, value, &mut positions)?);
            }
            frontier = (known..positions.len()).map(NodeId).collect();
            round += 1;
        }
        debug_assert_eq!(nodes.len(), positions.len());

        let index = positions.ids;
        check_descending(&nodes)?;
        debug!(nodes = nodes.len(), rounds = round, "compiled schema graph");

        Ok(Self {
            document,
            nodes,
            index,
        })
    }

    pub fn document(&self) -> &ResolvedDocument {
        &self.document
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &ConstraintNode {
        &self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node for `position`, following aliases first.
    pub fn lookup(&self, position: &Pointer) -> Option<NodeId> {
        self.index.get(&self.document.canonical(position)).copied()
    }

    /// A fresh session validating one value against the node at `position`.
    ///
    /// Asking for a position that was never compiled is a caller error, not a
    /// validation failure.
    pub fn session(&self, position: &Pointer) -> std::result::Result<ValidationSession<'_>, LookupError> {
        self.lookup(position)
            .map(|id| ValidationSession::new(self, id))
            .ok_or_else(|| LookupError {
                position: position.clone(),
            })
    }

    pub fn root_session(&self) -> ValidationSession<'_> {
        ValidationSession::new(self, self.root())
    }
}

/// Edges that apply another node to the very same value.
fn in_place_edges(node: &ConstraintNode) -> impl Iterator<Item = NodeId> + '_ {
    node.all_of
        .iter()
        .chain(&node.any_of)
        .chain(&node.one_of)
        .chain(node.not.iter())
        .chain(node.schema_dependencies.values())
        .copied()
}

/// Reject cycles made only of in-place edges; validating them would apply
/// the same node to the same value without ever consuming an event.
fn check_descending(nodes: &[ConstraintNode]) -> SchemaResult<()> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        Unvisited,
        Active,
        Done,
    }

    fn visit(nodes: &[ConstraintNode], id: NodeId, marks: &mut [Mark]) -> SchemaResult<()> {
        match marks[id.index()] {
            Mark::Done => return Ok(()),
            Mark::Active => {
                return Err(SchemaError::NonDescendingCycle {
                    position: nodes[id.index()].position.clone(),
                });
            }
            Mark::Unvisited => {}
        }
        marks[id.index()] = Mark::Active;
        for next in in_place_edges(&nodes[id.index()]) {
            visit(nodes, next, marks)?;
        }
        marks[id.index()] = Mark::Done;
        Ok(())
    }

    let mut marks = vec![Mark::Unvisited; nodes.len()];
    for start in 0..nodes.len() {
        visit(nodes, NodeId(start), &mut marks)?;
    }
    Ok(())
}

/// A compiled schema, cheap to clone and safe to share across threads.
#[derive(Debug, Clone)]
pub struct Schema {
    graph: Arc<ConstraintGraph>,
}

impl Schema {
    pub fn new(document: Value) -> SchemaResult<Self> {
        Ok(Self {
            graph: Arc::new(ConstraintGraph::build(document)?),
        })
    }

    pub fn graph(&self) -> &ConstraintGraph {
        &self.graph
    }

    /// Validate an in-memory value.
    pub fn validate(&self, instance: &Value) -> bool {
        let mut session = self.graph.root_session();
        events::from_value(instance, &mut session);
        session.finalize()
    }

    /// Validate JSON text without building a `Value`.
    ///
    /// Malformed text is an error rather than a `false` verdict.
    pub fn validate_str(&self, text: &str) -> Result<bool> {
        let mut session = self.graph.root_session();
        events::from_str(text, &mut session)?;
        Ok(session.finalize())
    }

    /// Like [`Schema::validate_str`], reading from `reader`.
    pub fn validate_reader<R: Read>(&self, reader: R) -> Result<bool> {
        let mut session = self.graph.root_session();
        events::from_reader(reader, &mut session)?;
        Ok(session.finalize())
    }
}
