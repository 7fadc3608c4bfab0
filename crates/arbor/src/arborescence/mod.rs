//! Join tree built while resolving relation paths for one query.
//!
//! Paths are slash-delimited: `articles/author/age` walks relation `articles`,
//! then `author`, and names attribute `age`. Each relation visited from a given
//! node becomes one child node, reused on every later visit, so a prefix shared
//! by several conditions is joined once.
//!
//! Node aliases are the dot-joined relation path (`articles.author`); the root
//! is aliased [`ROOT_ALIAS`].


use crate::builder::{JoinClause, JoinType};
use crate::condition::ConditionNode;
use crate::error::{OrmError, OrmResult};
use crate::relation::Relation;
use crate::schema::{Model, Registry, Table};
use std::sync::Arc;

/// Alias of the root table.
pub const ROOT_ALIAS: &str = "_";

/// Index of a node in its [`Arborescence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);
}

#[derive(Debug, Clone)]
pub struct Node {
    /// Relation reaching this node from its parent; `None` at the root.
    pub relation: Option<Arc<Relation>>,
    /// Model of the node, `None` for a bare-table root.
    pub model: Option<String>,
    pub alias: String,
    pub depth: usize,
    pub parent: Option<NodeId>,
    /// Children keyed by relation name, in creation order.
    pub children: Vec<(String, NodeId)>,
    /// Leaf conditions that resolved to this node.
    pub leaves: Vec<ConditionNode>,
    /// Columns of this node are selected.
    pub selected: bool,
    /// Joined in the outer statement.
    pub joined: bool,
    /// Reached by a top-level conjunctive condition; joined with INNER.
    pub required: bool,
}

impl Node {
    pub fn is_multi_valued(&self) -> bool {
        self.relation.as_ref().is_some_and(|r| r.is_multi_valued())
    }

    fn root(model: Option<String>) -> Self {
        Self {
            relation: None,
            model,
            alias: ROOT_ALIAS.to_string(),
            depth: 0,
            parent: None,
            children: Vec::new(),
            leaves: Vec::new(),
            selected: true,
            joined: true,
            required: true,
        }
    }
}

/// Join tree for one query.
#[derive(Debug)]
pub struct Arborescence<'r> {
    registry: Option<&'r Registry>,
    root_table: &'r Table,
    nodes: Vec<Node>,
}

impl<'r> Arborescence<'r> {
    /// Tree rooted at a registered model.
    pub fn new(registry: &'r Registry, model: &str) -> OrmResult<Self> {
        let root = registry.model(model)?;
        Ok(Self {
            registry: Some(registry),
            root_table: root.table(),
            nodes: vec![Node::root(Some(root.name().to_string()))],
        })
    }

    /// Tree rooted at a bare table; any relation segment is unknown.
    pub fn for_table(table: &'r Table) -> Self {
        Self {
            registry: None,
            root_table: table,
            nodes: vec![Node::root(None)],
        }
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn has_model(&self) -> bool {
        self.nodes[0].model.is_some()
    }

    pub fn model(&self, id: NodeId) -> Option<&'r Model> {
        let name = self.node(id).model.as_deref()?;
        self.registry?.model(name).ok()
    }

    pub fn table(&self, id: NodeId) -> &'r Table {
        self.model(id).map_or(self.root_table, Model::table)
    }

    pub fn node_by_alias(&self, alias: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.alias == alias).map(NodeId)
    }

    /// Child reached through `relation`, created on first visit.
    pub fn child(&mut self, parent: NodeId, relation: &str) -> OrmResult<NodeId> {
        if let Some((_, id)) = self.node(parent).children.iter().find(|(r, _)| r == relation) {
            return Ok(*id);
        }

        let descriptor = match self.model(parent) {
            Some(model) => model
                .relation(relation)
                .cloned()
                .ok_or_else(|| OrmError::unknown_relation(model.name(), relation))?,
            None => {
                let owner = self.node(parent).model.clone();
                return Err(OrmError::unknown_relation(
                    owner.unwrap_or_else(|| self.root_table.name().to_string()),
                    relation,
                ));
            }
        };

        let parent_node = self.node(parent);
        let alias = if parent == NodeId::ROOT {
            relation.to_string()
        } else {
            format!("{}.{relation}", parent_node.alias)
        };
        let node = Node {
            model: Some(descriptor.linked.model.clone()),
            relation: Some(descriptor),
            alias,
            depth: parent_node.depth + 1,
            parent: Some(parent),
            children: Vec::new(),
            leaves: Vec::new(),
            selected: false,
            joined: false,
            required: false,
        };
        tracing::trace!(alias = %node.alias, depth = node.depth, "arborescence node");

        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        self.nodes[parent.0].children.push((relation.to_string(), id));
        Ok(id)
    }

    /// Resolve a path from the root into `(node, attribute)`.
    pub fn resolve(&mut self, path: &str) -> OrmResult<(NodeId, String)> {
        self.resolve_from(NodeId::ROOT, path)
    }

    /// Resolve a path relative to `start`.
    pub fn resolve_from(&mut self, start: NodeId, path: &str) -> OrmResult<(NodeId, String)> {
        let mut segments: Vec<&str> = path.split('/').map(str::trim).collect();
        let attribute = segments.pop().unwrap_or_default();
        if attribute.is_empty() || segments.iter().any(|s| s.is_empty()) {
            return Err(OrmError::malformed("path", format!("invalid path '{path}'")));
        }
        let mut node = start;
        for segment in segments {
            node = self.child(node, segment)?;
        }
        Ok((node, attribute.to_string()))
    }

    /// Resolve a path made only of relation names.
    pub fn resolve_relations(&mut self, start: NodeId, path: &str) -> OrmResult<NodeId> {
        let mut node = start;
        for segment in path.split('/').map(str::trim) {
            if segment.is_empty() {
                return Err(OrmError::malformed("path", format!("invalid path '{path}'")));
            }
            node = self.child(node, segment)?;
        }
        Ok(node)
    }

    /// Record a leaf condition in the node's bucket.
    pub fn attach(&mut self, id: NodeId, leaf: ConditionNode) {
        self.nodes[id.0].leaves.push(leaf);
    }

    /// Nodes from just below `scope` down to `node`, top-down. `None` if `node`
    /// is not a descendant of `scope` (or is `scope` itself: `Some(empty)`).
    pub fn path_between(&self, scope: NodeId, node: NodeId) -> Option<Vec<NodeId>> {
        let mut path = Vec::new();
        let mut current = node;
        while current != scope {
            path.push(current);
            current = self.node(current).parent?;
        }
        path.reverse();
        Some(path)
    }

    /// First multi-valued node on the path from `scope` (exclusive) to `node`.
    pub fn anchor(&self, scope: NodeId, node: NodeId) -> Option<NodeId> {
        self.path_between(scope, node)?
            .into_iter()
            .find(|id| self.node(*id).is_multi_valued())
    }

    /// Join `id` and its ancestors in the outer statement.
    pub fn join_path(&mut self, id: NodeId) {
        let mut current = Some(id);
        while let Some(node) = current {
            self.nodes[node.0].joined = true;
            current = self.nodes[node.0].parent;
        }
    }

    /// Join `id` and select its columns.
    pub fn select(&mut self, id: NodeId) {
        self.nodes[id.0].selected = true;
        self.join_path(id);
    }

    /// Join `id` and its ancestors with INNER joins.
    pub fn require(&mut self, id: NodeId) {
        let mut current = Some(id);
        while let Some(node) = current {
            self.nodes[node.0].required = true;
            self.nodes[node.0].joined = true;
            current = self.nodes[node.0].parent;
        }
    }

    /// Selected non-root nodes in pre-order.
    pub fn selected(&self) -> Vec<NodeId> {
        self.preorder(NodeId::ROOT)
            .into_iter()
            .filter(|id| *id != NodeId::ROOT && self.node(*id).selected)
            .collect()
    }

    fn preorder(&self, from: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            out.push(id);
            for (_, child) in self.node(id).children.iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    fn joins_for(&self, id: NodeId, join_type: JoinType) -> Vec<JoinClause> {
        let node = self.node(id);
        match (&node.relation, node.parent) {
            (Some(relation), Some(parent)) => {
                relation.joins(&self.node(parent).alias, &node.alias, join_type, true)
            }
            _ => Vec::new(),
        }
    }

    /// Joins of the outer statement, in pre-order.
    pub fn main_joins(&self) -> Vec<JoinClause> {
        self.preorder(NodeId::ROOT)
            .into_iter()
            .filter(|id| *id != NodeId::ROOT && self.node(*id).joined)
            .flat_map(|id| {
                let join_type = if self.node(id).required {
                    JoinType::Inner
                } else {
                    JoinType::Left
                };
                self.joins_for(id, join_type)
            })
            .collect()
    }

    /// LEFT joins inside a subquery rooted at `scope`, reaching every node in
    /// `targets` from it.
    pub fn joins_within(&self, scope: NodeId, targets: &[NodeId]) -> Vec<JoinClause> {
        let mut wanted = Vec::new();
        for target in targets {
            if let Some(path) = self.path_between(scope, *target) {
                wanted.extend(path);
            }
        }
        self.preorder(scope)
            .into_iter()
            .filter(|id| *id != scope && wanted.contains(id))
            .flat_map(|id| self.joins_for(id, JoinType::Left))
            .collect()
    }
}
