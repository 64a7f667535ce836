//! Configuration tree walking.
//!
//! Each suite entry of a configuration becomes a [`ConfigTree`]: an arena
//! holding one record per mapping key, in document order. A record knows
//! its name, its raw (environment-resolved) value, its parent and its
//! children. [`ConfigNode`] is a cheap borrowed view over one record and
//! carries all of the classification and traversal logic.
//!
//! Keys are classified by [`NodeKind`]:
//!
//! ```yaml
//! prod00:                 # suite
//!   edits:                # edits container
//!     ECF_HOME: /ecf      #   leaf-node
//!   gfs:                  # family
//!     tasks:              #   tasks container
//!       jgfs_forecast:    #     leaf-node, task entry
//!     nodes:              #   nodes container
//!       post:             #     family
//! ```

use ecfgen_core::{DefKind, DefinitionTree, NodeHandle};
use serde_yaml::Value;
use std::cell::OnceCell;
use std::fmt;
use tracing::warn;

use crate::attributes::{Edit, Trigger, scalar_text};
use crate::env::EnvironmentResolver;

/// Reserved keys that group attributes rather than name workflow nodes.
pub const KEYWORDS: [&str; 5] = ["tasks", "edits", "nodes", "triggers", "events"];

/// Classification of a configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Suite,
    Family,
    TaskContainer,
    EditContainer,
    TriggerContainer,
    EventContainer,
    NodeContainer,
    LeafNode,
}

impl NodeKind {
    /// Container kind for a reserved key, compared case-insensitively.
    pub fn from_keyword(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "tasks" => Some(NodeKind::TaskContainer),
            "edits" => Some(NodeKind::EditContainer),
            "triggers" => Some(NodeKind::TriggerContainer),
            "events" => Some(NodeKind::EventContainer),
            "nodes" => Some(NodeKind::NodeContainer),
            _ => None,
        }
    }

    /// Canonical lower-case name. Containers are named by their keyword.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Suite => "suite",
            NodeKind::Family => "family",
            NodeKind::TaskContainer => "tasks",
            NodeKind::EditContainer => "edits",
            NodeKind::TriggerContainer => "triggers",
            NodeKind::EventContainer => "events",
            NodeKind::NodeContainer => "nodes",
            NodeKind::LeafNode => "leaf-node",
        }
    }

    /// Whether this is one of the reserved keyword containers.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            NodeKind::TaskContainer
                | NodeKind::EditContainer
                | NodeKind::TriggerContainer
                | NodeKind::EventContainer
                | NodeKind::NodeContainer
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Index of a node inside its [`ConfigTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug)]
struct NodeRecord {
    name: String,
    parent: Option<NodeId>,
    data: Value,
    children: Vec<NodeId>,
    kind: OnceCell<NodeKind>,
    instance: OnceCell<NodeHandle>,
}

/// One suite entry of a configuration, as an arena of nodes.
///
/// The arena is filled in pre-order, so record order equals
/// [`ConfigNode::traverse_down`] order from the root.
#[derive(Debug)]
pub struct ConfigTree {
    nodes: Vec<NodeRecord>,
}

impl ConfigTree {
    /// Build the tree for one suite. Environment indirections in `data`
    /// are resolved once, here.
    pub fn new(name: impl Into<String>, data: Value, resolver: &EnvironmentResolver) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        let data = resolver.sub_env_values(data);
        tree.insert(name.into(), data, None);
        tree
    }

    fn insert(&mut self, name: String, data: Value, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        let entries: Vec<(String, Value)> = match &data {
            Value::Mapping(mapping) => mapping
                .iter()
                .filter_map(|(key, value)| match scalar_text(key) {
                    Some(key) => Some((key, value.clone())),
                    None => {
                        warn!("skipping non-scalar key {:?} under [{}]", key, name);
                        None
                    }
                })
                .collect(),
            _ => Vec::new(),
        };

        self.nodes.push(NodeRecord {
            name,
            parent,
            data,
            children: Vec::with_capacity(entries.len()),
            kind: OnceCell::new(),
            instance: OnceCell::new(),
        });

        for (key, value) in entries {
            let child = self.insert(key, value, Some(id));
            self.nodes[id.0].children.push(child);
        }
        id
    }

    /// The suite node.
    pub fn root(&self) -> ConfigNode<'_> {
        ConfigNode {
            tree: self,
            id: NodeId(0),
        }
    }

    pub fn node(&self, id: NodeId) -> Option<ConfigNode<'_>> {
        (id.0 < self.nodes.len()).then_some(ConfigNode { tree: self, id })
    }

    /// Find a node by the raw `/`-separated names from the root, including
    /// container keys, e.g. `suite1/fam1/tasks/t1`.
    pub fn find(&self, raw_path: &str) -> Option<ConfigNode<'_>> {
        let mut parts = raw_path.split('/');
        let root = self.root();
        if parts.next()? != root.name() {
            return None;
        }
        parts.try_fold(root, |node, part| node.child(part))
    }

    /// All nodes in pre-order.
    pub fn iter(&self) -> impl Iterator<Item = ConfigNode<'_>> {
        (0..self.nodes.len()).map(|i| ConfigNode {
            tree: self,
            id: NodeId(i),
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// A borrowed view of one node of a [`ConfigTree`].
#[derive(Clone, Copy)]
pub struct ConfigNode<'a> {
    tree: &'a ConfigTree,
    id: NodeId,
}

impl<'a> ConfigNode<'a> {
    fn record(&self) -> &'a NodeRecord {
        &self.tree.nodes[self.id.0]
    }

    fn at(&self, id: NodeId) -> ConfigNode<'a> {
        ConfigNode {
            tree: self.tree,
            id,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &'a str {
        &self.record().name
    }

    /// Raw value of this key, with environment indirections resolved.
    pub fn data(&self) -> &'a Value {
        &self.record().data
    }

    pub fn parent(&self) -> Option<ConfigNode<'a>> {
        self.record().parent.map(|id| self.at(id))
    }

    pub fn is_root(&self) -> bool {
        self.record().parent.is_none()
    }

    /// Classification of this node, computed on first access.
    pub fn kind(&self) -> NodeKind {
        *self.record().kind.get_or_init(|| self.classify())
    }

    fn classify(&self) -> NodeKind {
        if self.is_root() {
            return NodeKind::Suite;
        }
        if let Some(kind) = NodeKind::from_keyword(self.name()) {
            return kind;
        }
        if self.record().children.is_empty() {
            return NodeKind::LeafNode;
        }
        NodeKind::Family
    }

    /// Child nodes in mapping order; empty unless the data is a mapping.
    pub fn children(&self) -> Vec<ConfigNode<'a>> {
        self.record()
            .children
            .iter()
            .map(|id| self.at(*id))
            .collect()
    }

    /// Direct child with the given key.
    pub fn child(&self, name: &str) -> Option<ConfigNode<'a>> {
        self.record()
            .children
            .iter()
            .map(|id| self.at(*id))
            .find(|child| child.name() == name)
    }

    fn container(&self, kind: NodeKind) -> Option<ConfigNode<'a>> {
        self.record()
            .children
            .iter()
            .map(|id| self.at(*id))
            .find(|child| child.kind() == kind)
    }

    /// Variables under this node's `edits` key, in order.
    pub fn edits(&self) -> Vec<Edit> {
        let Some(container) = self.container(NodeKind::EditContainer) else {
            return Vec::new();
        };
        container
            .children()
            .into_iter()
            .filter_map(|edit| {
                let value = match edit.data() {
                    Value::Null => Some(String::new()),
                    other => scalar_text(other),
                };
                match value {
                    Some(value) => Some(Edit {
                        name: edit.name().to_string(),
                        value,
                    }),
                    None => {
                        warn!(
                            "skipping edit [{}] on [{}]: value is not a scalar",
                            edit.name(),
                            self.local_path()
                        );
                        None
                    }
                }
            })
            .collect()
    }

    /// Task entries under this node's `tasks` key. Each entry's data is its
    /// task specification.
    pub fn tasks(&self) -> Vec<ConfigNode<'a>> {
        self.container(NodeKind::TaskContainer)
            .map(|container| container.children())
            .unwrap_or_default()
    }

    /// Entries under this node's `nodes` key.
    pub fn nodes(&self) -> Vec<ConfigNode<'a>> {
        self.container(NodeKind::NodeContainer)
            .map(|container| container.children())
            .unwrap_or_default()
    }

    /// Triggers under this node's `triggers` key, in order.
    pub fn triggers(&self) -> Vec<Trigger> {
        let Some(container) = self.container(NodeKind::TriggerContainer) else {
            return Vec::new();
        };
        match container.data() {
            Value::Sequence(entries) => entries
                .iter()
                .filter_map(|entry| {
                    let trigger = Trigger::from_value(entry);
                    if trigger.is_none() {
                        warn!(
                            "skipping unrecognized trigger {:?} on [{}]",
                            entry,
                            self.local_path()
                        );
                    }
                    trigger
                })
                .collect(),
            Value::String(expression) => vec![Trigger::new(expression.as_str())],
            _ => Vec::new(),
        }
    }

    /// Event names under this node's `events` key, in order. The key may
    /// hold a sequence, a mapping (its keys are the names) or one scalar.
    pub fn events(&self) -> Vec<String> {
        let Some(container) = self.container(NodeKind::EventContainer) else {
            return Vec::new();
        };
        match container.data() {
            Value::Sequence(entries) => entries.iter().filter_map(scalar_text).collect(),
            Value::Mapping(entries) => entries.keys().filter_map(scalar_text).collect(),
            other => scalar_text(other).into_iter().collect(),
        }
    }

    /// Nodes from this one up to the suite, inclusive.
    pub fn traverse_up(&self) -> Vec<ConfigNode<'a>> {
        let mut path = vec![*self];
        let mut cursor = self.parent();
        while let Some(node) = cursor {
            path.push(node);
            cursor = node.parent();
        }
        path
    }

    /// This node and its whole subtree, pre-order.
    pub fn traverse_down(&self) -> Vec<ConfigNode<'a>> {
        let mut out = Vec::new();
        let mut stack = vec![self.id];
        while let Some(id) = stack.pop() {
            out.push(self.at(id));
            stack.extend(self.tree.nodes[id.0].children.iter().rev().copied());
        }
        out
    }

    /// The suite this node belongs to.
    pub fn root(&self) -> ConfigNode<'a> {
        self.tree.root()
    }

    /// Workflow path of this node, e.g. `suite1/fam1/t1`. Keyword
    /// containers and leaf nodes above this node do not contribute.
    pub fn local_path(&self) -> String {
        let mut names: Vec<&str> = self
            .traverse_up()
            .iter()
            .enumerate()
            .filter(|(depth, node)| {
                *depth == 0 || !(node.kind().is_container() || node.kind() == NodeKind::LeafNode)
            })
            .map(|(_, node)| node.name())
            .collect();
        names.reverse();
        names.join("/")
    }

    /// Nearest ancestor that is not a `tasks` or `nodes` container.
    pub fn definition_parent(&self) -> Option<ConfigNode<'a>> {
        let mut cursor = self.parent();
        while let Some(node) = cursor {
            match node.kind() {
                NodeKind::TaskContainer | NodeKind::NodeContainer => cursor = node.parent(),
                _ => return Some(node),
            }
        }
        None
    }

    /// Which definition object this node stands for, if any.
    pub fn role(&self) -> Option<DefKind> {
        let kind = self.kind();
        if kind == NodeKind::Suite {
            return Some(DefKind::Suite);
        }

        let parent_kind = self.parent()?.kind();
        let owner_is_container = self
            .definition_parent()
            .and_then(|owner| owner.role())
            .is_some_and(|role| role.is_container());
        if !owner_is_container {
            return None;
        }

        match (kind, parent_kind) {
            (NodeKind::Family | NodeKind::LeafNode, NodeKind::TaskContainer) => Some(DefKind::Task),
            (
                NodeKind::Family,
                NodeKind::Suite | NodeKind::Family | NodeKind::NodeContainer,
            ) => Some(DefKind::Family),
            _ => None,
        }
    }

    /// Handle already bound to this node, without creating one.
    pub fn bound_instance(&self) -> Option<NodeHandle> {
        self.record().instance.get().copied()
    }

    /// Definition object for this node, created in `defs` on first access
    /// and memoized. Nodes without a [`role`](Self::role) have none.
    pub fn external_instance<T>(&self, defs: &mut T) -> ecfgen_core::Result<Option<NodeHandle>>
    where
        T: DefinitionTree + ?Sized,
    {
        if let Some(handle) = self.bound_instance() {
            return Ok(Some(handle));
        }

        let handle = match self.role() {
            Some(DefKind::Suite) => defs.create_suite(self.name())?,
            Some(DefKind::Family) => {
                let Some(parent) = self.parent_instance(defs)? else {
                    return Ok(None);
                };
                defs.add_family(parent, self.name())?
            }
            Some(DefKind::Task) => {
                let Some(parent) = self.parent_instance(defs)? else {
                    return Ok(None);
                };
                defs.add_task(parent, self.name())?
            }
            None => return Ok(None),
        };
        Ok(Some(*self.record().instance.get_or_init(|| handle)))
    }

    fn parent_instance<T>(&self, defs: &mut T) -> ecfgen_core::Result<Option<NodeHandle>>
    where
        T: DefinitionTree + ?Sized,
    {
        match self.definition_parent() {
            Some(parent) => parent.external_instance(defs),
            None => Ok(None),
        }
    }
}

impl PartialEq for ConfigNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for ConfigNode<'_> {}

impl fmt::Debug for ConfigNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigNode")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .field("id", &self.id)
            .finish()
    }
}

impl fmt::Display for ConfigNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.parent() {
            Some(parent) => write!(f, "<{} [{}] [{}]/>", self.kind(), self.name(), parent.name()),
            None => write!(f, "<{} [{}] [None]/>", self.kind(), self.name()),
        }
    }
}
