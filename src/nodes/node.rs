use fixture_core::{TypeBindings, TypeRef};
use std::fmt;

/// Index of a node inside its [`NodeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Structural classification of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Record with writable members; one child per member
    Compound,
    /// Homogeneous sequence; one child for the element
    Sequence,
    /// Key-value mapping; two children, key then value
    Mapping,
    /// Single-value container; one child for the contained value
    Wrapper,
    /// Value produced by a leaf generator
    Leaf,
    /// Excluded from population by the caller
    Ignored,
    /// Re-entry of an ancestor's type; generation stops here
    Cyclic,
}

/// How a node's value is written into its compound parent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Member {
    /// Raw name of the declaring type
    pub owner: String,
    pub name: String,
    pub setter: Option<String>,
}

/// Position of a node relative to its parent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Slot {
    Root,
    Field(Member),
    Element,
    Key,
    Value,
    Inner,
}

/// One position in the type graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) ty: TypeRef,
    pub(crate) kind: NodeKind,
    pub(crate) slot: Slot,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) bindings: TypeBindings,
    pub(crate) depth: usize,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Concrete type of this position.
    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn slot(&self) -> &Slot {
        &self.slot
    }

    /// The member this node is written to, absent unless the parent is compound.
    pub fn member(&self) -> Option<&Member> {
        match &self.slot {
            Slot::Field(member) => Some(member),
            _ => None,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Generic parameter bindings visible to this node's members.
    pub fn bindings(&self) -> &TypeBindings {
        &self.bindings
    }

    /// Distance from the root; the root is at depth 0.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.member() {
            Some(member) => write!(
                f,
                "Node[{}.{}, depth={}, type={}]",
                member.owner, member.name, self.depth, self.ty
            ),
            None => write!(
                f,
                "Node[{}, depth={}, type={}]",
                self.ty.raw_name(),
                self.depth,
                self.ty
            ),
        }
    }
}

/// Arena of nodes; the root is always the first node.
#[derive(Debug, Clone, Default)]
pub struct NodeTree {
    nodes: Vec<Node>,
}

impl NodeTree {
    pub(crate) fn push(&mut self, mut node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.id = id;
        self.nodes.push(node);
        id
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn root_id(&self) -> NodeId {
        NodeId(0)
    }

    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    /// Look up a node. Ids are only handed out by this tree.
    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in construction (depth-first) order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = &Node> {
        std::iter::successors(self.get(id).parent, move |parent| self.get(*parent).parent)
            .map(move |parent| self.get(parent))
    }

    /// Whether `ancestor` is a proper ancestor of `id`.
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        self.ancestors(id).any(|node| node.id == ancestor)
    }

    /// The chain from the root down to `id`, inclusive.
    pub fn lineage(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain: Vec<NodeId> = self.ancestors(id).map(Node::id).collect();
        chain.reverse();
        chain.push(id);
        chain
    }

    /// Diagnostic path such as `Order.lines[].product`.
    pub fn path(&self, id: NodeId) -> String {
        let mut path = String::new();
        for step in self.lineage(id) {
            let node = self.get(step);
            match &node.slot {
                Slot::Root => path.push_str(node.ty.raw_name()),
                Slot::Field(member) => {
                    path.push('.');
                    path.push_str(&member.name);
                }
                Slot::Element => path.push_str("[]"),
                Slot::Key => path.push_str("{key}"),
                Slot::Value => path.push_str("{value}"),
                Slot::Inner => path.push('?'),
            }
        }
        path
    }

    /// First node written to `owner.name`.
    pub fn find_field(&self, owner: &str, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| {
            node.member()
                .is_some_and(|member| member.owner == owner && member.name == name)
        })
    }

    /// Count nodes of one kind.
    pub fn count(&self, kind: NodeKind) -> usize {
        self.nodes.iter().filter(|node| node.kind == kind).count()
    }
}
