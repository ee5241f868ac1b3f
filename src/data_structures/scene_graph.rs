//! Scene graph and hierarchical scene organization.
//!
//! Nodes live in an arena and refer to each other by [`NodeId`]. Each node
//! holds a local transform relative to its parent; world transforms are
//! refreshed top-down by [`SceneGraph::update_world_transforms`].

use crate::data_structures::instance::Instance;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a node renders. Mesh, model and sprite kinds index into the
/// corresponding tables of the scene description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Group,
    Mesh(usize),
    Model(usize),
    Sprite(usize),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    local: Instance,
    world: Instance,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn local(&self) -> &Instance {
        &self.local
    }

    pub fn world(&self) -> &Instance {
        &self.world
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_root(&mut self, name: &str, local: Instance, kind: NodeKind) -> NodeId {
        let id = self.push(name, local, kind, None);
        self.roots.push(id);
        id
    }

    pub fn add_child(
        &mut self,
        parent: NodeId,
        name: &str,
        local: Instance,
        kind: NodeKind,
    ) -> NodeId {
        let id = self.push(name, local, kind, Some(parent));
        self.nodes[parent.0].children.push(id);
        id
    }

    fn push(&mut self, name: &str, local: Instance, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name: name.to_string(),
            kind,
            world: local.clone(),
            local,
            parent,
            children: Vec::new(),
        });
        id
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn local_mut(&mut self, id: NodeId) -> &mut Instance {
        &mut self.nodes[id.0].local
    }

    pub fn world(&self, id: NodeId) -> &Instance {
        &self.nodes[id.0].world
    }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.name == name).map(NodeId)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// All nodes of one kind in insertion order, e.g. every instance of a shared mesh.
    pub fn iter_kind(&self, kind: NodeKind) -> impl Iterator<Item = NodeId> + '_ {
        self.iter().filter(move |(_, n)| n.kind == kind).map(|(id, _)| id)
    }

    /// Recomputes `world = parent.world * local` for every node, parents first.
    pub fn update_world_transforms(&mut self) {
        let mut stack: Vec<(NodeId, Instance)> = self
            .roots
            .iter()
            .rev()
            .map(|&id| (id, Instance::new()))
            .collect();
        while let Some((id, parent_world)) = stack.pop() {
            let node = &mut self.nodes[id.0];
            node.world = &parent_world * &node.local;
            let world = node.world.clone();
            for &child in node.children.iter().rev() {
                stack.push((child, world.clone()));
            }
        }
    }
}
