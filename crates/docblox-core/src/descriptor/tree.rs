//! Namespace and package trees.
//!
//! Both taxonomies are arenas of [`TreeNode`]s addressed by [`NodeId`]. A node
//! owns its children by id and knows its parent by id, so upward queries need
//! no back-pointers. The attached elements are [`ElementRef`]s into files.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{ElementKind, ElementRef, FileId};
use crate::fqsen::Fqsen;

/// Unique identifier for a node within one taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Create a new node ID.
    pub fn new(id: u32) -> Self {
        NodeId(id)
    }

    /// The root node of every taxonomy.
    pub const ROOT: NodeId = NodeId(0);
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node_{}", self.0)
    }
}

/// Which taxonomy a tree represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxonomyKind {
    Namespace,
    Package,
}

/// A synthetic namespace or package node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: NodeId,
    /// Last segment; empty for the root.
    pub name: String,
    /// Full name, `\` for the root.
    pub full_name: Fqsen,
    pub parent: Option<NodeId>,
    pub children: BTreeMap<String, NodeId>,
    pub classes: BTreeMap<Fqsen, ElementRef>,
    pub interfaces: BTreeMap<Fqsen, ElementRef>,
    pub traits: BTreeMap<Fqsen, ElementRef>,
    pub functions: BTreeMap<Fqsen, ElementRef>,
    pub constants: BTreeMap<Fqsen, ElementRef>,
    /// Files filed under this node (package tree only).
    pub files: BTreeMap<String, FileId>,
}

impl TreeNode {
    fn new(id: NodeId, full_name: Fqsen, parent: Option<NodeId>) -> Self {
        TreeNode {
            id,
            name: full_name.name().to_string(),
            full_name,
            parent,
            children: BTreeMap::new(),
            classes: BTreeMap::new(),
            interfaces: BTreeMap::new(),
            traits: BTreeMap::new(),
            functions: BTreeMap::new(),
            constants: BTreeMap::new(),
            files: BTreeMap::new(),
        }
    }

    fn collection_mut(&mut self, kind: ElementKind) -> Option<&mut BTreeMap<Fqsen, ElementRef>> {
        match kind {
            ElementKind::Class => Some(&mut self.classes),
            ElementKind::Interface => Some(&mut self.interfaces),
            ElementKind::Trait => Some(&mut self.traits),
            ElementKind::Function => Some(&mut self.functions),
            ElementKind::Constant => Some(&mut self.constants),
            ElementKind::Method | ElementKind::Property => None,
        }
    }

    /// Attach a top-level element to the collection of its kind.
    ///
    /// Returns false when the element was already attached.
    pub fn attach(&mut self, element: ElementRef) -> bool {
        let Some(collection) = self.collection_mut(element.kind) else {
            return false;
        };
        if collection.contains_key(&element.fqsen) {
            return false;
        }
        collection.insert(element.fqsen.clone(), element);
        true
    }

    /// Keep only attached elements for which `keep` returns true.
    pub fn retain_elements(&mut self, mut keep: impl FnMut(&ElementRef) -> bool) {
        for collection in [
            &mut self.classes,
            &mut self.interfaces,
            &mut self.traits,
            &mut self.functions,
            &mut self.constants,
        ] {
            collection.retain(|_, element| keep(element));
        }
    }

    /// All attached elements, kind by kind.
    pub fn elements(&self) -> impl Iterator<Item = &ElementRef> {
        self.classes
            .values()
            .chain(self.interfaces.values())
            .chain(self.traits.values())
            .chain(self.functions.values())
            .chain(self.constants.values())
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Arena of nodes forming one taxonomy tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    kind: TaxonomyKind,
    nodes: Vec<TreeNode>,
}

impl Taxonomy {
    /// Create a tree holding only the root.
    pub fn new(kind: TaxonomyKind) -> Self {
        Taxonomy {
            kind,
            nodes: vec![TreeNode::new(NodeId::ROOT, Fqsen::root(), None)],
        }
    }

    pub fn kind(&self) -> TaxonomyKind {
        self.kind
    }

    pub fn root(&self) -> &TreeNode {
        &self.nodes[0]
    }

    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut TreeNode> {
        self.nodes.get_mut(id.0 as usize)
    }

    /// Find the node for a full name.
    pub fn find(&self, full_name: &Fqsen) -> Option<NodeId> {
        let mut current = NodeId::ROOT;
        for segment in full_name.segments() {
            current = *self.get(current)?.children.get(segment)?;
        }
        Some(current)
    }

    /// Find the node for a full name, creating missing nodes along the path.
    ///
    /// Returns the node and the ids of the nodes created by this call, parents
    /// first. Revisiting a path creates nothing.
    pub fn ensure(&mut self, full_name: &Fqsen) -> (NodeId, Vec<NodeId>) {
        let mut current = NodeId::ROOT;
        let mut path = Fqsen::root();
        let mut created = Vec::new();
        for segment in full_name.segments() {
            path = path.join(segment);
            let existing = self.nodes[current.0 as usize].children.get(segment).copied();
            current = match existing {
                Some(child) => child,
                None => {
                    let id = NodeId::new(self.nodes.len() as u32);
                    self.nodes.push(TreeNode::new(id, path.clone(), Some(current)));
                    self.nodes[current.0 as usize]
                        .children
                        .insert(segment.to_string(), id);
                    created.push(id);
                    id
                }
            };
        }
        (current, created)
    }

    /// Children of a node in name order.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &TreeNode> {
        self.get(id)
            .into_iter()
            .flat_map(|node| node.children.values())
            .filter_map(|child| self.get(*child))
    }

    /// Node ids in depth-first pre-order, starting at the root.
    pub fn depth_first(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![NodeId::ROOT];
        while let Some(id) = stack.pop() {
            order.push(id);
            if let Some(node) = self.get(id) {
                stack.extend(node.children.values().rev().copied());
            }
        }
        order
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes.iter()
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut TreeNode> {
        self.nodes.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        !self.root().has_children()
    }

    /// Drop every node except a fresh root.
    pub fn reset(&mut self) {
        *self = Taxonomy::new(self.kind);
    }
}
