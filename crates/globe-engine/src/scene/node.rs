use std::sync::{Arc, RwLock};

use glam::DMat4;

use crate::util::sync::read;

/// Shared handle to a scene node.
///
/// The scene is shared by every view, so nodes are reference counted and
/// guarded for the occasional structural edit.
pub type NodeRef = Arc<RwLock<Node>>;

/// What an opaque content node stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentKind {
    /// Terrain/map rendering.
    Map,
    /// Sky and atmosphere.
    Sky,
    /// ECS render systems (meshes, lines, icons, labels).
    Systems,
    Custom(String),
}

/// Leaf standing in for content rendered by an external collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct Content {
    pub kind: ContentKind,
    /// Number of GPU resources the content asks the compile pass for.
    pub resources: u32,
}

#[derive(Debug, Default)]
pub struct Group {
    pub children: Vec<NodeRef>,
}

#[derive(Debug)]
pub struct Transform {
    pub matrix: DMat4,
    pub children: Vec<NodeRef>,
}

/// Subgraph rendered into an offscreen target by a pre-render graph.
#[derive(Debug)]
pub struct RenderTarget {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub children: Vec<NodeRef>,
}

/// Scene-graph node.
#[derive(Debug)]
pub enum Node {
    Group(Group),
    Transform(Transform),
    RenderTarget(RenderTarget),
    Content(Content),
}

impl Node {
    /// Creates an empty group handle.
    pub fn group() -> NodeRef {
        Node::Group(Group::default()).into_ref()
    }

    pub fn transform(matrix: DMat4) -> NodeRef {
        Node::Transform(Transform {
            matrix,
            children: Vec::new(),
        })
        .into_ref()
    }

    pub fn render_target(name: impl Into<String>, width: u32, height: u32) -> NodeRef {
        Node::RenderTarget(RenderTarget {
            name: name.into(),
            width,
            height,
            children: Vec::new(),
        })
        .into_ref()
    }

    pub fn content(kind: ContentKind, resources: u32) -> NodeRef {
        Node::Content(Content { kind, resources }).into_ref()
    }

    #[inline]
    pub fn into_ref(self) -> NodeRef {
        Arc::new(RwLock::new(self))
    }

    /// Child list; empty for content leaves.
    pub fn children(&self) -> &[NodeRef] {
        match self {
            Node::Group(g) => &g.children,
            Node::Transform(t) => &t.children,
            Node::RenderTarget(r) => &r.children,
            Node::Content(_) => &[],
        }
    }

    /// Appends `child`. Returns `false` for content leaves, which cannot
    /// have children.
    pub fn add_child(&mut self, child: NodeRef) -> bool {
        let children = match self {
            Node::Group(g) => &mut g.children,
            Node::Transform(t) => &mut t.children,
            Node::RenderTarget(r) => &mut r.children,
            Node::Content(_) => return false,
        };
        children.push(child);
        true
    }

    /// Removes `child` by identity. Returns `true` if it was present.
    pub fn remove_child(&mut self, child: &NodeRef) -> bool {
        let children = match self {
            Node::Group(g) => &mut g.children,
            Node::Transform(t) => &mut t.children,
            Node::RenderTarget(r) => &mut r.children,
            Node::Content(_) => return false,
        };
        let before = children.len();
        children.retain(|c| !Arc::ptr_eq(c, child));
        children.len() != before
    }

    /// Dispatches to the visitor method for this variant.
    pub fn accept(&self, visitor: &mut dyn Visitor) {
        match self {
            Node::Group(g) => visitor.apply_group(g),
            Node::Transform(t) => visitor.apply_transform(t),
            Node::RenderTarget(r) => visitor.apply_render_target(r),
            Node::Content(c) => visitor.apply_content(c),
        }
    }
}

/// Visits every child in order.
pub fn traverse(children: &[NodeRef], visitor: &mut dyn Visitor) {
    for child in children {
        read(child).accept(visitor);
    }
}

/// Scene traversal.
///
/// The default methods descend into children, so a visitor only overrides
/// the variants it cares about.
pub trait Visitor {
    fn apply_group(&mut self, group: &Group) {
        traverse(&group.children, self.as_dyn());
    }

    fn apply_transform(&mut self, transform: &Transform) {
        traverse(&transform.children, self.as_dyn());
    }

    fn apply_render_target(&mut self, target: &RenderTarget) {
        traverse(&target.children, self.as_dyn());
    }

    fn apply_content(&mut self, _content: &Content) {}

    fn as_dyn(&mut self) -> &mut dyn Visitor;
}

/// Counts nodes and the GPU resources requested by content leaves.
#[derive(Debug, Default)]
pub struct ResourceCounter {
    pub nodes: usize,
    pub resources: usize,
}

impl ResourceCounter {
    pub fn count(nodes: &[NodeRef]) -> Self {
        let mut counter = Self::default();
        traverse(nodes, &mut counter);
        counter
    }
}

impl Visitor for ResourceCounter {
    fn apply_group(&mut self, group: &Group) {
        self.nodes += 1;
        traverse(&group.children, self);
    }

    fn apply_transform(&mut self, transform: &Transform) {
        self.nodes += 1;
        traverse(&transform.children, self);
    }

    fn apply_render_target(&mut self, target: &RenderTarget) {
        self.nodes += 1;
        traverse(&target.children, self);
    }

    fn apply_content(&mut self, content: &Content) {
        self.nodes += 1;
        self.resources += content.resources as usize;
    }

    fn as_dyn(&mut self) -> &mut dyn Visitor {
        self
    }
}
