//! Scene graph.
//!
//! A small tagged set of node variants (`Group`, `Transform`, `RenderTarget`,
//! opaque `Content`) sharing one traversal capability: [`Node::accept`] with a
//! [`Visitor`].

mod node;

pub use node::{
    traverse, Content, ContentKind, Group, Node, NodeRef, RenderTarget, ResourceCounter, Transform,
    Visitor,
};
