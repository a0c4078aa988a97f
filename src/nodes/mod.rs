//! Structural node tree.
//!
//! A [`NodeTree`] is the reified shape of one fixture root: one node per
//! position that needs a value, classified by [`NodeKind`]. Nodes live in
//! an arena and refer to each other by [`NodeId`]; parents are back
//! references only.

mod builder;
mod node;

pub use builder::NodeBuilder;
pub use node::{Member, Node, NodeId, NodeKind, NodeTree, Slot};
