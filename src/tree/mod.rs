//! Tree Path Engine
//!
//! Rebuilds the function / failure mode hierarchy from flat parent-pointer
//! rows, assigns each node its root-to-node path and orders the forest for
//! display. Mutations go back through the store and invalidate the paths.

pub mod forest;
pub mod node;
pub mod path;

pub use forest::{Forest, DEFAULT_MAX_DEPTH, NODE_KINDS};
pub use node::{Node, NodeState};
pub use path::{compare_path, is_ancestor, PathOrder, SortKeyScale};
