//! Tree nodes

use super::path::{compare_path, PathOrder};
use crate::record::Record;
use crate::types::{NodeId, Path};

/// Placement of a node after the last reconstruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// No path yet, or the parent chain could not be resolved
    Unplaced,
    /// Path from a root is known
    Placed,
}

/// A hierarchical record with its cached root-to-node path.
///
/// The path is empty until the owning forest reconstructs it, and is
/// cleared again by every structural change to the forest.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    record: Record,
    path: Path,
}

impl Node {
    pub fn new(record: Record) -> Self {
        Self {
            record,
            path: Path::new(),
        }
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn into_record(self) -> Record {
        self.record
    }

    pub fn id(&self) -> Option<NodeId> {
        self.record.id()
    }

    pub fn parent_id(&self) -> Option<NodeId> {
        self.record.parent_id()
    }

    pub fn parent_class(&self) -> Option<&str> {
        self.record.parent_class()
    }

    pub fn kind(&self) -> &'static str {
        self.record.kind()
    }

    pub fn is_root(&self) -> bool {
        self.parent_id().is_none()
    }

    pub fn state(&self) -> NodeState {
        if self.path.is_empty() {
            NodeState::Unplaced
        } else {
            NodeState::Placed
        }
    }

    pub fn is_placed(&self) -> bool {
        self.state() == NodeState::Placed
    }

    /// Root-to-node ids, inclusive. Empty while unplaced.
    pub fn path(&self) -> &[NodeId] {
        &self.path
    }

    /// Ids of every ancestor, root first
    pub fn ancestors(&self) -> &[NodeId] {
        match self.path.split_last() {
            Some((_, ancestors)) => ancestors,
            None => &[],
        }
    }

    /// Distance from the root; `None` while unplaced
    pub fn depth(&self) -> Option<usize> {
        self.path.len().checked_sub(1)
    }

    /// Root id of this node's tree; `None` while unplaced
    pub fn root(&self) -> Option<NodeId> {
        self.path.first().copied()
    }

    /// Position of this node relative to `other` in display order.
    /// Only meaningful when both nodes are placed.
    pub fn compare_path(&self, other: &Node) -> PathOrder {
        compare_path(&self.path, &other.path)
    }

    pub(crate) fn set_path(&mut self, path: Path) {
        self.path = path;
    }

    pub(crate) fn clear_path(&mut self) {
        self.path.clear();
    }

    pub(crate) fn replace_record(&mut self, record: Record) {
        self.record = record;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FUNCTION;

    fn node(id: NodeId, parent: Option<NodeId>) -> Node {
        let mut r = Record::with_defaults(&FUNCTION);
        r.set_id(id);
        if let Some(p) = parent {
            r.set("parentid", p);
        }
        Node::new(r)
    }

    #[test]
    fn test_new_node_is_unplaced() {
        let n = node(4, Some(2));
        assert_eq!(n.state(), NodeState::Unplaced);
        assert!(n.ancestors().is_empty());
        assert_eq!(n.depth(), None);
        assert!(!n.is_root());
    }

    #[test]
    fn test_ancestors_exclude_self() {
        let mut n = node(4, Some(2));
        n.set_path(vec![1, 2, 4]);
        assert_eq!(n.ancestors(), &[1, 2]);
        assert_eq!(n.depth(), Some(2));
        assert_eq!(n.root(), Some(1));
        n.clear_path();
        assert!(!n.is_placed());
    }

    #[test]
    fn test_compare_between_nodes() {
        let mut a = node(1, None);
        a.set_path(vec![1]);
        let mut c = node(4, Some(2));
        c.set_path(vec![1, 2, 4]);
        assert_eq!(a.compare_path(&c), PathOrder::AncestorOf);
        assert_eq!(c.compare_path(&a), PathOrder::After);
        assert_eq!(a.compare_path(&a), PathOrder::Same);
    }
}
