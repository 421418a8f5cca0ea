//! Path comparison and sort keys
//!
//! A path lists node ids from a root down to the node itself. Paths order
//! the forest for display: ancestors come before their descendants, and at
//! the first branching point the branch with the larger id comes first.

use crate::types::NodeId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::warn;

/// Relative position of one path with respect to another, seen from the first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathOrder {
    /// Displayed before the other path, on an earlier branch
    Before,
    /// Displayed after the other path (later branch, or a descendant of it)
    After,
    /// Strict ancestor of the other path
    AncestorOf,
    /// Identical path
    Same,
}

impl PathOrder {
    /// Display ordering; ancestors sort before descendants
    pub fn to_ordering(self) -> Ordering {
        match self {
            PathOrder::Before | PathOrder::AncestorOf => Ordering::Less,
            PathOrder::Same => Ordering::Equal,
            PathOrder::After => Ordering::Greater,
        }
    }
}

/// Compare two paths element-wise.
///
/// At the first differing position the larger id is `Before`: sibling
/// branches are displayed in descending id order.
pub fn compare_path(a: &[NodeId], b: &[NodeId]) -> PathOrder {
    for (x, y) in a.iter().zip(b) {
        match x.cmp(y) {
            Ordering::Equal => continue,
            Ordering::Greater => return PathOrder::Before,
            Ordering::Less => return PathOrder::After,
        }
    }
    match a.len().cmp(&b.len()) {
        Ordering::Less => PathOrder::AncestorOf,
        Ordering::Equal => PathOrder::Same,
        Ordering::Greater => PathOrder::After,
    }
}

/// True when `ancestor` is a strict prefix of `path`
pub fn is_ancestor(ancestor: &[NodeId], path: &[NodeId]) -> bool {
    compare_path(ancestor, path) == PathOrder::AncestorOf
}

/// Parameters for turning paths into single integers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKeyScale {
    /// Multiplier per path level: the smallest power of ten above every id
    pub scale: u128,
    /// Number of levels every key is padded to
    pub width: usize,
}

impl SortKeyScale {
    /// Derive the scale from every path of a forest.
    ///
    /// Negative ids cannot be encoded and are left out (and reported).
    /// Returns `None` when no id is usable or the scale overflows.
    pub fn for_paths<'a>(paths: impl IntoIterator<Item = &'a [NodeId]>) -> Option<Self> {
        let mut max_id: Option<u128> = None;
        let mut width = 1;
        for path in paths {
            if path.is_empty() {
                continue;
            }
            width = width.max(path.len());
            for &id in path {
                match u128::try_from(id) {
                    Ok(id) => max_id = Some(max_id.map_or(id, |m| m.max(id))),
                    Err(_) => warn!(id, "Negative id excluded from sort key computation"),
                }
            }
        }
        let max_id = max_id?;
        let mut scale: u128 = 10;
        while scale <= max_id {
            scale = scale.checked_mul(10)?;
        }
        Some(Self { scale, width })
    }

    /// Concatenate `path` most-significant-first, padding missing levels
    /// with zeros. `None` for negative ids, over-long paths and overflow.
    pub fn key(&self, path: &[NodeId]) -> Option<u128> {
        if path.is_empty() || path.len() > self.width {
            return None;
        }
        let mut key: u128 = 0;
        for level in 0..self.width {
            let digit = match path.get(level) {
                Some(&id) => match u128::try_from(id) {
                    Ok(id) => id,
                    Err(_) => {
                        warn!(id, ?path, "Path holds a negative id, no sort key");
                        return None;
                    }
                },
                None => 0,
            };
            key = match key.checked_mul(self.scale).and_then(|k| k.checked_add(digit)) {
                Some(k) => k,
                None => {
                    warn!(?path, scale = %self.scale, width = self.width, "Sort key overflow");
                    return None;
                }
            };
        }
        Some(key)
    }
}
