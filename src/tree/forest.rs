//! Forest: the one-to-many collection of tree nodes and its path engine

use super::node::Node;
use super::path::{PathOrder, SortKeyScale};
use crate::action::ActionList;
use crate::record::{
    FormInput, Record, RecordSchema, FAILURE_MODE, FUNCTION, PARENT_CLASS, PARENT_ID, SHEET_ID,
};
use crate::store::{RecordStore, FIRST_ID};
use crate::types::{NodeId, Path, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, info, warn};

/// Deepest level a new node may be created at, below its root
pub const DEFAULT_MAX_DEPTH: usize = 15;

/// Every record kind that lives in the forest
pub static NODE_KINDS: [&RecordSchema; 2] = [&FUNCTION, &FAILURE_MODE];

/// All function and failure mode nodes of one session.
///
/// The forest owns its nodes. Paths are computed lazily: any structural
/// change marks them invalid and the next read reconstructs them.
#[derive(Debug, Clone)]
pub struct Forest {
    nodes: Vec<Node>,
    valid: bool,
    max_depth: usize,
}

impl Default for Forest {
    fn default() -> Self {
        Self::new()
    }
}

impl Forest {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            valid: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Load a forest from the store, optionally scoped to one sheet
    pub fn load(store: &mut dyn RecordStore, sheet: Option<NodeId>) -> Self {
        let mut forest = Self::new();
        forest.refresh(store, sheet);
        forest
    }

    /// Replace the nodes with a fresh read of the store.
    ///
    /// With a sheet, reads the sheet row, the functions below it level by
    /// level and the failure modes tagged with that sheet. Without one, reads
    /// every function and failure mode.
    pub fn refresh(&mut self, store: &mut dyn RecordStore, sheet: Option<NodeId>) {
        self.nodes.clear();
        self.invalidate();
        let (functions, failure_modes) = match sheet {
            Some(s) => (
                self.load_functions_below(store, s),
                self.load_kind(store, &FAILURE_MODE, &format!("sheetid = {s}")),
            ),
            None => (
                self.load_kind(store, &FUNCTION, ""),
                self.load_kind(store, &FAILURE_MODE, ""),
            ),
        };
        debug!(?sheet, functions, failure_modes, "Loaded forest");
    }

    /// Breadth-first read of the sheet row and the functions below it
    fn load_functions_below(&mut self, store: &mut dyn RecordStore, sheet: NodeId) -> usize {
        let mut seen = HashSet::new();
        let mut frontier = Vec::new();
        let mut where_clause = format!("id = {sheet}");
        loop {
            let mut record = Record::empty(&FUNCTION);
            if store.fetch_next(&mut record, &where_clause) {
                let Some(id) = record.id() else {
                    continue;
                };
                if seen.insert(id) && self.attach(Node::new(record)) {
                    frontier.push(id);
                }
                continue;
            }
            if frontier.is_empty() {
                break;
            }
            let ids: Vec<String> = frontier.drain(..).map(|id: NodeId| id.to_string()).collect();
            where_clause = format!("parentid IN ({})", ids.join(", "));
        }
        seen.len()
    }

    fn load_kind(
        &mut self,
        store: &mut dyn RecordStore,
        schema: &'static RecordSchema,
        where_clause: &str,
    ) -> usize {
        let mut count = 0;
        loop {
            let mut record = Record::empty(schema);
            if !store.fetch_next(&mut record, where_clause) {
                break;
            }
            if self.attach(Node::new(record)) {
                count += 1;
            }
        }
        count
    }

    /// Root function rows (sheets) in id order
    pub fn sheets(store: &mut dyn RecordStore) -> Vec<Record> {
        let mut sheets = Vec::new();
        loop {
            let mut record = Record::empty(&FUNCTION);
            if !store.fetch_next(&mut record, "parentid IS NULL") {
                break;
            }
            sheets.push(record);
        }
        sheets
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in attachment order
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    fn index_of(&self, id: NodeId) -> Option<usize> {
        self.nodes.iter().position(|n| n.id() == Some(id))
    }

    fn index_of_kind(&self, id: NodeId, kind: &str) -> Option<usize> {
        self.nodes
            .iter()
            .position(|n| n.id() == Some(id) && n.kind() == kind)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.index_of(id).map(|i| &self.nodes[i])
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.index_of(id).is_some()
    }

    /// Add a node, replacing the node of the same kind and id if present.
    /// Nodes without an id are rejected.
    pub fn attach(&mut self, node: Node) -> bool {
        let Some(id) = node.id() else {
            warn!(kind = node.kind(), "Cannot attach a node without id");
            return false;
        };
        match self.index_of_kind(id, node.kind()) {
            Some(i) => self.nodes[i] = node,
            None => {
                if self.contains(id) {
                    warn!(id, kind = node.kind(), "Duplicate node id in forest");
                }
                self.nodes.push(node);
            }
        }
        self.invalidate();
        true
    }

    /// Remove one node from memory only
    pub fn detach(&mut self, id: NodeId) -> Option<Node> {
        let i = self.index_of(id)?;
        self.invalidate();
        Some(self.nodes.remove(i))
    }

    /// Nodes sharing a parent pointer, optionally restricted to a parent kind
    pub fn peers(&self, parent_id: Option<NodeId>, parent_class: Option<&str>) -> Vec<&Node> {
        self.nodes
            .iter()
            .filter(|n| n.parent_id() == parent_id)
            .filter(|n| parent_class.map_or(true, |c| n.parent_class() == Some(c)))
            .collect()
    }

    pub fn children(&self, id: NodeId) -> Vec<&Node> {
        self.peers(Some(id), None)
    }

    /// Drop every cached path; the next read reconstructs them
    pub fn invalidate(&mut self) {
        self.valid = false;
        for node in &mut self.nodes {
            node.clear_path();
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    fn ensure_paths(&mut self) {
        if !self.valid {
            self.reconstruct();
        }
    }

    /// Recompute every node's path from the parent pointers.
    ///
    /// Nodes wait in a queue seeded in descending id order and are retried
    /// until their parent is placed. The loop ends once every node is placed,
    /// a full pass over the queue places nothing, or `n²` steps have run.
    /// Nodes still waiting are orphans: reported, and left unplaced.
    pub fn reconstruct(&mut self) {
        for node in &mut self.nodes {
            node.clear_path();
        }
        let total = self.nodes.len();
        let mut order: Vec<usize> = (0..total).collect();
        order.sort_by(|&a, &b| self.nodes[b].id().cmp(&self.nodes[a].id()));
        let mut waiting: VecDeque<usize> = order.into();

        let known: HashSet<(NodeId, &'static str)> = self
            .nodes
            .iter()
            .filter_map(|n| n.id().map(|id| (id, n.kind())))
            .collect();
        let mut done: HashMap<NodeId, Vec<usize>> = HashMap::new();
        let budget = total.saturating_mul(total);
        let mut steps = 0;
        let mut stalled = 0;

        while steps < budget && stalled < waiting.len() {
            let Some(i) = waiting.pop_back() else {
                break;
            };
            steps += 1;
            let Some(id) = self.nodes[i].id() else {
                continue;
            };
            let path = match self.nodes[i].parent_id() {
                None => vec![id],
                Some(parent) => match self.resolve_parent(i, parent, &done, &known) {
                    Some(p) => {
                        let mut path = self.nodes[p].path().to_vec();
                        path.push(id);
                        path
                    }
                    None => {
                        waiting.push_front(i);
                        stalled += 1;
                        continue;
                    }
                },
            };
            self.nodes[i].set_path(path);
            done.entry(id).or_default().push(i);
            stalled = 0;
        }

        for &i in &waiting {
            let node = &self.nodes[i];
            warn!(
                id = ?node.id(),
                parent = ?node.parent_id(),
                kind = node.kind(),
                "Unresolved parent; node left out of the ordered view"
            );
        }
        self.valid = true;
        debug!(
            nodes = total,
            unplaced = waiting.len(),
            steps,
            "Reconstructed forest paths"
        );
    }

    fn resolve_parent(
        &self,
        child: usize,
        parent: NodeId,
        done: &HashMap<NodeId, Vec<usize>>,
        known: &HashSet<(NodeId, &'static str)>,
    ) -> Option<usize> {
        let candidates = done.get(&parent)?;
        let matching: Vec<usize> = match self.nodes[child].parent_class() {
            Some(class) if known.contains(&(parent, class)) => candidates
                .iter()
                .copied()
                .filter(|&c| self.nodes[c].kind() == class)
                .collect(),
            _ => candidates.clone(),
        };
        let first = *matching.first()?;
        if matching.len() > 1 {
            warn!(
                parent,
                child = ?self.nodes[child].id(),
                matches = matching.len(),
                "Duplicate parent id; using the first match"
            );
        }
        Some(first)
    }

    /// Make sure `node` belongs to the forest and return its path
    pub fn place(&mut self, node: Node) -> Path {
        let Some(id) = node.id() else {
            warn!(kind = node.kind(), "Cannot place a node without id");
            return Path::new();
        };
        let kind = node.kind();
        if self.index_of_kind(id, kind).is_none() {
            self.attach(node);
        }
        self.ensure_paths();
        self.index_of_kind(id, kind)
            .map(|i| self.nodes[i].path().to_vec())
            .unwrap_or_default()
    }

    /// Path of a node; empty if the node is unknown or unplaced
    pub fn path_of(&mut self, id: NodeId) -> Path {
        self.ensure_paths();
        self.get(id).map(|n| n.path().to_vec()).unwrap_or_default()
    }

    /// Ancestor ids of a node, root first
    pub fn ancestors(&mut self, id: NodeId) -> Option<Vec<NodeId>> {
        self.ensure_paths();
        self.get(id)
            .filter(|n| n.is_placed())
            .map(|n| n.ancestors().to_vec())
    }

    /// Compare two placed nodes by path; `None` if either is unknown or unplaced
    pub fn compare(&mut self, a: NodeId, b: NodeId) -> Option<PathOrder> {
        self.ensure_paths();
        let a = self.get(a).filter(|n| n.is_placed())?;
        let b = self.get(b).filter(|n| n.is_placed())?;
        Some(a.compare_path(b))
    }

    /// Placed nodes in display order: every node after its ancestors, and
    /// sibling branches by descending id
    pub fn ordered_view(&mut self) -> Vec<&Node> {
        self.ensure_paths();
        let mut placed: Vec<&Node> = self.nodes.iter().filter(|n| n.is_placed()).collect();
        placed.sort_by(|a, b| a.compare_path(b).to_ordering());
        placed
    }

    pub fn ordered_ids(&mut self) -> Vec<NodeId> {
        self.ordered_view().iter().filter_map(|n| n.id()).collect()
    }

    /// Nodes whose parent chain could not be resolved
    pub fn unplaced(&mut self) -> Vec<&Node> {
        self.ensure_paths();
        self.nodes.iter().filter(|n| !n.is_placed()).collect()
    }

    /// Numeric sort key per node, in attachment order.
    ///
    /// Keys concatenate path ids most significant first, so ascending keys
    /// give a pre-order walk with ascending sibling ids. Unplaced nodes and
    /// paths holding negative ids get no key.
    pub fn sort_keys(&mut self) -> Vec<(NodeId, Option<u128>)> {
        self.ensure_paths();
        let scale = SortKeyScale::for_paths(self.nodes.iter().map(Node::path));
        self.nodes
            .iter()
            .filter_map(|n| {
                let key = scale.and_then(|s| if n.is_placed() { s.key(n.path()) } else { None });
                n.id().map(|id| (id, key))
            })
            .collect()
    }

    /// Ids of `id` and all its descendants by parent pointer, top down
    pub fn subtree_ids(&self, id: NodeId) -> Vec<NodeId> {
        let mut children: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for node in &self.nodes {
            if let (Some(parent), Some(child)) = (node.parent_id(), node.id()) {
                children.entry(parent).or_default().push(child);
            }
        }
        let mut out = vec![id];
        let mut seen: HashSet<NodeId> = HashSet::from([id]);
        let mut next = 0;
        while next < out.len() {
            let current = out[next];
            next += 1;
            for &child in children.get(&current).into_iter().flatten() {
                if seen.insert(child) {
                    out.push(child);
                }
            }
        }
        out
    }

    /// Next free node id across both node tables and this forest
    pub fn allocate_id(&self, store: &mut dyn RecordStore) -> NodeId {
        let stored = NODE_KINDS
            .iter()
            .filter_map(|schema| store.next_id(&schema.table(), ""))
            .max();
        let in_memory = self.nodes.iter().filter_map(Node::id).max().map(|m| m + 1);
        stored.max(in_memory).map_or(FIRST_ID, |id| id.max(FIRST_ID))
    }

    /// Validate `parent` as the new parent of a node of `kind` and return the
    /// parent's kind and root. `moving` is the node being placed, if it
    /// already exists. Functions may only sit directly below a sheet.
    fn check_parent(
        &mut self,
        kind: &'static str,
        parent: NodeId,
        moving: Option<NodeId>,
        enforce_depth: bool,
    ) -> Option<(&'static str, NodeId)> {
        self.ensure_paths();
        let Some(node) = self.get(parent) else {
            warn!(parent, "Parent node not in forest");
            return None;
        };
        let (Some(depth), Some(root)) = (node.depth(), node.root()) else {
            warn!(parent, "Parent node is not placed");
            return None;
        };
        if kind == FUNCTION.kind && depth != 0 {
            warn!(parent, depth, "Functions can only be placed directly below a sheet");
            return None;
        }
        if let Some(id) = moving {
            if node.path().contains(&id) {
                warn!(id, parent, "Refusing to place a node under itself or its descendant");
                return None;
            }
        }
        if enforce_depth && depth >= self.max_depth {
            warn!(parent, depth, max_depth = self.max_depth, "Tree depth limit reached");
            return None;
        }
        Some((node.kind(), root))
    }

    /// Create and persist a node from form input.
    ///
    /// The parent class is taken from the parent node and failure modes are
    /// tagged with the sheet they end up in. Returns the new id.
    pub fn create_node(
        &mut self,
        store: &mut dyn RecordStore,
        schema: &'static RecordSchema,
        form: &FormInput,
    ) -> Option<NodeId> {
        if !schema.is_hierarchical() {
            warn!(kind = schema.kind, "Record kind has no parent pointer");
            return None;
        }
        let mut record = Record::from_form(schema, form);
        if let Some(id) = record.id() {
            if self.contains(id) {
                warn!(id, "Node id already in use");
                return None;
            }
        }
        let parent = record.parent_id();
        match parent {
            Some(parent) => {
                let (parent_kind, root) = self.check_parent(schema.kind, parent, None, true)?;
                record.set(PARENT_CLASS, parent_kind);
                if record.contains(SHEET_ID) {
                    record.set(SHEET_ID, root);
                }
            }
            None => {
                record.set(PARENT_ID, Value::Null);
                record.set(PARENT_CLASS, schema.kind);
            }
        }
        let id = match record.id() {
            Some(id) => id,
            None => {
                let id = self.allocate_id(store);
                record.set_id(id);
                id
            }
        };
        if parent.is_none() && record.contains(SHEET_ID) {
            record.set(SHEET_ID, id);
        }
        if !store.upsert(&mut record) {
            return None;
        }
        info!(id, kind = schema.kind, ?parent, "Created node");
        self.attach(Node::new(record));
        Some(id)
    }

    /// Persist an edited copy of a node's record.
    ///
    /// A changed parent pointer is validated like a move and the parent class
    /// and sheet tags are re-derived. Otherwise the stored tags are kept, so
    /// unplaced rows can still be edited.
    pub fn update_node(&mut self, store: &mut dyn RecordStore, mut record: Record) -> bool {
        let Some(id) = record.id() else {
            warn!(kind = record.kind(), "Cannot update a node without id");
            return false;
        };
        let Some(i) = self.index_of_kind(id, record.kind()) else {
            warn!(id, kind = record.kind(), "Node not in forest");
            return false;
        };
        let old_parent = self.nodes[i].parent_id();
        let new_parent = record.parent_id();
        let moved = old_parent != new_parent;
        if !moved {
            let stored = self.nodes[i].record();
            let parent_class = stored.get(PARENT_CLASS).cloned().unwrap_or(Value::Null);
            let sheet = stored.get(SHEET_ID).cloned();
            record.set(PARENT_CLASS, parent_class);
            if let Some(sheet) = sheet {
                record.set(SHEET_ID, sheet);
            }
        } else {
            match new_parent {
                Some(parent) => {
                    let kind = record.kind();
                    let Some((parent_kind, root)) = self.check_parent(kind, parent, Some(id), true)
                    else {
                        return false;
                    };
                    record.set(PARENT_CLASS, parent_kind);
                    if record.contains(SHEET_ID) {
                        record.set(SHEET_ID, root);
                    }
                }
                None => {
                    record.set(PARENT_ID, Value::Null);
                    record.set(PARENT_CLASS, record.kind());
                    if record.contains(SHEET_ID) {
                        record.set(SHEET_ID, id);
                    }
                }
            }
        }
        if !store.upsert(&mut record) {
            return false;
        }
        self.nodes[i].replace_record(record);
        if moved {
            self.invalidate();
            info!(id, ?old_parent, ?new_parent, "Moved node");
            return self.sync_sheet_ids(store, id);
        }
        true
    }

    /// Overlay form input on a node's record and persist it
    pub fn update_from_form(
        &mut self,
        store: &mut dyn RecordStore,
        id: NodeId,
        form: &FormInput,
    ) -> bool {
        let Some(node) = self.get(id) else {
            warn!(id, "Node not in forest");
            return false;
        };
        let mut record = node.record().clone();
        record.merge_form(form);
        record.set_id(id);
        self.update_node(store, record)
    }

    /// Reparent a node; `None` makes it a root
    pub fn move_node(
        &mut self,
        store: &mut dyn RecordStore,
        id: NodeId,
        new_parent: Option<NodeId>,
    ) -> bool {
        let Some(node) = self.get(id) else {
            warn!(id, "Node not in forest");
            return false;
        };
        let mut record = node.record().clone();
        record.set(PARENT_ID, new_parent);
        self.update_node(store, record)
    }

    /// Re-tag the failure modes below `id` with the sheet they now belong to
    fn sync_sheet_ids(&mut self, store: &mut dyn RecordStore, id: NodeId) -> bool {
        self.ensure_paths();
        let mut ok = true;
        for member in self.subtree_ids(id) {
            for i in 0..self.nodes.len() {
                let node = &self.nodes[i];
                if node.id() != Some(member) || !node.record().contains(SHEET_ID) {
                    continue;
                }
                let Some(root) = node.root() else {
                    continue;
                };
                if node.record().int(SHEET_ID) == Some(root) {
                    continue;
                }
                let mut record = node.record().clone();
                record.set(SHEET_ID, root);
                if store.upsert(&mut record) {
                    self.nodes[i].replace_record(record);
                } else {
                    ok = false;
                }
            }
        }
        ok
    }

    /// Delete a node and every descendant from the store and the forest.
    ///
    /// Rows are removed bottom up and each delete commits on its own; on a
    /// failure the remaining nodes are kept. Deleted ids are detached from
    /// `actions` in one batch.
    pub fn delete_subtree(
        &mut self,
        store: &mut dyn RecordStore,
        id: NodeId,
        actions: Option<&mut ActionList>,
    ) -> bool {
        if !self.contains(id) {
            warn!(id, "Node not in forest");
            return false;
        }
        let members = self.subtree_ids(id);
        let mut deleted = Vec::new();
        let mut ok = true;
        for &member in members.iter().rev() {
            let Some(i) = self.index_of(member) else {
                continue;
            };
            if !store.delete_self(self.nodes[i].record(), "") {
                ok = false;
                break;
            }
            self.nodes.remove(i);
            deleted.push(member);
        }
        self.invalidate();
        if let Some(actions) = actions {
            if !deleted.is_empty() {
                actions.remove_parents(store, &deleted);
            }
        }
        info!(id, removed = deleted.len(), complete = ok, "Deleted subtree");
        ok
    }

    /// Return the first sheet, creating a default one when none exists
    pub fn ensure_sheet(&mut self, store: &mut dyn RecordStore) -> Option<NodeId> {
        if let Some(id) = Self::sheets(store).first().and_then(Record::id) {
            return Some(id);
        }
        let today = chrono::Local::now().format("%Y-%m-%d").to_string();
        let form: FormInput = [
            ("title", "Empty FMEA Sheet"),
            ("sheet_author", "Anonymous"),
            ("sheet_created", today.as_str()),
            ("asset_description", "No asset... "),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), Value::from(v)))
        .collect();
        self.create_node(store, &FUNCTION, &form)
    }
}
