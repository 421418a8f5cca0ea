//! Many-to-Many Association
//!
//! Actions are attached to any number of tree nodes. The attachment is a set
//! of node ids kept in the action's own `parentlist` column as `", "`-joined
//! text. An action whose set becomes empty is deleted from the store.

use crate::record::{FormInput, Record, ACTION, PARENT_LIST};
use crate::store::RecordStore;
use crate::tree::{Forest, Node};
use crate::types::NodeId;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use tracing::{debug, info, warn};

/// Set of node ids an action is attached to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParentList(BTreeSet<NodeId>);

impl ParentList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a delimited id list. Blank fragments are skipped silently,
    /// anything else that is not an integer is reported and skipped.
    pub fn parse(text: &str) -> Self {
        let mut ids = BTreeSet::new();
        for fragment in text.split(',').map(str::trim) {
            if fragment.is_empty() {
                continue;
            }
            match fragment.parse::<NodeId>() {
                Ok(id) => {
                    ids.insert(id);
                }
                Err(_) => warn!(fragment, list = text, "Skipping non-integer parent id"),
            }
        }
        Self(ids)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.0.contains(&id)
    }

    /// Returns `false` if `id` was already present
    pub fn insert(&mut self, id: NodeId) -> bool {
        self.0.insert(id)
    }

    /// Returns `false` if `id` was not present
    pub fn remove(&mut self, id: NodeId) -> bool {
        self.0.remove(&id)
    }

    /// Remove every id in `ids`; returns whether anything changed
    pub fn remove_all(&mut self, ids: &HashSet<NodeId>) -> bool {
        let before = self.0.len();
        self.0.retain(|id| !ids.contains(id));
        self.0.len() != before
    }

    pub fn intersects(&self, other: &ParentList) -> bool {
        !self.0.is_disjoint(&other.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.0.iter().copied()
    }
}

impl fmt::Display for ParentList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self.0.iter().map(|id| id.to_string()).collect();
        write!(f, "{}", ids.join(", "))
    }
}

impl FromIterator<NodeId> for ParentList {
    fn from_iter<I: IntoIterator<Item = NodeId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// An action record together with its decoded parent set
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    record: Record,
    parents: ParentList,
}

impl Default for Action {
    fn default() -> Self {
        Self::new()
    }
}

impl Action {
    pub fn new() -> Self {
        Self::from_record(Record::with_defaults(&ACTION))
    }

    pub fn from_record(record: Record) -> Self {
        let parents = record
            .text(PARENT_LIST)
            .map(ParentList::parse)
            .unwrap_or_default();
        Self { record, parents }
    }

    pub fn from_form(form: &FormInput) -> Self {
        Self::from_record(Record::from_form(&ACTION, form))
    }

    pub fn id(&self) -> Option<NodeId> {
        self.record.id()
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn into_record(self) -> Record {
        self.record
    }

    pub fn parents(&self) -> &ParentList {
        &self.parents
    }

    fn sync(&mut self) {
        self.record.set(PARENT_LIST, self.parents.to_string());
    }

    /// Attach to a node in memory; saving is up to the caller
    pub fn add_parent(&mut self, id: NodeId) -> bool {
        let added = self.parents.insert(id);
        if added {
            self.sync();
        }
        added
    }

    /// Detach from a node in memory; saving is up to the caller
    pub fn remove_parent(&mut self, id: NodeId) -> bool {
        let removed = self.parents.remove(id);
        if removed {
            self.sync();
        }
        removed
    }

    fn remove_parents(&mut self, ids: &HashSet<NodeId>) -> bool {
        let changed = self.parents.remove_all(ids);
        if changed {
            self.sync();
        }
        changed
    }

    /// Forest nodes this action is attached to, optionally of one kind only
    pub fn parents_of<'a>(&self, forest: &'a Forest, parent_class: Option<&str>) -> Vec<&'a Node> {
        forest
            .iter()
            .filter(|n| n.id().is_some_and(|id| self.parents.contains(id)))
            .filter(|n| parent_class.map_or(true, |c| n.kind() == c))
            .collect()
    }
}

/// The actions of a session
#[derive(Debug, Clone, Default)]
pub struct ActionList {
    actions: Vec<Action>,
}

impl ActionList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every action row
    pub fn load(store: &mut dyn RecordStore) -> Self {
        let mut list = Self::new();
        loop {
            let mut record = Record::empty(&ACTION);
            if !store.fetch_next(&mut record, "") {
                break;
            }
            list.attach(Action::from_record(record));
        }
        debug!(count = list.len(), "Loaded actions");
        list
    }

    /// Add an action, replacing the one with the same id
    pub fn attach(&mut self, action: Action) {
        match action.id().and_then(|id| self.position(id)) {
            Some(i) => self.actions[i] = action,
            None => self.actions.push(action),
        }
    }

    fn position(&self, id: NodeId) -> Option<usize> {
        self.actions.iter().position(|a| a.id() == Some(id))
    }

    pub fn get(&self, id: NodeId) -> Option<&Action> {
        self.position(id).map(|i| &self.actions[i])
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter()
    }

    /// Actions attached to at least one of `ids`
    pub fn for_nodes(&self, ids: &[NodeId]) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|a| ids.iter().any(|&id| a.parents.contains(id)))
            .collect()
    }

    /// Other actions sharing at least one parent with `id`
    pub fn peers_of(&self, id: NodeId) -> Vec<&Action> {
        let Some(action) = self.get(id) else {
            return Vec::new();
        };
        self.actions
            .iter()
            .filter(|a| a.id() != Some(id) && a.parents.intersects(&action.parents))
            .collect()
    }

    /// Persist an action and keep it in the list. Returns its id.
    ///
    /// An action with no parents is never stored: if it already has a row,
    /// that row is deleted instead.
    pub fn save(&mut self, store: &mut dyn RecordStore, mut action: Action) -> Option<NodeId> {
        if action.parents.is_empty() {
            warn!(id = ?action.id(), "Action has no parents; not saving");
            if let Some(id) = action.id() {
                self.delete(store, id);
            }
            return None;
        }
        action.sync();
        if !store.upsert(&mut action.record) {
            return None;
        }
        let id = action.id();
        self.attach(action);
        id
    }

    /// Attach an action to a node and save it
    pub fn attach_to(&mut self, store: &mut dyn RecordStore, action_id: NodeId, node_id: NodeId) -> bool {
        let Some(i) = self.position(action_id) else {
            warn!(action_id, "Action not loaded");
            return false;
        };
        if !self.actions[i].add_parent(node_id) {
            return true;
        }
        let action = self.actions[i].clone();
        self.save(store, action).is_some()
    }

    /// Detach an action from a node; an action left without parents is deleted
    pub fn detach_from(&mut self, store: &mut dyn RecordStore, action_id: NodeId, node_id: NodeId) -> bool {
        let Some(i) = self.position(action_id) else {
            warn!(action_id, "Action not loaded");
            return false;
        };
        if !self.actions[i].remove_parent(node_id) {
            return true;
        }
        if self.actions[i].parents.is_empty() {
            return self.delete(store, action_id);
        }
        let action = self.actions[i].clone();
        self.save(store, action).is_some()
    }

    /// Detach `id` from every action
    pub fn remove_parent(&mut self, store: &mut dyn RecordStore, id: NodeId) -> usize {
        self.remove_parents(store, &[id])
    }

    /// Detach every id in `ids` from every action in one pass. Actions left
    /// without parents are deleted. Returns the number of actions touched.
    pub fn remove_parents(&mut self, store: &mut dyn RecordStore, ids: &[NodeId]) -> usize {
        let ids: HashSet<NodeId> = ids.iter().copied().collect();
        let mut touched = 0;
        let mut emptied = Vec::new();
        for action in &mut self.actions {
            if !action.remove_parents(&ids) {
                continue;
            }
            touched += 1;
            if action.parents.is_empty() {
                emptied.push(action.id());
            } else if !store.upsert(&mut action.record) {
                warn!(id = ?action.id(), "Could not save detached action");
            }
        }
        for id in emptied.into_iter().flatten() {
            self.delete(store, id);
        }
        info!(nodes = ids.len(), touched, "Detached nodes from actions");
        touched
    }

    /// Delete an action row outright
    pub fn delete(&mut self, store: &mut dyn RecordStore, id: NodeId) -> bool {
        let record = match self.position(id) {
            Some(i) => self.actions.remove(i).into_record(),
            None => {
                let mut record = Record::empty(&ACTION);
                record.set_id(id);
                record
            }
        };
        let deleted = store.delete_self(&record, "");
        if deleted {
            info!(id, "Deleted action");
        }
        deleted
    }
}
