use mrtools::action::{Action, ActionList, ParentList};
use mrtools::record::{FormInput, Record, ACTION, FAILURE_MODE, FUNCTION, PARENT_LIST};
use mrtools::store::RecordStore;
use mrtools::tree::Forest;
use mrtools::types::{NodeId, Value};

use crate::support::{form, TestDb};

fn action_with(parents: &[NodeId], title: &str) -> Action {
    let mut action = Action::new();
    for &id in parents {
        action.add_parent(id);
    }
    let mut record = action.into_record();
    record.set("title", title);
    Action::from_record(record)
}

fn stored_parent_list(gw: &mut dyn RecordStore, id: NodeId) -> Option<String> {
    let mut record = Record::empty(&ACTION);
    record.set_id(id);
    if !gw.fetch_self(&mut record, "") {
        return None;
    }
    // drain the cursor so the next read starts fresh
    let mut rest = Record::empty(&ACTION);
    rest.set_id(id);
    gw.fetch_self(&mut rest, "");
    record.text(PARENT_LIST).map(str::to_string)
}

#[test]
fn removing_every_parent_deletes_the_action() {
    let db = TestDb::new();
    let mut gw = db.open();
    let mut actions = ActionList::new();
    let id = actions
        .save(&mut gw, action_with(&[2, 3], "Replace seal"))
        .unwrap();
    assert_eq!(stored_parent_list(&mut gw, id).as_deref(), Some("2, 3"));

    assert_eq!(actions.remove_parent(&mut gw, 2), 1);
    assert_eq!(stored_parent_list(&mut gw, id).as_deref(), Some("3"));
    assert_eq!(actions.len(), 1);

    assert_eq!(actions.remove_parent(&mut gw, 3), 1);
    assert!(actions.is_empty());
    assert_eq!(stored_parent_list(&mut gw, id), None);
    assert!(ActionList::load(&mut gw).is_empty());
}

#[test]
fn legacy_parent_lists_without_spaces_parse() {
    let db = TestDb::new();
    let mut gw = db.open();
    let mut record = Record::with_defaults(&ACTION);
    record.set(PARENT_LIST, "2,3");
    assert!(gw.upsert(&mut record));
    let id = record.id().unwrap();

    let mut actions = ActionList::load(&mut gw);
    let expected: ParentList = [2, 3].into_iter().collect();
    assert_eq!(actions.get(id).unwrap().parents(), &expected);
    assert_eq!(actions.remove_parents(&mut gw, &[2, 3]), 1);
    assert!(ActionList::load(&mut gw).is_empty());
}

#[test]
fn deleting_a_subtree_detaches_its_actions() {
    let db = TestDb::new();
    let mut gw = db.open();
    let mut forest = Forest::new();
    let root = forest.create_node(&mut gw, &FUNCTION, &FormInput::new()).unwrap();
    let branch = forest
        .create_node(&mut gw, &FUNCTION, &form(&[("parentid", Value::from(root))]))
        .unwrap();
    let leaf = forest
        .create_node(&mut gw, &FAILURE_MODE, &form(&[("parentid", Value::from(branch))]))
        .unwrap();
    let other = forest
        .create_node(&mut gw, &FAILURE_MODE, &form(&[("parentid", Value::from(root))]))
        .unwrap();

    let mut actions = ActionList::new();
    let shared = actions
        .save(&mut gw, action_with(&[leaf, other], "Inspect"))
        .unwrap();
    let only_leaf = actions
        .save(&mut gw, action_with(&[leaf], "Lubricate"))
        .unwrap();
    assert_eq!(actions.peers_of(shared).len(), 1);

    assert!(forest.delete_subtree(&mut gw, branch, Some(&mut actions)));
    assert_eq!(forest.ordered_ids(), vec![root, other]);

    let reloaded = ActionList::load(&mut gw);
    assert_eq!(reloaded.len(), 1);
    assert!(reloaded.get(only_leaf).is_none());
    let remaining: Vec<NodeId> = reloaded.get(shared).unwrap().parents().iter().collect();
    assert_eq!(remaining, vec![other]);

    let mut stored = Forest::load(&mut gw, None);
    assert_eq!(stored.ordered_ids(), vec![root, other]);
}

#[test]
fn attach_and_detach_persist() {
    let db = TestDb::new();
    let mut gw = db.open();
    let mut actions = ActionList::new();
    let id = actions.save(&mut gw, action_with(&[4], "Clean")).unwrap();

    assert!(actions.attach_to(&mut gw, id, 9));
    let mut reloaded = ActionList::load(&mut gw);
    assert_eq!(reloaded.for_nodes(&[9]).len(), 1);
    assert_eq!(reloaded.get(id).unwrap().parents().to_string(), "4, 9");

    assert!(reloaded.detach_from(&mut gw, id, 4));
    assert!(reloaded.detach_from(&mut gw, id, 9));
    assert!(reloaded.get(id).is_none());
    assert!(ActionList::load(&mut gw).is_empty());
}

#[test]
fn parents_of_resolves_forest_nodes() {
    let db = TestDb::new();
    let mut gw = db.open();
    let mut forest = Forest::new();
    let root = forest.create_node(&mut gw, &FUNCTION, &FormInput::new()).unwrap();
    let fm = forest
        .create_node(&mut gw, &FAILURE_MODE, &form(&[("parentid", Value::from(root))]))
        .unwrap();
    let action = action_with(&[root, fm, 77], "Check");

    assert_eq!(action.parents_of(&forest, None).len(), 2);
    let failure_modes = action.parents_of(&forest, Some("FMEA_Failure_Mode"));
    assert_eq!(failure_modes.len(), 1);
    assert_eq!(failure_modes[0].id(), Some(fm));
}
