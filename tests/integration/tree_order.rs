use mrtools::record::{FormInput, FAILURE_MODE, FUNCTION, SHEET_ID};
use mrtools::store::RecordStore;
use mrtools::tree::{Forest, PathOrder};
use mrtools::types::Value;
use std::collections::HashMap;

use crate::support::{failure_row, form, function_row, TestDb};

#[test]
fn created_nodes_reload_in_branch_order() {
    let db = TestDb::new();
    let mut gw = db.open();
    let mut forest = Forest::new();
    let root = forest.create_node(&mut gw, &FUNCTION, &FormInput::new()).unwrap();
    let a = forest
        .create_node(&mut gw, &FUNCTION, &form(&[("parentid", Value::from(root))]))
        .unwrap();
    let b = forest
        .create_node(&mut gw, &FUNCTION, &form(&[("parentid", Value::from(root))]))
        .unwrap();
    let c = forest
        .create_node(&mut gw, &FAILURE_MODE, &form(&[("parentid", Value::from(a))]))
        .unwrap();
    assert_eq!((root, a, b, c), (1, 2, 3, 4));
    drop(gw);

    let mut gw = db.open();
    let mut reloaded = Forest::load(&mut gw, None);
    assert_eq!(reloaded.ordered_ids(), vec![1, 3, 2, 4]);
    assert_eq!(reloaded.ancestors(4), Some(vec![1, 2]));
    assert_eq!(reloaded.compare(3, 2), Some(PathOrder::Before));
    assert_eq!(reloaded.compare(1, 4), Some(PathOrder::AncestorOf));
    assert_eq!(reloaded.compare(4, 2), Some(PathOrder::After));
    assert_eq!(reloaded.get(4).unwrap().record().int(SHEET_ID), Some(1));
}

#[test]
fn orphan_rows_stay_in_store_but_out_of_view() {
    let db = TestDb::new();
    let mut gw = db.open();
    for mut row in [
        function_row(1, None),
        function_row(2, Some(1)),
        failure_row(3, 2, 1),
        failure_row(10, 99, 1),
        failure_row(11, 10, 1),
    ] {
        assert!(gw.upsert(&mut row));
    }

    let mut forest = Forest::load(&mut gw, None);
    assert_eq!(forest.ordered_ids(), vec![1, 2, 3]);
    let mut unplaced: Vec<_> = forest.unplaced().iter().filter_map(|n| n.id()).collect();
    unplaced.sort();
    assert_eq!(unplaced, vec![10, 11]);
    assert_eq!(gw.next_id("fmea_failure_mode", ""), Some(12));
}

#[test]
fn scoped_load_reads_one_sheet() {
    let db = TestDb::new();
    let mut gw = db.open();
    for mut row in [
        function_row(1, None),
        function_row(2, Some(1)),
        failure_row(3, 2, 1),
        function_row(4, None),
        function_row(5, Some(4)),
        failure_row(6, 5, 4),
        failure_row(7, 6, 4),
    ] {
        assert!(gw.upsert(&mut row));
    }

    let mut first = Forest::load(&mut gw, Some(1));
    assert_eq!(first.ordered_ids(), vec![1, 2, 3]);
    let mut second = Forest::load(&mut gw, Some(4));
    assert_eq!(second.ordered_ids(), vec![4, 5, 6, 7]);
    let mut all = Forest::load(&mut gw, None);
    assert_eq!(all.ordered_ids(), vec![4, 5, 6, 7, 1, 2, 3]);

    let sheets: Vec<_> = Forest::sheets(&mut gw).iter().filter_map(|r| r.id()).collect();
    assert_eq!(sheets, vec![1, 4]);
}

#[test]
fn refresh_is_idempotent() {
    let db = TestDb::new();
    let mut gw = db.open();
    for mut row in [
        function_row(1, None),
        function_row(2, Some(1)),
        function_row(5, Some(1)),
        failure_row(3, 2, 1),
        failure_row(4, 2, 1),
    ] {
        assert!(gw.upsert(&mut row));
    }
    let mut forest = Forest::load(&mut gw, None);
    let first = forest.ordered_ids();
    let paths: HashMap<_, _> = first.iter().map(|&id| (id, forest.path_of(id))).collect();

    forest.refresh(&mut gw, None);
    forest.reconstruct();
    assert_eq!(forest.ordered_ids(), first);
    for (id, path) in paths {
        assert_eq!(forest.path_of(id), path);
    }
}

#[test]
fn sort_keys_follow_preorder_with_ascending_siblings() {
    let db = TestDb::new();
    let mut gw = db.open();
    for mut row in [
        function_row(1, None),
        function_row(2, Some(1)),
        function_row(3, Some(1)),
        failure_row(12, 2, 1),
    ] {
        assert!(gw.upsert(&mut row));
    }
    let mut forest = Forest::load(&mut gw, None);
    let mut keyed: Vec<(u128, i64)> = forest
        .sort_keys()
        .into_iter()
        .filter_map(|(id, key)| key.map(|k| (k, id)))
        .collect();
    keyed.sort();
    let order: Vec<i64> = keyed.into_iter().map(|(_, id)| id).collect();
    assert_eq!(order, vec![1, 2, 12, 3]);
}

#[test]
fn moving_a_branch_to_another_sheet_persists() {
    let db = TestDb::new();
    let mut gw = db.open();
    let mut forest = Forest::new();
    let s1 = forest.ensure_sheet(&mut gw).unwrap();
    let s2 = forest
        .create_node(&mut gw, &FUNCTION, &form(&[("title", Value::from("Second"))]))
        .unwrap();
    let f = forest
        .create_node(&mut gw, &FUNCTION, &form(&[("parentid", Value::from(s1))]))
        .unwrap();
    let fm = forest
        .create_node(&mut gw, &FAILURE_MODE, &form(&[("parentid", Value::from(f))]))
        .unwrap();
    assert!(forest.move_node(&mut gw, f, Some(s2)));

    let mut reloaded = Forest::load(&mut gw, Some(s2));
    assert_eq!(reloaded.ordered_ids(), vec![s2, f, fm]);
    let mut old = Forest::load(&mut gw, Some(s1));
    assert_eq!(old.ordered_ids(), vec![s1]);
}
