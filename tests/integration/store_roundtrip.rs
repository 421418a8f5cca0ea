use mrtools::domain::DomainRules;
use mrtools::record::{Record, ACTION, DOMAIN_RULE, FUNCTION};
use mrtools::store::{ensure_all, install, Gateway, RecordStore, TableStatus};
use mrtools::tree::Forest;

use crate::support::{failure_row, function_row, TestDb};

#[test]
fn rows_survive_reopening_the_database() {
    let db = TestDb::new();
    {
        let mut gw = db.open();
        for mut row in [
            failure_row(4, 2, 1),
            function_row(3, Some(1)),
            function_row(2, Some(1)),
            function_row(1, None),
        ] {
            assert!(gw.upsert(&mut row));
        }
        assert!(gw.close());
    }

    let mut gw = Gateway::open(&db.path).unwrap();
    let mut forest = Forest::load(&mut gw, None);
    assert_eq!(forest.len(), 4);
    assert_eq!(forest.ordered_ids(), vec![1, 3, 2, 4]);
    assert_eq!(
        forest.get(4).unwrap().record().text("title"),
        Some("Failure mode 4")
    );
}

#[test]
fn fetch_self_reads_one_row() {
    let db = TestDb::new();
    let mut gw = db.open();
    for mut row in [function_row(1, None), function_row(2, Some(1))] {
        assert!(gw.upsert(&mut row));
    }
    let mut record = Record::empty(&FUNCTION);
    record.set_id(2);
    assert!(gw.fetch_self(&mut record, ""));
    assert_eq!(record.parent_id(), Some(1));
    assert_eq!(record.text("title"), Some("Function 2"));
    assert!(!gw.fetch_self(&mut record, ""));

    let mut missing = Record::empty(&FUNCTION);
    missing.set_id(2);
    assert!(!gw.fetch_self(&mut missing, "parentid IS NULL"));
}

#[test]
fn upsert_replaces_the_whole_row() {
    let db = TestDb::new();
    let mut gw = db.open();
    let mut row = function_row(1, None);
    row.set("description", "first");
    assert!(gw.upsert(&mut row));

    let mut replacement = function_row(1, None);
    replacement.set("title", "Renamed");
    assert!(gw.upsert(&mut replacement));

    let mut read = Record::empty(&FUNCTION);
    read.set_id(1);
    assert!(gw.fetch_self(&mut read, ""));
    assert_eq!(read.text("title"), Some("Renamed"));
    assert_eq!(read.text("description"), Some(""));
    assert_eq!(gw.next_id("fmea_function", ""), Some(2));
}

#[test]
fn install_seeds_domain_rules_on_disk() {
    let db = TestDb::new();
    {
        let mut gw = Gateway::open(&db.path).unwrap();
        assert!(install(&mut gw, true));
    }
    let mut gw = Gateway::open(&db.path).unwrap();
    let rules = DomainRules::load(&mut gw);
    assert!(!rules.is_empty());
    let criticality = rules.options("fmea_function", "asset_criticality");
    assert!(!criticality.is_empty());
    for (_, status) in ensure_all(&mut gw, true) {
        assert_eq!(status, Some(TableStatus::Exists));
    }
}

#[test]
fn drifted_table_is_reported_then_migrated() {
    let db = TestDb::new();
    {
        let conn = rusqlite::Connection::open(&db.path).unwrap();
        conn.execute_batch(
            "CREATE TABLE fmea_action (id INT PRIMARY KEY NOT NULL, parentlist VARCHAR, title VARCHAR);
             INSERT INTO fmea_action (id, parentlist, title) VALUES (5, '1, 2', 'Old action');",
        )
        .unwrap();
    }

    let mut gw = Gateway::open(&db.path).unwrap();
    match gw.ensure_table(&Record::empty(&ACTION), &[]) {
        Some(TableStatus::Conflict(diff)) => {
            assert!(diff.is_additive());
            assert!(diff.missing.iter().any(|c| c.name == "category"));
            assert!(diff.unexpected.is_empty());
        }
        other => panic!("expected a conflict, got {:?}", other),
    }

    assert!(gw.migrate(&Record::empty(&ACTION)));
    assert_eq!(
        gw.ensure_table(&Record::empty(&ACTION), &[]),
        Some(TableStatus::Exists)
    );

    let mut action = Record::empty(&ACTION);
    action.set_id(5);
    assert!(gw.fetch_self(&mut action, ""));
    assert_eq!(action.text("title"), Some("Old action"));
    assert_eq!(action.text("parentlist"), Some("1, 2"));
}

#[test]
fn migration_refuses_to_drop_columns() {
    let db = TestDb::new();
    {
        let conn = rusqlite::Connection::open(&db.path).unwrap();
        conn.execute_batch(
            "CREATE TABLE fmea_domain (id INT PRIMARY KEY NOT NULL, legacy_rule VARCHAR);",
        )
        .unwrap();
    }
    let mut gw = Gateway::open(&db.path).unwrap();
    assert!(!gw.migrate(&Record::empty(&DOMAIN_RULE)));
    let columns = gw.existing_columns("fmea_domain").unwrap();
    assert_eq!(columns.len(), 2);
    assert!(matches!(
        gw.ensure_table(&Record::empty(&DOMAIN_RULE), &[]),
        Some(TableStatus::Conflict(_))
    ));
}
