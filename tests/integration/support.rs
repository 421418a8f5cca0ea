#![allow(dead_code)]

use mrtools::record::{FormInput, Record, FAILURE_MODE, FUNCTION, PARENT_ID, SHEET_ID};
use mrtools::store::{ensure_all, Gateway};
use mrtools::types::{NodeId, Value};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A database file in a fresh temporary directory
pub struct TestDb {
    _dir: TempDir,
    pub path: PathBuf,
}

impl TestDb {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mrtools.sqlite3");
        Self { _dir: dir, path }
    }

    /// Open a gateway with every table present
    pub fn open(&self) -> Gateway {
        open_ready(&self.path)
    }
}

pub fn open_ready(path: &Path) -> Gateway {
    let mut gw = Gateway::open(path).unwrap();
    for (schema, status) in ensure_all(&mut gw, false) {
        assert!(status.is_some(), "table {} not ready", schema.table());
    }
    gw
}

pub fn form(pairs: &[(&str, Value)]) -> FormInput {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

pub fn function_row(id: NodeId, parent: Option<NodeId>) -> Record {
    let mut r = Record::with_defaults(&FUNCTION);
    r.set_id(id);
    r.set(PARENT_ID, parent);
    r.set("title", format!("Function {}", id));
    r
}

pub fn failure_row(id: NodeId, parent: NodeId, sheet: NodeId) -> Record {
    let mut r = Record::with_defaults(&FAILURE_MODE);
    r.set_id(id);
    r.set(PARENT_ID, parent);
    r.set(SHEET_ID, sheet);
    r.set("title", format!("Failure mode {}", id));
    r
}
