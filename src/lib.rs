//! MRTools: FMEA reliability tree persistence
//!
//! Maps function, failure mode, action and domain records onto SQLite tables,
//! rebuilds the function / failure mode forest from flat rows, orders it by
//! materialized paths, and keeps many-to-many action links consistent when
//! nodes go away.

pub mod action;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod record;
pub mod schema;
pub mod store;
pub mod tooling;
pub mod tree;
pub mod types;

pub use action::{Action, ActionList, ParentList};
pub use error::{ApiError, StoreError};
pub use record::{FormInput, Record, RecordSchema};
pub use store::{Gateway, RecordStore};
pub use tree::{Forest, Node, PathOrder};
pub use types::{NodeId, Path, Value};
