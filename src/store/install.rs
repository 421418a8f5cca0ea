//! Table installation

use super::{Gateway, TableStatus};
use crate::domain::default_rules;
use crate::record::{Record, RecordSchema, ACTION, DOMAIN_RULE, FAILURE_MODE, FUNCTION};
use tracing::{info, warn};

/// Every persisted record kind, in installation order
pub static ALL_KINDS: [&RecordSchema; 4] = [&FUNCTION, &FAILURE_MODE, &ACTION, &DOMAIN_RULE];

/// Drop and recreate every table. Destroys all rows.
///
/// The domain table is seeded with the default rule set when `seed_domain`
/// is set. Returns `false` if any table could not be created.
pub fn install(gateway: &mut Gateway, seed_domain: bool) -> bool {
    let mut ok = true;
    for schema in ALL_KINDS {
        let seed = if std::ptr::eq(schema, &DOMAIN_RULE) && seed_domain {
            default_rules()
        } else {
            Vec::new()
        };
        ok &= gateway.recreate_table(&Record::empty(schema), &seed);
    }
    if ok {
        info!(seed_domain, "Installed all tables");
    } else {
        warn!("Installation incomplete");
    }
    ok
}

/// Non-destructive counterpart of [`install`]: create missing tables and
/// report the state of every table.
pub fn ensure_all(
    gateway: &mut Gateway,
    seed_domain: bool,
) -> Vec<(&'static RecordSchema, Option<TableStatus>)> {
    ALL_KINDS
        .into_iter()
        .map(|schema| {
            let seed = if std::ptr::eq(schema, &DOMAIN_RULE) && seed_domain {
                default_rules()
            } else {
                Vec::new()
            };
            (schema, gateway.ensure_table(&Record::empty(schema), &seed))
        })
        .collect()
}
