//! Domain Rules
//!
//! Lookup rows telling the edit forms, per table and field, which input type
//! to render, which options to offer and in which order. The core only loads
//! and queries them.

use crate::record::{Record, DOMAIN_RULE};
use crate::store::RecordStore;
use crate::types::{NodeId, Value};
use serde::Serialize;

/// One domain rule row
#[derive(Debug, Clone, PartialEq)]
pub struct DomainRule {
    record: Record,
}

impl DomainRule {
    pub fn from_record(record: Record) -> Self {
        Self { record }
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn id(&self) -> Option<NodeId> {
        self.record.id()
    }

    pub fn table_name(&self) -> &str {
        self.record.text("table_name").unwrap_or_default()
    }

    pub fn field_name(&self) -> &str {
        self.record.text("field_name").unwrap_or_default()
    }

    pub fn field_type(&self) -> &str {
        self.record.text("field_type").unwrap_or_default()
    }

    pub fn option(&self) -> Option<&str> {
        self.record.text("field_option").filter(|s| !s.is_empty())
    }

    pub fn option_color(&self) -> Option<&str> {
        self.record.text("field_option_color").filter(|s| !s.is_empty())
    }

    pub fn hint(&self) -> Option<&str> {
        self.record.text("field_hint").filter(|s| !s.is_empty())
    }

    /// Display order; unparseable values sort first
    pub fn order(&self) -> i64 {
        self.record.int("field_o_num").unwrap_or(0)
    }

    pub fn title(&self) -> &str {
        self.record.text("title").unwrap_or_default()
    }
}

/// An option offered for an enumerated field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldOption {
    pub value: String,
    pub color: Option<String>,
    pub title: String,
}

/// All domain rules, ordered by display order
#[derive(Debug, Clone, Default)]
pub struct DomainRules {
    rules: Vec<DomainRule>,
}

impl DomainRules {
    /// Read every rule row. A store failure yields an empty rule set.
    pub fn load(store: &mut dyn RecordStore) -> Self {
        let mut rules = Vec::new();
        loop {
            let mut record = Record::empty(&DOMAIN_RULE);
            if !store.fetch_next(&mut record, "") {
                break;
            }
            rules.push(DomainRule::from_record(record));
        }
        Self::from_rules(rules)
    }

    pub fn from_rules(mut rules: Vec<DomainRule>) -> Self {
        // stable: equal orders keep ascending id order from the store
        rules.sort_by_key(DomainRule::order);
        tracing::debug!(count = rules.len(), "Loaded domain rules");
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DomainRule> {
        self.rules.iter()
    }

    pub fn for_table<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a DomainRule> + 'a {
        self.rules.iter().filter(move |r| r.table_name() == table)
    }

    /// Options declared for `table.field`, in display order
    pub fn options(&self, table: &str, field: &str) -> Vec<FieldOption> {
        self.for_table(table)
            .filter(|r| r.field_name() == field)
            .filter_map(|r| {
                r.option().map(|value| FieldOption {
                    value: value.to_string(),
                    color: r.option_color().map(str::to_string),
                    title: r.title().to_string(),
                })
            })
            .collect()
    }

    /// Input type of the first rule for `table.field`
    pub fn field_type(&self, table: &str, field: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|r| r.table_name() == table && r.field_name() == field)
            .map(DomainRule::field_type)
    }
}

struct Seed {
    id: NodeId,
    table: &'static str,
    field: &'static str,
    ty: &'static str,
    option: Option<&'static str>,
    color: Option<&'static str>,
    hint: &'static str,
    order: i64,
    title: &'static str,
    owned: bool,
}

const fn seed(
    id: NodeId,
    table: &'static str,
    field: &'static str,
    ty: &'static str,
    hint: &'static str,
    order: i64,
    title: &'static str,
) -> Seed {
    Seed {
        id,
        table,
        field,
        ty,
        option: None,
        color: None,
        hint,
        order,
        title,
        owned: true,
    }
}

const fn with_option(mut s: Seed, option: &'static str, color: Option<&'static str>) -> Seed {
    s.option = Some(option);
    s.color = color;
    s
}

const fn sheet_level(mut s: Seed) -> Seed {
    s.owned = false;
    s
}

const FUNCTION_TABLE: &str = "fmea_function";
const FAILURE_TABLE: &str = "fmea_failure_mode";
const ACTION_TABLE: &str = "fmea_action";

const FIXED_SEEDS: &[Seed] = &[
    sheet_level(seed(7, FUNCTION_TABLE, "id", "readonly", "", 0, "Sheet id")),
    sheet_level(seed(9, FUNCTION_TABLE, "parentclass", "hidden", "", 0, "Sheet parent class should be None")),
    sheet_level(seed(14, FUNCTION_TABLE, "title", "text", "New Sheet...", 1, "Sheet title")),
    sheet_level(seed(82, FUNCTION_TABLE, "description", "longdesc", "Description of the sheet", 2, "Sheet description")),
    sheet_level(seed(12, FUNCTION_TABLE, "sheet_author", "text", "Created by...", 3, "Author")),
    sheet_level(seed(13, FUNCTION_TABLE, "sheet_created", "date", "", 4, "Created date")),
    sheet_level(seed(6, FUNCTION_TABLE, "asset_name", "text", "Enter asset name...", 5, "Asset name")),
    sheet_level(with_option(seed(1, FUNCTION_TABLE, "asset_criticality", "enum", "Enter criticality score...", 6, "Criticality score A - critical"), "A", Some("#ff0115"))),
    sheet_level(with_option(seed(2, FUNCTION_TABLE, "asset_criticality", "enum", "Enter criticality score...", 6, "Criticality score B - strategic"), "B", Some("#dea105"))),
    sheet_level(with_option(seed(3, FUNCTION_TABLE, "asset_criticality", "enum", "Enter criticality score...", 6, "Criticality score C - specific"), "C", Some("#cccc0c"))),
    sheet_level(with_option(seed(4, FUNCTION_TABLE, "asset_criticality", "enum", "Enter criticality score...", 6, "Criticality score D - regular"), "D", Some("#20ff35"))),
    sheet_level(seed(5, FUNCTION_TABLE, "asset_description", "longdesc", "Enter asset description...", 7, "Asset long description")),
    seed(8, FUNCTION_TABLE, "id", "readonly", "", 0, "Function id"),
    seed(10, FUNCTION_TABLE, "parentclass", "hidden", "", 0, "Function parent class should be Sheet"),
    seed(11, FUNCTION_TABLE, "parentid", "readonly", "", 1, "Function parent id is Sheet"),
    seed(15, FUNCTION_TABLE, "title", "text", "New Function...", 2, "Function title"),
    seed(83, FUNCTION_TABLE, "description", "longdesc", "Description of the function", 3, "Function description"),
    seed(24, FAILURE_TABLE, "id", "readonly", "", 0, "Failure cause id"),
    seed(26, FAILURE_TABLE, "parentclass", "hidden", "", 0, "Failure parent class"),
    seed(27, FAILURE_TABLE, "parentid", "readonly", "", 1, "Failure cause parent id"),
    seed(28, FAILURE_TABLE, "sheetid", "hidden", "", 1, "Failure cause"),
    seed(29, FAILURE_TABLE, "title", "text", "New Failure Mode...", 2, "Failure Cause Title"),
    seed(17, FAILURE_TABLE, "description", "longdesc", "Description of the failure mode", 3, "Failure Desc"),
    with_option(seed(84, FAILURE_TABLE, "risk_level", "text", "Define risk level...", 5, "Failure risk level"), "1", None),
    with_option(seed(85, FAILURE_TABLE, "risk_level", "text", "Define risk level...", 5, "Failure risk level"), "2", None),
    with_option(seed(86, FAILURE_TABLE, "risk_level", "text", "Define risk level...", 5, "Failure risk level"), "3", None),
    with_option(seed(87, FAILURE_TABLE, "risk_level", "text", "Define risk level...", 5, "Failure risk level"), "4", None),
    with_option(seed(88, FAILURE_TABLE, "risk_level", "text", "Define risk level...", 5, "Failure risk level"), "6", None),
    with_option(seed(89, FAILURE_TABLE, "risk_level", "text", "Define risk level...", 5, "Failure risk level"), "8", None),
    with_option(seed(90, FAILURE_TABLE, "risk_level", "text", "Define risk level...", 5, "Failure risk level"), "9", None),
    with_option(seed(91, FAILURE_TABLE, "risk_level", "text", "Define risk level...", 5, "Failure risk level"), "12", None),
    with_option(seed(92, FAILURE_TABLE, "risk_level", "text", "Define risk level...", 5, "Failure risk level"), "16", None),
    with_option(seed(18, FAILURE_TABLE, "discipline", "text", "Applies to discipline...", 6, "Failure discipline"), "Others", None),
    with_option(seed(19, FAILURE_TABLE, "discipline", "text", "Applies to discipline...", 6, "Failure discipline - rotating"), "Rotating", None),
    with_option(seed(20, FAILURE_TABLE, "discipline", "text", "Applies to discipline...", 6, "Failure discipline - fixed"), "Fixed", None),
    with_option(seed(21, FAILURE_TABLE, "discipline", "text", "Applies to discipline...", 6, "Failure discipline - instrumentation"), "Instrumentation", None),
    with_option(seed(22, FAILURE_TABLE, "discipline", "text", "Applies to discipline...", 6, "Failure discipline - electrical"), "Electrical", None),
    with_option(seed(23, FAILURE_TABLE, "discipline", "text", "Applies to discipline...", 6, "Failure discipline - process"), "Process", None),
    seed(25, FAILURE_TABLE, "means_of_identification", "text", "Identified by...", 6, "Please describe means of identification..."),
    seed(75, ACTION_TABLE, "id", "readonly", "", 0, "Action id"),
    seed(76, ACTION_TABLE, "parentclass", "hidden", "", 0, "Action is attached to Failure Mode"),
    seed(77, ACTION_TABLE, "parentlist", "hidden", "", 0, "Action parents as a text list"),
    seed(80, ACTION_TABLE, "title", "text", "New Action...", 1, "Action Title"),
    seed(81, ACTION_TABLE, "description", "longdesc", "Description of the action", 2, "Action description"),
    with_option(seed(30, ACTION_TABLE, "category", "enum", "Select category", 3, "Action Category - advanced monitoring"), "Advanced monitoring", Some("#836953")),
    with_option(seed(31, ACTION_TABLE, "category", "enum", "Select category", 3, "Action Category - operation alarms"), "Operation alarms", Some("#99c5c4")),
    with_option(seed(32, ACTION_TABLE, "category", "enum", "Select category", 3, "Action Category - design upgrade"), "Design Upgrade", Some("#b39eb5")),
    with_option(seed(33, ACTION_TABLE, "category", "enum", "Select category", 3, "Action Category - asset strategies"), "Asset Strategies", Some("#befd73")),
    with_option(seed(34, ACTION_TABLE, "category", "enum", "Select category", 3, "Action Category"), "Other Actions", Some("#ff9899")),
    seed(78, ACTION_TABLE, "templating_equipment", "text", "Action applies to equipment type...", 8, "Action Templates - equipment"),
    seed(79, ACTION_TABLE, "templating_group", "text", "Action grouping...", 9, "Action Templates - group"),
];

/// (criticality letter, hint, display order) of the frequency fields
const FREQUENCY_FIELDS: [(&str, &str, i64); 4] = [
    ("A", "Frequency for critical...", 4),
    ("B", "Frequency for high...", 5),
    ("C", "Frequency for medium...", 6),
    ("D", "Frequency for low...", 7),
];

const FREQUENCIES: [&str; 10] = [
    "Not applicable",
    "On demand",
    "Every shift",
    "Every turnaround",
    "Every week",
    "Twice a month",
    "Every month",
    "Every quarter",
    "Every semester",
    "Every year",
];

const FIRST_FREQUENCY_ID: NodeId = 35;

fn seed_record(s: &Seed) -> Record {
    let mut r = Record::with_defaults(&DOMAIN_RULE);
    r.set_id(s.id);
    r.set("table_name", s.table);
    r.set("field_name", s.field);
    r.set("field_type", s.ty);
    r.set("field_option", s.option.map(Value::from).unwrap_or_default());
    r.set("field_option_color", s.color.map(Value::from).unwrap_or_default());
    r.set(
        "field_hint",
        if s.hint.is_empty() { Value::Null } else { Value::from(s.hint) },
    );
    r.set("field_o_num", s.order);
    r.set("title", s.title);
    if s.owned {
        r.set("parentclass", s.table);
    }
    r
}

/// The default rule set written by a fresh install
pub fn default_rules() -> Vec<Record> {
    let mut rules: Vec<Record> = FIXED_SEEDS.iter().map(seed_record).collect();
    let mut id = FIRST_FREQUENCY_ID;
    for (letter, hint, order) in FREQUENCY_FIELDS {
        let field = format!("frequency_for_{}_criticality", letter);
        for frequency in FREQUENCIES {
            let mut r = Record::with_defaults(&DOMAIN_RULE);
            r.set_id(id);
            r.set("table_name", ACTION_TABLE);
            r.set("field_name", field.as_str());
            r.set("field_type", "text");
            r.set("field_option", frequency);
            r.set("field_option_color", Value::Null);
            r.set("field_hint", hint);
            r.set("field_o_num", order);
            r.set("title", format!("Frequency set {}", id));
            r.set("parentclass", ACTION_TABLE);
            rules.push(r);
            id += 1;
        }
    }
    rules
}
