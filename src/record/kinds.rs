//! Record kinds persisted by the reliability tool.
//!
//! Field order is the column order of the backing tables.

use super::{FieldSpec, RecordSchema};

/// Sheet and function rows. A function without a parent is a sheet.
pub static FUNCTION: RecordSchema = RecordSchema {
    kind: "FMEA_Function",
    version: 1,
    fields: &[
        FieldSpec::null("id"),
        FieldSpec::null("parentid"),
        FieldSpec::text("parentclass", "FMEA_Function"),
        FieldSpec::text("title", ""),
        FieldSpec::text("description", ""),
        FieldSpec::text("sheet_author", ""),
        FieldSpec::text("sheet_created", ""),
        FieldSpec::text("asset_name", ""),
        FieldSpec::text("asset_description", ""),
        FieldSpec::text("asset_criticality", ""),
    ],
};

/// Failure modes (causes) hanging below functions or other failure modes
pub static FAILURE_MODE: RecordSchema = RecordSchema {
    kind: "FMEA_Failure_Mode",
    version: 1,
    fields: &[
        FieldSpec::null("id"),
        FieldSpec::null("parentid"),
        FieldSpec::null("parentclass"),
        FieldSpec::int("sheetid", 0),
        FieldSpec::text("title", ""),
        FieldSpec::text("description", ""),
        FieldSpec::text("cause", ""),
        FieldSpec::text("risk_level", ""),
        FieldSpec::text("discipline", ""),
        FieldSpec::text("means_of_identification", ""),
    ],
};

/// Corrective actions attached to any number of tree nodes
pub static ACTION: RecordSchema = RecordSchema {
    kind: "FMEA_Action",
    version: 1,
    fields: &[
        FieldSpec::null("id"),
        FieldSpec::text("parentlist", ""),
        FieldSpec::text("parentclass", "FMEA_Failure_Mode"),
        FieldSpec::text("title", ""),
        FieldSpec::text("description", ""),
        FieldSpec::text("category", ""),
        FieldSpec::text("templating_group", ""),
        FieldSpec::text("templating_equipment", ""),
        FieldSpec::text("frequency_for_A_criticality", ""),
        FieldSpec::text("frequency_for_B_criticality", ""),
        FieldSpec::text("frequency_for_C_criticality", ""),
        FieldSpec::text("frequency_for_D_criticality", ""),
    ],
};

/// Input rules for the edit forms: allowed type, options and display order
pub static DOMAIN_RULE: RecordSchema = RecordSchema {
    kind: "FMEA_Domain",
    version: 1,
    fields: &[
        FieldSpec::null("id"),
        FieldSpec::null("parentid"),
        FieldSpec::null("parentclass"),
        FieldSpec::text("table_name", ""),
        FieldSpec::text("field_name", ""),
        FieldSpec::text("field_type", ""),
        FieldSpec::text("field_option", ""),
        FieldSpec::text("field_option_color", ""),
        FieldSpec::text("field_hint", ""),
        FieldSpec::int("field_o_num", 0),
        FieldSpec::text("title", ""),
    ],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_starts_with_id() {
        for schema in [&FUNCTION, &FAILURE_MODE, &ACTION, &DOMAIN_RULE] {
            assert_eq!(schema.fields[0].name, "id");
        }
    }

    #[test]
    fn test_table_names_are_lowercase_kinds() {
        assert_eq!(FUNCTION.table(), "fmea_function");
        assert_eq!(FAILURE_MODE.table(), "fmea_failure_mode");
        assert_eq!(ACTION.table(), "fmea_action");
        assert_eq!(DOMAIN_RULE.table(), "fmea_domain");
    }

    #[test]
    fn test_hierarchy_flags() {
        assert!(FUNCTION.is_hierarchical());
        assert!(FAILURE_MODE.is_hierarchical());
        assert!(!ACTION.is_hierarchical());
    }
}
