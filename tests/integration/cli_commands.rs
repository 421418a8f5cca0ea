use mrtools::config::MrConfig;
use mrtools::tooling::cli::{ActionCommands, CliContext, Commands, NodeKind};

use crate::support::TestDb;

fn context(db: &TestDb) -> CliContext {
    let config = MrConfig {
        database: db.path.clone(),
        ..Default::default()
    };
    CliContext::from_config(config).unwrap()
}

fn tree_json(cli: &mut CliContext) -> serde_json::Value {
    let output = cli
        .execute(&Commands::Tree {
            sheet: None,
            keys: true,
            format: "json".to_string(),
        })
        .unwrap();
    serde_json::from_str(&output).unwrap()
}

fn node_ids(tree: &serde_json::Value) -> Vec<i64> {
    tree["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["id"].as_i64().unwrap())
        .collect()
}

fn add(cli: &mut CliContext, parent: i64, kind: NodeKind, title: &str) {
    cli.execute(&Commands::Add {
        parent,
        kind,
        title: title.to_string(),
        description: None,
    })
    .unwrap();
}

#[test]
fn install_then_check_reports_every_table() {
    let db = TestDb::new();
    let mut cli = context(&db);
    let output = cli.execute(&Commands::Install { no_seed: false }).unwrap();
    assert!(output.contains("default domain rules"));

    let output = cli
        .execute(&Commands::Check {
            format: "json".to_string(),
        })
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
    let tables = parsed["tables"].as_array().unwrap();
    assert_eq!(tables.len(), 4);
    assert!(tables.iter().all(|t| t["status"] == "ok"));

    assert!(cli.execute(&Commands::Migrate).is_ok());
}

#[test]
fn tree_lists_nodes_in_branch_order() {
    let db = TestDb::new();
    let mut cli = context(&db);
    cli.execute(&Commands::Install { no_seed: true }).unwrap();
    assert_eq!(cli.execute(&Commands::EnsureSheet).unwrap(), "Sheet 1");
    add(&mut cli, 1, NodeKind::Function, "Pump water");
    add(&mut cli, 1, NodeKind::Function, "Contain water");
    add(&mut cli, 2, NodeKind::FailureMode, "Impeller worn");

    let tree = tree_json(&mut cli);
    assert_eq!(node_ids(&tree), vec![1, 3, 2, 4]);
    assert_eq!(tree["nodes"][3]["depth"], 2);
    assert_eq!(tree["nodes"][3]["kind"], "failure mode");
    assert!(tree["nodes"][0]["sort_key"].is_string());

    let text = cli
        .execute(&Commands::Tree {
            sheet: Some(1),
            keys: false,
            format: "text".to_string(),
        })
        .unwrap();
    assert!(text.contains("Impeller worn"));
    assert!(text.contains("Contain water"));
}

#[test]
fn move_into_own_subtree_fails() {
    let db = TestDb::new();
    let mut cli = context(&db);
    cli.execute(&Commands::Install { no_seed: true }).unwrap();
    cli.execute(&Commands::EnsureSheet).unwrap();
    add(&mut cli, 1, NodeKind::Function, "Pump water");
    add(&mut cli, 2, NodeKind::FailureMode, "Impeller worn");

    assert!(cli.execute(&Commands::Move { id: 2, parent: 3 }).is_err());
    assert!(cli
        .execute(&Commands::Add {
            parent: 42,
            kind: NodeKind::FailureMode,
            title: "Nowhere".to_string(),
            description: None,
        })
        .is_err());
}

#[test]
fn deleting_nodes_cascades_to_actions() {
    let db = TestDb::new();
    let mut cli = context(&db);
    cli.execute(&Commands::Install { no_seed: true }).unwrap();
    cli.execute(&Commands::EnsureSheet).unwrap();
    add(&mut cli, 1, NodeKind::FailureMode, "Seal leaks");
    add(&mut cli, 1, NodeKind::FailureMode, "Bearing seizes");

    let output = cli
        .execute(&Commands::Action {
            command: ActionCommands::Add {
                parents: "2,3".to_string(),
                title: "Replace seal kit".to_string(),
                category: None,
            },
        })
        .unwrap();
    assert_eq!(output, "Added action 1");
    assert!(cli
        .execute(&Commands::Action {
            command: ActionCommands::Add {
                parents: "2, 99".to_string(),
                title: "Dangling".to_string(),
                category: None,
            },
        })
        .is_err());

    cli.execute(&Commands::Delete { id: 2 }).unwrap();
    let listed = cli
        .execute(&Commands::Action {
            command: ActionCommands::List {
                node: None,
                format: "json".to_string(),
            },
        })
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&listed).unwrap();
    assert_eq!(parsed["actions"][0]["parentlist"], "3");

    let output = cli.execute(&Commands::Delete { id: 3 }).unwrap();
    assert_eq!(output, "Deleted 1 node(s)");
    let listed = cli
        .execute(&Commands::Action {
            command: ActionCommands::List {
                node: None,
                format: "text".to_string(),
            },
        })
        .unwrap();
    assert_eq!(listed, "No actions.");
    assert_eq!(node_ids(&tree_json(&mut cli)), vec![1]);
}

#[test]
fn options_come_from_seeded_rules() {
    let db = TestDb::new();
    let mut cli = context(&db);
    cli.execute(&Commands::Install { no_seed: false }).unwrap();
    let output = cli
        .execute(&Commands::Options {
            table: "fmea_function".to_string(),
            field: "asset_criticality".to_string(),
            format: "json".to_string(),
        })
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(parsed["field_type"], "enum");
    assert_eq!(parsed["options"].as_array().unwrap().len(), 4);
    assert_eq!(parsed["options"][0]["value"], "A");
}
