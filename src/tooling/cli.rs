//! CLI Tooling
//!
//! Admin commands over one reliability database. Every command runs against
//! a single gateway owned by the `CliContext` and returns its output as text.

use super::format::{
    format_actions_text, format_options_text, format_sheets_text, format_table_status_text,
    format_tree_text, kind_label, status_label, truncate_chars, TreeRow,
};
use crate::action::{Action, ActionList, ParentList};
use crate::config::{ConfigLoader, MrConfig};
use crate::domain::DomainRules;
use crate::error::ApiError;
use crate::record::{FormInput, Record, RecordSchema, FAILURE_MODE, FUNCTION};
use crate::store::{ensure_all, install, Gateway, ALL_KINDS};
use crate::tree::Forest;
use crate::types::{NodeId, Value};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::info;

/// MRTools - FMEA reliability tree database administration
#[derive(Parser)]
#[command(name = "mrtools")]
#[command(about = "Install, check and inspect an FMEA reliability database")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// SQLite database file (overrides the configured one)
    #[arg(long)]
    pub database: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Drop and recreate every table (destroys all rows)
    Install {
        /// Leave the domain rule table empty
        #[arg(long)]
        no_seed: bool,
    },
    /// Create missing tables and report layout conflicts
    Check {
        /// Output format: text or json
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Add missing columns to existing tables
    Migrate,
    /// List sheets (root functions)
    Sheets {
        /// Output format: text or json
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Create the default sheet when the database has none
    EnsureSheet,
    /// Show the ordered function / failure mode tree
    Tree {
        /// Restrict to one sheet
        #[arg(long)]
        sheet: Option<NodeId>,
        /// Show numeric sort keys
        #[arg(long)]
        keys: bool,
        /// Output format: text or json
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Add a function or failure mode below an existing node
    Add {
        /// Parent node id
        #[arg(long)]
        parent: NodeId,
        #[arg(long, value_enum, default_value = "failure-mode")]
        kind: NodeKind,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Move a node below another parent
    Move {
        id: NodeId,
        /// New parent node id
        #[arg(long)]
        parent: NodeId,
    },
    /// Delete a node, its descendants and their action links
    Delete { id: NodeId },
    /// Corrective action management
    Action {
        #[command(subcommand)]
        command: ActionCommands,
    },
    /// List the options of an enumerated field
    Options {
        /// Table name, e.g. fmea_function
        table: String,
        /// Field name, e.g. asset_criticality
        field: String,
        /// Output format: text or json
        #[arg(long, default_value = "text")]
        format: String,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ActionCommands {
    /// Create an action attached to the given nodes
    Add {
        /// Comma-separated node ids
        #[arg(long)]
        parents: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        category: Option<String>,
    },
    /// Attach an action to one more node
    Attach {
        action: NodeId,
        #[arg(long)]
        node: NodeId,
    },
    /// Detach an action from a node; an action left unattached is deleted
    Detach {
        action: NodeId,
        #[arg(long)]
        node: NodeId,
    },
    /// Delete an action
    Delete { action: NodeId },
    /// List actions, optionally only those attached to a node
    List {
        #[arg(long)]
        node: Option<NodeId>,
        /// Output format: text or json
        #[arg(long, default_value = "text")]
        format: String,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Function,
    FailureMode,
}

impl NodeKind {
    fn schema(self) -> &'static RecordSchema {
        match self {
            NodeKind::Function => &FUNCTION,
            NodeKind::FailureMode => &FAILURE_MODE,
        }
    }
}

/// Command execution context: configuration plus an open gateway
pub struct CliContext {
    config: MrConfig,
    gateway: Gateway,
}

impl CliContext {
    /// Load configuration and open the configured database.
    pub fn new(config_path: Option<PathBuf>, database: Option<PathBuf>) -> Result<Self, ApiError> {
        let mut config = ConfigLoader::load(config_path.as_deref())?;
        if let Some(database) = database {
            config.database = database;
        }
        Self::from_config(config)
    }

    pub fn from_config(config: MrConfig) -> Result<Self, ApiError> {
        config.validate()?;
        let gateway = Gateway::open(&config.database)?;
        Ok(Self { config, gateway })
    }

    pub fn config(&self) -> &MrConfig {
        &self.config
    }

    pub fn execute(&mut self, command: &Commands) -> Result<String, ApiError> {
        info!(command = ?command, "Executing command");
        match command {
            Commands::Install { no_seed } => self.install(!no_seed && self.config.seed_domain_defaults),
            Commands::Check { format } => self.check(format),
            Commands::Migrate => self.migrate(),
            Commands::Sheets { format } => self.sheets(format),
            Commands::EnsureSheet => self.ensure_sheet(),
            Commands::Tree {
                sheet,
                keys,
                format,
            } => self.tree(*sheet, *keys, format),
            Commands::Add {
                parent,
                kind,
                title,
                description,
            } => self.add_node(*parent, *kind, title, description.as_deref()),
            Commands::Move { id, parent } => self.move_node(*id, *parent),
            Commands::Delete { id } => self.delete_node(*id),
            Commands::Action { command } => self.action(command),
            Commands::Options {
                table,
                field,
                format,
            } => self.options(table, field, format),
        }
    }

    fn forest(&mut self, sheet: Option<NodeId>) -> Forest {
        Forest::load(&mut self.gateway, sheet).with_max_depth(self.config.max_tree_depth)
    }

    fn install(&mut self, seed_domain: bool) -> Result<String, ApiError> {
        if !install(&mut self.gateway, seed_domain) {
            return Err(ApiError::CommandFailed(
                "installation incomplete; see log for the failed statement".to_string(),
            ));
        }
        Ok(format!(
            "Installed {} tables{}.",
            ALL_KINDS.len(),
            if seed_domain { " with default domain rules" } else { "" }
        ))
    }

    fn check(&mut self, format: &str) -> Result<String, ApiError> {
        let statuses = ensure_all(&mut self.gateway, self.config.seed_domain_defaults);
        match parse_format(format)? {
            OutputFormat::Text => Ok(format_table_status_text(&statuses)),
            OutputFormat::Json => {
                let tables: Vec<_> = statuses
                    .iter()
                    .map(|(schema, status)| {
                        json!({
                            "table": schema.table(),
                            "version": schema.version,
                            "status": status_label(status),
                        })
                    })
                    .collect();
                to_json(&json!({ "tables": tables }))
            }
        }
    }

    fn migrate(&mut self) -> Result<String, ApiError> {
        let refused: Vec<String> = ALL_KINDS
            .into_iter()
            .filter(|&schema| !self.gateway.migrate(&Record::empty(schema)))
            .map(|schema| schema.table())
            .collect();
        if !refused.is_empty() {
            return Err(ApiError::CommandFailed(format!(
                "migration refused or failed for: {}",
                refused.join(", ")
            )));
        }
        Ok(format!("All {} tables match their record kinds.", ALL_KINDS.len()))
    }

    fn sheets(&mut self, format: &str) -> Result<String, ApiError> {
        let sheets = Forest::sheets(&mut self.gateway);
        match parse_format(format)? {
            OutputFormat::Text => Ok(format_sheets_text(&sheets)),
            OutputFormat::Json => {
                let rows: Vec<_> = sheets.iter().map(Record::to_map).collect();
                to_json(&json!({ "sheets": rows }))
            }
        }
    }

    fn ensure_sheet(&mut self) -> Result<String, ApiError> {
        let mut forest = self.forest(None);
        let id = forest
            .ensure_sheet(&mut self.gateway)
            .ok_or_else(|| ApiError::CommandFailed("could not create a sheet".to_string()))?;
        Ok(format!("Sheet {}", id))
    }

    fn tree(&mut self, sheet: Option<NodeId>, with_keys: bool, format: &str) -> Result<String, ApiError> {
        let format = parse_format(format)?;
        let max_chars = self.config.max_chars_description;
        let mut forest = self.forest(sheet);
        let keys: HashMap<NodeId, u128> = forest
            .sort_keys()
            .into_iter()
            .filter_map(|(id, key)| key.map(|k| (id, k)))
            .collect();
        let unplaced: Vec<NodeId> = forest.unplaced().iter().filter_map(|n| n.id()).collect();
        let rows: Vec<TreeRow> = forest
            .ordered_view()
            .into_iter()
            .filter_map(|node| {
                let id = node.id()?;
                let record = node.record();
                Some(TreeRow {
                    id,
                    kind: kind_label(node.kind()).to_string(),
                    parent_id: node.parent_id(),
                    depth: node.depth().unwrap_or_default(),
                    title: record.text("title").unwrap_or_default().to_string(),
                    description: truncate_chars(
                        record.text("description").unwrap_or_default(),
                        max_chars,
                    ),
                    sort_key: if with_keys {
                        keys.get(&id).map(|k| k.to_string())
                    } else {
                        None
                    },
                })
            })
            .collect();
        match format {
            OutputFormat::Text => Ok(format_tree_text(&rows, &unplaced, with_keys)),
            OutputFormat::Json => to_json(&json!({ "nodes": rows, "unplaced": unplaced })),
        }
    }

    fn add_node(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        title: &str,
        description: Option<&str>,
    ) -> Result<String, ApiError> {
        let mut forest = self.forest(None);
        let mut form = FormInput::new();
        form.insert("parentid".to_string(), Value::Integer(parent));
        form.insert("title".to_string(), Value::from(title));
        if let Some(description) = description {
            form.insert("description".to_string(), Value::from(description));
        }
        let id = forest
            .create_node(&mut self.gateway, kind.schema(), &form)
            .ok_or_else(|| {
                ApiError::CommandFailed(format!("could not add a node below {}", parent))
            })?;
        Ok(format!("Added {} {}", kind_label(kind.schema().kind), id))
    }

    fn move_node(&mut self, id: NodeId, parent: NodeId) -> Result<String, ApiError> {
        let mut forest = self.forest(None);
        if !forest.move_node(&mut self.gateway, id, Some(parent)) {
            return Err(ApiError::CommandFailed(format!(
                "could not move {} below {}",
                id, parent
            )));
        }
        Ok(format!("Moved {} below {}", id, parent))
    }

    fn delete_node(&mut self, id: NodeId) -> Result<String, ApiError> {
        let mut forest = self.forest(None);
        let mut actions = ActionList::load(&mut self.gateway);
        let removed = forest.subtree_ids(id).len();
        if !forest.delete_subtree(&mut self.gateway, id, Some(&mut actions)) {
            return Err(ApiError::CommandFailed(format!("could not delete {}", id)));
        }
        Ok(format!("Deleted {} node(s)", removed))
    }

    fn action(&mut self, command: &ActionCommands) -> Result<String, ApiError> {
        let mut actions = ActionList::load(&mut self.gateway);
        match command {
            ActionCommands::Add {
                parents,
                title,
                category,
            } => {
                let forest = self.forest(None);
                let parents = ParentList::parse(parents);
                if let Some(missing) = parents.iter().find(|&id| !forest.contains(id)) {
                    return Err(ApiError::CommandFailed(format!("unknown node {}", missing)));
                }
                let mut action = Action::new();
                for id in parents.iter() {
                    action.add_parent(id);
                }
                let mut form = FormInput::new();
                form.insert("title".to_string(), Value::from(title.as_str()));
                if let Some(category) = category {
                    form.insert("category".to_string(), Value::from(category.as_str()));
                }
                let mut record = action.into_record();
                record.merge_form(&form);
                let id = actions
                    .save(&mut self.gateway, Action::from_record(record))
                    .ok_or_else(|| ApiError::CommandFailed("could not save action".to_string()))?;
                Ok(format!("Added action {}", id))
            }
            ActionCommands::Attach { action, node } => {
                let forest = self.forest(None);
                if !forest.contains(*node) {
                    return Err(ApiError::CommandFailed(format!("unknown node {}", node)));
                }
                if !actions.attach_to(&mut self.gateway, *action, *node) {
                    return Err(ApiError::CommandFailed(format!(
                        "could not attach action {} to {}",
                        action, node
                    )));
                }
                Ok(format!("Attached action {} to {}", action, node))
            }
            ActionCommands::Detach { action, node } => {
                if !actions.detach_from(&mut self.gateway, *action, *node) {
                    return Err(ApiError::CommandFailed(format!(
                        "could not detach action {} from {}",
                        action, node
                    )));
                }
                if actions.get(*action).is_none() {
                    return Ok(format!("Detached and deleted action {}", action));
                }
                Ok(format!("Detached action {} from {}", action, node))
            }
            ActionCommands::Delete { action } => {
                if !actions.delete(&mut self.gateway, *action) {
                    return Err(ApiError::CommandFailed(format!(
                        "could not delete action {}",
                        action
                    )));
                }
                Ok(format!("Deleted action {}", action))
            }
            ActionCommands::List { node, format } => {
                let listed: Vec<&Action> = match node {
                    Some(node) => actions.for_nodes(&[*node]),
                    None => actions.iter().collect(),
                };
                match parse_format(format)? {
                    OutputFormat::Text => {
                        Ok(format_actions_text(&listed, self.config.max_chars_description))
                    }
                    OutputFormat::Json => {
                        let rows: Vec<_> = listed.iter().map(|a| a.record().to_map()).collect();
                        to_json(&json!({ "actions": rows }))
                    }
                }
            }
        }
    }

    fn options(&mut self, table: &str, field: &str, format: &str) -> Result<String, ApiError> {
        let rules = DomainRules::load(&mut self.gateway);
        let options = rules.options(table, field);
        match parse_format(format)? {
            OutputFormat::Text => Ok(format_options_text(&options)),
            OutputFormat::Json => to_json(&json!({
                "table": table,
                "field": field,
                "field_type": rules.field_type(table, field),
                "options": options,
            })),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

fn parse_format(format: &str) -> Result<OutputFormat, ApiError> {
    match format {
        "text" => Ok(OutputFormat::Text),
        "json" => Ok(OutputFormat::Json),
        other => Err(ApiError::CommandFailed(format!(
            "unknown output format '{}' (use text or json)",
            other
        ))),
    }
}

fn to_json(value: &serde_json::Value) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ApiError::CommandFailed(format!("Failed to serialize output: {}", e)))
}
