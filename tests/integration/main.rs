//! Integration tests for the reliability tree store

mod action_cascade;
mod cli_commands;
mod ordering_properties;
mod store_roundtrip;
mod support;
mod tree_order;
