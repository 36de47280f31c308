//! `roster org import <file>` and `roster org list`
//!
//! The import file is a YAML (or JSON) tree:
//!
//! ```yaml
//! - name: Holding
//!   unit_type: group
//!   children:
//!     - name: Acme LLC
//!       unit_type: legal_entity
//!       children:
//!         - { name: Finance, unit_type: department }
//!         - { name: Legacy, unit_type: department, archived: true }
//! ```
//!
//! Nodes are matched by parent, type and name, so importing twice is a no-op.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Deserialize;
use tabled::{settings::Style, Table, Tabled};

use roster_core::{OrgUnitId, OrgUnitType};
use roster_store::{org_units, Connection};

use super::{load_config, open_store};

#[derive(Subcommand, Debug)]
pub enum OrgCommand {
    /// Create missing org units from a YAML/JSON tree.
    Import(ImportArgs),
    /// Print the org-unit hierarchy.
    List,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Tree file (`.yaml`, `.yml` or `.json`).
    pub file: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OrgNode {
    name: String,
    unit_type: OrgUnitType,
    #[serde(default)]
    archived: bool,
    #[serde(default)]
    children: Vec<OrgNode>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OrgTree {
    Many(Vec<OrgNode>),
    One(OrgNode),
}

#[derive(Debug, Default, PartialEq, Eq)]
struct ImportStats {
    created: usize,
    existing: usize,
}

pub fn run(command: OrgCommand) -> Result<()> {
    match command {
        OrgCommand::Import(args) => import(args),
        OrgCommand::List => list(),
    }
}

fn import(args: ImportArgs) -> Result<()> {
    let contents = std::fs::read_to_string(&args.file)
        .with_context(|| format!("cannot read '{}'", args.file.display()))?;
    // YAML is a superset of JSON; one parser covers both.
    let tree: OrgTree = serde_yaml::from_str(&contents)
        .with_context(|| format!("invalid org tree in '{}'", args.file.display()))?;
    let roots = match tree {
        OrgTree::Many(nodes) => nodes,
        OrgTree::One(node) => vec![node],
    };

    let config = load_config()?;
    let mut store = open_store(&config)?;
    let uow = store.begin().context("failed to start transaction")?;
    let mut stats = ImportStats::default();
    for root in &roots {
        import_node(uow.conn(), None, root, &mut stats)?;
    }
    uow.commit().context("failed to commit org import")?;

    println!(
        "✓ Imported org tree: {} created, {} already present",
        stats.created, stats.existing
    );
    Ok(())
}

fn import_node(
    conn: &Connection,
    parent: Option<OrgUnitId>,
    node: &OrgNode,
    stats: &mut ImportStats,
) -> Result<()> {
    let (id, created) = org_units::ensure(conn, parent, node.unit_type, &node.name)
        .with_context(|| format!("failed to import {} '{}'", node.unit_type, node.name))?;
    if created {
        stats.created += 1;
    } else {
        stats.existing += 1;
    }
    org_units::set_archived(conn, id, node.archived)?;
    for child in &node.children {
        import_node(conn, Some(id), child, stats)?;
    }
    Ok(())
}

#[derive(Tabled)]
struct OrgRow {
    #[tabled(rename = "id")]
    id: i64,
    #[tabled(rename = "unit")]
    name: String,
    #[tabled(rename = "type")]
    unit_type: String,
    #[tabled(rename = "archived")]
    archived: String,
}

fn list() -> Result<()> {
    let config = load_config()?;
    let store = open_store(&config)?;
    let units = org_units::list(store.conn()).context("failed to list org units")?;
    if units.is_empty() {
        println!("No org units. Run: roster org import <file>");
        return Ok(());
    }

    let mut children: HashMap<Option<OrgUnitId>, Vec<_>> = HashMap::new();
    for unit in &units {
        children.entry(unit.parent_id).or_default().push(unit);
    }

    // Depth-first so each unit is printed under its parent.
    let mut rows = Vec::with_capacity(units.len());
    let mut stack: Vec<(usize, _)> = children
        .get(&None)
        .map(|roots| roots.iter().rev().map(|u| (0, *u)).collect())
        .unwrap_or_default();
    while let Some((depth, unit)) = stack.pop() {
        rows.push(OrgRow {
            id: unit.id.0,
            name: format!("{}{}", "  ".repeat(depth), unit.name),
            unit_type: unit.unit_type.to_string(),
            archived: if unit.is_archived { "yes".into() } else { String::new() },
        });
        if let Some(kids) = children.get(&Some(unit.id)) {
            stack.extend(kids.iter().rev().map(|k| (depth + 1, *k)));
        }
    }

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_store::Store;

    const TREE: &str = r#"
- name: Holding
  unit_type: group
  children:
    - name: Acme LLC
      unit_type: legal_entity
      children:
        - { name: Finance, unit_type: department }
        - { name: Legacy, unit_type: department, archived: true }
"#;

    fn roots(src: &str) -> Vec<OrgNode> {
        match serde_yaml::from_str::<OrgTree>(src).expect("parse tree") {
            OrgTree::Many(nodes) => nodes,
            OrgTree::One(node) => vec![node],
        }
    }

    #[test]
    fn import_is_idempotent() {
        let store = Store::in_memory().expect("store");
        let tree = roots(TREE);

        let mut first = ImportStats::default();
        import_node(store.conn(), None, &tree[0], &mut first).expect("first import");
        assert_eq!(first, ImportStats { created: 4, existing: 0 });

        let mut second = ImportStats::default();
        import_node(store.conn(), None, &tree[0], &mut second).expect("second import");
        assert_eq!(second, ImportStats { created: 0, existing: 4 });

        assert!(org_units::find_department(store.conn(), "Acme LLC", "Finance")
            .unwrap()
            .is_some());
        assert!(org_units::find_department(store.conn(), "Acme LLC", "Legacy")
            .unwrap()
            .is_none());
    }

    #[test]
    fn single_json_root_is_accepted() {
        let tree = roots(r#"{"name": "Acme LLC", "unit_type": "legal_entity"}"#);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].unit_type, OrgUnitType::LegalEntity);
        assert!(tree[0].children.is_empty());
    }

    #[test]
    fn unknown_unit_type_is_rejected() {
        assert!(serde_yaml::from_str::<OrgTree>("- { name: X, unit_type: team }").is_err());
    }
}
