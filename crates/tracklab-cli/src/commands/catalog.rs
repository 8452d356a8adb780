//! Read-only view of the variable kind catalog.

use clap::Subcommand;
use serde_json::json;
use tracklab_core::variables::{all_kinds, kind_by_label, kinds_for, ModuleFamily, Role, VariableKind};

use super::{field_value_json, open_store, print_json, CliResult};

#[derive(Subcommand)]
pub enum CatalogAction {
    /// List kinds, optionally for one family
    List {
        /// Family: custom, biometric, exercise, food, environment
        #[arg(long)]
        family: Option<String>,
    },
    /// Show a kind's configuration fields
    Show {
        /// Family of the kind
        family: String,
        /// Kind label, e.g. "Scale" or "Weight"
        label: String,
    },
    /// Kinds that may not be added to a project in a role right now
    Disallowed {
        /// Project title
        project: String,
        /// Role: input, outcome, action
        #[arg(long, default_value = "input")]
        role: String,
    },
}

pub fn parse_family(raw: &str) -> Result<ModuleFamily, String> {
    ModuleFamily::parse(raw).ok_or_else(|| format!("unknown family '{raw}'"))
}

pub fn parse_role(raw: &str) -> Result<Role, String> {
    Role::parse(raw).ok_or_else(|| format!("unknown role '{raw}'"))
}

/// Resolve `family/label` or `family:label`.
pub fn parse_kind(raw: &str) -> Result<VariableKind, String> {
    let (family, label) = raw
        .split_once('/')
        .or_else(|| raw.split_once(':'))
        .ok_or_else(|| format!("expected family/label, got '{raw}'"))?;
    let family = parse_family(family)?;
    kind_by_label(family, label).ok_or_else(|| format!("no kind '{label}' in family {family}"))
}

fn summary(kind: VariableKind) -> serde_json::Value {
    let spec = kind.spec();
    json!({
        "family": kind.family(),
        "label": spec.label,
        "class": spec.class,
        "roles": spec.roles,
        "uniqueness": spec.uniqueness,
        "auto_capture": spec.auto_capture,
    })
}

pub fn run(action: CatalogAction) -> CliResult {
    match action {
        CatalogAction::List { family } => {
            let kinds = match family {
                Some(f) => kinds_for(parse_family(&f)?),
                None => all_kinds(),
            };
            let rows: Vec<_> = kinds.into_iter().map(summary).collect();
            print_json(&rows)?;
        }
        CatalogAction::Show { family, label } => {
            let family = parse_family(&family)?;
            let kind = kind_by_label(family, &label)
                .ok_or_else(|| format!("no kind '{label}' in family {family}"))?;
            let fields: Vec<_> = kind
                .spec()
                .fields
                .iter()
                .map(|d| {
                    let choices = match d.field_type {
                        tracklab_core::variables::FieldType::Choice(c) => json!(c),
                        _ => serde_json::Value::Null,
                    };
                    json!({
                        "id": d.id,
                        "label": d.label,
                        "type": d.field_type.name(),
                        "choices": choices,
                        "default": d.default.to_value().as_ref().map(field_value_json),
                        "bounds": d.bounds,
                        "required": d.required,
                    })
                })
                .collect();
            let mut out = summary(kind);
            out["fields"] = json!(fields);
            print_json(&out)?;
        }
        CatalogAction::Disallowed { project, role } => {
            let role = parse_role(&role)?;
            let project = open_store()?.load(&project)?;
            let mut out = serde_json::Map::new();
            for family in ModuleFamily::ALL {
                let blocked = project.disallowed_kinds(family, role);
                out.insert(family.as_str().to_string(), json!(blocked));
            }
            print_json(&out)?;
        }
    }
    Ok(())
}
