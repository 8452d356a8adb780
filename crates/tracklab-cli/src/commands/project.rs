//! Project management commands for CLI.

use chrono::Utc;
use clap::Subcommand;
use serde_json::json;
use tracklab_core::Project;

use super::catalog::{parse_kind, parse_role};
use super::{field_value_json, open_store, parse_fields, print_json, CliResult};

#[derive(Subcommand)]
pub enum ProjectAction {
    /// Create a new project
    Create {
        /// Project title
        title: String,
        /// The action being tested, e.g. "Drink coffee"
        #[arg(long)]
        action: Option<String>,
        /// Group label; repeat for several groups
        #[arg(long = "group", default_value = "Default")]
        groups: Vec<String>,
    },
    /// List all projects
    List,
    /// Show one project with its variables and ghosts
    Show {
        title: String,
    },
    /// Delete a project and its audit log
    Delete {
        title: String,
    },
    /// Add a variable
    AddVar {
        /// Project title
        project: String,
        /// Variable name
        name: String,
        /// Kind as family/label, e.g. custom/Scale
        #[arg(long)]
        kind: String,
        /// Role: input, outcome, action
        #[arg(long, default_value = "input")]
        role: String,
        /// Configuration field as id=value; repeatable
        #[arg(long = "field")]
        fields: Vec<String>,
    },
    /// Remove a variable
    RemoveVar {
        project: String,
        name: String,
    },
    /// Replace a variable's configuration
    ConfigureVar {
        project: String,
        name: String,
        #[arg(long = "field")]
        fields: Vec<String>,
    },
    /// Show the audit log
    History {
        title: String,
    },
}

fn describe(project: &Project) -> serde_json::Value {
    let variables: Vec<_> = project
        .variables()
        .iter()
        .map(|v| {
            let fields: serde_json::Map<String, serde_json::Value> = v
                .configured_values()
                .iter()
                .map(|(k, val)| (k.clone(), field_value_json(val)))
                .collect();
            json!({
                "name": v.name(),
                "kind": v.kind().label(),
                "family": v.kind().family(),
                "role": v.role(),
                "unit": v.unit().symbol(),
                "fields": fields,
            })
        })
        .collect();
    let ghosts: Vec<_> = project
        .ghosts()
        .iter()
        .map(|g| {
            json!({
                "name": g.name(),
                "parent": g.parent(),
                "kind": g.kind().label(),
                "role": g.role(),
                "auto_capture": g.is_auto_captured(),
            })
        })
        .collect();
    json!({
        "title": project.title(),
        "action": project.action(),
        "groups": project.groups().iter().map(|g| g.label.as_str()).collect::<Vec<_>>(),
        "locked": project.is_locked(),
        "cycle": format!("{:?}", project.cycle_state()),
        "created_at": project.created_at().to_rfc3339(),
        "variables": variables,
        "ghosts": ghosts,
    })
}

pub fn run(action: ProjectAction) -> CliResult {
    let store = open_store()?;
    let now = Utc::now();

    match action {
        ProjectAction::Create { title, action, groups } => {
            let labels: Vec<&str> = groups.iter().map(String::as_str).collect();
            let project = Project::new(&title, action.as_deref(), &labels, now)?;
            store.create(&project)?;
            println!("Project created: {}", project.title());
        }
        ProjectAction::List => {
            print_json(&store.list()?)?;
        }
        ProjectAction::Show { title } => {
            let project = store.load(&title)?;
            print_json(&describe(&project))?;
        }
        ProjectAction::Delete { title } => {
            if store.delete(&title)? {
                println!("Project deleted: {title}");
            } else {
                return Err(format!("no project named '{title}'").into());
            }
        }
        ProjectAction::AddVar { project, name, kind, role, fields } => {
            let kind = parse_kind(&kind)?;
            let role = parse_role(&role)?;
            let fields = parse_fields(kind, &fields)?;
            let mut p = store.load(&project)?;
            let events = p.add_variable(&name, kind, role, &fields, now)?;
            store.save(&p)?;
            store.record_events(p.title(), &events)?;
            print_json(&events)?;
        }
        ProjectAction::RemoveVar { project, name } => {
            let mut p = store.load(&project)?;
            let events = p.remove_variable(&name, now)?;
            store.save(&p)?;
            store.record_events(p.title(), &events)?;
            print_json(&events)?;
        }
        ProjectAction::ConfigureVar { project, name, fields } => {
            let mut p = store.load(&project)?;
            let kind = p
                .variable(&name)
                .map(|v| v.kind())
                .ok_or_else(|| format!("no variable named '{name}'"))?;
            let fields = parse_fields(kind, &fields)?;
            let events = p.reconfigure_variable(&name, &fields, now)?;
            store.save(&p)?;
            store.record_events(p.title(), &events)?;
            print_json(&events)?;
        }
        ProjectAction::History { title } => {
            if !store.exists(&title)? {
                return Err(format!("no project named '{title}'").into());
            }
            print_json(&store.audit_log(&title)?)?;
        }
    }
    Ok(())
}
