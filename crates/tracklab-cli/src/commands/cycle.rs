//! Measurement cycle commands.

use chrono::Utc;
use clap::Subcommand;
use serde_json::json;
use std::sync::Arc;
use tracklab_core::capture::{DataService, NoDataService, QuantityKind, StaticDataService};
use tracklab_core::cycle::{InputSubmission, OutcomeSubmission, SystemClock};
use tracklab_core::variables::CapturedValue;
use tracklab_core::{Config, Event, Project, ProjectSession};

use super::{open_queue, open_store, print_json, queue, split_pair, CliResult};

#[derive(Subcommand)]
pub enum CycleAction {
    /// Submit the input phase
    Input {
        /// Project title
        project: String,
        /// Value as name=value; repeatable
        #[arg(long = "value")]
        values: Vec<String>,
        /// Group for this cycle (required when the project has several)
        #[arg(long)]
        group: Option<String>,
        /// Data service reading as quantity=value, e.g. body_mass=180.5
        #[arg(long = "reading")]
        readings: Vec<String>,
    },
    /// Submit the outcome phase and queue the finished record
    Outcome {
        project: String,
        #[arg(long = "value")]
        values: Vec<String>,
        #[arg(long = "reading")]
        readings: Vec<String>,
        /// Queue the record without trying to send it
        #[arg(long)]
        no_send: bool,
    },
    /// Throw away the buffered inputs
    Discard {
        project: String,
    },
    /// Show the cycle state and buffered inputs
    Status {
        project: String,
    },
}

/// Turn text into a value of the right shape for `name`. Unknown names are
/// passed through so validation can report them.
fn parse_raw(project: &Project, name: &str, raw: &str) -> CapturedValue {
    if let Some(v) = project.variable(name) {
        return v
            .parse_value(raw)
            .unwrap_or_else(|| CapturedValue::Text(raw.to_string()));
    }
    if project.ghosts().contains_name(name) {
        if let Ok(n) = raw.trim().parse::<f64>() {
            return CapturedValue::Number(n);
        }
    }
    CapturedValue::Text(raw.to_string())
}

fn parse_values(project: &Project, pairs: &[String]) -> Result<Vec<(String, CapturedValue)>, String> {
    pairs
        .iter()
        .map(|pair| {
            let (name, raw) = split_pair(pair)?;
            Ok((name.to_string(), parse_raw(project, name, raw)))
        })
        .collect()
}

fn data_service(readings: &[String]) -> Result<Arc<dyn DataService>, String> {
    if readings.is_empty() {
        return Ok(Arc::new(NoDataService));
    }
    let mut service = StaticDataService::new();
    for pair in readings {
        let (quantity, raw) = split_pair(pair)?;
        let quantity =
            QuantityKind::parse(quantity).ok_or_else(|| format!("unknown quantity '{quantity}'"))?;
        let value = raw
            .parse::<f64>()
            .map_err(|_| format!("reading for {quantity:?} is not a number: '{raw}'"))?;
        service.set_reading(quantity, value);
    }
    Ok(Arc::new(service))
}

fn open_session(project: Project, readings: &[String], config: &Config) -> Result<ProjectSession, String> {
    Ok(ProjectSession::new(
        project,
        data_service(readings)?,
        Arc::new(SystemClock),
        config.capture_timeout(),
    ))
}

pub fn run(action: CycleAction) -> CliResult {
    let store = open_store()?;
    let config = Config::load()?;
    let rt = tokio::runtime::Runtime::new()?;

    match action {
        CycleAction::Input { project, values, group, readings } => {
            let p = store.load(&project)?;
            let mut submission = InputSubmission::new();
            for (name, value) in parse_values(&p, &values)? {
                submission = submission.value(&name, value);
            }
            if let Some(g) = &group {
                submission = submission.group(g);
            }

            let session = open_session(p, &readings, &config)?;
            let event = rt.block_on(session.submit_inputs(&submission))?;
            let p = session.into_inner();
            store.save(&p)?;
            store.record_event(p.title(), &event)?;
            print_json(&event)?;
        }
        CycleAction::Outcome { project, values, readings, no_send } => {
            let p = store.load(&project)?;
            let mut submission = OutcomeSubmission::new();
            for (name, value) in parse_values(&p, &values)? {
                submission = submission.value(&name, value);
            }

            let session = open_session(p, &readings, &config)?;
            let (record, finalized) = rt.block_on(session.submit_outcomes(&submission))?;
            let p = session.into_inner();

            // Enqueue before saving so a failed enqueue leaves the stored buffer intact.
            let queue_store = open_queue()?;
            let entry = queue_store.enqueue(record.clone(), Utc::now())?;
            store.save(&p)?;
            let queued = Event::RecordQueued {
                handle: entry.handle,
                record_id: record.id(),
                at: entry.enqueued_at,
            };
            store.record_events(p.title(), &[finalized, queued])?;

            let send = !no_send && config.queue.drain_after_enqueue && !config.endpoint.url.is_empty();
            let delivery = if send {
                match queue::drain(&rt, &queue_store, &config) {
                    Ok(report) => Some(queue::report_json(&report)),
                    Err(e) => {
                        tracing::warn!(error = %e, "record queued but not sent");
                        None
                    }
                }
            } else {
                None
            };

            print_json(&json!({
                "handle": entry.handle,
                "record": record,
                "delivery": delivery,
            }))?;
        }
        CycleAction::Discard { project } => {
            let mut p = store.load(&project)?;
            let event = p.discard_cycle(Utc::now())?;
            store.save(&p)?;
            store.record_event(p.title(), &event)?;
            print_json(&event)?;
        }
        CycleAction::Status { project } => {
            let p = store.load(&project)?;
            print_json(&json!({
                "state": format!("{:?}", p.cycle_state()),
                "buffer": p.cycle_buffer(),
                "locked": p.is_locked(),
            }))?;
        }
    }
    Ok(())
}
