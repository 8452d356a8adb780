//! Transmission queue commands.

use clap::Subcommand;
use serde_json::json;
use std::error::Error;
use tokio::runtime::Runtime;
use tracklab_core::transmit::{
    resolve_account_id, DrainOutcome, DrainReport, DrainStop, HttpSink, TransmissionQueue,
};
use tracklab_core::Config;

use super::{home, open_queue, print_json, CliResult};

#[derive(Subcommand)]
pub enum QueueAction {
    /// List queued records, oldest first
    List,
    /// Show the record at the head of the queue
    Peek,
    /// Send queued records to the configured endpoint
    Drain,
}

/// Drain `queue` against the configured endpoint.
pub fn drain(
    rt: &Runtime,
    queue: &TransmissionQueue,
    config: &Config,
) -> Result<DrainReport, Box<dyn Error>> {
    let sink = HttpSink::new(config.endpoint_url()?, config.endpoint_timeout())?;
    let account = resolve_account_id(config.account_id(), &home()?)?;
    Ok(rt.block_on(queue.drain(&sink, &account, &DrainStop::new()))?)
}

pub fn report_json(report: &DrainReport) -> serde_json::Value {
    let outcome = match &report.outcome {
        DrainOutcome::Completed => json!({ "status": "completed" }),
        DrainOutcome::Stopped => json!({ "status": "stopped" }),
        DrainOutcome::AlreadyDraining => json!({ "status": "already_draining" }),
        DrainOutcome::Halted { handle, reason } => json!({
            "status": "halted",
            "handle": handle,
            "retryable": reason.is_retryable(),
            "reason": reason.to_string(),
        }),
    };
    json!({
        "delivered": report.delivered,
        "outcome": outcome,
        "events": report.events,
    })
}

pub fn run(action: QueueAction) -> CliResult {
    let queue = open_queue()?;

    match action {
        QueueAction::List => {
            print_json(&queue.pending()?)?;
        }
        QueueAction::Peek => match queue.peek()? {
            Some(entry) => print_json(&json!({
                "handle": entry.handle,
                "enqueued_at": entry.enqueued_at.to_rfc3339(),
                "record": entry.record,
            }))?,
            None => println!("queue is empty"),
        },
        QueueAction::Drain => {
            let config = Config::load()?;
            let rt = Runtime::new()?;
            let report = drain(&rt, &queue, &config)?;
            print_json(&report_json(&report))?;
            if let DrainOutcome::Halted { handle, reason } = report.outcome {
                return Err(format!("delivery halted at entry {handle}: {reason}").into());
            }
        }
    }
    Ok(())
}
