//! Single-writer owner of one project.
//!
//! Every cycle operation takes the project lock for its whole duration,
//! auto-capture fetches included, so no two submits for the same project can
//! interleave.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::capture::{fetch_with_timeout, DataService, QuantityKind, Unit};
use crate::cycle::{
    AutoValues, Clock, FinalizedRecord, InputSubmission, OutcomeSubmission, Phase,
};
use crate::error::Result;
use crate::events::Event;
use crate::project::{Project, ProjectSnapshot};

pub struct ProjectSession {
    project: Mutex<Project>,
    data: Arc<dyn DataService>,
    clock: Arc<dyn Clock>,
    capture_timeout: Duration,
}

impl ProjectSession {
    pub fn new(
        project: Project,
        data: Arc<dyn DataService>,
        clock: Arc<dyn Clock>,
        capture_timeout: Duration,
    ) -> Self {
        Self {
            project: Mutex::new(project),
            data,
            clock,
            capture_timeout,
        }
    }

    pub async fn snapshot(&self) -> ProjectSnapshot {
        self.project.lock().await.snapshot()
    }

    pub fn into_inner(self) -> Project {
        self.project.into_inner()
    }

    async fn auto_values(&self, project: &Project, phase: Phase) -> AutoValues {
        let mut values = AutoValues::new();
        for request in project.capture_requests(phase) {
            let fetched = fetch_with_timeout(
                self.data.as_ref(),
                request.quantity,
                request.unit,
                self.capture_timeout,
            )
            .await;
            match fetched {
                Some(v) => {
                    values.insert(request.name, v);
                }
                None => tracing::warn!(
                    project = project.title(),
                    variable = %request.name,
                    "no reading available for auto-captured variable"
                ),
            }
        }
        values
    }

    pub async fn submit_inputs(&self, submission: &InputSubmission) -> Result<Event> {
        let mut project = self.project.lock().await;
        let auto = self.auto_values(&project, Phase::Input).await;
        project.submit_inputs(submission, &auto, self.clock.now())
    }

    /// Finalize the cycle. Values flagged for write-back are pushed to the
    /// data service afterwards; a failed write is logged and otherwise
    /// ignored.
    pub async fn submit_outcomes(
        &self,
        submission: &OutcomeSubmission,
    ) -> Result<(FinalizedRecord, Event)> {
        let (record, writes) = {
            let mut project = self.project.lock().await;
            let auto = self.auto_values(&project, Phase::Outcome).await;
            let record = project.submit_outcomes(submission, &auto, self.clock.now())?;
            let writes = write_backs(&project, &record);
            (record, writes)
        };

        for (name, quantity, value, unit) in writes {
            if let Err(e) = self.data.write_value(quantity, value, unit).await {
                tracing::warn!(variable = %name, error = %e, "write-back to data service failed");
            }
        }

        let event = Event::CycleFinalized {
            project: record.project_title().to_string(),
            record_id: record.id(),
            at: record.output_timestamp(),
        };
        Ok((record, event))
    }

    pub async fn discard_cycle(&self) -> Result<Event> {
        let mut project = self.project.lock().await;
        project.discard_cycle(self.clock.now())
    }
}

type WriteBack = (String, QuantityKind, f64, Unit);

fn write_backs(project: &Project, record: &FinalizedRecord) -> Vec<WriteBack> {
    project
        .variables()
        .iter()
        .filter(|v| v.writes_to_store())
        .filter_map(|v| {
            let quantity = v.kind().quantity()?;
            let value = if v.kind().is_computation() {
                record.derived(v.name())?
            } else {
                record.value(v.name())?.as_f64()?
            };
            Some((v.name().to_string(), quantity, value, v.unit()))
        })
        .collect()
}
