//! Timeline reconstruction from an unordered bag of periodic snapshots.
//!
//! The source data is sampled, not event-sourced: each upload is a full
//! point-in-time observation, and stage transitions have to be inferred from
//! adjacent observations that disagree. Closed stages are terminal here; an
//! observation that appears to leave a closed stage is dropped as a
//! data-quality condition rather than replayed as a reopen. That is a
//! deliberate policy (duplicate and out-of-order uploads would otherwise
//! fabricate "deal reopened" signals), not a repair of the source history.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::SnapshotRecord;
use crate::settings::ReportSettings;
use crate::stage;

/// A detected change of stage between two chronologically adjacent
/// distinct-stage observations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransitionEvent {
    pub from_stage: String,
    pub to_stage: String,
    pub at: NaiveDate,
    pub value_at_transition: Option<Decimal>,
}

/// The span during which the reconstructed history shows one continuous
/// stage. The final window of an opportunity is open-ended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StageWindow {
    pub stage: String,
    pub opened_at: NaiveDate,
    pub closed_at: Option<NaiveDate>,
}

impl StageWindow {
    /// Days the stage was occupied. `None` for the open final window, which
    /// is excluded from duration-based aggregates.
    pub fn duration_days(&self) -> Option<f64> {
        self.closed_at.map(|closed| (closed - self.opened_at).num_days() as f64)
    }
}

/// Reconstructed history for one opportunity: snapshots in chronological
/// order (stage labels canonicalized through the alias table) plus the
/// derived transitions and occupancy windows.
#[derive(Clone, Debug, Default)]
pub struct OpportunityHistory {
    pub snapshots: Vec<SnapshotRecord>,
    pub transitions: Vec<TransitionEvent>,
    pub windows: Vec<StageWindow>,
}

impl OpportunityHistory {
    /// Latest snapshot that carries a stage, if any.
    pub fn latest_staged(&self) -> Option<&SnapshotRecord> {
        self.snapshots.iter().rev().find(|snap| snap.stage.is_some())
    }

    /// Latest observed annualized value, scanning backwards.
    pub fn latest_value(&self) -> Option<Decimal> {
        self.snapshots.iter().rev().find_map(|snap| snap.annualized_value)
    }
}

pub fn reconstruct(
    mut snapshots: Vec<SnapshotRecord>,
    settings: &ReportSettings,
) -> OpportunityHistory {
    snapshots.sort_by(|a, b| (a.snapshot_date, a.id).cmp(&(b.snapshot_date, b.id)));
    for snapshot in &mut snapshots {
        if let Some(raw) = snapshot.stage.take() {
            snapshot.stage = Some(settings.canonical_stage(&raw));
        }
    }

    let mut transitions = Vec::new();
    let mut windows: Vec<StageWindow> = Vec::new();
    let mut current: Option<StageWindow> = None;

    for snapshot in &snapshots {
        // A snapshot without a stage cannot advance the walk.
        let Some(observed) = snapshot.stage.as_deref() else {
            continue;
        };

        match current.as_mut() {
            None => {
                current = Some(StageWindow {
                    stage: observed.to_string(),
                    opened_at: snapshot.snapshot_date,
                    closed_at: None,
                });
            }
            Some(window) if stage::same_stage(&window.stage, observed) => {
                // Re-observation of the occupied stage; the window keeps its
                // original opening date.
            }
            Some(window) => {
                if stage::is_closed(&window.stage) {
                    // Terminal-state exit suppressed: closed deals do not
                    // reopen in this model.
                    continue;
                }
                window.closed_at = Some(snapshot.snapshot_date);
                transitions.push(TransitionEvent {
                    from_stage: window.stage.clone(),
                    to_stage: observed.to_string(),
                    at: snapshot.snapshot_date,
                    value_at_transition: snapshot.annualized_value,
                });
                windows.push(current.take().expect("window present"));
                current = Some(StageWindow {
                    stage: observed.to_string(),
                    opened_at: snapshot.snapshot_date,
                    closed_at: None,
                });
            }
        }
    }

    if let Some(window) = current {
        windows.push(window);
    }

    OpportunityHistory { snapshots, transitions, windows }
}
