pub mod availability;
pub mod booking;
pub mod conflict;
pub mod coords;
mod error;
pub mod hours;
pub mod layout;
pub mod partition;

pub use availability::{busy_spans, free_gaps, open_slots};
pub use booking::{BookingDraft, DaySnapshot, OverrideReason, PendingOverride, Verdict, WriteOp, WriteStage};
pub use conflict::{find_conflicting_items, find_conflicts, Conflict};
pub use coords::{map_duration_to_height, map_to_offset, visible_height};
pub use error::EngineError;
pub use hours::is_within_hours;
pub use layout::build_day_layout;
pub use partition::partition;

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};
use ulid::Ulid;

use crate::config::LayoutConfig;
use crate::limits::MAX_ITEMS_PER_DAY;
use crate::live::DayView;
use crate::model::*;
use crate::observability;
use crate::store::AppointmentRepository;

use conflict::validate_interval;

/// Result of a write attempt that reached a decision point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Approved and handed to the store.
    Committed(Ulid),
    /// Waiting on the user; resume with [`Engine::confirm_override`] or
    /// [`Engine::decline_override`]. Nothing has been written.
    NeedsOverride(PendingOverride),
    Rejected(BookingDraft),
}

/// Orchestrates validation and layout over an injected repository.
///
/// Holds no day state of its own: every call reads a fresh snapshot, so two
/// racing writes are not coordinated and the store keeps the last one.
pub struct Engine {
    repo: Arc<dyn AppointmentRepository>,
    config: LayoutConfig,
}

impl Engine {
    pub fn new(repo: Arc<dyn AppointmentRepository>, config: LayoutConfig) -> Self {
        Self { repo, config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub async fn snapshot(&self, day: DayKey) -> Result<DaySnapshot, EngineError> {
        let (appointments, blocks) =
            futures::try_join!(self.repo.appointments_for_day(day), self.repo.blocks_for_day(day))?;
        Ok(DaySnapshot {
            appointments,
            blocks,
        })
    }

    // ── Read path ────────────────────────────────────────────────

    pub async fn day_layout(&self, day: DayKey) -> Result<Vec<LayoutDescriptor>, EngineError> {
        let snapshot = self.snapshot(day).await?;
        if snapshot.appointments.len() + snapshot.blocks.len() > MAX_ITEMS_PER_DAY {
            return Err(EngineError::LimitExceeded("too many items on day"));
        }
        let started = Instant::now();
        let layout = build_day_layout(day, &snapshot.appointments, &snapshot.blocks, &self.config);
        observability::record_layout_pass(layout.len(), started);
        debug!("laid out {} items for {day}", layout.len());
        Ok(layout)
    }

    /// Free gaps of at least `min_minutes` inside the day's business hours.
    pub async fn open_slots(&self, day: DayKey, min_minutes: u32) -> Result<Vec<Span>, EngineError> {
        let (schedule, snapshot) = futures::try_join!(self.repo.weekly_schedule(), self.snapshot(day))?;
        let busy: Vec<TimeInterval> = layout::day_items(day, &snapshot.appointments, &snapshot.blocks)
            .into_iter()
            .map(|item| item.interval)
            .collect();
        Ok(open_slots(day, &schedule, &busy, min_minutes))
    }

    /// Re-run the layout of `day` every time its stored content changes.
    pub fn watch_day(&self, day: DayKey) -> DayView {
        DayView::spawn(&*self.repo, self.config, day)
    }

    // ── Write path ───────────────────────────────────────────────

    pub async fn submit(&self, draft: BookingDraft) -> Result<WriteOutcome, EngineError> {
        validate_interval(draft.interval())?;
        let day = draft.interval().day();
        let (schedule, snapshot) = futures::try_join!(self.repo.weekly_schedule(), self.snapshot(day))?;
        let verdict = booking::validate(draft, &schedule, &snapshot);
        metrics::counter!(observability::VALIDATIONS_TOTAL, "outcome" => verdict.label()).increment(1);
        self.settle(verdict).await
    }

    /// Apply `patch` to a stored appointment and validate the result as an edit.
    pub async fn propose_edit(&self, id: Ulid, patch: AppointmentPatch) -> Result<WriteOutcome, EngineError> {
        let mut appointment = self.repo.get_appointment(id).await?;
        appointment.apply(&patch);
        self.submit(BookingDraft::edit(appointment)).await
    }

    /// The user accepted the warning. The day is re-read, so conflicts that
    /// appeared while the prompt was open are still caught.
    pub async fn confirm_override(&self, pending: PendingOverride) -> Result<WriteOutcome, EngineError> {
        let reason = pending.reason();
        metrics::counter!(observability::OVERRIDES_TOTAL, "reason" => reason.as_str(), "decision" => "confirm")
            .increment(1);
        info!("override confirmed for {} ({})", pending.draft().appointment.id, reason.as_str());

        let snapshot = self.snapshot(pending.draft().interval().day()).await?;
        let verdict = pending.confirm(&snapshot);
        self.settle(verdict).await
    }

    /// The user backed out. Nothing was written; the draft comes back unchanged.
    pub fn decline_override(&self, pending: PendingOverride) -> BookingDraft {
        let reason = pending.reason();
        metrics::counter!(observability::OVERRIDES_TOTAL, "reason" => reason.as_str(), "decision" => "decline")
            .increment(1);
        info!(
            "override declined for {} ({}), back to {:?}",
            pending.draft().appointment.id,
            reason.as_str(),
            pending.declined_stage()
        );
        pending.decline()
    }

    /// Checkout, completion, no-show and cancellation. Status changes don't
    /// move the appointment in time, so they skip validation.
    pub async fn set_status(&self, id: Ulid, status: AppointmentStatus) -> Result<(), EngineError> {
        self.repo.update(id, AppointmentPatch::status(status)).await?;
        metrics::counter!(observability::WRITES_TOTAL, "op" => status.as_str()).increment(1);
        info!("appointment {id} marked {}", status.as_str());
        Ok(())
    }

    async fn settle(&self, verdict: Verdict) -> Result<WriteOutcome, EngineError> {
        match verdict {
            Verdict::Approved(draft) => self.persist(draft).await.map(WriteOutcome::Committed),
            Verdict::NeedsOverride(pending) => {
                debug!(
                    "appointment {} awaiting override: {} ({} conflicts)",
                    pending.draft().appointment.id,
                    pending.reason().as_str(),
                    pending.conflicts().len()
                );
                Ok(WriteOutcome::NeedsOverride(pending))
            }
            Verdict::Rejected(draft) => Ok(WriteOutcome::Rejected(draft)),
        }
    }

    async fn persist(&self, draft: BookingDraft) -> Result<Ulid, EngineError> {
        let appointment = draft.appointment;
        let id = match draft.op {
            WriteOp::Create => {
                metrics::counter!(observability::WRITES_TOTAL, "op" => "create").increment(1);
                self.repo.create(appointment).await?
            }
            WriteOp::Edit => {
                metrics::counter!(observability::WRITES_TOTAL, "op" => "edit").increment(1);
                let id = appointment.id;
                let patch = AppointmentPatch {
                    client_id: Some(appointment.client_id),
                    service_id: Some(appointment.service_id),
                    interval: Some(appointment.interval),
                    status: Some(appointment.status),
                };
                self.repo.update(id, patch).await?;
                id
            }
        };
        info!("appointment {id} committed");
        Ok(id)
    }
}
