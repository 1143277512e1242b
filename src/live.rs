use std::time::Instant;

use futures::StreamExt;
use tokio::sync::watch;
use tracing::debug;

use crate::config::LayoutConfig;
use crate::engine::{build_day_layout, EngineError};
use crate::model::*;
use crate::observability;
use crate::store::AppointmentSource;

/// Layout of one day, recomputed from scratch whenever the day's
/// appointments or blocks change. The background task exits once the view
/// is dropped and its channel closes.
pub struct DayView {
    day: DayKey,
    rx: watch::Receiver<Vec<LayoutDescriptor>>,
}

impl DayView {
    pub fn spawn<S: AppointmentSource + ?Sized>(source: &S, config: LayoutConfig, day: DayKey) -> Self {
        let mut appointments = source.subscribe_appointments(day);
        let mut blocks = source.subscribe_blocks(day);
        let (tx, rx) = watch::channel(Vec::new());

        tokio::spawn(async move {
            metrics::gauge!(observability::LIVE_VIEWS_ACTIVE).increment(1.0);
            // None until the stream's first snapshot; no layout is published
            // before both halves of the day are known.
            let mut current_appointments: Option<Vec<Appointment>> = None;
            let mut current_blocks: Option<Vec<ScheduleBlock>> = None;

            loop {
                tokio::select! {
                    Some(list) = appointments.next() => current_appointments = Some(list),
                    Some(list) = blocks.next() => current_blocks = Some(list),
                    _ = tx.closed() => break,
                    else => break,
                }

                let (Some(day_appointments), Some(day_blocks)) = (&current_appointments, &current_blocks) else {
                    continue;
                };
                let started = Instant::now();
                let layout = build_day_layout(day, day_appointments, day_blocks, &config);
                observability::record_layout_pass(layout.len(), started);
                debug!("live view {day}: {} items", layout.len());
                tx.send_if_modified(|current| {
                    if *current == layout {
                        return false;
                    }
                    *current = layout;
                    true
                });
            }
            metrics::gauge!(observability::LIVE_VIEWS_ACTIVE).decrement(1.0);
        });

        Self { day, rx }
    }

    pub fn day(&self) -> DayKey {
        self.day
    }

    /// Latest published layout (empty until both day snapshots have arrived).
    pub fn layout(&self) -> Vec<LayoutDescriptor> {
        self.rx.borrow().clone()
    }

    /// Wait for the next layout that differs from the last one seen.
    pub async fn changed(&mut self) -> Result<Vec<LayoutDescriptor>, EngineError> {
        self.rx
            .changed()
            .await
            .map_err(|_| EngineError::Store("live view stopped".into()))?;
        Ok(self.rx.borrow_and_update().clone())
    }

    /// Wait until the published layout satisfies `pred`.
    pub async fn wait_for(
        &mut self,
        pred: impl FnMut(&Vec<LayoutDescriptor>) -> bool,
    ) -> Result<Vec<LayoutDescriptor>, EngineError> {
        let layout = self
            .rx
            .wait_for(pred)
            .await
            .map_err(|_| EngineError::Store("live view stopped".into()))?;
        Ok(layout.clone())
    }
}
