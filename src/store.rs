use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::engine::conflict::{validate_block, validate_interval};
use crate::engine::EngineError;
use crate::model::*;
use crate::notify::NotifyHub;

// ── Collaborator contracts ───────────────────────────────────────

/// Read side of the external store, cancelled appointments included.
#[async_trait]
pub trait AppointmentSource: Send + Sync {
    async fn appointments_for_day(&self, day: DayKey) -> Result<Vec<Appointment>, EngineError>;
    async fn blocks_for_day(&self, day: DayKey) -> Result<Vec<ScheduleBlock>, EngineError>;
    async fn get_appointment(&self, id: Ulid) -> Result<Appointment, EngineError>;

    /// Live list for `day`: the current snapshot first, then a fresh one after every change.
    fn subscribe_appointments(&self, day: DayKey) -> BoxStream<'static, Vec<Appointment>>;
    fn subscribe_blocks(&self, day: DayKey) -> BoxStream<'static, Vec<ScheduleBlock>>;
}

#[async_trait]
pub trait ScheduleSource: Send + Sync {
    async fn weekly_schedule(&self) -> Result<WeeklySchedule, EngineError>;
}

#[async_trait]
pub trait WriteSink: Send + Sync {
    async fn create(&self, appointment: Appointment) -> Result<Ulid, EngineError>;
    async fn update(&self, id: Ulid, patch: AppointmentPatch) -> Result<(), EngineError>;
}

/// Everything the engine needs from the outside world.
pub trait AppointmentRepository: AppointmentSource + ScheduleSource + WriteSink {}

impl<T: AppointmentSource + ScheduleSource + WriteSink> AppointmentRepository for T {}

// ── In-memory store ──────────────────────────────────────────────

struct Inner {
    appointments: DashMap<Ulid, Appointment>,
    blocks: DashMap<Ulid, ScheduleBlock>,
    schedule: RwLock<WeeklySchedule>,
    notify: NotifyHub,
}

impl Inner {
    fn appointments_on(&self, day: DayKey) -> Vec<Appointment> {
        let mut list: Vec<Appointment> = self
            .appointments
            .iter()
            .filter(|e| e.interval.day() == day)
            .map(|e| e.value().clone())
            .collect();
        list.sort_by_key(|a| (a.interval.start, a.id));
        list
    }

    fn blocks_on(&self, day: DayKey) -> Vec<ScheduleBlock> {
        let mut list: Vec<ScheduleBlock> = self
            .blocks
            .iter()
            .filter(|e| e.interval.day() == day)
            .map(|e| e.value().clone())
            .collect();
        list.sort_by_key(|b| (b.interval.start, b.id));
        list
    }
}

/// Process-local store backing tests and the demo binary. Cheap to clone;
/// clones share state.
#[derive(Clone)]
pub struct InMemoryStore {
    inner: Arc<Inner>,
}

impl InMemoryStore {
    pub fn new(schedule: WeeklySchedule) -> Self {
        Self {
            inner: Arc::new(Inner {
                appointments: DashMap::new(),
                blocks: DashMap::new(),
                schedule: RwLock::new(schedule),
                notify: NotifyHub::new(),
            }),
        }
    }

    pub fn appointment_count(&self) -> usize {
        self.inner.appointments.len()
    }

    pub async fn set_schedule(&self, schedule: WeeklySchedule) {
        *self.inner.schedule.write().await = schedule;
    }

    pub fn insert_block(&self, block: ScheduleBlock) -> Result<(), EngineError> {
        validate_block(&block)?;
        let (id, day) = (block.id, block.interval.day());
        if self.inner.blocks.contains_key(&id) {
            return Err(EngineError::AlreadyExists(id));
        }
        self.inner.blocks.insert(id, block);
        self.inner.notify.send(day, &DayEvent::BlockAdded { id });
        Ok(())
    }

    pub fn remove_block(&self, id: Ulid) -> Result<ScheduleBlock, EngineError> {
        let (_, block) = self.inner.blocks.remove(&id).ok_or(EngineError::NotFound(id))?;
        self.inner
            .notify
            .send(block.interval.day(), &DayEvent::BlockRemoved { id });
        Ok(block)
    }

    pub fn notify(&self) -> &NotifyHub {
        &self.inner.notify
    }
}

/// Current snapshot, then a re-read of the day on every hub event.
/// A lagged receiver still re-reads, so it only skips intermediate states.
fn day_stream<T, F>(inner: Arc<Inner>, day: DayKey, read: F) -> BoxStream<'static, Vec<T>>
where
    T: Send + 'static,
    F: Fn(&Inner, DayKey) -> Vec<T> + Send + Sync + 'static,
{
    let rx = inner.notify.subscribe(day);
    let first = read(&inner, day);
    let read = Arc::new(read);
    let updates = stream::unfold((inner, rx), move |(inner, mut rx)| {
        let read = read.clone();
        async move {
            match rx.recv().await {
                Ok(_) | Err(RecvError::Lagged(_)) => {
                    let snapshot = read(&inner, day);
                    Some((snapshot, (inner, rx)))
                }
                Err(RecvError::Closed) => None,
            }
        }
    });
    stream::once(async move { first }).chain(updates).boxed()
}

#[async_trait]
impl AppointmentSource for InMemoryStore {
    async fn appointments_for_day(&self, day: DayKey) -> Result<Vec<Appointment>, EngineError> {
        Ok(self.inner.appointments_on(day))
    }

    async fn blocks_for_day(&self, day: DayKey) -> Result<Vec<ScheduleBlock>, EngineError> {
        Ok(self.inner.blocks_on(day))
    }

    async fn get_appointment(&self, id: Ulid) -> Result<Appointment, EngineError> {
        self.inner
            .appointments
            .get(&id)
            .map(|e| e.value().clone())
            .ok_or(EngineError::NotFound(id))
    }

    fn subscribe_appointments(&self, day: DayKey) -> BoxStream<'static, Vec<Appointment>> {
        day_stream(self.inner.clone(), day, Inner::appointments_on)
    }

    fn subscribe_blocks(&self, day: DayKey) -> BoxStream<'static, Vec<ScheduleBlock>> {
        day_stream(self.inner.clone(), day, Inner::blocks_on)
    }
}

#[async_trait]
impl ScheduleSource for InMemoryStore {
    async fn weekly_schedule(&self) -> Result<WeeklySchedule, EngineError> {
        Ok(self.inner.schedule.read().await.clone())
    }
}

#[async_trait]
impl WriteSink for InMemoryStore {
    async fn create(&self, appointment: Appointment) -> Result<Ulid, EngineError> {
        validate_interval(&appointment.interval)?;
        let (id, day) = (appointment.id, appointment.interval.day());
        if self.inner.appointments.contains_key(&id) {
            return Err(EngineError::AlreadyExists(id));
        }
        self.inner.appointments.insert(id, appointment);
        self.inner.notify.send(day, &DayEvent::AppointmentCreated { id });
        Ok(id)
    }

    async fn update(&self, id: Ulid, patch: AppointmentPatch) -> Result<(), EngineError> {
        if let Some(interval) = &patch.interval {
            validate_interval(interval)?;
        }
        let (old_day, new_day) = {
            let mut entry = self
                .inner
                .appointments
                .get_mut(&id)
                .ok_or(EngineError::NotFound(id))?;
            let old_day = entry.interval.day();
            entry.apply(&patch);
            (old_day, entry.interval.day())
        };
        let event = DayEvent::AppointmentUpdated { id };
        self.inner.notify.send(old_day, &event);
        if new_day != old_day {
            self.inner.notify.send(new_day, &event);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day() -> DayKey {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    fn appt(h: u32, minutes: u32) -> Appointment {
        Appointment::scheduled(
            Ulid::new(),
            Ulid::new(),
            TimeInterval::new(day().and_hms_opt(h, 0, 0).unwrap(), minutes),
        )
    }

    fn store() -> InMemoryStore {
        let days = (0..7).map(WeekdayHours::closed).collect();
        InMemoryStore::new(WeeklySchedule::new(days).unwrap())
    }

    #[test]
    fn create_and_read_back() {
        let store = store();
        let a = appt(10, 30);
        let id = tokio_test::block_on(store.create(a.clone())).unwrap();
        assert_eq!(id, a.id);
        assert_eq!(tokio_test::block_on(store.get_appointment(id)).unwrap(), a);
        assert_eq!(tokio_test::block_on(store.appointments_for_day(day())).unwrap(), vec![a]);
    }

    #[tokio::test]
    async fn duplicate_create_rejected() {
        let store = store();
        let a = appt(10, 30);
        store.create(a.clone()).await.unwrap();
        assert!(matches!(store.create(a).await, Err(EngineError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn day_listing_is_sorted_and_keeps_cancelled() {
        let store = store();
        let late = appt(15, 30);
        let mut early = appt(9, 30);
        early.status = AppointmentStatus::Cancelled;
        store.create(late.clone()).await.unwrap();
        store.create(early.clone()).await.unwrap();
        let listed = store.appointments_for_day(day()).await.unwrap();
        assert_eq!(listed, vec![early, late]);
    }

    #[tokio::test]
    async fn update_unknown_is_not_found() {
        let store = store();
        let result = store.update(Ulid::new(), AppointmentPatch::default()).await;
        assert!(matches!(result, Err(EngineError::NotFound(_))));
    }

    #[tokio::test]
    async fn update_moving_day_notifies_both_days() {
        let store = store();
        let a = appt(10, 30);
        store.create(a.clone()).await.unwrap();

        let next = day().succ_opt().unwrap();
        let mut old_rx = store.notify().subscribe(day());
        let mut new_rx = store.notify().subscribe(next);

        let patch = AppointmentPatch {
            interval: Some(TimeInterval::new(next.and_hms_opt(10, 0, 0).unwrap(), 30)),
            ..AppointmentPatch::default()
        };
        store.update(a.id, patch).await.unwrap();

        assert_eq!(old_rx.recv().await.unwrap(), DayEvent::AppointmentUpdated { id: a.id });
        assert_eq!(new_rx.recv().await.unwrap(), DayEvent::AppointmentUpdated { id: a.id });
        assert!(store.appointments_for_day(day()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn subscription_emits_snapshot_then_changes() {
        let store = store();
        let first = appt(9, 60);
        store.create(first.clone()).await.unwrap();

        let mut stream = store.subscribe_appointments(day());
        assert_eq!(stream.next().await.unwrap(), vec![first.clone()]);

        let second = appt(11, 60);
        store.create(second.clone()).await.unwrap();
        assert_eq!(stream.next().await.unwrap(), vec![first, second]);
    }

    #[tokio::test]
    async fn blocks_insert_and_remove() {
        let store = store();
        let block = ScheduleBlock {
            id: Ulid::new(),
            reason: "lunch".into(),
            interval: TimeInterval::new(day().and_hms_opt(12, 0, 0).unwrap(), 60),
        };
        let mut stream = store.subscribe_blocks(day());
        assert!(stream.next().await.unwrap().is_empty());

        store.insert_block(block.clone()).unwrap();
        assert_eq!(stream.next().await.unwrap(), vec![block.clone()]);

        assert_eq!(store.remove_block(block.id).unwrap(), block);
        assert!(stream.next().await.unwrap().is_empty());
        assert!(matches!(store.remove_block(block.id), Err(EngineError::NotFound(_))));
    }
}
