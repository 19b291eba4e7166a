//! Keeps the local projection in step with the remote store.
//!
//! Mutations are optimistic: the projection changes immediately and the
//! matching remote writes are queued for a background writer that nobody
//! waits for. The writer applies queued writes one at a time, in the order
//! the mutations were made, so a toggle never overtakes the insert of the
//! row it updates. A failed write is logged and counted; the local change
//! stays in place. Only `add_guest` and `add_event` wait for the store,
//! because they need the generated id before anything can be applied
//! locally.
//!
//! Mutating methods spawn onto the current Tokio runtime and must be called
//! from within one.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::attendance::denormalize;
use crate::error::{PlannerError, PlannerResult};
use crate::model::{EventFields, EventId, EventWithAttendees, Guest, GuestId, NewGuest};
use crate::remote::{Remote, RemoteEffect};
use crate::state::{LoadState, PlannerState};
use crate::store::Store;
use crate::store::protocol::Collection;

/// Counters for fire-and-forget writes.
#[derive(Debug, Default)]
pub struct SyncStats {
    dispatched: AtomicU64,
    failed: AtomicU64,
}

impl SyncStats {
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    /// Writes whose failure left the local projection ahead of the store.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

/// Reads that failed during a load. The projection keeps its previous
/// contents for whatever could not be read.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub failures: Vec<(Collection, PlannerError)>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

enum Job {
    Apply(Vec<RemoteEffect>),
    Flush(oneshot::Sender<()>),
}

/// The background task that owns the write queue.
struct Writer {
    queue: mpsc::UnboundedSender<Job>,
    task: JoinHandle<()>,
}

pub struct Synchronizer {
    remote: Remote,
    state: PlannerState,
    writer: Option<Writer>,
    stats: Arc<SyncStats>,
}

impl Synchronizer {
    pub fn new(store: Store) -> Self {
        Synchronizer {
            remote: Remote::new(store),
            state: PlannerState::default(),
            writer: None,
            stats: Arc::new(SyncStats::default()),
        }
    }

    pub fn state(&self) -> &PlannerState {
        &self.state
    }

    pub fn guests(&self) -> &[Guest] {
        &self.state.guests
    }

    pub fn events(&self) -> &[EventWithAttendees] {
        &self.state.events
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Fetch guests, events and attendance rows concurrently and rebuild the
    /// projection once all three reads have settled.
    pub async fn load(&mut self) -> LoadReport {
        let (guests, events, attendees) = tokio::join!(
            self.remote.guests(),
            self.remote.events(),
            self.remote.attendees()
        );

        let mut report = LoadReport::default();

        match guests {
            Ok(guests) => self.state.guests = guests,
            Err(e) => report.failures.push((Collection::Guests, e)),
        }

        match (events, attendees) {
            (Ok(events), Ok(attendees)) => {
                self.state.events = denormalize(events, &attendees);
            }
            (events, attendees) => {
                if let Err(e) = events {
                    report.failures.push((Collection::Events, e));
                }
                if let Err(e) = attendees {
                    report.failures.push((Collection::EventAttendees, e));
                }
            }
        }

        for (collection, error) in &report.failures {
            warn!(%collection, %error, "initial read failed");
        }

        self.state.load_state = LoadState::Loaded;
        info!(
            guests = self.state.guests.len(),
            events = self.state.events.len(),
            "planner state loaded"
        );

        report
    }

    /// Re-fetch everything, discarding any divergence left by failed writes.
    pub async fn reload(&mut self) -> LoadReport {
        self.settle().await;
        self.state.load_state = LoadState::Loading;
        self.load().await
    }

    /// Returns `false` if the event is not known locally.
    pub fn toggle_attendance(&mut self, event_id: &EventId, guest_id: &GuestId) -> bool {
        let effects = self.state.toggle_attendance(event_id, guest_id);
        self.dispatch_if_found(effects)
    }

    /// Returns `false` if the event is unknown or the cost is not finite.
    pub fn update_event_cost(&mut self, event_id: &EventId, total_cost: f64) -> bool {
        let effects = self.state.update_event_cost(event_id, total_cost);
        self.dispatch_if_found(effects)
    }

    /// Create a guest and give it a not-attending entry in every event.
    ///
    /// Waits for the store to assign the id; if that insert fails nothing is
    /// applied locally and the error is returned.
    pub async fn add_guest(&mut self, name: &str) -> PlannerResult<Guest> {
        let guest = self
            .remote
            .create_guest(&NewGuest {
                name: name.to_string(),
            })
            .await?;
        debug!(guest = %guest.id, "guest created");

        let effects = self.state.insert_guest(guest.clone());
        self.dispatch(effects);
        Ok(guest)
    }

    pub fn edit_guest(&mut self, guest_id: &GuestId, name: &str) -> bool {
        let effects = self.state.rename_guest(guest_id, name);
        self.dispatch_if_found(effects)
    }

    pub fn delete_guest(&mut self, guest_id: &GuestId) -> bool {
        let effects = self.state.remove_guest(guest_id);
        self.dispatch_if_found(effects)
    }

    /// Create an event with every current guest marked not attending.
    ///
    /// Waits for the store to assign the id; if that insert fails nothing is
    /// applied locally and the error is returned.
    pub async fn add_event(&mut self, fields: &EventFields) -> PlannerResult<EventId> {
        let event = self.remote.create_event(fields).await?;
        let event_id = event.id.clone();
        debug!(event = %event_id, "event created");

        let effects = self.state.insert_event(event);
        self.dispatch(effects);
        Ok(event_id)
    }

    pub fn edit_event(&mut self, event_id: &EventId, fields: &EventFields) -> bool {
        let effects = self.state.edit_event(event_id, fields);
        self.dispatch_if_found(effects)
    }

    pub fn delete_event(&mut self, event_id: &EventId) -> bool {
        let effects = self.state.remove_event(event_id);
        self.dispatch_if_found(effects)
    }

    /// Wait for every dispatched write to finish.
    pub async fn settle(&mut self) {
        let Some(writer) = &self.writer else {
            return;
        };

        let (done, flushed) = oneshot::channel();
        if writer.queue.send(Job::Flush(done)).is_ok() && flushed.await.is_ok() {
            return;
        }

        // The writer is gone; whatever was still queued is lost
        if let Some(writer) = self.writer.take() {
            if let Err(error) = writer.task.await {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                warn!(%error, "remote writer aborted");
            }
        }
    }

    fn dispatch_if_found(&mut self, effects: Option<Vec<RemoteEffect>>) -> bool {
        match effects {
            Some(effects) => {
                self.dispatch(effects);
                true
            }
            None => false,
        }
    }

    /// Queue the effects of one mutation behind everything dispatched so far.
    fn dispatch(&mut self, effects: Vec<RemoteEffect>) {
        let effects: Vec<_> = effects.into_iter().filter(|e| !e.is_noop()).collect();
        if effects.is_empty() {
            return;
        }

        let count = effects.len() as u64;
        self.stats.dispatched.fetch_add(count, Ordering::Relaxed);

        if self.writer().send(Job::Apply(effects)).is_err() {
            self.stats.failed.fetch_add(count, Ordering::Relaxed);
            warn!(count, "remote writer unavailable, writes dropped");
        }
    }

    /// The write queue, starting the writer on first use or after it died.
    fn writer(&mut self) -> &mpsc::UnboundedSender<Job> {
        if self.writer.as_ref().is_some_and(|w| w.task.is_finished()) {
            warn!("remote writer stopped, starting a new one");
            self.writer = None;
        }

        let (remote, stats) = (&self.remote, &self.stats);
        let writer = self
            .writer
            .get_or_insert_with(|| Writer::spawn(remote.clone(), Arc::clone(stats)));
        &writer.queue
    }
}

impl Writer {
    fn spawn(remote: Remote, stats: Arc<SyncStats>) -> Self {
        let (queue, jobs) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_writer(remote, stats, jobs));
        Writer { queue, task }
    }
}

/// Drain the queue in order. Each batch runs on its own task so a panic
/// inside a store call is counted instead of stopping the writer.
async fn run_writer(
    remote: Remote,
    stats: Arc<SyncStats>,
    mut jobs: mpsc::UnboundedReceiver<Job>,
) {
    while let Some(job) = jobs.recv().await {
        match job {
            Job::Apply(effects) => {
                let batch = tokio::spawn(apply_batch(
                    remote.clone(),
                    Arc::clone(&stats),
                    effects,
                ));
                if let Err(error) = batch.await {
                    stats.failed.fetch_add(1, Ordering::Relaxed);
                    warn!(%error, "remote write task aborted");
                }
            }
            Job::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

async fn apply_batch(remote: Remote, stats: Arc<SyncStats>, effects: Vec<RemoteEffect>) {
    for effect in effects {
        let collection = effect.collection();
        debug!(%collection, ?effect, "applying remote write");
        if let Err(error) = remote.apply(&effect).await {
            stats.failed.fetch_add(1, Ordering::Relaxed);
            warn!(%collection, %error, ?effect, "remote write failed, local state kept");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Event, EventAttendee};
    use crate::store::protocol::{Command, Request};
    use crate::store::{MemoryStore, RemoteStore};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use serde_json::{Value, json};
    use std::time::Duration;

    /// A memory store that is slow to bulk insert and can panic on updates.
    struct Laggy {
        memory: Arc<MemoryStore>,
        bulk_insert_delay: Duration,
        panic_on_update: bool,
    }

    #[async_trait]
    impl RemoteStore for Laggy {
        async fn execute(&self, request: Request) -> PlannerResult<Value> {
            match request.command {
                Command::InsertMany => tokio::time::sleep(self.bulk_insert_delay).await,
                Command::Update if self.panic_on_update => panic!("update exploded"),
                _ => {}
            }
            self.memory.execute(request).await
        }
    }

    fn planner() -> (Arc<MemoryStore>, Synchronizer) {
        let memory = Arc::new(MemoryStore::new());
        let sync = Synchronizer::new(Store::from_arc(memory.clone()));
        (memory, sync)
    }

    fn laggy_planner(panic_on_update: bool) -> (Arc<MemoryStore>, Synchronizer) {
        let memory = Arc::new(MemoryStore::new());
        let sync = Synchronizer::new(Store::new(Laggy {
            memory: memory.clone(),
            bulk_insert_delay: Duration::from_millis(50),
            panic_on_update,
        }));
        (memory, sync)
    }

    fn bbq() -> EventFields {
        EventFields {
            title: "BBQ".into(),
            event_date: NaiveDate::from_ymd_opt(2025, 6, 21),
            time: "18:00".into(),
            location: "Park".into(),
            total_cost: 100.0,
        }
    }

    fn guest_id(sync: &Synchronizer, name: &str) -> GuestId {
        sync.guests()
            .iter()
            .find(|g| g.name == name)
            .map(|g| g.id.clone())
            .unwrap()
    }

    /// What a fresh load from the store would produce right now.
    async fn rebuilt(memory: &MemoryStore) -> Vec<EventWithAttendees> {
        let mut events: Vec<Event> = memory.rows_as(Collection::Events).unwrap();
        events.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        let attendees: Vec<EventAttendee> = memory.rows_as(Collection::EventAttendees).unwrap();
        denormalize(events, &attendees)
    }

    #[tokio::test]
    async fn test_load_builds_attendance_maps() {
        let (memory, mut sync) = planner();
        memory
            .seed(
                Collection::Guests,
                &[
                    json!({"id": "g2", "name": "B", "created_at": "2025-01-02T00:00:00.000000Z"}),
                    json!({"id": "g1", "name": "A", "created_at": "2025-01-01T00:00:00.000000Z"}),
                ],
            )
            .unwrap();
        memory
            .seed(
                Collection::Events,
                &[json!({
                    "id": "e1", "title": "BBQ", "event_date": "2025-06-21", "time": "18:00",
                    "location": "Park", "total_cost": 90, "created_at": "2025-01-03T00:00:00.000000Z"
                })],
            )
            .unwrap();
        memory
            .seed(
                Collection::EventAttendees,
                &[json!({"id": "a1", "event_id": "e1", "guest_id": "g1", "is_attending": true})],
            )
            .unwrap();

        assert!(sync.is_loading());
        let report = sync.load().await;

        assert!(report.is_complete());
        assert!(!sync.is_loading());
        let names: Vec<_> = sync.guests().iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        let event = &sync.events()[0];
        assert!(event.is_attending(&"g1".into()));
        // g2 has no row yet and reads as not attending
        assert!(!event.is_attending(&"g2".into()));
        assert_eq!(event.cost_per_person(), 90.0);
    }

    #[tokio::test]
    async fn test_load_keeps_guests_when_events_fail() {
        let (memory, mut sync) = planner();
        memory
            .seed(Collection::Guests, &[json!({"id": "g1", "name": "A"})])
            .unwrap();
        memory.fail(Command::Select, Collection::EventAttendees);

        let report = sync.load().await;

        assert!(!sync.is_loading());
        assert_eq!(sync.guests().len(), 1);
        assert!(sync.events().is_empty());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, Collection::EventAttendees);
    }

    #[tokio::test]
    async fn test_bbq_scenario() {
        let (memory, mut sync) = planner();
        sync.load().await;
        sync.add_guest("A").await.unwrap();
        sync.add_guest("B").await.unwrap();
        let (a, b) = (guest_id(&sync, "A"), guest_id(&sync, "B"));

        let event_id = sync.add_event(&bbq()).await.unwrap();
        {
            let event = sync.state().event(&event_id).unwrap();
            assert_eq!(event.attendees.len(), 2);
            assert!(!event.is_attending(&a) && !event.is_attending(&b));
            assert_eq!(event.event.total_cost, 100.0);
        }

        assert!(sync.toggle_attendance(&event_id, &a));
        let event = sync.state().event(&event_id).unwrap();
        assert!(event.is_attending(&a) && !event.is_attending(&b));
        assert_eq!(event.cost_per_person(), 100.0);

        sync.toggle_attendance(&event_id, &b);
        assert_eq!(sync.state().event(&event_id).unwrap().cost_per_person(), 50.0);

        assert!(sync.delete_guest(&a));
        let event = sync.state().event(&event_id).unwrap();
        assert_eq!(event.attendees.len(), 1);
        assert!(event.is_attending(&b));

        sync.settle().await;
        assert_eq!(sync.stats().failed(), 0);
        assert_eq!(sync.events(), rebuilt(&memory).await.as_slice());
        assert_eq!(memory.rows(Collection::Guests).len(), 1);
    }

    #[tokio::test]
    async fn test_add_guest_extends_existing_events() {
        let (memory, mut sync) = planner();
        sync.load().await;
        let first = sync.add_event(&bbq()).await.unwrap();
        let second = sync.add_event(&bbq()).await.unwrap();

        let guest = sync.add_guest("C").await.unwrap();

        for id in [&first, &second] {
            let event = sync.state().event(id).unwrap();
            assert_eq!(event.attendees.get(&guest.id), Some(&false));
        }
        sync.settle().await;
        assert_eq!(memory.rows(Collection::EventAttendees).len(), 2);
        assert_eq!(sync.events(), rebuilt(&memory).await.as_slice());
    }

    #[tokio::test]
    async fn test_add_event_without_guests_skips_bulk_insert() {
        let (memory, mut sync) = planner();
        sync.load().await;

        sync.add_event(&bbq()).await.unwrap();
        sync.settle().await;

        assert!(
            !memory
                .executed()
                .contains(&(Command::InsertMany, Collection::EventAttendees))
        );
        assert_eq!(sync.stats().dispatched(), 0);

        sync.add_guest("A").await.unwrap();
        sync.settle().await;
        assert_eq!(sync.stats().dispatched(), 1);
    }

    #[tokio::test]
    async fn test_failed_insert_aborts_without_local_change() {
        let (memory, mut sync) = planner();
        sync.load().await;
        sync.add_event(&bbq()).await.unwrap();
        memory.fail(Command::Insert, Collection::Guests);

        let result = sync.add_guest("A").await;

        assert!(matches!(result, Err(PlannerError::Store(_))));
        assert!(sync.guests().is_empty());
        assert!(sync.events()[0].attendees.is_empty());

        memory.omit_inserted_rows(true);
        let result = sync.add_event(&bbq()).await;
        assert!(matches!(result, Err(PlannerError::MissingRow(_))));
        assert_eq!(sync.events().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_write_keeps_optimistic_state() {
        let (memory, mut sync) = planner();
        sync.load().await;
        sync.add_guest("A").await.unwrap();
        let event_id = sync.add_event(&bbq()).await.unwrap();
        let a = guest_id(&sync, "A");
        sync.settle().await;

        memory.set_offline(true);
        sync.toggle_attendance(&event_id, &a);
        sync.update_event_cost(&event_id, 30.0);
        sync.settle().await;

        let event = sync.state().event(&event_id).unwrap();
        assert!(event.is_attending(&a));
        assert_eq!(event.event.total_cost, 30.0);
        assert_eq!(sync.stats().failed(), 2);

        // Reloading reconciles with what the store actually holds
        memory.set_offline(false);
        let report = sync.reload().await;
        assert!(report.is_complete());
        let event = sync.state().event(&event_id).unwrap();
        assert!(!event.is_attending(&a));
        assert_eq!(event.event.total_cost, 100.0);
    }

    #[tokio::test]
    async fn test_delete_event_removes_rows() {
        let (memory, mut sync) = planner();
        sync.load().await;
        sync.add_guest("A").await.unwrap();
        let keep = sync.add_event(&bbq()).await.unwrap();
        let dropped = sync.add_event(&bbq()).await.unwrap();

        assert!(sync.delete_event(&dropped));
        assert!(!sync.delete_event(&dropped));
        sync.settle().await;

        assert_eq!(sync.events().len(), 1);
        assert_eq!(sync.events()[0].id(), &keep);
        let rows: Vec<EventAttendee> = memory.rows_as(Collection::EventAttendees).unwrap();
        assert!(rows.iter().all(|r| r.event_id == keep));
        assert_eq!(sync.guests().len(), 1);
    }

    #[tokio::test]
    async fn test_edit_guest_and_event() {
        let (memory, mut sync) = planner();
        sync.load().await;
        let guest = sync.add_guest("Ana").await.unwrap();
        let event_id = sync.add_event(&bbq()).await.unwrap();

        assert!(sync.edit_guest(&guest.id, "Ana María"));
        let mut fields = bbq();
        fields.title = "Dinner".into();
        fields.total_cost = 60.0;
        assert!(sync.edit_event(&event_id, &fields));
        assert!(!sync.edit_guest(&"missing".into(), "X"));
        sync.settle().await;

        let guests: Vec<Guest> = memory.rows_as(Collection::Guests).unwrap();
        assert_eq!(guests[0].name, "Ana María");
        let events: Vec<Event> = memory.rows_as(Collection::Events).unwrap();
        assert_eq!(events[0].title, "Dinner");
        assert_eq!(events[0].total_cost, 60.0);
        assert_eq!(sync.guests()[0].name, "Ana María");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_toggle_waits_for_slow_row_insert() {
        let (memory, mut sync) = laggy_planner(false);
        sync.load().await;
        let guest = sync.add_guest("A").await.unwrap();
        let event_id = sync.add_event(&bbq()).await.unwrap();

        // The attendee row for A is still being inserted
        assert!(sync.toggle_attendance(&event_id, &guest.id));
        sync.reload().await;

        assert_eq!(sync.stats().failed(), 0);
        assert!(sync.state().event(&event_id).unwrap().is_attending(&guest.id));
        assert_eq!(sync.events(), rebuilt(&memory).await.as_slice());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_delete_guest_right_after_add_leaves_no_rows() {
        let (memory, mut sync) = laggy_planner(false);
        sync.load().await;
        sync.add_event(&bbq()).await.unwrap();
        sync.add_event(&bbq()).await.unwrap();

        let guest = sync.add_guest("A").await.unwrap();
        assert!(sync.delete_guest(&guest.id));
        sync.settle().await;

        let rows: Vec<EventAttendee> = memory.rows_as(Collection::EventAttendees).unwrap();
        assert!(rows.iter().all(|r| r.guest_id != guest.id));
        assert!(memory.rows(Collection::Guests).is_empty());
        assert_eq!(sync.stats().failed(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_panicking_write_is_counted_and_writer_survives() {
        let (memory, mut sync) = laggy_planner(true);
        sync.load().await;
        let guest = sync.add_guest("A").await.unwrap();
        let event_id = sync.add_event(&bbq()).await.unwrap();

        sync.toggle_attendance(&event_id, &guest.id);
        sync.settle().await;
        assert_eq!(sync.stats().failed(), 1);

        assert!(sync.delete_event(&event_id));
        sync.settle().await;
        assert!(memory.rows(Collection::Events).is_empty());
        assert!(memory.rows(Collection::EventAttendees).is_empty());
        assert_eq!(sync.stats().failed(), 1);
    }

    #[tokio::test]
    async fn test_edit_event_moves_date() {
        let (memory, mut sync) = planner();
        sync.load().await;
        let event_id = sync.add_event(&bbq()).await.unwrap();
        let moved = NaiveDate::from_ymd_opt(2025, 7, 4).unwrap();

        let mut fields = bbq();
        fields.event_date = Some(moved);
        assert!(sync.edit_event(&event_id, &fields));
        assert_eq!(sync.state().event(&event_id).unwrap().event.event_date, moved);
        sync.settle().await;

        let events: Vec<Event> = memory.rows_as(Collection::Events).unwrap();
        assert_eq!(events[0].event_date, moved);
    }

    #[tokio::test]
    async fn test_non_finite_cost_is_not_written() {
        let (memory, mut sync) = planner();
        sync.load().await;
        let event_id = sync.add_event(&bbq()).await.unwrap();

        assert!(!sync.update_event_cost(&event_id, f64::NAN));
        sync.settle().await;

        assert_eq!(sync.stats().dispatched(), 0);
        assert_eq!(sync.state().event(&event_id).unwrap().event.total_cost, 100.0);
        let report = sync.reload().await;
        assert!(report.is_complete());
        assert_eq!(memory.rows(Collection::Events).len(), 1);
    }
}
