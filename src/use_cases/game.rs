use super::types::{Broadcaster, GameEvent, LoadRequest, SaveBatch, dispatch};
use super::world::World;
use crate::domain::ports::{Clock, Persistence};
use crate::domain::{CharacterRecord, InventoryRecord, StoreError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Notify, mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct LoopConfig {
    pub tick_interval: Duration,
    /// Periodic save pass cadence; 0 disables it.
    pub persist_every_ticks: u64,
}

/// Everything the world loop talks to besides the world itself.
#[derive(Clone)]
pub struct LoopPorts {
    pub broadcaster: Arc<dyn Broadcaster>,
    pub store: Arc<dyn Persistence>,
    pub clock: Arc<dyn Clock>,
}

/// Work for the store worker, executed strictly in the order it was sent.
enum StoreJob {
    Save(SaveBatch),
    Pass(SaveBatch),
    Load(LoadRequest),
    Flush(SaveBatch, oneshot::Sender<usize>),
}

/// Owns the world for the lifetime of the server. Requests are applied as
/// they arrive, between ticks; a tick never awaits I/O.
pub async fn world_task(
    mut world: World,
    mut input_rx: mpsc::Receiver<GameEvent>,
    ports: LoopPorts,
    config: LoopConfig,
    shutdown: Arc<Notify>,
) {
    let mut interval = tokio::time::interval(config.tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let dt = config.tick_interval.as_secs_f32();
    let saving = Arc::new(AtomicBool::new(false));

    // The world never waits on storage, so the job queue is unbounded; save
    // passes are skipped while one is queued, which keeps it short.
    let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
    let (loaded_tx, mut loaded_rx) = mpsc::unbounded_channel();
    let worker = tokio::spawn(store_worker(
        Arc::clone(&ports.store),
        jobs_rx,
        loaded_tx,
        Arc::clone(&saving),
    ));

    info!(
        tick_ms = config.tick_interval.as_millis() as u64,
        players = world.players().len(),
        monsters = world.monsters().len(),
        "world loop started"
    );

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                info!("world loop shutting down");
                break;
            }
            event = input_rx.recv() => {
                let Some(event) = event else {
                    info!("input channel closed; stopping world loop");
                    break;
                };
                let now = ports.clock.now_millis();
                let out = world.handle(event, now);
                dispatch(ports.broadcaster.as_ref(), out);
            }
            Some(event) = loaded_rx.recv() => {
                let now = ports.clock.now_millis();
                let out = world.handle(event, now);
                dispatch(ports.broadcaster.as_ref(), out);
            }
            _ = interval.tick() => {
                let now = ports.clock.now_millis();
                let out = world.tick(dt, now);
                dispatch(ports.broadcaster.as_ref(), out);

                let every = config.persist_every_ticks;
                if every > 0 && world.tick_count() % every == 0 {
                    periodic_save(&world, &jobs_tx, &saving, now);
                }
            }
        }

        // Saves go first so a lookup never overtakes a departure.
        let pending = world.take_pending_saves();
        if !pending.is_empty() {
            submit(&jobs_tx, StoreJob::Save(pending));
        }
        for load in world.take_pending_loads() {
            submit(&jobs_tx, StoreJob::Load(load));
        }
    }

    // Final flush is awaited so a clean shutdown loses nothing.
    let now = ports.clock.now_millis();
    let mut batch = world.take_pending_saves();
    batch.append(&mut world.save_all(now));
    let characters = batch.characters.len();
    let monsters = batch.monsters.len();
    let (done_tx, done_rx) = oneshot::channel();
    submit(&jobs_tx, StoreJob::Flush(batch, done_tx));
    drop(jobs_tx);

    match done_rx.await {
        Ok(failures) => info!(characters, monsters, failures, "final save complete"),
        Err(_) => warn!("store worker stopped before the final save"),
    }
    if let Err(e) = worker.await {
        warn!(error = %e, "store worker task failed");
    }
}

fn submit(jobs_tx: &mpsc::UnboundedSender<StoreJob>, job: StoreJob) {
    if jobs_tx.send(job).is_err() {
        warn!("store worker gone; dropping job");
    }
}

fn periodic_save(
    world: &World,
    jobs_tx: &mpsc::UnboundedSender<StoreJob>,
    saving: &AtomicBool,
    now: u64,
) {
    if saving.swap(true, Ordering::AcqRel) {
        debug!(tick = world.tick_count(), "previous save pass still running; skipping");
        return;
    }
    submit(jobs_tx, StoreJob::Pass(world.save_all(now)));
}

/// Runs every store access the world needs, one at a time and in order, so a
/// later write always lands after an earlier one and a lookup sees every write
/// queued before it.
async fn store_worker(
    store: Arc<dyn Persistence>,
    mut jobs_rx: mpsc::UnboundedReceiver<StoreJob>,
    loaded_tx: mpsc::UnboundedSender<GameEvent>,
    saving: Arc<AtomicBool>,
) {
    while let Some(job) = jobs_rx.recv().await {
        match job {
            StoreJob::Save(batch) => {
                save_batch(store.as_ref(), &batch).await;
            }
            StoreJob::Pass(batch) => {
                let failures = save_batch(store.as_ref(), &batch).await;
                if failures > 0 {
                    warn!(failures, "save pass incomplete; retrying next interval");
                }
                saving.store(false, Ordering::Release);
            }
            StoreJob::Load(request) => {
                let event = match load_selection(store.as_ref(), &request.name).await {
                    Ok((stored, inventory)) => GameEvent::Join {
                        session_id: request.session_id,
                        name: request.name,
                        class: request.class,
                        stored,
                        inventory,
                    },
                    Err(err) => {
                        warn!(character = %request.name, error = %err, "character load failed");
                        GameEvent::SelectFailed {
                            session_id: request.session_id,
                        }
                    }
                };
                if loaded_tx.send(event).is_err() {
                    debug!("world loop gone; dropping loaded character");
                }
            }
            StoreJob::Flush(batch, done) => {
                let failures = save_batch(store.as_ref(), &batch).await;
                let _ = done.send(failures);
            }
        }
    }
}

async fn load_selection(
    store: &dyn Persistence,
    name: &str,
) -> Result<(Option<CharacterRecord>, Option<InventoryRecord>), StoreError> {
    let stored = store.load_character(name).await?;
    let inventory = match stored {
        Some(_) => store.load_inventory(name).await?,
        None => None,
    };
    Ok((stored, inventory))
}

/// Writes every record in the batch, continuing past failures. Returns the
/// number of records that could not be written.
pub async fn save_batch(store: &dyn Persistence, batch: &SaveBatch) -> usize {
    let mut failures = 0;
    for record in &batch.characters {
        if let Err(err) = store.save_character(record).await {
            warn!(character = %record.name, error = %err, "character save failed");
            failures += 1;
        }
    }
    for record in &batch.inventories {
        if let Err(err) = store.save_inventory(record).await {
            warn!(character = %record.character, error = %err, "inventory save failed");
            failures += 1;
        }
    }
    for record in &batch.monsters {
        if let Err(err) = store.save_monster_instance(record).await {
            warn!(monster_id = record.id, error = %err, "monster save failed");
            failures += 1;
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::StoreError;
    use crate::domain::records::{CharacterRecord, InventoryRecord, MonsterRecord};
    use crate::domain::{Character, Position, SessionId};
    use crate::use_cases::monsters::MonsterRegistry;
    use crate::use_cases::test_support::game_data;
    use crate::use_cases::types::{Outbound, ServerEvent};
    use async_trait::async_trait;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU64, AtomicUsize};

    #[derive(Default)]
    struct RecordingBroadcaster {
        sent: Mutex<Vec<Outbound>>,
    }

    impl RecordingBroadcaster {
        fn sent(&self) -> Vec<Outbound> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl Broadcaster for RecordingBroadcaster {
        fn send_to_all(&self, event: ServerEvent) {
            self.sent.lock().unwrap().push(Outbound::All(event));
        }

        fn send_to_one(&self, session_id: SessionId, event: ServerEvent) {
            self.sent.lock().unwrap().push(Outbound::One(session_id, event));
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        characters: Mutex<Vec<CharacterRecord>>,
        monsters: Mutex<Vec<MonsterRecord>>,
        fail_monsters: bool,
        // Delay applied to the first character write only.
        slow_first_save: Option<Duration>,
        character_writes: AtomicUsize,
    }

    #[async_trait]
    impl Persistence for RecordingStore {
        async fn load_character(&self, name: &str) -> Result<Option<CharacterRecord>, StoreError> {
            let saved = self.characters.lock().unwrap();
            Ok(saved.iter().rev().find(|r| r.name == name).cloned())
        }

        async fn save_character(&self, record: &CharacterRecord) -> Result<(), StoreError> {
            let nth = self.character_writes.fetch_add(1, Ordering::Relaxed);
            if let (0, Some(delay)) = (nth, self.slow_first_save) {
                tokio::time::sleep(delay).await;
            }
            self.characters.lock().unwrap().push(record.clone());
            Ok(())
        }

        async fn load_monster_instances(&self) -> Result<Vec<MonsterRecord>, StoreError> {
            Ok(Vec::new())
        }

        async fn save_monster_instance(&self, record: &MonsterRecord) -> Result<(), StoreError> {
            if self.fail_monsters {
                return Err(StoreError::Unavailable("down".into()));
            }
            self.monsters.lock().unwrap().push(record.clone());
            Ok(())
        }

        async fn load_inventory(&self, _character: &str) -> Result<Option<InventoryRecord>, StoreError> {
            Ok(None)
        }

        async fn save_inventory(&self, _record: &InventoryRecord) -> Result<(), StoreError> {
            Ok(())
        }
    }

    struct StepClock(AtomicU64);

    impl Clock for StepClock {
        fn now_millis(&self) -> u64 {
            self.0.fetch_add(50, Ordering::Relaxed)
        }
    }

    struct Harness {
        tx: mpsc::Sender<GameEvent>,
        broadcaster: Arc<RecordingBroadcaster>,
        store: Arc<RecordingStore>,
        shutdown: Arc<Notify>,
        handle: tokio::task::JoinHandle<()>,
    }

    fn start(store: RecordingStore, persist_every_ticks: u64) -> Harness {
        let data = Arc::new(game_data());
        let mut rng = StdRng::seed_from_u64(11);
        let monsters = MonsterRegistry::spawn_from_areas(&data, &mut rng, 0);
        let world = World::new(data, monsters, rng);
        let (tx, rx) = mpsc::channel(16);
        let broadcaster = Arc::new(RecordingBroadcaster::default());
        let store = Arc::new(store);
        let shutdown = Arc::new(Notify::new());
        let ports = LoopPorts {
            broadcaster: broadcaster.clone(),
            store: store.clone(),
            clock: Arc::new(StepClock(AtomicU64::new(1_000))),
        };
        let config = LoopConfig {
            tick_interval: Duration::from_millis(50),
            persist_every_ticks,
        };
        let handle = tokio::spawn(world_task(world, rx, ports, config, shutdown.clone()));
        Harness {
            tx,
            broadcaster,
            store,
            shutdown,
            handle,
        }
    }

    fn select(session_id: SessionId, name: &str) -> GameEvent {
        GameEvent::Select {
            session_id,
            name: name.into(),
            class: "warrior".into(),
        }
    }

    fn walk_west(session_id: SessionId) -> GameEvent {
        GameEvent::Move {
            session_id,
            target: Position::new(-10.0, 0.0, 0.0),
        }
    }

    fn join(session_id: SessionId, name: &str) -> GameEvent {
        GameEvent::Join {
            session_id,
            name: name.into(),
            class: "warrior".into(),
            stored: None,
            inventory: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn when_player_joins_then_only_they_get_selection_and_everyone_gets_world_state() {
        let h = start(RecordingStore::default(), 0);

        h.tx.send(join(1, "Aria")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;

        let sent = h.broadcaster.sent();
        assert!(sent
            .iter()
            .any(|o| matches!(o, Outbound::One(1, ServerEvent::CharacterSelected(_)))));
        let states = sent
            .iter()
            .filter(|o| matches!(o, Outbound::All(ServerEvent::WorldState(_))))
            .count();
        assert!(states >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn when_request_is_invalid_then_rejection_goes_to_requester() {
        let h = start(RecordingStore::default(), 0);

        h.tx.send(GameEvent::Respawn { session_id: 4 }).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(h.broadcaster.sent().iter().any(|o| matches!(
            o,
            Outbound::One(4, ServerEvent::Rejected { reason, .. }) if reason.code() == "NOT_IN_WORLD"
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn when_save_interval_elapses_then_monsters_are_written() {
        let h = start(RecordingStore::default(), 2);

        tokio::time::sleep(Duration::from_millis(130)).await;

        assert!(h.store.monsters.lock().unwrap().len() >= 4);
    }

    #[tokio::test(start_paused = true)]
    async fn when_player_leaves_then_character_is_saved_without_waiting_for_a_pass() {
        let h = start(RecordingStore::default(), 0);

        h.tx.send(join(1, "Aria")).await.unwrap();
        h.tx.send(GameEvent::Leave { session_id: 1 }).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let saved = h.store.characters.lock().unwrap().clone();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].name, "Aria");
    }

    #[tokio::test(start_paused = true)]
    async fn when_shutdown_is_signalled_then_connected_players_are_flushed() {
        let h = start(RecordingStore::default(), 0);
        h.tx.send(join(1, "Aria")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        h.shutdown.notify_one();
        h.handle.await.unwrap();

        assert_eq!(h.store.characters.lock().unwrap().len(), 1);
        assert_eq!(h.store.monsters.lock().unwrap().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn when_slow_save_pass_overlaps_a_departure_then_departure_record_is_written_last() {
        let store = RecordingStore {
            slow_first_save: Some(Duration::from_millis(300)),
            ..Default::default()
        };
        let h = start(store, 1);

        h.tx.send(join(1, "Aria")).await.unwrap();
        h.tx.send(walk_west(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        h.tx.send(GameEvent::Leave { session_id: 1 }).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        let saved = h.store.characters.lock().unwrap().clone();
        let aria: Vec<_> = saved.iter().filter(|r| r.name == "Aria").collect();
        assert!(aria.len() >= 2, "expected a pass and a departure, got {aria:?}");
        let (pass, departure) = (aria[0], aria[aria.len() - 1]);
        assert!(
            departure.position.x < pass.position.x,
            "older pass record landed last: pass {:?}, last {:?}",
            pass.position,
            departure.position
        );
    }

    #[tokio::test(start_paused = true)]
    async fn when_character_is_reselected_while_departure_save_is_slow_then_it_resumes_from_departure() {
        let store = RecordingStore {
            slow_first_save: Some(Duration::from_millis(300)),
            ..Default::default()
        };
        let h = start(store, 0);

        h.tx.send(select(1, "Aria")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        h.tx.send(walk_west(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        h.tx.send(GameEvent::Leave { session_id: 1 }).await.unwrap();
        h.tx.send(select(2, "Aria")).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        let departure = h.store.characters.lock().unwrap()[0].clone();
        assert!(departure.position.x < 0.0, "player never moved: {departure:?}");
        let resumed = h.broadcaster.sent().into_iter().find_map(|o| match o {
            Outbound::One(2, ServerEvent::CharacterSelected(details)) => Some(details),
            _ => None,
        });
        let resumed = resumed.expect("second session should get its character");
        assert_eq!(resumed.position, departure.position);
    }

    #[tokio::test(start_paused = true)]
    async fn when_connection_leaves_before_its_character_loads_then_nobody_joins() {
        let h = start(RecordingStore::default(), 0);

        h.tx.send(select(1, "Aria")).await.unwrap();
        h.tx.send(GameEvent::Leave { session_id: 1 }).await.unwrap();
        h.tx.send(select(2, "Aria")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;

        let sent = h.broadcaster.sent();
        assert!(!sent
            .iter()
            .any(|o| matches!(o, Outbound::One(1, ServerEvent::CharacterSelected(_)))));
        assert!(sent
            .iter()
            .any(|o| matches!(o, Outbound::One(2, ServerEvent::CharacterSelected(_)))));
        let last_state = sent.iter().rev().find_map(|o| match o {
            Outbound::All(ServerEvent::WorldState(update)) => Some(update.players.clone()),
            _ => None,
        });
        let players = last_state.expect("ticks should have run");
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].session_id, 2);
    }

    #[tokio::test]
    async fn when_store_fails_then_failures_are_counted_and_other_records_still_written() {
        let store = RecordingStore {
            fail_monsters: true,
            ..Default::default()
        };
        let data = game_data();
        let mut rng = StdRng::seed_from_u64(1);
        let batch = SaveBatch {
            monsters: MonsterRegistry::spawn_from_areas(&data, &mut rng, 0).records(0),
            characters: vec![
                Character::create("Aria", "warrior", &data.classes["warrior"])
                    .to_record(Position::default()),
            ],
            inventories: Vec::new(),
        };

        let failures = save_batch(&store, &batch).await;

        assert_eq!(failures, 4);
        assert_eq!(store.characters.lock().unwrap().len(), 1);
    }
}
