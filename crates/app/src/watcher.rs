//! Schedule watcher — periodic reconciliation of scheduled devices.
//!
//! The watcher is either idle (no timer) or watching (one background task
//! ticking at a fixed interval). Every change to the active set restarts the
//! timer so the next tick is a full interval away.
//!
//! A tick runs in two phases:
//! 1. **actuate**, under the registry lock: evaluate each active device and
//!    switch the ones whose desired state differs from their recorded status;
//! 2. **dispatch**, with the lock released: publish a `scheduled-switch`
//!    event and record the transition, each call bounded by a timeout.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use pinhub_domain::device::SwitchState;
use pinhub_domain::event::Event;
use pinhub_domain::id::DeviceId;
use pinhub_domain::switch_record::SwitchRecord;

use crate::ports::{Clock, EventPublisher, OutputPort, SwitchRecorder};
use crate::registry::SharedRegistry;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Timing knobs for the watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherConfig {
    pub interval: Duration,
    pub dispatch_timeout: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            dispatch_timeout: Duration::from_secs(5),
        }
    }
}

/// One device that changed state during a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub device_id: DeviceId,
    pub device_name: String,
    pub from: SwitchState,
    pub to: SwitchState,
    pub scheduled_by: Option<String>,
}

/// What a single tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Scheduled devices looked at.
    pub evaluated: usize,
    pub switched: Vec<Transition>,
    /// Devices whose actuation failed; their status is left as it was.
    pub failed: usize,
}

struct WatcherCore<P: OutputPort, R, E, C> {
    registry: SharedRegistry<P>,
    active: Mutex<Vec<DeviceId>>,
    recorder: R,
    publisher: E,
    clock: C,
    dispatch_timeout: Duration,
    /// Ticks dispatch one at a time so switch records land in tick order.
    dispatching: tokio::sync::Mutex<()>,
}

impl<P, R, E, C> WatcherCore<P, R, E, C>
where
    P: OutputPort,
    R: SwitchRecorder + Send + Sync + 'static,
    E: EventPublisher + Send + Sync + 'static,
    C: Clock,
{
    fn actuate(&self) -> ReconcileReport {
        let now = self.clock.now();
        let active = lock(&self.active).clone();
        let mut report = ReconcileReport::default();
        let mut registry = self.registry.lock();

        for device_id in active {
            let Some(device) = registry.get_device(device_id) else {
                tracing::debug!(%device_id, "scheduled device no longer registered");
                continue;
            };
            let Some(schedule) = device.schedule else {
                continue;
            };
            report.evaluated += 1;

            let desired = SwitchState::from(schedule.is_active_at(now));
            if desired == device.status {
                continue;
            }
            let pin = device.pin;
            let device_name = device.name.clone();
            let scheduled_by = device.scheduled_by.clone();

            if let Err(err) = registry.switch_device(device_id, desired.is_on()) {
                report.failed += 1;
                tracing::warn!(%device_id, %pin, %err, "scheduled switch failed, status left unchanged");
                continue;
            }
            match registry.set_status(device_id, desired) {
                Ok(from) => {
                    tracing::info!(%device_id, %pin, %from, to = %desired, "scheduled switch");
                    report.switched.push(Transition {
                        device_id,
                        device_name,
                        from,
                        to: desired,
                        scheduled_by,
                    });
                }
                Err(err) => {
                    report.failed += 1;
                    tracing::warn!(%device_id, %err, "failed to record scheduled status");
                }
            }
        }
        drop(registry);

        tracing::debug!(
            evaluated = report.evaluated,
            switched = report.switched.len(),
            failed = report.failed,
            "reconcile tick"
        );
        report
    }

    async fn dispatch(&self, transitions: &[Transition]) {
        let _turn = self.dispatching.lock().await;
        for transition in transitions {
            let event = Event::scheduled_switch(
                transition.device_id,
                &transition.device_name,
                transition.to,
                transition.scheduled_by.as_deref(),
            );
            let record = SwitchRecord::new(
                transition.device_id,
                transition.from,
                transition.to,
                event.actor_id.clone(),
            );
            let device_id = transition.device_id;

            match tokio::time::timeout(self.dispatch_timeout, self.publisher.publish(event)).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => tracing::warn!(%device_id, %err, "failed to broadcast scheduled switch"),
                Err(_) => tracing::warn!(%device_id, "broadcast of scheduled switch timed out"),
            }
            match tokio::time::timeout(self.dispatch_timeout, self.recorder.record_switch(record)).await {
                Ok(Ok(_)) => {}
                Ok(Err(err)) => tracing::warn!(%device_id, %err, "failed to persist scheduled switch"),
                Err(_) => tracing::warn!(%device_id, "persisting scheduled switch timed out"),
            }
        }
    }
}

/// Drives scheduled devices from a recurring background task.
pub struct ScheduleWatcher<P: OutputPort, R, E, C> {
    core: Arc<WatcherCore<P, R, E, C>>,
    interval: Duration,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl<P, R, E, C> ScheduleWatcher<P, R, E, C>
where
    P: OutputPort,
    R: SwitchRecorder + Send + Sync + 'static,
    E: EventPublisher + Send + Sync + 'static,
    C: Clock,
{
    /// Create an idle watcher.
    pub fn new(
        registry: SharedRegistry<P>,
        recorder: R,
        publisher: E,
        clock: C,
        config: WatcherConfig,
    ) -> Self {
        Self {
            core: Arc::new(WatcherCore {
                registry,
                active: Mutex::new(Vec::new()),
                recorder,
                publisher,
                clock,
                dispatch_timeout: config.dispatch_timeout,
                dispatching: tokio::sync::Mutex::new(()),
            }),
            interval: config.interval,
            timer: Mutex::new(None),
        }
    }

    /// Add a device to the active set (replacing any previous entry) and
    /// restart the timer.
    ///
    /// Must be called from within a tokio runtime.
    #[tracing::instrument(skip(self))]
    pub fn schedule_device(&self, device_id: DeviceId) {
        {
            let mut active = lock(&self.core.active);
            active.retain(|id| *id != device_id);
            active.push(device_id);
        }
        self.restart();
    }

    /// Drop a device from the active set, restarting the timer if it was there.
    ///
    /// Returns whether the device was active. The watcher keeps ticking even
    /// when the set becomes empty.
    #[tracing::instrument(skip(self))]
    pub fn remove_scheduled_device(&self, device_id: DeviceId) -> bool {
        let removed = {
            let mut active = lock(&self.core.active);
            let before = active.len();
            active.retain(|id| *id != device_id);
            active.len() != before
        };
        if removed {
            self.restart();
        }
        removed
    }

    /// Ids currently in the active set, in scheduling order.
    #[must_use]
    pub fn active_devices(&self) -> Vec<DeviceId> {
        lock(&self.core.active).clone()
    }

    #[must_use]
    pub fn is_watching(&self) -> bool {
        lock(&self.timer).is_some()
    }

    /// Run one tick now and wait for its notifications to go out.
    pub async fn reconcile(&self) -> ReconcileReport {
        let report = self.core.actuate();
        self.core.dispatch(&report.switched).await;
        report
    }

    /// Cancel the timer. The active set is kept.
    pub fn stop(&self) {
        if let Some(handle) = lock(&self.timer).take() {
            handle.abort();
            tracing::info!("schedule watcher stopped");
        }
    }

    fn restart(&self) {
        let mut timer = lock(&self.timer);
        if let Some(handle) = timer.take() {
            handle.abort();
        }
        let core = Arc::clone(&self.core);
        let interval = self.interval;
        *timer = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let report = core.actuate();
                if report.switched.is_empty() {
                    continue;
                }
                // Dispatch outlives the timer so a restart never drops notifications.
                let core = Arc::clone(&core);
                tokio::spawn(async move { core.dispatch(&report.switched).await });
            }
        }));
        tracing::debug!(interval_secs = interval.as_secs(), "schedule watcher restarted");
    }
}

impl<P: OutputPort, R, E, C> Drop for ScheduleWatcher<P, R, E, C> {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.timer).take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;

    use super::*;
    use crate::output_manager::OutputManager;
    use crate::registry::DeviceRegistry;
    use crate::test_support::{FakePort, ManualClock, SpyPublisher, SpyRecorder, saturday, wednesday};
    use pinhub_domain::device::Device;
    use pinhub_domain::error::HubError;
    use pinhub_domain::event::EventType;
    use pinhub_domain::house::House;
    use pinhub_domain::id::RoomId;
    use pinhub_domain::pin::Pin;
    use pinhub_domain::room::Room;
    use pinhub_domain::schedule::Schedule;

    type TestWatcher<E = Arc<SpyPublisher>> =
        ScheduleWatcher<Arc<FakePort>, Arc<SpyRecorder>, E, Arc<ManualClock>>;

    struct Fixture<E = Arc<SpyPublisher>> {
        port: Arc<FakePort>,
        registry: SharedRegistry<Arc<FakePort>>,
        recorder: Arc<SpyRecorder>,
        clock: Arc<ManualClock>,
        watcher: TestWatcher<E>,
        room_id: RoomId,
    }

    fn fixture_with<E>(publisher: E) -> Fixture<E>
    where
        E: EventPublisher + Send + Sync + 'static,
    {
        let port = Arc::new(FakePort::default());
        let mut house = House::new("Home").unwrap();
        let room = Room::builder().house_id(house.id).name("Garden").build().unwrap();
        let room_id = room.id;
        house.rooms.push(room);
        let registry = SharedRegistry::new(
            DeviceRegistry::load(OutputManager::new(Arc::clone(&port)), Some(house)).unwrap(),
        );
        let recorder = Arc::new(SpyRecorder::default());
        let clock = Arc::new(ManualClock::wednesday_at(9, 0));
        let watcher = ScheduleWatcher::new(
            registry.clone(),
            Arc::clone(&recorder),
            publisher,
            Arc::clone(&clock),
            WatcherConfig::default(),
        );
        Fixture {
            port,
            registry,
            recorder,
            clock,
            watcher,
            room_id,
        }
    }

    fn fixture() -> (Fixture, Arc<SpyPublisher>) {
        let publisher = Arc::new(SpyPublisher::default());
        (fixture_with(Arc::clone(&publisher)), publisher)
    }

    fn add_scheduled<E>(fx: &Fixture<E>, pin: u8, start: &str, stop: &str) -> DeviceId {
        let device = Device::builder()
            .room_id(fx.room_id)
            .name(format!("Sprinkler {pin}"))
            .pin(pin)
            .schedule(Schedule::parse("Mon,Tue,Wed,Thu,Fri", start, stop).unwrap())
            .scheduled_by("alice")
            .build()
            .unwrap();
        let id = device.id;
        fx.registry.lock().add_device(device).unwrap();
        id
    }

    fn status_of<E>(fx: &Fixture<E>, id: DeviceId) -> SwitchState {
        fx.registry.lock().get_device(id).unwrap().status
    }

    #[tokio::test]
    async fn should_replace_entry_when_scheduling_same_device_twice() {
        let (fx, _) = fixture();
        let id = add_scheduled(&fx, 17, "08:00", "18:00");

        fx.watcher.schedule_device(id);
        fx.watcher.schedule_device(id);

        assert_eq!(fx.watcher.active_devices(), vec![id]);
        assert!(fx.watcher.is_watching());
    }

    #[tokio::test]
    async fn should_treat_second_remove_as_noop() {
        let (fx, _) = fixture();
        let id = add_scheduled(&fx, 17, "08:00", "18:00");
        fx.watcher.schedule_device(id);

        assert!(fx.watcher.remove_scheduled_device(id));
        assert!(!fx.watcher.remove_scheduled_device(id));
        assert!(fx.watcher.active_devices().is_empty());
    }

    #[tokio::test]
    async fn should_keep_watching_when_active_set_becomes_empty() {
        let (fx, _) = fixture();
        let id = add_scheduled(&fx, 17, "08:00", "18:00");
        fx.watcher.schedule_device(id);

        fx.watcher.remove_scheduled_device(id);

        assert!(fx.watcher.is_watching());
    }

    #[tokio::test]
    async fn should_stay_idle_until_something_is_scheduled() {
        let (fx, _) = fixture();
        assert!(!fx.watcher.is_watching());
        assert!(!fx.watcher.remove_scheduled_device(DeviceId::new()));
        assert!(!fx.watcher.is_watching());
    }

    #[tokio::test]
    async fn should_switch_on_notify_and_record_when_window_opens() {
        let (fx, publisher) = fixture();
        let id = add_scheduled(&fx, 17, "08:00", "18:00");
        fx.watcher.schedule_device(id);

        let report = fx.watcher.reconcile().await;

        assert_eq!(report.switched.len(), 1);
        assert_eq!(fx.port.level(Pin::new(17)), Some(true));
        assert_eq!(status_of(&fx, id), SwitchState::On);

        let events = publisher.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::ScheduledSwitch);
        assert_eq!(events[0].actor_id, "alice|schedule-assistant");
        assert_eq!(events[0].payload.device_id, id);
        assert_eq!(events[0].payload.new_state, SwitchState::On);

        let records = fx.recorder.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].from, SwitchState::Off);
        assert_eq!(records[0].to, SwitchState::On);
        assert_eq!(records[0].actor, "alice|schedule-assistant");
    }

    #[tokio::test]
    async fn should_do_nothing_when_desired_equals_status() {
        let (fx, publisher) = fixture();
        let id = add_scheduled(&fx, 17, "08:00", "18:00");
        fx.watcher.schedule_device(id);
        fx.watcher.reconcile().await;
        let writes = fx.port.write_count();

        let report = fx.watcher.reconcile().await;

        assert!(report.switched.is_empty());
        assert_eq!(report.evaluated, 1);
        assert_eq!(fx.port.write_count(), writes);
        assert_eq!(publisher.events().len(), 1);
        assert_eq!(fx.recorder.records().len(), 1);
    }

    #[tokio::test]
    async fn should_switch_off_when_window_closes() {
        let (fx, publisher) = fixture();
        let id = add_scheduled(&fx, 17, "08:00", "18:00");
        fx.watcher.schedule_device(id);
        fx.watcher.reconcile().await;

        fx.clock.set(wednesday(19, 0));
        fx.watcher.reconcile().await;

        assert_eq!(fx.port.level(Pin::new(17)), Some(false));
        assert_eq!(status_of(&fx, id), SwitchState::Off);
        assert_eq!(publisher.events()[1].payload.new_state, SwitchState::Off);
    }

    #[tokio::test]
    async fn should_leave_device_off_on_inactive_day() {
        let (fx, publisher) = fixture();
        let id = add_scheduled(&fx, 17, "08:00", "18:00");
        fx.watcher.schedule_device(id);
        fx.clock.set(saturday(9, 0));

        let report = fx.watcher.reconcile().await;

        assert!(report.switched.is_empty());
        assert!(publisher.events().is_empty());
    }

    #[tokio::test]
    async fn should_isolate_actuation_failure_to_one_device() {
        let (fx, publisher) = fixture();
        let broken = add_scheduled(&fx, 17, "08:00", "18:00");
        let healthy = add_scheduled(&fx, 18, "08:00", "18:00");
        fx.watcher.schedule_device(broken);
        fx.watcher.schedule_device(healthy);
        fx.port.fail_writes(Pin::new(17));

        let report = fx.watcher.reconcile().await;

        assert_eq!(report.failed, 1);
        assert_eq!(report.switched.len(), 1);
        assert_eq!(status_of(&fx, broken), SwitchState::Off);
        assert_eq!(status_of(&fx, healthy), SwitchState::On);
        assert_eq!(publisher.events().len(), 1);

        fx.port.heal(Pin::new(17));
        let retry = fx.watcher.reconcile().await;
        assert_eq!(retry.switched.len(), 1);
        assert_eq!(status_of(&fx, broken), SwitchState::On);
    }

    #[tokio::test]
    async fn should_keep_status_when_persistence_fails() {
        let (fx, publisher) = fixture();
        let id = add_scheduled(&fx, 17, "08:00", "18:00");
        fx.watcher.schedule_device(id);
        fx.recorder.fail();

        fx.watcher.reconcile().await;

        assert_eq!(status_of(&fx, id), SwitchState::On);
        assert_eq!(publisher.events().len(), 1);
    }

    #[tokio::test]
    async fn should_skip_active_ids_that_are_no_longer_registered() {
        let (fx, _) = fixture();
        let id = add_scheduled(&fx, 17, "08:00", "18:00");
        fx.watcher.schedule_device(id);
        fx.registry.lock().remove_device(id);

        let report = fx.watcher.reconcile().await;

        assert_eq!(report, ReconcileReport::default());
    }

    #[tokio::test(start_paused = true)]
    async fn should_tick_one_full_interval_after_scheduling() {
        let (fx, publisher) = fixture();
        let id = add_scheduled(&fx, 17, "08:00", "18:00");
        fx.watcher.schedule_device(id);

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(fx.port.level(Pin::new(17)), Some(false));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fx.port.level(Pin::new(17)), Some(true));
        assert_eq!(publisher.events().len(), 1);
        assert_eq!(fx.recorder.records().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn should_push_next_tick_back_when_reconfigured() {
        let (fx, _) = fixture();
        let first = add_scheduled(&fx, 17, "08:00", "18:00");
        let second = add_scheduled(&fx, 18, "08:00", "18:00");
        fx.watcher.schedule_device(first);

        tokio::time::sleep(Duration::from_secs(50)).await;
        fx.watcher.schedule_device(second);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(fx.port.level(Pin::new(17)), Some(false));

        tokio::time::sleep(Duration::from_secs(41)).await;
        assert_eq!(fx.port.level(Pin::new(17)), Some(true));
        assert_eq!(fx.port.level(Pin::new(18)), Some(true));
    }

    #[tokio::test(start_paused = true)]
    async fn should_not_tick_after_stop() {
        let (fx, _) = fixture();
        let id = add_scheduled(&fx, 17, "08:00", "18:00");
        fx.watcher.schedule_device(id);

        fx.watcher.stop();
        tokio::time::sleep(Duration::from_secs(120)).await;

        assert!(!fx.watcher.is_watching());
        assert_eq!(fx.port.level(Pin::new(17)), Some(false));
        assert_eq!(fx.watcher.active_devices(), vec![id]);
    }

    struct HangingPublisher;

    impl EventPublisher for HangingPublisher {
        fn publish(&self, _event: Event) -> impl Future<Output = Result<(), HubError>> + Send {
            std::future::pending()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn should_finish_tick_when_broadcast_hangs() {
        let fx = fixture_with(HangingPublisher);
        let id = add_scheduled(&fx, 17, "08:00", "18:00");
        fx.watcher.schedule_device(id);

        let report = fx.watcher.reconcile().await;

        assert_eq!(report.switched.len(), 1);
        assert_eq!(status_of(&fx, id), SwitchState::On);
        assert_eq!(fx.recorder.records().len(), 1);
    }
}
