use async_trait::async_trait;
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::sync::oneshot;

use vol_ops::{
    controller::{dispatcher::FinalCallback, registry::Registry},
    errors::SvcError,
    volume::SetQosRequest,
};
use vol_port::types::v0::{
    store::{
        definitions::{NotifyError, Store, StoreError, WatcherNotifier},
        volume::VolumeSpec,
        SpecTransaction,
    },
    transport::{status, CompletionResult, QosLimitKey, QosLimitKind, SetVolumeQos, VolumeId},
};

/// In-memory metadata store double, counting every mutation call.
#[derive(Clone, Default)]
struct InMemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
    puts: Arc<AtomicUsize>,
    fail_puts: Arc<AtomicBool>,
    put_delay: Option<Duration>,
}

impl InMemoryStore {
    fn failing() -> Self {
        let store = Self::default();
        store.fail_puts.store(true, Ordering::SeqCst);
        store
    }
    fn with_put_delay(delay: Duration) -> Self {
        Self {
            put_delay: Some(delay),
            ..Default::default()
        }
    }
    fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn put_metadata(
        &self,
        volume: &VolumeId,
        values: HashMap<String, String>,
    ) -> Result<(), StoreError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.put_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StoreError::NotOnline {});
        }
        let mut entries = self.entries.lock();
        for (key, value) in values {
            entries.insert(format!("{volume}/{key}"), value);
        }
        Ok(())
    }

    async fn get_metadata(&self, volume: &VolumeId, key: &str) -> Result<String, StoreError> {
        self.entries
            .lock()
            .get(&format!("{volume}/{key}"))
            .cloned()
            .ok_or(StoreError::MissingEntry {
                key: key.to_string(),
            })
    }
}

/// Watcher notifier double, counting every broadcast.
#[derive(Clone, Default)]
struct TestNotifier {
    notifications: Arc<AtomicUsize>,
    fail: Arc<AtomicBool>,
    stall: Arc<AtomicBool>,
}

impl TestNotifier {
    fn failing() -> Self {
        let notifier = Self::default();
        notifier.fail.store(true, Ordering::SeqCst);
        notifier
    }
    fn stalled() -> Self {
        let notifier = Self::default();
        notifier.stall.store(true, Ordering::SeqCst);
        notifier
    }
    fn notifications(&self) -> usize {
        self.notifications.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WatcherNotifier for TestNotifier {
    async fn notify_changed(&self, volume: &VolumeId) -> Result<(), NotifyError> {
        self.notifications.fetch_add(1, Ordering::SeqCst);
        if self.stall.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::NotifyFailed {
                volume: volume.to_string(),
                error: "watch endpoint unreachable".to_string(),
            });
        }
        Ok(())
    }
}

/// A final callback which counts its invocations and forwards the terminal
/// result to the test.
fn final_callback(
    invocations: Arc<AtomicUsize>,
) -> (FinalCallback, oneshot::Receiver<CompletionResult>) {
    let (sender, receiver) = oneshot::channel();
    let callback: FinalCallback = Box::new(move |result| {
        invocations.fetch_add(1, Ordering::SeqCst);
        sender.send(result).ok();
    });
    (callback, receiver)
}

fn iops_read_avg(volume: &VolumeId, limit: u64) -> SetVolumeQos {
    SetVolumeQos::new(volume, QosLimitKind::IopsRead, QosLimitKey::Average, limit)
}

#[tokio::test]
async fn qos_set_success_notifies_and_completes_once() {
    let store = InMemoryStore::default();
    let notifier = TestNotifier::default();
    let registry = Registry::new(store.clone(), notifier.clone());

    let volume = VolumeId::new();
    registry.add_volume(VolumeSpec::new(volume.clone()));

    let invocations = Arc::new(AtomicUsize::new(0));
    let (callback, receiver) = final_callback(invocations.clone());

    SetQosRequest::new(iops_read_avg(&volume, 500), callback)
        .start(&registry)
        .expect("start must succeed");

    let result = receiver.await.unwrap();
    assert!(result.is_success());
    assert_eq!(result.status(), 0);
    assert_eq!(invocations.load(Ordering::SeqCst), 1);
    assert_eq!(store.puts(), 1);
    assert_eq!(notifier.notifications(), 1);

    // the committed limit is visible both in the store and on the spec
    let value = registry.volume_metadata(&volume, "iops_read_avg").await.unwrap();
    assert_eq!(value, "500");
    let spec = registry.volume_spec(&volume).unwrap();
    assert_eq!(
        spec.qos_limit(QosLimitKind::IopsRead, QosLimitKey::Average),
        Some(500)
    );
    assert!(!spec.pending_op());
}

#[tokio::test]
async fn qos_mutation_failure_skips_notification() {
    let store = InMemoryStore::failing();
    let notifier = TestNotifier::default();
    let registry = Registry::new(store.clone(), notifier.clone());

    let volume = VolumeId::new();
    registry.add_volume(VolumeSpec::new(volume.clone()));

    let invocations = Arc::new(AtomicUsize::new(0));
    let (callback, receiver) = final_callback(invocations.clone());

    SetQosRequest::new(iops_read_avg(&volume, 500), callback)
        .start(&registry)
        .unwrap();

    let result = receiver.await.unwrap();
    assert_eq!(result.status(), status::MUTATION_FAILED);
    assert_eq!(invocations.load(Ordering::SeqCst), 1);
    // fail-fast: the notification stage never ran
    assert_eq!(notifier.notifications(), 0);

    // the failed operation left no pending journal entry and released the
    // ownership lock
    let spec = registry.volume_spec(&volume).unwrap();
    assert!(!spec.pending_op());
    assert!(registry.volume_opguard(&volume).is_ok());
}

#[tokio::test]
async fn qos_notification_failure_is_terminal_but_committed() {
    let store = InMemoryStore::default();
    let notifier = TestNotifier::failing();
    let registry = Registry::new(store.clone(), notifier.clone());

    let volume = VolumeId::new();
    registry.add_volume(VolumeSpec::new(volume.clone()));

    let invocations = Arc::new(AtomicUsize::new(0));
    let (callback, receiver) = final_callback(invocations.clone());

    SetQosRequest::new(iops_read_avg(&volume, 500), callback)
        .start(&registry)
        .unwrap();

    let result = receiver.await.unwrap();
    // the notification failure is reported, not masked by the successful
    // write..
    assert_eq!(result.status(), status::NOTIFICATION_FAILED);
    assert_eq!(invocations.load(Ordering::SeqCst), 1);
    assert_eq!(notifier.notifications(), 1);

    // ..and the mutation is not rolled back
    let value = registry.volume_metadata(&volume, "iops_read_avg").await.unwrap();
    assert_eq!(value, "500");
    let spec = registry.volume_spec(&volume).unwrap();
    assert_eq!(
        spec.qos_limit(QosLimitKind::IopsRead, QosLimitKey::Average),
        Some(500)
    );
}

#[tokio::test]
async fn qos_operations_on_distinct_volumes_run_concurrently() {
    let store = InMemoryStore::with_put_delay(Duration::from_millis(50));
    let notifier = TestNotifier::default();
    let registry = Registry::new(store.clone(), notifier.clone());

    let volume_a = VolumeId::new();
    let volume_b = VolumeId::new();
    registry.add_volume(VolumeSpec::new(volume_a.clone()));
    registry.add_volume(VolumeSpec::new(volume_b.clone()));

    let invocations = Arc::new(AtomicUsize::new(0));
    let (callback_a, receiver_a) = final_callback(invocations.clone());
    let (callback_b, receiver_b) = final_callback(invocations.clone());

    // both initiations succeed before either completion is consumed
    SetQosRequest::new(iops_read_avg(&volume_a, 100), callback_a)
        .start(&registry)
        .unwrap();
    SetQosRequest::new(iops_read_avg(&volume_b, 200), callback_b)
        .start(&registry)
        .unwrap();

    let (result_a, result_b) = tokio::join!(receiver_a, receiver_b);
    assert!(result_a.unwrap().is_success());
    assert!(result_b.unwrap().is_success());
    assert_eq!(invocations.load(Ordering::SeqCst), 2);
    assert_eq!(store.puts(), 2);
    assert_eq!(notifier.notifications(), 2);
}

#[tokio::test]
async fn qos_start_under_contention_fails_fast_without_remote_calls() {
    let store = InMemoryStore::default();
    let notifier = TestNotifier::default();
    let registry = Registry::new(store.clone(), notifier.clone());

    let volume = VolumeId::new();
    registry.add_volume(VolumeSpec::new(volume.clone()));

    // another operation owns the volume
    let _guard = registry.volume_opguard(&volume).unwrap();

    let invocations = Arc::new(AtomicUsize::new(0));
    let (callback, _receiver) = final_callback(invocations.clone());

    let error = SetQosRequest::new(iops_read_avg(&volume, 500), callback)
        .start(&registry)
        .expect_err("start must fail while the ownership lock is held");
    assert!(matches!(error, SvcError::NotOwner { .. }));
    assert_eq!(error.status_code(), status::NOT_OWNER);

    // the failure is synchronous: nothing was issued and the callback
    // never fired
    assert_eq!(store.puts(), 0);
    assert_eq!(notifier.notifications(), 0);
    assert_eq!(invocations.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn qos_invalid_limit_is_rejected_before_start() {
    let store = InMemoryStore::default();
    let notifier = TestNotifier::default();
    let registry = Registry::new(store.clone(), notifier.clone());

    let volume = VolumeId::new();
    registry.add_volume(VolumeSpec::new(volume.clone()));

    let invocations = Arc::new(AtomicUsize::new(0));
    let (callback, _receiver) = final_callback(invocations.clone());

    let error = SetQosRequest::new(iops_read_avg(&volume, 0), callback)
        .start(&registry)
        .expect_err("a zero limit is not a valid rate");
    assert!(matches!(error, SvcError::InvalidArguments { .. }));
    assert_eq!(store.puts(), 0);
    assert_eq!(notifier.notifications(), 0);
    assert_eq!(invocations.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn qos_unknown_volume_is_rejected_before_start() {
    let store = InMemoryStore::default();
    let notifier = TestNotifier::default();
    let registry = Registry::new(store.clone(), notifier.clone());

    let invocations = Arc::new(AtomicUsize::new(0));
    let (callback, _receiver) = final_callback(invocations.clone());

    let error = SetQosRequest::new(iops_read_avg(&VolumeId::new(), 500), callback)
        .start(&registry)
        .expect_err("the volume is not registered");
    assert!(matches!(error, SvcError::VolumeNotFound { .. }));
    assert_eq!(store.puts(), 0);
    assert_eq!(invocations.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn qos_repeated_mutation_is_idempotent() {
    let store = InMemoryStore::default();
    let notifier = TestNotifier::default();
    let registry = Registry::new(store.clone(), notifier.clone());

    let volume = VolumeId::new();
    registry.add_volume(VolumeSpec::new(volume.clone()));

    for _ in 0..2 {
        let (callback, receiver) = final_callback(Arc::new(AtomicUsize::new(0)));
        SetQosRequest::new(iops_read_avg(&volume, 500), callback)
            .start(&registry)
            .unwrap();
        assert!(receiver.await.unwrap().is_success());
    }

    // both lifecycles completed independently and the queried value equals
    // the second write's value
    assert_eq!(store.puts(), 2);
    assert_eq!(notifier.notifications(), 2);
    let value = registry.volume_metadata(&volume, "iops_read_avg").await.unwrap();
    assert_eq!(value, "500");
}

#[tokio::test]
async fn qos_notification_wait_is_bounded() {
    let store = InMemoryStore::default();
    let notifier = TestNotifier::stalled();
    let registry = Registry::with_timeouts(
        store.clone(),
        notifier.clone(),
        Duration::from_secs(1),
        Duration::from_millis(50),
    );

    let volume = VolumeId::new();
    registry.add_volume(VolumeSpec::new(volume.clone()));

    let invocations = Arc::new(AtomicUsize::new(0));
    let (callback, receiver) = final_callback(invocations.clone());

    SetQosRequest::new(iops_read_avg(&volume, 500), callback)
        .start(&registry)
        .unwrap();

    let result = receiver.await.unwrap();
    assert_eq!(result.status(), status::TIMED_OUT);
    assert_eq!(invocations.load(Ordering::SeqCst), 1);
    // the write itself had committed before the notifier stalled
    let value = registry.volume_metadata(&volume, "iops_read_avg").await.unwrap();
    assert_eq!(value, "500");
}

#[tokio::test]
async fn qos_example_scenario_maps_kind_to_metadata_entry() {
    let store = InMemoryStore::default();
    let notifier = TestNotifier::default();
    let registry = Registry::new(store.clone(), notifier.clone());

    let volume = VolumeId::new();
    registry.add_volume(VolumeSpec::new(volume.clone()));

    let request = SetVolumeQos::new(
        &volume,
        "iops-read".parse().unwrap(),
        "average".parse().unwrap(),
        500,
    );
    assert_eq!(
        request.store_mapping(),
        HashMap::from([("iops_read_avg".to_string(), "500".to_string())])
    );

    let invocations = Arc::new(AtomicUsize::new(0));
    let (callback, receiver) = final_callback(invocations.clone());
    SetQosRequest::new(request, callback).start(&registry).unwrap();

    let result = receiver.await.unwrap();
    assert_eq!(result.status(), 0);
    assert_eq!(notifier.notifications(), 1);
    let value = registry.volume_metadata(&volume, "iops_read_avg").await.unwrap();
    assert_eq!(value, "500");
}
