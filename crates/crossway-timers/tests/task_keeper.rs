//! Integration tests for the keyed timer registry.
//!
//! Uses `tokio::time::pause()` via `start_paused` so sleeps resolve
//! instantly when the test advances the clock - no wall-clock waiting.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use crossway_timers::TaskKeeper;
use tokio::time::sleep;

/// Spawns a task under `key` that bumps `counter` after `secs` seconds.
fn arm_bump(
    keeper: &mut TaskKeeper<&'static str>,
    key: &'static str,
    counter: &Arc<AtomicU32>,
    secs: u64,
) {
    let counter = Arc::clone(counter);
    keeper.spawn(key, async move {
        sleep(Duration::from_secs(secs)).await;
        counter.fetch_add(1, Ordering::SeqCst);
    });
}

#[tokio::test(start_paused = true)]
async fn test_armed_task_fires_after_delay() {
    let mut keeper = TaskKeeper::new();
    let fired = Arc::new(AtomicU32::new(0));
    arm_bump(&mut keeper, "k", &fired, 5);

    sleep(Duration::from_secs(4)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 0, "not due yet");

    sleep(Duration::from_secs(2)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_arm_aborts_the_previous_task_for_the_key() {
    let mut keeper = TaskKeeper::new();
    let first = Arc::new(AtomicU32::new(0));
    let second = Arc::new(AtomicU32::new(0));

    arm_bump(&mut keeper, "k", &first, 1);
    arm_bump(&mut keeper, "k", &second, 2);
    assert_eq!(keeper.len(), 1, "one task per key");

    sleep(Duration::from_secs(3)).await;
    assert_eq!(first.load(Ordering::SeqCst), 0, "replaced task never fires");
    assert_eq!(second.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_distinct_keys_run_independently() {
    let mut keeper = TaskKeeper::new();
    let a = Arc::new(AtomicU32::new(0));
    let b = Arc::new(AtomicU32::new(0));

    arm_bump(&mut keeper, "a", &a, 1);
    arm_bump(&mut keeper, "b", &b, 3);

    sleep(Duration::from_secs(2)).await;
    assert_eq!(a.load(Ordering::SeqCst), 1);
    assert_eq!(b.load(Ordering::SeqCst), 0);

    sleep(Duration::from_secs(2)).await;
    assert_eq!(b.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_prevents_firing() {
    let mut keeper = TaskKeeper::new();
    let fired = Arc::new(AtomicU32::new(0));
    arm_bump(&mut keeper, "k", &fired, 1);

    assert!(keeper.cancel(&"k"));
    sleep(Duration::from_secs(5)).await;

    assert_eq!(fired.load(Ordering::SeqCst), 0);
    assert!(keeper.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_unknown_key_returns_false() {
    let mut keeper: TaskKeeper<&str> = TaskKeeper::new();
    assert!(!keeper.cancel(&"nothing"));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_all_clears_everything() {
    let mut keeper = TaskKeeper::new();
    let fired = Arc::new(AtomicU32::new(0));
    arm_bump(&mut keeper, "a", &fired, 1);
    arm_bump(&mut keeper, "b", &fired, 1);

    keeper.cancel_all();
    sleep(Duration::from_secs(5)).await;

    assert_eq!(fired.load(Ordering::SeqCst), 0);
    assert!(keeper.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_reap_drops_finished_entries_only() {
    let mut keeper = TaskKeeper::new();
    let fired = Arc::new(AtomicU32::new(0));
    arm_bump(&mut keeper, "done", &fired, 1);
    arm_bump(&mut keeper, "pending", &fired, 60);

    sleep(Duration::from_secs(2)).await;
    assert_eq!(keeper.len(), 2);

    keeper.reap();
    assert_eq!(keeper.len(), 1);
    assert!(keeper.contains(&"pending"));
    assert!(!keeper.contains(&"done"));
}

#[tokio::test(start_paused = true)]
async fn test_drop_aborts_armed_tasks() {
    let fired = Arc::new(AtomicU32::new(0));
    {
        let mut keeper = TaskKeeper::new();
        arm_bump(&mut keeper, "k", &fired, 1);
    }
    sleep(Duration::from_secs(5)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}
