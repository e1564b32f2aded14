//! Process signals are delivered to every listener in the process, so these
//! checks live in their own test binary and run sequentially.
#![cfg(unix)]

use power_watcher::{DummySensor, PowerWatcher, WatcherConfig};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::{sleep, timeout};

const MILLIWATTS: u64 = 3600 * 1000 * 1000;

fn temp_log(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "power-watcher-signal-{}-{}.log",
        name,
        std::process::id()
    ))
}

async fn run_until_signal(name: &str, signal: libc::c_int) -> (f64, usize) {
    let path = temp_log(name);
    let mut watcher = PowerWatcher::new(
        WatcherConfig::new(Some(path.clone()), false),
        DummySensor::constant(MILLIWATTS),
    )
    .unwrap();
    let total = watcher.start().await.unwrap();
    sleep(Duration::from_millis(300)).await;

    // Handlers are installed by start(), so this must not kill the test process
    assert_eq!(unsafe { libc::raise(signal) }, 0);

    let kwh = timeout(Duration::from_secs(5), watcher.join())
        .await
        .expect("worker ignored the signal")
        .unwrap();
    assert_eq!(total.kwh(), kwh);
    assert!(!watcher.is_running());

    let lines = std::fs::read_to_string(&path).unwrap().lines().count();
    std::fs::remove_file(&path).unwrap();
    (kwh, lines)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_signals_match_explicit_stop() {
    let path = temp_log("explicit");
    let mut explicit = PowerWatcher::new(
        WatcherConfig::new(Some(path.clone()), false).with_signal_handling(false),
        DummySensor::constant(MILLIWATTS),
    )
    .unwrap();
    explicit.start().await.unwrap();
    sleep(Duration::from_secs(1)).await;
    let by_stop = explicit.stop().await.unwrap();
    let stop_lines = std::fs::read_to_string(&path).unwrap().lines().count();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(by_stop, 1.0);

    let (by_sigterm, sigterm_lines) = run_until_signal("sigterm", libc::SIGTERM).await;
    assert_eq!(by_sigterm, by_stop);
    assert_eq!(sigterm_lines, stop_lines);

    let (by_sigint, sigint_lines) = run_until_signal("sigint", libc::SIGINT).await;
    assert_eq!(by_sigint, by_stop);
    assert_eq!(sigint_lines, stop_lines);
}
