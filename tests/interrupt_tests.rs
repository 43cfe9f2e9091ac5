// SIGINT scoping: the session owns Ctrl-C only while it runs
#![cfg(unix)]

mod common;

use std::os::unix::process::ExitStatusExt;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use common::{numbered_frame, FakeDevice};
use live_translate::{BridgeConfig, CaptureBridge, CaptureParams, InterruptGuard, SigintScope};
use signal_hook::consts::SIGINT;

/// Set when the test binary re-runs itself as the process that receives SIGINT
const CHILD_ENV: &str = "LIVE_TRANSLATE_SIGINT_CHILD";

fn fast_config() -> BridgeConfig {
    BridgeConfig {
        params: CaptureParams::default(),
        poll_interval: Duration::from_millis(10),
        join_timeout: Duration::from_secs(1),
    }
}

#[tokio::test]
async fn test_sigint_inside_scope_closes_bridge() {
    let (device, handle) = FakeDevice::new();
    let bridge = CaptureBridge::new(Box::new(device), fast_config());
    let mut audio = bridge.start().unwrap();
    let guard = InterruptGuard::ctrl_c(bridge.clone()).unwrap();

    assert!(handle.push(&numbered_frame(1, 8)));
    signal_hook::low_level::raise(SIGINT).unwrap();

    let received = tokio::time::timeout(Duration::from_secs(2), async {
        let mut count = 0;
        while audio.next().await.is_some() {
            count += 1;
        }
        count
    })
    .await
    .expect("SIGINT must end the audio stream");

    assert_eq!(received, 1);
    assert_eq!(handle.closed(), 1);
    drop(guard);
}

#[test]
fn test_sigint_after_scope_uses_default_action() {
    if std::env::var_os(CHILD_ENV).is_some() {
        let (scope, _interrupted) = SigintScope::register().unwrap();
        drop(scope);

        signal_hook::low_level::raise(SIGINT).unwrap();
        thread::sleep(Duration::from_secs(2));
        // Reaching this point means SIGINT was swallowed
        std::process::exit(0);
    }

    let status = Command::new(std::env::current_exe().unwrap())
        .args([
            "test_sigint_after_scope_uses_default_action",
            "--exact",
            "--test-threads=1",
        ])
        .env(CHILD_ENV, "1")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .unwrap();

    assert_eq!(status.signal(), Some(SIGINT), "child status: {:?}", status);
}
