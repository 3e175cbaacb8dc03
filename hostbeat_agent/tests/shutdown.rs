//! The agent exits cleanly on ctrl-c instead of needing a hard kill.
#![cfg(unix)]

use std::process::Command;
use std::time::{Duration, Instant};

#[test]
fn sigint_exits_cleanly() {
    let dir = tempfile::tempdir().expect("tempdir");
    let exe = env!("CARGO_BIN_EXE_hostbeat_agent");

    let mut child = Command::new(exe)
        // Nothing listens on the discard port, so sends fail fast and queue.
        .env("API_URL", "http://127.0.0.1:9")
        .env("QUEUE_PATH", dir.path())
        .env("INTERVAL_SECONDS", "5")
        .spawn()
        .expect("spawn agent");

    // Let the first tick finish (warm-up plus both sampling windows) so the
    // agent is parked in its sleep with the signal listener installed.
    std::thread::sleep(Duration::from_secs(3));
    let kill = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .expect("send SIGINT");
    assert!(kill.success(), "could not signal the agent");

    let start = Instant::now();
    loop {
        if let Some(exit) = child.try_wait().expect("wait for agent") {
            assert!(exit.success(), "agent exited uncleanly: {exit:?}");
            break;
        }
        if start.elapsed() > Duration::from_secs(5) {
            let _ = child.kill();
            panic!("agent did not exit after SIGINT");
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}
