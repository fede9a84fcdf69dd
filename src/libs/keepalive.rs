// Sudo credential keepalive.
//
// Several installers need `sudo` long after the run started (symlinks into
// `/usr/local/bin`, the OpenSC link). Credentials are cached once, up front,
// with an interactive `sudo -v`. A background thread then refreshes them with
// `sudo -n -v` on a fixed interval for as long as the run lasts. A failed
// refresh is logged as a warning and the thread keeps going.
//
// The thread waits on a channel with a timeout, so stopping it (explicitly
// or by dropping the handle) takes effect immediately instead of after the
// current interval.

use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::libs::run_log::RunLog;
use crate::libs::utilities::exec::{CommandRunner, CommandSpec, ExecError};
use crate::schemas::log_record::fields;

/// Caches sudo credentials interactively. Failure is fatal for the run.
pub fn cache_credentials(runner: &dyn CommandRunner, log: &RunLog) -> Result<(), ExecError> {
    println!("\n[sudo] chs-onboard needs administrator privileges:");
    let spec = CommandSpec::new("sudo").arg("-v");
    match runner.run_interactive(&spec) {
        Ok(true) => {
            log.info("sudo", "sudo credentials cached");
            Ok(())
        }
        Ok(false) => Err(ExecError::Failed {
            command: spec.to_string(),
            status: "authentication failed".to_string(),
            output: String::new(),
        }),
        Err(source) => Err(ExecError::Spawn {
            command: spec.to_string(),
            source,
        }),
    }
}

/// Running keepalive thread. Stops when `stop` is called or the handle drops.
pub struct KeepaliveHandle {
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl KeepaliveHandle {
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Dropping the sender wakes the thread with `Disconnected`.
        self.stop_tx.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for KeepaliveHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Starts refreshing sudo credentials every `interval`.
pub fn spawn(runner: Arc<dyn CommandRunner>, log: Arc<RunLog>, interval: Duration) -> KeepaliveHandle {
    let (stop_tx, stop_rx) = mpsc::channel::<()>();
    let thread = thread::spawn(move || {
        loop {
            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
            tracing::debug!("sudo keepalive tick");
            let spec = CommandSpec::new("sudo").args(["-n", "-v"]);
            match runner.run(&spec) {
                Ok(outcome) if outcome.success => {}
                Ok(outcome) => {
                    log.warn_with("sudo", "sudo keepalive tick failed", fields(&[("error", outcome.status)]))
                }
                Err(e) => log.warn_with("sudo", "sudo keepalive tick failed", fields(&[("error", e.to_string())])),
            }
        }
        tracing::debug!("sudo keepalive stopped");
    });
    KeepaliveHandle {
        stop_tx: Some(stop_tx),
        thread: Some(thread),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::utilities::exec::tests::FakeRunner;
    use std::time::Instant;

    #[test]
    fn ticks_until_stopped() {
        let runner = Arc::new(FakeRunner::default());
        let handle = spawn(runner.clone(), Arc::new(RunLog::console_only()), Duration::from_millis(10));
        thread::sleep(Duration::from_millis(100));
        handle.stop();
        let ticks = runner.commands().len();
        assert!(ticks >= 2, "expected several ticks, got {ticks}");
        assert!(runner.commands().iter().all(|c| c == "sudo -n -v"));

        thread::sleep(Duration::from_millis(50));
        assert_eq!(runner.commands().len(), ticks);
    }

    #[test]
    fn failed_tick_is_not_fatal() {
        let runner = Arc::new(FakeRunner::default());
        runner.fail_when("sudo -n -v", "a password is required");
        let handle = spawn(runner.clone(), Arc::new(RunLog::console_only()), Duration::from_millis(5));
        thread::sleep(Duration::from_millis(60));
        drop(handle);
        assert!(runner.commands().len() >= 2);
    }

    #[test]
    fn stop_does_not_wait_for_the_interval() {
        let runner = Arc::new(FakeRunner::default());
        let handle = spawn(runner.clone(), Arc::new(RunLog::console_only()), Duration::from_secs(60));
        let started = Instant::now();
        handle.stop();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(runner.commands().is_empty());
    }

    #[test]
    fn cached_credentials_use_interactive_sudo() {
        let runner = FakeRunner::default();
        cache_credentials(&runner, &RunLog::console_only()).unwrap();
        let calls = runner.interactive_calls.lock().unwrap();
        assert_eq!(calls[0].to_string(), "sudo -v");
    }
}
