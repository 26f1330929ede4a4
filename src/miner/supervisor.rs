use crate::config::MinerConfig;
use crate::error::AppError;
use crate::miner::command::{MinerCommand, ResolvedCommand};
use crate::miner::log::MinerLog;
use crate::miner::types::{OutputLine, OutputStream, ProcessError, SupervisorEvent, SupervisorState};
use chrono::{DateTime, Utc};
use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::{AbortHandle, JoinHandle};

/// Upper bound on waiting for the output relays to drain after the child exits.
const RELAY_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

enum StopOutcome {
    Exited(ExitStatus),
    Killed,
    TimedOut,
}

/// The child we spawned, and the way to reach its monitor task.
struct RunHandle {
    id: u64,
    pid: u32,
    stop_tx: oneshot::Sender<oneshot::Sender<StopOutcome>>,
    monitor: AbortHandle,
}

struct Inner {
    state: SupervisorState,
    command: Option<MinerCommand>,
    address: String,
    run: Option<RunHandle>,
    next_run_id: u64,
    last_output_at: Option<DateTime<Utc>>,
}

/// State reachable from the supervisor and from its background tasks.
struct Shared {
    inner: Mutex<Inner>,
    log: MinerLog,
    events: mpsc::UnboundedSender<SupervisorEvent>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SupervisorEvent) {
        let _ = self.events.send(event);
    }

    fn transition(&self, inner: &mut Inner, state: SupervisorState) {
        if inner.state == state {
            return;
        }
        tracing::info!("Miner state: {:?} -> {:?}", inner.state, state);
        inner.state = state.clone();
        self.emit(SupervisorEvent::StateChanged(state));
    }

    async fn record_output(&self, stream: OutputStream, line: String) {
        let at = Utc::now();
        self.lock().last_output_at = Some(at);

        if let Err(e) = self.log.append(&line).await {
            tracing::warn!("Failed to append to {}: {e}", self.log.path().display());
            self.emit(SupervisorEvent::ErrorOccurred(ProcessError::WriteError));
        }
        tracing::debug!("miner {stream:?}: {line}");
        self.emit(SupervisorEvent::Output(OutputLine { stream, line, at }));
    }

    /// Handles an exit nobody asked for. Exits of superseded runs are ignored.
    fn finish_run(&self, run_id: u64, exit: io::Result<ExitStatus>) {
        let mut inner = self.lock();
        if inner.run.as_ref().map(|run| run.id) != Some(run_id) {
            tracing::debug!("Ignoring exit of superseded miner run {run_id}");
            return;
        }
        inner.run = None;

        match exit {
            Ok(status) if status.success() => {
                tracing::info!("Miner exited: {status}");
                self.emit(SupervisorEvent::Exited {
                    code: status.code(),
                });
            }
            Ok(status) => {
                tracing::warn!("Miner exited unexpectedly: {status}");
                self.emit(SupervisorEvent::ErrorOccurred(ProcessError::Crashed));
                self.emit(SupervisorEvent::Exited {
                    code: status.code(),
                });
            }
            Err(e) => {
                tracing::warn!("Failed to wait for miner: {e}");
                self.emit(SupervisorEvent::ErrorOccurred(ProcessError::Unknown));
            }
        }
        self.transition(&mut inner, SupervisorState::Stopped);
    }
}

/// Launches the external miner and keeps track of exactly one child process.
///
/// Notifications go out on the channel returned by [`MinerSupervisor::new`].
/// Dropping the supervisor kills the child it spawned.
pub struct MinerSupervisor {
    config: MinerConfig,
    shared: Arc<Shared>,
    // Serializes start/stop so two launches never interleave.
    control: tokio::sync::Mutex<()>,
}

impl MinerSupervisor {
    pub fn new(config: MinerConfig) -> (Self, mpsc::UnboundedReceiver<SupervisorEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let log = MinerLog::new(config.log_file_path());
        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner {
                state: SupervisorState::Stopped,
                command: None,
                address: String::new(),
                run: None,
                next_run_id: 0,
                last_output_at: None,
            }),
            log,
            events,
        });

        let supervisor = Self {
            config,
            shared,
            control: tokio::sync::Mutex::new(()),
        };
        (supervisor, events_rx)
    }

    /// Stores the pool template and wallet address for the next launch.
    /// On error the previous configuration is kept.
    pub fn configure(&self, template: &str, address: &str) -> Result<(), AppError> {
        let command = MinerCommand::parse(template, &self.config.placeholder)?;
        let address = address.trim();
        if address.is_empty() {
            return Err(AppError::MissingAddress);
        }

        let mut inner = self.shared.lock();
        inner.command = Some(command);
        inner.address = address.to_string();
        tracing::info!("Miner configured with template: {template}");
        Ok(())
    }

    pub fn state(&self) -> SupervisorState {
        self.shared.lock().state.clone()
    }

    pub fn template(&self) -> Option<String> {
        self.shared
            .lock()
            .command
            .as_ref()
            .map(|command| command.template().to_string())
    }

    /// The command the next `start` would run.
    pub fn resolved_command(&self) -> Option<ResolvedCommand> {
        let inner = self.shared.lock();
        inner
            .command
            .as_ref()
            .map(|command| command.resolve(&inner.address))
    }

    pub fn last_output_at(&self) -> Option<DateTime<Utc>> {
        self.shared.lock().last_output_at
    }

    pub fn log_path(&self) -> &Path {
        self.shared.log.path()
    }

    /// Launches the miner and returns its pid. A child that is already running
    /// is stopped first.
    pub async fn start(&self) -> Result<u32, AppError> {
        if !cfg!(any(unix, windows)) {
            return Err(AppError::UnsupportedPlatform);
        }

        let _control = self.control.lock().await;
        if self.shared.lock().state.has_child() {
            tracing::info!("Miner already running, restarting");
            self.stop_current().await?;
        }

        let resolved = self.resolved_command().ok_or(AppError::NoSelection)?;
        // Absolute, because the child runs with working_dir as its cwd.
        let program = std::path::absolute(self.config.resolve(&resolved.program))?;
        {
            let mut inner = self.shared.lock();
            self.shared.transition(&mut inner, SupervisorState::Starting);
        }

        if !program.is_file() {
            let reason = format!("{} does not exist", program.display());
            tracing::warn!("Cannot start miner: {reason}");
            let mut inner = self.shared.lock();
            self.shared
                .transition(&mut inner, SupervisorState::Failed(reason.clone()));
            return Err(AppError::ExecutableNotFound(reason));
        }

        if let Err(e) = self.shared.log.open().await {
            tracing::warn!("Miner log {} unavailable: {e}", self.log_path().display());
            self.shared
                .emit(SupervisorEvent::ErrorOccurred(ProcessError::WriteError));
        }

        tracing::info!("Starting miner: {}", resolved.command_line());
        let spawned = Command::new(&program)
            .args(&resolved.args)
            .current_dir(&self.config.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!("Failed to spawn {}: {e}", program.display());
                let mut inner = self.shared.lock();
                self.shared
                    .emit(SupervisorEvent::ErrorOccurred(ProcessError::FailedToStart));
                self.shared
                    .transition(&mut inner, SupervisorState::Failed(e.to_string()));
                return Err(AppError::LaunchFailed(e.to_string()));
            }
        };

        let pid = child.id().unwrap_or(0);
        let mut relays = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            relays.push(tokio::spawn(relay_output(
                Arc::clone(&self.shared),
                stdout,
                OutputStream::Stdout,
            )));
        }
        if let Some(stderr) = child.stderr.take() {
            relays.push(tokio::spawn(relay_output(
                Arc::clone(&self.shared),
                stderr,
                OutputStream::Stderr,
            )));
        }

        // Register the run before the monitor can observe an exit.
        let mut inner = self.shared.lock();
        inner.next_run_id += 1;
        let run_id = inner.next_run_id;
        let (stop_tx, stop_rx) = oneshot::channel();
        let monitor = tokio::spawn(watch_child(
            Arc::clone(&self.shared),
            run_id,
            child,
            relays,
            stop_rx,
            self.config.stop_grace(),
            self.config.kill_timeout(),
        ));
        inner.run = Some(RunHandle {
            id: run_id,
            pid,
            stop_tx,
            monitor: monitor.abort_handle(),
        });
        self.shared
            .transition(&mut inner, SupervisorState::Running { pid });

        Ok(pid)
    }

    /// Terminates the running miner, escalating to a kill after the grace period.
    /// Does nothing when no miner is running.
    pub async fn stop(&self) -> Result<(), AppError> {
        let _control = self.control.lock().await;
        self.stop_current().await
    }

    /// Stops the miner and releases the log file.
    pub async fn shutdown(&self) -> Result<(), AppError> {
        let result = self.stop().await;
        self.shared.log.close().await;
        result
    }

    async fn stop_current(&self) -> Result<(), AppError> {
        let run = {
            let mut inner = self.shared.lock();
            match inner.run.take() {
                Some(run) => {
                    self.shared.transition(&mut inner, SupervisorState::Stopping);
                    run
                }
                None => {
                    self.shared.transition(&mut inner, SupervisorState::Stopped);
                    return Ok(());
                }
            }
        };

        tracing::info!("Stopping miner (pid {})", run.pid);
        let (reply_tx, reply_rx) = oneshot::channel();
        let outcome = match run.stop_tx.send(reply_tx) {
            Ok(()) => reply_rx.await.ok(),
            // Monitor already gone: the child exited on its own.
            Err(_) => None,
        };

        let result = match outcome {
            Some(StopOutcome::Exited(status)) => {
                tracing::info!("Miner stopped: {status}");
                Ok(())
            }
            Some(StopOutcome::Killed) => {
                tracing::info!("Miner killed after {:?} grace period", self.config.stop_grace());
                Ok(())
            }
            Some(StopOutcome::TimedOut) => {
                tracing::warn!("Miner (pid {}) did not exit after kill", run.pid);
                run.monitor.abort();
                self.shared
                    .emit(SupervisorEvent::ErrorOccurred(ProcessError::Timeout));
                Err(AppError::ProcessRuntime(format!(
                    "miner (pid {}) did not exit after kill",
                    run.pid
                )))
            }
            None => Ok(()),
        };

        let mut inner = self.shared.lock();
        self.shared.transition(&mut inner, SupervisorState::Stopped);
        result
    }
}

impl Drop for MinerSupervisor {
    fn drop(&mut self) {
        // Aborting the monitor drops the Child, and kill_on_drop kills it.
        if let Some(run) = self.shared.lock().run.take() {
            tracing::info!("Killing miner (pid {}) on teardown", run.pid);
            run.monitor.abort();
        }
    }
}

/// Owns the child. Waits for it to exit or for a stop request.
/// Output still buffered in the pipes is relayed before the exit is reported.
async fn watch_child(
    shared: Arc<Shared>,
    run_id: u64,
    mut child: Child,
    relays: Vec<JoinHandle<()>>,
    stop_rx: oneshot::Receiver<oneshot::Sender<StopOutcome>>,
    grace: Duration,
    kill_timeout: Duration,
) {
    let request = tokio::select! {
        exit = child.wait() => {
            drain_relays(relays).await;
            shared.finish_run(run_id, exit);
            return;
        }
        request = stop_rx => request,
    };

    let outcome = terminate(&mut child, grace, kill_timeout).await;
    drain_relays(relays).await;
    if let Ok(reply) = request {
        let _ = reply.send(outcome);
    }
}

/// Waits for the relays to hit EOF. A grandchild holding the pipes open
/// must not stall the exit, so the wait is bounded.
async fn drain_relays(relays: Vec<JoinHandle<()>>) {
    for relay in relays {
        if tokio::time::timeout(RELAY_DRAIN_TIMEOUT, relay).await.is_err() {
            tracing::warn!("Miner output still open after exit, not waiting for it");
        }
    }
}

async fn terminate(child: &mut Child, grace: Duration, kill_timeout: Duration) -> StopOutcome {
    if send_terminate(child) {
        if let Ok(Ok(status)) = tokio::time::timeout(grace, child.wait()).await {
            return StopOutcome::Exited(status);
        }
        tracing::warn!("Miner ignored terminate, killing");
    }

    if let Err(e) = child.start_kill() {
        tracing::warn!("Failed to kill miner: {e}");
    }
    match tokio::time::timeout(kill_timeout, child.wait()).await {
        Ok(Ok(_)) => StopOutcome::Killed,
        _ => StopOutcome::TimedOut,
    }
}

/// Asks the child to exit. Returns false when there is no graceful signal to send.
#[cfg(unix)]
fn send_terminate(child: &Child) -> bool {
    let Some(pid) = child.id() else {
        return false;
    };
    let result = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    result == 0
}

#[cfg(not(unix))]
fn send_terminate(_child: &Child) -> bool {
    false
}

async fn relay_output<R>(shared: Arc<Shared>, reader: R, stream: OutputStream)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\r', '\n']).to_string();
                shared.record_output(stream, line).await;
            }
            Err(e) => {
                tracing::warn!("Failed to read miner {stream:?}: {e}");
                shared.emit(SupervisorEvent::ErrorOccurred(ProcessError::ReadError));
                break;
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const WAIT: Duration = Duration::from_secs(5);

    fn setup(script: &str) -> (TempDir, MinerSupervisor, mpsc::UnboundedReceiver<SupervisorEvent>) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("miner.sh"), script).unwrap();
        let config = MinerConfig {
            working_dir: dir.path().to_path_buf(),
            stop_grace_ms: 2000,
            kill_timeout_ms: 2000,
            ..MinerConfig::default()
        };
        let (supervisor, events) = MinerSupervisor::new(config);
        (dir, supervisor, events)
    }

    // Runs the script through /bin/sh so nothing has to be marked executable.
    const TEMPLATE: &str = "/bin/sh miner.sh -o WALLETADDRESS -a x17";

    async fn collect_until<F>(
        events: &mut mpsc::UnboundedReceiver<SupervisorEvent>,
        done: F,
    ) -> Vec<SupervisorEvent>
    where
        F: Fn(&SupervisorEvent) -> bool,
    {
        let mut seen = Vec::new();
        loop {
            let event = tokio::time::timeout(WAIT, events.recv())
                .await
                .expect("timed out waiting for supervisor event")
                .expect("event channel closed");
            let finished = done(&event);
            seen.push(event);
            if finished {
                return seen;
            }
        }
    }

    fn is_output(event: &SupervisorEvent, text: &str) -> bool {
        matches!(event, SupervisorEvent::Output(out) if out.line == text)
    }

    fn is_alive(pid: u32) -> bool {
        if unsafe { libc::kill(pid as libc::pid_t, 0) } != 0 {
            return false;
        }
        // A zombie still answers signal 0.
        let stat = PathBuf::from(format!("/proc/{pid}/stat"));
        match std::fs::read_to_string(stat) {
            Ok(content) => content
                .rsplit(')')
                .next()
                .map(|rest| !rest.trim_start().starts_with('Z'))
                .unwrap_or(true),
            Err(_) => true,
        }
    }

    async fn wait_dead(pid: u32) -> bool {
        for _ in 0..50 {
            if !is_alive(pid) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_configure_rejects_template_without_placeholder() {
        let (_dir, supervisor, _events) = setup("");
        supervisor.configure(TEMPLATE, "V1abc").unwrap();

        let err = supervisor.configure("/bin/sh miner.sh -o pool", "V1abc").unwrap_err();
        assert!(matches!(err, AppError::InvalidTemplate(_)));
        assert_eq!(supervisor.template().as_deref(), Some(TEMPLATE));
    }

    #[tokio::test]
    async fn test_configure_rejects_empty_address() {
        let (_dir, supervisor, _events) = setup("");
        let err = supervisor.configure(TEMPLATE, "   ").unwrap_err();
        assert!(matches!(err, AppError::MissingAddress));
        assert_eq!(supervisor.template(), None);
    }

    #[tokio::test]
    async fn test_resolved_command_substitutes_address() {
        let (_dir, supervisor, _events) = setup("");
        supervisor
            .configure("miner.exe -o WALLETADDRESS -a x17", "V1abc")
            .unwrap();
        let resolved = supervisor.resolved_command().unwrap();
        assert_eq!(resolved.command_line(), "miner.exe -o V1abc -a x17");
    }

    #[tokio::test]
    async fn test_start_unconfigured_is_no_selection() {
        let (_dir, supervisor, _events) = setup("");
        assert!(matches!(supervisor.start().await, Err(AppError::NoSelection)));
        assert_eq!(supervisor.state(), SupervisorState::Stopped);
    }

    #[tokio::test]
    async fn test_start_missing_executable_fails_without_spawning() {
        let (dir, supervisor, mut events) = setup("");
        supervisor
            .configure("ccminer -o WALLETADDRESS -a x17", "V1abc")
            .unwrap();

        let err = supervisor.start().await.unwrap_err();
        assert!(matches!(err, AppError::ExecutableNotFound(_)));
        assert!(matches!(supervisor.state(), SupervisorState::Failed(_)));
        assert_eq!(
            events.recv().await,
            Some(SupervisorEvent::StateChanged(SupervisorState::Starting))
        );
        assert!(matches!(
            events.recv().await,
            Some(SupervisorEvent::StateChanged(SupervisorState::Failed(_)))
        ));
        assert!(events.try_recv().is_err());
        assert!(!dir.path().join("miner.log").exists(), "nothing was launched");

        supervisor.stop().await.unwrap();
        assert_eq!(supervisor.state(), SupervisorState::Stopped);
    }

    #[tokio::test]
    async fn test_stop_when_stopped_is_noop() {
        let (_dir, supervisor, mut events) = setup("");
        supervisor.stop().await.unwrap();
        assert_eq!(supervisor.state(), SupervisorState::Stopped);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_start_relays_output_and_stop_kills_child() {
        let (dir, supervisor, mut events) = setup("echo \"args: $@\"\necho oops >&2\nexec sleep 30\n");
        supervisor.configure(TEMPLATE, "V1abc").unwrap();

        let pid = supervisor.start().await.unwrap();
        assert_eq!(supervisor.state(), SupervisorState::Running { pid });

        let mut seen = Vec::new();
        while !(seen.iter().any(|e| is_output(e, "args: -o V1abc -a x17"))
            && seen.iter().any(|e| is_output(e, "oops")))
        {
            seen.extend(collect_until(&mut events, |e| matches!(e, SupervisorEvent::Output(_))).await);
        }
        assert!(seen.contains(&SupervisorEvent::StateChanged(SupervisorState::Running { pid })));
        assert!(seen.iter().any(|e| {
            matches!(e, SupervisorEvent::Output(out) if out.stream == OutputStream::Stderr && out.line == "oops")
        }));
        assert!(supervisor.last_output_at().is_some());

        supervisor.stop().await.unwrap();
        assert_eq!(supervisor.state(), SupervisorState::Stopped);
        assert!(!is_alive(pid), "child must be reaped after stop");

        let mut seen = collect_until(&mut events, |e| {
            *e == SupervisorEvent::StateChanged(SupervisorState::Stopped)
        })
        .await;
        // stop() has returned, so everything it emits is already queued.
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        let count = |state: SupervisorState| {
            seen.iter()
                .filter(|e| **e == SupervisorEvent::StateChanged(state.clone()))
                .count()
        };
        assert_eq!(count(SupervisorState::Stopping), 1);
        assert_eq!(count(SupervisorState::Stopped), 1);
        assert!(!seen
            .iter()
            .any(|e| matches!(e, SupervisorEvent::ErrorOccurred(_))));

        let log = std::fs::read_to_string(dir.path().join("miner.log")).unwrap();
        assert!(log.contains("args: -o V1abc -a x17\n"));
    }

    #[tokio::test]
    async fn test_start_non_executable_is_launch_failure() {
        use std::os::unix::fs::PermissionsExt;

        let (dir, supervisor, mut events) = setup("");
        let binary = dir.path().join("miner.bin");
        std::fs::write(&binary, "not a program").unwrap();
        std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o644)).unwrap();
        supervisor.configure("miner.bin -o WALLETADDRESS", "V1abc").unwrap();

        let err = supervisor.start().await.unwrap_err();
        assert!(matches!(err, AppError::LaunchFailed(_)));
        assert!(matches!(supervisor.state(), SupervisorState::Failed(_)));

        let seen = collect_until(&mut events, |e| {
            matches!(e, SupervisorEvent::StateChanged(SupervisorState::Failed(_)))
        })
        .await;
        assert!(seen.contains(&SupervisorEvent::ErrorOccurred(ProcessError::FailedToStart)));
        assert!(!seen
            .iter()
            .any(|e| matches!(e, SupervisorEvent::StateChanged(SupervisorState::Running { .. }))));
    }

    #[tokio::test]
    async fn test_start_with_relative_working_dir() {
        // Created under the test's cwd so it can be named by a relative path.
        let dir = tempfile::Builder::new()
            .prefix("miner-wd-")
            .tempdir_in(".")
            .unwrap();
        let working_dir = PathBuf::from(dir.path().file_name().unwrap());
        assert!(working_dir.is_relative());
        std::os::unix::fs::symlink("/bin/sh", dir.path().join("sh")).unwrap();
        std::fs::write(dir.path().join("miner.sh"), "echo \"in $(basename \"$PWD\")\"\nexec sleep 30\n")
            .unwrap();

        let config = MinerConfig {
            working_dir: working_dir.clone(),
            stop_grace_ms: 2000,
            kill_timeout_ms: 2000,
            ..MinerConfig::default()
        };
        let (supervisor, mut events) = MinerSupervisor::new(config);
        supervisor.configure("sh miner.sh -o WALLETADDRESS", "V1abc").unwrap();

        let pid = supervisor.start().await.unwrap();
        assert_eq!(supervisor.state(), SupervisorState::Running { pid });
        let expected = format!("in {}", working_dir.display());
        collect_until(&mut events, |e| is_output(e, &expected)).await;

        supervisor.shutdown().await.unwrap();
        assert!(!is_alive(pid));
        let log = std::fs::read_to_string(dir.path().join("miner.log")).unwrap();
        assert!(log.contains(&expected));
    }

    #[tokio::test]
    async fn test_final_output_arrives_before_stopped() {
        let (dir, supervisor, mut events) = setup(
            "i=0\nwhile [ $i -lt 3000 ]; do echo \"line $i\"; i=$((i+1)); done\necho LASTWORDS\nexit 3\n",
        );
        supervisor.configure(TEMPLATE, "V1abc").unwrap();
        supervisor.start().await.unwrap();

        let seen = collect_until(&mut events, |e| {
            *e == SupervisorEvent::StateChanged(SupervisorState::Stopped)
        })
        .await;
        let last_words = seen
            .iter()
            .position(|e| is_output(e, "LASTWORDS"))
            .expect("last line relayed before Stopped");
        let exited = seen
            .iter()
            .position(|e| *e == SupervisorEvent::Exited { code: Some(3) })
            .unwrap();
        assert!(last_words < exited);

        // The CLI closes the log as soon as it sees Stopped.
        supervisor.shutdown().await.unwrap();
        let log = std::fs::read_to_string(dir.path().join("miner.log")).unwrap();
        assert_eq!(log.lines().count(), 3001);
        assert!(log.ends_with("LASTWORDS\n"));
    }

    #[tokio::test]
    async fn test_start_twice_replaces_child() {
        let (_dir, supervisor, _events) = setup("exec sleep 30\n");
        supervisor.configure(TEMPLATE, "V1abc").unwrap();

        let first = supervisor.start().await.unwrap();
        let second = supervisor.start().await.unwrap();

        assert_ne!(first, second);
        assert!(!is_alive(first), "first child must be terminated");
        assert!(is_alive(second));
        assert_eq!(supervisor.state(), SupervisorState::Running { pid: second });

        supervisor.shutdown().await.unwrap();
        assert!(!is_alive(second));
    }

    #[tokio::test]
    async fn test_stop_escalates_to_kill() {
        let (_dir, supervisor, _events) = setup("trap '' TERM\nwhile true; do sleep 1; done\n");
        let supervisor = {
            let mut supervisor = supervisor;
            supervisor.config.stop_grace_ms = 300;
            supervisor
        };
        supervisor.configure(TEMPLATE, "V1abc").unwrap();

        let pid = supervisor.start().await.unwrap();
        // Give the shell time to install the trap.
        tokio::time::sleep(Duration::from_millis(300)).await;
        supervisor.stop().await.unwrap();

        assert_eq!(supervisor.state(), SupervisorState::Stopped);
        assert!(!is_alive(pid));
    }

    #[tokio::test]
    async fn test_crash_reports_error_and_stops() {
        let (_dir, supervisor, mut events) = setup("echo bye\nexit 3\n");
        supervisor.configure(TEMPLATE, "V1abc").unwrap();
        supervisor.start().await.unwrap();

        let seen = collect_until(&mut events, |e| {
            *e == SupervisorEvent::StateChanged(SupervisorState::Stopped)
        })
        .await;
        assert!(seen.contains(&SupervisorEvent::ErrorOccurred(ProcessError::Crashed)));
        assert!(seen.contains(&SupervisorEvent::Exited { code: Some(3) }));
        assert_eq!(supervisor.state(), SupervisorState::Stopped);
    }

    #[tokio::test]
    async fn test_clean_exit_is_not_an_error() {
        let (_dir, supervisor, mut events) = setup("exit 0\n");
        supervisor.configure(TEMPLATE, "V1abc").unwrap();
        supervisor.start().await.unwrap();

        let seen = collect_until(&mut events, |e| {
            *e == SupervisorEvent::StateChanged(SupervisorState::Stopped)
        })
        .await;
        assert!(seen.contains(&SupervisorEvent::Exited { code: Some(0) }));
        assert!(!seen
            .iter()
            .any(|e| matches!(e, SupervisorEvent::ErrorOccurred(_))));
    }

    #[tokio::test]
    async fn test_drop_kills_child() {
        let (_dir, supervisor, _events) = setup("exec sleep 30\n");
        supervisor.configure(TEMPLATE, "V1abc").unwrap();
        let pid = supervisor.start().await.unwrap();
        assert!(is_alive(pid));

        drop(supervisor);
        assert!(wait_dead(pid).await, "child outlived its supervisor");
    }
}
