//! Subprocess supervision shared by the path generator and (optionally) the
//! executor: spawn, bounded stdout/stderr capture, health-check polling, and
//! clean shutdown.
//!
//! Ownership is strict — each `ManagedSubprocess` is owned by exactly one
//! caller (an `OnlinePlanner` or an `HttpExecutor`), and only that owner reads
//! the ring buffer or calls `kill`. The stdout/stderr drain tasks never call
//! back into the owner; they only append to the buffer.

use std::collections::VecDeque;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Configurable timeouts around subprocess lifecycle (spec §5).
#[derive(Debug, Clone)]
pub struct ProcessLimits {
    /// How long to poll the health endpoint before giving up (default 60s).
    pub health_wait: Duration,
    /// Interval between health-check polls.
    pub health_poll_interval: Duration,
    /// Short timeout applied to `hasModel`/`hasStep`/`reset` calls.
    pub control_call_timeout: Duration,
    /// Lines retained per stream in the ring buffer.
    pub ring_buffer_lines: usize,
}

impl Default for ProcessLimits {
    fn default() -> Self {
        Self {
            health_wait: Duration::from_secs(60),
            health_poll_interval: Duration::from_millis(200),
            control_call_timeout: Duration::from_secs(5),
            ring_buffer_lines: 200,
        }
    }
}

impl ProcessLimits {
    pub fn from_env() -> Self {
        let mut limits = Self::default();

        if let Ok(val) = std::env::var("ALTWALKER_HEALTH_WAIT_SECS") {
            if let Ok(n) = val.parse() {
                limits.health_wait = Duration::from_secs(n);
            }
        }
        if let Ok(val) = std::env::var("ALTWALKER_CONTROL_TIMEOUT_SECS") {
            if let Ok(n) = val.parse() {
                limits.control_call_timeout = Duration::from_secs(n);
            }
        }

        limits
    }
}

/// Bounded FIFO of captured output lines; oldest lines are evicted once full.
#[derive(Debug, Default)]
pub struct RingBuffer {
    lines: VecDeque<String>,
    capacity: usize,
}

impl RingBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, line: String) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    pub fn tail(&self) -> String {
        self.lines.iter().cloned().collect::<Vec<_>>().join("\n")
    }
}

/// An externally-spawned process whose stdout/stderr are drained into
/// bounded buffers in the background, and whose exit status can be polled.
pub struct ManagedSubprocess {
    child: Child,
    stdout: Arc<Mutex<RingBuffer>>,
    stderr: Arc<Mutex<RingBuffer>>,
}

impl ManagedSubprocess {
    pub async fn spawn(program: &str, args: &[String], limits: &ProcessLimits) -> std::io::Result<Self> {
        let mut child = Command::new(program)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = Arc::new(Mutex::new(RingBuffer::new(limits.ring_buffer_lines)));
        let stderr = Arc::new(Mutex::new(RingBuffer::new(limits.ring_buffer_lines)));

        if let Some(out) = child.stdout.take() {
            let buf = stdout.clone();
            tokio::spawn(drain_into(out, buf, "stdout"));
        }
        if let Some(err) = child.stderr.take() {
            let buf = stderr.clone();
            tokio::spawn(drain_into(err, buf, "stderr"));
        }

        Ok(Self {
            child,
            stdout,
            stderr,
        })
    }

    /// `None` while the process is still running.
    pub fn exit_status(&mut self) -> std::io::Result<Option<std::process::ExitStatus>> {
        self.child.try_wait()
    }

    pub async fn captured_output_tail(&self) -> String {
        let out = self.stdout.lock().await.tail();
        let err = self.stderr.lock().await.tail();
        format!("--- stdout ---\n{out}\n--- stderr ---\n{err}")
    }

    /// Idempotent: killing an already-exited child is a no-op.
    pub async fn kill(&mut self) -> std::io::Result<()> {
        match self.child.try_wait()? {
            Some(_) => Ok(()),
            None => self.child.kill().await,
        }
    }
}

async fn drain_into(
    stream: impl tokio::io::AsyncRead + Unpin,
    buffer: Arc<Mutex<RingBuffer>>,
    label: &'static str,
) {
    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                debug!(stream = label, "{line}");
                buffer.lock().await.push(line);
            }
            Ok(None) => break,
            Err(e) => {
                warn!(stream = label, error = %e, "error reading subprocess stream");
                break;
            }
        }
    }
}

/// Polls a health-check closure until it returns `true`, the process exits,
/// or `limits.health_wait` elapses.
pub async fn wait_until_healthy<F, Fut>(
    process: &mut ManagedSubprocess,
    limits: &ProcessLimits,
    mut is_healthy: F,
) -> Result<(), crate::errors::GeneratorError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + limits.health_wait;

    loop {
        if is_healthy().await {
            return Ok(());
        }

        if let Some(status) = process.exit_status().map_err(|e| {
            crate::errors::GeneratorError::MalformedResponse(format!("failed to poll child: {e}"))
        })? {
            let tail = process.captured_output_tail().await;
            return Err(crate::errors::GeneratorError::GeneratorExited {
                exit_code: status.code(),
                tail,
            });
        }

        if tokio::time::Instant::now() >= deadline {
            return Err(crate::errors::GeneratorError::HealthTimeout);
        }

        sleep(limits.health_poll_interval).await;
    }
}
