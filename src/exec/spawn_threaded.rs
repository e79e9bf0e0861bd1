//! Threaded spawn strategy on `std::process`
//!
//! Reader threads append each chunk to a shared buffer as it arrives and
//! report on a channel when their pipe closes. A supervisor thread polls the
//! child for exit, the deadline and the cancellation token, then waits for the
//! readers under the same deadline and token, and settles the call exactly
//! once through a oneshot channel.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::process::{decode, Invocation, ProcessError, ProcessOutput};
use crate::context::CancelToken;

const POLL_INTERVAL: Duration = Duration::from_millis(5);
const CHUNK_SIZE: usize = 8 * 1024;

type SharedBuf = Arc<Mutex<Vec<u8>>>;

enum Outcome {
    Exited(ExitStatus),
    WaitFailed(std::io::Error),
    TimedOut,
    Cancelled,
}

enum Drained {
    Complete,
    TimedOut,
    Cancelled,
}

pub(super) async fn run(invocation: &Invocation) -> Result<ProcessOutput, ProcessError> {
    let mut command = Command::new(&invocation.program);
    command
        .args(&invocation.args)
        .current_dir(&invocation.cwd)
        .env_clear()
        .envs(&invocation.env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command.spawn().map_err(|source| ProcessError::Spawn {
        program: invocation.program.clone(),
        source,
    })?;

    let stdout_buf: SharedBuf = Arc::default();
    let stderr_buf: SharedBuf = Arc::default();
    let (done_tx, done_rx) = mpsc::channel();
    let mut readers = 0;
    if let Some(pipe) = child.stdout.take() {
        spawn_reader(pipe, Arc::clone(&stdout_buf), done_tx.clone());
        readers += 1;
    }
    if let Some(pipe) = child.stderr.take() {
        spawn_reader(pipe, Arc::clone(&stderr_buf), done_tx.clone());
        readers += 1;
    }
    drop(done_tx);

    let (tx, rx) = oneshot::channel();
    let timeout = invocation.timeout;
    let deadline = Instant::now() + timeout;
    let cancel = invocation.cancel.clone();
    let program = invocation.program.clone();

    thread::spawn(move || {
        let mut outcome = supervise(&mut child, timeout, deadline, cancel.as_ref());
        if matches!(outcome, Outcome::Exited(_)) {
            // Readers still blocked on a pipe some grandchild holds open are
            // left behind; they exit when that pipe closes.
            match drain(&done_rx, readers, deadline, cancel.as_ref()) {
                Drained::Complete => {}
                Drained::TimedOut => {
                    tracing::warn!(
                        "child {} exited but its output pipes stayed open past {} ms",
                        child.id(),
                        timeout.as_millis()
                    );
                    outcome = Outcome::TimedOut;
                }
                Drained::Cancelled => outcome = Outcome::Cancelled,
            }
        }
        let result = match outcome {
            Outcome::Exited(status) => {
                let stdout = decode(&stdout_buf.lock());
                let stderr = decode(&stderr_buf.lock());
                if status.success() {
                    Ok(ProcessOutput { stdout, stderr })
                } else {
                    Err(ProcessError::Exited {
                        exit_code: status.code(),
                        stdout,
                        stderr,
                    })
                }
            }
            Outcome::WaitFailed(source) => Err(ProcessError::Spawn { program, source }),
            Outcome::TimedOut => Err(ProcessError::Timeout {
                timeout,
                stdout: decode(&stdout_buf.lock()),
                stderr: decode(&stderr_buf.lock()),
            }),
            Outcome::Cancelled => Err(ProcessError::Cancelled),
        };
        let _ = tx.send(result);
    });

    rx.await.unwrap_or_else(|_| {
        Err(ProcessError::Spawn {
            program: invocation.program.clone(),
            source: std::io::Error::other("supervisor thread exited without a result"),
        })
    })
}

fn supervise(child: &mut Child, timeout: Duration, deadline: Instant, cancel: Option<&CancelToken>) -> Outcome {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Outcome::Exited(status),
            Ok(None) => {}
            Err(e) => return Outcome::WaitFailed(e),
        }

        if cancel.is_some_and(CancelToken::is_cancelled) {
            tracing::debug!("child {} cancelled, killing", child.id());
            terminate(child);
            return Outcome::Cancelled;
        }

        let now = Instant::now();
        if now >= deadline {
            tracing::warn!(
                "child {} timed out after {} ms, killing",
                child.id(),
                timeout.as_millis()
            );
            terminate(child);
            return Outcome::TimedOut;
        }

        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

/// Kill and reap the child.
fn terminate(child: &mut Child) {
    if let Err(e) = child.kill() {
        tracing::warn!("failed to kill child process {}: {}", child.id(), e);
    }
    let _ = child.wait();
}

/// Wait until `pending` readers report their pipe closed, the deadline passes
/// or the token fires.
fn drain(done: &Receiver<()>, mut pending: usize, deadline: Instant, cancel: Option<&CancelToken>) -> Drained {
    while pending > 0 {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            return Drained::Cancelled;
        }
        let now = Instant::now();
        if now >= deadline {
            return Drained::TimedOut;
        }
        match done.recv_timeout(POLL_INTERVAL.min(deadline - now)) {
            Ok(()) => pending -= 1,
            Err(RecvTimeoutError::Timeout) => {}
            // Every reader is gone, finished or not.
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    Drained::Complete
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R, sink: SharedBuf, done: Sender<()>) {
    thread::spawn(move || {
        let mut chunk = [0u8; CHUNK_SIZE];
        loop {
            match pipe.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => sink.lock().extend_from_slice(&chunk[..n]),
            }
        }
        let _ = done.send(());
    });
}
