//! Async spawn strategy on `tokio::process`

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use super::process::{decode, Invocation, ProcessError, ProcessOutput};

/// How long to wait for pipe readers after the child was killed.
const READER_GRACE: Duration = Duration::from_millis(500);

enum Settled {
    Exited(std::io::Result<ExitStatus>),
    TimedOut,
    Cancelled,
}

/// How collecting the pipes ended once the child itself had exited.
enum Collected {
    Output(Vec<u8>, Vec<u8>),
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
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|source| ProcessError::Spawn {
        program: invocation.program.clone(),
        source,
    })?;

    let mut stdout_task = tokio::spawn(read_to_completion(child.stdout.take()));
    let mut stderr_task = tokio::spawn(read_to_completion(child.stderr.take()));

    let cancelled = async {
        match &invocation.cancel {
            Some(token) => token.cancelled().await,
            None => std::future::pending::<()>().await,
        }
    };
    let expired = tokio::time::sleep(invocation.timeout);
    tokio::pin!(cancelled);
    tokio::pin!(expired);

    let settled = tokio::select! {
        biased;
        _ = &mut cancelled => Settled::Cancelled,
        _ = &mut expired => Settled::TimedOut,
        status = child.wait() => Settled::Exited(status),
    };

    match settled {
        Settled::Exited(Ok(status)) => {
            // A grandchild may still hold the pipes open, so the deadline and
            // the token keep running while they drain.
            let collected = tokio::select! {
                biased;
                _ = &mut cancelled => Collected::Cancelled,
                _ = &mut expired => Collected::TimedOut,
                (out, err) = async { tokio::join!(&mut stdout_task, &mut stderr_task) } => {
                    Collected::Output(out.unwrap_or_default(), err.unwrap_or_default())
                }
            };
            let (stdout, stderr) = match collected {
                Collected::Output(stdout, stderr) => (decode(&stdout), decode(&stderr)),
                Collected::TimedOut => {
                    tracing::warn!(
                        "{} exited but its output pipes stayed open past {} ms",
                        invocation.program.display(),
                        invocation.timeout.as_millis()
                    );
                    stdout_task.abort();
                    stderr_task.abort();
                    return Err(ProcessError::Timeout {
                        timeout: invocation.timeout,
                        stdout: String::new(),
                        stderr: String::new(),
                    });
                }
                Collected::Cancelled => {
                    tracing::debug!("{} cancelled while draining output", invocation.program.display());
                    stdout_task.abort();
                    stderr_task.abort();
                    return Err(ProcessError::Cancelled);
                }
            };
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
        Settled::Exited(Err(source)) => {
            stdout_task.abort();
            stderr_task.abort();
            Err(ProcessError::Spawn {
                program: invocation.program.clone(),
                source,
            })
        }
        Settled::TimedOut => {
            tracing::warn!(
                "{} timed out after {} ms, killing",
                invocation.program.display(),
                invocation.timeout.as_millis()
            );
            terminate(&mut child).await;
            let stdout = decode(&drain(&mut stdout_task).await);
            let stderr = decode(&drain(&mut stderr_task).await);
            Err(ProcessError::Timeout {
                timeout: invocation.timeout,
                stdout,
                stderr,
            })
        }
        Settled::Cancelled => {
            tracing::debug!("{} cancelled, killing", invocation.program.display());
            terminate(&mut child).await;
            stdout_task.abort();
            stderr_task.abort();
            Err(ProcessError::Cancelled)
        }
    }
}

async fn read_to_completion<R: AsyncRead + Unpin>(reader: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut reader) = reader {
        let _ = reader.read_to_end(&mut buf).await;
    }
    buf
}

/// Collect whatever a reader got, giving up if the pipe stays open (e.g. a
/// grandchild inherited it).
async fn drain(task: &mut JoinHandle<Vec<u8>>) -> Vec<u8> {
    match tokio::time::timeout(READER_GRACE, &mut *task).await {
        Ok(Ok(buf)) => buf,
        _ => {
            task.abort();
            Vec::new()
        }
    }
}

/// Kill and reap the child.
async fn terminate(child: &mut Child) {
    if let Err(e) = child.kill().await {
        tracing::warn!("failed to kill child process: {}", e);
    }
}
