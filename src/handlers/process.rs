//! Process execution and signal delivery.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

use crate::error::AgentError;
use crate::protocol::request::Environment;
use crate::protocol::response::Reply;

pub async fn exec(
    id: i64,
    cmd: &str,
    args: &[String],
    env: Option<&Environment>,
    stdin: Option<&[u8]>,
    working_dir: Option<&Path>,
    timeout_ms: Option<u64>,
) -> Reply {
    match exec_inner(cmd, args, env, stdin, working_dir, timeout_ms).await {
        Ok((exit_code, success, stdout, stderr)) => {
            Reply::Exec { id, exit_code, success, stdout, stderr }
        }
        Err(err) => Reply::error(id, err),
    }
}

/// `TimeoutMs` bounds only the wait on this one child, not a general cancellation mechanism: on
/// expiry the child is killed and reported as `(None, false, ..)` with whatever output had
/// already been captured, rather than failing the request outright.
async fn exec_inner(
    cmd: &str,
    args: &[String],
    env: Option<&Environment>,
    stdin: Option<&[u8]>,
    working_dir: Option<&Path>,
    timeout_ms: Option<u64>,
) -> Result<(Option<i32>, bool, Vec<u8>, Vec<u8>), AgentError> {
    let mut command = Command::new(cmd);
    command.args(args);
    command.stdin(Stdio::piped());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());

    if let Some(dir) = working_dir {
        command.current_dir(dir);
    }
    if let Some(env) = env {
        // Merged over the inherited environment, not a replacement: absent `Env` means inherit
        // unchanged, present `Env` overlays these variables on top of it.
        command.envs(env);
    }

    let mut child = command.spawn()?;

    let mut child_stdin = child.stdin.take();
    let stdin_bytes = stdin.map(<[u8]>::to_vec);
    tokio::spawn(async move {
        if let (Some(mut pipe), Some(bytes)) = (child_stdin.take(), stdin_bytes) {
            let _ = pipe.write_all(&bytes).await;
        }
        // Dropping the pipe here closes stdin so line-buffered children can see EOF.
    });

    // Reading stdout/stderr runs on its own tasks, independent of the `child.wait()` below, so a
    // timeout that aborts the wait still leaves whatever was captured so far intact.
    let mut stdout_pipe = child.stdout.take().expect("stdout was piped");
    let mut stderr_pipe = child.stderr.take().expect("stderr was piped");
    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        let _ = stdout_pipe.read_to_end(&mut buf).await;
        buf
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        let _ = stderr_pipe.read_to_end(&mut buf).await;
        buf
    });

    let wait_result = match timeout_ms {
        Some(ms) => tokio::time::timeout(Duration::from_millis(ms), child.wait()).await,
        None => Ok(child.wait().await),
    };

    let (exit_code, success) = match wait_result {
        Ok(status) => {
            let status = status?;
            (status.code(), status.success())
        }
        Err(_elapsed) => {
            let _ = child.start_kill();
            let _ = child.wait().await;
            (None, false)
        }
    };

    let stdout = stdout_task.await.unwrap_or_default();
    let stderr = stderr_task.await.unwrap_or_default();
    Ok((exit_code, success, stdout, stderr))
}

pub fn signal(id: i64, pid: i32, requested: &str) -> Reply {
    let signal = match requested {
        "terminate" => Signal::SIGTERM,
        "kill" => Signal::SIGKILL,
        "interrupt" => Signal::SIGINT,
        other => {
            return Reply::error(
                id,
                AgentError::invalid_input(format!("unrecognized signal: {other}")),
            )
        }
    };

    match signal::kill(Pid::from_raw(pid), signal) {
        Ok(()) => Reply::SignalSuccess { id },
        Err(err) => Reply::error(id, AgentError::from(err)),
    }
}
