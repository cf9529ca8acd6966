// src/tasks/command.rs
//! External commands run as cancellable tasks.
//!
//! Reading a child's output blocks in a way a [`CancelToken`] cannot
//! interrupt, so every command gets a small watcher thread that kills the
//! child once the unit is cancelled. The kill closes the pipes, which ends
//! the read loop.

use std::ffi::{OsStr, OsString};
use std::io::{self, BufRead, BufReader, Read};
use std::mem;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};
use parking_lot::Mutex;
use thiserror::Error;

use super::cancel::{CANCEL_POLL, CancelToken, Interrupted};
use super::executor::TaskExecutor;
use super::result::{TaskError, TaskResult};

/// How often the watcher checks whether the command ended on its own.
const WATCH_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("empty command line")]
    Empty,

    #[error("failed to run `{command}`: {source}")]
    Io {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` exited with code {code}")]
    ExitCode { command: String, code: i32 },

    #[error(transparent)]
    Task(#[from] TaskError),
}

/// Run `cmd` on `executor`, handing each line of its stdout (or stderr, with
/// `consume_stderr`) to `on_line`. The other stream is logged.
///
/// The result is the exit code, or -1 if the child died from a signal it was
/// not sent by this task. Cancelling the result kills the child.
pub fn command_with_consumer<I, S, F>(
    executor: &TaskExecutor,
    cmd: I,
    consume_stderr: bool,
    mut on_line: F,
) -> TaskResult<i32>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
    F: FnMut(String) + Send + 'static,
{
    let args: Vec<OsString> = cmd.into_iter().map(|arg| arg.as_ref().to_os_string()).collect();
    if args.is_empty() {
        return executor.failed(CommandError::Empty);
    }
    let command: Arc<str> = describe(&args).into();

    executor.submit(move |token| {
        let io_error = |source| CommandError::Io {
            command: command.to_string(),
            source,
        };

        debug!("Running `{command}`");
        let mut child = Command::new(&args[0])
            .args(&args[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(io_error)?;
        let stdout = child.stdout.take().map(|s| Box::new(s) as Box<dyn Read + Send>);
        let stderr = child.stderr.take().map(|s| Box::new(s) as Box<dyn Read + Send>);
        let (consumed, logged) = if consume_stderr {
            (stderr, stdout)
        } else {
            (stdout, stderr)
        };

        let child = Arc::new(Mutex::new(child));
        let finished = Arc::new(AtomicBool::new(false));
        let watcher = spawn_watcher(token.clone(), child.clone(), finished.clone(), command.clone());
        let logger = logged.map(|stream| spawn_logger(stream, command.clone()));

        let mut read_error = None;
        if let Some(stream) = consumed {
            for line in BufReader::new(stream).lines() {
                match line {
                    Ok(line) => on_line(line),
                    // A killed child closes the pipe mid-read.
                    Err(_) if token.is_cancelled() => break,
                    Err(err) => {
                        read_error = Some(err);
                        kill(&child, &command);
                        break;
                    }
                }
            }
        }

        let status = reap(&child, token).map_err(io_error);
        finished.store(true, Ordering::Release);
        join(watcher);
        if let Some(logger) = logger {
            join(logger);
        }

        if token.is_cancelled() {
            return Err(Interrupted.into());
        }
        if let Some(err) = read_error {
            return Err(io_error(err).into());
        }
        match status?.code() {
            Some(code) => Ok(code),
            None => {
                warn!("`{command}` was terminated by a signal");
                Ok(-1)
            }
        }
    })
}

/// Run `cmd` on `executor` and wait for it, returning its stdout lines.
///
/// A non-zero exit code is an error. Blocks the caller, so never call it from
/// a unit running on `executor` itself.
pub fn command<I, S>(executor: &TaskExecutor, cmd: I) -> Result<Vec<String>, CommandError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<OsString> = cmd.into_iter().map(|arg| arg.as_ref().to_os_string()).collect();
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink = lines.clone();
    let code = command_with_consumer(executor, &args, false, move |line| sink.lock().push(line)).get()?;
    if code != 0 {
        return Err(CommandError::ExitCode {
            command: describe(&args),
            code,
        });
    }
    Ok(mem::take(&mut *lines.lock()))
}

fn describe(args: &[OsString]) -> String {
    args.iter()
        .map(|arg| arg.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

fn kill(child: &Mutex<Child>, command: &str) {
    let mut child = child.lock();
    if let Ok(None) = child.try_wait() {
        info!("Killing `{command}`");
        if let Err(err) = child.kill() {
            warn!("Failed to kill `{command}`: {err}");
        }
    }
}

/// Wait for the child to exit, killing it if `token` is cancelled first.
fn reap(child: &Mutex<Child>, token: &CancelToken) -> io::Result<ExitStatus> {
    loop {
        if let Some(status) = child.lock().try_wait()? {
            return Ok(status);
        }
        if token.sleep(CANCEL_POLL).is_err() {
            let mut child = child.lock();
            // Already exited is fine; wait() still reaps it.
            let _ = child.kill();
            return child.wait();
        }
    }
}

fn spawn_watcher(
    token: CancelToken,
    child: Arc<Mutex<Child>>,
    finished: Arc<AtomicBool>,
    command: Arc<str>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("command-watch".into())
        .spawn(move || {
            while !finished.load(Ordering::Acquire) {
                if token.sleep(WATCH_POLL).is_err() {
                    kill(&child, &command);
                    return;
                }
            }
        })
}

fn spawn_logger(stream: Box<dyn Read + Send>, command: Arc<str>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("command-log".into())
        .spawn(move || {
            for line in BufReader::new(stream).lines().map_while(Result::ok) {
                warn!("`{command}`: {line}");
            }
        })
}

fn join(handle: io::Result<JoinHandle<()>>) {
    match handle {
        Ok(handle) => {
            if handle.join().is_err() {
                warn!("Command helper thread panicked");
            }
        }
        Err(err) => warn!("Failed to start command helper thread: {err}"),
    }
}
