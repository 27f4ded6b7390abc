//! Hand a delta to the configured command.
//!
//! The command's stdout/stderr are inherited. The delta is written to its
//! stdin as one JSON document from a scoped writer thread while this thread
//! waits on the child, so neither side can stall the other on a full pipe.
//! The writer always drops its end of the pipe, which signals EOF.

use std::io::{self, BufWriter, Write};
use std::process::{ChildStdin, Command, Stdio};
use std::thread;

use feed_trigger_core::FeedSnapshot;

use crate::error::SyncError;

/// Run `command` with `delta` on its stdin and wait for it.
///
/// Exit status is checked first: a failed command reports
/// [`SyncError::CommandFailed`] even if the writer also failed. A successful
/// command whose stdin could not be fully written reports [`SyncError::Write`].
pub fn dispatch(delta: &FeedSnapshot, command: &[String]) -> Result<(), SyncError> {
    let Some((program, args)) = command.split_first() else {
        return Err(SyncError::CommandStart {
            program: String::new(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "empty command"),
        });
    };

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|source| SyncError::CommandStart {
            program: program.clone(),
            source,
        })?;

    let Some(stdin) = child.stdin.take() else {
        let _ = child.kill();
        let _ = child.wait();
        return Err(SyncError::CommandStart {
            program: program.clone(),
            source: io::Error::other("child stdin was not captured"),
        });
    };

    tracing::debug!(program = %program, entries = delta.entries.len(), "dispatching delta");

    let (status, written) = thread::scope(|scope| {
        let writer = scope.spawn(move || write_delta(stdin, delta));
        let status = child.wait();
        let written = writer
            .join()
            .unwrap_or_else(|_| Err(io::Error::other("stdin writer panicked")));
        (status, written)
    });

    let status = status.map_err(|source| SyncError::CommandWait {
        program: program.clone(),
        source,
    })?;
    if !status.success() {
        if let Err(err) = &written {
            tracing::debug!(program = %program, error = %err, "stdin write also failed");
        }
        return Err(SyncError::CommandFailed {
            program: program.clone(),
            status,
        });
    }
    written.map_err(|source| SyncError::Write {
        program: program.clone(),
        source,
    })
}

/// Serialize `delta` as one newline-terminated JSON document.
///
/// `stdin` is consumed and dropped on every path, closing the pipe.
fn write_delta(stdin: ChildStdin, delta: &FeedSnapshot) -> io::Result<()> {
    let mut out = BufWriter::new(stdin);
    serde_json::to_writer(&mut out, delta)?;
    out.write_all(b"\n")?;
    out.flush()
}
