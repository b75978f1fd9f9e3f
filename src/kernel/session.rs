//! One interpreter subprocess executing one notebook.
//!
//! The session spawns the driver, waits for its `ready` handshake, sends code cells one by one and stops at the
//! first error reply. The whole exchange runs under the notebook budget; each reply can additionally be bounded
//! by a cell budget. On any early exit the child is dropped, and `kill_on_drop` takes the interpreter down with it.

use std::cell::Cell as StdCell;
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use nbcheck_format::Notebook;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use super::protocol::{CellRequest, KernelReply};
use crate::runner::{ExecutionError, ExecutionReport};

/// Driver source, passed to the interpreter with `-c`.
const DRIVER: &str = include_str!("driver.py");

/// Maximum interpreter output captured per notebook (10 MiB).
const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// How long a finished driver gets to exit after its stdin closes.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Everything a session needs besides the notebook itself.
#[derive(Debug, Clone)]
pub struct SessionOptions<'a> {
    pub program: &'a str,
    pub working_dir: &'a Path,
    pub notebook_timeout: Duration,
    pub cell_timeout: Option<Duration>,
}

/// Why the exchange with the driver stopped early.
enum DriveError {
    /// The driver closed its end; the real cause is in its stderr and exit status
    Eof,
    Failed(ExecutionError),
}

impl From<ExecutionError> for DriveError {
    fn from(err: ExecutionError) -> Self {
        DriveError::Failed(err)
    }
}

/// The protocol halves of the child's stdio.
struct Channel {
    writer: ChildStdin,
    reader: Lines<BufReader<ChildStdout>>,
}

impl Channel {
    async fn send(&mut self, request: &CellRequest<'_>) -> Result<(), DriveError> {
        let mut line = serde_json::to_string(request)
            .map_err(|e| ExecutionError::Protocol(format!("failed to encode request: {e}")))?;
        line.push('\n');

        let written = match self.writer.write_all(line.as_bytes()).await {
            Ok(()) => self.writer.flush().await,
            Err(e) => Err(e),
        };

        match written {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Err(DriveError::Eof),
            Err(e) => Err(DriveError::Failed(ExecutionError::Io(e))),
        }
    }

    async fn recv(&mut self) -> Result<KernelReply, DriveError> {
        loop {
            let Some(line) = self
                .reader
                .next_line()
                .await
                .map_err(|e| DriveError::Failed(ExecutionError::Io(e)))?
            else {
                return Err(DriveError::Eof);
            };

            match KernelReply::parse_line(&line) {
                Some(Ok(reply)) => return Ok(reply),
                Some(Err(e)) => {
                    return Err(ExecutionError::Protocol(format!("malformed reply {line:?}: {e}")).into());
                }
                None => {
                    if !line.trim().is_empty() {
                        tracing::debug!("Ignoring non-protocol kernel output: {}", line);
                    }
                }
            }
        }
    }
}

/// Execute every code cell of `notebook` in a fresh interpreter.
pub async fn run_notebook(options: &SessionOptions<'_>, notebook: &Notebook) -> Result<ExecutionReport, ExecutionError> {
    let mut child = spawn(options)?;

    let writer = child
        .stdin
        .take()
        .ok_or_else(|| ExecutionError::Protocol("kernel stdin unavailable".to_string()))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| ExecutionError::Protocol("kernel stdout unavailable".to_string()))?;
    let stderr_task = tokio::spawn(read_stream(child.stderr.take()));

    let mut channel = Channel {
        writer,
        reader: BufReader::new(stdout).lines(),
    };

    let current_cell = StdCell::new(None);
    let exchange = tokio::time::timeout(
        options.notebook_timeout,
        drive(&mut channel, notebook, options.cell_timeout, &current_cell),
    )
    .await;

    let outcome = match exchange {
        Ok(result) => result,
        Err(_elapsed) => Err(DriveError::Failed(ExecutionError::Timeout {
            budget: options.notebook_timeout,
            cell: current_cell.get(),
        })),
    };

    // Closing stdin tells the driver to exit.
    drop(channel);

    match outcome {
        Ok(cells_executed) => {
            let status = shutdown(&mut child).await;
            if let Some(status) = status.filter(|s| !s.success()) {
                tracing::warn!("Kernel exited with {} after finishing the notebook", status);
            }
            Ok(ExecutionReport {
                cells_executed,
                kernel_output: collect_output(stderr_task).await,
            })
        }
        Err(DriveError::Eof) => {
            let status = shutdown(&mut child).await;
            Err(ExecutionError::KernelDied {
                status: status.map_or_else(|| "still running".to_string(), |s| s.to_string()),
                stderr: collect_output(stderr_task).await,
            })
        }
        Err(DriveError::Failed(err)) => {
            let _ = child.kill().await;
            stderr_task.abort();
            Err(err)
        }
    }
}

/// Handshake, then one request/reply per code cell. Returns the number of cells executed.
async fn drive(
    channel: &mut Channel,
    notebook: &Notebook,
    cell_timeout: Option<Duration>,
    current_cell: &StdCell<Option<usize>>,
) -> Result<usize, DriveError> {
    match channel.recv().await? {
        KernelReply::Ready { python, ipython } => {
            tracing::debug!("Kernel ready (Python {}, IPython {})", python, ipython);
        }
        other => {
            return Err(ExecutionError::Protocol(format!("expected ready handshake, got {other:?}")).into());
        }
    }

    let mut executed = 0;
    for (index, cell) in notebook.code_cells() {
        current_cell.set(Some(index));
        channel
            .send(&CellRequest {
                cell: index,
                code: &cell.source,
            })
            .await?;

        let reply = match cell_timeout {
            Some(budget) => tokio::time::timeout(budget, channel.recv())
                .await
                .map_err(|_| ExecutionError::Timeout {
                    budget,
                    cell: Some(index),
                })??,
            None => channel.recv().await?,
        };

        match reply {
            KernelReply::Done { cell } if cell == index => executed += 1,
            KernelReply::Error {
                cell,
                ename,
                evalue,
                traceback,
            } if cell == index => {
                return Err(ExecutionError::CellFailed {
                    cell,
                    ename,
                    evalue,
                    traceback,
                }
                .into());
            }
            other => {
                return Err(ExecutionError::Protocol(format!("unexpected reply to cell {index}: {other:?}")).into());
            }
        }
    }

    current_cell.set(None);
    Ok(executed)
}

fn spawn(options: &SessionOptions<'_>) -> Result<Child, ExecutionError> {
    let mut cmd = Command::new(options.program);
    cmd.arg("-u")
        .arg("-c")
        .arg(DRIVER)
        .current_dir(options.working_dir)
        .env("MPLBACKEND", "Agg")
        .env("PYTHONIOENCODING", "utf-8")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    cmd.spawn().map_err(|source| ExecutionError::KernelSpawn {
        program: options.program.to_string(),
        source,
    })
}

/// Wait for the driver to exit on its own, killing it after [`SHUTDOWN_GRACE`].
async fn shutdown(child: &mut Child) -> Option<std::process::ExitStatus> {
    match tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await {
        Ok(Ok(status)) => Some(status),
        Ok(Err(e)) => {
            tracing::debug!("Failed to wait for kernel: {}", e);
            None
        }
        Err(_elapsed) => {
            tracing::debug!("Kernel did not exit within {:?}; killing it", SHUTDOWN_GRACE);
            let _ = child.kill().await;
            None
        }
    }
}

/// Await the stderr reader, giving up after [`SHUTDOWN_GRACE`] in case a grandchild still holds the pipe.
async fn collect_output(task: tokio::task::JoinHandle<Vec<u8>>) -> String {
    match tokio::time::timeout(SHUTDOWN_GRACE, task).await {
        Ok(Ok(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
        _ => String::new(),
    }
}

/// Read an entire output stream, keeping the first [`MAX_OUTPUT_BYTES`].
///
/// The rest is drained until EOF: the kernel outlives the cap, and a closed pipe would fail its next `print`.
async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut h) = handle {
        let _ = (&mut h).take(MAX_OUTPUT_BYTES as u64).read_to_end(&mut buf).await;
        let _ = tokio::io::copy(&mut h, &mut tokio::io::sink()).await;
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_stream_keeps_draining_past_cap() {
        let (mut writer, reader) = tokio::io::duplex(64 * 1024);
        let producer = tokio::spawn(async move {
            let chunk = vec![b'x'; 1024 * 1024];
            for _ in 0..12 {
                writer.write_all(&chunk).await?;
            }
            writer.shutdown().await
        });

        let captured = read_stream(Some(reader)).await;
        assert_eq!(captured.len(), MAX_OUTPUT_BYTES);
        // The writer never saw a closed pipe
        producer.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_read_stream_without_handle() {
        assert!(read_stream(None::<tokio::io::Empty>).await.is_empty());
    }
}
