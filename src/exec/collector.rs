// src/exec/collector.rs

//! Output collection from the merged stdout/stderr pipe.
//!
//! Reading happens on a dedicated OS thread: pipe reads block, and a
//! detached thread never holds up runtime shutdown if a grandchild keeps the
//! pipe open after the direct child is gone.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::thread;

use tokio::sync::oneshot;
use tracing::debug;

/// How output is gathered.
pub enum CollectMode {
    /// Line by line, each line echoed to the given console as it arrives.
    Live(Box<dyn Write + Send>),
    /// One read to EOF.
    Buffered,
}

/// Append-only ordered record of output chunks.
#[derive(Debug, Default)]
pub struct OutputBuffer {
    chunks: Vec<String>,
}

impl OutputBuffer {
    pub fn push(&mut self, chunk: String) {
        self.chunks.push(chunk);
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn into_text(self) -> String {
        self.chunks.concat()
    }
}

/// Start the collector thread. The receiver resolves once the pipe hits EOF.
pub fn spawn_collector<R>(
    reader: R,
    mode: CollectMode,
) -> io::Result<oneshot::Receiver<io::Result<String>>>
where
    R: Read + Send + 'static,
{
    let (tx, rx) = oneshot::channel();

    thread::Builder::new()
        .name("output-collector".to_string())
        .spawn(move || {
            let result = match mode {
                CollectMode::Live(echo) => collect_live(reader, echo),
                CollectMode::Buffered => collect_buffered(reader),
            };
            if tx.send(result).is_err() {
                debug!("output discarded; supervisor no longer waiting");
            }
        })?;

    Ok(rx)
}

/// Read line by line, forwarding each line to `echo` before appending it.
///
/// Malformed UTF-8 is replaced, never fatal. Echo failures are ignored so a
/// closed console cannot stop collection.
pub fn collect_live<R: Read, W: Write>(reader: R, mut echo: W) -> io::Result<String> {
    let mut reader = BufReader::new(reader);
    let mut buffer = OutputBuffer::default();
    let mut raw = Vec::new();

    loop {
        raw.clear();
        if reader.read_until(b'\n', &mut raw)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&raw).into_owned();
        let _ = echo.write_all(line.as_bytes()).and_then(|_| echo.flush());
        buffer.push(line);
    }

    debug!(lines = buffer.len(), "live output collected");
    Ok(buffer.into_text())
}

pub fn collect_buffered<R: Read>(mut reader: R) -> io::Result<String> {
    let mut raw = Vec::new();
    reader.read_to_end(&mut raw)?;
    Ok(String::from_utf8_lossy(&raw).into_owned())
}
