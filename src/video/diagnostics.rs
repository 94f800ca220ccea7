//! Encoder diagnostic output drain.
//!
//! The encoder writes progress and errors to its diagnostic pipe for as long
//! as it runs. If nobody reads that pipe it fills up, the encoder blocks on
//! it, stops reading frames, and the frame writer blocks in turn. The drain
//! thread reads until end-of-file and keeps only a bounded tail.

use std::io::{self, Read};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

/// Bytes of diagnostic output kept for error reports.
pub const DIAGNOSTIC_TAIL_BYTES: usize = 4096;

const READ_CHUNK: usize = 4096;

/// Background reader for a child's diagnostic stream.
pub struct DiagnosticDrain {
    handle: Option<JoinHandle<()>>,
    tail: Arc<Mutex<Vec<u8>>>,
}

impl DiagnosticDrain {
    /// Start draining `reader` on a dedicated thread.
    pub fn spawn<R: Read + Send + 'static>(reader: R) -> io::Result<Self> {
        let tail = Arc::new(Mutex::new(Vec::with_capacity(DIAGNOSTIC_TAIL_BYTES)));
        let tail_for_thread = Arc::clone(&tail);

        let handle = thread::Builder::new()
            .name("encoder-diagnostics".to_string())
            .spawn(move || drain(reader, &tail_for_thread))?;

        Ok(Self {
            handle: Some(handle),
            tail,
        })
    }

    /// The most recent diagnostic output, lossily decoded.
    pub fn tail(&self) -> String {
        self.tail
            .lock()
            .map(|tail| String::from_utf8_lossy(&tail).trim().to_string())
            .unwrap_or_default()
    }

    /// Whether the drain thread has already been joined.
    pub fn is_joined(&self) -> bool {
        self.handle.is_none()
    }

    /// Wait for the thread to see end-of-file and return the tail.
    ///
    /// Only returns once the writing end is closed, i.e. after the child has
    /// exited. Safe to call more than once.
    pub fn join(&mut self) -> String {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("Encoder diagnostic thread panicked");
            }
        }
        self.tail()
    }
}

fn drain<R: Read>(mut reader: R, tail: &Mutex<Vec<u8>>) {
    let mut buf = [0u8; READ_CHUNK];
    let mut line = Vec::new();

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                log::warn!("Failed to read encoder diagnostics: {}", e);
                break;
            }
        };
        let chunk = &buf[..n];

        if let Ok(mut tail) = tail.lock() {
            push_bounded(&mut tail, chunk, DIAGNOSTIC_TAIL_BYTES);
        }

        if log::log_enabled!(log::Level::Debug) {
            for &byte in chunk {
                if byte == b'\n' || byte == b'\r' {
                    log_line(&line);
                    line.clear();
                } else if line.len() < READ_CHUNK {
                    line.push(byte);
                }
            }
        }
    }
    log_line(&line);
}

fn log_line(line: &[u8]) {
    let text = String::from_utf8_lossy(line);
    let text = text.trim();
    if !text.is_empty() {
        log::debug!("encoder: {}", text);
    }
}

/// Append `data`, dropping the oldest bytes beyond `limit`.
fn push_bounded(tail: &mut Vec<u8>, data: &[u8], limit: usize) {
    if data.len() >= limit {
        tail.clear();
        tail.extend_from_slice(&data[data.len() - limit..]);
        return;
    }
    tail.extend_from_slice(data);
    if tail.len() > limit {
        let excess = tail.len() - limit;
        tail.drain(..excess);
    }
}
