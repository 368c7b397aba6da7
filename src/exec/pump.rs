// src/exec/pump.rs

//! Stream pumps: one Tokio task per child output stream.
//!
//! A pump reads raw chunks until EOF and hands each one to the observer,
//! followed by a progress event when the chunk contains a percentage. Read
//! errors (broken pipe after a kill, closed handle) end the pump like EOF.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::exec::observer::RunObserver;
use crate::exec::progress;
use crate::types::{LineEvent, ProgressEvent, StreamKind};

/// Size of a single read.
pub const CHUNK_SIZE: usize = 1024;

/// What a pump forwarded before it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpReport {
    pub stream: StreamKind,
    pub chunks: usize,
    pub bytes: usize,
}

/// Spawn a pump draining `reader` into `observer`.
pub fn spawn_pump<R>(
    stream: StreamKind,
    reader: R,
    observer: Arc<dyn RunObserver>,
) -> JoinHandle<PumpReport>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(pump(stream, reader, observer))
}

/// Drain `reader` to the end on the current task.
pub async fn pump<R>(stream: StreamKind, mut reader: R, observer: Arc<dyn RunObserver>) -> PumpReport
where
    R: AsyncRead + Unpin,
{
    let mut report = PumpReport {
        stream,
        chunks: 0,
        bytes: 0,
    };
    let mut decoder = Utf8Decoder::default();
    let mut buf = vec![0u8; CHUNK_SIZE];

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                report.bytes += n;
                let text = decoder.decode(&buf[..n]);
                if !text.is_empty() {
                    report.chunks += 1;
                    forward(stream, text, observer.as_ref());
                }
            }
            Err(e) => {
                debug!(%stream, error = %e, "read failed; treating as end of stream");
                break;
            }
        }
    }

    if let Some(tail) = decoder.finish() {
        report.chunks += 1;
        forward(stream, tail, observer.as_ref());
    }

    debug!(%stream, chunks = report.chunks, bytes = report.bytes, "pump finished");
    report
}

fn forward(stream: StreamKind, text: String, observer: &dyn RunObserver) {
    let percent = progress::extract(&text);
    observer.on_line(&LineEvent { stream, text });
    if let Some(percent) = percent {
        observer.on_progress(&ProgressEvent { stream, percent });
    }
}

/// Lossy UTF-8 decoding across read boundaries.
///
/// Only the bytes of a multi-byte sequence cut off by the end of a read (at
/// most three) are held back for the next read.
#[derive(Debug, Default)]
struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);

        let mut out = String::with_capacity(self.pending.len());
        let mut rest: &[u8] = &self.pending;
        loop {
            match std::str::from_utf8(rest) {
                Ok(s) => {
                    out.push_str(s);
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&rest[..valid]));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &rest[valid + len..];
                        }
                        None => {
                            rest = &rest[valid..];
                            break;
                        }
                    }
                }
            }
        }

        let tail = rest.to_vec();
        self.pending = tail;
        out
    }

    fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let tail = std::mem::take(&mut self.pending);
        Some(String::from_utf8_lossy(&tail).into_owned())
    }
}
