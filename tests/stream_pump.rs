// tests/stream_pump.rs
mod common;
use crate::common::{init_tracing, with_timeout};

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWriteExt, ReadBuf};

use rcopy::exec::pump::{pump, spawn_pump};
use rcopy::types::StreamKind;
use rcopy_test_utils::RecordingObserver;

/// Yields one chunk, then fails like a pipe broken by a killed process.
struct BrokenAfterOneChunk {
    sent: bool,
}

impl AsyncRead for BrokenAfterOneChunk {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.sent {
            return Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed")));
        }
        self.sent = true;
        buf.put_slice(b"copying  42%\r");
        Poll::Ready(Ok(()))
    }
}

#[tokio::test]
async fn forwards_chunks_and_progress_in_order() {
    init_tracing();

    let observer = RecordingObserver::new();
    let (mut writer, reader) = tokio::io::duplex(64);
    let handle = spawn_pump(StreamKind::Stdout, reader, Arc::new(observer.clone()));

    for chunk in ["10%\n", "55%\n", "100%\n"] {
        writer.write_all(chunk.as_bytes()).await.unwrap();
        writer.flush().await.unwrap();
        // Let the pump take each chunk separately.
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    drop(writer);

    let report = with_timeout(handle).await.unwrap();
    assert_eq!(report.stream, StreamKind::Stdout);
    assert_eq!(report.bytes, 13);
    assert_eq!(observer.text(StreamKind::Stdout), "10%\n55%\n100%\n");
    assert_eq!(observer.progress(), vec![10, 55, 100]);
}

#[tokio::test]
async fn read_error_ends_the_pump_quietly() {
    init_tracing();

    let observer = RecordingObserver::new();
    let report = with_timeout(pump(
        StreamKind::Stderr,
        BrokenAfterOneChunk { sent: false },
        Arc::new(observer.clone()),
    ))
    .await;

    assert_eq!(report.chunks, 1);
    assert_eq!(observer.text(StreamKind::Stderr), "copying  42%\r");
    assert_eq!(observer.progress(), vec![42]);
}

#[tokio::test]
async fn chunks_without_percentages_emit_no_progress() {
    init_tracing();

    let observer = RecordingObserver::new();
    let (mut writer, reader) = tokio::io::duplex(64);
    let handle = spawn_pump(StreamKind::Stdout, reader, Arc::new(observer.clone()));

    writer.write_all(b"New File  1024  a.txt\n").await.unwrap();
    drop(writer);

    with_timeout(handle).await.unwrap();
    assert!(observer.progress().is_empty());
    assert_eq!(observer.line_count(), 1);
}

#[tokio::test]
async fn multibyte_character_split_across_reads_is_not_mangled() {
    init_tracing();

    let observer = RecordingObserver::new();
    let (mut writer, reader) = tokio::io::duplex(64);
    let handle = spawn_pump(StreamKind::Stdout, reader, Arc::new(observer.clone()));

    let text = "Kopiere Ördner\n".as_bytes();
    // Split inside the two-byte 'Ö'.
    let split = text.iter().position(|&b| b == 0xC3).unwrap() + 1;
    writer.write_all(&text[..split]).await.unwrap();
    writer.flush().await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    writer.write_all(&text[split..]).await.unwrap();
    drop(writer);

    with_timeout(handle).await.unwrap();
    let received = observer.text(StreamKind::Stdout);
    assert_eq!(received, "Kopiere Ördner\n");
    assert!(!received.contains(char::REPLACEMENT_CHARACTER));
}

#[tokio::test]
async fn invalid_utf8_is_replaced_not_dropped() {
    init_tracing();

    let observer = RecordingObserver::new();
    let (mut writer, reader) = tokio::io::duplex(64);
    let handle = spawn_pump(StreamKind::Stdout, reader, Arc::new(observer.clone()));

    writer.write_all(b"a\xFFb 9%").await.unwrap();
    drop(writer);

    with_timeout(handle).await.unwrap();
    assert_eq!(observer.text(StreamKind::Stdout), "a\u{FFFD}b 9%");
    assert_eq!(observer.progress(), vec![9]);
}

#[tokio::test]
async fn pump_finishes_only_after_writer_closes() {
    init_tracing();

    let observer = RecordingObserver::new();
    let (mut writer, reader) = tokio::io::duplex(64);
    let handle = spawn_pump(StreamKind::Stdout, reader, Arc::new(observer.clone()));

    writer.write_all(b"first\n").await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!handle.is_finished(), "pump must keep draining while the stream is open");

    writer.write_all(b"second\n").await.unwrap();
    drop(writer);

    with_timeout(handle).await.unwrap();
    assert_eq!(observer.text(StreamKind::Stdout), "first\nsecond\n");
}
