//! Output processors draining the child's stdout and stderr

use std::sync::Arc;

use futures::StreamExt;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::StreamKind;
use crate::framer::LineCodec;
use crate::process::OutputStream;
use crate::state::{ProgressUpdate, Snapshot};

pub(crate) type SharedSnapshot = Arc<Mutex<Snapshot>>;

/// Parse progress lines from stdout into the state and keep the transcript.
///
/// Returns the number of lines processed.
pub(crate) async fn process_stdout(
    stream: OutputStream,
    shared: SharedSnapshot,
    cancel: CancellationToken,
) -> usize {
    drain(stream, LineCodec::new(), StreamKind::Stdout, cancel, |line| {
        let update = ProgressUpdate::parse(&line);
        trace!(%line, ?update, "stdout line");

        let mut snapshot = shared.lock();
        snapshot.state.apply(update);
        snapshot.log.append(StreamKind::Stdout, &line);
    })
    .await
}

/// Accumulate stderr lines into the transcript
pub(crate) async fn process_stderr(
    stream: OutputStream,
    shared: SharedSnapshot,
    cancel: CancellationToken,
) -> usize {
    drain(stream, LineCodec::newline_only(), StreamKind::Stderr, cancel, |line| {
        trace!(%line, "stderr line");
        shared.lock().log.append(StreamKind::Stderr, &line);
    })
    .await
}

async fn drain<F>(
    stream: OutputStream,
    codec: LineCodec,
    kind: StreamKind,
    cancel: CancellationToken,
    mut on_line: F,
) -> usize
where
    F: FnMut(String),
{
    let mut lines = codec.frame(stream);
    let mut count = 0;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(stream = %kind, "output processor cancelled");
                break;
            }
            next = lines.next() => next,
        };

        match next {
            Some(Ok(line)) => {
                count += 1;
                on_line(line);
            }
            Some(Err(e)) => {
                debug!(stream = %kind, error = %e, "output processor exiting due to read error");
                break;
            }
            None => break,
        }
    }

    debug!(stream = %kind, lines = count, "output processor finished");
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tokio::io::AsyncWriteExt;

    fn stream(bytes: &'static [u8]) -> OutputStream {
        Box::new(Cursor::new(bytes))
    }

    #[tokio::test]
    async fn test_stdout_updates_state_and_log() {
        let shared = SharedSnapshot::default();
        let output = b"sending incremental file list\nbig.iso\n     15.17G  10%   92.23MB/s    0:23:54\r     16.00G  11%\r";

        let lines = process_stdout(stream(output), shared.clone(), CancellationToken::new()).await;

        assert_eq!(lines, 4);
        let snapshot = shared.lock();
        assert_eq!(snapshot.state.progress, 11);
        assert_eq!(snapshot.state.downloaded_total, "16.00G");
        assert_eq!(snapshot.state.speed, "92.23MB/s");
        assert_eq!(snapshot.state.time_remaining, "0:23:54");
        assert_eq!(
            snapshot.log.stdout,
            "sending incremental file list\nbig.iso\n     15.17G  10%   92.23MB/s    0:23:54\n     16.00G  11%\n"
        );
        assert!(snapshot.log.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_stderr_only_appends() {
        let shared = SharedSnapshot::default();

        let lines = process_stderr(
            stream(b"rsync: link_stat failed\r\nrsync error: 23%\nlast"),
            shared.clone(),
            CancellationToken::new(),
        )
        .await;

        assert_eq!(lines, 3);
        let snapshot = shared.lock();
        assert_eq!(snapshot.log.stderr, "rsync: link_stat failed\r\nrsync error: 23%\nlast\n");
        assert_eq!(snapshot.state, Default::default());
    }

    #[tokio::test]
    async fn test_read_error_ends_processor_quietly() {
        let shared = SharedSnapshot::default();
        let reader = tokio_test::io::Builder::new()
            .read(b"a\n")
            .read_error(std::io::Error::other("boom"))
            .build();

        let lines = process_stderr(Box::new(reader), shared.clone(), CancellationToken::new()).await;

        assert_eq!(lines, 1);
        assert_eq!(shared.lock().log.stderr, "a\n");
    }

    #[tokio::test]
    async fn test_cancel_stops_blocked_processor() {
        let shared = SharedSnapshot::default();
        let cancel = CancellationToken::new();
        let (reader, mut writer) = tokio::io::duplex(64);

        let processor = tokio::spawn(process_stdout(Box::new(reader), shared.clone(), cancel.clone()));
        writer.write_all(b"  1.00K  5%\n").await.unwrap();
        while shared.lock().state.progress != 5 {
            tokio::task::yield_now().await;
        }

        cancel.cancel();
        let lines = processor.await.unwrap();

        assert_eq!(lines, 1);
        drop(writer);
    }
}
