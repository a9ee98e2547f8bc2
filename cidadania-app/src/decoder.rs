//! Feeds stream frames to an external decoder process.

use cidadania_stream::StreamFrame;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const LOG_TARGET: &str = "cidadania::decoder";

/// Whether a frame should reach the decoder. Muted frames are dropped.
pub const fn is_audible(frame: &StreamFrame) -> bool {
    frame.gain > 0
}

/// Pipe frames into `argv` until shutdown. With no decoder configured the
/// frames are read and discarded so the stream keeps flowing.
pub async fn run_decoder(
    argv: Vec<String>,
    mut frames: mpsc::Receiver<StreamFrame>,
    cancel_token: CancellationToken,
) {
    let command_line = argv.join(" ");
    let mut parts = argv.into_iter();
    let Some(program) = parts.next() else {
        info!(target: LOG_TARGET, "No decoder configured; stream data is discarded");
        discard(&mut frames, &cancel_token).await;
        return;
    };

    let mut child = match Command::new(&program)
        .args(parts)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            error!(target: LOG_TARGET, "Failed to start decoder {}: {}", program, e);
            discard(&mut frames, &cancel_token).await;
            return;
        }
    };
    info!(target: LOG_TARGET, "Started decoder: {}", command_line);

    let Some(mut stdin) = child.stdin.take() else {
        error!(target: LOG_TARGET, "Decoder stdin unavailable");
        return;
    };

    let mut dropped = 0usize;
    loop {
        let frame = tokio::select! {
            () = cancel_token.cancelled() => break,
            frame = frames.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };

        if !is_audible(&frame) {
            dropped += 1;
            continue;
        }
        if let Err(e) = stdin.write_all(&frame.chunk).await {
            warn!(target: LOG_TARGET, "Decoder stopped accepting data: {}", e);
            break;
        }
    }

    debug!(target: LOG_TARGET, "Dropped {} muted frames", dropped);
    drop(stdin);

    // Closed stdin lets the decoder drain; shutdown does not wait for it
    if cancel_token.is_cancelled() {
        if let Err(e) = child.kill().await {
            debug!(target: LOG_TARGET, "Decoder already exited: {}", e);
        }
    } else {
        match child.wait().await {
            Ok(status) => debug!(target: LOG_TARGET, "Decoder exited: {}", status),
            Err(e) => warn!(target: LOG_TARGET, "Failed to wait for decoder: {}", e),
        }
    }
}

async fn discard(frames: &mut mpsc::Receiver<StreamFrame>, cancel_token: &CancellationToken) {
    loop {
        tokio::select! {
            () = cancel_token.cancelled() => break,
            frame = frames.recv() => if frame.is_none() { break },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn frame(gain: u8) -> StreamFrame {
        StreamFrame {
            chunk: Bytes::from_static(b"abc"),
            gain,
        }
    }

    #[test]
    fn test_muted_frames_are_not_audible() {
        assert!(!is_audible(&frame(0)));
        assert!(is_audible(&frame(1)));
        assert!(is_audible(&frame(100)));
    }

    #[tokio::test]
    async fn test_discard_stops_on_cancel() {
        let (tx, rx) = mpsc::channel(4);
        let cancel_token = CancellationToken::new();

        let task = tokio::spawn(run_decoder(Vec::new(), rx, cancel_token.clone()));
        tx.send(frame(70)).await.unwrap();
        cancel_token.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_discard_stops_when_senders_drop() {
        let (tx, rx) = mpsc::channel(4);
        let task = tokio::spawn(run_decoder(Vec::new(), rx, CancellationToken::new()));
        tx.send(frame(0)).await.unwrap();
        drop(tx);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_decoder_receives_only_audible_frames() {
        let out = std::env::temp_dir().join(format!("cidadania-decoder-{}", std::process::id()));
        let argv = vec![
            "sh".to_string(),
            "-c".to_string(),
            format!("cat > '{}'", out.display()),
        ];
        let (tx, rx) = mpsc::channel(4);
        let task = tokio::spawn(run_decoder(argv, rx, CancellationToken::new()));

        tx.send(frame(70)).await.unwrap();
        tx.send(frame(0)).await.unwrap();
        tx.send(frame(30)).await.unwrap();
        drop(tx);
        task.await.unwrap();

        let written = std::fs::read(&out).unwrap();
        let _ = std::fs::remove_file(&out);
        assert_eq!(written, b"abcabc");
    }
}
