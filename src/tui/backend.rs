//! Async backend: runs slow work off the TUI event loop.
//!
//! The TUI sends `BackendCommand` values through a cloneable handle, and a
//! background tokio task executes them and sends `BackendResponse` values
//! back. Today the only slow work is reading image attachments.

use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::feed::image::{self, ImageError};

/// Commands sent from the TUI event loop to the async backend.
pub enum BackendCommand {
    ReadImage { room_id: String, path: PathBuf },
}

/// Responses from the async backend to the TUI.
pub enum BackendResponse {
    ImageRead {
        room_id: String,
        path: PathBuf,
        result: Result<String, ImageError>,
    },
}

/// Cloneable sending side, held by the app.
#[derive(Clone)]
pub struct BackendHandle {
    cmd_tx: mpsc::UnboundedSender<BackendCommand>,
}

impl BackendHandle {
    /// Send a command to the backend (non-blocking).
    pub fn send(&self, cmd: BackendCommand) {
        if self.cmd_tx.send(cmd).is_err() {
            tracing::error!("Backend channel closed -- command dropped");
        }
    }
}

/// Start the backend task. Returns the command handle and the response
/// receiver; the receiver is polled by the event loop inside `tokio::select!`.
pub fn start() -> (BackendHandle, mpsc::UnboundedReceiver<BackendResponse>) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (resp_tx, resp_rx) = mpsc::unbounded_channel();

    tokio::spawn(backend_loop(cmd_rx, resp_tx));

    (BackendHandle { cmd_tx }, resp_rx)
}

async fn backend_loop(
    mut cmd_rx: mpsc::UnboundedReceiver<BackendCommand>,
    resp_tx: mpsc::UnboundedSender<BackendResponse>,
) {
    while let Some(cmd) = cmd_rx.recv().await {
        let resp_tx = resp_tx.clone();

        // Each command runs as its own task so a slow read doesn't block the next.
        tokio::spawn(async move {
            match cmd {
                BackendCommand::ReadImage { room_id, path } => {
                    let result = image::read_data_uri(&path).await;
                    let _ = resp_tx.send(BackendResponse::ImageRead {
                        room_id,
                        path,
                        result,
                    });
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_image_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dot.gif");
        std::fs::write(&path, b"GIF89a").unwrap();

        let (handle, mut responses) = start();
        handle.send(BackendCommand::ReadImage {
            room_id: "42".to_string(),
            path: path.clone(),
        });

        let BackendResponse::ImageRead {
            room_id, result, ..
        } = responses.recv().await.unwrap();
        assert_eq!(room_id, "42");
        assert_eq!(result.unwrap(), "data:image/gif;base64,R0lGODlh");
    }
}
