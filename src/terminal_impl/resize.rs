// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use tokio::sync::mpsc;

/// Spawn the task that forwards OS window-size-change notifications.
///
/// On unix this subscribes to `SIGWINCH`; the editor re-queries the column
/// count on every tick. Off unix the returned channel simply never yields
/// and the editor disables its resize select arm.
///
/// The channel has capacity 1 and sends are lossy: a burst of resize signals
/// coalesces into a single pending notification, which is all a re-query
/// needs.
#[must_use]
pub fn spawn_resize_task() -> mpsc::Receiver<()> {
    let (tx, rx) = mpsc::channel::<()>(1);

    #[cfg(unix)]
    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};
        let Ok(mut winch) = signal(SignalKind::window_change()) else {
            tracing::warn!("could not subscribe to SIGWINCH; resize disabled");
            return;
        };
        while winch.recv().await.is_some() {
            match tx.try_send(()) {
                Ok(()) | Err(mpsc::error::TrySendError::Full(())) => {}
                Err(mpsc::error::TrySendError::Closed(())) => break,
            }
        }
    });

    #[cfg(not(unix))]
    drop(tx);

    rx
}
