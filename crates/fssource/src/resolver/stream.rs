//! Cancellable enumeration of every indexed file.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;

use super::FsResolver;
use crate::location::Location;

/// Items buffered between the producer task and the consumer.
pub const STREAM_CAPACITY: usize = 1;

/// Pull-based sequence of [`Location`]s fed by a background task.
///
/// The producer stops as soon as the token is cancelled or this stream is
/// dropped. The sequence is single-pass.
#[derive(Debug)]
pub struct LocationStream {
    rx: mpsc::Receiver<Location>,
    producer: JoinHandle<()>,
}

impl LocationStream {
    /// Spawns the producer on the current Tokio runtime.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime.
    pub(crate) fn spawn(resolver: Arc<FsResolver>, cancel: CancellationToken) -> Self {
        let (tx, rx) = mpsc::channel(STREAM_CAPACITY);
        let producer = tokio::spawn(async move {
            let mut sent = 0usize;
            for location in resolver.search().all_locations() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        log::debug!("location stream cancelled after {sent} locations");
                        return;
                    }
                    result = tx.send(location) => {
                        if result.is_err() {
                            log::debug!("location stream consumer dropped after {sent} locations");
                            return;
                        }
                        sent += 1;
                    }
                }
            }
            log::debug!("location stream finished with {sent} locations");
        });
        Self { rx, producer }
    }

    /// Waits for the next location. `None` once the producer is done.
    pub async fn next(&mut self) -> Option<Location> {
        self.rx.recv().await
    }

    /// Returns true once the producer task has exited.
    pub fn is_producer_finished(&self) -> bool {
        self.producer.is_finished()
    }

    /// Drains the remaining locations.
    pub async fn collect(mut self) -> Vec<Location> {
        let mut locations = Vec::new();
        while let Some(location) = self.next().await {
            locations.push(location);
        }
        locations
    }
}

impl Stream for LocationStream {
    type Item = Location;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
