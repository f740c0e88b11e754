use std::collections::VecDeque;
use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::common::ClusterBatch;
use crate::error::{AppError, FrameError};
use crate::intake::frame::Frame;
use crate::intake::reader::FramedAsyncBufferedReader;
use crate::intake::writer::FramedAsyncBufferedWriter;
use crate::pipeline::{IdentifiedBatch, IdentifiedPublishingService};

/// Accepts segmentation clients. Every client may send cluster batches and
/// receives every identified batch the pipeline publishes.
pub struct Server {
    listener: TcpListener,
    batch_tx: mpsc::Sender<ClusterBatch>,
    publisher: IdentifiedPublishingService,
}

impl Server {
    pub async fn bind(
        address: &str,
        batch_tx: mpsc::Sender<ClusterBatch>,
        publisher: IdentifiedPublishingService,
    ) -> Result<Self, AppError> {
        let listener = TcpListener::bind(address)
            .await
            .map_err(|e| AppError::Bind(e, address.to_string()))?;
        info!("Listening for segmented clusters on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            batch_tx,
            publisher,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, AppError> {
        Ok(self.listener.local_addr()?)
    }

    pub async fn run(self, cancel_token: CancellationToken) -> Result<(), AppError> {
        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    info!("Server stopping");
                    return Ok(());
                }
                result = self.listener.accept() => match result {
                    Ok((stream, peer)) => self.handle_client(stream, peer, cancel_token.child_token()),
                    Err(e) => error!("Error accepting connection: {}", e),
                }
            }
        }
    }

    fn handle_client(&self, stream: TcpStream, peer: SocketAddr, done: CancellationToken) {
        let client_id = Uuid::new_v4();
        info!(%client_id, %peer, "Client connected");

        // Subscribe before reading anything so the client sees the result of
        // its own first batch.
        let identified_rx = self.publisher.subscribe();
        let (stream_rx, stream_tx) = stream.into_split();
        let reader = FramedAsyncBufferedReader::new(stream_rx);
        let writer = FramedAsyncBufferedWriter::new(stream_tx);
        let batch_tx = self.batch_tx.clone();
        let (submitted_tx, submitted_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            tokio::join!(
                read_loop(client_id, reader, batch_tx, submitted_tx, done.clone()),
                write_loop(client_id, writer, identified_rx, submitted_rx, done),
            );
            info!(%client_id, "Client disconnected");
        });
    }
}

/// Forwards the client's batches to the pipeline. Every batch id is reported
/// on `submitted_tx` before the batch is queued. A graceful end (Shutdown or
/// EOF) only drops `submitted_tx`, leaving the writer to drain pending
/// results; anything else cancels the connection.
async fn read_loop<T: AsyncRead + Unpin + Send>(
    client_id: Uuid,
    mut reader: FramedAsyncBufferedReader<T>,
    batch_tx: mpsc::Sender<ClusterBatch>,
    submitted_tx: mpsc::UnboundedSender<Uuid>,
    done: CancellationToken,
) {
    loop {
        let frame = tokio::select! {
            _ = done.cancelled() => return,
            frame = reader.read() => frame,
        };
        match frame {
            Ok(Frame::Ping) => debug!(%client_id, "Ping"),
            Ok(Frame::Clusters(batch)) => {
                debug!(%client_id, batch = %batch.id(), clusters = batch.len(), "Received clusters");
                if submitted_tx.send(batch.id()).is_err() {
                    break;
                }
                if batch_tx.send(batch).await.is_err() {
                    warn!(%client_id, "Pipeline is gone, closing client");
                    break;
                }
            }
            Ok(Frame::Shutdown) => {
                debug!(%client_id, "Client requested shutdown");
                return;
            }
            Ok(Frame::Identified(_)) => warn!(%client_id, "Ignoring identified frame sent by client"),
            Err(FrameError::InvalidTag(tag)) => warn!(%client_id, "Ignoring frame with tag {}", tag),
            Err(e) if e.is_disconnect() => return,
            Err(e) => {
                warn!(%client_id, "Dropping client: {}", e);
                break;
            }
        }
    }
    done.cancel();
}

/// Sends every published batch to the client. Once the read side has ended,
/// keeps going only until the results of the client's own batches are out.
async fn write_loop<T: AsyncWrite + Unpin + Send>(
    client_id: Uuid,
    mut writer: FramedAsyncBufferedWriter<T>,
    mut identified_rx: broadcast::Receiver<IdentifiedBatch>,
    mut submitted_rx: mpsc::UnboundedReceiver<Uuid>,
    done: CancellationToken,
) {
    // Submission order; the pipeline publishes in the same order.
    let mut pending: VecDeque<Uuid> = VecDeque::new();
    let mut reading = true;
    while reading || !pending.is_empty() {
        // Submitted ids are drained before results so a result never arrives
        // ahead of its own id.
        tokio::select! {
            biased;
            _ = done.cancelled() => break,
            submitted = submitted_rx.recv(), if reading => match submitted {
                Some(batch_id) => pending.push_back(batch_id),
                None => reading = false,
            },
            received = identified_rx.recv() => match received {
                Ok(batch) => {
                    if let Some(index) = pending.iter().position(|id| *id == batch.batch_id) {
                        // Earlier ids still pending were skipped by a lag.
                        pending.drain(..=index);
                    }
                    if let Err(e) = writer.write(&Frame::Identified(batch)).await {
                        warn!(%client_id, "Failed to send identified batch: {}", e);
                        break;
                    }
                }
                Err(RecvError::Lagged(n)) => {
                    warn!(%client_id, "Client lagged behind, skipping {} identified batches", n);
                    if !reading {
                        // The skipped results may include the last pending
                        // ones, which would never arrive.
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
    if let Err(e) = writer.shutdown().await {
        debug!(%client_id, "Failed to close client stream: {}", e);
    }
    done.cancel();
}
