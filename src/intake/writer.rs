use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

use crate::error::FrameError;
use crate::intake::frame::{encode_frame, Frame};
use crate::intake::message::encode_clusters;

pub struct FramedAsyncBufferedWriter<T>
where
    T: AsyncWrite + Unpin + Send,
{
    writer: BufWriter<T>,
}

impl<T: AsyncWrite + Unpin + Send> FramedAsyncBufferedWriter<T> {
    pub fn new(writer: T) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }

    /// Writes and flushes one frame. The server only ever writes `Identified`
    /// frames; the other kinds are for the client side of the connection.
    pub async fn write(&mut self, frame: &Frame) -> Result<(), FrameError> {
        let payload = match frame {
            Frame::Ping | Frame::Shutdown => Vec::new(),
            Frame::Identified(batch) => serde_json::to_vec(batch).map_err(FrameError::Payload)?,
            Frame::Clusters(batch) => {
                // Client-side helper. Slots that failed to decode are dropped,
                // so the re-encoded batch may be shorter than the original.
                let clusters = batch
                    .clusters()
                    .iter()
                    .filter_map(|slot| slot.as_ref().ok().cloned())
                    .collect::<Vec<_>>();
                encode_clusters(&clusters).map_err(FrameError::Payload)?
            }
        };
        let bytes = encode_frame(frame.tag(), &payload)?;
        self.writer
            .write_all(&bytes)
            .await
            .map_err(FrameError::Write)?;
        self.writer.flush().await.map_err(FrameError::Write)
    }

    pub async fn shutdown(&mut self) -> Result<(), FrameError> {
        self.writer.shutdown().await.map_err(FrameError::Write)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{ClusterBatch, ColoredPoint, Pose, Position, Quaternion, RawCluster, Rgb};
    use crate::intake::reader::FramedAsyncBufferedReader;
    use crate::pipeline::{IdentifiedBatch, IdentifiedObject};
    use chrono::Utc;

    #[tokio::test]
    async fn written_frames_are_readable() {
        let (client, server) = tokio::io::duplex(4096);
        let mut writer = FramedAsyncBufferedWriter::new(client);
        let mut reader = FramedAsyncBufferedReader::new(server);

        let batch = ClusterBatch::new(vec![RawCluster::new(vec![ColoredPoint::new(
            0.5,
            -0.1,
            0.0,
            Rgb::new(0, 255, 0),
        )])]);
        writer.write(&Frame::Clusters(batch.clone())).await.unwrap();

        let mut identified = IdentifiedBatch::new(batch.id());
        identified.objects.push(IdentifiedObject {
            timestamp: Utc::now(),
            pose: Pose {
                position: Position::new(0.5, -0.1, 0.0),
                orientation: Quaternion::IDENTITY,
            },
            object_id: 2,
        });
        writer
            .write(&Frame::Identified(identified.clone()))
            .await
            .unwrap();

        match reader.read().await.unwrap() {
            Frame::Clusters(read) => assert_eq!(read.clusters(), batch.clusters()),
            other => panic!("unexpected frame: {:?}", other),
        }
        match reader.read().await.unwrap() {
            Frame::Identified(read) => assert_eq!(read, identified),
            other => panic!("unexpected frame: {:?}", other),
        }
    }
}
