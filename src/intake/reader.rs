use tokio::io::{AsyncRead, AsyncReadExt, BufReader};
use tracing::debug;

use crate::error::FrameError;
use crate::intake::frame::{
    Frame, FRAME_LENGTH_BYTES, MAX_FRAME_LENGTH, TAG_CLUSTERS, TAG_IDENTIFIED, TAG_PING,
    TAG_SHUTDOWN,
};
use crate::intake::message::decode_batch;

pub enum ReadState {
    WaitingForLength,
    WaitingForFrame { expected_length: u32 },
}

pub struct FramedAsyncBufferedReader<T>
where
    T: AsyncRead + Unpin + Send,
{
    reader: BufReader<T>,
}

impl<T: AsyncRead + Unpin + Send> FramedAsyncBufferedReader<T> {
    pub fn new(stream: T) -> Self {
        Self {
            reader: BufReader::new(stream),
        }
    }

    pub async fn read(&mut self) -> Result<Frame, FrameError> {
        let mut state = ReadState::WaitingForLength;
        loop {
            match state {
                ReadState::WaitingForLength => {
                    state = ReadState::WaitingForFrame {
                        expected_length: self.read_frame_length().await?,
                    };
                }
                ReadState::WaitingForFrame { expected_length } => {
                    return self.read_frame_data(expected_length).await;
                }
            }
        }
    }

    async fn read_frame_length(&mut self) -> Result<u32, FrameError> {
        let mut length_buffer = [0u8; FRAME_LENGTH_BYTES];
        self.reader
            .read_exact(&mut length_buffer)
            .await
            .map_err(FrameError::Read)?;
        let length = u32::from_le_bytes(length_buffer);
        if length == 0 || length as usize > MAX_FRAME_LENGTH {
            return Err(FrameError::InvalidFrameLength(length as usize));
        }
        Ok(length)
    }

    async fn read_frame_data(&mut self, expected_length: u32) -> Result<Frame, FrameError> {
        let mut tag_buffer = [0u8; 1];
        self.reader
            .read_exact(&mut tag_buffer)
            .await
            .map_err(FrameError::Read)?;

        // The payload is always consumed so the stream stays aligned on frame
        // boundaries, even for tags we reject.
        let mut payload = vec![0u8; expected_length as usize - 1];
        self.reader
            .read_exact(&mut payload)
            .await
            .map_err(FrameError::Read)?;

        let tag = tag_buffer[0];
        debug!(tag, length = expected_length, "Got frame");
        match tag {
            TAG_PING => Ok(Frame::Ping),
            TAG_CLUSTERS => Ok(Frame::Clusters(decode_batch(&payload))),
            TAG_SHUTDOWN => Ok(Frame::Shutdown),
            TAG_IDENTIFIED => serde_json::from_slice(&payload)
                .map(Frame::Identified)
                .map_err(FrameError::Payload),
            _ => Err(FrameError::InvalidTag(tag)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{ColoredPoint, RawCluster, Rgb};
    use crate::intake::frame::encode_frame;
    use crate::intake::message::encode_clusters;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn reads_consecutive_frames() {
        let (mut client, server) = tokio::io::duplex(1024);
        let clusters = vec![RawCluster::new(vec![ColoredPoint::new(
            0.3,
            0.0,
            0.1,
            Rgb::new(0, 0, 0),
        )])];

        let mut bytes = encode_frame(TAG_PING, &[]).unwrap();
        bytes.extend(encode_frame(TAG_CLUSTERS, &encode_clusters(&clusters).unwrap()).unwrap());
        bytes.extend(encode_frame(TAG_SHUTDOWN, &[]).unwrap());
        client.write_all(&bytes).await.unwrap();

        let mut reader = FramedAsyncBufferedReader::new(server);
        assert!(matches!(reader.read().await.unwrap(), Frame::Ping));
        match reader.read().await.unwrap() {
            Frame::Clusters(batch) => {
                assert_eq!(batch.clusters()[0].as_ref().unwrap(), &clusters[0]);
            }
            other => panic!("unexpected frame: {:?}", other),
        }
        assert!(matches!(reader.read().await.unwrap(), Frame::Shutdown));
    }

    #[tokio::test]
    async fn unknown_tag_keeps_stream_aligned() {
        let (mut client, server) = tokio::io::duplex(1024);
        let mut bytes = encode_frame(9, b"junk").unwrap();
        bytes.extend(encode_frame(TAG_PING, &[]).unwrap());
        client.write_all(&bytes).await.unwrap();

        let mut reader = FramedAsyncBufferedReader::new(server);
        assert!(matches!(reader.read().await, Err(FrameError::InvalidTag(9))));
        assert!(matches!(reader.read().await.unwrap(), Frame::Ping));
    }

    #[tokio::test]
    async fn rejects_zero_and_oversized_lengths() {
        let (mut client, server) = tokio::io::duplex(1024);
        client.write_all(&0u32.to_le_bytes()).await.unwrap();
        let mut reader = FramedAsyncBufferedReader::new(server);
        assert!(matches!(
            reader.read().await,
            Err(FrameError::InvalidFrameLength(0))
        ));

        let (mut client, server) = tokio::io::duplex(1024);
        client.write_all(&u32::MAX.to_le_bytes()).await.unwrap();
        let mut reader = FramedAsyncBufferedReader::new(server);
        assert!(matches!(
            reader.read().await,
            Err(FrameError::InvalidFrameLength(_))
        ));
    }

    #[tokio::test]
    async fn closed_stream_is_a_disconnect() {
        let (client, server) = tokio::io::duplex(64);
        drop(client);
        let mut reader = FramedAsyncBufferedReader::new(server);
        assert!(reader.read().await.unwrap_err().is_disconnect());
    }
}
