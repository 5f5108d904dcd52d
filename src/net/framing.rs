//! Length-prefixed message framing over async streams.
//!
//! Format: [4 bytes little-endian length][payload].

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on a single framed message.
pub const MAX_MESSAGE_SIZE: usize = 256 * 1024;

/// Errors that can occur during message framing
#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    #[error("Connection closed")]
    ConnectionClosed,
    #[error("Message too large: {0} bytes (max {MAX_MESSAGE_SIZE})")]
    MessageTooLarge(usize),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Read one framed message from a stream.
pub async fn read_message<R: AsyncRead + Unpin>(stream: &mut R) -> Result<Vec<u8>, FramingError> {
    let mut len_buf = [0u8; 4];
    match stream.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            return Err(FramingError::ConnectionClosed);
        }
        Err(e) => return Err(FramingError::Io(e)),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(FramingError::MessageTooLarge(len));
    }
    if len == 0 {
        return Ok(Vec::new());
    }

    let mut buf = vec![0u8; len];
    match stream.read_exact(&mut buf).await {
        Ok(_) => Ok(buf),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(FramingError::ConnectionClosed),
        Err(e) => Err(FramingError::Io(e)),
    }
}

/// Write one framed message to a stream.
pub async fn write_message<W: AsyncWrite + Unpin>(
    stream: &mut W,
    data: &[u8],
) -> Result<(), FramingError> {
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(FramingError::MessageTooLarge(data.len()));
    }

    let len_bytes = (data.len() as u32).to_le_bytes();
    stream.write_all(&len_bytes).await?;
    stream.write_all(data).await?;
    stream.flush().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip() {
        let (mut a, mut b) = tokio::io::duplex(1024);

        write_message(&mut a, b"hello world").await.unwrap();
        let payload = read_message(&mut b).await.unwrap();
        assert_eq!(payload, b"hello world");
    }

    #[tokio::test]
    async fn test_empty_message() {
        let (mut a, mut b) = tokio::io::duplex(64);
        write_message(&mut a, b"").await.unwrap();
        assert!(read_message(&mut b).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_oversize_write_rejected() {
        let (mut a, _b) = tokio::io::duplex(64);
        let huge = vec![0u8; MAX_MESSAGE_SIZE + 1];
        let result = write_message(&mut a, &huge).await;
        assert!(matches!(result, Err(FramingError::MessageTooLarge(_))));
    }

    #[tokio::test]
    async fn test_oversize_prefix_rejected() {
        let (mut a, mut b) = tokio::io::duplex(64);
        let bogus_len = ((MAX_MESSAGE_SIZE + 1) as u32).to_le_bytes();
        tokio::io::AsyncWriteExt::write_all(&mut a, &bogus_len)
            .await
            .unwrap();
        let result = read_message(&mut b).await;
        assert!(matches!(result, Err(FramingError::MessageTooLarge(_))));
    }

    #[tokio::test]
    async fn test_closed_stream() {
        let (a, mut b) = tokio::io::duplex(64);
        drop(a);
        let result = read_message(&mut b).await;
        assert!(matches!(result, Err(FramingError::ConnectionClosed)));
    }
}
