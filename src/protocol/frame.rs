//! ckdb 프레이밍: `u32 LE 길이 || payload`

use crate::error::{CkwebError, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const FRAME_HEADER_LEN: usize = 4;

/// 읽기 시 허용하는 최대 payload 크기
pub const DEFAULT_MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// payload 앞에 길이 헤더를 붙인다
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>> {
    let len = u32::try_from(payload.len()).map_err(|_| {
        CkwebError::FrameError(format!("payload too large: {} bytes", payload.len()))
    })?;

    let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// 완성된 프레임 하나를 해석한다. 길이가 맞지 않으면 에러.
pub fn decode_frame(frame: &[u8]) -> Result<&[u8]> {
    if frame.len() < FRAME_HEADER_LEN {
        return Err(CkwebError::FrameError(format!(
            "short {} read got {}",
            FRAME_HEADER_LEN,
            frame.len()
        )));
    }

    let len = u32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
    let body = &frame[FRAME_HEADER_LEN..];
    if body.len() != len {
        return Err(CkwebError::FrameError(format!(
            "length mismatch ({} vs {})",
            body.len(),
            len
        )));
    }

    Ok(body)
}

/// 프레임 전체를 쓴다
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(payload)?;
    let total = frame.len();
    let mut sent = 0usize;

    while sent < total {
        let n = writer.write(&frame[sent..]).await?;
        if n == 0 {
            return Err(CkwebError::FrameError(format!(
                "incomplete write ({} vs {})",
                sent, total
            )));
        }
        sent += n;
    }
    writer.flush().await?;

    Ok(())
}

/// 프레임 하나를 읽어 payload를 반환한다
pub async fn read_frame<R>(reader: &mut R, max_frame_bytes: usize) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; FRAME_HEADER_LEN];
    let mut got = 0usize;
    while got < FRAME_HEADER_LEN {
        let n = reader.read(&mut header[got..]).await?;
        if n == 0 {
            return Err(CkwebError::FrameError(format!(
                "short {} read got {}",
                FRAME_HEADER_LEN, got
            )));
        }
        got += n;
    }

    let len = u32::from_le_bytes(header) as usize;
    if len > max_frame_bytes {
        return Err(CkwebError::FrameError(format!(
            "frame too large: max {} got {}",
            max_frame_bytes, len
        )));
    }

    let mut body = vec![0u8; len];
    let mut read = 0usize;
    while read < len {
        let n = reader.read(&mut body[read..]).await?;
        if n == 0 {
            return Err(CkwebError::FrameError(format!(
                "incomplete ({} vs {})",
                read, len
            )));
        }
        read += n;
    }

    Ok(body)
}
