use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

/// Bytes kept per output stream
pub const CAPTURE_LIMIT: usize = 64 * 1024;

/// The tail of an output stream, and how many bytes before it were dropped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captured {
    pub bytes: Vec<u8>,
    pub truncated: u64,
}

impl Captured {
    pub fn is_blank(&self) -> bool {
        self.truncated == 0 && self.bytes.iter().all(u8::is_ascii_whitespace)
    }

    /// Captured output as text, marking truncation explicitly
    pub fn text(&self) -> String {
        let text = String::from_utf8_lossy(&self.bytes);
        let text = text.trim();
        match self.truncated {
            0 => text.to_string(),
            dropped => format!("[... {dropped} bytes truncated]\n{text}"),
        }
    }
}

/// Drain `reader` to the end, keeping at most the last `limit` bytes
///
/// The stream is always read fully so a chatty child never blocks on a full pipe.
pub async fn read_bounded<R: AsyncRead + Unpin>(mut reader: R, limit: usize) -> io::Result<Captured> {
    let mut captured = Captured::default();
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        captured.bytes.extend_from_slice(&buf[..n]);
        if captured.bytes.len() > limit {
            let excess = captured.bytes.len() - limit;
            captured.bytes.drain(..excess);
            captured.truncated += excess as u64;
        }
    }
    Ok(captured)
}
