use std::collections::VecDeque;
use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::telnet::LineDecoder;

/// Reads decoded text lines from a connection.
pub struct LineReader<R> {
    reader: R,
    decoder: LineDecoder,
    pending: VecDeque<String>,
    scratch: Vec<String>,
    buf: Box<[u8; 4096]>,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            decoder: LineDecoder::new(),
            pending: VecDeque::new(),
            scratch: Vec::new(),
            buf: Box::new([0u8; 4096]),
        }
    }

    /// Next complete line, or `None` once the peer closed the connection.
    ///
    /// Cancel safe: dropping the future loses no input, so it can be raced in
    /// `tokio::select!`.
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        loop {
            if let Some(line) = self.pending.pop_front() {
                return Ok(Some(line));
            }
            let n = self.reader.read(&mut self.buf[..]).await?;
            if n == 0 {
                return Ok(None);
            }
            self.decoder.feed(&self.buf[..n], &mut self.scratch);
            self.pending.extend(self.scratch.drain(..));
        }
    }
}

/// Writes text to a connection, converting newlines to CRLF for Telnet
/// clients.
pub struct LineWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> LineWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write `text` followed by a line break.
    pub async fn send_line(&mut self, text: &str) -> io::Result<()> {
        let msg = format!("{}\r\n", to_crlf(text));
        self.writer.write_all(msg.as_bytes()).await?;
        self.writer.flush().await
    }

    /// Write `text` as-is apart from newline conversion; used for prompts
    /// that leave the cursor on the same line.
    pub async fn send_raw(&mut self, text: &str) -> io::Result<()> {
        self.writer.write_all(to_crlf(text).as_bytes()).await?;
        self.writer.flush().await
    }

    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.writer.shutdown().await
    }
}

fn to_crlf(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\n', "\r\n")
}

/// Split a TCP stream into a line reader and a line writer.
pub fn split(stream: TcpStream) -> (LineReader<OwnedReadHalf>, LineWriter<OwnedWriteHalf>) {
    let (reader, writer) = stream.into_split();
    (LineReader::new(reader), LineWriter::new(writer))
}
