use std::io::{self, ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::{Duration, Instant};

use crate::cancel::CancelToken;

/// Upper bound on a single blocking read, so cancellation is noticed quickly.
const POLL_SLICE: Duration = Duration::from_millis(200);

/// Longest reply line kept, CRLF included (RFC 5321 §4.5.3.1.5). Longer lines
/// are cut here and the rest, up to the next LF, is discarded.
pub(crate) const MAX_LINE_LEN: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ReadOutcome {
    Line(String),
    Closed,
    TimedOut,
    Cancelled,
}

/// Absolute deadline for everything done on one connection.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Budget {
    deadline: Instant,
}

impl Budget {
    pub(crate) fn new(timeout: Duration) -> Self {
        let now = Instant::now();
        Self {
            deadline: now.checked_add(timeout).unwrap_or(now),
        }
    }

    /// Time left, `None` once exhausted.
    pub(crate) fn remaining(&self) -> Option<Duration> {
        let left = self.deadline.saturating_duration_since(Instant::now());
        (!left.is_zero()).then_some(left)
    }
}

pub(crate) struct LineStream {
    stream: TcpStream,
    buffer: Vec<u8>,
    /// Prefix of `buffer` already known to hold no LF.
    scanned: usize,
    /// Skipping the tail of an overlong line.
    discarding: bool,
}

impl LineStream {
    pub(crate) fn connect(
        addrs: &[SocketAddr],
        budget: &Budget,
        cancel: &CancelToken,
    ) -> io::Result<(Self, SocketAddr)> {
        let mut last_err = None;
        for addr in addrs {
            if cancel.is_cancelled() {
                return Err(io::Error::new(ErrorKind::Interrupted, "cancelled"));
            }
            let Some(left) = budget.remaining() else {
                break;
            };
            match TcpStream::connect_timeout(addr, left) {
                Ok(stream) => {
                    stream.set_write_timeout(Some(left))?;
                    stream.set_nodelay(true)?;
                    let session = Self {
                        stream,
                        buffer: Vec::with_capacity(MAX_LINE_LEN),
                        scanned: 0,
                        discarding: false,
                    };
                    return Ok((session, *addr));
                }
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            io::Error::new(ErrorKind::TimedOut, "connection budget exhausted")
        }))
    }

    pub(crate) fn send_line(&mut self, line: &str, budget: &Budget) -> io::Result<()> {
        let left = budget
            .remaining()
            .ok_or_else(|| io::Error::new(ErrorKind::TimedOut, "write budget exhausted"))?;
        self.stream.set_write_timeout(Some(left))?;
        let mut data = line.as_bytes().to_vec();
        data.extend_from_slice(b"\r\n");
        self.stream.write_all(&data)?;
        self.stream.flush()
    }

    /// Next line without its terminator. Invalid UTF-8 is replaced, not
    /// rejected; lines are cut to [`MAX_LINE_LEN`] bytes.
    pub(crate) fn read_line(
        &mut self,
        budget: &Budget,
        cancel: &CancelToken,
    ) -> io::Result<ReadOutcome> {
        loop {
            if let Some(line) = self.take_line() {
                return Ok(ReadOutcome::Line(line));
            }
            if cancel.is_cancelled() {
                return Ok(ReadOutcome::Cancelled);
            }
            let Some(left) = budget.remaining() else {
                return Ok(ReadOutcome::TimedOut);
            };
            self.stream.set_read_timeout(Some(left.min(POLL_SLICE)))?;

            let mut chunk = [0u8; 4096];
            match self.stream.read(&mut chunk) {
                Ok(0) => {
                    if self.buffer.is_empty() || self.discarding {
                        return Ok(ReadOutcome::Closed);
                    }
                    let raw = std::mem::take(&mut self.buffer);
                    self.scanned = 0;
                    return Ok(ReadOutcome::Line(decode_line(&raw)));
                }
                Ok(read) => self.buffer.extend_from_slice(&chunk[..read]),
                Err(err)
                    if matches!(
                        err.kind(),
                        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                    ) => {}
                Err(err) => return Err(err),
            }
        }
    }

    /// Pops one complete (or overlong) line from the buffer, if there is one.
    fn take_line(&mut self) -> Option<String> {
        loop {
            let newline = self.buffer[self.scanned..]
                .iter()
                .position(|byte| *byte == b'\n')
                .map(|offset| self.scanned + offset);

            match newline {
                Some(pos) if self.discarding => {
                    self.buffer.drain(..=pos);
                    self.scanned = 0;
                    self.discarding = false;
                }
                Some(pos) => {
                    let end = (pos + 1).min(MAX_LINE_LEN);
                    let line = decode_line(&self.buffer[..end]);
                    self.buffer.drain(..=pos);
                    self.scanned = 0;
                    return Some(line);
                }
                None if self.discarding => {
                    self.buffer.clear();
                    self.scanned = 0;
                    return None;
                }
                None if self.buffer.len() >= MAX_LINE_LEN => {
                    let line = decode_line(&self.buffer[..MAX_LINE_LEN]);
                    self.buffer.clear();
                    self.scanned = 0;
                    self.discarding = true;
                    return Some(line);
                }
                None => {
                    self.scanned = self.buffer.len();
                    return None;
                }
            }
        }
    }
}

fn decode_line(raw: &[u8]) -> String {
    let trimmed = raw
        .strip_suffix(b"\n")
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .unwrap_or(raw);
    String::from_utf8_lossy(trimmed).into_owned()
}
