//! Discovery-only SMTP conversation: greeting, one `EHLO`, `QUIT`.
//!
//! The probe never fails. A host that cannot be reached contributes an empty
//! transcript carrying the connection error; everything else the server says
//! before a terminal line is kept as evidence for the provider heuristics.

mod session;
mod types;

pub use types::EhloTranscript;

use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::trace::event;
use session::{Budget, LineStream, ReadOutcome};

pub const DEFAULT_SMTP_PORT: u16 = 25;

/// Lines kept per transcript; a server still talking past this is cut off.
pub const MAX_TRANSCRIPT_LINES: usize = 64;

/// Something able to collect an EHLO transcript from a mail exchange.
///
/// `Sync` so diagnostic runs can probe several hosts at once.
pub trait EhloProbe: Sync {
    fn probe(
        &self,
        exchange_host: &str,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> EhloTranscript;
}

impl<T: EhloProbe + ?Sized> EhloProbe for &T {
    fn probe(
        &self,
        exchange_host: &str,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> EhloTranscript {
        (**self).probe(exchange_host, timeout, cancel)
    }
}

/// TCP implementation talking plain SMTP to `host:port`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpProbe {
    pub port: u16,
    /// Name sent with `EHLO`; defaults to the exchange host itself.
    pub helo_name: Option<String>,
}

impl Default for SmtpProbe {
    fn default() -> Self {
        Self {
            port: DEFAULT_SMTP_PORT,
            helo_name: None,
        }
    }
}

impl SmtpProbe {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            ..Self::default()
        }
    }

    pub fn with_helo_name(mut self, helo_name: impl Into<String>) -> Self {
        self.helo_name = Some(helo_name.into());
        self
    }

    fn helo_for<'a>(&'a self, exchange_host: &'a str) -> &'a str {
        self.helo_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(exchange_host)
    }
}

impl EhloProbe for SmtpProbe {
    fn probe(
        &self,
        exchange_host: &str,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> EhloTranscript {
        let mut run = ProbeRun {
            helo: self.helo_for(exchange_host),
            budget: Budget::new(cancel.bound(timeout)),
            cancel,
            transcript: EhloTranscript::new(exchange_host),
        };
        let mut state = State::Connecting;
        loop {
            state = match state {
                State::Connecting => run.connect(self.port),
                State::AwaitingGreeting(stream) => run.await_greeting(stream),
                State::SentEhlo(stream) => run.send_ehlo(stream),
                State::Reading(stream) => run.read_ehlo(stream),
                State::Quitting(stream) => run.quit(stream),
                State::Done => break,
            };
        }
        event!(
            debug,
            host = exchange_host,
            lines = run.transcript.response_lines.len(),
            tls = run.transcript.tls_advertised,
            "probe finished"
        );
        run.transcript
    }
}

enum State {
    Connecting,
    AwaitingGreeting(LineStream),
    SentEhlo(LineStream),
    Reading(LineStream),
    Quitting(LineStream),
    Done,
}

struct ProbeRun<'a> {
    helo: &'a str,
    budget: Budget,
    cancel: &'a CancelToken,
    transcript: EhloTranscript,
}

impl ProbeRun<'_> {
    fn connect(&mut self, port: u16) -> State {
        let host = self.transcript.exchange_host.clone();
        let addrs = match socket_addrs(&host, port) {
            Ok(addrs) if !addrs.is_empty() => addrs,
            Ok(_) => return self.connect_failed(format!("no socket address for {host}")),
            Err(err) => return self.connect_failed(format!("cannot resolve {host}: {err}")),
        };
        match LineStream::connect(&addrs, &self.budget, self.cancel) {
            Ok((stream, _peer)) => {
                event!(debug, host = %host, peer = %_peer, "connected");
                State::AwaitingGreeting(stream)
            }
            Err(_) if self.cancel.is_cancelled() => {
                self.transcript.cancelled = true;
                State::Done
            }
            Err(err) => self.connect_failed(format!("connection to {host}:{port} failed: {err}")),
        }
    }

    fn connect_failed(&mut self, message: String) -> State {
        event!(warn, host = %self.transcript.exchange_host, error = %message, "probe connection failed");
        self.transcript.connect_error = Some(message);
        State::Done
    }

    // Greeting lines are evidence too; a refusing greeting ends the session.
    fn await_greeting(&mut self, mut stream: LineStream) -> State {
        loop {
            let Some(line) = self.next_line(&mut stream) else {
                return State::Done;
            };
            let kind = classify_line(&line);
            if !self.record(line) {
                return State::Quitting(stream);
            }
            match kind {
                LineKind::Error => return State::Quitting(stream),
                LineKind::Final => return State::SentEhlo(stream),
                LineKind::StartTls | LineKind::Continuation => {}
            }
        }
    }

    fn send_ehlo(&mut self, mut stream: LineStream) -> State {
        match stream.send_line(&format!("EHLO {}", self.helo), &self.budget) {
            Ok(()) => State::Reading(stream),
            Err(_err) => {
                event!(debug, host = %self.transcript.exchange_host, error = %_err, "EHLO not sent");
                State::Done
            }
        }
    }

    fn read_ehlo(&mut self, mut stream: LineStream) -> State {
        loop {
            let Some(line) = self.next_line(&mut stream) else {
                return State::Done;
            };
            let kind = classify_line(&line);
            if kind == LineKind::StartTls {
                self.transcript.tls_advertised = true;
            }
            if !self.record(line) || kind != LineKind::Continuation {
                return State::Quitting(stream);
            }
        }
    }

    /// Appends `line`; `false` once the transcript is full.
    fn record(&mut self, line: String) -> bool {
        let lines = &mut self.transcript.response_lines;
        lines.push(line);
        if lines.len() < MAX_TRANSCRIPT_LINES {
            return true;
        }
        event!(debug, host = %self.transcript.exchange_host, "transcript line limit reached");
        false
    }

    fn quit(&mut self, mut stream: LineStream) -> State {
        // best effort: the transcript is already complete
        let _ = stream.send_line("QUIT", &self.budget);
        State::Done
    }

    /// `None` on close, timeout, cancellation or socket error; the stream is
    /// then dropped without `QUIT`.
    fn next_line(&mut self, stream: &mut LineStream) -> Option<String> {
        match stream.read_line(&self.budget, self.cancel) {
            Ok(ReadOutcome::Line(line)) => Some(line),
            Ok(ReadOutcome::Cancelled) => {
                self.transcript.cancelled = true;
                None
            }
            Ok(ReadOutcome::Closed) => None,
            Ok(ReadOutcome::TimedOut) => {
                event!(debug, host = %self.transcript.exchange_host, "read timed out");
                None
            }
            Err(_err) => {
                event!(debug, host = %self.transcript.exchange_host, error = %_err, "read failed");
                None
            }
        }
    }
}

fn socket_addrs(host: &str, port: u16) -> std::io::Result<Vec<SocketAddr>> {
    Ok((host, port).to_socket_addrs()?.collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineKind {
    /// `250-STARTTLS`: the server wants TLS before saying more.
    StartTls,
    /// 4xx/5xx reply.
    Error,
    /// Last line of a reply: code followed by a space (or nothing).
    Final,
    Continuation,
}

pub(crate) fn classify_line(line: &str) -> LineKind {
    let bytes = line.as_bytes();
    if bytes.len() >= 12 && bytes[..12].eq_ignore_ascii_case(b"250-STARTTLS") {
        return LineKind::StartTls;
    }
    if matches!(bytes.first(), Some(b'4' | b'5')) {
        return LineKind::Error;
    }
    let has_code = bytes.len() >= 3 && bytes[..3].iter().all(u8::is_ascii_digit);
    if has_code && matches!(bytes.get(3), None | Some(b' ')) {
        return LineKind::Final;
    }
    LineKind::Continuation
}
