//! Log entry model and line format.
//!
//! One entry is one line:
//!
//! ```text
//! <timestamp>: <Input|Output>: <url>, method: <verb>, clienthost: <host>, headers: <pairs>, decoded_body: <body>
//! ```

use std::fmt;

use axum::body::Bytes;
use axum::http::HeaderMap;
use chrono::{DateTime, SecondsFormat, Utc};

/// Which side of an exchange an entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Input => "Input",
            Direction::Output => "Output",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request identity shared by the input and output entry of one exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub url: String,
    pub method: String,
    pub client_host: Option<String>,
}

impl Exchange {
    pub fn new(url: impl Into<String>, method: impl Into<String>, client_host: Option<String>) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
            client_host,
        }
    }
}

/// Headers and body of one side of an exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capture {
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    /// Body bytes dropped by [`Capture::truncated`].
    pub omitted: usize,
}

impl Capture {
    pub fn new(headers: Vec<(String, String)>, body: impl Into<Bytes>) -> Self {
        Self {
            headers,
            body: body.into(),
            omitted: 0,
        }
    }

    pub fn from_parts(headers: &HeaderMap, body: Bytes) -> Self {
        let headers = headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        Self {
            headers,
            body,
            omitted: 0,
        }
    }

    /// A header-less capture whose body is the given text.
    pub fn text(body: impl fmt::Display) -> Self {
        Self {
            headers: Vec::new(),
            body: Bytes::from(body.to_string()),
            omitted: 0,
        }
    }

    /// Keep at most `limit` body bytes, counting the rest as omitted.
    pub fn truncated(mut self, limit: usize) -> Self {
        if self.body.len() > limit {
            self.omitted += self.body.len() - limit;
            self.body.truncate(limit);
        }
        self
    }
}

/// Something the journal can record as the output of a handler.
pub trait Captured {
    fn capture(&self) -> Capture;
}

impl Captured for Capture {
    fn capture(&self) -> Capture {
        self.clone()
    }
}

impl Captured for std::convert::Infallible {
    fn capture(&self) -> Capture {
        match *self {}
    }
}

/// One immutable journal record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
    pub exchange: Exchange,
    pub capture: Capture,
}

impl LogEntry {
    pub fn new(direction: Direction, exchange: &Exchange, capture: Capture) -> Self {
        Self {
            timestamp: Utc::now(),
            direction,
            exchange: exchange.clone(),
            capture,
        }
    }

    /// The entry as written to the sink, newline included.
    pub fn to_line(&self) -> String {
        format!("{}\n", self)
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}: {}, method: {}, clienthost: {}, headers: {:?}, decoded_body: {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
            self.direction,
            self.exchange.url,
            self.exchange.method,
            self.exchange.client_host.as_deref().unwrap_or("-"),
            self.capture.headers,
            escape_body(&self.capture.body),
        )?;
        if self.capture.omitted > 0 {
            write!(f, " [truncated {} bytes]", self.capture.omitted)?;
        }
        Ok(())
    }
}

/// Decode a body for the journal, keeping it on one line.
pub fn escape_body(body: &[u8]) -> String {
    let decoded = String::from_utf8_lossy(body);
    let mut out = String::with_capacity(decoded.len());
    for ch in decoded.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}
