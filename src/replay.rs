//! Replay of connection and chat events through a [`Gatekeeper`].
//!
//! Each input line is one event:
//!
//! ```text
//! connect 1.2.3.4
//! disconnect 1.2.3.4
//! message hello there
//! reset
//! stats
//! ```
//!
//! An address of `-` stands for a connection whose origin is unknown.
//! Blank lines and lines starting with `#` are skipped.

use std::fmt;
use std::str::FromStr;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::warn;

use crate::admission::AdmissionStats;
use crate::error::{GuardError, Result};
use crate::gatekeeper::{Admission, Gatekeeper, MessageVerdict};

/// Address placeholder for an unknown origin.
const UNKNOWN_ADDRESS: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Connect(Option<String>),
    Disconnect(Option<String>),
    Message(String),
    Reset,
    Stats,
}

impl FromStr for Event {
    type Err = GuardError;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        let address = || -> Result<Option<String>> {
            match rest {
                "" => Err(GuardError::InvalidEvent(format!("'{}' needs an address", verb))),
                UNKNOWN_ADDRESS => Ok(None),
                addr => Ok(Some(addr.to_string())),
            }
        };

        match verb.to_ascii_lowercase().as_str() {
            "connect" => Ok(Event::Connect(address()?)),
            "disconnect" => Ok(Event::Disconnect(address()?)),
            "message" => Ok(Event::Message(rest.to_string())),
            "reset" => Ok(Event::Reset),
            "stats" => Ok(Event::Stats),
            _ => Err(GuardError::InvalidEvent(line.to_string())),
        }
    }
}

/// What the gatekeeper decided for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Connected {
        address: Option<String>,
        admission: Admission,
        count: i64,
    },
    Disconnected {
        address: Option<String>,
        count: i64,
    },
    Message(MessageVerdict),
    Reset,
    Stats(AdmissionStats),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Connected {
                address,
                admission,
                count,
            } => {
                let verdict = match admission {
                    Admission::Accepted => "accepted",
                    Admission::Rejected => "rejected",
                };
                write!(f, "connect {} {} (count {})", display_address(address), verdict, count)
            }
            Outcome::Disconnected { address, count } => {
                write!(f, "disconnect {} (count {})", display_address(address), count)
            }
            Outcome::Message(MessageVerdict::Clean) => write!(f, "message clean"),
            Outcome::Message(MessageVerdict::Blocked { token }) => {
                write!(f, "message blocked ({})", token)
            }
            Outcome::Message(MessageVerdict::Censored { text }) => {
                write!(f, "message censored: {}", text)
            }
            Outcome::Reset => write!(f, "reset"),
            Outcome::Stats(stats) => {
                write!(
                    f,
                    "stats tracked={} desync={} resets={}",
                    stats.tracked_addresses, stats.desync_events, stats.resets
                )?;
                if let Some(last) = stats.last_reset {
                    write!(f, " last_reset={}", last.to_rfc3339())?;
                }
                Ok(())
            }
        }
    }
}

fn display_address(address: &Option<String>) -> &str {
    address.as_deref().unwrap_or(UNKNOWN_ADDRESS)
}

/// Apply one event to the gatekeeper.
pub fn apply(gate: &Gatekeeper, event: Event) -> Outcome {
    match event {
        Event::Connect(address) => {
            let admission = gate.on_connect(address.as_deref());
            let count = gate.admission().count(address.as_deref());
            Outcome::Connected {
                address,
                admission,
                count,
            }
        }
        Event::Disconnect(address) => {
            gate.on_disconnect(address.as_deref());
            let count = gate.admission().count(address.as_deref());
            Outcome::Disconnected { address, count }
        }
        Event::Message(text) => Outcome::Message(gate.on_message(&text)),
        Event::Reset => {
            gate.admission().reset();
            Outcome::Reset
        }
        Event::Stats => Outcome::Stats(gate.admission().stats()),
    }
}

/// Totals for a finished replay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub events: usize,
    pub rejected: usize,
    pub flagged: usize,
    pub invalid: usize,
}

/// Read events line by line, apply them, and write one outcome per event.
///
/// Invalid lines are reported and skipped.
pub async fn run<R, W>(gate: &Gatekeeper, reader: R, mut writer: W) -> Result<ReplaySummary>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut summary = ReplaySummary::default();
    let mut lines = reader.lines();
    let mut line_no = 0;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let event = match trimmed.parse::<Event>() {
            Ok(event) => event,
            Err(e) => {
                warn!(line = line_no, error = %e, "Skipping replay line");
                summary.invalid += 1;
                continue;
            }
        };

        let outcome = apply(gate, event);
        summary.events += 1;
        match &outcome {
            Outcome::Connected {
                admission: Admission::Rejected,
                ..
            } => summary.rejected += 1,
            Outcome::Message(verdict) if *verdict != MessageVerdict::Clean => summary.flagged += 1,
            _ => {}
        }

        writer.write_all(format!("{}\n", outcome).as_bytes()).await?;
    }

    writer.flush().await?;
    Ok(summary)
}
