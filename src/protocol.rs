// MIT License - Copyright (c) 2026 Peter Wright
// lircd socket command interface and reply packets

use tracing::warn;

use crate::error::{LircError, Result};

/// Commands that can be sent to lircd over its socket.
///
/// # Reply Packets
///
/// Every command is answered with a reply packet:
///
/// ```text
/// BEGIN
/// <echoed command>
/// SUCCESS | ERROR
/// [DATA
/// n
/// n lines of data]
/// END
/// ```
///
/// See SOCKET COMMAND INTERFACE in <https://www.lirc.org/html/lircd.html>.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `SEND_ONCE <remote> <key>` — Transmit a key once.
    ///
    /// lircd accepts an optional trailing repeat count; it is never used
    /// here so that each transmission gets its own reply packet.
    SendOnce { remote: String, key: String },
    /// `SEND_START <remote> <key>` — Start repeating a key until `SEND_STOP`.
    SendStart { remote: String, key: String },
    /// `SEND_STOP <remote> <key>` — Stop a repeat started by `SEND_START`.
    SendStop { remote: String, key: String },
    /// `LIST` — List all remotes known to lircd.
    List,
    /// `LIST <remote>` — List the keys of one remote.
    ListRemote { remote: String },
    /// `SET_INPUTLOG <path>` — Log all received data to `path`.
    SetInputLog { path: String },
    /// `SET_INPUTLOG` — Without a path, stop logging and close the logfile.
    StopInputLog,
    /// `VERSION` — Query the lircd version. Reply carries one DATA line.
    Version,
    /// Raw command string (for any unlisted commands).
    Raw(String),
}

impl Command {
    /// Convert the command to its wire string representation (without the
    /// trailing newline).
    pub fn to_wire_string(&self) -> String {
        match self {
            Command::SendOnce { remote, key } => format!("SEND_ONCE {} {}", remote, key),
            Command::SendStart { remote, key } => format!("SEND_START {} {}", remote, key),
            Command::SendStop { remote, key } => format!("SEND_STOP {} {}", remote, key),
            Command::List => "LIST".to_string(),
            Command::ListRemote { remote } => format!("LIST {}", remote),
            Command::SetInputLog { path } => format!("SET_INPUTLOG {}", path),
            Command::StopInputLog => "SET_INPUTLOG".to_string(),
            Command::Version => "VERSION".to_string(),
            Command::Raw(s) => s.clone(),
        }
    }
}

/// Append the line terminator lircd expects, unless already present.
pub fn normalize_command(command: &str) -> String {
    if command.ends_with('\n') {
        command.to_string()
    } else {
        format!("{}\n", command)
    }
}

/// The parsed result of one command/response exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplyPacket {
    /// The echoed command line, verbatim.
    pub command: String,
    /// True iff the status line was `SUCCESS`.
    pub success: bool,
    /// DATA lines in order; empty when the packet has no DATA section.
    pub data: Vec<String>,
}

fn parse_error(details: impl Into<String>, lines: &[&str]) -> LircError {
    LircError::Parse {
        details: details.into(),
        lines: lines.iter().map(|l| l.to_string()).collect(),
    }
}

fn line<'a>(lines: &[&'a str], index: usize, what: &str) -> Result<&'a str> {
    lines
        .get(index)
        .copied()
        .ok_or_else(|| parse_error(format!("missing {} line", what), lines))
}

/// Parse a complete reply packet.
///
/// Text that does not start with a `BEGIN` line is absorbed as noise and
/// yields `ReplyPacket::default()` rather than an error.
pub fn parse_reply_packet(packet: &str) -> Result<ReplyPacket> {
    let lines: Vec<&str> = packet.split('\n').collect();

    if lines.first() != Some(&"BEGIN") {
        return Ok(ReplyPacket::default());
    }

    let command = line(&lines, 1, "command")?.to_string();
    let success = line(&lines, 2, "status")? == "SUCCESS";

    let data = match line(&lines, 3, "END or DATA")? {
        "END" => Vec::new(),
        "DATA" => {
            let count_line = line(&lines, 4, "data length")?;
            let count: usize = count_line.parse().map_err(|_| {
                parse_error(format!("invalid data length {:?}", count_line), &lines)
            })?;

            let start: usize = 5;
            let end = start.saturating_add(count).min(lines.len());
            if lines.get(start.saturating_add(count)) != Some(&"END") {
                warn!(
                    "Reply packet declares {} data lines but body does not end there: {:?}",
                    count, lines
                );
            }
            lines[start..end].iter().map(|l| l.to_string()).collect()
        }
        other => {
            return Err(parse_error(
                format!("unknown line after status: {:?}", other),
                &lines,
            ))
        }
    };

    Ok(ReplyPacket {
        command,
        success,
        data,
    })
}

/// Accumulates bytes read from the socket until a full reply packet has
/// arrived.
///
/// Anything read before the first `BEGIN` is dropped, since the socket may
/// still hold output from an earlier, unrelated read. A packet is complete
/// as soon as the buffer ends with `END\n`. This is a raw suffix check, so a
/// data line ending in `END` terminates the packet early.
#[derive(Debug, Default)]
pub struct PacketFramer {
    buffer: Vec<u8>,
    started: bool,
}

const BEGIN: &[u8] = b"BEGIN";
const TERMINATOR: &[u8] = b"END\n";

impl PacketFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed newly read bytes. Returns true once the packet is complete.
    pub fn push(&mut self, chunk: &[u8]) -> bool {
        self.buffer.extend_from_slice(chunk);

        if !self.started {
            match find(&self.buffer, BEGIN) {
                Some(pos) => {
                    self.buffer.drain(..pos);
                    self.started = true;
                }
                None => {
                    // Keep a tail long enough to hold a BEGIN split across reads.
                    let keep = BEGIN.len() - 1;
                    if self.buffer.len() > keep {
                        self.buffer.drain(..self.buffer.len() - keep);
                    }
                    return false;
                }
            }
        }

        self.is_complete()
    }

    pub fn is_complete(&self) -> bool {
        self.started && self.buffer.ends_with(TERMINATOR)
    }

    /// Consume the framer, returning the packet text from `BEGIN` onwards.
    pub fn into_packet(self) -> Result<String> {
        String::from_utf8(self.buffer).map_err(|e| LircError::Parse {
            details: format!("reply packet is not valid UTF-8: {}", e),
            lines: vec![String::from_utf8_lossy(e.as_bytes()).into_owned()],
        })
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
