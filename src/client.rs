// MIT License - Copyright (c) 2026 Peter Wright
// Command/response engine for the lircd socket

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, error, info};

use crate::config::ClientConfig;
use crate::error::{LircError, Result};
use crate::protocol::{normalize_command, parse_reply_packet, Command, PacketFramer, ReplyPacket};

const BUFFER_LENGTH: usize = 256;

/// A reply packet with the times its exchange started and finished.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedReply {
    pub reply: ReplyPacket,
    /// Taken immediately before the command was written.
    pub start_time: DateTime<Utc>,
    /// Taken immediately after the reply packet was parsed.
    pub end_time: DateTime<Utc>,
}

/// Owns one connection to lircd and runs command/response exchanges on it.
///
/// Exchanges are strictly half-duplex: the stream sits behind a fair
/// `tokio::sync::Mutex` that is held for the whole write, read and parse of
/// one command, so concurrent callers are served one at a time in arrival
/// order. The guard is released on every exit path, including errors.
///
/// A timed-out read does not reset the stream. If a reply arrives after its
/// exchange gave up, the next exchange may read it; replace the client when
/// that matters.
pub struct LircClient<S = UnixStream> {
    stream: Mutex<S>,
    read_timeout: Duration,
}

impl LircClient<UnixStream> {
    /// Connect to the lircd socket at `path`.
    pub async fn connect(path: impl AsRef<Path>, read_timeout: Duration) -> Result<Self> {
        let path = path.as_ref();
        info!("Connecting to lircd at {}", path.display());

        let stream = UnixStream::connect(path).await.map_err(|e| {
            error!("lircd connect failed: {}", e);
            LircError::Connection {
                path: path.to_path_buf(),
                source: e,
            }
        })?;

        debug!("lircd socket connected");
        Ok(Self::new(stream, read_timeout))
    }

    pub async fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::connect(&config.socket_path, config.read_timeout).await
    }
}

impl<S> LircClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an already connected stream.
    pub fn new(stream: S, read_timeout: Duration) -> Self {
        Self {
            stream: Mutex::new(stream),
            read_timeout,
        }
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Send a raw command line and wait for its reply packet.
    ///
    /// A trailing newline is appended if `command` lacks one.
    pub async fn send_command(&self, command: &str) -> Result<ReplyPacket> {
        Ok(self.send_command_timed(command).await?.reply)
    }

    /// Like `send_command`, also returning when the command was written and
    /// when its reply was parsed. Both timestamps are taken while the
    /// exchange guard is held, so time spent queued behind other callers is
    /// not included.
    pub async fn send_command_timed(&self, command: &str) -> Result<TimedReply> {
        let command = normalize_command(command);

        let mut stream = self.stream.lock().await;

        debug!("Sending command: {}", command.trim_end());
        let start_time = Utc::now();
        write_command(&mut *stream, &command).await?;

        let packet = read_reply_packet(&mut *stream, self.read_timeout).await?;
        let reply = parse_reply_packet(&packet)?;
        let end_time = Utc::now();

        debug!(
            "Reply for {:?}: success={} data={:?}",
            reply.command, reply.success, reply.data
        );
        Ok(TimedReply {
            reply,
            start_time,
            end_time,
        })
    }

    pub async fn send(&self, command: &Command) -> Result<ReplyPacket> {
        self.send_command(&command.to_wire_string()).await
    }

    /// `SEND_ONCE <remote> <key>`, issued `repeat_count` times.
    ///
    /// lircd's own repeat argument is not used: each transmission is a
    /// separate exchange so every outcome is observable. A count of 0 is
    /// treated as 1.
    pub async fn send_once(
        &self,
        remote: &str,
        key: &str,
        repeat_count: u32,
    ) -> Result<Vec<ReplyPacket>> {
        let mut replies = Vec::with_capacity(repeat_count.max(1) as usize);
        for _ in 0..repeat_count.max(1) {
            replies.push(self.send_once_single(remote, key).await?);
        }
        Ok(replies)
    }

    pub async fn send_once_single(&self, remote: &str, key: &str) -> Result<ReplyPacket> {
        self.send(&Command::SendOnce {
            remote: remote.to_string(),
            key: key.to_string(),
        })
        .await
    }

    /// Single `SEND_ONCE` with exchange timestamps.
    pub async fn send_once_timed(&self, remote: &str, key: &str) -> Result<TimedReply> {
        let command = Command::SendOnce {
            remote: remote.to_string(),
            key: key.to_string(),
        };
        self.send_command_timed(&command.to_wire_string()).await
    }

    pub async fn send_start(&self, remote: &str, key: &str) -> Result<ReplyPacket> {
        self.send(&Command::SendStart {
            remote: remote.to_string(),
            key: key.to_string(),
        })
        .await
    }

    pub async fn send_stop(&self, remote: &str, key: &str) -> Result<ReplyPacket> {
        self.send(&Command::SendStop {
            remote: remote.to_string(),
            key: key.to_string(),
        })
        .await
    }

    /// List all remotes known to lircd.
    pub async fn list_remotes(&self) -> Result<ReplyPacket> {
        self.send(&Command::List).await
    }

    /// List the keys of one remote.
    pub async fn list_remote_keys(&self, remote: &str) -> Result<ReplyPacket> {
        self.send(&Command::ListRemote {
            remote: remote.to_string(),
        })
        .await
    }

    /// Log everything lircd receives to `path`.
    pub async fn set_input_log(&self, path: &str) -> Result<ReplyPacket> {
        self.send(&Command::SetInputLog {
            path: path.to_string(),
        })
        .await
    }

    pub async fn stop_input_log(&self) -> Result<ReplyPacket> {
        self.send(&Command::StopInputLog).await
    }

    pub async fn version(&self) -> Result<ReplyPacket> {
        self.send(&Command::Version).await
    }

    /// Shut down the write side of the socket. Later exchanges fail; the
    /// client is never reconnected.
    pub async fn close(&self) -> Result<()> {
        info!("Closing lircd connection");
        let mut stream = self.stream.lock().await;
        stream.shutdown().await?;
        Ok(())
    }
}

async fn write_command<S>(stream: &mut S, command: &str) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(command.as_bytes()).await.map_err(|e| {
        error!("Failed to write command: {}", e);
        LircError::Io(e)
    })?;
    stream.flush().await?;
    Ok(())
}

/// Read until the framer sees a complete packet. Each individual read is
/// bounded by `read_timeout`.
async fn read_reply_packet<S>(stream: &mut S, read_timeout: Duration) -> Result<String>
where
    S: AsyncRead + Unpin,
{
    let mut framer = PacketFramer::new();
    let mut buf = [0u8; BUFFER_LENGTH];

    loop {
        let n = match timeout(read_timeout, stream.read(&mut buf)).await {
            Ok(Ok(0)) => {
                debug!("lircd closed the connection mid-exchange");
                return Err(LircError::Disconnected);
            }
            Ok(Ok(n)) => n,
            Ok(Err(e)) => {
                error!("Socket read failed: {}", e);
                return Err(LircError::Io(e));
            }
            Err(_) => {
                debug!("No reply within {:?}", read_timeout);
                return Err(LircError::Timeout {
                    timeout: read_timeout,
                });
            }
        };

        if framer.push(&buf[..n]) {
            return framer.into_packet();
        }
    }
}
