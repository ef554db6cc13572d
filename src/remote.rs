// MIT License - Copyright (c) 2026 Peter Wright
// Key presses on a named remote

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UnixStream;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::client::LircClient;
use crate::config::{ClientConfig, DEFAULT_INTERPRESS_DELAY};
use crate::error::Result;
use crate::protocol::ReplyPacket;

/// The outcome of one physical key press.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyPress {
    pub key: String,
    pub success: bool,
    /// Taken immediately before the command was written.
    pub start_time: DateTime<Utc>,
    /// Taken immediately after the reply packet was parsed.
    pub end_time: DateTime<Utc>,
    /// DATA lines from the reply, usually lircd's explanation of a failure.
    pub data: Vec<String>,
}

impl KeyPress {
    pub fn duration(&self) -> chrono::Duration {
        self.end_time - self.start_time
    }
}

/// Build a KeyPress from a SEND_ONCE reply.
///
/// The key name is the last whitespace-separated token of the echoed
/// command (`SEND_ONCE <remote> <key>`). When lircd echoed nothing usable
/// the requested key is reported instead.
pub fn key_press_from_reply(
    reply: ReplyPacket,
    requested_key: &str,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
) -> KeyPress {
    let key = reply
        .command
        .split_whitespace()
        .last()
        .unwrap_or(requested_key)
        .to_string();

    KeyPress {
        key,
        success: reply.success,
        start_time,
        end_time,
        data: reply.data,
    }
}

/// Sends key presses for one remote configured in lircd.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use stb_lirc::{ClientConfig, RemoteController};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = ClientConfig::builder().remote_name("sonifi-remote").build();
///     let remote = RemoteController::connect(&config).await?;
///
///     for press in remote.press("KEY_DOWN", 3, Duration::from_millis(300)).await? {
///         println!("{} success={} took {}", press.key, press.success, press.duration());
///     }
///     Ok(())
/// }
/// ```
pub struct RemoteController<S = UnixStream> {
    client: Arc<LircClient<S>>,
    remote: String,
    interpress_delay: Duration,
}

impl RemoteController<UnixStream> {
    /// Connect to lircd and bind to `config.remote_name`.
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let client = LircClient::from_config(config).await?;
        Ok(Self::new(Arc::new(client), config.remote_name.clone())
            .with_interpress_delay(config.interpress_delay))
    }
}

impl<S> RemoteController<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(client: Arc<LircClient<S>>, remote: impl Into<String>) -> Self {
        Self {
            client,
            remote: remote.into(),
            interpress_delay: DEFAULT_INTERPRESS_DELAY,
        }
    }

    /// Delay used by `press_default` between repeated presses.
    pub fn with_interpress_delay(mut self, delay: Duration) -> Self {
        self.interpress_delay = delay;
        self
    }

    pub fn remote_name(&self) -> &str {
        &self.remote
    }

    pub fn client(&self) -> &Arc<LircClient<S>> {
        &self.client
    }

    /// Press `key` once.
    pub async fn press_once(&self, key: &str) -> Result<KeyPress> {
        let timed = self.client.send_once_timed(&self.remote, key).await?;
        let press = key_press_from_reply(timed.reply, key, timed.start_time, timed.end_time);
        if press.success {
            debug!("Pressed {} on {}", press.key, self.remote);
        } else {
            warn!("lircd rejected {} on {}: {:?}", key, self.remote, press.data);
        }
        Ok(press)
    }

    /// Press `key` `repeat_count` times, waiting `interpress_delay` between
    /// presses but not after the last one. A count of 0 is treated as 1.
    ///
    /// Results are in press order. The first failed exchange aborts the run
    /// and its error is returned.
    pub async fn press(
        &self,
        key: &str,
        repeat_count: u32,
        interpress_delay: Duration,
    ) -> Result<Vec<KeyPress>> {
        let count = repeat_count.max(1);
        if count > 1 {
            info!(
                "Pressing {} on {} {} times ({:?} apart)",
                key, self.remote, count, interpress_delay
            );
        }

        let mut presses = Vec::with_capacity(count as usize);
        for remaining in (0..count).rev() {
            presses.push(self.press_once(key).await?);
            if remaining > 0 {
                sleep(interpress_delay).await;
            }
        }
        Ok(presses)
    }

    /// Press `key` `repeat_count` times using the configured delay.
    pub async fn press_default(&self, key: &str, repeat_count: u32) -> Result<Vec<KeyPress>> {
        self.press(key, repeat_count, self.interpress_delay).await
    }

    /// Start holding `key` until `send_stop`.
    pub async fn send_start(&self, key: &str) -> Result<ReplyPacket> {
        self.client.send_start(&self.remote, key).await
    }

    pub async fn send_stop(&self, key: &str) -> Result<ReplyPacket> {
        self.client.send_stop(&self.remote, key).await
    }

    /// Keys lircd knows for this remote, as reported by `LIST <remote>`.
    pub async fn list_keys(&self) -> Result<Vec<String>> {
        Ok(self.client.list_remote_keys(&self.remote).await?.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LircError;
    use crate::fake_lircd::{spawn_fake_lircd, FakeLircd};
    use tokio::io::DuplexStream;

    fn remote_pair(read_timeout: Duration) -> (RemoteController<DuplexStream>, FakeLircd) {
        let (client_end, server_end) = tokio::io::duplex(4096);
        let fake = spawn_fake_lircd(server_end);
        let client = Arc::new(LircClient::new(client_end, read_timeout));
        (RemoteController::new(client, "tv"), fake)
    }

    #[test]
    fn test_key_press_from_reply_uses_echoed_key() {
        let now = Utc::now();
        let reply = ReplyPacket {
            command: "SEND_ONCE tv KEY_POWER".to_string(),
            success: true,
            data: vec![],
        };
        let press = key_press_from_reply(reply, "requested", now, now);
        assert_eq!(press.key, "KEY_POWER");
        assert!(press.success);
        assert_eq!(press.duration(), chrono::Duration::zero());
    }

    #[test]
    fn test_key_press_from_empty_reply_falls_back() {
        let now = Utc::now();
        let press = key_press_from_reply(ReplyPacket::default(), "KEY_UP", now, now);
        assert_eq!(press.key, "KEY_UP");
        assert!(!press.success);
    }

    #[tokio::test]
    async fn test_press_once() {
        let (remote, fake) = remote_pair(Duration::from_secs(1));

        let press = remote.press_once("KEY_POWER").await.unwrap();
        assert_eq!(press.key, "KEY_POWER");
        assert!(press.success);
        assert!(press.start_time <= press.end_time);
        assert_eq!(fake.lines(), vec!["SEND_ONCE tv KEY_POWER"]);
    }

    #[tokio::test]
    async fn test_press_duration_excludes_wait_for_shared_client() {
        let (remote, _fake) = remote_pair(Duration::from_millis(300));

        let blocker = {
            let client = remote.client().clone();
            tokio::spawn(async move { client.send_command("HANG").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let queued = tokio::time::Instant::now();
        let press = remote.press_once("KEY_UP").await.unwrap();
        assert!(queued.elapsed() >= Duration::from_millis(200));

        assert!(press.success);
        assert!(press.duration() < chrono::Duration::milliseconds(100));
        assert!(blocker.await.unwrap().unwrap_err().is_timeout());
    }

    #[tokio::test]
    async fn test_press_failure_reports_data() {
        let (remote, _fake) = remote_pair(Duration::from_secs(1));

        let presses = remote.press("KEY_BAD", 1, Duration::ZERO).await.unwrap();
        assert_eq!(presses.len(), 1);
        assert!(!presses[0].success);
        assert_eq!(presses[0].data, vec!["unknown command: \"KEY_BAD\"".to_string()]);
    }

    #[tokio::test]
    async fn test_press_zero_count_presses_once() {
        let (remote, fake) = remote_pair(Duration::from_secs(1));

        let presses = remote.press("KEY_UP", 0, Duration::from_millis(10)).await.unwrap();
        assert_eq!(presses.len(), 1);
        assert_eq!(fake.lines().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_press_repeat_sleeps_between_presses_only() {
        let (remote, fake) = remote_pair(Duration::from_secs(5));
        let delay = Duration::from_millis(300);

        let started = tokio::time::Instant::now();
        let presses = remote.press("KEY_FLAKY", 3, delay).await.unwrap();
        let elapsed = started.elapsed();

        assert_eq!(fake.lines(), vec!["SEND_ONCE tv KEY_FLAKY"; 3]);
        assert_eq!(
            presses.iter().map(|p| p.success).collect::<Vec<_>>(),
            vec![true, false, true]
        );
        assert!(presses.iter().all(|p| p.key == "KEY_FLAKY"));
        assert!(elapsed >= delay * 2, "elapsed {:?}", elapsed);
        assert!(elapsed < delay * 3, "elapsed {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_press_timestamps_are_ordered() {
        let (remote, _fake) = remote_pair(Duration::from_secs(1));
        let delay = Duration::from_millis(20);

        let presses = remote.press("KEY_UP", 2, delay).await.unwrap();
        assert_eq!(presses.len(), 2);
        assert!(presses[0].end_time <= presses[1].start_time);
        let gap = (presses[1].start_time - presses[0].end_time).to_std().unwrap();
        assert!(gap >= Duration::from_millis(19), "gap {:?}", gap);
    }

    #[tokio::test]
    async fn test_press_propagates_timeout() {
        let (client_end, server_end) = tokio::io::duplex(4096);
        // Peer that never answers.
        let _server_end = server_end;
        let client = Arc::new(LircClient::new(client_end, Duration::from_millis(50)));
        let remote = RemoteController::new(client, "tv");

        let err = remote.press("KEY_UP", 2, Duration::ZERO).await.unwrap_err();
        assert!(matches!(err, LircError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_list_keys_and_hold() {
        let (remote, fake) = remote_pair(Duration::from_secs(1));

        let keys = remote.list_keys().await.unwrap();
        assert_eq!(keys.len(), 2);
        assert!(remote.send_start("KEY_UP").await.unwrap().success);
        assert!(remote.send_stop("KEY_UP").await.unwrap().success);
        assert_eq!(
            fake.lines(),
            vec!["LIST tv", "SEND_START tv KEY_UP", "SEND_STOP tv KEY_UP"]
        );
        assert_eq!(remote.remote_name(), "tv");
    }
}
