// MIT License - Copyright (c) 2026 Peter Wright
// In-process lircd stand-in for unit tests

use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

/// Handle onto what the fake daemon has received.
#[derive(Clone, Default)]
pub(crate) struct FakeLircd {
    raw: Arc<Mutex<Vec<u8>>>,
    lines: Arc<Mutex<Vec<String>>>,
}

impl FakeLircd {
    pub(crate) fn raw_bytes(&self) -> Vec<u8> {
        self.raw.lock().unwrap().clone()
    }

    pub(crate) fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

/// Serve the lircd reply grammar on `stream` until the peer goes away.
///
/// Command lines with special handling:
/// - `HANG...` gets no reply
/// - `BOGUS` gets a malformed packet
/// - `NOISY` gets stray bytes ahead of its packet
/// - a key named `KEY_BAD` fails with a DATA explanation
/// - a key named `KEY_FLAKY` fails on every even-numbered command
pub(crate) fn spawn_fake_lircd<S>(stream: S) -> FakeLircd
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let fake = FakeLircd::default();
    let state = fake.clone();

    tokio::spawn(async move {
        let (reader, mut writer) = tokio::io::split(stream);
        let mut reader = BufReader::new(reader);

        loop {
            let mut line = String::new();
            match reader.read_line(&mut line).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            state.raw.lock().unwrap().extend_from_slice(line.as_bytes());

            let command = line.trim_end_matches('\n').to_string();
            let count = {
                let mut lines = state.lines.lock().unwrap();
                lines.push(command.clone());
                lines.len()
            };

            if let Some(reply) = reply_for(&command, count) {
                if writer.write_all(reply.as_bytes()).await.is_err() {
                    break;
                }
            }
        }
    });

    fake
}

fn packet(command: &str, success: bool, data: &[&str]) -> String {
    let mut out = format!(
        "BEGIN\n{}\n{}\n",
        command,
        if success { "SUCCESS" } else { "ERROR" }
    );
    if !data.is_empty() {
        out.push_str(&format!("DATA\n{}\n", data.len()));
        for line in data {
            out.push_str(line);
            out.push('\n');
        }
    }
    out.push_str("END\n");
    out
}

fn reply_for(command: &str, count: usize) -> Option<String> {
    let key = command.split_whitespace().last().unwrap_or_default();
    let reply = match command {
        c if c.starts_with("HANG") => return None,
        "BOGUS" => "BEGIN\nBOGUS\nSUCCESS\nWHAT\nEND\n".to_string(),
        "NOISY" => format!("stray output\n{}", packet(command, true, &[])),
        "VERSION" => packet(command, true, &["0.10.1"]),
        "LIST" => packet(command, true, &["tv", "stb"]),
        c if c.starts_with("LIST ") => packet(
            command,
            true,
            &["0000000000000001 KEY_POWER", "0000000000000002 KEY_UP"],
        ),
        _ if key == "KEY_BAD" => packet(command, false, &["unknown command: \"KEY_BAD\""]),
        _ if key == "KEY_FLAKY" => packet(command, count % 2 == 1, &[]),
        _ => packet(command, true, &[]),
    };
    Some(reply)
}
