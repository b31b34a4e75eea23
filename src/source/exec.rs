//! `exec:` source: read a subprocess's stdout

use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStderr, Command};

use crate::error::{ConfigError, Error, Result};
use crate::producer::Producer;

use super::{split_media, RawProducer, SourceOptions};

/// Spawn the command in `url` with default options
pub async fn open(url: String) -> Result<Arc<dyn Producer>> {
    open_with(url, SourceOptions::default()).await
}

/// Spawn the command in `url` and publish its stdout.
///
/// `url` is `exec:<command line>[#<media query>]`. The child's stderr is
/// forwarded to the log; the child is killed when the producer stops or is
/// dropped.
pub async fn open_with(url: String, options: SourceOptions) -> Result<Arc<dyn Producer>> {
    let (base, media) = split_media(&url)?;

    let command_line = base.strip_prefix("exec:").unwrap_or(base);
    let args = quote_split(command_line);
    let Some((program, rest)) = args.split_first() else {
        return Err(ConfigError::InvalidSource {
            url: url.clone(),
            reason: "empty command".into(),
        }
        .into());
    };

    let mut child = Command::new(program)
        .args(rest)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| Error::Spawn {
            command: program.clone(),
            source,
        })?;

    let stdout = child
        .stdout
        .take()
        .ok_or(Error::Invariant("child stdout not piped".into()))?;
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(forward_stderr(program.clone(), stderr));
    }

    tracing::info!(command = %program, pid = ?child.id(), media = %media, "Source process spawned");

    let producer = RawProducer::new("exec", media, Box::new(stdout), options).with_process(child);
    Ok(Arc::new(producer))
}

async fn forward_stderr(program: String, stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();
        if !line.is_empty() {
            tracing::debug!(command = %program, "{}", line);
        }
    }
}

/// Split a command line into arguments.
///
/// Arguments are separated by whitespace. Text inside `"..."` or `'...'` is
/// one argument with the quotes removed, newlines included. An unterminated
/// quote runs to the end of the input.
pub fn quote_split(s: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut rest = s.trim();

    while let Some(c) = rest.chars().next() {
        if c.is_whitespace() {
            rest = rest.trim_start();
            continue;
        }

        if c == '"' || c == '\'' {
            let body = &rest[1..];
            match body.find(c) {
                Some(end) => {
                    args.push(body[..end].to_string());
                    rest = &body[end + 1..];
                }
                None => {
                    args.push(body.to_string());
                    rest = "";
                }
            }
            continue;
        }

        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        args.push(rest[..end].to_string());
        rest = &rest[end..];
    }

    args
}
