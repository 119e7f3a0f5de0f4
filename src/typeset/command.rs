//! Typesetter backed by an external process.
//!
//! The process receives one JSON document on stdin,
//!
//! ```json
//! {"config": {"font": "TeX", "extensions": ""}, "typeset": { ...request... }}
//! ```
//!
//! and must print one JSON [`TypesetResult`] (`{"html": "...", "errors": []}`)
//! on stdout before exiting with status 0. Its stderr is passed through.

use std::ffi::OsString;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde::Serialize;

use super::{Pending, TypesetRequest, TypesetResult, Typesetter, channel};
use crate::error::{Error, Result};

const REAP_INTERVAL: Duration = Duration::from_millis(10);

/// Engine-wide settings sent alongside every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineConfig {
    /// Web font for SVG glyphs.
    pub font: String,
    /// Extra engine extensions, comma separated (e.g. `Safe,TeX/noUndefined`).
    pub extensions: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            font: "TeX".to_string(),
            extensions: String::new(),
        }
    }
}

impl EngineConfig {
    /// Select the web font. `STIX` is only available as `STIX-Web`.
    pub fn with_font(mut self, font: &str) -> Self {
        self.font = if font == "STIX" {
            "STIX-Web".to_string()
        } else {
            font.to_string()
        };
        self
    }

    pub fn with_extensions(mut self, extensions: impl Into<String>) -> Self {
        self.extensions = extensions.into();
        self
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    config: &'a EngineConfig,
    typeset: &'a TypesetRequest,
}

/// Runs a typesetting program once per request.
#[derive(Debug, Clone)]
pub struct CommandTypesetter {
    program: PathBuf,
    args: Vec<OsString>,
    config: EngineConfig,
}

impl CommandTypesetter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            config: EngineConfig::default(),
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn engine_config(&self) -> &EngineConfig {
        &self.config
    }

    fn spawn(&self) -> Result<Child> {
        Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                Error::OracleFailed(format!("cannot start {}: {e}", self.program.display()))
            })
    }
}

impl Typesetter for CommandTypesetter {
    #[tracing::instrument(skip_all, fields(program = %self.program.display()))]
    fn typeset(&self, request: TypesetRequest) -> Pending {
        let payload = match serde_json::to_vec(&Envelope {
            config: &self.config,
            typeset: &request,
        }) {
            Ok(payload) => payload,
            Err(e) => return Pending::ready(Err(e.into())),
        };

        let mut child = match self.spawn() {
            Ok(child) => child,
            Err(e) => return Pending::ready(Err(e)),
        };
        tracing::debug!(pid = child.id(), bytes = payload.len(), "typesetter started");

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let child = Arc::new(Mutex::new(child));

        let (completion, pending) = channel();
        let worker_child = Arc::clone(&child);
        thread::spawn(move || {
            completion.complete(exchange(&worker_child, stdin, stdout, payload));
        });

        pending.on_cancel(move || {
            if let Ok(mut child) = child.lock() {
                tracing::warn!(pid = child.id(), "killing unresponsive typesetter");
                let _ = child.kill();
            }
        })
    }
}

/// Feed the request, collect stdout, reap the process.
fn exchange(
    child: &Mutex<Child>,
    stdin: Option<ChildStdin>,
    stdout: Option<ChildStdout>,
    payload: Vec<u8>,
) -> Result<TypesetResult> {
    let mut stdout =
        stdout.ok_or_else(|| Error::OracleFailed("typesetter stdout unavailable".into()))?;

    let mut output = Vec::new();
    let (read, written) = thread::scope(|s| {
        // Write on a separate thread so a chatty child cannot deadlock us.
        let writer = s.spawn(move || -> io::Result<()> {
            if let Some(mut stdin) = stdin {
                stdin.write_all(&payload)?;
            }
            Ok(())
        });
        let read = stdout.read_to_end(&mut output);
        let written = writer
            .join()
            .unwrap_or_else(|_| Err(io::Error::other("stdin writer panicked")));
        (read, written)
    });

    let status = reap(child)?;
    if !status.success() {
        return Err(Error::OracleFailed(format!("typesetter exited with {status}")));
    }
    read?;
    match written {
        // The child may answer without draining stdin; its exit status and
        // output decide the outcome then.
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            tracing::debug!("typesetter closed stdin early");
        }
        other => other?,
    }

    let result: TypesetResult = serde_json::from_slice(&output)?;
    tracing::debug!(bytes = result.html.len(), "typesetter finished");
    Ok(result)
}

/// Wait for the child to exit, taking the lock only for each poll so the
/// cancel hook can always get in to kill it.
fn reap(child: &Mutex<Child>) -> Result<ExitStatus> {
    loop {
        let polled = child
            .lock()
            .map_err(|_| Error::OracleFailed("typesetter handle poisoned".into()))?
            .try_wait()?;
        match polled {
            Some(status) => return Ok(status),
            None => thread::sleep(REAP_INTERVAL),
        }
    }
}
