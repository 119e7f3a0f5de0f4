//! Single-shot completion handles.

use std::fmt;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::time::Duration;

use super::TypesetResult;
use crate::error::{Error, Result};

type CancelHook = Box<dyn FnOnce() + Send>;

/// Create a connected completion/pending pair.
pub fn channel() -> (Completion, Pending) {
    let (tx, rx) = mpsc::sync_channel(1);
    (
        Completion { tx },
        Pending {
            rx,
            on_cancel: None,
        },
    )
}

/// The typesetter's side: consumed by [`Completion::complete`], so it can
/// fire at most once.
pub struct Completion {
    tx: SyncSender<Result<TypesetResult>>,
}

impl Completion {
    pub fn complete(self, result: Result<TypesetResult>) {
        // The caller may have stopped waiting; the result is dropped then.
        let _ = self.tx.send(result);
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion").finish_non_exhaustive()
    }
}

/// The caller's side of a typesetting job.
///
/// Dropping a `Completion` without completing resolves the handle with
/// [`Error::OracleDisconnected`].
pub struct Pending {
    rx: Receiver<Result<TypesetResult>>,
    on_cancel: Option<CancelHook>,
}

impl Pending {
    /// A handle that is already resolved.
    pub fn ready(result: Result<TypesetResult>) -> Self {
        let (completion, pending) = channel();
        completion.complete(result);
        pending
    }

    /// Register work to run when [`Pending::wait_timeout`] gives up, such as
    /// killing a child process.
    pub fn on_cancel(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.on_cancel = Some(Box::new(hook));
        self
    }

    /// Block until the typesetter answers. There is no deadline.
    pub fn wait(self) -> Result<TypesetResult> {
        self.rx.recv().map_err(|_| Error::OracleDisconnected)?
    }

    /// Block for at most `timeout`, running the cancel hook on expiry.
    pub fn wait_timeout(mut self, timeout: Duration) -> Result<TypesetResult> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                if let Some(cancel) = self.on_cancel.take() {
                    cancel();
                }
                Err(Error::OracleTimeout(timeout))
            }
            Err(RecvTimeoutError::Disconnected) => Err(Error::OracleDisconnected),
        }
    }

    /// [`Pending::wait`] or [`Pending::wait_timeout`] depending on `timeout`.
    pub fn wait_for(self, timeout: Option<Duration>) -> Result<TypesetResult> {
        match timeout {
            Some(timeout) => self.wait_timeout(timeout),
            None => self.wait(),
        }
    }
}

impl fmt::Debug for Pending {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pending")
            .field("cancellable", &self.on_cancel.is_some())
            .finish_non_exhaustive()
    }
}
