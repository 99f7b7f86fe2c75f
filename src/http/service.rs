//! HTTP service handler

use super::error::{self, ServerError};
use super::error_handler::ErrorHandler;
use super::settings::HttpSettings;
use super::task::HttpTask;
use crate::reactor::{Error, HandlerState, Result, ServiceHandler, SocketHandle, Task};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Owns one HTTP connection and serves a single request on it
#[derive(Debug)]
pub struct HttpServiceHandler {
    settings: Arc<HttpSettings>,
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    state: HandlerState,
    handle: Option<SocketHandle>,
}

impl HttpServiceHandler {
    pub fn new(settings: Arc<HttpSettings>) -> Self {
        HttpServiceHandler {
            settings,
            inner: Mutex::new(Inner {
                state: HandlerState::Created,
                handle: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move to `Closed` and hand back the connection, if still held
    fn release(&self) -> Option<SocketHandle> {
        let mut inner = self.lock();
        inner.state = HandlerState::Closed;
        inner.handle.take()
    }
}

impl Default for HttpServiceHandler {
    fn default() -> Self {
        Self::new(Arc::new(HttpSettings::default()))
    }
}

impl ServiceHandler for HttpServiceHandler {
    fn open(&self, handle: SocketHandle) -> Result<()> {
        let mut inner = self.lock();
        if inner.state != HandlerState::Created {
            return Err(Error::Argument(format!(
                "cannot open a handler that is {}",
                inner.state
            )));
        }

        handle.set_read_timeout(self.settings.read_timeout)?;
        debug!(id = %handle.id(), peer = %handle.peer_addr(), "handler open");
        inner.handle = Some(handle);
        inner.state = HandlerState::Open;
        Ok(())
    }

    fn run(&self) {
        {
            let mut inner = self.lock();
            if inner.state != HandlerState::Open {
                warn!("not running a handler that is {}", inner.state);
                return;
            }
            inner.state = HandlerState::Running;
        }

        match self.task() {
            Ok(task) => task.run(),
            Err(e) => warn!("could not start task: {}", e),
        }

        if let Err(e) = self.close() {
            warn!("failed to close connection: {}", e);
        }
    }

    /// Release the connection; shutdown failures are logged, not returned
    fn close(&self) -> Result<()> {
        let Some(handle) = self.release() else {
            return Ok(());
        };
        shutdown(&handle);
        Ok(())
    }

    fn task(&self) -> Result<Box<dyn Task>> {
        let inner = self.lock();
        let handle = inner
            .handle
            .as_ref()
            .ok_or_else(|| Error::Argument(format!("no connection while {}", inner.state)))?;
        Ok(Box::new(HttpTask::for_socket(handle, &self.settings)?))
    }

    fn state(&self) -> HandlerState {
        self.lock().state
    }

    /// Answer 503 and close
    fn reject(&self, reason: &str) -> Result<()> {
        let Some(handle) = self.release() else {
            return Ok(());
        };

        let err: error::Error = ServerError::service_unavailable(reason.to_string()).into();
        if let Err(e) = ErrorHandler::new(&err).send(&mut handle.stream()) {
            debug!(id = %handle.id(), "failed to send 503: {}", e);
        }
        shutdown(&handle);
        Ok(())
    }
}

fn shutdown(handle: &SocketHandle) {
    match handle.close() {
        Ok(()) => debug!(id = %handle.id(), "handler closed"),
        Err(e) => warn!(id = %handle.id(), "failed to shut down connection: {}", e),
    }
}
