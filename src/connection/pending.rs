use std::cell::RefCell;
use std::fmt;
use std::num::NonZeroU32;
use std::rc::Rc;

use crate::error::{Error, ErrorKind, Result};
use crate::{Message, MessageKind};

type ReturnCallback = Box<dyn FnOnce(&Message)>;
type ErrorCallback = Box<dyn FnOnce(&Error)>;

struct Inner {
    serial: NonZeroU32,
    outcome: Option<Result<Message>>,
    on_return: Option<ReturnCallback>,
    on_error: Option<ErrorCallback>,
    delivered: bool,
}

/// A method call which is waiting for its reply.
///
/// Callbacks can be set before or after the reply has arrived. Once the call
/// is resolved, the callback matching the outcome is invoked exactly once.
/// Dropping the handle without setting any callbacks is fine, the reply is
/// still matched and discarded when it arrives.
///
/// Handles are cheap to clone and share the same state.
#[derive(Clone)]
pub struct PendingCall {
    inner: Rc<RefCell<Inner>>,
}

impl PendingCall {
    pub(crate) fn new(serial: NonZeroU32) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                serial,
                outcome: None,
                on_return: None,
                on_error: None,
                delivered: false,
            })),
        }
    }

    /// The serial of the call this is waiting for a reply to.
    pub fn serial(&self) -> NonZeroU32 {
        self.inner.borrow().serial
    }

    /// Test if a reply or a local failure has been recorded.
    pub fn is_resolved(&self) -> bool {
        self.inner.borrow().outcome.is_some()
    }

    /// Set the callback invoked with a successful reply.
    ///
    /// If the call already succeeded and nothing has been delivered yet, the
    /// callback is invoked immediately.
    pub fn on_return<F>(&self, f: F)
    where
        F: 'static + FnOnce(&Message),
    {
        {
            let mut inner = self.inner.borrow_mut();

            if inner.delivered {
                return;
            }

            inner.on_return = Some(Box::new(f));
        }

        self.fire();
    }

    /// Set the callback invoked with an error reply or a local failure such
    /// as the connection closing.
    ///
    /// Error replies are reported as errors for which
    /// [`Error::is_remote`] returns `true`.
    pub fn on_error<F>(&self, f: F)
    where
        F: 'static + FnOnce(&Error),
    {
        {
            let mut inner = self.inner.borrow_mut();

            if inner.delivered {
                return;
            }

            inner.on_error = Some(Box::new(f));
        }

        self.fire();
    }

    /// Take the outcome of the call, if it has been resolved and not already
    /// taken.
    ///
    /// Callbacks which haven't fired yet won't fire after this.
    pub fn take(&self) -> Option<Result<Message>> {
        let mut inner = self.inner.borrow_mut();
        let outcome = inner.outcome.take()?;
        inner.delivered = true;
        inner.on_return = None;
        inner.on_error = None;
        Some(outcome)
    }

    /// Resolve the call with a reply.
    pub(crate) fn resolve(&self, reply: Message) {
        let outcome = match reply.kind() {
            MessageKind::Error { error_name, .. } => {
                let message = reply.error_message().unwrap_or_default();
                Err(ErrorKind::ResponseError(error_name.clone(), message.into()).into())
            }
            _ => Ok(reply),
        };

        self.complete(outcome);
    }

    /// Fail the call locally.
    pub(crate) fn fail(&self, error: Error) {
        self.complete(Err(error));
    }

    fn complete(&self, outcome: Result<Message>) {
        {
            let mut inner = self.inner.borrow_mut();

            if inner.outcome.is_some() || inner.delivered {
                return;
            }

            inner.outcome = Some(outcome);
        }

        self.fire();
    }

    /// Invoke the callback matching the outcome, if both are available.
    ///
    /// The cell is not borrowed while the callback runs so that callbacks can
    /// inspect the call.
    fn fire(&self) {
        let (outcome, callback) = {
            let mut inner = self.inner.borrow_mut();

            let callback = match &inner.outcome {
                Some(Ok(..)) => inner.on_return.take().map(Callback::Return),
                Some(Err(..)) => inner.on_error.take().map(Callback::Error),
                None => None,
            };

            let Some(callback) = callback else {
                return;
            };

            inner.delivered = true;
            inner.on_return = None;
            inner.on_error = None;
            (inner.outcome.take(), callback)
        };

        match (&outcome, callback) {
            (Some(Ok(message)), Callback::Return(f)) => f(message),
            (Some(Err(error)), Callback::Error(f)) => f(error),
            _ => {}
        }

        self.inner.borrow_mut().outcome = outcome;
    }
}

enum Callback {
    Return(ReturnCallback),
    Error(ErrorCallback),
}

impl fmt::Debug for PendingCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();

        f.debug_struct("PendingCall")
            .field("serial", &inner.serial)
            .field("resolved", &inner.outcome.is_some())
            .field("delivered", &inner.delivered)
            .finish()
    }
}
