use std::fmt;

use crate::error::HikeError;
use crate::options::GeolocationOptions;
use crate::track_types::Position;

/// One delivery from a position source. An `Error` ends the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum PositionEvent {
    Fix(Position),
    Error(String),
}

/// Receives position events, in order and never concurrently.
pub type PositionSink = Box<dyn FnMut(PositionEvent)>;

pub trait PositionSource {
    fn watch(&self, options: &GeolocationOptions, sink: PositionSink) -> Result<Subscription, HikeError>;
}

/// Handle to an active watch. Dropping it cancels the watch.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(mut self) {
        self.run_cancel();
    }

    fn run_cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_cancel();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
