use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::bridge::message::InboundMessage;
use crate::trace::{logger::TraceLogger, trace::TraceEvent};

pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug)]
pub enum DeliveryError {
    /// The receiving context has not signalled load yet; the payload is lost.
    NotLoaded,

    /// The receiving side could not decode the payload.
    Malformed(serde_json::Error),

    /// The sending side could not encode the message.
    Serialize(serde_json::Error),
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryError::NotLoaded => write!(f, "Rendering context is not loaded yet"),
            DeliveryError::Malformed(e) => write!(f, "Malformed overlay message: {}", e),
            DeliveryError::Serialize(e) => write!(f, "Could not encode overlay message: {}", e),
        }
    }
}

impl std::error::Error for DeliveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DeliveryError::Malformed(e) | DeliveryError::Serialize(e) => Some(e),
            DeliveryError::NotLoaded => None,
        }
    }
}

/// The raw channel into a rendering context: one JSON payload per call,
/// no acknowledgement.
pub trait FrameTransport {
    fn post(&mut self, payload: &str) -> Result<(), DeliveryError>;
}

/// Fire-and-forget sender that holds messages back until the rendering
/// context has loaded.
///
/// Messages sent early are queued in order and flushed on the load signal.
/// Contexts that never signal get one retry flush once `retry_delay` has
/// passed since the first deferral. Queue order is never changed.
pub struct MessageBridge<T: FrameTransport> {
    transport: T,
    loaded: bool,
    pending: VecDeque<String>,
    deferred_since: Option<Instant>,
    retried: bool,
    retry_delay: Duration,
    tracer: Arc<TraceLogger>,
}

impl<T: FrameTransport> MessageBridge<T> {
    pub fn new(transport: T, retry_delay: Duration, tracer: Arc<TraceLogger>) -> Self {
        Self {
            transport,
            loaded: false,
            pending: VecDeque::new(),
            deferred_since: None,
            retried: false,
            retry_delay,
            tracer,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn send(&mut self, message: &InboundMessage) -> Result<(), DeliveryError> {
        let payload = serde_json::to_string(message).map_err(DeliveryError::Serialize)?;

        // Anything already queued must go first.
        if !self.loaded || !self.pending.is_empty() {
            self.defer(payload, message.kind());
            return Ok(());
        }

        match self.transport.post(&payload) {
            Ok(()) => Ok(()),
            Err(DeliveryError::NotLoaded) => {
                self.loaded = false;
                self.defer(payload, message.kind());
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn defer(&mut self, payload: String, kind: &str) {
        self.pending.push_back(payload);
        self.deferred_since.get_or_insert_with(Instant::now);
        self.tracer
            .log(TraceEvent::now("bridge", "deferred").with_detail(kind));
    }

    /// The context signalled load: deliver everything queued.
    pub fn on_load(&mut self) {
        self.loaded = true;
        self.flush();
    }

    /// The context is navigating away; queue again until the next load.
    pub fn on_unload(&mut self) {
        self.loaded = false;
        self.retried = false;
    }

    /// Fallback for contexts that never emit a load signal: after
    /// `retry_delay` one flush is attempted regardless.
    pub fn poll(&mut self, now: Instant) {
        if self.loaded || self.retried || self.pending.is_empty() {
            return;
        }
        let Some(since) = self.deferred_since else {
            return;
        };
        if now.saturating_duration_since(since) < self.retry_delay {
            return;
        }

        self.retried = true;
        self.tracer.log(
            TraceEvent::now("bridge", "retry").with_detail(format!("{} pending", self.pending.len())),
        );
        self.flush();
        if self.pending.is_empty() {
            self.loaded = true;
        }
    }

    fn flush(&mut self) {
        while let Some(payload) = self.pending.front() {
            match self.transport.post(payload) {
                Ok(()) => {
                    self.pending.pop_front();
                }
                Err(DeliveryError::NotLoaded) => break,
                Err(e) => {
                    self.tracer
                        .log(TraceEvent::now("bridge", "dropped").with_detail(e));
                    self.pending.pop_front();
                }
            }
        }
        if self.pending.is_empty() {
            self.deferred_since = None;
        } else {
            self.loaded = false;
        }
    }
}
