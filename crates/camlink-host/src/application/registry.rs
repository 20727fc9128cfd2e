//! StreamRegistry: shared store of endpoint state and latest frames.
//!
//! The registry is the only mutable structure shared between the scanner,
//! the receivers, the output loop and the control console.  Each entry
//! tracks:
//!
//! - The endpoint's [`ConnectionState`] and [`Rotation`].
//! - The latest decoded [`Frame`], shared as an `Arc` so the compositor can
//!   read it while the receiver is already decoding the next one.
//!
//! # Activation order (for beginners)
//!
//! Besides the map of known endpoints the registry keeps an *active list*:
//! endpoints that have delivered at least one frame on their current
//! connection, in the order they first did so.  Position 0 is "camera 1",
//! position 1 is "camera 2".  When a connection drops the endpoint leaves the
//! active list; when it comes back it is appended at the end again.
//!
//! # Locking
//!
//! Every operation takes one `std::sync::Mutex` for no longer than a map
//! lookup plus an `Arc` clone.  Decoding and compositing always happen
//! outside the lock, which is why a blocking mutex is fine even when called
//! from async tasks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use camlink_core::{ConnectionState, EndpointId, Frame, Rotation};
use serde::Serialize;

/// Per-endpoint record held by the registry.
#[derive(Debug, Clone)]
struct EndpointRecord {
    state: ConnectionState,
    rotation: Rotation,
    frame: Option<Arc<Frame>>,
}

impl EndpointRecord {
    fn new() -> Self {
        Self {
            state: ConnectionState::Discovered,
            rotation: Rotation::Deg0,
            frame: None,
        }
    }
}

#[derive(Debug, Default)]
struct RegistryInner {
    records: HashMap<EndpointId, EndpointRecord>,
    /// Every endpoint ever registered, in registration order.
    known: Vec<EndpointId>,
    /// Endpoints currently streaming, in first-activation order.
    active: Vec<EndpointId>,
}

impl RegistryInner {
    fn ensure(&mut self, endpoint: &EndpointId) -> &mut EndpointRecord {
        if !self.records.contains_key(endpoint) {
            self.known.push(endpoint.clone());
        }
        self.records
            .entry(endpoint.clone())
            .or_insert_with(EndpointRecord::new)
    }
}

/// One active endpoint as seen by a single compose call.
#[derive(Debug, Clone)]
pub struct ActiveSource {
    pub endpoint: EndpointId,
    pub rotation: Rotation,
    /// `None` only in the brief window between activation and eviction.
    pub frame: Option<Arc<Frame>>,
}

/// Point-in-time status of one known endpoint, for the control panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointStatus {
    pub endpoint: EndpointId,
    pub state: ConnectionState,
    pub online: bool,
    pub rotation_degrees: u16,
    /// Zero-based position in the active list, if active.
    pub slot: Option<usize>,
}

/// Thread-safe endpoint registry.
#[derive(Debug, Default)]
pub struct StreamRegistry {
    inner: Mutex<RegistryInner>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        // Every critical section leaves the maps consistent, so a panic in
        // another holder does not invalidate the data.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers an endpoint with rotation 0.
    ///
    /// Returns `true` if the endpoint was not known before.  Registering an
    /// existing endpoint changes nothing, including its rotation.
    pub fn register(&self, endpoint: &EndpointId) -> bool {
        let mut inner = self.lock();
        if inner.records.contains_key(endpoint) {
            return false;
        }
        inner.ensure(endpoint);
        true
    }

    /// Returns `true` if `endpoint` has ever been registered.
    pub fn contains(&self, endpoint: &EndpointId) -> bool {
        self.lock().records.contains_key(endpoint)
    }

    /// Updates the connection state of a known endpoint.
    pub fn set_state(&self, endpoint: &EndpointId, state: ConnectionState) {
        if let Some(record) = self.lock().records.get_mut(endpoint) {
            record.state = state;
        }
    }

    /// Stores `frame` as the endpoint's latest frame and marks it streaming.
    ///
    /// The endpoint is appended to the active list if it is not already
    /// there.  Returns `true` when this call activated the endpoint.
    pub fn publish_frame(&self, endpoint: &EndpointId, frame: Arc<Frame>) -> bool {
        let mut inner = self.lock();
        let record = inner.ensure(endpoint);
        record.frame = Some(frame);
        record.state = ConnectionState::Streaming;

        if inner.active.contains(endpoint) {
            false
        } else {
            inner.active.push(endpoint.clone());
            true
        }
    }

    /// Removes the endpoint from the active list and drops its frame.
    ///
    /// The endpoint stays known and keeps its rotation.  Returns `true` if it
    /// was active.
    pub fn remove(&self, endpoint: &EndpointId) -> bool {
        let mut inner = self.lock();
        if let Some(record) = inner.records.get_mut(endpoint) {
            record.frame = None;
            record.state = ConnectionState::Disconnected;
        }
        let before = inner.active.len();
        inner.active.retain(|e| e != endpoint);
        inner.active.len() != before
    }

    /// Advances the rotation of the active endpoint at `index` by 90°.
    ///
    /// Returns the endpoint and its new rotation, or `None` if no endpoint
    /// occupies that slot.
    pub fn rotate_active(&self, index: usize) -> Option<(EndpointId, Rotation)> {
        let mut inner = self.lock();
        let endpoint = inner.active.get(index)?.clone();
        let record = inner.records.get_mut(&endpoint)?;
        record.rotation = record.rotation.clockwise();
        Some((endpoint, record.rotation))
    }

    /// Returns the stored rotation of a known endpoint.
    pub fn rotation(&self, endpoint: &EndpointId) -> Option<Rotation> {
        self.lock().records.get(endpoint).map(|r| r.rotation)
    }

    /// Returns the connection state of a known endpoint.
    pub fn state(&self, endpoint: &EndpointId) -> Option<ConnectionState> {
        self.lock().records.get(endpoint).map(|r| r.state)
    }

    /// Returns the latest frame of an endpoint, if it has one.
    pub fn latest_frame(&self, endpoint: &EndpointId) -> Option<Arc<Frame>> {
        self.lock().records.get(endpoint).and_then(|r| r.frame.clone())
    }

    /// Number of endpoints currently in the active list.
    pub fn active_count(&self) -> usize {
        self.lock().active.len()
    }

    /// Active endpoint identities in activation order.
    pub fn active_endpoints(&self) -> Vec<EndpointId> {
        self.lock().active.clone()
    }

    /// Consistent view of the active list for one compose call.
    pub fn snapshot(&self) -> Vec<ActiveSource> {
        let inner = self.lock();
        inner
            .active
            .iter()
            .filter_map(|endpoint| {
                inner.records.get(endpoint).map(|record| ActiveSource {
                    endpoint: endpoint.clone(),
                    rotation: record.rotation,
                    frame: record.frame.clone(),
                })
            })
            .collect()
    }

    /// Status of every known endpoint in registration order.
    pub fn statuses(&self) -> Vec<EndpointStatus> {
        let inner = self.lock();
        inner
            .known
            .iter()
            .filter_map(|endpoint| {
                inner.records.get(endpoint).map(|record| EndpointStatus {
                    endpoint: endpoint.clone(),
                    state: record.state,
                    online: record.state.is_online(),
                    rotation_degrees: record.rotation.degrees(),
                    slot: inner.active.iter().position(|e| e == endpoint),
                })
            })
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
