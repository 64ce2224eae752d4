// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Event mapper bridge.
//
// A native event is serialized, handed to a framework-side mapper over the
// callback channel, and the calling SDK thread blocks for a bounded time
// waiting for the answer. The callback is posted to the UI-affine context
// while the caller waits on its own rendezvous, so a busy UI thread costs a
// timeout, never a deadlock. Whatever goes wrong, the event passes through
// unmodified.

pub mod log;
pub mod rum;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use beacon_core::error::EncodingError;
use beacon_core::perf::{PerfSnapshot, PerformanceTracker};
use beacon_core::value::{DynamicValue, ValueMap};

use crate::channel::{ChannelId, ChannelResponse, MainThread, MethodChannel};

pub use log::LogEventMapper;
pub use rum::RumEventMapper;

/// Key a mapper sets in its response when it failed on the framework side.
pub const MAPPER_ERROR_KEY: &str = "_dd.mapper_error";

/// User fields that stay at the top of `usr`; everything else moves to
/// `usr.usr_info`.
const RESERVED_USER_KEYS: [&str; 3] = ["email", "id", "name"];

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// ChannelSet
// ---------------------------------------------------------------------------

struct Members {
    channels: Vec<Arc<dyn MethodChannel>>,
    last_good: Option<ChannelId>,
}

/// Live callback channels plus the "last known good" one mappers use.
///
/// A channel joins when a framework engine attaches and leaves on detach or
/// when it answers "not implemented" to a mapper call.
pub struct ChannelSet {
    members: Mutex<Members>,
}

impl Default for ChannelSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelSet {
    pub fn new() -> Self {
        Self {
            members: Mutex::new(Members {
                channels: Vec::new(),
                last_good: None,
            }),
        }
    }

    pub fn add(&self, channel: Arc<dyn MethodChannel>) {
        let mut members = lock(&self.members);
        let id = channel.id();
        if members.channels.iter().any(|c| c.id() == id) {
            return;
        }
        members.channels.push(channel);
        if members.last_good.is_none() {
            members.last_good = Some(id);
        }
        debug!(channel = %id, count = members.channels.len(), "mapper channel added");
    }

    /// Remove a channel; the pointer moves to the next member, if any.
    pub fn remove(&self, id: ChannelId) {
        let mut members = lock(&self.members);
        members.channels.retain(|c| c.id() != id);
        if members.last_good == Some(id) {
            members.last_good = members.channels.first().map(|c| c.id());
        }
        debug!(channel = %id, count = members.channels.len(), "mapper channel removed");
    }

    /// The channel mapper calls should use right now.
    pub fn current(&self) -> Option<Arc<dyn MethodChannel>> {
        let members = lock(&self.members);
        let last_good = members.last_good?;
        members.channels.iter().find(|c| c.id() == last_good).cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.members).channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Round trip
// ---------------------------------------------------------------------------

/// What a mapper decided for one event.
#[derive(Debug, Clone, PartialEq)]
pub enum MapperOutcome {
    /// Apply the whitelisted fields of this map onto the event.
    Replace(ValueMap),
    /// The mapper returned null.
    Drop,
    /// Keep the original event.
    Unchanged,
}

/// A mapper response that could not be applied to the native event.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("mapped field `{0}` is missing or has the wrong type")]
    WrongType(&'static str),

    #[error("mapped event is not encodable: {0}")]
    Encoding(#[from] EncodingError),

    #[error("mapped event has an unexpected shape: {0}")]
    Shape(#[from] serde_json::Error),
}

/// Shared machinery behind every mapper family: channel failover, the
/// bounded rendezvous, and timing.
pub struct MapperRuntime {
    channels: Arc<ChannelSet>,
    main_thread: Arc<dyn MainThread>,
    timeout: Duration,
    timeouts: AtomicU64,
    perf: Mutex<PerformanceTracker>,
    perf_main_thread: Arc<Mutex<PerformanceTracker>>,
}

impl MapperRuntime {
    pub fn new(channels: Arc<ChannelSet>, main_thread: Arc<dyn MainThread>, timeout: Duration) -> Self {
        Self {
            channels,
            main_thread,
            timeout,
            timeouts: AtomicU64::new(0),
            perf: Mutex::new(PerformanceTracker::new()),
            perf_main_thread: Arc::new(Mutex::new(PerformanceTracker::new())),
        }
    }

    pub fn channels(&self) -> &Arc<ChannelSet> {
        &self.channels
    }

    /// Number of round trips that hit the timeout.
    pub fn timeouts(&self) -> u64 {
        self.timeouts.load(Ordering::Relaxed)
    }

    /// End-to-end mapper timings.
    pub fn perf(&self) -> PerfSnapshot {
        lock(&self.perf).snapshot()
    }

    /// Timings of the callback dispatch on the UI-affine context.
    pub fn perf_main_thread(&self) -> PerfSnapshot {
        lock(&self.perf_main_thread).snapshot()
    }

    pub(crate) fn record_total(&self, elapsed: Duration) {
        lock(&self.perf).add_sample(elapsed);
    }

    /// Ask the framework to map `event`, failing over between channels that
    /// answer "not implemented".
    pub fn call(&self, mapper: &'static str, event: DynamicValue) -> MapperOutcome {
        let mut failed_over = false;
        loop {
            let Some(channel) = self.channels.current() else {
                if failed_over {
                    warn!(mapper, "no channel implements mapper; passing event through");
                } else {
                    debug!(mapper, "no channel attached; passing event through");
                }
                return MapperOutcome::Unchanged;
            };

            match self.round_trip(mapper, &channel, event.clone()) {
                Some(ChannelResponse::NotImplemented) => {
                    warn!(mapper, channel = %channel.id(), "mapper not implemented; trying next channel");
                    self.channels.remove(channel.id());
                    failed_over = true;
                }
                Some(response) => return interpret(mapper, response),
                None => return MapperOutcome::Unchanged,
            }
        }
    }

    fn round_trip(
        &self,
        mapper: &'static str,
        channel: &Arc<dyn MethodChannel>,
        event: DynamicValue,
    ) -> Option<ChannelResponse> {
        let (tx, rx) = mpsc::sync_channel::<ChannelResponse>(1);
        let mut arguments = ValueMap::new();
        arguments.insert("event".into(), event);

        let channel = Arc::clone(channel);
        let perf = Arc::clone(&self.perf_main_thread);
        self.main_thread.post(Box::new(move || {
            let started = Instant::now();
            channel.invoke_method(
                mapper,
                DynamicValue::Map(arguments),
                Box::new(move |response| {
                    let _ = tx.try_send(response);
                }),
            );
            lock(&perf).add_sample(started.elapsed());
        }));

        match rx.recv_timeout(self.timeout) {
            Ok(response) => Some(response),
            Err(RecvTimeoutError::Timeout) => {
                self.timeouts.fetch_add(1, Ordering::Relaxed);
                debug!(mapper, timeout_ms = self.timeout.as_millis() as u64, "mapper timed out");
                None
            }
            Err(RecvTimeoutError::Disconnected) => {
                warn!(mapper, "reply dropped without a response");
                None
            }
        }
    }
}

fn interpret(mapper: &str, response: ChannelResponse) -> MapperOutcome {
    match response {
        ChannelResponse::Success(DynamicValue::Null) => MapperOutcome::Drop,
        ChannelResponse::Success(DynamicValue::Map(map)) => {
            if map.contains_key(MAPPER_ERROR_KEY) {
                debug!(mapper, "mapper reported an error; keeping original event");
                MapperOutcome::Unchanged
            } else {
                MapperOutcome::Replace(map)
            }
        }
        ChannelResponse::Success(other) => {
            warn!(mapper, kind = other.type_name(), "malformed mapper response");
            MapperOutcome::Unchanged
        }
        ChannelResponse::Error { code, message, .. } => {
            debug!(mapper, %code, message = message.as_deref().unwrap_or(""), "mapper call failed");
            MapperOutcome::Unchanged
        }
        ChannelResponse::NotImplemented => MapperOutcome::Unchanged,
    }
}

// ---------------------------------------------------------------------------
// Serialization helpers
// ---------------------------------------------------------------------------

/// Native event to generic map.
pub(crate) fn encode_event<E: Serialize>(event: &E) -> Result<ValueMap, PatchError> {
    match DynamicValue::from(serde_json::to_value(event)?) {
        DynamicValue::Map(map) => Ok(map),
        _ => Err(PatchError::WrongType("event")),
    }
}

/// Move non-reserved `usr` fields under `usr.usr_info`.
pub(crate) fn normalize_extra_user_info(event: &mut ValueMap) {
    let Some(DynamicValue::Map(usr)) = event.get_mut("usr") else {
        return;
    };
    let extra_keys: Vec<String> = usr
        .keys()
        .filter(|k| !RESERVED_USER_KEYS.contains(&k.as_str()))
        .cloned()
        .collect();
    let mut extra = ValueMap::new();
    for key in extra_keys {
        if let Some(value) = usr.remove(&key) {
            extra.insert(key, value);
        }
    }
    usr.insert("usr_info".into(), DynamicValue::Map(extra));
}

pub(crate) fn required_str<'a>(
    map: &'a ValueMap,
    key: &str,
    field: &'static str,
) -> Result<&'a str, PatchError> {
    map.get(key)
        .and_then(DynamicValue::as_str)
        .ok_or(PatchError::WrongType(field))
}

pub(crate) fn optional_string(map: &ValueMap, key: &str) -> Option<String> {
    map.get(key).and_then(DynamicValue::as_str).map(str::to_owned)
}
