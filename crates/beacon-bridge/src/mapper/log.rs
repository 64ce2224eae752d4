// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Log event mapper.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{instrument, warn};

use beacon_core::value::{DynamicValue, ValueMap};

use super::{ChannelSet, MapperOutcome, MapperRuntime, PatchError, encode_event};
use crate::channel::MainThread;
use crate::events::LogEvent;

/// Routes native log events through the framework's `mapLogEvent` callback.
pub struct LogEventMapper {
    runtime: MapperRuntime,
}

impl LogEventMapper {
    pub const METHOD: &'static str = "mapLogEvent";

    pub fn new(channels: Arc<ChannelSet>, main_thread: Arc<dyn MainThread>, timeout: Duration) -> Self {
        Self {
            runtime: MapperRuntime::new(channels, main_thread, timeout),
        }
    }

    pub fn runtime(&self) -> &MapperRuntime {
        &self.runtime
    }

    /// `None` when the framework dropped the event.
    #[instrument(skip_all)]
    pub fn map(&self, event: LogEvent) -> Option<LogEvent> {
        let started = Instant::now();
        let mapped = self.map_inner(event);
        self.runtime.record_total(started.elapsed());
        mapped
    }

    fn map_inner(&self, event: LogEvent) -> Option<LogEvent> {
        let encoded = match encode_event(&event) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(error = %e, "log event not encodable; passing through");
                return Some(event);
            }
        };

        match self.runtime.call(Self::METHOD, DynamicValue::Map(encoded)) {
            MapperOutcome::Unchanged => Some(event),
            MapperOutcome::Drop => None,
            MapperOutcome::Replace(response) => match apply_log_patch(&event, response) {
                Ok(patched) => Some(patched),
                Err(e) => {
                    warn!(error = %e, "mapped log event rejected; keeping original");
                    Some(event)
                }
            },
        }
    }
}

/// Copy the mutable fields of the mapped event onto the original.
fn apply_log_patch(original: &LogEvent, response: ValueMap) -> Result<LogEvent, PatchError> {
    let json = DynamicValue::Map(response).to_json()?;
    let mapped: LogEvent = serde_json::from_value(json)?;

    let mut event = original.clone();
    event.status = mapped.status;
    event.message = mapped.message;
    event.ddtags = mapped.ddtags;
    event.logger.name = mapped.logger.name;
    if let Some(error) = event.error.as_mut() {
        error.fingerprint = mapped.error.and_then(|e| e.fingerprint);
    }
    event.additional_properties = mapped.additional_properties;
    Ok(event)
}
