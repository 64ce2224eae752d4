// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// RUM event mappers: view, action, resource, error and long task.
//
// Each family has its own whitelist of mutable fields. Patches are applied to
// a copy; if any required field comes back missing or mistyped, the original
// event is kept whole.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, warn};

use beacon_core::config::RumMapperFlags;
use beacon_core::value::{DynamicValue, ValueMap};

use super::{
    ChannelSet, MapperOutcome, MapperRuntime, PatchError, encode_event, normalize_extra_user_info,
    optional_string, required_str,
};
use crate::channel::MainThread;
use crate::events::{ActionEvent, ErrorEvent, LongTaskEvent, ResourceEvent, ViewEvent, ViewInfo};
use crate::traits::RumEventHooks;

pub struct RumEventMapper {
    runtime: MapperRuntime,
}

impl RumEventMapper {
    pub const VIEW: &'static str = "mapViewEvent";
    pub const ACTION: &'static str = "mapActionEvent";
    pub const RESOURCE: &'static str = "mapResourceEvent";
    pub const ERROR: &'static str = "mapErrorEvent";
    pub const LONG_TASK: &'static str = "mapLongTaskEvent";

    pub fn new(channels: Arc<ChannelSet>, main_thread: Arc<dyn MainThread>, timeout: Duration) -> Self {
        Self {
            runtime: MapperRuntime::new(channels, main_thread, timeout),
        }
    }

    pub fn runtime(&self) -> &MapperRuntime {
        &self.runtime
    }

    /// SDK hooks for the families enabled in `flags`.
    pub fn hooks(self: &Arc<Self>, flags: RumMapperFlags) -> RumEventHooks {
        let mut hooks = RumEventHooks::default();
        if flags.view {
            let mapper = Arc::clone(self);
            hooks.view = Some(Arc::new(move |event: ViewEvent| mapper.map_view_event(event)));
        }
        if flags.action {
            let mapper = Arc::clone(self);
            hooks.action = Some(Arc::new(move |event: ActionEvent| mapper.map_action_event(event)));
        }
        if flags.resource {
            let mapper = Arc::clone(self);
            hooks.resource = Some(Arc::new(move |event: ResourceEvent| {
                mapper.map_resource_event(event)
            }));
        }
        if flags.error {
            let mapper = Arc::clone(self);
            hooks.error = Some(Arc::new(move |event: ErrorEvent| mapper.map_error_event(event)));
        }
        if flags.long_task {
            let mapper = Arc::clone(self);
            hooks.long_task = Some(Arc::new(move |event: LongTaskEvent| {
                mapper.map_long_task_event(event)
            }));
        }
        hooks
    }

    /// View events are never dropped; a null answer keeps the original.
    pub fn map_view_event(&self, event: ViewEvent) -> ViewEvent {
        let original = event.clone();
        self.map_event(Self::VIEW, event, false, |view, response| {
            apply_view(&mut view.view, response)
        })
        .unwrap_or(original)
    }

    pub fn map_action_event(&self, event: ActionEvent) -> Option<ActionEvent> {
        self.map_event(Self::ACTION, event, true, |action, response| {
            if let Some(target) = nested(response, "action", "target") {
                if let Some(current) = action.action.target.as_mut() {
                    current.name = required_str(target, "name", "action.target.name")?.to_owned();
                }
            }
            apply_view(&mut action.view, response)
        })
    }

    pub fn map_resource_event(&self, event: ResourceEvent) -> Option<ResourceEvent> {
        self.map_event(Self::RESOURCE, event, true, |resource, response| {
            if let Some(encoded) = response.get("resource").and_then(DynamicValue::as_map) {
                resource.resource.url = required_str(encoded, "url", "resource.url")?.to_owned();
            }
            apply_view(&mut resource.view, response)
        })
    }

    pub fn map_error_event(&self, event: ErrorEvent) -> Option<ErrorEvent> {
        self.map_event(Self::ERROR, event, true, |error, response| {
            if let Some(encoded) = response.get("error").and_then(DynamicValue::as_map) {
                let info = &mut error.error;
                match encoded.get("causes").and_then(DynamicValue::as_list) {
                    Some(mapped) => {
                        if let Some(causes) = info.causes.as_mut() {
                            if causes.len() == mapped.len() {
                                for (cause, patch) in causes.iter_mut().zip(mapped) {
                                    cause.message = patch
                                        .get("message")
                                        .and_then(DynamicValue::as_str)
                                        .unwrap_or_default()
                                        .to_owned();
                                    cause.stack = patch
                                        .get("stack")
                                        .and_then(DynamicValue::as_str)
                                        .map(str::to_owned);
                                }
                            } else {
                                warn!(
                                    expected = causes.len(),
                                    got = mapped.len(),
                                    "mapper changed the number of error causes; keeping originals"
                                );
                            }
                        }
                    }
                    None => info.causes = None,
                }

                if let Some(mapped) = encoded.get("resource").and_then(DynamicValue::as_map) {
                    if let Some(resource) = info.resource.as_mut() {
                        resource.url = optional_string(mapped, "url").unwrap_or_default();
                    }
                }

                info.stack = optional_string(encoded, "stack");
                info.fingerprint = optional_string(encoded, "fingerprint");
            }
            apply_view(&mut error.view, response)
        })
    }

    pub fn map_long_task_event(&self, event: LongTaskEvent) -> Option<LongTaskEvent> {
        self.map_event(Self::LONG_TASK, event, true, |task, response| {
            apply_view(&mut task.view, response)
        })
    }

    fn map_event<E: Serialize + Clone>(
        &self,
        mapper: &'static str,
        event: E,
        droppable: bool,
        patch: impl FnOnce(&mut E, &ValueMap) -> Result<(), PatchError>,
    ) -> Option<E> {
        let started = Instant::now();
        let mapped = self.round_trip(mapper, event, droppable, patch);
        self.runtime.record_total(started.elapsed());
        mapped
    }

    fn round_trip<E: Serialize + Clone>(
        &self,
        mapper: &'static str,
        event: E,
        droppable: bool,
        patch: impl FnOnce(&mut E, &ValueMap) -> Result<(), PatchError>,
    ) -> Option<E> {
        let mut encoded = match encode_event(&event) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(mapper, error = %e, "event not encodable; passing through");
                return Some(event);
            }
        };
        normalize_extra_user_info(&mut encoded);

        match self.runtime.call(mapper, DynamicValue::Map(encoded)) {
            MapperOutcome::Unchanged => Some(event),
            MapperOutcome::Drop if droppable => None,
            MapperOutcome::Drop => {
                debug!(mapper, "mapper returned null for an event that cannot be dropped");
                Some(event)
            }
            MapperOutcome::Replace(response) => {
                let mut patched = event.clone();
                match patch(&mut patched, &response) {
                    Ok(()) => Some(patched),
                    Err(e) => {
                        warn!(mapper, error = %e, "mapped event rejected; keeping original");
                        Some(event)
                    }
                }
            }
        }
    }
}

fn nested<'a>(map: &'a ValueMap, outer: &str, inner: &str) -> Option<&'a ValueMap> {
    map.get(outer)
        .and_then(|v| v.get(inner))
        .and_then(DynamicValue::as_map)
}

/// Name and referrer are optional; url is required when `view` is present.
fn apply_view(view: &mut ViewInfo, response: &ValueMap) -> Result<(), PatchError> {
    let Some(encoded) = response.get("view").and_then(DynamicValue::as_map) else {
        return Ok(());
    };
    view.url = required_str(encoded, "url", "view.url")?.to_owned();
    view.name = optional_string(encoded, "name");
    view.referrer = optional_string(encoded, "referrer");
    Ok(())
}
