// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Traces surface: tracer enablement, span lifecycle and propagation headers.
//
// Span handles are chosen by the framework and are strict: starting a span
// under a live handle is refused. Finishing or cancelling frees the handle.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use beacon_core::config::TracesConfiguration;
use beacon_core::error::{BridgeError, Result};
use beacon_core::value::{DynamicValue, Encodable, ValueMap, encode_attributes};

use super::{encode_or_drop, report_reconfiguration};
use crate::channel::Args;
use crate::contract::{Contract, ContractTable, ParameterKind as P};
use crate::dispatch::{MethodHandler, method_surface};
use crate::registry::HandleRegistry;
use crate::traits::{ObservabilitySdk, Scope, Span, SpanOptions, Tracer};

const START_SPAN: &[(&str, P)] = &[
    ("spanHandle", P::Int64),
    ("operationName", P::String),
    ("startTime", P::Int64),
];

pub static TRACES_CONTRACTS: ContractTable = ContractTable::new(
    "traces",
    &[
        Contract::new("enable", &[("configuration", P::Map)]),
        Contract::new("startRootSpan", START_SPAN),
        Contract::new("startSpan", START_SPAN),
        Contract::new("span.setActive", &[]),
        Contract::new("span.setError", &[("kind", P::String), ("message", P::String)]),
        Contract::new("span.setTag", &[("key", P::String), ("value", P::Any)]),
        Contract::new("span.setBaggageItem", &[("key", P::String), ("value", P::String)]),
        Contract::new("span.log", &[("fields", P::Map)]),
        Contract::new("span.finish", &[("finishTime", P::Int64)]),
        Contract::new("span.cancel", &[]),
    ],
);

method_surface! {
    /// Methods on the `datadog_sdk_flutter.traces` channel.
    pub enum TracesMethod as "traces", contracts = TRACES_CONTRACTS;
    {
        Enable => "enable",
        StartRootSpan => "startRootSpan",
        StartSpan => "startSpan",
        GetTracePropagationHeaders => "getTracePropagationHeaders",
        SetActive => "span.setActive",
        SetError => "span.setError",
        SetTag => "span.setTag",
        SetBaggageItem => "span.setBaggageItem",
        Log => "span.log",
        Finish => "span.finish",
        Cancel => "span.cancel",
    }
}

pub const TRACE_ID_HEADER: &str = "x-datadog-trace-id";
pub const PARENT_ID_HEADER: &str = "x-datadog-parent-id";
pub const SAMPLING_PRIORITY_HEADER: &str = "x-datadog-sampling-priority";
pub const SAMPLED_HEADER: &str = "x-datadog-sampled";

/// A live span plus the scope it holds while active.
struct SpanEntry {
    span: Arc<dyn Span>,
    scope: Mutex<Option<Arc<dyn Scope>>>,
}

impl SpanEntry {
    fn close_scope(&self) {
        if let Some(scope) = self.scope.lock().unwrap_or_else(PoisonError::into_inner).take() {
            scope.close();
        }
    }
}

pub struct TracesPlugin {
    sdk: Arc<dyn ObservabilitySdk>,
    tracer: RwLock<Option<Arc<dyn Tracer>>>,
    spans: HandleRegistry<i64, SpanEntry>,
    previous: Mutex<Option<TracesConfiguration>>,
}

impl TracesPlugin {
    pub fn new(sdk: Arc<dyn ObservabilitySdk>) -> Self {
        Self {
            sdk,
            tracer: RwLock::new(None),
            spans: HandleRegistry::new(),
            previous: Mutex::new(None),
        }
    }

    pub fn span_count(&self) -> usize {
        self.spans.len()
    }

    /// Drop the tracer and every live span without finishing them.
    pub fn reset(&self) {
        *self.tracer.write().unwrap_or_else(PoisonError::into_inner) = None;
        *self.previous.lock().unwrap_or_else(PoisonError::into_inner) = None;
        self.spans.clear();
    }

    fn enable(&self, config: TracesConfiguration) {
        let mut previous = self.previous.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = previous.as_ref() {
            if *existing != config {
                report_reconfiguration("traces");
            }
            return;
        }
        let tracer = self.sdk.enable_tracing(&config);
        *self.tracer.write().unwrap_or_else(PoisonError::into_inner) = Some(tracer);
        info!(sample_rate = config.sample_rate, "tracing enabled");
        *previous = Some(config);
    }

    fn tracer(&self) -> Result<Arc<dyn Tracer>> {
        self.tracer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| {
                BridgeError::invalid_operation(
                    "tracer not initialized; call enable on the traces surface first",
                )
            })
    }

    fn entry(&self, args: &Args<'_>) -> Result<Option<Arc<SpanEntry>>> {
        let Some(handle) = args.opt_int64("spanHandle")? else {
            return Ok(None);
        };
        let entry = self.spans.get(&handle);
        if entry.is_none() {
            debug!(handle, method = args.method(), "unknown span handle");
        }
        Ok(entry)
    }

    fn start_span(&self, tracer: &dyn Tracer, args: &Args<'_>, root: bool) -> Result<bool> {
        let handle = args.int64("spanHandle")?;
        let operation_name = args.string("operationName")?;
        let start_time = micros(args.int64("startTime")?, "startTime")?;
        let resource_name = args.opt_string("resourceName")?.map(str::to_owned);
        let tags = args.opt_map("tags")?.map(span_tags).unwrap_or_default();
        let parent = if root {
            None
        } else {
            args.opt_int64("parentSpan")?
                .and_then(|parent| self.spans.get(&parent))
                .map(|entry| Arc::clone(&entry.span))
        };

        let created = self.spans.create_with(handle, || {
            let span = tracer.start_span(SpanOptions {
                operation_name: operation_name.to_owned(),
                resource_name,
                start_time,
                parent,
                tags,
                ignore_active_span: root,
            });
            Arc::new(SpanEntry {
                span,
                scope: Mutex::new(None),
            })
        });
        if !created {
            debug!(handle, "span handle already live");
        }
        Ok(created)
    }

    fn propagation_headers(&self, args: &Args<'_>) -> Result<DynamicValue> {
        let mut headers = ValueMap::new();
        if let Some(entry) = self.entry(args)? {
            let context = entry.span.context();
            headers.insert(TRACE_ID_HEADER.into(), context.trace_id.to_string().into());
            headers.insert(PARENT_ID_HEADER.into(), context.span_id.to_string().into());
            headers.insert(SAMPLING_PRIORITY_HEADER.into(), "1".into());
            headers.insert(SAMPLED_HEADER.into(), "1".into());
        }
        Ok(DynamicValue::Map(headers))
    }
}

/// Convert a framework value into a span tag.
///
/// Scalars pass through; lists and maps are flattened to their JSON text.
fn span_tag(method: &str, key: &str, value: &DynamicValue) -> Option<Encodable> {
    match value {
        DynamicValue::Null => None,
        DynamicValue::List(_) | DynamicValue::Map(_) => match value.to_json() {
            Ok(json) => Some(Encodable::String(json.to_string())),
            Err(_) => encode_or_drop(method, key, value),
        },
        _ => encode_or_drop(method, key, value),
    }
}

fn span_tags(tags: &ValueMap) -> BTreeMap<String, Encodable> {
    tags.iter()
        .filter_map(|(key, value)| span_tag("startSpan", key, value).map(|tag| (key.clone(), tag)))
        .collect()
}

/// Span timestamps travel as microseconds since the epoch.
fn micros(value: i64, parameter: &str) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(value)
        .ok_or_else(|| BridgeError::invalid_operation(format!("{parameter} out of range: {value}")))
}

impl MethodHandler for TracesPlugin {
    type Method = TracesMethod;

    fn handle(&self, method: TracesMethod, args: Args<'_>) -> Result<DynamicValue> {
        if let TracesMethod::Enable = method {
            self.enable(TracesConfiguration::from_encoded(args.map("configuration")?));
            return Ok(DynamicValue::Null);
        }

        let tracer = self.tracer()?;
        match method {
            TracesMethod::Enable => {}
            TracesMethod::StartRootSpan => {
                return self.start_span(tracer.as_ref(), &args, true).map(Into::into);
            }
            TracesMethod::StartSpan => {
                return self.start_span(tracer.as_ref(), &args, false).map(Into::into);
            }
            TracesMethod::GetTracePropagationHeaders => return self.propagation_headers(&args),
            TracesMethod::SetActive => {
                if let Some(entry) = self.entry(&args)? {
                    entry.close_scope();
                    let scope = entry.span.activate();
                    *entry.scope.lock().unwrap_or_else(PoisonError::into_inner) = Some(scope);
                }
            }
            TracesMethod::SetError => {
                let kind = args.string("kind")?;
                let message = args.string("message")?;
                let stack_trace = args.opt_string("stackTrace")?;
                if let Some(entry) = self.entry(&args)? {
                    entry.span.set_error(kind, message, stack_trace);
                }
            }
            TracesMethod::SetTag => {
                let key = args.string("key")?;
                let value = args.any("value")?;
                if let Some(entry) = self.entry(&args)? {
                    if let Some(tag) = span_tag(args.method(), key, value) {
                        entry.span.set_tag(key, tag);
                    }
                }
            }
            TracesMethod::SetBaggageItem => {
                let key = args.string("key")?;
                let value = args.string("value")?;
                if let Some(entry) = self.entry(&args)? {
                    entry.span.set_baggage_item(key, value);
                }
            }
            TracesMethod::Log => {
                let fields = encode_attributes(args.map("fields")?);
                if let Some(entry) = self.entry(&args)? {
                    entry.span.log(fields);
                }
            }
            TracesMethod::Finish => {
                let finish_time = micros(args.int64("finishTime")?, "finishTime")?;
                if let Some(handle) = args.opt_int64("spanHandle")? {
                    if let Some(entry) = self.spans.remove(&handle) {
                        entry.close_scope();
                        entry.span.finish(finish_time);
                    }
                }
            }
            TracesMethod::Cancel => {
                if let Some(handle) = args.opt_int64("spanHandle")? {
                    self.spans.remove(&handle);
                }
            }
        }
        Ok(DynamicValue::Null)
    }
}
