// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capability traits the bridge requires from the native observability SDK.
//
// The SDK is an opaque collaborator: loggers, tracers, spans and RUM
// monitors are reached only through these traits. A platform provides one
// type implementing `ObservabilitySdk`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use beacon_core::config::{
    LoggerConfiguration, LogsConfiguration, RumConfiguration, SdkConfiguration, TracesConfiguration,
};
use beacon_core::types::*;
use beacon_core::value::{Attributes, Encodable};

use crate::events::{
    ActionEvent, ErrorEvent, LogEvent, LongTaskEvent, ResourceEvent, ViewEvent,
};

/// Unified SDK that groups every capability the bridge drives.
pub trait ObservabilitySdk: CoreSdk + LogsSdk + TracesSdk + RumSdk + Send + Sync {
    /// Human-readable SDK name (e.g. "dd-sdk-android 2.x").
    fn sdk_name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Core
// ---------------------------------------------------------------------------

pub trait CoreSdk {
    fn is_initialized(&self) -> bool;

    fn initialize(&self, config: &SdkConfiguration);

    fn set_verbosity(&self, verbosity: Verbosity);

    fn set_tracking_consent(&self, consent: TrackingConsent);

    fn set_user_info(
        &self,
        id: Option<&str>,
        name: Option<&str>,
        email: Option<&str>,
        extra_info: Attributes,
    );

    fn add_user_extra_info(&self, extra_info: Attributes);

    fn telemetry_debug(&self, message: &str);

    fn telemetry_error(&self, message: &str, stack: Option<&str>, kind: Option<&str>);

    fn update_telemetry_configuration(&self, overrides: &TelemetryOverrides);

    /// Flush pending data and tear the SDK down so it can be initialized
    /// again. Used for test teardown and hot restart.
    fn reset(&self);
}

// ---------------------------------------------------------------------------
// Logs
// ---------------------------------------------------------------------------

/// Hook the SDK calls before persisting a log event. `None` drops it.
pub type LogEventHook = Arc<dyn Fn(LogEvent) -> Option<LogEvent> + Send + Sync>;

pub trait LogsSdk {
    fn is_logs_enabled(&self) -> bool;

    fn enable_logs(&self, config: &LogsConfiguration, mapper: Option<LogEventHook>);

    fn add_global_attribute(&self, key: &str, value: Encodable);

    fn remove_global_attribute(&self, key: &str);

    fn create_logger(&self, config: &LoggerConfiguration) -> Arc<dyn Logger>;
}

/// Error details attached to a log entry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LogErrorDetails {
    pub kind: Option<String>,
    pub message: Option<String>,
    pub stack_trace: Option<String>,
}

pub trait Logger: Send + Sync {
    fn log(
        &self,
        level: LogLevel,
        message: &str,
        error: Option<&LogErrorDetails>,
        attributes: Attributes,
    );

    fn add_attribute(&self, key: &str, value: Encodable);

    fn remove_attribute(&self, key: &str);

    fn add_tag(&self, tag: &str, value: Option<&str>);

    fn remove_tag(&self, tag: &str);

    fn remove_tag_with_key(&self, key: &str);
}

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

pub trait TracesSdk {
    fn enable_tracing(&self, config: &TracesConfiguration) -> Arc<dyn Tracer>;
}

/// Identifiers propagated to downstream services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanContext {
    pub trace_id: u64,
    pub span_id: u64,
}

/// Everything needed to start a span.
#[derive(Clone)]
pub struct SpanOptions {
    pub operation_name: String,
    pub resource_name: Option<String>,
    pub start_time: DateTime<Utc>,
    pub parent: Option<Arc<dyn Span>>,
    pub tags: BTreeMap<String, Encodable>,
    /// Root spans ignore any active span.
    pub ignore_active_span: bool,
}

pub trait Tracer: Send + Sync {
    fn start_span(&self, options: SpanOptions) -> Arc<dyn Span>;
}

pub trait Span: Send + Sync {
    fn context(&self) -> SpanContext;

    fn set_tag(&self, key: &str, value: Encodable);

    fn set_error(&self, kind: &str, message: &str, stack_trace: Option<&str>);

    fn set_baggage_item(&self, key: &str, value: &str);

    fn log(&self, fields: Attributes);

    /// Make this span the active one; the scope ends activation.
    fn activate(&self) -> Arc<dyn Scope>;

    fn finish(&self, finish_time: DateTime<Utc>);
}

pub trait Scope: Send + Sync {
    fn close(&self);
}

// ---------------------------------------------------------------------------
// RUM
// ---------------------------------------------------------------------------

pub type ViewEventHook = Arc<dyn Fn(ViewEvent) -> ViewEvent + Send + Sync>;
pub type EventHook<E> = Arc<dyn Fn(E) -> Option<E> + Send + Sync>;

/// Mapper hooks installed when RUM is enabled. Unset hooks pass events
/// through untouched.
#[derive(Clone, Default)]
pub struct RumEventHooks {
    pub view: Option<ViewEventHook>,
    pub action: Option<EventHook<ActionEvent>>,
    pub resource: Option<EventHook<ResourceEvent>>,
    pub error: Option<EventHook<ErrorEvent>>,
    pub long_task: Option<EventHook<LongTaskEvent>>,
}

pub trait RumSdk {
    fn enable_rum(&self, config: &RumConfiguration, hooks: RumEventHooks) -> Arc<dyn RumMonitor>;

    /// Monitor registered by native code before the bridge attached.
    fn existing_monitor(&self) -> Option<Arc<dyn RumMonitor>>;
}

pub trait RumMonitor: Send + Sync {
    fn start_view(&self, key: &str, name: &str, attributes: Attributes);

    fn stop_view(&self, key: &str, attributes: Attributes);

    fn add_timing(&self, name: &str);

    fn add_view_loading_time(&self, overwrite: bool);

    fn start_resource(&self, key: &str, method: RumHttpMethod, url: &str, attributes: Attributes);

    fn stop_resource(
        &self,
        key: &str,
        status_code: Option<i64>,
        kind: RumResourceKind,
        size: Option<i64>,
        attributes: Attributes,
    );

    fn stop_resource_with_error(&self, key: &str, message: &str, error_type: &str, attributes: Attributes);

    fn add_error(
        &self,
        message: &str,
        source: RumErrorSource,
        stack_trace: Option<&str>,
        attributes: Attributes,
    );

    fn add_action(&self, kind: RumActionType, name: &str, attributes: Attributes);

    fn start_action(&self, kind: RumActionType, name: &str, attributes: Attributes);

    fn stop_action(&self, kind: RumActionType, name: &str, attributes: Attributes);

    fn add_attribute(&self, key: &str, value: Encodable);

    fn remove_attribute(&self, key: &str);

    fn report_long_task(&self, at: DateTime<Utc>, duration: Duration);

    fn update_performance_metrics(&self, build_times: &[f64], raster_times: &[f64]);

    fn add_feature_flag_evaluation(&self, name: &str, value: Encodable);

    fn stop_session(&self);

    fn current_session_id(&self) -> Option<String>;
}
