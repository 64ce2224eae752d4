// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recording SDK for desktop/CI builds where no vendor SDK is linked.
//
// Every capability call is appended to a shared call log instead of being
// sent anywhere. Installed event mapper hooks are kept so callers can push
// synthetic events through them.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use beacon_core::config::{
    LoggerConfiguration, LogsConfiguration, RumConfiguration, SdkConfiguration, TracesConfiguration,
};
use beacon_core::types::*;
use beacon_core::value::{Attributes, Encodable};

use crate::events::{ActionEvent, ErrorEvent, LogEvent, LongTaskEvent, ResourceEvent, ViewEvent};
use crate::traits::*;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Call log
// ---------------------------------------------------------------------------

/// One recorded capability call.
#[derive(Debug, Clone, PartialEq)]
pub struct SdkCall {
    /// `sdk`, `logger:<name>`, `span:<id>`, `scope:<id>` or `rum`.
    pub target: String,
    pub operation: String,
    pub fields: BTreeMap<String, Encodable>,
}

impl SdkCall {
    pub fn field(&self, name: &str) -> Option<&Encodable> {
        self.fields.get(name)
    }

    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Encodable::as_str)
    }
}

/// Shared, append-only list of calls.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<SdkCall>>>);

impl CallLog {
    fn record(&self, target: impl Into<String>, operation: &str, fields: Vec<(&str, Encodable)>) {
        let call = SdkCall {
            target: target.into(),
            operation: operation.to_owned(),
            fields: fields.into_iter().map(|(k, v)| (k.to_owned(), v)).collect(),
        };
        tracing::debug!(target = %call.target, operation, "recorded sdk call");
        lock(&self.0).push(call);
    }

    pub fn all(&self) -> Vec<SdkCall> {
        lock(&self.0).clone()
    }

    /// Calls with the given operation name, across all targets.
    pub fn named(&self, operation: &str) -> Vec<SdkCall> {
        lock(&self.0)
            .iter()
            .filter(|c| c.operation == operation)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        lock(&self.0).clear();
    }
}

fn opt(value: Option<&str>) -> Encodable {
    value.map_or(Encodable::Null, Encodable::from)
}

fn level_name(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Notice => "notice",
        LogLevel::Warning => "warning",
        LogLevel::Error => "error",
        LogLevel::Critical => "critical",
        LogLevel::Alert => "alert",
        LogLevel::Emergency => "emergency",
    }
}

// ---------------------------------------------------------------------------
// RecordingSdk
// ---------------------------------------------------------------------------

#[derive(Default)]
struct State {
    initialized: bool,
    logs_enabled: bool,
    log_hook: Option<LogEventHook>,
    rum_hooks: RumEventHooks,
    existing_monitor: Option<Arc<RecordingMonitor>>,
}

/// In-memory SDK used when no vendor SDK is available.
pub struct RecordingSdk {
    calls: CallLog,
    state: Mutex<State>,
    next_id: Arc<AtomicU64>,
}

impl Default for RecordingSdk {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSdk {
    pub fn new() -> Self {
        Self {
            calls: CallLog::default(),
            state: Mutex::new(State::default()),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Simulate a host that initialized the SDK natively before the bridge
    /// attached, optionally with RUM already running.
    pub fn preinitialized(with_rum: bool) -> Self {
        let sdk = Self::new();
        {
            let mut state = lock(&sdk.state);
            state.initialized = true;
            if with_rum {
                state.existing_monitor = Some(Arc::new(RecordingMonitor::new(sdk.calls.clone())));
            }
        }
        sdk
    }

    pub fn calls(&self) -> &CallLog {
        &self.calls
    }

    /// Push a log event through the installed log mapper, if any.
    pub fn emit_log(&self, event: LogEvent) -> Option<LogEvent> {
        let hook = lock(&self.state).log_hook.clone();
        match hook {
            Some(hook) => hook(event),
            None => Some(event),
        }
    }

    pub fn rum_hooks(&self) -> RumEventHooks {
        lock(&self.state).rum_hooks.clone()
    }

    pub fn emit_view(&self, event: ViewEvent) -> ViewEvent {
        match self.rum_hooks().view {
            Some(hook) => hook(event),
            None => event,
        }
    }

    pub fn emit_action(&self, event: ActionEvent) -> Option<ActionEvent> {
        self.rum_hooks().action.map_or(Some(event.clone()), |hook| hook(event))
    }

    pub fn emit_resource(&self, event: ResourceEvent) -> Option<ResourceEvent> {
        self.rum_hooks().resource.map_or(Some(event.clone()), |hook| hook(event))
    }

    pub fn emit_error(&self, event: ErrorEvent) -> Option<ErrorEvent> {
        self.rum_hooks().error.map_or(Some(event.clone()), |hook| hook(event))
    }

    pub fn emit_long_task(&self, event: LongTaskEvent) -> Option<LongTaskEvent> {
        self.rum_hooks().long_task.map_or(Some(event.clone()), |hook| hook(event))
    }
}

impl ObservabilitySdk for RecordingSdk {
    fn sdk_name(&self) -> &str {
        "Recording (desktop)"
    }
}

impl CoreSdk for RecordingSdk {
    fn is_initialized(&self) -> bool {
        lock(&self.state).initialized
    }

    fn initialize(&self, config: &SdkConfiguration) {
        lock(&self.state).initialized = true;
        self.calls.record(
            "sdk",
            "initialize",
            vec![
                ("clientToken", config.client_token.as_str().into()),
                ("env", config.env.as_str().into()),
                ("service", opt(config.service.as_deref())),
            ],
        );
    }

    fn set_verbosity(&self, verbosity: Verbosity) {
        self.calls
            .record("sdk", "setVerbosity", vec![("value", format!("{verbosity:?}").into())]);
    }

    fn set_tracking_consent(&self, consent: TrackingConsent) {
        self.calls
            .record("sdk", "setTrackingConsent", vec![("value", format!("{consent:?}").into())]);
    }

    fn set_user_info(
        &self,
        id: Option<&str>,
        name: Option<&str>,
        email: Option<&str>,
        extra_info: Attributes,
    ) {
        self.calls.record(
            "sdk",
            "setUserInfo",
            vec![
                ("id", opt(id)),
                ("name", opt(name)),
                ("email", opt(email)),
                ("extraInfo", extra_info.into()),
            ],
        );
    }

    fn add_user_extra_info(&self, extra_info: Attributes) {
        self.calls
            .record("sdk", "addUserExtraInfo", vec![("extraInfo", extra_info.into())]);
    }

    fn telemetry_debug(&self, message: &str) {
        self.calls.record("sdk", "telemetryDebug", vec![("message", message.into())]);
    }

    fn telemetry_error(&self, message: &str, stack: Option<&str>, kind: Option<&str>) {
        self.calls.record(
            "sdk",
            "telemetryError",
            vec![("message", message.into()), ("stack", opt(stack)), ("kind", opt(kind))],
        );
    }

    fn update_telemetry_configuration(&self, overrides: &TelemetryOverrides) {
        self.calls.record(
            "sdk",
            "updateTelemetryConfiguration",
            vec![
                ("trackViewsManually", overrides.track_views_manually.into()),
                ("trackInteractions", overrides.track_interactions.into()),
                ("trackErrors", overrides.track_errors.into()),
                ("trackNetworkRequests", overrides.track_network_requests.into()),
                ("trackNativeViews", overrides.track_native_views.into()),
                ("trackCrossPlatformLongTasks", overrides.track_cross_platform_long_tasks.into()),
                ("trackFlutterPerformance", overrides.track_flutter_performance.into()),
            ],
        );
    }

    fn reset(&self) {
        *lock(&self.state) = State::default();
        self.calls.record("sdk", "reset", Vec::new());
    }
}

impl LogsSdk for RecordingSdk {
    fn is_logs_enabled(&self) -> bool {
        lock(&self.state).logs_enabled
    }

    fn enable_logs(&self, config: &LogsConfiguration, mapper: Option<LogEventHook>) {
        {
            let mut state = lock(&self.state);
            state.logs_enabled = true;
            state.log_hook = mapper;
        }
        self.calls.record(
            "sdk",
            "enableLogs",
            vec![
                ("customEndpoint", opt(config.custom_endpoint.as_deref())),
                ("attachLogMapper", config.attach_log_mapper.into()),
            ],
        );
    }

    fn add_global_attribute(&self, key: &str, value: Encodable) {
        self.calls.record(
            "sdk",
            "addGlobalAttribute",
            vec![("key", key.into()), ("value", value)],
        );
    }

    fn remove_global_attribute(&self, key: &str) {
        self.calls
            .record("sdk", "removeGlobalAttribute", vec![("key", key.into())]);
    }

    fn create_logger(&self, config: &LoggerConfiguration) -> Arc<dyn Logger> {
        let name = config.name.clone().unwrap_or_else(|| "default".to_owned());
        self.calls.record(
            "sdk",
            "createLogger",
            vec![
                ("name", name.as_str().into()),
                ("service", opt(config.service.as_deref())),
                ("remoteLogThreshold", level_name(config.remote_log_threshold).into()),
            ],
        );
        Arc::new(RecordingLogger {
            target: format!("logger:{name}"),
            calls: self.calls.clone(),
        })
    }
}

impl TracesSdk for RecordingSdk {
    fn enable_tracing(&self, config: &TracesConfiguration) -> Arc<dyn Tracer> {
        self.calls.record(
            "sdk",
            "enableTracing",
            vec![
                ("service", opt(config.service.as_deref())),
                ("bundleWithRum", config.bundle_with_rum.into()),
                ("sampleRate", config.sample_rate.into()),
            ],
        );
        Arc::new(RecordingTracer {
            calls: self.calls.clone(),
            next_id: Arc::clone(&self.next_id),
        })
    }
}

impl RumSdk for RecordingSdk {
    fn enable_rum(&self, config: &RumConfiguration, hooks: RumEventHooks) -> Arc<dyn RumMonitor> {
        lock(&self.state).rum_hooks = hooks;
        self.calls.record(
            "sdk",
            "enableRum",
            vec![
                ("applicationId", config.application_id.as_str().into()),
                ("sessionSampleRate", config.session_sample_rate.into()),
            ],
        );
        Arc::new(RecordingMonitor::new(self.calls.clone()))
    }

    fn existing_monitor(&self) -> Option<Arc<dyn RumMonitor>> {
        lock(&self.state)
            .existing_monitor
            .clone()
            .map(|m| m as Arc<dyn RumMonitor>)
    }
}

// ---------------------------------------------------------------------------
// Logger
// ---------------------------------------------------------------------------

struct RecordingLogger {
    target: String,
    calls: CallLog,
}

impl Logger for RecordingLogger {
    fn log(
        &self,
        level: LogLevel,
        message: &str,
        error: Option<&LogErrorDetails>,
        attributes: Attributes,
    ) {
        let mut fields = vec![
            ("level", level_name(level).into()),
            ("message", message.into()),
            ("attributes", attributes.into()),
        ];
        if let Some(error) = error {
            fields.push(("errorKind", opt(error.kind.as_deref())));
            fields.push(("errorMessage", opt(error.message.as_deref())));
            fields.push(("stackTrace", opt(error.stack_trace.as_deref())));
        }
        self.calls.record(self.target.as_str(), "log", fields);
    }

    fn add_attribute(&self, key: &str, value: Encodable) {
        self.calls
            .record(self.target.as_str(), "addAttribute", vec![("key", key.into()), ("value", value)]);
    }

    fn remove_attribute(&self, key: &str) {
        self.calls
            .record(self.target.as_str(), "removeAttribute", vec![("key", key.into())]);
    }

    fn add_tag(&self, tag: &str, value: Option<&str>) {
        self.calls.record(
            self.target.as_str(),
            "addTag",
            vec![("tag", tag.into()), ("value", opt(value))],
        );
    }

    fn remove_tag(&self, tag: &str) {
        self.calls
            .record(self.target.as_str(), "removeTag", vec![("tag", tag.into())]);
    }

    fn remove_tag_with_key(&self, key: &str) {
        self.calls
            .record(self.target.as_str(), "removeTagWithKey", vec![("key", key.into())]);
    }
}

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

struct RecordingTracer {
    calls: CallLog,
    next_id: Arc<AtomicU64>,
}

impl Tracer for RecordingTracer {
    fn start_span(&self, options: SpanOptions) -> Arc<dyn Span> {
        let span_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let trace_id = match &options.parent {
            Some(parent) => parent.context().trace_id,
            None => self.next_id.fetch_add(1, Ordering::Relaxed),
        };
        let context = SpanContext { trace_id, span_id };

        let mut fields = vec![
            ("operationName", options.operation_name.as_str().into()),
            ("resourceName", opt(options.resource_name.as_deref())),
            ("startTime", options.start_time.timestamp_micros().into()),
            ("ignoreActiveSpan", options.ignore_active_span.into()),
            ("tags", Encodable::Object(options.tags.clone())),
        ];
        if let Some(parent) = &options.parent {
            fields.push(("parentSpanId", Encodable::from(parent.context().span_id.to_string())));
        }
        let target = format!("span:{span_id}");
        self.calls.record(target.as_str(), "start", fields);

        Arc::new(RecordingSpan {
            target,
            context,
            calls: self.calls.clone(),
        })
    }
}

struct RecordingSpan {
    target: String,
    context: SpanContext,
    calls: CallLog,
}

impl Span for RecordingSpan {
    fn context(&self) -> SpanContext {
        self.context
    }

    fn set_tag(&self, key: &str, value: Encodable) {
        self.calls
            .record(self.target.as_str(), "setTag", vec![("key", key.into()), ("value", value)]);
    }

    fn set_error(&self, kind: &str, message: &str, stack_trace: Option<&str>) {
        self.calls.record(
            self.target.as_str(),
            "setError",
            vec![
                ("kind", kind.into()),
                ("message", message.into()),
                ("stackTrace", opt(stack_trace)),
            ],
        );
    }

    fn set_baggage_item(&self, key: &str, value: &str) {
        self.calls.record(
            self.target.as_str(),
            "setBaggageItem",
            vec![("key", key.into()), ("value", value.into())],
        );
    }

    fn log(&self, fields: Attributes) {
        self.calls
            .record(self.target.as_str(), "log", vec![("fields", fields.into())]);
    }

    fn activate(&self) -> Arc<dyn Scope> {
        self.calls.record(self.target.as_str(), "activate", Vec::new());
        Arc::new(RecordingScope {
            target: format!("scope:{}", self.context.span_id),
            calls: self.calls.clone(),
        })
    }

    fn finish(&self, finish_time: DateTime<Utc>) {
        self.calls.record(
            self.target.as_str(),
            "finish",
            vec![("finishTime", finish_time.timestamp_micros().into())],
        );
    }
}

struct RecordingScope {
    target: String,
    calls: CallLog,
}

impl Scope for RecordingScope {
    fn close(&self) {
        self.calls.record(self.target.as_str(), "close", Vec::new());
    }
}

// ---------------------------------------------------------------------------
// RUM
// ---------------------------------------------------------------------------

struct RecordingMonitor {
    session_id: Mutex<Option<String>>,
    calls: CallLog,
}

impl RecordingMonitor {
    fn new(calls: CallLog) -> Self {
        Self {
            session_id: Mutex::new(Some(Uuid::new_v4().to_string())),
            calls,
        }
    }

    fn record(&self, operation: &str, fields: Vec<(&str, Encodable)>) {
        self.calls.record("rum", operation, fields);
    }
}

impl RumMonitor for RecordingMonitor {
    fn start_view(&self, key: &str, name: &str, attributes: Attributes) {
        self.record(
            "startView",
            vec![("key", key.into()), ("name", name.into()), ("attributes", attributes.into())],
        );
    }

    fn stop_view(&self, key: &str, attributes: Attributes) {
        self.record("stopView", vec![("key", key.into()), ("attributes", attributes.into())]);
    }

    fn add_timing(&self, name: &str) {
        self.record("addTiming", vec![("name", name.into())]);
    }

    fn add_view_loading_time(&self, overwrite: bool) {
        self.record("addViewLoadingTime", vec![("overwrite", overwrite.into())]);
    }

    fn start_resource(&self, key: &str, method: RumHttpMethod, url: &str, attributes: Attributes) {
        self.record(
            "startResource",
            vec![
                ("key", key.into()),
                ("method", method.as_str().into()),
                ("url", url.into()),
                ("attributes", attributes.into()),
            ],
        );
    }

    fn stop_resource(
        &self,
        key: &str,
        status_code: Option<i64>,
        kind: RumResourceKind,
        size: Option<i64>,
        attributes: Attributes,
    ) {
        self.record(
            "stopResource",
            vec![
                ("key", key.into()),
                ("statusCode", status_code.map_or(Encodable::Null, Encodable::from)),
                ("kind", format!("{kind:?}").into()),
                ("size", size.map_or(Encodable::Null, Encodable::from)),
                ("attributes", attributes.into()),
            ],
        );
    }

    fn stop_resource_with_error(&self, key: &str, message: &str, error_type: &str, attributes: Attributes) {
        self.record(
            "stopResourceWithError",
            vec![
                ("key", key.into()),
                ("message", message.into()),
                ("type", error_type.into()),
                ("attributes", attributes.into()),
            ],
        );
    }

    fn add_error(
        &self,
        message: &str,
        source: RumErrorSource,
        stack_trace: Option<&str>,
        attributes: Attributes,
    ) {
        self.record(
            "addError",
            vec![
                ("message", message.into()),
                ("source", format!("{source:?}").into()),
                ("stackTrace", opt(stack_trace)),
                ("attributes", attributes.into()),
            ],
        );
    }

    fn add_action(&self, kind: RumActionType, name: &str, attributes: Attributes) {
        self.record(
            "addAction",
            vec![
                ("type", format!("{kind:?}").into()),
                ("name", name.into()),
                ("attributes", attributes.into()),
            ],
        );
    }

    fn start_action(&self, kind: RumActionType, name: &str, attributes: Attributes) {
        self.record(
            "startAction",
            vec![
                ("type", format!("{kind:?}").into()),
                ("name", name.into()),
                ("attributes", attributes.into()),
            ],
        );
    }

    fn stop_action(&self, kind: RumActionType, name: &str, attributes: Attributes) {
        self.record(
            "stopAction",
            vec![
                ("type", format!("{kind:?}").into()),
                ("name", name.into()),
                ("attributes", attributes.into()),
            ],
        );
    }

    fn add_attribute(&self, key: &str, value: Encodable) {
        self.record("addAttribute", vec![("key", key.into()), ("value", value)]);
    }

    fn remove_attribute(&self, key: &str) {
        self.record("removeAttribute", vec![("key", key.into())]);
    }

    fn report_long_task(&self, at: DateTime<Utc>, duration: Duration) {
        let nanos = i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX);
        self.record(
            "reportLongTask",
            vec![("at", at.timestamp_millis().into()), ("durationNs", nanos.into())],
        );
    }

    fn update_performance_metrics(&self, build_times: &[f64], raster_times: &[f64]) {
        let list = |times: &[f64]| Encodable::Array(times.iter().map(|t| Encodable::from(*t)).collect());
        self.record(
            "updatePerformanceMetrics",
            vec![("buildTimes", list(build_times)), ("rasterTimes", list(raster_times))],
        );
    }

    fn add_feature_flag_evaluation(&self, name: &str, value: Encodable) {
        self.record("addFeatureFlagEvaluation", vec![("name", name.into()), ("value", value)]);
    }

    fn stop_session(&self) {
        *lock(&self.session_id) = None;
        self.record("stopSession", Vec::new());
    }

    fn current_session_id(&self) -> Option<String> {
        lock(&self.session_id).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logger_calls_are_recorded_against_the_logger() {
        let sdk = RecordingSdk::new();
        let logger = sdk.create_logger(&LoggerConfiguration {
            name: Some("checkout".into()),
            ..LoggerConfiguration::default()
        });
        logger.log(LogLevel::Warning, "slow", None, Attributes::new());

        let logs = sdk.calls().named("log");
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].target, "logger:checkout");
        assert_eq!(logs[0].str_field("level"), Some("warning"));
    }

    #[test]
    fn child_spans_inherit_the_trace_id() {
        let sdk = RecordingSdk::new();
        let tracer = sdk.enable_tracing(&TracesConfiguration::default());
        let options = |parent| SpanOptions {
            operation_name: "op".into(),
            resource_name: None,
            start_time: Utc::now(),
            parent,
            tags: BTreeMap::new(),
            ignore_active_span: false,
        };
        let root = tracer.start_span(options(None));
        let child = tracer.start_span(options(Some(Arc::clone(&root))));
        assert_eq!(root.context().trace_id, child.context().trace_id);
        assert_ne!(root.context().span_id, child.context().span_id);
    }

    #[test]
    fn reset_forgets_initialization_and_hooks() {
        let sdk = RecordingSdk::preinitialized(true);
        assert!(sdk.is_initialized());
        assert!(sdk.existing_monitor().is_some());

        sdk.reset();
        assert!(!sdk.is_initialized());
        assert!(sdk.existing_monitor().is_none());
        assert_eq!(sdk.calls().named("reset").len(), 1);
    }

    #[test]
    fn stopping_the_session_clears_its_id() {
        let sdk = RecordingSdk::new();
        let monitor = sdk.enable_rum(
            &RumConfiguration::from_encoded(
                &[("applicationId".to_owned(), "app".into())].into_iter().collect(),
            )
            .expect("config"),
            RumEventHooks::default(),
        );
        assert!(monitor.current_session_id().is_some());
        monitor.stop_session();
        assert!(monitor.current_session_id().is_none());
    }
}
