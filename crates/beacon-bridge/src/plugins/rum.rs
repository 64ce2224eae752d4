// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// RUM surface: views, resources, actions, errors and session vitals.

use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use chrono::DateTime;
use tracing::info;

use beacon_core::config::RumConfiguration;
use beacon_core::error::{BridgeError, Result};
use beacon_core::parsers::{
    parse_rum_action_type, parse_rum_error_source, parse_rum_http_method, parse_rum_resource_kind,
};
use beacon_core::value::{Attributes, DynamicValue, Encodable, encode_attributes};

use super::{encode_or_drop, report_reconfiguration};
use crate::channel::Args;
use crate::contract::{Contract, ContractTable, ParameterKind as P};
use crate::dispatch::{MethodHandler, Surface, method_surface};
use crate::mapper::RumEventMapper;
use crate::traits::{ObservabilitySdk, RumMonitor};

/// Attribute carrying the framework-side error type on `addError`.
pub const ERROR_TYPE_ATTRIBUTE: &str = "_dd.error_type";

const ACTION: &[(&str, P)] = &[("type", P::String), ("name", P::String), ("attributes", P::Map)];

pub static RUM_CONTRACTS: ContractTable = ContractTable::new(
    "rum",
    &[
        Contract::new("enable", &[("configuration", P::Map)]),
        Contract::new(
            "startView",
            &[("key", P::String), ("name", P::String), ("attributes", P::Map)],
        ),
        Contract::new("stopView", &[("key", P::String), ("attributes", P::Map)]),
        Contract::new("addTiming", &[("name", P::String)]),
        Contract::new("addViewLoadingTime", &[("overwrite", P::Bool)]),
        Contract::new(
            "startResource",
            &[
                ("key", P::String),
                ("url", P::String),
                ("httpMethod", P::String),
                ("attributes", P::Map),
            ],
        ),
        Contract::new(
            "stopResource",
            &[("key", P::String), ("kind", P::String), ("attributes", P::Map)],
        ),
        Contract::new(
            "stopResourceWithError",
            &[
                ("key", P::String),
                ("message", P::String),
                ("type", P::String),
                ("attributes", P::Map),
            ],
        ),
        Contract::new(
            "addError",
            &[("message", P::String), ("source", P::String), ("attributes", P::Map)],
        ),
        Contract::new("addAction", ACTION),
        Contract::new("startAction", ACTION),
        Contract::new("stopAction", ACTION),
        Contract::new("addAttribute", &[("key", P::String), ("value", P::Any)]),
        Contract::new("removeAttribute", &[("key", P::String)]),
        Contract::new("reportLongTask", &[("at", P::Int64), ("duration", P::Int)]),
        Contract::new(
            "updatePerformanceMetrics",
            &[("buildTimes", P::List), ("rasterTimes", P::List)],
        ),
        Contract::new("addFeatureFlagEvaluation", &[("name", P::String), ("value", P::Any)]),
        Contract::new("stopSession", &[]),
        Contract::new("getCurrentSessionId", &[]),
    ],
);

method_surface! {
    /// Methods on the `datadog_sdk_flutter.rum` channel.
    pub enum RumMethod as "rum", contracts = RUM_CONTRACTS;
    {
        Enable => "enable",
        StartView => "startView",
        StopView => "stopView",
        AddTiming => "addTiming",
        AddViewLoadingTime => "addViewLoadingTime",
        StartResource => "startResource",
        StopResource => "stopResource",
        StopResourceWithError => "stopResourceWithError",
        AddError => "addError",
        AddAction => "addAction",
        StartAction => "startAction",
        StopAction => "stopAction",
        AddAttribute => "addAttribute",
        RemoveAttribute => "removeAttribute",
        ReportLongTask => "reportLongTask",
        UpdatePerformanceMetrics => "updatePerformanceMetrics",
        AddFeatureFlagEvaluation => "addFeatureFlagEvaluation",
        StopSession => "stopSession",
        GetCurrentSessionId => "getCurrentSessionId",
    }
}

pub struct RumPlugin {
    sdk: Arc<dyn ObservabilitySdk>,
    monitor: RwLock<Option<Arc<dyn RumMonitor>>>,
    mapper: Arc<RumEventMapper>,
    previous: Mutex<Option<RumConfiguration>>,
}

impl RumPlugin {
    pub fn new(sdk: Arc<dyn ObservabilitySdk>, mapper: Arc<RumEventMapper>) -> Self {
        Self {
            sdk,
            monitor: RwLock::new(None),
            mapper,
            previous: Mutex::new(None),
        }
    }

    pub fn mapper(&self) -> &Arc<RumEventMapper> {
        &self.mapper
    }

    pub fn is_enabled(&self) -> bool {
        self.monitor.read().map(|m| m.is_some()).unwrap_or(false)
    }

    /// Adopt a monitor the host registered natively before the bridge attached.
    pub fn attach_monitor(&self, monitor: Arc<dyn RumMonitor>) {
        *self.monitor.write().unwrap_or_else(PoisonError::into_inner) = Some(monitor);
    }

    pub fn reset(&self) {
        *self.monitor.write().unwrap_or_else(PoisonError::into_inner) = None;
        *self.previous.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn enable(&self, config: RumConfiguration) {
        let mut previous = self.previous.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = previous.as_ref() {
            if *existing != config {
                report_reconfiguration("rum");
            }
            return;
        }
        let hooks = self.mapper.hooks(config.mappers);
        let monitor = self.sdk.enable_rum(&config, hooks);
        self.attach_monitor(monitor);
        info!(application_id = %config.application_id, "rum enabled");
        *previous = Some(config);
    }

    fn monitor(&self, method: RumMethod) -> Result<Arc<dyn RumMonitor>> {
        self.monitor
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| {
                BridgeError::invalid_operation(format!(
                    "Attempting to call {} on RUM when it has not been enabled",
                    method.method_name()
                ))
            })
    }
}

fn attributes(args: &Args<'_>) -> Result<Attributes> {
    Ok(encode_attributes(args.map("attributes")?))
}

fn durations(values: &[DynamicValue]) -> Vec<f64> {
    values.iter().filter_map(DynamicValue::as_f64).collect()
}

impl MethodHandler for RumPlugin {
    type Method = RumMethod;

    fn handle(&self, method: RumMethod, args: Args<'_>) -> Result<DynamicValue> {
        if method == RumMethod::Enable {
            self.enable(RumConfiguration::from_encoded(args.map("configuration")?)?);
            return Ok(DynamicValue::Null);
        }

        let monitor = self.monitor(method)?;
        match method {
            RumMethod::Enable => {}
            RumMethod::StartView => {
                monitor.start_view(args.string("key")?, args.string("name")?, attributes(&args)?);
            }
            RumMethod::StopView => monitor.stop_view(args.string("key")?, attributes(&args)?),
            RumMethod::AddTiming => monitor.add_timing(args.string("name")?),
            RumMethod::AddViewLoadingTime => monitor.add_view_loading_time(args.bool("overwrite")?),
            RumMethod::StartResource => {
                let method = parse_rum_http_method(args.string("httpMethod")?);
                monitor.start_resource(args.string("key")?, method, args.string("url")?, attributes(&args)?);
            }
            RumMethod::StopResource => {
                monitor.stop_resource(
                    args.string("key")?,
                    args.opt_int64("statusCode")?,
                    parse_rum_resource_kind(args.string("kind")?),
                    args.opt_int64("size")?,
                    attributes(&args)?,
                );
            }
            RumMethod::StopResourceWithError => {
                monitor.stop_resource_with_error(
                    args.string("key")?,
                    args.string("message")?,
                    args.string("type")?,
                    attributes(&args)?,
                );
            }
            RumMethod::AddError => {
                let mut attributes = attributes(&args)?;
                if let Some(error_type) = args.opt_string("errorType")? {
                    attributes.insert(ERROR_TYPE_ATTRIBUTE.to_owned(), Encodable::from(error_type));
                }
                monitor.add_error(
                    args.string("message")?,
                    parse_rum_error_source(args.string("source")?),
                    args.opt_string("stackTrace")?,
                    attributes,
                );
            }
            RumMethod::AddAction | RumMethod::StartAction | RumMethod::StopAction => {
                let kind = parse_rum_action_type(args.string("type")?);
                let name = args.string("name")?;
                let attributes = attributes(&args)?;
                match method {
                    RumMethod::AddAction => monitor.add_action(kind, name, attributes),
                    RumMethod::StartAction => monitor.start_action(kind, name, attributes),
                    _ => monitor.stop_action(kind, name, attributes),
                }
            }
            RumMethod::AddAttribute => {
                let key = args.string("key")?;
                if let Some(value) = encode_or_drop(args.method(), key, args.any("value")?) {
                    monitor.add_attribute(key, value);
                }
            }
            RumMethod::RemoveAttribute => monitor.remove_attribute(args.string("key")?),
            RumMethod::ReportLongTask => {
                let at_ms = args.int64("at")?;
                let at = DateTime::from_timestamp_millis(at_ms)
                    .ok_or_else(|| BridgeError::invalid_operation(format!("at out of range: {at_ms}")))?;
                let duration = args.int("duration")?;
                let duration_ms = u64::try_from(duration).map_err(|_| {
                    BridgeError::invalid_operation(format!("duration must not be negative: {duration}"))
                })?;
                monitor.report_long_task(at, Duration::from_millis(duration_ms));
            }
            RumMethod::UpdatePerformanceMetrics => {
                monitor.update_performance_metrics(
                    &durations(args.list("buildTimes")?),
                    &durations(args.list("rasterTimes")?),
                );
            }
            RumMethod::AddFeatureFlagEvaluation => {
                let name = args.string("name")?;
                if let Some(value) = encode_or_drop(args.method(), name, args.any("value")?) {
                    monitor.add_feature_flag_evaluation(name, value);
                }
            }
            RumMethod::StopSession => monitor.stop_session(),
            RumMethod::GetCurrentSessionId => return Ok(monitor.current_session_id().into()),
        }
        Ok(DynamicValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::channel::{MethodCall, MethodResult};
    use crate::dispatch::dispatch;
    use crate::mapper::ChannelSet;
    use crate::mapper::testing::looper;
    use crate::stub::RecordingSdk;
    use beacon_core::ErrorCode;
    use beacon_core::value::ValueMap;

    fn plugin() -> (Arc<RecordingSdk>, Arc<RumPlugin>) {
        init_tracing();
        let sdk = Arc::new(RecordingSdk::new());
        let mapper = Arc::new(RumEventMapper::new(
            Arc::new(ChannelSet::new()),
            looper(),
            Duration::from_millis(100),
        ));
        let plugin = Arc::new(RumPlugin::new(sdk.clone(), mapper));
        (sdk, plugin)
    }

    fn configuration() -> ValueMap {
        map(vec![
            ("applicationId", "app-1".into()),
            ("attachErrorEventMapper", true.into()),
        ])
    }

    fn enabled() -> (Arc<RecordingSdk>, Arc<RumPlugin>) {
        let (sdk, plugin) = plugin();
        let call = MethodCall::new("enable", ValueMap::new()).with("configuration", configuration());
        assert!(dispatch(plugin.as_ref(), &call).is_success());
        (sdk, plugin)
    }

    #[test]
    fn every_contract_is_enforced() {
        let (_, plugin) = enabled();
        check_contracts(&plugin, &RUM_CONTRACTS, &|method| match method {
            "enable" => map(vec![("configuration", configuration().into())]),
            _ => ValueMap::new(),
        });
    }

    #[test]
    fn calls_before_enable_are_invalid() {
        let (sdk, plugin) = plugin();
        let call = MethodCall::new("addTiming", ValueMap::new()).with("name", "first_frame");
        let result = dispatch(plugin.as_ref(), &call);
        let MethodResult::Error { code, message, .. } = result else {
            panic!("expected error");
        };
        assert_eq!(code, ErrorCode::InvalidOperation);
        assert_eq!(message, "Attempting to call addTiming on RUM when it has not been enabled");
        assert!(sdk.calls().all().is_empty());
    }

    #[test]
    fn enable_installs_only_flagged_mappers() {
        let (sdk, plugin) = enabled();
        assert!(plugin.is_enabled());
        let hooks = sdk.rum_hooks();
        assert!(hooks.error.is_some());
        assert!(hooks.view.is_none() && hooks.action.is_none());
    }

    #[test]
    fn bad_configuration_is_an_invalid_operation() {
        let (_, plugin) = plugin();
        let call = MethodCall::new("enable", ValueMap::new()).with("configuration", ValueMap::new());
        assert_eq!(
            dispatch(plugin.as_ref(), &call).error_code(),
            Some(ErrorCode::InvalidOperation)
        );
        assert!(!plugin.is_enabled());
    }

    #[test]
    fn add_error_carries_the_error_type() {
        let (sdk, plugin) = enabled();
        let call = MethodCall::new("addError", ValueMap::new())
            .with("message", "boom")
            .with("source", "RumErrorSource.network")
            .with("attributes", ValueMap::new())
            .with("errorType", "SocketException");
        assert!(dispatch(plugin.as_ref(), &call).is_success());

        let error = &sdk.calls().named("addError")[0];
        assert_eq!(error.str_field("source"), Some("Network"));
        let Some(Encodable::Object(attributes)) = error.field("attributes") else {
            panic!("attributes recorded");
        };
        assert_eq!(
            attributes.get(ERROR_TYPE_ATTRIBUTE),
            Some(&Encodable::from("SocketException"))
        );
    }

    #[test]
    fn resources_parse_method_and_kind() {
        let (sdk, plugin) = enabled();
        let start = MethodCall::new("startResource", ValueMap::new())
            .with("key", "r1")
            .with("url", "https://example.com/cart")
            .with("httpMethod", "RumHttpMethod.post")
            .with("attributes", ValueMap::new());
        let stop = MethodCall::new("stopResource", ValueMap::new())
            .with("key", "r1")
            .with("kind", "RumResourceType.xhr")
            .with("statusCode", 201i32)
            .with("attributes", ValueMap::new());
        assert!(dispatch(plugin.as_ref(), &start).is_success());
        assert!(dispatch(plugin.as_ref(), &stop).is_success());

        assert_eq!(sdk.calls().named("startResource")[0].str_field("method"), Some("POST"));
        let stopped = &sdk.calls().named("stopResource")[0];
        assert_eq!(stopped.str_field("kind"), Some("Xhr"));
        assert_eq!(stopped.field("statusCode"), Some(&Encodable::from(201i64)));
        assert_eq!(stopped.field("size"), Some(&Encodable::Null));
    }

    #[test]
    fn long_tasks_use_millisecond_units() {
        let (sdk, plugin) = enabled();
        let call = MethodCall::new("reportLongTask", ValueMap::new())
            .with("at", 1_700_000_000_123i64)
            .with("duration", 250i32);
        assert!(dispatch(plugin.as_ref(), &call).is_success());

        let task = &sdk.calls().named("reportLongTask")[0];
        assert_eq!(task.field("at"), Some(&Encodable::from(1_700_000_000_123i64)));
        assert_eq!(task.field("durationNs"), Some(&Encodable::from(250_000_000i64)));
    }

    #[test]
    fn negative_long_task_duration_is_rejected() {
        let (sdk, plugin) = enabled();
        let call = MethodCall::new("reportLongTask", ValueMap::new())
            .with("at", 1_700_000_000_123i64)
            .with("duration", -5i32);
        assert_eq!(
            dispatch(plugin.as_ref(), &call).error_code(),
            Some(ErrorCode::InvalidOperation)
        );
        assert!(sdk.calls().named("reportLongTask").is_empty());
    }

    #[test]
    fn session_id_is_reported_until_stopped() {
        let (_, plugin) = enabled();
        let get = MethodCall::new("getCurrentSessionId", ValueMap::new());
        let MethodResult::Success(DynamicValue::String(id)) = dispatch(plugin.as_ref(), &get) else {
            panic!("session id");
        };
        assert!(!id.is_empty());

        let stop = MethodCall::new("stopSession", ValueMap::new());
        assert!(dispatch(plugin.as_ref(), &stop).is_success());
        assert_eq!(
            dispatch(plugin.as_ref(), &get),
            MethodResult::Success(DynamicValue::Null)
        );
    }

    #[test]
    fn reset_requires_enable_again() {
        let (_, plugin) = enabled();
        plugin.reset();
        let call = MethodCall::new("stopSession", ValueMap::new());
        assert_eq!(
            dispatch(plugin.as_ref(), &call).error_code(),
            Some(ErrorCode::InvalidOperation)
        );
    }
}
