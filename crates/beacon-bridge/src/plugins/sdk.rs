// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core surface: SDK initialization, user info, telemetry and teardown.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, warn};

use beacon_core::config::SdkConfiguration;
use beacon_core::error::{BridgeError, Result};
use beacon_core::parsers::{parse_tracking_consent, parse_verbosity};
use beacon_core::perf::PerfSnapshot;
use beacon_core::types::TelemetryOverrides;
use beacon_core::value::{DynamicValue, ValueMap, encode_attributes};

use super::{LogsPlugin, RumPlugin, TracesPlugin, report_reconfiguration};
use crate::channel::Args;
use crate::contract::{Contract, ContractTable, ParameterKind as P};
use crate::dispatch::{MethodHandler, method_surface};
use crate::traits::ObservabilitySdk;

pub static CORE_CONTRACTS: ContractTable = ContractTable::new(
    "core",
    &[
        Contract::new("initialize", &[("configuration", P::Map)]),
        Contract::new("setSdkVerbosity", &[("value", P::String)]),
        Contract::new("setTrackingConsent", &[("value", P::String)]),
        Contract::new("setUserInfo", &[("extraInfo", P::Map)]),
        Contract::new("addUserExtraInfo", &[("extraInfo", P::Map)]),
        Contract::new("telemetryDebug", &[("message", P::String)]),
        Contract::new("telemetryError", &[("message", P::String)]),
        Contract::new("getInternalVar", &[("name", P::String)]),
    ],
);

method_surface! {
    /// Methods on the `datadog_sdk_flutter` channel.
    pub enum CoreMethod as "core", contracts = CORE_CONTRACTS;
    {
        Initialize => "initialize",
        AttachToExisting => "attachToExisting",
        SetSdkVerbosity => "setSdkVerbosity",
        SetTrackingConsent => "setTrackingConsent",
        SetUserInfo => "setUserInfo",
        AddUserExtraInfo => "addUserExtraInfo",
        TelemetryDebug => "telemetryDebug",
        TelemetryError => "telemetryError",
        UpdateTelemetryConfiguration => "updateTelemetryConfiguration",
        GetInternalVar => "getInternalVar",
        FlushAndDeinitialize => "flushAndDeinitialize",
    }
}

/// Internal variable exposing mapper timing statistics.
pub const MAPPER_PERFORMANCE: &str = "mapperPerformance";

/// Executes core surface calls and owns the lifecycle of the feature plugins.
pub struct CorePlugin {
    sdk: Arc<dyn ObservabilitySdk>,
    logs: Arc<LogsPlugin>,
    traces: Arc<TracesPlugin>,
    rum: Arc<RumPlugin>,
    previous: Mutex<Option<SdkConfiguration>>,
    telemetry: Mutex<TelemetryOverrides>,
}

impl CorePlugin {
    pub fn new(
        sdk: Arc<dyn ObservabilitySdk>,
        logs: Arc<LogsPlugin>,
        traces: Arc<TracesPlugin>,
        rum: Arc<RumPlugin>,
    ) -> Self {
        Self {
            sdk,
            logs,
            traces,
            rum,
            previous: Mutex::new(None),
            telemetry: Mutex::new(TelemetryOverrides::default()),
        }
    }

    fn initialize(&self, config: SdkConfiguration) {
        let mut previous = self.previous.lock().unwrap_or_else(PoisonError::into_inner);
        if self.sdk.is_initialized() {
            if previous.as_ref() != Some(&config) {
                report_reconfiguration("core");
            }
            return;
        }
        self.sdk.initialize(&config);
        info!(sdk = self.sdk.sdk_name(), env = %config.env, "sdk initialized");
        *previous = Some(config);
    }

    /// Report whether natively initialized features are already running, and
    /// adopt the native RUM monitor if there is one.
    fn attach_to_existing(&self) -> Result<DynamicValue> {
        if !self.sdk.is_initialized() {
            return Err(BridgeError::invalid_operation(
                "attachToExisting called but the SDK has not been initialized natively",
            ));
        }

        let monitor = self.sdk.existing_monitor();
        let rum_enabled = monitor.is_some();
        if let Some(monitor) = monitor {
            self.rum.attach_monitor(monitor);
        }

        let mut result = ValueMap::new();
        result.insert("loggingEnabled".into(), self.sdk.is_logs_enabled().into());
        result.insert("rumEnabled".into(), rum_enabled.into());
        Ok(DynamicValue::Map(result))
    }

    fn update_telemetry_configuration(&self, args: &Args<'_>) {
        let option = args.raw("option");
        let value = args.raw("value");

        let mut telemetry = self.telemetry.lock().unwrap_or_else(PoisonError::into_inner);
        let applied = match (option.and_then(DynamicValue::as_str), value.and_then(DynamicValue::as_bool)) {
            (Some(option), Some(value)) => telemetry.set(option, value),
            _ => false,
        };

        if applied {
            self.sdk.update_telemetry_configuration(&telemetry);
        } else {
            let message = format!(
                "Attempting to set telemetry configuration option '{}' to '{}', which is invalid.",
                describe(option),
                describe(value)
            );
            warn!(%message, "invalid telemetry configuration");
            self.sdk.telemetry_debug(&message);
        }
    }

    fn internal_var(&self, name: &str) -> DynamicValue {
        match name {
            MAPPER_PERFORMANCE => {
                let runtime = self.rum.mapper().runtime();
                let mut perf = ValueMap::new();
                perf.insert("total".into(), snapshot(runtime.perf()));
                perf.insert("mainThread".into(), snapshot(runtime.perf_main_thread()));
                perf.insert("mapperTimeouts".into(), runtime.timeouts().into());
                DynamicValue::Map(perf)
            }
            _ => DynamicValue::Null,
        }
    }

    /// Tear down the SDK and every plugin so `initialize` can run again.
    pub fn flush_and_deinitialize(&self) {
        self.sdk.reset();
        self.logs.deinitialize();
        self.traces.reset();
        self.rum.reset();
        *self.previous.lock().unwrap_or_else(PoisonError::into_inner) = None;
        *self.telemetry.lock().unwrap_or_else(PoisonError::into_inner) = TelemetryOverrides::default();
        info!("sdk deinitialized");
    }
}

fn snapshot(perf: PerfSnapshot) -> DynamicValue {
    let mut map = ValueMap::new();
    map.insert("minMs".into(), perf.min_ms.into());
    map.insert("maxMs".into(), perf.max_ms.into());
    map.insert("avgMs".into(), perf.avg_ms.into());
    DynamicValue::Map(map)
}

fn describe(value: Option<&DynamicValue>) -> String {
    match value {
        None => "null".to_owned(),
        Some(DynamicValue::String(s)) => s.clone(),
        Some(other) => other
            .to_json()
            .map(|json| json.to_string())
            .unwrap_or_else(|_| other.type_name().to_owned()),
    }
}

impl MethodHandler for CorePlugin {
    type Method = CoreMethod;

    fn handle(&self, method: CoreMethod, args: Args<'_>) -> Result<DynamicValue> {
        match method {
            CoreMethod::Initialize => {
                self.initialize(SdkConfiguration::from_encoded(args.map("configuration")?)?);
            }
            CoreMethod::AttachToExisting => return self.attach_to_existing(),
            CoreMethod::SetSdkVerbosity => {
                self.sdk.set_verbosity(parse_verbosity(args.string("value")?));
            }
            CoreMethod::SetTrackingConsent => {
                self.sdk.set_tracking_consent(parse_tracking_consent(args.string("value")?));
            }
            CoreMethod::SetUserInfo => {
                let extra_info = encode_attributes(args.map("extraInfo")?);
                self.sdk.set_user_info(
                    args.opt_string("id")?,
                    args.opt_string("name")?,
                    args.opt_string("email")?,
                    extra_info,
                );
            }
            CoreMethod::AddUserExtraInfo => {
                self.sdk.add_user_extra_info(encode_attributes(args.map("extraInfo")?));
            }
            CoreMethod::TelemetryDebug => self.sdk.telemetry_debug(args.string("message")?),
            CoreMethod::TelemetryError => {
                self.sdk.telemetry_error(
                    args.string("message")?,
                    args.opt_string("stack")?,
                    args.opt_string("kind")?,
                );
            }
            CoreMethod::UpdateTelemetryConfiguration => self.update_telemetry_configuration(&args),
            CoreMethod::GetInternalVar => return Ok(self.internal_var(args.string("name")?)),
            CoreMethod::FlushAndDeinitialize => self.flush_and_deinitialize(),
        }
        Ok(DynamicValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::super::testing::*;
    use super::*;
    use crate::channel::{MethodCall, MethodResult};
    use crate::dispatch::dispatch;
    use crate::mapper::testing::looper;
    use crate::mapper::{ChannelSet, LogEventMapper, RumEventMapper};
    use crate::stub::RecordingSdk;
    use beacon_core::ErrorCode;
    use beacon_core::value::Encodable;

    struct Fixture {
        sdk: Arc<RecordingSdk>,
        core: Arc<CorePlugin>,
        rum: Arc<RumPlugin>,
        traces: Arc<TracesPlugin>,
    }

    fn fixture_with(sdk: RecordingSdk) -> Fixture {
        init_tracing();
        let sdk = Arc::new(sdk);
        let main_thread = looper();
        let logs = Arc::new(LogsPlugin::new(
            sdk.clone(),
            Arc::new(LogEventMapper::new(
                Arc::new(ChannelSet::new()),
                Arc::clone(&main_thread),
                Duration::from_millis(100),
            )),
        ));
        let traces = Arc::new(TracesPlugin::new(sdk.clone()));
        let rum = Arc::new(RumPlugin::new(
            sdk.clone(),
            Arc::new(RumEventMapper::new(
                Arc::new(ChannelSet::new()),
                main_thread,
                Duration::from_millis(100),
            )),
        ));
        let core = Arc::new(CorePlugin::new(
            sdk.clone(),
            logs,
            Arc::clone(&traces),
            Arc::clone(&rum),
        ));
        Fixture { sdk, core, rum, traces }
    }

    fn fixture() -> Fixture {
        fixture_with(RecordingSdk::new())
    }

    fn configuration(env: &str) -> ValueMap {
        map(vec![("clientToken", "token".into()), ("env", env.into())])
    }

    fn initialize(env: &str) -> MethodCall {
        MethodCall::new("initialize", ValueMap::new()).with("configuration", configuration(env))
    }

    #[test]
    fn every_contract_is_enforced() {
        let f = fixture();
        check_contracts(&f.core, &CORE_CONTRACTS, &|method| match method {
            "initialize" => map(vec![("configuration", configuration("prod").into())]),
            _ => ValueMap::new(),
        });
    }

    #[test]
    fn initialize_runs_once() {
        let f = fixture();
        assert!(dispatch(f.core.as_ref(), &initialize("prod")).is_success());
        assert!(dispatch(f.core.as_ref(), &initialize("prod")).is_success());
        assert!(dispatch(f.core.as_ref(), &initialize("staging")).is_success());
        assert_eq!(f.sdk.calls().named("initialize").len(), 1);
    }

    #[test]
    fn initialize_without_token_is_invalid() {
        let f = fixture();
        let call = MethodCall::new("initialize", ValueMap::new())
            .with("configuration", map(vec![("env", "prod".into())]));
        assert_eq!(
            dispatch(f.core.as_ref(), &call).error_code(),
            Some(ErrorCode::InvalidOperation)
        );
        assert!(f.sdk.calls().all().is_empty());
    }

    #[test]
    fn attach_to_existing_requires_native_initialization() {
        let f = fixture();
        let call = MethodCall::new("attachToExisting", ValueMap::new());
        assert_eq!(
            dispatch(f.core.as_ref(), &call).error_code(),
            Some(ErrorCode::InvalidOperation)
        );
    }

    #[test]
    fn attach_to_existing_adopts_the_native_monitor() {
        let f = fixture_with(RecordingSdk::preinitialized(true));
        let call = MethodCall::new("attachToExisting", ValueMap::new());
        let MethodResult::Success(DynamicValue::Map(result)) = dispatch(f.core.as_ref(), &call) else {
            panic!("expected a result map");
        };
        assert_eq!(result["rumEnabled"].as_bool(), Some(true));
        assert_eq!(result["loggingEnabled"].as_bool(), Some(false));
        assert!(f.rum.is_enabled());
    }

    #[test]
    fn user_info_passes_optional_identity() {
        let f = fixture();
        let call = MethodCall::new("setUserInfo", ValueMap::new())
            .with("id", "u1")
            .with("email", "a@example.com")
            .with("extraInfo", map(vec![("plan", "pro".into())]));
        assert!(dispatch(f.core.as_ref(), &call).is_success());

        let user = &f.sdk.calls().named("setUserInfo")[0];
        assert_eq!(user.str_field("id"), Some("u1"));
        assert_eq!(user.field("name"), Some(&Encodable::Null));
        let Some(Encodable::Object(extra)) = user.field("extraInfo") else {
            panic!("extra info recorded");
        };
        assert_eq!(extra.get("plan"), Some(&Encodable::from("pro")));
    }

    #[test]
    fn valid_telemetry_options_update_the_sdk() {
        let f = fixture();
        let call = MethodCall::new("updateTelemetryConfiguration", ValueMap::new())
            .with("option", "trackErrors")
            .with("value", true);
        assert!(dispatch(f.core.as_ref(), &call).is_success());

        let update = &f.sdk.calls().named("updateTelemetryConfiguration")[0];
        assert_eq!(update.field("trackErrors"), Some(&Encodable::Bool(true)));
        assert!(f.sdk.calls().named("telemetryDebug").is_empty());
    }

    #[test]
    fn invalid_telemetry_options_report_a_debug_message() {
        let f = fixture();
        let call = MethodCall::new("updateTelemetryConfiguration", ValueMap::new())
            .with("option", "trackEverything")
            .with("value", true);
        assert_eq!(
            dispatch(f.core.as_ref(), &call),
            MethodResult::Success(DynamicValue::Null)
        );

        let debug = &f.sdk.calls().named("telemetryDebug")[0];
        assert_eq!(
            debug.str_field("message"),
            Some("Attempting to set telemetry configuration option 'trackEverything' to 'true', which is invalid.")
        );
        assert!(f.sdk.calls().named("updateTelemetryConfiguration").is_empty());
    }

    #[test]
    fn mapper_performance_is_exposed() {
        let f = fixture();
        let call = MethodCall::new("getInternalVar", ValueMap::new()).with("name", MAPPER_PERFORMANCE);
        let MethodResult::Success(DynamicValue::Map(perf)) = dispatch(f.core.as_ref(), &call) else {
            panic!("expected performance map");
        };
        assert_eq!(perf["mapperTimeouts"].as_i64(), Some(0));
        assert_eq!(perf["total"].get("maxMs").and_then(DynamicValue::as_f64), Some(0.0));
        assert!(perf["mainThread"].get("minMs").is_some());

        let unknown = MethodCall::new("getInternalVar", ValueMap::new()).with("name", "nope");
        assert_eq!(
            dispatch(f.core.as_ref(), &unknown),
            MethodResult::Success(DynamicValue::Null)
        );
    }

    #[test]
    fn flush_and_deinitialize_allows_a_fresh_start() {
        let f = fixture();
        assert!(dispatch(f.core.as_ref(), &initialize("prod")).is_success());
        let enable = MethodCall::new("enable", ValueMap::new()).with("configuration", ValueMap::new());
        assert!(dispatch(f.traces.as_ref(), &enable).is_success());

        let flush = MethodCall::new("flushAndDeinitialize", ValueMap::new());
        assert!(dispatch(f.core.as_ref(), &flush).is_success());
        assert_eq!(f.sdk.calls().named("reset").len(), 1);

        let span = MethodCall::new("startRootSpan", ValueMap::new())
            .with("spanHandle", 1i64)
            .with("operationName", "op")
            .with("startTime", 0i64);
        assert_eq!(
            dispatch(f.traces.as_ref(), &span).error_code(),
            Some(ErrorCode::InvalidOperation)
        );

        assert!(dispatch(f.core.as_ref(), &initialize("staging")).is_success());
        assert_eq!(f.sdk.calls().named("initialize").len(), 2);
    }
}
