// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Logs surface: feature enablement, global attributes and per-handle loggers.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info};

use beacon_core::config::{LoggerConfiguration, LogsConfiguration};
use beacon_core::error::Result;
use beacon_core::parsers::parse_log_level;
use beacon_core::types::LogLevel;
use beacon_core::value::{DynamicValue, encode_attributes};

use super::{encode_or_drop, report_reconfiguration};
use crate::channel::Args;
use crate::contract::{Contract, ContractTable, ParameterKind as P};
use crate::dispatch::{MethodHandler, method_surface};
use crate::events::LogEvent;
use crate::mapper::LogEventMapper;
use crate::registry::HandleRegistry;
use crate::traits::{LogErrorDetails, LogEventHook, Logger, ObservabilitySdk};

const LOGGER_CALL: &[(&str, P)] = &[
    ("loggerHandle", P::String),
    ("message", P::String),
    ("context", P::Map),
];

pub static LOGS_CONTRACTS: ContractTable = ContractTable::new(
    "logs",
    &[
        Contract::new("enable", &[("configuration", P::Map)]),
        Contract::new("addGlobalAttribute", &[("key", P::String), ("value", P::Any)]),
        Contract::new("removeGlobalAttribute", &[("key", P::String)]),
        Contract::new(
            "createLogger",
            &[("loggerHandle", P::String), ("configuration", P::Map)],
        ),
        Contract::new("destroyLogger", &[("loggerHandle", P::String)]),
        Contract::new(
            "log",
            &[
                ("loggerHandle", P::String),
                ("logLevel", P::String),
                ("message", P::String),
                ("context", P::Map),
            ],
        ),
        Contract::new("debug", LOGGER_CALL),
        Contract::new("info", LOGGER_CALL),
        Contract::new("warn", LOGGER_CALL),
        Contract::new("error", LOGGER_CALL),
        Contract::new(
            "addAttribute",
            &[("loggerHandle", P::String), ("key", P::String), ("value", P::Any)],
        ),
        Contract::new("addTag", &[("loggerHandle", P::String), ("tag", P::String)]),
        Contract::new("removeAttribute", &[("loggerHandle", P::String), ("key", P::String)]),
        Contract::new("removeTag", &[("loggerHandle", P::String), ("tag", P::String)]),
        Contract::new("removeTagWithKey", &[("loggerHandle", P::String), ("key", P::String)]),
    ],
);

method_surface! {
    /// Methods on the `datadog_sdk_flutter.logs` channel.
    pub enum LogsMethod as "logs", contracts = LOGS_CONTRACTS;
    {
        Enable => "enable",
        Deinitialize => "deinitialize",
        AddGlobalAttribute => "addGlobalAttribute",
        RemoveGlobalAttribute => "removeGlobalAttribute",
        CreateLogger => "createLogger",
        DestroyLogger => "destroyLogger",
        Log => "log",
        Debug => "debug",
        Info => "info",
        Warn => "warn",
        Error => "error",
        AddAttribute => "addAttribute",
        AddTag => "addTag",
        RemoveAttribute => "removeAttribute",
        RemoveTag => "removeTag",
        RemoveTagWithKey => "removeTagWithKey",
    }
}

/// Executes logs surface calls against the SDK.
///
/// Loggers are keyed by the framework-chosen handle. Re-creating a handle
/// replaces the logger; calls on unknown handles are silent no-ops.
pub struct LogsPlugin {
    sdk: Arc<dyn ObservabilitySdk>,
    loggers: HandleRegistry<String, dyn Logger>,
    mapper: Arc<LogEventMapper>,
    previous: Mutex<Option<LogsConfiguration>>,
}

impl LogsPlugin {
    pub fn new(sdk: Arc<dyn ObservabilitySdk>, mapper: Arc<LogEventMapper>) -> Self {
        Self {
            sdk,
            loggers: HandleRegistry::new(),
            mapper,
            previous: Mutex::new(None),
        }
    }

    pub fn mapper(&self) -> &Arc<LogEventMapper> {
        &self.mapper
    }

    pub fn logger_count(&self) -> usize {
        self.loggers.len()
    }

    /// Forget the enabled configuration and every logger.
    pub fn deinitialize(&self) {
        *self.previous.lock().unwrap_or_else(PoisonError::into_inner) = None;
        self.loggers.clear();
    }

    fn enable(&self, config: LogsConfiguration) {
        let mut previous = self.previous.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = previous.as_ref() {
            if *existing != config {
                report_reconfiguration("logs");
            }
            return;
        }

        let hook: Option<LogEventHook> = config.attach_log_mapper.then(|| {
            let mapper = Arc::clone(&self.mapper);
            Arc::new(move |event: LogEvent| mapper.map(event)) as LogEventHook
        });
        self.sdk.enable_logs(&config, hook);
        info!(mapper = config.attach_log_mapper, "logs enabled");
        *previous = Some(config);
    }

    fn logger(&self, args: &Args<'_>) -> Result<Option<Arc<dyn Logger>>> {
        let handle = args.string("loggerHandle")?;
        let logger = self.loggers.get(&handle.to_owned());
        if logger.is_none() {
            debug!(handle, method = args.method(), "unknown logger handle");
        }
        Ok(logger)
    }

    fn log(&self, level: LogLevel, args: &Args<'_>) -> Result<()> {
        let message = args.string("message")?;
        let context = encode_attributes(args.map("context")?);

        let error = LogErrorDetails {
            kind: args.opt_string("errorKind")?.map(str::to_owned),
            message: args.opt_string("errorMessage")?.map(str::to_owned),
            stack_trace: args.opt_string("stackTrace")?.map(str::to_owned),
        };
        let has_error = error != LogErrorDetails::default();

        if let Some(logger) = self.logger(args)? {
            logger.log(level, message, has_error.then_some(&error), context);
        }
        Ok(())
    }
}

impl MethodHandler for LogsPlugin {
    type Method = LogsMethod;

    fn handle(&self, method: LogsMethod, args: Args<'_>) -> Result<DynamicValue> {
        match method {
            LogsMethod::Enable => {
                self.enable(LogsConfiguration::from_encoded(args.map("configuration")?));
            }
            LogsMethod::Deinitialize => self.deinitialize(),
            LogsMethod::AddGlobalAttribute => {
                let key = args.string("key")?;
                if let Some(value) = encode_or_drop(args.method(), key, args.any("value")?) {
                    self.sdk.add_global_attribute(key, value);
                }
            }
            LogsMethod::RemoveGlobalAttribute => {
                self.sdk.remove_global_attribute(args.string("key")?);
            }
            LogsMethod::CreateLogger => {
                let handle = args.string("loggerHandle")?;
                let config = LoggerConfiguration::from_encoded(args.map("configuration")?);
                let logger = self.sdk.create_logger(&config);
                self.loggers.create_or_replace(handle.to_owned(), logger);
            }
            LogsMethod::DestroyLogger => {
                self.loggers.remove(&args.string("loggerHandle")?.to_owned());
            }
            LogsMethod::Log => {
                let level = parse_log_level(args.string("logLevel")?);
                self.log(level, &args)?;
            }
            LogsMethod::Debug => self.log(LogLevel::Debug, &args)?,
            LogsMethod::Info => self.log(LogLevel::Info, &args)?,
            LogsMethod::Warn => self.log(LogLevel::Warning, &args)?,
            LogsMethod::Error => self.log(LogLevel::Error, &args)?,
            LogsMethod::AddAttribute => {
                let key = args.string("key")?;
                let value = args.any("value")?;
                if let Some(logger) = self.logger(&args)? {
                    if let Some(value) = encode_or_drop(args.method(), key, value) {
                        logger.add_attribute(key, value);
                    }
                }
            }
            LogsMethod::AddTag => {
                let tag = args.string("tag")?;
                let value = args.opt_string("value")?;
                if let Some(logger) = self.logger(&args)? {
                    logger.add_tag(tag, value);
                }
            }
            LogsMethod::RemoveAttribute => {
                let key = args.string("key")?;
                if let Some(logger) = self.logger(&args)? {
                    logger.remove_attribute(key);
                }
            }
            LogsMethod::RemoveTag => {
                let tag = args.string("tag")?;
                if let Some(logger) = self.logger(&args)? {
                    logger.remove_tag(tag);
                }
            }
            LogsMethod::RemoveTagWithKey => {
                let key = args.string("key")?;
                if let Some(logger) = self.logger(&args)? {
                    logger.remove_tag_with_key(key);
                }
            }
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
    use crate::mapper::ChannelSet;
    use crate::mapper::testing::looper;
    use crate::stub::RecordingSdk;
    use crate::traits::LogsSdk;
    use beacon_core::value::{Encodable, ValueMap};

    fn plugin() -> (Arc<RecordingSdk>, Arc<LogsPlugin>) {
        init_tracing();
        let sdk = Arc::new(RecordingSdk::new());
        let mapper = Arc::new(LogEventMapper::new(
            Arc::new(ChannelSet::new()),
            looper(),
            Duration::from_millis(100),
        ));
        let plugin = Arc::new(LogsPlugin::new(sdk.clone(), mapper));
        (sdk, plugin)
    }

    fn create_logger(plugin: &LogsPlugin, handle: &str, name: &str) {
        let call = MethodCall::new("createLogger", ValueMap::new())
            .with("loggerHandle", handle)
            .with("configuration", map(vec![("name", name.into())]));
        assert!(dispatch(plugin, &call).is_success());
    }

    #[test]
    fn every_contract_is_enforced() {
        let (_, plugin) = plugin();
        check_contracts(&plugin, &LOGS_CONTRACTS, &|_| ValueMap::new());
    }

    #[test]
    fn debug_logs_exactly_once() {
        let (sdk, plugin) = plugin();
        create_logger(&plugin, "h1", "main");

        let call = MethodCall::new("debug", ValueMap::new())
            .with("loggerHandle", "h1")
            .with("message", "hi")
            .with("context", ValueMap::new());
        assert_eq!(dispatch(plugin.as_ref(), &call), MethodResult::Success(DynamicValue::Null));

        let logs = sdk.calls().named("log");
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].str_field("level"), Some("debug"));
        assert_eq!(logs[0].str_field("message"), Some("hi"));
        assert_eq!(logs[0].field("attributes"), Some(&Encodable::Object(Default::default())));
        assert_eq!(logs[0].field("errorKind"), None);
    }

    #[test]
    fn log_parses_level_and_error_details() {
        let (sdk, plugin) = plugin();
        create_logger(&plugin, "h1", "main");

        let call = MethodCall::new("log", ValueMap::new())
            .with("loggerHandle", "h1")
            .with("logLevel", "LogLevel.critical")
            .with("message", "boom")
            .with("context", map(vec![("attempt", 2i32.into())]))
            .with("errorKind", "StateError")
            .with("stackTrace", "#0 main");
        assert!(dispatch(plugin.as_ref(), &call).is_success());

        let log = &sdk.calls().named("log")[0];
        assert_eq!(log.str_field("level"), Some("critical"));
        assert_eq!(log.str_field("errorKind"), Some("StateError"));
        assert_eq!(log.field("errorMessage"), Some(&Encodable::Null));
        assert_eq!(log.str_field("stackTrace"), Some("#0 main"));
    }

    #[test]
    fn recreating_a_logger_replaces_it() {
        let (sdk, plugin) = plugin();
        create_logger(&plugin, "h1", "first");
        create_logger(&plugin, "h1", "second");
        assert_eq!(plugin.logger_count(), 1);

        let call = MethodCall::new("addTag", ValueMap::new())
            .with("loggerHandle", "h1")
            .with("tag", "beta");
        assert!(dispatch(plugin.as_ref(), &call).is_success());

        let tags = sdk.calls().named("addTag");
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].target, "logger:second");
    }

    #[test]
    fn destroyed_loggers_become_no_ops() {
        let (sdk, plugin) = plugin();
        create_logger(&plugin, "h1", "main");
        let destroy = MethodCall::new("destroyLogger", ValueMap::new()).with("loggerHandle", "h1");
        assert!(dispatch(plugin.as_ref(), &destroy).is_success());

        let call = MethodCall::new("info", ValueMap::new())
            .with("loggerHandle", "h1")
            .with("message", "gone")
            .with("context", ValueMap::new());
        assert_eq!(dispatch(plugin.as_ref(), &call), MethodResult::Success(DynamicValue::Null));
        assert!(sdk.calls().named("log").is_empty());
    }

    #[test]
    fn contract_is_checked_before_the_handle() {
        let (_, plugin) = plugin();
        let call = MethodCall::new("warn", ValueMap::new())
            .with("loggerHandle", "unknown")
            .with("message", 3i32);
        assert_eq!(
            dispatch(plugin.as_ref(), &call).error_code(),
            Some(beacon_core::ErrorCode::ContractViolation)
        );
    }

    #[test]
    fn enable_installs_the_mapper_once() {
        let (sdk, plugin) = plugin();
        let enable = |attach: bool| {
            MethodCall::new("enable", ValueMap::new())
                .with("configuration", map(vec![("attachLogMapper", attach.into())]))
        };
        assert!(dispatch(plugin.as_ref(), &enable(true)).is_success());
        assert!(dispatch(plugin.as_ref(), &enable(false)).is_success());
        assert_eq!(sdk.calls().named("enableLogs").len(), 1);
        assert!(sdk.is_logs_enabled());

        plugin.deinitialize();
        assert!(dispatch(plugin.as_ref(), &enable(false)).is_success());
        assert_eq!(sdk.calls().named("enableLogs").len(), 2);
    }

    #[test]
    fn unencodable_global_attribute_is_dropped() {
        let (sdk, plugin) = plugin();
        let call = MethodCall::new("addGlobalAttribute", ValueMap::new())
            .with("key", "blob")
            .with("value", DynamicValue::Opaque("Uint8List".into()));
        assert!(dispatch(plugin.as_ref(), &call).is_success());
        assert!(sdk.calls().named("addGlobalAttribute").is_empty());
    }
}
