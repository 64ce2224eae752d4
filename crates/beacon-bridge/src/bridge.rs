// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Top-level router: one plugin per channel name, plus the engine lifecycle
// that feeds the event mappers their callback channels.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use beacon_core::config::BridgeConfig;

use crate::channel::{ChannelId, MainThread, MethodCall, MethodChannel, MethodResult};
use crate::dispatch::dispatch;
use crate::mapper::{ChannelSet, LogEventMapper, RumEventMapper};
use crate::plugins::{
    CORE_CHANNEL, CorePlugin, LOGS_CHANNEL, LogsPlugin, RUM_CHANNEL, RumPlugin, TRACES_CHANNEL,
    TracesPlugin,
};
use crate::traits::ObservabilitySdk;

/// Callback channels of one framework engine.
///
/// Both channels report the engine's `ChannelId`, so one id detaches both.
#[derive(Clone)]
pub struct EngineChannels {
    pub logs: Arc<dyn MethodChannel>,
    pub rum: Arc<dyn MethodChannel>,
}

/// Owns every plugin and routes inbound calls by channel name.
pub struct Bridge {
    config: BridgeConfig,
    log_channels: Arc<ChannelSet>,
    rum_channels: Arc<ChannelSet>,
    core: Arc<CorePlugin>,
    logs: Arc<LogsPlugin>,
    traces: Arc<TracesPlugin>,
    rum: Arc<RumPlugin>,
}

impl Bridge {
    pub fn new(sdk: Arc<dyn ObservabilitySdk>, main_thread: Arc<dyn MainThread>, config: BridgeConfig) -> Self {
        let log_channels = Arc::new(ChannelSet::new());
        let rum_channels = Arc::new(ChannelSet::new());

        let log_mapper = Arc::new(LogEventMapper::new(
            Arc::clone(&log_channels),
            Arc::clone(&main_thread),
            config.mapper_timeouts.logs,
        ));
        let rum_mapper = Arc::new(RumEventMapper::new(
            Arc::clone(&rum_channels),
            main_thread,
            config.mapper_timeouts.rum,
        ));

        let logs = Arc::new(LogsPlugin::new(Arc::clone(&sdk), log_mapper));
        let traces = Arc::new(TracesPlugin::new(Arc::clone(&sdk)));
        let rum = Arc::new(RumPlugin::new(Arc::clone(&sdk), rum_mapper));
        let core = Arc::new(CorePlugin::new(
            Arc::clone(&sdk),
            Arc::clone(&logs),
            Arc::clone(&traces),
            Arc::clone(&rum),
        ));

        info!(
            sdk = sdk.sdk_name(),
            platform = ?config.platform,
            logs_timeout_ms = config.mapper_timeouts.logs.as_millis() as u64,
            rum_timeout_ms = config.mapper_timeouts.rum.as_millis() as u64,
            "bridge created"
        );

        Self {
            config,
            log_channels,
            rum_channels,
            core,
            logs,
            traces,
            rum,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Channel names this bridge answers on.
    pub fn channel_names() -> [&'static str; 4] {
        [CORE_CHANNEL, LOGS_CHANNEL, TRACES_CHANNEL, RUM_CHANNEL]
    }

    /// Resolve one call arriving on `channel`.
    #[instrument(skip_all, fields(channel = %channel))]
    pub fn handle(&self, channel: &str, call: &MethodCall) -> MethodResult {
        match channel {
            CORE_CHANNEL => dispatch(self.core.as_ref(), call),
            LOGS_CHANNEL => dispatch(self.logs.as_ref(), call),
            TRACES_CHANNEL => dispatch(self.traces.as_ref(), call),
            RUM_CHANNEL => dispatch(self.rum.as_ref(), call),
            _ => {
                debug!("unknown channel");
                MethodResult::NotImplemented
            }
        }
    }

    /// Make an engine's channels available to the event mappers.
    pub fn attach_engine(&self, channels: EngineChannels) {
        debug!(logs = %channels.logs.id(), rum = %channels.rum.id(), "engine attached");
        self.log_channels.add(channels.logs);
        self.rum_channels.add(channels.rum);
    }

    pub fn detach_engine(&self, id: ChannelId) {
        self.log_channels.remove(id);
        self.rum_channels.remove(id);
        debug!(engine = %id, "engine detached");
    }

    pub fn core(&self) -> &Arc<CorePlugin> {
        &self.core
    }

    pub fn logs(&self) -> &Arc<LogsPlugin> {
        &self.logs
    }

    pub fn traces(&self) -> &Arc<TracesPlugin> {
        &self.traces
    }

    pub fn rum(&self) -> &Arc<RumPlugin> {
        &self.rum
    }
}
