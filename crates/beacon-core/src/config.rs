// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bridge settings and the configuration models decoded from the framework's
// loosely typed configuration maps.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};
use crate::parsers::*;
use crate::types::*;
use crate::value::{Attributes, DynamicValue, ValueMap, encode_attributes};

// ---------------------------------------------------------------------------
// Bridge settings
// ---------------------------------------------------------------------------

/// Which native host the bridge is embedded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostPlatform {
    #[default]
    Android,
    Ios,
    /// Desktop and CI builds backed by the recording SDK.
    Desktop,
}

/// Bounded wait for each mapper family's round trip into the framework.
///
/// Kept per family: log and RUM volumes differ, and hosts tune them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapperTimeouts {
    #[serde(with = "duration_ms")]
    pub logs: Duration,
    #[serde(with = "duration_ms")]
    pub rum: Duration,
}

impl MapperTimeouts {
    pub const LOGS: Duration = Duration::from_millis(1_000);
    pub const RUM: Duration = Duration::from_millis(1_000);
    pub const RUM_IOS: Duration = Duration::from_millis(500);

    pub fn for_platform(platform: HostPlatform) -> Self {
        match platform {
            HostPlatform::Ios => Self {
                logs: Self::LOGS,
                rum: Self::RUM_IOS,
            },
            HostPlatform::Android | HostPlatform::Desktop => Self {
                logs: Self::LOGS,
                rum: Self::RUM,
            },
        }
    }
}

impl Default for MapperTimeouts {
    fn default() -> Self {
        Self::for_platform(HostPlatform::default())
    }
}

/// Process-wide bridge settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Host flavour; selects timeout presets.
    pub platform: HostPlatform,
    /// Mapper round-trip timeouts.
    pub mapper_timeouts: MapperTimeouts,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::for_platform(HostPlatform::default())
    }
}

impl BridgeConfig {
    pub fn for_platform(platform: HostPlatform) -> Self {
        Self {
            platform,
            mapper_timeouts: MapperTimeouts::for_platform(platform),
        }
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis().try_into().unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

// ---------------------------------------------------------------------------
// Loose readers
// ---------------------------------------------------------------------------
//
// Configuration maps are forgiving: unknown keys and wrongly typed optional
// keys are ignored rather than rejected.

fn string(map: &ValueMap, key: &str) -> Option<String> {
    map.get(key).and_then(DynamicValue::as_str).map(str::to_owned)
}

fn flag(map: &ValueMap, key: &str) -> Option<bool> {
    map.get(key).and_then(DynamicValue::as_bool)
}

fn number(map: &ValueMap, key: &str) -> Option<f64> {
    map.get(key).and_then(DynamicValue::as_f64)
}

fn attributes(map: &ValueMap, key: &str) -> Attributes {
    map.get(key)
        .and_then(DynamicValue::as_map)
        .map(encode_attributes)
        .unwrap_or_default()
}

fn required_string(map: &ValueMap, key: &str, what: &str) -> Result<String> {
    string(map, key)
        .ok_or_else(|| BridgeError::invalid_operation(format!("bad {what} configuration: missing {key}")))
}

// ---------------------------------------------------------------------------
// Configuration models
// ---------------------------------------------------------------------------

/// Core SDK configuration passed to `initialize`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SdkConfiguration {
    pub client_token: String,
    pub env: String,
    pub service: Option<String>,
    pub site: Option<Site>,
    pub batch_size: Option<BatchSize>,
    pub upload_frequency: Option<UploadFrequency>,
    pub tracking_consent: TrackingConsent,
    pub native_crash_report_enabled: bool,
    pub telemetry_sample_rate: Option<f64>,
    pub first_party_hosts: Vec<String>,
    pub additional_config: Attributes,
}

impl SdkConfiguration {
    pub fn from_encoded(map: &ValueMap) -> Result<Self> {
        Ok(Self {
            client_token: required_string(map, "clientToken", "sdk")?,
            env: required_string(map, "env", "sdk")?,
            service: string(map, "service"),
            site: string(map, "site").map(|s| parse_site(&s)),
            batch_size: string(map, "batchSize").map(|s| parse_batch_size(&s)),
            upload_frequency: string(map, "uploadFrequency").map(|s| parse_upload_frequency(&s)),
            tracking_consent: string(map, "trackingConsent")
                .map(|s| parse_tracking_consent(&s))
                .unwrap_or_default(),
            native_crash_report_enabled: flag(map, "nativeCrashReportEnabled").unwrap_or(false),
            telemetry_sample_rate: number(map, "telemetrySampleRate"),
            first_party_hosts: map
                .get("firstPartyHosts")
                .and_then(DynamicValue::as_list)
                .map(|hosts| {
                    hosts
                        .iter()
                        .filter_map(DynamicValue::as_str)
                        .map(str::to_owned)
                        .collect()
                })
                .unwrap_or_default(),
            additional_config: attributes(map, "additionalConfig"),
        })
    }
}

/// Logs feature configuration passed to `enable` on the logs surface.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct LogsConfiguration {
    pub custom_endpoint: Option<String>,
    pub attach_log_mapper: bool,
}

impl LogsConfiguration {
    pub fn from_encoded(map: &ValueMap) -> Self {
        Self {
            custom_endpoint: string(map, "customEndpoint"),
            attach_log_mapper: flag(map, "attachLogMapper").unwrap_or(false),
        }
    }
}

/// Per-logger configuration passed to `createLogger`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoggerConfiguration {
    pub service: Option<String>,
    pub name: Option<String>,
    pub network_info_enabled: bool,
    pub bundle_with_rum_enabled: bool,
    pub bundle_with_trace_enabled: bool,
    /// Entries below this level stay on device.
    pub remote_log_threshold: LogLevel,
}

impl Default for LoggerConfiguration {
    fn default() -> Self {
        Self {
            service: None,
            name: None,
            network_info_enabled: false,
            bundle_with_rum_enabled: true,
            bundle_with_trace_enabled: true,
            remote_log_threshold: LogLevel::Debug,
        }
    }
}

impl LoggerConfiguration {
    pub fn from_encoded(map: &ValueMap) -> Self {
        let defaults = Self::default();
        Self {
            service: string(map, "service"),
            name: string(map, "name"),
            network_info_enabled: flag(map, "networkInfoEnabled")
                .unwrap_or(defaults.network_info_enabled),
            bundle_with_rum_enabled: flag(map, "bundleWithRumEnabled")
                .unwrap_or(defaults.bundle_with_rum_enabled),
            bundle_with_trace_enabled: flag(map, "bundleWithTraceEnabled")
                .unwrap_or(defaults.bundle_with_trace_enabled),
            remote_log_threshold: string(map, "remoteLogThreshold")
                .map(|s| parse_log_level(&s))
                .unwrap_or(defaults.remote_log_threshold),
        }
    }
}

/// Tracing feature configuration passed to `enable` on the traces surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TracesConfiguration {
    pub service: Option<String>,
    pub bundle_with_rum: bool,
    /// Percentage of traces kept, 0 to 100.
    pub sample_rate: f64,
}

impl Default for TracesConfiguration {
    fn default() -> Self {
        Self {
            service: None,
            bundle_with_rum: true,
            sample_rate: 100.0,
        }
    }
}

impl TracesConfiguration {
    pub fn from_encoded(map: &ValueMap) -> Self {
        let defaults = Self::default();
        Self {
            service: string(map, "service"),
            bundle_with_rum: flag(map, "bundleWithRum").unwrap_or(defaults.bundle_with_rum),
            sample_rate: number(map, "sampleRate").unwrap_or(defaults.sample_rate),
        }
    }
}

/// Which RUM event families are routed through a framework-side mapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RumMapperFlags {
    pub view: bool,
    pub action: bool,
    pub resource: bool,
    pub error: bool,
    pub long_task: bool,
}

impl RumMapperFlags {
    pub fn any(&self) -> bool {
        self.view || self.action || self.resource || self.error || self.long_task
    }
}

/// RUM feature configuration passed to `enable` on the RUM surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RumConfiguration {
    pub application_id: String,
    pub session_sample_rate: f64,
    /// Seconds a frame must block before it is reported as a long task.
    pub long_task_threshold: f64,
    pub track_frustrations: bool,
    pub custom_endpoint: Option<String>,
    pub vitals_update_frequency: Option<VitalsFrequency>,
    pub telemetry_sample_rate: Option<f64>,
    pub mappers: RumMapperFlags,
    pub additional_config: Attributes,
}

impl RumConfiguration {
    pub fn from_encoded(map: &ValueMap) -> Result<Self> {
        Ok(Self {
            application_id: required_string(map, "applicationId", "rum")?,
            session_sample_rate: number(map, "sessionSampleRate").unwrap_or(100.0),
            long_task_threshold: number(map, "longTaskThreshold").unwrap_or(0.1),
            track_frustrations: flag(map, "trackFrustrations").unwrap_or(true),
            custom_endpoint: string(map, "customEndpoint"),
            vitals_update_frequency: string(map, "vitalsUpdateFrequency")
                .map(|s| parse_vitals_frequency(&s)),
            telemetry_sample_rate: number(map, "telemetrySampleRate"),
            mappers: RumMapperFlags {
                view: flag(map, "attachViewEventMapper").unwrap_or(false),
                action: flag(map, "attachActionEventMapper").unwrap_or(false),
                resource: flag(map, "attachResourceEventMapper").unwrap_or(false),
                error: flag(map, "attachErrorEventMapper").unwrap_or(false),
                long_task: flag(map, "attachLongTaskEventMapper").unwrap_or(false),
            },
            additional_config: attributes(map, "additionalConfig"),
        })
    }
}
