// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Native enum types handed to the observability SDK.
//
// The `#[default]` variant of each enum is the value its wire parser falls
// back to for unrecognised input.

use serde::{Deserialize, Serialize};

/// Intake region the SDK uploads to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Site {
    #[default]
    Us1,
    Us3,
    Us5,
    Eu1,
    Us1Fed,
    Ap1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchSize {
    Small,
    #[default]
    Medium,
    Large,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadFrequency {
    Frequent,
    #[default]
    Average,
    Rare,
}

/// User consent for data collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingConsent {
    Granted,
    NotGranted,
    /// Data is collected but held back until consent is given.
    #[default]
    Pending,
}

/// Verbosity of the SDK's own console diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    Verbose,
    Debug,
    Info,
    Warn,
    Error,
    /// No SDK diagnostics at all.
    #[default]
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VitalsFrequency {
    Frequent,
    #[default]
    Average,
    Rare,
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RumHttpMethod {
    #[default]
    Get,
    Post,
    Head,
    Put,
    Delete,
    Patch,
}

impl RumHttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Head => "HEAD",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
        }
    }
}

impl std::fmt::Display for RumHttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of resource a RUM resource event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RumResourceKind {
    Document,
    Image,
    Xhr,
    Beacon,
    Css,
    Fetch,
    Font,
    Js,
    Media,
    Native,
    #[default]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RumErrorSource {
    #[default]
    Source,
    Network,
    Webview,
    Console,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RumActionType {
    Tap,
    Scroll,
    Swipe,
    #[default]
    Custom,
}

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

/// Telemetry configuration flags the framework layer reports on behalf of
/// the SDK, since the SDK cannot observe framework-side tracking itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryOverrides {
    pub track_views_manually: bool,
    pub track_interactions: bool,
    pub track_errors: bool,
    pub track_network_requests: bool,
    pub track_native_views: bool,
    pub track_cross_platform_long_tasks: bool,
    pub track_flutter_performance: bool,
}

impl Default for TelemetryOverrides {
    fn default() -> Self {
        Self {
            track_views_manually: true,
            track_interactions: false,
            track_errors: false,
            track_network_requests: false,
            track_native_views: false,
            track_cross_platform_long_tasks: false,
            track_flutter_performance: false,
        }
    }
}

impl TelemetryOverrides {
    /// Set one flag by its wire name. Returns false for unknown options.
    pub fn set(&mut self, option: &str, value: bool) -> bool {
        let slot = match option {
            "trackViewsManually" => &mut self.track_views_manually,
            "trackInteractions" => &mut self.track_interactions,
            "trackErrors" => &mut self.track_errors,
            "trackNetworkRequests" => &mut self.track_network_requests,
            "trackNativeViews" => &mut self.track_native_views,
            "trackCrossPlatformLongTasks" => &mut self.track_cross_platform_long_tasks,
            "trackFlutterPerformance" => &mut self.track_flutter_performance,
            _ => return false,
        };
        *slot = value;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn telemetry_overrides_accept_known_options_only() {
        let mut overrides = TelemetryOverrides::default();
        assert!(overrides.track_views_manually);

        assert!(overrides.set("trackErrors", true));
        assert!(overrides.track_errors);

        assert!(!overrides.set("trackEverything", true));
        assert_eq!(
            overrides,
            TelemetryOverrides {
                track_errors: true,
                ..TelemetryOverrides::default()
            }
        );
    }

    #[test]
    fn enums_serialize_with_native_names() {
        assert_eq!(
            serde_json::to_value(Site::Us1Fed).expect("serialize"),
            serde_json::json!("us1_fed")
        );
        assert_eq!(
            serde_json::to_value(RumHttpMethod::Delete).expect("serialize"),
            serde_json::json!("DELETE")
        );
        assert_eq!(RumHttpMethod::Patch.to_string(), "PATCH");
    }
}
