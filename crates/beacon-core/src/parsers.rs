// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Wire enum literal parsers.
//
// The framework sends enums as dotted literals (`"BatchSize.small"`). These
// literals are a persisted contract. Every parser is total: unrecognised
// input maps to the enum's documented default.

use crate::types::*;

/// Default: [`Site::Us1`].
pub fn parse_site(value: &str) -> Site {
    match value {
        "DatadogSite.us1" => Site::Us1,
        "DatadogSite.us3" => Site::Us3,
        "DatadogSite.us5" => Site::Us5,
        "DatadogSite.eu1" => Site::Eu1,
        "DatadogSite.us1Fed" => Site::Us1Fed,
        "DatadogSite.ap1" => Site::Ap1,
        _ => Site::Us1,
    }
}

/// Default: [`BatchSize::Medium`].
pub fn parse_batch_size(value: &str) -> BatchSize {
    match value {
        "BatchSize.small" => BatchSize::Small,
        "BatchSize.medium" => BatchSize::Medium,
        "BatchSize.large" => BatchSize::Large,
        _ => BatchSize::Medium,
    }
}

/// Default: [`UploadFrequency::Average`].
pub fn parse_upload_frequency(value: &str) -> UploadFrequency {
    match value {
        "UploadFrequency.frequent" => UploadFrequency::Frequent,
        "UploadFrequency.average" => UploadFrequency::Average,
        "UploadFrequency.rare" => UploadFrequency::Rare,
        _ => UploadFrequency::Average,
    }
}

/// Default: [`TrackingConsent::Pending`].
pub fn parse_tracking_consent(value: &str) -> TrackingConsent {
    match value {
        "TrackingConsent.granted" => TrackingConsent::Granted,
        "TrackingConsent.notGranted" => TrackingConsent::NotGranted,
        "TrackingConsent.pending" => TrackingConsent::Pending,
        _ => TrackingConsent::Pending,
    }
}

/// Default: [`Verbosity::None`].
pub fn parse_verbosity(value: &str) -> Verbosity {
    match value {
        "Verbosity.verbose" => Verbosity::Verbose,
        "Verbosity.debug" => Verbosity::Debug,
        "Verbosity.info" => Verbosity::Info,
        "Verbosity.warn" => Verbosity::Warn,
        "Verbosity.error" => Verbosity::Error,
        "Verbosity.none" => Verbosity::None,
        _ => Verbosity::None,
    }
}

/// Default: [`VitalsFrequency::Average`].
pub fn parse_vitals_frequency(value: &str) -> VitalsFrequency {
    match value {
        "VitalsFrequency.frequent" => VitalsFrequency::Frequent,
        "VitalsFrequency.average" => VitalsFrequency::Average,
        "VitalsFrequency.rare" => VitalsFrequency::Rare,
        "VitalsFrequency.never" => VitalsFrequency::Never,
        _ => VitalsFrequency::Average,
    }
}

/// Default: [`RumHttpMethod::Get`].
pub fn parse_rum_http_method(value: &str) -> RumHttpMethod {
    match value {
        "RumHttpMethod.get" => RumHttpMethod::Get,
        "RumHttpMethod.post" => RumHttpMethod::Post,
        "RumHttpMethod.head" => RumHttpMethod::Head,
        "RumHttpMethod.put" => RumHttpMethod::Put,
        "RumHttpMethod.delete" => RumHttpMethod::Delete,
        "RumHttpMethod.patch" => RumHttpMethod::Patch,
        _ => RumHttpMethod::Get,
    }
}

/// Default: [`RumResourceKind::Other`].
pub fn parse_rum_resource_kind(value: &str) -> RumResourceKind {
    match value {
        "RumResourceType.document" => RumResourceKind::Document,
        "RumResourceType.image" => RumResourceKind::Image,
        "RumResourceType.xhr" => RumResourceKind::Xhr,
        "RumResourceType.beacon" => RumResourceKind::Beacon,
        "RumResourceType.css" => RumResourceKind::Css,
        "RumResourceType.fetch" => RumResourceKind::Fetch,
        "RumResourceType.font" => RumResourceKind::Font,
        "RumResourceType.js" => RumResourceKind::Js,
        "RumResourceType.media" => RumResourceKind::Media,
        "RumResourceType.native" => RumResourceKind::Native,
        _ => RumResourceKind::Other,
    }
}

/// Default: [`RumErrorSource::Source`]. `custom` also maps to `Source`.
pub fn parse_rum_error_source(value: &str) -> RumErrorSource {
    match value {
        "RumErrorSource.source" => RumErrorSource::Source,
        "RumErrorSource.network" => RumErrorSource::Network,
        "RumErrorSource.webview" => RumErrorSource::Webview,
        "RumErrorSource.console" => RumErrorSource::Console,
        "RumErrorSource.custom" => RumErrorSource::Source,
        _ => RumErrorSource::Source,
    }
}

/// Default: [`RumActionType::Custom`].
pub fn parse_rum_action_type(value: &str) -> RumActionType {
    match value {
        "RumActionType.tap" => RumActionType::Tap,
        "RumActionType.scroll" => RumActionType::Scroll,
        "RumActionType.swipe" => RumActionType::Swipe,
        "RumActionType.custom" => RumActionType::Custom,
        _ => RumActionType::Custom,
    }
}

/// Default: [`LogLevel::Info`].
pub fn parse_log_level(value: &str) -> LogLevel {
    match value {
        "LogLevel.debug" => LogLevel::Debug,
        "LogLevel.info" => LogLevel::Info,
        "LogLevel.notice" => LogLevel::Notice,
        "LogLevel.warning" => LogLevel::Warning,
        "LogLevel.error" => LogLevel::Error,
        "LogLevel.critical" => LogLevel::Critical,
        "LogLevel.alert" => LogLevel::Alert,
        "LogLevel.emergency" => LogLevel::Emergency,
        _ => LogLevel::Info,
    }
}
