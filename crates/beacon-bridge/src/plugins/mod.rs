// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-surface method handlers: core, logs, traces and RUM.

pub mod logs;
pub mod rum;
pub mod sdk;
pub mod traces;

pub use logs::{LogsMethod, LogsPlugin};
pub use rum::{RumMethod, RumPlugin};
pub use sdk::{CoreMethod, CorePlugin};
pub use traces::{TracesMethod, TracesPlugin};

use tracing::warn;

use beacon_core::value::{DynamicValue, Encodable, encode};

pub const CORE_CHANNEL: &str = "datadog_sdk_flutter";
pub const LOGS_CHANNEL: &str = "datadog_sdk_flutter.logs";
pub const TRACES_CHANNEL: &str = "datadog_sdk_flutter.traces";
pub const RUM_CHANNEL: &str = "datadog_sdk_flutter.rum";

/// Encode a single attribute value, dropping it with a warning on failure.
pub(crate) fn encode_or_drop(method: &str, key: &str, value: &DynamicValue) -> Option<Encodable> {
    match encode(value) {
        Ok(encoded) => Some(encoded),
        Err(e) => {
            warn!(method, key, error = %e, "attribute dropped");
            None
        }
    }
}

/// Log a reinitialisation attempt with a different configuration.
pub(crate) fn report_reconfiguration(surface: &str) {
    tracing::error!(
        surface,
        "re-enabling with different options is not supported; cold restart the application to change the configuration"
    );
}
