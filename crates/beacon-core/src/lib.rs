// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Beacon core: values, parsers, configuration and errors shared by the bridge.

pub mod config;
pub mod error;
pub mod parsers;
pub mod perf;
pub mod types;
pub mod value;

pub use config::BridgeConfig;
pub use error::{BridgeError, EncodingError, ErrorCode};
pub use perf::PerformanceTracker;
pub use types::*;
pub use value::{Attributes, DynamicValue, Encodable, ValueMap};
