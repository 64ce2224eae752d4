// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Beacon bridge: method dispatch between the UI framework and the native
// observability SDK.
//
// Inbound calls arrive per channel, are validated against static contract
// tables, and are executed by one plugin per surface. Outbound, the event
// mappers call back into the framework so it can rewrite or drop events
// before the SDK persists them.

pub mod bridge;
pub mod channel;
pub mod contract;
pub mod dispatch;
pub mod events;
pub mod looper;
pub mod mapper;
pub mod plugins;
pub mod registry;
pub mod traits;

#[cfg(not(any(target_os = "ios", target_os = "android")))]
pub mod stub;

pub use bridge::{Bridge, EngineChannels};
pub use channel::{ChannelId, ChannelResponse, MainThread, MethodCall, MethodChannel, MethodResult};
pub use looper::Looper;
pub use traits::ObservabilitySdk;

/// SDK used when the host does not link a vendor SDK.
///
/// Mobile hosts implement [`ObservabilitySdk`] over their native SDK and pass
/// it to [`Bridge::new`] directly.
#[cfg(not(any(target_os = "ios", target_os = "android")))]
pub fn platform_sdk() -> std::sync::Arc<dyn ObservabilitySdk> {
    std::sync::Arc::new(stub::RecordingSdk::new())
}
