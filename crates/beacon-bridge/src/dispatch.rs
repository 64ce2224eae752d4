// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Method dispatch: wire names to closed per-surface method enums, contract
// validation, and conversion of handler errors into structured results.

use beacon_core::error::Result;
use beacon_core::value::DynamicValue;
use tracing::{debug, instrument, warn};

use crate::channel::{Args, MethodCall, MethodResult};
use crate::contract::ContractTable;

/// Closed set of methods one surface understands.
pub trait Surface: Sized + Copy + std::fmt::Debug + 'static {
    /// Surface name used in diagnostics.
    const NAME: &'static str;

    /// `None` for names outside the surface; these resolve "not implemented".
    fn from_method_name(name: &str) -> Option<Self>;

    fn method_name(self) -> &'static str;

    fn all() -> &'static [Self];

    fn contracts() -> &'static ContractTable;
}

/// A plugin that executes validated calls for one surface.
pub trait MethodHandler: Send + Sync {
    type Method: Surface;

    fn handle(&self, method: Self::Method, args: Args<'_>) -> Result<DynamicValue>;
}

/// Resolve one call against a handler.
///
/// Exactly one result per call: success, `ContractViolation`,
/// `InvalidOperation`, or not implemented.
#[instrument(skip_all, fields(surface = H::Method::NAME, method = %call.method))]
pub fn dispatch<H: MethodHandler>(handler: &H, call: &MethodCall) -> MethodResult {
    let Some(method) = H::Method::from_method_name(&call.method) else {
        debug!("method not implemented");
        return MethodResult::NotImplemented;
    };

    if let Some(contract) = H::Method::contracts().lookup(&call.method) {
        if let Err(e) = contract.validate(&call.arguments) {
            warn!(error = %e, "contract violation");
            return MethodResult::from_error(&e, &call.method);
        }
    }

    match handler.handle(method, call.args()) {
        Ok(value) => MethodResult::Success(value),
        Err(e) => {
            warn!(code = %e.code(), error = %e, "call failed");
            MethodResult::from_error(&e, &call.method)
        }
    }
}

/// Declare a surface's method enum together with its wire names.
macro_rules! method_surface {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident as $surface:literal, contracts = $table:expr;
        { $($variant:ident => $wire:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant,)+
        }

        impl $crate::dispatch::Surface for $name {
            const NAME: &'static str = $surface;

            fn from_method_name(name: &str) -> Option<Self> {
                match name {
                    $($wire => Some(Self::$variant),)+
                    _ => None,
                }
            }

            fn method_name(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }

            fn all() -> &'static [Self] {
                &[$(Self::$variant,)+]
            }

            fn contracts() -> &'static $crate::contract::ContractTable {
                &$table
            }
        }
    };
}

pub(crate) use method_surface;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{Contract, ContractTable, ParameterKind};
    use beacon_core::error::{BridgeError, ErrorCode};
    use beacon_core::value::ValueMap;

    static ECHO_CONTRACTS: ContractTable = ContractTable::new(
        "echo",
        &[Contract::new("echo", &[("value", ParameterKind::String)])],
    );

    method_surface! {
        enum EchoMethod as "echo", contracts = ECHO_CONTRACTS;
        {
            Echo => "echo",
            Fail => "fail",
        }
    }

    struct Echo;

    impl MethodHandler for Echo {
        type Method = EchoMethod;

        fn handle(&self, method: EchoMethod, args: Args<'_>) -> Result<DynamicValue> {
            match method {
                EchoMethod::Echo => Ok(args.string("value")?.into()),
                EchoMethod::Fail => Err(BridgeError::invalid_operation("not ready")),
            }
        }
    }

    #[test]
    fn unknown_methods_are_not_implemented() {
        let call = MethodCall::new("echo.other", ValueMap::new());
        assert_eq!(dispatch(&Echo, &call), MethodResult::NotImplemented);
    }

    #[test]
    fn valid_calls_succeed() {
        let call = MethodCall::new("echo", ValueMap::new()).with("value", "hi");
        assert_eq!(dispatch(&Echo, &call), MethodResult::Success("hi".into()));
    }

    #[test]
    fn contract_is_checked_before_the_handler_runs() {
        let call = MethodCall::new("echo", ValueMap::new()).with("value", 1i32);
        assert_eq!(
            dispatch(&Echo, &call).error_code(),
            Some(ErrorCode::ContractViolation)
        );
    }

    #[test]
    fn handler_errors_keep_their_code() {
        let call = MethodCall::new("fail", ValueMap::new());
        assert_eq!(
            dispatch(&Echo, &call).error_code(),
            Some(ErrorCode::InvalidOperation)
        );
    }

    #[test]
    fn surface_round_trips_wire_names() {
        for method in EchoMethod::all() {
            assert_eq!(EchoMethod::from_method_name(method.method_name()), Some(*method));
        }
    }
}
