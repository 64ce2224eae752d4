// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Transport types shared by every surface: inbound calls and their results,
// outbound callback channels, and the UI-affine executor.

use std::fmt;

use beacon_core::error::{BridgeError, ErrorCode, Result};
use beacon_core::value::{DynamicValue, ValueMap};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Inbound calls
// ---------------------------------------------------------------------------

/// One framework call: a method name and its argument bag.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub method: String,
    pub arguments: ValueMap,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: ValueMap) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }

    /// Builder-style helper used heavily by tests.
    pub fn with(mut self, key: &str, value: impl Into<DynamicValue>) -> Self {
        self.arguments.insert(key.to_owned(), value.into());
        self
    }

    pub fn args(&self) -> Args<'_> {
        Args {
            method: &self.method,
            map: &self.arguments,
        }
    }
}

/// Typed accessors over a call's arguments.
///
/// Null counts as absent. A present value of the wrong type is a contract
/// violation whether the parameter is required or optional.
#[derive(Debug, Clone, Copy)]
pub struct Args<'a> {
    method: &'a str,
    map: &'a ValueMap,
}

impl<'a> Args<'a> {
    pub fn method(&self) -> &'a str {
        self.method
    }

    pub fn raw(&self, name: &str) -> Option<&'a DynamicValue> {
        self.map.get(name).filter(|v| !v.is_null())
    }

    fn missing(&self, name: &str) -> BridgeError {
        BridgeError::MissingParameter {
            method: self.method.to_owned(),
            parameter: name.to_owned(),
        }
    }

    fn wrong_type(&self, name: &str, expected: &'static str, actual: &DynamicValue) -> BridgeError {
        BridgeError::WrongType {
            method: self.method.to_owned(),
            parameter: name.to_owned(),
            expected,
            actual: actual.type_name(),
        }
    }

    fn optional<T>(
        &self,
        name: &str,
        expected: &'static str,
        cast: impl FnOnce(&'a DynamicValue) -> Option<T>,
    ) -> Result<Option<T>> {
        match self.raw(name) {
            None => Ok(None),
            Some(value) => cast(value)
                .map(Some)
                .ok_or_else(|| self.wrong_type(name, expected, value)),
        }
    }

    fn required<T>(
        &self,
        name: &str,
        expected: &'static str,
        cast: impl FnOnce(&'a DynamicValue) -> Option<T>,
    ) -> Result<T> {
        self.optional(name, expected, cast)?
            .ok_or_else(|| self.missing(name))
    }

    pub fn any(&self, name: &str) -> Result<&'a DynamicValue> {
        self.raw(name).ok_or_else(|| self.missing(name))
    }

    pub fn string(&self, name: &str) -> Result<&'a str> {
        self.required(name, "String", DynamicValue::as_str)
    }

    pub fn opt_string(&self, name: &str) -> Result<Option<&'a str>> {
        self.optional(name, "String", DynamicValue::as_str)
    }

    pub fn map(&self, name: &str) -> Result<&'a ValueMap> {
        self.required(name, "Map", DynamicValue::as_map)
    }

    pub fn opt_map(&self, name: &str) -> Result<Option<&'a ValueMap>> {
        self.optional(name, "Map", DynamicValue::as_map)
    }

    pub fn list(&self, name: &str) -> Result<&'a [DynamicValue]> {
        self.required(name, "List", DynamicValue::as_list)
    }

    pub fn bool(&self, name: &str) -> Result<bool> {
        self.required(name, "bool", DynamicValue::as_bool)
    }

    pub fn opt_bool(&self, name: &str) -> Result<Option<bool>> {
        self.optional(name, "bool", DynamicValue::as_bool)
    }

    /// Any integer width, widened to 64 bits.
    pub fn int64(&self, name: &str) -> Result<i64> {
        self.required(name, "int", DynamicValue::as_i64)
    }

    pub fn opt_int64(&self, name: &str) -> Result<Option<i64>> {
        self.optional(name, "int", DynamicValue::as_i64)
    }

    /// Any integer width that fits in 32 bits.
    pub fn int(&self, name: &str) -> Result<i32> {
        self.required(name, "int", |v| v.as_i64().and_then(|i| i32::try_from(i).ok()))
    }

    pub fn opt_double(&self, name: &str) -> Result<Option<f64>> {
        self.optional(name, "double", DynamicValue::as_f64)
    }
}

/// Resolution of one inbound call. Exactly one is produced per call.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodResult {
    Success(DynamicValue),
    Error {
        code: ErrorCode,
        message: String,
        details: Option<DynamicValue>,
    },
    /// The method name is not part of the surface.
    NotImplemented,
}

impl MethodResult {
    /// Structured error carrying the method name in its details.
    pub fn from_error(err: &BridgeError, method: &str) -> Self {
        let mut details = ValueMap::new();
        details.insert("methodName".into(), method.into());
        Self::Error {
            code: err.code(),
            message: err.to_string(),
            details: Some(DynamicValue::Map(details)),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Error { code, .. } => Some(*code),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound callback channels
// ---------------------------------------------------------------------------

/// Identity of one framework engine's channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(pub Uuid);

impl ChannelId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ChannelId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the framework answered to a callback.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelResponse {
    Success(DynamicValue),
    Error {
        code: String,
        message: Option<String>,
        details: Option<DynamicValue>,
    },
    NotImplemented,
}

/// One-shot reply slot for a callback.
pub type Reply = Box<dyn FnOnce(ChannelResponse) + Send>;

/// A framework-side channel this bridge can call back into.
///
/// `invoke_method` must be called on the UI-affine context; the reply may be
/// delivered from any thread, at most once.
pub trait MethodChannel: Send + Sync {
    fn id(&self) -> ChannelId;

    fn invoke_method(&self, method: &str, arguments: DynamicValue, reply: Reply);
}

/// Task posted to the UI-affine context.
pub type Task = Box<dyn FnOnce() + Send>;

/// Executor that runs tasks where the framework expects UI-thread affinity.
pub trait MainThread: Send + Sync {
    fn post(&self, task: Task);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call() -> MethodCall {
        MethodCall::new("startSpan", ValueMap::new())
            .with("operationName", "op")
            .with("spanHandle", 7i32)
            .with("big", i64::MAX)
            .with("parentSpan", DynamicValue::Null)
    }

    #[test]
    fn required_accessors_widen_integers() {
        let call = call();
        let args = call.args();
        assert_eq!(args.string("operationName").expect("string"), "op");
        assert_eq!(args.int64("spanHandle").expect("int64"), 7);
        assert_eq!(args.int("spanHandle").expect("int"), 7);
    }

    #[test]
    fn null_counts_as_absent() {
        let call = call();
        let args = call.args();
        assert_eq!(args.opt_int64("parentSpan").expect("optional"), None);
        assert!(matches!(
            args.int64("parentSpan"),
            Err(BridgeError::MissingParameter { .. })
        ));
    }

    #[test]
    fn wrong_types_are_contract_violations() {
        let call = call();
        let args = call.args();

        let err = args.string("spanHandle").expect_err("not a string");
        assert_eq!(err.code(), ErrorCode::ContractViolation);
        assert!(matches!(err, BridgeError::WrongType { expected: "String", actual: "int", .. }));

        let err = args.opt_map("operationName").expect_err("not a map");
        assert_eq!(err.code(), ErrorCode::ContractViolation);

        let err = args.int("big").expect_err("does not fit in 32 bits");
        assert_eq!(err.code(), ErrorCode::ContractViolation);
    }

    #[test]
    fn error_results_carry_method_name() {
        let err = BridgeError::MissingParameter {
            method: "log".into(),
            parameter: "message".into(),
        };
        let result = MethodResult::from_error(&err, "log");
        let MethodResult::Error { code, details, .. } = result else {
            panic!("expected error");
        };
        assert_eq!(code, ErrorCode::ContractViolation);
        assert_eq!(
            details.as_ref().and_then(|d| d.get("methodName")).and_then(DynamicValue::as_str),
            Some("log")
        );
    }
}
