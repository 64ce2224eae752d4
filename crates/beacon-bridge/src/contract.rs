// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-surface contract tables: the required parameters of every method.
//
// Tables are static and read-only. They drive production validation and
// double as fixture generators, so positive and negative calls are built from
// the same placeholder-per-kind rule.

use beacon_core::error::{BridgeError, Result};
use beacon_core::value::{DynamicValue, ValueMap};

/// Coarse runtime type of a required parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    String,
    Map,
    /// Integer that must fit in 32 bits.
    Int,
    /// Integer of any width.
    Int64,
    Bool,
    List,
    /// Any non-null value.
    Any,
}

impl ParameterKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Map => "Map",
            Self::Int => "int",
            Self::Int64 => "int",
            Self::Bool => "bool",
            Self::List => "List",
            Self::Any => "Object",
        }
    }

    pub fn matches(self, value: &DynamicValue) -> bool {
        match self {
            Self::String => value.as_str().is_some(),
            Self::Map => value.as_map().is_some(),
            Self::Int => value.as_i64().is_some_and(|i| i32::try_from(i).is_ok()),
            Self::Int64 => value.as_i64().is_some(),
            Self::Bool => value.as_bool().is_some(),
            Self::List => value.as_list().is_some(),
            Self::Any => !value.is_null(),
        }
    }

    /// Deterministic value of this kind used to fill generated calls.
    pub fn placeholder(self) -> DynamicValue {
        match self {
            Self::String => "fake_string".into(),
            Self::Map => DynamicValue::Map(ValueMap::new()),
            Self::Int => 10i32.into(),
            Self::Int64 => 100i64.into(),
            Self::Bool => false.into(),
            Self::List => DynamicValue::List(Vec::new()),
            Self::Any => "fake_value".into(),
        }
    }

    /// A value that is deliberately not of this kind.
    ///
    /// `Any` accepts everything non-null, so it has no mismatch.
    pub fn mismatch(self) -> Option<DynamicValue> {
        match self {
            Self::String | Self::Map | Self::List => Some(42i32.into()),
            Self::Int | Self::Int64 | Self::Bool => Some("not_a_number".into()),
            Self::Any => None,
        }
    }
}

/// Required parameters of one method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contract {
    pub method: &'static str,
    pub required: &'static [(&'static str, ParameterKind)],
}

impl Contract {
    pub const fn new(method: &'static str, required: &'static [(&'static str, ParameterKind)]) -> Self {
        Self { method, required }
    }

    /// Check presence and type of every required parameter.
    pub fn validate(&self, arguments: &ValueMap) -> Result<()> {
        for &(name, kind) in self.required {
            match arguments.get(name).filter(|v| !v.is_null()) {
                None => {
                    return Err(BridgeError::MissingParameter {
                        method: self.method.to_owned(),
                        parameter: name.to_owned(),
                    });
                }
                Some(value) if !kind.matches(value) => {
                    return Err(BridgeError::WrongType {
                        method: self.method.to_owned(),
                        parameter: name.to_owned(),
                        expected: kind.name(),
                        actual: value.type_name(),
                    });
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Fill every required parameter with its placeholder, except `excluding`.
    pub fn instantiate(&self, excluding: Option<&str>) -> ValueMap {
        self.required
            .iter()
            .filter(|(name, _)| Some(*name) != excluding)
            .map(|&(name, kind)| (name.to_owned(), kind.placeholder()))
            .collect()
    }
}

/// Every contract of one surface.
#[derive(Debug, Clone, Copy)]
pub struct ContractTable {
    pub surface: &'static str,
    contracts: &'static [Contract],
}

impl ContractTable {
    pub const fn new(surface: &'static str, contracts: &'static [Contract]) -> Self {
        Self { surface, contracts }
    }

    pub fn lookup(&self, method: &str) -> Option<&'static Contract> {
        self.contracts.iter().find(|c| c.method == method)
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static Contract> {
        self.contracts.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::error::ErrorCode;

    const LOG: Contract = Contract::new(
        "log",
        &[
            ("loggerHandle", ParameterKind::String),
            ("message", ParameterKind::String),
            ("context", ParameterKind::Map),
        ],
    );

    #[test]
    fn instantiated_contract_validates() {
        let args = LOG.instantiate(None);
        assert_eq!(args.len(), 3);
        LOG.validate(&args).expect("complete call");
    }

    #[test]
    fn excluded_parameter_is_reported_missing() {
        for &(name, _) in LOG.required {
            let args = LOG.instantiate(Some(name));
            let err = LOG.validate(&args).expect_err("missing parameter");
            assert_eq!(err.code(), ErrorCode::ContractViolation);
            assert!(err.to_string().contains(name), "{err}");
            assert!(err.to_string().contains("log"), "{err}");
        }
    }

    #[test]
    fn mismatched_kinds_are_rejected() {
        let mut args = LOG.instantiate(None);
        args.insert("message".into(), ParameterKind::String.mismatch().expect("mismatch"));
        assert!(matches!(
            LOG.validate(&args),
            Err(BridgeError::WrongType { parameter, .. }) if parameter == "message"
        ));
    }

    #[test]
    fn int_kind_rejects_values_wider_than_32_bits() {
        assert!(ParameterKind::Int.matches(&7i64.into()));
        assert!(!ParameterKind::Int.matches(&i64::MAX.into()));
        assert!(ParameterKind::Int64.matches(&i64::MAX.into()));
    }

    #[test]
    fn table_lookup_by_method() {
        const TABLE: ContractTable = ContractTable::new("logs", &[LOG]);
        assert_eq!(TABLE.lookup("log"), Some(&LOG));
        assert!(TABLE.lookup("nope").is_none());
        assert_eq!(TABLE.iter().count(), 1);
    }
}
