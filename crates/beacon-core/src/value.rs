// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Dynamic call values and the encoder that turns them into native-safe
// attribute trees.
//
// Everything that crosses the channel boundary is converted to or from
// `DynamicValue` exactly once, at the edge. `encode` is total: a value either
// produces an `Encodable` or fails with an `EncodingError` naming the
// offending type and where it sits in the tree.

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{Serialize, Serializer};
use serde_json::Value;
use tracing::warn;

use crate::error::EncodingError;

/// Argument bags and nested maps.
pub type ValueMap = BTreeMap<String, DynamicValue>;

/// Encoded attribute bags handed to the SDK.
pub type Attributes = BTreeMap<String, Encodable>;

// ---------------------------------------------------------------------------
// Numbers
// ---------------------------------------------------------------------------

/// A number tagged with the native width it arrived in.
///
/// Widths are kept so the encoder can map each one onto the matching native
/// primitive; accessors collapse them into one logical integer or float.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
}

impl Number {
    pub fn is_integer(self) -> bool {
        !matches!(self, Self::F32(_) | Self::F64(_))
    }

    /// Integer value, if this is an integer that fits in 64 signed bits.
    pub fn as_i64(self) -> Option<i64> {
        match self {
            Self::I8(v) => Some(v.into()),
            Self::I16(v) => Some(v.into()),
            Self::I32(v) => Some(v.into()),
            Self::I64(v) => Some(v),
            Self::U8(v) => Some(v.into()),
            Self::U16(v) => Some(v.into()),
            Self::U32(v) => Some(v.into()),
            Self::U64(v) => i64::try_from(v).ok(),
            Self::F32(_) | Self::F64(_) => None,
        }
    }

    /// Widening conversion to a double. Integers above 2^53 lose precision.
    pub fn as_f64(self) -> f64 {
        match self {
            Self::I8(v) => v.into(),
            Self::I16(v) => v.into(),
            Self::I32(v) => v.into(),
            Self::I64(v) => v as f64,
            Self::U8(v) => v.into(),
            Self::U16(v) => v.into(),
            Self::U32(v) => v.into(),
            Self::U64(v) => v as f64,
            Self::F32(v) => v.into(),
            Self::F64(v) => v,
        }
    }

    fn type_name(self) -> &'static str {
        if self.is_integer() { "int" } else { "double" }
    }

    fn to_json(self) -> Value {
        match self {
            Self::U64(v) => Value::from(v),
            Self::F32(_) | Self::F64(_) => serde_json::Number::from_f64(self.as_f64())
                .map(Value::Number)
                .unwrap_or(Value::Null),
            other => Value::from(other.as_i64().unwrap_or_default()),
        }
    }
}

impl Serialize for Number {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            Self::I8(v) => serializer.serialize_i8(v),
            Self::I16(v) => serializer.serialize_i16(v),
            Self::I32(v) => serializer.serialize_i32(v),
            Self::I64(v) => serializer.serialize_i64(v),
            Self::U8(v) => serializer.serialize_u8(v),
            Self::U16(v) => serializer.serialize_u16(v),
            Self::U32(v) => serializer.serialize_u32(v),
            Self::U64(v) => serializer.serialize_u64(v),
            Self::F32(v) => serializer.serialize_f32(v),
            Self::F64(v) => serializer.serialize_f64(v),
        }
    }
}

/// Element type of a typed-data block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    U8,
    I16,
    I32,
    I64,
    F32,
    F64,
    /// A tag this bridge does not know how to decode.
    Unknown(u8),
}

impl ElementKind {
    /// Map a message-codec type tag onto an element kind.
    pub fn from_tag(tag: u8) -> Self {
        match tag {
            8 => Self::U8,
            9 => Self::I32,
            10 => Self::I64,
            11 => Self::F64,
            14 => Self::F32,
            other => Self::Unknown(other),
        }
    }

    pub fn type_name(self) -> String {
        match self {
            Self::U8 => "Uint8List".into(),
            Self::I16 => "Int16List".into(),
            Self::I32 => "Int32List".into(),
            Self::I64 => "Int64List".into(),
            Self::F32 => "Float32List".into(),
            Self::F64 => "Float64List".into(),
            Self::Unknown(tag) => format!("TypedData<{tag}>"),
        }
    }
}

// ---------------------------------------------------------------------------
// DynamicValue
// ---------------------------------------------------------------------------

/// A loosely typed value as delivered by the channel transport.
#[derive(Debug, Clone, PartialEq)]
pub enum DynamicValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<DynamicValue>),
    Map(ValueMap),
    /// Raw little-endian bytes plus the element kind they decode to.
    TypedData { kind: ElementKind, bytes: Vec<u8> },
    /// A platform object with no portable shape, carrying its type name.
    Opaque(String),
}

impl DynamicValue {
    /// Descriptive type name used in contract and encoding errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(n) => n.type_name(),
            Self::String(_) => "String",
            Self::List(_) => "List",
            Self::Map(_) => "Map",
            Self::TypedData { .. } => "TypedData",
            Self::Opaque(_) => "Object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    /// Any number, widened to a double.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(n.as_f64()),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[DynamicValue]> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }

    /// Look up a key when this value is a map.
    pub fn get(&self, key: &str) -> Option<&DynamicValue> {
        self.as_map().and_then(|m| m.get(key))
    }

    /// Encode and render as JSON.
    pub fn to_json(&self) -> Result<Value, EncodingError> {
        encode(self).map(|e| e.to_json())
    }
}

impl From<bool> for DynamicValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for DynamicValue {
    fn from(v: i32) -> Self {
        Self::Number(Number::I32(v))
    }
}

impl From<i64> for DynamicValue {
    fn from(v: i64) -> Self {
        Self::Number(Number::I64(v))
    }
}

impl From<u64> for DynamicValue {
    fn from(v: u64) -> Self {
        Self::Number(Number::U64(v))
    }
}

impl From<f64> for DynamicValue {
    fn from(v: f64) -> Self {
        Self::Number(Number::F64(v))
    }
}

impl From<&str> for DynamicValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for DynamicValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<DynamicValue>> for DynamicValue {
    fn from(v: Vec<DynamicValue>) -> Self {
        Self::List(v)
    }
}

impl From<ValueMap> for DynamicValue {
    fn from(v: ValueMap) -> Self {
        Self::Map(v)
    }
}

impl<T: Into<DynamicValue>> From<Option<T>> for DynamicValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

/// Generic view of native data: integers stay integers.
impl From<Value> for DynamicValue {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Number(Number::I64(i))
                } else if let Some(u) = n.as_u64() {
                    Self::Number(Number::U64(u))
                } else {
                    Self::Number(Number::F64(n.as_f64().unwrap_or(f64::NAN)))
                }
            }
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Object(fields) => {
                Self::Map(fields.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Encodable
// ---------------------------------------------------------------------------

/// Strongly typed attribute value accepted by the native SDK.
#[derive(Debug, Clone, PartialEq)]
pub enum Encodable {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<Encodable>),
    Object(Attributes),
}

impl Encodable {
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => n.to_json(),
            Self::String(s) => Value::String(s.clone()),
            Self::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for Encodable {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for Encodable {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<bool> for Encodable {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Encodable {
    fn from(v: i64) -> Self {
        Self::Number(Number::I64(v))
    }
}

impl From<f64> for Encodable {
    fn from(v: f64) -> Self {
        Self::Number(Number::F64(v))
    }
}

impl From<Attributes> for Encodable {
    fn from(v: Attributes) -> Self {
        Self::Object(v)
    }
}

impl Serialize for Encodable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => n.serialize(serializer),
            Self::String(s) => serializer.serialize_str(s),
            Self::Array(items) => serializer.collect_seq(items),
            Self::Object(fields) => serializer.collect_map(fields),
        }
    }
}

// ---------------------------------------------------------------------------
// Encoder
// ---------------------------------------------------------------------------

/// Location inside the value being encoded; rendered only on failure.
#[derive(Clone, Copy)]
enum Path<'a> {
    Root,
    Key(&'a Path<'a>, &'a str),
    Index(&'a Path<'a>, usize),
}

impl fmt::Display for Path<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Path::Root => f.write_str("$"),
            Path::Key(parent, key) => write!(f, "{parent}.{key}"),
            Path::Index(parent, i) => write!(f, "{parent}[{i}]"),
        }
    }
}

/// Encode one value.
///
/// Null map entries are dropped; null list elements are kept so positions
/// survive. Typed-data blocks decode into a flat array of their element kind.
pub fn encode(value: &DynamicValue) -> Result<Encodable, EncodingError> {
    encode_at(value, Path::Root)
}

/// Encode an attribute bag, dropping (and logging) any attribute that cannot
/// be represented instead of failing the whole bag.
pub fn encode_attributes(attributes: &ValueMap) -> Attributes {
    let mut encoded = Attributes::new();
    for (key, value) in attributes {
        if value.is_null() {
            continue;
        }
        match encode_at(value, Path::Key(&Path::Root, key)) {
            Ok(v) => {
                encoded.insert(key.clone(), v);
            }
            Err(e) => {
                warn!(attribute = %key, error = %e, "dropping attribute that cannot be encoded");
            }
        }
    }
    encoded
}

fn encode_at(value: &DynamicValue, path: Path<'_>) -> Result<Encodable, EncodingError> {
    match value {
        DynamicValue::Null => Ok(Encodable::Null),
        DynamicValue::Bool(b) => Ok(Encodable::Bool(*b)),
        DynamicValue::Number(n) => Ok(Encodable::Number(*n)),
        DynamicValue::String(s) => Ok(Encodable::String(s.clone())),
        DynamicValue::List(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| encode_at(item, Path::Index(&path, i)))
            .collect::<Result<Vec<_>, _>>()
            .map(Encodable::Array),
        DynamicValue::Map(fields) => {
            let mut out = Attributes::new();
            for (key, item) in fields {
                if item.is_null() {
                    continue;
                }
                out.insert(key.clone(), encode_at(item, Path::Key(&path, key))?);
            }
            Ok(Encodable::Object(out))
        }
        DynamicValue::TypedData { kind, bytes } => decode_typed(*kind, bytes, path),
        DynamicValue::Opaque(type_name) => Err(EncodingError {
            type_name: type_name.clone(),
            path: path.to_string(),
        }),
    }
}

fn decode_typed(kind: ElementKind, bytes: &[u8], path: Path<'_>) -> Result<Encodable, EncodingError> {
    let failure = || EncodingError {
        type_name: kind.type_name(),
        path: path.to_string(),
    };
    let width = element_width(kind).ok_or_else(failure)?;
    if bytes.len() % width != 0 {
        return Err(failure());
    }

    bytes
        .chunks_exact(width)
        .map(|chunk| decode_element(kind, chunk).map(Encodable::Number))
        .collect::<Option<Vec<_>>>()
        .map(Encodable::Array)
        .ok_or_else(failure)
}

fn element_width(kind: ElementKind) -> Option<usize> {
    match kind {
        ElementKind::U8 => Some(1),
        ElementKind::I16 => Some(2),
        ElementKind::I32 | ElementKind::F32 => Some(4),
        ElementKind::I64 | ElementKind::F64 => Some(8),
        ElementKind::Unknown(_) => None,
    }
}

fn decode_element(kind: ElementKind, chunk: &[u8]) -> Option<Number> {
    Some(match kind {
        ElementKind::U8 => Number::U8(*chunk.first()?),
        ElementKind::I16 => Number::I16(i16::from_le_bytes(chunk.try_into().ok()?)),
        ElementKind::I32 => Number::I32(i32::from_le_bytes(chunk.try_into().ok()?)),
        ElementKind::I64 => Number::I64(i64::from_le_bytes(chunk.try_into().ok()?)),
        ElementKind::F32 => Number::F32(f32::from_le_bytes(chunk.try_into().ok()?)),
        ElementKind::F64 => Number::F64(f64::from_le_bytes(chunk.try_into().ok()?)),
        ElementKind::Unknown(_) => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: Vec<(&str, DynamicValue)>) -> DynamicValue {
        DynamicValue::Map(entries.into_iter().map(|(k, v)| (k.to_owned(), v)).collect())
    }

    #[test]
    fn primitives_encode_directly() {
        assert_eq!(encode(&true.into()), Ok(Encodable::Bool(true)));
        assert_eq!(
            encode(&DynamicValue::Number(Number::I8(-3))),
            Ok(Encodable::Number(Number::I8(-3)))
        );
        assert_eq!(
            encode(&DynamicValue::Number(Number::F32(1.5))),
            Ok(Encodable::Number(Number::F32(1.5)))
        );
        assert_eq!(encode(&"x".into()), Ok(Encodable::String("x".into())));
    }

    #[test]
    fn map_drops_null_entries_but_list_keeps_them() {
        let value = map(vec![
            ("kept", 1i32.into()),
            ("gone", DynamicValue::Null),
            ("list", DynamicValue::List(vec![DynamicValue::Null, 2i32.into()])),
        ]);
        let Encodable::Object(fields) = encode(&value).expect("encode") else {
            panic!("expected object");
        };
        assert!(!fields.contains_key("gone"));
        assert_eq!(
            fields["list"],
            Encodable::Array(vec![Encodable::Null, Encodable::Number(Number::I32(2))])
        );
    }

    #[test]
    fn typed_data_decodes_per_element_kind() {
        let bytes = [1i32, -2, 3]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect::<Vec<_>>();
        let value = DynamicValue::TypedData { kind: ElementKind::I32, bytes };
        assert_eq!(
            encode(&value),
            Ok(Encodable::Array(vec![
                Encodable::Number(Number::I32(1)),
                Encodable::Number(Number::I32(-2)),
                Encodable::Number(Number::I32(3)),
            ]))
        );

        let floats = DynamicValue::TypedData {
            kind: ElementKind::from_tag(11),
            bytes: 2.5f64.to_le_bytes().to_vec(),
        };
        assert_eq!(
            encode(&floats),
            Ok(Encodable::Array(vec![Encodable::Number(Number::F64(2.5))]))
        );
    }

    #[test]
    fn misaligned_or_unknown_typed_data_fails_with_path() {
        let value = map(vec![(
            "blob",
            DynamicValue::TypedData { kind: ElementKind::I64, bytes: vec![0; 5] },
        )]);
        let err = encode(&value).expect_err("misaligned");
        assert_eq!(err.type_name, "Int64List");
        assert_eq!(err.path, "$.blob");

        let unknown = DynamicValue::List(vec![DynamicValue::TypedData {
            kind: ElementKind::from_tag(42),
            bytes: vec![],
        }]);
        let err = encode(&unknown).expect_err("unknown kind");
        assert_eq!(err.type_name, "TypedData<42>");
        assert_eq!(err.path, "$[0]");
    }

    #[test]
    fn opaque_values_fail_with_type_name() {
        let err = encode(&DynamicValue::Opaque("Widget".into())).expect_err("opaque");
        assert_eq!(err.type_name, "Widget");
        assert_eq!(err.path, "$");
    }

    #[test]
    fn attribute_bag_drops_only_the_failing_attribute() {
        let bag: ValueMap = [
            ("ok".to_owned(), DynamicValue::from("fine")),
            ("bad".to_owned(), DynamicValue::Opaque("Socket".into())),
            ("none".to_owned(), DynamicValue::Null),
        ]
        .into_iter()
        .collect();
        let encoded = encode_attributes(&bag);
        assert_eq!(encoded.len(), 1);
        assert_eq!(encoded["ok"], Encodable::String("fine".into()));
    }

    #[test]
    fn nested_structure_survives_json_round_trip() {
        let original = map(vec![
            ("a", 1i64.into()),
            (
                "b",
                DynamicValue::List(vec![true.into(), "x".into(), map(vec![("c", 2.5f64.into())])]),
            ),
        ]);
        let json = serde_json::to_string(&encode(&original).expect("encode")).expect("serialize");
        let parsed: Value = serde_json::from_str(&json).expect("parse");
        let back = DynamicValue::from(parsed);

        let a = back.get("a").expect("a");
        assert_eq!(a.as_i64(), Some(1));
        assert!(matches!(a, DynamicValue::Number(n) if n.is_integer()));

        let b = back.get("b").and_then(DynamicValue::as_list).expect("b");
        assert_eq!(b.len(), 3);
        assert_eq!(b[0].as_bool(), Some(true));
        assert_eq!(b[1].as_str(), Some("x"));
        assert_eq!(b[2].get("c").and_then(DynamicValue::as_f64), Some(2.5));
        assert!(matches!(b[2].get("c"), Some(DynamicValue::Number(n)) if !n.is_integer()));
    }

    #[test]
    fn non_finite_floats_render_as_json_null() {
        let value = DynamicValue::from(f64::INFINITY);
        assert_eq!(value.to_json(), Ok(Value::Null));
    }
}
