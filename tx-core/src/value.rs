//! Dynamically-typed values the VM manipulates.
//!
//! A single tagged enum rather than one Rust type per dynamic kind — one
//! variant per value kind, with explicit, fallible conversions between them
//! instead of `Deref`/`From` coercion.

use crate::address::{Address, ADDRESS_SIZE};
use crate::error::{Error, Result};
use crate::wire::{read_u32, read_u8, read_varbytes, read_varstring, write_varbytes, write_varstring};
use indexmap::IndexMap;
use num_bigint::{BigInt, Sign};
use num_traits::Zero;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum ValueKind {
    Int = 0,
    Bytes = 1,
    Str = 2,
    Bool = 3,
    Timestamp = 4,
    Address = 5,
    Struct = 6,
    Object = 7,
}

impl ValueKind {
    fn from_byte(b: u8) -> Result<Self> {
        Ok(match b {
            0 => Self::Int,
            1 => Self::Bytes,
            2 => Self::Str,
            3 => Self::Bool,
            4 => Self::Timestamp,
            5 => Self::Address,
            6 => Self::Struct,
            7 => Self::Object,
            other => return Err(Error::UnknownValueKind(other)),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Int => "Integer",
            Self::Bytes => "Bytes",
            Self::Str => "String",
            Self::Bool => "Bool",
            Self::Timestamp => "Timestamp",
            Self::Address => "Address",
            Self::Struct => "Struct",
            Self::Object => "Object",
        }
    }
}

/// Ordered mapping from field name to value; fields keep insertion order.
pub type StructFields = IndexMap<String, Value>;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Value {
    Int(BigInt),
    Bytes(Vec<u8>),
    Str(String),
    Bool(bool),
    Timestamp(u32),
    Address(Address),
    Struct(StructFields),
    /// Opaque handle produced by an external/host call; carried but never
    /// interpreted by the VM itself.
    Object(Vec<u8>),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_) => ValueKind::Int,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::Str(_) => ValueKind::Str,
            Value::Bool(_) => ValueKind::Bool,
            Value::Timestamp(_) => ValueKind::Timestamp,
            Value::Address(_) => ValueKind::Address,
            Value::Struct(_) => ValueKind::Struct,
            Value::Object(_) => ValueKind::Object,
        }
    }

    pub fn as_int(&self) -> Result<&BigInt> {
        match self {
            Value::Int(i) => Ok(i),
            other => Err(Error::Coercion(other.kind().name(), "Integer")),
        }
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            Value::Int(i) => Ok(!i.is_zero()),
            other => Err(Error::Coercion(other.kind().name(), "Bool")),
        }
    }

    pub fn as_bytes(&self) -> Result<&[u8]> {
        match self {
            Value::Bytes(b) => Ok(b),
            other => Err(Error::Coercion(other.kind().name(), "Bytes")),
        }
    }

    pub fn as_str(&self) -> Result<&str> {
        match self {
            Value::Str(s) => Ok(s),
            other => Err(Error::Coercion(other.kind().name(), "String")),
        }
    }

    pub fn as_address(&self) -> Result<&Address> {
        match self {
            Value::Address(a) => Ok(a),
            other => Err(Error::Coercion(other.kind().name(), "Address")),
        }
    }

    pub fn as_struct(&self) -> Result<&StructFields> {
        match self {
            Value::Struct(s) => Ok(s),
            other => Err(Error::Coercion(other.kind().name(), "Struct")),
        }
    }

    /// Reads a `Bytes` as an `Integer`: sign-magnitude, little-endian, sign
    /// bit in the highest byte.
    pub fn bytes_to_int(bytes: &[u8]) -> BigInt {
        sign_magnitude_le_to_bigint(bytes)
    }

    pub fn int_to_bytes(value: &BigInt) -> Vec<u8> {
        bigint_to_sign_magnitude_le(value)
    }

    /// Canonical `Struct` → `Bytes`: fields in insertion order, each as
    /// `name(varstring) | type(u8) | payload`.
    pub fn struct_to_bytes(fields: &StructFields) -> Vec<u8> {
        let mut out = Vec::new();
        encode_struct_payload(fields, &mut out);
        out
    }

    /// Canonical byte form used for hashing and cross-value comparison.
    pub fn to_canonical_bytes(&self) -> Vec<u8> {
        let mut out = vec![self.kind() as u8];
        encode_payload(self, &mut out);
        out
    }

    pub fn from_canonical_bytes(buf: &[u8]) -> Result<Self> {
        let mut cursor = 0usize;
        let kind = ValueKind::from_byte(read_u8(buf, &mut cursor)?)?;
        decode_payload(kind, buf, &mut cursor)
    }

    /// Equality is structural and total; ordering comparison is only defined
    /// for `Integer` and `String` — anything else faults the opcode.
    pub fn compare(&self, other: &Self) -> Result<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
            (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
            (a, _) => Err(Error::NotComparable(a.kind().name())),
        }
    }
}

fn encode_payload(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Int(i) => write_varbytes(out, &bigint_to_sign_magnitude_le(i)),
        Value::Bytes(b) => write_varbytes(out, b),
        Value::Str(s) => write_varstring(out, s),
        Value::Bool(b) => out.push(if *b { 1 } else { 0 }),
        Value::Timestamp(t) => out.extend_from_slice(&t.to_le_bytes()),
        Value::Address(a) => out.extend_from_slice(&a.to_bytes()),
        Value::Struct(fields) => encode_struct_payload(fields, out),
        Value::Object(b) => write_varbytes(out, b),
    }
}

fn encode_struct_payload(fields: &StructFields, out: &mut Vec<u8>) {
    out.extend_from_slice(&(fields.len() as u32).to_le_bytes());
    for (name, value) in fields {
        write_varstring(out, name);
        out.push(value.kind() as u8);
        encode_payload(value, out);
    }
}

fn decode_payload(kind: ValueKind, buf: &[u8], cursor: &mut usize) -> Result<Value> {
    Ok(match kind {
        ValueKind::Int => Value::Int(sign_magnitude_le_to_bigint(read_varbytes(buf, cursor)?)),
        ValueKind::Bytes => Value::Bytes(read_varbytes(buf, cursor)?.to_vec()),
        ValueKind::Str => Value::Str(read_varstring(buf, cursor)?),
        ValueKind::Bool => Value::Bool(read_u8(buf, cursor)? != 0),
        ValueKind::Timestamp => {
            Value::Timestamp(read_u32(buf, cursor)?)
        }
        ValueKind::Address => {
            if buf.len() < *cursor + ADDRESS_SIZE {
                return Err(Error::Truncated("address"));
            }
            let addr = Address::from_bytes(&buf[*cursor..*cursor + ADDRESS_SIZE])?;
            *cursor += ADDRESS_SIZE;
            Value::Address(addr)
        }
        ValueKind::Struct => {
            let count = read_u32(buf, cursor)? as usize;
            let mut fields = StructFields::with_capacity(count);
            for _ in 0..count {
                let name = read_varstring(buf, cursor)?;
                let field_kind = ValueKind::from_byte(read_u8(buf, cursor)?)?;
                let field_value = decode_payload(field_kind, buf, cursor)?;
                fields.insert(name, field_value);
            }
            Value::Struct(fields)
        }
        ValueKind::Object => Value::Object(read_varbytes(buf, cursor)?.to_vec()),
    })
}

fn bigint_to_sign_magnitude_le(value: &BigInt) -> Vec<u8> {
    if value.is_zero() {
        return vec![0];
    }
    let (sign, magnitude) = value.to_bytes_le();
    let mut bytes = magnitude;
    if bytes.is_empty() {
        bytes.push(0);
    }
    let top_bit_set = bytes.last().map(|b| b & 0x80 != 0).unwrap_or(false);
    match sign {
        Sign::Minus => {
            if top_bit_set {
                bytes.push(0x80);
            } else {
                *bytes.last_mut().unwrap() |= 0x80;
            }
        }
        _ => {
            if top_bit_set {
                bytes.push(0);
            }
        }
    }
    bytes
}

fn sign_magnitude_le_to_bigint(bytes: &[u8]) -> BigInt {
    if bytes.is_empty() {
        return BigInt::zero();
    }
    let negative = bytes.last().map(|b| b & 0x80 != 0).unwrap_or(false);
    if !negative {
        return BigInt::from_bytes_le(Sign::Plus, bytes);
    }
    let mut magnitude = bytes.to_vec();
    *magnitude.last_mut().unwrap() &= 0x7f;
    let value = BigInt::from_bytes_le(Sign::Plus, &magnitude);
    if value.is_zero() {
        // -0 encodes as a single 0x80 byte; treat as zero rather than panic.
        BigInt::zero()
    } else {
        -value
    }
}
