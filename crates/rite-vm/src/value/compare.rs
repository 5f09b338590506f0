// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Value comparison.
//!
//! [`compare`] is the total order across comparable tags; `None` is the
//! reserved sentinel for undefined comparisons (mismatched tags, NaN).
//! Scripts see the sentinel as `nil` from `<=>`; equality operators
//! degrade to identity.

use crate::platform::MemorySpace;
use crate::value::Value;
use crate::value::heap::{RArray, RRange};
use crate::value::string::string_bytes;
use core::cmp::Ordering;

/// Compare two values.
///
/// Numeric tags promote (`Integer` ↔ `Float`), strings compare
/// byte-lexicographically, symbols by id identity, arrays element-wise
/// with a length tiebreak. Everything else is undefined and yields
/// `None`.
#[must_use]
pub fn compare<M: MemorySpace>(mem: &M, a: Value, b: Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => Some(x.cmp(&y)),
        (Value::Integer(x), Value::Float(y)) => (x as f64).partial_cmp(&y),
        (Value::Float(x), Value::Integer(y)) => x.partial_cmp(&(y as f64)),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(&y),
        (Value::String(x), Value::String(y)) => {
            Some(string_bytes(mem, x).cmp(string_bytes(mem, y)))
        }
        (Value::Symbol(x), Value::Symbol(y)) => (x == y).then_some(Ordering::Equal),
        (Value::Nil, Value::Nil)
        | (Value::True, Value::True)
        | (Value::False, Value::False) => Some(Ordering::Equal),
        (Value::Array(x), Value::Array(y)) => compare_arrays(mem, x, y),
        _ => None,
    }
}

fn compare_arrays<M: MemorySpace>(
    mem: &M,
    a: crate::types::Addr,
    b: crate::types::Addr,
) -> Option<Ordering> {
    if a == b {
        return Some(Ordering::Equal);
    }
    let ha: RArray = mem.read(a);
    let hb: RArray = mem.read(b);
    let elem = core::mem::size_of::<Value>() as u32;

    for i in 0..ha.len.min(hb.len) {
        let x: Value = mem.read(ha.data.add(u32::from(i) * elem));
        let y: Value = mem.read(hb.data.add(u32::from(i) * elem));
        match compare(mem, x, y)? {
            Ordering::Equal => {}
            other => return Some(other),
        }
    }
    Some(ha.len.cmp(&hb.len))
}

/// Script-level equality.
///
/// Comparable tags use [`compare`]; ranges are structural; objects,
/// hashes, procs, classes and handles compare by identity.
#[must_use]
pub fn value_eq<M: MemorySpace>(mem: &M, a: Value, b: Value) -> bool {
    match (a, b) {
        (Value::Range(x), Value::Range(y)) => {
            if x == y {
                return true;
            }
            let rx: RRange = mem.read(x);
            let ry: RRange = mem.read(y);
            rx.exclusive == ry.exclusive
                && value_eq(mem, rx.first, ry.first)
                && value_eq(mem, rx.last, ry.last)
        }
        (Value::Object(x), Value::Object(y))
        | (Value::Hash(x), Value::Hash(y))
        | (Value::Proc(x), Value::Proc(y))
        | (Value::Class(x), Value::Class(y))
        | (Value::Exception(x), Value::Exception(y))
        | (Value::Handle(x), Value::Handle(y)) => x == y,
        _ => compare(mem, a, b) == Some(Ordering::Equal),
    }
}
