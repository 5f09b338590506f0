// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Reference counting.
//!
//! The count is the `u16` leading every payload. `incref` and `release`
//! are no-ops for immediates. Reaching zero dispatches teardown on the
//! value's tag, which recursively releases everything the payload
//! references and returns its blocks to the pool.
//!
//! Weak edges (not counted, not released): an object's class, an
//! exception's class, a proc's irep. Cycles through strong edges leak;
//! that is an accepted property of the design.

use crate::mem::MemPool;
use crate::platform::MemorySpace;
use crate::types::Addr;
use crate::value::heap::{RArray, RException, RHash, RObject, RRange};
use crate::value::{Value, kv};

/// Read a payload's reference count.
#[must_use]
pub fn refcount<M: MemorySpace>(mem: &M, addr: Addr) -> u16 {
    mem.read(addr)
}

/// Add one reference. No-op for immediates.
pub fn incref<M: MemorySpace>(mem: &mut M, value: Value) {
    if let Some(addr) = value.ref_addr() {
        let count: u16 = mem.read(addr);
        mem.write(addr, count.saturating_add(1));
    }
}

/// Drop one reference, tearing the payload down at zero. No-op for
/// immediates.
pub fn release<M: MemorySpace>(mem: &mut M, pool: &mut MemPool, value: Value) {
    let Some(addr) = value.ref_addr() else {
        return;
    };

    let count: u16 = mem.read(addr);
    if count > 1 {
        mem.write(addr, count - 1);
        return;
    }

    teardown(mem, pool, value, addr);
}

fn teardown<M: MemorySpace>(mem: &mut M, pool: &mut MemPool, value: Value, addr: Addr) {
    match value {
        Value::String(_) | Value::Proc(_) | Value::Handle(_) | Value::Class(_) => {
            pool.free(mem, addr);
        }
        Value::Array(_) => {
            let header: RArray = mem.read(addr);
            for i in 0..header.len {
                let elem: Value = mem.read(header.data.add(
                    u32::from(i) * core::mem::size_of::<Value>() as u32,
                ));
                release(mem, pool, elem);
            }
            if !header.data.is_null() {
                pool.free(mem, header.data);
            }
            pool.free(mem, addr);
        }
        Value::Hash(_) => {
            kv::clear(mem, pool, addr.add(RHash::KV_OFFSET));
            pool.free(mem, addr);
        }
        Value::Object(_) => {
            // The class back-pointer is weak; only the ivars are owned.
            kv::clear(mem, pool, addr.add(RObject::IVAR_OFFSET));
            pool.free(mem, addr);
        }
        Value::Range(_) => {
            let header: RRange = mem.read(addr);
            release(mem, pool, header.first);
            release(mem, pool, header.last);
            pool.free(mem, addr);
        }
        Value::Exception(_) => {
            let header: RException = mem.read(addr);
            release(mem, pool, header.message);
            pool.free(mem, addr);
        }
        _ => {}
    }
}
