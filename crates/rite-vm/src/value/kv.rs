// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Ordered key-value storage.
//!
//! One structure serves instance variable tables (symbol keys) and hash
//! payloads (arbitrary keys): an insertion-ordered pair list with
//! linear-scan lookup. The handle is embedded in its owning payload and
//! addressed by the offset of that field; the pair block is a separate
//! allocation grown by `realloc`.
//!
//! Ownership: `set` takes ownership of key and value (the container
//! holds one count for each); `get` hands out a borrowed copy without
//! touching counts.

use crate::mem::MemPool;
use crate::platform::MemorySpace;
use crate::types::Addr;
use crate::value::{Value, rc, value_eq};

/// Initial pair capacity of a non-empty table.
const INITIAL_CAPA: u16 = 4;

/// An embedded key-value table handle.
#[derive(Clone, Copy, Debug)]
#[repr(C)]
pub struct KvHandle {
    /// Number of live pairs.
    pub len: u16,
    /// Capacity of the pair block, in pairs.
    pub capa: u16,
    /// Pair block, or null while empty.
    pub data: Addr,
}

impl KvHandle {
    /// An empty table.
    pub const EMPTY: Self = Self {
        len: 0,
        capa: 0,
        data: Addr::NULL,
    };
}

/// One stored pair.
#[derive(Clone, Copy, Debug)]
#[repr(C)]
pub struct KvPair {
    /// Lookup key.
    pub key: Value,
    /// Stored value.
    pub value: Value,
}

const PAIR_SIZE: u32 = core::mem::size_of::<KvPair>() as u32;

fn pair_addr(data: Addr, index: u16) -> Addr {
    data.add(u32::from(index) * PAIR_SIZE)
}

/// Number of live pairs in the table at `handle_addr`.
pub fn len<M: MemorySpace>(mem: &M, handle_addr: Addr) -> u16 {
    let handle: KvHandle = mem.read(handle_addr);
    handle.len
}

/// Pair at `index`, or `None` past the end.
pub fn pair_at<M: MemorySpace>(mem: &M, handle_addr: Addr, index: u16) -> Option<KvPair> {
    let handle: KvHandle = mem.read(handle_addr);
    if index >= handle.len {
        return None;
    }
    Some(mem.read(pair_addr(handle.data, index)))
}

/// Look up `key`, handing out a borrowed copy of the stored value.
pub fn get<M: MemorySpace>(mem: &M, handle_addr: Addr, key: Value) -> Option<Value> {
    let handle: KvHandle = mem.read(handle_addr);
    for i in 0..handle.len {
        let pair: KvPair = mem.read(pair_addr(handle.data, i));
        if value_eq(mem, pair.key, key) {
            return Some(pair.value);
        }
    }
    None
}

/// Insert or overwrite `key`. Takes ownership of both `key` and
/// `value`; an overwritten value (and the redundant key) are released.
///
/// Returns `None` on pool exhaustion, in which case key and value are
/// released so nothing leaks.
pub fn set<M: MemorySpace>(
    mem: &mut M,
    pool: &mut MemPool,
    handle_addr: Addr,
    key: Value,
    value: Value,
) -> Option<()> {
    let mut handle: KvHandle = mem.read(handle_addr);

    // Overwrite in place when the key is present.
    for i in 0..handle.len {
        let addr = pair_addr(handle.data, i);
        let pair: KvPair = mem.read(addr);
        if value_eq(mem, pair.key, key) {
            rc::release(mem, pool, pair.value);
            rc::release(mem, pool, key);
            mem.write(addr, KvPair { key: pair.key, value });
            return Some(());
        }
    }

    // Append, growing the pair block when full.
    if handle.len == handle.capa {
        let new_capa = if handle.capa == 0 {
            INITIAL_CAPA
        } else {
            handle.capa.saturating_mul(2)
        };
        let Some(data) = pool.realloc(mem, handle.data, u32::from(new_capa) * PAIR_SIZE) else {
            rc::release(mem, pool, key);
            rc::release(mem, pool, value);
            return None;
        };
        handle.capa = new_capa;
        handle.data = data;
    }

    mem.write(pair_addr(handle.data, handle.len), KvPair { key, value });
    handle.len += 1;
    mem.write(handle_addr, handle);
    Some(())
}

/// Release every pair and the pair block, leaving an empty table.
pub fn clear<M: MemorySpace>(mem: &mut M, pool: &mut MemPool, handle_addr: Addr) {
    let handle: KvHandle = mem.read(handle_addr);
    for i in 0..handle.len {
        let pair: KvPair = mem.read(pair_addr(handle.data, i));
        rc::release(mem, pool, pair.key);
        rc::release(mem, pool, pair.value);
    }
    if !handle.data.is_null() {
        pool.free(mem, handle.data);
    }
    mem.write(handle_addr, KvHandle::EMPTY);
}
