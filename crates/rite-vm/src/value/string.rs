// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! String payload operations.
//!
//! Strings are byte-safe: content is arbitrary bytes with an explicit
//! length, plus a NUL terminator at `data[len]` for hosts that expect
//! C-style strings in the pool. Concatenation builds fresh strings;
//! payloads are shared freely via refcounts and never mutated.

use crate::mem::MemPool;
use crate::platform::MemorySpace;
use crate::types::Addr;
use crate::value::Value;
use crate::value::heap::RString;

/// Allocate a string from a byte slice.
pub fn string_new<M: MemorySpace>(mem: &mut M, pool: &mut MemPool, bytes: &[u8]) -> Option<Value> {
    if bytes.len() > u32::MAX as usize - 16 {
        return None;
    }
    let len = bytes.len() as u32;
    let addr = pool.alloc(mem, RString::alloc_size(len))?;

    mem.write(addr, RString { ref_count: 1, len });
    let dest = mem.slice_mut(addr.add(RString::HEADER_SIZE), bytes.len() + 1);
    dest[..bytes.len()].copy_from_slice(bytes);
    dest[bytes.len()] = 0;

    Some(Value::String(addr))
}

/// Length in bytes of the string at `addr`.
pub fn string_len<M: MemorySpace>(mem: &M, addr: Addr) -> u32 {
    let header: RString = mem.read(addr);
    header.len
}

/// Borrow the content bytes of the string at `addr`.
pub fn string_bytes<M: MemorySpace>(mem: &M, addr: Addr) -> &[u8] {
    let header: RString = mem.read(addr);
    mem.slice(addr.add(RString::HEADER_SIZE), header.len as usize)
}

/// Byte-wise equality of two string payloads.
pub fn string_eq<M: MemorySpace>(mem: &M, a: Addr, b: Addr) -> bool {
    if a == b {
        return true;
    }
    string_bytes(mem, a) == string_bytes(mem, b)
}

/// Concatenate two string payloads into a fresh string.
pub fn string_add<M: MemorySpace>(
    mem: &mut M,
    pool: &mut MemPool,
    a: Addr,
    b: Addr,
) -> Option<Value> {
    let a_len = string_len(mem, a);
    let b_len = string_len(mem, b);
    let len = a_len.checked_add(b_len)?;

    let addr = pool.alloc(mem, RString::alloc_size(len))?;
    mem.write(addr, RString { ref_count: 1, len });

    let dest = addr.add(RString::HEADER_SIZE);
    mem.copy_within(a.add(RString::HEADER_SIZE), dest, a_len as usize);
    mem.copy_within(b.add(RString::HEADER_SIZE), dest.add(a_len), b_len as usize);
    mem.write::<u8>(dest.add(len), 0);

    Some(Value::String(addr))
}
