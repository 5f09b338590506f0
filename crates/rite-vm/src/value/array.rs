// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Array payload operations.
//!
//! The header is stable; elements live in a separate block grown by
//! `realloc`. `push`/`set` take ownership of the stored value, `get`
//! hands out a borrowed copy.

use crate::mem::MemPool;
use crate::platform::MemorySpace;
use crate::types::Addr;
use crate::value::heap::RArray;
use crate::value::{Value, rc};

const ELEM_SIZE: u32 = core::mem::size_of::<Value>() as u32;

/// Growth floor for the element block.
const INITIAL_CAPA: u16 = 4;

fn elem_addr(data: Addr, index: u16) -> Addr {
    data.add(u32::from(index) * ELEM_SIZE)
}

/// Allocate an array with room for `capa` elements.
pub fn array_new<M: MemorySpace>(mem: &mut M, pool: &mut MemPool, capa: u16) -> Option<Value> {
    let data = if capa == 0 {
        Addr::NULL
    } else {
        pool.alloc(mem, u32::from(capa) * ELEM_SIZE)?
    };

    let Some(addr) = pool.alloc(mem, core::mem::size_of::<RArray>() as u32) else {
        if !data.is_null() {
            pool.free(mem, data);
        }
        return None;
    };

    mem.write(
        addr,
        RArray {
            ref_count: 1,
            len: 0,
            capa,
            data,
        },
    );
    Some(Value::Array(addr))
}

/// Number of elements of the array at `addr`.
pub fn array_len<M: MemorySpace>(mem: &M, addr: Addr) -> u16 {
    let header: RArray = mem.read(addr);
    header.len
}

/// Element at `index`, or `None` past the end.
pub fn array_get<M: MemorySpace>(mem: &M, addr: Addr, index: u16) -> Option<Value> {
    let header: RArray = mem.read(addr);
    if index >= header.len {
        return None;
    }
    Some(mem.read(elem_addr(header.data, index)))
}

/// Append a value. Takes ownership; releases the value on OOM.
pub fn array_push<M: MemorySpace>(
    mem: &mut M,
    pool: &mut MemPool,
    addr: Addr,
    value: Value,
) -> Option<()> {
    let mut header: RArray = mem.read(addr);

    if header.len == header.capa {
        let new_capa = if header.capa == 0 {
            INITIAL_CAPA
        } else {
            header.capa.saturating_mul(2)
        };
        let Some(data) = pool.realloc(mem, header.data, u32::from(new_capa) * ELEM_SIZE) else {
            rc::release(mem, pool, value);
            return None;
        };
        header.capa = new_capa;
        header.data = data;
    }

    mem.write(elem_addr(header.data, header.len), value);
    header.len += 1;
    mem.write(addr, header);
    Some(())
}

/// Store a value at `index`, releasing what was there. Gaps created by
/// writing past the end are filled with nil. Takes ownership.
pub fn array_set<M: MemorySpace>(
    mem: &mut M,
    pool: &mut MemPool,
    addr: Addr,
    index: u16,
    value: Value,
) -> Option<()> {
    let header: RArray = mem.read(addr);

    if index < header.len {
        let slot = elem_addr(header.data, index);
        let old: Value = mem.read(slot);
        rc::release(mem, pool, old);
        mem.write(slot, value);
        return Some(());
    }

    for _ in header.len..index {
        array_push(mem, pool, addr, Value::Nil)?;
    }
    array_push(mem, pool, addr, value)
}
