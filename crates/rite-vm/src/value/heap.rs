// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Pool-resident payload layouts.
//!
//! Every non-immediate value points at one of these headers. The first
//! field is always the `u16` reference count. Headers are read and
//! written whole through [`MemorySpace`](crate::MemorySpace); trailing
//! variable-length data (string bytes, array elements) lives directly
//! behind the header or in a separate block the header points at.

use crate::mem::MemPool;
use crate::platform::MemorySpace;
use crate::symbol::SymId;
use crate::types::Addr;
use crate::value::Value;
use crate::value::kv::KvHandle;

/// Byte string header, followed by `len` data bytes and a NUL
/// terminator at `data[len]`. Byte-safe: the content is not validated
/// as UTF-8.
#[derive(Clone, Copy, Debug)]
#[repr(C)]
pub struct RString {
    /// Reference count.
    pub ref_count: u16,
    /// Length of the string in bytes, excluding the terminator.
    pub len: u32,
}

impl RString {
    /// Size of the header in bytes.
    pub const HEADER_SIZE: u32 = core::mem::size_of::<Self>() as u32;

    /// Total allocation size for a string of the given length.
    #[inline]
    #[must_use]
    pub const fn alloc_size(len: u32) -> u32 {
        Self::HEADER_SIZE + len + 1
    }
}

/// Array header. Elements live in a separate block so pushes can
/// `realloc` the data without moving the header other values point at.
#[derive(Clone, Copy, Debug)]
#[repr(C)]
pub struct RArray {
    /// Reference count.
    pub ref_count: u16,
    /// Number of elements.
    pub len: u16,
    /// Capacity of the data block, in elements.
    pub capa: u16,
    /// Element block (`capa * size_of::<Value>()` bytes), or null.
    pub data: Addr,
}

/// Instance header: weak class back-pointer plus the instance variable
/// table. Object teardown does not release the class.
#[derive(Clone, Copy, Debug)]
#[repr(C)]
pub struct RObject {
    /// Reference count.
    pub ref_count: u16,
    /// Class of this instance (weak).
    pub cls: Addr,
    /// Instance variables, keyed by symbol values.
    pub ivar: KvHandle,
}

impl RObject {
    /// Offset of the embedded ivar handle.
    pub const IVAR_OFFSET: u32 = core::mem::offset_of!(Self, ivar) as u32;
}

/// Hash header. Shares the ordered kv structure with instance variable
/// tables; keys are arbitrary values, insertion order is preserved and
/// lookup is a linear scan.
#[derive(Clone, Copy, Debug)]
#[repr(C)]
pub struct RHash {
    /// Reference count.
    pub ref_count: u16,
    /// Key-value entries.
    pub kv: KvHandle,
}

impl RHash {
    /// Offset of the embedded kv handle.
    pub const KV_OFFSET: u32 = core::mem::offset_of!(Self, kv) as u32;
}

/// Range header.
#[derive(Clone, Copy, Debug)]
#[repr(C)]
pub struct RRange {
    /// Reference count.
    pub ref_count: u16,
    /// 1 when the range excludes its end (`...`).
    pub exclusive: u8,
    /// Lower bound.
    pub first: Value,
    /// Upper bound.
    pub last: Value,
}

/// Proc header. The irep reference is weak: ireps are owned by the
/// task's loaded tree, which outlives every proc created from it.
#[derive(Clone, Copy, Debug)]
#[repr(C)]
pub struct RProc {
    /// Reference count.
    pub ref_count: u16,
    /// The compiled body.
    pub irep: Addr,
}

/// Exception header. The class back-pointer is weak, the message is an
/// owned string (or nil).
#[derive(Clone, Copy, Debug)]
#[repr(C)]
pub struct RException {
    /// Reference count.
    pub ref_count: u16,
    /// Exception class (weak).
    pub cls: Addr,
    /// Message string, or nil.
    pub message: Value,
}

/// Class payload. The registry holds one count for every class, so
/// classes are never torn down; the method chain grows by prepending
/// and methods are never unregistered.
#[derive(Clone, Copy, Debug)]
#[repr(C)]
pub struct RClass {
    /// Reference count (pinned by the registry).
    pub ref_count: u16,
    /// Class name.
    pub name: SymId,
    /// Superclass, or null for `Object`.
    pub super_class: Addr,
    /// Head of the method chain, or null.
    pub procs: Addr,
}

/// One link of a class's method chain.
#[derive(Clone, Copy, Debug)]
#[repr(C)]
pub struct MethodNode {
    /// Next method in the chain, or null.
    pub next: Addr,
    /// Method name.
    pub sym: SymId,
    /// Discriminant for `target` (see [`crate::class::MethodKind`]).
    pub kind: u8,
    /// Builtin id, irep address or ivar symbol, depending on `kind`.
    pub target: u32,
}

/// Allocate a range payload. Takes ownership of `first` and `last`.
pub fn range_new<M: MemorySpace>(
    mem: &mut M,
    pool: &mut MemPool,
    first: Value,
    last: Value,
    exclusive: bool,
) -> Option<Value> {
    let addr = pool.alloc(mem, core::mem::size_of::<RRange>() as u32)?;
    mem.write(
        addr,
        RRange {
            ref_count: 1,
            exclusive: u8::from(exclusive),
            first,
            last,
        },
    );
    Some(Value::Range(addr))
}

/// Allocate a proc payload referencing a compiled body.
pub fn proc_new<M: MemorySpace>(mem: &mut M, pool: &mut MemPool, irep: Addr) -> Option<Value> {
    let addr = pool.alloc(mem, core::mem::size_of::<RProc>() as u32)?;
    mem.write(addr, RProc { ref_count: 1, irep });
    Some(Value::Proc(addr))
}

/// Allocate an exception payload. Takes ownership of `message`.
pub fn exception_new<M: MemorySpace>(
    mem: &mut M,
    pool: &mut MemPool,
    cls: Addr,
    message: Value,
) -> Option<Value> {
    let addr = pool.alloc(mem, core::mem::size_of::<RException>() as u32)?;
    mem.write(
        addr,
        RException {
            ref_count: 1,
            cls,
            message,
        },
    );
    Some(Value::Exception(addr))
}
