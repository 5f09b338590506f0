// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Loader for the RITE02 bytecode container.
//!
//! The loader parses a caller-supplied `.mrb` buffer into a tree of
//! ireps (instruction records). Instruction bytes and pool literals are
//! **borrowed**: the irep stores offsets into the buffer, never copies,
//! so the buffer must outlive every irep loaded from it - the owning
//! [`Task`](crate::runtime::Task) enforces that with its borrow.
//!
//! Each irep is materialized as a single pool block:
//!
//! ```text
//! IrepHeader
//! [u32; plen]   buffer offsets of pool entries (O(1) literal access)
//! [u32; rlen]   pool addresses of child ireps
//! [u16; slen]   interned symbol ids
//! ```
//!
//! All multi-byte fields in the container are big-endian and read
//! byte-wise, so host endianness and alignment never matter. Any parse
//! or allocation failure releases the partially built tree and reports
//! a [`LoadError`]; the pool returns to its pre-load usage.


use crate::bytecode::CATCH_HANDLER_SIZE;
use crate::mem::MemPool;
use crate::platform::MemorySpace;
use crate::symbol::{SymId, SymbolTable};
use crate::types::Addr;

use num_enum::TryFromPrimitive;

/// Container header size: magic/version (8), total size (4), compiler
/// name (4), compiler version (4).
const FILE_HEADER_SIZE: usize = 20;

/// The validated prefix of the header.
const MAGIC: &[u8; 6] = b"RITE02";

/// Section header size: 4-byte tag plus 4-byte total length.
const SECTION_HEADER_SIZE: usize = 8;

/// Bit flagging an irep whose code bytes live in the pool instead of
/// the bytecode buffer (synthesized call frames).
pub const CODE_IN_POOL: u32 = 0x8000_0000;

/// Pool entry tag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum PoolKind {
    /// Length-prefixed string, NUL-terminated.
    Str = 0,
    /// Big-endian i32.
    Int32 = 1,
    /// Static string; same wire layout as `Str`.
    SStr = 2,
    /// Big-endian i64.
    Int64 = 3,
    /// IEEE 754 double, big-endian.
    Float = 5,
}

/// A decoded pool literal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PoolEntry<'a> {
    /// String bytes, borrowed from the bytecode buffer.
    Str(&'a [u8]),
    /// Integer literal.
    Integer(i64),
    /// Float literal.
    Float(f64),
}

/// Why a load failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadError {
    /// The buffer does not start with `RITE02`.
    BadMagic,
    /// A header, section or record ran past the end of the buffer.
    Truncated,
    /// A pool entry carries an unknown tag byte.
    UnknownPoolType(u8),
    /// The symbol intern table is full.
    SymbolOverflow,
    /// The pool cannot hold the irep tree.
    OutOfMemory,
    /// The container holds no `IREP` section.
    MissingIrep,
}

/// Fixed-layout head of an irep's pool block.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct IrepHeader {
    /// Local variable count (register window prefix).
    pub nlocals: u16,
    /// Register window size.
    pub nregs: u16,
    /// Child irep count.
    pub rlen: u16,
    /// Catch handler count.
    pub clen: u16,
    /// Bytecode length in bytes.
    pub ilen: u16,
    /// Pool literal count.
    pub plen: u16,
    /// Symbol table count.
    pub slen: u16,
    /// Buffer offset of the instruction bytes, or a pool address with
    /// [`CODE_IN_POOL`] set.
    pub code: u32,
    /// Buffer offset of the catch handler records.
    pub catches: u32,
}

impl IrepHeader {
    /// Size of the header within the irep block.
    pub const SIZE: u32 = core::mem::size_of::<Self>() as u32;
}

/// Handle to a loaded irep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Irep(pub Addr);

impl Irep {
    /// Read the fixed header.
    #[must_use]
    pub fn header<M: MemorySpace>(self, mem: &M) -> IrepHeader {
        mem.read(self.0)
    }

    fn pool_table(self) -> Addr {
        self.0.add(IrepHeader::SIZE)
    }

    fn child_table<M: MemorySpace>(self, mem: &M) -> Addr {
        let header = self.header(mem);
        self.pool_table().add(u32::from(header.plen) * 4)
    }

    fn sym_table<M: MemorySpace>(self, mem: &M) -> Addr {
        let header = self.header(mem);
        self.child_table(mem).add(u32::from(header.rlen) * 4)
    }

    /// Total block size for the given table counts.
    #[must_use]
    pub const fn block_size(plen: u16, rlen: u16, slen: u16) -> u32 {
        IrepHeader::SIZE + plen as u32 * 4 + rlen as u32 * 4 + slen as u32 * 2
    }

    /// The instruction bytes.
    ///
    /// Resolves against the bytecode buffer, or against the pool for
    /// synthesized frames.
    #[must_use]
    pub fn code<'a, M: MemorySpace>(self, mem: &'a M, buf: &'a [u8]) -> &'a [u8] {
        let header = self.header(mem);
        let len = usize::from(header.ilen);
        if header.code & CODE_IN_POOL != 0 {
            mem.slice(Addr::new(header.code & !CODE_IN_POOL), len)
        } else {
            let start = header.code as usize;
            &buf[start..start + len]
        }
    }

    /// Buffer offset of pool entry `index`'s tag byte.
    #[must_use]
    pub fn pool_offset<M: MemorySpace>(self, mem: &M, index: u16) -> Option<u32> {
        if index >= self.header(mem).plen {
            return None;
        }
        Some(mem.read(self.pool_table().add(u32::from(index) * 4)))
    }

    /// Decode pool entry `index` from the bytecode buffer.
    #[must_use]
    pub fn pool_entry<'a, M: MemorySpace>(
        self,
        mem: &M,
        buf: &'a [u8],
        index: u16,
    ) -> Option<PoolEntry<'a>> {
        let off = self.pool_offset(mem, index)? as usize;
        let kind = PoolKind::try_from(*buf.get(off)?).ok()?;
        let payload = &buf[off + 1..];
        Some(match kind {
            PoolKind::Str | PoolKind::SStr => {
                let len = usize::from(u16::from_be_bytes([payload[0], payload[1]]));
                PoolEntry::Str(&payload[2..2 + len])
            }
            PoolKind::Int32 => {
                let raw = i32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
                PoolEntry::Integer(i64::from(raw))
            }
            PoolKind::Int64 => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&payload[..8]);
                PoolEntry::Integer(i64::from_be_bytes(raw))
            }
            PoolKind::Float => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&payload[..8]);
                PoolEntry::Float(f64::from_be_bytes(raw))
            }
        })
    }

    /// Child irep `index`.
    #[must_use]
    pub fn child<M: MemorySpace>(self, mem: &M, index: u16) -> Option<Self> {
        if index >= self.header(mem).rlen {
            return None;
        }
        let raw: u32 = mem.read(self.child_table(mem).add(u32::from(index) * 4));
        Some(Self(Addr::new(raw)))
    }

    /// Interned symbol `index`.
    #[must_use]
    pub fn sym<M: MemorySpace>(self, mem: &M, index: u16) -> Option<SymId> {
        if index >= self.header(mem).slen {
            return None;
        }
        let raw: u16 = mem.read(self.sym_table(mem).add(u32::from(index) * 2));
        Some(SymId::new(raw))
    }

    /// Catch handler record `index`, decoded from the buffer.
    #[must_use]
    pub fn catch_handler<M: MemorySpace>(
        self,
        mem: &M,
        buf: &[u8],
        index: u16,
    ) -> Option<crate::bytecode::CatchHandler> {
        let header = self.header(mem);
        if index >= header.clen {
            return None;
        }
        let start = header.catches as usize + usize::from(index) * CATCH_HANDLER_SIZE;
        crate::bytecode::read_catch_handler(buf.get(start..start + CATCH_HANDLER_SIZE)?)
    }
}

/// Release an irep tree, returning its pool blocks.
///
/// Children are released before their parent; synthesized code blocks
/// are freed along with the irep that owns them.
pub fn release_irep<M: MemorySpace>(mem: &mut M, pool: &mut MemPool, irep: Irep) {
    let header = irep.header(mem);
    for i in 0..header.rlen {
        if let Some(child) = irep.child(mem, i) {
            if !child.0.is_null() {
                release_irep(mem, pool, child);
            }
        }
    }
    if header.code & CODE_IN_POOL != 0 {
        pool.free(mem, Addr::new(header.code & !CODE_IN_POOL));
    }
    pool.free(mem, irep.0);
}

/// Byte cursor over the container, with explicit truncation errors.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    const fn new(buf: &'a [u8], pos: usize) -> Self {
        Self { buf, pos }
    }

    fn u8(&mut self) -> Result<u8, LoadError> {
        let b = *self.buf.get(self.pos).ok_or(LoadError::Truncated)?;
        self.pos += 1;
        Ok(b)
    }

    fn u16(&mut self) -> Result<u16, LoadError> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn u32(&mut self) -> Result<u32, LoadError> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], LoadError> {
        let end = self.pos.checked_add(n).ok_or(LoadError::Truncated)?;
        let bytes = self.buf.get(self.pos..end).ok_or(LoadError::Truncated)?;
        self.pos = end;
        Ok(bytes)
    }

    fn skip(&mut self, n: usize) -> Result<(), LoadError> {
        self.take(n).map(|_| ())
    }
}

/// Parse a RITE02 container and build its irep tree in the pool.
///
/// On success the root irep is returned; on failure everything built so
/// far has been released.
pub fn load<M: MemorySpace>(
    mem: &mut M,
    pool: &mut MemPool,
    syms: &mut SymbolTable,
    buf: &[u8],
) -> Result<Irep, LoadError> {
    if buf.len() < FILE_HEADER_SIZE {
        return Err(LoadError::Truncated);
    }
    if &buf[..MAGIC.len()] != MAGIC {
        return Err(LoadError::BadMagic);
    }

    let mut offset = FILE_HEADER_SIZE;
    let mut root: Option<Irep> = None;

    while offset + SECTION_HEADER_SIZE <= buf.len() {
        let tag = &buf[offset..offset + 4];
        let mut cursor = Cursor::new(buf, offset + 4);
        let section_len = cursor.u32()? as usize;
        if section_len < SECTION_HEADER_SIZE || offset + section_len > buf.len() {
            if let Some(r) = root {
                release_irep(mem, pool, r);
            }
            return Err(LoadError::Truncated);
        }

        match tag {
            b"IREP" if root.is_none() => {
                let mut cursor = Cursor::new(buf, offset + SECTION_HEADER_SIZE);
                root = Some(parse_irep(mem, pool, syms, &mut cursor)?);
            }
            b"END\0" => break,
            _ => {} // unknown sections are skipped by length
        }
        offset += section_len;
    }

    root.ok_or(LoadError::MissingIrep)
}

/// Parse one irep record (recursively including its children).
fn parse_irep<M: MemorySpace>(
    mem: &mut M,
    pool: &mut MemPool,
    syms: &mut SymbolTable,
    cursor: &mut Cursor<'_>,
) -> Result<Irep, LoadError> {
    let record_start = cursor.pos;
    let record_size = cursor.u32()? as usize;
    if record_size < 4 || record_start + record_size > cursor.buf.len() {
        return Err(LoadError::Truncated);
    }

    let nlocals = cursor.u16()?;
    let nregs = cursor.u16()?;
    let rlen = cursor.u16()?;
    let clen = cursor.u16()?;
    let ilen = cursor.u16()?;

    let code = cursor.pos as u32;
    cursor.skip(usize::from(ilen))?;

    let catches = cursor.pos as u32;
    cursor.skip(usize::from(clen) * CATCH_HANDLER_SIZE)?;

    // First pass over the pool: validate entries and find the end.
    let plen = cursor.u16()?;
    let pool_start = cursor.pos;
    for _ in 0..plen {
        skip_pool_entry(cursor)?;
    }

    // First pass over the symbol table: validate and find the end.
    let slen = cursor.u16()?;
    let sym_start = cursor.pos;
    for _ in 0..slen {
        let len = cursor.u16()?;
        cursor.skip(usize::from(len) + 1)?; // bytes + NUL
    }

    // One block holds header, pool offset table, child table and
    // symbol id table.
    let addr = pool
        .alloc(mem, Irep::block_size(plen, rlen, slen))
        .ok_or(LoadError::OutOfMemory)?;
    let irep = Irep(addr);
    mem.write(
        addr,
        IrepHeader {
            nlocals,
            nregs,
            rlen,
            clen,
            ilen,
            plen,
            slen,
            code,
            catches,
        },
    );
    // Null the child table so a partial tree releases cleanly.
    mem.zero(irep.child_table(mem), usize::from(rlen) * 4);

    // Second pass: record each pool entry's tag offset.
    let mut sub = Cursor::new(cursor.buf, pool_start);
    for i in 0..plen {
        let entry_off = sub.pos as u32;
        mem.write(irep.pool_table().add(u32::from(i) * 4), entry_off);
        if skip_pool_entry(&mut sub).is_err() {
            // Validated in the first pass.
            pool.free(mem, addr);
            return Err(LoadError::Truncated);
        }
    }

    // Second pass: intern each symbol.
    let mut sub = Cursor::new(cursor.buf, sym_start);
    for i in 0..slen {
        let interned = read_symbol_entry(&mut sub).and_then(|name| {
            syms.intern(mem, pool, name)
                .ok_or(LoadError::SymbolOverflow)
        });
        match interned {
            Ok(sym) => mem.write(irep.sym_table(mem).add(u32::from(i) * 2), sym.as_u16()),
            Err(e) => {
                pool.free(mem, addr);
                return Err(e);
            }
        }
    }

    // Children follow the symbol table.
    for i in 0..rlen {
        match parse_irep(mem, pool, syms, cursor) {
            Ok(child) => {
                mem.write(irep.child_table(mem).add(u32::from(i) * 4), child.0.as_u32());
            }
            Err(e) => {
                release_irep(mem, pool, irep);
                return Err(e);
            }
        }
    }

    Ok(irep)
}

/// Read one length-prefixed, NUL-terminated symbol entry.
fn read_symbol_entry<'a>(cursor: &mut Cursor<'a>) -> Result<&'a [u8], LoadError> {
    let len = cursor.u16()?;
    let name = cursor.take(usize::from(len))?;
    cursor.skip(1)?; // NUL
    Ok(name)
}

/// Advance the cursor past one pool entry.
fn skip_pool_entry(cursor: &mut Cursor<'_>) -> Result<(), LoadError> {
    let tag = cursor.u8()?;
    let kind = PoolKind::try_from(tag).map_err(|_| LoadError::UnknownPoolType(tag))?;
    match kind {
        PoolKind::Str | PoolKind::SStr => {
            let len = cursor.u16()?;
            cursor.skip(usize::from(len) + 1) // bytes + NUL
        }
        PoolKind::Int32 => cursor.skip(4),
        PoolKind::Int64 | PoolKind::Float => cursor.skip(8),
    }
}
