// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! RITE02 instruction set definitions.
//!
//! Instructions are byte-coded: an opcode byte followed by operands.
//! Operand kinds are `B` (one byte), `S` (big-endian u16) and `W`
//! (big-endian 24-bit). The `EXT1`/`EXT2`/`EXT3` prefix opcodes widen
//! the first, second or both byte operands of the following instruction
//! to 16 bits.


use num_enum::TryFromPrimitive;

/// Opcodes of the RITE02 instruction set.
pub mod op {
    /// No operation.
    pub const NOP: u8 = 0;
    /// `R(a) = R(b)`
    pub const MOVE: u8 = 1;
    /// `R(a) = Pool(b)`
    pub const LOADL: u8 = 2;
    /// `R(a) = b`
    pub const LOADI: u8 = 3;
    /// `R(a) = -b`
    pub const LOADINEG: u8 = 4;
    /// `R(a) = -1`
    pub const LOADI__1: u8 = 5;
    /// `R(a) = 0` (..7 follow contiguously)
    pub const LOADI_0: u8 = 6;
    /// `R(a) = 7`
    pub const LOADI_7: u8 = 13;
    /// `R(a) = s16`
    pub const LOADI16: u8 = 14;
    /// `R(a) = s32`
    pub const LOADI32: u8 = 15;
    /// `R(a) = Syms(b)`
    pub const LOADSYM: u8 = 16;
    /// `R(a) = nil`
    pub const LOADNIL: u8 = 17;
    /// `R(a) = self`
    pub const LOADSELF: u8 = 18;
    /// `R(a) = true`
    pub const LOADT: u8 = 19;
    /// `R(a) = false`
    pub const LOADF: u8 = 20;
    /// `R(a) = getglobal(Syms(b))`
    pub const GETGV: u8 = 21;
    /// `setglobal(Syms(b), R(a))`
    pub const SETGV: u8 = 22;
    /// `R(a) = Special[b]`
    pub const GETSV: u8 = 23;
    /// `Special[b] = R(a)`
    pub const SETSV: u8 = 24;
    /// `R(a) = ivar_get(Syms(b))`
    pub const GETIV: u8 = 25;
    /// `ivar_set(Syms(b), R(a))`
    pub const SETIV: u8 = 26;
    /// `R(a) = cvar_get(Syms(b))`
    pub const GETCV: u8 = 27;
    /// `cvar_set(Syms(b), R(a))`
    pub const SETCV: u8 = 28;
    /// `R(a) = const_get(Syms(b))`
    pub const GETCONST: u8 = 29;
    /// `const_set(Syms(b), R(a))`
    pub const SETCONST: u8 = 30;
    /// `R(a) = R(a)::Syms(b)`
    pub const GETMCNST: u8 = 31;
    /// `R(a)::Syms(b) = R(a+1)`
    pub const SETMCNST: u8 = 32;
    /// `R(a) = uvar_get(b, c)`
    pub const GETUPVAR: u8 = 33;
    /// `uvar_set(b, c, R(a))`
    pub const SETUPVAR: u8 = 34;
    /// `R(a) = R(a)[R(a+1)]`
    pub const GETIDX: u8 = 35;
    /// `R(a)[R(a+1)] = R(a+2)`
    pub const SETIDX: u8 = 36;
    /// `pc += s`
    pub const JMP: u8 = 37;
    /// `if R(a) then pc += s`
    pub const JMPIF: u8 = 38;
    /// `unless R(a) then pc += s`
    pub const JMPNOT: u8 = 39;
    /// `if R(a).nil? then pc += s`
    pub const JMPNIL: u8 = 40;
    /// `pc += s` (unwinding through ensure clauses)
    pub const JMPUW: u8 = 41;
    /// `R(a) = exc` (clears the pending exception)
    pub const EXCEPT: u8 = 42;
    /// `R(b) = R(a).kind_of?(R(b))`
    pub const RESCUE: u8 = 43;
    /// `raise(R(a)) if R(a)` is an exception
    pub const RAISEIF: u8 = 44;
    /// `R(a) = self.send(Syms(b), R(a+1)..R(a+c))`
    pub const SSEND: u8 = 45;
    /// `SSEND` with a block in `R(a+c+1)`
    pub const SSENDB: u8 = 46;
    /// `R(a) = R(a).send(Syms(b), R(a+1)..R(a+c))`
    pub const SEND: u8 = 47;
    /// `SEND` with a block in `R(a+c+1)`
    pub const SENDB: u8 = 48;
    /// Proc body entry (self is the proc).
    pub const CALL: u8 = 49;
    /// `R(a) = super(R(a+1)..)`
    pub const SUPER: u8 = 50;
    /// `R(a) = argument array (b: flags)`
    pub const ARGARY: u8 = 51;
    /// Arity check and optional-argument dispatch.
    pub const ENTER: u8 = 52;
    /// `R(a) = kdict.key?(Syms(b))`
    pub const KEY_P: u8 = 53;
    /// Raise unless kdict is empty.
    pub const KEYEND: u8 = 54;
    /// `R(a) = kdict[Syms(b)]; kdict.delete(Syms(b))`
    pub const KARG: u8 = 55;
    /// `return R(a)`
    pub const RETURN: u8 = 56;
    /// `return R(a)` (in-block return)
    pub const RETURN_BLK: u8 = 57;
    /// `break R(a)`
    pub const BREAK: u8 = 58;
    /// `R(a) = block`
    pub const BLKPUSH: u8 = 59;
    /// `R(a) = R(a) + R(a+1)`
    pub const ADD: u8 = 60;
    /// `R(a) = R(a) + b`
    pub const ADDI: u8 = 61;
    /// `R(a) = R(a) - R(a+1)`
    pub const SUB: u8 = 62;
    /// `R(a) = R(a) - b`
    pub const SUBI: u8 = 63;
    /// `R(a) = R(a) * R(a+1)`
    pub const MUL: u8 = 64;
    /// `R(a) = R(a) / R(a+1)`
    pub const DIV: u8 = 65;
    /// `R(a) = R(a) == R(a+1)`
    pub const EQ: u8 = 66;
    /// `R(a) = R(a) < R(a+1)`
    pub const LT: u8 = 67;
    /// `R(a) = R(a) <= R(a+1)`
    pub const LE: u8 = 68;
    /// `R(a) = R(a) > R(a+1)`
    pub const GT: u8 = 69;
    /// `R(a) = R(a) >= R(a+1)`
    pub const GE: u8 = 70;
    /// `R(a) = ary_new(R(a)..R(a+b-1))`
    pub const ARRAY: u8 = 71;
    /// `R(a) = ary_new(R(b)..R(b+c-1))`
    pub const ARRAY2: u8 = 72;
    /// `ary_cat(R(a), R(a+1))`
    pub const ARYCAT: u8 = 73;
    /// `ary_push(R(a), R(a+1))`
    pub const ARYPUSH: u8 = 74;
    /// `R(a) = ary_dup(R(a))`
    pub const ARYDUP: u8 = 75;
    /// `R(a) = R(b)[c]`
    pub const AREF: u8 = 76;
    /// `R(b)[c] = R(a)`
    pub const ASET: u8 = 77;
    /// `*R(a),R(a+1)..R(a+c) = R(a)[b..]`
    pub const APOST: u8 = 78;
    /// `R(a) = intern(R(a))`
    pub const INTERN: u8 = 79;
    /// `R(a) = str_dup(Pool(b))`
    pub const STRING: u8 = 80;
    /// `str_cat(R(a), R(a+1))`
    pub const STRCAT: u8 = 81;
    /// `R(a) = hash_new(R(a), b)` (b key-value pairs)
    pub const HASH: u8 = 82;
    /// `R(a) = hash_push(R(a), b)` (b more pairs)
    pub const HASHADD: u8 = 83;
    /// `R(a) = hash_cat(R(a), R(a+1))`
    pub const HASHCAT: u8 = 84;
    /// `R(a) = lambda(Irep(b))`
    pub const LAMBDA: u8 = 85;
    /// `R(a) = block(Irep(b))`
    pub const BLOCK: u8 = 86;
    /// `R(a) = method(Irep(b))`
    pub const METHOD: u8 = 87;
    /// `R(a) = range_new(R(a), R(a+1), false)`
    pub const RANGE_INC: u8 = 88;
    /// `R(a) = range_new(R(a), R(a+1), true)`
    pub const RANGE_EXC: u8 = 89;
    /// `R(a) = ::Object`
    pub const OCLASS: u8 = 90;
    /// `R(a) = newclass(Syms(b), super: R(a+1))`
    pub const CLASS: u8 = 91;
    /// `R(a) = newmodule(Syms(b))`
    pub const MODULE: u8 = 92;
    /// `R(a) = exec(R(a), Irep(b))` (class body)
    pub const EXEC: u8 = 93;
    /// `R(a).define_method(Syms(b), R(a+1))`
    pub const DEF: u8 = 94;
    /// `alias_method(Syms(a), Syms(b))`
    pub const ALIAS: u8 = 95;
    /// `undef_method(Syms(a))`
    pub const UNDEF: u8 = 96;
    /// `R(a) = R(a).singleton_class`
    pub const SCLASS: u8 = 97;
    /// `R(a) = target_class`
    pub const TCLASS: u8 = 98;
    /// Debug hook (three operands, ignored).
    pub const DEBUG: u8 = 99;
    /// Raise with message `Pool(a)`.
    pub const ERR: u8 = 100;
    /// Widen the next instruction's first operand to 16 bits.
    pub const EXT1: u8 = 101;
    /// Widen the next instruction's second operand to 16 bits.
    pub const EXT2: u8 = 102;
    /// Widen the next instruction's first two operands to 16 bits.
    pub const EXT3: u8 = 103;
    /// Stop the task.
    pub const STOP: u8 = 104;
}

/// Size of one catch-handler record in an irep.
pub const CATCH_HANDLER_SIZE: usize = 13;

/// Catch-handler kind byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum CatchKind {
    /// `rescue` clause.
    Rescue = 0,
    /// `ensure` clause.
    Ensure = 1,
}

/// A decoded catch-handler record: bytecode range and handler target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatchHandler {
    /// Handler kind.
    pub kind: CatchKind,
    /// Start of the protected range (inclusive).
    pub begin: u32,
    /// End of the protected range (exclusive).
    pub end: u32,
    /// Bytecode offset execution resumes at.
    pub target: u32,
}

/// Decode one 13-byte catch-handler record.
#[must_use]
pub fn read_catch_handler(bytes: &[u8]) -> Option<CatchHandler> {
    if bytes.len() < CATCH_HANDLER_SIZE {
        return None;
    }
    Some(CatchHandler {
        kind: CatchKind::try_from(bytes[0]).ok()?,
        begin: u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]),
        end: u32::from_be_bytes([bytes[5], bytes[6], bytes[7], bytes[8]]),
        target: u32::from_be_bytes([bytes[9], bytes[10], bytes[11], bytes[12]]),
    })
}

/// Fetch one operand byte, advancing `pc`.
#[inline]
pub fn fetch_b(code: &[u8], pc: &mut usize) -> Option<u8> {
    let b = *code.get(*pc)?;
    *pc += 1;
    Some(b)
}

/// Fetch a big-endian u16 operand, advancing `pc`.
#[inline]
pub fn fetch_s(code: &[u8], pc: &mut usize) -> Option<u16> {
    let hi = *code.get(*pc)?;
    let lo = *code.get(*pc + 1)?;
    *pc += 2;
    Some(u16::from_be_bytes([hi, lo]))
}

/// Fetch a big-endian 24-bit operand, advancing `pc`.
#[inline]
pub fn fetch_w(code: &[u8], pc: &mut usize) -> Option<u32> {
    let b0 = *code.get(*pc)?;
    let b1 = *code.get(*pc + 1)?;
    let b2 = *code.get(*pc + 2)?;
    *pc += 3;
    Some(u32::from(b0) << 16 | u32::from(b1) << 8 | u32::from(b2))
}

/// Fetch a byte operand widened to 16 bits by an EXT prefix.
#[inline]
pub fn fetch_b_ext(code: &[u8], pc: &mut usize, wide: bool) -> Option<u16> {
    if wide {
        fetch_s(code, pc)
    } else {
        fetch_b(code, pc).map(u16::from)
    }
}
