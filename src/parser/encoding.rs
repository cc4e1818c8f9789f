//! Binary format constants and encoding primitives.
//!
//! The constants name the bytes the decoders match on. The writers append
//! LEB128 integers, IEEE 754 floats, names and whole sections to a
//! caller-provided `&mut Vec<u8>`, which is how tests, benches and fuzz
//! seeds assemble modules.

use byteorder::{ByteOrder, LittleEndian};

// ---------------------------------------------------------------------------
// Module header
// ---------------------------------------------------------------------------

pub const MAGIC: [u8; 4] = [0x00, 0x61, 0x73, 0x6d];
pub const VERSION_1: u32 = 1;
pub const HEADER_LEN: usize = 8;

// ---------------------------------------------------------------------------
// Section ids
// ---------------------------------------------------------------------------

pub const SECTION_CUSTOM: u8 = 0;
pub const SECTION_TYPE: u8 = 1;
pub const SECTION_IMPORT: u8 = 2;
pub const SECTION_FUNCTION: u8 = 3;
pub const SECTION_TABLE: u8 = 4;
pub const SECTION_MEMORY: u8 = 5;
pub const SECTION_GLOBAL: u8 = 6;
pub const SECTION_EXPORT: u8 = 7;
pub const SECTION_START: u8 = 8;
pub const SECTION_ELEMENT: u8 = 9;
pub const SECTION_CODE: u8 = 10;
pub const SECTION_DATA: u8 = 11;
pub const SECTION_DATA_COUNT: u8 = 12;
pub const SECTION_TAG: u8 = 13;

// Type constructors
pub const TYPE_FUNC: u8 = 0x60;

// Import/export descriptor kinds
pub const DESC_FUNC: u8 = 0x00;
pub const DESC_TABLE: u8 = 0x01;
pub const DESC_MEMORY: u8 = 0x02;
pub const DESC_GLOBAL: u8 = 0x03;
pub const DESC_TAG: u8 = 0x04;

// Limits flags: bit 0 = has max, bit 1 = shared, bit 2 = 64-bit index
pub const LIMITS_HAS_MAX: u8 = 0x01;
pub const LIMITS_SHARED: u8 = 0x02;
pub const LIMITS_INDEX64: u8 = 0x04;

// Global mutability
pub const MUT_CONST: u8 = 0x00;
pub const MUT_VAR: u8 = 0x01;

// Exception tag attribute
pub const TAG_ATTRIBUTE_EXCEPTION: u8 = 0x00;

// Element segment elemkind
pub const ELEMKIND_FUNCREF: u8 = 0x00;

// Element segment flags
// bit 0 = non-active mode, bit 1 = explicit table (or declarative), bit 2 = expressions
pub const ELEM_ACTIVE_FUNCS: u32 = 0;
pub const ELEM_PASSIVE_FUNCS: u32 = 1;
pub const ELEM_ACTIVE_TABLE_FUNCS: u32 = 2;
pub const ELEM_DECLARATIVE_FUNCS: u32 = 3;
pub const ELEM_ACTIVE_EXPRS: u32 = 4;
pub const ELEM_PASSIVE_EXPRS: u32 = 5;
pub const ELEM_ACTIVE_TABLE_EXPRS: u32 = 6;
pub const ELEM_DECLARATIVE_EXPRS: u32 = 7;

// Data segment flags
pub const DATA_ACTIVE: u32 = 0;
pub const DATA_PASSIVE: u32 = 1;
pub const DATA_ACTIVE_EXPLICIT: u32 = 2;

// ---------------------------------------------------------------------------
// Constant expression opcodes
// ---------------------------------------------------------------------------

pub const OP_END: u8 = 0x0b;
pub const OP_GLOBAL_GET: u8 = 0x23;
pub const OP_I32_CONST: u8 = 0x41;
pub const OP_I64_CONST: u8 = 0x42;
pub const OP_F32_CONST: u8 = 0x43;
pub const OP_F64_CONST: u8 = 0x44;
pub const OP_I32_ADD: u8 = 0x6a;
pub const OP_I32_SUB: u8 = 0x6b;
pub const OP_I32_MUL: u8 = 0x6c;
pub const OP_I64_ADD: u8 = 0x7c;
pub const OP_I64_SUB: u8 = 0x7d;
pub const OP_I64_MUL: u8 = 0x7e;
pub const OP_REF_NULL: u8 = 0xd0;
pub const OP_REF_FUNC: u8 = 0xd2;
pub const OP_PREFIX_SIMD: u8 = 0xfd;
pub const SIMD_V128_CONST: u32 = 12;

// ---------------------------------------------------------------------------
// Name section
// ---------------------------------------------------------------------------

pub const NAME_SECTION: &str = "name";
pub const NAME_MODULE: u8 = 0;
pub const NAME_FUNCTION: u8 = 1;
pub const NAME_LOCAL: u8 = 2;

// ---------------------------------------------------------------------------
// LEB128
// ---------------------------------------------------------------------------

fn write_vu(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            return;
        }
        buf.push(byte | 0x80);
    }
}

fn write_vs(buf: &mut Vec<u8>, mut value: i64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        let done = (value == 0 && byte & 0x40 == 0) || (value == -1 && byte & 0x40 != 0);
        if done {
            buf.push(byte);
            return;
        }
        buf.push(byte | 0x80);
    }
}

pub fn write_vu32(buf: &mut Vec<u8>, v: u32) {
    write_vu(buf, u64::from(v));
}

pub fn write_vu64(buf: &mut Vec<u8>, v: u64) {
    write_vu(buf, v);
}

pub fn write_vs32(buf: &mut Vec<u8>, v: i32) {
    write_vs(buf, i64::from(v));
}

pub fn write_vs64(buf: &mut Vec<u8>, v: i64) {
    write_vs(buf, v);
}

// ---------------------------------------------------------------------------
// Fixed width values
// ---------------------------------------------------------------------------

pub fn write_f32(buf: &mut Vec<u8>, v: f32) {
    let mut bytes = [0u8; 4];
    LittleEndian::write_f32(&mut bytes, v);
    buf.extend_from_slice(&bytes);
}

pub fn write_f64(buf: &mut Vec<u8>, v: f64) {
    let mut bytes = [0u8; 8];
    LittleEndian::write_f64(&mut bytes, v);
    buf.extend_from_slice(&bytes);
}

pub fn write_v128(buf: &mut Vec<u8>, v: [u8; 16]) {
    buf.extend_from_slice(&v);
}

// ---------------------------------------------------------------------------
// Vectors, names and sections
// ---------------------------------------------------------------------------

/// Appends a length-prefixed byte vector.
pub fn write_u8vec(buf: &mut Vec<u8>, v: &[u8]) {
    write_vu32(buf, v.len() as u32);
    buf.extend_from_slice(v);
}

pub fn write_name(buf: &mut Vec<u8>, name: &str) {
    write_u8vec(buf, name.as_bytes());
}

/// Appends the magic and a little-endian version word.
pub fn write_header(buf: &mut Vec<u8>, version: u32) {
    buf.extend_from_slice(&MAGIC);
    let mut bytes = [0u8; 4];
    LittleEndian::write_u32(&mut bytes, version);
    buf.extend_from_slice(&bytes);
}

/// Appends `id`, the payload size and the payload.
pub fn write_section(buf: &mut Vec<u8>, id: u8, payload: &[u8]) {
    buf.push(id);
    write_u8vec(buf, payload);
}

pub fn write_custom_section(buf: &mut Vec<u8>, name: &str, payload: &[u8]) {
    let mut body = Vec::with_capacity(name.len() + payload.len() + 1);
    write_name(&mut body, name);
    body.extend_from_slice(payload);
    write_section(buf, SECTION_CUSTOM, &body);
}

/// A version 1 module built from `(id, payload)` pairs, in order.
pub fn module_bytes(sections: &[(u8, Vec<u8>)]) -> Vec<u8> {
    let mut buf = Vec::new();
    write_header(&mut buf, VERSION_1);
    for (id, payload) in sections {
        write_section(&mut buf, *id, payload);
    }
    buf
}
