//! Binary builders shared between integration tests

#![allow(dead_code)]

use wasmload::parser::encoding::*;

/// A function type entry: `0x60 vec(params) vec(results)`.
pub fn func_type(params: &[u8], results: &[u8]) -> Vec<u8> {
    let mut buf = vec![TYPE_FUNC];
    write_u8vec(&mut buf, params);
    write_u8vec(&mut buf, results);
    buf
}

/// A code entry with no locals.
pub fn body(code: &[u8]) -> Vec<u8> {
    let mut entry = vec![0x00];
    entry.extend_from_slice(code);
    let mut buf = vec![];
    write_u8vec(&mut buf, &entry);
    buf
}

/// `vec(entries)` with already encoded entries.
pub fn vector(entries: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = vec![];
    write_vu32(&mut buf, entries.len() as u32);
    for entry in entries {
        buf.extend_from_slice(entry);
    }
    buf
}

pub fn function_import(module: &str, name: &str, type_index: u32) -> Vec<u8> {
    let mut buf = vec![];
    write_name(&mut buf, module);
    write_name(&mut buf, name);
    buf.push(DESC_FUNC);
    write_vu32(&mut buf, type_index);
    buf
}

pub fn function_export(name: &str, index: u32) -> Vec<u8> {
    let mut buf = vec![];
    write_name(&mut buf, name);
    buf.push(DESC_FUNC);
    write_vu32(&mut buf, index);
    buf
}

pub fn custom(name: &str, payload: &[u8]) -> Vec<u8> {
    let mut buf = vec![];
    write_name(&mut buf, name);
    buf.extend_from_slice(payload);
    buf
}

/// One imported and one defined `[] -> []` function, with `exported`
/// function indices exported as "f0", "f1", ...
pub fn imported_and_defined(exported: &[u32]) -> Vec<u8> {
    let exports: Vec<Vec<u8>> = exported
        .iter()
        .enumerate()
        .map(|(i, index)| function_export(&format!("f{}", i), *index))
        .collect();
    module_bytes(&[
        (SECTION_TYPE, vector(&[func_type(&[], &[]), func_type(&[0x7f], &[])])),
        (SECTION_IMPORT, vector(&[function_import("env", "f", 1)])),
        (SECTION_FUNCTION, vector(&[vec![0x00]])),
        (SECTION_EXPORT, vector(&exports)),
        (SECTION_CODE, vector(&[body(&[OP_END])])),
    ])
}
