//! Per-section decoders. Each `decode` consumes one section payload from a
//! reader bounded to that section and appends to the module.

pub mod code;
pub mod custom;
pub mod data;
pub mod data_count;
pub mod element;
pub mod export;
pub mod function;
pub mod global;
pub mod import;
pub mod memory;
pub mod start;
pub mod table;
pub mod tag;
pub mod type_section;

use crate::features::Capabilities;
use crate::parser::encoding::*;
use crate::parser::error::{ErrorKind, IndexSpace, ParseError, Result};
use crate::parser::limits::{MAX_MEMORY_PAGES_32, MAX_MEMORY_PAGES_64};
use crate::parser::module::Module;
use crate::parser::reader::Reader;
use crate::parser::types::{GlobalType, IndexType, Limits, MemoryType, RefType, TableType, TagType, ValueType};
use crate::parser::ParseContext;

/// Reads a vector length and checks it against a configured cap.
pub(crate) fn read_count(reader: &mut Reader<'_>, what: &'static str, limit: u32) -> Result<u32> {
    let at = reader.pos();
    let count = reader.read_vu32()?;
    if count > limit {
        return Err(ParseError::with_range(
            ErrorKind::LimitExceeded {
                what,
                count: u64::from(count),
                limit: u64::from(limit),
            },
            at,
            reader.pos(),
        ));
    }
    Ok(count)
}

/// Preallocation for `count` entries that each take at least one byte.
pub(crate) fn capacity(count: u32, reader: &Reader<'_>) -> usize {
    (count as usize).min(reader.remaining())
}

pub(crate) fn read_value_type(reader: &mut Reader<'_>, caps: &Capabilities) -> Result<ValueType> {
    let at = reader.pos();
    let byte = reader.read_byte()?;
    match ValueType::from_byte(byte) {
        Some(value_type) if caps.allows_value_type(value_type) => Ok(value_type),
        _ => Err(ParseError::new(ErrorKind::UnsupportedValueType(byte), at)),
    }
}

pub fn read_ref_type(reader: &mut Reader<'_>, caps: &Capabilities) -> Result<RefType> {
    let at = reader.pos();
    let byte = reader.read_byte()?;
    match RefType::from_byte(byte) {
        Some(ref_type) if caps.allows_ref_type(ref_type) => Ok(ref_type),
        Some(_) => Err(ParseError::new(ErrorKind::UnsupportedValueType(byte), at)),
        None => Err(ParseError::new(ErrorKind::IllegalRefType(byte), at)),
    }
}

fn check_limits(min: u64, max: Option<u64>, at: usize) -> Result<Limits> {
    if let Some(max) = max {
        if min > max {
            return Err(ParseError::new(ErrorKind::LimitsMinExceedsMax { min, max }, at));
        }
    }
    Ok(Limits { min, max })
}

pub(crate) fn read_table_type(reader: &mut Reader<'_>, caps: &Capabilities) -> Result<TableType> {
    let ref_type = read_ref_type(reader, caps)?;
    let at = reader.pos();
    let flags = reader.read_byte()?;
    let min = reader.read_vu32()?;
    let max = match flags {
        0 => None,
        LIMITS_HAS_MAX => Some(reader.read_vu32()?),
        _ => return Err(ParseError::new(ErrorKind::IllegalLimitsFlag(flags), at)),
    };
    let limits = check_limits(u64::from(min), max.map(u64::from), at)?;
    Ok(TableType { ref_type, limits })
}

fn read_page_count(reader: &mut Reader<'_>, index_type: IndexType) -> Result<u64> {
    match index_type {
        IndexType::I32 => reader.read_vu32().map(u64::from),
        IndexType::I64 => reader.read_vu64(),
    }
}

pub(crate) fn read_memory_type(reader: &mut Reader<'_>, ctx: &ParseContext<'_>) -> Result<MemoryType> {
    let caps = ctx.caps();
    let at = reader.pos();
    let flags = reader.read_byte()?;
    if flags & !(LIMITS_HAS_MAX | LIMITS_SHARED | LIMITS_INDEX64) != 0 {
        return Err(ParseError::new(ErrorKind::IllegalLimitsFlag(flags), at));
    }
    let has_max = flags & LIMITS_HAS_MAX != 0;
    let shared = flags & LIMITS_SHARED != 0;
    let index_type = if flags & LIMITS_INDEX64 != 0 {
        if !caps.memory64 {
            return Err(ParseError::new(ErrorKind::FeatureDisabled("64-bit memory"), at));
        }
        IndexType::I64
    } else {
        IndexType::I32
    };
    if shared {
        if !caps.threads {
            return Err(ParseError::new(ErrorKind::FeatureDisabled("shared memory"), at));
        }
        if !has_max {
            return Err(ParseError::new(ErrorKind::SharedMemoryRequiresMax, at));
        }
    }

    let bound = match index_type {
        IndexType::I32 => MAX_MEMORY_PAGES_32,
        IndexType::I64 => MAX_MEMORY_PAGES_64,
    };
    let min_at = reader.pos();
    let min = read_page_count(reader, index_type)?;
    if min > bound {
        return Err(ParseError::new(ErrorKind::LimitsOutOfRange { value: min, bound }, min_at));
    }
    let max = if has_max {
        let max_at = reader.pos();
        let max = read_page_count(reader, index_type)?;
        if max > bound {
            if ctx.config.strict_memory_growth {
                return Err(ParseError::new(ErrorKind::LimitsOutOfRange { value: max, bound }, max_at));
            }
            log::warn!("byte {}: memory maximum {} clamped to {} pages", max_at, max, bound);
            Some(bound)
        } else {
            Some(max)
        }
    } else {
        None
    };
    let limits = check_limits(min, max, at)?;
    Ok(MemoryType {
        limits,
        shared,
        index_type,
    })
}

pub(crate) fn read_global_type(reader: &mut Reader<'_>, caps: &Capabilities) -> Result<GlobalType> {
    let value_type = read_value_type(reader, caps)?;
    let at = reader.pos();
    let mutable = match reader.read_byte()? {
        MUT_CONST => false,
        MUT_VAR => true,
        other => return Err(ParseError::new(ErrorKind::IllegalMutability(other), at)),
    };
    Ok(GlobalType { value_type, mutable })
}

/// Tag types name a function type with no results.
pub(crate) fn read_tag_type(reader: &mut Reader<'_>, module: &Module) -> Result<TagType> {
    let at = reader.pos();
    let attribute = reader.read_byte()?;
    if attribute != TAG_ATTRIBUTE_EXCEPTION {
        return Err(ParseError::new(ErrorKind::IllegalTagAttribute(attribute), at));
    }
    let index_at = reader.pos();
    let type_index = reader.read_vu32()?;
    match module.types.get(type_index) {
        Some(function_type) if function_type.results.is_empty() => Ok(TagType { type_index }),
        Some(_) => Err(ParseError::new(ErrorKind::TagTypeHasResults(type_index), index_at)),
        None => Err(ParseError::new(
            ErrorKind::illegal_index(IndexSpace::Type, type_index, module.types.len() as u32),
            index_at,
        )),
    }
}

/// Reads an import/export name, honouring the empty-name policy.
pub(crate) fn read_name(reader: &mut Reader<'_>, ctx: &ParseContext<'_>) -> Result<String> {
    let at = reader.pos();
    let name = reader.read_name(ctx.config.utf8_policy)?;
    if name.is_empty() && !ctx.config.allow_empty_names {
        return Err(ParseError::new(ErrorKind::EmptyName, at));
    }
    Ok(name)
}

/// Reads a type index and resolves it against the type section.
pub(crate) fn read_type_index(reader: &mut Reader<'_>, module: &Module) -> Result<u32> {
    let at = reader.pos();
    let index = reader.read_vu32()?;
    module.check_index(IndexSpace::Type, index, at)?;
    Ok(index)
}

/// Single-table and single-memory rules without the relevant proposals.
pub(crate) fn check_table_count(module: &Module, caps: &Capabilities, at: usize) -> Result<()> {
    if module.table_count() > 1 && !caps.allows_multi_table() {
        return Err(ParseError::new(ErrorKind::MultipleTables, at));
    }
    Ok(())
}

pub(crate) fn check_memory_count(module: &Module, caps: &Capabilities, at: usize) -> Result<()> {
    if module.memory_count() > 1 && !caps.multi_memory {
        return Err(ParseError::new(ErrorKind::MultipleMemories, at));
    }
    Ok(())
}

/// Adds `added` entries to an index space that already has `existing`.
pub(crate) fn grow_index_space(existing: u32, added: u32, space: IndexSpace, at: usize) -> Result<()> {
    existing
        .checked_add(added)
        .map(|_| ())
        .ok_or_else(|| ParseError::new(ErrorKind::IndexSpaceOverflow { space }, at))
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{builtin, Composition, Memory64, Threads, Wasm1};
    use crate::parser::config::ParserConfig;

    fn memory(bytes: &[u8], config: &ParserConfig, composition: &Composition) -> Result<MemoryType> {
        let ctx = ParseContext::new(composition.for_version(1).unwrap(), config);
        read_memory_type(&mut Reader::new(bytes), &ctx)
    }

    fn with_memory64() -> Composition {
        Composition::compose(&[&Wasm1, &Memory64, &Threads]).unwrap()
    }

    #[test]
    fn test_memory_limits() {
        let config = ParserConfig::default();
        let c = with_memory64();
        let m = memory(&[0x01, 0x01, 0x02], &config, &c).unwrap();
        assert_eq!(m.limits, Limits { min: 1, max: Some(2) });
        assert_eq!(m.index_type, IndexType::I32);

        let err = memory(&[0x01, 0x03, 0x02], &config, &c).unwrap_err();
        assert_eq!(err.kind, ErrorKind::LimitsMinExceedsMax { min: 3, max: 2 });
        assert_eq!(err.offset, 0);

        let err = memory(&[0x08, 0x00], &config, &c).unwrap_err();
        assert_eq!(err.kind, ErrorKind::IllegalLimitsFlag(0x08));
    }

    #[test]
    fn test_memory_bound_strict_and_lenient() {
        // max = 65537 pages
        let bytes = [0x01, 0x00, 0x81, 0x80, 0x04];
        let c = with_memory64();
        let strict = ParserConfig::default();
        let err = memory(&bytes, &strict, &c).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::LimitsOutOfRange {
                value: 65_537,
                bound: MAX_MEMORY_PAGES_32
            }
        );
        assert_eq!(err.offset, 2);

        let lenient = ParserConfig {
            strict_memory_growth: false,
            ..ParserConfig::default()
        };
        let m = memory(&bytes, &lenient, &c).unwrap();
        assert_eq!(m.limits.max, Some(MAX_MEMORY_PAGES_32));

        // the minimum is never clamped
        let err = memory(&[0x00, 0x81, 0x80, 0x04], &lenient, &c).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::LimitsOutOfRange { .. }));
    }

    #[test]
    fn test_memory64_and_shared_flags() {
        let config = ParserConfig::default();
        let m = memory(&[0x04, 0x80, 0x80, 0x04], &config, &with_memory64()).unwrap();
        assert_eq!(m.index_type, IndexType::I64);
        assert_eq!(m.limits.min, 65_536);

        let m = memory(&[0x03, 0x01, 0x02], &config, &with_memory64()).unwrap();
        assert!(m.shared);

        let err = memory(&[0x02, 0x01], &config, &with_memory64()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::SharedMemoryRequiresMax);

        let plain = Composition::compose(&[&Wasm1]).unwrap();
        let err = memory(&[0x04, 0x01], &config, &plain).unwrap_err();
        assert_eq!(err.kind, ErrorKind::FeatureDisabled("64-bit memory"));
        let err = memory(&[0x03, 0x01, 0x02], &config, &plain).unwrap_err();
        assert_eq!(err.kind, ErrorKind::FeatureDisabled("shared memory"));
    }

    #[test]
    fn test_table_type() {
        let caps = builtin().for_version(1).unwrap().capabilities();
        let t = read_table_type(&mut Reader::new(&[0x70, 0x00, 0x05]), caps).unwrap();
        assert_eq!(t.ref_type, RefType::FuncRef);
        assert_eq!(t.limits, Limits { min: 5, max: None });

        let err = read_table_type(&mut Reader::new(&[0x70, 0x02, 0x05]), caps).unwrap_err();
        assert_eq!(err.kind, ErrorKind::IllegalLimitsFlag(0x02));

        let err = read_table_type(&mut Reader::new(&[0x7f, 0x00, 0x05]), caps).unwrap_err();
        assert_eq!(err.kind, ErrorKind::IllegalRefType(0x7f));
    }

    #[test]
    fn test_ref_type_gating() {
        let caps = Capabilities::default();
        assert_eq!(read_ref_type(&mut Reader::new(&[0x70]), &caps).unwrap(), RefType::FuncRef);
        let err = read_ref_type(&mut Reader::new(&[0x6f]), &caps).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnsupportedValueType(0x6f));
    }

    #[test]
    fn test_global_type() {
        let caps = Capabilities::default();
        let g = read_global_type(&mut Reader::new(&[0x7e, 0x01]), &caps).unwrap();
        assert_eq!(
            g,
            GlobalType {
                value_type: ValueType::I64,
                mutable: true
            }
        );
        let err = read_global_type(&mut Reader::new(&[0x7e, 0x02]), &caps).unwrap_err();
        assert_eq!(err.kind, ErrorKind::IllegalMutability(0x02));
        assert_eq!(err.offset, 1);
        let err = read_global_type(&mut Reader::new(&[0x7b, 0x00]), &caps).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnsupportedValueType(0x7b));
    }

    #[test]
    fn test_read_count_limit() {
        let mut reader = Reader::new(&[0x05]);
        let err = read_count(&mut reader, "type", 4).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::LimitExceeded {
                what: "type",
                count: 5,
                limit: 4
            }
        );
    }
}
