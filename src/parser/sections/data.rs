use crate::parser::const_expr::read_const_expr;
use crate::parser::encoding::*;
use crate::parser::error::{ErrorKind, IndexSpace, ParseError, Result};
use crate::parser::module::{Data, DataMode, Module};
use crate::parser::reader::Reader;
use crate::parser::sections::{capacity, read_count};
use crate::parser::types::ValueType;
use crate::parser::ParseContext;

pub fn decode(module: &mut Module, reader: &mut Reader<'_>, ctx: &ParseContext<'_>) -> Result<()> {
    let count = read_count(reader, "data segment", ctx.config.limits.data_segments)?;
    module.data.data.reserve(capacity(count, reader));

    for i in 0..count {
        let data = read_data(reader, module, ctx)?;
        log::trace!("data[{}] size={}", i, data.init.len());
        module.data.data.push(data);
    }
    Ok(())
}

fn read_data(reader: &mut Reader<'_>, module: &Module, ctx: &ParseContext<'_>) -> Result<Data> {
    let caps = ctx.caps();
    let at = reader.pos();
    let flags = reader.read_vu32()?;
    let memory_at = reader.pos();
    let memory_index = match flags {
        DATA_ACTIVE => Some(0),
        DATA_PASSIVE if caps.bulk_memory => None,
        DATA_ACTIVE_EXPLICIT if caps.bulk_memory || caps.multi_memory => Some(reader.read_vu32()?),
        DATA_PASSIVE | DATA_ACTIVE_EXPLICIT => {
            return Err(ParseError::new(ErrorKind::FeatureDisabled("data segment flags"), at))
        }
        _ => {
            return Err(ParseError::new(
                ErrorKind::IllegalSegmentFlags { kind: "data", flags },
                at,
            ))
        }
    };

    let mode = match memory_index {
        Some(memory_index) => {
            let memory_type = match module.memory_type(memory_index) {
                Some(memory_type) => memory_type,
                None => {
                    return Err(ParseError::new(
                        ErrorKind::illegal_index(IndexSpace::Memory, memory_index, module.memory_count()),
                        memory_at,
                    ))
                }
            };
            let address_type: ValueType = memory_type.address_type();
            let offset = read_const_expr(reader, module, ctx, address_type, module.global_count())?;
            DataMode::Active { memory_index, offset }
        }
        None => DataMode::Passive,
    };

    let init = reader.read_u8vec()?;
    Ok(Data { init, mode })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{Composition, Wasm1};
    use crate::parser::config::ParserConfig;
    use crate::parser::sections::test_support::{decode as decode_all, decode_with};
    use crate::parser::types::{IndexType, Limits, MemoryType};

    fn module_with_memory(index_type: IndexType) -> Module {
        let mut module = Module::new();
        module.memories.memories.push(MemoryType {
            limits: Limits { min: 1, max: None },
            shared: false,
            index_type,
        });
        module
    }

    #[test]
    fn test_active_and_passive() {
        let mut module = module_with_memory(IndexType::I32);
        let payload = [
            0x02, // count
            0x00, OP_I32_CONST, 0x10, OP_END, 0x02, b'h', b'i', // active at 16
            0x01, 0x01, 0xff, // passive
        ];
        decode_all(&mut module, &payload, decode).unwrap();
        assert_eq!(module.data.data[0].init, b"hi".to_vec());
        match &module.data.data[0].mode {
            DataMode::Active { memory_index, offset } => {
                assert_eq!(*memory_index, 0);
                assert_eq!(offset.as_const_offset(), Some(16));
            }
            other => panic!("unexpected mode {:?}", other),
        }
        assert_eq!(module.data.data[1].mode, DataMode::Passive);
    }

    #[test]
    fn test_offset_follows_memory_index_type() {
        let payload = [0x01, 0x00, OP_I32_CONST, 0x00, OP_END, 0x00];
        let err = decode_all(&mut module_with_memory(IndexType::I64), &payload, decode).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::ConstExprTypeMismatch { .. }));

        let payload = [0x01, 0x00, OP_I64_CONST, 0x00, OP_END, 0x00];
        decode_all(&mut module_with_memory(IndexType::I64), &payload, decode).unwrap();
    }

    #[test]
    fn test_needs_memory() {
        let payload = [0x01, 0x00, OP_I32_CONST, 0x00, OP_END, 0x00];
        let err = decode_all(&mut Module::new(), &payload, decode).unwrap_err();
        assert_eq!(err.kind, ErrorKind::illegal_index(IndexSpace::Memory, 0, 0));
    }

    #[test]
    fn test_unknown_memory_index_points_at_the_index() {
        // count, flags 2, memory 1 (padded to two bytes)
        let payload = [0x01, 0x02, 0x81, 0x00, OP_I32_CONST, 0x00, OP_END, 0x00];
        let err = decode_all(&mut module_with_memory(IndexType::I32), &payload, decode).unwrap_err();
        assert_eq!(err.kind, ErrorKind::illegal_index(IndexSpace::Memory, 1, 1));
        assert_eq!(err.offset, 2);
    }

    #[test]
    fn test_flags() {
        let err = decode_all(&mut module_with_memory(IndexType::I32), &[0x01, 0x03], decode).unwrap_err();
        assert_eq!(err.kind, ErrorKind::IllegalSegmentFlags { kind: "data", flags: 3 });

        let plain = Composition::compose(&[&Wasm1]).unwrap();
        let err = decode_with(
            plain.for_version(1).unwrap(),
            &ParserConfig::default(),
            &mut module_with_memory(IndexType::I32),
            &[0x01, 0x01, 0x00],
            decode,
        )
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::FeatureDisabled("data segment flags"));
    }
}
