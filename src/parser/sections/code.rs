use crate::parser::encoding::OP_END;
use crate::parser::error::{ErrorKind, ParseError, Result};
use crate::parser::module::{FunctionBody, Locals, Module, SectionPosition};
use crate::parser::reader::Reader;
use crate::parser::sections::{capacity, read_count, read_value_type};
use crate::parser::ParseContext;

/// Decodes the local declarations of every body and keeps the instruction
/// bytes undecoded.
pub fn decode(module: &mut Module, reader: &mut Reader<'_>, ctx: &ParseContext<'_>) -> Result<()> {
    let at = reader.pos();
    let count = read_count(reader, "code body", ctx.config.limits.code_bodies)?;
    let functions = module.functions.len() as u32;
    if count != functions {
        return Err(ParseError::with_range(
            ErrorKind::FunctionCodeCountMismatch {
                functions,
                bodies: count,
            },
            at,
            reader.pos(),
        ));
    }
    module.code.code.reserve(capacity(count, reader));

    for i in 0..count {
        let size_at = reader.pos();
        let size = reader.read_vu32()? as usize;
        let mut body = reader.sub_reader(size).map_err(|e| {
            ParseError::with_range(ErrorKind::FunctionBodySizeMismatch, size_at, e.end.unwrap_or(e.offset))
        })?;
        let function_body = read_body(&mut body, ctx).map_err(|e| match e.kind {
            ErrorKind::Eof => ParseError::with_range(ErrorKind::FunctionBodySizeMismatch, size_at, body.end()),
            _ => e,
        })?;
        log::trace!(
            "code[{}] size={} locals={}",
            module.imports.functions + i,
            size,
            function_body.locals.len()
        );
        module.code.code.push(function_body);
    }
    Ok(())
}

fn read_body(body: &mut Reader<'_>, ctx: &ParseContext<'_>) -> Result<FunctionBody> {
    let start = body.pos();
    let limit = u64::from(ctx.config.limits.function_locals);

    let decl_at = body.pos();
    let decl_count = body.read_vu32()?;
    let mut entries = Vec::with_capacity(capacity(decl_count, body));
    let mut total: u64 = 0;
    for _ in 0..decl_count {
        let count = body.read_vu32()?;
        let value_type = read_value_type(body, ctx.caps())?;
        total += u64::from(count);
        if total > u64::from(u32::MAX) {
            return Err(ParseError::with_range(ErrorKind::TooManyLocals, decl_at, body.pos()));
        }
        if total > limit {
            return Err(ParseError::with_range(
                ErrorKind::LimitExceeded {
                    what: "local",
                    count: total,
                    limit,
                },
                decl_at,
                body.pos(),
            ));
        }
        entries.push((count, value_type));
    }

    let code_at = body.pos();
    let code = body.read_bytes(body.remaining())?;
    if code.last() != Some(&OP_END) {
        return Err(ParseError::with_range(ErrorKind::MissingFunctionEnd, code_at, body.end()));
    }

    Ok(FunctionBody {
        locals: Locals::new(entries),
        body: code.to_vec(),
        position: SectionPosition::new(start, body.end()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::config::ParserConfig;
    use crate::parser::limits::ParserLimits;
    use crate::parser::module::Function;
    use crate::parser::sections::test_support::{all_features, decode as decode_all, decode_with};
    use crate::parser::types::ValueType;

    fn module_with_functions(n: usize) -> Module {
        let mut module = Module::new();
        for _ in 0..n {
            module.functions.push(Function { ftype_index: 0 });
        }
        module
    }

    #[test]
    fn test_bodies() {
        let mut module = module_with_functions(2);
        let payload = [
            0x02, // count
            0x02, 0x00, OP_END, // no locals
            0x07, 0x02, 0x02, 0x7f, 0x01, 0x7c, 0x01, OP_END, // 2 x i32, 1 x f64, nop
        ];
        decode_all(&mut module, &payload, decode).unwrap();
        assert_eq!(module.code.len(), 2);
        assert_eq!(module.code.code[0].body, vec![OP_END]);
        let locals = &module.code.code[1].locals;
        assert_eq!(locals.entries(), &[(2, ValueType::I32), (1, ValueType::F64)]);
        assert_eq!(module.code.code[1].body, vec![0x01, OP_END]);
        assert_eq!(module.code.code[1].position, SectionPosition::new(5, 12));
    }

    #[test]
    fn test_count_must_match_functions() {
        let err = decode_all(&mut module_with_functions(2), &[0x01, 0x02, 0x00, OP_END], decode).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::FunctionCodeCountMismatch {
                functions: 2,
                bodies: 1
            }
        );
    }

    #[test]
    fn test_body_size_mismatch() {
        // body declares 1 byte but the locals vector needs more
        let err = decode_all(&mut module_with_functions(1), &[0x01, 0x01, 0x01], decode).unwrap_err();
        assert_eq!(err.kind, ErrorKind::FunctionBodySizeMismatch);
        assert_eq!(err.offset, 1);

        // body runs past the section
        let err = decode_all(&mut module_with_functions(1), &[0x01, 0x05, 0x00, OP_END], decode).unwrap_err();
        assert_eq!(err.kind, ErrorKind::FunctionBodySizeMismatch);
    }

    #[test]
    fn test_missing_end() {
        let err = decode_all(&mut module_with_functions(1), &[0x01, 0x02, 0x00, 0x01], decode).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingFunctionEnd);
        assert_eq!(err.offset, 3);

        let err = decode_all(&mut module_with_functions(1), &[0x01, 0x01, 0x00], decode).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingFunctionEnd);
    }

    #[test]
    fn test_local_limits() {
        // 2^32 - 1 locals, then one more
        let payload = [
            0x01, 0x0a, 0x02, 0xff, 0xff, 0xff, 0xff, 0x0f, 0x7f, 0x01, 0x7f, OP_END,
        ];
        let config = ParserConfig {
            limits: ParserLimits {
                function_locals: u32::MAX,
                ..ParserLimits::default()
            },
            ..ParserConfig::default()
        };
        let err = decode_with(all_features(), &config, &mut module_with_functions(1), &payload, decode).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TooManyLocals);

        let payload = [0x01, 0x06, 0x01, 0x80, 0x80, 0x08, 0x7f, OP_END];
        let err = decode_all(&mut module_with_functions(1), &payload, decode).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::LimitExceeded {
                what: "local",
                count: 131_072,
                limit: 65_536
            }
        );
    }
}
