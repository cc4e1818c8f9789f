use crate::parser::encoding::TYPE_FUNC;
use crate::parser::error::{ErrorKind, ParseError, Result};
use crate::parser::module::Module;
use crate::parser::reader::Reader;
use crate::parser::sections::{capacity, read_count, read_value_type};
use crate::parser::types::FunctionType;
use crate::parser::ParseContext;

pub fn decode(module: &mut Module, reader: &mut Reader<'_>, ctx: &ParseContext<'_>) -> Result<()> {
    let caps = ctx.caps();
    let limits = &ctx.config.limits;
    let count = read_count(reader, "type", limits.types)?;
    module.types.types.reserve(capacity(count, reader));

    for i in 0..count {
        let at = reader.pos();
        let form = reader.read_byte()?;
        if form != TYPE_FUNC {
            return Err(ParseError::new(ErrorKind::IllegalTypeForm(form), at));
        }

        let param_count = read_count(reader, "parameter", limits.function_params)?;
        let mut params = Vec::with_capacity(capacity(param_count, reader));
        for _ in 0..param_count {
            params.push(read_value_type(reader, caps)?);
        }

        let results_at = reader.pos();
        let result_count = read_count(reader, "result", limits.function_params)?;
        if result_count > 1 && !caps.multi_value {
            return Err(ParseError::new(ErrorKind::MultiValueNotAllowed(result_count), results_at));
        }
        let mut results = Vec::with_capacity(capacity(result_count, reader));
        for _ in 0..result_count {
            results.push(read_value_type(reader, caps)?);
        }

        let function_type = FunctionType { params, results };
        log::trace!("type[{}] {}", i, function_type);
        module.types.push(function_type);
    }
    Ok(())
}
