use crate::parser::error::{IndexSpace, Result};
use crate::parser::module::{Function, Module};
use crate::parser::reader::Reader;
use crate::parser::sections::{capacity, grow_index_space, read_count, read_type_index};
use crate::parser::ParseContext;

pub fn decode(module: &mut Module, reader: &mut Reader<'_>, ctx: &ParseContext<'_>) -> Result<()> {
    let at = reader.pos();
    let count = read_count(reader, "function", ctx.config.limits.functions)?;
    grow_index_space(module.imports.functions, count, IndexSpace::Function, at)?;
    module.functions.functions.reserve(capacity(count, reader));

    for _ in 0..count {
        let ftype_index = read_type_index(reader, module)?;
        module.functions.push(Function { ftype_index });
    }
    log::trace!("{} functions declared", count);
    Ok(())
}
