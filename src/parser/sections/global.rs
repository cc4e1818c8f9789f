use crate::parser::const_expr::read_const_expr;
use crate::parser::error::{IndexSpace, Result};
use crate::parser::module::{Global, Module};
use crate::parser::reader::Reader;
use crate::parser::sections::{capacity, grow_index_space, read_count, read_global_type};
use crate::parser::ParseContext;

pub fn decode(module: &mut Module, reader: &mut Reader<'_>, ctx: &ParseContext<'_>) -> Result<()> {
    let at = reader.pos();
    let count = read_count(reader, "global", ctx.config.limits.globals)?;
    grow_index_space(module.imports.globals, count, IndexSpace::Global, at)?;
    module.globals.globals.reserve(capacity(count, reader));

    for _ in 0..count {
        let global_type = read_global_type(reader, ctx.caps())?;
        // imports and earlier definitions only
        let visible = module.global_count();
        let init = read_const_expr(reader, module, ctx, global_type.value_type, visible)?;
        log::trace!("global[{}] {} - init {}", visible, global_type, init);
        module.globals.globals.push(Global { global_type, init });
    }
    Ok(())
}
