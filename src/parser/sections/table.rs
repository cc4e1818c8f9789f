use crate::parser::error::{IndexSpace, Result};
use crate::parser::module::Module;
use crate::parser::reader::Reader;
use crate::parser::sections::{capacity, check_table_count, grow_index_space, read_count, read_table_type};
use crate::parser::ParseContext;

pub fn decode(module: &mut Module, reader: &mut Reader<'_>, ctx: &ParseContext<'_>) -> Result<()> {
    let caps = ctx.caps();
    let at = reader.pos();
    let count = read_count(reader, "table", ctx.config.limits.tables)?;
    grow_index_space(module.imports.tables, count, IndexSpace::Table, at)?;
    module.tables.tables.reserve(capacity(count, reader));

    for _ in 0..count {
        let entry_at = reader.pos();
        let table_type = read_table_type(reader, caps)?;
        log::trace!("table[{}] {}", module.table_count(), table_type);
        module.tables.tables.push(table_type);
        check_table_count(module, caps, entry_at)?;
    }
    Ok(())
}
