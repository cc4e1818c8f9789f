use crate::parser::error::{IndexSpace, Result};
use crate::parser::module::Module;
use crate::parser::reader::Reader;
use crate::parser::sections::{capacity, check_memory_count, grow_index_space, read_count, read_memory_type};
use crate::parser::ParseContext;

pub fn decode(module: &mut Module, reader: &mut Reader<'_>, ctx: &ParseContext<'_>) -> Result<()> {
    let at = reader.pos();
    let count = read_count(reader, "memory", ctx.config.limits.memories)?;
    grow_index_space(module.imports.memories, count, IndexSpace::Memory, at)?;
    module.memories.memories.reserve(capacity(count, reader));

    for _ in 0..count {
        let entry_at = reader.pos();
        let memory_type = read_memory_type(reader, ctx)?;
        log::trace!("memory[{}] {}", module.memory_count(), memory_type);
        module.memories.memories.push(memory_type);
        check_memory_count(module, ctx.caps(), entry_at)?;
    }
    Ok(())
}
