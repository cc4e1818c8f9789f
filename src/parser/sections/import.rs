use std::collections::HashSet;

use crate::parser::encoding::*;
use crate::parser::error::{ErrorKind, ParseError, Result};
use crate::parser::module::{Import, ImportDesc, Module};
use crate::parser::reader::Reader;
use crate::parser::sections::{
    check_memory_count, check_table_count, read_count, read_global_type, read_memory_type, read_name,
    read_table_type, read_tag_type, read_type_index,
};
use crate::parser::ParseContext;

pub fn decode(module: &mut Module, reader: &mut Reader<'_>, ctx: &ParseContext<'_>) -> Result<()> {
    let caps = ctx.caps();
    let count = read_count(reader, "import", ctx.config.limits.imports)?;
    let mut seen = HashSet::new();

    for i in 0..count {
        let at = reader.pos();
        let module_name = read_name(reader, ctx)?;
        let name = read_name(reader, ctx)?;

        let kind_at = reader.pos();
        let desc = match reader.read_byte()? {
            DESC_FUNC => ImportDesc::Function(read_type_index(reader, module)?),
            DESC_TABLE => ImportDesc::Table(read_table_type(reader, caps)?),
            DESC_MEMORY => ImportDesc::Memory(read_memory_type(reader, ctx)?),
            DESC_GLOBAL => ImportDesc::Global(read_global_type(reader, caps)?),
            DESC_TAG if caps.exceptions => ImportDesc::Tag(read_tag_type(reader, module)?),
            DESC_TAG => return Err(ParseError::new(ErrorKind::FeatureDisabled("tag import"), kind_at)),
            other => return Err(ParseError::new(ErrorKind::IllegalImportKind(other), kind_at)),
        };

        if ctx.config.check_duplicate_imports && !seen.insert((module_name.clone(), name.clone())) {
            return Err(ParseError::with_range(
                ErrorKind::DuplicateImport {
                    module: module_name,
                    name,
                },
                at,
                reader.pos(),
            ));
        }

        let import = Import {
            module: module_name,
            name,
            desc,
        };
        log::trace!("import[{}] {}", i, import);
        module.imports.push(import);
        check_table_count(module, caps, kind_at)?;
        check_memory_count(module, caps, kind_at)?;
    }
    Ok(())
}
