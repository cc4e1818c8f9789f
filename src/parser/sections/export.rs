use std::collections::HashSet;

use crate::parser::encoding::*;
use crate::parser::error::{ErrorKind, ParseError, Result};
use crate::parser::module::{Export, ExternalKind, Module};
use crate::parser::reader::Reader;
use crate::parser::sections::{capacity, read_count, read_name};
use crate::parser::ParseContext;

pub fn decode(module: &mut Module, reader: &mut Reader<'_>, ctx: &ParseContext<'_>) -> Result<()> {
    let count = read_count(reader, "export", ctx.config.limits.exports)?;
    module.exports.exports.reserve(capacity(count, reader));
    let mut names = HashSet::new();

    for _ in 0..count {
        let at = reader.pos();
        let name = read_name(reader, ctx)?;
        if !names.insert(name.clone()) {
            return Err(ParseError::with_range(ErrorKind::DuplicateExportName(name), at, reader.pos()));
        }

        let kind_at = reader.pos();
        let kind = match reader.read_byte()? {
            DESC_FUNC => ExternalKind::Function,
            DESC_TABLE => ExternalKind::Table,
            DESC_MEMORY => ExternalKind::Memory,
            DESC_GLOBAL => ExternalKind::Global,
            DESC_TAG if ctx.caps().exceptions => ExternalKind::Tag,
            DESC_TAG => return Err(ParseError::new(ErrorKind::FeatureDisabled("tag export"), kind_at)),
            other => return Err(ParseError::new(ErrorKind::IllegalExportKind(other), kind_at)),
        };
        let index_at = reader.pos();
        let index = reader.read_vu32()?;
        module.check_index(kind.index_space(), index, index_at)?;

        log::trace!("export {}[{}] -> \"{}\"", kind, index, name);
        module.exports.push(Export { name, kind, index });
    }
    Ok(())
}
