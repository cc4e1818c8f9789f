use crate::parser::error::{IndexSpace, Result};
use crate::parser::module::{Module, TagSection};
use crate::parser::reader::Reader;
use crate::parser::sections::{capacity, grow_index_space, read_count, read_tag_type};
use crate::parser::ParseContext;

pub fn decode(module: &mut Module, reader: &mut Reader<'_>, ctx: &ParseContext<'_>) -> Result<()> {
    let at = reader.pos();
    let count = read_count(reader, "tag", ctx.config.limits.tags)?;
    grow_index_space(module.imports.tags, count, IndexSpace::Tag, at)?;

    let mut tags = Vec::with_capacity(capacity(count, reader));
    for _ in 0..count {
        tags.push(read_tag_type(reader, module)?);
    }
    log::trace!("{} tags declared", tags.len());
    module.extensions.get_or_default::<TagSection>().tags.extend(tags);
    Ok(())
}
