//! Element segments. The flags word selects one of eight encodings:
//! bit 0 passive/declarative, bit 1 explicit table index (active) or
//! declarative (otherwise), bit 2 expressions instead of function indices.

use crate::parser::const_expr::read_const_expr;
use crate::parser::encoding::*;
use crate::parser::error::{ErrorKind, IndexSpace, ParseError, Result};
use crate::parser::module::{Element, ElementItems, ElementMode, Module};
use crate::parser::reader::Reader;
use crate::parser::sections::{capacity, read_count, read_ref_type};
use crate::parser::types::{RefType, ValueType};
use crate::parser::ParseContext;

pub fn decode(module: &mut Module, reader: &mut Reader<'_>, ctx: &ParseContext<'_>) -> Result<()> {
    let count = read_count(reader, "element segment", ctx.config.limits.element_segments)?;
    module.elements.elements.reserve(capacity(count, reader));

    for i in 0..count {
        let element = read_element(reader, module, ctx)?;
        log::trace!("elem[{}] flags={} items={}", i, element.flags, element.items.len());
        module.elements.push(element);
    }
    Ok(())
}

fn read_element(reader: &mut Reader<'_>, module: &Module, ctx: &ParseContext<'_>) -> Result<Element> {
    let caps = ctx.caps();
    let at = reader.pos();
    let flags = reader.read_vu32()?;
    if flags > ELEM_DECLARATIVE_EXPRS {
        return Err(ParseError::new(
            ErrorKind::IllegalSegmentFlags { kind: "element", flags },
            at,
        ));
    }
    if flags != ELEM_ACTIVE_FUNCS && !caps.allows_segment_modes() {
        return Err(ParseError::new(ErrorKind::FeatureDisabled("passive and declarative segments"), at));
    }
    let uses_exprs = flags & 0b100 != 0;
    if uses_exprs && !caps.reference_types {
        return Err(ParseError::new(ErrorKind::FeatureDisabled("element expressions"), at));
    }

    let table_at = reader.pos();
    let active_table = match flags & 0b011 {
        0b000 => Some(0),
        0b010 => Some(reader.read_vu32()?),
        _ => None,
    };
    let mode = match active_table {
        Some(table_index) => {
            module.check_index(IndexSpace::Table, table_index, table_at)?;
            let offset = read_const_expr(reader, module, ctx, ValueType::I32, module.global_count())?;
            ElementMode::Active { table_index, offset }
        }
        None if flags & 0b010 != 0 => ElementMode::Declarative,
        None => ElementMode::Passive,
    };

    // flags 0 and 4 imply funcref; the others spell out the element type
    let ref_type = match flags {
        ELEM_ACTIVE_FUNCS | ELEM_ACTIVE_EXPRS => RefType::FuncRef,
        _ if uses_exprs => read_ref_type(reader, caps)?,
        _ => {
            let kind_at = reader.pos();
            match reader.read_byte()? {
                ELEMKIND_FUNCREF => RefType::FuncRef,
                other => return Err(ParseError::new(ErrorKind::IllegalElementKind(other), kind_at)),
            }
        }
    };

    if let ElementMode::Active { table_index, .. } = &mode {
        if let Some(table_type) = module.table_type(*table_index) {
            if table_type.ref_type != ref_type {
                return Err(ParseError::new(
                    ErrorKind::ElementTypeMismatch {
                        element: ref_type,
                        table: table_type.ref_type,
                    },
                    at,
                ));
            }
        }
    }

    let item_count = read_count(reader, "element item", ctx.config.limits.element_items)?;
    let items = if uses_exprs {
        let mut exprs = Vec::with_capacity(capacity(item_count, reader));
        for _ in 0..item_count {
            exprs.push(read_const_expr(
                reader,
                module,
                ctx,
                ValueType::from(ref_type),
                module.global_count(),
            )?);
        }
        ElementItems::Expressions(exprs)
    } else {
        let mut indices = Vec::with_capacity(capacity(item_count, reader));
        for _ in 0..item_count {
            let index_at = reader.pos();
            let index = reader.read_vu32()?;
            module.check_index(IndexSpace::Function, index, index_at)?;
            indices.push(index);
        }
        ElementItems::Functions(indices)
    };

    Ok(Element {
        flags,
        ref_type,
        mode,
        items,
    })
}
