use crate::parser::error::{ErrorKind, IndexSpace, ParseError, Result};
use crate::parser::module::Module;
use crate::parser::reader::Reader;
use crate::parser::ParseContext;

/// The start function must exist and take and return nothing.
pub fn decode(module: &mut Module, reader: &mut Reader<'_>, _: &ParseContext<'_>) -> Result<()> {
    let at = reader.pos();
    let index = reader.read_vu32()?;
    module.check_index(IndexSpace::Function, index, at)?;
    match module.function_type(index) {
        Some(function_type) if function_type.is_empty() => {}
        _ => return Err(ParseError::new(ErrorKind::StartFunctionSignature(index), at)),
    }
    module.start.start = Some(index);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::module::Function;
    use crate::parser::sections::test_support::decode as decode_all;
    use crate::parser::types::{FunctionType, ValueType};

    #[test]
    fn test_start() {
        let mut module = Module::new();
        module.types.push(FunctionType::default());
        module.types.push(FunctionType {
            params: vec![ValueType::I32],
            results: vec![],
        });
        module.functions.push(Function { ftype_index: 0 });
        module.functions.push(Function { ftype_index: 1 });

        decode_all(&mut module, &[0x00], decode).unwrap();
        assert_eq!(module.start.start, Some(0));

        let err = decode_all(&mut module, &[0x01], decode).unwrap_err();
        assert_eq!(err.kind, ErrorKind::StartFunctionSignature(1));

        let err = decode_all(&mut module, &[0x02], decode).unwrap_err();
        assert_eq!(err.kind, ErrorKind::illegal_index(IndexSpace::Function, 2, 2));
    }
}
