use crate::parser::error::Result;
use crate::parser::module::Module;
use crate::parser::reader::Reader;
use crate::parser::ParseContext;

/// The segment count is checked against the data section once the whole
/// module has been read, since the data section may be absent.
pub fn decode(module: &mut Module, reader: &mut Reader<'_>, _: &ParseContext<'_>) -> Result<()> {
    let count = reader.read_vu32()?;
    module.data_count.count = Some(count);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::sections::test_support::decode as decode_all;

    #[test]
    fn test_data_count() {
        let mut module = Module::new();
        decode_all(&mut module, &[0x03], decode).unwrap();
        assert_eq!(module.data_count.count, Some(3));
    }
}
