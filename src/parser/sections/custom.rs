use crate::parser::error::Result;
use crate::parser::module::{Custom, Module, SectionPosition};
use crate::parser::reader::Reader;
use crate::parser::ParseContext;

/// Stores a custom section opaquely, then hands its payload to the handler
/// registered for its name, if any. Only the section name must be well
/// formed; handlers report problems as warnings.
pub fn decode(module: &mut Module, reader: &mut Reader<'_>, ctx: &ParseContext<'_>) -> Result<()> {
    let start = reader.pos();
    let name = reader.read_name(ctx.config.utf8_policy)?;
    let mut payload = reader.sub_reader(reader.remaining())?;
    let data = payload.clone().read_bytes(payload.remaining())?.to_vec();

    if let Some(handler) = ctx.features.custom_handler(&name) {
        log::debug!("custom section \"{}\": {} bytes", name, data.len());
        handler(module, &mut payload, ctx);
    }
    module.custom.push(Custom {
        name,
        data,
        position: SectionPosition::new(start, reader.end()),
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::encoding::write_name;
    use crate::parser::error::ErrorKind;
    use crate::parser::sections::test_support::decode as decode_all;

    #[test]
    fn test_opaque_store() {
        let mut payload = vec![];
        write_name(&mut payload, "producers");
        payload.extend_from_slice(&[1, 2, 3]);
        let mut module = Module::new();
        decode_all(&mut module, &payload, decode).unwrap();

        let custom = module.custom.find("producers").unwrap();
        assert_eq!(custom.data, vec![1, 2, 3]);
        assert_eq!(custom.position, SectionPosition::new(0, 13));
    }

    #[test]
    fn test_name_must_be_utf8() {
        let err = decode_all(&mut Module::new(), &[0x02, 0xc0, 0x80], decode).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidUtf8);
        assert_eq!(err.offset, 1);
    }

    #[test]
    fn test_truncated_name() {
        let err = decode_all(&mut Module::new(), &[0x05, b'a'], decode).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Eof);
    }
}
