//! Binary format decoder.
//!
//! [`Parser::parse`] checks the header, resolves the [`FeatureSet`] for the
//! binary format version and walks the section stream, handing each payload
//! to the handler the feature set registered for its id. Every handler gets
//! a reader bounded to its section and must consume exactly that section.
//! The first error aborts the parse.

pub mod config;
pub mod const_expr;
pub mod encoding;
pub mod error;
pub mod limits;
pub mod module;
pub mod name;
pub mod reader;
pub mod sections;
pub mod types;


use byteorder::{ByteOrder, LittleEndian};

use crate::features::{self, Capabilities, Composition, FeatureSet, SectionHandler};
use encoding::*;
use error::WarningKind;
use module::{Positional, SectionPosition, SectionRecord, TagSection};
use reader::Reader;

pub use config::{ParserConfig, Utf8Policy};
pub use error::{ErrorKind, IndexSpace, ParseError, Result, Warning};
pub use module::{DumpFormat, Module};

/// What a section handler may consult besides the module being built.
#[derive(Debug, Clone, Copy)]
pub struct ParseContext<'a> {
    pub features: &'a FeatureSet,
    pub config: &'a ParserConfig,
}

impl<'a> ParseContext<'a> {
    pub fn new(features: &'a FeatureSet, config: &'a ParserConfig) -> ParseContext<'a> {
        ParseContext { features, config }
    }

    pub fn caps(&self) -> &'a Capabilities {
        self.features.capabilities()
    }
}

/// The binary format version of `bytes`, or 0 when there is no complete
/// header with the `\0asm` magic.
pub fn detect_version(bytes: &[u8]) -> u32 {
    if bytes.len() < HEADER_LEN || bytes[..4] != MAGIC {
        return 0;
    }
    LittleEndian::read_u32(&bytes[4..HEADER_LEN])
}

/// Parses with the built-in features and the default configuration.
pub fn parse(bytes: &[u8]) -> Result<Module> {
    Parser::default().parse(bytes)
}

/// A reusable, read-only parser. One instance may parse any number of
/// modules, from any number of threads.
#[derive(Debug)]
pub struct Parser<'c> {
    composition: &'c Composition,
    config: ParserConfig,
}

impl Parser<'static> {
    pub fn new(config: ParserConfig) -> Parser<'static> {
        Parser {
            composition: features::builtin(),
            config,
        }
    }
}

impl Default for Parser<'static> {
    fn default() -> Self {
        Parser::new(ParserConfig::default())
    }
}

impl<'c> Parser<'c> {
    pub fn with_composition(composition: &'c Composition, config: ParserConfig) -> Parser<'c> {
        Parser { composition, config }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn composition(&self) -> &'c Composition {
        self.composition
    }

    pub fn parse(&self, bytes: &[u8]) -> Result<Module> {
        self.parse_named("", bytes)
    }

    /// Like [`Parser::parse`], recording `name` on the module for dumps.
    pub fn parse_named(&self, name: &str, bytes: &[u8]) -> Result<Module> {
        let version = self.read_header(bytes)?;
        let features = self.composition.for_version(version).ok_or_else(|| {
            ParseError::with_range(ErrorKind::UnsupportedBinfmtVersion(version), 4, HEADER_LEN)
        })?;
        let ctx = ParseContext::new(features, &self.config);

        let mut module = features.new_module();
        module.name = name.to_string();
        module.size = bytes.len();

        let mut reader = Reader::new(bytes);
        reader.read_bytes(HEADER_LEN)?;
        let mut order = SectionOrder::default();
        while !reader.is_empty() {
            self.read_section(&mut module, &mut reader, &ctx, &mut order)?;
        }

        finish(&mut module, &reader)?;
        log::debug!("parsed {} sections from {} bytes", module.sections.len(), bytes.len());
        Ok(module)
    }

    fn read_header(&self, bytes: &[u8]) -> Result<u32> {
        if bytes.len() < MAGIC.len() || bytes[..MAGIC.len()] != MAGIC {
            return Err(ParseError::with_range(
                ErrorKind::InvalidMagic,
                0,
                bytes.len().min(MAGIC.len()),
            ));
        }
        if bytes.len() < HEADER_LEN {
            return Err(ParseError::with_range(ErrorKind::Eof, bytes.len(), HEADER_LEN));
        }
        Ok(detect_version(bytes))
    }

    fn read_section(
        &self,
        module: &mut Module,
        reader: &mut Reader<'_>,
        ctx: &ParseContext<'_>,
        order: &mut SectionOrder,
    ) -> Result<()> {
        let section_at = reader.pos();
        let id = reader.read_byte()?;
        let length_at = reader.pos();
        let length = reader.read_vu32()?;
        if length as usize > reader.remaining() {
            return Err(ParseError::with_range(
                ErrorKind::SectionLengthOverflow { length },
                length_at,
                reader.end(),
            ));
        }
        let start = reader.pos();
        let mut section = reader.sub_reader(length as usize)?;

        let resolved = ctx.features.section(id);
        let (claim_name, handler): (&str, SectionHandler) = match resolved {
            Some(resolved) => (resolved.claim.name, resolved.claim.handler),
            None if id == SECTION_CUSTOM => ("custom", sections::custom::decode as SectionHandler),
            None => return Err(ParseError::new(ErrorKind::IllegalSectionId(id), section_at)),
        };
        if id != SECTION_CUSTOM {
            if let Some(resolved) = resolved {
                order.check(id, resolved.claim.order, section_at)?;
            }
        }

        log::debug!(
            "section {} \"{}\" start=0x{:08x} size=0x{:08x}",
            id,
            claim_name,
            start,
            length
        );
        let declared = length as usize;
        handler(module, &mut section, ctx).map_err(|e| match e.kind {
            // a decoder ran past the declared end, whether or not input follows
            ErrorKind::Eof => ParseError::with_range(
                ErrorKind::SectionLengthMismatch {
                    declared,
                    consumed: e.offset.saturating_sub(start),
                },
                start,
                section.end(),
            ),
            _ => e,
        })?;
        if !section.is_empty() {
            return Err(ParseError::with_range(
                ErrorKind::SectionLengthMismatch {
                    declared,
                    consumed: section.pos() - start,
                },
                section.pos(),
                section.end(),
            ));
        }

        let position = SectionPosition::new(start, section.end());
        let name = match (id, resolved) {
            (SECTION_CUSTOM, None) => module.custom.customs.last().map_or_else(String::new, |c| c.name.clone()),
            _ => claim_name.to_string(),
        };
        record_position(module, id, position);
        module.sections.push(SectionRecord { id, name, position });
        Ok(())
    }
}

/// Tracks the canonical rank of the last non-custom section.
#[derive(Default)]
struct SectionOrder {
    seen: Vec<u8>,
    last: Option<(u8, u8)>,
}

impl SectionOrder {
    fn check(&mut self, id: u8, rank: u8, at: usize) -> Result<()> {
        if self.seen.contains(&id) {
            return Err(ParseError::new(ErrorKind::DuplicateSection(id), at));
        }
        if let Some((previous, previous_rank)) = self.last {
            if rank < previous_rank {
                return Err(ParseError::new(ErrorKind::SectionOrderViolation { id, previous }, at));
            }
        }
        self.seen.push(id);
        self.last = Some((id, rank));
        Ok(())
    }
}

fn record_position(module: &mut Module, id: u8, position: SectionPosition) {
    let SectionPosition { start, end } = position;
    let section: &mut dyn Positional = match id {
        SECTION_TYPE => &mut module.types,
        SECTION_IMPORT => &mut module.imports,
        SECTION_FUNCTION => &mut module.functions,
        SECTION_TABLE => &mut module.tables,
        SECTION_MEMORY => &mut module.memories,
        SECTION_GLOBAL => &mut module.globals,
        SECTION_EXPORT => &mut module.exports,
        SECTION_START => &mut module.start,
        SECTION_ELEMENT => &mut module.elements,
        SECTION_CODE => &mut module.code,
        SECTION_DATA => &mut module.data,
        SECTION_DATA_COUNT => &mut module.data_count,
        SECTION_TAG => match module.extensions.get_mut::<TagSection>() {
            Some(tags) => tags,
            None => return,
        },
        _ => return,
    };
    section.set_position(start, end);
}

/// Whole-module checks that no single section can make.
fn finish(module: &mut Module, reader: &Reader<'_>) -> Result<()> {
    let functions = module.functions.len() as u32;
    let bodies = module.code.len() as u32;
    if functions != bodies {
        let at = module.code.position.map_or(reader.end(), |p| p.start);
        return Err(ParseError::new(
            ErrorKind::FunctionCodeCountMismatch { functions, bodies },
            at,
        ));
    }

    if let Some(declared) = module.data_count.count {
        let segments = module.data.data.len() as u32;
        if declared != segments {
            let at = module
                .data
                .position
                .or(module.data_count.position)
                .map_or(reader.end(), |p| p.start);
            return Err(ParseError::new(ErrorKind::DataCountMismatch { declared, segments }, at));
        }
    }

    // the name section belongs after every standard section
    let name_at = module
        .sections
        .iter()
        .position(|s| s.id == SECTION_CUSTOM && s.name == NAME_SECTION);
    if let Some(i) = name_at {
        let offset = module.sections[i].position.start;
        let later = module.sections[i + 1..].iter().find(|s| s.id != SECTION_CUSTOM).map(|s| s.id);
        if let Some(id) = later {
            name::push_warning(module, offset, WarningKind::Misplaced(id));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{Composition, Simd, Wasm1};

    fn header() -> Vec<u8> {
        let mut buf = vec![];
        write_header(&mut buf, VERSION_1);
        buf
    }

    #[test]
    fn test_detect_version() {
        assert_eq!(detect_version(&[]), 0);
        assert_eq!(detect_version(&[0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00]), 0);
        assert_eq!(detect_version(&[0x00, 0x61, 0x73, 0x6e, 0x01, 0x00, 0x00, 0x00]), 0);
        assert_eq!(detect_version(&header()), 1);
        assert_eq!(detect_version(&[0x00, 0x61, 0x73, 0x6d, 0x0d, 0x00, 0x01, 0x00, 0xff]), 0x0001_000d);
    }

    #[test]
    fn test_header_only() {
        let module = parse(&header()).unwrap();
        assert_eq!(module.version, 1);
        assert!(module.sections.is_empty());
        assert!(module.types.is_empty());
        assert_eq!(module.function_count(), 0);
        assert!(module.warnings.is_empty());
    }

    #[test]
    fn test_bad_headers() {
        let err = parse(b"\0asn\x01\0\0\0").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidMagic);
        assert_eq!((err.offset, err.end), (0, Some(4)));

        let err = parse(b"\0as").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidMagic);

        let err = parse(b"\0asm\x01\0").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Eof);

        let err = parse(b"\0asm\x02\0\0\0").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnsupportedBinfmtVersion(2));
        assert_eq!(err.offset, 4);
    }

    #[test]
    fn test_section_length_overflow() {
        let mut bytes = header();
        bytes.extend_from_slice(&[SECTION_TYPE, 0x05, 0x00]);
        let err = parse(&bytes).unwrap_err();
        assert_eq!(err.kind, ErrorKind::SectionLengthOverflow { length: 5 });
        assert_eq!(err.offset, 9);
    }

    #[test]
    fn test_illegal_section_id() {
        let mut bytes = header();
        bytes.extend_from_slice(&[0x20, 0x00]);
        let err = parse(&bytes).unwrap_err();
        assert_eq!(err.kind, ErrorKind::IllegalSectionId(0x20));
        assert_eq!(err.offset, 8);

        // the tag section only exists with exception handling
        let plain = Composition::compose(&[&Wasm1]).unwrap();
        let parser = Parser::with_composition(&plain, ParserConfig::default());
        let bytes = module_bytes(&[(SECTION_TAG, vec![0x00])]);
        assert_eq!(parser.parse(&bytes).unwrap_err().kind, ErrorKind::IllegalSectionId(SECTION_TAG));
    }

    #[test]
    fn test_order_and_duplicates() {
        let bytes = module_bytes(&[(SECTION_FUNCTION, vec![0x00]), (SECTION_TYPE, vec![0x00])]);
        let err = parse(&bytes).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::SectionOrderViolation {
                id: SECTION_TYPE,
                previous: SECTION_FUNCTION
            }
        );
        assert_eq!(err.offset, 11);

        let bytes = module_bytes(&[(SECTION_TYPE, vec![0x00]), (SECTION_TYPE, vec![0x00])]);
        assert_eq!(parse(&bytes).unwrap_err().kind, ErrorKind::DuplicateSection(SECTION_TYPE));
    }

    #[test]
    fn test_rank_places_proposal_sections() {
        // tag (13) sits between memory and global, data count (12) before code
        let bytes = module_bytes(&[
            (SECTION_MEMORY, vec![0x00]),
            (SECTION_TAG, vec![0x00]),
            (SECTION_GLOBAL, vec![0x00]),
            (SECTION_DATA_COUNT, vec![0x00]),
            (SECTION_CODE, vec![0x00]),
        ]);
        let module = parse(&bytes).unwrap();
        let ids: Vec<u8> = module.sections.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![5, 13, 6, 12, 10]);
        assert_eq!(module.tags().and_then(|t| t.position), Some(SectionPosition::new(13, 14)));

        let bytes = module_bytes(&[(SECTION_GLOBAL, vec![0x00]), (SECTION_TAG, vec![0x00])]);
        let err = parse(&bytes).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::SectionOrderViolation {
                id: SECTION_TAG,
                previous: SECTION_GLOBAL
            }
        );
    }

    #[test]
    fn test_custom_sections_anywhere() {
        let mut custom = vec![];
        write_name(&mut custom, "meta");
        let bytes = module_bytes(&[
            (SECTION_CUSTOM, custom.clone()),
            (SECTION_TYPE, vec![0x00]),
            (SECTION_CUSTOM, custom.clone()),
            (SECTION_FUNCTION, vec![0x00]),
            (SECTION_CUSTOM, custom),
        ]);
        let module = parse(&bytes).unwrap();
        assert_eq!(module.custom.customs.len(), 3);
        assert_eq!(module.sections[0].name, "meta");
        assert_eq!(module.sections[1].name, "type");
    }

    #[test]
    fn test_length_mismatch() {
        // a type section with a trailing byte
        let bytes = module_bytes(&[(SECTION_TYPE, vec![0x00, 0x00])]);
        let err = parse(&bytes).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::SectionLengthMismatch {
                declared: 2,
                consumed: 1
            }
        );
        assert_eq!((err.offset, err.end), (11, Some(12)));

        // a type section cut short with more sections behind it
        let mut bytes = header();
        bytes.extend_from_slice(&[SECTION_TYPE, 0x02, 0x01, 0x60, SECTION_FUNCTION, 0x01, 0x00]);
        let err = parse(&bytes).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::SectionLengthMismatch { declared: 2, .. }));

        // the same section at the end of the input reports the same kind
        let mut bytes = header();
        bytes.extend_from_slice(&[SECTION_TYPE, 0x02, 0x01, 0x60]);
        let err = parse(&bytes).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::SectionLengthMismatch {
                declared: 2,
                consumed: 2
            }
        );
        assert_eq!((err.offset, err.end), (10, Some(12)));

        // a header cut inside the section id or length is still truncation
        let mut bytes = header();
        bytes.extend_from_slice(&[SECTION_TYPE, 0x80]);
        assert_eq!(parse(&bytes).unwrap_err().kind, ErrorKind::Eof);
    }

    #[test]
    fn test_function_without_code() {
        let bytes = module_bytes(&[(SECTION_TYPE, vec![0x01, 0x60, 0x00, 0x00]), (SECTION_FUNCTION, vec![0x01, 0x00])]);
        let err = parse(&bytes).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::FunctionCodeCountMismatch {
                functions: 1,
                bodies: 0
            }
        );
        assert_eq!(err.offset, bytes.len());
    }

    #[test]
    fn test_data_count_mismatch() {
        let bytes = module_bytes(&[(SECTION_DATA_COUNT, vec![0x01])]);
        let err = parse(&bytes).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::DataCountMismatch {
                declared: 1,
                segments: 0
            }
        );
    }

    #[test]
    fn test_misplaced_name_section() {
        let mut names = vec![];
        write_name(&mut names, NAME_SECTION);
        let bytes = module_bytes(&[(SECTION_CUSTOM, names), (SECTION_TYPE, vec![0x00])]);
        let module = parse(&bytes).unwrap();
        assert_eq!(module.warnings.len(), 1);
        assert_eq!(module.warnings[0].kind, WarningKind::Misplaced(SECTION_TYPE));
    }

    #[test]
    fn test_parser_is_reusable_across_compositions() {
        let mut types = vec![];
        write_vu32(&mut types, 1);
        types.extend_from_slice(&[TYPE_FUNC, 0x01, 0x7b, 0x00]);
        let bytes = module_bytes(&[(SECTION_TYPE, types)]);

        let with_simd = Composition::compose(&[&Wasm1, &Simd]).unwrap();
        let without = Composition::compose(&[&Wasm1]).unwrap();
        let config = ParserConfig::default();
        assert!(Parser::with_composition(&with_simd, config.clone()).parse(&bytes).is_ok());
        let err = Parser::with_composition(&without, config).parse(&bytes).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnsupportedValueType(0x7b));
    }
}
