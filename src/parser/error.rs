//! Parse errors and non-fatal warnings.
//!
//! Every decoder returns [`Result`]; the first [`ParseError`] aborts the
//! whole parse. Only custom-section sub-formats report problems as
//! [`Warning`]s, which are collected on the module instead.

use std::fmt;

use thiserror::Error;

use crate::parser::types::{RefType, ValueType};

pub type Result<T> = std::result::Result<T, ParseError>;

/// Index space an out-of-range reference was resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSpace {
    Type,
    Function,
    Table,
    Memory,
    Global,
    Tag,
}

impl fmt::Display for IndexSpace {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            IndexSpace::Type => "type",
            IndexSpace::Function => "function",
            IndexSpace::Table => "table",
            IndexSpace::Memory => "memory",
            IndexSpace::Global => "global",
            IndexSpace::Tag => "tag",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    // Truncation
    #[error("unexpected end of input")]
    Eof,
    #[error("section length {length} overflows the module end")]
    SectionLengthOverflow { length: u32 },

    // Encoding malformation
    #[error("malformed LEB128: integer representation too long")]
    MalformedLeb128,
    #[error("integer too large")]
    IntegerTooLarge,
    #[error("malformed UTF-8 encoding")]
    InvalidUtf8,
    #[error("embedded NUL byte in name")]
    NulInName,
    #[error("magic header not detected")]
    InvalidMagic,
    #[error("unsupported binary format version {0}")]
    UnsupportedBinfmtVersion(u32),

    // Structural violations
    #[error("section {id} appears after section {previous}")]
    SectionOrderViolation { id: u8, previous: u8 },
    #[error("duplicate section {0}")]
    DuplicateSection(u8),
    #[error("section size mismatch: declared {declared} bytes, consumed {consumed}")]
    SectionLengthMismatch { declared: usize, consumed: usize },
    #[error("illegal section id {0}")]
    IllegalSectionId(u8),
    #[error("function body size mismatch")]
    FunctionBodySizeMismatch,
    #[error("function body does not end with `end`")]
    MissingFunctionEnd,

    // Types
    #[error("unsupported value type 0x{0:02x}")]
    UnsupportedValueType(u8),
    #[error("illegal reference type 0x{0:02x}")]
    IllegalRefType(u8),
    #[error("illegal type form 0x{0:02x}, expected func (0x60)")]
    IllegalTypeForm(u8),
    #[error("multiple result values not allowed ({0} results)")]
    MultiValueNotAllowed(u32),
    #[error("illegal limits flag 0x{0:02x}")]
    IllegalLimitsFlag(u8),
    #[error("limits minimum {min} exceeds maximum {max}")]
    LimitsMinExceedsMax { min: u64, max: u64 },
    #[error("limits value {value} exceeds bound {bound}")]
    LimitsOutOfRange { value: u64, bound: u64 },
    #[error("shared memory must declare a maximum")]
    SharedMemoryRequiresMax,
    #[error("illegal mutability flag 0x{0:02x}")]
    IllegalMutability(u8),
    #[error("tag attribute 0x{0:02x} is not an exception")]
    IllegalTagAttribute(u8),
    #[error("tag type {0} must not have results")]
    TagTypeHasResults(u32),

    // Index and semantic violations
    #[error("unknown {space} {index} (index space has {count} entries)")]
    IllegalIndex { space: IndexSpace, index: u32, count: u32 },
    #[error("{space} index space exceeds u32::MAX entries")]
    IndexSpaceOverflow { space: IndexSpace },
    #[error("illegal import kind 0x{0:02x}")]
    IllegalImportKind(u8),
    #[error("illegal export kind 0x{0:02x}")]
    IllegalExportKind(u8),
    #[error("multiple tables")]
    MultipleTables,
    #[error("multiple memories")]
    MultipleMemories,
    #[error("empty name")]
    EmptyName,
    #[error("duplicate import \"{module}\" \"{name}\"")]
    DuplicateImport { module: String, name: String },
    #[error("duplicate export name \"{0}\"")]
    DuplicateExportName(String),
    #[error("start function {0} must have type [] -> []")]
    StartFunctionSignature(u32),
    #[error("function and code section have inconsistent lengths ({functions} functions, {bodies} bodies)")]
    FunctionCodeCountMismatch { functions: u32, bodies: u32 },
    #[error("data count {declared} does not match {segments} data segments")]
    DataCountMismatch { declared: u32, segments: u32 },
    #[error("illegal element kind 0x{0:02x}")]
    IllegalElementKind(u8),
    #[error("illegal {kind} segment flags {flags}")]
    IllegalSegmentFlags { kind: &'static str, flags: u32 },
    #[error("element type {element} does not match table type {table}")]
    ElementTypeMismatch { element: RefType, table: RefType },
    #[error("too many locals")]
    TooManyLocals,
    #[error("{what} count {count} exceeds limit {limit}")]
    LimitExceeded { what: &'static str, count: u64, limit: u64 },
    #[error("{0} requires a disabled feature")]
    FeatureDisabled(&'static str),

    // Constant expressions
    #[error("illegal opcode 0x{0:02x} in constant expression")]
    ConstExprIllegalOpcode(u8),
    #[error("constant expression type mismatch: expected {expected}, got {actual:?}")]
    ConstExprTypeMismatch { expected: ValueType, actual: Vec<ValueType> },
    #[error("constant expression is missing `end`")]
    ConstExprMissingEnd,
    #[error("global {0} in constant expression is mutable")]
    ConstExprMutableGlobal(u32),
}

impl ErrorKind {
    pub fn illegal_index(space: IndexSpace, index: u32, count: u32) -> ErrorKind {
        ErrorKind::IllegalIndex { space, index, count }
    }
}

/// The error state of a failed parse: what went wrong, where it was
/// detected, and optionally the end of the offending byte range.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("byte {offset}: {kind}")]
pub struct ParseError {
    pub kind: ErrorKind,
    pub offset: usize,
    pub end: Option<usize>,
}

impl ParseError {
    pub fn new(kind: ErrorKind, offset: usize) -> ParseError {
        ParseError { kind, offset, end: None }
    }

    pub fn with_range(kind: ErrorKind, offset: usize, end: usize) -> ParseError {
        ParseError {
            kind,
            offset,
            end: Some(end),
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

/// A problem found while decoding a custom section sub-format. Warnings
/// never abort the parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub section: String,
    pub offset: usize,
    pub kind: WarningKind,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "custom section \"{}\" byte {}: {}", self.section, self.offset, self.kind)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WarningKind {
    #[error("{0}")]
    Malformed(ErrorKind),
    #[error("duplicate name section")]
    DuplicateSection,
    #[error("name section appears before section {0}")]
    Misplaced(u8),
    #[error("duplicate subsection {0}")]
    DuplicateSubsection(u8),
    #[error("subsection {id} appears after subsection {previous}")]
    SubsectionOutOfOrder { id: u8, previous: u8 },
    #[error("unknown subsection {0}")]
    UnknownSubsection(u8),
    #[error("subsection {id} declares {declared} bytes but uses {consumed}")]
    SubsectionSizeMismatch { id: u8, declared: usize, consumed: usize },
    #[error("function index {index} out of range ({count} functions)")]
    FunctionIndexOutOfRange { index: u32, count: u32 },
    #[error("index {index} not in increasing order after {previous}")]
    IndexOutOfOrder { index: u32, previous: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_renders_offset() {
        let err = ParseError::new(ErrorKind::illegal_index(IndexSpace::Function, 2, 2), 31);
        assert_eq!(
            err.to_string(),
            "byte 31: unknown function 2 (index space has 2 entries)"
        );
        assert_eq!(err.end, None);
    }

    #[test]
    fn test_range_is_kept() {
        let err = ParseError::with_range(ErrorKind::MalformedLeb128, 10, 16);
        assert_eq!(err.kind(), &ErrorKind::MalformedLeb128);
        assert_eq!(err.end, Some(16));
    }

    #[test]
    fn test_warning_display() {
        let warning = Warning {
            section: "name".to_string(),
            offset: 40,
            kind: WarningKind::UnknownSubsection(9),
        };
        assert_eq!(warning.to_string(), "custom section \"name\" byte 40: unknown subsection 9");
    }
}
