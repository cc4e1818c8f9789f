//! Resource limits applied while parsing.
//!
//! Counts declared by a binary are checked against these caps before any
//! storage is reserved, so malformed input claiming unrealistic counts fails
//! early instead of exhausting memory. Every cap can be overridden through
//! [`ParserLimits`] in the parser configuration.

use serde::{Deserialize, Serialize};

// =============================================================================
// Module-level defaults
// =============================================================================

/// Maximum number of type definitions in a module
pub const MAX_TYPES: u32 = 262_144;

/// Maximum number of imports in a module
pub const MAX_IMPORTS: u32 = 262_144;

/// Maximum number of locally defined functions in a module
pub const MAX_FUNCTIONS: u32 = 262_144;

/// Maximum number of tables (imported plus defined)
pub const MAX_TABLES: u32 = 1_024;

/// Maximum number of memories (imported plus defined)
pub const MAX_MEMORIES: u32 = 1_024;

/// Maximum number of globals in a module
pub const MAX_GLOBALS: u32 = 262_144;

/// Maximum number of exports in a module
pub const MAX_EXPORTS: u32 = 262_144;

/// Maximum number of element segments in a module
pub const MAX_ELEMENT_SEGMENTS: u32 = 262_144;

/// Maximum number of items in one element segment
pub const MAX_ELEMENT_ITEMS: u32 = 262_144;

/// Maximum number of data segments in a module
pub const MAX_DATA_SEGMENTS: u32 = 262_144;

/// Maximum number of exception tags in a module
pub const MAX_TAGS: u32 = 262_144;

// =============================================================================
// Function-level defaults
// =============================================================================

/// Maximum number of function parameters or results in one signature
pub const MAX_FUNCTION_PARAMS: u32 = 1_000;

/// Maximum number of code section entries
pub const MAX_CODE_BODIES: u32 = 262_144;

/// Maximum number of local variables in a function (declared, not params)
pub const MAX_FUNCTION_LOCALS: u32 = 65_536;

// =============================================================================
// Address-space bounds (not configurable)
// =============================================================================

/// Maximum memory pages for 32-bit addressing (4 GiB)
pub const MAX_MEMORY_PAGES_32: u64 = 65_536;

/// Maximum memory pages for 64-bit addressing (2^64 bytes / 64 KiB pages)
pub const MAX_MEMORY_PAGES_64: u64 = 1 << 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserLimits {
    pub types: u32,
    pub imports: u32,
    pub functions: u32,
    pub tables: u32,
    pub memories: u32,
    pub globals: u32,
    pub exports: u32,
    pub element_segments: u32,
    pub element_items: u32,
    pub data_segments: u32,
    pub tags: u32,
    pub function_params: u32,
    pub code_bodies: u32,
    pub function_locals: u32,
}

impl Default for ParserLimits {
    fn default() -> Self {
        ParserLimits {
            types: MAX_TYPES,
            imports: MAX_IMPORTS,
            functions: MAX_FUNCTIONS,
            tables: MAX_TABLES,
            memories: MAX_MEMORIES,
            globals: MAX_GLOBALS,
            exports: MAX_EXPORTS,
            element_segments: MAX_ELEMENT_SEGMENTS,
            element_items: MAX_ELEMENT_ITEMS,
            data_segments: MAX_DATA_SEGMENTS,
            tags: MAX_TAGS,
            function_params: MAX_FUNCTION_PARAMS,
            code_bodies: MAX_CODE_BODIES,
            function_locals: MAX_FUNCTION_LOCALS,
        }
    }
}
