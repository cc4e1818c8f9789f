//! Post-MVP proposals. Most only switch on capabilities read by the core
//! decoders; bulk memory and exception handling also bring a section.

use super::{order, Capabilities, Feature, SectionClaim};
use crate::parser::encoding::{SECTION_DATA_COUNT, SECTION_TAG};
use crate::parser::module::{Extensions, TagSection};
use crate::parser::sections::{data_count, tag};

macro_rules! capability_feature {
    ($(#[$doc:meta])* $ty:ident, $name:literal, $flag:ident) => {
        $(#[$doc])*
        pub struct $ty;

        impl Feature for $ty {
            fn name(&self) -> &'static str {
                $name
            }

            fn capabilities(&self, caps: &mut Capabilities) {
                caps.$flag = true;
            }
        }
    };
}

capability_feature!(
    /// Functions and blocks with more than one result.
    MultiValue,
    "multi-value",
    multi_value
);
capability_feature!(
    /// `funcref`/`externref` values, typed element segments, multiple tables.
    ReferenceTypes,
    "reference-types",
    reference_types
);
capability_feature!(
    /// The `v128` value type and `v128.const`.
    Simd,
    "simd",
    simd
);
capability_feature!(
    /// More than one memory per module.
    MultiMemory,
    "multi-memory",
    multi_memory
);
capability_feature!(
    /// 64-bit memory indices (limits flags 4 to 7).
    Memory64,
    "memory64",
    memory64
);
capability_feature!(
    /// Shared memories.
    Threads,
    "threads",
    threads
);
capability_feature!(
    /// Integer `add`, `sub` and `mul` in constant expressions.
    ExtendedConst,
    "extended-const",
    extended_const
);

/// Passive data and element segments, plus the data count section.
pub struct BulkMemory;

static DATA_COUNT_SECTION: [SectionClaim; 1] = [SectionClaim {
    id: SECTION_DATA_COUNT,
    name: "datacount",
    order: order::DATA_COUNT,
    handler: data_count::decode,
}];

impl Feature for BulkMemory {
    fn name(&self) -> &'static str {
        "bulk-memory"
    }

    fn sections(&self) -> &'static [SectionClaim] {
        &DATA_COUNT_SECTION
    }

    fn capabilities(&self, caps: &mut Capabilities) {
        caps.bulk_memory = true;
    }
}

/// Exception tags: the tag section and tag imports/exports.
pub struct ExceptionHandling;

static TAG_SECTION: [SectionClaim; 1] = [SectionClaim {
    id: SECTION_TAG,
    name: "tag",
    order: order::TAG,
    handler: tag::decode,
}];

impl Feature for ExceptionHandling {
    fn name(&self) -> &'static str {
        "exceptions"
    }

    fn sections(&self) -> &'static [SectionClaim] {
        &TAG_SECTION
    }

    fn capabilities(&self, caps: &mut Capabilities) {
        caps.exceptions = true;
    }

    fn init_storage(&self, extensions: &mut Extensions) {
        extensions.insert(TagSection::default());
    }
}
