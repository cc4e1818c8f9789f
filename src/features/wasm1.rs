use super::{order, CustomClaim, Feature, SectionClaim};
use crate::parser::encoding::*;
use crate::parser::name;
use crate::parser::sections::{
    code, data, element, export, function, global, import, memory, start, table, type_section,
};

/// The core binary format: sections 1 through 11.
pub struct Wasm1;

static WASM1_SECTIONS: [SectionClaim; 11] = [
    SectionClaim {
        id: SECTION_TYPE,
        name: "type",
        order: order::TYPE,
        handler: type_section::decode,
    },
    SectionClaim {
        id: SECTION_IMPORT,
        name: "import",
        order: order::IMPORT,
        handler: import::decode,
    },
    SectionClaim {
        id: SECTION_FUNCTION,
        name: "function",
        order: order::FUNCTION,
        handler: function::decode,
    },
    SectionClaim {
        id: SECTION_TABLE,
        name: "table",
        order: order::TABLE,
        handler: table::decode,
    },
    SectionClaim {
        id: SECTION_MEMORY,
        name: "memory",
        order: order::MEMORY,
        handler: memory::decode,
    },
    SectionClaim {
        id: SECTION_GLOBAL,
        name: "global",
        order: order::GLOBAL,
        handler: global::decode,
    },
    SectionClaim {
        id: SECTION_EXPORT,
        name: "export",
        order: order::EXPORT,
        handler: export::decode,
    },
    SectionClaim {
        id: SECTION_START,
        name: "start",
        order: order::START,
        handler: start::decode,
    },
    SectionClaim {
        id: SECTION_ELEMENT,
        name: "element",
        order: order::ELEMENT,
        handler: element::decode,
    },
    SectionClaim {
        id: SECTION_CODE,
        name: "code",
        order: order::CODE,
        handler: code::decode,
    },
    SectionClaim {
        id: SECTION_DATA,
        name: "data",
        order: order::DATA,
        handler: data::decode,
    },
];

impl Feature for Wasm1 {
    fn name(&self) -> &'static str {
        "wasm1"
    }

    fn sections(&self) -> &'static [SectionClaim] {
        &WASM1_SECTIONS
    }
}

/// Decodes the "name" custom section into a [`name::Names`] extension.
pub struct NameSection;

static NAME_CUSTOM: [CustomClaim; 1] = [CustomClaim {
    name: NAME_SECTION,
    handler: name::decode,
}];

impl Feature for NameSection {
    fn name(&self) -> &'static str {
        "name-section"
    }

    fn custom_sections(&self) -> &'static [CustomClaim] {
        &NAME_CUSTOM
    }
}
