//! Feature composition.
//!
//! A [`Feature`] is a zero-sized descriptor for one WebAssembly proposal (or
//! the core format itself). It declares which binary format versions it
//! applies to, which section ids and custom section names it decodes, which
//! storage it adds to a [`Module`], and which [`Capabilities`] it switches on.
//!
//! [`Composition::compose`] resolves a list of features into one
//! [`FeatureSet`] per binary format version: a dispatch table indexed by
//! section id, a custom section handler map and the merged capabilities.
//! Two features claiming the same section id or custom name for the same
//! version is a [`CompositionError`]; the parser never has to decide between
//! handlers at parse time.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use once_cell::sync::Lazy;
use thiserror::Error;

use crate::parser::error::Result;
use crate::parser::module::{Extensions, Module};
use crate::parser::reader::Reader;
use crate::parser::types::{RefType, ValueType};
use crate::parser::ParseContext;

mod proposals;
mod wasm1;

pub use proposals::{
    BulkMemory, ExceptionHandling, ExtendedConst, Memory64, MultiMemory, MultiValue,
    ReferenceTypes, Simd, Threads,
};
pub use wasm1::{NameSection, Wasm1};

/// Decodes one section payload into the module. The reader is bounded to
/// the section and must be consumed exactly.
pub type SectionHandler = fn(&mut Module, &mut Reader<'_>, &ParseContext<'_>) -> Result<()>;

/// Decodes a named custom section payload (after the name). Problems are
/// recorded as warnings on the module; custom handlers cannot fail a parse.
pub type CustomHandler = fn(&mut Module, &mut Reader<'_>, &ParseContext<'_>);

/// Canonical section ranks. Proposal sections slot in between the core
/// ones: tags before globals, the data count before code.
pub mod order {
    pub const TYPE: u8 = 1;
    pub const IMPORT: u8 = 2;
    pub const FUNCTION: u8 = 3;
    pub const TABLE: u8 = 4;
    pub const MEMORY: u8 = 5;
    pub const TAG: u8 = 6;
    pub const GLOBAL: u8 = 7;
    pub const EXPORT: u8 = 8;
    pub const START: u8 = 9;
    pub const ELEMENT: u8 = 10;
    pub const DATA_COUNT: u8 = 11;
    pub const CODE: u8 = 12;
    pub const DATA: u8 = 13;
}

/// A feature's claim on a section id.
#[derive(Debug)]
pub struct SectionClaim {
    pub id: u8,
    pub name: &'static str,
    /// Canonical position in the section sequence; sections must appear in
    /// increasing order of this rank.
    pub order: u8,
    pub handler: SectionHandler,
}

#[derive(Debug)]
pub struct CustomClaim {
    pub name: &'static str,
    pub handler: CustomHandler,
}

/// Language constructs switched on by the enabled features.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub multi_value: bool,
    pub bulk_memory: bool,
    pub reference_types: bool,
    pub simd: bool,
    pub multi_memory: bool,
    pub memory64: bool,
    pub threads: bool,
    pub extended_const: bool,
    pub exceptions: bool,
}

impl Capabilities {
    pub fn allows_value_type(&self, value_type: ValueType) -> bool {
        match value_type {
            ValueType::I32 | ValueType::I64 | ValueType::F32 | ValueType::F64 => true,
            ValueType::V128 => self.simd,
            ValueType::FuncRef | ValueType::ExternRef => self.reference_types,
        }
    }

    /// Table element and `ref.null` types. `funcref` tables predate the
    /// reference types proposal.
    pub fn allows_ref_type(&self, ref_type: RefType) -> bool {
        match ref_type {
            RefType::FuncRef => true,
            RefType::ExternRef => self.reference_types,
        }
    }

    pub fn allows_multi_table(&self) -> bool {
        self.reference_types
    }

    /// Passive and declarative segments.
    pub fn allows_segment_modes(&self) -> bool {
        self.bulk_memory || self.reference_types
    }
}

pub trait Feature: Sync {
    fn name(&self) -> &'static str;

    fn binfmt_versions(&self) -> &'static [u32] {
        &[1]
    }

    fn sections(&self) -> &'static [SectionClaim] {
        &[]
    }

    fn custom_sections(&self) -> &'static [CustomClaim] {
        &[]
    }

    fn capabilities(&self, _caps: &mut Capabilities) {}

    /// Seeds the storage this feature contributes to every new module.
    fn init_storage(&self, _extensions: &mut Extensions) {}
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompositionError {
    #[error("no features to compose")]
    NoFeatures,
    #[error("feature {0} listed twice")]
    DuplicateFeature(&'static str),
    #[error("section id {id} claimed by both {first} and {second} for binfmt version {version}")]
    DuplicateSectionHandler {
        id: u8,
        version: u32,
        first: &'static str,
        second: &'static str,
    },
    #[error("custom section \"{name}\" claimed by both {first} and {second} for binfmt version {version}")]
    DuplicateCustomHandler {
        name: &'static str,
        version: u32,
        first: &'static str,
        second: &'static str,
    },
}

#[derive(Clone, Copy)]
pub struct ResolvedSection {
    pub claim: &'static SectionClaim,
    pub feature: &'static str,
}

/// The features enabled for one binary format version, resolved into a
/// dispatch table.
pub struct FeatureSet {
    version: u32,
    features: Vec<&'static dyn Feature>,
    sections: Vec<Option<ResolvedSection>>,
    customs: BTreeMap<&'static str, (CustomHandler, &'static str)>,
    capabilities: Capabilities,
}

impl FeatureSet {
    fn resolve(
        version: u32,
        features: Vec<&'static dyn Feature>,
    ) -> std::result::Result<FeatureSet, CompositionError> {
        let mut sections: Vec<Option<ResolvedSection>> = vec![None; 256];
        let mut customs: BTreeMap<&'static str, (CustomHandler, &'static str)> = BTreeMap::new();
        let mut capabilities = Capabilities::default();

        for feature in &features {
            for claim in feature.sections() {
                if let Some(existing) = &sections[claim.id as usize] {
                    return Err(CompositionError::DuplicateSectionHandler {
                        id: claim.id,
                        version,
                        first: existing.feature,
                        second: feature.name(),
                    });
                }
                sections[claim.id as usize] = Some(ResolvedSection {
                    claim,
                    feature: feature.name(),
                });
            }
            for claim in feature.custom_sections() {
                if let Some((_, first)) = customs.get(claim.name) {
                    return Err(CompositionError::DuplicateCustomHandler {
                        name: claim.name,
                        version,
                        first: *first,
                        second: feature.name(),
                    });
                }
                customs.insert(claim.name, (claim.handler, feature.name()));
            }
            feature.capabilities(&mut capabilities);
        }

        Ok(FeatureSet {
            version,
            features,
            sections,
            customs,
            capabilities,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn feature_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.features.iter().map(|f| f.name())
    }

    pub fn section(&self, id: u8) -> Option<&ResolvedSection> {
        self.sections[id as usize].as_ref()
    }

    pub fn custom_handler(&self, name: &str) -> Option<CustomHandler> {
        self.customs.get(name).map(|(handler, _)| *handler)
    }

    /// An empty module carrying the storage of every enabled feature.
    pub fn new_module(&self) -> Module {
        let mut module = Module::new();
        module.version = self.version;
        for feature in &self.features {
            feature.init_storage(&mut module.extensions);
        }
        module
    }
}

impl fmt::Debug for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("FeatureSet")
            .field("version", &self.version)
            .field("features", &self.feature_names().collect::<Vec<_>>())
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

/// Feature sets for every binary format version the features target.
#[derive(Debug)]
pub struct Composition {
    sets: BTreeMap<u32, FeatureSet>,
}

impl Composition {
    pub fn compose(features: &[&'static dyn Feature]) -> std::result::Result<Composition, CompositionError> {
        if features.is_empty() {
            return Err(CompositionError::NoFeatures);
        }
        let mut names = BTreeSet::new();
        let mut versions = BTreeSet::new();
        for feature in features {
            if !names.insert(feature.name()) {
                return Err(CompositionError::DuplicateFeature(feature.name()));
            }
            versions.extend(feature.binfmt_versions().iter().copied());
        }

        let mut sets = BTreeMap::new();
        for version in versions {
            let enabled = features
                .iter()
                .copied()
                .filter(|f| f.binfmt_versions().contains(&version))
                .collect();
            sets.insert(version, FeatureSet::resolve(version, enabled)?);
        }
        log::debug!(
            "composed {} features for binfmt versions {:?}",
            features.len(),
            sets.keys().collect::<Vec<_>>()
        );
        Ok(Composition { sets })
    }

    pub fn for_version(&self, version: u32) -> Option<&FeatureSet> {
        self.sets.get(&version)
    }

    pub fn versions(&self) -> impl Iterator<Item = u32> + '_ {
        self.sets.keys().copied()
    }
}

/// The features compiled into this build, selected by Cargo features.
pub fn builtin_features() -> Vec<&'static dyn Feature> {
    let mut features: Vec<&'static dyn Feature> = vec![&Wasm1];
    #[cfg(feature = "multi-value")]
    features.push(&MultiValue);
    #[cfg(feature = "bulk-memory")]
    features.push(&BulkMemory);
    #[cfg(feature = "reference-types")]
    features.push(&ReferenceTypes);
    #[cfg(feature = "simd")]
    features.push(&Simd);
    #[cfg(feature = "multi-memory")]
    features.push(&MultiMemory);
    #[cfg(feature = "memory64")]
    features.push(&Memory64);
    #[cfg(feature = "threads")]
    features.push(&Threads);
    #[cfg(feature = "extended-const")]
    features.push(&ExtendedConst);
    #[cfg(feature = "exceptions")]
    features.push(&ExceptionHandling);
    #[cfg(feature = "name-section")]
    features.push(&NameSection);
    features
}

static BUILTIN: Lazy<Composition> = Lazy::new(|| match Composition::compose(&builtin_features()) {
    Ok(composition) => composition,
    Err(e) => panic!("built-in feature composition is invalid: {e}"),
});

pub fn builtin() -> &'static Composition {
    &BUILTIN
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::error::{ErrorKind, ParseError};

    fn reject(_: &mut Module, reader: &mut Reader<'_>, _: &ParseContext<'_>) -> Result<()> {
        Err(ParseError::new(ErrorKind::IllegalSectionId(99), reader.pos()))
    }

    fn ignore(_: &mut Module, reader: &mut Reader<'_>, _: &ParseContext<'_>) {
        reader.skip_to_end();
    }

    struct ClaimsType;

    static TYPE_CLAIM: [SectionClaim; 1] = [SectionClaim {
        id: 1,
        name: "type",
        order: 1,
        handler: reject,
    }];

    impl Feature for ClaimsType {
        fn name(&self) -> &'static str {
            "claims-type"
        }

        fn sections(&self) -> &'static [SectionClaim] {
            &TYPE_CLAIM
        }
    }

    struct ClaimsName;

    static NAME_CLAIM: [CustomClaim; 1] = [CustomClaim {
        name: "name",
        handler: ignore,
    }];

    impl Feature for ClaimsName {
        fn name(&self) -> &'static str {
            "claims-name"
        }

        fn binfmt_versions(&self) -> &'static [u32] {
            &[1, 2]
        }

        fn custom_sections(&self) -> &'static [CustomClaim] {
            &NAME_CLAIM
        }
    }

    #[test]
    fn test_duplicate_section_claim_is_rejected() {
        let err = Composition::compose(&[&Wasm1, &ClaimsType]).unwrap_err();
        assert_eq!(
            err,
            CompositionError::DuplicateSectionHandler {
                id: 1,
                version: 1,
                first: "wasm1",
                second: "claims-type",
            }
        );
    }

    #[test]
    fn test_duplicate_custom_claim_is_rejected() {
        let err = Composition::compose(&[&Wasm1, &NameSection, &ClaimsName]).unwrap_err();
        assert!(matches!(
            err,
            CompositionError::DuplicateCustomHandler { name: "name", .. }
        ));
    }

    #[test]
    fn test_duplicate_feature_and_empty_list() {
        assert_eq!(
            Composition::compose(&[&Wasm1, &Wasm1]).unwrap_err(),
            CompositionError::DuplicateFeature("wasm1")
        );
        assert_eq!(Composition::compose(&[]).unwrap_err(), CompositionError::NoFeatures);
    }

    #[test]
    fn test_sets_are_resolved_per_version() {
        let composition = Composition::compose(&[&Wasm1, &ClaimsName]).unwrap();
        assert_eq!(composition.versions().collect::<Vec<_>>(), vec![1, 2]);

        let v1 = composition.for_version(1).unwrap();
        assert_eq!(v1.section(1).unwrap().feature, "wasm1");
        assert!(v1.custom_handler("name").is_some());

        // only the name feature targets version 2
        let v2 = composition.for_version(2).unwrap();
        assert!(v2.section(1).is_none());
        assert!(v2.custom_handler("name").is_some());
        assert!(composition.for_version(3).is_none());
    }

    #[test]
    fn test_capabilities_are_merged() {
        let composition = Composition::compose(&[&Wasm1, &Simd, &ReferenceTypes]).unwrap();
        let caps = composition.for_version(1).unwrap().capabilities();
        assert!(caps.simd && caps.reference_types);
        assert!(!caps.memory64);
        assert!(caps.allows_value_type(ValueType::V128));
        assert!(caps.allows_segment_modes());

        let plain = Composition::compose(&[&Wasm1]).unwrap();
        let caps = plain.for_version(1).unwrap().capabilities();
        assert!(!caps.allows_value_type(ValueType::V128));
        assert!(!caps.allows_value_type(ValueType::ExternRef));
        assert!(caps.allows_ref_type(RefType::FuncRef));
    }

    #[test]
    fn test_unclaimed_ids_have_no_handler() {
        let composition = Composition::compose(&[&Wasm1]).unwrap();
        let set = composition.for_version(1).unwrap();
        assert!(set.section(0).is_none());
        assert!(set.section(12).is_none());
        assert!(set.section(13).is_none());
        assert_eq!(set.section(10).unwrap().claim.name, "code");
    }

    #[test]
    fn test_builtin_composes() {
        let set = builtin().for_version(1).expect("version 1 is always built in");
        assert_eq!(set.feature_names().next(), Some("wasm1"));
    }
}
