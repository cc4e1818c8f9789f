//! The "name" custom section. Decoding is best effort: every problem
//! becomes a [`Warning`] on the module and never fails the parse.

use std::collections::BTreeMap;

use crate::parser::config::Utf8Policy;
use crate::parser::encoding::*;
use crate::parser::error::{ParseError, Result, Warning, WarningKind};
use crate::parser::module::{Module, SectionPosition, SectionToString};
use crate::parser::reader::Reader;
use crate::parser::ParseContext;

/// Debug names, stored as a module extension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Names {
    pub module_name: Option<String>,
    pub function_names: BTreeMap<u32, String>,
    /// Function index to local index to name.
    pub local_names: BTreeMap<u32, BTreeMap<u32, String>>,
    pub position: Option<SectionPosition>,
}

impl Names {
    pub fn local_name(&self, function: u32, local: u32) -> Option<&str> {
        self.local_names.get(&function)?.get(&local).map(String::as_str)
    }
}

impl SectionToString for Names {
    fn to_header_string(&self) -> String {
        format!(
            "functions: {} locals: {}",
            self.function_names.len(),
            self.local_names.len()
        )
    }

    fn to_details_string(&self, _: &Module) -> String {
        let mut result = format!("Custom:\n - name: \"{}\"\n", NAME_SECTION);
        if let Some(name) = &self.module_name {
            result.push_str(&format!(" - module <{}>\n", name));
        }
        for (index, name) in &self.function_names {
            result.push_str(&format!(" - func[{}] <{}>\n", index, name));
        }
        for (function, locals) in &self.local_names {
            for (index, name) in locals {
                result.push_str(&format!(" - func[{}] local[{}] <{}>\n", function, index, name));
            }
        }
        result
    }
}

pub fn decode(module: &mut Module, reader: &mut Reader<'_>, ctx: &ParseContext<'_>) {
    let start = reader.pos();
    if module.extensions.contains::<Names>() {
        push_warning(module, start, WarningKind::DuplicateSection);
        reader.skip_to_end();
        return;
    }

    let mut decoder = NameDecoder {
        function_count: module.function_count(),
        policy: ctx.config.utf8_policy,
        names: Names::default(),
        warnings: vec![],
    };
    decoder.read_subsections(reader);
    reader.skip_to_end();

    let NameDecoder { mut names, warnings, .. } = decoder;
    names.position = Some(SectionPosition::new(start, reader.end()));
    for warning in warnings {
        log::warn!("{}", warning);
        module.warnings.push(warning);
    }
    module.extensions.insert(names);
}

pub(crate) fn push_warning(module: &mut Module, offset: usize, kind: WarningKind) {
    let warning = Warning {
        section: NAME_SECTION.to_string(),
        offset,
        kind,
    };
    log::warn!("{}", warning);
    module.warnings.push(warning);
}

struct NameDecoder {
    function_count: u32,
    policy: Utf8Policy,
    names: Names,
    warnings: Vec<Warning>,
}

impl NameDecoder {
    fn warn(&mut self, offset: usize, kind: WarningKind) {
        self.warnings.push(Warning {
            section: NAME_SECTION.to_string(),
            offset,
            kind,
        });
    }

    fn malformed(&mut self, e: ParseError) {
        self.warn(e.offset, WarningKind::Malformed(e.kind));
    }

    fn read_subsections(&mut self, reader: &mut Reader<'_>) {
        let mut previous: Option<u8> = None;
        while !reader.is_empty() {
            let at = reader.pos();
            let (id, mut sub) = match read_subsection_header(reader) {
                Ok(header) => header,
                Err(e) => return self.malformed(e),
            };
            let sub_start = sub.pos();
            match previous {
                Some(prev) if id == prev => {
                    self.warn(at, WarningKind::DuplicateSubsection(id));
                    continue;
                }
                Some(prev) if id < prev => {
                    self.warn(at, WarningKind::SubsectionOutOfOrder { id, previous: prev });
                    continue;
                }
                _ => {}
            }

            let result = match id {
                NAME_MODULE => self.read_module_name(&mut sub),
                NAME_FUNCTION => self.read_function_names(&mut sub),
                NAME_LOCAL => self.read_local_names(&mut sub),
                _ => {
                    self.warn(at, WarningKind::UnknownSubsection(id));
                    continue;
                }
            };
            previous = Some(id);
            match result {
                Err(e) => self.malformed(e),
                Ok(()) if !sub.is_empty() => {
                    let declared = sub.end() - sub_start;
                    self.warn(
                        sub.pos(),
                        WarningKind::SubsectionSizeMismatch {
                            id,
                            declared,
                            consumed: sub.pos() - sub_start,
                        },
                    );
                }
                Ok(()) => {}
            }
        }
    }

    fn read_module_name(&mut self, reader: &mut Reader<'_>) -> Result<()> {
        self.names.module_name = Some(reader.read_name(self.policy)?);
        Ok(())
    }

    fn read_function_names(&mut self, reader: &mut Reader<'_>) -> Result<()> {
        let bound = self.function_count;
        self.names.function_names = self.read_name_map(reader, Some(bound))?;
        Ok(())
    }

    fn read_local_names(&mut self, reader: &mut Reader<'_>) -> Result<()> {
        let count = reader.read_vu32()?;
        let mut previous = None;
        for _ in 0..count {
            let at = reader.pos();
            let function = reader.read_vu32()?;
            let locals = self.read_name_map(reader, None)?;
            if self.check_index(at, function, previous, Some(self.function_count)) {
                self.names.local_names.insert(function, locals);
            }
            previous = Some(previous.map_or(function, |p: u32| p.max(function)));
        }
        Ok(())
    }

    /// Reads `vec(index name)`. Entries with out-of-order or out-of-range
    /// indices are dropped with a warning.
    fn read_name_map(&mut self, reader: &mut Reader<'_>, bound: Option<u32>) -> Result<BTreeMap<u32, String>> {
        let count = reader.read_vu32()?;
        let mut map = BTreeMap::new();
        let mut previous = None;
        for _ in 0..count {
            let at = reader.pos();
            let index = reader.read_vu32()?;
            let name = reader.read_name(self.policy)?;
            if self.check_index(at, index, previous, bound) {
                map.insert(index, name);
            }
            previous = Some(previous.map_or(index, |p: u32| p.max(index)));
        }
        Ok(map)
    }

    fn check_index(&mut self, at: usize, index: u32, previous: Option<u32>, bound: Option<u32>) -> bool {
        if let Some(previous) = previous {
            if index <= previous {
                self.warn(at, WarningKind::IndexOutOfOrder { index, previous });
                return false;
            }
        }
        if let Some(count) = bound {
            if index >= count {
                self.warn(at, WarningKind::FunctionIndexOutOfRange { index, count });
                return false;
            }
        }
        true
    }
}

fn read_subsection_header<'a>(reader: &mut Reader<'a>) -> Result<(u8, Reader<'a>)> {
    let id = reader.read_byte()?;
    let size = reader.read_vu32()? as usize;
    let sub = reader.sub_reader(size)?;
    Ok((id, sub))
}
