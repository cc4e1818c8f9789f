use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use crate::parser::const_expr::ConstExpr;
use crate::parser::error::{ErrorKind, IndexSpace, ParseError, Result, Warning};
use crate::parser::name::Names;
use crate::parser::types::{FunctionType, GlobalType, MemoryType, RefType, TableType, TagType, ValueType};

/// A decoded module. Index spaces (functions, tables, memories, globals,
/// tags) number imports first, then local definitions.
#[derive(Debug, Default)]
pub struct Module {
    pub name: String,
    pub version: u32,
    /// Length of the whole binary in bytes.
    pub size: usize,

    pub types: TypeSection,
    pub imports: ImportSection,
    pub functions: FunctionSection,
    pub tables: TableSection,
    pub memories: MemorySection,
    pub globals: GlobalSection,
    pub exports: ExportSection,
    pub start: StartSection,
    pub elements: ElementSection,
    pub data_count: DataCountSection,
    pub code: CodeSection,
    pub data: DataSection,
    pub custom: CustomSection,

    /// Storage contributed by enabled features, keyed by type.
    pub extensions: Extensions,
    /// Every section in the order it appeared.
    pub sections: Vec<SectionRecord>,
    /// Non-fatal custom section problems.
    pub warnings: Vec<Warning>,
}

impl Module {
    pub fn new() -> Module {
        Module::default()
    }

    // Index spaces ------------------------------------------------------------

    pub fn function_count(&self) -> u32 {
        self.imports.functions + self.functions.functions.len() as u32
    }

    pub fn table_count(&self) -> u32 {
        self.imports.tables + self.tables.tables.len() as u32
    }

    pub fn memory_count(&self) -> u32 {
        self.imports.memories + self.memories.memories.len() as u32
    }

    pub fn global_count(&self) -> u32 {
        self.imports.globals + self.globals.globals.len() as u32
    }

    pub fn tag_count(&self) -> u32 {
        let defined = self.extensions.get::<TagSection>().map_or(0, |t| t.tags.len() as u32);
        self.imports.tags + defined
    }

    pub fn index_space_len(&self, space: IndexSpace) -> u32 {
        match space {
            IndexSpace::Type => self.types.types.len() as u32,
            IndexSpace::Function => self.function_count(),
            IndexSpace::Table => self.table_count(),
            IndexSpace::Memory => self.memory_count(),
            IndexSpace::Global => self.global_count(),
            IndexSpace::Tag => self.tag_count(),
        }
    }

    /// Fails with an illegal-index error at `at` unless `index` resolves.
    pub fn check_index(&self, space: IndexSpace, index: u32, at: usize) -> Result<()> {
        let count = self.index_space_len(space);
        if index < count {
            Ok(())
        } else {
            Err(ParseError::new(ErrorKind::illegal_index(space, index, count), at))
        }
    }

    /// The `n`th import of `kind`.
    fn nth_import<T>(&self, kind: ExternalKind, n: u32, pick: impl Fn(&ImportDesc) -> Option<T>) -> Option<T> {
        let at = self.imports.by_kind[kind as usize].get(n as usize)?;
        self.imports.imports.get(*at as usize).and_then(|i| pick(&i.desc))
    }

    pub fn function_type_index(&self, index: u32) -> Option<u32> {
        if index < self.imports.functions {
            self.nth_import(ExternalKind::Function, index, |d| match d {
                ImportDesc::Function(type_index) => Some(*type_index),
                _ => None,
            })
        } else {
            let local = (index - self.imports.functions) as usize;
            self.functions.functions.get(local).map(|f| f.ftype_index)
        }
    }

    pub fn function_type(&self, index: u32) -> Option<&FunctionType> {
        self.function_type_index(index)
            .and_then(|type_index| self.types.get(type_index))
    }

    pub fn table_type(&self, index: u32) -> Option<TableType> {
        if index < self.imports.tables {
            self.nth_import(ExternalKind::Table, index, |d| match d {
                ImportDesc::Table(table_type) => Some(*table_type),
                _ => None,
            })
        } else {
            let local = (index - self.imports.tables) as usize;
            self.tables.tables.get(local).copied()
        }
    }

    pub fn memory_type(&self, index: u32) -> Option<MemoryType> {
        if index < self.imports.memories {
            self.nth_import(ExternalKind::Memory, index, |d| match d {
                ImportDesc::Memory(memory_type) => Some(*memory_type),
                _ => None,
            })
        } else {
            let local = (index - self.imports.memories) as usize;
            self.memories.memories.get(local).copied()
        }
    }

    pub fn global_type(&self, index: u32) -> Option<GlobalType> {
        if index < self.imports.globals {
            self.nth_import(ExternalKind::Global, index, |d| match d {
                ImportDesc::Global(global_type) => Some(*global_type),
                _ => None,
            })
        } else {
            let local = (index - self.imports.globals) as usize;
            self.globals.globals.get(local).map(|g| g.global_type)
        }
    }

    pub fn tag_type(&self, index: u32) -> Option<TagType> {
        if index < self.imports.tags {
            self.nth_import(ExternalKind::Tag, index, |d| match d {
                ImportDesc::Tag(tag_type) => Some(*tag_type),
                _ => None,
            })
        } else {
            let local = (index - self.imports.tags) as usize;
            self.extensions.get::<TagSection>()?.tags.get(local).copied()
        }
    }

    /// Debug name of a function: the name section first, then an export.
    pub fn function_name(&self, index: u32) -> Option<&str> {
        if let Some(name) = self.extensions.get::<Names>().and_then(|n| n.function_names.get(&index)) {
            return Some(name);
        }
        self.exports
            .exports
            .iter()
            .find(|e| e.kind == ExternalKind::Function && e.index == index)
            .map(|e| e.name.as_str())
    }

    pub fn names(&self) -> Option<&Names> {
        self.extensions.get::<Names>()
    }

    pub fn tags(&self) -> Option<&TagSection> {
        self.extensions.get::<TagSection>()
    }
}

/// A typed map for storage contributed by features.
#[derive(Default)]
pub struct Extensions {
    map: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Extensions {
    pub fn insert<T: Any + Send + Sync>(&mut self, value: T) -> Option<T> {
        self.map
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|old| old.downcast::<T>().ok())
            .map(|old| *old)
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.map.get(&TypeId::of::<T>()).and_then(|v| v.downcast_ref::<T>())
    }

    pub fn get_mut<T: Any + Send + Sync>(&mut self) -> Option<&mut T> {
        self.map.get_mut(&TypeId::of::<T>()).and_then(|v| v.downcast_mut::<T>())
    }

    pub fn get_or_default<T: Any + Send + Sync + Default>(&mut self) -> &mut T {
        let entry = self
            .map
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(T::default()));
        match entry.downcast_mut::<T>() {
            Some(value) => value,
            None => unreachable!("extension stored under the TypeId of another type"),
        }
    }

    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.map.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Extensions({} entries)", self.map.len())
    }
}

/// Payload byte range `[start, end)` of a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionPosition {
    pub start: usize,
    pub end: usize,
}

impl SectionPosition {
    pub fn new(start: usize, end: usize) -> SectionPosition {
        SectionPosition { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for SectionPosition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "start=0x{:08x} end=0x{:08x} (size=0x{:08x})",
            self.start,
            self.end,
            self.len()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionRecord {
    pub id: u8,
    pub name: String,
    pub position: SectionPosition,
}

pub trait Positional {
    fn set_position(&mut self, start: usize, end: usize);
    fn position(&self) -> Option<SectionPosition>;
}

macro_rules! impl_positional {
    ($($t:ty),*) => {
        $(
            impl Positional for $t {
                fn set_position(&mut self, start: usize, end: usize) {
                    self.position = Some(SectionPosition::new(start, end));
                }

                fn position(&self) -> Option<SectionPosition> {
                    self.position
                }
            }
        )*
    }
}

impl_positional!(
    TypeSection,
    ImportSection,
    FunctionSection,
    TableSection,
    MemorySection,
    GlobalSection,
    ExportSection,
    StartSection,
    ElementSection,
    DataCountSection,
    CodeSection,
    DataSection,
    TagSection
);

pub trait SectionToString {
    fn to_header_string(&self) -> String;
    fn to_details_string(&self, unit: &Module) -> String;
}

fn header(position: Option<SectionPosition>, count: usize) -> String {
    match position {
        Some(position) => format!("{} count: {}", position, count),
        None => format!("count: {}", count),
    }
}

// Sections --------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct TypeSection {
    pub types: Vec<FunctionType>,
    pub position: Option<SectionPosition>,
}

impl TypeSection {
    pub fn push(&mut self, function_type: FunctionType) {
        self.types.push(function_type);
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn get(&self, index: u32) -> Option<&FunctionType> {
        self.types.get(index as usize)
    }
}

impl SectionToString for TypeSection {
    fn to_header_string(&self) -> String {
        header(self.position, self.types.len())
    }

    fn to_details_string(&self, _: &Module) -> String {
        let mut result = format!("Type[{}]:\n", self.types.len());
        for (i, function_type) in self.types.iter().enumerate() {
            result.push_str(&format!(" - type[{}] {}\n", i, function_type));
        }
        result
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportDesc {
    Function(u32),
    Table(TableType),
    Memory(MemoryType),
    Global(GlobalType),
    Tag(TagType),
}

impl ImportDesc {
    pub fn kind(&self) -> ExternalKind {
        match self {
            ImportDesc::Function(_) => ExternalKind::Function,
            ImportDesc::Table(_) => ExternalKind::Table,
            ImportDesc::Memory(_) => ExternalKind::Memory,
            ImportDesc::Global(_) => ExternalKind::Global,
            ImportDesc::Tag(_) => ExternalKind::Tag,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub module: String,
    pub name: String,
    pub desc: ImportDesc,
}

impl fmt::Display for Import {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.desc {
            ImportDesc::Function(type_index) => write!(f, "sig={}", type_index)?,
            ImportDesc::Table(table_type) => write!(f, "{}", table_type)?,
            ImportDesc::Memory(memory_type) => write!(f, "{}", memory_type)?,
            ImportDesc::Global(global_type) => write!(f, "{}", global_type)?,
            ImportDesc::Tag(tag_type) => write!(f, "sig={}", tag_type.type_index)?,
        }
        write!(f, " <- {}.{}", self.module, self.name)
    }
}

/// Imports plus running per-kind counts, which prefix every index space.
#[derive(Debug, Default)]
pub struct ImportSection {
    pub imports: Vec<Import>,
    pub functions: u32,
    pub tables: u32,
    pub memories: u32,
    pub globals: u32,
    pub tags: u32,
    pub position: Option<SectionPosition>,
    // positions in `imports`, per external kind
    by_kind: [Vec<u32>; 5],
}

impl ImportSection {
    pub fn push(&mut self, import: Import) {
        self.by_kind[import.desc.kind() as usize].push(self.imports.len() as u32);
        match import.desc {
            ImportDesc::Function(_) => self.functions += 1,
            ImportDesc::Table(_) => self.tables += 1,
            ImportDesc::Memory(_) => self.memories += 1,
            ImportDesc::Global(_) => self.globals += 1,
            ImportDesc::Tag(_) => self.tags += 1,
        }
        self.imports.push(import);
    }
}

impl SectionToString for ImportSection {
    fn to_header_string(&self) -> String {
        header(self.position, self.imports.len())
    }

    fn to_details_string(&self, _: &Module) -> String {
        let mut result = format!("Import[{}]:\n", self.imports.len());
        let mut counters = [0u32; 5];
        for import in &self.imports {
            let kind = import.desc.kind();
            let counter = &mut counters[kind as usize];
            result.push_str(&format!(" - {}[{}] {}\n", kind, counter, import));
            *counter += 1;
        }
        result
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Function {
    pub ftype_index: u32,
}

#[derive(Debug, Default)]
pub struct FunctionSection {
    pub functions: Vec<Function>,
    pub position: Option<SectionPosition>,
}

impl FunctionSection {
    pub fn push(&mut self, function: Function) {
        self.functions.push(function);
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

fn name_suffix(unit: &Module, function_index: u32) -> String {
    match unit.function_name(function_index) {
        Some(name) => format!(" <{}>", name),
        None => String::new(),
    }
}

impl SectionToString for FunctionSection {
    fn to_header_string(&self) -> String {
        header(self.position, self.functions.len())
    }

    fn to_details_string(&self, unit: &Module) -> String {
        let mut result = format!("Function[{}]:\n", self.functions.len());
        for (i, function) in self.functions.iter().enumerate() {
            let index = unit.imports.functions + i as u32;
            result.push_str(&format!(
                " - func[{}] sig={}{}\n",
                index,
                function.ftype_index,
                name_suffix(unit, index)
            ));
        }
        result
    }
}

#[derive(Debug, Default)]
pub struct TableSection {
    pub tables: Vec<TableType>,
    pub position: Option<SectionPosition>,
}

impl SectionToString for TableSection {
    fn to_header_string(&self) -> String {
        header(self.position, self.tables.len())
    }

    fn to_details_string(&self, unit: &Module) -> String {
        let mut result = format!("Table[{}]:\n", self.tables.len());
        for (i, table_type) in self.tables.iter().enumerate() {
            let index = unit.imports.tables + i as u32;
            result.push_str(&format!(" - table[{}] {}\n", index, table_type));
        }
        result
    }
}

#[derive(Debug, Default)]
pub struct MemorySection {
    pub memories: Vec<MemoryType>,
    pub position: Option<SectionPosition>,
}

impl SectionToString for MemorySection {
    fn to_header_string(&self) -> String {
        header(self.position, self.memories.len())
    }

    fn to_details_string(&self, unit: &Module) -> String {
        let mut result = format!("Memory[{}]:\n", self.memories.len());
        for (i, memory) in self.memories.iter().enumerate() {
            let index = unit.imports.memories + i as u32;
            result.push_str(&format!(" - memory[{}] {}\n", index, memory));
        }
        result
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Global {
    pub global_type: GlobalType,
    pub init: ConstExpr,
}

#[derive(Debug, Default)]
pub struct GlobalSection {
    pub globals: Vec<Global>,
    pub position: Option<SectionPosition>,
}

impl SectionToString for GlobalSection {
    fn to_header_string(&self) -> String {
        header(self.position, self.globals.len())
    }

    fn to_details_string(&self, unit: &Module) -> String {
        let mut result = format!("Global[{}]:\n", self.globals.len());
        for (i, global) in self.globals.iter().enumerate() {
            let index = unit.imports.globals + i as u32;
            result.push_str(&format!(
                " - global[{}] {} - init {}\n",
                index, global.global_type, global.init
            ));
        }
        result
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalKind {
    Function = 0,
    Table = 1,
    Memory = 2,
    Global = 3,
    Tag = 4,
}

impl ExternalKind {
    pub fn index_space(&self) -> IndexSpace {
        match self {
            ExternalKind::Function => IndexSpace::Function,
            ExternalKind::Table => IndexSpace::Table,
            ExternalKind::Memory => IndexSpace::Memory,
            ExternalKind::Global => IndexSpace::Global,
            ExternalKind::Tag => IndexSpace::Tag,
        }
    }
}

impl fmt::Display for ExternalKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            ExternalKind::Function => "func",
            ExternalKind::Table => "table",
            ExternalKind::Memory => "memory",
            ExternalKind::Global => "global",
            ExternalKind::Tag => "tag",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub name: String,
    pub kind: ExternalKind,
    pub index: u32,
}

#[derive(Debug, Default)]
pub struct ExportSection {
    pub exports: Vec<Export>,
    pub position: Option<SectionPosition>,
}

impl ExportSection {
    pub fn push(&mut self, export: Export) {
        self.exports.push(export);
    }

    pub fn find(&self, name: &str) -> Option<&Export> {
        self.exports.iter().find(|e| e.name == name)
    }
}

impl SectionToString for ExportSection {
    fn to_header_string(&self) -> String {
        header(self.position, self.exports.len())
    }

    fn to_details_string(&self, _: &Module) -> String {
        let mut result = format!("Export[{}]:\n", self.exports.len());
        for export in &self.exports {
            result.push_str(&format!(
                " - {}[{}] -> \"{}\"\n",
                export.kind, export.index, export.name
            ));
        }
        result
    }
}

#[derive(Debug, Default)]
pub struct StartSection {
    pub start: Option<u32>,
    pub position: Option<SectionPosition>,
}

impl SectionToString for StartSection {
    fn to_header_string(&self) -> String {
        match (self.position, self.start) {
            (Some(position), Some(start)) => format!("{} start: {}", position, start),
            _ => String::new(),
        }
    }

    fn to_details_string(&self, unit: &Module) -> String {
        match self.start {
            Some(start) => format!(
                "Start:\n - start function: {}{}\n",
                start,
                name_suffix(unit, start)
            ),
            None => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementMode {
    Passive,
    Declarative,
    Active { table_index: u32, offset: ConstExpr },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementItems {
    Functions(Vec<u32>),
    Expressions(Vec<ConstExpr>),
}

impl ElementItems {
    pub fn len(&self) -> usize {
        match self {
            ElementItems::Functions(indices) => indices.len(),
            ElementItems::Expressions(exprs) => exprs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub flags: u32,
    pub ref_type: RefType,
    pub mode: ElementMode,
    pub items: ElementItems,
}

#[derive(Debug, Default)]
pub struct ElementSection {
    pub elements: Vec<Element>,
    pub position: Option<SectionPosition>,
}

impl ElementSection {
    pub fn push(&mut self, element: Element) {
        self.elements.push(element);
    }
}

impl SectionToString for ElementSection {
    fn to_header_string(&self) -> String {
        header(self.position, self.elements.len())
    }

    fn to_details_string(&self, unit: &Module) -> String {
        let mut result = format!("Elem[{}]:\n", self.elements.len());
        for (i, element) in self.elements.iter().enumerate() {
            let mode = match &element.mode {
                ElementMode::Passive => "passive".to_string(),
                ElementMode::Declarative => "declarative".to_string(),
                ElementMode::Active { table_index, offset } => {
                    format!("table={} - init {}", table_index, offset)
                }
            };
            result.push_str(&format!(
                " - segment[{}] flags={} {} count={} {}\n",
                i,
                element.flags,
                element.ref_type,
                element.items.len(),
                mode
            ));
            match &element.items {
                ElementItems::Functions(indices) => {
                    for (j, index) in indices.iter().enumerate() {
                        result.push_str(&format!(
                            "  - elem[{}] = func[{}]{}\n",
                            j,
                            index,
                            name_suffix(unit, *index)
                        ));
                    }
                }
                ElementItems::Expressions(exprs) => {
                    for (j, expr) in exprs.iter().enumerate() {
                        result.push_str(&format!("  - elem[{}] = {}\n", j, expr));
                    }
                }
            }
        }
        result
    }
}

#[derive(Debug, Default)]
pub struct DataCountSection {
    pub count: Option<u32>,
    pub position: Option<SectionPosition>,
}

impl SectionToString for DataCountSection {
    fn to_header_string(&self) -> String {
        header(self.position, self.count.unwrap_or(0) as usize)
    }

    fn to_details_string(&self, _: &Module) -> String {
        match self.count {
            Some(count) => format!("DataCount:\n - data count: {}\n", count),
            None => String::new(),
        }
    }
}

/// Run-length encoded local declarations of one function body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Locals {
    entries: Vec<(u32, ValueType)>,
}

impl Locals {
    pub fn new(entries: Vec<(u32, ValueType)>) -> Locals {
        Locals { entries }
    }

    pub fn entries(&self) -> &[(u32, ValueType)] {
        &self.entries
    }

    /// Total number of declared locals.
    pub fn len(&self) -> u64 {
        self.entries.iter().map(|(count, _)| u64::from(*count)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Type of declared local `index` (not counting parameters).
    pub fn get(&self, index: u32) -> Option<ValueType> {
        let mut remaining = index;
        for (count, value_type) in &self.entries {
            if remaining < *count {
                return Some(*value_type);
            }
            remaining -= count;
        }
        None
    }
}

/// A code section entry. `body` holds the raw instruction bytes, including
/// the final `end`, for the execution engine to decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionBody {
    pub locals: Locals,
    pub body: Vec<u8>,
    pub position: SectionPosition,
}

#[derive(Debug, Default)]
pub struct CodeSection {
    pub code: Vec<FunctionBody>,
    pub position: Option<SectionPosition>,
}

impl CodeSection {
    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }
}

impl SectionToString for CodeSection {
    fn to_header_string(&self) -> String {
        header(self.position, self.code.len())
    }

    fn to_details_string(&self, unit: &Module) -> String {
        let mut result = format!("Code[{}]:\n", self.code.len());
        for (i, function_body) in self.code.iter().enumerate() {
            let index = unit.imports.functions + i as u32;
            result.push_str(&format!(
                " - func[{}] size={} locals={}{}\n",
                index,
                function_body.position.len(),
                function_body.locals.len(),
                name_suffix(unit, index)
            ));
        }
        result
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataMode {
    Passive,
    Active { memory_index: u32, offset: ConstExpr },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Data {
    pub init: Vec<u8>,
    pub mode: DataMode,
}

#[derive(Debug, Default)]
pub struct DataSection {
    pub data: Vec<Data>,
    pub position: Option<SectionPosition>,
}

// Prints bytes in rows of 16 like so:
//   - 0000000: 0100 0000 0000 0000 0100 0000 0000 0080  ................
fn hex_rows(bytes: &[u8]) -> String {
    let mut result = String::new();
    for (row, chunk) in bytes.chunks(16).enumerate() {
        let mut byts = String::new();
        for pair in chunk.chunks(2) {
            byts.push_str(&format!("{:<4} ", hex::encode(pair)));
        }
        let chars: String = chunk
            .iter()
            .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
            .collect();
        result.push_str(&format!("  - {:07x}: {:<40} {}\n", row * 16, byts, chars));
    }
    result
}

impl SectionToString for DataSection {
    fn to_header_string(&self) -> String {
        header(self.position, self.data.len())
    }

    fn to_details_string(&self, _: &Module) -> String {
        let mut result = format!("Data[{}]:\n", self.data.len());
        for (i, data) in self.data.iter().enumerate() {
            let mode = match &data.mode {
                DataMode::Passive => "passive".to_string(),
                DataMode::Active { memory_index, offset } => {
                    format!("memory={} - init {}", memory_index, offset)
                }
            };
            result.push_str(&format!(" - segment[{}] size={} {}\n", i, data.init.len(), mode));
            result.push_str(&hex_rows(&data.init));
        }
        result
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Custom {
    pub name: String,
    pub data: Vec<u8>,
    pub position: SectionPosition,
}

#[derive(Debug, Default)]
pub struct CustomSection {
    pub customs: Vec<Custom>,
}

impl CustomSection {
    pub fn push(&mut self, custom: Custom) {
        self.customs.push(custom);
    }

    pub fn find(&self, name: &str) -> Option<&Custom> {
        self.customs.iter().find(|c| c.name == name)
    }
}

impl SectionToString for CustomSection {
    fn to_header_string(&self) -> String {
        self.customs
            .iter()
            .map(|c| format!("{} \"{}\"", c.position, c.name))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn to_details_string(&self, _: &Module) -> String {
        let mut result = String::new();
        for custom in &self.customs {
            result.push_str(&format!(
                "Custom:\n - name: \"{}\" size={}\n",
                custom.name,
                custom.data.len()
            ));
        }
        result
    }
}

/// Exception tags defined by the module (exception handling).
#[derive(Debug, Default)]
pub struct TagSection {
    pub tags: Vec<TagType>,
    pub position: Option<SectionPosition>,
}

impl SectionToString for TagSection {
    fn to_header_string(&self) -> String {
        header(self.position, self.tags.len())
    }

    fn to_details_string(&self, unit: &Module) -> String {
        let mut result = format!("Tag[{}]:\n", self.tags.len());
        for (i, tag) in self.tags.iter().enumerate() {
            let index = unit.imports.tags + i as u32;
            result.push_str(&format!(" - tag[{}] sig={}\n", index, tag.type_index));
        }
        result
    }
}

// Dumping ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpFormat {
    Headers,
    Details,
}

impl Module {
    fn section_dump(&self, id: u8) -> Option<&dyn SectionToString> {
        use crate::parser::encoding::*;
        let section: &dyn SectionToString = match id {
            SECTION_TYPE => &self.types,
            SECTION_IMPORT => &self.imports,
            SECTION_FUNCTION => &self.functions,
            SECTION_TABLE => &self.tables,
            SECTION_MEMORY => &self.memories,
            SECTION_GLOBAL => &self.globals,
            SECTION_EXPORT => &self.exports,
            SECTION_START => &self.start,
            SECTION_ELEMENT => &self.elements,
            SECTION_CODE => &self.code,
            SECTION_DATA => &self.data,
            SECTION_DATA_COUNT => &self.data_count,
            SECTION_TAG => self.extensions.get::<TagSection>()?,
            _ => return None,
        };
        Some(section)
    }

    pub fn to_string(&self, format: DumpFormat) -> String {
        let mut result = format!("{}:\tfile format wasm 0x{:x}\n\n", self.name, self.version);
        match format {
            DumpFormat::Headers => {
                result.push_str("Sections:\n\n");
                for record in &self.sections {
                    let line = match self.section_dump(record.id) {
                        Some(section) => section.to_header_string(),
                        None => format!("{} \"{}\"", record.position, record.name),
                    };
                    result.push_str(&format!("{:>9} {}\n", capitalize(&record.name), line));
                }
            }
            DumpFormat::Details => {
                result.push_str("Section Details:\n\n");
                for record in &self.sections {
                    match self.section_dump(record.id) {
                        Some(section) => result.push_str(&section.to_details_string(self)),
                        None => result.push_str(&format!(
                            "Custom:\n - name: \"{}\" size={}\n",
                            record.name,
                            record.position.len()
                        )),
                    }
                }
                if let Some(names) = self.names() {
                    result.push_str(&names.to_details_string(self));
                }
            }
        }
        result
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
