//! Value, reference, limits and entity types shared by every section.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    I32,
    I64,
    F32,
    F64,
    V128,
    FuncRef,
    ExternRef,
}

impl ValueType {
    /// Maps a binary type byte onto a value type, without checking whether
    /// the type is enabled.
    pub fn from_byte(byte: u8) -> Option<ValueType> {
        match byte {
            0x7f => Some(ValueType::I32),
            0x7e => Some(ValueType::I64),
            0x7d => Some(ValueType::F32),
            0x7c => Some(ValueType::F64),
            0x7b => Some(ValueType::V128),
            0x70 => Some(ValueType::FuncRef),
            0x6f => Some(ValueType::ExternRef),
            _ => None,
        }
    }

    pub fn byte(&self) -> u8 {
        match self {
            ValueType::I32 => 0x7f,
            ValueType::I64 => 0x7e,
            ValueType::F32 => 0x7d,
            ValueType::F64 => 0x7c,
            ValueType::V128 => 0x7b,
            ValueType::FuncRef => 0x70,
            ValueType::ExternRef => 0x6f,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            ValueType::I32 => "i32",
            ValueType::I64 => "i64",
            ValueType::F32 => "f32",
            ValueType::F64 => "f64",
            ValueType::V128 => "v128",
            ValueType::FuncRef => "funcref",
            ValueType::ExternRef => "externref",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefType {
    FuncRef,
    ExternRef,
}

impl RefType {
    pub fn from_byte(byte: u8) -> Option<RefType> {
        match byte {
            0x70 => Some(RefType::FuncRef),
            0x6f => Some(RefType::ExternRef),
            _ => None,
        }
    }
}

impl From<RefType> for ValueType {
    fn from(ref_type: RefType) -> Self {
        match ref_type {
            RefType::FuncRef => ValueType::FuncRef,
            RefType::ExternRef => ValueType::ExternRef,
        }
    }
}

impl fmt::Display for RefType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        ValueType::from(*self).fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FunctionType {
    pub params: Vec<ValueType>,
    pub results: Vec<ValueType>,
}

impl FunctionType {
    pub fn is_empty(&self) -> bool {
        self.params.is_empty() && self.results.is_empty()
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let join = |types: &[ValueType]| {
            types
                .iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        write!(f, "({}) -> ", join(&self.params))?;
        match self.results.len() {
            0 => f.write_str("nil"),
            1 => write!(f, "{}", self.results[0]),
            _ => write!(f, "({})", join(&self.results)),
        }
    }
}

/// Bounds of a resizable table or memory. `max` is `None` when the binary
/// omits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub min: u64,
    pub max: Option<u64>,
}

impl fmt::Display for Limits {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "initial={}", self.min)?;
        if let Some(max) = self.max {
            write!(f, " max={}", max)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableType {
    pub ref_type: RefType,
    pub limits: Limits,
}

impl fmt::Display for TableType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "type={} {}", self.ref_type, self.limits)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    I32,
    I64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryType {
    pub limits: Limits,
    pub shared: bool,
    pub index_type: IndexType,
}

impl MemoryType {
    /// The value type of addresses (and of active data segment offsets).
    pub fn address_type(&self) -> ValueType {
        match self.index_type {
            IndexType::I32 => ValueType::I32,
            IndexType::I64 => ValueType::I64,
        }
    }
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "pages: {}", self.limits)?;
        if self.shared {
            f.write_str(" shared")?;
        }
        if self.index_type == IndexType::I64 {
            f.write_str(" i64")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalType {
    pub value_type: ValueType,
    pub mutable: bool,
}

impl fmt::Display for GlobalType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} mutable={}", self.value_type, u8::from(self.mutable))
    }
}

/// An exception tag; its function type has no results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagType {
    pub type_index: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_type_bytes() {
        for byte in 0u8..=255 {
            if let Some(value_type) = ValueType::from_byte(byte) {
                assert_eq!(value_type.byte(), byte);
            }
        }
        assert_eq!(ValueType::from_byte(0x40), None);
        assert_eq!(RefType::from_byte(0x7f), None);
    }

    #[test]
    fn test_function_type_display() {
        let ft = FunctionType {
            params: vec![ValueType::I32, ValueType::F64],
            results: vec![],
        };
        assert_eq!(ft.to_string(), "(i32, f64) -> nil");
        let ft = FunctionType {
            params: vec![],
            results: vec![ValueType::I64, ValueType::V128],
        };
        assert_eq!(ft.to_string(), "() -> (i64, v128)");
    }

    #[test]
    fn test_limits_display() {
        let limits = Limits { min: 1, max: Some(2) };
        assert_eq!(limits.to_string(), "initial=1 max=2");
        let memory = MemoryType {
            limits: Limits { min: 3, max: None },
            shared: false,
            index_type: IndexType::I64,
        };
        assert_eq!(memory.to_string(), "pages: initial=3 i64");
        assert_eq!(memory.address_type(), ValueType::I64);
    }
}
