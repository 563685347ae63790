//! Vocabulary symbols.
//!
//! A symbol names one embeddable construct of a program representation:
//! an opcode, a result type, an operand kind or a register class.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The class a symbol belongs to.
///
/// Classes select the vocabulary section a symbol is stored in and the
/// weight applied to it by the `weighted` reduction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum SymbolClass {
    /// Instruction opcode
    Opcode,
    /// Result type of an IR instruction
    Type,
    /// IR operand kind or MIR common operand kind
    #[default]
    Operand,
    /// MIR physical register class
    PhysicalRegister,
    /// MIR virtual register class
    VirtualRegister,
}

impl SymbolClass {
    /// All classes, in canonical order.
    pub const ALL: [SymbolClass; 5] = [
        SymbolClass::Opcode,
        SymbolClass::Type,
        SymbolClass::Operand,
        SymbolClass::PhysicalRegister,
        SymbolClass::VirtualRegister,
    ];

    /// Short lowercase name, used in logs and weight tables.
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolClass::Opcode => "opcode",
            SymbolClass::Type => "type",
            SymbolClass::Operand => "operand",
            SymbolClass::PhysicalRegister => "physical_register",
            SymbolClass::VirtualRegister => "virtual_register",
        }
    }
}

impl fmt::Display for SymbolClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An owned, immutable symbol.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Symbol {
    pub class: SymbolClass,
    pub key: String,
}

impl Symbol {
    pub fn new(class: SymbolClass, key: impl Into<String>) -> Self {
        Self {
            class,
            key: key.into(),
        }
    }

    pub fn opcode(key: impl Into<String>) -> Self {
        Self::new(SymbolClass::Opcode, key)
    }

    pub fn ty(key: impl Into<String>) -> Self {
        Self::new(SymbolClass::Type, key)
    }

    pub fn operand(key: impl Into<String>) -> Self {
        Self::new(SymbolClass::Operand, key)
    }

    /// Borrow this symbol.
    pub fn borrowed(&self) -> SymbolRef<'_> {
        SymbolRef {
            class: self.class,
            key: &self.key,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.class, self.key)
    }
}

/// A borrowed symbol, as yielded by traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolRef<'a> {
    pub class: SymbolClass,
    pub key: &'a str,
}

impl<'a> SymbolRef<'a> {
    pub fn new(class: SymbolClass, key: &'a str) -> Self {
        Self { class, key }
    }

    pub fn to_symbol(&self) -> Symbol {
        Symbol::new(self.class, self.key)
    }
}

impl fmt::Display for SymbolRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.class, self.key)
    }
}
