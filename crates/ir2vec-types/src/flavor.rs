//! Program representation flavors.
//!
//! A flavor fixes which symbol classes exist, what the vocabulary sections
//! are called, how raw keys are normalized, and the canonical entity layout.
//!
//! - `Ir`: opcodes, result types and operand kinds of LLVM-style IR.
//! - `Mir`: opcodes, common operands and register classes of machine IR.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::symbol::SymbolClass;

/// Canonical IR opcodes, in opcode-number order.
pub const IR_OPCODES: &[&str] = &[
    "Ret",
    "Br",
    "Switch",
    "IndirectBr",
    "Invoke",
    "Resume",
    "Unreachable",
    "CleanupRet",
    "CatchRet",
    "CatchSwitch",
    "CallBr",
    "FNeg",
    "Add",
    "FAdd",
    "Sub",
    "FSub",
    "Mul",
    "FMul",
    "UDiv",
    "SDiv",
    "FDiv",
    "URem",
    "SRem",
    "FRem",
    "Shl",
    "LShr",
    "AShr",
    "And",
    "Or",
    "Xor",
    "Alloca",
    "Load",
    "Store",
    "GetElementPtr",
    "Fence",
    "AtomicCmpXchg",
    "AtomicRMW",
    "Trunc",
    "ZExt",
    "SExt",
    "FPToUI",
    "FPToSI",
    "UIToFP",
    "SIToFP",
    "FPTrunc",
    "FPExt",
    "PtrToInt",
    "IntToPtr",
    "BitCast",
    "AddrSpaceCast",
    "CleanupPad",
    "CatchPad",
    "ICmp",
    "FCmp",
    "PHI",
    "Call",
    "Select",
    "UserOp1",
    "UserOp2",
    "VAArg",
    "ExtractElement",
    "InsertElement",
    "ShuffleVector",
    "ExtractValue",
    "InsertValue",
    "LandingPad",
    "Freeze",
];

/// Canonical IR type keys. Every floating point kind collapses to `FloatTy`.
pub const IR_TYPES: &[&str] = &[
    "FloatTy",
    "VoidTy",
    "LabelTy",
    "MetadataTy",
    "VectorTy",
    "TokenTy",
    "IntegerTy",
    "FunctionTy",
    "PointerTy",
    "StructTy",
    "ArrayTy",
    "UnknownTy",
];

/// Canonical IR operand kinds.
pub const IR_OPERAND_KINDS: &[&str] = &["Function", "Pointer", "Constant", "Variable"];

/// Canonical MIR common operand kinds.
pub const MIR_COMMON_OPERANDS: &[&str] = &[
    "Immediate",
    "CImmediate",
    "FPImmediate",
    "MBB",
    "FrameIndex",
    "ConstantPoolIndex",
    "TargetIndex",
    "JumpTableIndex",
    "ExternalSymbol",
    "GlobalAddress",
    "BlockAddress",
    "RegisterMask",
    "RegisterLiveOut",
    "Metadata",
    "MCSymbol",
    "CFIIndex",
    "IntrinsicID",
    "Predicate",
    "ShuffleMask",
    "DbgInstrRef",
];

const IR_CLASSES: &[SymbolClass] = &[SymbolClass::Opcode, SymbolClass::Type, SymbolClass::Operand];

const MIR_CLASSES: &[SymbolClass] = &[
    SymbolClass::Opcode,
    SymbolClass::Operand,
    SymbolClass::PhysicalRegister,
    SymbolClass::VirtualRegister,
];

/// Program representation flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Flavor {
    /// LLVM-style IR
    #[default]
    Ir,
    /// Machine IR
    Mir,
}

impl Flavor {
    /// Symbol classes that can appear in a program of this flavor.
    pub fn classes(&self) -> &'static [SymbolClass] {
        match self {
            Flavor::Ir => IR_CLASSES,
            Flavor::Mir => MIR_CLASSES,
        }
    }

    /// Whether `class` exists in this flavor.
    pub fn has_class(&self, class: SymbolClass) -> bool {
        self.classes().contains(&class)
    }

    /// Vocabulary section name holding symbols of `class`.
    pub fn section_name(&self, class: SymbolClass) -> Option<&'static str> {
        match (self, class) {
            (_, SymbolClass::Opcode) => Some("Opcodes"),
            (Flavor::Ir, SymbolClass::Type) => Some("Types"),
            (Flavor::Ir, SymbolClass::Operand) => Some("Arguments"),
            (Flavor::Mir, SymbolClass::Operand) => Some("CommonOperands"),
            (Flavor::Mir, SymbolClass::PhysicalRegister) => Some("PhysicalRegisters"),
            (Flavor::Mir, SymbolClass::VirtualRegister) => Some("VirtualRegisters"),
            _ => None,
        }
    }

    /// Symbol class stored under a vocabulary section name.
    pub fn class_for_section(&self, section: &str) -> Option<SymbolClass> {
        self.classes()
            .iter()
            .copied()
            .find(|class| self.section_name(*class) == Some(section))
    }

    /// Normalize a raw key into its vocabulary key.
    pub fn normalize_key(&self, class: SymbolClass, raw: &str) -> String {
        match (self, class) {
            (Flavor::Ir, SymbolClass::Opcode) => normalize_ir_opcode(raw),
            (Flavor::Ir, SymbolClass::Type) => normalize_ir_type(raw).to_string(),
            (Flavor::Mir, SymbolClass::Opcode) => normalize_mir_opcode(raw),
            _ => raw.trim().to_string(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Flavor::Ir => "ir",
            Flavor::Mir => "mir",
        }
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Flavor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ir" => Ok(Flavor::Ir),
            "mir" => Ok(Flavor::Mir),
            other => Err(format!("unknown flavor '{}', expected 'ir' or 'mir'", other)),
        }
    }
}

/// Map an LLVM opcode mnemonic or canonical name to its canonical name.
///
/// Unrecognized names are returned unchanged.
pub fn normalize_ir_opcode(raw: &str) -> String {
    let raw = raw.trim();
    IR_OPCODES
        .iter()
        .find(|op| op.eq_ignore_ascii_case(raw))
        .map(|op| op.to_string())
        .unwrap_or_else(|| raw.to_string())
}

/// Collapse an LLVM type spelling to a canonical type key.
pub fn normalize_ir_type(raw: &str) -> &'static str {
    let raw = raw.trim();
    if let Some(canonical) = IR_TYPES.iter().copied().find(|ty| *ty == raw) {
        return canonical;
    }
    if raw.ends_with('*') || raw == "ptr" || raw.starts_with("ptr addrspace") {
        return "PointerTy";
    }
    if raw.starts_with('{') || raw.starts_with("<{") || raw.starts_with("%struct.") {
        return "StructTy";
    }
    if raw.starts_with('<') {
        return "VectorTy";
    }
    if raw.starts_with('[') {
        return "ArrayTy";
    }
    match raw {
        "void" => "VoidTy",
        "label" => "LabelTy",
        "metadata" => "MetadataTy",
        "token" => "TokenTy",
        "half" | "bfloat" | "float" | "double" | "fp128" | "x86_fp80" | "ppc_fp128" => "FloatTy",
        _ if is_integer_type(raw) => "IntegerTy",
        _ if raw.contains('(') => "FunctionTy",
        _ => "UnknownTy",
    }
}

fn is_integer_type(raw: &str) -> bool {
    raw.strip_prefix('i')
        .map(|bits| !bits.is_empty() && bits.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false)
}

/// Reduce a target opcode name to its base name (`ADD32rr` -> `ADD`).
///
/// Takes the leading run of uppercase letters and underscores, without
/// trailing underscores. Names with no such prefix are returned unchanged.
pub fn normalize_mir_opcode(raw: &str) -> String {
    let raw = raw.trim();
    let prefix: String = raw
        .chars()
        .take_while(|c| c.is_ascii_uppercase() || *c == '_')
        .collect();
    let base = prefix.trim_end_matches('_');
    if base.is_empty() {
        raw.to_string()
    } else {
        base.to_string()
    }
}
