//! Program representation consumed by the embedding engine.
//!
//! The host compiler infrastructure owns the program; this crate only models
//! the structure the traversal needs:
//!
//! ```text
//! Module -> Function -> BasicBlock -> Instruction -> Operand
//! ```
//!
//! Documents are read from JSON. Keys are normalized per [`Flavor`] on load
//! so that traversal can hand out borrowed symbols.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypesError;
use crate::flavor::Flavor;
use crate::symbol::{SymbolClass, SymbolRef};

/// Level at which embeddings are requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    #[serde(alias = "inst")]
    Instruction,
    #[serde(alias = "bb")]
    Block,
    #[serde(alias = "func")]
    Function,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Instruction => "inst",
            Granularity::Block => "bb",
            Granularity::Function => "func",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "inst" | "instruction" => Ok(Granularity::Instruction),
            "bb" | "block" => Ok(Granularity::Block),
            "func" | "function" => Ok(Granularity::Function),
            other => Err(format!(
                "unknown granularity '{}', expected inst, bb or func",
                other
            )),
        }
    }
}

/// Identity of a program unit inside a module.
///
/// Indices are positions in program order. `block` and `instruction` are
/// `None` above their level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitId {
    pub function: usize,
    pub block: Option<usize>,
    pub instruction: Option<usize>,
}

impl UnitId {
    pub fn function(function: usize) -> Self {
        Self {
            function,
            block: None,
            instruction: None,
        }
    }

    pub fn block(function: usize, block: usize) -> Self {
        Self {
            function,
            block: Some(block),
            instruction: None,
        }
    }

    pub fn instruction(function: usize, block: usize, instruction: usize) -> Self {
        Self {
            function,
            block: Some(block),
            instruction: Some(instruction),
        }
    }

    /// Level of this id.
    pub fn granularity(&self) -> Granularity {
        match (self.block, self.instruction) {
            (Some(_), Some(_)) => Granularity::Instruction,
            (Some(_), None) => Granularity::Block,
            _ => Granularity::Function,
        }
    }

    /// Drop the components below `granularity`.
    ///
    /// Truncating to a finer level than the id carries is a no-op.
    pub fn truncate(&self, granularity: Granularity) -> Self {
        match granularity {
            Granularity::Function => Self::function(self.function),
            Granularity::Block => Self {
                instruction: None,
                ..*self
            },
            Granularity::Instruction => *self,
        }
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}", self.function)?;
        if let Some(b) = self.block {
            write!(f, ".b{}", b)?;
        }
        if let Some(i) = self.instruction {
            write!(f, ".i{}", i)?;
        }
        Ok(())
    }
}

/// One instruction operand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operand {
    /// Symbol class of the operand (operand kind or register class)
    #[serde(default)]
    pub class: SymbolClass,

    /// Vocabulary key, e.g. `Variable`, `Constant`, `Immediate`, `GR32`
    #[serde(alias = "key")]
    pub kind: String,

    /// Name of the value this operand reads, if it is produced by an
    /// instruction of the same function
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Operand {
    pub fn new(class: SymbolClass, kind: impl Into<String>) -> Self {
        Self {
            class,
            kind: kind.into(),
            value: None,
        }
    }

    /// IR operand of the given kind.
    pub fn kind(kind: impl Into<String>) -> Self {
        Self::new(SymbolClass::Operand, kind)
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn symbol(&self) -> SymbolRef<'_> {
        SymbolRef::new(self.class, &self.kind)
    }
}

/// One instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: String,

    /// Result type (IR only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,

    /// Name of the value this instruction defines
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,

    #[serde(default)]
    pub operands: Vec<Operand>,

    /// Printed form, used as the label of instruction embeddings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Instruction {
    pub fn new(opcode: impl Into<String>) -> Self {
        Self {
            opcode: opcode.into(),
            ty: None,
            result: None,
            operands: Vec::new(),
            text: None,
        }
    }

    pub fn with_type(mut self, ty: impl Into<String>) -> Self {
        self.ty = Some(ty.into());
        self
    }

    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.result = Some(result.into());
        self
    }

    pub fn with_operand(mut self, operand: Operand) -> Self {
        self.operands.push(operand);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn opcode_symbol(&self) -> SymbolRef<'_> {
        SymbolRef::new(SymbolClass::Opcode, &self.opcode)
    }

    pub fn type_symbol(&self) -> Option<SymbolRef<'_>> {
        self.ty
            .as_deref()
            .map(|ty| SymbolRef::new(SymbolClass::Type, ty))
    }

    /// Label used in embedding listings: the printed form when present,
    /// otherwise a synthesized one.
    pub fn label(&self) -> String {
        if let Some(text) = &self.text {
            return text.clone();
        }
        let mut label = String::new();
        if let Some(result) = &self.result {
            label.push_str(result);
            label.push_str(" = ");
        }
        label.push_str(&self.opcode);
        if let Some(ty) = &self.ty {
            label.push(' ');
            label.push_str(ty);
        }
        for (i, op) in self.operands.iter().enumerate() {
            label.push_str(if i == 0 { " " } else { ", " });
            label.push_str(op.value.as_deref().unwrap_or(&op.kind));
        }
        label
    }
}

/// One basic block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BasicBlock {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub instructions: Vec<Instruction>,
}

impl BasicBlock {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: Vec::new(),
        }
    }

    pub fn with_instruction(mut self, instruction: Instruction) -> Self {
        self.instructions.push(instruction);
        self
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

/// One function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Function {
    /// Symbol name as it appears in the module (possibly mangled)
    pub name: String,

    /// Human readable name, when the producer demangled it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demangled_name: Option<String>,

    /// External declaration without a body
    #[serde(default)]
    pub declaration: bool,

    #[serde(default)]
    pub blocks: Vec<BasicBlock>,
}

impl Function {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn declaration(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declaration: true,
            ..Default::default()
        }
    }

    pub fn with_block(mut self, block: BasicBlock) -> Self {
        self.blocks.push(block);
        self
    }

    pub fn with_demangled_name(mut self, name: impl Into<String>) -> Self {
        self.demangled_name = Some(name.into());
        self
    }

    /// Declarations and functions without blocks have no body to embed.
    pub fn is_declaration(&self) -> bool {
        self.declaration || self.blocks.is_empty()
    }

    /// Demangled name, falling back to the symbol name.
    pub fn display_name(&self) -> &str {
        self.demangled_name.as_deref().unwrap_or(&self.name)
    }

    /// Base name of the function: the demangled name without its parameter
    /// list and enclosing scopes (`ns::foo(int)` -> `foo`).
    pub fn base_name(&self) -> String {
        let display = self.display_name();
        let without_params = display.split('(').next().unwrap_or(display);
        without_params
            .rsplit("::")
            .next()
            .unwrap_or(without_params)
            .trim()
            .to_string()
    }

    pub fn instruction_count(&self) -> usize {
        self.blocks.iter().map(BasicBlock::len).sum()
    }
}

/// A module: the top-level program document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Module {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub flavor: Flavor,

    #[serde(default)]
    pub functions: Vec<Function>,
}

impl Module {
    pub fn new(name: impl Into<String>, flavor: Flavor) -> Self {
        Self {
            name: name.into(),
            flavor,
            functions: Vec::new(),
        }
    }

    pub fn with_function(mut self, function: Function) -> Self {
        self.functions.push(function);
        self
    }

    /// Decode a JSON program document and normalize its keys.
    pub fn from_json_str(json: &str) -> Result<Self, TypesError> {
        let mut module: Module = serde_json::from_str(json)?;
        module.normalize_keys();
        Ok(module)
    }

    /// Read and decode a JSON program document.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TypesError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Rewrite every opcode, type and operand key to its vocabulary key.
    pub fn normalize_keys(&mut self) {
        let flavor = self.flavor;
        for inst in self
            .functions
            .iter_mut()
            .flat_map(|f| f.blocks.iter_mut())
            .flat_map(|b| b.instructions.iter_mut())
        {
            inst.opcode = flavor.normalize_key(SymbolClass::Opcode, &inst.opcode);
            if let Some(ty) = inst.ty.as_mut() {
                *ty = flavor.normalize_key(SymbolClass::Type, ty);
            }
            for op in inst.operands.iter_mut() {
                op.kind = flavor.normalize_key(op.class, &op.kind);
            }
        }
    }

    /// Find a function by symbol name or demangled name.
    pub fn function_index(&self, name: &str) -> Option<usize> {
        self.functions
            .iter()
            .position(|f| f.name == name || f.demangled_name.as_deref() == Some(name))
    }

    /// Defined (non-declaration) functions with their indices.
    pub fn defined_functions(&self) -> impl Iterator<Item = (usize, &Function)> {
        self.functions
            .iter()
            .enumerate()
            .filter(|(_, f)| !f.is_declaration())
    }

    /// Resolve a unit id to the unit it names.
    pub fn unit(&self, id: UnitId) -> Option<ProgramUnit<'_>> {
        let function = self.functions.get(id.function)?;
        let Some(b) = id.block else {
            return Some(ProgramUnit::Function { id, function });
        };
        let block = function.blocks.get(b)?;
        let Some(i) = id.instruction else {
            return Some(ProgramUnit::Block {
                id,
                function,
                block,
            });
        };
        let instruction = block.instructions.get(i)?;
        Some(ProgramUnit::Instruction {
            id,
            function,
            instruction,
        })
    }
}

/// A borrowed program unit together with its identity.
#[derive(Debug, Clone, Copy)]
pub enum ProgramUnit<'a> {
    Function {
        id: UnitId,
        function: &'a Function,
    },
    /// Block `id.block` of `function`
    Block {
        id: UnitId,
        function: &'a Function,
        block: &'a BasicBlock,
    },
    /// Instruction `id.instruction` of block `id.block` of `function`
    Instruction {
        id: UnitId,
        function: &'a Function,
        instruction: &'a Instruction,
    },
}

impl<'a> ProgramUnit<'a> {
    /// A standalone function, identified as function 0.
    pub fn from_function(function: &'a Function) -> Self {
        ProgramUnit::Function {
            id: UnitId::function(0),
            function,
        }
    }

    pub fn id(&self) -> UnitId {
        match self {
            ProgramUnit::Function { id, .. }
            | ProgramUnit::Block { id, .. }
            | ProgramUnit::Instruction { id, .. } => *id,
        }
    }

    /// The function this unit belongs to.
    pub fn function(&self) -> &'a Function {
        match *self {
            ProgramUnit::Function { function, .. }
            | ProgramUnit::Block { function, .. }
            | ProgramUnit::Instruction { function, .. } => function,
        }
    }

    pub fn granularity(&self) -> Granularity {
        match self {
            ProgramUnit::Function { .. } => Granularity::Function,
            ProgramUnit::Block { .. } => Granularity::Block,
            ProgramUnit::Instruction { .. } => Granularity::Instruction,
        }
    }
}
