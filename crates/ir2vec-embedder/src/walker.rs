//! Entity walker.
//!
//! Produces the ordered symbol stream of a program unit: blocks in program
//! order, instructions in program order, and for each instruction its
//! opcode, its result type (when present) and its operands by position.
//!
//! Walks are lazy and borrow the program. A [`Walk`] can be cloned to
//! restart from its current position, and every call to [`walk`] starts a
//! fresh sequence from the beginning of the unit.

use std::iter::Take;
use std::slice;

use ir2vec_types::{BasicBlock, Granularity, Instruction, ProgramUnit, SymbolRef, UnitId};

/// Position of a symbol within its instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Opcode,
    Type,
    /// Operand at this position
    Operand(usize),
}

/// One symbol occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolVisit<'a> {
    /// Unit the symbol belongs to, truncated to the walk granularity
    pub unit: UnitId,
    /// Instruction the symbol was read from
    pub instruction: UnitId,
    pub slot: Slot,
    pub symbol: SymbolRef<'a>,
}

/// Walk the symbols of `unit`, attributing each to its unit at
/// `granularity`.
pub fn walk(unit: ProgramUnit<'_>, granularity: Granularity) -> Walk<'_> {
    Walk {
        instructions: instructions(unit),
        current: None,
        granularity,
    }
}

/// Instructions of `unit` in program order.
///
/// Declarations yield nothing.
pub fn instructions(unit: ProgramUnit<'_>) -> Instructions<'_> {
    let source = match unit {
        ProgramUnit::Function { id, function } => {
            let blocks: &[BasicBlock] = if function.is_declaration() {
                &[]
            } else {
                &function.blocks
            };
            Source::Blocks {
                function: id.function,
                first_block: 0,
                blocks,
            }
        }
        ProgramUnit::Block { id, block, .. } => Source::Blocks {
            function: id.function,
            first_block: id.block.unwrap_or(0),
            blocks: slice::from_ref(block),
        },
        ProgramUnit::Instruction { id, instruction, .. } => Source::Single {
            id,
            instruction: Some(instruction),
        },
    };
    Instructions {
        source,
        block: 0,
        instruction: 0,
    }
}

/// Instructions that precede `unit` in its enclosing function, in program
/// order. Empty for a function unit.
pub fn preceding_instructions(unit: ProgramUnit<'_>) -> Take<Instructions<'_>> {
    let function = unit.function();
    let id = unit.id();
    let before_block =
        |b: usize| -> usize { function.blocks.iter().take(b).map(BasicBlock::len).sum() };
    let count = match unit {
        ProgramUnit::Function { .. } => 0,
        ProgramUnit::Block { .. } => before_block(id.block.unwrap_or(0)),
        ProgramUnit::Instruction { .. } => {
            before_block(id.block.unwrap_or(0)) + id.instruction.unwrap_or(0)
        }
    };
    instructions(ProgramUnit::Function {
        id: UnitId::function(id.function),
        function,
    })
    .take(count)
}

/// Symbols of one instruction, in slot order.
pub fn instruction_symbols(instruction: &Instruction) -> InstructionSymbols<'_> {
    InstructionSymbols {
        instruction,
        position: 0,
    }
}

/// Iterator returned by [`instruction_symbols`].
#[derive(Debug, Clone)]
pub struct InstructionSymbols<'a> {
    instruction: &'a Instruction,
    /// 0 is the opcode, 1 the type, `2 + i` operand `i`
    position: usize,
}

impl<'a> Iterator for InstructionSymbols<'a> {
    type Item = (Slot, SymbolRef<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        let inst = self.instruction;
        loop {
            let position = self.position;
            match position {
                0 => {
                    self.position = 1;
                    return Some((Slot::Opcode, inst.opcode_symbol()));
                }
                1 => {
                    self.position = 2;
                    if let Some(ty) = inst.type_symbol() {
                        return Some((Slot::Type, ty));
                    }
                }
                _ => {
                    let i = position - 2;
                    let op = inst.operands.get(i)?;
                    self.position += 1;
                    return Some((Slot::Operand(i), op.symbol()));
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
enum Source<'a> {
    Blocks {
        function: usize,
        first_block: usize,
        blocks: &'a [BasicBlock],
    },
    Single {
        id: UnitId,
        instruction: Option<&'a Instruction>,
    },
}

/// Iterator over `(UnitId, &Instruction)`.
#[derive(Debug, Clone)]
pub struct Instructions<'a> {
    source: Source<'a>,
    block: usize,
    instruction: usize,
}

impl<'a> Iterator for Instructions<'a> {
    type Item = (UnitId, &'a Instruction);

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.source {
            Source::Single { id, instruction } => instruction.take().map(|inst| (*id, inst)),
            Source::Blocks {
                function,
                first_block,
                blocks,
            } => {
                let (function, first_block) = (*function, *first_block);
                let blocks: &'a [BasicBlock] = *blocks;
                loop {
                    let block = blocks.get(self.block)?;
                    if let Some(inst) = block.instructions.get(self.instruction) {
                        let id =
                            UnitId::instruction(function, first_block + self.block, self.instruction);
                        self.instruction += 1;
                        return Some((id, inst));
                    }
                    self.block += 1;
                    self.instruction = 0;
                }
            }
        }
    }
}

/// Lazy symbol stream returned by [`walk`].
#[derive(Debug, Clone)]
pub struct Walk<'a> {
    instructions: Instructions<'a>,
    /// Instruction being walked and its remaining symbols
    current: Option<(UnitId, InstructionSymbols<'a>)>,
    granularity: Granularity,
}

impl<'a> Iterator for Walk<'a> {
    type Item = SymbolVisit<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((id, symbols)) = self.current.as_mut() {
                if let Some((slot, symbol)) = symbols.next() {
                    return Some(SymbolVisit {
                        unit: id.truncate(self.granularity),
                        instruction: *id,
                        slot,
                        symbol,
                    });
                }
            }
            let (id, inst) = self.instructions.next()?;
            self.current = Some((id, instruction_symbols(inst)));
        }
    }
}
