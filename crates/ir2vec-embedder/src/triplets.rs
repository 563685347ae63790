//! Triplet generation for vocabulary training.
//!
//! Each instruction contributes `(head, tail, relation)` triples over entity
//! ids:
//! - `Next` from the previous opcode of the function to this opcode
//! - `Type` from the opcode to the result type, when there is one
//! - `Arg_i` from the opcode to the i-th operand (relation `2 + i`)

use std::fmt::Write;

use serde::{Deserialize, Serialize};
use tracing::debug;

use ir2vec_types::{Function, Module, ProgramUnit, SymbolRef};
use ir2vec_vocab::EntityTable;

use crate::error::ConfigurationError;
use crate::walker::{instruction_symbols, instructions, Slot};

/// Relation between an opcode and its result type.
pub const TYPE_RELATION: u32 = 0;
/// Relation between consecutive opcodes.
pub const NEXT_RELATION: u32 = 1;
/// Relation between an opcode and its first operand; operand `i` uses
/// `ARG_RELATION + i`.
pub const ARG_RELATION: u32 = 2;

/// One training triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triplet {
    pub head: usize,
    pub tail: usize,
    pub relation: u32,
}

/// Triplets with the largest relation id they may use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripletResult {
    pub max_relation: u32,
    pub triplets: Vec<Triplet>,
}

impl TripletResult {
    /// `MAX_RELATION=<n>` followed by one `head\ttail\trelation` line per
    /// triplet.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "MAX_RELATION={}", self.max_relation);
        for t in &self.triplets {
            let _ = writeln!(out, "{}\t{}\t{}", t.head, t.tail, t.relation);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.triplets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triplets.is_empty()
    }
}

fn entity(table: &EntityTable, symbol: SymbolRef<'_>) -> Result<usize, ConfigurationError> {
    table
        .entity_id(symbol)
        .ok_or_else(|| ConfigurationError::UnknownSymbol(symbol.to_symbol()))
}

/// Triplets of one function.
///
/// Declarations yield no triplets and a `max_relation` of 0.
pub fn triplets(function: &Function, table: &EntityTable) -> Result<TripletResult, ConfigurationError> {
    let mut result = TripletResult::default();
    if function.is_declaration() {
        return Ok(result);
    }

    let mut max_relation = NEXT_RELATION;
    let mut previous: Option<usize> = None;

    for (_, inst) in instructions(ProgramUnit::from_function(function)) {
        let opcode = entity(table, inst.opcode_symbol())?;
        if let Some(prev) = previous {
            result.triplets.push(Triplet {
                head: prev,
                tail: opcode,
                relation: NEXT_RELATION,
            });
        }

        for (slot, symbol) in instruction_symbols(inst) {
            let relation = match slot {
                Slot::Opcode => continue,
                Slot::Type => TYPE_RELATION,
                Slot::Operand(i) => ARG_RELATION + i as u32,
            };
            result.triplets.push(Triplet {
                head: opcode,
                tail: entity(table, symbol)?,
                relation,
            });
            max_relation = max_relation.max(relation);
        }
        previous = Some(opcode);
    }

    result.max_relation = max_relation;
    debug!(function = %function.name, triplets = result.len(), "Generated triplets");
    Ok(result)
}

/// Triplets of every function of `module`, in function order.
///
/// `max_relation` is the largest over all functions and at least `Next`.
pub fn module_triplets(module: &Module, table: &EntityTable) -> Result<TripletResult, ConfigurationError> {
    let mut result = TripletResult {
        max_relation: NEXT_RELATION,
        triplets: Vec::new(),
    };
    for function in &module.functions {
        let part = triplets(function, table)?;
        result.max_relation = result.max_relation.max(part.max_relation);
        result.triplets.extend(part.triplets);
    }
    Ok(result)
}
