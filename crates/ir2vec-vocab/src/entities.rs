//! Canonical entity layout.
//!
//! Entities are the vocabulary symbols in a fixed order; the position of a
//! symbol is its entity id. Triplets refer to symbols by entity id and the
//! entity mapping file lists `name\tid` pairs.
//!
//! IR layout is static: canonical opcodes, canonical types, operand kinds.
//! MIR layout depends on the target and is read from a vocabulary: opcodes
//! (sorted), common operands (canonical order), physical register classes
//! (sorted), virtual register classes (sorted).

use std::collections::HashMap;
use std::fmt::Write;

use ir2vec_types::{
    Flavor, Symbol, SymbolClass, SymbolRef, IR_OPCODES, IR_OPERAND_KINDS, IR_TYPES,
    MIR_COMMON_OPERANDS,
};

use crate::store::Vocabulary;

/// Ordered list of entities with reverse lookup.
#[derive(Debug, Clone)]
pub struct EntityTable {
    flavor: Flavor,
    entities: Vec<Symbol>,
    ids: HashMap<Symbol, usize>,
}

impl EntityTable {
    /// Static IR layout.
    pub fn ir() -> Self {
        let entities = IR_OPCODES
            .iter()
            .map(|k| Symbol::opcode(*k))
            .chain(IR_TYPES.iter().map(|k| Symbol::ty(*k)))
            .chain(IR_OPERAND_KINDS.iter().map(|k| Symbol::operand(*k)));
        Self::from_symbols(Flavor::Ir, entities)
    }

    /// Layout for the vocabulary's flavor. IR ignores the vocabulary.
    pub fn from_vocabulary(vocab: &Vocabulary) -> Self {
        match vocab.flavor() {
            Flavor::Ir => Self::ir(),
            Flavor::Mir => Self::mir(vocab),
        }
    }

    fn mir(vocab: &Vocabulary) -> Self {
        let sorted = |class: SymbolClass| {
            let mut keys: Vec<&str> = vocab.keys(class).collect();
            keys.sort_unstable();
            keys.into_iter().map(move |k| Symbol::new(class, k))
        };
        let entities = sorted(SymbolClass::Opcode)
            .chain(MIR_COMMON_OPERANDS.iter().map(|k| Symbol::operand(*k)))
            .chain(sorted(SymbolClass::PhysicalRegister))
            .chain(sorted(SymbolClass::VirtualRegister));
        Self::from_symbols(Flavor::Mir, entities)
    }

    fn from_symbols(flavor: Flavor, symbols: impl IntoIterator<Item = Symbol>) -> Self {
        let mut entities = Vec::new();
        let mut ids = HashMap::new();
        for symbol in symbols {
            if ids.contains_key(&symbol) {
                continue;
            }
            ids.insert(symbol.clone(), entities.len());
            entities.push(symbol);
        }
        Self {
            flavor,
            entities,
            ids,
        }
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entity id of `symbol`.
    pub fn entity_id(&self, symbol: SymbolRef<'_>) -> Option<usize> {
        self.ids.get(&symbol.to_symbol()).copied()
    }

    /// Symbol with entity id `id`.
    pub fn symbol(&self, id: usize) -> Option<&Symbol> {
        self.entities.get(id)
    }

    /// Vocabulary key of entity `id`.
    pub fn entity_name(&self, id: usize) -> Option<&str> {
        self.symbol(id).map(|s| s.key.as_str())
    }

    /// Entity names in id order.
    pub fn names(&self) -> Vec<String> {
        self.entities.iter().map(|s| s.key.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Symbol)> {
        self.entities.iter().enumerate()
    }

    /// Entity mapping text: the count, then one `name\tid` line per entity.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.len());
        for (id, symbol) in self.iter() {
            let _ = writeln!(out, "{}\t{}", symbol.key, id);
        }
        out
    }
}
