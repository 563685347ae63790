//! Shared helpers for building maps, lists and text listings.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::fs::File;
use std::path::Path;

use ir2vec_embedder::{EmbedError, EmbeddingEngine};
use ir2vec_types::{Embedding, Flavor, Granularity, Module, ProgramUnit, UnitId};

use crate::error::ToolError;

/// `demangled name -> (actual name, embedding)`
pub type FuncVecMap = BTreeMap<String, (String, Embedding)>;

/// `(label, embedding)` pairs in program order.
pub type EmbeddingList = Vec<(String, Embedding)>;

/// Open-check and decode a program file of the given flavor.
pub(crate) fn read_module(path: &Path, flavor: Flavor) -> Result<Module, ToolError> {
    if File::open(path).is_err() {
        return Err(ToolError::InvalidFilePath(path.to_path_buf()));
    }
    let module = Module::from_path(path)?;
    if module.flavor != flavor {
        return Err(ToolError::WrongFlavor {
            expected: flavor,
            found: module.flavor,
        });
    }
    Ok(module)
}

/// Index of the defined function named `name`.
pub(crate) fn defined_function(module: &Module, name: &str) -> Result<usize, ToolError> {
    module
        .function_index(name)
        .filter(|&i| !module.functions[i].is_declaration())
        .ok_or_else(|| ToolError::FunctionNotFound(name.to_string()))
}

fn function_unit(module: &Module, index: usize) -> ProgramUnit<'_> {
    ProgramUnit::Function {
        id: UnitId::function(index),
        function: &module.functions[index],
    }
}

/// Function embeddings keyed by demangled name. The first function wins
/// when two share a demangled name.
pub(crate) fn func_vector_map(
    engine: &EmbeddingEngine,
    module: &Module,
) -> Result<FuncVecMap, EmbedError> {
    let result = engine.generate_module(module, Granularity::Function)?;
    let mut map = FuncVecMap::new();
    for entry in result {
        let function = &module.functions[entry.id.function];
        map.entry(function.display_name().to_string())
            .or_insert_with(|| (function.name.clone(), entry.embedding));
    }
    Ok(map)
}

/// Labeled embeddings at `granularity` for one function or the whole module.
pub(crate) fn labeled(
    engine: &EmbeddingEngine,
    module: &Module,
    granularity: Granularity,
    function: Option<usize>,
) -> Result<EmbeddingList, EmbedError> {
    let result = match function {
        Some(index) => engine.generate(function_unit(module, index), granularity)?,
        None => engine.generate_module(module, granularity)?,
    };
    Ok(result.into_labeled())
}

/// Text listing of embeddings, one section per function.
pub(crate) fn render(
    engine: &EmbeddingEngine,
    module: &Module,
    granularity: Granularity,
    function: Option<usize>,
) -> Result<String, EmbedError> {
    let indices: Vec<usize> = match function {
        Some(index) => vec![index],
        None => (0..module.functions.len()).collect(),
    };

    let mut out = String::new();
    for index in indices {
        let f = &module.functions[index];
        if f.is_declaration() {
            let _ = writeln!(out, "Function {} is a declaration, skipping.", f.name);
            continue;
        }
        let _ = writeln!(out, "Function: {}", f.name);

        let result = engine.generate(function_unit(module, index), granularity)?;
        if result.is_empty() {
            let _ = writeln!(out, "Error: Failed to create embedder for function {}", f.name);
            continue;
        }
        match granularity {
            Granularity::Function => {
                for entry in result.iter() {
                    let _ = writeln!(out, "{}", entry.embedding);
                }
            }
            _ => {
                for entry in result.iter() {
                    let _ = writeln!(out, "{} {}", entry.label, entry.embedding);
                }
            }
        }
    }
    Ok(out)
}
