//! Vocabulary store.
//!
//! A vocabulary is a JSON object of sections, each mapping raw keys to
//! vectors:
//!
//! ```json
//! {
//!   "Opcodes":   { "Add": [0.1, 0.2], "Ret": [0.0, 1.0] },
//!   "Types":     { "IntegerTy": [0.5, 0.5] },
//!   "Arguments": { "Variable": [1.0, 0.0] }
//! }
//! ```
//!
//! Section names depend on the [`Flavor`]. Once loaded, the store is never
//! mutated and can be shared across threads behind an `Arc`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info, warn};

use ir2vec_types::{
    Embedding, Flavor, Symbol, SymbolClass, SymbolRef, UnknownSymbolPolicy,
};

use crate::error::{UnknownSymbolError, VocabularyLoadError};

/// Where a vocabulary comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum VocabularySource {
    /// JSON file on disk
    Path(PathBuf),
    /// JSON document held in memory
    Json(String),
    /// Explicit entries
    Entries(Vec<(Symbol, Embedding)>),
}

impl VocabularySource {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        VocabularySource::Path(path.into())
    }

    /// True when the source cannot possibly name a vocabulary.
    pub fn is_empty(&self) -> bool {
        match self {
            VocabularySource::Path(p) => p.as_os_str().is_empty(),
            VocabularySource::Json(s) => s.trim().is_empty(),
            VocabularySource::Entries(e) => e.is_empty(),
        }
    }

    /// Human readable description for logs.
    pub fn describe(&self) -> String {
        match self {
            VocabularySource::Path(p) => p.display().to_string(),
            VocabularySource::Json(_) => "<inline json>".to_string(),
            VocabularySource::Entries(e) => format!("<{} entries>", e.len()),
        }
    }
}

/// Immutable symbol -> vector table with a single dimension.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    flavor: Flavor,
    dimension: usize,
    sections: BTreeMap<SymbolClass, BTreeMap<String, Embedding>>,
}

impl Vocabulary {
    /// Load a vocabulary from any source.
    pub fn load(source: &VocabularySource, flavor: Flavor) -> Result<Self, VocabularyLoadError> {
        match source {
            VocabularySource::Path(path) => Self::from_path(path, flavor),
            VocabularySource::Json(json) => Self::from_json_str(json, flavor),
            VocabularySource::Entries(entries) => Self::from_entries(flavor, entries.clone()),
        }
    }

    /// Read a vocabulary JSON file.
    pub fn from_path(path: &Path, flavor: Flavor) -> Result<Self, VocabularyLoadError> {
        if !path.exists() {
            return Err(VocabularyLoadError::NotFound(path.to_path_buf()));
        }
        info!(path = ?path, %flavor, "Loading vocabulary");
        let json = std::fs::read_to_string(path)?;
        let vocab = Self::from_json_str(&json, flavor)?;
        info!(
            dim = vocab.dimension,
            entries = vocab.len(),
            "Vocabulary loaded"
        );
        Ok(vocab)
    }

    /// Parse a vocabulary JSON document.
    pub fn from_json_str(json: &str, flavor: Flavor) -> Result<Self, VocabularyLoadError> {
        let root: Value =
            serde_json::from_str(json).map_err(|e| VocabularyLoadError::Malformed(e.to_string()))?;
        let Value::Object(sections) = root else {
            return Err(VocabularyLoadError::Malformed(
                "top level must be an object of sections".to_string(),
            ));
        };

        let mut entries = Vec::new();
        for (section, body) in sections {
            let Some(class) = flavor.class_for_section(&section) else {
                warn!(section = %section, %flavor, "Ignoring unknown vocabulary section");
                continue;
            };
            let Value::Object(items) = body else {
                return Err(VocabularyLoadError::InvalidSection {
                    section,
                    reason: "expected an object of key: [numbers]".to_string(),
                });
            };
            for (key, value) in items {
                let values = parse_vector(&section, &key, value)?;
                entries.push((Symbol::new(class, key), Embedding::new(values)));
            }
        }

        Self::from_entries(flavor, entries)
    }

    /// Build a vocabulary from explicit entries.
    ///
    /// Keys are normalized per flavor. Entries whose class does not exist in
    /// the flavor are skipped.
    pub fn from_entries(
        flavor: Flavor,
        entries: impl IntoIterator<Item = (Symbol, Embedding)>,
    ) -> Result<Self, VocabularyLoadError> {
        let mut sections: BTreeMap<SymbolClass, BTreeMap<String, Embedding>> = BTreeMap::new();
        let mut dimension: Option<usize> = None;

        for (symbol, embedding) in entries {
            if !flavor.has_class(symbol.class) {
                warn!(%symbol, %flavor, "Skipping entry of a class the flavor does not use");
                continue;
            }
            let key = flavor.normalize_key(symbol.class, &symbol.key);
            let symbol = Symbol::new(symbol.class, key);

            if embedding.dimension() == 0 {
                return Err(VocabularyLoadError::EmptyVector(symbol));
            }
            match dimension {
                None => dimension = Some(embedding.dimension()),
                Some(expected) if expected != embedding.dimension() => {
                    return Err(VocabularyLoadError::DimensionMismatch {
                        symbol,
                        expected,
                        actual: embedding.dimension(),
                    });
                }
                Some(_) => {}
            }

            let section = sections.entry(symbol.class).or_default();
            match section.get(&symbol.key) {
                Some(existing) if existing != &embedding => {
                    return Err(VocabularyLoadError::ConflictingEntry(symbol));
                }
                Some(_) => {
                    debug!(%symbol, "Duplicate entry after normalization");
                }
                None => {
                    section.insert(symbol.key, embedding);
                }
            }
        }

        let dimension = dimension.ok_or(VocabularyLoadError::Empty)?;
        Ok(Self {
            flavor,
            dimension,
            sections,
        })
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    /// Dimension shared by every entry.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.sections.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, symbol: SymbolRef<'_>) -> bool {
        self.lookup(symbol).is_some()
    }

    /// Stored vector for `symbol`, if any.
    pub fn lookup(&self, symbol: SymbolRef<'_>) -> Option<&Embedding> {
        self.sections.get(&symbol.class)?.get(symbol.key)
    }

    /// Stored vector, or `fallback` when the symbol is unknown.
    pub fn lookup_or<'a>(&'a self, symbol: SymbolRef<'_>, fallback: &'a Embedding) -> &'a Embedding {
        self.lookup(symbol).unwrap_or(fallback)
    }

    /// Apply the unknown-symbol policy to a lookup.
    pub fn resolve<'a>(
        &'a self,
        symbol: SymbolRef<'_>,
        policy: UnknownSymbolPolicy,
        fallback: &'a Embedding,
    ) -> Result<&'a Embedding, UnknownSymbolError> {
        match (self.lookup(symbol), policy) {
            (Some(embedding), _) => Ok(embedding),
            (None, UnknownSymbolPolicy::SubstituteDefault) => Ok(fallback),
            (None, UnknownSymbolPolicy::FailFast) => {
                Err(UnknownSymbolError(symbol.to_symbol()))
            }
        }
    }

    /// Keys of one class, sorted.
    pub fn keys(&self, class: SymbolClass) -> impl Iterator<Item = &str> {
        self.sections
            .get(&class)
            .into_iter()
            .flat_map(|section| section.keys().map(String::as_str))
    }

    /// Zero vector of this vocabulary's dimension.
    pub fn zero_vector(&self) -> Embedding {
        Embedding::zeros(self.dimension)
    }
}

fn parse_vector(section: &str, key: &str, value: Value) -> Result<Vec<f64>, VocabularyLoadError> {
    let invalid = |reason: String| VocabularyLoadError::InvalidSection {
        section: section.to_string(),
        reason,
    };
    let Value::Array(items) = value else {
        return Err(invalid(format!("entry '{}' is not an array", key)));
    };
    items
        .iter()
        .map(|item| {
            item.as_f64()
                .ok_or_else(|| invalid(format!("entry '{}' has a non-numeric value", key)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const IR_VOCAB: &str = r#"{
        "Opcodes": {"Add": [1.0, 0.0], "Ret": [0.0, 1.0]},
        "Types": {"IntegerTy": [0.5, 0.5]},
        "Arguments": {"Variable": [1.0, 1.0]}
    }"#;

    #[test]
    fn test_load_ir_vocab() {
        let vocab = Vocabulary::from_json_str(IR_VOCAB, Flavor::Ir).unwrap();
        assert_eq!(vocab.dimension(), 2);
        assert_eq!(vocab.len(), 4);
        let add = vocab.lookup(SymbolRef::new(SymbolClass::Opcode, "Add")).unwrap();
        assert_eq!(add.values(), &[1.0, 0.0]);
        assert!(vocab.contains(SymbolRef::new(SymbolClass::Type, "IntegerTy")));
        assert!(!vocab.contains(SymbolRef::new(SymbolClass::Type, "FloatTy")));
    }

    #[test]
    fn test_rejects_mixed_dimensions() {
        let json = r#"{"Opcodes": {"Add": [1.0, 0.0], "Ret": [0.0, 1.0, 2.0]}}"#;
        let err = Vocabulary::from_json_str(json, Flavor::Ir).unwrap_err();
        assert!(matches!(
            err,
            VocabularyLoadError::DimensionMismatch {
                expected: 2,
                actual: 3,
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(matches!(
            Vocabulary::from_json_str("{not json", Flavor::Ir),
            Err(VocabularyLoadError::Malformed(_))
        ));
        assert!(matches!(
            Vocabulary::from_json_str("[1, 2]", Flavor::Ir),
            Err(VocabularyLoadError::Malformed(_))
        ));
        assert!(matches!(
            Vocabulary::from_json_str(r#"{"Opcodes": [1.0]}"#, Flavor::Ir),
            Err(VocabularyLoadError::InvalidSection { .. })
        ));
        assert!(matches!(
            Vocabulary::from_json_str(r#"{"Opcodes": {"Add": ["x"]}}"#, Flavor::Ir),
            Err(VocabularyLoadError::InvalidSection { .. })
        ));
        assert!(matches!(
            Vocabulary::from_json_str(r#"{"Opcodes": {"Add": []}}"#, Flavor::Ir),
            Err(VocabularyLoadError::EmptyVector(_))
        ));
    }

    #[test]
    fn test_rejects_empty() {
        assert!(matches!(
            Vocabulary::from_json_str("{}", Flavor::Ir),
            Err(VocabularyLoadError::Empty)
        ));
        // Only sections the flavor does not know about
        assert!(matches!(
            Vocabulary::from_json_str(r#"{"Registers": {"GR32": [1.0]}}"#, Flavor::Ir),
            Err(VocabularyLoadError::Empty)
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = Vocabulary::from_path(Path::new("/no/such/vocab.json"), Flavor::Ir).unwrap_err();
        assert!(matches!(err, VocabularyLoadError::NotFound(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(IR_VOCAB.as_bytes()).unwrap();
        let source = VocabularySource::path(file.path());
        let vocab = Vocabulary::load(&source, Flavor::Ir).unwrap();
        assert_eq!(vocab.len(), 4);
    }

    #[test]
    fn test_mir_keys_normalized() {
        let json = r#"{
            "Opcodes": {"ADD32rr": [1.0], "ADD64rr": [1.0], "MOV64ri32": [2.0]},
            "CommonOperands": {"Immediate": [3.0]},
            "PhysicalRegisters": {"GR32": [4.0]},
            "VirtualRegisters": {"GR32": [5.0]}
        }"#;
        let vocab = Vocabulary::from_json_str(json, Flavor::Mir).unwrap();
        let opcodes: Vec<&str> = vocab.keys(SymbolClass::Opcode).collect();
        assert_eq!(opcodes, vec!["ADD", "MOV"]);
        let phys = vocab
            .lookup(SymbolRef::new(SymbolClass::PhysicalRegister, "GR32"))
            .unwrap();
        let virt = vocab
            .lookup(SymbolRef::new(SymbolClass::VirtualRegister, "GR32"))
            .unwrap();
        assert_ne!(phys, virt);
    }

    #[test]
    fn test_conflicting_normalized_keys() {
        let json = r#"{"Opcodes": {"ADD32rr": [1.0], "ADD64rr": [2.0]}}"#;
        assert!(matches!(
            Vocabulary::from_json_str(json, Flavor::Mir),
            Err(VocabularyLoadError::ConflictingEntry(_))
        ));
    }

    #[test]
    fn test_resolve_policies() {
        let vocab = Vocabulary::from_json_str(IR_VOCAB, Flavor::Ir).unwrap();
        let fallback = Embedding::new(vec![9.0, 9.0]);
        let unknown = SymbolRef::new(SymbolClass::Opcode, "Freeze");

        let substituted = vocab
            .resolve(unknown, UnknownSymbolPolicy::SubstituteDefault, &fallback)
            .unwrap();
        assert_eq!(substituted, &fallback);

        let err = vocab
            .resolve(unknown, UnknownSymbolPolicy::FailFast, &fallback)
            .unwrap_err();
        assert_eq!(err.0, Symbol::opcode("Freeze"));

        let known = SymbolRef::new(SymbolClass::Opcode, "Ret");
        let found = vocab
            .resolve(known, UnknownSymbolPolicy::FailFast, &fallback)
            .unwrap();
        assert_eq!(found.values(), &[0.0, 1.0]);
    }

    #[test]
    fn test_source_is_empty() {
        assert!(VocabularySource::path("").is_empty());
        assert!(VocabularySource::Json("  ".to_string()).is_empty());
        assert!(VocabularySource::Entries(vec![]).is_empty());
        assert!(!VocabularySource::path("/x.json").is_empty());
    }
}
