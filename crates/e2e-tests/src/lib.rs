//! End-to-end test infrastructure for ir2vec.
//!
//! Provides a shared `Fixture` that writes vocabularies and program
//! documents to a temp directory, plus the expected vectors for them.

use std::path::{Path, PathBuf};

/// IR vocabulary, dimension 3.
pub const IR_VOCAB: &str = r#"{
    "Opcodes": {
        "Add": [1.0, 0.0, 0.0],
        "Mul": [0.0, 1.0, 0.0],
        "Br": [0.0, 0.0, 1.0],
        "Ret": [1.0, 1.0, 1.0]
    },
    "Types": {
        "IntegerTy": [0.5, 0.0, 0.0],
        "VoidTy": [0.0, 0.0, 0.0],
        "LabelTy": [0.0, 0.0, 0.5]
    },
    "Arguments": {
        "Variable": [0.0, 1.0, 0.0],
        "Constant": [0.0, 0.0, 1.0]
    }
}"#;

/// IR module with blocks of unequal size (3 and 1 instructions), a
/// one-block function and a declaration.
///
/// `mul` reads `%1`, the result of `add`.
pub const IR_PROGRAM: &str = r#"{
    "name": "calc",
    "flavor": "ir",
    "functions": [
        {
            "name": "_Z3addii",
            "demangled_name": "add(int, int)",
            "blocks": [
                {"name": "entry", "instructions": [
                    {"opcode": "add", "ty": "i32", "result": "%1",
                     "operands": [{"kind": "Variable"}, {"kind": "Constant"}]},
                    {"opcode": "mul", "ty": "i32", "result": "%2",
                     "operands": [{"kind": "Variable", "value": "%1"}, {"kind": "Constant"}]},
                    {"opcode": "br", "operands": [{"kind": "Variable", "value": "%exit"}]}
                ]},
                {"name": "exit", "instructions": [
                    {"opcode": "ret", "ty": "void"}
                ]}
            ]
        },
        {
            "name": "main",
            "blocks": [
                {"name": "entry", "instructions": [
                    {"opcode": "ret", "ty": "i32", "operands": [{"kind": "Constant"}]}
                ]}
            ]
        },
        {"name": "printf", "declaration": true}
    ]
}"#;

/// Symbolic, `sum` scheme embeddings of `_Z3addii`, per instruction.
pub const ADD_INSTRUCTIONS_SUM: [[f64; 3]; 4] = [
    [1.5, 1.0, 1.0],
    [0.5, 2.0, 1.0],
    [0.0, 1.0, 1.0],
    [1.0, 1.0, 1.0],
];

/// MIR vocabulary for one target, dimension 2.
pub const MIR_VOCAB: &str = r#"{
    "Opcodes": {"ADD32rr": [1.0, 0.0], "MOV32ri": [0.0, 1.0], "RET64": [1.0, 1.0]},
    "CommonOperands": {"Immediate": [0.5, 0.5]},
    "PhysicalRegisters": {"GR32": [1.0, 1.0]},
    "VirtualRegisters": {"GR32": [2.0, 0.0]}
}"#;

/// MIR module: one machine function and an external declaration.
pub const MIR_PROGRAM: &str = r#"{
    "name": "calc",
    "flavor": "mir",
    "functions": [
        {
            "name": "add",
            "blocks": [
                {"name": "bb.0", "instructions": [
                    {"opcode": "MOV32ri", "operands": [
                        {"class": "virtual_register", "kind": "GR32"},
                        {"class": "operand", "kind": "Immediate"}
                    ]},
                    {"opcode": "ADD32rr", "operands": [
                        {"class": "virtual_register", "kind": "GR32"},
                        {"class": "physical_register", "kind": "GR32"}
                    ]}
                ]},
                {"name": "bb.1", "instructions": [
                    {"opcode": "RET64"}
                ]}
            ]
        },
        {"name": "abort", "declaration": true}
    ]
}"#;

/// Temp directory holding fixture files.
pub struct Fixture {
    /// Keeps temp dir alive for the lifetime of the fixture
    pub _temp_dir: tempfile::TempDir,
    pub ir_vocab: PathBuf,
    pub ir_program: PathBuf,
    pub mir_vocab: PathBuf,
    pub mir_program: PathBuf,
}

impl Fixture {
    /// Write every fixture file to a fresh temp directory.
    pub fn new() -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let ir_vocab = write_file(temp_dir.path(), "seedEmbedding.json", IR_VOCAB);
        let ir_program = write_file(temp_dir.path(), "calc.ir.json", IR_PROGRAM);
        let mir_vocab = write_file(temp_dir.path(), "x86_64.json", MIR_VOCAB);
        let mir_program = write_file(temp_dir.path(), "calc.mir.json", MIR_PROGRAM);
        Self {
            _temp_dir: temp_dir,
            ir_vocab,
            ir_program,
            mir_vocab,
            mir_program,
        }
    }

    /// Path of a file next to the fixtures; the file is not created.
    pub fn path(&self, name: &str) -> PathBuf {
        self._temp_dir.path().join(name)
    }

    /// Write an extra file next to the fixtures.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        write_file(self._temp_dir.path(), name, contents)
    }

    pub fn ir_vocab_str(&self) -> String {
        self.ir_vocab.to_string_lossy().into_owned()
    }

    pub fn mir_vocab_str(&self) -> String {
        self.mir_vocab.to_string_lossy().into_owned()
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("Failed to write fixture file");
    path
}

/// Element-wise sum of fixed-size rows.
pub fn sum_rows<const N: usize>(rows: &[[f64; N]]) -> [f64; N] {
    let mut out = [0.0; N];
    for row in rows {
        for (acc, v) in out.iter_mut().zip(row) {
            *acc += v;
        }
    }
    out
}

/// Assert two vectors agree to within 1e-9.
pub fn assert_close(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len(), "dimension mismatch");
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a - e).abs() < 1e-9,
            "component {i}: got {a}, expected {e} (actual {actual:?})"
        );
    }
}
