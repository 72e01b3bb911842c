use std::path::Path;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::errors::Error;

/// Thresholds and switches for the duplication detectors.
///
/// Loaded once at startup and passed by reference into every
/// detection pass; there is no ambient global state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckerConfig {
    /// Minimum source lines for a block to enter duplicate-block
    /// comparison (default: 3)
    #[serde(default = "default_min_block_lines")]
    pub min_block_lines: u32,

    /// Maximum distinct atomic differences two blocks may have and
    /// still count as duplicates (default: 3)
    #[serde(default = "default_max_block_diffs")]
    pub max_block_diffs: usize,

    /// Repetitions required to propose a loop when the differences
    /// form an arithmetic progression (default: 4)
    #[serde(default = "default_seq_repetitions")]
    pub seq_repetitions: usize,

    /// Repetitions required otherwise (default: 5)
    #[serde(default = "default_seq_repetitions_no_range")]
    pub seq_repetitions_no_range: usize,

    /// Minimum complexity score before an expression is tracked for
    /// duplication (default: 8)
    #[serde(default = "default_expr_complexity_threshold")]
    pub expr_complexity_threshold: u32,

    /// A rewrite must shrink token weight below this share of the
    /// original (default: 0.8)
    #[serde(default = "default_token_savings_ratio")]
    pub token_savings_ratio: f64,

    /// Minimum share of the smallest branch a trailing hoist must
    /// cover to avoid splitting a coherent segment (default: 0.5)
    #[serde(default = "default_coherence_ratio")]
    pub coherence_ratio: f64,

    /// Loop extraction needs more repetitions or statements per
    /// repetition than this (default: 2)
    #[serde(default = "default_min_loop_extent")]
    pub min_loop_extent: usize,

    /// Pure builtins that may appear in a scored expression
    #[serde(default = "default_expr_functions")]
    pub expr_functions: Vec<String>,

    /// Offer conditional-expression rewrites (default: true)
    #[serde(default = "default_true")]
    pub suggest_ternary: bool,

    /// Offer move-if-into-block rewrites (default: true)
    #[serde(default = "default_true")]
    pub suggest_into_block: bool,

    /// Offer extract-to-variables rewrites (default: true)
    #[serde(default = "default_true")]
    pub suggest_variables: bool,

    /// Offer extract-to-function rewrites (default: true)
    #[serde(default = "default_true")]
    pub suggest_function: bool,

    /// Offer extract-to-loop rewrites (default: true)
    #[serde(default = "default_true")]
    pub suggest_loop: bool,
}

fn default_true() -> bool {
    true
}

fn default_min_block_lines() -> u32 {
    3
}

fn default_max_block_diffs() -> usize {
    3
}

fn default_seq_repetitions() -> usize {
    4
}

fn default_seq_repetitions_no_range() -> usize {
    5
}

fn default_expr_complexity_threshold() -> u32 {
    8
}

fn default_token_savings_ratio() -> f64 {
    0.8
}

fn default_coherence_ratio() -> f64 {
    0.5
}

fn default_min_loop_extent() -> usize {
    2
}

fn default_expr_functions() -> Vec<String> {
    [
        "abs", "max", "min", "round", "sqrt", "len", "all", "any", "sum", "map", "filter",
        "sorted", "reversed", "int", "str", "ord", "chr",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            min_block_lines: default_min_block_lines(),
            max_block_diffs: default_max_block_diffs(),
            seq_repetitions: default_seq_repetitions(),
            seq_repetitions_no_range: default_seq_repetitions_no_range(),
            expr_complexity_threshold: default_expr_complexity_threshold(),
            token_savings_ratio: default_token_savings_ratio(),
            coherence_ratio: default_coherence_ratio(),
            min_loop_extent: default_min_loop_extent(),
            expr_functions: default_expr_functions(),
            suggest_ternary: true,
            suggest_into_block: true,
            suggest_variables: true,
            suggest_function: true,
            suggest_loop: true,
        }
    }
}

impl CheckerConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)?;
        let config: CheckerConfig =
            serde_json::from_str(&content).map_err(|e| Error::Config(e.to_string()))?;
        Ok(config)
    }

    pub fn expr_functions_set(&self) -> FxHashSet<String> {
        self.expr_functions.iter().cloned().collect()
    }
}
