//! Zhao Programming Table
//!
//! Zhao's 4-way body block is programmed from a precomputed lookup table
//! rather than closed-form rules. The table is external data shipped next
//! to the binary: pairs of lines, the first holding the permutation key
//! (the eight permutation digits packed decimally), the second the packed
//! control bits of the body's switches. It is loaded once at pipeline start
//! and immutable afterwards.

use std::collections::HashMap;
use std::path::Path;

use crate::compiler::error::UcError;

/// Immutable key → control-bits mapping for Zhao body blocks.
#[derive(Debug, Clone, Default)]
pub struct ZhaoTable {
    mapping: HashMap<u32, u32>,
}

impl ZhaoTable {
    /// An empty table; every lookup misses. Used whenever Valiant's body
    /// blocks are selected and no table is needed.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    /// Look up the packed control bits for a permutation key.
    pub fn get(&self, key: u32) -> Option<u32> {
        self.mapping.get(&key).copied()
    }

    /// Load a table from its textual form: alternating key and value lines.
    pub fn load(path: &Path) -> Result<Self, UcError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            UcError::ProgrammingTableMiss(format!(
                "cannot read programming table {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(&text)
    }

    /// Parse the alternating key/value line format.
    pub fn parse(text: &str) -> Result<Self, UcError> {
        let mut mapping = HashMap::new();
        let mut key: u32 = 0;
        let mut line_num = 0usize;
        for line in text.lines() {
            let Some(token) = line.split_whitespace().next() else {
                continue;
            };
            let value: u32 = token.parse().map_err(|_| {
                UcError::ProgrammingTableMiss(format!(
                    "programming table line {}: bad number '{}'",
                    line_num + 1,
                    token
                ))
            })?;
            if line_num % 2 == 0 {
                key = value;
            } else {
                mapping.insert(key, value);
            }
            line_num += 1;
        }
        log::debug!("loaded {} programming table entries", mapping.len());
        Ok(Self { mapping })
    }
}
