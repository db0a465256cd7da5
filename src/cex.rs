// SPDX-License-Identifier: Apache-2.0

//! Counterexample matrix: one packed-bit column per tracked divisor
//! candidate, one row per recorded counterexample.
//!
//! Bit `i` of row `j` is set when counterexample `j` found divisor candidate
//! `i` at a different value than the baseline recorded for it during the same
//! query. Rows are only ever appended.

use bitvec::prelude::*;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CexMatrix {
    columns: Vec<BitVec<u64, Lsb0>>,
    rows: usize,
}

impl CexMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of counterexamples recorded so far.
    pub fn count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Appends one row; `diffs[i]` is the bit of column `i`.
    pub fn push_row(&mut self, diffs: &[bool]) {
        while self.columns.len() < diffs.len() {
            self.columns.push(bitvec![u64, Lsb0; 0; self.rows]);
        }
        for (i, column) in self.columns.iter_mut().enumerate() {
            column.push(diffs.get(i).copied().unwrap_or(false));
        }
        self.rows += 1;
    }

    pub fn column(&self, index: usize) -> &BitSlice<u64, Lsb0> {
        &self.columns[index]
    }

    pub fn get(&self, column: usize, row: usize) -> bool {
        self.columns
            .get(column)
            .and_then(|c| c.get(row).map(|b| *b))
            .unwrap_or(false)
    }

    pub fn row(&self, row: usize) -> Vec<bool> {
        assert!(row < self.rows);
        self.columns.iter().map(|c| c[row]).collect()
    }

    /// Divisor candidates that disagreed in `row`.
    pub fn row_diffs(&self, row: usize) -> Vec<usize> {
        self.row(row)
            .into_iter()
            .enumerate()
            .filter_map(|(i, bit)| bit.then_some(i))
            .collect()
    }
}
