// SPDX-License-Identifier: Apache-2.0

//! Interpolant computation by exhaustive minterm enumeration.
//!
//! For small divisor sets it is cheaper to let the engine enumerate every
//! reachable (pivot value, divisor pattern) pair than to learn cubes. The
//! patterns seen with the pivot at 1 form the onset, those seen with the
//! pivot at 0 form the offset; a pattern in both proves that no function of
//! the divisors can replace the pivot. From the two tables we then pick the
//! cheaper of the sum-of-products cover of the onset and the complemented
//! cover of the offset.

use serde::Serialize;

use crate::cnf::{SatLit, SatVar};
use crate::interpolate::InterpolantOutcome;
use crate::sat::{SatEngine, SolveStatus};
use crate::session::ResubSession;
use crate::truth::{Cube, MAX_VARS, Truth6, isop, minterm_index};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MintermOutcome {
    /// Every reachable divisor pattern, split by pivot value. Bit `i` is
    /// divisor pattern `i`; the tables are not stretched.
    Tables { onset: Truth6, offset: Truth6 },
    Infeasible,
    Undecided,
}

/// The cover picked from the onset/offset tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IsopChoice {
    /// The function offered as the pivot replacement.
    pub function: Truth6,
    /// Cubes of the chosen cover; when `complemented`, the function is the
    /// complement of their sum.
    pub cubes: Vec<Cube>,
    pub complemented: bool,
}

impl<E: SatEngine> ResubSession<E> {
    /// Enumerates the reachable divisor patterns of `divisors` together with
    /// the pivot value.
    ///
    /// Requires a successful `encode`. On `Infeasible`, one counterexample
    /// row is appended to the session's matrix.
    pub fn compute_minterm_tables(&mut self, pivot: SatVar, divisors: &[SatVar]) -> MintermOutcome {
        assert!(
            divisors.len() <= MAX_VARS,
            "minterm enumeration supports at most {} divisors, got {}",
            MAX_VARS,
            divisors.len()
        );
        let indicator = self.new_engine_var().positive();
        let tracked = self.div_vars.len();
        // Divisor-candidate values seen at each recorded minterm.
        let mut seen: Vec<Option<Vec<bool>>> = vec![None; 1 << divisors.len()];
        let mut tables = [Truth6::const0(); 2];
        let mut iterations = 0;
        let mut blocking: Vec<SatLit> = Vec::with_capacity(divisors.len() + 2);
        loop {
            iterations += 1;
            self.stats.last_iterations = iterations;
            match self.solve(&[indicator]) {
                SolveStatus::Undecided => return MintermOutcome::Undecided,
                SolveStatus::Unsat => break,
                SolveStatus::Sat => {}
            }
            let onset = self.engine.var_value(pivot);
            let values: Vec<bool> = divisors.iter().map(|&d| self.engine.var_value(d)).collect();
            let minterm = minterm_index(&values);

            if tables[!onset as usize].get_bit(minterm) {
                let Some(baseline) = seen[minterm].take() else {
                    unreachable!("minterm {} recorded without values", minterm);
                };
                self.record_cex(&baseline);
                log::debug!(
                    "compute_minterm_tables: minterm {} reached with both pivot values after {} iterations",
                    minterm,
                    iterations
                );
                return MintermOutcome::Infeasible;
            }
            debug_assert!(!tables[onset as usize].get_bit(minterm));
            tables[onset as usize].set_bit(minterm);
            let snapshot: Vec<bool> = self
                .div_vars
                .iter()
                .map(|&v| self.engine.var_value(v))
                .collect();
            debug_assert_eq!(snapshot.len(), tracked);
            seen[minterm] = Some(snapshot);

            blocking.clear();
            blocking.push(!indicator);
            blocking.push(!self.engine.var_literal(pivot));
            blocking.extend(divisors.iter().map(|&d| !self.engine.var_literal(d)));
            if !self.engine.add_clause(&blocking) {
                break;
            }
        }
        log::debug!(
            "compute_minterm_tables: {} divisors, {} iterations, onset {} offset {}",
            divisors.len(),
            iterations,
            tables[1].count_ones(),
            tables[0].count_ones()
        );
        MintermOutcome::Tables {
            onset: tables[1],
            offset: tables[0],
        }
    }

    /// Enumerates minterms and returns the cheaper of the two covers as the
    /// replacement function, along with the chosen cover.
    pub fn compute_interpolant_cover(
        &mut self,
        pivot: SatVar,
        divisors: &[SatVar],
    ) -> (InterpolantOutcome, Option<IsopChoice>) {
        match self.compute_minterm_tables(pivot, divisors) {
            MintermOutcome::Undecided => (InterpolantOutcome::Undecided, None),
            MintermOutcome::Infeasible => (InterpolantOutcome::Infeasible, None),
            MintermOutcome::Tables { onset, offset } => {
                let choice = choose_cover(onset, offset, divisors.len());
                (InterpolantOutcome::Function(choice.function), Some(choice))
            }
        }
    }

    /// Like `compute_interpolant`, by minterm enumeration.
    pub fn compute_interpolant_isop(
        &mut self,
        pivot: SatVar,
        divisors: &[SatVar],
    ) -> InterpolantOutcome {
        self.compute_interpolant_cover(pivot, divisors).0
    }
}

/// Picks between `ISOP(onset, !offset)` and the complement of
/// `ISOP(offset, !onset)`, preferring the former on a tie in cube count.
pub fn choose_cover(onset: Truth6, offset: Truth6, var_count: usize) -> IsopChoice {
    let onset = onset.stretch(var_count);
    let offset = offset.stretch(var_count);
    let positive = isop(onset, offset.not(), var_count);
    let negative = isop(offset, onset.not(), var_count);
    if positive.cube_count() <= negative.cube_count() {
        IsopChoice {
            function: positive.truth,
            cubes: positive.cubes,
            complemented: false,
        }
    } else {
        IsopChoice {
            function: negative.truth.not(),
            cubes: negative.cubes,
            complemented: true,
        }
    }
}
