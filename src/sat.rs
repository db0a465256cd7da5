// SPDX-License-Identifier: Apache-2.0

//! The incremental SAT engine contract used by the resubstitution core, and
//! its implementation on top of varisat.
//!
//! We use varisat for this because it supports incrementality via
//! assume/solve and add_clause, and reports the failed subset of the
//! assumptions when a query is unsatisfiable.

use serde::{Deserialize, Serialize};
use varisat::ExtendFormula;

use crate::cnf::{SatLit, SatVar};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SolveStatus {
    Sat,
    Unsat,
    /// The conflict budget ran out; carries no information about the query.
    Undecided,
}

/// Upper bound on the conflicts a single `solve` may spend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConflictBudget {
    #[default]
    Unlimited,
    Conflicts(u64),
}

pub trait SatEngine {
    /// Drops every clause and variable.
    fn reset(&mut self);

    /// Makes variables `0..count` available.
    fn ensure_var_count(&mut self, count: usize);

    fn var_count(&self) -> usize;

    /// Adds a clause; returns false when the formula became trivially
    /// unsatisfiable.
    fn add_clause(&mut self, lits: &[SatLit]) -> bool;

    /// Constrains `out == a ^ b ^ negated`.
    fn add_xor(&mut self, a: SatVar, b: SatVar, out: SatVar, negated: bool) -> bool {
        let (a, b, m) = (a.positive(), b.positive(), out.positive().negate_if(negated));
        self.add_clause(&[!a, !b, !m])
            && self.add_clause(&[a, b, !m])
            && self.add_clause(&[a, !b, m])
            && self.add_clause(&[!a, b, m])
    }

    /// Propagates the unconditional facts accumulated so far; returns false
    /// when they are contradictory.
    fn simplify(&mut self) -> bool;

    fn solve(&mut self, assumptions: &[SatLit], budget: ConflictBudget) -> SolveStatus;

    /// After an `Unsat` answer: the subset of the assumptions (as passed to
    /// `solve`) that is already contradictory with the formula.
    fn final_conflict(&self) -> &[SatLit];

    /// After a `Sat` answer: the model value of `var`.
    fn var_value(&self, var: SatVar) -> bool;

    /// The literal of `var` that is true in the current model.
    fn var_literal(&self, var: SatVar) -> SatLit {
        SatLit::new(var, !self.var_value(var))
    }
}

fn to_varisat(lit: SatLit) -> varisat::Lit {
    varisat::Lit::from_index(lit.var().index(), !lit.is_negated())
}

fn from_varisat(lit: varisat::Lit) -> SatLit {
    SatLit::new(SatVar(lit.index() as u32), lit.is_negative())
}

/// `SatEngine` backed by `varisat::Solver`.
///
/// The engine mirrors the clause database so that level-0 unit propagation
/// can answer `add_clause` and `simplify` the way a MiniSat-style engine
/// does. varisat exposes no conflict counter, so a zero budget answers
/// `Undecided` without searching and any other budget runs to completion.
pub struct VarisatEngine {
    solver: varisat::Solver<'static>,
    var_count: usize,
    clauses: Vec<Vec<SatLit>>,
    fixed: Vec<Option<bool>>,
    inconsistent: bool,
    model: Vec<bool>,
    conflict: Vec<SatLit>,
    /// Set once a non-zero conflict budget has been run to completion.
    budget_ignored: bool,
}

impl Default for VarisatEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl VarisatEngine {
    pub fn new() -> Self {
        VarisatEngine {
            solver: varisat::Solver::new(),
            var_count: 0,
            clauses: Vec::new(),
            fixed: Vec::new(),
            inconsistent: false,
            model: Vec::new(),
            conflict: Vec::new(),
            budget_ignored: false,
        }
    }

    pub fn clause_count(&self) -> usize {
        self.clauses.len()
    }

    fn lit_value(&self, lit: SatLit) -> Option<bool> {
        self.fixed[lit.var().index()].map(|v| v != lit.is_negated())
    }

    /// Runs unit propagation over the mirrored clauses until fixpoint.
    fn propagate(&mut self) -> bool {
        let mut changed = true;
        while changed && !self.inconsistent {
            changed = false;
            for i in 0..self.clauses.len() {
                let mut unassigned = None;
                let mut open = 0;
                let mut satisfied = false;
                for &lit in &self.clauses[i] {
                    match self.lit_value(lit) {
                        Some(true) => {
                            satisfied = true;
                            break;
                        }
                        Some(false) => {}
                        None => {
                            open += 1;
                            unassigned = Some(lit);
                        }
                    }
                }
                if satisfied {
                    continue;
                }
                match (open, unassigned) {
                    (0, _) => {
                        self.inconsistent = true;
                        break;
                    }
                    (1, Some(lit)) => {
                        self.fixed[lit.var().index()] = Some(!lit.is_negated());
                        changed = true;
                    }
                    _ => {}
                }
            }
        }
        !self.inconsistent
    }
}

impl SatEngine for VarisatEngine {
    fn reset(&mut self) {
        let budget_ignored = self.budget_ignored;
        *self = VarisatEngine::new();
        self.budget_ignored = budget_ignored;
    }

    fn ensure_var_count(&mut self, count: usize) {
        if count > self.var_count {
            self.var_count = count;
            self.fixed.resize(count, None);
        }
    }

    fn var_count(&self) -> usize {
        self.var_count
    }

    fn add_clause(&mut self, lits: &[SatLit]) -> bool {
        if let Some(max) = lits.iter().map(|l| l.var().index()).max() {
            self.ensure_var_count(max + 1);
        }
        let lits_varisat: Vec<varisat::Lit> = lits.iter().map(|&l| to_varisat(l)).collect();
        self.solver.add_clause(&lits_varisat);
        if self.inconsistent {
            return false;
        }
        if lits.iter().any(|&l| self.lit_value(l) == Some(true)) {
            return true;
        }
        let open: Vec<SatLit> = lits
            .iter()
            .copied()
            .filter(|&l| self.lit_value(l).is_none())
            .collect();
        self.clauses.push(lits.to_vec());
        match open.as_slice() {
            [] => {
                self.inconsistent = true;
                false
            }
            [unit] => {
                self.fixed[unit.var().index()] = Some(!unit.is_negated());
                self.propagate()
            }
            _ => true,
        }
    }

    fn simplify(&mut self) -> bool {
        if !self.propagate() {
            return false;
        }
        let fixed = &self.fixed;
        self.clauses.retain(|clause| {
            !clause
                .iter()
                .any(|l| fixed[l.var().index()].is_some_and(|v| v != l.is_negated()))
        });
        true
    }

    fn solve(&mut self, assumptions: &[SatLit], budget: ConflictBudget) -> SolveStatus {
        self.model.clear();
        self.conflict.clear();
        match budget {
            ConflictBudget::Conflicts(0) => return SolveStatus::Undecided,
            ConflictBudget::Conflicts(limit) if !self.budget_ignored => {
                log::debug!(
                    "varisat cannot limit conflicts; budget {} is treated as unlimited",
                    limit
                );
                self.budget_ignored = true;
            }
            _ => {}
        }
        if self.inconsistent {
            return SolveStatus::Unsat;
        }
        if let Some(max) = assumptions.iter().map(|l| l.var().index()).max() {
            self.ensure_var_count(max + 1);
        }
        let lits: Vec<varisat::Lit> = assumptions.iter().map(|&l| to_varisat(l)).collect();
        self.solver.assume(&lits);
        match self.solver.solve() {
            Ok(true) => {
                self.model.resize(self.var_count, false);
                if let Some(model) = self.solver.model() {
                    for lit in model {
                        if lit.index() >= self.model.len() {
                            self.model.resize(lit.index() + 1, false);
                        }
                        self.model[lit.index()] = lit.is_positive();
                    }
                }
                SolveStatus::Sat
            }
            Ok(false) => {
                if let Some(core) = self.solver.failed_core() {
                    self.conflict.extend(core.iter().map(|&l| from_varisat(l)));
                }
                SolveStatus::Unsat
            }
            Err(e) => {
                log::warn!("varisat solve failed: {:?}", e);
                SolveStatus::Undecided
            }
        }
    }

    fn final_conflict(&self) -> &[SatLit] {
        &self.conflict
    }

    fn var_value(&self, var: SatVar) -> bool {
        self.model.get(var.index()).copied().unwrap_or(false)
    }
}
