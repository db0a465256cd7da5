// SPDX-License-Identifier: Apache-2.0

//! Per-window resubstitution session.
//!
//! A session owns the incremental SAT engine and every piece of scratch state
//! the encoder and the interpolant computers share: the variable allocator,
//! the clause buffer, the divisor-candidate variables of the last encoded
//! window, value snapshots and the counterexample matrix. Sessions are not
//! shared between windows processed concurrently; create one per worker.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cex::CexMatrix;
use crate::cnf::{ClauseBuffer, SatLit, SatVar};
use crate::network::NodeId;
use crate::sat::{ConflictBudget, SatEngine, SolveStatus, VarisatEngine};
use crate::var_alloc::{UnboundVariable, VarAllocator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResubParams {
    /// Conflict budget applied to every individual SAT query.
    #[serde(default)]
    pub conflict_budget: ConflictBudget,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SolveStats {
    pub encode_count: usize,
    pub clause_count: usize,
    pub sat_calls: usize,
    pub undecided_calls: usize,
    /// Refinement-loop passes of the last interpolant computation.
    pub last_iterations: usize,
    pub cnf_time: Duration,
    pub sat_time: Duration,
}

pub struct ResubSession<E: SatEngine = VarisatEngine> {
    pub(crate) engine: E,
    pub(crate) vars: VarAllocator,
    pub(crate) clauses: ClauseBuffer,
    pub(crate) params: ResubParams,
    pub(crate) pivot: Option<NodeId>,
    /// Variables of the divisor candidates (`Window::divs`) of the last
    /// encoded window; these are the counterexample matrix columns.
    pub(crate) div_vars: Vec<SatVar>,
    pub(crate) values: Vec<bool>,
    pub(crate) cex: CexMatrix,
    pub(crate) stats: SolveStats,
}

impl ResubSession<VarisatEngine> {
    pub fn new(params: ResubParams) -> Self {
        Self::with_engine(VarisatEngine::new(), params)
    }
}

impl<E: SatEngine> ResubSession<E> {
    pub fn with_engine(engine: E, params: ResubParams) -> Self {
        ResubSession {
            engine,
            vars: VarAllocator::new(),
            clauses: ClauseBuffer::new(),
            params,
            pivot: None,
            div_vars: Vec::new(),
            values: Vec::new(),
            cex: CexMatrix::new(),
            stats: SolveStats::default(),
        }
    }

    pub fn params(&self) -> &ResubParams {
        &self.params
    }

    pub fn set_conflict_budget(&mut self, budget: ConflictBudget) {
        self.params.conflict_budget = budget;
    }

    pub fn stats(&self) -> &SolveStats {
        &self.stats
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn cex(&self) -> &CexMatrix {
        &self.cex
    }

    /// Hands the counterexample matrix to the caller, leaving an empty one.
    pub fn take_cex(&mut self) -> CexMatrix {
        std::mem::take(&mut self.cex)
    }

    /// Current SAT variable of `node`. For fanout nodes this is the variable
    /// of the duplicated cone after an encode with a non-empty TFO.
    pub fn sat_var(&self, node: NodeId) -> Result<SatVar, UnboundVariable> {
        self.vars.lookup(node)
    }

    pub fn sat_vars(&self, nodes: &[NodeId]) -> Result<Vec<SatVar>, UnboundVariable> {
        nodes.iter().map(|&n| self.vars.lookup(n)).collect()
    }

    /// Binding generation of `node` in the current encoding.
    pub fn generation(&self, node: NodeId) -> u32 {
        self.vars.generation(node)
    }

    pub fn pivot_var(&self) -> Option<SatVar> {
        self.pivot.and_then(|p| self.vars.lookup(p).ok())
    }

    pub fn div_vars(&self) -> &[SatVar] {
        &self.div_vars
    }

    /// Allocates an engine variable beyond every variable in use.
    pub(crate) fn new_engine_var(&mut self) -> SatVar {
        let var = SatVar(self.engine.var_count() as u32);
        self.engine.ensure_var_count(var.index() + 1);
        var
    }

    pub(crate) fn solve(&mut self, assumptions: &[SatLit]) -> SolveStatus {
        let start = std::time::Instant::now();
        let status = self.engine.solve(assumptions, self.params.conflict_budget);
        self.stats.sat_time += start.elapsed();
        self.stats.sat_calls += 1;
        if status == SolveStatus::Undecided {
            self.stats.undecided_calls += 1;
        }
        log::trace!(
            "solve: {} assumptions -> {:?}",
            assumptions.len(),
            status
        );
        status
    }

    pub(crate) fn snapshot_div_values(&mut self) {
        self.values.clear();
        for &var in &self.div_vars {
            self.values.push(self.engine.var_value(var));
        }
    }

    /// Records one counterexample row: the current model compared against
    /// `baseline` (one value per divisor candidate).
    pub(crate) fn record_cex(&mut self, baseline: &[bool]) {
        debug_assert_eq!(baseline.len(), self.div_vars.len());
        let diffs: Vec<bool> = self
            .div_vars
            .iter()
            .zip(baseline)
            .map(|(&var, &base)| base != self.engine.var_value(var))
            .collect();
        log::debug!(
            "recording counterexample {} with {} differing divisors",
            self.cex.count(),
            diffs.iter().filter(|&&d| d).count()
        );
        self.cex.push_row(&diffs);
    }
}
