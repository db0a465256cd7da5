// SPDX-License-Identifier: Apache-2.0

//! Lowers a window into the session's SAT engine.
//!
//! The fanin cone is encoded once. When the window has fanout nodes, the
//! fanout cone is encoded a second time on fresh variables with every literal
//! on the pivot complemented, each root of the copy is XOR-compared against
//! its original, and one clause requires some root to differ. The resulting
//! formula is satisfiable exactly at the input assignments where the pivot's
//! value is observable at the roots, which turns everything else into
//! don't-cares for the interpolant computers.

use std::time::Instant;

use crate::cnf::{PivotTie, SatLit, SatVar};
use crate::network::{Network, NodeId, Window, WindowError};
use crate::sat::SatEngine;
use crate::session::ResubSession;
use crate::var_alloc::UnboundVariable;

/// Extra variables reserved on top of the window size when pre-sizing the
/// engine.
const VAR_SLACK: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    InvalidWindow(WindowError),
    /// The window's clauses are contradictory on their own; `node` is the
    /// node whose clauses exposed it, if any.
    StructurallyUnsat { node: Option<NodeId> },
    Unbound(UnboundVariable),
}

impl std::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EncodeError::InvalidWindow(e) => write!(f, "invalid window: {}", e),
            EncodeError::StructurallyUnsat { node: Some(node) } => {
                write!(f, "window CNF is unsatisfiable at node {}", node)
            }
            EncodeError::StructurallyUnsat { node: None } => {
                write!(f, "window CNF is unsatisfiable")
            }
            EncodeError::Unbound(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for EncodeError {}

impl From<WindowError> for EncodeError {
    fn from(e: WindowError) -> Self {
        EncodeError::InvalidWindow(e)
    }
}

impl From<UnboundVariable> for EncodeError {
    fn from(e: UnboundVariable) -> Self {
        EncodeError::Unbound(e)
    }
}

impl<E: SatEngine> ResubSession<E> {
    /// Rebuilds the engine contents for `window`.
    ///
    /// Every node binding from a previous encode is dropped; after an encode
    /// with fanout nodes, `sat_var` of a fanout node refers to its duplicated
    /// copy.
    pub fn encode(&mut self, network: &Network, window: &Window) -> Result<(), EncodeError> {
        let start = Instant::now();
        let result = self.encode_inner(network, window);
        self.stats.cnf_time += start.elapsed();
        self.stats.encode_count += 1;
        if let Err(e) = &result {
            log::debug!("encode: pivot {} failed: {}", window.pivot, e);
        }
        result
    }

    fn encode_inner(&mut self, network: &Network, window: &Window) -> Result<(), EncodeError> {
        window.validate(network)?;

        self.engine.reset();
        self.engine.ensure_var_count(
            1 + window.order.len() + window.tfo.len() + window.roots.len() + VAR_SLACK,
        );
        self.vars.reset();
        self.pivot = Some(window.pivot);

        for &node in &window.order {
            self.vars.bind(node);
        }
        self.div_vars = self.sat_vars(&window.divs)?;

        let mut clause_count = 0;
        for &node in &window.order {
            clause_count += self.add_node_clauses(network, node, PivotTie::None)?;
        }

        if !window.tfo.is_empty() {
            let pivot_var = self.vars.lookup(window.pivot)?;
            let original_roots = self.sat_vars(&window.roots)?;
            for &node in &window.tfo {
                self.vars.unbind(node);
                self.vars.bind(node);
            }
            for &node in &window.tfo {
                clause_count +=
                    self.add_node_clauses(network, node, PivotTie::Complement(pivot_var))?;
            }

            let mut diffs: Vec<SatLit> = Vec::with_capacity(window.roots.len());
            for (&root, &original) in window.roots.iter().zip(&original_roots) {
                let copy = self.vars.lookup(root)?;
                // A root that is the pivot itself is seen complemented by the
                // copy, so it always differs.
                let negated = root == window.pivot;
                let diff = self.vars.fresh();
                self.engine.ensure_var_count(diff.index() + 1);
                if !self.engine.add_xor(original, copy, diff, negated) {
                    return Err(EncodeError::StructurallyUnsat { node: Some(root) });
                }
                diffs.push(diff.positive());
            }
            if !self.engine.add_clause(&diffs) {
                return Err(EncodeError::StructurallyUnsat { node: None });
            }
            clause_count += 4 * diffs.len() + 1;
        }

        self.engine.ensure_var_count(self.vars.next_var().index());
        if !self.engine.simplify() {
            return Err(EncodeError::StructurallyUnsat { node: None });
        }
        self.stats.clause_count += clause_count;
        log::debug!(
            "encode: pivot {} order {} divs {} tfo {} roots {} -> {} clauses, {} vars",
            window.pivot,
            window.order.len(),
            window.divs.len(),
            window.tfo.len(),
            window.roots.len(),
            clause_count,
            self.engine.var_count()
        );
        Ok(())
    }

    /// Instantiates `node`'s template against its current fanin bindings and
    /// adds the clauses; returns how many were added.
    fn add_node_clauses(
        &mut self,
        network: &Network,
        node: NodeId,
        tie: PivotTie,
    ) -> Result<usize, EncodeError> {
        let Some(template) = network.cnf(node) else {
            return Ok(0);
        };
        let mut fanin_map: Vec<SatVar> = self.sat_vars(network.fanins(node))?;
        fanin_map.push(self.vars.lookup(node)?);
        template.instantiate(&fanin_map, tie, &mut self.clauses);
        for clause in self.clauses.iter() {
            if clause.is_empty() || !self.engine.add_clause(clause) {
                return Err(EncodeError::StructurallyUnsat { node: Some(node) });
            }
        }
        Ok(self.clauses.len())
    }
}
