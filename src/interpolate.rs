// SPDX-License-Identifier: Apache-2.0

//! Interpolant computation by cube learning.
//!
//! Each round asks the engine for an onset point of the pivot that is not yet
//! covered, then checks whether the same divisor pattern is also reachable
//! with the pivot at 0. If it is, no function of the divisors can replace the
//! pivot. If it is not, the engine's failed assumptions name the divisors
//! that suffice to exclude the offset; their conjunction is a cube of the
//! interpolant, and a clause guarded by a per-call indicator literal blocks
//! the cube for the following rounds.

use serde::Serialize;

use crate::cnf::{SatLit, SatVar};
use crate::sat::{SatEngine, SolveStatus};
use crate::session::ResubSession;
use crate::truth::{MAX_VARS, Truth6};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InterpolantOutcome {
    /// A function of the divisors (bit `i` = value on divisor pattern `i`)
    /// that is equivalent to the pivot wherever the pivot matters.
    Function(Truth6),
    /// Some divisor pattern occurs with both pivot values.
    Infeasible,
    /// The conflict budget ran out.
    Undecided,
}

impl<E: SatEngine> ResubSession<E> {
    /// Computes a function of `divisors` equivalent to `pivot` under the
    /// encoded window, by cube learning.
    ///
    /// Requires a successful `encode`. On `Infeasible`, one counterexample
    /// row is appended to the session's matrix.
    pub fn compute_interpolant(&mut self, pivot: SatVar, divisors: &[SatVar]) -> InterpolantOutcome {
        assert!(
            divisors.len() <= MAX_VARS,
            "at most {} divisors are supported, got {}",
            MAX_VARS,
            divisors.len()
        );
        let indicator = self.new_engine_var().positive();
        let onset_query = [pivot.positive(), indicator];
        let mut function = Truth6::const0();
        let mut iterations = 0;
        let mut offset_query: Vec<SatLit> = Vec::with_capacity(divisors.len() + 1);
        loop {
            iterations += 1;
            self.stats.last_iterations = iterations;
            match self.solve(&onset_query) {
                SolveStatus::Undecided => return InterpolantOutcome::Undecided,
                SolveStatus::Unsat => {
                    log::debug!(
                        "compute_interpolant: {} divisors, {} iterations -> {:#018x}",
                        divisors.len(),
                        iterations,
                        function.0
                    );
                    return InterpolantOutcome::Function(function);
                }
                SolveStatus::Sat => {}
            }
            self.snapshot_div_values();

            offset_query.clear();
            offset_query.push(pivot.negative());
            offset_query.extend(divisors.iter().map(|&d| self.engine.var_literal(d)));
            match self.solve(&offset_query) {
                SolveStatus::Undecided => return InterpolantOutcome::Undecided,
                SolveStatus::Sat => {
                    let baseline = std::mem::take(&mut self.values);
                    self.record_cex(&baseline);
                    self.values = baseline;
                    log::debug!(
                        "compute_interpolant: infeasible after {} iterations",
                        iterations
                    );
                    return InterpolantOutcome::Infeasible;
                }
                SolveStatus::Unsat => {}
            }

            let mut cube = Truth6::const1();
            let mut blocking = vec![!indicator];
            for &lit in self.engine.final_conflict() {
                if lit == pivot.negative() {
                    continue;
                }
                let Some(position) = divisors.iter().position(|&d| d == lit.var()) else {
                    unreachable!("failed assumption {} is not a divisor", lit);
                };
                cube = cube.and_sharp(Truth6::var(position), !lit.is_negated());
                blocking.push(!lit);
            }
            function = function.or(cube);
            let added = self.engine.add_clause(&blocking);
            debug_assert!(added, "blocking clause is guarded by a fresh indicator");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{Network, NodeId, Window};
    use crate::sat::ConflictBudget;
    use crate::session::ResubParams;

    fn and2() -> Truth6 {
        Truth6::var(0).and(Truth6::var(1))
    }

    fn and_window() -> (Network, Window, NodeId, NodeId) {
        let mut net = Network::new();
        let a = net.add_input("a");
        let b = net.add_input("b");
        let p = net.add_logic("p", &[a, b], and2());
        let window = Window {
            pivot: p,
            order: vec![a, b, p],
            divs: vec![a, b],
            ..Default::default()
        };
        (net, window, a, b)
    }

    #[test]
    fn test_and_pivot_yields_and_function_in_two_iterations() {
        let _ = env_logger::builder().is_test(true).try_init();
        let (net, window, a, b) = and_window();
        let mut session = ResubSession::new(ResubParams::default());
        session.encode(&net, &window).unwrap();
        let pivot = session.sat_var(window.pivot).unwrap();
        let divisors = session.sat_vars(&[a, b]).unwrap();
        let outcome = session.compute_interpolant(pivot, &divisors);
        assert_eq!(outcome, InterpolantOutcome::Function(and2()));
        assert_eq!(session.stats().last_iterations, 2);
        assert_eq!(session.cex().count(), 0);
    }

    #[test]
    fn test_missing_divisor_is_infeasible() {
        let (net, window, a, _b) = and_window();
        let mut session = ResubSession::new(ResubParams::default());
        session.encode(&net, &window).unwrap();
        let pivot = session.sat_var(window.pivot).unwrap();
        let divisors = session.sat_vars(&[a]).unwrap();
        assert_eq!(
            session.compute_interpolant(pivot, &divisors),
            InterpolantOutcome::Infeasible
        );
        assert_eq!(session.cex().count(), 1);
        // a is pinned by the offset query, so only b can differ.
        assert_eq!(session.cex().row_diffs(0), vec![1]);
    }

    #[test]
    fn test_zero_budget_is_undecided() {
        let (net, window, a, b) = and_window();
        let mut session = ResubSession::new(ResubParams {
            conflict_budget: ConflictBudget::Conflicts(0),
        });
        session.encode(&net, &window).unwrap();
        let pivot = session.sat_var(window.pivot).unwrap();
        let divisors = session.sat_vars(&[a, b]).unwrap();
        assert_eq!(
            session.compute_interpolant(pivot, &divisors),
            InterpolantOutcome::Undecided
        );
        assert_eq!(session.cex().count(), 0);
    }

    #[test]
    fn test_constant_pivot_with_no_divisors() {
        let mut net = Network::new();
        let a = net.add_input("a");
        // a | !a
        let p = net.add_logic("p", &[a], Truth6::const1());
        let window = Window {
            pivot: p,
            order: vec![a, p],
            divs: vec![a],
            ..Default::default()
        };
        let mut session = ResubSession::new(ResubParams::default());
        session.encode(&net, &window).unwrap();
        let pivot = session.sat_var(p).unwrap();
        assert_eq!(
            session.compute_interpolant(pivot, &[]),
            InterpolantOutcome::Function(Truth6::const1())
        );
    }
}
