// SPDX-License-Identifier: Apache-2.0

//! Cross-checks both interpolant computers against exhaustive simulation of
//! small random networks.

use pretty_assertions::assert_eq;
use rand::{Rng, RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use test_case::test_case;

use xlsynth_resub::enumerate::MintermOutcome;
use xlsynth_resub::sat::{ConflictBudget, SatEngine, SolveStatus, VarisatEngine};
use xlsynth_resub::truth::minterm_index;
use xlsynth_resub::{
    InterpolantOutcome, Network, NodeId, ResubParams, ResubSession, SatLit, SatVar, Truth6,
    Window,
};

struct Problem {
    net: Network,
    window: Window,
    divisors: Vec<NodeId>,
}

/// Builds a random network over `input_count` inputs followed by
/// `logic_count` gates of up to three fanins, then cuts a window around a
/// random gate. With `use_tfo` the window also carries the pivot's fanout
/// cone, its sinks acting as roots.
fn random_problem(rng: &mut Xoshiro256PlusPlus, use_tfo: bool) -> Problem {
    let input_count = rng.gen_range(2..=6);
    let logic_count = rng.gen_range(3..=8);
    let mut net = Network::new();
    for i in 0..input_count {
        net.add_input(&format!("i{}", i));
    }
    for g in 0..logic_count {
        let available = net.len();
        let fanin_count = rng.gen_range(1..=3usize.min(available));
        let mut fanins: Vec<NodeId> = Vec::with_capacity(fanin_count);
        while fanins.len() < fanin_count {
            let f = NodeId(rng.gen_range(0..available));
            if !fanins.contains(&f) {
                fanins.push(f);
            }
        }
        let function = Truth6(rng.next_u64()).stretch(fanin_count);
        net.add_logic(&format!("g{}", g), &fanins, function);
    }

    let pivot = NodeId(rng.gen_range(input_count..net.len()));
    let mut in_tfo = vec![false; net.len()];
    for id in pivot.0 + 1..net.len() {
        in_tfo[id] = net
            .fanins(NodeId(id))
            .iter()
            .any(|f| *f == pivot || in_tfo[f.0]);
    }
    let tfo: Vec<NodeId> = if use_tfo {
        (0..net.len()).filter(|&i| in_tfo[i]).map(NodeId).collect()
    } else {
        Vec::new()
    };
    let roots: Vec<NodeId> = tfo
        .iter()
        .copied()
        .filter(|&n| !tfo.iter().any(|&m| net.fanins(m).contains(&n)))
        .collect();
    let order: Vec<NodeId> = if tfo.is_empty() {
        (0..=pivot.0).map(NodeId).collect()
    } else {
        (0..net.len()).map(NodeId).collect()
    };
    let divs: Vec<NodeId> = order
        .iter()
        .copied()
        .filter(|&n| n != pivot && !in_tfo[n.0])
        .collect();

    let divisor_count = rng.gen_range(0..=divs.len().min(6));
    let mut divisors = Vec::with_capacity(divisor_count);
    while divisors.len() < divisor_count {
        let d = divs[rng.gen_range(0..divs.len())];
        if !divisors.contains(&d) {
            divisors.push(d);
        }
    }
    Problem {
        net,
        window: Window {
            pivot,
            order,
            divs,
            tfo,
            roots,
        },
        divisors,
    }
}

/// Reachable divisor patterns split by pivot value, counting only input
/// assignments where the pivot is observable at some root.
fn simulated_tables(problem: &Problem) -> (Truth6, Truth6) {
    let net = &problem.net;
    let input_count = net.inputs().len();
    let mut onset = Truth6::const0();
    let mut offset = Truth6::const0();
    for m in 0..1usize << input_count {
        let inputs: Vec<bool> = (0..input_count).map(|i| m >> i & 1 != 0).collect();
        let values = net.simulate(&inputs);
        if !problem.window.tfo.is_empty() {
            let flipped = net.simulate_with_flip(&inputs, Some(problem.window.pivot));
            if problem.window.roots.iter().all(|r| values[r.0] == flipped[r.0]) {
                continue;
            }
        }
        let pattern: Vec<bool> = problem.divisors.iter().map(|d| values[d.0]).collect();
        let minterm = minterm_index(&pattern);
        if values[problem.window.pivot.0] {
            onset.set_bit(minterm);
        } else {
            offset.set_bit(minterm);
        }
    }
    (onset, offset)
}

fn encode(problem: &Problem, params: ResubParams) -> (ResubSession, SatVar, Vec<SatVar>) {
    let mut session = ResubSession::new(params);
    session.encode(&problem.net, &problem.window).unwrap();
    let pivot = session.sat_var(problem.window.pivot).unwrap();
    let divisors = session.sat_vars(&problem.divisors).unwrap();
    (session, pivot, divisors)
}

/// `f` covers the onset and avoids the offset on the low divisor patterns.
fn separates(f: Truth6, onset: Truth6, offset: Truth6) -> bool {
    f.0 & onset.0 == onset.0 && f.0 & offset.0 == 0
}

#[test_case(false; "fanin only")]
#[test_case(true; "with fanout miter")]
fn test_methods_agree_with_simulation(use_tfo: bool) {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(if use_tfo { 0xfa11 } else { 0x5eed });
    let mut checked = 0;
    for _ in 0..200 {
        let problem = random_problem(&mut rng, use_tfo);
        let (onset, offset) = simulated_tables(&problem);
        if use_tfo && !problem.window.tfo.is_empty() && onset.or(offset).is_const0() {
            // The pivot is never observable; encode rejects the window.
            continue;
        }
        let feasible = onset.and(offset).is_const0();

        let (mut session, pivot, divisors) = encode(&problem, ResubParams::default());
        let tables = session.compute_minterm_tables(pivot, &divisors);
        if feasible {
            assert_eq!(tables, MintermOutcome::Tables { onset, offset });
        } else {
            assert_eq!(tables, MintermOutcome::Infeasible);
        }

        let (mut session, pivot, divisors) = encode(&problem, ResubParams::default());
        let cube = session.compute_interpolant(pivot, &divisors);
        let (mut session, pivot, divisors) = encode(&problem, ResubParams::default());
        let isop = session.compute_interpolant_isop(pivot, &divisors);
        match (cube, isop) {
            (InterpolantOutcome::Function(f), InterpolantOutcome::Function(g)) => {
                assert!(feasible);
                assert!(separates(f, onset, offset), "cube-learned {:#x}", f.0);
                assert!(separates(g, onset, offset), "isop {:#x}", g.0);
            }
            (InterpolantOutcome::Infeasible, InterpolantOutcome::Infeasible) => {
                assert!(!feasible);
            }
            other => panic!("methods disagree: {:?}", other),
        }
        checked += 1;
    }
    assert!(checked > 50, "only {} windows checked", checked);
}

#[test]
fn test_six_input_parity_fills_the_whole_word() {
    let mut net = Network::new();
    let inputs: Vec<NodeId> = (0..6).map(|i| net.add_input(&format!("i{}", i))).collect();
    let xor2 = Truth6(Truth6::var(0).0 ^ Truth6::var(1).0);
    let xor3 = Truth6(Truth6::var(0).0 ^ Truth6::var(1).0 ^ Truth6::var(2).0);
    let pairs: Vec<NodeId> = inputs
        .chunks(2)
        .enumerate()
        .map(|(i, pair)| net.add_logic(&format!("x{}", i), pair, xor2))
        .collect();
    let p = net.add_logic("p", &pairs, xor3);
    let mut order = inputs.clone();
    order.extend(&pairs);
    order.push(p);
    let problem = Problem {
        net,
        window: Window {
            pivot: p,
            order,
            divs: inputs.clone(),
            ..Default::default()
        },
        divisors: inputs,
    };
    let parity = Truth6((0..6).fold(0, |acc, i| acc ^ Truth6::var(i).0));
    assert_eq!(parity, Truth6(0x6996966996696996));

    let (mut session, pivot, divisors) = encode(&problem, ResubParams::default());
    assert_eq!(
        session.compute_minterm_tables(pivot, &divisors),
        MintermOutcome::Tables {
            onset: parity,
            offset: parity.not(),
        }
    );
    // 64 minterms plus the final unsatisfiable query.
    assert_eq!(session.stats().last_iterations, 65);

    let (mut session, pivot, divisors) = encode(&problem, ResubParams::default());
    assert_eq!(
        session.compute_interpolant(pivot, &divisors),
        InterpolantOutcome::Function(parity)
    );
    assert_eq!(session.cex().count(), 0);

    let (mut session, pivot, divisors) = encode(&problem, ResubParams::default());
    let (outcome, choice) = session.compute_interpolant_cover(pivot, &divisors);
    assert_eq!(outcome, InterpolantOutcome::Function(parity));
    // Parity has no don't-cares and no mergeable minterms: both covers need
    // all 32 full cubes, and the onset cover wins the tie.
    let choice = choice.unwrap();
    assert!(!choice.complemented);
    assert_eq!(choice.cubes.len(), 32);
    assert!(choice.cubes.iter().all(|c| c.literal_count() == 6));
}

#[test]
fn test_interpolant_replaces_pivot_in_simulation() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
    for _ in 0..100 {
        let problem = random_problem(&mut rng, true);
        let (onset, offset) = simulated_tables(&problem);
        if onset.or(offset).is_const0() {
            continue;
        }
        let (mut session, pivot, divisors) = encode(&problem, ResubParams::default());
        let InterpolantOutcome::Function(f) = session.compute_interpolant(pivot, &divisors) else {
            continue;
        };
        // Wherever the pivot is observable, f over the divisor values must
        // reproduce it.
        let net = &problem.net;
        let input_count = net.inputs().len();
        for m in 0..1usize << input_count {
            let inputs: Vec<bool> = (0..input_count).map(|i| m >> i & 1 != 0).collect();
            let values = net.simulate(&inputs);
            let flipped = net.simulate_with_flip(&inputs, Some(problem.window.pivot));
            let observable = problem.window.tfo.is_empty()
                || problem.window.roots.iter().any(|r| values[r.0] != flipped[r.0]);
            if !observable {
                continue;
            }
            let pattern: Vec<bool> = problem.divisors.iter().map(|d| values[d.0]).collect();
            assert_eq!(f.eval(&pattern), values[problem.window.pivot.0]);
        }
    }
}

fn xor_window() -> (Network, Window, [NodeId; 3]) {
    let mut net = Network::new();
    let a = net.add_input("a");
    let b = net.add_input("b");
    let c = net.add_input("c");
    let p = net.add_logic("p", &[a, b], Truth6(Truth6::var(0).0 ^ Truth6::var(1).0));
    let window = Window {
        pivot: p,
        order: vec![a, b, c, p],
        divs: vec![a, b, c],
        ..Default::default()
    };
    (net, window, [a, b, c])
}

#[test]
fn test_cex_rows_only_grow() {
    let (net, window, [a, _b, c]) = xor_window();
    // Every divisor set pins a, so b has to change in each counterexample.
    let mut session = ResubSession::new(ResubParams::default());
    session.encode(&net, &window).unwrap();
    let pivot = session.pivot_var().unwrap();
    let mut previous: Vec<Vec<bool>> = Vec::new();
    for (i, divisors) in [vec![a], vec![a, c], vec![a]].iter().enumerate() {
        let divisors = session.sat_vars(divisors).unwrap();
        let outcome = if i % 2 == 0 {
            session.compute_interpolant(pivot, &divisors)
        } else {
            session.compute_interpolant_isop(pivot, &divisors)
        };
        assert_eq!(outcome, InterpolantOutcome::Infeasible);
        let cex = session.cex();
        assert_eq!(cex.count(), previous.len() + 1);
        for (row, expected) in previous.iter().enumerate() {
            assert_eq!(&cex.row(row), expected);
        }
        assert!(cex.get(1, cex.count() - 1));
        previous.push(cex.row(cex.count() - 1));
    }
}

#[test_case(0; "cube learning")]
#[test_case(1; "minterm enumeration")]
#[test_case(2; "isop")]
fn test_zero_budget_is_undecided(method: usize) {
    let (net, window, [a, b, _c]) = xor_window();
    let mut session = ResubSession::new(ResubParams {
        conflict_budget: ConflictBudget::Conflicts(0),
    });
    session.encode(&net, &window).unwrap();
    let pivot = session.pivot_var().unwrap();
    let divisors = session.sat_vars(&[a, b]).unwrap();
    let undecided = match method {
        0 => session.compute_interpolant(pivot, &divisors) == InterpolantOutcome::Undecided,
        1 => session.compute_minterm_tables(pivot, &divisors) == MintermOutcome::Undecided,
        _ => session.compute_interpolant_isop(pivot, &divisors) == InterpolantOutcome::Undecided,
    };
    assert!(undecided);
    assert_eq!(session.cex().count(), 0);
    assert_eq!(session.stats().undecided_calls, 1);
}

/// Answers `Undecided` once a fixed number of queries has been spent.
struct RationedEngine {
    inner: VarisatEngine,
    remaining: usize,
}

impl SatEngine for RationedEngine {
    fn reset(&mut self) {
        self.inner.reset();
    }

    fn ensure_var_count(&mut self, count: usize) {
        self.inner.ensure_var_count(count);
    }

    fn var_count(&self) -> usize {
        self.inner.var_count()
    }

    fn add_clause(&mut self, lits: &[SatLit]) -> bool {
        self.inner.add_clause(lits)
    }

    fn simplify(&mut self) -> bool {
        self.inner.simplify()
    }

    fn solve(&mut self, assumptions: &[SatLit], budget: ConflictBudget) -> SolveStatus {
        if self.remaining == 0 {
            return SolveStatus::Undecided;
        }
        self.remaining -= 1;
        self.inner.solve(assumptions, budget)
    }

    fn final_conflict(&self) -> &[SatLit] {
        self.inner.final_conflict()
    }

    fn var_value(&self, var: SatVar) -> bool {
        self.inner.var_value(var)
    }
}

#[test]
fn test_undecided_offset_query_stops_cube_learning() {
    let (net, window, [a, b, _c]) = xor_window();
    let engine = RationedEngine {
        inner: VarisatEngine::new(),
        remaining: 1,
    };
    let mut session = ResubSession::with_engine(engine, ResubParams::default());
    session.encode(&net, &window).unwrap();
    let pivot = session.pivot_var().unwrap();
    let divisors = session.sat_vars(&[a, b]).unwrap();
    // The onset query succeeds, the offset query runs out.
    assert_eq!(
        session.compute_interpolant(pivot, &divisors),
        InterpolantOutcome::Undecided
    );
    assert_eq!(session.stats().sat_calls, 2);
    assert_eq!(session.cex().count(), 0);
}
