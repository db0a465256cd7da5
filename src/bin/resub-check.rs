// SPDX-License-Identifier: Apache-2.0

//! Loads a JSON resubstitution problem, encodes its window and asks whether
//! the pivot can be expressed over the given divisors.
//!
//! Exit status:
//!   0 - The requested methods ran and (with `--method both`) agree.
//!   1 - The methods disagree, or the input could not be loaded or encoded.

use std::path::PathBuf;
use std::process::exit;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use serde::Serialize;

use xlsynth_resub::enumerate::{MintermOutcome, choose_cover};
use xlsynth_resub::window_io::{self, ResubProblem};
use xlsynth_resub::{ConflictBudget, InterpolantOutcome, ResubSession, SolveStats, Truth6};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Method {
    /// Cube learning over failed assumptions.
    Cube,
    /// Exhaustive minterm enumeration followed by an ISOP cover.
    Minterm,
    /// Run both and cross-check them.
    Both,
}

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// JSON problem description.
    input: PathBuf,
    #[arg(long, value_enum, default_value_t = Method::Both)]
    method: Method,
    /// Per-query conflict limit; overrides the problem's own parameters.
    /// varisat cannot stop a search early, so only 0 (report every query as
    /// undecided) changes the result; any other limit runs queries to
    /// completion.
    #[arg(long)]
    conflict_limit: Option<u64>,
    /// Emit the report as JSON instead of text.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct MethodReport {
    method: &'static str,
    outcome: InterpolantOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    onset: Option<Truth6>,
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<Truth6>,
    cubes: Vec<String>,
    complemented: bool,
    cex_rows: Vec<Vec<usize>>,
    stats: SolveStats,
}

#[derive(Debug, Serialize)]
struct Report {
    pivot: String,
    divisors: Vec<String>,
    methods: Vec<MethodReport>,
    agree: bool,
}

fn new_session(
    problem: &ResubProblem,
    budget: Option<u64>,
) -> anyhow::Result<(ResubSession, xlsynth_resub::SatVar, Vec<xlsynth_resub::SatVar>)> {
    let mut session = ResubSession::new(problem.params);
    if let Some(limit) = budget {
        session.set_conflict_budget(ConflictBudget::Conflicts(limit));
    }
    session
        .encode(&problem.network, &problem.window)
        .context("failed to encode window")?;
    let pivot = session.sat_var(problem.window.pivot)?;
    let divisors = session.sat_vars(&problem.divisors)?;
    Ok((session, pivot, divisors))
}

fn cex_rows(session: &ResubSession) -> Vec<Vec<usize>> {
    (0..session.cex().count())
        .map(|row| session.cex().row_diffs(row))
        .collect()
}

fn run_cube(problem: &ResubProblem, budget: Option<u64>) -> anyhow::Result<MethodReport> {
    let (mut session, pivot, divisors) = new_session(problem, budget)?;
    let outcome = session.compute_interpolant(pivot, &divisors);
    Ok(MethodReport {
        method: "cube",
        outcome,
        onset: None,
        offset: None,
        cubes: Vec::new(),
        complemented: false,
        cex_rows: cex_rows(&session),
        stats: session.stats().clone(),
    })
}

fn run_minterm(problem: &ResubProblem, budget: Option<u64>) -> anyhow::Result<MethodReport> {
    let (mut session, pivot, divisors) = new_session(problem, budget)?;
    let mut report = MethodReport {
        method: "minterm",
        outcome: InterpolantOutcome::Undecided,
        onset: None,
        offset: None,
        cubes: Vec::new(),
        complemented: false,
        cex_rows: Vec::new(),
        stats: SolveStats::default(),
    };
    match session.compute_minterm_tables(pivot, &divisors) {
        MintermOutcome::Undecided => {}
        MintermOutcome::Infeasible => report.outcome = InterpolantOutcome::Infeasible,
        MintermOutcome::Tables { onset, offset } => {
            let choice = choose_cover(onset, offset, divisors.len());
            report.outcome = InterpolantOutcome::Function(choice.function);
            report.onset = Some(onset);
            report.offset = Some(offset);
            report.cubes = choice.cubes.iter().map(|c| c.to_string()).collect();
            report.complemented = choice.complemented;
        }
    }
    report.cex_rows = cex_rows(&session);
    report.stats = session.stats().clone();
    Ok(report)
}

/// Two results agree when neither is undecided and they reach the same
/// verdict; a cube-learned function must also match every enumerated
/// minterm (they may differ on unreachable patterns).
fn reports_agree(reports: &[MethodReport]) -> bool {
    let [cube, minterm] = reports else {
        return true;
    };
    match (cube.outcome, minterm.outcome) {
        (InterpolantOutcome::Undecided, _) | (_, InterpolantOutcome::Undecided) => true,
        (InterpolantOutcome::Infeasible, InterpolantOutcome::Infeasible) => true,
        (InterpolantOutcome::Function(f), InterpolantOutcome::Function(_)) => {
            match (minterm.onset, minterm.offset) {
                (Some(onset), Some(offset)) => {
                    f.0 & onset.0 == onset.0 && f.0 & offset.0 == 0
                }
                _ => false,
            }
        }
        _ => false,
    }
}

fn print_text(report: &Report) {
    println!("pivot: {}", report.pivot);
    println!("divisors: [{}]", report.divisors.join(", "));
    for method in &report.methods {
        match method.outcome {
            InterpolantOutcome::Function(f) => {
                println!("{}: function {:#018x}", method.method, f.0)
            }
            InterpolantOutcome::Infeasible => println!("{}: infeasible", method.method),
            InterpolantOutcome::Undecided => println!("{}: undecided", method.method),
        }
        if !method.cubes.is_empty() {
            println!(
                "  cover{}: {}",
                if method.complemented { " (complemented)" } else { "" },
                method.cubes.join(" | ")
            );
        }
        for (i, row) in method.cex_rows.iter().enumerate() {
            println!("  cex {}: differing divisor candidates {:?}", i, row);
        }
        println!(
            "  sat calls: {} (undecided {}), iterations: {}, clauses: {}, cnf time: {:?}, sat time: {:?}",
            method.stats.sat_calls,
            method.stats.undecided_calls,
            method.stats.last_iterations,
            method.stats.clause_count,
            method.stats.cnf_time,
            method.stats.sat_time
        );
    }
    if report.methods.len() > 1 {
        println!("agree: {}", report.agree);
    }
}

fn run(cli: &Cli) -> anyhow::Result<Report> {
    let problem = window_io::load_problem(&cli.input)
        .with_context(|| format!("failed to load problem from {}", cli.input.display()))?;
    log::info!(
        "resub-check: {} nodes, pivot {}, {} divisors",
        problem.network.len(),
        problem.window.pivot,
        problem.divisors.len()
    );
    if problem.divisors.len() > xlsynth_resub::truth::MAX_VARS {
        anyhow::bail!(
            "{} divisors given; at most {} are supported",
            problem.divisors.len(),
            xlsynth_resub::truth::MAX_VARS
        );
    }

    let mut methods = Vec::new();
    if cli.method != Method::Minterm {
        methods.push(run_cube(&problem, cli.conflict_limit)?);
    }
    if cli.method != Method::Cube {
        methods.push(run_minterm(&problem, cli.conflict_limit)?);
    }
    let agree = reports_agree(&methods);
    let name = |id| problem.network.node(id).name().to_string();
    Ok(Report {
        pivot: name(problem.window.pivot),
        divisors: problem.divisors.iter().map(|&d| name(d)).collect(),
        methods,
        agree,
    })
}

fn main() {
    let _ = env_logger::builder().try_init();
    let cli = Cli::parse();

    let report = match run(&cli) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("[resub-check] error: {:#}", e);
            exit(1);
        }
    };
    if cli.json {
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("[resub-check] error: {}", e);
                exit(1);
            }
        }
    } else {
        print_text(&report);
    }
    if !report.agree {
        eprintln!("ERROR: cube learning and minterm enumeration disagree.");
        exit(1);
    }
}
