// SPDX-License-Identifier: Apache-2.0

//! SAT variables, literals and per-node CNF templates.
//!
//! A `CnfTemplate` describes the clauses of a single node over *local*
//! variables: local variable `i < fanin_count` is the `i`-th fanin and local
//! variable `fanin_count` is the node output. Instantiating the template
//! against a fanin map (fanin SAT variables followed by the output SAT
//! variable) produces concrete clauses in a `ClauseBuffer`.

use serde::{Deserialize, Serialize};

use crate::truth::{Truth6, isop};

/// A SAT variable. Variable 0 is reserved and never bound to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SatVar(pub u32);

impl SatVar {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn positive(self) -> SatLit {
        SatLit::new(self, false)
    }

    pub fn negative(self) -> SatLit {
        SatLit::new(self, true)
    }
}

impl std::fmt::Display for SatVar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A SAT literal encoded as `2 * var + negated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SatLit(u32);

impl SatLit {
    pub fn new(var: SatVar, negated: bool) -> Self {
        SatLit(var.0 << 1 | negated as u32)
    }

    pub fn code(self) -> u32 {
        self.0
    }

    pub fn var(self) -> SatVar {
        SatVar(self.0 >> 1)
    }

    pub fn is_negated(self) -> bool {
        self.0 & 1 != 0
    }

    #[must_use]
    pub fn negate_if(self, cond: bool) -> Self {
        SatLit(self.0 ^ cond as u32)
    }
}

impl std::ops::Not for SatLit {
    type Output = SatLit;

    fn not(self) -> SatLit {
        SatLit(self.0 ^ 1)
    }
}

impl std::fmt::Display for SatLit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_negated() {
            write!(f, "!{}", self.var())
        } else {
            write!(f, "{}", self.var())
        }
    }
}

/// How literals on the pivot variable are rewritten while instantiating a
/// template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PivotTie {
    /// Literals are substituted as-is.
    None,
    /// Literals landing on this variable are complemented. Used when emitting
    /// the duplicated fanout cone so it observes the pivot at the opposite
    /// polarity.
    Complement(SatVar),
}

/// A literal over a template's local variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalLit {
    pub index: u8,
    pub negated: bool,
}

impl LocalLit {
    pub fn code(self) -> i8 {
        ((self.index << 1) | self.negated as u8) as i8
    }

    pub fn from_code(code: i8) -> Self {
        debug_assert!(code >= 0);
        let code = code as u8;
        LocalLit {
            index: code >> 1,
            negated: code & 1 != 0,
        }
    }
}

#[derive(Debug)]
pub enum TemplateError {
    /// A literal code refers to a local variable beyond the output.
    LocalOutOfRange { code: i8, fanin_count: usize },
    /// The byte stream does not end with a clause terminator.
    Unterminated,
    /// A negative code other than the `-1` terminator.
    BadCode(i8),
}

impl std::fmt::Display for TemplateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateError::LocalOutOfRange { code, fanin_count } => write!(
                f,
                "template literal code {} out of range for {} fanins",
                code, fanin_count
            ),
            TemplateError::Unterminated => write!(f, "template byte stream is not terminated"),
            TemplateError::BadCode(code) => write!(f, "bad template literal code {}", code),
        }
    }
}

impl std::error::Error for TemplateError {}

/// Clauses of a single node over its local variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CnfTemplate {
    fanin_count: usize,
    clauses: Vec<Vec<LocalLit>>,
}

impl CnfTemplate {
    pub fn new(fanin_count: usize, clauses: Vec<Vec<LocalLit>>) -> Self {
        debug_assert!(
            clauses
                .iter()
                .flatten()
                .all(|lit| (lit.index as usize) <= fanin_count)
        );
        CnfTemplate {
            fanin_count,
            clauses,
        }
    }

    /// Derives the template of `output = truth(fanins)`.
    ///
    /// Every cube `c` of an irredundant cover of the onset yields the clause
    /// `!c | output`, and every cube of the offset cover yields `!c | !output`.
    /// Constant functions become a unit clause on the output.
    pub fn from_truth(truth: Truth6, fanin_count: usize) -> Self {
        let truth = truth.stretch(fanin_count);
        let output = fanin_count as u8;
        if truth.is_const0() || truth.is_const1() {
            return CnfTemplate {
                fanin_count,
                clauses: vec![vec![LocalLit {
                    index: output,
                    negated: truth.is_const0(),
                }]],
            };
        }
        let mut clauses = Vec::new();
        for (function, output_negated) in [(truth, false), (truth.not(), true)] {
            let cover = isop(function, function, fanin_count);
            for cube in &cover.cubes {
                let mut clause: Vec<LocalLit> = (0..fanin_count)
                    .filter_map(|i| {
                        cube.literal(i).map(|positive| LocalLit {
                            index: i as u8,
                            negated: positive,
                        })
                    })
                    .collect();
                clause.push(LocalLit {
                    index: output,
                    negated: output_negated,
                });
                clauses.push(clause);
            }
        }
        CnfTemplate {
            fanin_count,
            clauses,
        }
    }

    /// Parses the compact byte form: literal codes `2 * local + negated`,
    /// each clause terminated by `-1`.
    pub fn from_bytes(fanin_count: usize, bytes: &[i8]) -> Result<Self, TemplateError> {
        let mut clauses = Vec::new();
        let mut current = Vec::new();
        for &code in bytes {
            if code == -1 {
                clauses.push(std::mem::take(&mut current));
                continue;
            }
            if code < 0 {
                return Err(TemplateError::BadCode(code));
            }
            let lit = LocalLit::from_code(code);
            if lit.index as usize > fanin_count {
                return Err(TemplateError::LocalOutOfRange { code, fanin_count });
            }
            current.push(lit);
        }
        if !current.is_empty() {
            return Err(TemplateError::Unterminated);
        }
        Ok(CnfTemplate {
            fanin_count,
            clauses,
        })
    }

    pub fn to_bytes(&self) -> Vec<i8> {
        let mut bytes = Vec::new();
        for clause in &self.clauses {
            bytes.extend(clause.iter().map(|lit| lit.code()));
            bytes.push(-1);
        }
        bytes
    }

    pub fn fanin_count(&self) -> usize {
        self.fanin_count
    }

    pub fn clauses(&self) -> &[Vec<LocalLit>] {
        &self.clauses
    }

    /// Substitutes `fanin_map` (fanin variables followed by the output
    /// variable) into the template, replacing the contents of `out`.
    pub fn instantiate(&self, fanin_map: &[SatVar], tie: PivotTie, out: &mut ClauseBuffer) {
        assert_eq!(
            fanin_map.len(),
            self.fanin_count + 1,
            "fanin map must hold every fanin plus the output"
        );
        out.clear();
        for clause in &self.clauses {
            out.begin_clause();
            for lit in clause {
                let var = fanin_map[lit.index as usize];
                let complement = matches!(tie, PivotTie::Complement(pivot) if pivot == var);
                out.push(SatLit::new(var, lit.negated ^ complement));
            }
        }
    }
}

/// Flat storage for the clauses of one instantiated template.
#[derive(Debug, Default)]
pub struct ClauseBuffer {
    lits: Vec<SatLit>,
    starts: Vec<usize>,
}

impl ClauseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.lits.clear();
        self.starts.clear();
    }

    pub fn begin_clause(&mut self) {
        self.starts.push(self.lits.len());
    }

    pub fn push(&mut self, lit: SatLit) {
        debug_assert!(!self.starts.is_empty(), "push before begin_clause");
        self.lits.push(lit);
    }

    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[SatLit]> + '_ {
        self.starts.iter().enumerate().map(move |(i, &start)| {
            let end = self.starts.get(i + 1).copied().unwrap_or(self.lits.len());
            &self.lits[start..end]
        })
    }
}
