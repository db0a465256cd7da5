// SPDX-License-Identifier: Apache-2.0

//! JSON description of a resubstitution problem: a network, a window cut
//! out of it and the divisor set to solve for.
//!
//! Nodes are referred to by name and listed in topological order. A node
//! without a `truth` field is a primary input; `truth` is a hex truth table
//! over the node's fanins (fanin 0 is the least-significant selector bit). An
//! optional `cnf` gives the template in its byte form instead of deriving it
//! from the truth table.
//!
//! ```json
//! {
//!   "nodes": [
//!     {"name": "a"},
//!     {"name": "b"},
//!     {"name": "p", "fanins": ["a", "b"], "truth": "0x8"}
//!   ],
//!   "window": {"pivot": "p", "order": ["a", "b", "p"], "divs": ["a", "b"]},
//!   "divisors": ["a", "b"]
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::cnf::{CnfTemplate, TemplateError};
use crate::network::{Network, NodeId, Window};
use crate::session::ResubParams;
use crate::truth::Truth6;

#[derive(Debug, Deserialize)]
pub struct NodeDesc {
    pub name: String,
    #[serde(default)]
    pub fanins: Vec<String>,
    #[serde(default)]
    pub truth: Option<String>,
    #[serde(default)]
    pub cnf: Option<Vec<i8>>,
}

#[derive(Debug, Deserialize)]
pub struct WindowDesc {
    pub pivot: String,
    pub order: Vec<String>,
    #[serde(default)]
    pub divs: Vec<String>,
    #[serde(default)]
    pub tfo: Vec<String>,
    #[serde(default)]
    pub roots: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProblemDesc {
    pub nodes: Vec<NodeDesc>,
    pub window: WindowDesc,
    /// Divisors to solve for; defaults to the window's divisor candidates.
    #[serde(default)]
    pub divisors: Option<Vec<String>>,
    #[serde(default)]
    pub params: ResubParams,
}

#[derive(Debug)]
pub enum WindowIoError {
    Io(std::io::Error),
    Json(serde_json::Error),
    DuplicateNode(String),
    UnknownNode(String),
    BadTruth { node: String, text: String },
    Template { node: String, error: TemplateError },
}

impl std::fmt::Display for WindowIoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WindowIoError::Io(e) => write!(f, "I/O error: {}", e),
            WindowIoError::Json(e) => write!(f, "JSON error: {}", e),
            WindowIoError::DuplicateNode(name) => write!(f, "node {:?} defined twice", name),
            WindowIoError::UnknownNode(name) => {
                write!(f, "node {:?} is not defined before its use", name)
            }
            WindowIoError::BadTruth { node, text } => {
                write!(f, "node {:?}: bad truth table {:?}", node, text)
            }
            WindowIoError::Template { node, error } => write!(f, "node {:?}: {}", node, error),
        }
    }
}

impl std::error::Error for WindowIoError {}

impl From<std::io::Error> for WindowIoError {
    fn from(e: std::io::Error) -> Self {
        WindowIoError::Io(e)
    }
}

impl From<serde_json::Error> for WindowIoError {
    fn from(e: serde_json::Error) -> Self {
        WindowIoError::Json(e)
    }
}

/// A network together with the window and divisors to solve for.
#[derive(Debug, Clone)]
pub struct ResubProblem {
    pub network: Network,
    pub window: Window,
    pub divisors: Vec<NodeId>,
    pub params: ResubParams,
}

fn parse_truth(node: &str, text: &str) -> Result<Truth6, WindowIoError> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u64::from_str_radix(digits, 16)
        .map(Truth6)
        .map_err(|_| WindowIoError::BadTruth {
            node: node.to_string(),
            text: text.to_string(),
        })
}

impl ProblemDesc {
    pub fn build(&self) -> Result<ResubProblem, WindowIoError> {
        let mut network = Network::new();
        let mut ids: HashMap<&str, NodeId> = HashMap::new();
        for node in &self.nodes {
            if ids.contains_key(node.name.as_str()) {
                return Err(WindowIoError::DuplicateNode(node.name.clone()));
            }
            let id = match &node.truth {
                None => network.add_input(&node.name),
                Some(text) => {
                    let fanins = node
                        .fanins
                        .iter()
                        .map(|f| lookup(&ids, f))
                        .collect::<Result<Vec<NodeId>, _>>()?;
                    if fanins.len() > crate::truth::MAX_VARS {
                        return Err(WindowIoError::BadTruth {
                            node: node.name.clone(),
                            text: text.clone(),
                        });
                    }
                    let function = parse_truth(&node.name, text)?;
                    match &node.cnf {
                        None => network.add_logic(&node.name, &fanins, function),
                        Some(bytes) => {
                            let cnf = CnfTemplate::from_bytes(fanins.len(), bytes).map_err(
                                |error| WindowIoError::Template {
                                    node: node.name.clone(),
                                    error,
                                },
                            )?;
                            network.add_logic_with_cnf(&node.name, &fanins, function, cnf)
                        }
                    }
                }
            };
            ids.insert(node.name.as_str(), id);
        }

        let names = |list: &[String]| -> Result<Vec<NodeId>, WindowIoError> {
            list.iter().map(|n| lookup(&ids, n)).collect()
        };
        let window = Window {
            pivot: lookup(&ids, &self.window.pivot)?,
            order: names(&self.window.order)?,
            divs: names(&self.window.divs)?,
            tfo: names(&self.window.tfo)?,
            roots: names(&self.window.roots)?,
        };
        let divisors = match &self.divisors {
            Some(list) => names(list)?,
            None => window.divs.clone(),
        };
        Ok(ResubProblem {
            network,
            window,
            divisors,
            params: self.params,
        })
    }
}

fn lookup(ids: &HashMap<&str, NodeId>, name: &str) -> Result<NodeId, WindowIoError> {
    ids.get(name)
        .copied()
        .ok_or_else(|| WindowIoError::UnknownNode(name.to_string()))
}

pub fn parse_problem(text: &str) -> Result<ResubProblem, WindowIoError> {
    let desc: ProblemDesc = serde_json::from_str(text)?;
    desc.build()
}

pub fn load_problem(path: &Path) -> Result<ResubProblem, WindowIoError> {
    let text = std::fs::read_to_string(path)?;
    parse_problem(&text)
}
