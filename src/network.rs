// SPDX-License-Identifier: Apache-2.0

//! A small combinational logic network and the windows cut out of it.
//!
//! Nodes are created in topological order: a logic node may only use
//! previously created nodes as fanins. Each logic node carries its local
//! function as a `Truth6` over its fanins and the CNF template derived from
//! it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::cnf::CnfTemplate;
use crate::truth::{MAX_VARS, Truth6};

#[derive(
    Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Default, Serialize, Deserialize,
)]
pub struct NodeId(pub usize);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetNode {
    Input {
        name: String,
    },
    Logic {
        name: String,
        fanins: Vec<NodeId>,
        function: Truth6,
        cnf: CnfTemplate,
    },
}

impl NetNode {
    pub fn name(&self) -> &str {
        match self {
            NetNode::Input { name } | NetNode::Logic { name, .. } => name,
        }
    }

    pub fn fanins(&self) -> &[NodeId] {
        match self {
            NetNode::Input { .. } => &[],
            NetNode::Logic { fanins, .. } => fanins,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Network {
    nodes: Vec<NetNode>,
    inputs: Vec<NodeId>,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_input(&mut self, name: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NetNode::Input {
            name: name.to_string(),
        });
        self.inputs.push(id);
        id
    }

    /// Adds `name = function(fanins)`; the CNF template is derived from the
    /// function.
    pub fn add_logic(&mut self, name: &str, fanins: &[NodeId], function: Truth6) -> NodeId {
        let cnf = CnfTemplate::from_truth(function, fanins.len());
        self.add_logic_with_cnf(name, fanins, function, cnf)
    }

    pub fn add_logic_with_cnf(
        &mut self,
        name: &str,
        fanins: &[NodeId],
        function: Truth6,
        cnf: CnfTemplate,
    ) -> NodeId {
        assert!(fanins.len() <= MAX_VARS, "at most {} fanins per node", MAX_VARS);
        assert_eq!(cnf.fanin_count(), fanins.len());
        let id = NodeId(self.nodes.len());
        for fanin in fanins {
            assert!(fanin.0 < id.0, "fanin {} must precede {}", fanin, id);
        }
        self.nodes.push(NetNode::Logic {
            name: name.to_string(),
            fanins: fanins.to_vec(),
            function: function.stretch(fanins.len()),
            cnf,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &NetNode {
        &self.nodes[id.0]
    }

    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    pub fn is_input(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0], NetNode::Input { .. })
    }

    pub fn fanins(&self, id: NodeId) -> &[NodeId] {
        self.nodes[id.0].fanins()
    }

    pub fn cnf(&self, id: NodeId) -> Option<&CnfTemplate> {
        match &self.nodes[id.0] {
            NetNode::Input { .. } => None,
            NetNode::Logic { cnf, .. } => Some(cnf),
        }
    }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.name() == name).map(NodeId)
    }

    /// Evaluates every node given the primary input values (in `inputs()`
    /// order).
    pub fn simulate(&self, input_values: &[bool]) -> Vec<bool> {
        self.simulate_with_flip(input_values, None)
    }

    /// Like `simulate`, but the value of `flip` is complemented before its
    /// fanouts see it.
    pub fn simulate_with_flip(&self, input_values: &[bool], flip: Option<NodeId>) -> Vec<bool> {
        assert_eq!(input_values.len(), self.inputs.len());
        let mut values = vec![false; self.nodes.len()];
        let mut next_input = 0;
        for (i, node) in self.nodes.iter().enumerate() {
            let value = match node {
                NetNode::Input { .. } => {
                    let v = input_values[next_input];
                    next_input += 1;
                    v
                }
                NetNode::Logic {
                    fanins, function, ..
                } => {
                    let args: Vec<bool> = fanins.iter().map(|f| values[f.0]).collect();
                    function.eval(&args)
                }
            };
            values[i] = if flip == Some(NodeId(i)) { !value } else { value };
        }
        values
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    PivotNotInOrder(NodeId),
    DuplicateInOrder(NodeId),
    FaninNotBefore { node: NodeId, fanin: NodeId },
    NotInOrder { what: &'static str, node: NodeId },
    TfoWithoutRoots,
    TfoNotAfterPivot(NodeId),
    TfoOutOfOrder(NodeId),
    PivotInTfo,
}

impl std::fmt::Display for WindowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WindowError::PivotNotInOrder(n) => write!(f, "pivot {} is not in the window order", n),
            WindowError::DuplicateInOrder(n) => write!(f, "node {} appears twice in the order", n),
            WindowError::FaninNotBefore { node, fanin } => write!(
                f,
                "fanin {} of {} does not precede it in the window order",
                fanin, node
            ),
            WindowError::NotInOrder { what, node } => {
                write!(f, "{} node {} is not in the window order", what, node)
            }
            WindowError::TfoWithoutRoots => write!(f, "window has fanout nodes but no roots"),
            WindowError::TfoNotAfterPivot(n) => {
                write!(f, "fanout node {} does not follow the pivot", n)
            }
            WindowError::TfoOutOfOrder(n) => {
                write!(f, "fanout node {} is out of topological order", n)
            }
            WindowError::PivotInTfo => write!(f, "pivot must not be part of its own fanout"),
        }
    }
}

impl std::error::Error for WindowError {}

/// A window of a network centred on `pivot`.
///
/// - `order`: every window node in topological order; covers the pivot's
///   fanin cone and, when `tfo` is used, the fanout nodes and their side
///   inputs.
/// - `divs`: divisor candidates, a subset of `order`.
/// - `tfo`: fanout nodes of the pivot (not the pivot itself), in
///   topological order.
/// - `roots`: nodes whose function must be preserved; may include the pivot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Window {
    pub pivot: NodeId,
    pub order: Vec<NodeId>,
    pub divs: Vec<NodeId>,
    pub tfo: Vec<NodeId>,
    pub roots: Vec<NodeId>,
}

impl Window {
    pub fn validate(&self, network: &Network) -> Result<(), WindowError> {
        let mut position: HashMap<NodeId, usize> = HashMap::new();
        for (i, &node) in self.order.iter().enumerate() {
            if position.insert(node, i).is_some() {
                return Err(WindowError::DuplicateInOrder(node));
            }
            for &fanin in network.fanins(node) {
                if !position.contains_key(&fanin) {
                    return Err(WindowError::FaninNotBefore { node, fanin });
                }
            }
        }
        let Some(&pivot_pos) = position.get(&self.pivot) else {
            return Err(WindowError::PivotNotInOrder(self.pivot));
        };
        for &div in &self.divs {
            if !position.contains_key(&div) {
                return Err(WindowError::NotInOrder {
                    what: "divisor",
                    node: div,
                });
            }
        }
        for &root in &self.roots {
            if !position.contains_key(&root) {
                return Err(WindowError::NotInOrder {
                    what: "root",
                    node: root,
                });
            }
        }
        if self.tfo.is_empty() {
            return Ok(());
        }
        if self.roots.is_empty() {
            return Err(WindowError::TfoWithoutRoots);
        }
        let mut last_pos: Option<usize> = None;
        for &node in &self.tfo {
            if node == self.pivot {
                return Err(WindowError::PivotInTfo);
            }
            let Some(&pos) = position.get(&node) else {
                return Err(WindowError::NotInOrder {
                    what: "fanout",
                    node,
                });
            };
            if pos <= pivot_pos {
                return Err(WindowError::TfoNotAfterPivot(node));
            }
            if last_pos.is_some_and(|last| pos <= last) {
                return Err(WindowError::TfoOutOfOrder(node));
            }
            last_pos = Some(pos);
        }
        Ok(())
    }
}
