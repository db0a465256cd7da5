// SPDX-License-Identifier: Apache-2.0

//! Dense SAT-variable allocation for window nodes.
//!
//! Each node owns a versioned slot: every `bind` hands out a fresh variable
//! and bumps the node's generation, so the TFI binding of a fanout node
//! (generation 1) and its duplicated-cone binding (generation 2) are told
//! apart explicitly rather than by allocation order.

use std::collections::HashMap;

use crate::cnf::SatVar;
use crate::network::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnboundVariable(pub NodeId);

impl std::fmt::Display for UnboundVariable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node {} has no live SAT variable", self.0)
    }
}

impl std::error::Error for UnboundVariable {}

#[derive(Debug, Clone, Copy)]
struct Slot {
    var: Option<SatVar>,
    generation: u32,
}

#[derive(Debug)]
pub struct VarAllocator {
    slots: HashMap<NodeId, Slot>,
    next_var: u32,
}

impl Default for VarAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl VarAllocator {
    pub fn new() -> Self {
        VarAllocator {
            slots: HashMap::new(),
            next_var: 1,
        }
    }

    /// Drops every binding; numbering restarts at variable 1.
    pub fn reset(&mut self) {
        self.slots.clear();
        self.next_var = 1;
    }

    pub fn bind(&mut self, node: NodeId) -> SatVar {
        let var = self.fresh();
        let slot = self.slots.entry(node).or_insert(Slot {
            var: None,
            generation: 0,
        });
        slot.var = Some(var);
        slot.generation += 1;
        var
    }

    /// Invalidates `node`'s binding. The variable number is not reclaimed.
    pub fn unbind(&mut self, node: NodeId) {
        if let Some(slot) = self.slots.get_mut(&node) {
            slot.var = None;
        }
    }

    pub fn lookup(&self, node: NodeId) -> Result<SatVar, UnboundVariable> {
        self.slots
            .get(&node)
            .and_then(|slot| slot.var)
            .ok_or(UnboundVariable(node))
    }

    /// Number of times `node` has been bound since the last reset.
    pub fn generation(&self, node: NodeId) -> u32 {
        self.slots.get(&node).map_or(0, |slot| slot.generation)
    }

    /// Allocates a variable that belongs to no node.
    pub fn fresh(&mut self) -> SatVar {
        let var = SatVar(self.next_var);
        self.next_var += 1;
        var
    }

    /// The next variable `bind` or `fresh` would hand out.
    pub fn next_var(&self) -> SatVar {
        SatVar(self.next_var)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_starts_at_one() {
        let mut vars = VarAllocator::new();
        assert_eq!(vars.bind(NodeId(7)), SatVar(1));
        assert_eq!(vars.bind(NodeId(3)), SatVar(2));
        assert_eq!(vars.lookup(NodeId(7)), Ok(SatVar(1)));
        assert_eq!(vars.next_var(), SatVar(3));
    }

    #[test]
    fn test_rebind_bumps_generation_without_reuse() {
        let mut vars = VarAllocator::new();
        let first = vars.bind(NodeId(0));
        vars.fresh();
        vars.unbind(NodeId(0));
        assert_eq!(vars.lookup(NodeId(0)), Err(UnboundVariable(NodeId(0))));
        let second = vars.bind(NodeId(0));
        assert_ne!(first, second);
        assert_eq!(second, SatVar(3));
        assert_eq!(vars.generation(NodeId(0)), 2);
    }

    #[test]
    fn test_reset_invalidates_everything() {
        let mut vars = VarAllocator::new();
        vars.bind(NodeId(0));
        vars.bind(NodeId(1));
        vars.reset();
        assert!(vars.lookup(NodeId(0)).is_err());
        assert_eq!(vars.generation(NodeId(1)), 0);
        assert_eq!(vars.bind(NodeId(1)), SatVar(1));
    }
}
