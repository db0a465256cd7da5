// SPDX-License-Identifier: Apache-2.0

//! SAT-based resubstitution for windows of a logic network.
//!
//! A [`ResubSession`] lowers a [`Window`] into an incremental SAT engine and
//! then answers whether the window's pivot node can be re-expressed as a
//! function of a chosen set of divisor nodes, either by cube learning
//! ([`ResubSession::compute_interpolant`]) or by minterm enumeration
//! ([`ResubSession::compute_interpolant_isop`]).

pub mod cex;
pub mod cnf;
pub mod encode;
pub mod enumerate;
pub mod interpolate;
pub mod network;
pub mod sat;
pub mod session;
pub mod truth;
pub mod var_alloc;
pub mod window_io;

pub use crate::cex::CexMatrix;
pub use crate::cnf::{CnfTemplate, SatLit, SatVar};
pub use crate::encode::EncodeError;
pub use crate::enumerate::{IsopChoice, MintermOutcome};
pub use crate::interpolate::InterpolantOutcome;
pub use crate::network::{Network, NodeId, Window, WindowError};
pub use crate::sat::{ConflictBudget, SatEngine, SolveStatus, VarisatEngine};
pub use crate::session::{ResubParams, ResubSession, SolveStats};
pub use crate::truth::Truth6;
