//! A common subexpression elimination pass for register-based, Dalvik-style
//! IR, designed to be embedded in an existing compiler code base.
//!
//! This crate is compatible with `#![no_std]` and only requires `alloc`.
//!
//! # Usage
//!
//! To run the pass on your IR, you will need a type which implements the
//! [`Method`] trait. It describes one method body: its control-flow graph,
//! its instructions, and the two escape hatches the pass needs into the rest
//! of your compiler, namely field resolution (with volatility) and type
//! inference.
//! See the [`method`] module documentation for more details.
//!
//! The pass is invoked by creating a [`CommonSubexprElimination`] for the
//! method, which runs the analysis, and then calling
//! [`CommonSubexprElimination::patch`] to apply the rewrite:
//!
//! ```
//! use dexcse::CommonSubexprElimination;
//! use dexcse::debug_utils::{inst, GenericMethod};
//! use dexcse::method::Reg;
//! use dexcse::opcode::Opcode;
//!
//! let mut method = GenericMethod::new();
//! let block = method.create_block();
//! let (v0, v1, v2, v3) = (Reg::new(0), Reg::new(1), Reg::new(2), Reg::new(3));
//! method.push_inst(block, inst(Opcode::AddInt).dest(v2).srcs([v0, v1]));
//! method.push_inst(block, inst(Opcode::AddInt).dest(v3).srcs([v0, v1]));
//! method.push_inst(block, inst(Opcode::ReturnVoid));
//!
//! let signature = method.signature();
//! let mut cse = CommonSubexprElimination::new(&method);
//! assert!(cse.patch(&mut method, &signature));
//! assert_eq!(cse.stats().instructions_eliminated, 1);
//! ```
//!
//! # How it works
//!
//! The pass is a global value numbering: an abstract interpretation over the
//! CFG assigns every register at every program point an abstract value id
//! such that two registers with equal ids must hold equal runtime values.
//! Heap reads are numbered too, so later redundant reads may be replaced by
//! the results of earlier ones; true memory barriers (invokes, monitor
//! instructions, volatile or unresolvable field accesses) and, conservatively,
//! all other heap writes invalidate them.
//!
//! When the result of an instruction is found to already be computed by an
//! earlier instruction, the patch captures the earlier result in a fresh
//! scratch register and overwrites the later destination from it. The later
//! instruction itself is left in place: the intended pipeline is to run
//! copy-propagation and local dead-code elimination on any method this pass
//! changed, which collapses the inserted moves and removes the now-dead
//! redundant instructions.

#![no_std]
#![warn(rust_2018_idioms, missing_docs)]
#![allow(
    clippy::collapsible_if,
    clippy::collapsible_else_if,
    clippy::cast_possible_truncation,
    clippy::module_name_repetitions,
    clippy::doc_markdown
)]
#![warn(
    clippy::explicit_iter_loop,
    clippy::range_plus_one,
    clippy::map_unwrap_or,
    clippy::cloned_instead_of_copied,
    clippy::semicolon_if_nothing_returned,
    clippy::must_use_candidate,
    clippy::uninlined_format_args,
    clippy::ignored_unit_patterns
)]

extern crate alloc;

use alloc::vec::Vec;
use core::fmt;

// Even when trace logging is disabled, the trace macro has a significant
// performance cost so we disable it in release builds.
macro_rules! trace {
    ($($tt:tt)*) => {
        if cfg!(feature = "trace-log") {
            ::log::trace!($($tt)*);
        }
    };
}

#[macro_use]
pub mod entity;

pub mod debug_utils;
pub mod method;
pub mod opcode;

mod internal;

#[cfg(test)]
mod tests;

use internal::analysis::{CseAnalyzer, Forward};
use internal::rewrite;
use method::{Method, MethodSignature};

/// The common subexpression elimination pass for one method.
///
/// Constructing the pass runs the analysis; [`patch`](Self::patch) applies
/// the rewrite. The two are split so that a driver can cheaply discover that
/// a method has nothing to forward without mutating it.
pub struct CommonSubexprElimination {
    forwards: Vec<Forward>,
    stats: Stats,
}

impl CommonSubexprElimination {
    /// Analyzes `func` and records every instruction pair where the result of
    /// the first can be forwarded to the second.
    #[must_use]
    pub fn new(func: &impl Method) -> Self {
        let mut analyzer = CseAnalyzer::new();
        let entry_states = analyzer.run(func);
        let forwards = analyzer.collect_forwards(func, &entry_states);
        Self {
            forwards,
            stats: Stats::default(),
        }
    }

    /// Applies the rewrite, returning whether any change was made.
    ///
    /// `signature` parameterizes the client's type inference, which is
    /// consulted to pick the width of the inserted copies. After a successful
    /// patch the redundant instructions are still present (now dead) and the
    /// method should be handed to copy-propagation and local DCE. Should be
    /// called at most once.
    pub fn patch(&mut self, func: &mut impl Method, signature: &MethodSignature) -> bool {
        rewrite::apply_patch(func, &self.forwards, signature, &mut self.stats)
    }

    /// Statistics accumulated by [`patch`](Self::patch).
    #[must_use]
    pub fn stats(&self) -> Stats {
        self.stats
    }
}

/// Statistics collected by the pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    /// Number of distinct defining instructions whose result was captured
    /// into a scratch register.
    pub results_captured: u64,

    /// Number of redundant instructions whose result was replaced by an
    /// earlier one.
    pub instructions_eliminated: u64,
}

impl Stats {
    /// Accumulates the statistics of another method into `self`.
    ///
    /// The combine is associative and commutative, so a driver processing
    /// methods on parallel threads may reduce the per-method results in any
    /// order.
    pub fn merge(&mut self, other: Stats) {
        self.results_captured += other.results_captured;
        self.instructions_eliminated += other.instructions_eliminated;
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "results_captured: {}, instructions_eliminated: {}",
            self.results_captured, self.instructions_eliminated
        )
    }
}
