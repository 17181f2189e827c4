#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! The rule evaluator (C5, §4.5): compiled boolean trees of atomic comparisons, cross
//! detections and window predicates, evaluated purely over a point-in-time
//! [`SnapshotView`](view::SnapshotView). A Play's loader (out of scope for this crate) resolves
//! feature references to concrete [`Operand`](operand::Operand)s at compile time, so evaluation
//! never does a string lookup on the hot path.

pub mod atom;
pub mod node;
pub mod operand;
pub mod rules;
pub mod view;

pub use atom::{AtomNode, CompareOp, CrossDirection, NearKind};
pub use node::RuleNode;
pub use operand::Operand;
pub use rules::PlayRules;
pub use view::SnapshotView;
