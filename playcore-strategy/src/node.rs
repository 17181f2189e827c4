use crate::atom::{AtomNode, CompareOp};
use crate::view::SnapshotView;
use serde::{Deserialize, Serialize};

/// A compiled boolean rule tree (§4.5): `all`/`any`/`not` of atomic comparisons, plus the three
/// window predicates. Evaluation is pure over a [`SnapshotView`] — no side effects, no I/O —
/// and, for a fixed snapshot and a fixed `bar_count`, always returns the same verdict (§4.5
/// Determinism).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub enum RuleNode {
    Atom(AtomNode),
    All(Vec<RuleNode>),
    Any(Vec<RuleNode>),
    Not(Box<RuleNode>),
    /// True iff `predicate` held at every one of the last `n` bars (inclusive of the current
    /// one). Evaluates to `false` while fewer than `n` bars have been processed (§4.5).
    HoldsFor { n: usize, predicate: Box<RuleNode> },
    /// True iff `predicate` held at least once within the last `n` bars.
    OccurredWithin { n: usize, predicate: Box<RuleNode> },
    /// Counts how many of the last `n` bars `predicate` held on, then compares that count to
    /// `k` with the same comparator alphabet as [`AtomNode::Compare`] (§9 Open Question
    /// resolution).
    CountTrue {
        n: usize,
        predicate: Box<RuleNode>,
        op: CompareOp,
        k: usize,
    },
}

impl RuleNode {
    /// `index` addresses the current bar on the relevant TF role (negative-counts-from-the-end,
    /// same convention as [`SnapshotView`]); `bar_count` is the total number of bars processed
    /// so far on that TF, used only to decide whether a window node has enough history yet.
    pub fn eval(&self, view: &dyn SnapshotView, index: i64, bar_count: usize) -> bool {
        match self {
            RuleNode::Atom(atom) => atom.eval(view, index),
            RuleNode::All(children) => children.iter().all(|c| c.eval(view, index, bar_count)),
            RuleNode::Any(children) => children.iter().any(|c| c.eval(view, index, bar_count)),
            RuleNode::Not(child) => !child.eval(view, index, bar_count),
            RuleNode::HoldsFor { n, predicate } => {
                if *n == 0 {
                    return true;
                }
                if bar_count < *n {
                    return false;
                }
                (0..*n as i64).all(|offset| predicate.eval(view, index - offset, bar_count))
            }
            RuleNode::OccurredWithin { n, predicate } => {
                if *n == 0 || bar_count < *n {
                    return false;
                }
                (0..*n as i64).any(|offset| predicate.eval(view, index - offset, bar_count))
            }
            RuleNode::CountTrue { n, predicate, op, k } => {
                if *n == 0 || bar_count < *n {
                    return false;
                }
                let count = (0..*n as i64)
                    .filter(|&offset| predicate.eval(view, index - offset, bar_count))
                    .count();
                op.apply(count as f64, *k as f64)
            }
        }
    }
}
