use crate::operand::Operand;
use crate::view::SnapshotView;
use serde::{Deserialize, Serialize};

/// The six ordering/equality comparators shared between [`AtomNode::Compare`] and
/// `count_true`'s comparator alphabet (§4.5, §9 Open Question resolution).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum CompareOp {
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
}

impl CompareOp {
    pub fn apply(self, lhs: f64, rhs: f64) -> bool {
        match self {
            CompareOp::Gt => lhs > rhs,
            CompareOp::Lt => lhs < rhs,
            CompareOp::Ge => lhs >= rhs,
            CompareOp::Le => lhs <= rhs,
            CompareOp::Eq => lhs == rhs,
            CompareOp::Ne => lhs != rhs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum CrossDirection {
    Above,
    Below,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum NearKind {
    Abs,
    Pct,
}

/// A single atomic comparison (§4.5). Determinism requires that a `NaN` on either side of any
/// variant resolve to `false` rather than propagate or panic — every branch below checks for it
/// explicitly instead of relying on `PartialOrd`'s `NaN`-is-incomparable behaviour, so the
/// result is identical across platforms.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub enum AtomNode {
    Compare {
        lhs: Operand,
        op: CompareOp,
        rhs: Operand,
    },
    /// `cross_above(a, b)` iff `a[-1] > b[-1] and a[-2] <= b[-2]`(relative to `index`);
    /// `cross_below` is symmetric (§4.5).
    Cross {
        lhs: Operand,
        rhs: Operand,
        direction: CrossDirection,
    },
    Between {
        value: Operand,
        lower: Operand,
        upper: Operand,
    },
    /// `near_abs(a, b, tol)` iff `|a - b| <= tol`; `near_pct(a, b, tol)` iff
    /// `|a - b| / |b| <= tol`, and is `false` when `b == 0` rather than dividing by zero (§9
    /// Open Question resolution).
    Near {
        a: Operand,
        b: Operand,
        tolerance: Operand,
        kind: NearKind,
    },
}

impl AtomNode {
    pub fn eval(&self, view: &dyn SnapshotView, index: i64) -> bool {
        match self {
            AtomNode::Compare { lhs, op, rhs } => {
                let l = lhs.resolve(view, index);
                let r = rhs.resolve(view, index);
                if l.is_nan() || r.is_nan() {
                    return false;
                }
                op.apply(l, r)
            }
            AtomNode::Cross { lhs, rhs, direction } => {
                let a_now = lhs.resolve(view, index);
                let b_now = rhs.resolve(view, index);
                let a_prev = lhs.resolve(view, index - 1);
                let b_prev = rhs.resolve(view, index - 1);
                if [a_now, b_now, a_prev, b_prev].iter().any(|v| v.is_nan()) {
                    return false;
                }
                match direction {
                    CrossDirection::Above => a_now > b_now && a_prev <= b_prev,
                    CrossDirection::Below => a_now < b_now && a_prev >= b_prev,
                }
            }
            AtomNode::Between { value, lower, upper } => {
                let v = value.resolve(view, index);
                let lo = lower.resolve(view, index);
                let hi = upper.resolve(view, index);
                if v.is_nan() || lo.is_nan() || hi.is_nan() {
                    return false;
                }
                let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
                v >= lo && v <= hi
            }
            AtomNode::Near { a, b, tolerance, kind } => {
                let av = a.resolve(view, index);
                let bv = b.resolve(view, index);
                let tol = tolerance.resolve(view, index);
                if av.is_nan() || bv.is_nan() || tol.is_nan() {
                    return false;
                }
                match kind {
                    NearKind::Abs => (av - bv).abs() <= tol,
                    NearKind::Pct => {
                        if bv == 0.0 {
                            false
                        } else {
                            ((av - bv).abs() / bv.abs()) <= tol
                        }
                    }
                }
            }
        }
    }
}
