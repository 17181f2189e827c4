use crate::view::SnapshotView;
use playcore_instrument::{InputSource, TfRole};
use serde::{Deserialize, Serialize};

/// An atom's operand (§4.5): resolved at Play-compile time to a concrete candle/indicator/
/// structure reference or a literal — never a string lookup at evaluation time (§9 design
/// note). `Literal` covers numeric constants such as an RSI threshold of `30`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum Operand {
    Candle {
        role: TfRole,
        source: InputSource,
    },
    Indicator {
        role: TfRole,
        spec_id: String,
    },
    Structure {
        role: TfRole,
        struct_id: String,
        field: String,
    },
    Literal(f64),
}

impl Operand {
    /// Resolve against `view` at `index`. Literals ignore `index`.
    pub fn resolve(&self, view: &dyn SnapshotView, index: i64) -> f64 {
        match self {
            Operand::Candle { role, source } => view.candle(*role, *source, index),
            Operand::Indicator { role, spec_id } => view.indicator(*role, spec_id, index),
            Operand::Structure { role, struct_id, field } => {
                view.structure(*role, struct_id, field, index)
            }
            Operand::Literal(value) => *value,
        }
    }
}
