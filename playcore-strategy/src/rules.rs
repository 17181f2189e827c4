use crate::node::RuleNode;
use serde::{Deserialize, Serialize};

/// The compiled entry/exit rule trees a Play declares for its execution timeframe (§2 C5, §4.8
/// step 5: "evaluate entry rules if flat, else exit rules if positioned"). `entry_long` and
/// `entry_short` are independent trees — a Play that only trades one direction simply omits
/// the other.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayRules {
    pub entry_long: Option<RuleNode>,
    pub entry_short: Option<RuleNode>,
    pub exit: Option<RuleNode>,
}

impl PlayRules {
    pub fn new(entry_long: Option<RuleNode>, entry_short: Option<RuleNode>, exit: Option<RuleNode>) -> Self {
        Self { entry_long, entry_short, exit }
    }
}
