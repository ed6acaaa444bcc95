use std::fmt;

use serde::{Deserialize, Serialize};

/// Upstream exports carry the external deal identifier in a short form.
pub const EXTERNAL_ID_BASE_LEN: usize = 15;
/// Later exports widen the same identifier to its extended form.
pub const EXTERNAL_ID_EXTENDED_LEN: usize = 18;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OpportunityId(pub i64);

impl fmt::Display for OpportunityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A sales deal as first observed in an upload. Immutable afterwards except
/// for the external-id upgrade from base to extended form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: OpportunityId,
    pub external_id: String,
    pub name: String,
    pub account_name: Option<String>,
    pub owner: Option<String>,
}

/// Whether two external identifiers refer to the same deal, accounting for
/// the 15-char base form being a prefix of the 18-char extended form.
pub fn external_ids_refer_to_same_deal(left: &str, right: &str) -> bool {
    let left = left.trim();
    let right = right.trim();
    if left == right {
        return true;
    }
    match (left.len(), right.len()) {
        (EXTERNAL_ID_BASE_LEN, EXTERNAL_ID_EXTENDED_LEN) => right.starts_with(left),
        (EXTERNAL_ID_EXTENDED_LEN, EXTERNAL_ID_BASE_LEN) => left.starts_with(right),
        _ => false,
    }
}
