pub mod opportunity;
pub mod snapshot;

pub use opportunity::{external_ids_refer_to_same_deal, Opportunity, OpportunityId};
pub use snapshot::SnapshotRecord;
