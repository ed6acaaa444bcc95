pub mod config;
pub mod domain;
pub mod errors;
pub mod fiscal;
pub mod history;
pub mod names;
pub mod reports;
pub mod service;
pub mod settings;
pub mod stage;
pub mod store;

pub use domain::{Opportunity, OpportunityId, SnapshotRecord};
pub use errors::{ReportError, StoreError};
pub use history::{reconstruct, OpportunityHistory, StageWindow, TransitionEvent};
pub use reports::closing::{closing_probability_report, ClosingProbabilityRow};
pub use reports::duplicates::{duplicate_account_report, DuplicateAccountGroup, DuplicateMember};
pub use reports::dwell::{stage_dwell_report, StageDwellRow};
pub use reports::loss::{loss_reason_report, LossGrouping, LossReasonReport, LossReasonRow};
pub use reports::slippage::{date_slippage_report, SlippageWorstCase, StageSlippageRow};
pub use reports::validation::{
    validation_conversion_report, EntryStageRow, ValidationConversionReport, ValidationRosterRow,
};
pub use reports::value_change::{value_change_report, ValueChangeRow};
pub use reports::DealHistory;
pub use service::ReportService;
pub use settings::{ReportSettings, SettingsError};
pub use store::{DateRange, SnapshotStore};
