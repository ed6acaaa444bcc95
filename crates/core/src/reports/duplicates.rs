//! Duplicate account detection over the current view: opportunities from
//! the most recent upload batch grouped by normalized account name.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::names;
use crate::stage;

use super::DealHistory;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DuplicateMember {
    pub opportunity_name: String,
    pub external_id: String,
    pub stage: Option<String>,
    pub active: bool,
    pub value: Option<Decimal>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DuplicateAccountGroup {
    /// Display name as first observed; grouping uses the normalized form.
    pub account_name: String,
    pub normalized_name: String,
    pub opportunity_count: usize,
    pub active_count: usize,
    /// Sum of active members' values only.
    pub total_value: Decimal,
    pub members: Vec<DuplicateMember>,
}

/// Groups the opportunities present in the resolved batch by normalized
/// account name. Only groups with more than one member and at least one
/// active member are reported; a member is active when its batch-day stage
/// matches neither "closed" nor "validation". Garbage account names never
/// form a group.
pub fn duplicate_account_report(
    deals: &[DealHistory],
    batch_date: NaiveDate,
) -> Vec<DuplicateAccountGroup> {
    let mut groups: BTreeMap<String, (String, Vec<DuplicateMember>)> = BTreeMap::new();

    for deal in deals {
        let Some(account) = deal.opportunity.account_name.as_deref() else {
            continue;
        };
        if !names::is_valid_name(account) {
            continue;
        }

        // Last snapshot from the resolved batch is the member's current state.
        let Some(current) = deal
            .history
            .snapshots
            .iter()
            .filter(|snap| snap.snapshot_date == batch_date)
            .next_back()
        else {
            continue;
        };

        let active = current
            .stage
            .as_deref()
            .is_some_and(|label| !stage::is_closed(label) && !label.to_lowercase().contains("validation"));

        let member = DuplicateMember {
            opportunity_name: deal.opportunity.name.clone(),
            external_id: deal.opportunity.external_id.clone(),
            stage: current.stage.clone(),
            active,
            value: current.annualized_value,
        };

        groups
            .entry(names::normalize(account))
            .or_insert_with(|| (account.trim().to_string(), Vec::new()))
            .1
            .push(member);
    }

    let mut rows: Vec<DuplicateAccountGroup> = groups
        .into_iter()
        .filter(|(_, (_, members))| members.len() > 1 && members.iter().any(|m| m.active))
        .map(|(normalized_name, (account_name, members))| {
            let active_count = members.iter().filter(|m| m.active).count();
            let total_value = members
                .iter()
                .filter(|m| m.active)
                .filter_map(|m| m.value)
                .sum::<Decimal>();
            DuplicateAccountGroup {
                account_name,
                normalized_name,
                opportunity_count: members.len(),
                active_count,
                total_value,
                members,
            }
        })
        .collect();

    rows.sort_by(|a, b| b.total_value.cmp(&a.total_value));
    rows
}
