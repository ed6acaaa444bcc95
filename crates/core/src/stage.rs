//! Free-text stage label matching.
//!
//! Stage names in upstream exports are not a closed enum; report semantics
//! hang off case-insensitive substring checks for a small set of keywords.
//! The keyword set is load-bearing for report correctness and must not be
//! extended casually.

fn contains_keyword(stage: &str, keyword: &str) -> bool {
    stage.to_lowercase().contains(keyword)
}

/// Terminal stage: the deal is closed, won or lost.
pub fn is_closed(stage: &str) -> bool {
    contains_keyword(stage, "closed")
}

pub fn is_closed_lost(stage: &str) -> bool {
    contains_keyword(stage, "closed") && contains_keyword(stage, "lost")
}

pub fn is_lost(stage: &str) -> bool {
    contains_keyword(stage, "lost")
}

pub fn is_won(stage: &str) -> bool {
    contains_keyword(stage, "won")
}

/// Early-funnel stage used by the conversion report: anything labelled as a
/// validation or introduction stage qualifies.
pub fn is_validation(stage: &str) -> bool {
    contains_keyword(stage, "validation") || contains_keyword(stage, "introduction")
}

/// Whether two free-text labels denote the same stage.
pub fn same_stage(left: &str, right: &str) -> bool {
    left.trim().eq_ignore_ascii_case(right.trim())
}

/// Grouping key under which two labels collide exactly when `same_stage`
/// holds. Aggregators key on this and keep the first-seen spelling for
/// display.
pub fn fold(label: &str) -> String {
    label.trim().to_ascii_lowercase()
}

/// Exact-label match used where a report keys on one specific stage.
pub fn is_exactly(stage: &str, label: &str) -> bool {
    same_stage(stage, label)
}

#[cfg(test)]
mod tests {
    use super::{fold, is_closed, is_closed_lost, is_exactly, is_validation, is_won, same_stage};

    #[test]
    fn closed_matching_is_case_insensitive_substring() {
        assert!(is_closed("Closed Won"));
        assert!(is_closed("closed lost"));
        assert!(is_closed("CLOSED - Duplicate"));
        assert!(!is_closed("Negotiation/Review"));
    }

    #[test]
    fn closed_lost_requires_both_keywords() {
        assert!(is_closed_lost("Closed Lost"));
        assert!(!is_closed_lost("Closed Won"));
        assert!(!is_closed_lost("Lost to competitor"));
    }

    #[test]
    fn validation_covers_introduction_labels() {
        assert!(is_validation("Validation"));
        assert!(is_validation("Technical Validation"));
        assert!(is_validation("Introduction Call"));
        assert!(!is_validation("Discover"));
    }

    #[test]
    fn won_is_a_substring_check() {
        assert!(is_won("Closed Won"));
        assert!(!is_won("Closed Lost"));
    }

    #[test]
    fn same_stage_ignores_case_and_padding() {
        assert!(same_stage(" Discover ", "discover"));
        assert!(!same_stage("Discover", "Discovery"));
        assert!(is_exactly("closed lost", "Closed Lost"));
    }

    #[test]
    fn fold_collides_exactly_where_same_stage_holds() {
        assert_eq!(fold(" Discover "), fold("DISCOVER"));
        assert_ne!(fold("Discover"), fold("Discovery"));
    }
}
