//! Fiscal calendar arithmetic for a year that begins February 1.
//!
//! January belongs to the fiscal year that started the previous calendar
//! February, so Q4 (Nov-Jan) spans a calendar-year boundary. Quarter-end
//! months are April, July, October, and January.

use chrono::{Datelike, NaiveDate};

/// Fiscal year label, numbered by the calendar year the fiscal year starts
/// in: Feb 2024 opens fiscal 2024, Jan 2024 still belongs to fiscal 2023.
pub fn fiscal_year(date: NaiveDate) -> i32 {
    if date.month() == 1 {
        date.year() - 1
    } else {
        date.year()
    }
}

/// Fiscal quarter number, 1 through 4.
/// Q1 = Feb-Apr, Q2 = May-Jul, Q3 = Aug-Oct, Q4 = Nov-Jan.
pub fn fiscal_quarter(date: NaiveDate) -> u8 {
    match date.month() {
        2..=4 => 1,
        5..=7 => 2,
        8..=10 => 3,
        _ => 4,
    }
}

/// `(fiscal year, fiscal quarter)` key, used to decide whether two dates
/// fall in the same fiscal period.
pub fn fiscal_period(date: NaiveDate) -> (i32, u8) {
    (fiscal_year(date), fiscal_quarter(date))
}

/// Human label such as `FY2024 Q3`.
pub fn quarter_label(date: NaiveDate) -> String {
    format!("FY{} Q{}", fiscal_year(date), fiscal_quarter(date))
}

/// Whether the date falls in the last month of a fiscal quarter.
pub fn is_quarter_end_month(date: NaiveDate) -> bool {
    matches!(date.month(), 4 | 7 | 10 | 1)
}
