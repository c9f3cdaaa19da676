//! Operational completeness of a permit application
//!
//! An application is complete when it has a title, both event timestamps and
//! an attached document. The flag is derived on every read and never stored.

use chrono::NaiveDateTime;

pub fn is_complete(
    event_title: &str,
    start_date_time: Option<NaiveDateTime>,
    end_date_time: Option<NaiveDateTime>,
    document_file_name: Option<&str>,
) -> bool {
    is_non_blank(Some(event_title))
        && start_date_time.is_some()
        && end_date_time.is_some()
        && is_non_blank(document_file_name)
}

fn is_non_blank(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}
