//! Record ordering for the chart page.
//!
//! All records of a set share one sort field. Integer and decimal sort fields
//! compare numerically, as does a datatype with no sort field at all (the
//! record id is then the sort value). Every other type-class compares with a
//! natural string order, so `run 2` sorts before `run 10`.

use regex::Regex;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::models::{Record, RecordId, TypeClass};

static NATURAL_CHUNK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+|\D+").expect("natural sort pattern is valid")
});

/// Whether records of a set sorted by `sort_type` compare as numbers.
pub fn uses_numeric_order(sort_type: Option<TypeClass>) -> bool {
    sort_type.is_none_or(TypeClass::is_numeric)
}

/// Rank every record: record id → 0-based position after sorting.
///
/// Ties (and values that do not parse as numbers under numeric ordering,
/// which sort last) are broken by the natural order of the record ids, so the
/// result is a total order.
pub fn rank_records(records: &[Record], sort_type: Option<TypeClass>) -> BTreeMap<RecordId, usize> {
    let numeric = uses_numeric_order(sort_type);

    let mut order: Vec<&Record> = records.iter().collect();
    order.sort_by(|a, b| {
        let (va, vb) = (sort_value(a, sort_type), sort_value(b, sort_type));
        let primary = if numeric {
            compare_numeric(va, vb)
        } else {
            natural_cmp(va.unwrap_or(""), vb.unwrap_or(""))
        };
        primary.then_with(|| natural_cmp(&a.id, &b.id))
    });

    order.into_iter().enumerate().map(|(rank, record)| (record.id.clone(), rank)).collect()
}

fn sort_value(record: &Record, sort_type: Option<TypeClass>) -> Option<&str> {
    match sort_type {
        None => Some(record.id.as_str()),
        Some(_) => record.sort_value.as_deref(),
    }
}

fn compare_numeric(a: Option<&str>, b: Option<&str>) -> Ordering {
    let parse = |v: Option<&str>| v.and_then(|s| s.trim().parse::<f64>().ok()).filter(|n| !n.is_nan());
    match (parse(a), parse(b)) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Natural string comparison: digit runs compare by value, everything else
/// case-insensitively, with a case-sensitive comparison as the last resort.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = NATURAL_CHUNK.find_iter(a).map(|m| m.as_str());
    let mut right = NATURAL_CHUNK.find_iter(b).map(|m| m.as_str());

    loop {
        match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ordering = if is_digits(x) && is_digits(y) {
                    compare_digit_runs(x, y)
                } else {
                    x.to_lowercase().cmp(&y.to_lowercase())
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

fn is_digits(chunk: &str) -> bool {
    chunk.bytes().all(|b| b.is_ascii_digit())
}

// Compares arbitrarily long digit runs without overflowing.
fn compare_digit_runs(x: &str, y: &str) -> Ordering {
    let x = x.trim_start_matches('0');
    let y = y.trim_start_matches('0');
    x.len().cmp(&y.len()).then_with(|| x.cmp(y))
}
