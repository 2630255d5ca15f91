//! Page/limit parsing and next/prev link computation.

use serde::Serialize;
use tracing::warn;

use crate::config::QueryConfig;
use crate::filter::QueryParameters;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaginationWindow {
    pub page: u64,
    pub limit: u64,
    pub skip: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRef {
    pub page: u64,
    pub limit: u64,
}

/// Serializes as `{}`, `{next}`, `{prev}` or `{next, prev}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PaginationLinks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageRef>,
}

/// Leading integer of `raw`, the way JavaScript's `parseInt` reads it:
/// whitespace and an optional sign, then digits up to the first non-digit.
/// `Some((negative, magnitude))`, or `None` when there are no digits.
fn parse_int_prefix(raw: &str) -> Option<(bool, u64)> {
    let s = raw.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits.bytes().take_while(u8::is_ascii_digit).count();
    if end == 0 {
        return None;
    }
    let magnitude = digits[..end]
        .bytes()
        .fold(0u64, |acc, d| acc.saturating_mul(10).saturating_add(u64::from(d - b'0')));
    Some((negative, magnitude))
}

/// `max(1, parseInt(raw) || default)`.
fn positive_or(raw: Option<&str>, default: u64) -> u64 {
    match raw.and_then(parse_int_prefix) {
        None | Some((_, 0)) => default,
        Some((true, _)) => 1,
        Some((false, n)) => n,
    }
}

/// Page and limit requested by the query, limit capped at `max_limit`.
pub fn requested_window(params: &QueryParameters, config: &QueryConfig) -> (u64, u64) {
    let page = positive_or(params.first("page"), 1);
    let mut limit = positive_or(params.first("limit"), config.default_limit.max(1));
    if limit > config.max_limit {
        warn!("Requested limit {} capped at {}", limit, config.max_limit);
        limit = config.max_limit.max(1);
    }
    (page, limit)
}

/// Window and links for a result set of `total` documents.
pub fn paginate(params: &QueryParameters, total: u64, config: &QueryConfig) -> (PaginationWindow, PaginationLinks) {
    let (page, limit) = requested_window(params, config);
    let skip = (page - 1).saturating_mul(limit);

    let next = (skip.saturating_add(limit) < total).then(|| PageRef { page: page.saturating_add(1), limit });
    let prev = (skip > 0).then(|| PageRef { page: page - 1, limit });

    (PaginationWindow { page, limit, skip, total }, PaginationLinks { next, prev })
}
