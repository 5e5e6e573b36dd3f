//! Request parsing: prefix stripping, query integers, API route matching.

use crate::error::StudioError;
use regex::Regex;
use std::sync::OnceLock;

/// Strip `prefix` from `path` on a segment boundary. Returns the internal path
/// (always starting with `/`), or None when `path` is outside the prefix.
pub fn remove_prefix(path: &str, prefix: &str) -> Option<String> {
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() {
        return Some("/".into());
    }
    if rest.starts_with('/') {
        Some(rest.to_string())
    } else {
        None
    }
}

/// Parse an optional non-negative integer query value. Blank counts as absent;
/// values beyond `u32::MAX` saturate.
pub fn parse_non_negative_int(value: Option<&str>, field: &str) -> Result<Option<u32>, StudioError> {
    let Some(raw) = value.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let digits = raw.strip_prefix('+').unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(StudioError::InvalidArgument(format!(
            "Invalid {}. Expected a positive integer.",
            field
        )));
    }
    let n = digits.parse::<u64>().unwrap_or(u64::MAX);
    Ok(Some(u32::try_from(n).unwrap_or(u32::MAX)))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApiRoute {
    Index,
    Health,
    Schema,
    Shape(String),
    Rows(String),
}

fn table_route_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^/models/([^/]+)/(shape|rows)/?$").expect("static route pattern compiles")
    })
}

/// Match an internal (prefix-stripped) path to a route. Unknown or malformed paths are NotFound.
pub fn match_route(internal_path: &str) -> Result<ApiRoute, StudioError> {
    match internal_path {
        "" | "/" => return Ok(ApiRoute::Index),
        "/health" => return Ok(ApiRoute::Health),
        "/schema" | "/models" => return Ok(ApiRoute::Schema),
        _ => {}
    }
    let caps = table_route_pattern()
        .captures(internal_path)
        .ok_or_else(StudioError::route_not_found)?;
    let table = urlencoding::decode(&caps[1])
        .map_err(|_| StudioError::route_not_found())?
        .into_owned();
    if table.is_empty() {
        return Err(StudioError::route_not_found());
    }
    Ok(match &caps[2] {
        "shape" => ApiRoute::Shape(table),
        _ => ApiRoute::Rows(table),
    })
}
