use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 100;

// Query params stay string-typed: serde(flatten) routes everything through
// serde's content buffer, which chokes on non-string primitives under
// serde_urlencoded. Accessors do the parsing.
#[derive(Deserialize, Debug, Default)]
pub struct PageParams {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PageParams {
    pub fn page(&self) -> i64 {
        self.page
            .as_ref()
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(1)
            .max(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit
            .as_ref()
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(DEFAULT_LIMIT)
            .clamp(1, MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }
}

/// Parses an optional string-typed query param, rejecting malformed values.
pub fn parse_param<T: FromStr>(raw: Option<&str>, name: &str) -> Result<Option<T>, AppError> {
    match raw {
        None => Ok(None),
        Some(s) => s
            .parse()
            .map(Some)
            .map_err(|_| AppError::validation(format!("Invalid {name} parameter"))),
    }
}

/// Pagination metadata returned alongside every post listing.
#[derive(Serialize, Debug, PartialEq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total_count: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total_count: i64) -> Self {
        Self {
            page,
            limit,
            total_count,
            total_pages: (total_count + limit - 1) / limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn params(page: Option<&str>, limit: Option<&str>) -> PageParams {
        PageParams {
            page: page.map(String::from),
            limit: limit.map(String::from),
        }
    }

    #[test]
    fn page_defaults_to_one() {
        let p = PageParams::default();
        assert_eq!(p.page(), 1);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn page_floor_is_one() {
        assert_eq!(params(Some("0"), None).page(), 1);
        assert_eq!(params(Some("-3"), None).page(), 1);
        assert_eq!(params(Some("junk"), None).page(), 1);
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(params(None, Some("500")).limit(), 100);
        assert_eq!(params(None, Some("0")).limit(), 1);
        assert_eq!(params(None, None).limit(), 50);
    }

    #[test]
    fn offset_follows_page_and_limit() {
        assert_eq!(params(Some("3"), Some("10")).offset(), 20);
    }

    #[test]
    fn parse_param_rejects_malformed_values() {
        assert_eq!(
            parse_param::<bool>(Some("true"), "published").unwrap(),
            Some(true)
        );
        assert_eq!(parse_param::<bool>(None, "published").unwrap(), None);
        assert!(parse_param::<bool>(Some("yes"), "published").is_err());
        assert!(parse_param::<Uuid>(Some("not-a-uuid"), "category_id").is_err());
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(Pagination::new(1, 10, 0).total_pages, 0);
        assert_eq!(Pagination::new(1, 10, 10).total_pages, 1);
        assert_eq!(Pagination::new(1, 10, 11).total_pages, 2);
    }
}
