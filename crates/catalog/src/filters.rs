//! Query string parsing for the movie listing.

use std::collections::HashMap;

use serde::Serialize;

use crate::validator::Validator;

const SORT_SAFELIST: &[&str] = &["id", "title", "year", "runtime", "-id", "-title", "-year", "-runtime"];

/// Column a listing is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    /// Movie id.
    Id,
    /// Title, byte-wise.
    Title,
    /// Release year.
    Year,
    /// Runtime.
    Runtime,
}

/// Paging and ordering of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filters {
    /// 1-based page number.
    pub page: u64,
    /// Records per page.
    pub page_size: u64,
    /// One of the safelisted sort keys, `-` prefixed for descending order.
    pub sort: String,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
            sort: "id".to_string(),
        }
    }
}

impl Filters {
    /// The column to order by.
    pub fn sort_column(&self) -> SortColumn {
        match self.sort.trim_start_matches('-') {
            "title" => SortColumn::Title,
            "year" => SortColumn::Year,
            "runtime" => SortColumn::Runtime,
            _ => SortColumn::Id,
        }
    }

    /// Whether the order is descending.
    pub fn descending(&self) -> bool {
        self.sort.starts_with('-')
    }

    /// Records to skip before this page.
    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.page_size
    }

    fn validate(&self, v: &mut Validator) {
        v.check(self.page > 0, "page", "must be greater than zero");
        v.check(self.page <= 10_000_000, "page", "must be a maximum of 10 million");
        v.check(self.page_size > 0, "page_size", "must be greater than zero");
        v.check(self.page_size <= 100, "page_size", "must be a maximum of 100");
        v.check(SORT_SAFELIST.contains(&self.sort.as_str()), "sort", "invalid sort value");
    }
}

/// A movie listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovieQuery {
    /// Case-insensitive title substring; empty matches everything.
    pub title: String,
    /// Genres a movie must all have.
    pub genres: Vec<String>,
    /// Paging and ordering.
    pub filters: Filters,
}

impl MovieQuery {
    /// Reads the listing parameters from a query string map.
    pub fn from_params(params: &HashMap<String, String>, v: &mut Validator) -> Self {
        let defaults = Filters::default();

        let query = Self {
            title: read_string(params, "title", ""),
            genres: read_csv(params, "genres"),
            filters: Filters {
                page: read_int(params, "page", defaults.page, v),
                page_size: read_int(params, "page_size", defaults.page_size, v),
                sort: read_string(params, "sort", &defaults.sort),
            },
        };

        if v.is_valid() {
            query.filters.validate(v);
        }

        query
    }
}

fn read_string(params: &HashMap<String, String>, key: &str, default: &str) -> String {
    match params.get(key) {
        Some(value) if !value.is_empty() => value.clone(),
        _ => default.to_string(),
    }
}

fn read_csv(params: &HashMap<String, String>, key: &str) -> Vec<String> {
    match params.get(key) {
        Some(value) if !value.is_empty() => value.split(',').map(|genre| genre.trim().to_string()).collect(),
        _ => Vec::new(),
    }
}

fn read_int(params: &HashMap<String, String>, key: &str, default: u64, v: &mut Validator) -> u64 {
    let Some(value) = params.get(key).filter(|value| !value.is_empty()) else {
        return default;
    };

    match value.parse::<i64>() {
        Ok(number) => u64::try_from(number).unwrap_or(0),
        Err(_) => {
            v.check(false, key, "must be an integer value");
            default
        }
    }
}

/// Paging information returned alongside a listing. Serializes to `{}` when nothing matched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    #[serde(skip_serializing_if = "is_zero")]
    current_page: u64,
    #[serde(skip_serializing_if = "is_zero")]
    page_size: u64,
    #[serde(skip_serializing_if = "is_zero")]
    first_page: u64,
    #[serde(skip_serializing_if = "is_zero")]
    last_page: u64,
    #[serde(skip_serializing_if = "is_zero")]
    total_records: u64,
}

impl Metadata {
    /// Metadata for page `filters.page` of `total_records` matches.
    pub fn new(total_records: u64, filters: &Filters) -> Self {
        if total_records == 0 {
            return Self::default();
        }

        Self {
            current_page: filters.page,
            page_size: filters.page_size,
            first_page: 1,
            last_page: total_records.div_ceil(filters.page_size),
            total_records,
        }
    }

    /// Number of matching records across all pages.
    pub fn total_records(&self) -> u64 {
        self.total_records
    }
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}
