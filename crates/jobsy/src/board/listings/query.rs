use serde::{Deserialize, Serialize};

use super::domain::JobListing;

/// Public search over live listings. Empty fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ListingQuery {
    pub search: Option<String>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub experience: Option<String>,
    /// Matches listings whose minimum salary is at least this value. Zero is ignored.
    pub salary_min: Option<u32>,
    /// Comma-separated preference tags; any one of them matches.
    pub job_preferences: Option<String>,
    pub page: Option<usize>,
    pub show_all: bool,
}

impl ListingQuery {
    pub fn matches(&self, listing: &JobListing) -> bool {
        if let Some(needle) = filled(&self.search) {
            let needle = needle.to_lowercase();
            let hit = [&listing.title, &listing.company, &listing.description]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        if let Some(location) = filled(&self.location) {
            if !listing.location.trim().eq_ignore_ascii_case(location) {
                return false;
            }
        }
        if let Some(category) = filled(&self.category) {
            if !listing.category.eq_ignore_ascii_case(category) {
                return false;
            }
        }
        if let Some(experience) = filled(&self.experience) {
            if !listing.experience.eq_ignore_ascii_case(experience) {
                return false;
            }
        }
        if let Some(minimum) = self.salary_min.filter(|value| *value > 0) {
            if !listing.salary_min.is_some_and(|salary| salary >= minimum) {
                return false;
            }
        }
        if let Some(wanted) = filled(&self.job_preferences) {
            let mut wanted = wanted
                .split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .peekable();
            if wanted.peek().is_some() {
                let hit = wanted.any(|tag| {
                    listing
                        .preference_tags()
                        .any(|own| own.eq_ignore_ascii_case(tag))
                });
                if !hit {
                    return false;
                }
            }
        }
        true
    }
}

fn filled(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub pages: usize,
    pub total: usize,
}

impl<T> Page<T> {
    /// Cuts `rows` into pages of `size`. Pages outside `1..=pages` fall back
    /// to the first page; `size == 0` returns everything on one page.
    pub fn paginate(rows: Vec<T>, requested: Option<usize>, size: usize) -> Self {
        let total = rows.len();
        if size == 0 {
            return Self {
                items: rows,
                page: 1,
                pages: 1,
                total,
            };
        }
        let pages = total.div_ceil(size).max(1);
        let page = requested.filter(|page| (1..=pages).contains(page)).unwrap_or(1);
        let items = rows
            .into_iter()
            .skip((page - 1) * size)
            .take(size)
            .collect();
        Self {
            items,
            page,
            pages,
            total,
        }
    }
}

/// Distinct values offered as search filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListingFacets {
    pub categories: Vec<String>,
    pub locations: Vec<String>,
}
