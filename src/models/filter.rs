use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::error::AppError;

/// Query key carrying the free-text search.
pub const GLOBAL_SEARCH_KEY: &str = "globalSearch";

/// Formats a filter date the way the backend expects it: `DD-MM-YYYY`.
pub fn format_dmy(date: NaiveDate) -> String {
    date.format("%d-%m-%Y").to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

impl FromStr for SortOrder {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "1" => Ok(SortOrder::Asc),
            "desc" | "-1" => Ok(SortOrder::Desc),
            other => Err(AppError::invalid("sort", format!("Unknown sort order '{}'", other))),
        }
    }
}

/// A sort column and direction, sent as `field,asc|desc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub order: SortOrder,
}

impl Sort {
    pub fn new(field: &str, order: SortOrder) -> Self {
        Self {
            field: field.to_string(),
            order,
        }
    }

    pub fn asc(field: &str) -> Self {
        Self::new(field, SortOrder::Asc)
    }

    pub fn desc(field: &str) -> Self {
        Self::new(field, SortOrder::Desc)
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.field, self.order.as_str())
    }
}

impl FromStr for Sort {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, order) = match s.split_once(',') {
            Some((field, order)) => (field.trim(), order.parse()?),
            None => (s.trim(), SortOrder::Asc),
        };
        if field.is_empty() {
            return Err(AppError::invalid("sort", "Sort field cannot be empty"));
        }
        Ok(Sort::new(field, order))
    }
}

/// Per-field filter criteria plus the separately managed global search.
/// Blank values are never stored, so they are never sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterParams {
    fields: BTreeMap<String, String>,
    global_search: Option<String>,
}

impl FilterParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: &str, value: &str) -> Self {
        self.set_field(name, value);
        self
    }

    /// Sets a field criterion; a blank value removes it.
    pub fn set_field(&mut self, name: &str, value: &str) {
        if value.trim().is_empty() {
            self.fields.remove(name);
        } else {
            self.fields.insert(name.to_string(), value.to_string());
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// Replaces every field criterion, keeping the global search.
    pub fn replace_fields(&mut self, criteria: &FilterParams) {
        self.fields = criteria.fields.clone();
    }

    pub fn global_search(&self) -> Option<&str> {
        self.global_search.as_deref()
    }

    pub fn set_global_search(&mut self, text: &str) {
        self.global_search = if text.trim().is_empty() {
            None
        } else {
            Some(text.to_string())
        };
    }

    pub fn clear(&mut self) {
        self.fields.clear();
        self.global_search = None;
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.global_search.is_none()
    }
}

/// Everything a list request carries: filters, page and sort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub filters: FilterParams,
    pub page: u32,
    pub sort: Sort,
}

impl ListQuery {
    pub fn new(filters: FilterParams, page: u32, sort: Sort) -> Self {
        Self { filters, page, sort }
    }

    pub fn first_page(&self) -> Self {
        self.with_page(0)
    }

    pub fn with_page(&self, page: u32) -> Self {
        Self {
            filters: self.filters.clone(),
            page,
            sort: self.sort.clone(),
        }
    }

    /// Query-string pairs, in a stable order.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .filters
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if let Some(search) = self.filters.global_search() {
            pairs.push((GLOBAL_SEARCH_KEY.to_string(), search.to_string()));
        }
        pairs.push(("page".to_string(), self.page.to_string()));
        pairs.push(("sort".to_string(), self.sort.to_string()));
        pairs
    }
}
