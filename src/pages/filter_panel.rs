use std::collections::BTreeMap;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::time::Instant;

use crate::debounce::Debouncer;
use crate::error::{AppError, Result};
use crate::models::certificate::parse_date;
use crate::models::filter::{FilterParams, format_dmy};

/// What kind of input a filter field takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Text,
    /// A calendar day, sent as `DD-MM-YYYY`.
    Date,
    /// One of a fixed set of wire values.
    Choice(&'static [&'static str]),
}

/// A field the panel can filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterField {
    /// Query key, e.g. `commonName`.
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FilterKind,
}

impl FilterField {
    pub const fn text(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            kind: FilterKind::Text,
        }
    }

    pub const fn date(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            kind: FilterKind::Date,
        }
    }

    pub const fn choice(name: &'static str, label: &'static str, options: &'static [&'static str]) -> Self {
        Self {
            name,
            label,
            kind: FilterKind::Choice(options),
        }
    }
}

/// A value held in the panel before it is folded into the active filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Text(String),
    Date(NaiveDate),
}

impl FilterValue {
    /// The value as sent on the wire.
    pub fn to_param(&self) -> String {
        match self {
            FilterValue::Text(text) => text.clone(),
            FilterValue::Date(date) => format_dmy(*date),
        }
    }
}

/// Per-field filter inputs. Edits are coalesced and only folded into a
/// [`FilterParams`] once the panel has been quiet for its delay, or right
/// away on [`apply`](Self::apply).
#[derive(Debug)]
pub struct FilterPanel {
    fields: &'static [FilterField],
    draft: BTreeMap<&'static str, FilterValue>,
    debouncer: Debouncer<FilterParams>,
}

impl FilterPanel {
    pub fn new(fields: &'static [FilterField], delay: Duration) -> Self {
        Self {
            fields,
            draft: BTreeMap::new(),
            debouncer: Debouncer::new(delay),
        }
    }

    pub fn fields(&self) -> &'static [FilterField] {
        self.fields
    }

    pub fn value(&self, name: &str) -> Option<&FilterValue> {
        self.draft.get(name)
    }

    /// Records an edit and restarts the quiet period.
    ///
    /// # Arguments
    ///
    /// * `name` - Query key of the field.
    /// * `raw` - What the operator typed; blank clears the field.
    /// * `now` - Time of the edit.
    pub fn edit(&mut self, name: &str, raw: &str, now: Instant) -> Result<()> {
        let field = self
            .fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| AppError::invalid(name, format!("'{}' cannot be filtered on", name)))?;

        let raw = raw.trim();
        if raw.is_empty() {
            self.draft.remove(field.name);
        } else {
            let value = match field.kind {
                FilterKind::Text => FilterValue::Text(raw.to_string()),
                FilterKind::Date => FilterValue::Date(parse_date(raw).ok_or_else(|| {
                    AppError::invalid(field.name, format!("'{}' is not a date (DD-MM-YYYY)", raw))
                })?),
                FilterKind::Choice(options) => {
                    let wanted = raw.to_ascii_uppercase().replace(' ', "_");
                    let option = options.iter().find(|o| **o == wanted).ok_or_else(|| {
                        AppError::invalid(
                            field.name,
                            format!("{} must be one of {}", field.label, options.join(", ")),
                        )
                    })?;
                    FilterValue::Text(option.to_string())
                }
            };
            self.draft.insert(field.name, value);
        }

        self.debouncer.schedule(self.active_filters(), now);
        Ok(())
    }

    /// The non-empty draft values, dates formatted for the backend.
    pub fn active_filters(&self) -> FilterParams {
        self.draft
            .iter()
            .fold(FilterParams::new(), |params, (name, value)| {
                params.with_field(name, &value.to_param())
            })
    }

    /// Folds the draft in now, dropping any pending coalesced change.
    pub fn apply(&mut self) -> FilterParams {
        self.debouncer.cancel();
        self.active_filters()
    }

    /// The coalesced change, once the quiet period is over.
    pub fn poll(&mut self, now: Instant) -> Option<FilterParams> {
        self.debouncer.poll(now)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    /// Clears every field and drops any pending change.
    pub fn reset(&mut self) {
        self.draft.clear();
        self.debouncer.cancel();
    }
}
