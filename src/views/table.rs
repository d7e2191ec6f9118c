use chrono::NaiveDate;

use crate::models::certificate::{Certificate, CertificateStatus, parse_date};
use crate::models::filter::{Sort, SortOrder, format_dmy};
use crate::models::user::User;

/// Placeholder for an empty cell.
pub const EMPTY_CELL: &str = "--";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// Field the column shows, also its sort key.
    pub field: &'static str,
    pub header: &'static str,
    pub sortable: bool,
}

impl Column {
    pub const fn sortable(field: &'static str, header: &'static str) -> Self {
        Self {
            field,
            header,
            sortable: true,
        }
    }
}

/// What can be done with a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    Edit,
    Delete,
    RevokeTokens,
}

impl RowAction {
    pub fn label(&self) -> &'static str {
        match self {
            RowAction::Edit => "Edit",
            RowAction::Delete => "Delete",
            RowAction::RevokeTokens => "Revoke tokens",
        }
    }
}

/// How a row is highlighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowTone {
    Normal,
    Warning,
    Danger,
    Muted,
}

/// A list item the table knows how to show.
pub trait Row {
    const COLUMNS: &'static [Column];

    /// Display text of `field`.
    fn cell(&self, field: &str) -> String;

    /// A key unique within one rendering, even when natural keys repeat.
    fn row_key(&self, index: usize) -> String;

    fn actions(&self) -> Vec<RowAction>;

    fn tone(&self, today: NaiveDate) -> RowTone;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRow {
    pub key: String,
    pub cells: Vec<String>,
    pub actions: Vec<RowAction>,
    pub tone: RowTone,
}

/// What goes under the last row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFooter {
    Loading,
    Empty,
    LoadMore,
    AllLoaded,
}

pub fn render<T: Row>(items: &[T], today: NaiveDate) -> Vec<RenderedRow> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| RenderedRow {
            key: item.row_key(index),
            cells: T::COLUMNS.iter().map(|c| item.cell(c.field)).collect(),
            actions: item.actions(),
            tone: item.tone(today),
        })
        .collect()
}

pub fn footer(rows: usize, is_loading: bool, has_more: bool) -> TableFooter {
    match (rows, is_loading, has_more) {
        (_, true, _) => TableFooter::Loading,
        (0, false, _) => TableFooter::Empty,
        (_, false, true) => TableFooter::LoadMore,
        (_, false, false) => TableFooter::AllLoaded,
    }
}

/// Arrow shown next to the header of the sorted column.
pub fn sort_indicator(column: &Column, sort: &Sort) -> Option<&'static str> {
    if !column.sortable || column.field != sort.field {
        return None;
    }
    Some(match sort.order {
        SortOrder::Asc => "▲",
        SortOrder::Desc => "▼",
    })
}

fn text(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => EMPTY_CELL.to_string(),
    }
}

fn date(value: Option<&str>) -> String {
    match value.and_then(parse_date) {
        Some(day) => format_dmy(day),
        None => EMPTY_CELL.to_string(),
    }
}

impl Row for Certificate {
    const COLUMNS: &'static [Column] = &[
        Column::sortable("idDemand", "ID Demand"),
        Column::sortable("demandeName", "Demande Name"),
        Column::sortable("model", "Model"),
        Column::sortable("type", "Type"),
        Column::sortable("organizationalUnit", "Org Unit"),
        Column::sortable("commonName", "Common Name"),
        Column::sortable("creationDate", "Created"),
        Column::sortable("expirationDate", "Expires"),
    ];

    fn cell(&self, field: &str) -> String {
        match field {
            "idDemand" => text(self.id_demand.as_deref()),
            "demandeName" => text(self.demande_name.as_deref()),
            "model" => text(self.model.as_deref()),
            "type" => text(self.cert_type.as_deref()),
            "organizationalUnit" => text(self.organizational_unit.as_deref()),
            "commonName" => text(self.common_name.as_deref()),
            "creationDate" => date(self.creation_date.as_deref()),
            "expirationDate" => date(self.expiration_date.as_deref()),
            _ => EMPTY_CELL.to_string(),
        }
    }

    fn row_key(&self, index: usize) -> String {
        match (self.id, self.id_demand.as_deref()) {
            (Some(id), Some(demand)) => format!("{}-{}-{}", id, demand, index),
            (Some(id), None) => format!("id-{}-{}", id, index),
            (None, Some(demand)) => format!("demand-{}-{}", demand, index),
            (None, None) => format!("cert-{}", index),
        }
    }

    fn actions(&self) -> Vec<RowAction> {
        vec![RowAction::Edit, RowAction::Delete]
    }

    fn tone(&self, today: NaiveDate) -> RowTone {
        match self.status(today) {
            CertificateStatus::Expired => RowTone::Danger,
            CertificateStatus::ExpiringSoon => RowTone::Warning,
            CertificateStatus::Normal => RowTone::Normal,
        }
    }
}

impl Row for User {
    const COLUMNS: &'static [Column] = &[
        Column::sortable("username", "Username"),
        Column::sortable("email", "Email"),
        Column::sortable("firstname", "First Name"),
        Column::sortable("lastname", "Last Name"),
        Column::sortable("idNumber", "ID Number"),
        Column::sortable("role", "Role"),
        Column::sortable("status", "Status"),
        Column::sortable("createdAt", "Created At"),
    ];

    fn cell(&self, field: &str) -> String {
        match field {
            "username" => text(Some(self.username.as_str())),
            "email" => text(Some(self.email.as_str())),
            "firstname" => text(Some(self.firstname.as_str())),
            "lastname" => text(Some(self.lastname.as_str())),
            "idNumber" => text(Some(self.id_number.as_str())),
            "role" => self.role.label(),
            "status" => self.status.to_string(),
            "createdAt" => date(self.created_at.as_deref()),
            _ => EMPTY_CELL.to_string(),
        }
    }

    fn row_key(&self, index: usize) -> String {
        match self.id {
            Some(id) => format!("{}-{}", id, index),
            None => format!("user-{}", index),
        }
    }

    /// Deleted accounts keep their row but lose the delete action.
    fn actions(&self) -> Vec<RowAction> {
        if self.is_deleted() {
            vec![RowAction::Edit, RowAction::RevokeTokens]
        } else {
            vec![RowAction::Edit, RowAction::Delete, RowAction::RevokeTokens]
        }
    }

    fn tone(&self, _today: NaiveDate) -> RowTone {
        if self.is_deleted() {
            RowTone::Muted
        } else {
            RowTone::Normal
        }
    }
}
