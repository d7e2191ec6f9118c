use chrono::{DateTime, Days, NaiveDate, NaiveDateTime};
use garde::Validate;
use serde::{Deserialize, Deserializer, Serialize};

/// Number of days ahead of today during which a certificate counts as
/// expiring soon (inclusive on both ends).
pub const EXPIRING_SOON_DAYS: u64 = 30;

/// Represents a certificate as returned by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    /// The backend identifier.
    #[serde(default)]
    pub id: Option<i64>,
    /// The originating demand. Fixed once the certificate exists.
    #[serde(default, deserialize_with = "string_or_number")]
    pub id_demand: Option<String>,
    #[serde(default)]
    pub demande_name: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default, rename = "type")]
    pub cert_type: Option<String>,
    #[serde(default)]
    pub organizational_unit: Option<String>,
    #[serde(default)]
    pub common_name: Option<String>,
    #[serde(default)]
    pub creation_date: Option<String>,
    #[serde(default)]
    pub expiration_date: Option<String>,
}

/// Where a certificate stands relative to its expiration date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateStatus {
    Normal,
    ExpiringSoon,
    Expired,
}

impl CertificateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CertificateStatus::Normal => "normal",
            CertificateStatus::ExpiringSoon => "expiring_soon",
            CertificateStatus::Expired => "expired",
        }
    }
}

impl Certificate {
    /// Computes the status against `today`. Missing or unreadable expiration
    /// dates count as normal.
    pub fn status(&self, today: NaiveDate) -> CertificateStatus {
        match self.expiration_date.as_deref().and_then(parse_date) {
            Some(expires) => status_for(expires, today),
            None => {
                if let Some(raw) = self.expiration_date.as_deref() {
                    tracing::warn!("Invalid expiration date received: {}", raw);
                }
                CertificateStatus::Normal
            }
        }
    }
}

/// Status of a certificate expiring on `expires`, seen from `today`.
pub fn status_for(expires: NaiveDate, today: NaiveDate) -> CertificateStatus {
    if expires < today {
        return CertificateStatus::Expired;
    }
    let horizon = today
        .checked_add_days(Days::new(EXPIRING_SOON_DAYS))
        .unwrap_or(NaiveDate::MAX);
    if expires <= horizon {
        CertificateStatus::ExpiringSoon
    } else {
        CertificateStatus::Normal
    }
}

/// Reads the date part of the formats the backend and operators use:
/// RFC 3339 timestamps, ISO dates and datetimes, and `DD-MM-YYYY`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "--" {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.date_naive());
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(ts.date());
    }
    ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Integer(i64),
        Float(f64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(text) => text,
        Raw::Integer(n) => n.to_string(),
        Raw::Float(n) => n.to_string(),
    }))
}

/// Payload for `POST /api/certificats`.
#[derive(Debug, Clone, Default, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewCertificate {
    #[garde(length(min = 1))]
    pub id_demand: String,
    #[garde(length(min = 1))]
    pub demande_name: String,
    #[garde(length(min = 1))]
    pub model: String,
    #[garde(length(min = 1))]
    #[serde(rename = "type")]
    pub cert_type: String,
    #[garde(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organizational_unit: Option<String>,
    #[garde(length(min = 1))]
    pub common_name: String,
    #[garde(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<NaiveDate>,
    #[garde(required)]
    pub expiration_date: Option<NaiveDate>,
}

/// Payload for `PUT /api/certificats/{id}`. `idDemand` is never sent.
#[derive(Debug, Clone, Default, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CertificateUpdate {
    #[garde(length(min = 1))]
    pub demande_name: String,
    #[garde(length(min = 1))]
    pub model: String,
    #[garde(length(min = 1))]
    #[serde(rename = "type")]
    pub cert_type: String,
    #[garde(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organizational_unit: Option<String>,
    #[garde(length(min = 1))]
    pub common_name: String,
    #[garde(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<NaiveDate>,
    #[garde(required)]
    pub expiration_date: Option<NaiveDate>,
}

impl CertificateUpdate {
    /// Pre-fills an update form from an existing certificate.
    pub fn from_certificate(cert: &Certificate) -> Self {
        Self {
            demande_name: cert.demande_name.clone().unwrap_or_default(),
            model: cert.model.clone().unwrap_or_default(),
            cert_type: cert.cert_type.clone().unwrap_or_default(),
            organizational_unit: cert.organizational_unit.clone().filter(|ou| !ou.is_empty()),
            common_name: cert.common_name.clone().unwrap_or_default(),
            creation_date: cert.creation_date.as_deref().and_then(parse_date),
            expiration_date: cert.expiration_date.as_deref().and_then(parse_date),
        }
    }
}
