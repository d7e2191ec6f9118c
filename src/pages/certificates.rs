use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::config::Config;
use crate::models::certificate::Certificate;
use crate::pages::filter_panel::FilterField;
use crate::pages::list_page::{ListPage, Notice};
use crate::services::certificates::CertificateService;

/// Fields of the certificate filter panel.
pub const CERTIFICATE_FILTERS: &[FilterField] = &[
    FilterField::text("idDemand", "ID Demand"),
    FilterField::text("demandeName", "Demande Name"),
    FilterField::text("model", "Model"),
    FilterField::text("type", "Type"),
    FilterField::text("organizationalUnit", "Organizational Unit"),
    FilterField::text("commonName", "Common Name"),
    FilterField::date("creationDate", "Creation Date"),
    FilterField::date("expirationDate", "Expiration Date"),
];

/// The `/certificates` screen. Deletion is immediate.
pub struct CertificatesPage {
    list: ListPage<CertificateService>,
}

impl CertificatesPage {
    pub fn new(service: CertificateService, config: &Config) -> Self {
        Self {
            list: ListPage::new(
                Arc::new(service),
                CERTIFICATE_FILTERS,
                config.search_debounce,
                config.filter_debounce,
            ),
        }
    }

    /// Deletes the certificate behind a row, without confirmation.
    pub async fn delete(&mut self, certificate: &Certificate) -> Notice {
        match certificate.id {
            Some(id) => self.list.remove(&id).await,
            None => Notice::error("Failed to delete certificate"),
        }
    }
}

impl Deref for CertificatesPage {
    type Target = ListPage<CertificateService>;

    fn deref(&self) -> &Self::Target {
        &self.list
    }
}

impl DerefMut for CertificatesPage {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.list
    }
}
