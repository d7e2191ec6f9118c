use async_trait::async_trait;

use crate::api::client::{Ack, ApiClient};
use crate::controllers::list::{Resource, ResourceMessages};
use crate::error::{AppError, Result};
use crate::models::certificate::{Certificate, CertificateUpdate, NewCertificate};
use crate::models::filter::{ListQuery, Sort};
use crate::models::page::PagePayload;

const CERTIFICATES_PATH: &str = "/api/certificats";

/// The `/api/certificats` endpoints.
#[derive(Clone)]
pub struct CertificateService {
    api: ApiClient,
}

impl CertificateService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Fetches a single certificate.
    pub async fn get_by_id(&self, id: i64) -> Result<Certificate> {
        let certificate: Option<Certificate> =
            self.api.get(&format!("{}/{}", CERTIFICATES_PATH, id), &[]).await?;
        certificate.ok_or_else(|| AppError::UnexpectedResponse(format!("Certificate {} not found", id)))
    }
}

#[async_trait]
impl Resource for CertificateService {
    type Item = Certificate;
    type Draft = NewCertificate;
    type Patch = CertificateUpdate;
    type Target = i64;

    const MESSAGES: ResourceMessages = ResourceMessages {
        fetch_failed: "Failed to fetch certificates",
        created: "Certificate created successfully!",
        create_failed: "Failed to create certificate",
        updated: "Certificate updated successfully!",
        update_failed: "Failed to update certificate",
        deleted: "Certificate deleted successfully!",
        delete_failed: "Failed to delete certificate",
    };

    fn default_sort() -> Sort {
        Sort::asc("expirationDate")
    }

    async fn fetch_page(&self, query: &ListQuery) -> Result<PagePayload<Certificate>> {
        let page: Option<PagePayload<Certificate>> =
            self.api.get(CERTIFICATES_PATH, &query.to_pairs()).await?;
        Ok(page.unwrap_or(PagePayload::Items(Vec::new())))
    }

    async fn create(&self, draft: &NewCertificate) -> Result<Ack> {
        tracing::debug!("Creating certificate for demand {}", draft.id_demand);
        self.api.post(CERTIFICATES_PATH, draft).await
    }

    async fn update(&self, id: i64, patch: &CertificateUpdate) -> Result<Ack> {
        tracing::debug!("Updating certificate {}", id);
        self.api
            .put(&format!("{}/{}", CERTIFICATES_PATH, id), patch)
            .await
    }

    async fn remove(&self, id: &i64) -> Result<Ack> {
        tracing::debug!("Deleting certificate {}", id);
        self.api
            .delete(&format!("{}/{}", CERTIFICATES_PATH, id))
            .await
    }
}
