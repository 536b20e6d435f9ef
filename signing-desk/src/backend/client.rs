//! Signing backend API client implementation.

use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::error::BackendError;
use super::wire::{SignRequest, SignResponse, UploadRequest, UploadResponse};

/// A document the backend accepted
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub pdf_id: String,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Signing backend API client
#[derive(Clone)]
pub struct SigningBackendClient {
    client: Client,
    base_url: String,
}

impl SigningBackendClient {
    /// Create a new signing backend client
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("signing-desk/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upload a PDF given as base64 and return the backend's document id
    pub async fn upload(
        &self,
        filename: &str,
        pdf_data: &str,
    ) -> Result<UploadedDocument, BackendError> {
        let url = format!("{}/api/pdf/upload", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&UploadRequest { pdf_data, filename })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(BackendError::ApiError {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body: UploadResponse = response.json().await?;
        let pdf_id = body.document_id().ok_or(BackendError::MissingDocumentId)?;
        debug!(pdf_id = %pdf_id, filename = %filename, "Backend accepted upload");

        Ok(UploadedDocument {
            pdf_id,
            metadata: body.metadata,
        })
    }

    /// Ask the backend to composite the signature onto the given pages
    pub async fn sign(&self, request: &SignRequest) -> Result<SignResponse, BackendError> {
        let url = format!("{}/api/pdf/sign", self.base_url);

        let response = self.client.post(&url).json(request).send().await?;
        if !response.status().is_success() {
            return Err(BackendError::ApiError {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let result: SignResponse = response.json().await?;
        Ok(result)
    }

    /// URL of the signed document; `token` busts any cached earlier version
    pub fn download_url(&self, pdf_id: &str, token: i64) -> String {
        format!(
            "{}/api/pdf/download/{}?t={}",
            self.base_url,
            urlencoding::encode(pdf_id),
            token
        )
    }

    /// Fetch the signed document
    pub async fn download(&self, pdf_id: &str) -> Result<Bytes, BackendError> {
        let url = self.download_url(pdf_id, chrono::Utc::now().timestamp_millis());

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(BackendError::ApiError {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        Ok(response.bytes().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::NormalizedRect;
    use crate::test_support::StubBackend;

    fn sign_request(pdf_id: &str) -> SignRequest {
        SignRequest {
            pdf_id: pdf_id.to_string(),
            signature_image: "data:image/png;base64,AAAA".to_string(),
            coordinates: NormalizedRect {
                x: 0.1,
                y: 0.2,
                width: 0.25,
                height: 0.1,
            },
            pages: vec![2],
        }
    }

    #[test]
    fn test_download_url_generation() {
        let client = SigningBackendClient::new("http://localhost:5000/", 5).unwrap();
        assert_eq!(client.base_url(), "http://localhost:5000");
        assert_eq!(
            client.download_url("abc 123", 1700000000000),
            "http://localhost:5000/api/pdf/download/abc%20123?t=1700000000000"
        );
    }

    #[tokio::test]
    async fn test_upload_sends_base64_and_filename() {
        let stub = StubBackend::start().await;
        let client = SigningBackendClient::new(&stub.base_url, 5).unwrap();

        let uploaded = client.upload("doc.pdf", "JVBERi0xLjQ=").await.unwrap();
        assert_eq!(uploaded.pdf_id, "pdf-1");
        assert_eq!(uploaded.metadata["pageCount"], 3);

        let uploads = stub.uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0]["pdfData"], "JVBERi0xLjQ=");
        assert_eq!(uploads[0]["filename"], "doc.pdf");
    }

    #[tokio::test]
    async fn test_upload_error_status() {
        let stub = StubBackend::start().await;
        stub.fail_uploads();
        let client = SigningBackendClient::new(&stub.base_url, 5).unwrap();

        let err = client.upload("doc.pdf", "JVBERi0=").await.unwrap_err();
        assert!(matches!(err, BackendError::ApiError { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_upload_without_id() {
        let stub = StubBackend::start().await;
        stub.omit_pdf_id();
        let client = SigningBackendClient::new(&stub.base_url, 5).unwrap();

        let err = client.upload("doc.pdf", "JVBERi0=").await.unwrap_err();
        assert!(matches!(err, BackendError::MissingDocumentId));
    }

    #[tokio::test]
    async fn test_sign_and_download() {
        let stub = StubBackend::start().await;
        let client = SigningBackendClient::new(&stub.base_url, 5).unwrap();

        let response = client.sign(&sign_request("pdf-1")).await.unwrap();
        assert!(response.success);

        let signs = stub.signs();
        assert_eq!(signs.len(), 1);
        assert_eq!(signs[0]["pages"], serde_json::json!([2]));
        assert_eq!(signs[0]["coordinates"]["width"], 0.25);

        let bytes = client.download("pdf-1").await.unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[tokio::test]
    async fn test_sign_reported_failure() {
        let stub = StubBackend::start().await;
        stub.reject_signing();
        let client = SigningBackendClient::new(&stub.base_url, 5).unwrap();

        let response = client.sign(&sign_request("pdf-1")).await.unwrap();
        assert!(!response.success);
        assert_eq!(response.message.as_deref(), Some("page out of range"));
    }

    #[tokio::test]
    async fn test_unreachable_backend() {
        // Nothing listens on port 9 (discard) on the loopback interface
        let client = SigningBackendClient::new("http://127.0.0.1:9", 2).unwrap();
        let err = client.upload("doc.pdf", "JVBERi0=").await.unwrap_err();
        assert!(matches!(err, BackendError::Request(_)));
    }
}
