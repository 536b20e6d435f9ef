//! Request and response bodies of the signing backend API.

use serde::{Deserialize, Serialize};

use crate::geometry::NormalizedRect;

/// Body of `POST /api/pdf/upload`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest<'a> {
    /// Base64 file contents, without a data-URL prefix
    pub pdf_data: &'a str,
    pub filename: &'a str,
}

/// Response of `POST /api/pdf/upload`
///
/// Only `pdfId` is required; whatever else the backend reports is kept as
/// document metadata.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    #[serde(default)]
    pub pdf_id: Option<serde_json::Value>,
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl UploadResponse {
    /// The document id as a string; backends may send it as a number
    pub fn document_id(&self) -> Option<String> {
        match self.pdf_id.as_ref()? {
            serde_json::Value::String(id) if !id.is_empty() => Some(id.clone()),
            serde_json::Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }
}

/// Body of `POST /api/pdf/sign`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignRequest {
    pub pdf_id: String,
    /// `data:image/png;base64,...`
    pub signature_image: String,
    pub coordinates: NormalizedRect,
    /// 1-based, ascending
    pub pages: Vec<u32>,
}

/// Response of `POST /api/pdf/sign`
#[derive(Debug, Clone, Deserialize)]
pub struct SignResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_request_uses_camel_case() {
        let body = UploadRequest {
            pdf_data: "JVBERi0=",
            filename: "doc.pdf",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["pdfData"], "JVBERi0=");
        assert_eq!(json["filename"], "doc.pdf");
    }

    #[test]
    fn test_upload_response_keeps_metadata() {
        let json = r#"{"pdfId":"a1b2","pageCount":3,"filename":"doc.pdf"}"#;
        let response: UploadResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.document_id().as_deref(), Some("a1b2"));
        assert_eq!(response.metadata["pageCount"], 3);
        assert!(!response.metadata.contains_key("pdfId"));

        let numeric: UploadResponse = serde_json::from_str(r#"{"pdfId":42}"#).unwrap();
        assert_eq!(numeric.document_id().as_deref(), Some("42"));

        let missing: UploadResponse = serde_json::from_str(r#"{"ok":true}"#).unwrap();
        assert!(missing.document_id().is_none());

        let empty: UploadResponse = serde_json::from_str(r#"{"pdfId":""}"#).unwrap();
        assert!(empty.document_id().is_none());
    }

    #[test]
    fn test_sign_request_shape() {
        let request = SignRequest {
            pdf_id: "a1b2".to_string(),
            signature_image: "data:image/png;base64,AAAA".to_string(),
            coordinates: NormalizedRect {
                x: 0.125,
                y: 0.5,
                width: 0.25,
                height: 0.1,
            },
            pages: vec![1, 2, 3],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["pdfId"], "a1b2");
        assert_eq!(json["signatureImage"], "data:image/png;base64,AAAA");
        assert_eq!(json["coordinates"]["width"], 0.25);
        assert_eq!(json["pages"], serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn test_sign_response_defaults_to_failure() {
        let response: SignResponse = serde_json::from_str("{}").unwrap();
        assert!(!response.success);

        let response: SignResponse =
            serde_json::from_str(r#"{"success":true,"signedAt":"now"}"#).unwrap();
        assert!(response.success);
        assert!(response.message.is_none());
    }
}
