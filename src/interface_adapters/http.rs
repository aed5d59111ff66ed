// Shared HTTP response types for consistent API error payloads.

#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
