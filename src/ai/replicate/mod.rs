pub mod client;
pub mod describe;
pub mod expand;
pub mod image;
pub mod types;

pub use client::ReplicateHttpClient;
pub use describe::ReplicateDescribeClient;
pub use expand::ReplicateExpandClient;
pub use image::ReplicateImageClient;

#[cfg(test)]
pub(crate) mod test_support {
    use super::ReplicateHttpClient;
    use std::time::Duration;
    use wiremock::MockServer;

    pub fn http_client(server: &MockServer, token: Option<&str>) -> ReplicateHttpClient {
        ReplicateHttpClient::new_with_client(
            token.map(str::to_string),
            Duration::from_secs(5),
            reqwest::Client::new(),
        )
        .with_base_url(server.uri())
        .with_polling(Duration::from_millis(5), Duration::from_secs(2))
    }

    /// A terminal prediction body carrying `output`.
    pub fn prediction(status: &str, output: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "id": "test-prediction",
            "status": status,
            "output": output,
            "error": null,
            "urls": { "get": null }
        })
    }
}
