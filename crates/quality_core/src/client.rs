//! Blocking client for the quality-assessment service.

use crate::{QualityBand, ScanConfig};
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Shared connection to the assessment endpoint.
///
/// The inner client keeps connections alive across calls and is safe to share
/// by reference across worker threads. Drop it once the batch is done to
/// release the connections before charting starts.
pub struct QualityClient {
    http: Client,
    endpoint: String,
}

impl QualityClient {
    /// Builds the client with the configured request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying HTTP client cannot be constructed.
    pub fn new(config: &ScanConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
        })
    }

    /// Asks the service for the quality band of a single image.
    ///
    /// This never raises past the client boundary: transport errors, timeouts,
    /// non-success statuses, unreadable files, and malformed payloads all
    /// degrade to [`QualityBand::Unscored`].
    pub fn assess(&self, path: &Path) -> QualityBand {
        match self.try_assess(path) {
            Ok(band) => band,
            Err(err) => {
                tracing::debug!("assessment failed for {}: {err:#}", path.display());
                QualityBand::Unscored
            }
        }
    }

    fn try_assess(&self, path: &Path) -> Result<QualityBand> {
        let bytes =
            fs::read(path).with_context(|| format!("could not read {}", path.display()))?;
        let response = self
            .http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .context("assessment request failed")?;
        let status = response.status();
        if !status.is_success() {
            tracing::debug!("assessment of {} returned {status}", path.display());
            return Ok(QualityBand::Unscored);
        }
        let json: serde_json::Value = response
            .json()
            .context("assessment response was not valid JSON")?;
        let code = json
            .get("simple")
            .and_then(|value| value.as_i64())
            .unwrap_or_else(|| i64::from(QualityBand::Unscored.code()));
        Ok(QualityBand::from_code(code).unwrap_or(QualityBand::Unscored))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;
    use tempfile::tempdir;

    fn config_for(endpoint: String) -> ScanConfig {
        ScanConfig {
            endpoint,
            timeout_secs: 5,
            ..ScanConfig::default()
        }
    }

    fn request_complete(seen: &[u8]) -> bool {
        let Some(split) = seen.windows(4).position(|w| w == b"\r\n\r\n") else {
            return false;
        };
        let headers = String::from_utf8_lossy(&seen[..split]);
        let content_length = headers
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        seen.len() >= split + 4 + content_length
    }

    /// Answers exactly one request with a canned HTTP response.
    fn one_shot_server(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut seen = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = stream.read(&mut buf).unwrap_or(0);
                if n == 0 {
                    break;
                }
                seen.extend_from_slice(&buf[..n]);
                if request_complete(&seen) {
                    break;
                }
            }
            let response = format!(
                "{status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
        });
        format!("http://{addr}/assess")
    }

    fn temp_image() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sample.jpg");
        fs::write(&path, b"jpeg-ish payload").unwrap();
        (dir, path)
    }

    #[test]
    fn maps_simple_code_to_band() {
        let endpoint = one_shot_server("HTTP/1.1 200 OK", r#"{"simple": 1}"#);
        let client = QualityClient::new(&config_for(endpoint)).unwrap();
        let (_dir, image) = temp_image();
        assert_eq!(client.assess(&image), QualityBand::Authentication);
    }

    #[test]
    fn unknown_code_degrades_to_sentinel() {
        let endpoint = one_shot_server("HTTP/1.1 200 OK", r#"{"simple": 9}"#);
        let client = QualityClient::new(&config_for(endpoint)).unwrap();
        let (_dir, image) = temp_image();
        assert_eq!(client.assess(&image), QualityBand::Unscored);
    }

    #[test]
    fn missing_field_degrades_to_sentinel() {
        let endpoint = one_shot_server("HTTP/1.1 200 OK", r#"{"detailed": 2}"#);
        let client = QualityClient::new(&config_for(endpoint)).unwrap();
        let (_dir, image) = temp_image();
        assert_eq!(client.assess(&image), QualityBand::Unscored);
    }

    #[test]
    fn non_success_status_degrades_to_sentinel() {
        let endpoint = one_shot_server(
            "HTTP/1.1 422 Unprocessable Entity",
            r#"{"detail": "unassessable"}"#,
        );
        let client = QualityClient::new(&config_for(endpoint)).unwrap();
        let (_dir, image) = temp_image();
        assert_eq!(client.assess(&image), QualityBand::Unscored);
    }

    #[test]
    fn malformed_body_degrades_to_sentinel() {
        let endpoint = one_shot_server("HTTP/1.1 200 OK", "simple: 1");
        let client = QualityClient::new(&config_for(endpoint)).unwrap();
        let (_dir, image) = temp_image();
        assert_eq!(client.assess(&image), QualityBand::Unscored);
    }

    #[test]
    fn unreachable_endpoint_degrades_to_sentinel() {
        // Bind to learn a free port, then close it again.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = format!("http://{}/assess", listener.local_addr().unwrap());
        drop(listener);

        let client = QualityClient::new(&config_for(endpoint)).unwrap();
        let (_dir, image) = temp_image();
        assert_eq!(client.assess(&image), QualityBand::Unscored);
    }

    #[test]
    fn unreadable_file_degrades_to_sentinel() {
        let endpoint = one_shot_server("HTTP/1.1 200 OK", r#"{"simple": 0}"#);
        let client = QualityClient::new(&config_for(endpoint)).unwrap();
        let dir = tempdir().unwrap();
        assert_eq!(
            client.assess(&dir.path().join("missing.jpg")),
            QualityBand::Unscored
        );
    }
}
