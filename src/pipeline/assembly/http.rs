//! HTTP clients for the boundary server and the case server.

use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use reqwest::{StatusCode, Url};
use serde::Deserialize;

use super::error::AssemblyError;
use super::traits::{AuthorizationSource, BoundaryService, CaseImportService};
use super::types::BoundaryArtifact;
use crate::config::{BOUNDARY_LOOKUP_TIMEOUT_SECS, CASE_IMPORT_TIMEOUT_SECS};

const API_VERSION: &str = "v1";
const BOUNDARY_SERVICE: &str = "cgmes-boundary-server";
const CASE_SERVICE: &str = "case-server";

fn build_client(service: &'static str, timeout_secs: u64) -> Result<reqwest::blocking::Client, AssemblyError> {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AssemblyError::Http {
            service,
            reason: e.to_string(),
        })
}

/// Parse a configured server URL. It must be usable as a base for API paths.
fn parse_base_url(service: &'static str, raw: &str) -> Result<Url, AssemblyError> {
    let url = Url::parse(raw)
        .map_err(|e| AssemblyError::Config(format!("invalid {service} url '{raw}': {e}")))?;
    if url.cannot_be_a_base() {
        return Err(AssemblyError::Config(format!("{service} url '{raw}' cannot be a base")));
    }
    Ok(url)
}

/// `<base>/v1/<segments...>`, each segment percent-encoded.
fn versioned_url(base: &Url, segments: &[&str]) -> Result<Url, AssemblyError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| AssemblyError::Config(format!("url '{base}' cannot be a base")))?
        .pop_if_empty()
        .push(API_VERSION)
        .extend(segments);
    Ok(url)
}

fn transport_error(service: &'static str, timeout_secs: u64, e: reqwest::Error) -> AssemblyError {
    let reason = if e.is_timeout() {
        format!("request timed out after {timeout_secs}s")
    } else if e.is_connect() {
        format!("connection failed: {e}")
    } else {
        e.to_string()
    };
    AssemblyError::Http { service, reason }
}

// ═══════════════════════════════════════════
// Boundary server
// ═══════════════════════════════════════════

/// Response body of `/v1/boundaries/{id}` and items of `/v1/boundaries/last`.
#[derive(Debug, Deserialize)]
struct BoundaryDto {
    id: String,
    filename: String,
    boundary: String,
}

impl From<BoundaryDto> for BoundaryArtifact {
    fn from(dto: BoundaryDto) -> Self {
        Self {
            id: dto.id,
            filename: dto.filename,
            content: dto.boundary.into_bytes(),
        }
    }
}

/// Boundary server client. Also serves the authorization lists.
pub struct HttpBoundaryService {
    base_url: Url,
    client: reqwest::blocking::Client,
}

impl HttpBoundaryService {
    pub fn new(base_url: &str) -> Result<Self, AssemblyError> {
        Ok(Self {
            base_url: parse_base_url(BOUNDARY_SERVICE, base_url)?,
            client: build_client(BOUNDARY_SERVICE, BOUNDARY_LOOKUP_TIMEOUT_SECS)?,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, AssemblyError> {
        versioned_url(&self.base_url, segments)
    }

    fn get(&self, segments: &[&str]) -> Result<reqwest::blocking::Response, AssemblyError> {
        let url = self.endpoint(segments)?;
        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| transport_error(BOUNDARY_SERVICE, BOUNDARY_LOOKUP_TIMEOUT_SECS, e))?;
        tracing::debug!(url = %url, status = response.status().as_u16(), "Boundary server response");
        Ok(response)
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, segments: &[&str]) -> Result<T, AssemblyError> {
        let response = self.get(segments)?;
        let status = response.status();
        if !status.is_success() {
            return Err(AssemblyError::ServiceStatus {
                service: BOUNDARY_SERVICE,
                status: status.as_u16(),
            });
        }
        response.json().map_err(|e| AssemblyError::Http {
            service: BOUNDARY_SERVICE,
            reason: format!("invalid response body: {e}"),
        })
    }
}

impl BoundaryService for HttpBoundaryService {
    fn get_by_id(&self, id: &str) -> Result<Option<BoundaryArtifact>, AssemblyError> {
        let response = self.get(&["boundaries", id])?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(AssemblyError::ServiceStatus {
                service: BOUNDARY_SERVICE,
                status: status.as_u16(),
            });
        }
        let dto: BoundaryDto = response.json().map_err(|e| AssemblyError::Http {
            service: BOUNDARY_SERVICE,
            reason: format!("invalid boundary body: {e}"),
        })?;
        Ok(Some(dto.into()))
    }

    fn get_latest_set(&self) -> Result<Vec<BoundaryArtifact>, AssemblyError> {
        let dtos: Vec<BoundaryDto> = self.get_json(&["boundaries", "last"])?;
        Ok(dtos.into_iter().map(BoundaryArtifact::from).collect())
    }
}

impl AuthorizationSource for HttpBoundaryService {
    fn list_authorized_actors(&self) -> Result<Vec<String>, AssemblyError> {
        self.get_json(&["tsos"])
    }

    fn list_authorized_business_processes(&self) -> Result<Vec<String>, AssemblyError> {
        self.get_json(&["business-processes"])
    }
}

// ═══════════════════════════════════════════
// Case server
// ═══════════════════════════════════════════

/// Case server client, imports assembled cases as public cases.
pub struct HttpCaseImportService {
    import_url: Url,
    client: reqwest::blocking::Client,
}

impl HttpCaseImportService {
    pub fn new(base_url: &str) -> Result<Self, AssemblyError> {
        let base = parse_base_url(CASE_SERVICE, base_url)?;
        Ok(Self {
            import_url: versioned_url(&base, &["cases", "public"])?,
            client: build_client(CASE_SERVICE, CASE_IMPORT_TIMEOUT_SECS)?,
        })
    }
}

impl CaseImportService for HttpCaseImportService {
    fn submit(&self, archive_name: &str, archive: &[u8]) -> Result<bool, AssemblyError> {
        let part = Part::bytes(archive.to_vec())
            .file_name(archive_name.to_string())
            .mime_str("application/octet-stream")
            .map_err(|e| AssemblyError::Http {
                service: CASE_SERVICE,
                reason: e.to_string(),
            })?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.import_url.clone())
            .multipart(form)
            .send()
            .map_err(|e| transport_error(CASE_SERVICE, CASE_IMPORT_TIMEOUT_SECS, e))?;

        let status = response.status();
        let body = response.text().unwrap_or_default();
        tracing::info!(case = archive_name, status = status.as_u16(), "Case server response");
        if !status.is_success() {
            tracing::warn!(case = archive_name, body = %body, "Case import refused");
        }
        Ok(status.is_success())
    }
}
