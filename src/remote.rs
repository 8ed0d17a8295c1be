//! Remote IIIF manifest validation.
//!
//! A catalog record may point at a third-party IIIF manifest instead of a
//! local image. Validation is *advisory*: a slow or misconfigured remote
//! host must never fail the build, it only annotates the record so the
//! authoring error is visible in the generated site.
//!
//! The check is a small state machine:
//!
//! ```text
//! Empty → Valid
//!       | InvalidUrl        (scheme is not http/https; reference cleared)
//!       | Unreachable       (HEAD failed; reference cleared)
//!       | HttpError(code)   (non-2xx; mapped message; reference cleared)
//!       | WrongContentType  (2xx but not JSON; reference KEPT — it may
//!       |                    still load in the viewer)
//!       | InvalidJson       (GET body not JSON; reference cleared)
//!       | MissingFields     (JSON but no @context and no type; cleared)
//! ```
//!
//! HEAD uses a short timeout, the follow-up GET a longer one. No retries:
//! a network failure degrades to a warning, never a retry loop.
//!
//! [`RemoteValidator`] is a trait so transformers can be exercised in tests
//! with a stub instead of a live server.

use crate::config::RemoteConfig;
use std::time::Duration;
use url::Url;

/// Outcome state of validating one manifest reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestStatus {
    /// No reference present; nothing evaluated.
    Empty,
    /// Reachable, parses as JSON, has the identifying fields.
    Valid,
    /// Not an http(s) URL.
    InvalidUrl,
    /// Network failure or timeout.
    Unreachable,
    /// Non-2xx response.
    HttpError(u16),
    /// 2xx but the Content-Type does not look like JSON.
    WrongContentType,
    /// Body could not be parsed as JSON.
    InvalidJson,
    /// JSON but missing both `@context` and `type`/`@type`.
    MissingFields,
}

/// Result of one manifest check: the state plus the user-facing warnings.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestCheck {
    pub status: ManifestStatus,
    /// Short machine/UI label (`object_warning_short`). Empty when fine.
    pub short: String,
    /// Long end-user explanation (`object_warning`). Empty when fine.
    pub long: String,
}

impl ManifestCheck {
    fn clean(status: ManifestStatus) -> Self {
        Self {
            status,
            short: String::new(),
            long: String::new(),
        }
    }

    fn flagged(status: ManifestStatus, short: impl Into<String>, long: impl Into<String>) -> Self {
        Self {
            status,
            short: short.into(),
            long: long.into(),
        }
    }

    /// True when the check produced no warning.
    pub fn passed(&self) -> bool {
        matches!(self.status, ManifestStatus::Empty | ManifestStatus::Valid)
    }

    /// True when the remote endpoint answered and may serve the viewer.
    /// A wrong content type still counts: the document might be fine.
    pub fn reachable(&self) -> bool {
        matches!(
            self.status,
            ManifestStatus::Valid | ManifestStatus::WrongContentType
        )
    }

    /// Whether the manifest reference should be cleared from the record.
    /// Kept for `WrongContentType` — the manifest may still be usable.
    pub fn clears_reference(&self) -> bool {
        !matches!(
            self.status,
            ManifestStatus::Empty | ManifestStatus::Valid | ManifestStatus::WrongContentType
        )
    }
}

/// Validates a manifest reference. Implemented over HTTP for builds and by
/// stubs in tests.
pub trait RemoteValidator {
    fn validate(&self, reference: &str) -> ManifestCheck;
}

/// Accepts every reference without network access.
///
/// Used when `remote.validate = false` (offline builds): references are
/// trusted as-is and count as a usable image source.
pub struct SkipValidator;

impl RemoteValidator for SkipValidator {
    fn validate(&self, reference: &str) -> ManifestCheck {
        if reference.trim().is_empty() {
            ManifestCheck::clean(ManifestStatus::Empty)
        } else {
            ManifestCheck::clean(ManifestStatus::Valid)
        }
    }
}

/// HTTP-backed validator with bounded timeouts.
pub struct HttpValidator {
    head_client: reqwest::blocking::Client,
    get_client: reqwest::blocking::Client,
}

impl HttpValidator {
    pub fn new(config: &RemoteConfig) -> Result<Self, reqwest::Error> {
        let head_client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.head_timeout_secs))
            .build()?;
        let get_client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.get_timeout_secs))
            .build()?;
        Ok(Self {
            head_client,
            get_client,
        })
    }
}

impl RemoteValidator for HttpValidator {
    fn validate(&self, reference: &str) -> ManifestCheck {
        let reference = reference.trim();
        if reference.is_empty() {
            return ManifestCheck::clean(ManifestStatus::Empty);
        }

        match Url::parse(reference) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => {
                return ManifestCheck::flagged(
                    ManifestStatus::InvalidUrl,
                    "Invalid manifest URL",
                    format!(
                        "The IIIF manifest address \"{reference}\" is not a valid http(s) URL, so it was ignored."
                    ),
                );
            }
        }

        let head = match self.head_client.head(reference).send() {
            Ok(response) => response,
            Err(_) => {
                return ManifestCheck::flagged(
                    ManifestStatus::Unreachable,
                    "Manifest unreachable",
                    format!(
                        "The IIIF manifest at {reference} could not be reached (network error or timeout)."
                    ),
                );
            }
        };

        let status = head.status();
        if !status.is_success() {
            let code = status.as_u16();
            let (short, long) = status_warning(code, reference);
            return ManifestCheck::flagged(ManifestStatus::HttpError(code), short, long);
        }

        let content_type = head
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();
        if !content_type.contains("json") {
            return ManifestCheck::flagged(
                ManifestStatus::WrongContentType,
                "Manifest may not be JSON",
                format!(
                    "The server at {reference} reports content type \"{content_type}\" rather than JSON; the viewer may still load it, but check the address."
                ),
            );
        }

        let body = match self.get_client.get(reference).send() {
            Ok(response) => response.json::<serde_json::Value>(),
            Err(_) => {
                return ManifestCheck::flagged(
                    ManifestStatus::Unreachable,
                    "Manifest unreachable",
                    format!(
                        "The IIIF manifest at {reference} could not be downloaded (network error or timeout)."
                    ),
                );
            }
        };

        match body {
            Err(_) => ManifestCheck::flagged(
                ManifestStatus::InvalidJson,
                "Manifest is not valid JSON",
                format!(
                    "The document at {reference} could not be parsed as JSON, so it cannot be a IIIF manifest."
                ),
            ),
            Ok(value) => check_structure(&value, reference),
        }
    }
}

/// Structural check on a parsed manifest body.
///
/// A document identifying itself with either a `@context` or a `type` /
/// `@type` field is accepted; anything else does not look like a IIIF
/// manifest at all.
pub fn check_structure(value: &serde_json::Value, reference: &str) -> ManifestCheck {
    let has_context = value.get("@context").is_some();
    let has_type = value.get("type").is_some() || value.get("@type").is_some();
    if has_context || has_type {
        ManifestCheck::clean(ManifestStatus::Valid)
    } else {
        ManifestCheck::flagged(
            ManifestStatus::MissingFields,
            "Manifest missing required fields",
            format!(
                "The document at {reference} parses as JSON but has neither \"@context\" nor \"type\", so it does not look like a IIIF manifest."
            ),
        )
    }
}

/// Map an HTTP error status to a short label and a long explanation.
///
/// The interesting codes each get a distinct, actionable message; anything
/// else falls back to the generic "could not be accessed" template.
pub fn status_warning(code: u16, reference: &str) -> (String, String) {
    match code {
        401 => (
            "Error 401: authentication required".to_string(),
            format!(
                "The IIIF manifest at {reference} requires a login (HTTP 401), so the viewer will not be able to load it."
            ),
        ),
        403 => (
            "Error 403: access denied".to_string(),
            format!(
                "The server refused access to the IIIF manifest at {reference} (HTTP 403). The manifest may not be public."
            ),
        ),
        404 => (
            "Error 404: manifest not found".to_string(),
            format!(
                "No IIIF manifest exists at {reference} (HTTP 404). Check the address for typos."
            ),
        ),
        429 => (
            "Error 429: too many requests".to_string(),
            format!(
                "The server hosting {reference} is rate-limiting requests (HTTP 429). Try the build again later."
            ),
        ),
        500 | 502 | 503 => (
            format!("Error {code}: server problem"),
            format!(
                "The server hosting the IIIF manifest at {reference} reported a problem (HTTP {code}). This is on the manifest host, not your content."
            ),
        ),
        _ => (
            format!("Error {code}: manifest not accessible"),
            format!("The IIIF manifest at {reference} could not be accessed (error {code})."),
        ),
    }
}
