//! HTTP client for the user and certificate services.
//!
//! Blocking reqwest client (no Tokio runtime required). Every list response
//! is normalized through `certtrack_recon::wire` before it is returned, so
//! callers only ever see clean model types.

use std::path::Path;
use std::time::Duration;

use certtrack_recon::wire::{certificates_from_value, mappings_from_value, profiles_from_value, WireProfile};
use certtrack_recon::{Certificate, PeerMapping, Profile, ReconError, ReviewStatus};
use reqwest::blocking::{multipart, RequestBuilder, Response};

use crate::session::{Role, Session};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Base URLs of the two services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoints {
    pub user_api: String,
    pub cert_api: String,
}

impl ServiceEndpoints {
    pub fn new(user_api: impl Into<String>, cert_api: impl Into<String>) -> Self {
        Self {
            user_api: user_api.into().trim_end_matches('/').to_string(),
            cert_api: cert_api.into().trim_end_matches('/').to_string(),
        }
    }

    /// The endpoints a session was issued against.
    pub fn of_session(session: &Session) -> Self {
        Self::new(session.user_api.clone(), session.cert_api.clone())
    }
}

/// Service API client (blocking).
#[derive(Clone)]
pub struct CertClient {
    http: reqwest::blocking::Client,
    endpoints: ServiceEndpoints,
    token: Option<String>,
}

/// Error type for service operations.
#[derive(Debug)]
pub enum ClientError {
    /// No session configured
    NotAuthenticated,
    /// Network error
    Network(String),
    /// HTTP error with status code and the server's message
    Http(u16, String),
    /// JSON parsing / response shape error
    Parse(String),
    /// File I/O error
    Io(String),
    /// Server or client rejected the input (4xx with message, bad argument)
    Validation(String),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::NotAuthenticated => write!(f, "Not authenticated, run `certtrack login` first"),
            ClientError::Network(msg) => write!(f, "Network error: {}", msg),
            ClientError::Http(code, msg) => write!(f, "HTTP {}: {}", code, msg),
            ClientError::Parse(msg) => write!(f, "Parse error: {}", msg),
            ClientError::Io(msg) => write!(f, "I/O error: {}", msg),
            ClientError::Validation(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<ReconError> for ClientError {
    fn from(e: ReconError) -> Self {
        match e {
            ReconError::Io(msg) => ClientError::Io(msg),
            other => ClientError::Parse(other.to_string()),
        }
    }
}

impl ClientError {
    /// True for 401/403 responses.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ClientError::NotAuthenticated | ClientError::Http(401, _) | ClientError::Http(403, _))
    }
}

/// Form fields for a certificate upload.
#[derive(Debug, Clone, Default)]
pub struct NewCertificate {
    pub name: String,
    pub track_id: String,
    pub track_url: String,
    pub issued_by: String,
    pub issued_date: String,
    pub expiry_date: String,
}

/// A renewal request for a verified mapping.
#[derive(Debug, Clone)]
pub struct RenewalRequest<'a> {
    pub pdf: &'a Path,
    pub reason: String,
    pub new_expiry_date: String,
}

/// Sign-up form for a new account.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub role: Role,
    /// Area of specialization; peers only
    pub dept: Option<String>,
    /// URL of an already hosted picture
    pub profile_pic: Option<String>,
}

/// Fields to change on an account. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dept: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_pic: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone.is_none() && self.dept.is_none() && self.profile_pic.is_none()
    }
}

/// Files stored by the certificate service next to a certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Asset {
    Pdf,
    Badge,
}

impl Asset {
    fn route(self) -> &'static str {
        match self {
            Asset::Pdf => "pdf",
            Asset::Badge => "badge",
        }
    }
}

#[derive(serde::Deserialize)]
struct LoginResponse {
    token: String,
    #[serde(default)]
    role: String,
}

impl CertClient {
    /// Client without a session (login only).
    pub fn new(endpoints: ServiceEndpoints, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(format!("certtrack/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Network(format!("cannot create HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoints,
            token: None,
        })
    }

    /// Client bound to an explicit session, talking to `endpoints`.
    pub fn with_session(endpoints: ServiceEndpoints, session: &Session, timeout: Duration) -> Result<Self, ClientError> {
        let mut client = Self::new(endpoints, timeout)?;
        client.token = Some(session.token.clone());
        Ok(client)
    }

    pub fn endpoints(&self) -> &ServiceEndpoints {
        &self.endpoints
    }

    // ── User service ────────────────────────────────────────────────

    /// Exchange credentials for a session.
    pub fn login(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let url = format!("{}/api/users/login", self.endpoints.user_api);
        let req = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "email": email, "password": password }));
        let resp = send(req, "POST", &url)?;
        let body: LoginResponse = resp.json().map_err(|e| ClientError::Parse(e.to_string()))?;

        if body.token.trim().is_empty() {
            return Err(ClientError::Parse("login response has an empty token".into()));
        }
        let role = Role::parse(&body.role)
            .ok_or_else(|| ClientError::Parse(format!("unknown role in login response: '{}'", body.role)))?;

        Ok(Session {
            token: body.token,
            role,
            email: email.to_string(),
            user_api: self.endpoints.user_api.clone(),
            cert_api: self.endpoints.cert_api.clone(),
        })
    }

    /// Create an account. Returns the service's confirmation message.
    pub fn register(&self, account: &NewAccount) -> Result<String, ClientError> {
        if account.role != Role::Peer && account.dept.is_some() {
            return Err(ClientError::Validation("only peers have a department".into()));
        }
        let url = format!("{}/api/users/register", self.endpoints.user_api);
        let resp = send(self.http.post(&url).json(account), "POST", &url)?;
        let body = resp.text().map_err(|e| ClientError::Network(e.to_string()))?;
        Ok(server_message(&body))
    }

    /// Profile of the session's account. The service takes the token in the body.
    pub fn profile(&self) -> Result<Profile, ClientError> {
        let token = self.token()?;
        let url = format!("{}/api/users/get-profile", self.endpoints.user_api);
        let resp = self.post_json(&url, &serde_json::json!({ "token": token }))?;
        let wire: WireProfile = resp.json().map_err(|e| ClientError::Parse(e.to_string()))?;
        Ok(wire.normalize())
    }

    /// Change the session's own profile; returns the stored profile.
    pub fn update_profile(&self, update: &ProfileUpdate) -> Result<Profile, ClientError> {
        if update.is_empty() {
            return Err(ClientError::Validation("nothing to update".into()));
        }
        let url = format!("{}/api/users/update-profile", self.endpoints.user_api);
        let token = self.token()?;
        let resp = send(self.http.put(&url).bearer_auth(token).json(update), "PUT", &url)?;
        let wire: WireProfile = resp.json().map_err(|e| ClientError::Parse(e.to_string()))?;
        Ok(wire.normalize())
    }

    /// Accounts with the `user` role.
    pub fn list_users(&self) -> Result<Vec<Profile>, ClientError> {
        self.get_profiles("/api/users/adminusers")
    }

    pub fn list_peers(&self) -> Result<Vec<Profile>, ClientError> {
        self.get_profiles("/api/users/peers")
    }

    pub fn list_admins(&self) -> Result<Vec<Profile>, ClientError> {
        self.get_profiles("/api/users/alladmins")
    }

    pub fn delete_user(&self, email: &str) -> Result<(), ClientError> {
        self.delete_account("/api/users/delete-user", email)
    }

    pub fn delete_peer(&self, email: &str) -> Result<(), ClientError> {
        self.delete_account("/api/users/delete-peer", email)
    }

    /// Edit a user account. Users have no department.
    pub fn update_user(&self, email: &str, update: &ProfileUpdate) -> Result<(), ClientError> {
        if update.dept.is_some() {
            return Err(ClientError::Validation("only peers have a department".into()));
        }
        self.update_account("/api/users/update-user", email, update)
    }

    pub fn update_peer(&self, email: &str, update: &ProfileUpdate) -> Result<(), ClientError> {
        self.update_account("/api/users/update-peer", email, update)
    }

    // ── Certificate service ─────────────────────────────────────────

    /// Certificates owned by the session's account.
    pub fn certificates_by_email(&self) -> Result<Vec<Certificate>, ClientError> {
        let url = format!("{}/api/certificates/email", self.endpoints.cert_api);
        let value: serde_json::Value = self.get(&url)?.json().map_err(|e| ClientError::Parse(e.to_string()))?;
        Ok(certificates_from_value(value)?)
    }

    pub fn all_certificates(&self) -> Result<Vec<Certificate>, ClientError> {
        let url = format!("{}/api/certificates/all", self.endpoints.cert_api);
        let value: serde_json::Value = self.get(&url)?.json().map_err(|e| ClientError::Parse(e.to_string()))?;
        Ok(certificates_from_value(value)?)
    }

    /// Upload a certificate PDF (and optional badge image) with its metadata.
    pub fn upload_certificate(
        &self,
        cert: &NewCertificate,
        pdf: &Path,
        badge: Option<&Path>,
    ) -> Result<(), ClientError> {
        let url = format!("{}/api/certificates/upload", self.endpoints.cert_api);
        let mut form = multipart::Form::new()
            .text("name", cert.name.clone())
            .text("trackId", cert.track_id.clone())
            .text("trackUrl", cert.track_url.clone())
            .text("issuedBy", cert.issued_by.clone())
            .text("issuedDate", cert.issued_date.clone())
            .text("expiryDate", cert.expiry_date.clone())
            .file("pdfFile", pdf)
            .map_err(|e| ClientError::Io(format!("{}: {e}", pdf.display())))?;
        if let Some(badge) = badge {
            form = form
                .file("badge", badge)
                .map_err(|e| ClientError::Io(format!("{}: {e}", badge.display())))?;
        }
        let token = self.token()?;
        send(self.http.post(&url).bearer_auth(token).multipart(form), "POST", &url)?;
        Ok(())
    }

    /// Download a stored certificate PDF or badge by its file name.
    pub fn download(&self, asset: Asset, file: &str) -> Result<Vec<u8>, ClientError> {
        let file = path_segment("file name", file)?;
        let url = format!("{}/api/certificates/{}/{}", self.endpoints.cert_api, asset.route(), file);
        let bytes = self.get(&url)?.bytes().map_err(|e| ClientError::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    pub fn all_mappings(&self) -> Result<Vec<PeerMapping>, ClientError> {
        let url = format!("{}/peer-mappings/all", self.endpoints.cert_api);
        let value: serde_json::Value = self.get(&url)?.json().map_err(|e| ClientError::Parse(e.to_string()))?;
        Ok(mappings_from_value(value)?)
    }

    /// Mappings assigned to the session's peer.
    pub fn my_mappings(&self) -> Result<Vec<PeerMapping>, ClientError> {
        let url = format!("{}/peer-mappings/mapped/self", self.endpoints.cert_api);
        let value: serde_json::Value = self.get(&url)?.json().map_err(|e| ClientError::Parse(e.to_string()))?;
        Ok(mappings_from_value(value)?)
    }

    /// Assign a certificate to a peer for review.
    pub fn add_mapping(&self, certificate_id: &str, peer_email: &str, peer_name: &str) -> Result<(), ClientError> {
        if certificate_id.trim().is_empty() || peer_email.trim().is_empty() {
            return Err(ClientError::Validation("certificate id and peer email are required".into()));
        }
        let url = format!("{}/peer-mappings/add", self.endpoints.cert_api);
        self.post_json(
            &url,
            &serde_json::json!({
                "peerEmail": peer_email,
                "peerName": peer_name,
                "certificateId": certificate_id,
            }),
        )?;
        Ok(())
    }

    /// Record a review decision on a mapping.
    pub fn update_status(&self, mapping_id: &str, status: ReviewStatus, comment: &str) -> Result<(), ClientError> {
        let url = format!("{}/peer-mappings/update-status/{}", self.endpoints.cert_api, path_id(mapping_id)?);
        self.post_json(&url, &decision_body(status, comment))?;
        Ok(())
    }

    /// Record a decision on a renewal request.
    pub fn verify_renewal(&self, mapping_id: &str, status: ReviewStatus, comment: &str) -> Result<(), ClientError> {
        let url = format!("{}/peer-mappings/verify-renewal/{}", self.endpoints.cert_api, path_id(mapping_id)?);
        let token = self.token()?;
        let req = self.http.put(&url).bearer_auth(token).json(&decision_body(status, comment));
        send(req, "PUT", &url)?;
        Ok(())
    }

    /// Ask for a verified certificate to be renewed.
    pub fn request_renewal(&self, mapping_id: &str, renewal: &RenewalRequest<'_>) -> Result<(), ClientError> {
        if renewal.reason.trim().is_empty() || renewal.new_expiry_date.trim().is_empty() {
            return Err(ClientError::Validation("renewal reason and new expiry date are required".into()));
        }
        let url = format!("{}/peer-mappings/renew/{}", self.endpoints.cert_api, path_id(mapping_id)?);
        let form = multipart::Form::new()
            .text("renewalReason", renewal.reason.clone())
            .text("newExpiryDate", renewal.new_expiry_date.clone())
            .file("renewalPdf", renewal.pdf)
            .map_err(|e| ClientError::Io(format!("{}: {e}", renewal.pdf.display())))?;
        let token = self.token()?;
        send(self.http.post(&url).bearer_auth(token).multipart(form), "POST", &url)?;
        Ok(())
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn token(&self) -> Result<&str, ClientError> {
        self.token.as_deref().ok_or(ClientError::NotAuthenticated)
    }

    fn get_profiles(&self, path: &str) -> Result<Vec<Profile>, ClientError> {
        let url = format!("{}{}", self.endpoints.user_api, path);
        let value: serde_json::Value = self.get(&url)?.json().map_err(|e| ClientError::Parse(e.to_string()))?;
        Ok(profiles_from_value(value)?)
    }

    fn delete_account(&self, path: &str, email: &str) -> Result<(), ClientError> {
        if email.trim().is_empty() {
            return Err(ClientError::Validation("email is required".into()));
        }
        let url = format!("{}{}", self.endpoints.user_api, path);
        let token = self.token()?;
        send(self.http.delete(&url).bearer_auth(token).query(&[("email", email)]), "DELETE", &url)?;
        Ok(())
    }

    fn update_account(&self, path: &str, email: &str, update: &ProfileUpdate) -> Result<(), ClientError> {
        if email.trim().is_empty() {
            return Err(ClientError::Validation("email is required".into()));
        }
        if update.is_empty() {
            return Err(ClientError::Validation("nothing to update".into()));
        }
        let url = format!("{}{}", self.endpoints.user_api, path);
        let token = self.token()?;
        let req = self.http.put(&url).bearer_auth(token).query(&[("email", email.trim())]).json(update);
        send(req, "PUT", &url)?;
        Ok(())
    }

    fn get(&self, url: &str) -> Result<Response, ClientError> {
        let token = self.token()?;
        send(self.http.get(url).bearer_auth(token), "GET", url)
    }

    fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<Response, ClientError> {
        let token = self.token()?;
        send(self.http.post(url).bearer_auth(token).json(body), "POST", url)
    }
}

// ── Free functions ──────────────────────────────────────────────────

fn send(req: RequestBuilder, method: &str, url: &str) -> Result<Response, ClientError> {
    log::debug!("{} {}", method, url);
    let response = req.send().map_err(|e| ClientError::Network(e.to_string()))?;

    let status = response.status().as_u16();
    if !response.status().is_success() {
        let body = response.text().unwrap_or_default();
        let message = server_message(&body);
        log::debug!("{} {} -> {}: {}", method, url, status, message);
        if status == 422 || status == 400 {
            return Err(ClientError::Validation(message));
        }
        return Err(ClientError::Http(status, message));
    }

    Ok(response)
}

/// Pull `message` (or `error`) out of a JSON error body; fall back to the raw text.
fn server_message(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error"] {
            if let Some(msg) = json.get(key).and_then(|v| v.as_str()) {
                return msg.to_string();
            }
        }
    }
    body.trim().to_string()
}

fn decision_body(status: ReviewStatus, comment: &str) -> serde_json::Value {
    serde_json::json!({ "status": status.as_str(), "comment": comment })
}

/// Values that go into the URL path; reject anything that would change the route.
fn path_segment<'a>(what: &str, value: &'a str) -> Result<&'a str, ClientError> {
    let value = value.trim();
    if value.is_empty() || value == ".." || value.contains(['/', '\\', '?', '#']) {
        return Err(ClientError::Validation(format!("invalid {what} '{value}'")));
    }
    Ok(value)
}

fn path_id(id: &str) -> Result<&str, ClientError> {
    path_segment("mapping id", id)
}
