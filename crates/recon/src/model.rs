use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// An uploaded certificate, as owned by the certificate service.
///
/// Identifiers are already normalized to strings (see [`crate::wire`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    /// The service's `id`; mappings reference certificates by this value.
    pub id: String,
    /// Document `_id`, when the service sent one. Never used for matching.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    pub name: String,
    pub email: String,
    pub track_id: String,
    pub track_url: String,
    pub issued_by: String,
    pub issued_date: String,
    pub expiry_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renew_pdf_file: Option<String>,
}

impl Certificate {
    /// Minimal certificate with only identity and name set.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            record_id: None,
            name: name.into(),
            email: String::new(),
            track_id: String::new(),
            track_url: String::new(),
            issued_by: String::new(),
            issued_date: String::new(),
            expiry_date: String::new(),
            badge: None,
            pdf_file: None,
            renew_pdf_file: None,
        }
    }

    /// Parsed expiry date. Accepts `YYYY-MM-DD` with an optional trailing
    /// time part (`2025-03-01T00:00:00.000Z`).
    pub fn expiry(&self) -> Option<NaiveDate> {
        parse_service_date(&self.expiry_date)
    }

    /// Signed number of days from `today` until expiry (negative once expired).
    pub fn days_until_expiry(&self, today: NaiveDate) -> Option<i64> {
        self.expiry().map(|d| (d - today).num_days())
    }
}

pub(crate) fn parse_service_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Review state stored on a peer mapping by the certificate service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReviewStatus {
    Pending,
    Verified,
    Rejected,
}

impl ReviewStatus {
    /// Parse the service's status string. Unknown values yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "verified" => Some(Self::Verified),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Verified => "Verified",
            Self::Rejected => "Rejected",
        }
    }
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A link between a certificate and the peer reviewing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerMapping {
    /// Normalized identity (`_id` when the service sent one, else `id`).
    pub id: String,
    /// `None` when the service sent a missing or malformed reference.
    pub certificate_id: Option<String>,
    pub peer_email: String,
    pub peer_name: String,
    pub status: Option<ReviewStatus>,
    pub comment: Option<String>,
    #[serde(default)]
    pub renewal_requested: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renewal_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_expiry_date: Option<String>,
}

impl PeerMapping {
    pub fn new(id: impl Into<String>, certificate_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            certificate_id: Some(certificate_id.into()),
            peer_email: String::new(),
            peer_name: String::new(),
            status: None,
            comment: None,
            renewal_requested: false,
            renewal_reason: None,
            new_expiry_date: None,
        }
    }

    pub fn with_status(mut self, status: ReviewStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_peer(mut self, email: impl Into<String>, name: impl Into<String>) -> Self {
        self.peer_email = email.into();
        self.peer_name = name.into();
        self
    }

    /// Status with the service default applied (a mapping without one is Pending).
    pub fn effective_status(&self) -> ReviewStatus {
        self.status.unwrap_or(ReviewStatus::Pending)
    }
}

/// An account from the user service (user, peer or admin).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dept: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_pic: Option<String>,
}

// ---------------------------------------------------------------------------
// Derived
// ---------------------------------------------------------------------------

pub const NOT_MAPPED_LABEL: &str = "Not mapped to peer";
pub const NO_COMMENT: &str = "No comment";
pub const UNKNOWN: &str = "Unknown";

/// Display status of a certificate: a review status, or "not mapped".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisplayStatus {
    Pending,
    Verified,
    Rejected,
    #[serde(rename = "Not mapped to peer")]
    NotMapped,
}

impl DisplayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Verified => "Verified",
            Self::Rejected => "Rejected",
            Self::NotMapped => NOT_MAPPED_LABEL,
        }
    }

    /// Accepts the display label as well as the short forms used on the
    /// command line (`not-mapped`, `unmapped`).
    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "not mapped to peer" | "not-mapped" | "not_mapped" | "unmapped" => Some(Self::NotMapped),
            other => ReviewStatus::parse(other).map(Self::from),
        }
    }
}

impl From<ReviewStatus> for DisplayStatus {
    fn from(s: ReviewStatus) -> Self {
        match s {
            ReviewStatus::Pending => Self::Pending,
            ReviewStatus::Verified => Self::Verified,
            ReviewStatus::Rejected => Self::Rejected,
        }
    }
}

impl std::fmt::Display for DisplayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A certificate annotated with its review status. Recomputed on every
/// reconcile, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichedCertificate {
    #[serde(flatten)]
    pub certificate: Certificate,
    pub status: DisplayStatus,
    pub comment: String,
}

/// A peer mapping annotated with the certificate it points at (peer views).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedMapping {
    #[serde(flatten)]
    pub mapping: PeerMapping,
    pub certificate_name: String,
    /// Certificate owner's email, `"na"` when the certificate is unknown.
    pub username: String,
    pub track_id: String,
    pub track_url: String,
    pub issued_date: String,
    pub expiry_date: String,
    pub badge: Option<String>,
    pub pdf_file: Option<String>,
    pub renew_pdf_file: Option<String>,
}

/// Counts per display status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    pub total: usize,
    pub pending: usize,
    pub verified: usize,
    pub rejected: usize,
    pub not_mapped: usize,
}

/// A certificate referenced by more than one mapping. Only `kept` is
/// visible to reconciliation; the rest are shadowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateMapping {
    pub certificate_id: String,
    pub kept: String,
    pub shadowed: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_status_labels() {
        assert_eq!(DisplayStatus::NotMapped.to_string(), "Not mapped to peer");
        assert_eq!(DisplayStatus::from(ReviewStatus::Verified).to_string(), "Verified");
        let json = serde_json::to_string(&DisplayStatus::NotMapped).unwrap();
        assert_eq!(json, "\"Not mapped to peer\"");
    }

    #[test]
    fn display_status_parse_forms() {
        assert_eq!(DisplayStatus::parse("pending"), Some(DisplayStatus::Pending));
        assert_eq!(DisplayStatus::parse("Not mapped to peer"), Some(DisplayStatus::NotMapped));
        assert_eq!(DisplayStatus::parse("unmapped"), Some(DisplayStatus::NotMapped));
        assert_eq!(DisplayStatus::parse("approved"), None);
    }

    #[test]
    fn expiry_accepts_timestamps() {
        let mut cert = Certificate::new("1", "AWS");
        cert.expiry_date = "2026-03-01T00:00:00.000Z".into();
        let today = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        assert_eq!(cert.days_until_expiry(today), Some(28));

        cert.expiry_date = "next spring".into();
        assert_eq!(cert.days_until_expiry(today), None);
    }

    #[test]
    fn mapping_without_status_is_pending() {
        let m = PeerMapping::new("m1", "c1");
        assert_eq!(m.effective_status(), ReviewStatus::Pending);
        assert_eq!(m.with_status(ReviewStatus::Rejected).effective_status(), ReviewStatus::Rejected);
    }
}
