//! Wire shapes for records coming from the user and certificate services.
//!
//! The two services evolve independently: identifiers arrive as `_id` or
//! `id`, as numbers or strings, and status/comment may be missing. Everything
//! is parsed loosely here and normalized into [`crate::model`] types before
//! it reaches the reconciler.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::ReconError;
use crate::model::{Certificate, PeerMapping, Profile, ReviewStatus};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireCertificate {
    #[serde(rename = "_id")]
    pub underscore_id: Value,
    pub id: Value,
    pub name: Option<String>,
    pub email: Option<String>,
    pub track_id: Option<Value>,
    pub track_url: Option<String>,
    pub issued_by: Option<String>,
    pub issued_date: Option<String>,
    pub expiry_date: Option<String>,
    pub badge: Option<String>,
    pub pdf_file: Option<String>,
    pub renew_pdf_file: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WirePeerMapping {
    #[serde(rename = "_id")]
    pub underscore_id: Value,
    pub id: Value,
    pub certificate_id: Value,
    pub peer_email: Option<String>,
    pub peer_name: Option<String>,
    pub status: Option<String>,
    pub comment: Option<String>,
    pub renewal_requested: Option<bool>,
    pub renewal_reason: Option<String>,
    pub new_expiry_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireProfile {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub dept: Option<String>,
    pub phone: Option<Value>,
    pub profile_pic: Option<String>,
}

/// String form of an identifier, comparable across services.
///
/// Strings are kept verbatim; integral numbers print without a fraction.
/// Missing, empty or non-scalar values yield `None`.
pub fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Some(u.to_string())
            } else {
                n.as_f64().map(|f| {
                    if f.fract() == 0.0 && f.abs() < 1e15 {
                        format!("{}", f as i64)
                    } else {
                        f.to_string()
                    }
                })
            }
        }
        _ => None,
    }
}

/// `_id ?? id`.
fn preferred_id(underscore: &Value, plain: &Value) -> Option<String> {
    id_string(underscore).or_else(|| id_string(plain))
}

impl WireCertificate {
    pub fn normalize(self) -> Certificate {
        // Mappings point at `id`; `_id` is carried along but never joined on.
        let id = id_string(&self.id).unwrap_or_else(|| {
            log::warn!(
                "certificate '{}' has no usable id; it will never match a mapping",
                self.name.as_deref().unwrap_or("")
            );
            String::new()
        });
        Certificate {
            id,
            record_id: id_string(&self.underscore_id),
            name: self.name.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            track_id: self.track_id.as_ref().and_then(id_string).unwrap_or_default(),
            track_url: self.track_url.unwrap_or_default(),
            issued_by: self.issued_by.unwrap_or_default(),
            issued_date: self.issued_date.unwrap_or_default(),
            expiry_date: self.expiry_date.unwrap_or_default(),
            badge: self.badge,
            pdf_file: self.pdf_file,
            renew_pdf_file: self.renew_pdf_file,
        }
    }
}

impl WirePeerMapping {
    pub fn normalize(self) -> PeerMapping {
        let id = preferred_id(&self.underscore_id, &self.id).unwrap_or_default();
        let certificate_id = id_string(&self.certificate_id);
        if certificate_id.is_none() {
            log::warn!("peer mapping '{id}' has no usable certificateId");
        }

        let status = self.status.as_deref().and_then(|raw| {
            let parsed = ReviewStatus::parse(raw);
            if parsed.is_none() {
                log::warn!("peer mapping '{id}': unknown status '{raw}', treating as unset");
            }
            parsed
        });

        PeerMapping {
            id,
            certificate_id,
            peer_email: self.peer_email.unwrap_or_default(),
            peer_name: self.peer_name.unwrap_or_default(),
            status,
            comment: self.comment,
            renewal_requested: self.renewal_requested.unwrap_or(false),
            renewal_reason: self.renewal_reason,
            new_expiry_date: self.new_expiry_date,
        }
    }
}

impl WireProfile {
    pub fn normalize(self) -> Profile {
        Profile {
            name: self.name.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            role: self.role,
            dept: self.dept,
            phone: self.phone.as_ref().and_then(id_string),
            profile_pic: self.profile_pic,
        }
    }
}

// ---------------------------------------------------------------------------
// List decoding
// ---------------------------------------------------------------------------

/// Decode a JSON array of records. A document that is not an array is an
/// invalid argument; individual elements that are not objects are skipped.
fn decode_list<W, T>(what: &str, value: Value, normalize: fn(W) -> T) -> Result<Vec<T>, ReconError>
where
    W: for<'de> Deserialize<'de>,
{
    let Value::Array(items) = value else {
        return Err(ReconError::InvalidArgument(format!(
            "{what}: expected a JSON array, found {}",
            json_kind(&value)
        )));
    };

    let mut out = Vec::with_capacity(items.len());
    for (idx, item) in items.into_iter().enumerate() {
        if !item.is_object() {
            log::warn!("{what}[{idx}]: expected an object, found {}; skipped", json_kind(&item));
            continue;
        }
        let wire: W = serde_json::from_value(item)
            .map_err(|e| ReconError::Parse(format!("{what}[{idx}]: {e}")))?;
        out.push(normalize(wire));
    }
    Ok(out)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

pub fn certificates_from_value(value: Value) -> Result<Vec<Certificate>, ReconError> {
    decode_list("certificates", value, WireCertificate::normalize)
}

pub fn mappings_from_value(value: Value) -> Result<Vec<PeerMapping>, ReconError> {
    decode_list("peer mappings", value, WirePeerMapping::normalize)
}

pub fn profiles_from_value(value: Value) -> Result<Vec<Profile>, ReconError> {
    decode_list("profiles", value, WireProfile::normalize)
}

pub fn certificates_from_json(json: &str) -> Result<Vec<Certificate>, ReconError> {
    let value = serde_json::from_str(json).map_err(|e| ReconError::Parse(e.to_string()))?;
    certificates_from_value(value)
}

pub fn mappings_from_json(json: &str) -> Result<Vec<PeerMapping>, ReconError> {
    let value = serde_json::from_str(json).map_err(|e| ReconError::Parse(e.to_string()))?;
    mappings_from_value(value)
}

/// Load a certificate export (a JSON array) from disk.
pub fn read_certificates(path: &Path) -> Result<Vec<Certificate>, ReconError> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| ReconError::Io(format!("cannot read {}: {e}", path.display())))?;
    certificates_from_json(&json)
}

/// Load a peer-mapping export (a JSON array) from disk.
pub fn read_mappings(path: &Path) -> Result<Vec<PeerMapping>, ReconError> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| ReconError::Io(format!("cannot read {}: {e}", path.display())))?;
    mappings_from_json(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_and_string_ids_normalize_alike() {
        assert_eq!(id_string(&json!(1)), Some("1".into()));
        assert_eq!(id_string(&json!("1")), Some("1".into()));
        assert_eq!(id_string(&json!(" 42 ")), Some(" 42 ".into()));
        assert_eq!(id_string(&json!(3.0)), Some("3".into()));
        assert_eq!(id_string(&json!(2.5)), Some("2.5".into()));
        assert_eq!(id_string(&json!("")), None);
        assert_eq!(id_string(&json!(null)), None);
        assert_eq!(id_string(&json!({"oid": 1})), None);
    }

    #[test]
    fn underscore_id_wins_over_id() {
        let m: WirePeerMapping = serde_json::from_value(json!({
            "_id": "65a1", "id": 7, "certificateId": 1, "status": "Verified"
        }))
        .unwrap();
        let m = m.normalize();
        assert_eq!(m.id, "65a1");
        assert_eq!(m.certificate_id.as_deref(), Some("1"));
        assert_eq!(m.status, Some(ReviewStatus::Verified));
    }

    #[test]
    fn certificates_join_on_plain_id() {
        let certs = certificates_from_json(r#"[{"_id":"65f0aa","id":1,"name":"AWS"}]"#).unwrap();
        assert_eq!(certs[0].id, "1");
        assert_eq!(certs[0].record_id.as_deref(), Some("65f0aa"));

        let mappings = mappings_from_json(r#"[{"_id":"m1","certificateId":1,"status":"Verified"}]"#).unwrap();
        let out = crate::reconcile::reconcile(&certs, &mappings);
        assert_eq!(out[0].status, crate::model::DisplayStatus::Verified);
    }

    #[test]
    fn certificate_with_only_underscore_id_never_matches() {
        let certs = certificates_from_json(r#"[{"_id":"65f0aa","name":"AWS"}]"#).unwrap();
        assert_eq!(certs[0].id, "");
        let mappings = mappings_from_json(r#"[{"certificateId":"65f0aa","status":"Verified"}]"#).unwrap();
        let out = crate::reconcile::reconcile(&certs, &mappings);
        assert_eq!(out[0].status, crate::model::DisplayStatus::NotMapped);
    }

    #[test]
    fn padded_ids_match_exactly() {
        let certs = certificates_from_json(r#"[{"id":"1"},{"id":" 2"}]"#).unwrap();
        let mappings =
            mappings_from_json(r#"[{"id":1,"certificateId":" 1 ","status":"Verified"},{"id":2,"certificateId":" 2","status":"Rejected"}]"#)
                .unwrap();
        let out = crate::reconcile::reconcile(&certs, &mappings);
        assert_eq!(out[0].status, crate::model::DisplayStatus::NotMapped);
        assert_eq!(out[1].status, crate::model::DisplayStatus::Rejected);
    }

    #[test]
    fn falls_back_to_plain_id() {
        let m: WirePeerMapping =
            serde_json::from_value(json!({ "id": 9, "certificateId": "3" })).unwrap();
        assert_eq!(m.normalize().id, "9");
    }

    #[test]
    fn unknown_status_is_unset() {
        let m: WirePeerMapping = serde_json::from_value(json!({
            "id": 1, "certificateId": 1, "status": "Escalated"
        }))
        .unwrap();
        assert_eq!(m.normalize().status, None);
    }

    #[test]
    fn sparse_certificate_gets_defaults() {
        let certs = certificates_from_value(json!([{ "id": 1, "name": "AWS" }])).unwrap();
        assert_eq!(certs.len(), 1);
        assert_eq!(certs[0].id, "1");
        assert_eq!(certs[0].name, "AWS");
        assert_eq!(certs[0].email, "");
        assert!(certs[0].badge.is_none());
    }

    #[test]
    fn non_array_is_invalid_argument() {
        let err = mappings_from_value(json!({ "certificateId": 1 })).unwrap_err();
        assert!(matches!(err, ReconError::InvalidArgument(_)));
        assert!(err.to_string().contains("expected a JSON array"));
    }

    #[test]
    fn read_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_certificates(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ReconError::Io(_)));
    }

    #[test]
    fn read_mappings_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mappings.json");
        std::fs::write(&path, r#"[{"_id":"a","certificateId":1,"status":"Pending"}]"#).unwrap();
        let mappings = read_mappings(&path).unwrap();
        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].id, "a");
    }

    #[test]
    fn non_object_elements_are_skipped() {
        let certs = certificates_from_value(json!([{ "id": 1 }, 5, null, { "id": 2 }])).unwrap();
        let ids: Vec<_> = certs.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }
}
