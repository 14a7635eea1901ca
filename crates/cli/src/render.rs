//! Output rendering for list commands: aligned tables, JSON, CSV.

use certtrack_config::OutputFormat;
use certtrack_recon::summary;
use certtrack_recon::{DuplicateMapping, EnrichedCertificate, EnrichedMapping, Profile, StatusSummary};
use chrono::NaiveDate;
use serde::Serialize;

use crate::util;
use crate::CliError;

/// Widest a table column gets before cells are truncated.
const MAX_COLUMN: usize = 36;

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, CliError> {
    let mut s = serde_json::to_string_pretty(value).map_err(|e| CliError::io(e.to_string()))?;
    s.push('\n');
    Ok(s)
}

fn to_csv(headers: &[&str], rows: &[Vec<String>]) -> Result<String, CliError> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(headers).map_err(|e| CliError::io(e.to_string()))?;
    for row in rows {
        writer.write_record(row).map_err(|e| CliError::io(e.to_string()))?;
    }
    let bytes = writer.into_inner().map_err(|e| CliError::io(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| CliError::io(e.to_string()))
}

fn or_dash(s: &str) -> String {
    if s.trim().is_empty() {
        "-".to_string()
    } else {
        s.to_string()
    }
}

/// Expiry cell: the date, flagged when it falls inside the warning window.
fn expiry_cell(e: &EnrichedCertificate, today: NaiveDate, warn_days: i64) -> String {
    match e.certificate.days_until_expiry(today) {
        Some(d) if d < 0 => format!("{} (expired)", e.certificate.expiry_date),
        Some(d) if d <= warn_days => format!("{} ({}d)", e.certificate.expiry_date, d),
        _ => or_dash(&e.certificate.expiry_date),
    }
}

// ── Certificates ────────────────────────────────────────────────────

pub fn certificates(
    entries: &[EnrichedCertificate],
    format: OutputFormat,
    today: NaiveDate,
    warn_days: i64,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Json => to_json(entries),
        OutputFormat::Csv => {
            let rows: Vec<Vec<String>> = entries
                .iter()
                .map(|e| {
                    let c = &e.certificate;
                    vec![
                        c.id.clone(),
                        c.name.clone(),
                        c.email.clone(),
                        c.track_id.clone(),
                        c.issued_by.clone(),
                        c.issued_date.clone(),
                        c.expiry_date.clone(),
                        e.status.to_string(),
                        e.comment.clone(),
                    ]
                })
                .collect();
            to_csv(
                &["id", "name", "email", "trackId", "issuedBy", "issuedDate", "expiryDate", "status", "comment"],
                &rows,
            )
        }
        OutputFormat::Table => {
            let rows: Vec<Vec<String>> = entries
                .iter()
                .map(|e| {
                    vec![
                        or_dash(&e.certificate.id),
                        e.certificate.name.clone(),
                        or_dash(&e.certificate.issued_by),
                        expiry_cell(e, today, warn_days),
                        e.status.to_string(),
                        e.comment.clone(),
                    ]
                })
                .collect();
            Ok(util::table(&["ID", "NAME", "ISSUED BY", "EXPIRES", "STATUS", "COMMENT"], &rows, MAX_COLUMN))
        }
    }
}

// ── Mappings ────────────────────────────────────────────────────────

pub fn mappings(entries: &[EnrichedMapping], format: OutputFormat) -> Result<String, CliError> {
    let renewal = |m: &EnrichedMapping| -> String {
        if !m.mapping.renewal_requested {
            return String::new();
        }
        match &m.mapping.new_expiry_date {
            Some(d) => format!("renew -> {d}"),
            None => "renew".to_string(),
        }
    };

    match format {
        OutputFormat::Json => to_json(entries),
        OutputFormat::Csv => {
            let rows: Vec<Vec<String>> = entries
                .iter()
                .map(|m| {
                    vec![
                        m.mapping.id.clone(),
                        m.mapping.certificate_id.clone().unwrap_or_default(),
                        m.certificate_name.clone(),
                        m.username.clone(),
                        m.mapping.peer_email.clone(),
                        m.mapping.effective_status().to_string(),
                        m.mapping.renewal_requested.to_string(),
                        m.mapping.new_expiry_date.clone().unwrap_or_default(),
                        m.expiry_date.clone(),
                    ]
                })
                .collect();
            to_csv(
                &[
                    "id", "certificateId", "certificateName", "username", "peerEmail",
                    "status", "renewalRequested", "newExpiryDate", "expiryDate",
                ],
                &rows,
            )
        }
        OutputFormat::Table => {
            let rows: Vec<Vec<String>> = entries
                .iter()
                .map(|m| {
                    vec![
                        m.mapping.id.clone(),
                        m.certificate_name.clone(),
                        m.username.clone(),
                        or_dash(&m.mapping.peer_email),
                        m.expiry_date.clone(),
                        m.mapping.effective_status().to_string(),
                        renewal(m),
                    ]
                })
                .collect();
            Ok(util::table(
                &["MAPPING", "CERTIFICATE", "OWNER", "PEER", "EXPIRES", "STATUS", "RENEWAL"],
                &rows,
                MAX_COLUMN,
            ))
        }
    }
}

// ── Accounts ────────────────────────────────────────────────────────

pub fn profiles(entries: &[Profile], format: OutputFormat) -> Result<String, CliError> {
    let row = |p: &Profile| -> Vec<String> {
        vec![
            p.name.clone(),
            p.email.clone(),
            p.role.clone().unwrap_or_default(),
            p.dept.clone().unwrap_or_default(),
        ]
    };
    match format {
        OutputFormat::Json => to_json(entries),
        OutputFormat::Csv => to_csv(&["name", "email", "role", "dept"], &entries.iter().map(row).collect::<Vec<_>>()),
        OutputFormat::Table => Ok(util::table(
            &["NAME", "EMAIL", "ROLE", "DEPT"],
            &entries.iter().map(row).collect::<Vec<_>>(),
            MAX_COLUMN,
        )),
    }
}

// ── Summary ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct SummaryReport<'a> {
    pub certificates: &'a StatusSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mappings: Option<&'a StatusSummary>,
    pub duplicates: &'a [DuplicateMapping],
}

pub fn summary(report: &SummaryReport<'_>, format: OutputFormat) -> Result<String, CliError> {
    let counts = |s: &StatusSummary| -> Vec<String> {
        vec![
            s.total.to_string(),
            s.pending.to_string(),
            s.verified.to_string(),
            s.rejected.to_string(),
            s.not_mapped.to_string(),
        ]
    };

    match format {
        OutputFormat::Json => to_json(report),
        OutputFormat::Csv => {
            let mut rows = vec![[vec!["certificates".to_string()], counts(report.certificates)].concat()];
            if let Some(m) = report.mappings {
                rows.push([vec!["mappings".to_string()], counts(m)].concat());
            }
            to_csv(&["scope", "total", "pending", "verified", "rejected", "notMapped"], &rows)
        }
        OutputFormat::Table => {
            let s = report.certificates;
            let mut out = String::new();
            out.push_str(&format!("certificates  {}\n", s.total));
            out.push_str(&format!("  verified    {}\n", s.verified));
            out.push_str(&format!("  rejected    {}\n", s.rejected));
            out.push_str(&format!("  pending     {}\n", s.pending));
            out.push_str(&format!("  not mapped  {}\n", s.not_mapped));
            if let Some(ratio) = summary::verified_ratio(s) {
                out.push_str(&format!("  verified    {:.0}% of mapped\n", ratio));
            }
            if s.total > 0 && summary::all_decided(s) {
                out.push_str("  every certificate has a decision\n");
            }
            if let Some(m) = report.mappings {
                out.push_str(&format!(
                    "mappings      {} ({} pending, {} verified, {} rejected)\n",
                    m.total, m.pending, m.verified, m.rejected
                ));
            }
            for d in report.duplicates {
                out.push_str(&format!(
                    "duplicate     certificate {} mapped {} times (kept {}, shadowed {})\n",
                    d.certificate_id,
                    d.shadowed.len() + 1,
                    d.kept,
                    d.shadowed.join(", ")
                ));
            }
            Ok(out)
        }
    }
}
