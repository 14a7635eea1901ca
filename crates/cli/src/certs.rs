//! Certificate commands: `certs` (listing and file download), `summary`,
//! `upload`, `renew`, and the offline `reconcile`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use certtrack_client::{Asset, CertClient, NewCertificate, RenewalRequest, Role, Session};
use certtrack_recon::wire::{read_certificates, read_mappings};
use certtrack_recon::{
    expiring_within, find_duplicate_mappings, reconcile, reconcile_for_role, reconcile_history, summarize,
    summarize_mappings, Certificate, DisplayStatus, DuplicateMapping, EnrichedCertificate, PeerMapping,
};
use chrono::NaiveDate;
use clap::ValueEnum;

use crate::auth::{require_role, Context};
use crate::exit_codes::EXIT_RECON_DUPLICATES;
use crate::render::{self, SummaryReport};
use crate::CliError;

const ALL_ROLES: &[Role] = &[Role::Admin, Role::Peer, Role::User];

/// Certificates and mappings visible to the session's role.
///
/// Users: their own certificates against every mapping. Peers: every
/// certificate against their own mappings, restricted to the mapped ones
/// unless `all`. Admins: everything.
fn fetch_view(client: &CertClient, session: &Session, all: bool) -> Result<(Vec<Certificate>, Vec<PeerMapping>), CliError> {
    match session.role {
        Role::Admin => Ok((
            client.all_certificates().map_err(CliError::client)?,
            client.all_mappings().map_err(CliError::client)?,
        )),
        Role::Peer => {
            let mappings = client.my_mappings().map_err(CliError::client)?;
            let mut certificates = client.all_certificates().map_err(CliError::client)?;
            if !all {
                let mapped: HashSet<&str> = mappings.iter().filter_map(|m| m.certificate_id.as_deref()).collect();
                certificates.retain(|c| mapped.contains(c.id.as_str()));
            }
            Ok((certificates, mappings))
        }
        Role::User => {
            if all {
                require_role(session, "certs --all", &[Role::Admin, Role::Peer])?;
            }
            Ok((
                client.certificates_by_email().map_err(CliError::client)?,
                client.all_mappings().map_err(CliError::client)?,
            ))
        }
    }
}

fn select(
    certificates: &[Certificate],
    mappings: &[PeerMapping],
    status: Option<DisplayStatus>,
    history: bool,
) -> Vec<EnrichedCertificate> {
    if history {
        reconcile_history(certificates, mappings)
    } else {
        reconcile_for_role(certificates, mappings, status)
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Warn about shadowed mappings; with `strict`, turn them into an error.
fn check_duplicates(duplicates: &[DuplicateMapping], strict: bool) -> Result<(), CliError> {
    for d in duplicates {
        log::warn!(
            "certificate {} has {} mappings; showing {}, ignoring {}",
            d.certificate_id,
            d.shadowed.len() + 1,
            d.kept,
            d.shadowed.join(", ")
        );
    }
    if strict && !duplicates.is_empty() {
        return Err(CliError {
            code: EXIT_RECON_DUPLICATES,
            message: format!("{} certificate(s) mapped more than once", duplicates.len()),
            hint: Some("only the first mapping of each certificate is shown".into()),
        });
    }
    Ok(())
}

// ── certs ───────────────────────────────────────────────────────────

pub fn cmd_certs(
    ctx: &Context,
    all: bool,
    status: Option<DisplayStatus>,
    history: bool,
    expiring: Option<i64>,
) -> Result<(), CliError> {
    if expiring.is_some_and(|d| d < 0) {
        return Err(CliError::args("--expiring-within must not be negative"));
    }
    let (session, client) = ctx.connect("certs", ALL_ROLES)?;
    let (certificates, mappings) = fetch_view(&client, &session, all)?;

    let mut entries = select(&certificates, &mappings, status, history);
    let today = today();
    if let Some(days) = expiring {
        entries = expiring_within(&entries, today, days);
    }

    let out = render::certificates(&entries, ctx.format, today, ctx.settings.expiry_warning_days)?;
    print!("{}", out);
    Ok(())
}

// ── certs --download ────────────────────────────────────────────────

/// Which stored file of a certificate to download.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StoredFile {
    /// The uploaded certificate PDF
    Pdf,
    /// The PDF attached to the latest renewal request
    RenewalPdf,
    /// The badge image
    Badge,
}

impl StoredFile {
    fn pick(self, certificate: &Certificate) -> Option<(Asset, &str)> {
        let (asset, file) = match self {
            StoredFile::Pdf => (Asset::Pdf, &certificate.pdf_file),
            StoredFile::RenewalPdf => (Asset::Pdf, &certificate.renew_pdf_file),
            StoredFile::Badge => (Asset::Badge, &certificate.badge),
        };
        file.as_deref().filter(|f| !f.trim().is_empty()).map(|f| (asset, f.trim()))
    }

    fn label(self) -> &'static str {
        match self {
            StoredFile::Pdf => "PDF",
            StoredFile::RenewalPdf => "renewal PDF",
            StoredFile::Badge => "badge",
        }
    }
}

/// Where a downloaded file lands: `output` itself, or the stored file name
/// inside it when `output` is a directory.
fn download_target(output: &Path, file: &str) -> PathBuf {
    if output.is_dir() {
        let name = Path::new(file).file_name().map(PathBuf::from).unwrap_or_else(|| PathBuf::from(file));
        output.join(name)
    } else {
        output.to_path_buf()
    }
}

pub fn cmd_download(
    ctx: &Context,
    certificate_id: String,
    which: StoredFile,
    all: bool,
    output: PathBuf,
) -> Result<(), CliError> {
    let certificate_id = certificate_id.trim().to_string();
    let (session, client) = ctx.connect("certs", ALL_ROLES)?;
    let (certificates, _) = fetch_view(&client, &session, all)?;

    let certificate = certificates.iter().find(|c| c.id == certificate_id).ok_or_else(|| {
        CliError::args(format!("no certificate with id {} in your view", certificate_id))
            .with_hint("list certificates with `certtrack certs`")
    })?;
    let (asset, file) = which
        .pick(certificate)
        .ok_or_else(|| CliError::args(format!("certificate {} has no {}", certificate_id, which.label())))?;

    let bytes = client.download(asset, file).map_err(CliError::client)?;
    let target = download_target(&output, file);
    std::fs::write(&target, &bytes).map_err(|e| CliError::io(format!("{}: {}", target.display(), e)))?;
    eprintln!("Saved {} of certificate {} to {} ({} bytes)", which.label(), certificate_id, target.display(), bytes.len());
    Ok(())
}

// ── summary ─────────────────────────────────────────────────────────

pub fn cmd_summary(ctx: &Context, strict: bool) -> Result<(), CliError> {
    let (session, client) = ctx.connect("summary", ALL_ROLES)?;
    let (certificates, mappings) = fetch_view(&client, &session, false)?;

    let summary = summarize(&reconcile(&certificates, &mappings));
    let mapping_summary = (session.role != Role::User).then(|| summarize_mappings(&mappings));
    let duplicates = find_duplicate_mappings(&mappings);

    let report = SummaryReport {
        certificates: &summary,
        mappings: mapping_summary.as_ref(),
        duplicates: &duplicates,
    };
    print!("{}", render::summary(&report, ctx.format)?);
    check_duplicates(&duplicates, strict)
}

// ── upload ──────────────────────────────────────────────────────────

fn parse_date(flag: &str, value: &str) -> Result<NaiveDate, CliError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| CliError::args(format!("{} must be a date in YYYY-MM-DD form, got '{}'", flag, value)))
}

/// Validate the upload form before anything is sent.
fn check_upload(form: &NewCertificate, pdf: &std::path::Path) -> Result<(), CliError> {
    for (flag, value) in [
        ("--name", &form.name),
        ("--track-id", &form.track_id),
        ("--track-url", &form.track_url),
        ("--issued-by", &form.issued_by),
    ] {
        if value.trim().is_empty() {
            return Err(CliError::args(format!("{} must not be empty", flag)));
        }
    }
    let issued = parse_date("--issued-date", &form.issued_date)?;
    let expiry = parse_date("--expiry-date", &form.expiry_date)?;
    if expiry < issued {
        return Err(CliError::args(format!(
            "expiry date {} is before issue date {}",
            form.expiry_date, form.issued_date
        )));
    }
    if !pdf.is_file() {
        return Err(CliError::io(format!("{}: no such file", pdf.display())));
    }
    Ok(())
}

pub fn cmd_upload(ctx: &Context, form: NewCertificate, pdf: PathBuf, badge: Option<PathBuf>) -> Result<(), CliError> {
    check_upload(&form, &pdf)?;
    let (_, client) = ctx.connect("upload", &[Role::User])?;
    client
        .upload_certificate(&form, &pdf, badge.as_deref())
        .map_err(CliError::client)?;
    eprintln!("Uploaded '{}'", form.name);
    Ok(())
}

// ── renew ───────────────────────────────────────────────────────────

pub fn cmd_renew(
    ctx: &Context,
    mapping_id: String,
    pdf: PathBuf,
    reason: String,
    new_expiry: String,
) -> Result<(), CliError> {
    if reason.trim().is_empty() {
        return Err(CliError::args("--reason must not be empty"));
    }
    let expiry = parse_date("--new-expiry", &new_expiry)?;
    if expiry < today() {
        return Err(CliError::args(format!("new expiry date {} is in the past", new_expiry)));
    }
    if !pdf.is_file() {
        return Err(CliError::io(format!("{}: no such file", pdf.display())));
    }

    let (_, client) = ctx.connect("renew", &[Role::User])?;
    let renewal = RenewalRequest {
        pdf: &pdf,
        reason,
        new_expiry_date: expiry.format("%Y-%m-%d").to_string(),
    };
    client.request_renewal(&mapping_id, &renewal).map_err(CliError::client)?;
    eprintln!("Renewal requested for mapping {}", mapping_id.trim());
    Ok(())
}

// ── reconcile (offline) ─────────────────────────────────────────────

pub fn cmd_reconcile(
    ctx: &Context,
    certificates: PathBuf,
    mappings: PathBuf,
    status: Option<DisplayStatus>,
    history: bool,
    strict: bool,
) -> Result<(), CliError> {
    let certificates = read_certificates(&certificates).map_err(CliError::input)?;
    let mappings = read_mappings(&mappings).map_err(CliError::input)?;

    let entries = select(&certificates, &mappings, status, history);
    print!(
        "{}",
        render::certificates(&entries, ctx.format, today(), ctx.settings.expiry_warning_days)?
    );
    check_duplicates(&find_duplicate_mappings(&mappings), strict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use certtrack_recon::ReviewStatus;

    #[test]
    fn history_hides_pending() {
        let certs = vec![Certificate::new("1", "a"), Certificate::new("2", "b"), Certificate::new("3", "c")];
        let mappings = vec![
            PeerMapping::new("m1", "1"),
            PeerMapping::new("m2", "2").with_status(ReviewStatus::Rejected),
        ];
        let ids = |v: Vec<EnrichedCertificate>| v.into_iter().map(|e| e.certificate.id).collect::<Vec<_>>();
        assert_eq!(ids(select(&certs, &mappings, None, true)), vec!["2", "3"]);
        assert_eq!(ids(select(&certs, &mappings, Some(DisplayStatus::Pending), false)), vec!["1"]);
        assert_eq!(ids(select(&certs, &mappings, None, false)), vec!["1", "2", "3"]);
    }

    #[test]
    fn stored_file_selection() {
        let mut c = Certificate::new("1", "AWS");
        c.pdf_file = Some("aws.pdf".into());
        c.badge = Some("  ".into());
        assert_eq!(StoredFile::Pdf.pick(&c), Some((Asset::Pdf, "aws.pdf")));
        assert_eq!(StoredFile::Badge.pick(&c), None);
        assert_eq!(StoredFile::RenewalPdf.pick(&c), None);

        c.renew_pdf_file = Some("aws-2027.pdf".into());
        assert_eq!(StoredFile::RenewalPdf.pick(&c), Some((Asset::Pdf, "aws-2027.pdf")));
    }

    #[test]
    fn download_lands_in_directory_or_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(download_target(dir.path(), "aws.pdf"), dir.path().join("aws.pdf"));
        let file = dir.path().join("copy.pdf");
        assert_eq!(download_target(&file, "aws.pdf"), file);
    }

    #[test]
    fn strict_duplicates_fail() {
        let dups = find_duplicate_mappings(&[PeerMapping::new("a", "1"), PeerMapping::new("b", "1")]);
        assert!(check_duplicates(&dups, false).is_ok());
        let err = check_duplicates(&dups, true).unwrap_err();
        assert_eq!(err.code, EXIT_RECON_DUPLICATES);
        assert!(check_duplicates(&[], true).is_ok());
    }

    fn form() -> NewCertificate {
        NewCertificate {
            name: "CKA".into(),
            track_id: "LF-123".into(),
            track_url: "https://training.linuxfoundation.org/verify/LF-123".into(),
            issued_by: "Linux Foundation".into(),
            issued_date: "2025-01-10".into(),
            expiry_date: "2028-01-10".into(),
        }
    }

    #[test]
    fn upload_form_validation() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("cka.pdf");
        std::fs::write(&pdf, b"%PDF").unwrap();

        assert!(check_upload(&form(), &pdf).is_ok());

        let err = check_upload(&NewCertificate { expiry_date: "2024-12-31".into(), ..form() }, &pdf).unwrap_err();
        assert!(err.message.contains("before issue date"));

        let err = check_upload(&NewCertificate { issued_date: "10/01/2025".into(), ..form() }, &pdf).unwrap_err();
        assert!(err.message.starts_with("--issued-date"));

        let err = check_upload(&NewCertificate { track_id: " ".into(), ..form() }, &pdf).unwrap_err();
        assert_eq!(err.message, "--track-id must not be empty");

        let err = check_upload(&form(), &dir.path().join("missing.pdf")).unwrap_err();
        assert_eq!(err.code, crate::exit_codes::EXIT_INPUT_IO);
    }
}
