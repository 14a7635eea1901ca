use std::path::PathBuf;

use certtrack_recon::wire::{read_certificates, read_mappings};
use certtrack_recon::{
    enrich_mappings, find_duplicate_mappings, reconcile, reconcile_for_role, reconcile_history,
    renewal_queue, review_queue, summarize, Certificate, DisplayStatus, PeerMapping,
};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load() -> (Vec<Certificate>, Vec<PeerMapping>) {
    let dir = fixtures_dir();
    let certs = read_certificates(&dir.join("certificates.json")).unwrap();
    let mappings = read_mappings(&dir.join("mappings.json")).unwrap();
    (certs, mappings)
}

// -------------------------------------------------------------------------
// Certificate view
// -------------------------------------------------------------------------

#[test]
fn fixture_reconciles_every_certificate() {
    let (certs, mappings) = load();
    let out = reconcile(&certs, &mappings);

    assert_eq!(out.len(), certs.len());
    let statuses: Vec<_> = out.iter().map(|e| e.status).collect();
    assert_eq!(
        statuses,
        vec![
            DisplayStatus::Verified,
            DisplayStatus::Pending,
            DisplayStatus::Pending,
            DisplayStatus::NotMapped,
            DisplayStatus::NotMapped,
        ]
    );
    assert_eq!(out[0].comment, "Checked against issuer portal");
    assert_eq!(out[1].comment, "No comment");
    assert_eq!(out[1].certificate.track_id, "77123");
    assert_eq!(out[4].certificate.name, "Legacy import without id");
}

#[test]
fn fixture_duplicate_is_shadowed_and_reported() {
    let (certs, mappings) = load();
    let out = reconcile(&certs, &mappings);
    // mapping 91 also points at certificate 1 but comes later
    assert_eq!(out[0].status, DisplayStatus::Verified);

    let dups = find_duplicate_mappings(&mappings);
    assert_eq!(dups.len(), 1);
    assert_eq!(dups[0].certificate_id, "1");
    assert_eq!(dups[0].kept, "66b0c1a1");
    assert_eq!(dups[0].shadowed, vec!["91".to_string()]);
}

#[test]
fn fixture_role_views() {
    let (certs, mappings) = load();

    let pending = reconcile_for_role(&certs, &mappings, Some(DisplayStatus::Pending));
    let names: Vec<_> = pending.iter().map(|e| e.certificate.name.as_str()).collect();
    assert_eq!(names, vec!["Azure Fundamentals", "CKA"]);

    let history = reconcile_history(&certs, &mappings);
    assert_eq!(history.len(), 3);
    assert!(history.iter().all(|e| e.status != DisplayStatus::Pending));

    let summary = summarize(&reconcile(&certs, &mappings));
    assert_eq!(summary.total, 5);
    assert_eq!(summary.verified, 1);
    assert_eq!(summary.pending, 2);
    assert_eq!(summary.rejected, 0);
    assert_eq!(summary.not_mapped, 2);
}

#[test]
fn end_to_end_example() {
    let certs = certtrack_recon::wire::certificates_from_json(
        r#"[{"id":1,"name":"AWS"},{"id":2,"name":"Azure"}]"#,
    )
    .unwrap();
    let mappings = certtrack_recon::wire::mappings_from_json(
        r#"[{"certificateId":1,"status":"Verified","comment":"ok"}]"#,
    )
    .unwrap();

    let out = reconcile(&certs, &mappings);
    let json = serde_json::to_value(&out).unwrap();

    assert_eq!(json[0]["id"], "1");
    assert_eq!(json[0]["name"], "AWS");
    assert_eq!(json[0]["status"], "Verified");
    assert_eq!(json[0]["comment"], "ok");
    assert_eq!(json[1]["id"], "2");
    assert_eq!(json[1]["name"], "Azure");
    assert_eq!(json[1]["status"], "Not mapped to peer");
    assert_eq!(json[1]["comment"], "No comment");
}

// -------------------------------------------------------------------------
// Peer view
// -------------------------------------------------------------------------

#[test]
fn fixture_peer_queues() {
    let (certs, mappings) = load();
    let enriched = enrich_mappings(&mappings, &certs);
    assert_eq!(enriched.len(), mappings.len());

    let orphan = enriched.iter().find(|e| e.mapping.id == "66b0c1a5").unwrap();
    assert_eq!(orphan.certificate_name, "Unknown");
    assert_eq!(orphan.username, "na");

    let queue: Vec<_> = review_queue(&enriched).into_iter().map(|e| e.mapping.id).collect();
    assert_eq!(queue, vec!["66b0c1a2", "66b0c1a3", "66b0c1a5"]);

    let renewals = renewal_queue(&enriched);
    assert_eq!(renewals.len(), 1);
    assert_eq!(renewals[0].certificate_name, "CKA");
    assert_eq!(renewals[0].renew_pdf_file.as_deref(), Some("cka-renewal.pdf"));
    assert_eq!(renewals[0].mapping.new_expiry_date.as_deref(), Some("2028-01-15"));
}

#[test]
fn enriched_mapping_serializes_flat() {
    let (certs, mappings) = load();
    let enriched = enrich_mappings(&mappings[..1], &certs);
    let json = serde_json::to_value(&enriched[0]).unwrap();
    assert_eq!(json["id"], "66b0c1a1");
    assert_eq!(json["certificateId"], "1");
    assert_eq!(json["certificateName"], "AWS Solutions Architect");
    assert_eq!(json["username"], "ann@example.com");
    assert_eq!(json["status"], "Verified");
}
