//! Mapping-centric views: what a peer sees when reviewing the certificates
//! assigned to them.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;

use crate::model::{
    Certificate, EnrichedCertificate, EnrichedMapping, PeerMapping, Profile, ReviewStatus, UNKNOWN,
};

const NO_USERNAME: &str = "na";

/// Attach each mapping's certificate, in mapping order.
///
/// A mapping whose certificate is not in `certificates` still appears, with
/// `"Unknown"` placeholders and no assets.
pub fn enrich_mappings(mappings: &[PeerMapping], certificates: &[Certificate]) -> Vec<EnrichedMapping> {
    let mut by_id: HashMap<&str, &Certificate> = HashMap::with_capacity(certificates.len());
    for c in certificates {
        if !c.id.is_empty() {
            by_id.entry(c.id.as_str()).or_insert(c);
        }
    }

    mappings
        .iter()
        .map(|m| {
            let cert = m.certificate_id.as_deref().and_then(|id| by_id.get(id).copied());
            match cert {
                Some(c) => EnrichedMapping {
                    mapping: m.clone(),
                    certificate_name: c.name.clone(),
                    username: c.email.clone(),
                    track_id: c.track_id.clone(),
                    track_url: c.track_url.clone(),
                    issued_date: c.issued_date.clone(),
                    expiry_date: c.expiry_date.clone(),
                    badge: c.badge.clone(),
                    pdf_file: c.pdf_file.clone(),
                    renew_pdf_file: c.renew_pdf_file.clone(),
                },
                None => EnrichedMapping {
                    mapping: m.clone(),
                    certificate_name: UNKNOWN.to_string(),
                    username: NO_USERNAME.to_string(),
                    track_id: UNKNOWN.to_string(),
                    track_url: UNKNOWN.to_string(),
                    issued_date: UNKNOWN.to_string(),
                    expiry_date: UNKNOWN.to_string(),
                    badge: None,
                    pdf_file: None,
                    renew_pdf_file: None,
                },
            }
        })
        .collect()
}

/// Mappings still awaiting a decision.
pub fn review_queue(enriched: &[EnrichedMapping]) -> Vec<EnrichedMapping> {
    enriched
        .iter()
        .filter(|e| e.mapping.effective_status() == ReviewStatus::Pending)
        .cloned()
        .collect()
}

/// Pending renewal requests.
pub fn renewal_queue(enriched: &[EnrichedMapping]) -> Vec<EnrichedMapping> {
    enriched
        .iter()
        .filter(|e| e.mapping.renewal_requested && e.mapping.effective_status() == ReviewStatus::Pending)
        .cloned()
        .collect()
}

/// Peers that review at least one of `mappings`, in `peers` order.
pub fn mapped_peers(peers: &[Profile], mappings: &[PeerMapping]) -> Vec<Profile> {
    let emails: HashSet<&str> = mappings.iter().map(|m| m.peer_email.as_str()).collect();
    peers
        .iter()
        .filter(|p| emails.contains(p.email.as_str()))
        .cloned()
        .collect()
}

/// Entries whose certificate expires between `today` and `today + days`
/// inclusive. Already-expired and undated certificates are excluded.
pub fn expiring_within(enriched: &[EnrichedCertificate], today: NaiveDate, days: i64) -> Vec<EnrichedCertificate> {
    enriched
        .iter()
        .filter(|e| {
            e.certificate
                .days_until_expiry(today)
                .is_some_and(|left| (0..=days).contains(&left))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::reconcile;

    fn cert(id: &str, name: &str, email: &str) -> Certificate {
        let mut c = Certificate::new(id, name);
        c.email = email.into();
        c.track_id = format!("T-{id}");
        c.pdf_file = Some(format!("{id}.pdf"));
        c
    }

    fn profile(email: &str) -> Profile {
        Profile {
            name: email.split('@').next().unwrap_or_default().to_string(),
            email: email.into(),
            role: Some("peer".into()),
            dept: None,
            phone: None,
            profile_pic: None,
        }
    }

    #[test]
    fn known_certificate_fields_are_copied() {
        let certs = vec![cert("1", "AWS", "ann@example.com")];
        let mappings = vec![PeerMapping::new("m1", "1").with_peer("bob@example.com", "Bob")];
        let out = enrich_mappings(&mappings, &certs);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].certificate_name, "AWS");
        assert_eq!(out[0].username, "ann@example.com");
        assert_eq!(out[0].track_id, "T-1");
        assert_eq!(out[0].pdf_file.as_deref(), Some("1.pdf"));
        assert_eq!(out[0].mapping.id, "m1");
    }

    #[test]
    fn unknown_certificate_placeholders() {
        let out = enrich_mappings(&[PeerMapping::new("m1", "404")], &[]);
        assert_eq!(out[0].certificate_name, "Unknown");
        assert_eq!(out[0].username, "na");
        assert_eq!(out[0].expiry_date, "Unknown");
        assert!(out[0].badge.is_none());
    }

    #[test]
    fn queues() {
        let certs = vec![cert("1", "AWS", "a@x"), cert("2", "GCP", "b@x")];
        let mut renewal = PeerMapping::new("m2", "2").with_status(ReviewStatus::Pending);
        renewal.renewal_requested = true;
        let mappings = vec![
            PeerMapping::new("m1", "1"),
            renewal,
            PeerMapping::new("m3", "1").with_status(ReviewStatus::Verified),
        ];
        let enriched = enrich_mappings(&mappings, &certs);

        let queue: Vec<_> = review_queue(&enriched).into_iter().map(|e| e.mapping.id).collect();
        assert_eq!(queue, vec!["m1", "m2"]);

        let renewals: Vec<_> = renewal_queue(&enriched).into_iter().map(|e| e.mapping.id).collect();
        assert_eq!(renewals, vec!["m2"]);
    }

    #[test]
    fn mapped_peers_keeps_peer_order() {
        let peers = vec![profile("z@x"), profile("a@x"), profile("m@x")];
        let mappings = vec![
            PeerMapping::new("m1", "1").with_peer("m@x", "M"),
            PeerMapping::new("m2", "2").with_peer("z@x", "Z"),
        ];
        let out: Vec<_> = mapped_peers(&peers, &mappings).into_iter().map(|p| p.email).collect();
        assert_eq!(out, vec!["z@x", "m@x"]);
    }

    #[test]
    fn expiry_window() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let mut soon = cert("1", "soon", "");
        soon.expiry_date = "2026-01-20".into();
        let mut later = cert("2", "later", "");
        later.expiry_date = "2026-06-01".into();
        let mut expired = cert("3", "expired", "");
        expired.expiry_date = "2025-12-01".into();
        let undated = cert("4", "undated", "");

        let enriched = reconcile(&[soon, later, expired, undated], &[]);
        let names: Vec<_> = expiring_within(&enriched, today, 30)
            .into_iter()
            .map(|e| e.certificate.name)
            .collect();
        assert_eq!(names, vec!["soon"]);
    }
}
