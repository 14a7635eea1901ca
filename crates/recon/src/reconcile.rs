use std::collections::HashMap;

use crate::model::{Certificate, DisplayStatus, EnrichedCertificate, PeerMapping, NO_COMMENT};

/// Index mappings by certificate id. The first mapping seen for an id wins;
/// later ones are shadowed. Mappings without a usable reference are skipped.
pub(crate) fn index_mappings(mappings: &[PeerMapping]) -> HashMap<&str, &PeerMapping> {
    let mut index: HashMap<&str, &PeerMapping> = HashMap::with_capacity(mappings.len());
    for m in mappings {
        if let Some(cert_id) = m.certificate_id.as_deref() {
            index.entry(cert_id).or_insert(m);
        }
    }
    index
}

fn enrich(cert: &Certificate, mapping: Option<&PeerMapping>) -> EnrichedCertificate {
    let (status, comment) = match mapping {
        None => (DisplayStatus::NotMapped, NO_COMMENT.to_string()),
        Some(m) => (
            DisplayStatus::from(m.effective_status()),
            m.comment.clone().unwrap_or_else(|| NO_COMMENT.to_string()),
        ),
    };
    EnrichedCertificate {
        certificate: cert.clone(),
        status,
        comment,
    }
}

/// Join certificates with their peer mapping and derive display status.
///
/// Total over `certificates`: one output per input, same order. A
/// certificate with no mapping is "Not mapped to peer" / "No comment"; a
/// mapped one takes the mapping's status (Pending when unset) and comment
/// ("No comment" when unset). When several mappings reference the same
/// certificate the first one wins.
pub fn reconcile(certificates: &[Certificate], mappings: &[PeerMapping]) -> Vec<EnrichedCertificate> {
    let index = index_mappings(mappings);
    certificates
        .iter()
        .map(|c| {
            let mapping = if c.id.is_empty() {
                None
            } else {
                index.get(c.id.as_str()).copied()
            };
            enrich(c, mapping)
        })
        .collect()
}

/// [`reconcile`], keeping only entries whose status equals `filter_status`
/// when one is given.
pub fn reconcile_for_role(
    certificates: &[Certificate],
    mappings: &[PeerMapping],
    filter_status: Option<DisplayStatus>,
) -> Vec<EnrichedCertificate> {
    let enriched = reconcile(certificates, mappings);
    match filter_status {
        None => enriched,
        Some(status) => enriched.into_iter().filter(|e| e.status == status).collect(),
    }
}

/// [`reconcile`] without the Pending entries (history views).
pub fn reconcile_history(certificates: &[Certificate], mappings: &[PeerMapping]) -> Vec<EnrichedCertificate> {
    reconcile(certificates, mappings)
        .into_iter()
        .filter(|e| e.status != DisplayStatus::Pending)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ReviewStatus;

    fn certs(ids: &[&str]) -> Vec<Certificate> {
        ids.iter().map(|id| Certificate::new(*id, format!("cert {id}"))).collect()
    }

    #[test]
    fn empty_inputs() {
        assert!(reconcile(&[], &[]).is_empty());
        let out = reconcile(&certs(&["1"]), &[]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].status, DisplayStatus::NotMapped);
        assert_eq!(out[0].comment, "No comment");
    }

    #[test]
    fn mapped_defaults() {
        let mappings = vec![PeerMapping::new("m1", "1")];
        let out = reconcile(&certs(&["1"]), &mappings);
        assert_eq!(out[0].status, DisplayStatus::Pending);
        assert_eq!(out[0].comment, "No comment");
    }

    #[test]
    fn empty_comment_is_kept() {
        let mappings = vec![PeerMapping::new("m1", "1").with_comment("")];
        let out = reconcile(&certs(&["1"]), &mappings);
        assert_eq!(out[0].comment, "");
    }

    #[test]
    fn first_match_wins() {
        let mappings = vec![
            PeerMapping::new("m1", "1").with_status(ReviewStatus::Verified),
            PeerMapping::new("m2", "1").with_status(ReviewStatus::Rejected),
        ];
        let out = reconcile(&certs(&["1"]), &mappings);
        assert_eq!(out[0].status, DisplayStatus::Verified);
    }

    #[test]
    fn unreferenced_mapping_matches_nothing() {
        let mut orphan = PeerMapping::new("m1", "1");
        orphan.certificate_id = None;
        let out = reconcile(&certs(&["1", ""]), &[orphan]);
        assert!(out.iter().all(|e| e.status == DisplayStatus::NotMapped));
    }

    #[test]
    fn filter_and_history() {
        let mappings = vec![
            PeerMapping::new("m1", "1").with_status(ReviewStatus::Pending),
            PeerMapping::new("m2", "2").with_status(ReviewStatus::Verified),
            PeerMapping::new("m3", "4"),
        ];
        let input = certs(&["1", "2", "3", "4"]);

        let pending = reconcile_for_role(&input, &mappings, Some(DisplayStatus::Pending));
        let ids: Vec<_> = pending.iter().map(|e| e.certificate.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "4"]);

        let all = reconcile_for_role(&input, &mappings, None);
        assert_eq!(all, reconcile(&input, &mappings));

        let history = reconcile_history(&input, &mappings);
        let ids: Vec<_> = history.iter().map(|e| e.certificate.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3"]);
    }

    #[test]
    fn inputs_untouched() {
        let input = certs(&["1", "2"]);
        let mappings = vec![PeerMapping::new("m1", "2").with_status(ReviewStatus::Rejected)];
        let before = (input.clone(), mappings.clone());
        let _ = reconcile(&input, &mappings);
        assert_eq!((input, mappings), before);
    }
}
