use std::collections::HashMap;

use crate::model::{DisplayStatus, DuplicateMapping, EnrichedCertificate, PeerMapping, StatusSummary};

fn count(summary: &mut StatusSummary, status: DisplayStatus) {
    summary.total += 1;
    match status {
        DisplayStatus::Pending => summary.pending += 1,
        DisplayStatus::Verified => summary.verified += 1,
        DisplayStatus::Rejected => summary.rejected += 1,
        DisplayStatus::NotMapped => summary.not_mapped += 1,
    }
}

/// Compute status counts over a reconciled certificate list.
pub fn summarize(enriched: &[EnrichedCertificate]) -> StatusSummary {
    let mut summary = StatusSummary::default();
    for e in enriched {
        count(&mut summary, e.status);
    }
    summary
}

/// Status counts over raw mappings. A mapping without a status counts as Pending.
pub fn summarize_mappings(mappings: &[PeerMapping]) -> StatusSummary {
    let mut summary = StatusSummary::default();
    for m in mappings {
        count(&mut summary, DisplayStatus::from(m.effective_status()));
    }
    summary
}

/// Certificates referenced by more than one mapping, in order of first
/// appearance. Reconciliation keeps the first mapping and hides the rest.
pub fn find_duplicate_mappings(mappings: &[PeerMapping]) -> Vec<DuplicateMapping> {
    let mut order: Vec<DuplicateMapping> = Vec::new();
    let mut slot: HashMap<&str, usize> = HashMap::new();

    for m in mappings {
        let Some(cert_id) = m.certificate_id.as_deref() else {
            continue;
        };
        match slot.get(cert_id) {
            Some(&i) => order[i].shadowed.push(m.id.clone()),
            None => {
                slot.insert(cert_id, order.len());
                order.push(DuplicateMapping {
                    certificate_id: cert_id.to_string(),
                    kept: m.id.clone(),
                    shadowed: Vec::new(),
                });
            }
        }
    }

    order.retain(|d| !d.shadowed.is_empty());
    order
}

/// True when every certificate has reached a final decision.
pub fn all_decided(summary: &StatusSummary) -> bool {
    summary.pending == 0 && summary.not_mapped == 0
}

/// Share of mapped certificates that were verified, in percent.
pub fn verified_ratio(summary: &StatusSummary) -> Option<f64> {
    let mapped = summary.total - summary.not_mapped;
    if mapped == 0 {
        return None;
    }
    Some(summary.verified as f64 * 100.0 / mapped as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Certificate, ReviewStatus};
    use crate::reconcile::reconcile;

    #[test]
    fn summary_counts() {
        let certs: Vec<_> = ["1", "2", "3", "4", "5"].iter().map(|id| Certificate::new(*id, *id)).collect();
        let mappings = vec![
            PeerMapping::new("a", "1").with_status(ReviewStatus::Verified),
            PeerMapping::new("b", "2").with_status(ReviewStatus::Verified),
            PeerMapping::new("c", "3").with_status(ReviewStatus::Rejected),
            PeerMapping::new("d", "4"),
        ];
        let summary = summarize(&reconcile(&certs, &mappings));
        assert_eq!(summary.total, 5);
        assert_eq!(summary.verified, 2);
        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.pending, 1);
        assert_eq!(summary.not_mapped, 1);
        assert!(!all_decided(&summary));
        assert_eq!(verified_ratio(&summary), Some(50.0));
    }

    #[test]
    fn mapping_summary_defaults_to_pending() {
        let mappings = vec![
            PeerMapping::new("a", "1"),
            PeerMapping::new("b", "2").with_status(ReviewStatus::Pending),
            PeerMapping::new("c", "3").with_status(ReviewStatus::Verified),
        ];
        let summary = summarize_mappings(&mappings);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.pending, 2);
        assert_eq!(summary.verified, 1);
        assert_eq!(summary.not_mapped, 0);
    }

    #[test]
    fn empty_summary_has_no_ratio() {
        let summary = summarize(&[]);
        assert_eq!(summary, StatusSummary::default());
        assert!(all_decided(&summary));
        assert_eq!(verified_ratio(&summary), None);
    }

    #[test]
    fn duplicates_reported_in_first_seen_order() {
        let mappings = vec![
            PeerMapping::new("a", "2"),
            PeerMapping::new("b", "1"),
            PeerMapping::new("c", "2"),
            PeerMapping::new("d", "3"),
            PeerMapping::new("e", "2"),
            PeerMapping::new("f", "1"),
        ];
        let dups = find_duplicate_mappings(&mappings);
        assert_eq!(dups.len(), 2);
        assert_eq!(dups[0].certificate_id, "2");
        assert_eq!(dups[0].kept, "a");
        assert_eq!(dups[0].shadowed, vec!["c", "e"]);
        assert_eq!(dups[1].certificate_id, "1");
        assert_eq!(dups[1].kept, "b");
        assert_eq!(dups[1].shadowed, vec!["f"]);
    }

    #[test]
    fn no_duplicates() {
        let mappings = vec![PeerMapping::new("a", "1"), PeerMapping::new("b", "2")];
        assert!(find_duplicate_mappings(&mappings).is_empty());
    }
}
