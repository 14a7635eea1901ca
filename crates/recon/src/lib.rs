//! `certtrack-recon`: certificate / peer-mapping reconciliation.
//!
//! Pure crate: receives normalized certificates and mappings, returns
//! display-ready views. No network or session dependencies; records from the
//! services are normalized in [`wire`] before they get here.

pub mod enrich;
pub mod error;
pub mod model;
pub mod reconcile;
pub mod summary;
pub mod wire;

pub use enrich::{enrich_mappings, expiring_within, mapped_peers, renewal_queue, review_queue};
pub use error::ReconError;
pub use model::{
    Certificate, DisplayStatus, DuplicateMapping, EnrichedCertificate, EnrichedMapping, PeerMapping,
    Profile, ReviewStatus, StatusSummary,
};
pub use reconcile::{reconcile, reconcile_for_role, reconcile_history};
pub use summary::{find_duplicate_mappings, summarize, summarize_mappings};
