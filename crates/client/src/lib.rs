//! Service API client for the user service and the certificate service.
//!
//! This crate is the single source of truth for both wire contracts: login,
//! registration, profiles, account management, certificates (and their stored
//! files) and peer mappings. The session is an explicit value: callers load it
//! (or get it from `login`) and hand it to the client.
//!
//! No UI concepts. No retries. No caching.

mod client;
mod session;

pub use client::{
    Asset, CertClient, ClientError, NewAccount, NewCertificate, ProfileUpdate, RenewalRequest, ServiceEndpoints,
    DEFAULT_TIMEOUT,
};
pub use session::{
    delete_session, delete_session_at, load_session, load_session_from, save_session,
    save_session_to, session_file_path, Role, Session,
};
