//! Session storage.
//!
//! Reads/writes ~/.config/certtrack/session.json (0600 on Unix). Written at
//! login, removed at logout, and handed explicitly to [`crate::CertClient`];
//! nothing else reads it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Account role as issued by the user service at login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Peer,
    User,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "peer" => Some(Self::Peer),
            "user" => Some(Self::User),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Peer => "peer",
            Self::User => "user",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authenticated session against both services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque bearer token
    pub token: String,
    pub role: Role,
    pub email: String,
    /// User service base URL the token was issued by
    pub user_api: String,
    /// Certificate service base URL
    pub cert_api: String,
}

impl Session {
    /// Token with everything but the last four characters masked, for display.
    pub fn masked_token(&self) -> String {
        let chars: Vec<char> = self.token.chars().collect();
        if chars.len() <= 4 {
            return "****".into();
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("****{tail}")
    }
}

/// Returns the path to the session file.
pub fn session_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|c| c.join("certtrack/session.json"))
}

/// Load the saved session.
/// Returns None if no session is saved or if the file is invalid.
pub fn load_session() -> Option<Session> {
    load_session_from(&session_file_path()?)
}

pub fn load_session_from(path: &Path) -> Option<Session> {
    let contents = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&contents) {
        Ok(session) => Some(session),
        Err(e) => {
            log::warn!("ignoring unreadable session file {}: {}", path.display(), e);
            None
        }
    }
}

/// Save the session to disk.
pub fn save_session(session: &Session) -> Result<(), String> {
    let path = session_file_path().ok_or("Could not determine config directory")?;
    save_session_to(session, &path)
}

/// Creates the parent directory if it doesn't exist.
/// Sets 0600 permissions on Unix.
pub fn save_session_to(session: &Session, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }

    let contents = serde_json::to_string_pretty(session)
        .map_err(|e| format!("Failed to serialize session: {}", e))?;

    std::fs::write(path, &contents)
        .map_err(|e| format!("Failed to write session file: {}", e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions)
            .map_err(|e| format!("Failed to set file permissions: {}", e))?;
    }

    Ok(())
}

/// Delete the saved session.
pub fn delete_session() -> Result<(), String> {
    let Some(path) = session_file_path() else {
        return Ok(());
    };
    delete_session_at(&path)
}

pub fn delete_session_at(path: &Path) -> Result<(), String> {
    if path.exists() {
        std::fs::remove_file(path)
            .map_err(|e| format!("Failed to delete session file: {}", e))?;
    }
    Ok(())
}
