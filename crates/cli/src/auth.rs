//! Session commands and role checks.
//!
//! `certtrack login`   exchange credentials for a session, save it
//! `certtrack logout`  remove the saved session
//! `certtrack whoami`  show (and optionally verify) the saved session
//!
//! Every other online command goes through [`Context::connect`], which loads
//! the session, enforces the command's roles and builds the client.

use std::io::{self, Write};
use std::time::Duration;

use certtrack_client::{self as client, CertClient, ClientError, Role, ServiceEndpoints, Session};
use certtrack_config::{OutputFormat, Settings};

use crate::exit_codes::*;
use crate::CliError;

pub const ENV_PASSWORD: &str = "CERTTRACK_PASSWORD";

/// Everything a command needs besides its own arguments.
pub struct Context {
    pub settings: Settings,
    /// `--user-api` / `--cert-api`
    pub user_api: Option<String>,
    pub cert_api: Option<String>,
    pub format: OutputFormat,
}

impl Context {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.settings.timeout_secs.max(1))
    }

    /// Endpoints for login: flags, then settings (which already carry the
    /// environment overrides).
    pub fn login_endpoints(&self) -> ServiceEndpoints {
        ServiceEndpoints::new(
            self.user_api.clone().unwrap_or_else(|| self.settings.user_api.clone()),
            self.cert_api.clone().unwrap_or_else(|| self.settings.cert_api.clone()),
        )
    }

    /// Endpoints for an existing session: flags, then the endpoints the
    /// session was issued against.
    fn session_endpoints(&self, session: &Session) -> ServiceEndpoints {
        let saved = ServiceEndpoints::of_session(session);
        ServiceEndpoints::new(
            self.user_api.clone().unwrap_or(saved.user_api),
            self.cert_api.clone().unwrap_or(saved.cert_api),
        )
    }

    /// Load the saved session, check it may run `command`, and build a client.
    pub fn connect(&self, command: &str, allowed: &[Role]) -> Result<(Session, CertClient), CliError> {
        let session = client::load_session().ok_or_else(not_logged_in)?;
        require_role(&session, command, allowed)?;
        let client = CertClient::with_session(self.session_endpoints(&session), &session, self.timeout())
            .map_err(CliError::client)?;
        log::debug!("{} as {} ({})", command, session.email, session.role);
        Ok((session, client))
    }
}

fn not_logged_in() -> CliError {
    CliError {
        code: EXIT_NOT_AUTH,
        message: "Not logged in".into(),
        hint: Some("run `certtrack login --email <EMAIL>` first".into()),
    }
}

/// Fail unless the session's role is one of `allowed`.
pub fn require_role(session: &Session, command: &str, allowed: &[Role]) -> Result<(), CliError> {
    if allowed.contains(&session.role) {
        return Ok(());
    }
    let roles: Vec<&str> = allowed.iter().map(Role::as_str).collect();
    Err(CliError {
        code: EXIT_FORBIDDEN,
        message: format!(
            "`certtrack {}` requires the {} role (logged in as {})",
            command,
            roles.join(" or "),
            session.role
        ),
        hint: Some("log in with an account that has that role".into()),
    })
}

// ── Login ───────────────────────────────────────────────────────────

/// `--password` flag, then `CERTTRACK_PASSWORD`, then an interactive prompt.
pub fn read_password(email: &str, flag: Option<String>) -> Result<String, CliError> {
    let password = if let Some(p) = flag {
        p
    } else if let Ok(p) = std::env::var(ENV_PASSWORD) {
        p
    } else if atty::is(atty::Stream::Stdin) {
        eprint!("Password for {}: ", email);
        io::stderr().flush().ok();
        let mut buf = String::new();
        io::stdin().read_line(&mut buf).map_err(|e| CliError::io(e.to_string()))?;
        buf.trim_end_matches(['\r', '\n']).to_string()
    } else {
        return Err(CliError::args("No password provided and stdin is not a TTY")
            .with_hint(format!("pass --password or set {}", ENV_PASSWORD)));
    };
    if password.is_empty() {
        return Err(CliError::args("No password provided").with_hint(format!("pass --password or set {}", ENV_PASSWORD)));
    }
    Ok(password)
}

/// Network failures talking to the user service, with a pointer at the setting.
pub fn unreachable_user_service(user_api: &str, msg: String) -> CliError {
    CliError {
        code: EXIT_SERVICE_NETWORK,
        message: format!("Cannot reach user service at {}: {}", user_api, msg),
        hint: Some("check services.userApi in settings.json or pass --user-api".into()),
    }
}

pub fn cmd_login(ctx: &Context, email: String, password: Option<String>) -> Result<(), CliError> {
    let email = email.trim().to_string();
    if email.is_empty() {
        return Err(CliError::args("email must not be empty"));
    }

    let password = read_password(&email, password)?;

    let endpoints = ctx.login_endpoints();
    let user_api = endpoints.user_api.clone();
    let anon = CertClient::new(endpoints, ctx.timeout()).map_err(CliError::client)?;

    let session = anon.login(&email, &password).map_err(|e| match e {
        ClientError::Http(401, _) | ClientError::Http(403, _) | ClientError::Http(404, _) => CliError {
            code: EXIT_AUTH_REJECTED,
            message: "Invalid email or password".into(),
            hint: None,
        },
        ClientError::Network(msg) => unreachable_user_service(&user_api, msg),
        other => CliError::client(other),
    })?;

    client::save_session(&session).map_err(|e| CliError { code: EXIT_ERROR, message: e, hint: None })?;

    eprintln!("Logged in as {} ({})", session.email, session.role);
    Ok(())
}

// ── Logout ──────────────────────────────────────────────────────────

pub fn cmd_logout() -> Result<(), CliError> {
    if client::load_session().is_none() {
        eprintln!("Not logged in");
        return Ok(());
    }
    client::delete_session().map_err(CliError::io)?;
    eprintln!("Logged out");
    Ok(())
}

// ── Whoami ──────────────────────────────────────────────────────────

pub fn cmd_whoami(ctx: &Context, verify: bool) -> Result<(), CliError> {
    let session = client::load_session().ok_or_else(not_logged_in)?;
    let endpoints = ctx.session_endpoints(&session);

    let profile = if verify {
        let client = CertClient::with_session(endpoints.clone(), &session, ctx.timeout())
            .map_err(CliError::client)?;
        Some(client.profile().map_err(CliError::client)?)
    } else {
        None
    };

    if ctx.format == OutputFormat::Json {
        let out = serde_json::json!({
            "email": session.email,
            "role": session.role,
            "token": session.masked_token(),
            "userApi": endpoints.user_api,
            "certApi": endpoints.cert_api,
            "profile": profile,
        });
        println!("{}", serde_json::to_string_pretty(&out).map_err(|e| CliError::io(e.to_string()))?);
        return Ok(());
    }

    println!("email:     {}", session.email);
    println!("role:      {}", session.role);
    println!("token:     {}", session.masked_token());
    println!("user api:  {}", endpoints.user_api);
    println!("cert api:  {}", endpoints.cert_api);
    println!("settings:  {}", Settings::config_path_display());
    if let Some(p) = profile {
        println!("name:      {}", p.name);
        if let Some(dept) = p.dept {
            println!("dept:      {}", dept);
        }
    }
    Ok(())
}
