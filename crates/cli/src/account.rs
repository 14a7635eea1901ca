//! Account commands: `register` and `profile`.

use certtrack_client::{CertClient, ClientError, NewAccount, ProfileUpdate, Role};
use regex::Regex;

use crate::auth::{read_password, unreachable_user_service, Context};
use crate::render;
use crate::CliError;

const NAME_PATTERN: &str = r"^[a-zA-Z\s]{3,}$";
const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";
const PHONE_PATTERN: &str = r"^\+?[0-9]{10,15}$";
const PASSWORD_CHARS: &str = r"^[A-Za-z\d@$!%*?&]{5,}$";
const PASSWORD_SPECIAL: &str = r"[@$!%*?&]";

fn matches(pattern: &str, value: &str) -> bool {
    Regex::new(pattern).map(|re| re.is_match(value)).unwrap_or(false)
}

fn check_name(name: &str) -> Result<(), CliError> {
    if matches(NAME_PATTERN, name) {
        Ok(())
    } else {
        Err(CliError::args("--name must be at least 3 letters (letters and spaces only)"))
    }
}

fn check_phone(phone: &str) -> Result<(), CliError> {
    if matches(PHONE_PATTERN, phone) {
        Ok(())
    } else {
        Err(CliError::args(format!("--phone must be 10 to 15 digits, optionally starting with +, got '{}'", phone)))
    }
}

fn check_password(password: &str) -> Result<(), CliError> {
    let ok = matches(PASSWORD_CHARS, password)
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && matches(PASSWORD_SPECIAL, password);
    if ok {
        Ok(())
    } else {
        Err(CliError::args(
            "password must be at least 5 characters with an uppercase letter, a lowercase letter, a digit and one of @$!%*?&",
        ))
    }
}

/// Validate a sign-up form before it is sent.
fn check_account(account: &NewAccount) -> Result<(), CliError> {
    check_name(&account.name)?;
    if !matches(EMAIL_PATTERN, &account.email) {
        return Err(CliError::args(format!("'{}' is not a valid email address", account.email)));
    }
    check_phone(&account.phone)?;
    check_password(&account.password)?;
    match (account.role, account.dept.as_deref()) {
        (Role::Peer, None) => Err(CliError::args("peers need --dept (area of specialization)")),
        (Role::Peer, Some(dept)) if dept.trim().is_empty() => Err(CliError::args("--dept must not be empty")),
        (Role::Peer, Some(_)) => Ok(()),
        (_, Some(_)) => Err(CliError::args("--dept only applies to peers")),
        (_, None) => Ok(()),
    }
}

/// Validate the fields of a profile edit.
pub fn check_update(update: &ProfileUpdate) -> Result<(), CliError> {
    if update.is_empty() {
        return Err(CliError::args("nothing to update")
            .with_hint("pass at least one of --name, --phone, --dept, --profile-pic"));
    }
    if let Some(name) = &update.name {
        check_name(name)?;
    }
    if let Some(phone) = &update.phone {
        check_phone(phone)?;
    }
    Ok(())
}

// ── register ────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
pub fn cmd_register(
    ctx: &Context,
    name: String,
    email: String,
    phone: String,
    password: Option<String>,
    role: Role,
    dept: Option<String>,
    profile_pic: Option<String>,
) -> Result<(), CliError> {
    let email = email.trim().to_string();
    let password = read_password(&email, password)?;
    let account = NewAccount {
        name: name.trim().to_string(),
        email,
        phone: phone.trim().to_string(),
        password,
        role,
        dept: dept.map(|d| d.trim().to_string()),
        profile_pic,
    };
    check_account(&account)?;

    let endpoints = ctx.login_endpoints();
    let user_api = endpoints.user_api.clone();
    let anon = CertClient::new(endpoints, ctx.timeout()).map_err(CliError::client)?;
    let message = anon.register(&account).map_err(|e| match e {
        ClientError::Network(msg) => unreachable_user_service(&user_api, msg),
        other => CliError::client(other),
    })?;

    if message.is_empty() {
        eprintln!("Registered {} ({})", account.email, account.role);
    } else {
        eprintln!("{}", message);
    }
    eprintln!("Log in with `certtrack login --email {}`", account.email);
    Ok(())
}

// ── profile ─────────────────────────────────────────────────────────

pub fn cmd_profile(ctx: &Context, update: ProfileUpdate) -> Result<(), CliError> {
    let (session, client) = ctx.connect("profile", &[Role::Admin, Role::Peer, Role::User])?;

    let profile = if update.is_empty() {
        client.profile().map_err(CliError::client)?
    } else {
        check_update(&update)?;
        if update.dept.is_some() && session.role != Role::Peer {
            return Err(CliError::args("--dept only applies to peers"));
        }
        let profile = client.update_profile(&update).map_err(CliError::client)?;
        eprintln!("Profile updated");
        profile
    };

    print!("{}", render::profiles(std::slice::from_ref(&profile), ctx.format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(role: Role, dept: Option<&str>) -> NewAccount {
        NewAccount {
            name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
            phone: "+445550001111".into(),
            password: "Engine@1843".into(),
            role,
            dept: dept.map(String::from),
            profile_pic: None,
        }
    }

    #[test]
    fn valid_accounts_pass() {
        assert!(check_account(&account(Role::User, None)).is_ok());
        assert!(check_account(&account(Role::Peer, Some("Cloud"))).is_ok());
        assert!(check_account(&account(Role::Admin, None)).is_ok());
    }

    #[test]
    fn department_follows_role() {
        let err = check_account(&account(Role::Peer, None)).unwrap_err();
        assert!(err.message.contains("--dept"));
        let err = check_account(&account(Role::User, Some("Cloud"))).unwrap_err();
        assert_eq!(err.message, "--dept only applies to peers");
    }

    #[test]
    fn field_rules() {
        let bad = |f: fn(&mut NewAccount)| {
            let mut a = account(Role::User, None);
            f(&mut a);
            check_account(&a).unwrap_err().message
        };
        assert!(bad(|a| a.name = "Al".into()).starts_with("--name"));
        assert!(bad(|a| a.name = "R2D2 Unit".into()).starts_with("--name"));
        assert!(bad(|a| a.email = "ada@example".into()).contains("not a valid email"));
        assert!(bad(|a| a.phone = "555-0001".into()).starts_with("--phone"));
        assert!(bad(|a| a.password = "engine@1843".into()).starts_with("password"));
        assert!(bad(|a| a.password = "Engine1843".into()).starts_with("password"));
        assert!(bad(|a| a.password = "Engine 1843!".into()).starts_with("password"));
    }

    #[test]
    fn updates_need_a_field() {
        assert!(check_update(&ProfileUpdate::default()).unwrap_err().hint.is_some());
        assert!(check_update(&ProfileUpdate { phone: Some("12345".into()), ..Default::default() }).is_err());
        assert!(check_update(&ProfileUpdate { dept: Some("Security".into()), ..Default::default() }).is_ok());
    }
}
