//! Admin commands: `map` and `users`.

use certtrack_client::{ProfileUpdate, Role};
use certtrack_recon::{mapped_peers, PeerMapping, Profile};

use crate::account::check_update;
use crate::auth::Context;
use crate::render;
use crate::CliError;

/// Display name for `peer_email`: the explicit `--name`, else the peer's
/// profile name.
fn resolve_peer_name(peers: &[Profile], peer_email: &str, name: Option<String>) -> Result<String, CliError> {
    let peer = peers.iter().find(|p| p.email.eq_ignore_ascii_case(peer_email));
    match (name, peer) {
        (Some(name), _) if !name.trim().is_empty() => Ok(name.trim().to_string()),
        (_, Some(peer)) => Ok(peer.name.clone()),
        _ => Err(CliError::args(format!("{} is not a peer", peer_email))
            .with_hint("list peers with `certtrack users --peers`")),
    }
}

/// The mapping that already covers `certificate_id`, if any.
fn existing_mapping<'a>(mappings: &'a [PeerMapping], certificate_id: &str) -> Option<&'a PeerMapping> {
    mappings.iter().find(|m| m.certificate_id.as_deref() == Some(certificate_id))
}

pub fn cmd_map(
    ctx: &Context,
    certificate_id: String,
    peer: String,
    name: Option<String>,
    force: bool,
) -> Result<(), CliError> {
    let certificate_id = certificate_id.trim().to_string();
    let peer = peer.trim().to_string();
    let (_, client) = ctx.connect("map", &[Role::Admin])?;

    let certificates = client.all_certificates().map_err(CliError::client)?;
    if !certificates.iter().any(|c| c.id == certificate_id) {
        return Err(CliError::args(format!("no certificate with id {}", certificate_id))
            .with_hint("list certificates with `certtrack certs`"));
    }

    let mappings = client.all_mappings().map_err(CliError::client)?;
    if let Some(existing) = existing_mapping(&mappings, &certificate_id) {
        if !force {
            return Err(CliError::args(format!(
                "certificate {} is already mapped to {} (mapping {})",
                certificate_id, existing.peer_email, existing.id
            ))
            .with_hint("pass --force to add another mapping; only the first one is shown"));
        }
        log::warn!("certificate {} already mapped by {}; adding another", certificate_id, existing.id);
    }

    let peers = client.list_peers().map_err(CliError::client)?;
    let peer_name = resolve_peer_name(&peers, &peer, name)?;

    client
        .add_mapping(&certificate_id, &peer, &peer_name)
        .map_err(CliError::client)?;
    eprintln!("Mapped certificate {} to {} ({})", certificate_id, peer_name, peer);
    Ok(())
}

pub fn cmd_users(
    ctx: &Context,
    peers: bool,
    admins: bool,
    mapped: bool,
    delete: Option<String>,
    update: Option<(String, ProfileUpdate)>,
) -> Result<(), CliError> {
    if let Some((_, changes)) = &update {
        check_update(changes)?;
        if changes.dept.is_some() && !peers {
            return Err(CliError::args("--dept only applies to peers").with_hint("add --peers to edit a peer"));
        }
    }
    let (_, client) = ctx.connect("users", &[Role::Admin])?;

    if let Some((email, changes)) = update {
        if peers {
            client.update_peer(&email, &changes).map_err(CliError::client)?;
        } else {
            client.update_user(&email, &changes).map_err(CliError::client)?;
        }
        eprintln!("Updated {}", email.trim());
        return Ok(());
    }

    if let Some(email) = delete {
        if peers {
            client.delete_peer(&email).map_err(CliError::client)?;
        } else {
            client.delete_user(&email).map_err(CliError::client)?;
        }
        eprintln!("Deleted {}", email.trim());
        return Ok(());
    }

    let accounts = if admins {
        client.list_admins()
    } else if peers {
        client.list_peers()
    } else {
        client.list_users()
    }
    .map_err(CliError::client)?;

    let accounts = if mapped {
        let mappings = client.all_mappings().map_err(CliError::client)?;
        mapped_peers(&accounts, &mappings)
    } else {
        accounts
    };

    print!("{}", render::profiles(&accounts, ctx.format)?);
    Ok(())
}
