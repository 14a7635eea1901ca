//! Peer review commands: `queue` and `review`.

use certtrack_client::Role;
use certtrack_recon::{enrich_mappings, renewal_queue, review_queue, ReviewStatus};

use crate::auth::Context;
use crate::render;
use crate::CliError;

pub fn cmd_queue(ctx: &Context, renewals: bool) -> Result<(), CliError> {
    let (session, client) = ctx.connect("queue", &[Role::Peer, Role::Admin])?;

    let mappings = match session.role {
        Role::Admin => client.all_mappings(),
        _ => client.my_mappings(),
    }
    .map_err(CliError::client)?;
    let certificates = client.all_certificates().map_err(CliError::client)?;

    let enriched = enrich_mappings(&mappings, &certificates);
    let queue = if renewals {
        renewal_queue(&enriched)
    } else {
        review_queue(&enriched)
    };

    if queue.is_empty() {
        eprintln!("Nothing waiting for review");
    }
    print!("{}", render::mappings(&queue, ctx.format)?);
    Ok(())
}

pub fn cmd_review(
    ctx: &Context,
    mapping_id: String,
    status: ReviewStatus,
    comment: String,
    renewal: bool,
) -> Result<(), CliError> {
    if status == ReviewStatus::Rejected && comment.trim().is_empty() {
        return Err(CliError::args("a rejection needs a comment")
            .with_hint("pass --comment with the reason so the owner can fix it"));
    }

    let (_, client) = ctx.connect("review", &[Role::Peer, Role::Admin])?;
    let result = if renewal {
        client.verify_renewal(&mapping_id, status, &comment)
    } else {
        client.update_status(&mapping_id, status, &comment)
    };
    result.map_err(CliError::client)?;

    let what = if renewal { "Renewal" } else { "Mapping" };
    eprintln!("{} {} marked {}", what, mapping_id.trim(), status);
    Ok(())
}
