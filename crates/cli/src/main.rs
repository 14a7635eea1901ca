// certtrack CLI - certificate tracking and peer review from the terminal

mod account;
mod admin;
mod auth;
mod certs;
mod exit_codes;
mod render;
mod review;
mod util;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use certtrack_client::{ClientError, ProfileUpdate, Role};
use certtrack_config::{OutputFormat, Settings};
use certtrack_recon::{DisplayStatus, ReconError, ReviewStatus};

use exit_codes::{
    client_exit_code, EXIT_AUTH_REJECTED, EXIT_INPUT_IO, EXIT_INPUT_PARSE, EXIT_NOT_AUTH, EXIT_SUCCESS,
    EXIT_USAGE,
};

#[derive(Parser)]
#[command(name = "certtrack")]
#[command(about = "Track certifications and their peer reviews")]
#[command(long_version = long_version())]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    /// User service base URL (overrides settings and the saved session)
    #[arg(long, global = true, value_name = "URL")]
    user_api: Option<String>,

    /// Certificate service base URL (overrides settings and the saved session)
    #[arg(long, global = true, value_name = "URL")]
    cert_api: Option<String>,

    /// Output format for list commands (default: output.format in settings.json)
    #[arg(long, short = 'f', global = true)]
    format: Option<Format>,

    /// Log filter, e.g. `debug` or `certtrack_client=debug` (default: $RUST_LOG, else warn)
    #[arg(long, global = true, value_name = "FILTER")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and save the session
    #[command(after_help = "\
The password is read from --password, then $CERTTRACK_PASSWORD, then prompted for.

Examples:
  certtrack login --email ada@example.com
  CERTTRACK_PASSWORD=... certtrack login --email ada@example.com")]
    Login {
        /// Account email
        #[arg(long)]
        email: String,

        /// Account password
        #[arg(long)]
        password: Option<String>,
    },

    /// Create an account
    #[command(after_help = "\
The password is read from --password, then $CERTTRACK_PASSWORD, then prompted for.
It needs 5+ characters with an uppercase letter, a lowercase letter, a digit
and one of @$!%*?&.

Examples:
  certtrack register --name 'Ada Lovelace' --email ada@example.com --phone 5550001111 --role user
  certtrack register --name 'Pat Lee' --email pat@example.com --phone 5550002222 --role peer --dept Cloud")]
    Register {
        /// Full name (letters and spaces)
        #[arg(long)]
        name: String,

        /// Account email
        #[arg(long)]
        email: String,

        /// Phone number, 10 to 15 digits
        #[arg(long)]
        phone: String,

        /// Account password
        #[arg(long)]
        password: Option<String>,

        /// user, peer or admin
        #[arg(long, value_parser = parse_role)]
        role: Role,

        /// Area of specialization (peers)
        #[arg(long)]
        dept: Option<String>,

        /// URL of a hosted profile picture
        #[arg(long, value_name = "URL")]
        profile_pic: Option<String>,
    },

    /// Remove the saved session
    Logout,

    /// Show the saved session
    Whoami {
        /// Fetch the profile to check the token is still accepted
        #[arg(long)]
        verify: bool,
    },

    /// Show or edit your own profile
    #[command(after_help = "\
Without flags the profile is shown. Any field flag updates it.

Examples:
  certtrack profile
  certtrack profile --phone 5550003333")]
    Profile {
        #[command(flatten)]
        fields: ProfileFields,
    },

    /// List certificates with their review status, or download their files
    #[command(after_help = "\
Users see their own certificates, peers the certificates mapped to them,
admins every certificate.

Examples:
  certtrack certs
  certtrack certs --status pending
  certtrack certs --history -f csv > history.csv
  certtrack certs --expiring-within 30
  certtrack certs --download 12 --file badge -o ./badges/")]
    Certs {
        /// Peers: include certificates not mapped to you
        #[arg(long)]
        all: bool,

        /// Download a stored file of the certificate with this id
        #[arg(long, value_name = "ID", conflicts_with_all = ["status", "history", "expiring_within"])]
        download: Option<String>,

        /// File to download
        #[arg(long, value_enum, default_value = "pdf", requires = "download")]
        file: certs::StoredFile,

        /// Download destination (file or existing directory)
        #[arg(long, short = 'o', default_value = ".", requires = "download")]
        output: PathBuf,

        /// Only certificates with this status (pending, verified, rejected, not-mapped)
        #[arg(long, value_parser = parse_display_status, conflicts_with = "history")]
        status: Option<DisplayStatus>,

        /// Decided and unmapped certificates only (hide Pending)
        #[arg(long)]
        history: bool,

        /// Only certificates expiring within this many days
        #[arg(long, value_name = "DAYS")]
        expiring_within: Option<i64>,
    },

    /// Mappings waiting for a review decision (peer, admin)
    Queue {
        /// Only renewal requests
        #[arg(long)]
        renewals: bool,
    },

    /// Status counts and duplicate-mapping warnings
    Summary {
        /// Exit 3 when a certificate is mapped more than once
        #[arg(long)]
        strict: bool,
    },

    /// Assign a certificate to a peer for review (admin)
    #[command(after_help = "\
Examples:
  certtrack map 12 --peer pat@example.com
  certtrack map 12 --peer pat@example.com --name 'Pat Lee' --force")]
    Map {
        /// Certificate id
        certificate_id: String,

        /// Peer email
        #[arg(long)]
        peer: String,

        /// Peer display name (looked up from the peer list when omitted)
        #[arg(long)]
        name: Option<String>,

        /// Map even if the certificate already has a mapping
        #[arg(long)]
        force: bool,
    },

    /// Record a review decision on a mapping (peer, admin)
    #[command(after_help = "\
Examples:
  certtrack review 66b0c1a1 --status verified --comment 'checked issuer portal'
  certtrack review 66b0c1a3 --status rejected --renewal --comment 'pdf unreadable'")]
    Review {
        /// Mapping id
        mapping_id: String,

        /// Decision: verified, rejected or pending
        #[arg(long, value_parser = parse_review_status)]
        status: ReviewStatus,

        /// Comment shown to the certificate owner
        #[arg(long, default_value = "")]
        comment: String,

        /// Decide on the mapping's renewal request instead
        #[arg(long)]
        renewal: bool,
    },

    /// Upload a certificate (user)
    Upload {
        /// Certificate name
        #[arg(long)]
        name: String,

        /// Credential / track id
        #[arg(long)]
        track_id: String,

        /// Verification URL
        #[arg(long)]
        track_url: String,

        /// Issuing organization
        #[arg(long)]
        issued_by: String,

        /// Issue date (YYYY-MM-DD)
        #[arg(long)]
        issued_date: String,

        /// Expiry date (YYYY-MM-DD)
        #[arg(long)]
        expiry_date: String,

        /// Certificate PDF
        #[arg(long)]
        pdf: PathBuf,

        /// Badge image
        #[arg(long)]
        badge: Option<PathBuf>,
    },

    /// Request renewal of a reviewed certificate (user)
    Renew {
        /// Mapping id
        mapping_id: String,

        /// Renewed certificate PDF
        #[arg(long)]
        pdf: PathBuf,

        /// Reason for the renewal
        #[arg(long)]
        reason: String,

        /// New expiry date (YYYY-MM-DD)
        #[arg(long)]
        new_expiry: String,
    },

    /// List, edit or delete accounts (admin)
    #[command(after_help = "\
Examples:
  certtrack users
  certtrack users --peers --mapped
  certtrack users --delete old@example.com
  certtrack users --peers --delete pat@example.com
  certtrack users --peers --update pat@example.com --dept Security")]
    Users {
        /// Peers instead of users
        #[arg(long, conflicts_with = "admins")]
        peers: bool,

        /// Admins instead of users
        #[arg(long)]
        admins: bool,

        /// Peers: only those with at least one mapping
        #[arg(long, requires = "peers")]
        mapped: bool,

        /// Delete the account with this email
        #[arg(long, value_name = "EMAIL", conflicts_with_all = ["admins", "mapped"])]
        delete: Option<String>,

        /// Edit the account with this email
        #[arg(long, value_name = "EMAIL", conflicts_with_all = ["admins", "mapped", "delete"])]
        update: Option<String>,

        #[command(flatten)]
        fields: ProfileFields,
    },

    /// Reconcile certificate and mapping JSON exports offline
    #[command(after_help = "\
Examples:
  certtrack reconcile certificates.json mappings.json
  certtrack reconcile certificates.json mappings.json --status not-mapped -f csv
  certtrack reconcile certificates.json mappings.json --strict")]
    Reconcile {
        /// JSON array of certificates
        certificates: PathBuf,

        /// JSON array of peer mappings
        mappings: PathBuf,

        /// Only certificates with this status
        #[arg(long, value_parser = parse_display_status, conflicts_with = "history")]
        status: Option<DisplayStatus>,

        /// Hide Pending entries
        #[arg(long)]
        history: bool,

        /// Exit 3 when a certificate is mapped more than once
        #[arg(long)]
        strict: bool,
    },
}

/// Editable account fields shared by `profile` and `users --update`.
#[derive(clap::Args, Debug, Default)]
struct ProfileFields {
    /// New display name
    #[arg(long)]
    name: Option<String>,

    /// New phone number
    #[arg(long)]
    phone: Option<String>,

    /// New area of specialization (peers)
    #[arg(long)]
    dept: Option<String>,

    /// New profile picture URL
    #[arg(long, value_name = "URL")]
    profile_pic: Option<String>,
}

impl From<ProfileFields> for ProfileUpdate {
    fn from(f: ProfileFields) -> Self {
        let clean = |v: Option<String>| v.map(|s| s.trim().to_string());
        ProfileUpdate {
            name: clean(f.name),
            phone: clean(f.phone),
            dept: clean(f.dept),
            profile_pic: clean(f.profile_pic),
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Table,
    Json,
    Csv,
}

impl From<Format> for OutputFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Table => OutputFormat::Table,
            Format::Json => OutputFormat::Json,
            Format::Csv => OutputFormat::Csv,
        }
    }
}

fn parse_display_status(s: &str) -> Result<DisplayStatus, String> {
    DisplayStatus::parse(s)
        .ok_or_else(|| format!("unknown status '{s}' (expected pending, verified, rejected or not-mapped)"))
}

fn parse_role(s: &str) -> Result<Role, String> {
    Role::parse(s).ok_or_else(|| format!("unknown role '{s}' (expected user, peer or admin)"))
}

fn parse_review_status(s: &str) -> Result<ReviewStatus, String> {
    ReviewStatus::parse(s).ok_or_else(|| format!("unknown status '{s}' (expected verified, rejected or pending)"))
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\ntarget:  ", env!("TARGET"),
    )
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => tracing_subscriber::EnvFilter::try_new(level).ok(),
        None => tracing_subscriber::EnvFilter::try_from_default_env().ok(),
    }
    .unwrap_or_else(|| tracing_subscriber::EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let Some(command) = cli.command else {
        eprintln!("Usage: certtrack <command> [options]");
        eprintln!("       certtrack --help for more information");
        return ExitCode::from(EXIT_SUCCESS);
    };

    let settings = Settings::load();
    let ctx = auth::Context {
        format: cli.format.map(OutputFormat::from).unwrap_or(settings.output_format),
        user_api: cli.user_api,
        cert_api: cli.cert_api,
        settings,
    };

    let result = match command {
        Commands::Login { email, password } => auth::cmd_login(&ctx, email, password),
        Commands::Register { name, email, phone, password, role, dept, profile_pic } => {
            account::cmd_register(&ctx, name, email, phone, password, role, dept, profile_pic)
        }
        Commands::Profile { fields } => account::cmd_profile(&ctx, fields.into()),
        Commands::Logout => auth::cmd_logout(),
        Commands::Whoami { verify } => auth::cmd_whoami(&ctx, verify),
        Commands::Certs { all, download: Some(id), file, output, .. } => {
            certs::cmd_download(&ctx, id, file, all, output)
        }
        Commands::Certs { all, status, history, expiring_within, .. } => {
            certs::cmd_certs(&ctx, all, status, history, expiring_within)
        }
        Commands::Queue { renewals } => review::cmd_queue(&ctx, renewals),
        Commands::Summary { strict } => certs::cmd_summary(&ctx, strict),
        Commands::Map { certificate_id, peer, name, force } => {
            admin::cmd_map(&ctx, certificate_id, peer, name, force)
        }
        Commands::Review { mapping_id, status, comment, renewal } => {
            review::cmd_review(&ctx, mapping_id, status, comment, renewal)
        }
        Commands::Upload {
            name,
            track_id,
            track_url,
            issued_by,
            issued_date,
            expiry_date,
            pdf,
            badge,
        } => {
            let form = certtrack_client::NewCertificate {
                name,
                track_id,
                track_url,
                issued_by,
                issued_date,
                expiry_date,
            };
            certs::cmd_upload(&ctx, form, pdf, badge)
        }
        Commands::Renew { mapping_id, pdf, reason, new_expiry } => {
            certs::cmd_renew(&ctx, mapping_id, pdf, reason, new_expiry)
        }
        Commands::Users { peers, admins, mapped, delete, update, fields } => {
            let changes = ProfileUpdate::from(fields);
            if update.is_none() && !changes.is_empty() {
                Err(CliError::args("account fields need --update <EMAIL>"))
            } else {
                admin::cmd_users(&ctx, peers, admins, mapped, delete, update.map(|email| (email, changes)))
            }
        }
        Commands::Reconcile { certificates, mappings, status, history, strict } => {
            certs::cmd_reconcile(&ctx, certificates, mappings, status, history, strict)
        }
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_INPUT_IO, message: msg.into(), hint: None }
    }

    /// Error from a service call, with a hint when logging in again would help.
    pub fn client(err: ClientError) -> Self {
        let code = client_exit_code(&err);
        let hint = match code {
            EXIT_NOT_AUTH => Some("run `certtrack login` first".to_string()),
            EXIT_AUTH_REJECTED => Some("the session may have expired; run `certtrack login` again".to_string()),
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    /// Error reading a local JSON export.
    pub fn input(err: ReconError) -> Self {
        let code = match err {
            ReconError::Io(_) => EXIT_INPUT_IO,
            ReconError::Parse(_) | ReconError::InvalidArgument(_) => EXIT_INPUT_PARSE,
        };
        Self { code, message: err.to_string(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
