use std::path::PathBuf;
use std::process;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use structopt::StructOpt;

use heimdall::config::Config;
use heimdall::models::{ContextFingerprint, KnownContext, RecordId, SuspiciousRecord};
use heimdall::output::{DecisionLog, DecisionRecord, OutputFormat};
use heimdall::persistence::SqliteTrustStore;
use heimdall::trust::{TrustEngine, TrustError};

/// Login-Context Trust Engine operator console
#[derive(StructOpt, Debug)]
#[structopt(name = "trustctl", about = "Login-context trust engine operator console")]
struct Cli {
    /// Path to configuration file
    #[structopt(short, long, global = true, default_value = "config.toml")]
    config: PathBuf,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt, Debug)]
enum Command {
    /// Classify a login context against a user's stored history
    Classify {
        /// User identifier
        #[structopt(short, long)]
        user: String,
        #[structopt(flatten)]
        fingerprint: FingerprintArgs,
    },
    /// Record a context as a user's legitimate environment
    Remember {
        /// User identifier
        #[structopt(short, long)]
        user: String,
        #[structopt(flatten)]
        fingerprint: FingerprintArgs,
    },
    /// Flag a context as suspicious for a user
    Flag {
        /// User identifier
        #[structopt(short, long)]
        user: String,
        /// Owner email, kept on the record for audit display
        #[structopt(short, long)]
        email: String,
        #[structopt(flatten)]
        fingerprint: FingerprintArgs,
    },
    /// Block a flagged record
    Block {
        /// Record identifier
        id: String,
    },
    /// Unblock a flagged record, granting it trust
    Unblock {
        /// Record identifier
        id: String,
    },
    /// Delete a flagged record
    Delete {
        /// Record identifier
        id: String,
    },
    /// List a user's blocked records
    ListBlocked {
        /// User identifier
        #[structopt(short, long)]
        user: String,
    },
    /// List a user's trusted records
    ListTrusted {
        /// User identifier
        #[structopt(short, long)]
        user: String,
    },
    /// Show a user's known context
    Known {
        /// User identifier
        #[structopt(short, long)]
        user: String,
    },
    /// Generate a default configuration file
    Config {
        /// Output path for the configuration file
        #[structopt(short, long, default_value = "config.toml")]
        output: PathBuf,
    },
}

/// Login-context attributes as extracted by the upstream auth flow
#[derive(StructOpt, Debug)]
struct FingerprintArgs {
    #[structopt(long)]
    ip: String,
    #[structopt(long)]
    country: String,
    #[structopt(long)]
    city: String,
    #[structopt(long)]
    browser: String,
    #[structopt(long)]
    platform: String,
    #[structopt(long)]
    os: String,
    #[structopt(long)]
    device: String,
    #[structopt(long)]
    device_type: String,
}

impl FingerprintArgs {
    fn into_fingerprint(self) -> ContextFingerprint {
        ContextFingerprint {
            ip: self.ip,
            country: self.country,
            city: self.city,
            browser: self.browser,
            platform: self.platform,
            os: self.os,
            device: self.device,
            device_type: self.device_type,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::from_args();

    if let Command::Config { output } = &cli.command {
        let config = Config::default();
        config.to_file(output)?;
        println!("Default configuration written to: {:?}", output);
        return Ok(());
    }

    let config = if cli.config.exists() {
        Config::from_file(&cli.config)?
    } else {
        log::warn!("Config file not found, using defaults");
        Config::default()
    };

    let store = Arc::new(SqliteTrustStore::new(&config.database.path)?);
    let engine = TrustEngine::new(store.clone(), store);

    match cli.command {
        Command::Classify { user, fingerprint } => {
            let fp = fingerprint.into_fingerprint();
            let verdict = engine.classify(&user, &fp)?;

            let mut decision_log = DecisionLog::new(
                OutputFormat::from_str(&config.decision_log.format),
                config.decision_log.file_path.clone(),
            )?;
            decision_log.write_decision(&DecisionRecord {
                user_id: user,
                classification: verdict,
                fingerprint: fp,
                timestamp: Utc::now().timestamp(),
            })?;
            decision_log.flush()?;

            println!("{}", verdict);
        }
        Command::Remember { user, fingerprint } => {
            let ctx = engine.remember_context(
                &user,
                &fingerprint.into_fingerprint(),
                Utc::now().timestamp(),
            )?;
            println!("Known context {} recorded for user '{}'", ctx.id, user);
        }
        Command::Flag {
            user,
            email,
            fingerprint,
        } => {
            let record = engine.flag_context(
                &user,
                &email,
                &fingerprint.into_fingerprint(),
                Utc::now().timestamp(),
            )?;
            println!("Flagged record {} for user '{}'", record.id, user);
        }
        Command::Block { id } => {
            run_record_op(&id, "Blocked", |id| engine.block(id));
        }
        Command::Unblock { id } => {
            run_record_op(&id, "Unblocked", |id| engine.unblock(id));
        }
        Command::Delete { id } => {
            run_record_op(&id, "Deleted", |id| engine.delete(id));
        }
        Command::ListBlocked { user } => {
            let records = engine.list_blocked(&user)?;
            println!("Blocked records for user '{}':", user);
            print_records(&records);
        }
        Command::ListTrusted { user } => {
            let records = engine.list_trusted(&user)?;
            println!("Trusted records for user '{}':", user);
            print_records(&records);
        }
        Command::Known { user } => match engine.known_context(&user) {
            Ok(ctx) => print_known_context(&ctx),
            Err(TrustError::NotFound) => {
                eprintln!("No known context for user '{}'", user);
                process::exit(1);
            }
            Err(e) => return Err(e.into()),
        },
        Command::Config { .. } => unreachable!("handled above"),
    }

    Ok(())
}

/// Run a record-addressed operation, mapping bad input and missing
/// records to a non-zero exit instead of a stack trace
fn run_record_op<F>(raw_id: &str, verb: &str, op: F)
where
    F: FnOnce(RecordId) -> Result<(), TrustError>,
{
    let id = match RecordId::from_str(raw_id) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    match op(id) {
        Ok(()) => println!("{} record {}", verb, id),
        Err(TrustError::NotFound) => {
            eprintln!("No record with id {}", id);
            process::exit(1);
        }
        Err(e) => {
            eprintln!("Operation failed: {}", e);
            process::exit(1);
        }
    }
}

fn format_timestamp(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| ts.to_string())
}

fn print_records(records: &[SuspiciousRecord]) {
    if records.is_empty() {
        println!("  (none)");
        return;
    }
    for r in records {
        println!(
            "  [{}] {} {} <{}> from {} ({}/{}) {} on {} ({})",
            r.id,
            format_timestamp(r.first_seen),
            r.user_id,
            r.email,
            r.fingerprint.ip,
            r.fingerprint.city,
            r.fingerprint.country,
            r.fingerprint.browser,
            r.fingerprint.os,
            r.fingerprint.device_type,
        );
    }
}

fn print_known_context(ctx: &KnownContext) {
    println!("Known context [{}] for user '{}':", ctx.id, ctx.user_id);
    println!("  First added: {}", format_timestamp(ctx.first_added));
    println!("  IP:          {}", ctx.fingerprint.ip);
    println!("  Location:    {}/{}", ctx.fingerprint.city, ctx.fingerprint.country);
    println!("  Browser:     {}", ctx.fingerprint.browser);
    println!("  Platform:    {}", ctx.fingerprint.platform);
    println!("  OS:          {}", ctx.fingerprint.os);
    println!("  Device:      {} ({})", ctx.fingerprint.device, ctx.fingerprint.device_type);
}
