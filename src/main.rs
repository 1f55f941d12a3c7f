use std::{fs, num::NonZeroUsize, path::PathBuf, process};

use chrono::Local;
use clap::{Parser, Subcommand};
use lobby_payments_lib::{
    find_member, import_members, import_payments, lobby_report, members_report, payment_history,
    record_payment, save_export, ImportOutcome, JsonFileStore, LobbyFilter, Month, PaymentForm,
    PipelineConfig, PipelineError, SfaId, TransactionQuery, UserRecord, ALL_LOBBIES,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lobby_payments_bin", about = "Import, report and export lobby payments")]
struct Cli {
    /// JSON file holding the document store
    #[arg(long, env = "LOBBY_STORE", default_value = "lobby_store.json", global = true)]
    store: PathBuf,

    /// Records written per atomic batch
    #[arg(long, default_value = "500", global = true)]
    chunk_size: NonZeroUsize,

    /// Member ids resolved per lookup when building reports
    #[arg(long, default_value = "10", global = true)]
    lookup_batch: NonZeroUsize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import a month of payments from CSV
    ImportPayments { csv: PathBuf },
    /// Import member records from CSV
    ImportMembers { csv: PathBuf },
    /// Write the payment report for a lobby
    Report {
        #[arg(long, default_value = ALL_LOBBIES)]
        lobby: String,
        /// Month token, e.g. `jan` or `sept`
        #[arg(long)]
        month: Option<Month>,
        #[arg(long)]
        year: Option<String>,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Write every member to CSV
    ExportMembers {
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Record a single payment for a member, dated today
    RecordPayment {
        #[arg(long)]
        sfa_id: String,
        #[arg(long)]
        amount: String,
        #[arg(long)]
        collector: String,
        #[arg(long)]
        mode: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Look a member up by SFA id or CMS id
    FindMember { id: String },
    /// List a member's payments, newest first
    History {
        /// SFA id or CMS id
        id: String,
    },
}

fn report_outcome(outcome: ImportOutcome) -> Result<(), PipelineError> {
    println!("imported {} records", outcome.imported_count);
    match outcome.error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn require_member(store: &JsonFileStore, id: &str) -> Result<UserRecord, PipelineError> {
    find_member(store, id)?
        .ok_or_else(|| PipelineError::validation("id", format!("no member `{}`", id.trim())))
}

fn run(cli: Cli) -> Result<(), PipelineError> {
    let config = PipelineConfig::default()
        .with_chunk_size(cli.chunk_size)
        .with_lookup_batch(cli.lookup_batch);
    let mut store = JsonFileStore::open(&cli.store)?;
    let today = Local::now().date_naive();

    match cli.command {
        Command::ImportPayments { csv } => {
            let text = fs::read_to_string(csv)?;
            report_outcome(import_payments(&mut store, &text, &config)?)
        }
        Command::ImportMembers { csv } => {
            let text = fs::read_to_string(csv)?;
            report_outcome(import_members(&mut store, &text, &config)?)
        }
        Command::Report {
            lobby,
            month,
            year,
            out_dir,
        } => {
            let query = TransactionQuery {
                month,
                year,
                ..TransactionQuery::new(LobbyFilter::from(lobby.as_str()))
            };
            let file = lobby_report(&store, &query, &config, today)?;
            println!("{}", save_export(&out_dir, &file)?.display());
            Ok(())
        }
        Command::ExportMembers { out_dir } => {
            let file = members_report(&store, today)?;
            println!("{}", save_export(&out_dir, &file)?.display());
            Ok(())
        }
        Command::RecordPayment {
            sfa_id,
            amount,
            collector,
            mode,
            description,
        } => {
            let form = PaymentForm {
                amount,
                collector_name: collector,
                mode,
                description,
            };
            let key = record_payment(&mut store, &SfaId::new(sfa_id), &form, today)?;
            println!("recorded {}", key);
            Ok(())
        }
        Command::FindMember { id } => {
            let user = require_member(&store, &id)?;
            println!(
                "{}\t{}\t{}\t{}",
                user.sfa_id, user.cms_id, user.full_name, user.lobby_id
            );
            Ok(())
        }
        Command::History { id } => {
            let user = require_member(&store, &id)?;
            for tx in payment_history(&store, &user.sfa_id)? {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    tx.date, tx.amount, tx.mode, tx.receiver, tx.remarks
                );
            }
            Ok(())
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => process::exit(0),
        Err(e) => {
            eprintln!("an error occurred: {}", e);
            process::exit(1);
        }
    }
}
