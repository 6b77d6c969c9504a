//! CLI entry point for `mailstash`.

use std::io::Read;
use std::path::PathBuf;

use chrono::Utc;
use clap::{CommandFactory, Parser, Subcommand};

use mailstash::index::query;
use mailstash::{EmailAddress, MailStore, MessageEntry};

#[derive(Parser)]
#[command(name = "mailstash", version, about = "Inspect and manage a mailstash message store")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Store root (overrides the configured one)
    #[arg(long, global = true, env = "MAILSTASH_ROOT", value_name = "DIR")]
    root: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a message in a mailbox
    Deliver {
        mailbox: String,
        /// Message file (reads stdin when omitted)
        file: Option<PathBuf>,
    },
    /// List the messages of a mailbox in delivery order
    List {
        mailbox: String,
        #[arg(long)]
        json: bool,
    },
    /// Print one message
    Show {
        mailbox: String,
        id: String,
        /// Print only the raw message
        #[arg(long)]
        raw: bool,
        /// Do not mark the message as seen
        #[arg(long)]
        peek: bool,
    },
    /// Delete one message
    Delete { mailbox: String, id: String },
    /// Delete every message of a mailbox
    Purge { mailbox: String },
    /// List every mailbox on disk (by hash)
    Mailboxes {
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = mailstash::config::load_config();
    if let Some(root) = cli.root {
        config.store.root = Some(root);
    }

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    let open_store = || MailStore::from_config(&config);

    match cli.command {
        Commands::Deliver { mailbox, file } => cmd_deliver(&open_store()?, &mailbox, file),
        Commands::List { mailbox, json } => cmd_list(&open_store()?, &mailbox, json),
        Commands::Show {
            mailbox,
            id,
            raw,
            peek,
        } => cmd_show(&open_store()?, &mailbox, &id, raw, peek),
        Commands::Delete { mailbox, id } => {
            open_store()?.mailbox_for(&mailbox).delete(&id)?;
            println!("Deleted {id}");
            Ok(())
        }
        Commands::Purge { mailbox } => {
            let count = open_store()?.mailbox_for(&mailbox).purge()?;
            println!("Purged {count} message(s) from {mailbox}");
            Ok(())
        }
        Commands::Mailboxes { json } => cmd_mailboxes(&open_store()?, json),
        Commands::Completions { shell } => cmd_completions(shell),
    }
}

fn setup_logging(level: &str, config: &mailstash::config::Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    // Try to set up file logging
    let log_dir = mailstash::config::log_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mailstash.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mailstash", &mut std::io::stdout());
    Ok(())
}

fn cmd_deliver(store: &MailStore, mailbox: &str, file: Option<PathBuf>) -> anyhow::Result<()> {
    let reader: Box<dyn Read> = match file {
        Some(path) => Box::new(std::fs::File::open(&path).map_err(|e| {
            anyhow::anyhow!("Cannot open {}: {e}", path.display())
        })?),
        None => Box::new(std::io::stdin().lock()),
    };
    let id = store.deliver(mailbox, reader, Utc::now())?;
    println!("{id}");
    Ok(())
}

fn cmd_list(store: &MailStore, mailbox: &str, json: bool) -> anyhow::Result<()> {
    let entries = store.mailbox_for(mailbox).list()?;

    if json {
        let items: Vec<serde_json::Value> = entries.iter().map(entry_json).collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    use humansize::{format_size, BINARY};
    for e in &entries {
        println!(
            "{} {} {:>10}  {:<30}  {}",
            if e.flags.seen { ' ' } else { '*' },
            e.id,
            format_size(e.size, BINARY),
            truncate(&sender(&e.from), 30),
            e.subject
        );
    }
    println!(
        "{} message(s), {} unseen, {}",
        entries.len(),
        query::unseen_count(&entries),
        format_size(query::total_size(&entries), BINARY)
    );
    Ok(())
}

fn cmd_show(store: &MailStore, mailbox: &str, id: &str, raw: bool, peek: bool) -> anyhow::Result<()> {
    let mb = store.mailbox_for(mailbox);
    let msg = mb.get(id)?;

    if !raw {
        println!("Id:      {}", msg.id());
        println!("Date:    {}", msg.entry.date.to_rfc2822());
        println!("From:    {}", sender(&msg.entry.from));
        let to: Vec<String> = msg.entry.to.iter().map(|a| a.to_string()).collect();
        println!("To:      {}", to.join(", "));
        println!("Subject: {}", msg.subject());
        println!("Size:    {} bytes", msg.size());
        println!();
    }
    std::io::Write::write_all(&mut std::io::stdout(), &msg.raw)?;

    if !peek {
        mb.set_seen(id, true)?;
    }
    Ok(())
}

fn cmd_mailboxes(store: &MailStore, json: bool) -> anyhow::Result<()> {
    use humansize::{format_size, BINARY};

    let mut rows = Vec::new();
    for mb in store.all_mailboxes()? {
        let entries = mb.list()?;
        rows.push((mb, entries));
    }

    if json {
        let items: Vec<serde_json::Value> = rows
            .iter()
            .map(|(mb, entries)| {
                let range = query::date_range(entries);
                serde_json::json!({
                    "hash": mb.hash(),
                    "path": mb.path().display().to_string(),
                    "messages": entries.len(),
                    "unseen": query::unseen_count(entries),
                    "size": query::total_size(entries),
                    "oldest": range.map(|(oldest, _)| oldest.to_rfc3339()),
                    "newest": range.map(|(_, newest)| newest.to_rfc3339()),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    for (mb, entries) in &rows {
        println!(
            "{}  {:>5} message(s)  {:>10}",
            mb.hash(),
            entries.len(),
            format_size(query::total_size(entries), BINARY)
        );
    }
    println!("{} mailbox(es)", rows.len());
    Ok(())
}

fn entry_json(e: &MessageEntry) -> serde_json::Value {
    serde_json::json!({
        "id": e.id,
        "date": e.date.to_rfc3339(),
        "from": e.from.to_string(),
        "to": e.to.iter().map(|a| a.to_string()).collect::<Vec<_>>(),
        "subject": e.subject,
        "size": e.size,
        "seen": e.flags.seen,
    })
}

fn sender(from: &EmailAddress) -> String {
    if from.is_empty() {
        "(unknown sender)".to_string()
    } else {
        from.to_string()
    }
}

/// Truncate to at most `max` characters, marking the cut with an ellipsis.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
