// 📦 Dispatch CLI - public tracking lookup + admin commands
//
// Default command (no arguments) opens the terminal dashboard.

// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, BufRead, Read, Write};
use std::path::PathBuf;

use dispatch_tracker::entities::parse_date;
use dispatch_tracker::{
    logging, parse_date_range, AiGateway, AppConfig, ChatTurn, EventDraft, KeyValueStorage,
    Shipment, ShipmentDraft, ShipmentFilter, ShipmentStatus, ShipmentStore, SqliteStorage,
    StatusFilter,
};

const NOT_FOUND_MESSAGE: &str = "Tracking number not found. Please check your number and try again.";
const IMPORT_FAILED_MESSAGE: &str = "Failed to parse manifest. Please try again.";
const DEFAULT_UPDATE_DETAILS: &str = "Standard update";

#[derive(Parser)]
#[command(name = "dispatch", version, about = "Shipment tracking and dispatch admin")]
struct Cli {
    /// Config file (default: <config_dir>/dispatch/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overrides config and DISPATCH_DB
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Look up a shipment by tracking number
    Track { tracking_number: String },

    /// List shipments with optional filters
    List {
        /// Substring of tracking number or recipient
        #[arg(long, short)]
        search: Option<String>,

        #[arg(long)]
        status: Option<ShipmentStatus>,

        /// ETA on or after this day (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// ETA on or before this day (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Create a shipment
    Create {
        #[arg(long)]
        sender: String,
        #[arg(long)]
        recipient: String,
        #[arg(long)]
        origin: String,
        #[arg(long)]
        destination: String,

        /// Generated when omitted
        #[arg(long)]
        tracking_number: Option<String>,

        /// Estimated delivery day (YYYY-MM-DD), default today + 5
        #[arg(long)]
        eta: Option<String>,
    },

    /// Record a status update on a shipment
    Update {
        id: String,

        #[arg(long)]
        status: ShipmentStatus,

        #[arg(long)]
        location: String,

        /// Event description, or the context for --ai
        #[arg(long)]
        details: Option<String>,

        /// New estimated delivery day (YYYY-MM-DD)
        #[arg(long)]
        eta: Option<String>,

        /// Draft the description with the AI model
        #[arg(long)]
        ai: bool,
    },

    /// Delete one or more shipments by id
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Import shipments from a free-text manifest (file or "-" for stdin)
    Import { source: String },

    /// Suggest the next action for a shipment
    Suggest { id: String },

    /// Customer support chat (empty line or "exit" to quit)
    Chat,

    /// Overwrite all data with the demo fixtures
    Reset {
        #[arg(long)]
        yes: bool,
    },

    /// Open the terminal dashboard
    Ui,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.storage.path = db;
    }

    let command = cli.command.unwrap_or(Command::Ui);
    if matches!(command, Command::Ui) {
        // The alternate screen owns the terminal
        logging::init_quiet();
    } else {
        logging::init();
    }

    run_command(command, &config)
}

fn open_store(config: &AppConfig) -> Result<ShipmentStore<SqliteStorage>> {
    let storage = SqliteStorage::open(&config.storage.path)
        .with_context(|| format!("Failed to open database {}", config.storage.path.display()))?;
    Ok(ShipmentStore::open(storage))
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("Failed to start async runtime")
}

fn run_command(command: Command, config: &AppConfig) -> Result<()> {
    let mut store = open_store(config)?;
    let gateway = AiGateway::from_config(&config.ai);

    match command {
        Command::Track { tracking_number } => {
            match store.find_by_tracking_number(&tracking_number)? {
                Some(shipment) => print_tracking(&shipment),
                None => println!("{}", NOT_FOUND_MESSAGE),
            }
        }

        Command::List {
            search,
            status,
            from,
            to,
            format,
        } => {
            let filter = build_filter(search, status, from.as_deref(), to.as_deref())?;
            let shipments = store.list_all()?;
            let visible = filter.apply(&shipments);

            match format {
                OutputFormat::Table => print_table(&visible),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&visible)?),
                OutputFormat::Csv => write_csv(&visible, io::stdout())?,
            }
        }

        Command::Create {
            sender,
            recipient,
            origin,
            destination,
            tracking_number,
            eta,
        } => {
            let mut draft = ShipmentDraft::new(sender, recipient, origin, destination);
            if let Some(tracking_number) = tracking_number {
                draft = draft.with_tracking_number(tracking_number);
            }
            if let Some(eta) = eta {
                draft = draft.with_estimated_delivery(parse_date(&eta)?);
            }

            let shipment = store.create(draft)?;
            println!("✓ Created {} ({})", shipment.tracking_number, shipment.id);
        }

        Command::Update {
            id,
            status,
            location,
            details,
            eta,
            ai,
        } => {
            if store.find_by_id(&id)?.is_none() {
                bail!("Shipment not found: {}", id);
            }

            let description = if ai && gateway.is_configured() {
                let details = details.as_deref().unwrap_or(DEFAULT_UPDATE_DETAILS);
                runtime()?.block_on(gateway.draft_status_message(status, &location, details))
            } else {
                if ai {
                    eprintln!("⚠️  AI not configured, using the details as entered");
                }
                details.unwrap_or_default()
            };

            let mut draft = EventDraft::new(status, location).with_description(description);
            if let Some(eta) = eta {
                draft = draft.with_estimated_delivery(parse_date(&eta)?);
            }

            let shipment = store.record_event(&id, draft)?;
            println!(
                "✓ {} is now {}",
                shipment.tracking_number, shipment.current_status
            );
            if let Some(event) = shipment.latest_event() {
                println!("  {}", event.description);
            }
        }

        Command::Delete { ids } => {
            let removed = store.remove_many(&ids)?;
            println!("✓ Deleted {} of {} shipment(s)", removed, ids.len());
        }

        Command::Import { source } => {
            let text = read_source(&source)?;
            if !gateway.is_configured() {
                bail!("AI API key not configured (set GEMINI_API_KEY)");
            }

            let imported = match import_text(&mut store, &gateway, &text) {
                Ok(imported) => imported,
                Err(err) => {
                    store.close()?;
                    return Err(err);
                }
            };
            println!("✓ Imported {} shipment(s)", imported.len());
            for shipment in &imported {
                println!(
                    "  {}  {} → {}",
                    shipment.tracking_number, shipment.origin, shipment.destination
                );
            }
        }

        Command::Suggest { id } => {
            let shipment = store
                .find_by_id(&id)?
                .with_context(|| format!("Shipment not found: {}", id))?;
            let suggestion =
                runtime()?.block_on(gateway.suggest_next_action(shipment.current_status));
            if suggestion.is_empty() {
                println!("No suggestion available.");
            } else {
                println!("✨ {}", suggestion);
            }
        }

        Command::Chat => run_chat(&gateway)?,

        Command::Reset { yes } => {
            if !yes {
                bail!("Refusing to reset without --yes (this replaces ALL shipments)");
            }
            let seeded = store.reset()?;
            println!("✓ Store reset to {} demo shipments", seeded.len());
        }

        Command::Ui => return run_ui_mode(store, gateway),
    }

    store.close()?;
    Ok(())
}

fn build_filter(
    search: Option<String>,
    status: Option<ShipmentStatus>,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<ShipmentFilter> {
    let mut filter = ShipmentFilter::new();
    if let Some(search) = search {
        filter = filter.with_text(search);
    }
    if let Some(status) = status {
        filter = filter.with_status(StatusFilter::Only(status));
    }
    if from.is_some() || to.is_some() {
        let range = parse_date_range(&format!("{}..{}", from.unwrap_or(""), to.unwrap_or("")))?;
        filter = filter.with_dates(range);
    }
    Ok(filter)
}

/// Parse a manifest with the model and prepend the results to the store
fn import_text<S: KeyValueStorage>(
    store: &mut ShipmentStore<S>,
    gateway: &AiGateway,
    text: &str,
) -> Result<Vec<Shipment>> {
    let records = runtime()?
        .block_on(gateway.parse_manifest(text))
        .map_err(|err| {
            tracing::error!(error = %err, "manifest import failed");
            err
        })
        .context(IMPORT_FAILED_MESSAGE)?;
    Ok(store.import_manifest(records)?)
}

fn read_source(source: &str) -> Result<String> {
    if source == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read manifest from stdin")?;
        Ok(text)
    } else {
        std::fs::read_to_string(source).with_context(|| format!("Failed to read {}", source))
    }
}

fn run_chat(gateway: &AiGateway) -> Result<()> {
    let rt = runtime()?;
    let mut history: Vec<ChatTurn> = vec![ChatTurn::model(
        "Hi! I'm the Dispatch support assistant. How can I help you today?",
    )];
    println!("🤖 {}", history[0].text);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else { break };
        let message = line?;
        let message = message.trim();
        if message.is_empty() || message.eq_ignore_ascii_case("exit") {
            break;
        }

        let reply = rt.block_on(gateway.support_reply(&history, message));
        println!("🤖 {}", reply);

        history.push(ChatTurn::user(message));
        history.push(ChatTurn::model(reply));
    }

    Ok(())
}

// ============================================================================
// OUTPUT
// ============================================================================

fn day(instant: &DateTime<Utc>) -> String {
    instant.format("%Y-%m-%d").to_string()
}

fn print_tracking(shipment: &Shipment) {
    let display = shipment.current_status.display();

    println!("📦 {}", shipment.tracking_number);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Status:      {} {}", display.icon.glyph(), display.label);
    println!("From:        {}", shipment.origin);
    println!("To:          {}", shipment.destination);
    println!("Recipient:   {}", shipment.recipient);
    println!("Est. delivery: {}", day(&shipment.estimated_delivery));
    println!();
    println!("Shipment Progress");
    for event in shipment.timeline() {
        println!(
            "  {} {}  {}  {}",
            event.status.display().icon.glyph(),
            event.timestamp.format("%Y-%m-%d %H:%M"),
            event.status,
            event.location
        );
        if !event.description.is_empty() {
            println!("      {}", event.description);
        }
    }
}

fn print_table(shipments: &[&Shipment]) {
    println!(
        "{:<34} {:<14} {:<20} {:<38} {:<17} {}",
        "ID", "Tracking", "Recipient", "Route", "Status", "ETA"
    );
    for s in shipments {
        println!(
            "{:<34} {:<14} {:<20} {:<38} {:<17} {}",
            s.id,
            s.tracking_number,
            s.recipient,
            format!("{} → {}", s.origin, s.destination),
            s.current_status,
            day(&s.estimated_delivery)
        );
    }
    println!("\n{} shipment(s)", shipments.len());
}

fn write_csv<W: Write>(shipments: &[&Shipment], out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record([
        "id",
        "tracking_number",
        "sender",
        "recipient",
        "origin",
        "destination",
        "status",
        "estimated_delivery",
        "last_updated",
    ])?;
    for s in shipments {
        let eta = s.estimated_delivery.to_rfc3339();
        let updated = s.last_updated.to_rfc3339();
        writer.write_record([
            s.id.as_str(),
            s.tracking_number.as_str(),
            s.sender.as_str(),
            s.recipient.as_str(),
            s.origin.as_str(),
            s.destination.as_str(),
            s.current_status.as_str(),
            eta.as_str(),
            updated.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(store: ShipmentStore<SqliteStorage>, gateway: AiGateway) -> Result<()> {
    let rt = runtime()?;

    let mut app = ui::App::new(store)?.with_suggestions(gateway, rt.handle().clone());
    ui::run_ui(&mut app)?;

    app.into_store().close()?;
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_store: ShipmentStore<SqliteStorage>, _gateway: AiGateway) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the API: cargo run --bin dispatch-server --features server");
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_cli_parses_list_filters() {
        let cli = Cli::try_parse_from([
            "dispatch", "list", "--status", "in_transit", "--from", "2025-01-01", "--format", "csv",
        ])
        .unwrap();
        match cli.command {
            Some(Command::List { status, from, format, .. }) => {
                assert_eq!(status, Some(ShipmentStatus::InTransit));
                assert_eq!(from.as_deref(), Some("2025-01-01"));
                assert!(matches!(format, OutputFormat::Csv));
            }
            _ => panic!("expected list"),
        }
    }

    #[test]
    fn test_cli_defaults_to_ui() {
        let cli = Cli::try_parse_from(["dispatch"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_delete_requires_ids() {
        assert!(Cli::try_parse_from(["dispatch", "delete"]).is_err());
    }

    #[test]
    fn test_build_filter_half_open_range() {
        let filter = build_filter(None, None, None, Some("2025-03-01")).unwrap();
        assert_eq!(filter.dates.start, None);
        assert_eq!(filter.dates.end, NaiveDate::from_ymd_opt(2025, 3, 1));

        assert!(build_filter(None, None, Some("03/01/2025"), None).is_err());
    }

    struct GarbledModel;

    #[async_trait::async_trait]
    impl dispatch_tracker::TextModel for GarbledModel {
        async fn generate(
            &self,
            _request: dispatch_tracker::GenerateRequest,
        ) -> Result<String, dispatch_tracker::GatewayError> {
            Ok("no shipments here".to_string())
        }
    }

    #[test]
    fn test_import_failure_is_an_error() {
        let mut store = ShipmentStore::open(dispatch_tracker::MemoryStorage::new());
        let gateway = AiGateway::with_model(std::sync::Arc::new(GarbledModel));

        let err = import_text(&mut store, &gateway, "a crate to Provo").unwrap_err();
        assert_eq!(err.to_string(), IMPORT_FAILED_MESSAGE);
        assert_eq!(store.list_all().unwrap().len(), 2);
    }

    #[test]
    fn test_csv_output_has_header_and_rows() {
        let shipments = dispatch_tracker::store::seed_shipments(Utc::now());
        let refs: Vec<&Shipment> = shipments.iter().collect();

        let mut out = Vec::new();
        write_csv(&refs, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("id,tracking_number"));
        assert!(lines[1].contains("TRK-8859201"));
    }
}
