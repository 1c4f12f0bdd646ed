use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tabled::{settings::Style, Table, Tabled};
use tracing_subscriber::EnvFilter;

use client_portal::collection::{DetailState, InvoiceFilters, DEFAULT_ORDERING};
use client_portal::config::{
    clear_session, config_dir, load_config, load_session, resolve_output_dir, save_session,
    CONFIG_TEMPLATE,
};
use client_portal::invoice::{format_amount, invoice_summary, InvoiceSummary};
use client_portal::{
    ApiClient, Config, Invoice, InvoiceCollection, InvoiceDetail, InvoiceId, PortalError,
    Result, Session,
};

#[derive(Parser)]
#[command(name = "portal")]
#[command(version, about = "Client portal for cleaning-service invoices", long_about = None)]
struct Cli {
    /// Path to config directory (default: ~/.portal or XDG config)
    #[arg(short = 'C', long, global = true)]
    config_dir: Option<PathBuf>,

    /// Log requests and state changes to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory with a template config.toml
    Init,

    /// Store an API token for later commands
    Login {
        /// Bearer token issued by the portal
        #[arg(long)]
        token: String,

        /// Account the token belongs to
        #[arg(long)]
        user: Option<String>,
    },

    /// Forget the stored API token
    Logout,

    /// Show config and login status
    Status,

    /// List invoices
    List {
        /// Match invoice number, client or NDIS participant
        #[arg(short, long)]
        search: Option<String>,

        /// Only this status (draft, sent, paid, overdue, cancelled, all)
        #[arg(long)]
        status: Option<String>,

        /// NDIS invoices only (true) or exclude them (false)
        #[arg(long)]
        ndis: Option<bool>,

        #[arg(long)]
        email_sent: Option<bool>,

        #[arg(long)]
        deposit_required: Option<bool>,

        #[arg(long)]
        deposit_paid: Option<bool>,

        /// Sort field; prefix with '-' for descending (e.g. -total_amount)
        #[arg(short, long, allow_hyphen_values = true)]
        ordering: Option<String>,

        /// Predefined subset to show instead of the filtered list
        #[arg(long, value_enum, default_value_t = View::All)]
        view: View,

        /// Show at most this many invoices
        #[arg(short, long)]
        limit: Option<usize>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show one invoice in detail
    Show {
        /// Invoice id
        id: String,

        #[arg(long)]
        json: bool,
    },

    /// Summarise totals, statuses and deposits
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Download an invoice PDF
    Download {
        /// Invoice id
        id: String,

        /// Directory to save into (default: download.output_dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Email an invoice again
    Resend {
        /// Invoice id
        id: String,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum View {
    All,
    Overdue,
    Recent,
    Ndis,
    Deposits,
    PendingDeposits,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    // Determine config directory
    let cfg_dir = match cli.config_dir {
        Some(p) => p,
        None => config_dir()?,
    };

    match cli.command {
        Commands::Init => cmd_init(&cfg_dir),
        Commands::Login { token, user } => cmd_login(&cfg_dir, &token, user),
        Commands::Logout => cmd_logout(&cfg_dir),
        Commands::Status => cmd_status(&cfg_dir),
        Commands::List {
            search,
            status,
            ndis,
            email_sent,
            deposit_required,
            deposit_paid,
            ordering,
            view,
            limit,
            json,
        } => {
            let filters = InvoiceFilters {
                search: search.unwrap_or_default(),
                status: status.unwrap_or_else(|| "all".to_string()),
                is_ndis: ndis,
                email_sent,
                deposit_required,
                deposit_paid,
                ordering: ordering.unwrap_or_else(|| DEFAULT_ORDERING.to_string()),
            };
            cmd_list(&cfg_dir, filters, view, limit, json)
        }
        Commands::Show { id, json } => cmd_show(&cfg_dir, &id, json),
        Commands::Stats { json } => cmd_stats(&cfg_dir, json),
        Commands::Download { id, output } => cmd_download(&cfg_dir, &id, output),
        Commands::Resend { id } => cmd_resend(&cfg_dir, &id),
    }
}

/// Initialize config directory with template files
fn cmd_init(cfg_dir: &Path) -> Result<()> {
    use std::fs;

    if cfg_dir.exists() {
        return Err(PortalError::AlreadyInitialized(cfg_dir.to_path_buf()));
    }

    fs::create_dir_all(cfg_dir)?;
    fs::write(cfg_dir.join("config.toml"), CONFIG_TEMPLATE)?;

    println!("Initialized portal config at: {}", cfg_dir.display());
    println!();
    println!("Next steps:");
    println!(
        "  1. Point at your portal API:  $EDITOR {}/config.toml",
        cfg_dir.display()
    );
    println!("  2. Log in:                    portal login --token <TOKEN>");

    Ok(())
}

fn cmd_login(cfg_dir: &Path, token: &str, user: Option<String>) -> Result<()> {
    if !cfg_dir.exists() {
        return Err(PortalError::ConfigNotFound(cfg_dir.to_path_buf()));
    }

    let session = Session::new(token.trim(), user);
    save_session(cfg_dir, &session)?;
    println!("Logged in as {}", session.identity());
    Ok(())
}

fn cmd_logout(cfg_dir: &Path) -> Result<()> {
    if clear_session(cfg_dir)? {
        println!("Logged out.");
    } else {
        println!("Not logged in.");
    }
    Ok(())
}

fn cmd_status(cfg_dir: &Path) -> Result<()> {
    if !cfg_dir.exists() {
        return Err(PortalError::ConfigNotFound(cfg_dir.to_path_buf()));
    }

    let config = load_config(cfg_dir)?;
    let session = load_session(cfg_dir)?;

    println!("Portal Status");
    println!("{}", "-".repeat(50));
    println!("Config directory: {}", cfg_dir.display());
    println!("API:              {}", config.api.base_url);
    println!(
        "Downloads:        {}",
        resolve_output_dir(&config.download.output_dir, cfg_dir).display()
    );
    match session {
        Some(session) => println!(
            "Logged in as:     {} (since {})",
            session.identity(),
            session.created_at.format("%-d %b %Y %H:%M UTC")
        ),
        None => println!("Logged in as:     (not logged in)"),
    }

    Ok(())
}

/// Everything a command needs to talk to the API
struct Connection {
    config: Config,
    session: Session,
    api: ApiClient,
}

fn connect(cfg_dir: &Path) -> Result<Connection> {
    if !cfg_dir.exists() {
        return Err(PortalError::ConfigNotFound(cfg_dir.to_path_buf()));
    }

    let config = load_config(cfg_dir)?;
    let session = load_session(cfg_dir)?.ok_or(PortalError::NotLoggedIn)?;
    let api = ApiClient::new(
        &config.api.base_url,
        &session.token,
        Duration::from_secs(config.api.timeout_secs),
    );

    Ok(Connection {
        config,
        session,
        api,
    })
}

/// A 401 anywhere signs the user out.
fn check_auth(cfg_dir: &Path, expired: bool) -> Result<()> {
    if expired {
        clear_session(cfg_dir)?;
        return Err(PortalError::Auth);
    }
    Ok(())
}

/// Fetch the user's invoices with the given filters applied.
fn load_collection(
    cfg_dir: &Path,
    conn: &Connection,
    filters: InvoiceFilters,
) -> Result<InvoiceCollection> {
    let mut collection = InvoiceCollection::new(Some(conn.session.identity()));
    collection.set_filters(filters);
    collection.refresh(&conn.api);
    check_auth(cfg_dir, collection.auth_expired())?;

    if let Some(error) = collection.error() {
        return Err(PortalError::LoadFailed(error.to_string()));
    }
    Ok(collection)
}

#[derive(Tabled)]
struct InvoiceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "NUMBER")]
    number: String,
    #[tabled(rename = "CLIENT")]
    client: String,
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "DUE")]
    due: String,
    #[tabled(rename = "TOTAL")]
    total: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "NOTES")]
    notes: String,
}

impl From<&InvoiceSummary> for InvoiceRow {
    fn from(summary: &InvoiceSummary) -> Self {
        let mut notes = Vec::new();
        if summary.is_overdue {
            notes.push(format!("overdue {}d", summary.days_overdue));
        }
        if summary.is_ndis {
            notes.push("NDIS".to_string());
        }
        if let Some(deposit) = &summary.deposit {
            let state = if deposit.paid { "paid" } else { "due" };
            notes.push(format!("deposit {} {}", deposit.formatted_amount, state));
        }
        if summary.email_sent {
            notes.push("emailed".to_string());
        }

        Self {
            id: summary.id.clone(),
            number: summary.invoice_number.clone(),
            client: summary.client_name.clone(),
            date: summary.invoice_date.clone(),
            due: summary.due_date.clone(),
            total: summary.total_amount.clone(),
            status: summary.status.clone(),
            notes: notes.join(", "),
        }
    }
}

#[derive(Tabled)]
struct LineItemRow {
    #[tabled(rename = "DESCRIPTION")]
    description: String,
    #[tabled(rename = "QTY")]
    quantity: String,
    #[tabled(rename = "UNIT PRICE")]
    unit_price: String,
    #[tabled(rename = "GST")]
    gst: String,
    #[tabled(rename = "TOTAL")]
    total: String,
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| PortalError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
    println!("{text}");
    Ok(())
}

/// List invoices
fn cmd_list(
    cfg_dir: &Path,
    filters: InvoiceFilters,
    view: View,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let conn = connect(cfg_dir)?;
    let collection = load_collection(cfg_dir, &conn, filters)?;

    let mut invoices: Vec<Arc<Invoice>> = match view {
        View::All => collection.filtered().to_vec(),
        View::Overdue => collection.overdue(),
        View::Recent => collection.recent(conn.config.display.recent_limit),
        View::Ndis => collection.ndis(),
        View::Deposits => collection.deposit_required(),
        View::PendingDeposits => collection.deposit_pending(),
    };
    if let Some(n) = limit {
        invoices.truncate(n);
    }

    let summaries: Vec<InvoiceSummary> = invoices
        .iter()
        .map(|inv| invoice_summary(Some(inv.as_ref())))
        .collect();

    if json {
        return print_json(&summaries);
    }

    if summaries.is_empty() {
        println!("No invoices found.");
        return Ok(());
    }

    let rows: Vec<InvoiceRow> = summaries.iter().map(InvoiceRow::from).collect();
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");

    let shown_total = invoices
        .iter()
        .fold(Decimal::ZERO, |sum, inv| sum.saturating_add(inv.total_amount));
    println!();
    println!(
        "Showing {} of {} invoices, {} total",
        invoices.len(),
        collection.invoices().len(),
        format_amount(shown_total)
    );

    Ok(())
}

/// Show one invoice in detail
fn cmd_show(cfg_dir: &Path, id: &str, json: bool) -> Result<()> {
    let conn = connect(cfg_dir)?;
    let mut detail = InvoiceDetail::new();
    let id = InvoiceId::from(id);

    let state = detail.load(&conn.api, id.clone()).clone();
    check_auth(cfg_dir, detail.auth_expired())?;

    let invoice = match state {
        DetailState::Loaded(invoice) => invoice,
        DetailState::NotFound => return Err(PortalError::NotFound(format!("invoice {}", id))),
        DetailState::Failed(message) => return Err(PortalError::LoadFailed(message)),
        DetailState::Idle | DetailState::Loading => return Ok(()),
    };
    let summary = detail.summary();

    if json {
        return print_json(&summary);
    }

    println!("Invoice {}", summary.invoice_number);
    println!("{}", "-".repeat(50));
    println!("Client:         {}", summary.client_name);
    if !invoice.billing_address.is_empty() {
        println!("Billing:        {}", invoice.billing_address);
    }
    if !invoice.service_address.is_empty() {
        println!("Service at:     {}", invoice.service_address);
    }
    println!("Status:         {}", summary.status);
    println!("Issued:         {}", summary.invoice_date);
    println!("Due:            {}", summary.due_date);
    println!("Service period: {}", summary.service_period);
    if summary.is_overdue {
        println!("Overdue:        {} days", summary.days_overdue);
    }

    if let Some(ndis) = &summary.ndis {
        println!();
        println!("NDIS participant: {}", ndis.participant_name);
        println!("NDIS number:      {}", ndis.ndis_number);
    }

    if !invoice.items.is_empty() {
        let rows: Vec<LineItemRow> = invoice
            .items
            .iter()
            .map(|item| LineItemRow {
                description: item.description.clone(),
                quantity: item.quantity.normalize().to_string(),
                unit_price: format_amount(item.unit_price),
                gst: if item.is_taxable {
                    format_amount(item.gst_amount)
                } else {
                    "-".to_string()
                },
                total: format_amount(item.total_price),
            })
            .collect();
        println!();
        println!("{}", Table::new(rows).with(Style::rounded()));
    }

    println!();
    println!("Subtotal:       {}", summary.subtotal);
    println!("GST:            {}", summary.gst_amount);
    println!("Total:          {}", summary.total_amount);

    if let Some(deposit) = &summary.deposit {
        let percentage = deposit
            .percentage
            .map(|p| format!(" ({}%)", p.normalize()))
            .unwrap_or_default();
        println!();
        println!("Deposit:        {}{}", deposit.formatted_amount, percentage);
        if deposit.paid {
            println!("Deposit paid:   {}", deposit.formatted_paid_date);
        } else {
            println!("Deposit paid:   no");
        }
        println!("Remaining:      {}", deposit.formatted_remaining_balance);
    }

    Ok(())
}

/// Summarise the user's invoices
fn cmd_stats(cfg_dir: &Path, json: bool) -> Result<()> {
    let conn = connect(cfg_dir)?;
    let collection = load_collection(cfg_dir, &conn, InvoiceFilters::default())?;
    let stats = collection.stats();

    if json {
        return print_json(stats);
    }

    println!("Invoice Summary");
    println!("{}", "-".repeat(50));
    println!("Invoices:          {}", stats.total);
    for (status, count) in &stats.by_status {
        println!("  {:<16} {}", status, count);
    }
    println!("NDIS invoices:     {}", stats.ndis);
    println!("Total billed:      {}", format_amount(stats.total_amount));
    println!("Overdue:           {}", format_amount(stats.overdue_amount));
    println!(
        "Deposits:          {} required, {} paid, {} pending ({})",
        stats.deposit_required,
        stats.deposit_paid,
        stats.deposit_pending,
        format_amount(stats.total_deposit_amount)
    );

    Ok(())
}

/// Download an invoice PDF
fn cmd_download(cfg_dir: &Path, id: &str, output: Option<PathBuf>) -> Result<()> {
    let conn = connect(cfg_dir)?;
    let out_dir = output
        .unwrap_or_else(|| resolve_output_dir(&conn.config.download.output_dir, cfg_dir));

    let mut collection = load_collection(cfg_dir, &conn, InvoiceFilters::default())?;
    let outcome = collection.download_invoice(&conn.api, &InvoiceId::from(id), &out_dir);
    check_auth(cfg_dir, collection.auth_expired())?;

    match outcome.data {
        Some(path) if outcome.success => {
            println!("Saved {}", path.display());
            Ok(())
        }
        _ => Err(PortalError::ActionFailed(
            outcome
                .error
                .unwrap_or_else(|| "Failed to download invoice".to_string()),
        )),
    }
}

/// Email an invoice again
fn cmd_resend(cfg_dir: &Path, id: &str) -> Result<()> {
    let conn = connect(cfg_dir)?;
    let mut collection = load_collection(cfg_dir, &conn, InvoiceFilters::default())?;
    let id = InvoiceId::from(id);

    let outcome = collection.resend_invoice_email(&conn.api, &id);
    check_auth(cfg_dir, collection.auth_expired())?;

    if !outcome.success {
        return Err(PortalError::ActionFailed(
            outcome
                .error
                .unwrap_or_else(|| "Failed to resend invoice email".to_string()),
        ));
    }

    println!("{}", outcome.data.unwrap_or_default());
    if let Some(invoice) = collection.get_invoice_by_id(&id) {
        if let Some(sent_at) = invoice.email_sent_at {
            println!(
                "  {} marked as emailed at {}",
                invoice.invoice_number,
                sent_at.format("%-d %b %Y %H:%M UTC")
            );
        }
    }

    Ok(())
}
