// session.rs — Session subcommands: start, tare, dock, gross, invoice, exit,
// status, list.
//
// Denials print the reason and exit non-zero. A movement violation also
// prints the locked session so the operator can see why.

use clap::Subcommand;
use wb_session::{Session, SessionError, SessionLifecycle, SessionState, WeighbridgeConfig};

#[derive(Subcommand)]
pub enum SessionCommands {
    /// Admit a truck and open a session.
    Start {
        /// Truck identifier (e.g., "KA-01-1234").
        truck_id: String,
    },
    /// Record the empty (tare) weight in kg.
    Tare { truck_id: String, weight: f64 },
    /// Enter the loading dock.
    Dock { truck_id: String },
    /// Record the loaded (gross) weight in kg.
    Gross { truck_id: String, weight: f64 },
    /// Generate the invoice and lock movement.
    Invoice { truck_id: String },
    /// Let the truck leave and close the session.
    Exit { truck_id: String },
    /// Show the active session for a truck.
    Status { truck_id: String },
    /// List sessions, most recently updated first.
    List {
        /// Filter by state (e.g., "DOCK", "EXITED").
        #[arg(long)]
        state: Option<String>,
        /// Only show sessions that have not exited.
        #[arg(long)]
        active: bool,
    },
}

pub fn execute(cmd: &SessionCommands, config: &WeighbridgeConfig) -> anyhow::Result<()> {
    let lifecycle = config.open_lifecycle()?;

    match cmd {
        SessionCommands::Start { truck_id } => {
            report(lifecycle.start(truck_id), |s| format!("Session started for {}", s.truck_id))
        }
        SessionCommands::Tare { truck_id, weight } => report(
            lifecycle.record_tare(truck_id, *weight),
            |_| format!("Tare weight recorded: {} kg", weight),
        ),
        SessionCommands::Dock { truck_id } => report(lifecycle.enter_dock(truck_id), |s| {
            format!("Dock entry #{} confirmed", s.visit_count)
        }),
        SessionCommands::Gross { truck_id, weight } => report(
            lifecycle.record_gross(truck_id, *weight),
            |_| format!("Gross weight recorded: {} kg", weight),
        ),
        SessionCommands::Invoice { truck_id } => report(lifecycle.generate_invoice(truck_id), |_| {
            "Invoice generated. Movement is now locked.".to_string()
        }),
        SessionCommands::Exit { truck_id } => report(lifecycle.exit(truck_id), |_| {
            "Truck exited. Session complete.".to_string()
        }),
        SessionCommands::Status { truck_id } => report(lifecycle.get_active(truck_id), |_| {
            "Session retrieved".to_string()
        }),
        SessionCommands::List { state, active } => list_sessions(&lifecycle, state.as_deref(), *active),
    }
}

fn report(
    result: Result<Session, SessionError>,
    headline: impl FnOnce(&Session) -> String,
) -> anyhow::Result<()> {
    match result {
        Ok(session) => {
            println!("{}", headline(&session));
            print_session(&session);
            Ok(())
        }
        Err(SessionError::MovementViolation { reason, session }) => {
            println!("VIOLATION: {}", reason);
            print_session(&session);
            anyhow::bail!("dock access denied")
        }
        Err(e) if e.is_client_error() => {
            println!("{}", e);
            anyhow::bail!("action not performed")
        }
        Err(e) => Err(e.into()),
    }
}

fn print_session(s: &Session) {
    println!("  Truck:    {}", s.truck_id);
    println!("  State:    {}", s.state);
    if let Some(tare) = s.tare_weight {
        println!("  Tare:     {} kg", tare);
    }
    if let Some(gross) = s.gross_weight {
        println!("  Gross:    {} kg", gross);
    }
    if let Some(net) = s.net_weight() {
        println!("  Net:      {} kg", net);
    }
    println!("  Invoice:  {}", s.invoice_status);
    println!("  Locked:   {}", if s.movement_lock { "yes" } else { "no" });
    println!("  Visits:   {}", s.visit_count);
    println!("  Updated:  {}", s.updated_at.to_rfc3339());
}

fn list_sessions(
    lifecycle: &SessionLifecycle,
    state: Option<&str>,
    active_only: bool,
) -> anyhow::Result<()> {
    let state_filter = state.map(str::parse::<SessionState>).transpose()?;
    let sessions: Vec<Session> = lifecycle
        .list_all()?
        .into_iter()
        .filter(|s| state_filter.map_or(true, |wanted| s.state == wanted))
        .filter(|s| !active_only || s.is_active())
        .collect();

    if sessions.is_empty() {
        println!("No sessions found.");
        return Ok(());
    }

    println!(
        "{:<16} {:<18} {:>10} {:>10} {:>7} {:<6}",
        "TRUCK", "STATE", "TARE", "GROSS", "VISITS", "LOCK"
    );
    println!("{}", "-".repeat(72));

    for s in &sessions {
        println!(
            "{:<16} {:<18} {:>10} {:>10} {:>7} {:<6}",
            s.truck_id,
            s.state.to_string(),
            weight_cell(s.tare_weight),
            weight_cell(s.gross_weight),
            s.visit_count,
            if s.movement_lock { "yes" } else { "-" },
        );
    }
    println!("\n{} session(s) total.", sessions.len());

    Ok(())
}

fn weight_cell(weight: Option<f64>) -> String {
    weight.map_or_else(|| "-".to_string(), |w| w.to_string())
}
