// audit.rs — Audit subcommands: verify, tail.

use clap::Subcommand;
use wb_audit::{AuditError, JsonlAuditLog};
use wb_session::WeighbridgeConfig;

#[derive(Subcommand)]
pub enum AuditCommands {
    /// Verify the audit log hash chain.
    Verify {
        /// Path to audit log (defaults to .weighbridge/audit.jsonl).
        #[arg(long)]
        log: Option<String>,
    },
    /// Show the most recent events across all trucks.
    Tail {
        /// Path to audit log (defaults to .weighbridge/audit.jsonl).
        #[arg(long)]
        log: Option<String>,
        /// Number of events to show.
        #[arg(short, default_value = "10")]
        n: usize,
        /// Only show REJECTED and VIOLATION events.
        #[arg(long)]
        denials: bool,
    },
}

pub fn execute(cmd: &AuditCommands, config: &WeighbridgeConfig) -> anyhow::Result<()> {
    match cmd {
        AuditCommands::Verify { log } => {
            let path = log
                .as_ref()
                .map(std::path::PathBuf::from)
                .unwrap_or_else(|| config.audit_log.clone());

            if !path.exists() {
                println!("No audit log found at {}", path.display());
                return Ok(());
            }

            match JsonlAuditLog::verify_chain(&path) {
                Ok(count) => {
                    println!("Audit log verified: {} event(s), hash chain intact.", count);
                }
                Err(AuditError::IntegrityViolation {
                    line,
                    expected,
                    actual,
                }) => {
                    println!("INTEGRITY VIOLATION at line {}:", line);
                    println!("  Expected previous hash: {}", expected);
                    println!("  Actual previous hash:   {}", actual);
                    println!();
                    println!("The audit log has been modified after it was written.");
                    anyhow::bail!("Audit log integrity check failed");
                }
                Err(e) => return Err(e.into()),
            }
        }

        AuditCommands::Tail { log, n, denials } => {
            let path = log
                .as_ref()
                .map(std::path::PathBuf::from)
                .unwrap_or_else(|| config.audit_log.clone());

            if !path.exists() {
                println!("No audit log found at {}", path.display());
                return Ok(());
            }

            let events: Vec<_> = JsonlAuditLog::read_all(&path)?
                .into_iter()
                .filter(|e| !*denials || e.event_type.is_denial())
                .collect();
            let start = events.len().saturating_sub(*n);
            let recent = &events[start..];

            if recent.is_empty() {
                println!("No audit events.");
                return Ok(());
            }

            println!(
                "{:<20} {:<14} {:<18} MESSAGE",
                "TIMESTAMP", "TRUCK", "EVENT"
            );
            println!("{}", "-".repeat(90));

            for event in recent {
                println!(
                    "{:<20} {:<14} {:<18} {}",
                    event.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    event.truck_id,
                    event.event_type,
                    event.message,
                );
            }
        }
    }

    Ok(())
}
