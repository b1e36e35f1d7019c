// events.rs — `wb events <truck>`: one truck's audit trail.

use wb_session::WeighbridgeConfig;

pub fn execute(config: &WeighbridgeConfig, truck_id: &str, n: usize) -> anyhow::Result<()> {
    let lifecycle = config.open_lifecycle()?;
    let events = lifecycle.events(truck_id)?;

    if events.is_empty() {
        println!("No events for truck {}.", truck_id.trim());
        return Ok(());
    }

    println!("{:<20} {:<18} MESSAGE", "TIMESTAMP", "EVENT");
    println!("{}", "-".repeat(80));
    for event in events.iter().take(n) {
        println!(
            "{:<20} {:<18} {}",
            event.timestamp.format("%Y-%m-%d %H:%M:%S"),
            event.event_type,
            event.message,
        );
    }
    println!("\n{} event(s) found.", events.len());

    Ok(())
}
