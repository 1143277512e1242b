use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use dayplan::config::LayoutConfig;
use dayplan::engine::Engine;
use dayplan::model::{Appointment, LayoutDescriptor, ScheduleBlock, Span, WeeklySchedule};
use dayplan::store::{InMemoryStore, WriteSink};

/// A day's worth of store content, as loaded by the demo driver.
#[derive(Deserialize)]
struct SeedFile {
    schedule: WeeklySchedule,
    #[serde(default)]
    appointments: Vec<Appointment>,
    #[serde(default)]
    blocks: Vec<ScheduleBlock>,
}

#[derive(Serialize)]
struct DayReport {
    day: NaiveDate,
    layout: Vec<LayoutDescriptor>,
    open_slots: Vec<Span>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let metrics_port: Option<u16> = std::env::var("DAYPLAN_METRICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok());
    dayplan::observability::init(metrics_port)?;

    let mut args = std::env::args().skip(1);
    let (Some(seed_path), Some(day)) = (args.next(), args.next()) else {
        return Err("usage: dayplan <seed.json> <YYYY-MM-DD>".into());
    };
    let day = NaiveDate::parse_from_str(&day, "%Y-%m-%d")?;
    let min_slot: u32 = std::env::var("DAYPLAN_MIN_SLOT_MINUTES")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(15);

    let config = LayoutConfig::from_env()?;
    info!("window: {}:00-{}:00", config.window.start_hour, config.window.end_hour);

    let seed: SeedFile = serde_json::from_str(&std::fs::read_to_string(&seed_path)?)?;
    let store = InMemoryStore::new(seed.schedule);
    for appointment in seed.appointments {
        store.create(appointment).await?;
    }
    for block in seed.blocks {
        store.insert_block(block)?;
    }
    info!("loaded {} appointments from {seed_path}", store.appointment_count());

    let engine = Engine::new(Arc::new(store), config);
    let report = DayReport {
        day,
        layout: engine.day_layout(day).await?,
        open_slots: engine.open_slots(day, min_slot).await?,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
