use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::Utc;
use owo_colors::OwoColorize;
use poolday_core::config::PooldayConfig;
use poolday_core::queue::{OfflineQueue, ServiceRecordPayload};
use tracing::debug;

use crate::render::Render;

pub struct NewRecord {
    pub customer: String,
    pub appointment: Option<String>,
    pub technician: Option<String>,
    pub services: Vec<String>,
    pub readings: Vec<String>,
    pub notes: Option<String>,
}

pub fn add(config: &PooldayConfig, record: NewRecord) -> Result<()> {
    let readings = parse_readings(&record.readings)?;
    let queue = open(config)?;

    let payload = ServiceRecordPayload {
        appointment_id: record.appointment,
        customer_id: record.customer,
        technician_id: record.technician,
        performed_at: Utc::now(),
        services: record.services,
        readings,
        notes: record.notes,
        attachments: Vec::new(),
    };

    let queued = queue.enqueue(payload)?;
    println!("{} {}", "Queued".green(), queued.render());
    println!("{}", "Run `poolday sync` when you're back online.".dimmed());

    Ok(())
}

pub fn list(config: &PooldayConfig, json: bool) -> Result<()> {
    let queue = open(config)?;
    let records = queue.list()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("{}", "Queue is empty".dimmed());
        return Ok(());
    }

    for record in &records {
        println!("{}", record.render());
    }

    let failed = records.iter().filter(|r| r.is_failed()).count();
    println!(
        "\n{} queued{}",
        records.len(),
        if failed > 0 {
            format!(", {} failed last time", failed).red().to_string()
        } else {
            String::new()
        }
    );

    Ok(())
}

pub fn clear(config: &PooldayConfig) -> Result<()> {
    let queue = open(config)?;
    let count = queue.len()?;
    queue.clear()?;
    println!("Discarded {} queued {}", count, if count == 1 { "record" } else { "records" });
    Ok(())
}

pub(crate) fn open(config: &PooldayConfig) -> Result<OfflineQueue> {
    let dir = config.queue_path();
    let queue = OfflineQueue::open(&dir)
        .with_context(|| format!("Could not open queue at {}", dir.display()))?;
    debug!(dir = %dir.display(), "opened queue");
    Ok(queue)
}

fn parse_readings(raw: &[String]) -> Result<BTreeMap<String, f64>> {
    raw.iter()
        .map(|entry| -> Result<(String, f64)> {
            let (name, value) = entry
                .split_once('=')
                .with_context(|| format!("Reading '{}' should look like name=value", entry))?;
            let value: f64 = value
                .trim()
                .parse()
                .with_context(|| format!("Reading '{}' has a non-numeric value", entry))?;
            Ok((name.trim().to_string(), value))
        })
        .collect()
}
