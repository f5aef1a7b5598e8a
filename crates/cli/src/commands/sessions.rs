//! `wabridge sessions`: List stored sender → thread mappings.

use wabridge_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config =
        AppConfig::load_unvalidated().map_err(|e| format!("Failed to load config: {e}"))?;

    let store = wabridge_memory::open_from_config(&config.sessions).await?;
    let records = store.list().await?;

    if records.is_empty() {
        println!("No sessions stored ({}).", store.name());
        return Ok(());
    }

    println!("{:<20} {:<36} CREATED", "SENDER", "THREAD");
    for record in &records {
        println!(
            "{:<20} {:<36} {}",
            record.sender_id,
            record.session_handle,
            record.created_at.to_rfc3339()
        );
    }
    println!("\n{} session(s)", records.len());

    Ok(())
}
