//! `wabridge serve`: Start the webhook server.

use wabridge_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("wabridge gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Responder: {}", config.responder.kind);
    if let Some(recipient) = &config.whatsapp.recipient_waid {
        println!("   Replies to: {recipient}");
    }

    wabridge_gateway::start(config).await?;

    Ok(())
}
