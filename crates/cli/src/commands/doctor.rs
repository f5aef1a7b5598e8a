//! `wabridge doctor`: Diagnose configuration.

use wabridge_config::{AppConfig, ResponderKind, SessionBackend};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 wabridge Doctor: Configuration Diagnostics");
    println!("==============================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_path();
    if config_path.exists() {
        println!("  ✅ Config file found: {}", config_path.display());
    } else {
        println!("  ⚠️  No config file, using defaults and environment (run `wabridge onboard`)");
    }

    let config = match AppConfig::load_unvalidated() {
        Ok(config) => config,
        Err(e) => {
            println!("  ❌ Config could not be loaded: {e}");
            println!("\n  ⚠️  1 issue(s) found. See above for details.");
            return Ok(());
        }
    };

    match config.validate() {
        Ok(()) => println!("  ✅ Webhook secrets configured"),
        Err(e) => {
            println!("  ❌ {e}");
            issues += 1;
        }
    }

    let missing = config.missing_send_settings();
    if missing.is_empty() {
        println!("  ✅ Send endpoint: {}", config.whatsapp.messages_url().unwrap_or_default());
    } else {
        println!("  ❌ Cannot send replies, missing: {}", missing.join(", "));
        issues += 1;
    }

    match &config.whatsapp.recipient_waid {
        Some(id) => println!("  ✅ Replies go to RECIPIENT_WAID {id}"),
        None => println!("  ✅ Replies go to each sender"),
    }

    println!("  ✅ Responder: {}", config.responder.kind);
    if config.responder.kind == ResponderKind::Assistant {
        match config.sessions.backend {
            SessionBackend::Sqlite => println!(
                "  ✅ Sessions stored in {}",
                config.sessions.resolved_path().display()
            ),
            SessionBackend::InMemory => {
                println!("  ⚠️  Sessions kept in memory; conversations reset on restart")
            }
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
