//! `wabridge send`: Send a message through the WhatsApp Cloud API.

use clap::{ArgGroup, Args};
use wabridge_channels::whatsapp::codec::{self, Envelope};
use wabridge_channels::{WhatsAppChannel, WhatsAppChannelConfig};
use wabridge_config::AppConfig;

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("content").required(true).args(["text", "template"])))]
pub struct SendArgs {
    /// Recipient WhatsApp id (defaults to RECIPIENT_WAID)
    #[arg(long)]
    pub to: Option<String>,

    /// Free-form text body
    #[arg(long)]
    pub text: Option<String>,

    /// Approved template name, e.g. hello_world
    #[arg(long)]
    pub template: Option<String>,

    /// Template language code
    #[arg(long, default_value = "en_US")]
    pub language: String,
}

fn build_envelope(args: &SendArgs, default_recipient: Option<&str>) -> Result<Envelope, String> {
    let to = args
        .to
        .as_deref()
        .or(default_recipient)
        .filter(|t| !t.trim().is_empty())
        .ok_or("No recipient: pass --to or set RECIPIENT_WAID")?;

    match (&args.text, &args.template) {
        (Some(text), _) => Ok(codec::build_text_envelope(to, text)),
        (None, Some(name)) => Ok(codec::build_template_envelope(to, name, &args.language)),
        (None, None) => Err("Nothing to send: pass --text or --template".into()),
    }
}

pub async fn run(args: SendArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config =
        AppConfig::load_unvalidated().map_err(|e| format!("Failed to load config: {e}"))?;

    let missing = config.missing_send_settings();
    if !missing.is_empty() {
        return Err(format!("Missing settings: {}", missing.join(", ")).into());
    }

    let envelope = build_envelope(&args, config.whatsapp.recipient_waid.as_deref())?;
    let channel = WhatsAppChannel::new(WhatsAppChannelConfig::from_config(&config.whatsapp)?)?;

    match channel.send_envelope(&envelope).await {
        Ok(receipt) => {
            println!("Sent to {} (HTTP {})", envelope.recipient(), receipt.status);
            println!("{}", receipt.body);
            Ok(())
        }
        Err(e) => Err(format!("{} ({}): {e}", e.public_message(), e.status_code()).into()),
    }
}
