//! `docfill status`: Show configuration status.

use docfill_client::FileCredentialStore;
use docfill_config::AppConfig;
use docfill_core::credential::{CredentialStore, redact};

use super::load_config;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let credentials = FileCredentialStore::new(config.credentials_path());

    println!("📄 docfill Status");
    println!("=================");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  Service:      {}", config.service.base_url);
    println!("  Timeout:      {}s", config.service.timeout_secs);
    println!(
        "  Upload retry: {}",
        if config.upload.retry_enabled {
            format!("once, after {}s", config.upload.retry_backoff_secs)
        } else {
            "disabled".to_string()
        }
    );
    println!("  History:      {} messages", config.session.history_limit);
    println!("  Duplicates:   {:?}", config.session.duplicate_names);
    println!("  Export:       *{}.<ext>", config.export.filename_suffix);

    match credentials.load() {
        Ok(Some(credential)) => println!("  Credential:   {}", redact(&credential)),
        Ok(None) => println!("  Credential:   not set"),
        Err(e) => println!("  Credential:   unreadable ({e})"),
    }

    if AppConfig::config_path().exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file — run `docfill onboard` first");
    }

    Ok(())
}
