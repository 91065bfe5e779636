//! `docfill credential`: manage the stored service credential.

use docfill_client::FileCredentialStore;
use docfill_core::credential::{CredentialStore, redact};

use super::load_config;

fn store() -> Result<FileCredentialStore, Box<dyn std::error::Error>> {
    let config = load_config()?;
    Ok(FileCredentialStore::new(config.credentials_path()))
}

pub async fn set(key: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = store()?;
    store.save(key)?;
    println!("✅ Credential saved to {}", store.path().display());
    Ok(())
}

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let store = store()?;
    match store.load()? {
        Some(credential) => println!("  Credential: {}", redact(&credential)),
        None => println!("  No credential stored — run `docfill credential set <KEY>`"),
    }
    Ok(())
}

pub async fn clear() -> Result<(), Box<dyn std::error::Error>> {
    let store = store()?;
    store.clear()?;
    println!("✅ Credential removed");
    Ok(())
}
