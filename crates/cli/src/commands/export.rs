//! `docfill export`: upload, fill from `--set` pairs, and write the result.

use std::path::PathBuf;

use docfill_core::placeholder::NamedValue;

use super::{build_workspace, describe, load_config, upload_name};

pub async fn run(
    file: PathBuf,
    set: Vec<(String, String)>,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let (mut workspace, mut completions) = build_workspace(&config)?;
    let mut events = workspace.subscribe();

    let bytes = std::fs::read(&file).map_err(|e| format!("Failed to read {}: {e}", file.display()))?;
    let filename = upload_name(&file)?;

    let uploaded = workspace.upload(filename.as_str(), bytes);
    workspace.settle(&mut completions).await;
    while let Ok(notification) = events.try_recv() {
        eprintln!("{}", describe(&notification));
    }
    uploaded?;

    let Some(session) = workspace.session() else {
        return Err(format!("{filename} could not be opened").into());
    };
    tracing::debug!(placeholders = session.store().len(), "Document ready for export");

    if !set.is_empty() {
        let pairs = set
            .into_iter()
            .map(|(name, value)| NamedValue::new(name, value))
            .collect();
        let report = workspace.bulk_update(pairs)?;
        for dropped in &report.dropped {
            eprintln!("⚠️  Skipped: {dropped}");
        }
        workspace.settle(&mut completions).await;
        while let Ok(notification) = events.try_recv() {
            eprintln!("{}", describe(&notification));
        }
    }

    let (name, bytes) = workspace.export()?;
    let target = output.unwrap_or_else(|| config.export_path(&name));
    std::fs::write(&target, bytes).map_err(|e| format!("Failed to write {}: {e}", target.display()))?;
    println!("✅ Wrote {}", target.display());
    Ok(())
}
