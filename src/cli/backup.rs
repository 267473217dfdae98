use std::path::PathBuf;

use ansi_term::Colour;
use anyhow::{bail, Result};

use crate::{
    backup::{export_all_data, import_data, write_backup},
    services::Services,
};

pub async fn process_export_command(out_dir: PathBuf, services: &Services) -> Result<()> {
    let snapshot = export_all_data(
        &services.documents,
        &services.tracker,
        services.clock.as_ref(),
    );
    let path = write_backup(&snapshot, &out_dir).await?;
    println!("{}", path.display());
    Ok(())
}

pub async fn process_import_command(file: PathBuf, services: &mut Services) -> Result<()> {
    let json = tokio::fs::read_to_string(&file).await?;
    let outcome = import_data(
        &json,
        &services.storage,
        &mut services.documents,
        &mut services.tracker,
    )
    .await;
    if !outcome.success {
        bail!(outcome.message);
    }
    println!("{}", Colour::Green.paint(outcome.message));
    Ok(())
}
