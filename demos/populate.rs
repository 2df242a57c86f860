//! Populate a local template file from a JSON records file
//! Run with: cargo run --example populate -- <template> <records.json> [--pdf] [--config <config.json>]
//!
//! The records file holds the four source records:
//!
//! ```json
//! {
//!   "buyerContact": { "firstName": "John", "lastName": "Doe" },
//!   "coBuyerContact": {},
//!   "creditSnapshot": { "buyer_ssn": "123-45-4321" },
//!   "dealRecord": { "vehicle": "2021 Civic" }
//! }
//! ```
//!
//! Set `RUST_LOG=template=debug` to see substitution details.

use anyhow::{bail, Context};
use std::fs;
use std::path::Path;
use template::{populate_bytes, EngineConfig, PopulateOutcome, SourceRecords, TemplateDescriptor};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut positional = Vec::new();
    let mut convert_to_pdf = false;
    let mut config_path = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--pdf" => convert_to_pdf = true,
            "--config" => config_path = Some(args.next().context("--config needs a path")?),
            _ => positional.push(arg),
        }
    }
    let [template_path, records_path] = positional.as_slice() else {
        bail!("usage: populate <template> <records.json> [--pdf] [--config <config.json>]");
    };

    let config = match config_path {
        Some(path) => EngineConfig::from_json(&fs::read_to_string(&path).with_context(|| format!("reading {path}"))?)?,
        None => EngineConfig::default(),
    };

    let records: SourceRecords = serde_json::from_str(
        &fs::read_to_string(records_path).with_context(|| format!("reading {records_path}"))?,
    )
    .context("parsing records")?;

    let template = fs::read(template_path).with_context(|| format!("reading {template_path}"))?;
    let file_name = Path::new(template_path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let descriptor = TemplateDescriptor {
        file_name,
        download_location: template_path.clone(),
        ..TemplateDescriptor::default()
    };

    match populate_bytes(&descriptor, &template, &records, convert_to_pdf, &config)? {
        PopulateOutcome::Populated(output) => {
            fs::create_dir_all("output")?;
            let path = Path::new("output").join(&output.file_name);
            fs::write(&path, &output.bytes)?;
            println!("Wrote {} ({} bytes, {})", path.display(), output.bytes.len(), output.mime_type);
            if let Some(fields) = output.fields {
                println!("Filled {} of {} form fields", fields.populated, fields.total);
            }
        }
        PopulateOutcome::NoFillableFields => {
            println!("{template_path} has no fillable form fields; complete it manually");
        }
        PopulateOutcome::Unsupported => {
            bail!("{template_path} is not a Word, spreadsheet or PDF template");
        }
    }

    Ok(())
}
