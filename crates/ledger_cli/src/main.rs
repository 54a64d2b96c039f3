//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `ledger_core` linkage without any interactive input layer.
//! - With a storage directory argument, print the ledger's known vocabularies.

use ledger_core::{Ledger, LedgerConfig};
use std::collections::BTreeSet;
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("ledger_core version={}", ledger_core::core_version());

    let Some(storage_dir) = std::env::args().nth(1) else {
        return ExitCode::SUCCESS;
    };

    match print_vocabulary(LedgerConfig::new(storage_dir)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn print_vocabulary(config: LedgerConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;
    let ledger = Ledger::open(&config)?;
    println!("blocks={}", ledger.store().list_blocks()?.len());
    println!("categories={}", join(&ledger.all_categories()?));
    println!("tags={}", join(&ledger.all_tags()?));
    println!("payment_methods={}", join(&ledger.all_payment_methods()?));
    Ok(())
}

fn join(values: &BTreeSet<String>) -> String {
    values.iter().cloned().collect::<Vec<_>>().join(",")
}
