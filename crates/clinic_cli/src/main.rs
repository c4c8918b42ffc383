//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `clinic_core` linkage and
//!   schema bootstrap.
//! - Keep output deterministic for quick local sanity checks.

use clinic_core::db::migrations::latest_version;
use clinic_core::db::open_db_in_memory;

fn main() {
    println!("clinic_core version={}", clinic_core::core_version());
    match open_db_in_memory() {
        Ok(_conn) => println!("clinic_core schema_version={}", latest_version()),
        Err(err) => {
            eprintln!("clinic_core bootstrap failed: {err}");
            std::process::exit(1);
        }
    }
}
