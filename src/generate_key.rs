// src/generate_key.rs
//! Prints a fresh SETTINGS_MASTER_KEY for sealing stored provider
//! credentials. Run once and put the output in the environment:
//!
//!   cargo run --bin generate_settings_key

mod services {
    pub mod encryption;
}

use services::encryption::EncryptionService;

fn main() {
    let key = EncryptionService::generate_key();
    println!("SETTINGS_MASTER_KEY={}", key);
}
