//! Utility functions for CLI commands.

use flowtts::Client;

use crate::Cli;

/// Creates a FlowTTS client from environment configuration.
///
/// Required: FLOWTTS_SECRET_ID, FLOWTTS_SECRET_KEY.
/// Optional: FLOWTTS_APP_ID, FLOWTTS_SDK_APP_ID, FLOWTTS_ENDPOINT.
pub fn create_client() -> anyhow::Result<Client> {
    let secret_id = std::env::var("FLOWTTS_SECRET_ID").unwrap_or_default();
    let secret_key = std::env::var("FLOWTTS_SECRET_KEY").unwrap_or_default();
    let app_id = env_i64("FLOWTTS_APP_ID");
    let sdk_app_id = env_i64("FLOWTTS_SDK_APP_ID");

    let mut builder = Client::builder(app_id)
        .secret_id(secret_id)
        .secret_key(secret_key)
        .sdk_app_id(sdk_app_id);

    if let Ok(endpoint) = std::env::var("FLOWTTS_ENDPOINT") {
        builder = builder.ws_url(endpoint);
    }

    Ok(builder.build()?)
}

fn env_i64(name: &str) -> i64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

/// Outputs binary data to a file.
pub fn output_bytes(data: &[u8], output_path: &str) -> anyhow::Result<()> {
    std::fs::write(output_path, data)?;
    Ok(())
}

/// Prints verbose output if enabled.
pub fn print_verbose(cli: &Cli, msg: &str) {
    if cli.verbose {
        eprintln!("[verbose] {}", msg);
    }
}

/// Prints success message.
pub fn print_success(msg: &str) {
    eprintln!("\x1b[32m✓\x1b[0m {}", msg);
}

/// Formats bytes to human readable string.
pub fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
