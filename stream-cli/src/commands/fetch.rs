//! Fetch flags out-of-band.

use anyhow::{Context, Result};
use flagstream_client::{HttpRequestor, Requestor, StreamConfig};
use flagstream_core::decode::{decode_flag, decode_flag_set};

/// Run the fetch command.
pub async fn run(config: &StreamConfig, key: Option<&str>) -> Result<()> {
    let requestor = HttpRequestor::new(config).context("Failed to build HTTP client")?;

    match key {
        Some(key) => {
            println!("Fetching {}...", requestor.flag_url(key));
            let body = requestor
                .request_flag(key)
                .await
                .with_context(|| format!("Failed to fetch flag {}", key))?;
            let flag = decode_flag(&body).context("Invalid flag definition")?;
            println!("{}", serde_json::to_string_pretty(&flag)?);
        }
        None => {
            println!("Fetching {}...", requestor.all_flags_url());
            let body = requestor
                .request_all_flags()
                .await
                .context("Failed to fetch flags")?;
            let flags = decode_flag_set(&body).context("Invalid flag set")?;
            println!("{} flags:", flags.len());
            for (key, flag) in &flags {
                println!("  {} (version {})", key, flag.version);
            }
        }
    }

    Ok(())
}
