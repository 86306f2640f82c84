//! Follow the flag stream.

use anyhow::{Context, Result};
use flagstream_client::{
    FeatureStore, HttpRequestor, InMemoryFeatureStore, SseTransport, StreamConfig,
    StreamProcessor,
};
use std::sync::Arc;
use std::time::Duration;

/// Run the watch command.
pub async fn run(config: StreamConfig, ready_timeout: u64) -> Result<()> {
    let transport = SseTransport::new(config.connect_timeout());
    let requestor = HttpRequestor::new(&config).context("Failed to build HTTP client")?;
    let store = Arc::new(InMemoryFeatureStore::new());

    println!("Connecting to {}...", config.stream_url());
    let processor = StreamProcessor::new(config, transport, requestor, Arc::clone(&store));
    let mut signals = processor.start().await?;

    let ready = tokio::time::timeout(Duration::from_secs(ready_timeout), signals.wait_ready())
        .await
        .context("Timed out waiting for flags")?;
    if let Err(e) = ready {
        processor.stop().await?;
        anyhow::bail!("Stream failed before flags were initialized: {}", e);
    }

    let flags = store.all().await;
    println!("Initialized with {} flags:", flags.len());
    for (key, flag) in &flags {
        println!("  {} (version {})", key, flag.version);
    }
    println!();
    println!("Watching for changes (Ctrl-C to stop)...");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            err = signals.next_error() => match err {
                Some(err) => println!("error: {}", err),
                None => break,
            },
        }
    }

    processor.stop().await?;
    println!("Stopped with {} flags", store.len());
    Ok(())
}
