//! Connects the signal feed to a running tracker backend and prints
//! every push message until Ctrl-C.
//!
//! Usage:
//!   TRACKER_API_URL=http://localhost:8000 TRACKER_TOKEN=<jwt> \
//!     cargo run -p tracker-feed --example live_feed

use tracker_feed::{FeedConfig, SignalFeed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tracker_feed=debug".into()),
        )
        .init();

    let token = std::env::var("TRACKER_TOKEN")
        .map_err(|_| anyhow::anyhow!("TRACKER_TOKEN must be set to a VIP access token"))?;

    let config = FeedConfig::default();
    println!("Connecting to {} ...", config.api_url);

    let feed = SignalFeed::new(config);
    feed.configure(Some(token.as_str()), true, |message| {
        println!("<- {:?}", message);
    });

    tokio::signal::ctrl_c().await?;
    println!("Shutting down");
    feed.dispose();

    Ok(())
}
