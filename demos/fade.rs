//! Fade a dimmer, then ask for its level and print the `light_changed` reply.
//!
//! Usage: `cargo run --example fade -- <host> <address> <intensity> [fade seconds]`

use anyhow::Context;
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

use homeworks::{ClientConfig, EventKind, HomeworksClient, HomeworksEvent};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let host = args.next().context("missing host")?;
    let address = args.next().context("missing dimmer address")?;
    let intensity: f64 = args.next().context("missing intensity")?.parse()?;
    let fade_time: f64 = match args.next() {
        Some(secs) => secs.parse()?,
        None => 1.0,
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let config = ClientConfig::builder().host(host).build();
    let client = HomeworksClient::open(config, move |event: HomeworksEvent| {
        let _ = tx.send(event);
    })
    .await?;

    client.fade_level(intensity, fade_time, 0.0, &address).await?;
    tokio::time::sleep(Duration::from_secs_f64(fade_time.max(0.0))).await;
    client.request_level(&address).await?;

    let reply = timeout(Duration::from_secs(2), async {
        while let Some(event) = rx.recv().await {
            if event.kind == EventKind::LightChanged && event.address == address {
                return Some(event);
            }
        }
        None
    })
    .await;

    match reply {
        Ok(Some(event)) => println!("{} is at {:?}", address, event.values[0].as_integer()),
        _ => println!("{} did not report a level", address),
    }

    client.stop().await?;
    client.close().await?;
    Ok(())
}
