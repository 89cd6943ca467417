//! Connect, print whatever the controller reports for ten seconds, then close.
//!
//! Usage: `cargo run --example monitor -- <host> [port] [credentials]`

use tokio::time::{sleep, Duration};

use homeworks::{ClientConfig, HomeworksClient, HomeworksEvent};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "192.168.2.55".to_string());
    let port = match args.next() {
        Some(port) => port.parse()?,
        None => 4008,
    };

    let mut builder = ClientConfig::builder().host(host).port(port);
    if let Some(credentials) = args.next() {
        builder = builder.credentials(credentials);
    }

    println!("Starting interface");
    let client = HomeworksClient::open(builder.build(), |event: HomeworksEvent| {
        println!("{} {} {:?}", event.name(), event.address, event.values);
    })
    .await?;

    println!("Connected. Waiting for messages.");
    sleep(Duration::from_secs(10)).await;

    println!("Closing.");
    client.stop().await?;
    client.close().await?;

    println!("Done.");
    Ok(())
}
