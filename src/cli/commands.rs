use crate::cli::Commands;
use crate::host::SysinfoProbe;
use crate::k8s::ClusterClient;
use crate::metrics::{
    self, MetricsCache, MetricsCollector, Refresher,
};
use crate::monitor;
use crate::Result;
use std::time::Duration;
use tokio::signal;
use tracing::info;

pub async fn handle_command(command: Commands) -> Result<()> {
    match command {
        Commands::Collect { filter } => handle_collect(filter).await,
        Commands::Watch { refresh, interval } => handle_watch(refresh, interval).await,
        Commands::Targets => handle_targets().await,
        Commands::Status => handle_status().await,
        Commands::Config => handle_config().await,
    }
}

async fn new_collector() -> Result<MetricsCollector> {
    let client = ClusterClient::try_default().await?;
    Ok(MetricsCollector::new(
        Box::new(SysinfoProbe::new()),
        Box::new(client),
    ))
}

async fn handle_collect(filter: Option<String>) -> Result<()> {
    let cache = MetricsCache::new();

    let samples = new_collector().await?.collect().await?;
    for sample in samples {
        cache.upsert(sample).await;
    }

    let result = metrics::list_metrics(&cache, filter.as_deref()).await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn handle_watch(refresh: u64, interval: u64) -> Result<()> {
    let cache = MetricsCache::new();
    let collector = new_collector().await?;

    let refresher = Refresher::with_period(collector, cache.clone(), Duration::from_secs(refresh));
    let shutdown = refresher.cancellation_token();
    tokio::spawn(refresher.run());

    let mut subscription =
        metrics::stream::subscribe_with_interval(&cache, Duration::from_secs(interval));

    info!("Streaming snapshot frames every {}s. Press Ctrl+C to exit.", interval);

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Shutdown signal received");
                subscription.cancel();
                shutdown.cancel();
                break;
            }
            frame = subscription.next_frame() => {
                match frame {
                    Some(frame) => println!("{}", frame),
                    None => break,
                }
            }
        }
    }

    Ok(())
}

async fn handle_targets() -> Result<()> {
    let client = ClusterClient::try_default().await?;
    let targets = monitor::scrape_targets(&client).await?;
    let stats = client.cluster_stats().await?;
    let overview = monitor::monitoring_stats(&stats, &targets);

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "targets": targets,
            "stats": overview,
        }))?
    );
    Ok(())
}

async fn handle_status() -> Result<()> {
    let client = ClusterClient::try_default().await?;

    let services = vec![
        monitor::locate_prometheus(&client).await?,
        monitor::locate_grafana(&client).await?,
    ];

    println!("{}", serde_json::to_string_pretty(&services)?);
    Ok(())
}

async fn handle_config() -> Result<()> {
    let client = ClusterClient::try_default().await?;
    let discovery = monitor::locate_prometheus_config(&client).await?;

    println!("{}", serde_json::to_string_pretty(&discovery)?);
    Ok(())
}
