use clap::Parser;
use fire_watch::alerts::{self, DEFAULT_ALERT_WINDOW};
use fire_watch::backends::{HttpObjectStore, HttpRecordStore};
use fire_watch::config::{self, BatchConfig, ClientConfig};
use fire_watch::persistence::Timestamp;
use fire_watch::{HttpClassifier, ImageFetcher, Orchestrator};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Run one fire detection batch over the configured camera roster
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Bucket holding the roster document
    #[arg(long, env = "FIRE_WATCH_ROSTER_BUCKET", default_value = config::DEFAULT_ROSTER_BUCKET)]
    roster_bucket: String,

    /// Key of the roster document
    #[arg(long, env = "FIRE_WATCH_ROSTER_KEY", default_value = config::DEFAULT_ROSTER_KEY)]
    roster_key: String,

    /// Bucket fire images are archived to
    #[arg(long, env = "FIRE_WATCH_IMAGE_BUCKET", default_value = config::DEFAULT_IMAGE_BUCKET)]
    image_bucket: String,

    /// Table detection records are written to
    #[arg(long, env = "FIRE_WATCH_TABLE_NAME", default_value = config::DEFAULT_TABLE_NAME)]
    table_name: String,

    /// Inference endpoint identifier
    #[arg(long, env = "FIRE_WATCH_ENDPOINT_ID", default_value = config::DEFAULT_ENDPOINT_ID)]
    endpoint_id: String,

    /// Number of cameras processed concurrently
    #[arg(short, long, env = "FIRE_WATCH_CONCURRENCY", default_value_t = config::DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Base URL of the storage gateway
    #[arg(long, env = "FIRE_WATCH_STORAGE_HOST", default_value = config::DEFAULT_STORAGE_HOST)]
    storage_host: String,

    /// Base URL of the inference service
    #[arg(long, env = "FIRE_WATCH_INFERENCE_HOST", default_value = config::DEFAULT_INFERENCE_HOST)]
    inference_host: String,

    /// API key sent to the storage gateway and inference service
    #[arg(short, long, env = "FIRE_WATCH_API_KEY")]
    api_key: Option<String>,

    /// Optional HMAC key for signing storage requests
    #[arg(short = 'k', long, env = "FIRE_WATCH_HMAC_KEY")]
    hmac_key: Option<String>,

    /// Camera fetch timeout in seconds
    #[arg(long, env = "FIRE_WATCH_FETCH_TIMEOUT", default_value_t = 10)]
    fetch_timeout: u64,

    /// Inference request timeout in seconds
    #[arg(long, env = "FIRE_WATCH_CLASSIFY_TIMEOUT", default_value_t = 30)]
    classify_timeout: u64,

    /// Storage request timeout in seconds
    #[arg(long, env = "FIRE_WATCH_STORAGE_TIMEOUT", default_value_t = 30)]
    storage_timeout: u64,

    /// Instead of running a batch, report which of these cameras detected
    /// fire within the alert window
    #[arg(long, value_delimiter = ',', env = "FIRE_WATCH_ALERT_CAMERAS")]
    alert_cameras: Vec<String>,

    /// Alert window in seconds
    #[arg(long, env = "FIRE_WATCH_ALERT_WINDOW", default_value_t = DEFAULT_ALERT_WINDOW.as_secs())]
    alert_window: u64,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    fn batch_config(&self) -> BatchConfig {
        BatchConfig::default()
            .with_roster(&self.roster_bucket, &self.roster_key)
            .with_image_bucket(&self.image_bucket)
            .with_table_name(&self.table_name)
            .with_endpoint_id(&self.endpoint_id)
            .with_concurrency(self.concurrency)
    }

    fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::default()
            .with_storage_host(&self.storage_host)
            .with_inference_host(&self.inference_host)
            .with_fetch_timeout(Duration::from_secs(self.fetch_timeout))
            .with_classify_timeout(Duration::from_secs(self.classify_timeout))
            .with_storage_timeout(Duration::from_secs(self.storage_timeout));
        if let Some(api_key) = &self.api_key {
            config = config.with_api_key(api_key);
        }
        if let Some(hmac_key) = &self.hmac_key {
            config = config.with_hmac(hmac_key);
        }
        config
    }
}

fn build_orchestrator(args: &Args) -> Result<Orchestrator, Box<dyn std::error::Error>> {
    let batch = args.batch_config();
    let client = args.client_config();

    let objects = Arc::new(HttpObjectStore::new(&client)?);
    let records = Arc::new(HttpRecordStore::new(&client)?);
    let fetcher = ImageFetcher::new(client.fetch_timeout)?;
    let classifier = Arc::new(HttpClassifier::new(&client, &batch.endpoint_id)?);

    Ok(Orchestrator::new(batch, objects, records, fetcher, classifier))
}

async fn check_alerts(args: &Args) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let records = HttpRecordStore::new(&args.client_config())?;
    let fired = alerts::check_cameras(
        &records,
        &args.table_name,
        &args.alert_cameras,
        Duration::from_secs(args.alert_window),
        Timestamp::now().secs,
    )
    .await;
    for alert in &fired {
        println!("{}", alert);
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if !args.alert_cameras.is_empty() {
        return check_alerts(&args).await;
    }

    let orchestrator = build_orchestrator(&args)?;
    info!(
        "Reading roster {}/{}",
        orchestrator.config().roster_bucket,
        orchestrator.config().roster_key
    );
    let response = orchestrator.run_batch().await;

    println!("{}", serde_json::to_string_pretty(&response)?);
    if response.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
