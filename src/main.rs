use std::error::Error;
use std::time::Instant;
use tracing::info;

use cloud_bindings::remote_config::RemoteConfig;
use cloud_bindings::{
    ListOptions, PutStringFormat, RemoteConfigOptions, SettableMetadata, StorageConfig,
    StorageFactory,
};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting cloud bindings demo");
    let start = Instant::now();

    let config = StorageConfig::memory().with_option("bucket", "demo-bucket");
    let storage = StorageFactory::from_config(config).await?;
    let docs = storage.reference(Some("docs"));

    let metadata = SettableMetadata::new()
        .with_content_type("text/plain")
        .with_custom("owner", "demo");
    let uploaded = docs
        .child("hello.txt")
        .put_data(&b"hello, world"[..], Some(metadata))?
        .await?;
    info!(
        "Uploaded path={} size={} md5={:?}",
        uploaded.full_path, uploaded.size, uploaded.md5_hash
    );

    let task = docs
        .child("notes/readme.md")
        .put_string("data:text/markdown;base64,IyBOb3Rlcw==", PutStringFormat::DataUrl, None)?;
    let mut progress = task.subscribe();
    let uploaded = task.await?;
    info!(
        "Uploaded path={} content_type={:?} progress={:.0}%",
        uploaded.full_path,
        uploaded.content_type,
        progress.borrow_and_update().percent()
    );

    let page = docs.list(ListOptions::new().with_max_results(10)).await?;
    for item in &page.items {
        info!("item={}", item);
    }
    for prefix in &page.prefixes {
        info!("prefix={}", prefix);
    }

    let by_url = storage.reference_from_url("gs://demo-bucket/docs/hello.txt");
    info!(
        "Reference from URL equals child reference: {}",
        by_url == docs.child("hello.txt")
    );

    // Remote config only runs when a project is configured
    if let (Ok(project_id), Ok(app_id), Ok(api_key)) = (
        std::env::var("REMOTE_CONFIG_PROJECT_ID"),
        std::env::var("REMOTE_CONFIG_APP_ID"),
        std::env::var("REMOTE_CONFIG_API_KEY"),
    ) {
        let remote = RemoteConfig::from_options(RemoteConfigOptions::new(project_id, app_id, api_key));
        remote.set_defaults([("welcome_message", "Hello from defaults")]);
        match remote.fetch_and_activate().await {
            Ok(activated) => info!("Fetched remote config activated={}", activated),
            Err(e) => info!("Remote config fetch failed code={} error={}", e.code(), e),
        }
        info!(
            "welcome_message={} status={:?}",
            remote.get_string("welcome_message"),
            remote.last_fetch_status()
        );
    }

    info!("Done in {:?}", start.elapsed());
    Ok(())
}
