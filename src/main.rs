use shareledger::datasource::RpcChainSource;
use shareledger::{init_db, AppError, ChainSource, Config, Indexer, Repository};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let config = Config::from_env()?;

    let pool = init_db(&config.database_path).await?;
    let repo = Arc::new(Repository::new(pool));

    let source: Arc<dyn ChainSource> = Arc::new(RpcChainSource::new(
        config.rpc_url.clone(),
        config.pool_address.clone(),
        config.asset_address.clone(),
        config.price_pair_address.clone(),
        config.watched_pairs.clone(),
    ));

    let indexer = Indexer::new(source, repo, config);
    indexer.run().await?;

    Ok(())
}
