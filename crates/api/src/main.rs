use clavis_api::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    clavis_observability::init();

    let config = Config::from_env();

    // A registry that fails to populate means this build cannot decode its
    // own events; refusing to boot beats serving half a pipeline.
    let (app, worker) = clavis_api::app::build_app(&config)?;

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await?;

    worker.shutdown();
    Ok(())
}
