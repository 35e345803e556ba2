use anyhow::Context;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    warden_observability::init();

    let config = warden_api::config::ApiConfig::from_env().context("invalid configuration")?;
    let services =
        warden_api::app::demo::build_services(&config).context("failed to wire services")?;
    let app = warden_api::app::build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
