use anyhow::Context;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pharmadis_observability::init();

    let addr = std::env::var("PHARMADIS_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let app = pharmadis_api::app::build_app();

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
