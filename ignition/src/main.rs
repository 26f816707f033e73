use ignition::{context::Ctx, routes::create_routes};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ignition=info,tower_http=info")),
        )
        .init();

    let ctx = Ctx::new().await?;
    let addr = format!("0.0.0.0:{}", ctx.config.serve_port);
    let app = create_routes(ctx);

    tracing::info!("Starting server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
