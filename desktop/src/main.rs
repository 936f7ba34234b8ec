use ractor::Actor;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use desktop::actors::desktop as desktop_actor;
use desktop::actors::{DesktopActor, DesktopArguments};
use desktop::{AppHost, DesktopConfig, MemoryContainer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "desktop=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = DesktopConfig::from_env()?;
    info!(
        viewport_width = config.viewport.width,
        viewport_height = config.viewport.height,
        "desktop starting"
    );

    let quick_launch = config.quick_launch.clone();
    let settle = config.content_init_delay + config.close_transition;

    let (actor, handle) = Actor::spawn(
        Some("desktop".to_string()),
        DesktopActor,
        DesktopArguments {
            config,
            container: Box::new(MemoryContainer::new()),
            apps: AppHost::with_builtin(),
        },
    )
    .await
    .map_err(|e| anyhow::anyhow!("failed to spawn desktop actor: {e}"))?;

    let mut events = desktop_actor::subscribe(&actor).await.map_err(rpc_error)?;
    tokio::spawn(async move {
        while let Some(envelope) = events.recv().await {
            info!(
                seq = envelope.seq,
                kind = envelope.event.kind(),
                window_id = envelope.event.window_id().unwrap_or("-"),
                "lifecycle event"
            );
        }
    });

    for app_id in quick_launch {
        let launch = desktop_actor::open_app(&actor, app_id)
            .await
            .map_err(rpc_error)?;
        info!(app_id = %app_id, ?launch, "quick launch");
    }

    // Let content init run before reporting
    tokio::time::sleep(settle).await;

    let snapshot = desktop_actor::get_snapshot(&actor).await.map_err(rpc_error)?;
    info!(snapshot = %serde_json::to_string_pretty(&snapshot)?, "desktop state");

    desktop_actor::shutdown(&actor).await.map_err(rpc_error)?;
    actor.stop(None);
    handle.await?;

    Ok(())
}

fn rpc_error(e: impl std::fmt::Display) -> anyhow::Error {
    anyhow::anyhow!("desktop actor call failed: {e}")
}
