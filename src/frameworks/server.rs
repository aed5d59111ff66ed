// Framework bootstrap for the world server runtime.

use crate::domain::GameData;
use crate::domain::ports::{Clock, Persistence};
use crate::frameworks::{config, db};
use crate::interface_adapters::game_data::load_game_data;
use crate::interface_adapters::net::SessionHub;
use crate::interface_adapters::routes::app;
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::stores::{InMemoryStore, PostgresStore};
use crate::interface_adapters::utils::clock::SystemClock;
use crate::use_cases::{LoopConfig, LoopPorts, MonsterRegistry, World, world_task};

use rand::SeedableRng;
use rand::rngs::StdRng;
use std::io::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;

fn init_runtime() {
    let _ = dotenvy::dotenv();

    // sqlx logs every statement at info; keep it quiet unless asked.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,sqlx=warn"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    let runtime = build_runtime().await?;
    let app = app(Arc::clone(&runtime.state));

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .inspect_err(|e| {
            tracing::error!(error = %e, "server error");
        });

    // Let the world loop flush its final save before the process exits.
    runtime.shutdown.notify_one();
    if let Err(e) = runtime.world.await {
        tracing::error!(error = %e, "world loop task failed");
    }
    served
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

struct Runtime {
    state: Arc<AppState>,
    shutdown: Arc<Notify>,
    world: JoinHandle<()>,
}

async fn build_runtime() -> Result<Runtime> {
    // Game data is required; a server without it cannot simulate anything.
    let game_data_path = config::game_data_path();
    let data = load_game_data(&game_data_path).await.map_err(|e| {
        tracing::error!(path = %game_data_path.display(), error = %e, "failed to load game data");
        std::io::Error::other(format!("failed to load game data: {e}"))
    })?;

    let store = build_store().await?;
    let clock = Arc::new(SystemClock);

    let mut rng = match config::rng_seed() {
        Some(seed) => {
            tracing::info!(seed, "using fixed rng seed");
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_os_rng(),
    };
    let monsters = restore_or_spawn(&data, store.as_ref(), &mut rng, clock.now_millis()).await;
    let world = World::new(Arc::new(data), monsters, rng);

    let (input_tx, input_rx) = mpsc::channel(config::INPUT_CHANNEL_CAPACITY);
    let hub = Arc::new(SessionHub::new(config::WORLD_BROADCAST_CAPACITY));
    hub.spawn_serializer();

    let shutdown = Arc::new(Notify::new());
    let loop_config = LoopConfig {
        tick_interval: config::tick_interval(),
        persist_every_ticks: config::persist_every_ticks(),
    };
    let ports = LoopPorts {
        broadcaster: hub.clone(),
        store,
        clock,
    };
    let world = tokio::spawn(world_task(
        world,
        input_rx,
        ports,
        loop_config,
        Arc::clone(&shutdown),
    ));

    Ok(Runtime {
        state: Arc::new(AppState {
            input_tx,
            hub,
            game_data_path,
        }),
        shutdown,
        world,
    })
}

async fn build_store() -> Result<Arc<dyn Persistence>> {
    let Some(url) = config::database_url() else {
        tracing::info!("DATABASE_URL not set; using in-memory store");
        return Ok(Arc::new(InMemoryStore::new()));
    };

    let pool = db::connect_pool(&url)
        .await
        .map_err(|e| std::io::Error::other(format!("failed to connect to database: {e}")))?;
    db::run_migrations(&pool)
        .await
        .map_err(|e| std::io::Error::other(format!("failed to run migrations: {e}")))?;
    tracing::info!("connected to postgres store");
    Ok(Arc::new(PostgresStore::new(pool)))
}

// Stored monsters win over fresh spawns so kills and timers survive restarts.
async fn restore_or_spawn(
    data: &GameData,
    store: &dyn Persistence,
    rng: &mut StdRng,
    now: u64,
) -> MonsterRegistry {
    match store.load_monster_instances().await {
        Ok(records) if !records.is_empty() => MonsterRegistry::restore(&records, data, now),
        Ok(_) => MonsterRegistry::spawn_from_areas(data, rng, now),
        Err(e) => {
            tracing::warn!(error = %e, "failed to load monsters; spawning fresh");
            MonsterRegistry::spawn_from_areas(data, rng, now)
        }
    }
}
