//! Vision Bridge
//!
//! Runs the bridge against the built-in headless client: a synthetic
//! framebuffer rendered at 60 fps and a 20 Hz simulation. Controllers
//! connect over WebSocket; in-process mode drives the client from a local
//! model server instead.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use vision_bridge::{
    agent::{ActionModel, ChatCompletionsModel},
    capture::TestPatternSource,
    control::HeadlessWorld,
    network::ServerConfig,
    Bridge, BridgeConfig, BridgeError, BridgeHandle, BridgeServer, Broadcaster, OperatingMode,
    TICK_RATE, VERSION,
};

/// Synthetic render rate.
const RENDER_FPS: u32 = 60;

/// Synthetic framebuffer size.
const FRAMEBUFFER: (u32, u32) = (1280, 720);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = BridgeConfig::from_env().context("invalid configuration")?;
    info!("Vision Bridge v{}", VERSION);
    info!(
        "Mode: {}, capture {}x{} every {} frame(s) at quality {:.2}",
        config.mode,
        config.frame.width,
        config.frame.height,
        config.frame.capture_every,
        config.frame.quality
    );

    let model: Option<Arc<dyn ActionModel>> = match config.mode {
        OperatingMode::InProcess => {
            info!("Model: {} at {}", config.model.model, config.model.base_url);
            Some(Arc::new(ChatCompletionsModel::new(config.model.clone())?))
        }
        OperatingMode::Remote => None,
    };
    let broadcaster = Broadcaster::new();

    let running = Arc::new(AtomicBool::new(true));
    let (ready_tx, ready_rx) = oneshot::channel();
    let owner = {
        let config = config.clone();
        let runtime = Handle::current();
        let broadcaster = broadcaster.clone();
        let running = running.clone();
        thread::Builder::new()
            .name("owner".to_string())
            .spawn(move || owner_loop(config, runtime, model, broadcaster, running, ready_tx))
            .context("failed to start owner thread")?
    };
    let handle = ready_rx
        .await
        .context("owner thread exited during startup")??;

    let server = Arc::new(BridgeServer::new(
        ServerConfig {
            bind_addr: config.bind_addr,
            ..Default::default()
        },
        handle.clone(),
        broadcaster,
    ));
    let server_task = {
        let server = server.clone();
        tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!("Server error: {}", e);
            }
        })
    };

    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    info!("Shutting down");

    handle.kill_switch().engage();
    running.store(false, Ordering::SeqCst);
    server.shutdown();
    let _ = server_task.await;

    match tokio::task::spawn_blocking(move || owner.join()).await {
        Ok(Ok(())) => {}
        _ => warn!("Owner thread did not exit cleanly"),
    }

    let snapshot = handle.metrics().snapshot();
    info!(
        "Final metrics: {}",
        serde_json::to_string(&snapshot).unwrap_or_default()
    );
    Ok(())
}

/// Render and simulate the headless client until `running` clears.
fn owner_loop(
    config: BridgeConfig,
    runtime: Handle,
    model: Option<Arc<dyn ActionModel>>,
    broadcaster: Broadcaster,
    running: Arc<AtomicBool>,
    ready: oneshot::Sender<Result<BridgeHandle, BridgeError>>,
) {
    let mut bridge = match Bridge::new(&config, runtime, model, Some(broadcaster)) {
        Ok(bridge) => bridge,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    if ready.send(Ok(bridge.handle())).is_err() {
        return;
    }

    let mut world = HeadlessWorld::new();
    let mut source = TestPatternSource::new(FRAMEBUFFER.0, FRAMEBUFFER.1);
    let frame_time = Duration::from_secs(1) / RENDER_FPS;
    let frames_per_tick = (RENDER_FPS / TICK_RATE).max(1) as u64;
    let mut rendered: u64 = 0;

    while running.load(Ordering::SeqCst) {
        let started = Instant::now();

        bridge.on_render_frame(&mut source);
        rendered += 1;
        if rendered % frames_per_tick == 0 {
            bridge.tick(Some(&mut world));
            world.step();
        }

        if let Some(rest) = frame_time.checked_sub(started.elapsed()) {
            thread::sleep(rest);
        }
    }

    if !bridge.stop(Some(&mut world)) {
        warn!("Encoders did not stop within {:?}", config.shutdown_timeout);
    }
}
