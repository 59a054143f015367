use std::time::Duration;

use server::{
    BridgeConfig, FrameClock, PhysicsModule, SceneGraph, SimulationHost, TcpNetChannel,
};
use shared::PhysicsWorld;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = BridgeConfig::from_env()?;
    let world = PhysicsWorld::init(config.physics_settings())?;
    let net = TcpNetChannel::new(config.peer_addr(), config.connect_timeout());
    log::info!(
        "listen port {}, broadcasting to {}",
        config.net.listen_port,
        net.peer()
    );
    let mut module = PhysicsModule::new(
        world,
        SceneGraph::new(),
        net,
        FrameClock::new(),
        config.drop_position(),
    )?;

    let interval = Duration::from_millis(config.demo.frame_interval_ms);
    let spawn_every = config.demo.spawn_every;

    for frame in 0..config.demo.frames {
        let due = if spawn_every == 0 {
            frame == 0
        } else {
            frame % spawn_every == 0
        };
        if due {
            // Rejections are already logged by the coordinator.
            let _ = module.spawn_at_marker();
        }

        match module.on_tick() {
            Ok(report) => log::debug!(
                "frame {}: {} active, {} synced, {} skipped",
                report.frame,
                report.active,
                report.synced,
                report.skipped
            ),
            Err(err) => {
                log::error!("stopping: {err}");
                module.on_shutdown();
                return Err(err.into());
            }
        }

        std::thread::sleep(interval);
    }

    module.on_shutdown();
    Ok(())
}
