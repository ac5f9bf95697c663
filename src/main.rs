use clap::Parser;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};

use vitrine::cli::Args;
use vitrine::config::StageConfig;
use vitrine::core::backend::ClockPlayer;
use vitrine::core::registry::IdAllocator;
use vitrine::core::stage::Stage;
use vitrine::server::{ApiServer, SharedApiState, publish};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Determine log level based on verbosity flags
    // 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
    let default_level = match args.verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();

    info!("Vitrine video wall starting...");
    debug!("Command-line args: {:?}", args);

    let config = StageConfig::from_args(&args);
    info!(
        "Viewport {}x{}, control space {}x{}, API port {}",
        config.viewport_width,
        config.viewport_height,
        config.norm_width,
        config.norm_height,
        args.port
    );

    let ids = Arc::new(IdAllocator::new());
    let shared = Arc::new(SharedApiState::new(vitrine::entities::Viewport::new(
        config.viewport_width,
        config.viewport_height,
    )));

    // HTTP thread: translates requests into commands on this channel
    let command_rx = ApiServer::start(args.port, Arc::clone(&shared), Arc::clone(&ids));

    // The clock backend simulates playback timing; a deployment wires a
    // real decoder behind the same trait
    let sim_duration = Duration::from_secs(args.sim_duration_secs);
    let mut stage = Stage::new(
        config,
        Box::new(move || Box::new(ClockPlayer::new(sim_duration))),
        ids,
        command_rx,
    );

    // Startup videos from the command line
    for path in &args.videos {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        match stage.registry_mut().add(path.clone(), name) {
            Ok(id) => info!("Added startup video {} as {}", path.display(), id),
            Err(e) => warn!("Skipping startup video {}: {}", path.display(), e),
        }
    }

    // Stage loop: this thread owns all track and registry state
    let tick = Duration::from_secs(1) / args.tick_hz.max(1);
    info!("Stage loop running at {} Hz", args.tick_hz.max(1));
    loop {
        let started = Instant::now();

        stage.tick(started);
        let videos = stage.registry_mut().list();
        let viewport = stage.registry().viewport();
        publish(&shared, videos, viewport);

        let elapsed = started.elapsed();
        if elapsed < tick {
            std::thread::sleep(tick - elapsed);
        }
    }
}
