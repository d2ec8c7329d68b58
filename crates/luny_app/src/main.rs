//! # luny_app: demo host
//!
//! Spawns a handful of scripted objects and drives them with a fixed-step
//! heartbeat and a frame loop.
//!
//! ## Startup Sequence
//!
//! 1. Load the host configuration (defaults, JSON file, then CLI flags).
//! 2. Spawn the demo objects.
//! 3. Run the frame loop, then destroy every object.

mod demo;
mod host;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use demo::DemoScript;
use host::{Host, HostConfig};

#[derive(Parser)]
#[command(name = "luny_app", about = "Drive scripted objects with heartbeat and frame ticks")]
struct Args {
    /// Path to a JSON host configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of objects to spawn
    #[arg(short, long, default_value_t = 3)]
    objects: usize,

    /// Number of frames to run (0 = unlimited)
    #[arg(short, long)]
    frames: Option<u64>,

    /// Hold the frame rate in real time
    #[arg(long)]
    realtime: bool,

    /// Print execution traces when the run ends
    #[arg(long)]
    trace: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "luny_app=info,luny_script=info".into()),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    info!(
        objects = args.objects,
        scene = %config.scene,
        "luny host starting"
    );

    let mut host = Host::new(config).context("invalid host configuration")?;
    for index in 0..args.objects {
        let script = DemoScript::for_index(index);
        host.spawn(|instance| script.build(instance))
            .with_context(|| format!("failed to build {script:?} script"))?;
    }

    info!(objects = host.object_count(), "objects spawned");
    host.run();

    if args.trace {
        for trace in host.take_traces() {
            println!("{trace}");
        }
    }

    host.shutdown();
    info!(
        heartbeats = host.clock().heartbeat,
        failures = host.failures(),
        "luny host shut down"
    );
    Ok(())
}

fn load_config(args: &Args) -> Result<HostConfig> {
    let mut config = match &args.config {
        Some(path) => {
            info!(file = %path.display(), "loading host configuration");
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("invalid host configuration in {}", path.display()))?
        }
        None => HostConfig::default(),
    };

    if let Some(frames) = args.frames {
        config.max_frames = frames;
    }
    if args.realtime {
        config.realtime = true;
    }
    if args.trace {
        config.script.trace_enabled = true;
    }
    Ok(config)
}
