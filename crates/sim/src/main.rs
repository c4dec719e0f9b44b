mod config;
mod physics;
mod presentation;
mod session;
mod world;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use config::SimConfig;
use session::Session;

#[derive(Parser)]
#[command(name = "armory-sim")]
#[command(about = "Headless server, client and observer running a scripted weapon session")]
struct Args {
    #[arg(short, long, help = "RON scenario file; built-in scenario when omitted")]
    scenario: Option<PathBuf>,

    #[arg(short, long, help = "RON arsenal file replacing the scenario's weapons")]
    arsenal: Option<PathBuf>,

    #[arg(short, long)]
    duration: Option<f32>,

    #[arg(short, long)]
    tick_rate: Option<u32>,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, help = "Packet loss percentage (0-100)")]
    loss_percent: Option<f32>,

    #[arg(long, help = "Duplicate percentage (0-100)")]
    duplicate_percent: Option<f32>,

    #[arg(long, help = "Minimum latency in ms")]
    min_latency: Option<u32>,

    #[arg(long, help = "Maximum latency in ms")]
    max_latency: Option<u32>,

    #[arg(long, help = "Jitter in ms")]
    jitter: Option<u32>,
}

impl Args {
    fn apply(&self, config: &mut SimConfig) {
        if let Some(duration) = self.duration {
            config.duration = duration;
        }
        if let Some(tick_rate) = self.tick_rate {
            config.tick_rate = tick_rate;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }

        let link = &mut config.link;
        if let Some(loss) = self.loss_percent {
            link.loss_percent = loss;
        }
        if let Some(duplicate) = self.duplicate_percent {
            link.duplicate_percent = duplicate;
        }
        if let Some(min) = self.min_latency {
            link.min_latency_ms = min;
        }
        if let Some(max) = self.max_latency {
            link.max_latency_ms = max;
        }
        if let Some(jitter) = self.jitter {
            link.jitter_ms = jitter;
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config = match &args.scenario {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    if let Some(path) = &args.arsenal {
        config.load_arsenal(path)?;
    }
    args.apply(&mut config);

    log::info!(
        "running {:.1}s at {} Hz, {} weapons, link {:?}",
        config.duration,
        config.tick_rate,
        config.loadout.len(),
        config.link
    );

    let mut session = Session::new(config)?;
    let report = session.run()?;

    log::info!("{report}");
    for (name, peer) in [
        ("server", session.server()),
        ("client", session.client()),
        ("observer", session.observer()),
    ] {
        let holding = peer
            .inventory()
            .current_weapon()
            .map_or("nothing", |weapon| weapon.config_key());
        log::info!("{name} holds {holding}");
    }
    if !report.in_sync() {
        log::warn!("client ammo diverged from the server");
    }
    Ok(())
}
