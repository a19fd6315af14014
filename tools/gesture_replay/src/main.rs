use std::{fs, path::PathBuf, process};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use navbright::{GestureConfig, MemoryHost, OutputMode};

mod replay;

use replay::{parse_expected_phases, parse_trace, phases_entered, replay};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Manual,
    Automatic,
}

impl From<ModeArg> for OutputMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Manual => OutputMode::Manual,
            ModeArg::Automatic => OutputMode::Automatic,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "gesture_replay")]
#[command(about = "Replay a recorded touch trace through the brightness gesture")]
struct Cli {
    /// Trace file with `touch,<ms>,<down|move|up>,<x>,<y>` lines.
    trace: PathBuf,
    /// Gesture config TOML; built-in defaults when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value_t = 1080.0)]
    width: f32,
    /// Stored value at the start of the replay.
    #[arg(long, default_value_t = 100)]
    value: i32,
    #[arg(long, value_enum, default_value_t = ModeArg::Manual)]
    mode: ModeArg,
    /// Pretend the surface owns every touch.
    #[arg(long)]
    host_consuming: bool,
    /// File listing the phases the gesture must enter, one per line.
    #[arg(long)]
    expect: Option<PathBuf>,
}

fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {err:?}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => GestureConfig::from_path(path)?,
        None => GestureConfig::default(),
    };
    let events = parse_trace(&cli.trace)?;
    log::info!(
        "replaying {} events from {}",
        events.len(),
        cli.trace.display()
    );

    let mut host = MemoryHost::new(cli.width, cli.value, cli.mode.into());
    host.host_consuming = cli.host_consuming;
    let lines = replay(config, &mut host, &events);

    println!("kind,ms,value");
    for line in &lines {
        println!("{line}");
    }

    if let Some(expect_path) = &cli.expect {
        let raw = fs::read_to_string(expect_path)
            .with_context(|| format!("failed to read {}", expect_path.display()))?;
        let expected = parse_expected_phases(&raw)
            .with_context(|| format!("invalid expect file {}", expect_path.display()))?;
        let actual = phases_entered(&lines);
        if actual != expected {
            let labels = |phases: &[navbright::GesturePhase]| {
                phases
                    .iter()
                    .map(|phase| phase.label())
                    .collect::<Vec<_>>()
                    .join(",")
            };
            eprintln!("expected phases: {}", labels(expected.as_slice()));
            eprintln!("actual phases:   {}", labels(actual.as_slice()));
            bail!("phase sequence mismatch");
        }
    }

    Ok(())
}
