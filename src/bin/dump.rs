use anyhow::{Result, bail};
use book_replay::config::{Pacing, ReplayConfig};
use book_replay::loader::NdjsonFile;
use book_replay::logging;
use book_replay::render::{position_line, render_ladder};
use book_replay::session::Session;
use clap::Parser;
use dotenvy::dotenv;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Parser)]
#[command(about = "Print the normalized ladder of every snapshot in a capture")]
struct Args {
    /// Input snapshot file (NDJSON or JSON array)
    #[arg(long, short = 'i', env = "SNAPSHOT_FILE")]
    input: PathBuf,

    /// Number of levels to print per side
    #[arg(long, default_value_t = 5)]
    top: usize,

    /// Width of the depth bars
    #[arg(long, default_value_t = 20)]
    bar_width: usize,

    /// Print frames at replay pace instead of all at once
    #[arg(long, default_value_t = false)]
    replay: bool,

    /// Wall-clock length of the replay, in milliseconds
    #[arg(long, env = "REPLAY_DURATION_MS", default_value_t = 10_000)]
    replay_duration_ms: u64,

    /// Tick spacing during replay
    #[arg(long, env = "REPLAY_PACING", value_enum, default_value_t = Pacing::Fixed)]
    pacing: Pacing,

    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

fn print_frame(session: &Session<NdjsonFile>, args: &Args) {
    let sched = session.scheduler();
    println!("{}", position_line(sched.current_timestamp(), sched.current_index(), sched.len()));
    print!("{}", render_ladder(session.current_snapshot().as_ref(), args.top, args.bar_width));
    println!("---");
}

fn main() -> Result<()> {
    let _ = dotenv();
    let args = Args::parse();
    logging::init(&args.log_level);

    let config = ReplayConfig::default()
        .with_total_duration(Duration::from_millis(args.replay_duration_ms))
        .with_pacing(args.pacing);
    let mut session = Session::new(NdjsonFile::new(&args.input), config);
    if !session.load() {
        bail!("{}", session.error().unwrap_or("load failed"));
    }
    let total = session.scheduler().len();

    if args.replay {
        session.scheduler_mut().toggle_replay();
        print_frame(&session, &args);
        while session.scheduler_mut().wait_tick() {
            print_frame(&session, &args);
        }
    } else {
        for i in 0..total {
            session.scheduler_mut().select_index(i);
            print_frame(&session, &args);
        }
    }
    info!(snapshots = total, "dump finished");
    Ok(())
}
