use anyhow::{Context, Result};
use book_replay::config::{Pacing, ReplayConfig};
use book_replay::loader::{NdjsonFile, SnapshotSource};
use book_replay::logging;
use book_replay::render::{position_line, render_ladder};
use book_replay::session::{Command, Session};
use clap::Parser;
use crossbeam_channel::{Sender, select, unbounded};
use dotenvy::dotenv;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Parser)]
#[command(version, about = "Step through or replay recorded order book snapshots")]
struct Args {
    /// Snapshot file: one JSON object per line, or a single JSON array
    #[arg(long, short = 'i', env = "SNAPSHOT_FILE")]
    input: PathBuf,

    /// Wall-clock length of a full replay, in milliseconds
    #[arg(long, env = "REPLAY_DURATION_MS", default_value_t = 300_000)]
    replay_duration_ms: u64,

    /// Tick spacing during replay
    #[arg(long, env = "REPLAY_PACING", value_enum, default_value_t = Pacing::Fixed)]
    pacing: Pacing,

    /// Number of levels to show per side
    #[arg(long, default_value_t = 10)]
    top: usize,

    /// Width of the depth bars, in characters
    #[arg(long, default_value_t = 30)]
    bar_width: usize,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

fn draw<S: SnapshotSource>(session: &Session<S>, args: &Args) -> io::Result<()> {
    let sched = session.scheduler();
    let mut out = io::stdout().lock();
    writeln!(out, "{}", position_line(sched.current_timestamp(), sched.current_index(), sched.len()))?;
    if let Some(err) = session.error() {
        writeln!(out, "error: {err} (`reload` to retry)")?;
    }
    write!(out, "{}", render_ladder(session.current_snapshot().as_ref(), args.top, args.bar_width))?;
    let state = if sched.is_replaying() { "replaying" } else { "idle" };
    writeln!(out, "[{state}] prev | next | seek N | replay | reload | quit")?;
    out.flush()
}

/// Forward parsed stdin lines as commands; unknown input is logged and skipped.
fn spawn_stdin_reader(tx: Sender<Command>) {
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<Command>() {
                Ok(cmd) => {
                    if tx.send(cmd).is_err() {
                        break;
                    }
                }
                Err(e) => warn!("{e}"),
            }
        }
        debug!("stdin closed");
    });
}

fn main() -> Result<()> {
    // Load environment variables from .env if present
    let _ = dotenv();
    let args = Args::parse();
    logging::init(&args.log_level);

    let config = ReplayConfig::default()
        .with_total_duration(Duration::from_millis(args.replay_duration_ms))
        .with_pacing(args.pacing);
    let mut session = Session::new(NdjsonFile::new(&args.input), config);
    // a failed load stays on screen with a reload hint
    session.load();
    let events = session.scheduler_mut().subscribe();

    let (tx, rx) = unbounded::<Command>();
    spawn_stdin_reader(tx.clone());
    ctrlc::set_handler(move || {
        let _ = tx.send(Command::Quit);
    })
    .context("install Ctrl+C handler")?;

    draw(&session, &args)?;
    loop {
        let timer = session.scheduler().timer();
        let mut reloaded = false;
        select! {
            recv(rx) -> msg => {
                let Ok(cmd) = msg else { break };
                reloaded = cmd == Command::Reload;
                if !session.apply(cmd) {
                    break;
                }
            }
            recv(timer) -> _ => session.scheduler_mut().on_tick(),
        }
        let changes = events.try_iter().inspect(|ev| debug!(?ev, "replay state")).count();
        if changes > 0 || reloaded {
            draw(&session, &args)?;
        }
    }
    Ok(())
}
