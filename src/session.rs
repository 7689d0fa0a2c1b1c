//! Composition of a snapshot source, the loaded store and the replay
//! scheduler, as seen by a viewer.
//!
//! The session owns the load lifecycle (`is_loading`, `error`, reload) and
//! resolves the scheduler's current timestamp to a normalized snapshot each
//! time it is asked.
use std::str::FromStr;

use tracing::{info, warn};

use crate::book::{Snapshot, normalize};
use crate::config::ReplayConfig;
use crate::loader::{SnapshotSource, SnapshotStore};
use crate::replay::ReplayScheduler;

/// Viewer commands. None of them report a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Previous,
    Next,
    Seek(usize),
    ToggleReplay,
    Reload,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    /// `p`/`prev`, `n`/`next`, `s N`/`seek N`, `r`/`replay`, `l`/`reload`,
    /// `q`/`quit`. Seek positions are 1-based as displayed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let head = parts.next().unwrap_or_default().to_ascii_lowercase();
        let cmd = match head.as_str() {
            "p" | "prev" | "previous" => Command::Previous,
            "n" | "next" => Command::Next,
            "r" | "replay" => Command::ToggleReplay,
            "l" | "reload" => Command::Reload,
            "q" | "quit" | "exit" => Command::Quit,
            "s" | "seek" => {
                let arg = parts.next().ok_or_else(|| "seek needs a position".to_string())?;
                let pos: usize = arg.parse().map_err(|_| format!("invalid position {arg:?}"))?;
                // position 0 maps past the end and is ignored like any out-of-range seek
                Command::Seek(pos.checked_sub(1).unwrap_or(usize::MAX))
            }
            "" => return Err("empty command".to_string()),
            other => return Err(format!("unknown command {other:?}")),
        };
        match parts.next() {
            Some(extra) => Err(format!("unexpected argument {extra:?}")),
            None => Ok(cmd),
        }
    }
}

pub struct Session<S> {
    source: S,
    store: Option<SnapshotStore>,
    scheduler: ReplayScheduler,
    loading: bool,
    error: Option<String>,
}

impl<S: SnapshotSource> Session<S> {
    /// Nothing is read until [`Session::load`].
    pub fn new(source: S, config: ReplayConfig) -> Self {
        Self {
            source,
            store: None,
            scheduler: ReplayScheduler::new(config),
            loading: true,
            error: None,
        }
    }

    /// Read the source and hand its timestamps to the scheduler. On failure
    /// the error is kept for display and the scheduler is left as it was.
    pub fn load(&mut self) -> bool {
        self.loading = true;
        self.error = None;
        let result = self.source.load_all();
        self.loading = false;
        match result {
            Ok(records) => {
                let store = SnapshotStore::new(records);
                info!(snapshots = store.len(), "session loaded");
                self.scheduler.set_timestamps(store.timestamps());
                self.store = Some(store);
                true
            }
            Err(e) => {
                warn!(error = %e, "loading snapshots failed");
                self.error = Some(e.to_string());
                false
            }
        }
    }

    pub fn reload(&mut self) -> bool {
        self.load()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn store(&self) -> Option<&SnapshotStore> {
        self.store.as_ref()
    }

    pub fn scheduler(&self) -> &ReplayScheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut ReplayScheduler {
        &mut self.scheduler
    }

    /// Normalized snapshot at the current index; `None` with no data or when
    /// the timestamp has no record.
    pub fn current_snapshot(&self) -> Option<Snapshot> {
        let ts = self.scheduler.current_timestamp()?;
        self.store.as_ref()?.by_timestamp(ts).map(normalize)
    }

    /// Apply a command. Returns `false` for [`Command::Quit`].
    pub fn apply(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::Previous => self.scheduler.go_to_previous(),
            Command::Next => self.scheduler.go_to_next(),
            Command::Seek(i) => self.scheduler.select_index(i),
            Command::ToggleReplay => self.scheduler.toggle_replay(),
            Command::Reload => {
                self.reload();
            }
            Command::Quit => {
                self.scheduler.stop();
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::OrderLevel;
    use crate::record::{LegacyLevels, RawSnapshot};

    fn records() -> Vec<RawSnapshot> {
        let mut levels = LegacyLevels::default();
        levels.bid[0] = Some(99.0);
        levels.bid_size[0] = Some(1.0);
        levels.bid[1] = Some(100.0);
        levels.bid_size[1] = Some(2.0);
        vec![
            RawSnapshot::Legacy { time: "00:00:00".into(), levels },
            RawSnapshot::Canonical {
                time: "00:00:01".into(),
                bids: vec![],
                asks: vec![OrderLevel { price: 101.0, size: 3.0 }],
            },
        ]
    }

    #[test]
    fn commands_parse() {
        assert_eq!("p".parse::<Command>(), Ok(Command::Previous));
        assert_eq!(" NEXT ".parse::<Command>(), Ok(Command::Next));
        assert_eq!("seek 3".parse::<Command>(), Ok(Command::Seek(2)));
        assert_eq!("s 0".parse::<Command>(), Ok(Command::Seek(usize::MAX)));
        assert_eq!("replay".parse::<Command>(), Ok(Command::ToggleReplay));
        assert_eq!("l".parse::<Command>(), Ok(Command::Reload));
        assert_eq!("q".parse::<Command>(), Ok(Command::Quit));
        assert!("seek".parse::<Command>().is_err());
        assert!("seek -1".parse::<Command>().is_err());
        assert!("next 2".parse::<Command>().is_err());
        assert!("jump".parse::<Command>().is_err());
        assert!("".parse::<Command>().is_err());
    }

    #[test]
    fn loading_state_before_and_after_load() {
        let mut session = Session::new(records(), ReplayConfig::default());
        assert!(session.is_loading());
        assert_eq!(session.current_snapshot(), None);
        assert!(session.load());
        assert!(!session.is_loading());
        assert_eq!(session.error(), None);
        assert_eq!(session.scheduler().len(), 2);
    }

    #[test]
    fn current_snapshot_follows_index() {
        let mut session = Session::new(records(), ReplayConfig::default());
        session.load();
        let first = session.current_snapshot().unwrap();
        assert_eq!(first.bids[0].price, 100.0);
        session.apply(Command::Next);
        let second = session.current_snapshot().unwrap();
        assert_eq!(second.time, "00:00:01");
        assert!(second.bids.is_empty());
        session.apply(Command::Seek(7));
        assert_eq!(session.scheduler().current_index(), 1);
        session.apply(Command::Seek(0));
        assert_eq!(session.scheduler().current_index(), 0);
    }

    #[test]
    fn quit_stops_replay() {
        let mut session = Session::new(records(), ReplayConfig::default());
        session.load();
        assert!(session.apply(Command::ToggleReplay));
        assert!(session.scheduler().is_replaying());
        assert!(!session.apply(Command::Quit));
        assert!(!session.scheduler().is_replaying());
    }
}
