use std::{
    fmt,
    time::{Duration, Instant},
};

use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Reading,
    HeaderResolution,
    ColumnResolution,
    Cleaning,
    Stats,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Reading => "reading",
            Stage::HeaderResolution => "header resolution",
            Stage::ColumnResolution => "column resolution",
            Stage::Cleaning => "cleaning",
            Stage::Stats => "stats",
        };
        f.write_str(name)
    }
}

/// Logs the wall-clock duration of a stage when dropped.
pub struct StageTimer {
    stage: Stage,
    started: Instant,
}

impl StageTimer {
    pub fn start(stage: Stage) -> Self {
        Self {
            stage,
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Drop for StageTimer {
    fn drop(&mut self) {
        debug!(
            "{} finished in {:.4} seconds",
            self.stage,
            self.elapsed().as_secs_f64()
        );
    }
}
