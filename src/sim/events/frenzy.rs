/// How long a frenzy lasts
pub const FRENZY_DURATION_MS: f64 = 10_000.0;
/// One free coin per interval while a frenzy runs
pub const FRENZY_SPAWN_INTERVAL_MS: f64 = 400.0;
pub const FRENZY_SPEED_FACTOR: f32 = 1.5;
/// A stalled frame drops its spawn backlog beyond this many coins
pub const FRENZY_MAX_SPAWNS_PER_TICK: u32 = 2;

/// What the frenzy wants done this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrenzyTick {
    pub spawn: u32,
    pub ended: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FrenzyWindow {
    started_ms: Option<f64>,
    last_spawn_ms: f64,
}

impl FrenzyWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.started_ms.is_some()
    }

    /// Begin a frenzy; false if one is already running
    pub fn start(&mut self, now: f64) -> bool {
        if self.is_active() {
            return false;
        }
        self.started_ms = Some(now);
        self.last_spawn_ms = now;
        log::info!("Frenzy!");
        true
    }

    pub fn remaining_ms(&self, now: f64) -> f64 {
        self.started_ms
            .map(|s| (FRENZY_DURATION_MS - (now - s)).max(0.0))
            .unwrap_or(0.0)
    }

    pub fn update(&mut self, now: f64) -> FrenzyTick {
        let Some(started) = self.started_ms else {
            return FrenzyTick::default();
        };
        let end = started + FRENZY_DURATION_MS;
        let horizon = now.min(end);
        let due = ((horizon - self.last_spawn_ms) / FRENZY_SPAWN_INTERVAL_MS)
            .floor()
            .max(0.0) as u32;
        self.last_spawn_ms += f64::from(due) * FRENZY_SPAWN_INTERVAL_MS;
        let spawn = due.min(FRENZY_MAX_SPAWNS_PER_TICK);
        let ended = now >= end;
        if ended {
            self.started_ms = None;
        }
        FrenzyTick { spawn, ended }
    }

    pub fn abort(&mut self) {
        self.started_ms = None;
    }
}
