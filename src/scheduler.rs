//! Fixed-timestep scheduling on top of a variable-rate frame callback.
//!
//! Each subsystem owns an accumulator. Frame time is added to all of them;
//! a subsystem runs once per frame at most, when its accumulator reaches its
//! period, and the period is subtracted so fractional time carries over.

use crate::config::Tuning;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Accumulator {
    pub period_ms: f64,
    pub acc_ms: f64,
}

impl Accumulator {
    pub fn new(period_ms: f64) -> Self {
        Accumulator {
            period_ms,
            acc_ms: 0.0,
        }
    }

    pub fn add(&mut self, dt_ms: f64) {
        self.acc_ms += dt_ms;
    }

    /// Consume one period if available.
    pub fn try_consume(&mut self) -> bool {
        if self.acc_ms >= self.period_ms {
            self.acc_ms -= self.period_ms;
            true
        } else {
            false
        }
    }
}

/// Which subsystems are due this frame, in execution order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Due {
    pub player_move: bool,
    pub enemy_move: bool,
    pub shot_step: bool,
    pub enemy_fire: bool,
    pub auto_fire: bool,
}

impl Due {
    pub fn any(&self) -> bool {
        self.player_move || self.enemy_move || self.shot_step || self.enemy_fire || self.auto_fire
    }
}

#[derive(Clone, Debug)]
pub struct Scheduler {
    last_ts: Option<f64>,
    pub player_move: Accumulator,
    pub enemy_move: Accumulator,
    pub shot_step: Accumulator,
    pub enemy_fire: Accumulator,
    /// Only present when the player fires automatically.
    pub auto_fire: Option<Accumulator>,
}

impl Scheduler {
    pub fn new(tuning: &Tuning) -> Self {
        Scheduler {
            last_ts: None,
            player_move: Accumulator::new(tuning.move_interval_ms),
            enemy_move: Accumulator::new(tuning.move_interval_ms),
            shot_step: Accumulator::new(tuning.shot_interval_ms),
            enemy_fire: Accumulator::new(tuning.enemy_fire_period_ms),
            auto_fire: tuning.auto_fire_ms.map(Accumulator::new),
        }
    }

    /// Time since the previous frame. The first frame yields zero.
    pub fn frame_delta(&mut self, ts_ms: f64) -> f64 {
        let last = self.last_ts.unwrap_or(ts_ms);
        self.last_ts = Some(ts_ms);
        (ts_ms - last).max(0.0)
    }

    /// Feed `dt_ms` of unpaused time and report which subsystems are due.
    pub fn advance(&mut self, dt_ms: f64) -> Due {
        self.player_move.add(dt_ms);
        self.enemy_move.add(dt_ms);
        self.shot_step.add(dt_ms);
        self.enemy_fire.add(dt_ms);
        if let Some(auto) = self.auto_fire.as_mut() {
            auto.add(dt_ms);
        }

        Due {
            player_move: self.player_move.try_consume(),
            enemy_move: self.enemy_move.try_consume(),
            shot_step: self.shot_step.try_consume(),
            enemy_fire: self.enemy_fire.try_consume(),
            auto_fire: self
                .auto_fire
                .as_mut()
                .map(Accumulator::try_consume)
                .unwrap_or(false),
        }
    }
}
