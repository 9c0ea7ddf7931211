//! Free-fall prediction for the movement check.
//!
//! A vanilla client applies `motion = (motion - 0.08) * 0.98f` every tick while airborne.
//! The drag is a single-precision float widened to double, so the table reproduces it bit for bit.

/// Downward acceleration per tick.
pub const GRAVITY: f64 = 0.08;
/// Vertical drag, applied as a widened `f32` the way the client does.
pub const DRAG: f32 = 0.98;

/// Expected per-tick Y deltas of a player dropped from [`GravityOracle::spawn_y`].
#[derive(Debug, Clone, PartialEq)]
pub struct GravityOracle {
    deltas: Vec<f64>,
    max_ticks: u32,
    platform_y: i32,
    collide_y: i32,
    spawn_y: i32,
}

fn next_delta(previous: f64) -> f64 {
    (previous - GRAVITY) * DRAG as f64
}

impl GravityOracle {
    /// Build the table for a platform whose top face sits at `platform_y + 1`.
    ///
    /// The drop height is the distance covered in `max_ticks` ticks, rounded up to a whole
    /// block, so a legitimate client needs at least `max_ticks` ticks to land.
    pub fn new(max_ticks: u32, platform_y: i32) -> Self {
        let collide_y = platform_y + 1;

        let mut delta = 0.0;
        let mut distance = 0.0;
        for _ in 0..max_ticks {
            delta = next_delta(delta);
            distance += delta.abs();
        }
        let spawn_y = collide_y + distance.ceil() as i32;

        // Keep predicting until the player would have passed through the platform.
        let drop = (spawn_y - platform_y) as f64;
        let mut deltas = vec![0.0];
        let mut fallen = 0.0;
        let mut delta = 0.0;
        while fallen <= drop {
            delta = next_delta(delta);
            fallen += delta.abs();
            deltas.push(delta);
        }

        Self {
            deltas,
            max_ticks,
            platform_y,
            collide_y,
            spawn_y,
        }
    }

    /// Delta for the `tick`th airborne movement. Tick 0 is the resting position.
    /// `None` once the player would already be below the platform.
    pub fn delta(&self, tick: usize) -> Option<f64> {
        self.deltas.get(tick).copied()
    }

    pub fn ticks(&self) -> usize {
        self.deltas.len()
    }

    pub fn max_ticks(&self) -> u32 {
        self.max_ticks
    }

    pub fn platform_y(&self) -> i32 {
        self.platform_y
    }

    /// Y of the platform's top face, where a landing player must report ground.
    pub fn collide_y(&self) -> i32 {
        self.collide_y
    }

    pub fn spawn_y(&self) -> i32 {
        self.spawn_y
    }

    /// Y positions a legitimate client reports while falling, one per tick, starting at spawn.
    pub fn trajectory(&self) -> impl Iterator<Item = f64> + '_ {
        let spawn = self.spawn_y as f64;
        self.deltas.iter().scan(spawn, |y, delta| {
            *y += delta;
            Some(*y)
        })
    }
}
