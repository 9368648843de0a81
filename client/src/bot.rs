use rand::Rng;

pub const ARENA_WIDTH: i32 = 800;
pub const ARENA_HEIGHT: i32 = 600;
const MAX_SPEED: i32 = 6;

/// Wandering motion for a headless player.
///
/// Keeps the position inside the arena and picks a new heading every so
/// often, so other clients see something move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotMotion {
    pub x: i32,
    pub y: i32,
    pub vel_x: i32,
    pub vel_y: i32,
    pub tick: u32,
    turn_every: u32,
}

impl BotMotion {
    pub fn new(x: i32, y: i32, turn_every: u32) -> Self {
        Self {
            x: x.clamp(0, ARENA_WIDTH),
            y: y.clamp(0, ARENA_HEIGHT),
            vel_x: 0,
            vel_y: 0,
            tick: 0,
            turn_every: turn_every.max(1),
        }
    }

    pub fn random<R: Rng>(rng: &mut R, turn_every: u32) -> Self {
        Self::new(
            rng.gen_range(0..=ARENA_WIDTH),
            rng.gen_range(0..=ARENA_HEIGHT),
            turn_every,
        )
    }

    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    pub fn velocity(&self) -> (i32, i32) {
        (self.vel_x, self.vel_y)
    }

    /// Advances one tick
    pub fn step<R: Rng>(&mut self, rng: &mut R) {
        if self.tick % self.turn_every == 0 {
            self.vel_x = rng.gen_range(-MAX_SPEED..=MAX_SPEED);
            self.vel_y = rng.gen_range(-MAX_SPEED..=MAX_SPEED);
        }
        self.tick = self.tick.wrapping_add(1);

        self.x += self.vel_x;
        self.y += self.vel_y;

        // bounce off the walls
        if self.x < 0 || self.x > ARENA_WIDTH {
            self.x = self.x.clamp(0, ARENA_WIDTH);
            self.vel_x = -self.vel_x;
        }
        if self.y < 0 || self.y > ARENA_HEIGHT {
            self.y = self.y.clamp(0, ARENA_HEIGHT);
            self.vel_y = -self.vel_y;
        }
    }
}
