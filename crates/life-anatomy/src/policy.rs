//! Movement decision policies.
//!
//! The simulation only needs a direction to step in and a way to reshuffle
//! the policy when an organism grows its first eye. Anything smarter plugs in
//! behind [`DecisionPolicy`].

use life_core::Direction;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::fmt;

pub trait DecisionPolicy: fmt::Debug + Send {
    /// Direction for the next step, `None` to stay put.
    fn decide_move(&mut self, rng: &mut ChaCha8Rng) -> Option<Direction>;

    /// Re-randomize internal decisions.
    fn randomize(&mut self, rng: &mut ChaCha8Rng);

    fn boxed_clone(&self) -> Box<dyn DecisionPolicy>;

    fn kind(&self) -> &'static str;
}

impl Clone for Box<dyn DecisionPolicy> {
    fn clone(&self) -> Self {
        self.boxed_clone()
    }
}

/// Uniform step of -1/0/+1 on each axis.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomWalk;

impl DecisionPolicy for RandomWalk {
    fn decide_move(&mut self, rng: &mut ChaCha8Rng) -> Option<Direction> {
        let dx = rng.gen_range(-1..=1);
        let dy = rng.gen_range(-1..=1);
        Direction::from_delta(dx, dy)
    }

    fn randomize(&mut self, _rng: &mut ChaCha8Rng) {}

    fn boxed_clone(&self) -> Box<dyn DecisionPolicy> {
        Box::new(*self)
    }

    fn kind(&self) -> &'static str {
        "random_walk"
    }
}

/// Keeps a preferred heading with probability `persistence`, otherwise walks randomly.
#[derive(Debug, Clone, Copy, Default)]
pub struct Heading {
    pub heading: Option<Direction>,
    pub persistence: f64,
}

impl DecisionPolicy for Heading {
    fn decide_move(&mut self, rng: &mut ChaCha8Rng) -> Option<Direction> {
        match self.heading {
            Some(direction) if rng.gen::<f64>() < self.persistence => Some(direction),
            _ => RandomWalk.decide_move(rng),
        }
    }

    fn randomize(&mut self, rng: &mut ChaCha8Rng) {
        let directions = Direction::all();
        self.heading = Some(directions[rng.gen_range(0..directions.len())]);
        self.persistence = rng.gen_range(0.5..1.0);
    }

    fn boxed_clone(&self) -> Box<dyn DecisionPolicy> {
        Box::new(*self)
    }

    fn kind(&self) -> &'static str {
        "heading"
    }
}
