use crate::V2;

/// One fluid element. `start_position` is the committed position from the last
/// step; `end_position` is the working position that every step phase mutates
/// until the velocity reconciliation commits it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub start_position: V2,
    pub end_position: V2,
    pub velocity: V2,
}

impl Particle {
    pub fn at_rest(position: V2) -> Particle {
        Particle {
            start_position: position,
            end_position: position,
            velocity: V2::zeros(),
        }
    }
}
