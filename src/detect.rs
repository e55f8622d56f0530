use crate::config::Config;
use crate::types::GameShape;

/// Infers `(max_ball, draw_length)` from historical rounds.
///
/// `max_ball` is the largest number seen and `draw_length` the rounded mean round size.
/// Empty input yields the configured defaults.
pub fn detect<'a, I>(rounds: I, config: &Config) -> GameShape
where
    I: IntoIterator<Item = &'a [u32]>,
{
    let mut max_ball = 0u32;
    let mut total_len = 0usize;
    let mut count = 0usize;

    for round in rounds {
        if let Some(&m) = round.iter().max() {
            max_ball = max_ball.max(m);
        }
        total_len += round.len();
        count += 1;
    }

    if count == 0 {
        return GameShape {
            max_ball: config.default_max_ball,
            draw_length: config.default_draw_length,
        };
    }

    GameShape {
        max_ball: if max_ball == 0 { config.default_max_ball } else { max_ball },
        draw_length: (total_len as f64 / count as f64).round() as usize,
    }
}

/// Largest fraction of portfolio entries any single number may appear in.
pub fn exposure_limit(shape: GameShape, config: &Config) -> f64 {
    if shape.max_ball == 0 {
        return config.exposure_ceiling;
    }
    let base_prob = shape.draw_length as f64 / shape.max_ball as f64;
    (base_prob * config.exposure_multiplier).clamp(config.exposure_floor, config.exposure_ceiling)
}
