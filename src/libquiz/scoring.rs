use crate::libquiz::model::{Question, Quiz, DEFAULT_TIME};

pub const DEFAULT_BASE_POINTS: f64 = 500.0;
pub const DEFAULT_BONUS_POINTS: f64 = 500.0;

fn present(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0)
}

// Half-up rounding, so -2.5 rounds to -2 rather than away from zero.
fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Time budget the speed bonus is measured against. A zero limit counts as unset.
pub fn max_time(question: &Question, quiz: &Quiz, timer_limit: Option<u32>) -> f64 {
    present(question.time_limit)
        .or_else(|| present(quiz.default_time))
        .or_else(|| present(timer_limit.map(f64::from)))
        .unwrap_or(DEFAULT_TIME)
}

/// Points for a correct answer given `remaining` seconds on the clock:
/// the base award plus the bonus scaled by the fraction of time left.
pub fn compute_score(question: &Question, remaining: f64, quiz: &Quiz, timer_limit: Option<u32>) -> u64 {
    let t_max = max_time(question, quiz, timer_limit);
    let base = question
        .base_points
        .or(quiz.base_points)
        .unwrap_or(DEFAULT_BASE_POINTS);
    let bonus = question
        .bonus_points
        .or(quiz.bonus_points)
        .unwrap_or(DEFAULT_BONUS_POINTS);

    let remaining = if remaining.is_nan() { 0.0 } else { remaining };
    let rem = remaining.min(t_max).max(0.0);
    let speed_factor = if t_max > 0.0 { rem / t_max } else { 0.0 };
    let speed_bonus = round_half_up(bonus * speed_factor);
    let awarded = round_half_up(base + speed_bonus);

    awarded.max(0.0) as u64
}
