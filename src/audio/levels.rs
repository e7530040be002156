// Level meter shaping
// Converts metering readings into the normalized samples stored with a recording

/// Quietest level the meter distinguishes from silence
pub const LEVEL_FLOOR_DB: f32 = -60.0;

/// Exponent applied after normalization so quiet passages stay visibly low
const LEVEL_CURVE: f32 = 1.4;

/// Map a metering reading in dBFS (-60..0) to an amplitude in 0.0..=1.0
pub fn normalize_level_db(db: f32) -> f32 {
    if db.is_nan() {
        return 0.0;
    }
    let normalized = ((db - LEVEL_FLOOR_DB) / -LEVEL_FLOOR_DB).clamp(0.0, 1.0);
    normalized.powf(LEVEL_CURVE)
}
