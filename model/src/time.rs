//! Integer-minute scheduling math plus the one place floating point is
//! allowed: the 0.1-minute display clock (§9 design note: "time as integer
//! minutes").

/// Rounds `minutes` up to the nearest multiple of `grid` at or above `start`.
///
/// This is `addBatch`'s rounding rule. The output is always `>= minutes`.
pub fn round_to_grid_ceil(minutes: u32, grid: u32) -> u32 {
    if grid == 0 {
        return minutes;
    }
    minutes.div_ceil(grid) * grid
}

/// Rounds `minutes` to the *nearest* multiple of `grid`, ties rounding up.
///
/// This is `moveBatch`'s rounding rule; the divergence from
/// [`round_to_grid_ceil`] is intentional (§9).
pub fn round_to_grid_nearest(minutes: u32, grid: u32) -> u32 {
    if grid == 0 {
        return minutes;
    }
    let lower = (minutes / grid) * grid;
    let upper = lower + grid;
    if minutes - lower < upper - minutes {
        lower
    } else {
        upper
    }
}

/// Formats minutes-since-midnight as a zero-padded `HH:MM` string.
pub fn minutes_to_hhmm(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Parses a zero-padded `HH:MM` string into minutes-since-midnight.
pub fn hhmm_to_minutes(s: &str) -> Option<u32> {
    let (h, m) = s.split_once(':')?;
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    if h > 23 || m > 59 {
        return None;
    }
    Some(h * 60 + m)
}

/// Quantises a floating-point minute value to 0.1-minute precision, the
/// display clock's granularity (§4.3).
pub fn quantize_tenth(minutes: f64) -> f64 {
    (minutes * 10.0).round() / 10.0
}
