//! Elapsed-time formatting.

const MICROS_PER_CENTI: u64 = 10_000;
const MICROS_PER_SECOND: u64 = 1_000_000;
const MICROS_PER_MINUTE: u64 = 60 * MICROS_PER_SECOND;
const MICROS_PER_HOUR: u64 = 60 * MICROS_PER_MINUTE;
const MICROS_PER_DAY: u64 = 24 * MICROS_PER_HOUR;

/// Format a duration in microseconds as `[D:]HH:MM:SS:CC`.
///
/// `CC` is hundredths of a second, truncated. The day count appears only
/// once the duration reaches a full day.
pub fn format_micros(micros: u64) -> String {
    let days = micros / MICROS_PER_DAY;
    let hours = (micros % MICROS_PER_DAY) / MICROS_PER_HOUR;
    let minutes = (micros % MICROS_PER_HOUR) / MICROS_PER_MINUTE;
    let seconds = (micros % MICROS_PER_MINUTE) / MICROS_PER_SECOND;
    let centis = (micros % MICROS_PER_SECOND) / MICROS_PER_CENTI;

    let clock = format!("{hours:02}:{minutes:02}:{seconds:02}:{centis:02}");
    if days > 0 {
        format!("{days}:{clock}")
    } else {
        clock
    }
}
