use crate::domain::{Bar, Period};
use crate::error::DataError;

/// Merge a newest-first run of same-period bars into bars of `target`.
///
/// Input must hold one symbol and stream, one period that divides `target`
/// evenly, and strictly descending start times. Output is newest-first as well.
pub fn roll_up(bars: &[Bar], target: Period) -> Result<Vec<Bar>, DataError> {
    let Some(first) = bars.first() else {
        return Ok(Vec::new());
    };
    if first.period >= target {
        return Err(DataError::ValidationError(format!(
            "cannot roll {} bars up into {target}",
            first.period
        )));
    }
    if target.duration_ms() % first.period.duration_ms() != 0 {
        return Err(DataError::ValidationError(format!(
            "{} bars do not tile {target} bars",
            first.period
        )));
    }
    for pair in bars.windows(2) {
        let (later, earlier) = (&pair[0], &pair[1]);
        if earlier.symbol != first.symbol || earlier.stream != first.stream {
            return Err(DataError::ValidationError(format!(
                "roll-up mixes {} and {}",
                first.symbol, earlier.symbol
            )));
        }
        if earlier.period != first.period {
            return Err(DataError::ValidationError(format!(
                "roll-up mixes {} and {} bars",
                first.period, earlier.period
            )));
        }
        if earlier.start >= later.start {
            return Err(DataError::ValidationError(format!(
                "roll-up input not strictly descending at {}",
                earlier.start
            )));
        }
    }

    let mut out: Vec<Bar> = Vec::new();
    for bar in bars {
        let start = target.floor(bar.start);
        match out.last_mut() {
            Some(acc) if acc.start == start => {
                // Walking backwards in time: every bar filed later is earlier.
                acc.open = bar.open;
                acc.high = acc.high.max(bar.high);
                acc.low = acc.low.min(bar.low);
                acc.source = acc.source.combine(bar.source);
            }
            _ => out.push(Bar {
                period: target,
                start,
                ..bar.clone()
            }),
        }
    }
    Ok(out)
}
