use chrono::{Duration, NaiveTime};

/// Derived hour figures for one employee-day. All non-negative, rounded
/// to two decimals.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DayHours {
    pub total: f64,
    pub overtime: f64,
    pub undertime: f64,
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Worked-hours arithmetic for a day's punches.
///
/// A clock-out earlier in wall-clock time than the clock-in means the
/// shift crossed midnight, so 24 hours are added before subtracting.
/// The break is deducted only when both break punches are present.
/// Undertime is reported only once the employee has clocked out; a
/// missing punch-out must not look like a short day.
pub fn compute(
    clock_in: Option<NaiveTime>,
    clock_out: Option<NaiveTime>,
    break_out: Option<NaiveTime>,
    break_in: Option<NaiveTime>,
    expected_hours: f64,
) -> DayHours {
    let (cin, cout) = match (clock_in, clock_out) {
        (Some(cin), Some(cout)) => (cin, cout),
        _ => return DayHours::default(),
    };

    let mut worked = cout.signed_duration_since(cin);
    if worked < Duration::zero() {
        worked = worked + Duration::hours(24);
    }

    let break_taken = match (break_out, break_in) {
        (Some(bo), Some(bi)) => {
            let mut b = bi.signed_duration_since(bo);
            if b < Duration::zero() {
                b = b + Duration::hours(24);
            }
            b
        }
        _ => Duration::zero(),
    };

    let net = worked - break_taken;
    let total = round2((net.num_seconds().max(0) as f64) / 3600.0);

    DayHours {
        total,
        overtime: round2((total - expected_hours).max(0.0)),
        undertime: round2((expected_hours - total).max(0.0)),
    }
}
