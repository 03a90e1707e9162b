use crate::engine::hours::DayHours;
use crate::model::attendance::AttendanceStatus;

/// Everything about the day that is not derivable from the punches alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct DayContext {
    pub is_holiday: bool,
    pub is_working_holiday: bool,
    pub on_approved_leave: bool,
    pub has_punches: bool,
    /// Clock-in after the shift-start grace threshold.
    pub late: bool,
}

/// A record stores exactly one status, but Late/Undertime/Overtime and a
/// worked holiday still count toward "present" in aggregate statistics.
/// Keeping the rollup flag here stops every aggregation site from
/// re-deriving it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub status: AttendanceStatus,
    pub counts_as_present: bool,
}

pub fn counts_as_present(status: AttendanceStatus) -> bool {
    matches!(
        status,
        AttendanceStatus::Present
            | AttendanceStatus::Late
            | AttendanceStatus::Undertime
            | AttendanceStatus::Overtime
            | AttendanceStatus::HolidayWorked
    )
}

/// Single-status decision, first match wins:
/// leave > holiday (no work) > holiday (worked) > absent > late >
/// undertime > overtime > present.
///
/// A working holiday expects punches, so without any it falls through to
/// Absent instead of Holiday (No Work).
pub fn classify(hours: &DayHours, ctx: &DayContext) -> Classification {
    let status = if ctx.on_approved_leave {
        AttendanceStatus::OnLeave
    } else if ctx.is_holiday && !ctx.is_working_holiday && !ctx.has_punches {
        AttendanceStatus::HolidayNoWork
    } else if ctx.is_holiday && ctx.has_punches {
        AttendanceStatus::HolidayWorked
    } else if !ctx.has_punches {
        AttendanceStatus::Absent
    } else if ctx.late {
        AttendanceStatus::Late
    } else if hours.undertime > 0.0 {
        AttendanceStatus::Undertime
    } else if hours.overtime > 0.0 {
        AttendanceStatus::Overtime
    } else {
        AttendanceStatus::Present
    };

    Classification {
        status,
        counts_as_present: counts_as_present(status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worked(total: f64, overtime: f64, undertime: f64) -> DayHours {
        DayHours {
            total,
            overtime,
            undertime,
        }
    }

    fn punched() -> DayContext {
        DayContext {
            has_punches: true,
            ..DayContext::default()
        }
    }

    #[test]
    fn full_day_is_present_and_counted() {
        let c = classify(&worked(8.0, 0.0, 0.0), &punched());
        assert_eq!(c.status, AttendanceStatus::Present);
        assert!(c.counts_as_present);
    }

    #[test]
    fn leave_beats_everything() {
        let ctx = DayContext {
            on_approved_leave: true,
            is_holiday: true,
            has_punches: true,
            late: true,
            ..DayContext::default()
        };
        let c = classify(&worked(8.0, 0.0, 0.0), &ctx);
        assert_eq!(c.status, AttendanceStatus::OnLeave);
        assert!(!c.counts_as_present);
    }

    #[test]
    fn holiday_without_punches_is_no_work() {
        let ctx = DayContext {
            is_holiday: true,
            ..DayContext::default()
        };
        let c = classify(&DayHours::default(), &ctx);
        assert_eq!(c.status, AttendanceStatus::HolidayNoWork);
        assert!(!c.counts_as_present);
    }

    #[test]
    fn holiday_with_punches_is_worked_and_counts_present() {
        let ctx = DayContext {
            is_holiday: true,
            has_punches: true,
            ..DayContext::default()
        };
        let c = classify(&worked(8.0, 0.0, 0.0), &ctx);
        assert_eq!(c.status, AttendanceStatus::HolidayWorked);
        assert!(c.counts_as_present);
    }

    #[test]
    fn working_holiday_without_punches_is_absent() {
        let ctx = DayContext {
            is_holiday: true,
            is_working_holiday: true,
            ..DayContext::default()
        };
        let c = classify(&DayHours::default(), &ctx);
        assert_eq!(c.status, AttendanceStatus::Absent);
        assert!(!c.counts_as_present);
    }

    #[test]
    fn working_holiday_with_punches_is_worked() {
        let ctx = DayContext {
            is_holiday: true,
            is_working_holiday: true,
            has_punches: true,
            ..DayContext::default()
        };
        let c = classify(&worked(8.0, 0.0, 0.0), &ctx);
        assert_eq!(c.status, AttendanceStatus::HolidayWorked);
        assert!(c.counts_as_present);
    }

    #[test]
    fn no_punches_on_working_day_is_absent() {
        let c = classify(&DayHours::default(), &DayContext::default());
        assert_eq!(c.status, AttendanceStatus::Absent);
        assert!(!c.counts_as_present);
    }

    #[test]
    fn late_wins_over_undertime() {
        let ctx = DayContext {
            late: true,
            ..punched()
        };
        let c = classify(&worked(6.0, 0.0, 2.0), &ctx);
        assert_eq!(c.status, AttendanceStatus::Late);
        assert!(c.counts_as_present);
    }

    #[test]
    fn undertime_wins_over_overtime() {
        // Both cannot be positive from the calculator, but precedence is
        // still fixed if a caller hands in inconsistent figures.
        let c = classify(&worked(6.0, 1.0, 2.0), &punched());
        assert_eq!(c.status, AttendanceStatus::Undertime);
        assert!(c.counts_as_present);
    }

    #[test]
    fn overtime_counts_present() {
        let c = classify(&worked(10.0, 2.0, 0.0), &punched());
        assert_eq!(c.status, AttendanceStatus::Overtime);
        assert!(c.counts_as_present);
    }
}
