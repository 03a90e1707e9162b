use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::{NaiveDate, NaiveTime};

use crate::engine::hours::{self, DayHours};
use crate::engine::parser::{PunchEvent, PunchSlot};
use crate::engine::status::{self, DayContext};
use crate::engine::ShiftPolicy;
use crate::error::{RowError, RowErrorKind};
use crate::model::attendance::{AttendanceStatus, MIN_VALID_DATE};

/// Read-only snapshots the reconciler works against. The roster maps
/// biometric ids to internal employee ids; holidays map the date to the
/// is_working flag; leave_days holds every (employee, date) covered by an
/// approved leave inside the period.
#[derive(Debug)]
pub struct ReconcileContext<'a> {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub roster: &'a HashMap<String, u64>,
    pub holidays: &'a HashMap<NaiveDate, bool>,
    pub leave_days: &'a HashSet<(u64, NaiveDate)>,
    pub policy: &'a ShiftPolicy,
}

/// Upsert-ready employee-day produced by reconciliation.
#[derive(Debug, Clone)]
pub struct DayRecord {
    pub employee_id: u64,
    pub date: NaiveDate,
    pub clock_in: Option<NaiveTime>,
    pub clock_out: Option<NaiveTime>,
    pub break_out: Option<NaiveTime>,
    pub break_in: Option<NaiveTime>,
    pub hours: DayHours,
    pub status: AttendanceStatus,
    pub counts_as_present: bool,
    pub remarks: Option<String>,
    /// Source rows consumed into this record; zero for synthesized days.
    pub source_rows: u32,
}

#[derive(Debug, Default)]
pub struct ReconcileOutcome {
    pub records: Vec<DayRecord>,
    pub errors: Vec<RowError>,
    pub failed: u32,
    pub skipped: u32,
    pub absent_marked: u32,
}

/// Slot patterns for days where no punch-type column exists: positional
/// inference over the punches in file order.
fn positional_pattern(count: usize) -> &'static [PunchSlot] {
    match count {
        1 => &[PunchSlot::ClockIn],
        2 => &[PunchSlot::ClockIn, PunchSlot::ClockOut],
        3 => &[PunchSlot::ClockIn, PunchSlot::BreakOut, PunchSlot::ClockOut],
        _ => &[
            PunchSlot::ClockIn,
            PunchSlot::BreakOut,
            PunchSlot::BreakIn,
            PunchSlot::ClockOut,
        ],
    }
}

/// Fill order for unslotted punches mixed with explicitly typed ones.
const MIXED_FILL_ORDER: [PunchSlot; 4] = [
    PunchSlot::ClockIn,
    PunchSlot::ClockOut,
    PunchSlot::BreakOut,
    PunchSlot::BreakIn,
];

struct GroupPunch {
    row: usize,
    biometric_id: String,
    time: NaiveTime,
    slot: Option<PunchSlot>,
}

/// Group punches by (employee, date), derive hours and status per group,
/// and synthesize Absent records for active employees with no punches on
/// working days inside the committed period. Row failures are collected,
/// never raised.
pub fn reconcile(events: &[PunchEvent], ctx: &ReconcileContext) -> ReconcileOutcome {
    let mut outcome = ReconcileOutcome::default();
    let mut groups: BTreeMap<(u64, NaiveDate), Vec<GroupPunch>> = BTreeMap::new();

    for event in events {
        let date = match event.date {
            Some(d) if d >= MIN_VALID_DATE => d,
            _ => {
                outcome.errors.push(RowError::new(
                    Some(event.row),
                    &event.biometric_id,
                    RowErrorKind::InvalidDate,
                    format!("unparseable or invalid punch date '{}'", event.raw_date),
                ));
                continue;
            }
        };

        if date < ctx.period_start || date > ctx.period_end {
            outcome.errors.push(RowError::new(
                Some(event.row),
                &event.biometric_id,
                RowErrorKind::OutOfPeriod,
                format!("punch date {date} is outside the declared period"),
            ));
            continue;
        }

        let time = match event.time {
            Some(t) => t,
            None => {
                outcome.errors.push(RowError::new(
                    Some(event.row),
                    &event.biometric_id,
                    RowErrorKind::InvalidTime,
                    format!("unparseable punch time '{}'", event.raw_time),
                ));
                continue;
            }
        };

        let employee_id = match ctx.roster.get(event.biometric_id.trim()) {
            Some(id) => *id,
            None => {
                outcome.errors.push(RowError::new(
                    Some(event.row),
                    &event.biometric_id,
                    RowErrorKind::UnknownEmployee,
                    "no active employee with this biometric id",
                ));
                continue;
            }
        };

        groups.entry((employee_id, date)).or_default().push(GroupPunch {
            row: event.row,
            biometric_id: event.biometric_id.clone(),
            time,
            slot: event.slot,
        });
    }

    let mut covered: HashSet<(u64, NaiveDate)> = HashSet::new();

    for ((employee_id, date), punches) in groups {
        let mut slots: HashMap<PunchSlot, NaiveTime> = HashMap::new();
        let mut consumed: u32 = 0;

        let all_positional = punches.iter().all(|p| p.slot.is_none());
        let pattern = positional_pattern(punches.len());
        let mut positional_idx = 0usize;

        for punch in &punches {
            let target = match punch.slot {
                Some(slot) => Some(slot),
                None if all_positional => {
                    let slot = pattern.get(positional_idx).copied();
                    positional_idx += 1;
                    slot
                }
                None => MIXED_FILL_ORDER
                    .iter()
                    .copied()
                    .find(|s| !slots.contains_key(s)),
            };

            match target {
                Some(slot) if !slots.contains_key(&slot) => {
                    slots.insert(slot, punch.time);
                    consumed += 1;
                }
                _ => {
                    outcome.errors.push(RowError::new(
                        Some(punch.row),
                        &punch.biometric_id,
                        RowErrorKind::DuplicatePunch,
                        format!("duplicate punch for {date}, slot already filled"),
                    ));
                }
            }
        }

        let clock_in = slots.get(&PunchSlot::ClockIn).copied();
        let clock_out = slots.get(&PunchSlot::ClockOut).copied();
        let break_out = slots.get(&PunchSlot::BreakOut).copied();
        let break_in = slots.get(&PunchSlot::BreakIn).copied();

        let hours = hours::compute(
            clock_in,
            clock_out,
            break_out,
            break_in,
            ctx.policy.expected_hours,
        );

        let day_ctx = DayContext {
            is_holiday: ctx.holidays.contains_key(&date),
            is_working_holiday: ctx.holidays.get(&date).copied().unwrap_or(false),
            on_approved_leave: ctx.leave_days.contains(&(employee_id, date)),
            has_punches: true,
            late: clock_in.is_some_and(|t| t > ctx.policy.late_threshold()),
        };
        let classification = status::classify(&hours, &day_ctx);

        covered.insert((employee_id, date));
        outcome.records.push(DayRecord {
            employee_id,
            date,
            clock_in,
            clock_out,
            break_out,
            break_in,
            hours,
            status: classification.status,
            counts_as_present: classification.counts_as_present,
            remarks: None,
            source_rows: consumed,
        });
    }

    synthesize_absences(ctx, &covered, &mut outcome);

    outcome.failed = outcome.errors.iter().filter(|e| !e.kind.is_skip()).count() as u32;
    outcome.skipped = outcome.errors.iter().filter(|e| e.kind.is_skip()).count() as u32;

    outcome
}

/// One Absent record per active employee per working day with no punches.
/// Rest days, non-working holidays and approved-leave days are left alone;
/// a working holiday still expects punches and synthesizes absences.
fn synthesize_absences(
    ctx: &ReconcileContext,
    covered: &HashSet<(u64, NaiveDate)>,
    outcome: &mut ReconcileOutcome,
) {
    let employee_ids: BTreeSet<u64> = ctx.roster.values().copied().collect();

    let mut date = ctx.period_start.max(MIN_VALID_DATE);
    while date <= ctx.period_end {
        let expected_to_work = ctx.holidays.get(&date).copied().unwrap_or(true);
        let working_day = !ctx.policy.is_rest_day(date) && expected_to_work;
        if working_day {
            for &employee_id in &employee_ids {
                if covered.contains(&(employee_id, date))
                    || ctx.leave_days.contains(&(employee_id, date))
                {
                    continue;
                }
                outcome.records.push(DayRecord {
                    employee_id,
                    date,
                    clock_in: None,
                    clock_out: None,
                    break_out: None,
                    break_in: None,
                    hours: DayHours::default(),
                    status: AttendanceStatus::Absent,
                    counts_as_present: false,
                    remarks: Some("No punches recorded for scheduled working day".to_string()),
                    source_rows: 0,
                });
                outcome.absent_marked += 1;
            }
        }
        date = match date.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn d(day: u32) -> NaiveDate {
        // January 2024: the 1st is a Monday.
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn event(
        row: usize,
        biometric: &str,
        date: NaiveDate,
        time: NaiveTime,
        slot: Option<PunchSlot>,
    ) -> PunchEvent {
        PunchEvent {
            row,
            biometric_id: biometric.to_string(),
            date: Some(date),
            raw_date: date.to_string(),
            time: Some(time),
            raw_time: time.to_string(),
            slot,
        }
    }

    fn policy() -> ShiftPolicy {
        ShiftPolicy {
            shift_start: t(8, 0),
            expected_hours: 8.0,
            grace_minutes: 60,
            rest_days: vec![Weekday::Sat, Weekday::Sun],
        }
    }

    struct Fixture {
        roster: HashMap<String, u64>,
        holidays: HashMap<NaiveDate, bool>,
        leave_days: HashSet<(u64, NaiveDate)>,
        policy: ShiftPolicy,
    }

    impl Fixture {
        fn new() -> Self {
            let mut roster = HashMap::new();
            roster.insert("1042".to_string(), 1);
            Self {
                roster,
                holidays: HashMap::new(),
                leave_days: HashSet::new(),
                policy: policy(),
            }
        }

        fn ctx(&self, start: NaiveDate, end: NaiveDate) -> ReconcileContext<'_> {
            ReconcileContext {
                period_start: start,
                period_end: end,
                roster: &self.roster,
                holidays: &self.holidays,
                leave_days: &self.leave_days,
                policy: &self.policy,
            }
        }
    }

    #[test]
    fn full_day_reconciles_to_present() {
        let fx = Fixture::new();
        let events = vec![
            event(2, "1042", d(1), t(8, 0), Some(PunchSlot::ClockIn)),
            event(3, "1042", d(1), t(12, 0), Some(PunchSlot::BreakOut)),
            event(4, "1042", d(1), t(13, 0), Some(PunchSlot::BreakIn)),
            event(5, "1042", d(1), t(17, 0), Some(PunchSlot::ClockOut)),
        ];
        let out = reconcile(&events, &fx.ctx(d(1), d(1)));

        assert_eq!(out.records.len(), 1);
        let rec = &out.records[0];
        assert_eq!(rec.employee_id, 1);
        assert_eq!(rec.status, AttendanceStatus::Present);
        assert_eq!(rec.hours.total, 8.0);
        assert_eq!(rec.source_rows, 4);
        assert!(out.errors.is_empty());
    }

    #[test]
    fn positional_inference_two_punches() {
        let fx = Fixture::new();
        let events = vec![
            event(2, "1042", d(1), t(8, 0), None),
            event(3, "1042", d(1), t(17, 0), None),
        ];
        let out = reconcile(&events, &fx.ctx(d(1), d(1)));
        let rec = &out.records[0];
        assert_eq!(rec.clock_in, Some(t(8, 0)));
        assert_eq!(rec.clock_out, Some(t(17, 0)));
        assert!(rec.break_out.is_none());
    }

    #[test]
    fn positional_inference_four_punches() {
        let fx = Fixture::new();
        let events = vec![
            event(2, "1042", d(1), t(8, 0), None),
            event(3, "1042", d(1), t(12, 0), None),
            event(4, "1042", d(1), t(13, 0), None),
            event(5, "1042", d(1), t(17, 0), None),
        ];
        let out = reconcile(&events, &fx.ctx(d(1), d(1)));
        let rec = &out.records[0];
        assert_eq!(rec.break_out, Some(t(12, 0)));
        assert_eq!(rec.break_in, Some(t(13, 0)));
        assert_eq!(rec.hours.total, 8.0);
    }

    #[test]
    fn midnight_shift_keeps_positive_hours() {
        let fx = Fixture::new();
        let events = vec![
            event(2, "1042", d(1), t(22, 0), Some(PunchSlot::ClockIn)),
            event(3, "1042", d(1), t(6, 0), Some(PunchSlot::ClockOut)),
        ];
        let out = reconcile(&events, &fx.ctx(d(1), d(1)));
        assert_eq!(out.records[0].hours.total, 8.0);
    }

    #[test]
    fn late_clock_in_past_grace_threshold() {
        let fx = Fixture::new();
        // Grace threshold is 09:00 (08:00 start + 60 minutes).
        let events = vec![
            event(2, "1042", d(1), t(9, 15), Some(PunchSlot::ClockIn)),
            event(3, "1042", d(1), t(17, 0), Some(PunchSlot::ClockOut)),
        ];
        let out = reconcile(&events, &fx.ctx(d(1), d(1)));
        assert_eq!(out.records[0].status, AttendanceStatus::Late);
        assert!(out.records[0].counts_as_present);
    }

    #[test]
    fn unknown_employee_fails_row_but_not_batch() {
        let fx = Fixture::new();
        let events = vec![
            event(2, "9999", d(1), t(8, 0), Some(PunchSlot::ClockIn)),
            event(3, "1042", d(1), t(8, 0), Some(PunchSlot::ClockIn)),
            event(4, "1042", d(1), t(17, 0), Some(PunchSlot::ClockOut)),
        ];
        let out = reconcile(&events, &fx.ctx(d(1), d(1)));
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.failed, 1);
        assert_eq!(out.errors[0].kind, RowErrorKind::UnknownEmployee);
    }

    #[test]
    fn sentinel_date_is_invalid() {
        let fx = Fixture::new();
        let events = vec![event(
            2,
            "1042",
            NaiveDate::from_ymd_opt(1999, 12, 31).unwrap(),
            t(8, 0),
            None,
        )];
        let out = reconcile(&events, &fx.ctx(d(1), d(1)));
        assert_eq!(out.failed, 1);
        assert_eq!(out.errors[0].kind, RowErrorKind::InvalidDate);
        // The sentinel employee-day also counts absent: no valid punches.
        assert_eq!(out.absent_marked, 1);
    }

    #[test]
    fn out_of_period_punch_is_skipped() {
        let fx = Fixture::new();
        let events = vec![
            event(2, "1042", d(8), t(8, 0), None),
            event(3, "1042", d(1), t(8, 0), None),
            event(4, "1042", d(1), t(17, 0), None),
        ];
        let out = reconcile(&events, &fx.ctx(d(1), d(1)));
        assert_eq!(out.skipped, 1);
        assert_eq!(out.errors[0].kind, RowErrorKind::OutOfPeriod);
        assert_eq!(out.records.len(), 1);
    }

    #[test]
    fn duplicate_slot_is_skipped_first_wins() {
        let fx = Fixture::new();
        let events = vec![
            event(2, "1042", d(1), t(8, 0), Some(PunchSlot::ClockIn)),
            event(3, "1042", d(1), t(8, 5), Some(PunchSlot::ClockIn)),
            event(4, "1042", d(1), t(17, 0), Some(PunchSlot::ClockOut)),
        ];
        let out = reconcile(&events, &fx.ctx(d(1), d(1)));
        assert_eq!(out.skipped, 1);
        let rec = &out.records[0];
        assert_eq!(rec.clock_in, Some(t(8, 0)));
        assert_eq!(rec.source_rows, 2);
    }

    #[test]
    fn absence_synthesized_for_working_days_only() {
        let mut fx = Fixture::new();
        fx.roster.insert("1043".to_string(), 2);
        // Mon Jan 1 is a holiday; Sat Jan 6 / Sun Jan 7 are rest days.
        fx.holidays.insert(d(1), false);
        let events = vec![
            event(2, "1042", d(2), t(8, 0), None),
            event(3, "1042", d(2), t(17, 0), None),
        ];
        let out = reconcile(&events, &fx.ctx(d(1), d(7)));

        // Employee 1: absent Wed..Fri (3). Employee 2: absent Tue..Fri (4).
        assert_eq!(out.absent_marked, 7);
        let absents: Vec<_> = out
            .records
            .iter()
            .filter(|r| r.status == AttendanceStatus::Absent)
            .collect();
        assert_eq!(absents.len(), 7);
        assert!(absents.iter().all(|r| r.date != d(1)));
        assert!(absents.iter().all(|r| r.date != d(6) && r.date != d(7)));
        assert!(absents.iter().all(|r| r.source_rows == 0));
    }

    #[test]
    fn leave_day_suppresses_absence_and_wins_classification() {
        let mut fx = Fixture::new();
        fx.leave_days.insert((1, d(1)));
        fx.leave_days.insert((1, d(2)));
        let events = vec![
            event(2, "1042", d(2), t(8, 0), None),
            event(3, "1042", d(2), t(17, 0), None),
        ];
        let out = reconcile(&events, &fx.ctx(d(1), d(2)));

        assert_eq!(out.absent_marked, 0);
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].status, AttendanceStatus::OnLeave);
    }

    #[test]
    fn holiday_with_punches_classifies_worked() {
        let mut fx = Fixture::new();
        fx.holidays.insert(d(1), false);
        let events = vec![
            event(2, "1042", d(1), t(8, 0), None),
            event(3, "1042", d(1), t(17, 0), None),
        ];
        let out = reconcile(&events, &fx.ctx(d(1), d(1)));
        assert_eq!(out.records[0].status, AttendanceStatus::HolidayWorked);
        assert!(out.records[0].counts_as_present);
    }

    #[test]
    fn working_holiday_without_punches_synthesizes_absence() {
        let mut fx = Fixture::new();
        // Mon Jan 1 is a working holiday: punches are still expected.
        fx.holidays.insert(d(1), true);
        let out = reconcile(&[], &fx.ctx(d(1), d(1)));

        assert_eq!(out.absent_marked, 1);
        assert_eq!(out.records[0].status, AttendanceStatus::Absent);
    }

    #[test]
    fn working_holiday_with_punches_classifies_worked() {
        let mut fx = Fixture::new();
        fx.holidays.insert(d(1), true);
        let events = vec![
            event(2, "1042", d(1), t(8, 0), None),
            event(3, "1042", d(1), t(17, 0), None),
        ];
        let out = reconcile(&events, &fx.ctx(d(1), d(1)));
        assert_eq!(out.records[0].status, AttendanceStatus::HolidayWorked);
        assert_eq!(out.absent_marked, 0);
    }

    #[test]
    fn hundred_rows_with_five_unknown() {
        let fx = Fixture::new();
        let mut events = Vec::new();
        let mut row = 2;
        // 95 good rows: one clock-in per day is enough to consume a row.
        for i in 0..95 {
            let date = d(1 + (i % 5) as u32);
            let minute = (i / 5) as u32;
            events.push(event(row, "1042", date, t(8, minute), None));
            row += 1;
        }
        for _ in 0..5 {
            events.push(event(row, "9999", d(1), t(8, 0), None));
            row += 1;
        }
        let out = reconcile(&events, &fx.ctx(d(1), d(5)));
        let success: u32 = out.records.iter().map(|r| r.source_rows).sum();
        // 5 days x 19 punches: 4 fill slots, 15 are duplicates per day.
        assert_eq!(out.failed, 5);
        assert_eq!(success + out.skipped, 95);
    }
}
