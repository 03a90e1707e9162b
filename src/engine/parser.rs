use std::io::Cursor;
use std::str::FromStr;

use calamine::{open_workbook_auto_from_rs, Data, DataType, Reader};
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::FatalImportError;

/// Punch slot within a day. Explicit when the file carries a punch-type
/// column, otherwise inferred positionally from the row order of the
/// employee's punches for that day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PunchSlot {
    ClockIn,
    BreakOut,
    BreakIn,
    ClockOut,
}

impl PunchSlot {
    pub fn parse(raw: &str) -> Option<Self> {
        let norm: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match norm.as_str() {
            "clockin" | "in" | "timein" | "checkin" => Some(PunchSlot::ClockIn),
            "clockout" | "out" | "timeout" | "checkout" => Some(PunchSlot::ClockOut),
            "breakout" | "lunchout" => Some(PunchSlot::BreakOut),
            "breakin" | "lunchin" => Some(PunchSlot::BreakIn),
            _ => None,
        }
    }
}

/// One raw punch row. Ephemeral; consumed entirely within a single import
/// run. Unparseable date/time values are kept (`None` + raw text) so the
/// reconciler can fail them per-row instead of aborting the file.
#[derive(Debug, Clone)]
pub struct PunchEvent {
    /// 1-based row number in the source file, header included.
    pub row: usize,
    pub biometric_id: String,
    pub date: Option<NaiveDate>,
    pub raw_date: String,
    pub time: Option<NaiveTime>,
    pub raw_time: String,
    pub slot: Option<PunchSlot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Xlsx,
    Xls,
    Csv,
}

impl FromStr for FileFormat {
    type Err = FatalImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xlsx" => Ok(FileFormat::Xlsx),
            "xls" => Ok(FileFormat::Xls),
            "csv" => Ok(FileFormat::Csv),
            other => Err(FatalImportError::UnsupportedFormat(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    BiometricId,
    PunchDate,
    PunchTime,
    PunchType,
}

struct ColumnSpec {
    header: &'static str,
    field: Field,
    required: bool,
}

/// Versioned column schema. Resolved once against the header row; a
/// missing required column is a typed fatal error, not a silent guess.
pub const SCHEMA_VERSION: u32 = 1;

const COLUMNS: [ColumnSpec; 4] = [
    ColumnSpec {
        header: "Employee ID",
        field: Field::BiometricId,
        required: true,
    },
    ColumnSpec {
        header: "Punch Date",
        field: Field::PunchDate,
        required: true,
    },
    ColumnSpec {
        header: "Punch Time",
        field: Field::PunchTime,
        required: true,
    },
    ColumnSpec {
        header: "Punch Type",
        field: Field::PunchType,
        required: false,
    },
];

/// Template description for caller-side validation UI.
pub fn expected_headers() -> Vec<&'static str> {
    COLUMNS.iter().map(|c| c.header).collect()
}

struct ColumnMap {
    biometric: usize,
    date: usize,
    time: usize,
    punch_type: Option<usize>,
}

fn normalize_header(h: &str) -> String {
    h.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}

fn resolve_columns(headers: &[String]) -> Result<ColumnMap, FatalImportError> {
    let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();

    let mut biometric = None;
    let mut date = None;
    let mut time = None;
    let mut punch_type = None;

    for column in &COLUMNS {
        let want = normalize_header(column.header);
        let found = normalized.iter().position(|h| *h == want);
        match (found, column.required) {
            (Some(idx), _) => match column.field {
                Field::BiometricId => biometric = Some(idx),
                Field::PunchDate => date = Some(idx),
                Field::PunchTime => time = Some(idx),
                Field::PunchType => punch_type = Some(idx),
            },
            (None, true) => return Err(FatalImportError::MissingColumn(column.header)),
            (None, false) => {}
        }
    }

    Ok(ColumnMap {
        biometric: biometric.expect("required column resolved"),
        date: date.expect("required column resolved"),
        time: time.expect("required column resolved"),
        punch_type,
    })
}

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%Y/%m/%d"];
const TIME_FORMATS: [&str; 4] = ["%H:%M:%S", "%H:%M", "%I:%M:%S %p", "%I:%M %p"];

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
}

pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    TIME_FORMATS
        .iter()
        .find_map(|f| NaiveTime::parse_from_str(raw, f).ok())
}

/// Parse file bytes into punch events. Only structural problems (file
/// unreadable, required column missing) fail here; bad cell values ride
/// along for per-row handling downstream.
pub fn parse(bytes: &[u8], format: FileFormat) -> Result<Vec<PunchEvent>, FatalImportError> {
    match format {
        FileFormat::Csv => parse_csv(bytes),
        FileFormat::Xlsx | FileFormat::Xls => parse_spreadsheet(bytes),
    }
}

fn build_event(
    row: usize,
    map: &ColumnMap,
    cell: impl Fn(usize) -> (String, Option<NaiveDate>, Option<NaiveTime>),
) -> Option<PunchEvent> {
    let (biometric_id, _, _) = cell(map.biometric);
    let (raw_date, date, _) = cell(map.date);
    let (raw_time, _, time) = cell(map.time);
    let slot = map.punch_type.and_then(|idx| {
        let (raw, _, _) = cell(idx);
        PunchSlot::parse(&raw)
    });

    if biometric_id.is_empty() && raw_date.is_empty() && raw_time.is_empty() {
        return None;
    }

    Some(PunchEvent {
        row,
        biometric_id,
        date,
        raw_date,
        time,
        raw_time,
        slot,
    })
}

fn parse_csv(bytes: &[u8]) -> Result<Vec<PunchEvent>, FatalImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut map: Option<ColumnMap> = None;
    let mut events = Vec::new();

    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(|e| FatalImportError::UnreadableFile(e.to_string()))?;
        let row = idx + 1;
        let fields: Vec<String> = record.iter().map(|f| f.trim().to_string()).collect();
        if fields.iter().all(|f| f.is_empty()) {
            continue;
        }

        match &map {
            None => map = Some(resolve_columns(&fields)?),
            Some(m) => {
                let cell = |i: usize| {
                    let raw = fields.get(i).cloned().unwrap_or_default();
                    let date = parse_date(&raw);
                    let time = parse_time(&raw);
                    (raw, date, time)
                };
                if let Some(event) = build_event(row, m, cell) {
                    events.push(event);
                }
            }
        }
    }

    if map.is_none() {
        return Err(FatalImportError::UnreadableFile(
            "file contains no header row".to_string(),
        ));
    }

    Ok(events)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        // Biometric ids come through as numeric cells; keep them integral.
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        Data::Int(i) => i.to_string(),
        other => other.to_string().trim().to_string(),
    }
}

fn parse_spreadsheet(bytes: &[u8]) -> Result<Vec<PunchEvent>, FatalImportError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| FatalImportError::UnreadableFile(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| FatalImportError::UnreadableFile("workbook has no sheets".to_string()))?
        .map_err(|e| FatalImportError::UnreadableFile(e.to_string()))?;

    let mut map: Option<ColumnMap> = None;
    let mut events = Vec::new();

    for (idx, cells) in range.rows().enumerate() {
        let row = idx + 1;
        if cells.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }

        match &map {
            None => {
                let headers: Vec<String> = cells.iter().map(cell_text).collect();
                map = Some(resolve_columns(&headers)?);
            }
            Some(m) => {
                let cell = |i: usize| {
                    let data = cells.get(i).unwrap_or(&Data::Empty);
                    let raw = cell_text(data);
                    // Native date/time cells decode directly; text cells
                    // fall back to the string formats.
                    let date = data.as_date().or_else(|| parse_date(&raw));
                    let time = data.as_time().or_else(|| parse_time(&raw));
                    (raw, date, time)
                };
                if let Some(event) = build_event(row, m, cell) {
                    events.push(event);
                }
            }
        }
    }

    if map.is_none() {
        return Err(FatalImportError::UnreadableFile(
            "workbook contains no header row".to_string(),
        ));
    }

    Ok(events)
}
