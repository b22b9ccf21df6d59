use std::collections::BTreeMap;
use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::domain::court::{Reservation, ValidationError};

const DATE_FORMAT: &str = "%d.%m.%Y";
const TIME_FORMAT: &str = "%H:%M";
const DATETIME_FORMAT: &str = "%d.%m.%Y %H:%M";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            _ => Err(ValidationError::UnsupportedFormat(s.to_owned())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid timestamp {0:?}: {1}")]
    Timestamp(String, chrono::ParseError),
    #[error("Invalid reservation record: {0}")]
    Record(#[from] ValidationError),
}

#[derive(Serialize, Deserialize)]
struct CsvRow {
    name: String,
    start_date: String,
    end_date: String,
}

#[derive(Serialize, Deserialize)]
struct Appointment {
    name: String,
    start_time: String,
    end_time: String,
}

/// 日付ごとにまとめた予約。日付の昇順で書き出す
struct ScheduleByDay(Vec<(NaiveDate, Vec<Appointment>)>);

impl ScheduleByDay {
    fn group<'a, I: IntoIterator<Item = &'a Reservation>>(reservations: I) -> Self {
        let mut days = BTreeMap::<NaiveDate, Vec<Appointment>>::new();
        for r in reservations {
            days.entry(r.start().date()).or_default().push(Appointment {
                name: r.name().to_owned(),
                start_time: r.start().format(TIME_FORMAT).to_string(),
                end_time: r.end().format(TIME_FORMAT).to_string(),
            });
        }
        Self(days.into_iter().collect())
    }
}

impl Serialize for ScheduleByDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (day, appointments) in &self.0 {
            map.serialize_entry(&day.format(DATE_FORMAT).to_string(), appointments)?;
        }
        map.end()
    }
}

/// 予約を指定の形式で書き出す
///
/// CSV は `name,start_date,end_date`、JSON は `DD.MM.YYYY` をキーにした日ごとの配列。
pub fn write_schedule<'a, W, I>(
    format: ExportFormat,
    reservations: I,
    writer: W,
) -> Result<(), ExportError>
where
    W: Write,
    I: IntoIterator<Item = &'a Reservation>,
{
    match format {
        ExportFormat::Csv => {
            let mut csv = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(writer);
            csv.write_record(["name", "start_date", "end_date"])?;
            for r in reservations {
                csv.serialize(CsvRow {
                    name: r.name().to_owned(),
                    start_date: r.start().format(DATETIME_FORMAT).to_string(),
                    end_date: r.end().format(DATETIME_FORMAT).to_string(),
                })?;
            }
            csv.flush()?;
        }
        ExportFormat::Json => {
            let mut writer = writer;
            serde_json::to_writer_pretty(&mut writer, &ScheduleByDay::group(reservations))?;
            writer.write_all(b"\n")?;
        }
    }
    Ok(())
}

/// `write_schedule` で書き出した予約を読み込む
pub fn read_schedule<R: Read>(
    format: ExportFormat,
    reader: R,
) -> Result<Vec<Reservation>, ExportError> {
    let mut reservations = Vec::new();
    match format {
        ExportFormat::Csv => {
            let mut csv = csv::Reader::from_reader(reader);
            for row in csv.deserialize::<CsvRow>() {
                let row = row?;
                let start = parse_datetime(&row.start_date)?;
                let end = parse_datetime(&row.end_date)?;
                reservations.push(Reservation::create(row.name, start, end)?);
            }
        }
        ExportFormat::Json => {
            let days: BTreeMap<String, Vec<Appointment>> = serde_json::from_reader(reader)?;
            for (day, appointments) in days {
                let date = NaiveDate::parse_from_str(&day, DATE_FORMAT)
                    .map_err(|e| ExportError::Timestamp(day.clone(), e))?;
                for a in appointments {
                    let start = date.and_time(parse_time(&a.start_time)?);
                    let mut end = date.and_time(parse_time(&a.end_time)?);
                    // 日付をまたぐ予約
                    if end <= start {
                        end += Duration::days(1);
                    }
                    reservations.push(Reservation::create(a.name, start, end)?);
                }
            }
        }
    }
    reservations.sort();
    Ok(reservations)
}

fn parse_datetime(s: &str) -> Result<NaiveDateTime, ExportError> {
    NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
        .map_err(|e| ExportError::Timestamp(s.to_owned(), e))
}

fn parse_time(s: &str) -> Result<NaiveTime, ExportError> {
    NaiveTime::parse_from_str(s, TIME_FORMAT).map_err(|e| ExportError::Timestamp(s.to_owned(), e))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use serde_json::json;

    use super::*;

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn reservations() -> Vec<Reservation> {
        vec![
            Reservation::create("Alice", at(3, 10, 0), at(3, 10, 30)).unwrap(),
            Reservation::create("Bob, Jr.", at(3, 11, 0), at(3, 12, 30)).unwrap(),
            Reservation::create("Carol", at(4, 23, 30), at(5, 0, 30)).unwrap(),
        ]
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("csv".parse::<ExportFormat>(), Ok(ExportFormat::Csv));
        assert_eq!(" JSON ".parse::<ExportFormat>(), Ok(ExportFormat::Json));
        assert_eq!(
            "xml".parse::<ExportFormat>(),
            Err(ValidationError::UnsupportedFormat("xml".to_owned()))
        );
    }

    #[test]
    fn test_write_csv() {
        let mut buf = Vec::new();
        write_schedule(ExportFormat::Csv, &reservations(), &mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "name,start_date,end_date\n\
             Alice,03.06.2024 10:00,03.06.2024 10:30\n\
             \"Bob, Jr.\",03.06.2024 11:00,03.06.2024 12:30\n\
             Carol,04.06.2024 23:30,05.06.2024 00:30\n"
        );
    }

    #[test]
    fn test_write_csv_empty() {
        let mut buf = Vec::new();
        write_schedule(ExportFormat::Csv, &Vec::new(), &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "name,start_date,end_date\n");
    }

    #[test]
    fn test_write_json() {
        let mut buf = Vec::new();
        let mut all = reservations();
        all.push(Reservation::create("Dave", at(30, 9, 0), at(30, 10, 0)).unwrap());
        all.push(
            Reservation::create(
                "Erin",
                NaiveDate::from_ymd_opt(2024, 7, 1)
                    .unwrap()
                    .and_hms_opt(9, 0, 0)
                    .unwrap(),
                NaiveDate::from_ymd_opt(2024, 7, 1)
                    .unwrap()
                    .and_hms_opt(9, 30, 0)
                    .unwrap(),
            )
            .unwrap(),
        );
        write_schedule(ExportFormat::Json, &all, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            value,
            json!({
                "03.06.2024": [
                    {"name": "Alice", "start_time": "10:00", "end_time": "10:30"},
                    {"name": "Bob, Jr.", "start_time": "11:00", "end_time": "12:30"},
                ],
                "04.06.2024": [
                    {"name": "Carol", "start_time": "23:30", "end_time": "00:30"},
                ],
                "30.06.2024": [
                    {"name": "Dave", "start_time": "09:00", "end_time": "10:00"},
                ],
                "01.07.2024": [
                    {"name": "Erin", "start_time": "09:00", "end_time": "09:30"},
                ],
            })
        );
        // 日付の昇順で並ぶ
        let june = text.find("30.06.2024").unwrap();
        let july = text.find("01.07.2024").unwrap();
        assert!(june < july);
    }

    #[test]
    fn test_round_trip() {
        let expected = reservations().into_iter().collect::<HashSet<_>>();
        for format in [ExportFormat::Csv, ExportFormat::Json] {
            let mut buf = Vec::new();
            write_schedule(format, &reservations(), &mut buf).unwrap();
            let parsed = read_schedule(format, buf.as_slice()).unwrap();
            assert_eq!(parsed.into_iter().collect::<HashSet<_>>(), expected, "{}", format);
        }
    }

    #[test]
    fn test_read_invalid() {
        let csv = "name,start_date,end_date\nAlice,2024-06-03 10:00,03.06.2024 10:30\n";
        assert!(matches!(
            read_schedule(ExportFormat::Csv, csv.as_bytes()),
            Err(ExportError::Timestamp(..))
        ));
        let csv = "name,start_date,end_date\nAlice,03.06.2024 10:00,03.06.2024 10:20\n";
        assert!(matches!(
            read_schedule(ExportFormat::Csv, csv.as_bytes()),
            Err(ExportError::Record(ValidationError::UnsupportedPeriod(20)))
        ));
        assert!(matches!(
            read_schedule(ExportFormat::Json, "[]".as_bytes()),
            Err(ExportError::Json(_))
        ));
    }
}
