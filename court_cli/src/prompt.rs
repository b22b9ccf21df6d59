use std::io::{self, BufRead, Write};

use chrono::{NaiveDate, NaiveDateTime};
use court::domain::court::Period;
use derive_more::Display;

/// 入力の誤り。メッセージはそのまま利用者に表示する
#[derive(Display, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[display(fmt = "Invalid name.")]
    EmptyName,
    #[display(fmt = "Invalid date format.")]
    Format,
    #[display(fmt = "Chosen date does not exist in Gregorian calendar.")]
    Calendar,
    #[display(fmt = "Chosen period must be a number.")]
    PeriodNotNumber,
    #[display(fmt = "Chosen period not available.")]
    PeriodUnavailable,
    #[display(fmt = "Invalid file format")]
    FileFormat,
}

const DATE_SHAPE: &str = "00.00.0000";
const DATETIME_SHAPE: &str = "00.00.0000 00:00";

/// `0` の位置が数字、それ以外は同じ文字であるか
fn matches_shape(input: &str, shape: &str) -> bool {
    input.len() == shape.len()
        && input.chars().zip(shape.chars()).all(|(c, s)| match s {
            '0' => c.is_ascii_digit(),
            _ => c == s,
        })
}

pub fn parse_name(input: &str) -> Result<String, InputError> {
    let name = input.trim();
    if name.is_empty() {
        return Err(InputError::EmptyName);
    }
    Ok(name.to_owned())
}

/// `DD.MM.YYYY HH:MM`
pub fn parse_datetime(input: &str) -> Result<NaiveDateTime, InputError> {
    let input = input.trim();
    if !matches_shape(input, DATETIME_SHAPE) {
        return Err(InputError::Format);
    }
    NaiveDateTime::parse_from_str(input, "%d.%m.%Y %H:%M").map_err(|_| InputError::Calendar)
}

/// `DD.MM.YYYY`
pub fn parse_date(input: &str) -> Result<NaiveDate, InputError> {
    let input = input.trim();
    if !matches_shape(input, DATE_SHAPE) {
        return Err(InputError::Format);
    }
    NaiveDate::parse_from_str(input, "%d.%m.%Y").map_err(|_| InputError::Calendar)
}

/// 一覧の番号か分数で選ばれた長さ
pub fn parse_period(input: &str, available: &[Period]) -> Result<Period, InputError> {
    let number = input
        .trim()
        .parse::<i64>()
        .map_err(|_| InputError::PeriodNotNumber)?;
    let by_index = usize::try_from(number)
        .ok()
        .and_then(|i| i.checked_sub(1))
        .and_then(|i| available.get(i));
    by_index
        .or_else(|| available.iter().find(|p| p.minutes() == number))
        .copied()
        .ok_or(InputError::PeriodUnavailable)
}

pub fn is_yes(input: &str) -> bool {
    matches!(input.trim().to_ascii_lowercase().as_str(), "yes" | "y")
}

/// 質問を表示して一行読む端末
pub struct Prompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// 入力が終わっていれば `None`
    pub fn ask(&mut self, question: &str) -> io::Result<Option<String>> {
        write!(self.output, "{}\n\n$ ", question)?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_owned()))
    }

    pub fn say(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.output, "{}", message)
    }

    /// メッセージを表示し、Enter でメニューに戻る
    pub fn notify(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.output, "{}", message)?;
        write!(self.output, "Press enter to return to main menu.")?;
        self.output.flush()?;
        let mut line = String::new();
        self.input.read_line(&mut line)?;
        Ok(())
    }

    /// 入力を検証し、誤りがあれば通知して `None` を返す
    pub fn ask_with<T, F>(&mut self, question: &str, parse: F) -> io::Result<Option<T>>
    where
        F: FnOnce(&str) -> Result<T, InputError>,
    {
        match self.ask(question)? {
            Some(answer) => match parse(&answer) {
                Ok(value) => Ok(Some(value)),
                Err(e) => {
                    self.notify(&e.to_string())?;
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }
}
