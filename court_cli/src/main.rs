mod prompt;

use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use court::{
    domain::{
        court::{BookingPolicy, ConflictError, ReservationRepository, ValidationError},
        Clock, SystemClock,
    },
    infrastructure::court::{open_repository, ExportFormat},
    scheduler::{CourtScheduler, ScheduleError},
    CourtConfig,
};
use tracing::{error, info, Level};

use crate::prompt::{
    is_yes, parse_date, parse_datetime, parse_name, parse_period, InputError, Prompt,
};

const MENU: &str = "\nWhat do you want to do:\n\n\
    1. Make a reservation\n\
    2. Cancel a reservation\n\
    3. Print schedule\n\
    4. Save schedule to a file\n\
    5. Exit";

#[tokio::main]
async fn main() {
    match CourtConfig::load() {
        Ok(config) => {
            tracing_subscriber::fmt()
                .with_max_level(Level::from(&config.logger.level))
                .with_writer(io::stderr)
                .init();
            if let Err(e) = run(&config).await {
                error!("アプリケーションエラー: {}", e);
            }
        }
        Err(e) => {
            tracing_subscriber::fmt().with_writer(io::stderr).init();
            error!("アプリケーションエラー: {}", e);
        }
    }
}

async fn run(config: &CourtConfig) -> Result<(), Box<dyn Error>> {
    let repository = open_repository(&config.store)?;
    let mut scheduler =
        CourtScheduler::load(repository, SystemClock, BookingPolicy::from(&config.policy)).await?;
    info!("{:?} ストアで起動しました", config.store.kind);

    let stdin = io::stdin();
    let mut prompt = Prompt::new(stdin.lock(), io::stdout());
    loop {
        prompt.say(MENU)?;
        let Some(choice) = prompt.ask("Enter your choice (1-5):")? else {
            break;
        };
        match choice.trim() {
            "1" => make(&mut prompt, &mut scheduler).await?,
            "2" => cancel(&mut prompt, &mut scheduler).await?,
            "3" => print(&mut prompt, &scheduler)?,
            "4" => save(&mut prompt, &scheduler).await?,
            "5" => break,
            _ => prompt.notify("Invalid choice.")?,
        }
    }
    Ok(())
}

/// 誤りを利用者に通知する。ストアと書き出しの失敗はログにも残す
fn report<R, W>(prompt: &mut Prompt<R, W>, error: ScheduleError) -> Result<(), Box<dyn Error>>
where
    R: BufRead,
    W: Write,
{
    match error {
        ScheduleError::Validation(e) => prompt.notify(&e.to_string())?,
        ScheduleError::Conflict(e) => prompt.notify(&e.to_string())?,
        e @ (ScheduleError::Store(_) | ScheduleError::Export(_)) => {
            error!("処理に失敗しました: {}", e);
            prompt.notify(&format!("Operation failed: {}", e))?;
        }
    }
    Ok(())
}

async fn make<R, W, S, C>(
    prompt: &mut Prompt<R, W>,
    scheduler: &mut CourtScheduler<S, C>,
) -> Result<(), Box<dyn Error>>
where
    R: BufRead,
    W: Write,
    S: ReservationRepository,
    C: Clock,
{
    let Some(name) = prompt.ask_with("\nWhat's your name?", parse_name)? else {
        return Ok(());
    };
    let Some(mut start) = prompt.ask_with(
        "\nEnter the date and time for which you would like to make a reservation? {DD.MM.YYYY HH:MM}",
        parse_datetime,
    )?
    else {
        return Ok(());
    };
    if scheduler.exceeds_weekly_quota(&name, start) {
        let limit = scheduler.policy().weekly_limit;
        prompt.notify(&ConflictError::WeeklyQuotaExceeded { name, limit }.to_string())?;
        return Ok(());
    }
    if scheduler.too_soon(start) {
        let minutes = scheduler.policy().lead_time.num_minutes();
        prompt.notify(&ValidationError::TooSoon(start, minutes).to_string())?;
        return Ok(());
    }
    if scheduler.is_taken(start) {
        let next = match scheduler.next_available(start) {
            Ok(next) => next,
            Err(e) => return report(prompt, e),
        };
        let question = format!(
            "The time you chose is unavailable.\nWould you like to make a reservation for {} instead?(yes/no)",
            next.format("%d.%m.%Y %H:%M")
        );
        match prompt.ask(&question)? {
            Some(answer) if is_yes(&answer) => start = next,
            _ => return Ok(()),
        }
    }

    let periods = scheduler.available_periods(start);
    if periods.is_empty() {
        prompt.notify("No period is available at the chosen time.")?;
        return Ok(());
    }
    prompt.say("\nHow long would you like to book court?\n")?;
    for (i, period) in periods.iter().enumerate() {
        prompt.say(&format!("{}) {}", i + 1, period))?;
    }
    let Some(period) = prompt.ask_with("", |s| parse_period(s, &periods))? else {
        return Ok(());
    };

    match scheduler
        .make_reservation(&name, start, start + period.duration())
        .await
    {
        Ok(()) => prompt.notify("Reservation successfully made!")?,
        Err(e) => report(prompt, e)?,
    }
    Ok(())
}

async fn cancel<R, W, S, C>(
    prompt: &mut Prompt<R, W>,
    scheduler: &mut CourtScheduler<S, C>,
) -> Result<(), Box<dyn Error>>
where
    R: BufRead,
    W: Write,
    S: ReservationRepository,
    C: Clock,
{
    let Some(name) = prompt.ask_with("\nWhat's your name?", parse_name)? else {
        return Ok(());
    };
    let Some(start) = prompt.ask_with(
        "\nEnter the date and time for which you would like to cancel a reservation? {DD.MM.YYYY HH:MM}",
        parse_datetime,
    )?
    else {
        return Ok(());
    };
    match scheduler.cancel_reservation(&name, start).await {
        Ok(true) => prompt.notify("Reservation successfully cancelled!")?,
        Ok(false) => prompt.notify("No reservation found for the given name and date.")?,
        Err(e) => report(prompt, e)?,
    }
    Ok(())
}

fn print<R, W, S, C>(
    prompt: &mut Prompt<R, W>,
    scheduler: &CourtScheduler<S, C>,
) -> Result<(), Box<dyn Error>>
where
    R: BufRead,
    W: Write,
    S: ReservationRepository,
    C: Clock,
{
    let Some(from) = prompt.ask_with("\nPlease enter the start date {DD.MM.YYYY}", parse_date)?
    else {
        return Ok(());
    };
    let Some(to) = prompt.ask_with("\nPlease enter the end date {DD.MM.YYYY}", parse_date)? else {
        return Ok(());
    };
    match scheduler.render_schedule(from, to) {
        Ok(text) => {
            prompt.say(&text)?;
            prompt.notify("Schedule printed.")?;
        }
        Err(e) => report(prompt, e)?,
    }
    Ok(())
}

async fn save<R, W, S, C>(
    prompt: &mut Prompt<R, W>,
    scheduler: &CourtScheduler<S, C>,
) -> Result<(), Box<dyn Error>>
where
    R: BufRead,
    W: Write,
    S: ReservationRepository,
    C: Clock,
{
    let Some(from) = prompt.ask_with("\nPlease enter the start date {DD.MM.YYYY}", parse_date)?
    else {
        return Ok(());
    };
    let Some(to) = prompt.ask_with("\nPlease enter the end date {DD.MM.YYYY}", parse_date)? else {
        return Ok(());
    };
    let Some(format) = prompt.ask_with("\nPlease enter type of the file (json/csv)", |s| {
        s.parse::<ExportFormat>()
            .map_err(|_| InputError::FileFormat)
    })?
    else {
        return Ok(());
    };
    let Some(name) = prompt.ask_with("\nWhat's name of your file?", parse_name)? else {
        return Ok(());
    };
    let mut path = PathBuf::from(name);
    if path.extension().is_none() {
        path.set_extension(format.extension());
    }
    match scheduler.export_schedule(from, to, format, &path).await {
        Ok(()) => prompt.notify(&format!("\n{} saved successfully!", path.display()))?,
        Err(e) => report(prompt, e)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use chrono::{NaiveDate, NaiveDateTime};
    use court::domain::court::Reservation;
    use court::domain::FixedClock;
    use court::infrastructure::court::InMemoryReservationRepository;

    use super::*;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 3)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    async fn scheduler() -> CourtScheduler<InMemoryReservationRepository, FixedClock> {
        let repository = InMemoryReservationRepository::with_reservations(vec![
            Reservation::create("Alice", at(10, 0), at(11, 0)).unwrap(),
        ]);
        let now = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        CourtScheduler::load(repository, FixedClock(now), BookingPolicy::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_make_takes_next_available() {
        let mut scheduler = scheduler().await;
        let mut output = Vec::new();
        {
            let input = Cursor::new("Bob\n03.06.2024 10:30\nyes\n1\n\n");
            let mut prompt = Prompt::new(input, &mut output);
            make(&mut prompt, &mut scheduler).await.unwrap();
        }
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Would you like to make a reservation for 03.06.2024 11:00 instead?"));
        assert!(text.contains("1) 30 Minutes"));
        assert!(text.contains("3) 90 Minutes"));
        assert!(text.contains("Reservation successfully made!"));
        assert!(scheduler.schedule().find("Bob", at(11, 0)).is_some());
        assert_eq!(
            scheduler.repository().find_all().await.unwrap(),
            scheduler.reservations().to_vec()
        );
    }

    #[tokio::test]
    async fn test_make_declines_next_available() {
        let mut scheduler = scheduler().await;
        let mut output = Vec::new();
        {
            let input = Cursor::new("Bob\n03.06.2024 10:30\nno\n");
            let mut prompt = Prompt::new(input, &mut output);
            make(&mut prompt, &mut scheduler).await.unwrap();
        }
        assert_eq!(scheduler.reservations().len(), 1);
        assert!(!String::from_utf8(output).unwrap().contains("How long"));
    }

    #[tokio::test]
    async fn test_cancel_missing_reservation() {
        let mut scheduler = scheduler().await;
        let mut output = Vec::new();
        {
            let input = Cursor::new("Nobody\n03.06.2024 10:00\n\n");
            let mut prompt = Prompt::new(input, &mut output);
            cancel(&mut prompt, &mut scheduler).await.unwrap();
        }
        assert!(String::from_utf8(output)
            .unwrap()
            .contains("No reservation found for the given name and date."));
        assert_eq!(scheduler.reservations().len(), 1);
    }
}
