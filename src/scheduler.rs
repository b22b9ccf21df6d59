use std::path::Path;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use derive_more::{Display, Error, From};
use tracing::{debug, info, warn};

use crate::domain::court::{
    BookingPolicy, ConflictError, Period, Reservation, ReservationRepository, Schedule,
    ValidationError,
};
use crate::domain::{Clock, DataAccessError, SystemClock};
use crate::infrastructure::court::{write_schedule, ExportError, ExportFormat};

#[derive(Error, Display, Debug, From)]
pub enum ScheduleError {
    #[display(fmt = "{}", _0)]
    Validation(#[error(source)] ValidationError),
    #[display(fmt = "{}", _0)]
    Conflict(#[error(source)] ConflictError),
    #[display(fmt = "Store error: {}", _0)]
    Store(#[error(source)] DataAccessError),
    #[display(fmt = "Export error: {}", _0)]
    Export(#[error(source)] ExportError),
}

/// コートの予約を管理する
///
/// 空き状況や週の上限の判断はすべてここで行い、リポジトリは記録するだけ。
/// メモリ上のスケジュールは、永続化に成功した変更だけを反映する。
pub struct CourtScheduler<R, C = SystemClock> {
    repository: R,
    clock: C,
    schedule: Schedule,
}

impl<R, C> CourtScheduler<R, C>
where
    R: ReservationRepository,
    C: Clock,
{
    pub fn new(repository: R, clock: C, policy: BookingPolicy) -> Self {
        Self {
            repository,
            clock,
            schedule: Schedule::new(policy),
        }
    }

    /// リポジトリから予約を読み込んだ状態で生成する
    pub async fn load(repository: R, clock: C, policy: BookingPolicy) -> Result<Self, ScheduleError> {
        let mut scheduler = Self::new(repository, clock, policy);
        scheduler.load_schedule().await?;
        Ok(scheduler)
    }

    pub async fn load_schedule(&mut self) -> Result<usize, ScheduleError> {
        let reservations = self.repository.find_all().await?;
        self.schedule = Schedule::with_reservations(*self.schedule.policy(), reservations);
        info!("{} 件の予約を読み込みました", self.schedule.len());
        Ok(self.schedule.len())
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn policy(&self) -> &BookingPolicy {
        self.schedule.policy()
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn reservations(&self) -> &[Reservation] {
        self.schedule.reservations()
    }

    pub fn overlaps(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        self.schedule.overlaps(start, end)
    }

    pub fn is_taken(&self, start: NaiveDateTime) -> bool {
        self.schedule.is_taken(start)
    }

    pub fn exceeds_weekly_quota(&self, name: &str, start: NaiveDateTime) -> bool {
        self.schedule.exceeds_weekly_quota(name, start)
    }

    pub fn next_available(&self, start: NaiveDateTime) -> Result<NaiveDateTime, ScheduleError> {
        let found = self.schedule.next_available(start)?;
        debug!("{} 以降の空き枠: {}", start, found);
        Ok(found)
    }

    pub fn available_periods(&self, start: NaiveDateTime) -> Vec<Period> {
        let periods = self.schedule.available_periods(start);
        debug!("{} から予約できる長さ: {:?}", start, periods);
        periods
    }

    pub fn too_soon(&self, start: NaiveDateTime) -> bool {
        self.policy().too_soon(start, self.clock.now())
    }

    pub async fn make_reservation(
        &mut self,
        name: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<(), ScheduleError> {
        let reservation = Reservation::create(name, start, end)?;
        self.validate_lead_time(start)?;
        if let Err(e) = self.schedule.validate_reservation(&reservation) {
            warn!("予約を受け付けられません: {}", e);
            return Err(e.into());
        }
        self.repository.insert(&reservation).await?;
        info!("予約しました: {} {} - {}", name, start, end);
        self.schedule.insert(reservation);
        Ok(())
    }

    /// `(name, start)` の予約を取り消す。該当する予約がなければ `false`
    pub async fn cancel_reservation(
        &mut self,
        name: &str,
        start: NaiveDateTime,
    ) -> Result<bool, ScheduleError> {
        if self.schedule.find(name, start).is_none() {
            info!("キャンセル対象の予約がありません: {} {}", name, start);
            return Ok(false);
        }
        self.validate_lead_time(start)?;
        if !self.repository.delete(name, start).await? {
            warn!("ストアに予約がありませんでした: {} {}", name, start);
        }
        self.schedule.remove(name, start);
        info!("予約をキャンセルしました: {} {}", name, start);
        Ok(true)
    }

    /// 指定した日付の範囲（両端を含む）に開始する予約
    pub fn reservations_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<&Reservation>, ScheduleError> {
        if from > to {
            return Err(ValidationError::InvalidDateRange(from, to).into());
        }
        Ok(self.schedule.between(from, to))
    }

    pub fn render_schedule(&self, from: NaiveDate, to: NaiveDate) -> Result<String, ScheduleError> {
        let reservations = self.reservations_between(from, to)?;
        let today = self.clock.now().date();
        let mut out = String::new();
        for day in from.iter_days().take_while(|d| *d <= to) {
            if day == today {
                out.push_str("Today\n");
            } else if day == today + Duration::days(1) {
                out.push_str("Tomorrow\n");
            } else {
                out.push_str(&format!("{}\n", day.format("%A, %d %B, %Y")));
            }
            let mut empty = true;
            for r in reservations.iter().filter(|r| r.start().date() == day) {
                empty = false;
                out.push_str(&format!(
                    "* {} {} - {}\n",
                    r.name(),
                    r.start().format("%H:%M"),
                    r.end().format("%H:%M")
                ));
            }
            if empty {
                out.push_str("No reservations\n");
            }
            out.push('\n');
        }
        Ok(out)
    }

    pub async fn export_schedule(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        format: ExportFormat,
        path: impl AsRef<Path>,
    ) -> Result<(), ScheduleError> {
        let reservations = self.reservations_between(from, to)?;
        let mut buf = Vec::new();
        write_schedule(format, reservations.iter().copied(), &mut buf)?;
        tokio::fs::write(path.as_ref(), buf)
            .await
            .map_err(ExportError::from)?;
        info!(
            "{} 件の予約を {} に書き出しました",
            reservations.len(),
            path.as_ref().display()
        );
        Ok(())
    }

    fn validate_lead_time(&self, start: NaiveDateTime) -> Result<(), ValidationError> {
        if self.too_soon(start) {
            return Err(ValidationError::TooSoon(
                start,
                self.policy().lead_time.num_minutes(),
            ));
        }
        Ok(())
    }
}
