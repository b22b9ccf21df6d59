use std::ops::Range;

use async_trait::async_trait;
use bio::data_structures::interval_tree::IntervalTree;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::{DataAccessError, Event};

use super::{week_of, BookingPolicy, ConflictError, Period, Reservation};

/// 予約の永続化先
///
/// 予約は `(name, start)` で一意に識別される。
#[async_trait]
pub trait ReservationRepository {
    /// 全ての予約を開始時刻の昇順で取得する
    async fn find_all(&self) -> Result<Vec<Reservation>, DataAccessError>;
    /// 予約を追加する
    async fn insert(&mut self, reservation: &Reservation) -> Result<(), DataAccessError>;
    /// 予約を削除する。存在しなければ `false`
    async fn delete(&mut self, name: &str, start: NaiveDateTime)
        -> Result<bool, DataAccessError>;
}

#[async_trait]
impl<R> ReservationRepository for Box<R>
where
    R: ReservationRepository + Send + Sync + ?Sized,
{
    async fn find_all(&self) -> Result<Vec<Reservation>, DataAccessError> {
        (**self).find_all().await
    }

    async fn insert(&mut self, reservation: &Reservation) -> Result<(), DataAccessError> {
        (**self).insert(reservation).await
    }

    async fn delete(
        &mut self,
        name: &str,
        start: NaiveDateTime,
    ) -> Result<bool, DataAccessError> {
        (**self).delete(name, start).await
    }
}

/// スケジュールのイベント
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleEvent {
    /// 予約が作成された
    ReservationMade(Reservation),
    /// 予約がキャンセルされた
    ReservationCanceled { name: String, start: NaiveDateTime },
}

impl Event for ScheduleEvent {}

/// コートのスケジュール
///
/// 予約は常に開始時刻の昇順に並ぶ。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    policy: BookingPolicy,
    reservations: Vec<Reservation>,
}

impl Schedule {
    pub fn new(policy: BookingPolicy) -> Self {
        Self {
            policy,
            reservations: Vec::new(),
        }
    }

    pub fn with_reservations<T: IntoIterator<Item = Reservation>>(
        policy: BookingPolicy,
        reservations: T,
    ) -> Self {
        let mut reservations = reservations.into_iter().collect::<Vec<_>>();
        reservations.sort();
        Self {
            policy,
            reservations,
        }
    }

    /// イベント列からスケジュールを復元する
    pub fn replay<T: IntoIterator<Item = ScheduleEvent>>(policy: BookingPolicy, events: T) -> Self {
        let mut schedule = Self::new(policy);
        events.into_iter().for_each(|e| schedule.apply(e));
        schedule
    }

    pub fn policy(&self) -> &BookingPolicy {
        &self.policy
    }

    pub fn reservations(&self) -> &[Reservation] {
        &self.reservations
    }

    pub fn into_reservations(self) -> Vec<Reservation> {
        self.reservations
    }

    pub fn len(&self) -> usize {
        self.reservations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reservations.is_empty()
    }

    pub fn find(&self, name: &str, start: NaiveDateTime) -> Option<&Reservation> {
        self.reservations.iter().find(|r| r.is_keyed_by(name, start))
    }

    /// `[start, end)` が既存の予約と重なるか
    pub fn overlaps(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        Self::overlaps_in(&self.tree(), start..end)
    }

    /// `start` から刻み幅ぶんの枠が埋まっているか
    pub fn is_taken(&self, start: NaiveDateTime) -> bool {
        self.overlaps(start, start + self.policy.granularity)
    }

    /// `start` と同じ週に `name` の予約が既に上限数あるか
    pub fn exceeds_weekly_quota(&self, name: &str, start: NaiveDateTime) -> bool {
        let week = week_of(start);
        let count = self
            .reservations
            .iter()
            .filter(|r| r.name() == name && week_of(r.start()) == week)
            .count();
        count >= self.policy.weekly_limit
    }

    /// `start` 以降で最初に空いている時刻を探す
    pub fn next_available(&self, start: NaiveDateTime) -> Result<NaiveDateTime, ConflictError> {
        let tree = self.tree();
        let step = self.policy.granularity.max(Duration::minutes(1));
        let horizon = start + self.policy.search_horizon;
        let mut candidate = start;
        while candidate <= horizon {
            if !Self::overlaps_in(&tree, candidate..candidate + self.policy.granularity) {
                return Ok(candidate);
            }
            candidate += step;
        }
        Err(ConflictError::NoAvailability(
            start,
            self.policy.search_horizon.num_days(),
        ))
    }

    /// `start` から予約できる時間の長さ
    pub fn available_periods(&self, start: NaiveDateTime) -> Vec<Period> {
        let tree = self.tree();
        Period::ALL
            .into_iter()
            .filter(|p| !Self::overlaps_in(&tree, start..start + p.duration()))
            .collect()
    }

    /// 指定した日付の範囲（両端を含む）に開始する予約
    pub fn between(&self, from: NaiveDate, to: NaiveDate) -> Vec<&Reservation> {
        self.reservations
            .iter()
            .filter(|r| (from..=to).contains(&r.start().date()))
            .collect()
    }

    /// 予約の作成が既存の予約と衝突しないか検証する
    pub fn validate_reservation(&self, reservation: &Reservation) -> Result<(), ConflictError> {
        if self.overlaps(reservation.start(), reservation.end()) {
            return Err(ConflictError::Overlap(reservation.start(), reservation.end()));
        }
        if self.exceeds_weekly_quota(reservation.name(), reservation.start()) {
            return Err(ConflictError::WeeklyQuotaExceeded {
                name: reservation.name().to_owned(),
                limit: self.policy.weekly_limit,
            });
        }
        Ok(())
    }

    pub fn apply(&mut self, event: ScheduleEvent) {
        match event {
            ScheduleEvent::ReservationMade(reservation) => self.insert(reservation),
            ScheduleEvent::ReservationCanceled { name, start } => {
                self.remove(&name, start);
            }
        }
    }

    pub fn insert(&mut self, reservation: Reservation) {
        let index = self
            .reservations
            .partition_point(|r| r <= &reservation);
        self.reservations.insert(index, reservation);
    }

    pub fn remove(&mut self, name: &str, start: NaiveDateTime) -> Option<Reservation> {
        self.reservations
            .iter()
            .position(|r| r.is_keyed_by(name, start))
            .map(|index| self.reservations.remove(index))
    }

    fn tree(&self) -> IntervalTree<NaiveDateTime, &Reservation> {
        IntervalTree::from_iter(self.reservations.iter().map(|r| (r.time(), r)))
    }

    fn overlaps_in(tree: &IntervalTree<NaiveDateTime, &Reservation>, time: Range<NaiveDateTime>) -> bool {
        if time.start >= time.end {
            return false;
        }
        tree.find(time).next().is_some()
    }
}
