use async_trait::async_trait;
use chrono::NaiveDateTime;
use eventstore::{AppendToStreamOptions, Client, EventData, ExpectedRevision, ResolvedEvent};
use tracing::debug;

use crate::domain::court::{
    BookingPolicy, Reservation, ReservationRepository, Schedule, ScheduleEvent,
};
use crate::domain::DataAccessError;
use crate::infrastructure::{from_event, try_from_resolved_event, EventConvertError};

/// EventStoreDB のストリームに予約イベントを記録するリポジトリ
#[derive(Clone)]
pub struct EventStoreReservationRepository {
    client: Client,
    stream_name: String,
}

impl EventStoreReservationRepository {
    pub fn new(client: Client, stream_name: impl Into<String>) -> Self {
        Self {
            client,
            stream_name: stream_name.into(),
        }
    }

    /// ストリームを再生し、スケジュールと最後のリビジョンを返す
    async fn replay(&self) -> Result<(Schedule, Option<u64>), DataAccessError> {
        let mut stream = self
            .client
            .read_stream(self.stream_name.as_str(), &Default::default())
            .await?;
        let mut schedule = Schedule::new(BookingPolicy::default());
        let mut revision = None;
        loop {
            match stream.next().await {
                Ok(Some(e)) => {
                    schedule.apply(ScheduleEvent::try_from(&e)?);
                    revision = Some(e.get_original_event().revision);
                }
                Ok(None) => break,
                Err(eventstore::Error::ResourceNotFound) => break,
                Err(e) => return Err(e.into()),
            }
        }
        Ok((schedule, revision))
    }

    async fn append(
        &self,
        event: ScheduleEvent,
        revision: ExpectedRevision,
    ) -> Result<(), DataAccessError> {
        self.client
            .append_to_stream(
                self.stream_name.as_str(),
                &AppendToStreamOptions::default().expected_revision(revision),
                EventData::try_from(event)?,
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ReservationRepository for EventStoreReservationRepository {
    async fn find_all(&self) -> Result<Vec<Reservation>, DataAccessError> {
        let (schedule, revision) = self.replay().await?;
        debug!(
            "{} から {} 件の予約を読み込み (revision {:?})",
            self.stream_name,
            schedule.len(),
            revision
        );
        Ok(schedule.into_reservations())
    }

    async fn insert(&mut self, reservation: &Reservation) -> Result<(), DataAccessError> {
        debug!("{} に予約を追加: {:?}", self.stream_name, reservation);
        self.append(
            ScheduleEvent::ReservationMade(reservation.clone()),
            ExpectedRevision::Any,
        )
        .await
    }

    async fn delete(
        &mut self,
        name: &str,
        start: NaiveDateTime,
    ) -> Result<bool, DataAccessError> {
        let (schedule, revision) = self.replay().await?;
        let revision = match (schedule.find(name, start), revision) {
            (Some(_), Some(revision)) => revision,
            _ => return Ok(false),
        };
        debug!("{} から予約を削除: {} {}", self.stream_name, name, start);
        self.append(
            ScheduleEvent::ReservationCanceled {
                name: name.to_owned(),
                start,
            },
            ExpectedRevision::Exact(revision),
        )
        .await?;
        Ok(true)
    }
}

impl TryFrom<ScheduleEvent> for EventData {
    type Error = EventConvertError;

    fn try_from(value: ScheduleEvent) -> Result<Self, Self::Error> {
        from_event(&value)
    }
}

impl TryFrom<&ResolvedEvent> for ScheduleEvent {
    type Error = EventConvertError;

    fn try_from(value: &ResolvedEvent) -> Result<Self, Self::Error> {
        try_from_resolved_event(value)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use eventstore::{Client, EventData, Position, RecordedEvent, ResolvedEvent};
    use serde_json::json;

    use super::*;
    use crate::infrastructure::split_event;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 3)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn resolved(event_type: &str, data: serde_json::Value) -> ResolvedEvent {
        ResolvedEvent {
            event: Some(RecordedEvent {
                stream_id: "tennis_court".to_owned(),
                id: Default::default(),
                revision: 3,
                event_type: event_type.to_owned(),
                data: serde_json::to_vec(&data).unwrap().into(),
                metadata: Default::default(),
                custom_metadata: Default::default(),
                is_json: true,
                position: Position {
                    commit: Default::default(),
                    prepare: Default::default(),
                },
                created: Default::default(),
            }),
            link: None,
            commit_position: None,
        }
    }

    #[test]
    fn test_event_data_from() {
        let event = ScheduleEvent::ReservationCanceled {
            name: "Alice".to_owned(),
            start: at(10, 0),
        };
        assert_eq!(
            split_event(&event).unwrap(),
            (
                "ReservationCanceled".to_owned(),
                json!({
                    "name": "Alice",
                    "start": "2024-06-03T10:00:00",
                })
            )
        );

        let made = ScheduleEvent::ReservationMade(
            Reservation::create("Alice", at(10, 0), at(10, 30)).unwrap(),
        );
        assert_eq!(
            split_event(&made).unwrap(),
            (
                "ReservationMade".to_owned(),
                json!({
                    "name": "Alice",
                    "start": "2024-06-03T10:00:00",
                    "end": "2024-06-03T10:30:00",
                })
            )
        );
        assert!(EventData::try_from(made).is_ok());
    }

    #[test]
    fn test_event_try_from() {
        let event = resolved(
            "ReservationMade",
            json!({
                "name": "Alice",
                "start": "2024-06-03T10:00:00",
                "end": "2024-06-03T11:00:00",
            }),
        );
        let expected = ScheduleEvent::ReservationMade(
            Reservation::create("Alice", at(10, 0), at(11, 0)).unwrap(),
        );
        assert_eq!(ScheduleEvent::try_from(&event).ok(), Some(expected));

        let canceled = resolved(
            "ReservationCanceled",
            json!({ "name": "Alice", "start": "2024-06-03T10:00:00" }),
        );
        assert_eq!(
            ScheduleEvent::try_from(&canceled).ok(),
            Some(ScheduleEvent::ReservationCanceled {
                name: "Alice".to_owned(),
                start: at(10, 0)
            })
        );
    }

    #[test]
    fn test_event_try_from_invalid() {
        let unknown = resolved("ReservationMoved", json!({ "name": "Alice" }));
        assert!(ScheduleEvent::try_from(&unknown).is_err());

        let bad_period = resolved(
            "ReservationMade",
            json!({
                "name": "Alice",
                "start": "2024-06-03T10:00:00",
                "end": "2024-06-03T10:10:00",
            }),
        );
        assert!(ScheduleEvent::try_from(&bad_period).is_err());
    }

    #[tokio::test]
    #[ignore = "requires EventStoreDB on localhost:2113"]
    async fn test_repository() {
        let settings = "esdb://localhost:2113?tls=false".parse().unwrap();
        let client = Client::new(settings).unwrap();
        let stream_name = format!("tennis_court_test_{}", chrono::Utc::now().timestamp_millis());
        let mut repo = EventStoreReservationRepository::new(client, stream_name);

        let late = Reservation::create("Bob", at(12, 0), at(12, 30)).unwrap();
        let early = Reservation::create("Alice", at(10, 0), at(11, 0)).unwrap();
        repo.insert(&late).await.unwrap();
        repo.insert(&early).await.unwrap();
        assert_eq!(repo.find_all().await.unwrap(), vec![early.clone(), late.clone()]);

        assert!(repo.delete("Alice", at(10, 0)).await.unwrap());
        assert!(!repo.delete("Alice", at(10, 0)).await.unwrap());
        assert_eq!(repo.find_all().await.unwrap(), vec![late]);
    }
}
