use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::domain::court::{Reservation, ReservationRepository};
use crate::domain::DataAccessError;

/// メモリ上の予約リポジトリ
#[derive(Clone, Debug, Default)]
pub struct InMemoryReservationRepository {
    reservations: Vec<Reservation>,
}

impl InMemoryReservationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reservations<T: IntoIterator<Item = Reservation>>(reservations: T) -> Self {
        Self {
            reservations: reservations.into_iter().collect(),
        }
    }
}

#[async_trait]
impl ReservationRepository for InMemoryReservationRepository {
    async fn find_all(&self) -> Result<Vec<Reservation>, DataAccessError> {
        let mut reservations = self.reservations.clone();
        reservations.sort();
        Ok(reservations)
    }

    async fn insert(&mut self, reservation: &Reservation) -> Result<(), DataAccessError> {
        self.reservations.push(reservation.clone());
        Ok(())
    }

    async fn delete(
        &mut self,
        name: &str,
        start: NaiveDateTime,
    ) -> Result<bool, DataAccessError> {
        let before = self.reservations.len();
        self.reservations.retain(|r| !r.is_keyed_by(name, start));
        Ok(self.reservations.len() != before)
    }
}
