mod event_store;
mod export;
mod file;
mod memory;

pub use self::event_store::*;
pub use self::export::*;
pub use self::file::*;
pub use self::memory::*;

use eventstore::{Client, ClientSettings};

use crate::domain::court::ReservationRepository;
use crate::domain::DataAccessError;
use crate::{Store, StoreKind};

pub type DynReservationRepository = Box<dyn ReservationRepository + Send + Sync>;

/// 設定に応じたリポジトリを用意する
pub fn open_repository(store: &Store) -> Result<DynReservationRepository, DataAccessError> {
    Ok(match store.kind {
        StoreKind::File => Box::new(JsonFileReservationRepository::new(&store.path)),
        StoreKind::EventStore => {
            let settings = store
                .url
                .parse::<ClientSettings>()
                .map_err(|e| DataAccessError::ConnectionError(e.to_string().into()))?;
            let client = Client::new(settings)
                .map_err(|e| DataAccessError::ConnectionError(e.to_string().into()))?;
            Box::new(EventStoreReservationRepository::new(client, &store.stream))
        }
        StoreKind::Memory => Box::new(InMemoryReservationRepository::new()),
    })
}
