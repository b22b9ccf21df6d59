use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tokio::fs;
use tracing::debug;

use crate::domain::court::{Reservation, ReservationRepository};
use crate::domain::DataAccessError;

/// JSON ファイルを予約テーブルとして使うリポジトリ
///
/// 操作ごとにファイルを読み込み、書き込みは一時ファイル経由で置き換える。
#[derive(Clone, Debug)]
pub struct JsonFileReservationRepository {
    path: PathBuf,
}

impl JsonFileReservationRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Vec<Reservation>, DataAccessError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(DataAccessError::ReadError(Box::new(e))),
        };
        let mut reservations: Vec<Reservation> = serde_json::from_slice(&bytes)
            .map_err(|e| DataAccessError::ReadError(Box::new(e)))?;
        reservations.sort();
        debug!("{} から {} 件の予約を読み込み", self.path.display(), reservations.len());
        Ok(reservations)
    }

    async fn write(&self, reservations: &[Reservation]) -> Result<(), DataAccessError> {
        let json = serde_json::to_vec_pretty(reservations)
            .map_err(|e| DataAccessError::WriteError(Box::new(e)))?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        fs::write(&tmp, json)
            .await
            .map_err(|e| DataAccessError::WriteError(Box::new(e)))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| DataAccessError::WriteError(Box::new(e)))?;
        debug!("{} に {} 件の予約を書き込み", self.path.display(), reservations.len());
        Ok(())
    }
}

#[async_trait]
impl ReservationRepository for JsonFileReservationRepository {
    async fn find_all(&self) -> Result<Vec<Reservation>, DataAccessError> {
        self.read().await
    }

    async fn insert(&mut self, reservation: &Reservation) -> Result<(), DataAccessError> {
        let mut reservations = self.read().await?;
        let index = reservations.partition_point(|r| r <= reservation);
        reservations.insert(index, reservation.clone());
        self.write(&reservations).await
    }

    async fn delete(
        &mut self,
        name: &str,
        start: NaiveDateTime,
    ) -> Result<bool, DataAccessError> {
        let mut reservations = self.read().await?;
        let before = reservations.len();
        reservations.retain(|r| !r.is_keyed_by(name, start));
        if reservations.len() == before {
            return Ok(false);
        }
        self.write(&reservations).await?;
        Ok(true)
    }
}
