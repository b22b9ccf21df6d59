pub mod court;

use chrono::{Local, NaiveDateTime};
use serde::{de::DeserializeOwned, Serialize};
use std::{error::Error, fmt::Debug};
use thiserror::Error;

pub type BoxError = Box<dyn Error + Send + Sync>;

pub trait Event: Clone + Eq + Debug + Serialize + DeserializeOwned {}

#[derive(Error, Debug)]
pub enum DataAccessError {
    #[error("Database connection error: {0}")]
    ConnectionError(BoxError),
    #[error("Database query error: {0}")]
    QueryError(BoxError),
    #[error("Data read error: {0}")]
    ReadError(BoxError),
    #[error("Data write error: {0}")]
    WriteError(BoxError),
    #[error("Client side error: {0}")]
    ClientSideError(BoxError),
}

/// 現在時刻の取得元
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// ローカルの壁時計
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// 固定された時刻を返す時計
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }
}
