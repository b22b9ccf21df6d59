pub mod court;

use eventstore::{EventData, ResolvedEvent};
use serde_json::{json, Value};
use thiserror::Error;

use crate::domain::{DataAccessError, Event};

impl From<eventstore::Error> for DataAccessError {
    fn from(value: eventstore::Error) -> Self {
        use eventstore::Error::*;
        match value {
            ConnectionClosed
            | Grpc { .. }
            | GrpcConnectionError(_)
            | DeadlineExceeded
            | InitializationError(_) => Self::ConnectionError(Box::new(value)),
            ResourceNotFound | ResourceDeleted => Self::ReadError(Box::new(value)),
            ResourceAlreadyExists | WrongExpectedVersion { .. } => {
                Self::WriteError(Box::new(value))
            }
            IllegalStateError(_) => Self::ClientSideError(Box::new(value)),
            _ => Self::QueryError(Box::new(value)),
        }
    }
}

/// ストリーム上のイベントと予約イベントの変換エラー
#[derive(Error, Debug)]
pub enum EventConvertError {
    #[error("Event is not a tagged object")]
    Untagged,
    #[error("Event payload is invalid: {0}")]
    Payload(#[from] serde_json::Error),
}

impl From<EventConvertError> for DataAccessError {
    fn from(value: EventConvertError) -> Self {
        DataAccessError::ClientSideError(Box::new(value))
    }
}

/// 外部タグ形式のイベントを、イベント種別とデータに分ける
fn split_event<E: Event>(event: &E) -> Result<(String, Value), EventConvertError> {
    match serde_json::to_value(event)? {
        Value::Object(root) => root.into_iter().next().ok_or(EventConvertError::Untagged),
        _ => Err(EventConvertError::Untagged),
    }
}

fn from_event<E: Event>(event: &E) -> Result<EventData, EventConvertError> {
    let (event_type, data) = split_event(event)?;
    Ok(EventData::json(event_type, data)?)
}

/// イベント種別をタグに戻して復元する
fn try_from_resolved_event<E: Event>(value: &ResolvedEvent) -> Result<E, EventConvertError> {
    let recorded = value.get_original_event();
    let data: Value = serde_json::from_slice(recorded.data.as_ref())?;
    Ok(serde_json::from_value(json!({ &recorded.event_type: data }))?)
}
