use crate::utils::error_chain_fmt;
use aws_lambda_events::dynamodb::EventRecord;
use aws_lambda_events::streams::DynamoDbBatchItemFailure;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Name of the partition key attribute in both tables.
pub const RECORD_KEY: &str = "id";

#[derive(thiserror::Error)]
pub enum StreamRecordError {
    #[error("The stream record has no usable `id` key")]
    MissingKey(#[source] serde_dynamo::Error),
    #[error("Failed to deserialize the new image of record {0}")]
    InvalidImage(String, #[source] serde_dynamo::Error),
}

impl std::fmt::Debug for StreamRecordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[derive(Deserialize)]
struct RecordKey {
    id: String,
}

/// Only newly created documents trigger an email.
pub fn is_insert(record: &EventRecord) -> bool {
    record.event_name == "INSERT"
}

/// Read the document id and the created document out of a stream record.
pub fn parse_inserted<T: DeserializeOwned>(
    record: &EventRecord,
) -> Result<(String, T), StreamRecordError> {
    let key: RecordKey = serde_dynamo::from_item(record.change.keys.clone())
        .map_err(StreamRecordError::MissingKey)?;

    let document: T = serde_dynamo::from_item(record.change.new_image.clone())
        .map_err(|e| StreamRecordError::InvalidImage(key.id.clone(), e))?;

    Ok((key.id, document))
}

/// Lambda retries a batch from the first reported sequence number onwards.
pub fn batch_item_failure(record: &EventRecord) -> DynamoDbBatchItemFailure {
    DynamoDbBatchItemFailure {
        item_identifier: record.change.sequence_number.clone(),
    }
}
