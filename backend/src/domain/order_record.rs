use chrono::{DateTime, TimeZone, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer};

/// A document from the `orders` table. Every field is optional on the wire;
/// defaults are applied when the confirmation email is rendered.
///
/// An attribute of an unexpected type reads as absent instead of failing the
/// whole document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    #[serde(default, deserialize_with = "lenient")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub confirmation_number: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub items: Option<Vec<OrderItem>>,
    #[serde(default, deserialize_with = "lenient")]
    pub total_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub shipping_address: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub payment_method: Option<String>,
    /// RFC 3339 string or milliseconds since the Unix epoch.
    #[serde(default, deserialize_with = "timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderItem {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub quantity: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub price: Option<f64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient<T> {
    Value(T),
    Unreadable(IgnoredAny),
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match Option::<Lenient<T>>::deserialize(deserializer)? {
        Some(Lenient::Value(value)) => Some(value),
        Some(Lenient::Unreadable(_)) | None => None,
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Timestamp {
    Rfc3339(DateTime<Utc>),
    EpochMillis(i64),
    Unreadable(IgnoredAny),
}

fn timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Timestamp>::deserialize(deserializer)? {
        Some(Timestamp::Rfc3339(timestamp)) => Some(timestamp),
        Some(Timestamp::EpochMillis(millis)) => Utc.timestamp_millis_opt(millis).single(),
        Some(Timestamp::Unreadable(_)) | None => None,
    })
}
