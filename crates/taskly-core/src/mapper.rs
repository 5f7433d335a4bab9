//! Conversion between raw store items and [`Record`]s.
//!
//! Reading validates the whole item up front and either yields a fully
//! populated record or a [`Error::MalformedRecord`] naming the offending
//! attribute. Older items written before `status` existed read as
//! [`Status::Pending`]; a present but unrecognized status is an error.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::record::{Record, Status, format_timestamp, parse_timestamp};
use crate::store::Item;
use crate::types::{Field, PARTITION_TAG};

/// Decode a stored item into a record.
pub fn to_record(item: &Item) -> Result<Record> {
    let id = required_str(item, Field::Id)?;
    let title = required_str(item, Field::Title)?;
    let description = required_str(item, Field::Description)?;
    let due_date = required_str(item, Field::DueDate)?;
    let created_at = required_timestamp(item, Field::CreatedAt)?;

    let status = match optional_str(item, Field::Status)? {
        None => Status::default(),
        Some(raw) => raw
            .parse()
            .map_err(|e| Error::malformed(Field::Status, format!("has {e}")))?,
    };

    let updated_at = match optional_str(item, Field::UpdatedAt)? {
        None => None,
        Some(raw) => Some(
            parse_timestamp(raw)
                .ok_or_else(|| Error::malformed(Field::UpdatedAt, "is not an RFC 3339 timestamp"))?,
        ),
    };

    Ok(Record {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        due_date: due_date.to_string(),
        status,
        created_at,
        updated_at,
    })
}

/// Encode a record as a store item, including the partition tag that places
/// it in the creation-time index.
pub fn from_record(record: &Record) -> Item {
    let mut item = Item::new();
    let mut set = |field: Field, value: String| {
        item.insert(field.attribute_name().to_string(), Value::String(value));
    };

    set(Field::Id, record.id.clone());
    set(Field::Title, record.title.clone());
    set(Field::Description, record.description.clone());
    set(Field::DueDate, record.due_date.clone());
    set(Field::Status, record.status.as_str().to_string());
    set(Field::CreatedAt, format_timestamp(&record.created_at));
    if let Some(updated_at) = &record.updated_at {
        set(Field::UpdatedAt, format_timestamp(updated_at));
    }
    set(Field::PartitionTag, PARTITION_TAG.to_string());
    item
}

/// Refresh `updated_at` for a mutation.
///
/// Always moves the stamp, even when nothing else changed. The new stamp is
/// `now` unless the clock has not moved past the previous stamp (or
/// `created_at` for a first update), in which case it is one nanosecond
/// after it.
pub fn touch(record: &mut Record, now: DateTime<Utc>) {
    let floor = record.updated_at.unwrap_or(record.created_at);
    let stamp = if now > floor {
        now
    } else {
        floor + Duration::nanoseconds(1)
    };
    record.updated_at = Some(stamp);
}

fn optional_str(item: &Item, field: Field) -> Result<Option<&str>> {
    match item.get(field.attribute_name()) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(Error::malformed(field, "must be a string")),
    }
}

fn required_str(item: &Item, field: Field) -> Result<&str> {
    optional_str(item, field)?.ok_or_else(|| Error::missing(field))
}

fn required_timestamp(item: &Item, field: Field) -> Result<DateTime<Utc>> {
    let raw = required_str(item, field)?;
    parse_timestamp(raw).ok_or_else(|| Error::malformed(field, "is not an RFC 3339 timestamp"))
}
