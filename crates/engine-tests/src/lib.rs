#![allow(dead_code)]

use chrono::{DateTime, NaiveDateTime};
use model::{
    core::value::Value,
    records::row::RowData,
    sync::{catalog::Catalog, table::TableSpec},
};

pub mod integration;
pub mod memory;
pub mod runner;

/// Base instant for test watermarks: 2024-01-01T00:00:00.
const BASE_EPOCH_SECS: i64 = 1_704_067_200;

/// A naive timestamp `offset_secs` after the base instant.
pub fn naive_ts(offset_secs: i64) -> NaiveDateTime {
    DateTime::from_timestamp(BASE_EPOCH_SECS + offset_secs, 0)
        .expect("timestamp in range")
        .naive_utc()
}

pub fn ts(offset_secs: i64) -> Value {
    Value::TimestampNaive(naive_ts(offset_secs))
}

pub fn user_row(id: &str, updated_at: i64, email: &str) -> RowData {
    RowData::from_pairs(
        "User",
        [
            ("id", Value::from(id)),
            ("createdAt", ts(0)),
            ("updatedAt", ts(updated_at)),
            ("email", Value::from(email)),
        ],
    )
}

pub fn image_row(id: &str, created_at: i64) -> RowData {
    RowData::from_pairs(
        "Image",
        [
            ("id", Value::from(id)),
            ("createdAt", ts(created_at)),
            ("url", Value::from(format!("https://cdn.example/{id}.png"))),
        ],
    )
}

pub fn hangout_row(id: &str, updated_at: i64, picture_id: Option<&str>) -> RowData {
    RowData::from_pairs(
        "Hangout",
        [
            ("id", Value::from(id)),
            ("createdAt", ts(0)),
            ("updatedAt", ts(updated_at)),
            ("name", Value::from(format!("Hangout {id}"))),
            ("pictureId", Value::from(picture_id)),
        ],
    )
}

pub fn user_spec() -> TableSpec {
    TableSpec::builder("User")
        .columns(&["id", "createdAt", "updatedAt", "email", "deletedAt"])
        .soft_delete("deletedAt")
        .build()
}

pub fn image_spec() -> TableSpec {
    TableSpec::builder("Image")
        .watermark("createdAt")
        .columns(&["id", "createdAt", "url"])
        .build()
}

pub fn hangout_spec() -> TableSpec {
    TableSpec::builder("Hangout")
        .columns(&["id", "createdAt", "updatedAt", "name", "pictureId", "circleProfileId"])
        .fk_columns(&["pictureId", "circleProfileId"])
        .build()
}

/// `User`, `Image`, `Hangout`, with `pictureId` mapped to `Image` and
/// `circleProfileId` left unmapped.
pub fn small_catalog() -> Catalog {
    Catalog::new(vec![user_spec(), image_spec(), hangout_spec()])
        .with_foreign_key("pictureId", "Image")
}
