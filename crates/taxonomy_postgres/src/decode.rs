//! `PgRow` → [`RawRow`] by Postgres type name.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};

use taxonomy_core::{Cell, ExpandedRow, RawRow, Result, TaxonomyError};

fn decode_err(column: &str, e: sqlx::Error) -> TaxonomyError {
    TaxonomyError::unavailable(&format!("decode column {column}"), e)
}

/// Copy every scalar column of `row`. Columns of other types (`ltree`,
/// arrays, json) are skipped.
pub fn raw_row(row: &PgRow) -> Result<RawRow> {
    let mut raw = RawRow::new();
    for column in row.columns() {
        let i = column.ordinal();
        let name = column.name();
        let is_null = row
            .try_get_raw(i)
            .map_err(|e| decode_err(name, e))?
            .is_null();
        if is_null {
            raw.insert(name, Cell::Null);
            continue;
        }

        let get_err = |e| decode_err(name, e);
        let cell = match column.type_info().name() {
            "INT2" => Cell::Int(i64::from(row.try_get::<i16, _>(i).map_err(get_err)?)),
            "INT4" => Cell::Int(i64::from(row.try_get::<i32, _>(i).map_err(get_err)?)),
            "INT8" => Cell::Int(row.try_get::<i64, _>(i).map_err(get_err)?),
            "FLOAT4" => Cell::Float(f64::from(row.try_get::<f32, _>(i).map_err(get_err)?)),
            "FLOAT8" => Cell::Float(row.try_get::<f64, _>(i).map_err(get_err)?),
            "NUMERIC" => numeric(row.try_get::<Decimal, _>(i).map_err(get_err)?),
            "BOOL" => Cell::Bool(row.try_get::<bool, _>(i).map_err(get_err)?),
            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => {
                Cell::Text(row.try_get::<String, _>(i).map_err(get_err)?)
            }
            _ => continue,
        };
        raw.insert(name, cell);
    }
    Ok(raw)
}

fn numeric(d: Decimal) -> Cell {
    if d.fract().is_zero() {
        if let Some(v) = d.to_i64() {
            return Cell::Int(v);
        }
    }
    d.to_f64().map_or(Cell::Null, Cell::Float)
}

pub fn expanded(row: &PgRow) -> Result<ExpandedRow> {
    ExpandedRow::parse(&raw_row(row)?)
}
