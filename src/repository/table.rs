use super::field_map::{parse_flag, split_list, FieldMap, RecordSource};
use super::memory::InMemoryRepository;
use super::{ItemFilter, RepositoryResult, ScheduleRepository};
use crate::item::ScheduleItem;
use crate::resource::{Allocation, Resource};
use crate::warning::DataQualityWarning;
use chrono::NaiveDate;
use polars::prelude::*;

/// Days from 0001-01-01 (CE day 1) to 1970-01-01.
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// One row of a polars DataFrame. Cells are rendered to text by column dtype.
pub struct DataFrameRow<'a> {
    df: &'a DataFrame,
    row_idx: usize,
}

impl<'a> DataFrameRow<'a> {
    pub fn new(df: &'a DataFrame, row_idx: usize) -> Self {
        Self { df, row_idx }
    }
}

impl RecordSource for DataFrameRow<'_> {
    fn text(&self, field: &str) -> Option<String> {
        let column = self.df.column(field).ok()?;
        match cell_text(column, self.row_idx) {
            Ok(text) => text
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
            Err(err) => {
                tracing::warn!(field, row = self.row_idx, %err, "unreadable cell");
                None
            }
        }
    }

    fn list(&self, field: &str) -> Vec<String> {
        let Ok(column) = self.df.column(field) else {
            return Vec::new();
        };
        match column.dtype() {
            DataType::List(_) => column
                .list()
                .and_then(|list| strings_from_list(list, self.row_idx))
                .unwrap_or_default(),
            _ => self
                .text(field)
                .map(|raw| split_list(&raw))
                .unwrap_or_default(),
        }
    }

    fn flag(&self, field: &str) -> Option<bool> {
        let column = self.df.column(field).ok()?;
        match column.dtype() {
            DataType::Boolean => column.bool().ok()?.get(self.row_idx),
            _ => self.text(field).and_then(|raw| parse_flag(&raw)),
        }
    }
}

fn cell_text(column: &Column, row_idx: usize) -> PolarsResult<Option<String>> {
    let text = match column.dtype() {
        DataType::String => column.str()?.get(row_idx).map(ToOwned::to_owned),
        DataType::Int32 => column.i32()?.get(row_idx).map(|v| v.to_string()),
        DataType::Int64 => column.i64()?.get(row_idx).map(|v| v.to_string()),
        DataType::UInt32 => column.u32()?.get(row_idx).map(|v| v.to_string()),
        DataType::Float64 => column.f64()?.get(row_idx).map(|v| v.to_string()),
        DataType::Boolean => column.bool()?.get(row_idx).map(|v| v.to_string()),
        DataType::Date => column
            .date()?
            .get(row_idx)
            .and_then(date_from_i32)
            .map(|date| date.format("%Y-%m-%d").to_string()),
        DataType::List(_) => Some(strings_from_list(column.list()?, row_idx)?.join(",")),
        other => {
            return Err(PolarsError::ComputeError(
                format!("unsupported column type {other}").into(),
            ));
        }
    };
    Ok(text)
}

fn strings_from_list(list: &ListChunked, row_idx: usize) -> PolarsResult<Vec<String>> {
    if let Some(series) = list.get_as_series(row_idx) {
        Ok(series
            .cast(&DataType::String)?
            .str()?
            .into_iter()
            .flatten()
            .map(ToOwned::to_owned)
            .collect::<Vec<_>>())
    } else {
        Ok(Vec::new())
    }
}

fn date_from_i32(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(EPOCH_DAYS_FROM_CE)?)
}

fn is_supported(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::String
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt32
            | DataType::Float64
            | DataType::Boolean
            | DataType::Date
            | DataType::List(_)
    )
}

/// Rejects frames with column types no cell can be read from.
fn check_columns(df: &DataFrame) -> PolarsResult<()> {
    for column in df.get_columns() {
        if !is_supported(column.dtype()) {
            return Err(PolarsError::ComputeError(
                format!(
                    "column '{}' has unsupported type {}",
                    column.name(),
                    column.dtype()
                )
                .into(),
            ));
        }
    }
    Ok(())
}

fn rows(df: &DataFrame) -> impl Iterator<Item = DataFrameRow<'_>> {
    (0..df.height()).map(move |row_idx| DataFrameRow::new(df, row_idx))
}

/// Repository over three DataFrames shaped like the service's exports.
#[derive(Debug, Clone)]
pub struct TableRepository {
    inner: InMemoryRepository,
}

impl TableRepository {
    pub fn from_frames(
        items: &DataFrame,
        resources: &DataFrame,
        allocations: &DataFrame,
        fields: &FieldMap,
    ) -> RepositoryResult<Self> {
        for df in [items, resources, allocations] {
            check_columns(df)?;
        }
        Ok(Self {
            inner: InMemoryRepository::from_records(
                rows(items),
                rows(resources),
                rows(allocations),
                fields,
            ),
        })
    }

    pub fn warnings(&self) -> &[DataQualityWarning] {
        self.inner.warnings()
    }

    pub fn into_inner(self) -> InMemoryRepository {
        self.inner
    }
}

impl ScheduleRepository for TableRepository {
    fn list_schedule_items(&self, filter: &ItemFilter) -> RepositoryResult<Vec<ScheduleItem>> {
        self.inner.list_schedule_items(filter)
    }

    fn get_resource(&self, id: &str) -> RepositoryResult<Resource> {
        self.inner.get_resource(id)
    }

    fn list_allocations(&self, resource_id: &str) -> RepositoryResult<Vec<Allocation>> {
        self.inner.list_allocations(resource_id)
    }
}
