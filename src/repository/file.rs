use super::field_map::{parse_flag, split_list, FieldMap, RecordSource};
use super::memory::InMemoryRepository;
use super::{ItemFilter, RepositoryError, RepositoryResult, ScheduleRepository};
use crate::item::ScheduleItem;
use crate::resource::{Allocation, Resource};
use crate::warning::DataQualityWarning;
use csv::StringRecord;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

impl RecordSource for Map<String, Value> {
    fn text(&self, field: &str) -> Option<String> {
        self.get(field).and_then(value_text)
    }

    fn list(&self, field: &str) -> Vec<String> {
        match self.get(field) {
            Some(Value::Array(values)) => values.iter().filter_map(value_text).collect(),
            Some(value) => value_text(value)
                .map(|raw| split_list(&raw))
                .unwrap_or_default(),
            None => Vec::new(),
        }
    }

    fn flag(&self, field: &str) -> Option<bool> {
        match self.get(field)? {
            Value::Bool(flag) => Some(*flag),
            Value::Number(number) => number.as_f64().map(|value| value != 0.0),
            value => value_text(value).and_then(|raw| parse_flag(&raw)),
        }
    }
}

fn value_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null | Value::Object(_) => return None,
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Array(values) => values
            .iter()
            .filter_map(value_text)
            .collect::<Vec<_>>()
            .join(","),
    };
    (!text.is_empty()).then_some(text)
}

/// Raw export from the schedule service: three arrays of untyped records.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSnapshot {
    items: Vec<Map<String, Value>>,
    resources: Vec<Map<String, Value>>,
    allocations: Vec<Map<String, Value>>,
}

/// Repository over a JSON file of raw records with `items`, `resources` and `allocations`
/// arrays, keyed by the external field names in a [`FieldMap`].
#[derive(Debug, Clone)]
pub struct JsonSnapshotRepository {
    inner: InMemoryRepository,
}

impl JsonSnapshotRepository {
    pub fn open<P: AsRef<Path>>(path: P, fields: &FieldMap) -> RepositoryResult<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading json snapshot");
        let file = File::open(path)?;
        Self::from_reader(file, fields)
    }

    pub fn from_reader<R: Read>(reader: R, fields: &FieldMap) -> RepositoryResult<Self> {
        let raw: RawSnapshot = serde_json::from_reader(reader)?;
        Ok(Self {
            inner: InMemoryRepository::from_records(
                &raw.items,
                &raw.resources,
                &raw.allocations,
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

impl ScheduleRepository for JsonSnapshotRepository {
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

/// One CSV data row, addressed through its file's header row.
pub struct CsvRow<'a> {
    columns: &'a HashMap<String, usize>,
    record: &'a StringRecord,
}

impl RecordSource for CsvRow<'_> {
    fn text(&self, field: &str) -> Option<String> {
        let index = *self.columns.get(field)?;
        self.record
            .get(index)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned)
    }
}

struct CsvTable {
    columns: HashMap<String, usize>,
    records: Vec<StringRecord>,
}

impl CsvTable {
    fn read<P: AsRef<Path>>(path: P) -> RepositoryResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut reader = csv::Reader::from_reader(file);
        let columns = reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(index, name)| (name.trim().to_string(), index))
            .collect();
        let records = reader.records().collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(path = %path.display(), rows = records.len(), "read csv table");
        Ok(Self { columns, records })
    }

    fn rows(&self) -> impl Iterator<Item = CsvRow<'_>> {
        self.records.iter().map(|record| CsvRow {
            columns: &self.columns,
            record,
        })
    }
}

/// Repository over three CSV exports (items, resources, allocations) whose header rows use
/// the external field names.
#[derive(Debug, Clone)]
pub struct CsvSnapshotRepository {
    inner: InMemoryRepository,
}

impl CsvSnapshotRepository {
    pub fn open<P, Q, S>(
        items_path: P,
        resources_path: Q,
        allocations_path: S,
        fields: &FieldMap,
    ) -> RepositoryResult<Self>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
        S: AsRef<Path>,
    {
        let items = CsvTable::read(items_path)?;
        if items.records.is_empty() {
            return Err(RepositoryError::InvalidRecord(
                "CSV file contained no schedule items".into(),
            ));
        }
        let resources = CsvTable::read(resources_path)?;
        let allocations = CsvTable::read(allocations_path)?;

        Ok(Self {
            inner: InMemoryRepository::from_records(
                items.rows(),
                resources.rows(),
                allocations.rows(),
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

impl ScheduleRepository for CsvSnapshotRepository {
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_values_read_as_text() {
        let record = json!({
            "id": 12,
            "name": "  Pour  ",
            "blank": "",
            "nothing": null,
            "members": ["p1", "p2"],
            "done": true,
        });
        let Value::Object(record) = record else {
            unreachable!()
        };
        assert_eq!(record.text("id").as_deref(), Some("12"));
        assert_eq!(record.text("name").as_deref(), Some("Pour"));
        assert_eq!(record.text("blank"), None);
        assert_eq!(record.text("nothing"), None);
        assert_eq!(record.list("members"), vec!["p1", "p2"]);
        assert_eq!(record.flag("done"), Some(true));
    }

    #[test]
    fn json_snapshot_uses_field_map() {
        let raw = json!({
            "items": [
                {"レコードID": "1", "契約": "c1", "工程名": "Site prep", "進捗率": 50},
                {"工程名": "no id"}
            ],
            "resources": [{"レコードID": "crane", "種別": "equipment", "数量": 2}],
            "allocations": [
                {"工程": "1", "リソース": "crane", "開始日": "2024-01-01", "終了日": "2024-01-09"}
            ]
        });
        let repository =
            JsonSnapshotRepository::from_reader(raw.to_string().as_bytes(), &FieldMap::default())
                .unwrap();

        let items = repository.list_schedule_items(&ItemFilter::all()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].progress, 50);
        assert_eq!(repository.get_resource("crane").unwrap().capacity, 2);
        assert_eq!(repository.list_allocations("crane").unwrap().len(), 1);
        assert_eq!(repository.warnings().len(), 1);
    }
}
