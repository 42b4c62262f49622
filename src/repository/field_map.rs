//! Fixed mapping from external record field names to typed attributes.
//!
//! The upstream schedule service exposes records keyed by Japanese display names. All
//! knowledge of those names lives in [`FieldMap`]; the conversion functions below are the
//! only place untyped values become [`ScheduleItem`], [`Resource`] and [`Allocation`].

use crate::item::{HoldMarker, ScheduleItem, Status, WbsTier};
use crate::resource::{Allocation, Period, Resource, ResourceKind};
use crate::warning::{DataQualityWarning, DateField};
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

const ITEM_ENTITY: &str = "schedule_item";
const RESOURCE_ENTITY: &str = "resource";
const ALLOCATION_ENTITY: &str = "allocation";

/// Anything that can hand out field values by name: a JSON object, a CSV row, a DataFrame row.
pub trait RecordSource {
    /// Trimmed text of a field; `None` when the field is absent, null or blank.
    fn text(&self, field: &str) -> Option<String>;

    /// Multi-valued field. Plain text is split on `,`, `;`, `、` and newlines.
    fn list(&self, field: &str) -> Vec<String> {
        self.text(field)
            .map(|raw| split_list(&raw))
            .unwrap_or_default()
    }

    fn flag(&self, field: &str) -> Option<bool> {
        self.text(field).and_then(|raw| parse_flag(&raw))
    }
}

impl<T: RecordSource + ?Sized> RecordSource for &T {
    fn text(&self, field: &str) -> Option<String> {
        (**self).text(field)
    }

    fn list(&self, field: &str) -> Vec<String> {
        (**self).list(field)
    }

    fn flag(&self, field: &str) -> Option<bool> {
        (**self).flag(field)
    }
}

impl RecordSource for BTreeMap<String, String> {
    fn text(&self, field: &str) -> Option<String> {
        self.get(field)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFields {
    pub id: String,
    pub parent_id: String,
    pub contract_id: String,
    pub name: String,
    pub tier: String,
    pub planned_start: String,
    pub planned_end: String,
    pub actual_start: String,
    pub actual_end: String,
    pub progress: String,
    pub status: String,
    pub persons: String,
    pub equipment: String,
    pub subcontractors: String,
    pub predecessors: String,
    pub milestone: String,
    pub critical_path: String,
    pub hold: String,
    pub hold_progress: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceFields {
    pub id: String,
    pub kind: String,
    pub name: String,
    pub quantity: String,
    pub active: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationFields {
    pub schedule_item_id: String,
    pub resource_id: String,
    pub quantity: String,
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMap {
    pub item: ItemFields,
    pub resource: ResourceFields,
    pub allocation: AllocationFields,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            item: ItemFields {
                id: "レコードID".into(),
                parent_id: "親工程".into(),
                contract_id: "契約".into(),
                name: "工程名".into(),
                tier: "階層".into(),
                planned_start: "開始予定日".into(),
                planned_end: "終了予定日".into(),
                actual_start: "実績開始日".into(),
                actual_end: "実績終了日".into(),
                progress: "進捗率".into(),
                status: "ステータス".into(),
                persons: "担当者".into(),
                equipment: "使用機材".into(),
                subcontractors: "協力会社".into(),
                predecessors: "先行工程".into(),
                milestone: "マイルストーン".into(),
                critical_path: "クリティカルパス".into(),
                hold: "保留".into(),
                hold_progress: "保留時進捗".into(),
            },
            resource: ResourceFields {
                id: "レコードID".into(),
                kind: "種別".into(),
                name: "名称".into(),
                quantity: "数量".into(),
                active: "有効".into(),
            },
            allocation: AllocationFields {
                schedule_item_id: "工程".into(),
                resource_id: "リソース".into(),
                quantity: "数量".into(),
                start: "開始日".into(),
                end: "終了日".into(),
            },
        }
    }
}

impl FieldMap {
    /// Field names identical to the typed attribute names, for internally produced data.
    pub fn identity() -> Self {
        Self {
            item: ItemFields {
                id: "id".into(),
                parent_id: "parent_id".into(),
                contract_id: "owner_contract_id".into(),
                name: "name".into(),
                tier: "tier".into(),
                planned_start: "planned_start".into(),
                planned_end: "planned_end".into(),
                actual_start: "actual_start".into(),
                actual_end: "actual_end".into(),
                progress: "progress".into(),
                status: "status".into(),
                persons: "assigned_person_ids".into(),
                equipment: "assigned_equipment_ids".into(),
                subcontractors: "assigned_subcontractor_ids".into(),
                predecessors: "predecessor_ids".into(),
                milestone: "milestone".into(),
                critical_path: "critical_path".into(),
                hold: "hold".into(),
                hold_progress: "progress_at_hold".into(),
            },
            resource: ResourceFields {
                id: "id".into(),
                kind: "kind".into(),
                name: "name".into(),
                quantity: "capacity".into(),
                active: "active".into(),
            },
            allocation: AllocationFields {
                schedule_item_id: "schedule_item_id".into(),
                resource_id: "resource_id".into(),
                quantity: "quantity".into(),
                start: "start".into(),
                end: "end".into(),
            },
        }
    }

    /// Converts one raw record. Returns `None` only when the record has no id.
    pub fn item_from_record(
        &self,
        record: &impl RecordSource,
        warnings: &mut Vec<DataQualityWarning>,
    ) -> Option<ScheduleItem> {
        let fields = &self.item;
        let Some(id) = record.text(&fields.id) else {
            warnings.push(missing_field(ITEM_ENTITY, &fields.id));
            return None;
        };

        let mut item = ScheduleItem::new(
            id.clone(),
            record.text(&fields.name).unwrap_or_default(),
            record.text(&fields.contract_id).unwrap_or_default(),
        );
        item.parent_id = record.text(&fields.parent_id);
        item.tier = record.text(&fields.tier).and_then(|raw| parse_tier(&raw));
        item.planned_start =
            read_date(record, &fields.planned_start, DateField::PlannedStart, &id, warnings);
        item.planned_end =
            read_date(record, &fields.planned_end, DateField::PlannedEnd, &id, warnings);
        item.actual_start =
            read_date(record, &fields.actual_start, DateField::ActualStart, &id, warnings);
        item.actual_end = read_date(record, &fields.actual_end, DateField::ActualEnd, &id, warnings);

        if let Some(raw) = record.text(&fields.progress) {
            let (progress, in_range) = parse_progress(&raw);
            if !in_range {
                warnings.push(DataQualityWarning::ProgressOutOfRange {
                    item_id: id.clone(),
                    raw,
                });
            }
            item.progress = progress;
        }

        if let Some(raw) = record.text(&fields.status) {
            match parse_status(&raw) {
                Some(status) => item.status = status,
                None => warnings.push(DataQualityWarning::InvalidRecord {
                    entity: ITEM_ENTITY.into(),
                    detail: format!("item {id} has unknown status '{raw}'"),
                }),
            }
        }

        item.assigned_person_ids = to_set(record.list(&fields.persons));
        item.assigned_equipment_ids = to_set(record.list(&fields.equipment));
        item.assigned_subcontractor_ids = to_set(record.list(&fields.subcontractors));
        item.predecessor_ids = to_set(record.list(&fields.predecessors));
        item.milestone = record.flag(&fields.milestone).unwrap_or(false);
        item.critical_path = record.flag(&fields.critical_path).unwrap_or(false);

        let held = record.flag(&fields.hold).unwrap_or(false) || item.status == Status::OnHold;
        if held {
            let progress_at_hold = record
                .text(&fields.hold_progress)
                .map(|raw| parse_progress(&raw).0)
                .unwrap_or(item.progress);
            item.hold = Some(HoldMarker { progress_at_hold });
        }

        Some(item)
    }

    /// Converts one raw resource record. Records without an id or a recognisable kind are
    /// skipped with a warning.
    pub fn resource_from_record(
        &self,
        record: &impl RecordSource,
        warnings: &mut Vec<DataQualityWarning>,
    ) -> Option<Resource> {
        let fields = &self.resource;
        let Some(id) = record.text(&fields.id) else {
            warnings.push(missing_field(RESOURCE_ENTITY, &fields.id));
            return None;
        };
        let raw_kind = record.text(&fields.kind).unwrap_or_default();
        let Some(kind) = parse_kind(&raw_kind) else {
            warnings.push(DataQualityWarning::InvalidRecord {
                entity: RESOURCE_ENTITY.into(),
                detail: format!("resource {id} has unknown kind '{raw_kind}'"),
            });
            return None;
        };

        let capacity = match kind {
            ResourceKind::Person => 1,
            ResourceKind::Equipment | ResourceKind::Subcontractor => {
                match record.text(&fields.quantity) {
                    Some(raw) => match parse_count(&raw) {
                        Some(quantity) => quantity,
                        None => {
                            warnings.push(DataQualityWarning::InvalidRecord {
                                entity: RESOURCE_ENTITY.into(),
                                detail: format!("resource {id} has invalid quantity '{raw}'"),
                            });
                            0
                        }
                    },
                    None => 1,
                }
            }
        };

        let mut resource = Resource::new(id, kind, capacity);
        resource.name = record.text(&fields.name).unwrap_or_default();
        resource.active = record.flag(&fields.active).unwrap_or(true);
        Some(resource)
    }

    /// Converts one raw allocation record. Both period dates are required; the period is
    /// kept even when empty so the calculators can report it.
    pub fn allocation_from_record(
        &self,
        record: &impl RecordSource,
        warnings: &mut Vec<DataQualityWarning>,
    ) -> Option<Allocation> {
        let fields = &self.allocation;
        let Some(item_id) = record.text(&fields.schedule_item_id) else {
            warnings.push(missing_field(ALLOCATION_ENTITY, &fields.schedule_item_id));
            return None;
        };
        let Some(resource_id) = record.text(&fields.resource_id) else {
            warnings.push(missing_field(ALLOCATION_ENTITY, &fields.resource_id));
            return None;
        };

        let start = read_date(record, &fields.start, DateField::AllocationStart, &item_id, warnings);
        let end = read_date(record, &fields.end, DateField::AllocationEnd, &item_id, warnings);
        let (Some(start), Some(end)) = (start, end) else {
            for (field_name, field) in [
                (&fields.start, DateField::AllocationStart),
                (&fields.end, DateField::AllocationEnd),
            ] {
                if record.text(field_name).is_none() {
                    warnings.push(DataQualityWarning::MissingDate {
                        item_id: item_id.clone(),
                        field,
                    });
                }
            }
            return None;
        };

        let quantity = match record.text(&fields.quantity) {
            None => 1,
            Some(raw) => match parse_count(&raw) {
                Some(quantity) if quantity >= 1 => quantity,
                _ => {
                    warnings.push(DataQualityWarning::InvalidRecord {
                        entity: ALLOCATION_ENTITY.into(),
                        detail: format!(
                            "allocation of {resource_id} to {item_id} has invalid quantity '{raw}'"
                        ),
                    });
                    1
                }
            },
        };

        Some(Allocation::new(
            item_id,
            resource_id,
            quantity,
            Period::new(start, end),
        ))
    }
}

fn missing_field(entity: &str, field: &str) -> DataQualityWarning {
    DataQualityWarning::InvalidRecord {
        entity: entity.into(),
        detail: format!("record has no '{field}'"),
    }
}

/// Absent fields are silent here; validation reports missing dates once per item.
fn read_date(
    record: &impl RecordSource,
    field_name: &str,
    field: DateField,
    item_id: &str,
    warnings: &mut Vec<DataQualityWarning>,
) -> Option<NaiveDate> {
    let raw = record.text(field_name)?;
    let parsed = parse_date(&raw);
    if parsed.is_none() {
        warnings.push(DataQualityWarning::MalformedDate {
            item_id: item_id.to_string(),
            field,
            raw,
        });
    }
    parsed
}

/// Accepts `2024-01-31`, `2024/01/31`, `2024年1月31日` and RFC 3339 timestamps.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    for format in ["%Y-%m-%d", "%Y/%m/%d", "%Y年%m月%d日"] {
        if let Ok(date) = NaiveDate::parse_from_str(input, format) {
            return Some(date);
        }
    }
    DateTime::parse_from_rfc3339(input)
        .ok()
        .map(|timestamp| timestamp.date_naive())
}

/// Parses a percentage, clamping into `0..=100`. The flag is false when clamping or a
/// parse failure occurred.
pub fn parse_progress(input: &str) -> (u8, bool) {
    let cleaned = input.trim().trim_end_matches(['%', '％']).trim();
    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => {
            let clamped = value.clamp(0.0, 100.0);
            (clamped.round() as u8, clamped == value)
        }
        _ => (0, false),
    }
}

pub fn parse_status(input: &str) -> Option<Status> {
    let input = input.trim();
    input.to_ascii_lowercase().parse::<Status>().ok().or(match input {
        "未着手" => Some(Status::NotStarted),
        "進行中" | "作業中" => Some(Status::InProgress),
        "遅延" => Some(Status::Delayed),
        "完了" => Some(Status::Completed),
        "保留" | "中断" => Some(Status::OnHold),
        _ => None,
    })
}

pub fn parse_kind(input: &str) -> Option<ResourceKind> {
    match input.trim().to_ascii_lowercase().as_str() {
        "person" | "人員" | "担当者" | "作業員" => Some(ResourceKind::Person),
        "equipment" | "機材" | "重機" => Some(ResourceKind::Equipment),
        "subcontractor" | "協力会社" | "外注" => Some(ResourceKind::Subcontractor),
        _ => None,
    }
}

fn parse_tier(input: &str) -> Option<WbsTier> {
    match input.trim().to_ascii_lowercase().as_str() {
        "large" | "大" | "大工程" => Some(WbsTier::Large),
        "medium" | "中" | "中工程" => Some(WbsTier::Medium),
        "small" | "小" | "小工程" => Some(WbsTier::Small),
        _ => None,
    }
}

fn parse_count(input: &str) -> Option<u32> {
    let input = input.trim();
    input.parse::<u32>().ok().or_else(|| {
        input
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite() && *value >= 0.0 && value.fract() == 0.0)
            .map(|value| value.min(f64::from(u32::MAX)) as u32)
    })
}

pub(crate) fn parse_flag(input: &str) -> Option<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "はい" | "○" | "有" => Some(true),
        "false" | "0" | "no" | "n" | "いいえ" | "×" | "無" => Some(false),
        _ => None,
    }
}

pub(crate) fn split_list(input: &str) -> Vec<String> {
    input
        .split([',', ';', '、', '\n'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn to_set(values: Vec<String>) -> BTreeSet<String> {
    values.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn date_formats() {
        assert_eq!(parse_date("2024-03-05"), Some(d(2024, 3, 5)));
        assert_eq!(parse_date("2024/03/05"), Some(d(2024, 3, 5)));
        assert_eq!(parse_date("2024年3月5日"), Some(d(2024, 3, 5)));
        assert_eq!(parse_date("2024-03-05T09:00:00+09:00"), Some(d(2024, 3, 5)));
        assert_eq!(parse_date("next tuesday"), None);
    }

    #[test]
    fn progress_is_clamped_and_flagged() {
        assert_eq!(parse_progress("45"), (45, true));
        assert_eq!(parse_progress("45.6%"), (46, true));
        assert_eq!(parse_progress("130"), (100, false));
        assert_eq!(parse_progress("-3"), (0, false));
        assert_eq!(parse_progress("half"), (0, false));
    }

    #[test]
    fn japanese_item_record_converts() {
        let fields = FieldMap::default();
        let raw = record(&[
            ("レコードID", "101"),
            ("親工程", "100"),
            ("契約", "C-1"),
            ("工程名", "基礎工事"),
            ("階層", "中"),
            ("開始予定日", "2024/04/01"),
            ("終了予定日", "2024-04-30"),
            ("進捗率", "40%"),
            ("ステータス", "進行中"),
            ("担当者", "p1、p2"),
            ("使用機材", "crane"),
            ("マイルストーン", "はい"),
        ]);
        let mut warnings = Vec::new();
        let item = fields.item_from_record(&raw, &mut warnings).unwrap();

        assert!(warnings.is_empty());
        assert_eq!(item.id, "101");
        assert_eq!(item.parent_id.as_deref(), Some("100"));
        assert_eq!(item.owner_contract_id, "C-1");
        assert_eq!(item.tier, Some(WbsTier::Medium));
        assert_eq!(item.planned_window(), Some((d(2024, 4, 1), d(2024, 4, 30))));
        assert_eq!(item.progress, 40);
        assert_eq!(item.status, Status::InProgress);
        assert!(item.is_assigned_to_person("p2"));
        assert!(item.is_assigned_to_equipment("crane"));
        assert!(item.milestone);
        assert!(!item.critical_path);
        assert!(item.hold.is_none());
    }

    #[test]
    fn malformed_values_become_warnings() {
        let fields = FieldMap::default();
        let raw = record(&[
            ("レコードID", "7"),
            ("開始予定日", "someday"),
            ("進捗率", "150"),
            ("ステータス", "unknown"),
        ]);
        let mut warnings = Vec::new();
        let item = fields.item_from_record(&raw, &mut warnings).unwrap();

        assert_eq!(item.planned_start, None);
        assert_eq!(item.progress, 100);
        assert_eq!(item.status, Status::NotStarted);
        assert_eq!(warnings.len(), 3);
        assert!(matches!(
            warnings[0],
            DataQualityWarning::MalformedDate {
                field: DateField::PlannedStart,
                ..
            }
        ));
    }

    #[test]
    fn record_without_id_is_skipped() {
        let mut warnings = Vec::new();
        let item = FieldMap::default().item_from_record(&record(&[("工程名", "x")]), &mut warnings);
        assert!(item.is_none());
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn on_hold_status_sets_marker() {
        let raw = record(&[
            ("id", "t1"),
            ("progress", "30"),
            ("status", "on_hold"),
        ]);
        let mut warnings = Vec::new();
        let item = FieldMap::identity()
            .item_from_record(&raw, &mut warnings)
            .unwrap();
        assert_eq!(item.hold, Some(HoldMarker { progress_at_hold: 30 }));
    }

    #[test]
    fn resource_capacity_by_kind() {
        let fields = FieldMap::default();
        let mut warnings = Vec::new();
        let person = fields
            .resource_from_record(
                &record(&[("レコードID", "p1"), ("種別", "人員"), ("数量", "5")]),
                &mut warnings,
            )
            .unwrap();
        let crane = fields
            .resource_from_record(
                &record(&[("レコードID", "crane"), ("種別", "機材"), ("数量", "3"), ("有効", "0")]),
                &mut warnings,
            )
            .unwrap();
        assert!(warnings.is_empty());
        assert_eq!(person.capacity, 1);
        assert_eq!(crane.capacity, 3);
        assert!(!crane.active);

        let unknown = fields.resource_from_record(
            &record(&[("レコードID", "x"), ("種別", "robot")]),
            &mut warnings,
        );
        assert!(unknown.is_none());
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn allocation_requires_both_dates() {
        let fields = FieldMap::default();
        let mut warnings = Vec::new();
        let allocation = fields
            .allocation_from_record(
                &record(&[
                    ("工程", "t1"),
                    ("リソース", "crane"),
                    ("数量", "2"),
                    ("開始日", "2024-01-01"),
                    ("終了日", "2024-01-10"),
                ]),
                &mut warnings,
            )
            .unwrap();
        assert_eq!(allocation.quantity, 2);
        assert_eq!(allocation.period.days(), 9);

        let partial = fields.allocation_from_record(
            &record(&[("工程", "t1"), ("リソース", "crane"), ("開始日", "2024-01-01")]),
            &mut warnings,
        );
        assert!(partial.is_none());
        assert!(matches!(
            warnings.as_slice(),
            [DataQualityWarning::MissingDate {
                field: DateField::AllocationEnd,
                ..
            }]
        ));
    }
}
