use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Person,
    Equipment,
    Subcontractor,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Person => "person",
            ResourceKind::Equipment => "equipment",
            ResourceKind::Subcontractor => "subcontractor",
        }
    }
}

/// A person, piece of equipment, or subcontractor that can be committed to schedule items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub kind: ResourceKind,
    /// Display name. Empty when the source record carries none.
    #[serde(default)]
    pub name: String,
    /// Units available at once: 1 for a person, the owned quantity for equipment.
    pub capacity: u32,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Resource {
    pub fn new(id: impl Into<String>, kind: ResourceKind, capacity: u32) -> Self {
        Self {
            id: id.into(),
            kind,
            name: String::new(),
            capacity,
            active: true,
        }
    }

    pub fn person(id: impl Into<String>) -> Self {
        Self::new(id, ResourceKind::Person, 1)
    }

    pub fn equipment(id: impl Into<String>, quantity: u32) -> Self {
        Self::new(id, ResourceKind::Equipment, quantity)
    }
}

/// Half-open date interval `[start, end)`.
///
/// An allocation ending on a day and another starting on that same day do not overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    pub fn overlaps(&self, other: &Period) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days().max(0)
    }
}

/// A quantity of a resource committed to a schedule item for a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub schedule_item_id: String,
    pub resource_id: String,
    /// Units committed. Expected to be at least 1.
    pub quantity: u32,
    pub period: Period,
}

impl Allocation {
    pub fn new(
        schedule_item_id: impl Into<String>,
        resource_id: impl Into<String>,
        quantity: u32,
        period: Period,
    ) -> Self {
        Self {
            schedule_item_id: schedule_item_id.into(),
            resource_id: resource_id.into(),
            quantity,
            period,
        }
    }

    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.period.contains(date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn period_is_half_open() {
        let period = Period::new(d(2024, 1, 1), d(2024, 1, 5));
        assert!(period.contains(d(2024, 1, 1)));
        assert!(period.contains(d(2024, 1, 4)));
        assert!(!period.contains(d(2024, 1, 5)));
        assert_eq!(period.days(), 4);
    }

    #[test]
    fn touching_periods_do_not_overlap() {
        let first = Period::new(d(2024, 1, 1), d(2024, 1, 5));
        let second = Period::new(d(2024, 1, 5), d(2024, 1, 9));
        let third = Period::new(d(2024, 1, 4), d(2024, 1, 6));
        assert!(!first.overlaps(&second));
        assert!(first.overlaps(&third));
        assert!(second.overlaps(&third));
    }

    #[test]
    fn resource_deserializes_active_by_default() {
        let resource: Resource =
            serde_json::from_str(r#"{"id":"crane-1","kind":"equipment","capacity":2}"#).unwrap();
        assert!(resource.active);
        assert_eq!(resource.kind, ResourceKind::Equipment);
        assert_eq!(resource.capacity, 2);
    }
}
