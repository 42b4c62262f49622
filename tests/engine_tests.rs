use chrono::NaiveDate;
use schedule_engine::{
    AlertConfig, AlertKind, Allocation, EngineConfig, GanttRoot, GanttScope, InMemoryRepository,
    ItemFilter, Period, Resource, ScheduleEngine, ScheduleItem, ScheduleSnapshot, Status,
    WeightingStrategy,
};
use tracing_subscriber::EnvFilter;

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Contract c1: L1 -> {M1 (10 days, 100%), M2 (30 days, 0%)}, plus one item on c2.
fn snapshot() -> ScheduleSnapshot {
    let mut m1 = ScheduleItem::new("M1", "Foundations", "c1")
        .with_parent("L1")
        .with_planned_period(d(2024, 5, 1), d(2024, 5, 11))
        .with_progress(100);
    m1.assigned_person_ids.insert("p1".into());

    let mut m2 = ScheduleItem::new("M2", "Frame", "c1")
        .with_parent("L1")
        .with_planned_period(d(2024, 5, 11), d(2024, 6, 10));
    m2.assigned_person_ids.insert("p1".into());
    m2.milestone = true;

    let late = ScheduleItem::new("Z1", "Late survey", "c2")
        .with_planned_period(d(2024, 4, 1), d(2024, 5, 1))
        .with_progress(50);

    ScheduleSnapshot {
        items: vec![
            ScheduleItem::new("L1", "Building", "c1")
                .with_planned_period(d(2024, 5, 1), d(2024, 6, 10)),
            m1,
            m2,
            late,
        ],
        resources: vec![Resource::person("p1"), Resource::equipment("pump", 1)],
        allocations: vec![
            Allocation::new("M1", "p1", 1, Period::new(d(2024, 5, 1), d(2024, 5, 11))),
            Allocation::new("M2", "p1", 1, Period::new(d(2024, 5, 11), d(2024, 6, 10))),
            Allocation::new("M1", "pump", 1, Period::new(d(2024, 5, 1), d(2024, 5, 20))),
            Allocation::new("Z1", "pump", 1, Period::new(d(2024, 5, 15), d(2024, 5, 25))),
        ],
    }
}

fn engine(config: EngineConfig) -> ScheduleEngine<InMemoryRepository> {
    ScheduleEngine::new(InMemoryRepository::new(snapshot()), config)
}

#[test]
fn weighting_follows_configuration() {
    init_tracing();
    let equal = engine(EngineConfig::default())
        .progress(&ItemFilter::contract("c1"))
        .unwrap();
    assert_eq!(equal.progress_of("L1"), Some(50));

    let weighted = engine(EngineConfig {
        weighting: WeightingStrategy::DurationWeighted,
        ..EngineConfig::default()
    })
    .progress(&ItemFilter::contract("c1"))
    .unwrap();
    // 10 days at 100% against 30 days at 0%
    assert_eq!(weighted.progress_of("L1"), Some(25));
}

#[test]
fn person_progress_keeps_unassigned_parent_links() {
    init_tracing();
    let filter = ItemFilter {
        person_id: Some("p1".into()),
        ..ItemFilter::default()
    };
    let tree = engine(EngineConfig::default()).progress(&filter).unwrap();

    let ids: Vec<&str> = tree.nodes.iter().map(|node| node.item_id.as_str()).collect();
    assert_eq!(ids, vec!["M1", "M2"]);
    assert_eq!(tree.get("M1").unwrap().parent_id.as_deref(), Some("L1"));
    assert_eq!(tree.roots, vec!["M1".to_string(), "M2".to_string()]);
    assert!(tree.warnings.is_empty());
}

#[test]
fn person_view_flattens_unassigned_ancestors() {
    init_tracing();
    let root = GanttRoot::new(GanttScope::Person("p1".into()));
    let view = engine(EngineConfig::default())
        .gantt_view(&root, d(2024, 5, 20))
        .unwrap();

    let ids: Vec<&str> = view.rows.iter().map(|row| row.item_id.as_str()).collect();
    assert_eq!(ids, vec!["M1", "M2"]);
    assert!(view.rows.iter().all(|row| row.parent_id.is_none() && row.depth == 0));
    assert_eq!(view.row("M1").unwrap().status, Status::Completed);
    assert_eq!(view.summary.planned_start, Some(d(2024, 5, 1)));
    assert_eq!(view.summary.planned_end, Some(d(2024, 6, 10)));
    assert_eq!(view.summary.total_duration_days, 40);
    assert_eq!(view.summary.elapsed_days, 19);
    assert_eq!(view.summary.remaining_days, 21);
    assert_eq!(view.summary.pending_milestones, 1);
}

#[test]
fn batch_views_match_single_views() {
    init_tracing();
    let engine = engine(EngineConfig::default());
    let roots = vec![
        GanttRoot::new(GanttScope::Contract("c1".into())),
        GanttRoot::new(GanttScope::Contract("c2".into())),
    ];
    let as_of = d(2024, 5, 20);
    let views = engine.gantt_views(&roots, as_of).unwrap();

    assert_eq!(views.len(), 2);
    for (root, view) in roots.iter().zip(&views) {
        let single = engine.gantt_view(root, as_of).unwrap();
        assert_eq!(view.rows, single.rows);
        assert_eq!(view.summary, single.summary);
    }
}

#[test]
fn alerts_use_configured_window() {
    init_tracing();
    let config = EngineConfig {
        alerts: AlertConfig {
            delay_threshold_days: 3,
            upcoming_days: 30,
        },
        ..EngineConfig::default()
    };
    let report = engine(config)
        .alerts(&ItemFilter::all(), d(2024, 5, 20))
        .unwrap();

    let kinds: Vec<(&str, AlertKind)> = report
        .alerts
        .iter()
        .map(|alert| (alert.item_id.as_str(), alert.kind))
        .collect();
    // Overdue survey first, then the parent and the milestone both due on 2024-06-10
    assert_eq!(
        kinds,
        vec![
            ("Z1", AlertKind::Overdue),
            ("L1", AlertKind::UpcomingDeadline),
            ("M2", AlertKind::MilestoneApproaching),
        ]
    );
}

#[test]
fn resource_reports_run_per_resource() {
    init_tracing();
    let ids = vec!["p1".to_string(), "pump".to_string()];
    let reports = engine(EngineConfig::default())
        .resource_reports(&ids, d(2024, 5, 16))
        .unwrap();

    assert_eq!(reports.len(), 2);
    let person = &reports[0];
    assert_eq!(person.availability.in_use, 1);
    assert!(person.conflicts.is_empty());

    let pump = &reports[1];
    assert_eq!(pump.availability.in_use, 2);
    assert_eq!(pump.availability.available, -1);
    assert_eq!(pump.conflicts.len(), 1);
    assert_eq!(pump.conflicts[0].period_start, d(2024, 5, 15));
    assert_eq!(pump.conflicts[0].period_end, d(2024, 5, 20));
}
