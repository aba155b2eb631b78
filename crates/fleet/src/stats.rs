use std::collections::{HashMap, HashSet};

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use opsconsole_core::FleetId;

use crate::{Fleet, FleetCondition, FleetIssue, FleetStatus, MaintenanceRecord};

pub const DEFAULT_DUE_WITHIN_DAYS: i64 = 7;
const RECENT_ACTIVITY_LIMIT: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FleetStats {
    pub total: usize,
    pub operational: usize,
    pub under_maintenance: usize,
    pub out_of_service: usize,
    pub waiting_parts: usize,
    pub with_open_issues: usize,
    pub open_issues: usize,
    pub services_this_month: usize,
    pub services_due_soon: usize,
    pub services_overdue: usize,
}

/// Latest record (by service date) carrying a due date, per fleet.
fn next_due_by_fleet(records: &[MaintenanceRecord]) -> HashMap<FleetId, &MaintenanceRecord> {
    let mut latest: HashMap<FleetId, &MaintenanceRecord> = HashMap::new();
    for r in records.iter().filter(|r| r.next_service_due.is_some()) {
        latest
            .entry(r.fleet_id)
            .and_modify(|cur| {
                if r.maintenance_date > cur.maintenance_date {
                    *cur = r;
                }
            })
            .or_insert(r);
    }
    latest
}

pub fn fleet_stats(
    fleets: &[Fleet],
    issues: &[FleetIssue],
    records: &[MaintenanceRecord],
    today: NaiveDate,
    due_within_days: i64,
) -> FleetStats {
    let mut stats = FleetStats {
        total: fleets.len(),
        ..Default::default()
    };

    for f in fleets {
        match f.status {
            FleetStatus::Operational => stats.operational += 1,
            FleetStatus::UnderMaintenance => stats.under_maintenance += 1,
            FleetStatus::OutOfService => stats.out_of_service += 1,
        }
        if f.condition == Some(FleetCondition::WaitingParts) {
            stats.waiting_parts += 1;
        }
    }

    let open: Vec<&FleetIssue> = issues.iter().filter(|i| !i.is_resolved).collect();
    stats.open_issues = open.len();
    stats.with_open_issues = open.iter().map(|i| i.fleet_id).collect::<HashSet<_>>().len();

    stats.services_this_month = records
        .iter()
        .filter(|r| {
            r.maintenance_date.year() == today.year() && r.maintenance_date.month() == today.month()
        })
        .count();

    let horizon = today + Duration::days(due_within_days.max(0));
    for r in next_due_by_fleet(records).values() {
        if let Some(due) = r.next_service_due {
            if due < today {
                stats.services_overdue += 1;
            } else if due <= horizon {
                stats.services_due_soon += 1;
            }
        }
    }

    stats
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaintenanceOverview {
    /// Due within the window, soonest first.
    pub upcoming: Vec<MaintenanceRecord>,
    pub overdue: Vec<MaintenanceRecord>,
    /// Most recent services, newest first.
    pub recent: Vec<MaintenanceRecord>,
}

pub fn maintenance_overview(
    records: &[MaintenanceRecord],
    today: NaiveDate,
    due_within_days: i64,
) -> MaintenanceOverview {
    let horizon = today + Duration::days(due_within_days.max(0));
    let latest = next_due_by_fleet(records);

    let mut upcoming: Vec<MaintenanceRecord> = latest
        .values()
        .filter(|r| r.next_service_due.is_some_and(|d| d >= today && d <= horizon))
        .map(|r| (*r).clone())
        .collect();
    upcoming.sort_by_key(|r| r.next_service_due);

    let mut overdue: Vec<MaintenanceRecord> = latest
        .values()
        .filter(|r| r.next_service_due.is_some_and(|d| d < today))
        .map(|r| (*r).clone())
        .collect();
    overdue.sort_by_key(|r| r.next_service_due);

    let mut recent = records.to_vec();
    recent.sort_by(|a, b| {
        b.maintenance_date
            .cmp(&a.maintenance_date)
            .then(b.created_at.cmp(&a.created_at))
    });
    recent.truncate(RECENT_ACTIVITY_LIMIT);

    MaintenanceOverview {
        upcoming,
        overdue,
        recent,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use proptest::prelude::*;

    use opsconsole_core::DepartmentId;

    use super::*;
    use crate::{NewFleet, NewMaintenanceRecord, ServiceType};

    fn fleet(dept: DepartmentId, n: usize, status: FleetStatus) -> Fleet {
        let mut f = Fleet::create(
            dept,
            NewFleet {
                fleet_number: format!("F-{n}"),
                machine_type: "Truck".into(),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();
        f.status = status;
        f
    }

    fn record(f: &Fleet, on: NaiveDate, due: Option<NaiveDate>) -> MaintenanceRecord {
        MaintenanceRecord::create(
            f,
            NewMaintenanceRecord {
                fleet_id: f.id,
                service_type: ServiceType::Preventive,
                maintenance_date: on,
                service_description: "service".into(),
                machine_hours: None,
                next_service_due: due,
                condition_after_service: None,
                delivery_time_hours: None,
                operator_id: None,
                checked_by: None,
                current_status: None,
                remarks: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn only_the_latest_due_date_per_fleet_counts() {
        let dept = DepartmentId::new();
        let f = fleet(dept, 1, FleetStatus::Operational);
        let today = d(2026, 5, 20);
        // Older record was overdue, the newer one moved the due date out.
        let records = vec![
            record(&f, d(2026, 4, 1), Some(d(2026, 5, 1))),
            record(&f, d(2026, 5, 18), Some(d(2026, 5, 25))),
        ];
        let stats = fleet_stats(&[f], &[], &records, today, DEFAULT_DUE_WITHIN_DAYS);
        assert_eq!(stats.services_overdue, 0);
        assert_eq!(stats.services_due_soon, 1);
        assert_eq!(stats.services_this_month, 1);
    }

    #[test]
    fn overview_orders_recent_newest_first() {
        let f = fleet(DepartmentId::new(), 1, FleetStatus::Operational);
        let records = vec![
            record(&f, d(2026, 1, 1), None),
            record(&f, d(2026, 3, 1), None),
            record(&f, d(2026, 2, 1), None),
        ];
        let o = maintenance_overview(&records, d(2026, 3, 2), 7);
        let dates: Vec<_> = o.recent.iter().map(|r| r.maintenance_date).collect();
        assert_eq!(dates, vec![d(2026, 3, 1), d(2026, 2, 1), d(2026, 1, 1)]);
        assert!(o.upcoming.is_empty());
    }

    fn status_strategy() -> impl Strategy<Value = FleetStatus> {
        prop_oneof![
            Just(FleetStatus::Operational),
            Just(FleetStatus::UnderMaintenance),
            Just(FleetStatus::OutOfService),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

        #[test]
        fn status_counts_partition_total(statuses in prop::collection::vec(status_strategy(), 0..40)) {
            let dept = DepartmentId::new();
            let fleets: Vec<Fleet> = statuses
                .iter()
                .enumerate()
                .map(|(i, s)| fleet(dept, i, *s))
                .collect();
            let s = fleet_stats(&fleets, &[], &[], d(2026, 1, 1), 7);
            prop_assert_eq!(s.total, fleets.len());
            prop_assert_eq!(s.operational + s.under_maintenance + s.out_of_service, s.total);
        }
    }
}
