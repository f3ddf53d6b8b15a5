use chrono::Duration;
use chrono_tz::Tz;

use appointment_cell::models::{Appointment, AppointmentStatus, CalendarPeriod, CalendarViewState};
use appointment_cell::services::calendar::{workload_by_service, CalendarAggregator};

mod common;
use common::{appointment, date, utc, PATIENT};

const HIV: (&str, &str) = ("service-hiv", "HIV");
const TB: (&str, &str) = ("service-tb", "TB");

fn booked(uuid: &str, service: (&str, &str), start: chrono::DateTime<chrono::Utc>) -> Appointment {
    appointment(uuid, PATIENT, service, start, start + Duration::minutes(30), AppointmentStatus::Scheduled)
}

#[test]
fn test_daily_bucket_counts_per_service() {
    let aggregator = CalendarAggregator::new(Tz::UTC);
    let appointments = vec![
        booked("a", HIV, utc(2024, 2, 1, 9, 0)),
        booked("b", HIV, utc(2024, 2, 1, 11, 0)),
        booked("c", TB, utc(2024, 2, 1, 14, 0)),
    ];

    let buckets = aggregator.aggregate(&appointments, CalendarPeriod::Daily, date(2024, 2, 1));

    assert_eq!(buckets.len(), 1);
    let bucket = &buckets[0];
    assert_eq!(bucket.date, date(2024, 2, 1));
    assert_eq!(bucket.total, 3);
    assert_eq!(bucket.services.len(), 2);
    assert_eq!((bucket.services[0].service_name.as_str(), bucket.services[0].count), ("HIV", 2));
    assert_eq!((bucket.services[1].service_name.as_str(), bucket.services[1].count), ("TB", 1));
}

#[test]
fn test_monthly_view_has_a_bucket_for_every_date() {
    let aggregator = CalendarAggregator::new(Tz::UTC);
    let appointments = vec![
        booked("a", HIV, utc(2024, 2, 10, 9, 0)),
        booked("b", TB, utc(2024, 2, 29, 9, 0)),
    ];

    let buckets = aggregator.aggregate(&appointments, CalendarPeriod::Monthly, date(2024, 2, 15));

    assert_eq!(buckets.len(), 29);
    assert_eq!(buckets.first().unwrap().date, date(2024, 2, 1));
    assert_eq!(buckets.last().unwrap().date, date(2024, 2, 29));
    assert!(buckets.windows(2).all(|pair| pair[0].date < pair[1].date));
    assert_eq!(buckets.iter().filter(|bucket| bucket.total == 0).count(), 27);
    assert!(buckets.iter().filter(|b| b.total == 0).all(|b| b.services.is_empty()));
}

#[test]
fn test_services_keep_first_seen_order() {
    let aggregator = CalendarAggregator::new(Tz::UTC);
    let appointments = vec![
        booked("a", TB, utc(2024, 2, 1, 9, 0)),
        booked("b", HIV, utc(2024, 2, 1, 10, 0)),
        booked("c", TB, utc(2024, 2, 1, 11, 0)),
    ];

    let buckets = aggregator.aggregate(&appointments, CalendarPeriod::Daily, date(2024, 2, 1));

    let names: Vec<&str> = buckets[0].services.iter().map(|s| s.service_name.as_str()).collect();
    assert_eq!(names, vec!["TB", "HIV"]);
}

#[test]
fn test_aggregation_is_idempotent_and_sums_match() {
    let aggregator = CalendarAggregator::new(Tz::UTC);
    let appointments = vec![
        booked("a", HIV, utc(2024, 1, 29, 9, 0)),
        booked("b", TB, utc(2024, 1, 31, 9, 0)),
        booked("c", HIV, utc(2024, 2, 3, 9, 0)),
        // outside the week of 2024-02-01
        booked("d", HIV, utc(2024, 2, 4, 9, 0)),
    ];

    let first = aggregator.aggregate(&appointments, CalendarPeriod::Weekly, date(2024, 2, 1));
    let second = aggregator.aggregate(&appointments, CalendarPeriod::Weekly, date(2024, 2, 1));

    assert_eq!(first, second);
    assert_eq!(first.len(), 7);
    assert_eq!(first.iter().map(|b| b.total).sum::<u32>(), 3);
    for bucket in &first {
        assert_eq!(bucket.total, bucket.services.iter().map(|s| s.count).sum::<u32>());
    }
}

#[test]
fn test_cancelled_appointments_are_counted() {
    let aggregator = CalendarAggregator::new(Tz::UTC);
    let mut cancelled = booked("a", HIV, utc(2024, 2, 1, 9, 0));
    cancelled.status = AppointmentStatus::Cancelled;

    let buckets = aggregator.aggregate(&[cancelled], CalendarPeriod::Daily, date(2024, 2, 1));

    assert_eq!(buckets[0].total, 1);
}

#[test]
fn test_dates_follow_the_view_timezone() {
    let nairobi: Tz = "Africa/Nairobi".parse().unwrap();
    let aggregator = CalendarAggregator::new(Tz::UTC);
    // 22:30 UTC on Feb 1 is already Feb 2 in Nairobi
    let appointments = vec![booked("a", HIV, utc(2024, 2, 1, 22, 30))];
    let view = CalendarViewState {
        period: CalendarPeriod::Weekly,
        reference_date: date(2024, 2, 1),
        timezone: nairobi,
    };

    let local = aggregator.aggregate_view(&appointments, &view);
    let in_utc = aggregator.aggregate(&appointments, CalendarPeriod::Weekly, date(2024, 2, 1));

    let busy = |buckets: &[appointment_cell::models::CalendarBucket]| {
        buckets.iter().find(|b| b.total > 0).map(|b| b.date)
    };
    assert_eq!(busy(&local), Some(date(2024, 2, 2)));
    assert_eq!(busy(&in_utc), Some(date(2024, 2, 1)));
}

#[test]
fn test_workload_sums_services_across_buckets() {
    let aggregator = CalendarAggregator::new(Tz::UTC);
    let appointments = vec![
        booked("a", HIV, utc(2024, 2, 5, 9, 0)),
        booked("b", TB, utc(2024, 2, 6, 9, 0)),
        booked("c", HIV, utc(2024, 2, 20, 9, 0)),
    ];

    let buckets = aggregator.aggregate(&appointments, CalendarPeriod::Monthly, date(2024, 2, 1));
    let workload = workload_by_service(&buckets);

    assert_eq!(workload.len(), 2);
    assert_eq!((workload[0].service_uuid.as_str(), workload[0].count), ("service-hiv", 2));
    assert_eq!((workload[1].service_uuid.as_str(), workload[1].count), ("service-tb", 1));
}

#[test]
fn test_view_state_round_trips_as_snapshot() {
    let view = CalendarViewState {
        period: CalendarPeriod::Monthly,
        reference_date: date(2024, 2, 1),
        timezone: "Asia/Kolkata".parse().unwrap(),
    };

    let snapshot = serde_json::to_string(&view).unwrap();
    assert!(snapshot.contains("\"monthly\""));
    assert_eq!(serde_json::from_str::<CalendarViewState>(&snapshot).unwrap(), view);
}

#[test]
fn test_windows_at_calendar_limits_are_clamped() {
    let (start, end) = CalendarPeriod::Weekly.window(chrono::NaiveDate::MIN);
    assert_eq!(start, chrono::NaiveDate::MIN);
    assert!(end > start && end <= chrono::NaiveDate::MIN + Duration::days(6));

    let (start, end) = CalendarPeriod::Weekly.window(chrono::NaiveDate::MAX);
    assert!(start < end && start >= chrono::NaiveDate::MAX - Duration::days(6));
    assert_eq!(end, chrono::NaiveDate::MAX);

    let last_month = chrono::NaiveDate::MAX - Duration::days(10);
    assert_eq!(CalendarPeriod::Monthly.window(last_month).1, chrono::NaiveDate::MAX);
}
