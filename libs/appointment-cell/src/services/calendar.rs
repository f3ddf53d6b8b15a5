// libs/appointment-cell/src/services/calendar.rs
use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate};
use chrono_tz::Tz;
use tracing::debug;

use crate::models::{
    Appointment, CalendarBucket, CalendarPeriod, CalendarViewState, DailyServiceCount,
};

/// Identity of the synthetic drill-down entry holding a bucket's total.
pub const TOTAL_SERVICE_UUID: &str = "total";
pub const TOTAL_SERVICE_NAME: &str = "Total";

impl CalendarPeriod {
    /// Inclusive date window: the day itself, its Sunday-Saturday week, or its calendar month.
    pub fn window(&self, reference: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            CalendarPeriod::Daily => (reference, reference),
            CalendarPeriod::Weekly => {
                // Weeks cut by the representable range are clamped to it.
                let offset = i64::from(reference.weekday().num_days_from_sunday());
                let start = reference.checked_sub_signed(Duration::days(offset)).unwrap_or(NaiveDate::MIN);
                let end = reference.checked_add_signed(Duration::days(6 - offset)).unwrap_or(NaiveDate::MAX);
                (start, end)
            }
            CalendarPeriod::Monthly => {
                let start = reference.with_day(1).unwrap_or(reference);
                let next_month = if start.month() == 12 {
                    NaiveDate::from_ymd_opt(start.year() + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(start.year(), start.month() + 1, 1)
                };
                let end = next_month
                    .and_then(|first| first.pred_opt())
                    .unwrap_or(NaiveDate::MAX);
                (start, end)
            }
        }
    }
}

impl CalendarBucket {
    fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            services: Vec::new(),
            total: 0,
        }
    }

    fn record(&mut self, service_uuid: &str, service_name: &str) {
        match self.services.iter_mut().find(|entry| entry.service_uuid == service_uuid) {
            Some(entry) => entry.count += 1,
            None => self.services.push(DailyServiceCount {
                service_uuid: service_uuid.to_string(),
                service_name: service_name.to_string(),
                count: 1,
            }),
        }
        self.total += 1;
    }

    /// Services followed by a synthetic "Total" entry, as shown in drill-down views.
    pub fn drill_down(&self) -> Vec<DailyServiceCount> {
        let mut entries = self.services.clone();
        entries.push(DailyServiceCount {
            service_uuid: TOTAL_SERVICE_UUID.to_string(),
            service_name: TOTAL_SERVICE_NAME.to_string(),
            count: self.total,
        });
        entries
    }
}

/// Buckets appointment counts by start date and service for calendar views.
pub struct CalendarAggregator {
    tz: Tz,
}

impl CalendarAggregator {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// One bucket per date of the period window, including empty dates, in ascending order.
    /// Appointments starting outside the window are ignored.
    pub fn aggregate(
        &self,
        appointments: &[Appointment],
        period: CalendarPeriod,
        reference_date: NaiveDate,
    ) -> Vec<CalendarBucket> {
        let (window_start, window_end) = period.window(reference_date);

        let mut buckets: Vec<CalendarBucket> = window_start
            .iter_days()
            .take_while(|date| *date <= window_end)
            .map(CalendarBucket::empty)
            .collect();

        for appointment in appointments {
            let date = appointment.start_date(&self.tz);
            if date < window_start || date > window_end {
                continue;
            }
            let index = (date - window_start).num_days() as usize;
            if let Some(bucket) = buckets.get_mut(index) {
                bucket.record(&appointment.service.uuid, &appointment.service.name);
            }
        }

        debug!("Aggregated {} appointments into {} {:?} buckets from {}",
               appointments.len(), buckets.len(), period, window_start);

        buckets
    }

    /// Aggregate for a caller-held view selection; the state's own zone takes precedence.
    pub fn aggregate_view(&self, appointments: &[Appointment], state: &CalendarViewState) -> Vec<CalendarBucket> {
        CalendarAggregator::new(state.timezone).aggregate(appointments, state.period, state.reference_date)
    }
}

/// Per-service totals across buckets, in first-seen order.
pub fn workload_by_service(buckets: &[CalendarBucket]) -> Vec<DailyServiceCount> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut totals: Vec<DailyServiceCount> = Vec::new();

    for entry in buckets.iter().flat_map(|bucket| bucket.services.iter()) {
        match positions.get(entry.service_uuid.as_str()) {
            Some(&index) => totals[index].count += entry.count,
            None => {
                positions.insert(entry.service_uuid.as_str(), totals.len());
                totals.push(entry.clone());
            }
        }
    }

    totals
}
