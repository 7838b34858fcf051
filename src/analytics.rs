// Usage and spending statistics over the collected reservations and financials
// Pure computation: everything here works on data that is already in memory

use crate::config::Thresholds;
use crate::models::{Bill, Financials, Reservation, Voucher};
use chrono::{DateTime, Datelike, Utc};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use thiserror::Error;
use tracing::info;

pub const CURRENCY: &str = "DKK";

#[derive(Error, Debug, PartialEq)]
pub enum AnalyticsError {
    #[error("invalid timestamp {0}")]
    InvalidTimestamp(i64),

    #[error("trip duration overflows: start {start}, end {end}")]
    DurationOverflow { start: i64, end: i64 },

    #[error("failed to calculate length of trip for {plate}: {source}")]
    Trip {
        plate: String,
        #[source]
        source: Box<AnalyticsError>,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsageSummary {
    pub total_reservations: usize,
    pub unique_vehicles: usize,
    pub long_trip_minutes: i64,
    pub pay_per_minute_minutes: i64,
    // Ordered by year
    pub minutes_per_year: BTreeMap<i32, i64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinancialSummary {
    pub total_bills: usize,
    pub total_vouchers: usize,
    pub total_spent: f64,
    pub free_minutes: f64,
    pub purchased_minutes: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateReport {
    pub usage: UsageSummary,
    pub financial: FinancialSummary,
}

// Whole minutes between the two epochs, rounded towards negative infinity
pub fn trip_minutes(start: i64, end: i64) -> Result<i64, AnalyticsError> {
    let seconds = end
        .checked_sub(start)
        .ok_or(AnalyticsError::DurationOverflow { start, end })?;
    Ok(seconds.div_euclid(60))
}

fn year_of(epoch: i64) -> Result<i32, AnalyticsError> {
    DateTime::<Utc>::from_timestamp(epoch, 0)
        .map(|at| at.year())
        .ok_or(AnalyticsError::InvalidTimestamp(epoch))
}

pub fn summarize_usage(
    reservations: &[Reservation],
    thresholds: &Thresholds,
) -> Result<UsageSummary, AnalyticsError> {
    let mut summary = UsageSummary {
        total_reservations: reservations.len(),
        ..UsageSummary::default()
    };
    let mut plates = HashSet::new();

    for reservation in reservations {
        plates.insert(reservation.plate.as_str());

        let minutes = trip_minutes(reservation.start, reservation.end).map_err(|source| {
            AnalyticsError::Trip {
                plate: reservation.plate.clone(),
                source: Box::new(source),
            }
        })?;
        // Zero or negative durations contribute nothing
        if minutes <= 0 {
            continue;
        }

        let year = year_of(reservation.start).map_err(|source| AnalyticsError::Trip {
            plate: reservation.plate.clone(),
            source: Box::new(source),
        })?;
        let overflow = || AnalyticsError::Trip {
            plate: reservation.plate.clone(),
            source: Box::new(AnalyticsError::DurationOverflow {
                start: reservation.start,
                end: reservation.end,
            }),
        };

        let year_total = summary.minutes_per_year.entry(year).or_insert(0);
        *year_total = year_total.checked_add(minutes).ok_or_else(overflow)?;

        let bucket = if minutes > thresholds.long_trip_minutes {
            &mut summary.long_trip_minutes
        } else {
            &mut summary.pay_per_minute_minutes
        };
        *bucket = bucket.checked_add(minutes).ok_or_else(overflow)?;
    }

    summary.unique_vehicles = plates.len();
    Ok(summary)
}

pub fn summarize_financials(
    bills: &[Bill],
    vouchers: &[Voucher],
    thresholds: &Thresholds,
) -> FinancialSummary {
    let (purchased, free): (Vec<&Voucher>, Vec<&Voucher>) = vouchers
        .iter()
        .partition(|v| v.value > thresholds.purchased_voucher_value);

    FinancialSummary {
        total_bills: bills.len(),
        total_vouchers: vouchers.len(),
        total_spent: bills.iter().map(|b| b.amount).sum(),
        free_minutes: free.iter().map(|v| v.value).sum(),
        purchased_minutes: purchased.iter().map(|v| v.value).sum(),
    }
}

// Runs both passes; any failure aborts without a partial report
pub fn calculate(
    reservations: &[Reservation],
    financials: &Financials,
    thresholds: &Thresholds,
) -> anyhow::Result<AggregateReport> {
    use anyhow::Context;

    let usage = summarize_usage(reservations, thresholds)
        .context("failed to calculate data from reservations")?;
    let financial = summarize_financials(&financials.bills, &financials.vouchers, thresholds);

    info!(
        reservations = usage.total_reservations,
        bills = financial.total_bills,
        vouchers = financial.total_vouchers,
        "statistics calculated"
    );
    Ok(AggregateReport { usage, financial })
}

impl fmt::Display for AggregateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let usage = &self.usage;
        writeln!(f, "Total reservations: {}", usage.total_reservations)?;
        writeln!(f, "Unique cars: {}", usage.unique_vehicles)?;
        writeln!(f, "Minutes driven during trips: {}", usage.long_trip_minutes)?;
        writeln!(
            f,
            "Minutes driven paying per minute: {}",
            usage.pay_per_minute_minutes
        )?;
        writeln!(f, "Minutes driven overall per year:")?;
        for (year, minutes) in &usage.minutes_per_year {
            writeln!(f, "- {}: {}", year, minutes)?;
        }

        let financial = &self.financial;
        writeln!(f, "Total invoices: {}", financial.total_bills)?;
        writeln!(f, "Total vouchers: {}", financial.total_vouchers)?;
        writeln!(
            f,
            "Total spent: {:.2} {}",
            financial.total_spent, CURRENCY
        )?;
        writeln!(f, "Total free minutes: {}", financial.free_minutes)?;
        write!(f, "Total bought minutes: {}", financial.purchased_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use test_case::test_case;

    fn reservation(plate: &str, start: i64, end: i64) -> Reservation {
        Reservation {
            plate: plate.to_string(),
            start,
            end,
        }
    }

    fn voucher(value: f64) -> Voucher {
        Voucher {
            id: None,
            value,
            granted_at: Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn epoch(year: i32, month: u32, day: u32) -> i64 {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0)
            .unwrap()
            .timestamp()
    }

    #[test]
    fn test_usage_example() {
        let reservations = vec![
            reservation("AB1", 1000, 1000 + 3600),
            reservation("AB1", 2000, 2000 + 900),
            reservation("CD2", 3000, 3000),
        ];

        let summary = summarize_usage(&reservations, &Thresholds::default()).unwrap();
        assert_eq!(summary.total_reservations, 3);
        assert_eq!(summary.unique_vehicles, 2);
        assert_eq!(summary.long_trip_minutes, 0);
        assert_eq!(summary.pay_per_minute_minutes, 75);
        assert_eq!(summary.minutes_per_year.get(&1970), Some(&75));
    }

    #[test_case(60, 0, 60; "#1 one hour is pay per minute")]
    #[test_case(120, 0, 120; "#2 threshold itself is pay per minute")]
    #[test_case(121, 121, 0; "#3 above threshold is a long trip")]
    #[test_case(15, 0, 15; "#4 short trip")]
    fn test_long_trip_threshold(minutes: i64, long: i64, per_minute: i64) {
        let reservations = vec![reservation("AB1", 0, minutes * 60)];
        let summary = summarize_usage(&reservations, &Thresholds::default()).unwrap();
        assert_eq!(summary.long_trip_minutes, long);
        assert_eq!(summary.pay_per_minute_minutes, per_minute);
    }

    #[test]
    fn test_zero_and_negative_durations_are_skipped() {
        let reservations = vec![
            reservation("AB1", 5000, 5000),
            reservation("AB2", 5000, 5059),
            reservation("AB3", 5000, 4000),
        ];

        let summary = summarize_usage(&reservations, &Thresholds::default()).unwrap();
        assert_eq!(summary.total_reservations, 3);
        assert_eq!(summary.unique_vehicles, 3);
        assert_eq!(summary.long_trip_minutes + summary.pay_per_minute_minutes, 0);
        assert!(summary.minutes_per_year.is_empty());
    }

    #[test]
    fn test_minutes_are_bucketed_by_start_year() {
        let reservations = vec![
            reservation("AB1", epoch(2022, 5, 1), epoch(2022, 5, 1) + 30 * 60),
            reservation("AB2", epoch(2021, 3, 1), epoch(2021, 3, 1) + 200 * 60),
            reservation("AB1", epoch(2022, 7, 1), epoch(2022, 7, 1) + 10 * 60 + 59),
        ];

        let summary = summarize_usage(&reservations, &Thresholds::default()).unwrap();
        let years: Vec<(i32, i64)> = summary
            .minutes_per_year
            .iter()
            .map(|(y, m)| (*y, *m))
            .collect();
        assert_eq!(years, vec![(2021, 200), (2022, 40)]);
        assert_eq!(summary.long_trip_minutes, 200);
        assert_eq!(summary.pay_per_minute_minutes, 40);
        assert_eq!(summary.unique_vehicles, 2);
    }

    #[test]
    fn test_trip_split_sums_to_total_minutes() {
        let reservations: Vec<Reservation> = (0..50)
            .map(|i| reservation(&format!("P{}", i % 7), i * 1000, i * 1000 + i * 397))
            .collect();

        let summary = summarize_usage(&reservations, &Thresholds::default()).unwrap();
        let expected: i64 = reservations
            .iter()
            .map(|r| trip_minutes(r.start, r.end).unwrap())
            .filter(|m| *m > 0)
            .sum();
        assert_eq!(
            summary.long_trip_minutes + summary.pay_per_minute_minutes,
            expected
        );
        assert_eq!(summary.minutes_per_year.values().sum::<i64>(), expected);
        assert_eq!(summary.unique_vehicles, 7);
    }

    #[test]
    fn test_custom_threshold() {
        let thresholds = Thresholds {
            long_trip_minutes: 30,
            ..Thresholds::default()
        };
        let reservations = vec![reservation("AB1", 0, 45 * 60)];
        let summary = summarize_usage(&reservations, &thresholds).unwrap();
        assert_eq!(summary.long_trip_minutes, 45);
    }

    #[test]
    fn test_overflowing_duration_aborts() {
        let reservations = vec![
            reservation("AB1", 0, 600),
            reservation("BAD", i64::MIN, i64::MAX),
        ];

        let err = summarize_usage(&reservations, &Thresholds::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!(
                "failed to calculate length of trip for BAD: trip duration overflows: start {}, end {}",
                i64::MIN,
                i64::MAX
            )
        );
    }

    #[test]
    fn test_overflowing_minute_totals_abort() {
        // each trip alone is representable, their sum is not
        let reservations: Vec<Reservation> = (0..61)
            .map(|i| reservation(&format!("LONG{}", i), 0, i64::MAX))
            .collect();

        let err = summarize_usage(&reservations, &Thresholds::default()).unwrap_err();
        match err {
            AnalyticsError::Trip { plate, source } => {
                assert_eq!(plate, "LONG60");
                assert_eq!(
                    *source,
                    AnalyticsError::DurationOverflow {
                        start: 0,
                        end: i64::MAX
                    }
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unrepresentable_start_aborts() {
        let reservations = vec![reservation("BAD", i64::MAX - 7200, i64::MAX)];
        let err = summarize_usage(&reservations, &Thresholds::default()).unwrap_err();
        match err {
            AnalyticsError::Trip { source, .. } => {
                assert_eq!(*source, AnalyticsError::InvalidTimestamp(i64::MAX - 7200))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_voucher_example() {
        let vouchers = vec![voucher(10.0), voucher(50.0), voucher(40.0)];
        let summary = summarize_financials(&[], &vouchers, &Thresholds::default());
        assert_eq!(summary.total_vouchers, 3);
        assert_eq!(summary.free_minutes, 50.0);
        assert_eq!(summary.purchased_minutes, 50.0);
    }

    #[test]
    fn test_total_spent() {
        let at = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let bills = vec![
            Bill { date: at, amount: 100.0 },
            Bill { date: at, amount: 25.5 },
        ];
        let summary = summarize_financials(&bills, &[], &Thresholds::default());
        assert_eq!(summary.total_bills, 2);
        assert_eq!(summary.total_spent, 125.5);
        assert_eq!(summary.free_minutes, 0.0);
    }

    #[test]
    fn test_calculate_fails_fast_on_usage_error() {
        let reservations = vec![reservation("BAD", i64::MIN, 0)];
        let err = calculate(&reservations, &Financials::default(), &Thresholds::default())
            .unwrap_err();
        assert!(format!("{:#}", err).starts_with("failed to calculate data from reservations"));
    }

    #[test]
    fn test_report_rendering() {
        let reservations = vec![
            reservation("AB1", epoch(2020, 1, 1), epoch(2020, 1, 1) + 180 * 60),
            reservation("CD2", epoch(2019, 1, 1), epoch(2019, 1, 1) + 20 * 60),
        ];
        let financials = Financials {
            bills: vec![Bill {
                date: Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap(),
                amount: 99.5,
            }],
            vouchers: vec![voucher(60.0), voucher(20.0)],
        };

        let report = calculate(&reservations, &financials, &Thresholds::default()).unwrap();
        let expected = "Total reservations: 2\n\
                        Unique cars: 2\n\
                        Minutes driven during trips: 180\n\
                        Minutes driven paying per minute: 20\n\
                        Minutes driven overall per year:\n\
                        - 2019: 20\n\
                        - 2020: 180\n\
                        Total invoices: 1\n\
                        Total vouchers: 2\n\
                        Total spent: 99.50 DKK\n\
                        Total free minutes: 20\n\
                        Total bought minutes: 60";
        assert_eq!(report.to_string(), expected);
    }
}
