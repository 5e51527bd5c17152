//! Bounded date sampling

use chrono::{Duration, NaiveDate};
use rand::Rng;

use super::ConstraintError;

/// Closed date interval `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateWindow { start, end }
    }

    /// Window starting at the later of two lower bounds
    pub fn after(lower_a: NaiveDate, lower_b: NaiveDate, end: NaiveDate) -> Self {
        DateWindow::new(lower_a.max(lower_b), end)
    }

    pub fn width_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// `start + uniform(0, width)`; a window of width ≤ 0 cannot be sampled.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        field: &'static str,
    ) -> Result<NaiveDate, ConstraintError> {
        let width = self.width_days();
        if width <= 0 {
            return Err(ConstraintError::EmptyWindow {
                field,
                start: self.start,
                end: self.end,
            });
        }
        Ok(self.start + Duration::days(rng.gen_range(0..=width)))
    }

    /// Sample for annotation dates that fall back to the window start
    pub fn sample_or_start<R: Rng + ?Sized>(&self, rng: &mut R) -> NaiveDate {
        self.sample(rng, "annotation").unwrap_or(self.start)
    }
}

pub fn days_after(date: NaiveDate, days: i64) -> NaiveDate {
    date + Duration::days(days)
}

pub fn days_before(date: NaiveDate, days: i64) -> NaiveDate {
    date - Duration::days(days)
}

pub fn years_before(date: NaiveDate, years: i64) -> NaiveDate {
    days_before(date, years * 365)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_sample_stays_inside_window() {
        let mut rng = StdRng::seed_from_u64(1);
        let window = DateWindow::new(date(2020, 1, 1), date(2020, 1, 10));
        for _ in 0..200 {
            let d = window.sample(&mut rng, "test").unwrap();
            assert!(d >= window.start && d <= window.end);
        }
    }

    #[test]
    fn test_zero_width_is_a_skip() {
        let mut rng = StdRng::seed_from_u64(1);
        let day = date(2021, 6, 1);
        let err = DateWindow::new(day, day).sample(&mut rng, "acquisition_date").unwrap_err();
        assert!(matches!(err, ConstraintError::EmptyWindow { field: "acquisition_date", .. }));

        let inverted = DateWindow::new(date(2021, 6, 2), day);
        assert!(inverted.sample(&mut rng, "x").is_err());
        assert_eq!(inverted.sample_or_start(&mut rng), date(2021, 6, 2));
    }

    #[test]
    fn test_after_takes_later_bound() {
        let w = DateWindow::after(date(2019, 1, 1), date(2020, 1, 1), date(2021, 1, 1));
        assert_eq!(w.start, date(2020, 1, 1));
        assert_eq!(w.width_days(), 366);
    }
}
