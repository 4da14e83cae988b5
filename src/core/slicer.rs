use chrono::NaiveDateTime;

use crate::{
    core::{
        period::{Granularity, HOURS_PER_DAY, Period, Window},
        series::TimeSeries,
    },
    prelude::*,
};

/// Anything with an hourly start and a sample count that can be checked against a period.
pub trait Aligned {
    fn start(&self) -> NaiveDateTime;

    fn len(&self) -> usize;
}

impl<T> Aligned for TimeSeries<T> {
    fn start(&self) -> NaiveDateTime {
        Self::start(self)
    }

    fn len(&self) -> usize {
        Self::len(self)
    }
}

/// Splits a billing period into daily or monthly windows.
///
/// The slicer validates every input series against the period before it hands out any window,
/// so that a mis-sized series fails the run instead of being silently truncated or padded.
#[must_use]
#[derive(Copy, Clone, Debug)]
pub struct Slicer {
    period: Period,
    granularity: Granularity,
}

impl Slicer {
    pub const fn new(period: Period, granularity: Granularity) -> Self {
        Self { period, granularity }
    }

    /// Validate the named series and return the ordered windows covering the period.
    pub fn try_windows(&self, series: &[(&str, &dyn Aligned)]) -> Result<Vec<Window>> {
        ensure!(!series.is_empty(), "no input series to slice for {:?}", self.period);
        for (name, series) in series {
            self.check(name, *series)?;
        }
        Ok(self.windows())
    }

    fn check(&self, name: &str, series: &dyn Aligned) -> Result {
        ensure!(
            series.start() == self.period.start,
            "`{name}` starts at {} but the period {:?} starts at {}",
            series.start(),
            self.period,
            self.period.start,
        );
        let len = series.len();
        if self.granularity == Granularity::Daily {
            ensure!(
                len % HOURS_PER_DAY == 0,
                "`{name}` has {len} samples, which is not a whole number of days",
            );
        }
        ensure!(
            len == self.period.n_hours(),
            "`{name}` has {len} samples, but {:?} has {} hours",
            self.period,
            self.period.n_hours(),
        );
        Ok(())
    }

    fn windows(&self) -> Vec<Window> {
        match self.granularity {
            Granularity::Monthly => vec![Window {
                month: self.period.month,
                day: None,
                start: self.period.start,
                range: 0..self.period.n_hours(),
            }],
            Granularity::Daily => (1..=self.period.n_days)
                .map(|day| {
                    let offset = (day as usize - 1) * HOURS_PER_DAY;
                    Window {
                        month: self.period.month,
                        day: Some(day),
                        start: self.period.day_start(day),
                        range: offset..(offset + HOURS_PER_DAY),
                    }
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use super::*;
    use crate::quantity::{power::Kilowatts, rate::KilowattHourRate};

    #[expect(clippy::cast_precision_loss)]
    fn ramp(period: Period, len: usize) -> TimeSeries<Kilowatts> {
        TimeSeries::new(period.start, (0..len).map(|index| Kilowatts(index as f64 * 0.1)).collect())
    }

    #[test]
    fn test_daily_windows() {
        let period = Period::try_new(2019, 2).unwrap();
        let load = ramp(period, period.n_hours());
        let windows =
            Slicer::new(period, Granularity::Daily).try_windows(&[("load", &load)]).unwrap();
        assert_eq!(windows.len(), 28);
        assert!(windows.iter().all(|window| window.len() == 24));
        assert_eq!(windows[0].day, Some(1));
        assert_eq!(windows[27].day, Some(28));
        assert_eq!(windows[1].start, period.day_start(2));
        assert!(windows.iter().tuple_windows().all(|(lhs, rhs)| lhs.range.end == rhs.range.start));
    }

    #[test]
    fn test_monthly_window() {
        let period = Period::try_new(2019, 3).unwrap();
        let load = ramp(period, period.n_hours());
        let windows =
            Slicer::new(period, Granularity::Monthly).try_windows(&[("load", &load)]).unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].range, 0..744);
        assert_eq!(windows[0].day, None);
    }

    #[test]
    fn test_round_trip() {
        let period = Period::try_new(2019, 4).unwrap();
        let load = ramp(period, period.n_hours());
        let prices = TimeSeries::new(
            period.start,
            load.values().iter().map(|power| KilowattHourRate(power.0 * 3.0)).collect(),
        );
        let windows = Slicer::new(period, Granularity::Daily)
            .try_windows(&[("load", &load), ("prices", &prices)])
            .unwrap();
        let load_concatenated =
            windows.iter().flat_map(|window| load.window(window).iter().copied()).collect_vec();
        let prices_concatenated =
            windows.iter().flat_map(|window| prices.window(window).iter().copied()).collect_vec();
        assert_eq!(load_concatenated, load.values());
        assert_eq!(prices_concatenated, prices.values());
    }

    #[test]
    fn test_partial_day_rejected() {
        let period = Period::try_new(2019, 1).unwrap();
        let load = ramp(period, period.n_hours() - 5);
        let error = Slicer::new(period, Granularity::Daily)
            .try_windows(&[("load", &load)])
            .unwrap_err();
        assert!(error.to_string().contains("whole number of days"));
    }

    #[test]
    fn test_wrong_length_rejected() {
        let period = Period::try_new(2019, 1).unwrap();
        let load = ramp(period, period.n_hours() - 24);
        assert!(Slicer::new(period, Granularity::Daily).try_windows(&[("load", &load)]).is_err());
        assert!(
            Slicer::new(period, Granularity::Monthly).try_windows(&[("load", &load)]).is_err()
        );
    }

    #[test]
    fn test_misaligned_start_rejected() {
        let period = Period::try_new(2019, 1).unwrap();
        let load = ramp(period, period.n_hours());
        let pv = TimeSeries::new(period.day_start(2), load.values().to_vec());
        let error = Slicer::new(period, Granularity::Monthly)
            .try_windows(&[("load", &load), ("pv", &pv)])
            .unwrap_err();
        assert!(error.to_string().contains("`pv`"));
    }

    #[test]
    fn test_no_series_rejected() {
        let period = Period::try_new(2019, 1).unwrap();
        assert!(Slicer::new(period, Granularity::Daily).try_windows(&[]).is_err());
    }
}
