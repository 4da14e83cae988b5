use chrono::NaiveDateTime;

use crate::{core::period::Window, quantity::Zero};

/// Hourly time series with a start timestamp.
#[must_use]
#[derive(Clone, Debug, PartialEq)]
pub struct TimeSeries<T> {
    start: NaiveDateTime,
    values: Vec<T>,
}

impl<T> TimeSeries<T> {
    pub const fn new(start: NaiveDateTime, values: Vec<T>) -> Self {
        Self { start, values }
    }

    pub const fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub const fn len(&self) -> usize {
        self.values.len()
    }

    #[cfg(test)]
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Borrow the samples covered by the window.
    ///
    /// The window must come from a slicer that has validated this series.
    pub fn window(&self, window: &Window) -> &[T] {
        &self.values[window.range.clone()]
    }
}

impl<T: Clone> TimeSeries<T> {
    /// Shift the samples forward by `n` positions, wrapping the tail around to the head.
    ///
    /// The result at index `t` equals the input at `t - n` (modulo the length).
    pub fn rotated_right(&self, n: usize) -> Self {
        let mut values = self.values.clone();
        if !values.is_empty() {
            values.rotate_right(n % self.values.len());
        }
        Self { start: self.start, values }
    }
}

impl<T: Zero + Clone> TimeSeries<T> {
    pub fn zeros(start: NaiveDateTime, len: usize) -> Self {
        Self { start, values: vec![T::ZERO; len] }
    }
}
