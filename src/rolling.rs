//! Trailing-window means that only ever see strictly earlier observations.

use std::collections::VecDeque;

/// Bounded buffer of the last `capacity` observations for one group.
///
/// `mean()` is read *before* `push()` for the current row, which is what
/// shifts the window by one and keeps the current game out of its own feature.
/// Missing observations occupy a slot but do not count towards the mean,
/// matching a `min_periods = 1` rolling mean over a column with gaps.
#[derive(Debug, Clone)]
pub struct TrailingWindow {
    capacity: usize,
    buf: VecDeque<Option<f64>>,
}

impl TrailingWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            buf: VecDeque::with_capacity(capacity),
        }
    }

    pub fn mean(&self) -> Option<f64> {
        let mut sum = 0.0;
        let mut n = 0usize;
        for value in self.buf.iter().flatten() {
            sum += value;
            n += 1;
        }
        if n == 0 { None } else { Some(sum / n as f64) }
    }

    pub fn push(&mut self, value: Option<f64>) {
        if self.buf.len() == self.capacity {
            self.buf.pop_front();
        }
        self.buf.push_back(value);
    }
}

/// Same as [`TrailingWindow`] but over a fixed-width vector of values.
#[derive(Debug, Clone)]
pub struct TrailingVectorWindow<const N: usize> {
    capacity: usize,
    buf: VecDeque<[f64; N]>,
}

impl<const N: usize> TrailingVectorWindow<N> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            buf: VecDeque::with_capacity(capacity),
        }
    }

    pub fn mean(&self) -> Option<[f64; N]> {
        if self.buf.is_empty() {
            return None;
        }
        let mut out = [0.0; N];
        for values in &self.buf {
            for (acc, v) in out.iter_mut().zip(values) {
                *acc += v;
            }
        }
        let n = self.buf.len() as f64;
        for acc in &mut out {
            *acc /= n;
        }
        Some(out)
    }

    pub fn push(&mut self, values: [f64; N]) {
        if self.buf.len() == self.capacity {
            self.buf.pop_front();
        }
        self.buf.push_back(values);
    }
}

/// Shifted trailing means for an ordered series: element `i` averages the up
/// to `window` observations strictly before `i`.
pub fn shifted_rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let mut trailing = TrailingWindow::new(window);
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        out.push(trailing.mean());
        trailing.push(*value);
    }
    out
}
