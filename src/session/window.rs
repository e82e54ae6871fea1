//! Display window bookkeeping for emitted samples
//!
//! The x axis shows a fixed horizon of sample indices. Once a sample index
//! passes the upper bound the accumulated history is dropped and the bounds
//! jump forward by one horizon; windows do not overlap and points are never
//! evicted one at a time. The sample that triggers the jump is dropped from
//! the plot.
//!
//! The y axis range only ever grows: it is seeded by the first sample and
//! widened whenever a sample falls outside it.

/// Result of pushing one sample into the window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowUpdate {
    /// The history was cleared and the x bounds advanced
    pub rolled_over: bool,
    /// The y range changed
    pub range_widened: bool,
}

/// Bounded window of `(frame, value)` points with a grow-only value range
#[derive(Debug, Clone)]
pub struct SampleWindow {
    horizon: u64,
    x_min: u64,
    x_max: u64,
    points: Vec<(u64, f64)>,
    y_range: Option<(f64, f64)>,
    rollovers: u64,
}

impl SampleWindow {
    /// Create a window covering `[0, horizon]`
    pub fn new(horizon: u64) -> Self {
        let horizon = horizon.max(1);
        Self {
            horizon,
            x_min: 0,
            x_max: horizon,
            points: Vec::with_capacity(horizon as usize + 1),
            y_range: None,
            rollovers: 0,
        }
    }

    /// Record a sample
    ///
    /// When `frame` exceeds the upper bound the previous history is dropped,
    /// the lower bound moves to `frame` and the upper bound advances by the
    /// horizon. The triggering sample is not plotted, so the new window
    /// starts empty, but its value still widens the y range.
    pub fn push(&mut self, frame: u64, value: f64) -> WindowUpdate {
        let mut update = WindowUpdate::default();

        if frame > self.x_max {
            self.points.clear();
            self.x_min = frame;
            self.x_max += self.horizon;
            // A gap longer than one horizon still has to land inside the window.
            while self.x_max < frame {
                self.x_max += self.horizon;
            }
            self.rollovers += 1;
            update.rolled_over = true;
        } else {
            self.points.push((frame, value));
        }

        update.range_widened = self.widen_range(value);
        update
    }

    fn widen_range(&mut self, value: f64) -> bool {
        // NaN bit patterns are plotted as gaps and never move the range.
        if value.is_nan() {
            return false;
        }

        match self.y_range {
            None => {
                self.y_range = Some((value, value));
                true
            }
            Some((min, max)) if value < min => {
                self.y_range = Some((value, max));
                true
            }
            Some((min, max)) if value > max => {
                self.y_range = Some((min, value));
                true
            }
            Some(_) => false,
        }
    }

    /// Current x bounds `(xmin, xmax)`
    pub fn x_range(&self) -> (u64, u64) {
        (self.x_min, self.x_max)
    }

    /// Current y range, `None` until a non-NaN sample arrived
    pub fn y_range(&self) -> Option<(f64, f64)> {
        self.y_range
    }

    /// Points in the current window, oldest first
    pub fn points(&self) -> &[(u64, f64)] {
        &self.points
    }

    /// Points as plot coordinates
    pub fn as_plot_points(&self) -> Vec<[f64; 2]> {
        self.points
            .iter()
            .map(|&(frame, value)| [frame as f64, value])
            .collect()
    }

    /// Number of points in the current window
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the current window is empty
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Window size in sample indices
    pub fn horizon(&self) -> u64 {
        self.horizon
    }

    /// How many times the window has been cleared and advanced
    pub fn rollovers(&self) -> u64 {
        self.rollovers
    }
}

impl Default for SampleWindow {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_HORIZON)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_initial_bounds() {
        let window = SampleWindow::new(30);
        assert_eq!(window.x_range(), (0, 30));
        assert_eq!(window.y_range(), None);
        assert!(window.is_empty());
    }

    #[test]
    fn test_first_window_accumulates() {
        let mut window = SampleWindow::new(30);
        for frame in 0..30 {
            assert!(!window.push(frame, frame as f64).rolled_over);
        }
        assert_eq!(window.len(), 30);
        assert_eq!(window.x_range(), (0, 30));
    }

    #[test]
    fn test_rollover_advances_by_horizon() {
        let mut window = SampleWindow::new(30);
        for frame in 0..=30 {
            window.push(frame, 1.0);
        }
        assert_eq!(window.x_range(), (0, 30));
        assert_eq!(window.len(), 31);

        let update = window.push(31, 1.0);
        assert!(update.rolled_over);
        assert_eq!(window.x_range(), (31, 60));
        assert!(window.is_empty());

        for frame in 32..=60 {
            assert!(!window.push(frame, 1.0).rolled_over);
        }

        assert!(window.push(61, 1.0).rolled_over);
        assert_eq!(window.x_range(), (61, 90));
        assert_eq!(window.rollovers(), 2);
    }

    #[test]
    fn test_rollover_after_gap() {
        let mut window = SampleWindow::new(30);
        window.push(0, 1.0);
        assert!(window.push(100, 1.0).rolled_over);
        assert_eq!(window.x_range(), (100, 120));
    }

    #[test]
    fn test_range_only_widens() {
        let mut window = SampleWindow::new(30);
        assert!(window.push(0, 5.0).range_widened);
        assert_eq!(window.y_range(), Some((5.0, 5.0)));
        assert!(window.push(1, 2.0).range_widened);
        assert!(window.push(2, 9.0).range_widened);
        assert!(!window.push(3, 4.0).range_widened);
        assert_eq!(window.y_range(), Some((2.0, 9.0)));
    }

    #[test]
    fn test_rollover_sample_is_not_plotted_but_widens_range() {
        let mut window = SampleWindow::new(2);
        window.push(0, 1.0);
        window.push(1, 2.0);
        window.push(2, 3.0);

        let update = window.push(3, 50.0);
        assert!(update.rolled_over);
        assert!(update.range_widened);
        assert!(window.points().is_empty());
        assert_eq!(window.y_range(), Some((1.0, 50.0)));

        window.push(4, 4.0);
        assert_eq!(window.points(), &[(4, 4.0)]);
    }

    #[test]
    fn test_range_survives_rollover() {
        let mut window = SampleWindow::new(2);
        window.push(0, -3.0);
        window.push(1, 3.0);
        window.push(3, 0.0);
        assert_eq!(window.y_range(), Some((-3.0, 3.0)));
    }

    #[test]
    fn test_nan_does_not_touch_range() {
        let mut window = SampleWindow::new(30);
        assert!(!window.push(0, f64::NAN).range_widened);
        assert_eq!(window.y_range(), None);
        window.push(1, 1.5);
        window.push(2, f64::NAN);
        assert_eq!(window.y_range(), Some((1.5, 1.5)));
        assert_eq!(window.len(), 3);
    }

    proptest! {
        #[test]
        fn test_range_is_monotonic_and_contains_latest(
            values in prop::collection::vec(-1.0e6f64..1.0e6, 1..200)
        ) {
            let mut window = SampleWindow::new(30);
            let mut previous: Option<(f64, f64)> = None;

            for (frame, &value) in values.iter().enumerate() {
                window.push(frame as u64, value);
                let (min, max) = window.y_range().unwrap();

                prop_assert!(min <= value && value <= max);
                if let Some((pmin, pmax)) = previous {
                    prop_assert!(min <= pmin && max >= pmax);
                }
                previous = Some((min, max));
            }
        }

        #[test]
        fn test_window_never_exceeds_horizon_plus_one(
            horizon in 1u64..64,
            count in 0u64..500
        ) {
            let mut window = SampleWindow::new(horizon);
            for frame in 0..count {
                let update = window.push(frame, 0.0);
                let (x_min, x_max) = window.x_range();
                prop_assert!(x_min <= frame && frame <= x_max);
                prop_assert!(window.len() as u64 <= horizon + 1);
                if update.rolled_over {
                    prop_assert!(window.is_empty());
                } else {
                    prop_assert_eq!(window.points().last(), Some(&(frame, 0.0)));
                }
            }
        }
    }
}
