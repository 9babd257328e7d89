//! Rolling metrics history for the focused unit
//!
//! Provides ring-buffer storage for CPU and memory samples plus the compact
//! text encodings the dashboard draws from them: sparklines, percentage
//! bars and a multi-row trend chart.

use std::collections::VecDeque;
use std::time::Instant;

use crate::model::UnitId;

/// Default number of samples kept per metric
pub const DEFAULT_CAPACITY: usize = 30;

/// Sparkline palette, lowest to highest intensity
pub const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

const BASELINE: char = SPARK_LEVELS[0];
const BAR_FILLED: char = '█';
const BAR_EMPTY: char = '░';
const TREND_POINT: char = '█';
const TREND_STEM: char = '│';

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Cpu,
    Memory,
}

impl MetricKind {
    pub fn label(&self) -> &'static str {
        match self {
            MetricKind::Cpu => "CPU",
            MetricKind::Memory => "MEM",
        }
    }
}

/// A FIFO series of samples with fixed capacity.
/// Oldest samples are dropped when capacity is exceeded.
#[derive(Clone, Debug)]
pub struct Series {
    cap: usize,
    samples: VecDeque<f64>,
}

impl Series {
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            cap,
            samples: VecDeque::with_capacity(cap),
        }
    }

    /// Push a sample, dropping the oldest if at capacity
    pub fn push(&mut self, v: f64) {
        if self.samples.len() >= self.cap {
            self.samples.pop_front();
        }
        self.samples.push_back(v);
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    pub fn as_vec(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }

    pub fn latest(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    /// Largest sample, or `None` when empty
    pub fn max(&self) -> Option<f64> {
        self.samples.iter().copied().reduce(f64::max)
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Divisor used to normalize this series: its own maximum, or 1 when
    /// the maximum is not positive.
    fn scale(&self) -> f64 {
        match self.max() {
            Some(m) if m > 0.0 => m,
            _ => 1.0,
        }
    }

    /// Sparkline over the most recent `width` samples, left-padded with the
    /// baseline when fewer samples exist.
    pub fn sparkline(&self, width: usize) -> String {
        let scale = self.scale();
        let shown = self.samples.len().min(width);
        let skip = self.samples.len() - shown;

        let mut out = String::with_capacity(width * 3);
        out.extend(std::iter::repeat_n(BASELINE, width - shown));
        for v in self.samples.iter().skip(skip) {
            out.push(SPARK_LEVELS[level_index(*v / scale, SPARK_LEVELS.len())]);
        }
        out
    }

    /// Column chart `height` rows tall, resampling the buffer onto `width`
    /// columns. Row 0 is the top.
    pub fn trend(&self, height: usize, width: usize) -> Vec<String> {
        if self.samples.is_empty() || height == 0 || width == 0 {
            return Vec::new();
        }

        let scale = self.scale();
        let mut grid = vec![vec![' '; width]; height];
        let per_col = self.samples.len() as f64 / width as f64;

        for col in 0..width {
            let idx = ((col as f64 * per_col) as usize).min(self.samples.len() - 1);
            let normalized = self.samples[idx] / scale;
            let lift = level_index(normalized, height);
            let row = height - 1 - lift;

            grid[row][col] = TREND_POINT;
            for cell in grid.iter_mut().skip(row + 1) {
                cell[col] = TREND_STEM;
            }
        }

        grid.into_iter().map(|row| row.into_iter().collect()).collect()
    }
}

impl Default for Series {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Map a normalized value onto `levels` discrete steps.
/// Negative and NaN inputs land on level 0; values above 1 on the top level.
fn level_index(normalized: f64, levels: usize) -> usize {
    let top = levels.saturating_sub(1);
    let raw = normalized * top as f64;
    if !raw.is_finite() {
        return if raw > 0.0 { top } else { 0 };
    }
    if raw <= 0.0 {
        return 0;
    }
    (raw as usize).min(top)
}

/// Percentage bar for a single value, clamped to [0, 100]
pub fn percent_bar(value: f64, width: usize) -> String {
    let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 100.0) };
    let filled = ((value / 100.0) * width as f64) as usize;
    let filled = filled.min(width);
    let mut out = String::with_capacity(width * 3);
    out.extend(std::iter::repeat_n(BAR_FILLED, filled));
    out.extend(std::iter::repeat_n(BAR_EMPTY, width - filled));
    out
}

/// Running average/maximum since the last reset
#[derive(Clone, Debug)]
pub struct SampleSummary {
    pub samples: u64,
    pub cpu_avg: f64,
    pub cpu_max: f64,
    pub mem_avg: f64,
    pub mem_max: f64,
    pub started: Instant,
}

impl SampleSummary {
    fn new() -> Self {
        Self {
            samples: 0,
            cpu_avg: 0.0,
            cpu_max: 0.0,
            mem_avg: 0.0,
            mem_max: 0.0,
            started: Instant::now(),
        }
    }

    fn observe(&mut self, kind: MetricKind, value: f64) {
        // `samples` counts CPU observations; memory shares the same count.
        let n = match kind {
            MetricKind::Cpu => {
                self.samples += 1;
                self.samples
            }
            MetricKind::Memory => self.samples.max(1),
        } as f64;
        let (avg, max) = match kind {
            MetricKind::Cpu => (&mut self.cpu_avg, &mut self.cpu_max),
            MetricKind::Memory => (&mut self.mem_avg, &mut self.mem_max),
        };
        *avg = (*avg * (n - 1.0) + value) / n;
        if value > *max {
            *max = value;
        }
    }
}

/// CPU and memory history for the unit currently holding focus
#[derive(Clone, Debug)]
pub struct MetricsHistory {
    unit: Option<UnitId>,
    cpu: Series,
    mem: Series,
    summary: SampleSummary,
}

impl MetricsHistory {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            unit: None,
            cpu: Series::new(cap),
            mem: Series::new(cap),
            summary: SampleSummary::new(),
        }
    }

    /// Unit these samples belong to
    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    /// Rebind to another unit. History never carries over between units.
    pub fn retarget(&mut self, unit: Option<UnitId>) {
        if self.unit != unit {
            self.unit = unit;
            self.reset();
        }
    }

    pub fn series(&self, kind: MetricKind) -> &Series {
        match kind {
            MetricKind::Cpu => &self.cpu,
            MetricKind::Memory => &self.mem,
        }
    }

    /// Append one sample. Values are stored as given, without clamping.
    pub fn append_sample(&mut self, kind: MetricKind, value: f64) {
        match kind {
            MetricKind::Cpu => self.cpu.push(value),
            MetricKind::Memory => self.mem.push(value),
        }
        self.summary.observe(kind, value);
    }

    /// Sparkline for `kind`, normalized against the buffer's own maximum
    pub fn render(&self, kind: MetricKind, width: usize) -> String {
        self.series(kind).sparkline(width)
    }

    /// Percentage bar for the most recent sample of `kind`
    pub fn bar(&self, kind: MetricKind, width: usize) -> String {
        percent_bar(self.series(kind).latest().unwrap_or(0.0), width)
    }

    pub fn trend(&self, kind: MetricKind, height: usize, width: usize) -> Vec<String> {
        self.series(kind).trend(height, width)
    }

    /// (x, y) points for a chart widget; x is the sample index
    pub fn chart_points(&self, kind: MetricKind) -> Vec<(f64, f64)> {
        self.series(kind)
            .as_vec()
            .into_iter()
            .enumerate()
            .map(|(i, v)| (i as f64, v))
            .collect()
    }

    pub fn latest(&self, kind: MetricKind) -> Option<f64> {
        self.series(kind).latest()
    }

    pub fn summary(&self) -> &SampleSummary {
        &self.summary
    }

    /// Clear both buffers and the running accumulators
    pub fn reset(&mut self) {
        self.cpu.clear();
        self.mem.clear();
        self.summary = SampleSummary::new();
    }

    pub fn capacity(&self) -> usize {
        self.cpu.capacity()
    }
}

impl Default for MetricsHistory {
    fn default() -> Self {
        Self::new()
    }
}
