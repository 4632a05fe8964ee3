use super::curve::Curve3;
use super::{SplineError, SplineResult};
use crate::geom::Tolerance;

/// How output samples are distributed along the curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplingMode {
    /// Equal steps in parameter space.
    #[default]
    Uniform,
    /// Equal steps in chord-length distance.
    ArcLength,
}

/// Arc-length table density used when none is configured.
#[must_use]
pub fn default_arc_length_samples(num_joints: usize) -> usize {
    num_joints.saturating_mul(16).clamp(64, 4096)
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ArcLengthEntry {
    parameter: f64,
    arc_length: f64,
}

/// Cumulative chord lengths of a dense uniform sampling of a curve domain.
#[derive(Debug, Clone, PartialEq)]
pub struct ArcLengthTable {
    entries: Vec<ArcLengthEntry>,
}

impl ArcLengthTable {
    /// Samples `samples` points uniformly over `curve.domain()` (at least two).
    #[must_use]
    pub fn build<C: Curve3 + ?Sized>(curve: &C, samples: usize) -> Self {
        let samples = samples.max(2);
        let (t0, t1) = curve.domain();
        let span = t1 - t0;

        let mut entries = Vec::with_capacity(samples);
        let mut prev = curve.point_at(t0);
        let mut cumulative = 0.0;
        entries.push(ArcLengthEntry {
            parameter: t0,
            arc_length: 0.0,
        });

        for i in 1..samples {
            let u = i as f64 / (samples - 1) as f64;
            let t = if i == samples - 1 { t1 } else { t0 + span * u };
            let curr = curve.point_at(t);
            cumulative += curr.sub_point(prev).length();
            entries.push(ArcLengthEntry {
                parameter: t,
                arc_length: cumulative,
            });
            prev = curr;
        }

        Self { entries }
    }

    #[must_use]
    pub fn total_length(&self) -> f64 {
        self.entries.last().map_or(0.0, |e| e.arc_length)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn domain(&self) -> (f64, f64) {
        match (self.entries.first(), self.entries.last()) {
            (Some(first), Some(last)) => (first.parameter, last.parameter),
            _ => (0.0, 0.0),
        }
    }

    /// Accumulated length from the start of the domain up to `t`.
    #[must_use]
    pub fn length_at(&self, t: f64) -> f64 {
        let (t0, t1) = self.domain();
        if t <= t0 {
            return 0.0;
        }
        if t >= t1 {
            return self.total_length();
        }

        let idx = self.entries.partition_point(|e| e.parameter < t).max(1);
        let e0 = &self.entries[idx - 1];
        let e1 = &self.entries[idx];
        let dt = e1.parameter - e0.parameter;
        if Tolerance::ZERO_LENGTH.is_zero_length(dt) {
            return e0.arc_length;
        }
        let ratio = (t - e0.parameter) / dt;
        e0.arc_length + (e1.arc_length - e0.arc_length) * ratio
    }

    /// Parameter whose accumulated length equals `target_length`.
    ///
    /// Monotonic in `target_length`; lengths outside `[0, total]` clamp to the
    /// domain bounds.
    #[must_use]
    pub fn parameter_at_length(&self, target_length: f64) -> f64 {
        let (t0, t1) = self.domain();
        if target_length <= 0.0 {
            return t0;
        }
        if target_length >= self.total_length() {
            return t1;
        }

        // first entry reaching the target; entry 0 has length 0 < target
        let idx = self.entries.partition_point(|e| e.arc_length < target_length);
        let e0 = &self.entries[idx - 1];
        let e1 = &self.entries[idx];

        let segment_length = e1.arc_length - e0.arc_length;
        if Tolerance::ZERO_LENGTH.is_zero_length(segment_length) {
            return e0.parameter;
        }

        let ratio = (target_length - e0.arc_length) / segment_length;
        e0.parameter + (e1.parameter - e0.parameter) * ratio.clamp(0.0, 1.0)
    }
}

/// Parameter values for `num_joints` samples over `curve.domain()`.
pub fn sample_parameters<C: Curve3 + ?Sized>(
    curve: &C,
    num_joints: usize,
    mode: SamplingMode,
) -> SplineResult<Vec<f64>> {
    sample_parameters_with_density(curve, num_joints, mode, default_arc_length_samples(num_joints))
}

/// [`sample_parameters`] with an explicit arc-length table density.
///
/// Raw sample `u = i / (num_joints - 1)` maps onto the curve domain `[a, b]`
/// as `a·(1 - u) + u·b`; for periodic curves that domain is the single loop
/// inside the wrap margin.
pub fn sample_parameters_with_density<C: Curve3 + ?Sized>(
    curve: &C,
    num_joints: usize,
    mode: SamplingMode,
    table_samples: usize,
) -> SplineResult<Vec<f64>> {
    if num_joints < 2 {
        return Err(SplineError::InvalidSampleCount {
            requested: num_joints,
        });
    }

    let (start, end) = curve.domain();
    let denom = (num_joints - 1) as f64;
    let remap = |u: f64| start * (1.0 - u) + u * end;

    match mode {
        SamplingMode::Uniform => Ok((0..num_joints).map(|i| remap(i as f64 / denom)).collect()),
        SamplingMode::ArcLength => {
            let table = ArcLengthTable::build(curve, table_samples);
            let total = table.total_length();
            if !total.is_finite() || Tolerance::ZERO_LENGTH.is_zero_length(total) {
                log::debug!("curve has no measurable length, falling back to uniform sampling");
                return Ok((0..num_joints).map(|i| remap(i as f64 / denom)).collect());
            }

            log::debug!(
                "arc-length table: {} samples, total length {total:.6}",
                table.len()
            );
            Ok((0..num_joints)
                .map(|i| table.parameter_at_length(total * (i as f64 / denom)))
                .collect())
        }
    }
}
