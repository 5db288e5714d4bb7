//! Time sampling descriptors and the per-archive registry.
//!
//! Properties do not store times. They store the id of a [`TimeSampling`]
//! in the archive's [`TimeSamplingRegistry`], and many properties share the
//! same descriptor. Id 0 is always the identity sampling `Uniform(1.0, 0.0)`.

use crate::util::{Chrono, Error, Result, CHRONO_EPSILON};

use super::SampleInterp;

/// Shape of a time sampling.
#[derive(Clone, Debug, PartialEq)]
pub enum TimeSamplingType {
    /// `start_time + index * time_per_cycle`.
    Uniform {
        time_per_cycle: Chrono,
        start_time: Chrono,
    },

    /// `times[index % len] + (index / len) * time_per_cycle`.
    Cyclic {
        time_per_cycle: Chrono,
        times: Vec<Chrono>,
    },

    /// Explicit time for each sample.
    Acyclic {
        times: Vec<Chrono>,
    },
}

impl TimeSamplingType {
    /// Storage tag: 0 uniform, 1 cyclic, 2 acyclic.
    pub fn tag(&self) -> u8 {
        match self {
            Self::Uniform { .. } => 0,
            Self::Cyclic { .. } => 1,
            Self::Acyclic { .. } => 2,
        }
    }

    /// Samples per cycle. Acyclic sampling has one cycle holding every time.
    pub fn samples_per_cycle(&self) -> usize {
        match self {
            Self::Uniform { .. } => 1,
            Self::Cyclic { times, .. } | Self::Acyclic { times } => times.len(),
        }
    }

    /// Cycle length in seconds, `None` for acyclic.
    pub fn time_per_cycle(&self) -> Option<Chrono> {
        match self {
            Self::Uniform { time_per_cycle, .. } | Self::Cyclic { time_per_cycle, .. } => {
                Some(*time_per_cycle)
            }
            Self::Acyclic { .. } => None,
        }
    }
}

/// A validated time sampling descriptor.
///
/// Equality is structural, which is what the registry interns on.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeSampling {
    sampling_type: TimeSamplingType,
}

impl TimeSampling {
    /// The identity sampling: one sample per second starting at 0.
    pub fn identity() -> Self {
        Self {
            sampling_type: TimeSamplingType::Uniform {
                time_per_cycle: 1.0,
                start_time: 0.0,
            },
        }
    }

    /// Regular sampling every `time_per_cycle` seconds from `start_time`.
    pub fn uniform(time_per_cycle: Chrono, start_time: Chrono) -> Result<Self> {
        check_period(time_per_cycle)?;
        if !start_time.is_finite() {
            return Err(Error::invalid_argument("uniform start time must be finite"));
        }
        Ok(Self {
            sampling_type: TimeSamplingType::Uniform {
                time_per_cycle,
                start_time,
            },
        })
    }

    /// Repeating pattern of `times` every `time_per_cycle` seconds.
    pub fn cyclic(time_per_cycle: Chrono, times: Vec<Chrono>) -> Result<Self> {
        check_period(time_per_cycle)?;
        check_times(&times)?;
        if times[times.len() - 1] - times[0] > time_per_cycle {
            return Err(Error::invalid_argument(format!(
                "cyclic times span more than one cycle of {}",
                time_per_cycle
            )));
        }
        Ok(Self {
            sampling_type: TimeSamplingType::Cyclic {
                time_per_cycle,
                times,
            },
        })
    }

    /// Explicit per-sample times.
    pub fn acyclic(times: Vec<Chrono>) -> Result<Self> {
        check_times(&times)?;
        Ok(Self {
            sampling_type: TimeSamplingType::Acyclic { times },
        })
    }

    pub fn sampling_type(&self) -> &TimeSamplingType {
        &self.sampling_type
    }

    /// True for `Uniform(1.0, 0.0)`.
    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    /// Time of sample `index`.
    ///
    /// Uniform and cyclic samplings are unbounded; acyclic sampling fails
    /// with `SampleTimeNotFound` past its last time.
    pub fn sample_time(&self, index: usize) -> Result<Chrono> {
        Ok(match &self.sampling_type {
            TimeSamplingType::Uniform {
                time_per_cycle,
                start_time,
            } => start_time + index as Chrono * time_per_cycle,
            TimeSamplingType::Cyclic {
                time_per_cycle,
                times,
            } => {
                let cycle = index / times.len();
                times[index % times.len()] + cycle as Chrono * time_per_cycle
            }
            TimeSamplingType::Acyclic { times } => {
                *times.get(index).ok_or(Error::SampleTimeNotFound {
                    index,
                    count: times.len(),
                })?
            }
        })
    }

    /// Samples addressable by a property holding `num_samples` samples.
    fn addressable(&self, num_samples: usize) -> usize {
        match &self.sampling_type {
            TimeSamplingType::Acyclic { times } => num_samples.min(times.len()),
            _ => num_samples,
        }
    }

    /// Time of an index already known to be addressable.
    fn time_at(&self, index: usize) -> Chrono {
        match &self.sampling_type {
            TimeSamplingType::Acyclic { times } => times[index],
            _ => self.sample_time(index).unwrap_or_default(),
        }
    }

    /// Largest index whose time is <= `time`, clamped to the first sample.
    ///
    /// Returns `(0, 0.0)` when there are no samples.
    pub fn floor_index(&self, time: Chrono, num_samples: usize) -> (usize, Chrono) {
        let n = self.addressable(num_samples);
        if n == 0 {
            return (0, 0.0);
        }

        let idx = match &self.sampling_type {
            TimeSamplingType::Uniform {
                time_per_cycle,
                start_time,
            } => {
                let steps = ((time - start_time) / time_per_cycle).floor();
                let mut idx = if steps <= 0.0 { 0 } else { (steps as usize).min(n - 1) };
                // Correct rounding near sample boundaries.
                if idx + 1 < n && (self.time_at(idx + 1) - time) <= CHRONO_EPSILON {
                    idx += 1;
                }
                idx
            }
            _ => {
                // Count of samples at or before `time`.
                let after = partition_point(n, |i| self.time_at(i) <= time + CHRONO_EPSILON);
                after.saturating_sub(1)
            }
        };
        (idx, self.time_at(idx))
    }

    /// Smallest index whose time is >= `time`, clamped to the last sample.
    pub fn ceil_index(&self, time: Chrono, num_samples: usize) -> (usize, Chrono) {
        let n = self.addressable(num_samples);
        if n == 0 {
            return (0, 0.0);
        }

        let (floor_idx, floor_time) = self.floor_index(time, num_samples);
        if (floor_time - time).abs() <= CHRONO_EPSILON || floor_time > time {
            return (floor_idx, floor_time);
        }
        let idx = (floor_idx + 1).min(n - 1);
        (idx, self.time_at(idx))
    }

    /// Index whose time is nearest to `time`; ties go to the later sample.
    pub fn near_index(&self, time: Chrono, num_samples: usize) -> (usize, Chrono) {
        let (floor_idx, floor_time) = self.floor_index(time, num_samples);
        let (ceil_idx, ceil_time) = self.ceil_index(time, num_samples);
        if floor_idx == ceil_idx || (time - floor_time).abs() < (ceil_time - time).abs() {
            (floor_idx, floor_time)
        } else {
            (ceil_idx, ceil_time)
        }
    }

    /// Bracketing samples and linear weight for `time`.
    ///
    /// Queries outside the sampled range clamp to the boundary sample with
    /// `alpha == 0`; there is no extrapolation.
    pub fn interp(&self, time: Chrono, num_samples: usize) -> SampleInterp {
        let (floor_idx, floor_time) = self.floor_index(time, num_samples);
        let (ceil_idx, ceil_time) = self.ceil_index(time, num_samples);
        if floor_idx == ceil_idx || (time - floor_time).abs() <= CHRONO_EPSILON {
            return SampleInterp::exact(floor_idx);
        }
        if (ceil_time - time).abs() <= CHRONO_EPSILON {
            return SampleInterp::exact(ceil_idx);
        }
        let span = ceil_time - floor_time;
        if span <= 0.0 {
            return SampleInterp::exact(floor_idx);
        }
        SampleInterp::lerp(floor_idx, ceil_idx, (time - floor_time) / span)
    }

    /// `(tag, time_per_cycle, times)` as written by storage backends.
    ///
    /// Uniform sampling stores its start time as the only time.
    pub fn to_stored(&self) -> (u8, Chrono, Vec<Chrono>) {
        match &self.sampling_type {
            TimeSamplingType::Uniform {
                time_per_cycle,
                start_time,
            } => (0, *time_per_cycle, vec![*start_time]),
            TimeSamplingType::Cyclic {
                time_per_cycle,
                times,
            } => (1, *time_per_cycle, times.clone()),
            TimeSamplingType::Acyclic { times } => (2, 0.0, times.clone()),
        }
    }

    /// Inverse of [`to_stored`](Self::to_stored). Stored data that fails
    /// validation is a format error.
    pub fn from_stored(tag: u8, time_per_cycle: Chrono, times: Vec<Chrono>) -> Result<Self> {
        let result = match (tag, times.as_slice()) {
            (0, [start]) => Self::uniform(time_per_cycle, *start),
            (1, _) => Self::cyclic(time_per_cycle, times),
            (2, _) => Self::acyclic(times),
            _ => return Err(Error::invalid_format(format!("bad time sampling tag {}", tag))),
        };
        result.map_err(|e| Error::invalid_format(format!("stored time sampling: {}", e)))
    }
}

impl Default for TimeSampling {
    fn default() -> Self {
        Self::identity()
    }
}

fn check_period(time_per_cycle: Chrono) -> Result<()> {
    if !(time_per_cycle.is_finite() && time_per_cycle > 0.0) {
        return Err(Error::invalid_argument(format!(
            "time per cycle must be positive, got {}",
            time_per_cycle
        )));
    }
    Ok(())
}

fn check_times(times: &[Chrono]) -> Result<()> {
    if times.is_empty() {
        return Err(Error::invalid_argument("time sampling needs at least one time"));
    }
    if times.iter().any(|t| !t.is_finite()) {
        return Err(Error::invalid_argument("sample times must be finite"));
    }
    if times.windows(2).any(|w| w[1] < w[0]) {
        return Err(Error::invalid_argument("sample times must be non-decreasing"));
    }
    Ok(())
}

/// First index in `0..n` for which `pred` is false; `pred` must be monotone.
fn partition_point(n: usize, pred: impl Fn(usize) -> bool) -> usize {
    let (mut lo, mut hi) = (0, n);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if pred(mid) {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

/// Interned time samplings of one archive.
///
/// Also tracks, per descriptor, the largest number of samples any property
/// wrote against it.
#[derive(Clone, Debug)]
pub struct TimeSamplingRegistry {
    samplings: Vec<TimeSampling>,
    max_samples: Vec<u64>,
}

impl TimeSamplingRegistry {
    /// Registry holding only the identity sampling at id 0.
    pub fn new() -> Self {
        Self {
            samplings: vec![TimeSampling::identity()],
            max_samples: vec![0],
        }
    }

    /// Rebuild from stored `(descriptor, max samples)` pairs.
    pub fn from_parts(parts: Vec<(TimeSampling, u64)>) -> Result<Self> {
        match parts.first() {
            Some((ts, _)) if ts.is_identity() => {}
            _ => return Err(Error::invalid_format("time sampling 0 is not the identity")),
        }
        let (samplings, max_samples) = parts.into_iter().unzip();
        Ok(Self {
            samplings,
            max_samples,
        })
    }

    /// Register a descriptor, returning the id of an equal one if present.
    pub fn add(&mut self, ts: TimeSampling) -> u32 {
        if let Some(id) = self.samplings.iter().position(|t| *t == ts) {
            return id as u32;
        }
        self.samplings.push(ts);
        self.max_samples.push(0);
        (self.samplings.len() - 1) as u32
    }

    /// Descriptor by id; unknown ids are an `InvalidArgument`.
    pub fn get(&self, id: u32) -> Result<&TimeSampling> {
        self.samplings.get(id as usize).ok_or_else(|| {
            Error::invalid_argument(format!(
                "time sampling id {} not registered ({} known)",
                id,
                self.samplings.len()
            ))
        })
    }

    pub fn contains(&self, id: u32) -> bool {
        (id as usize) < self.samplings.len()
    }

    pub fn len(&self) -> usize {
        self.samplings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samplings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimeSampling> {
        self.samplings.iter()
    }

    /// Record that a property holds `count` samples on sampling `id`.
    pub fn note_samples(&mut self, id: u32, count: u64) {
        if let Some(max) = self.max_samples.get_mut(id as usize) {
            *max = (*max).max(count);
        }
    }

    /// Largest sample count written against `id`.
    pub fn max_samples(&self, id: u32) -> Option<u64> {
        self.max_samples.get(id as usize).copied()
    }

    /// `(descriptor, max samples)` pairs in id order.
    pub fn parts(&self) -> impl Iterator<Item = (&TimeSampling, u64)> {
        self.samplings.iter().zip(self.max_samples.iter().copied())
    }
}

impl Default for TimeSamplingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::ErrorKind;

    #[test]
    fn test_uniform_times() {
        let ts = TimeSampling::uniform(1.0 / 24.0, 0.0).unwrap();
        assert_eq!(ts.sample_time(0).unwrap(), 0.0);
        assert!((ts.sample_time(24).unwrap() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_cyclic_times() {
        let ts = TimeSampling::cyclic(1.0, vec![0.0, 0.25, 0.5]).unwrap();
        assert_eq!(ts.sample_time(2).unwrap(), 0.5);
        assert_eq!(ts.sample_time(4).unwrap(), 1.25);
        assert_eq!(ts.sampling_type().samples_per_cycle(), 3);
    }

    #[test]
    fn test_acyclic_times() {
        let ts = TimeSampling::acyclic(vec![0.0, 0.5, 1.0, 2.0]).unwrap();
        assert_eq!(ts.sample_time(3).unwrap(), 2.0);
        let err = ts.sample_time(4).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_validation() {
        assert!(TimeSampling::uniform(0.0, 0.0).is_err());
        assert!(TimeSampling::uniform(-1.0, 0.0).is_err());
        assert!(TimeSampling::acyclic(vec![]).is_err());
        assert!(TimeSampling::acyclic(vec![1.0, 0.5]).is_err());
        assert!(TimeSampling::acyclic(vec![1.0, 1.0]).is_ok());
        assert!(TimeSampling::cyclic(0.5, vec![0.0, 1.0]).is_err());
    }

    #[test]
    fn test_floor_ceil_uniform() {
        let ts = TimeSampling::uniform(1.0, 0.0).unwrap();
        assert_eq!(ts.floor_index(0.5, 10).0, 0);
        assert_eq!(ts.floor_index(1.5, 10).0, 1);
        assert_eq!(ts.floor_index(5.0, 10).0, 5);
        assert_eq!(ts.ceil_index(1.5, 10).0, 2);
        assert_eq!(ts.ceil_index(5.0, 10).0, 5);
        assert_eq!(ts.ceil_index(50.0, 10).0, 9);
        assert_eq!(ts.near_index(1.4, 10).0, 1);
        assert_eq!(ts.near_index(1.5, 10).0, 2);
    }

    #[test]
    fn test_floor_near_boundary_rounding() {
        let ts = TimeSampling::uniform(0.1, 0.0).unwrap();
        // 0.3 / 0.1 floors to 2 in binary floating point.
        assert_eq!(ts.floor_index(0.3, 10).0, 3);
    }

    #[test]
    fn test_acyclic_lookup() {
        let ts = TimeSampling::acyclic(vec![0.0, 0.5, 2.0]).unwrap();
        assert_eq!(ts.floor_index(1.0, 3), (1, 0.5));
        assert_eq!(ts.ceil_index(1.0, 3), (2, 2.0));
        assert_eq!(ts.floor_index(-1.0, 3), (0, 0.0));
        // Property holds more samples than the sampling has times.
        assert_eq!(ts.floor_index(10.0, 7), (2, 2.0));
    }

    #[test]
    fn test_interp_boundaries() {
        let ts = TimeSampling::uniform(1.0 / 24.0, 0.25).unwrap();
        assert_eq!(ts.interp(0.0, 100), SampleInterp::exact(0));
        assert_eq!(ts.interp(100.0, 100), SampleInterp::exact(99));
        let mid = ts.sample_time(37).unwrap();
        assert_eq!(ts.interp(mid, 100), SampleInterp::exact(37));

        let half = ts.interp(0.25 + 0.5 / 24.0, 100);
        assert_eq!((half.floor_index, half.ceil_index), (0, 1));
        assert!((half.alpha - 0.5).abs() < 1e-9);
        assert_eq!(ts.interp(1.0, 0), SampleInterp::exact(0));
    }

    #[test]
    fn test_stored_roundtrip() {
        for ts in [
            TimeSampling::uniform(0.5, 2.0).unwrap(),
            TimeSampling::cyclic(1.0, vec![0.0, 0.3]).unwrap(),
            TimeSampling::acyclic(vec![1.0, 4.0]).unwrap(),
        ] {
            let (tag, tpc, times) = ts.to_stored();
            assert_eq!(TimeSampling::from_stored(tag, tpc, times).unwrap(), ts);
        }
        let err = TimeSampling::from_stored(7, 1.0, vec![]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFormat);
    }

    #[test]
    fn test_registry_dedup() {
        let mut reg = TimeSamplingRegistry::new();
        assert_eq!(reg.len(), 1);
        assert!(reg.get(0).unwrap().is_identity());
        assert_eq!(reg.add(TimeSampling::identity()), 0);

        let a = reg.add(TimeSampling::uniform(1.0 / 24.0, 0.0).unwrap());
        let b = reg.add(TimeSampling::uniform(1.0 / 24.0, 0.0).unwrap());
        let c = reg.add(TimeSampling::uniform(1.0 / 30.0, 0.0).unwrap());
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(reg.get(42).unwrap_err().kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_registry_max_samples() {
        let mut reg = TimeSamplingRegistry::new();
        let id = reg.add(TimeSampling::uniform(2.0, 0.0).unwrap());
        reg.note_samples(id, 4);
        reg.note_samples(id, 2);
        assert_eq!(reg.max_samples(id), Some(4));
        assert_eq!(reg.max_samples(9), None);

        let parts: Vec<_> = reg.parts().map(|(t, n)| (t.clone(), n)).collect();
        let back = TimeSamplingRegistry::from_parts(parts).unwrap();
        assert_eq!(back.max_samples(id), Some(4));
    }
}
