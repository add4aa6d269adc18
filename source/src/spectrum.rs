use itertools::Itertools;
use math::float::lerp;
use rand::Rng;

use crate::SourceError;

/// Rejection sampling gives up after this many draws and returns the middle of the range.
const MAX_REJECTION_ATTEMPTS: usize = 1000;

/// Energy distribution of the particles a source emits, in keV.
#[derive(Debug, Clone, PartialEq)]
pub enum EnergySpectrum {
    Monoenergetic(f32),
    /// `(energy, relative intensity)` points in ascending energy order; the intensity is linearly
    /// interpolated between points.
    Continuous(Vec<(f32, f32)>),
    /// `(energy, relative intensity)` emission lines.
    Discrete(Vec<(f32, f32)>),
}

impl EnergySpectrum {
    pub fn continuous(points: Vec<(f32, f32)>) -> Result<Self, SourceError> {
        check_points(&points)?;
        if let Some((a, b)) = points.iter().tuple_windows().find(|(a, b)| a.0 >= b.0) {
            return Err(SourceError::NotAscending(a.0, b.0));
        }
        Ok(EnergySpectrum::Continuous(points))
    }

    pub fn discrete(lines: Vec<(f32, f32)>) -> Result<Self, SourceError> {
        check_points(&lines)?;
        if lines.iter().all(|&(_, intensity)| intensity == 0.0) {
            return Err(SourceError::ZeroIntensity);
        }
        Ok(EnergySpectrum::Discrete(lines))
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        match self {
            EnergySpectrum::Monoenergetic(e) => *e,
            EnergySpectrum::Continuous(points) => sample_continuous(points, rng),
            EnergySpectrum::Discrete(lines) => sample_discrete(lines, rng),
        }
    }

    /// Smallest and largest energy the spectrum can produce.
    pub fn energy_range(&self) -> Option<(f32, f32)> {
        match self {
            EnergySpectrum::Monoenergetic(e) => Some((*e, *e)),
            EnergySpectrum::Continuous(points) => Some((points.first()?.0, points.last()?.0)),
            EnergySpectrum::Discrete(lines) => lines
                .iter()
                .map(|l| l.0)
                .minmax()
                .into_option(),
        }
    }
}

fn check_points(points: &[(f32, f32)]) -> Result<(), SourceError> {
    if points.is_empty() {
        return Err(SourceError::EmptySpectrum);
    }
    for &(energy, intensity) in points {
        if !(energy.is_finite() && energy > 0.0) {
            return Err(SourceError::InvalidEnergy(energy));
        }
        if !(intensity.is_finite() && intensity >= 0.0) {
            return Err(SourceError::InvalidIntensity(intensity));
        }
    }
    Ok(())
}

fn interpolate_intensity(points: &[(f32, f32)], energy: f32) -> f32 {
    let (first, last) = match (points.first(), points.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return 1.0,
    };
    if energy <= first.0 {
        return first.1;
    }
    if energy >= last.0 {
        return last.1;
    }
    let hi = points.partition_point(|p| p.0 < energy);
    let (p0, p1) = (points[hi - 1], points[hi]);
    lerp(p0.1, p1.1, (energy - p0.0) / (p1.0 - p0.0))
}

fn sample_continuous<R: Rng + ?Sized>(points: &[(f32, f32)], rng: &mut R) -> f32 {
    let (min_energy, max_energy) = match (points.first(), points.last()) {
        (Some(first), Some(last)) => (first.0, last.0),
        _ => return 0.0,
    };
    if max_energy <= min_energy {
        return min_energy;
    }
    let max_intensity = points.iter().map(|p| p.1).fold(0.0f32, f32::max);
    if max_intensity <= 0.0 {
        return (min_energy + max_energy) * 0.5;
    }
    for _ in 0..MAX_REJECTION_ATTEMPTS {
        let e = rng.gen_range(min_energy..max_energy);
        if rng.gen::<f32>() * max_intensity <= interpolate_intensity(points, e) {
            return e;
        }
    }
    (min_energy + max_energy) * 0.5
}

fn sample_discrete<R: Rng + ?Sized>(lines: &[(f32, f32)], rng: &mut R) -> f32 {
    let total: f32 = lines.iter().map(|l| l.1).sum();
    if total <= 0.0 {
        return lines.first().map_or(0.0, |l| l.0);
    }
    let mut target = rng.gen::<f32>() * total;
    for &(energy, intensity) in lines {
        if target < intensity {
            return energy;
        }
        target -= intensity;
    }
    // Rounding can leave the target just past the last line.
    lines
        .iter()
        .rev()
        .find(|l| l.1 > 0.0)
        .map_or(0.0, |l| l.0)
}
