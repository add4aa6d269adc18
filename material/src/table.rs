use itertools::Itertools;
use math::float::loglog_lerp;

use crate::MaterialError;

/// One energy row of an attenuation table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttenuationSample {
    /// keV
    pub energy: f32,
    /// Linear attenuation coefficient, 1/cm.
    pub linear: f32,
    /// Mass attenuation coefficient, cm^2/g.
    pub mass: f32,
    /// Microscopic cross section, barns.
    pub cross_section: f32,
}

impl AttenuationSample {
    pub fn new(energy: f32, linear: f32, mass: f32, cross_section: f32) -> Self {
        Self {
            energy,
            linear,
            mass,
            cross_section,
        }
    }

    /// Row carrying only a linear coefficient.
    pub fn linear(energy: f32, linear: f32) -> Self {
        Self::new(energy, linear, 0.0, 0.0)
    }

    fn validate(&self) -> Result<(), MaterialError> {
        if !(self.energy.is_finite() && self.energy > 0.0) {
            return Err(MaterialError::InvalidEnergy(self.energy));
        }
        let values = [self.linear, self.mass, self.cross_section];
        if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(MaterialError::InvalidCoefficient {
                energy: self.energy,
            });
        }
        Ok(())
    }
}

/// Energy-ordered attenuation data for one radiation type.
///
/// Lookups clamp to the first and last rows and interpolate in log-log space between rows whose
/// values are both positive, linearly otherwise.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttenuationTable {
    pub(crate) samples: Vec<AttenuationSample>,
}

impl AttenuationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from rows given in strictly ascending energy order.
    pub fn from_samples(samples: Vec<AttenuationSample>) -> Result<Self, MaterialError> {
        for s in samples.iter() {
            s.validate()?;
        }
        if let Some((a, b)) = samples
            .iter()
            .tuple_windows()
            .find(|(a, b)| a.energy >= b.energy)
        {
            return Err(MaterialError::NotAscending {
                previous: a.energy,
                next: b.energy,
            });
        }
        Ok(Self { samples })
    }

    /// Inserts a row keeping the energy order. Rows at an energy already present are rejected.
    pub fn insert(&mut self, sample: AttenuationSample) -> Result<(), MaterialError> {
        sample.validate()?;
        match self
            .samples
            .binary_search_by(|s| s.energy.total_cmp(&sample.energy))
        {
            Ok(_) => Err(MaterialError::DuplicateEnergy(sample.energy)),
            Err(pos) => {
                self.samples.insert(pos, sample);
                Ok(())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
    pub fn samples(&self) -> &[AttenuationSample] {
        &self.samples
    }
    pub fn energy_range(&self) -> Option<(f32, f32)> {
        Some((self.samples.first()?.energy, self.samples.last()?.energy))
    }

    pub fn linear_at(&self, energy: f32) -> f32 {
        self.interpolate(energy, |s| s.linear)
    }
    pub fn mass_at(&self, energy: f32) -> f32 {
        self.interpolate(energy, |s| s.mass)
    }
    pub fn cross_section_at(&self, energy: f32) -> f32 {
        self.interpolate(energy, |s| s.cross_section)
    }

    fn interpolate<F>(&self, energy: f32, column: F) -> f32
    where
        F: Fn(&AttenuationSample) -> f32,
    {
        let (first, last) = match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return 0.0,
        };
        if self.samples.len() == 1 || energy <= first.energy {
            return column(first);
        }
        if energy >= last.energy {
            return column(last);
        }
        // First row with energy >= `energy`; never 0 here since energy > first.energy.
        let hi = self.samples.partition_point(|s| s.energy < energy);
        let (s0, s1) = (&self.samples[hi - 1], &self.samples[hi]);
        loglog_lerp((s0.energy, column(s0)), (s1.energy, column(s1)), energy)
    }
}
