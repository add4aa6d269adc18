mod catalog;
mod interaction;
mod table;

use std::collections::HashMap;

use math::hcm::Vec3;
use radiometry::constants::{AVOGADRO, BARN_CM2};
use radiometry::RadiationType;
use rand::Rng;
use thiserror::Error;

pub use catalog::*;
pub use interaction::*;
pub use table::*;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MaterialError {
    #[error("attenuation energies must be strictly ascending, got {previous} then {next}")]
    NotAscending { previous: f32, next: f32 },
    #[error("attenuation table already has a row at {0} keV")]
    DuplicateEnergy(f32),
    #[error("energy must be positive and finite, got {0}")]
    InvalidEnergy(f32),
    #[error("attenuation coefficients at {energy} keV must be finite and non-negative")]
    InvalidCoefficient { energy: f32 },
    #[error("density must be finite and non-negative, got {0}")]
    InvalidDensity(f32),
    #[error("material '{0}' already exists in the catalog")]
    DuplicateName(String),
}

/// One constituent element of a material's composition.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub atomic_number: u32,
    pub symbol: String,
    pub mass_fraction: f32,
    /// g/mol
    pub atomic_mass: f32,
}

/// A shielding material: density, elemental composition, attenuation tables per radiation type,
/// and the interaction model used when a particle collides inside it.
#[derive(Debug, Clone)]
pub struct Material {
    name: String,
    /// g/cm^3
    density: f32,
    composition: Vec<Element>,
    tables: HashMap<RadiationType, AttenuationTable>,
    model: InteractionModel,
}

impl Material {
    pub fn new(name: &str, density: f32) -> Result<Self, MaterialError> {
        if !density.is_finite() || density < 0.0 {
            return Err(MaterialError::InvalidDensity(density));
        }
        Ok(Self {
            name: name.to_owned(),
            density,
            composition: vec![],
            tables: HashMap::new(),
            model: InteractionModel::default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn density(&self) -> f32 {
        self.density
    }
    pub fn composition(&self) -> &[Element] {
        &self.composition
    }
    pub fn interaction_model(&self) -> &InteractionModel {
        &self.model
    }
    pub fn set_interaction_model(&mut self, model: InteractionModel) {
        self.model = model;
    }

    pub fn add_element(&mut self, atomic_number: u32, symbol: &str, mass_fraction: f32, atomic_mass: f32) {
        self.composition.push(Element {
            atomic_number,
            symbol: symbol.to_owned(),
            mass_fraction,
            atomic_mass,
        });
    }

    pub fn with_element(mut self, atomic_number: u32, symbol: &str, mass_fraction: f32, atomic_mass: f32) -> Self {
        self.add_element(atomic_number, symbol, mass_fraction, atomic_mass);
        self
    }

    /// Adds one row to the table of `kind`, keeping it sorted by energy.
    pub fn add_attenuation(&mut self, kind: RadiationType, sample: AttenuationSample) -> Result<(), MaterialError> {
        self.tables.entry(kind).or_default().insert(sample)
    }

    pub fn set_table(&mut self, kind: RadiationType, table: AttenuationTable) {
        self.tables.insert(kind, table);
    }

    pub fn table(&self, kind: RadiationType) -> Option<&AttenuationTable> {
        self.tables.get(&kind)
    }

    /// Mass fraction of hydrogen.
    pub fn hydrogen_content(&self) -> f32 {
        self.composition
            .iter()
            .find(|e| e.atomic_number == 1)
            .map_or(0.0, |e| e.mass_fraction)
    }

    /// Atoms per cm^3: `rho * N_A * sum(w_i / A_i)`.
    pub fn atom_density(&self) -> f64 {
        let moles_per_gram: f64 = self
            .composition
            .iter()
            .filter(|e| e.atomic_mass > 0.0)
            .map(|e| e.mass_fraction as f64 / e.atomic_mass as f64)
            .sum();
        self.density as f64 * AVOGADRO * moles_per_gram
    }

    /// Linear attenuation coefficient in 1/cm.
    ///
    /// Tables that only carry microscopic cross sections (typical for neutrons) are converted to
    /// a macroscopic coefficient with the material's atom density.
    pub fn linear_attenuation(&self, kind: RadiationType, energy: f32) -> f32 {
        let table = match self.tables.get(&kind) {
            Some(t) => t,
            None => return 0.0,
        };
        let mu = table.linear_at(energy);
        if mu > 0.0 {
            return mu;
        }
        let sigma = table.cross_section_at(energy);
        if sigma > 0.0 {
            (sigma as f64 * BARN_CM2 * self.atom_density()) as f32
        } else {
            mu
        }
    }

    pub fn mass_attenuation(&self, kind: RadiationType, energy: f32) -> f32 {
        self.tables.get(&kind).map_or(0.0, |t| t.mass_at(energy))
    }

    /// Microscopic cross section in barns.
    pub fn cross_section(&self, kind: RadiationType, energy: f32) -> f32 {
        self.tables.get(&kind).map_or(0.0, |t| t.cross_section_at(energy))
    }

    /// Mean free path in cm; infinite in a non-attenuating medium.
    pub fn mean_free_path(&self, kind: RadiationType, energy: f32) -> f32 {
        let mu = self.linear_attenuation(kind, energy);
        if mu > 0.0 {
            1.0 / mu
        } else {
            f32::INFINITY
        }
    }

    pub fn sample_interaction<R: Rng + ?Sized>(&self, kind: RadiationType, energy: f32, rng: &mut R) -> InteractionType {
        self.model.sample(kind, self.linear_attenuation(kind, energy), rng)
    }

    /// New direction after scattering at `energy`. The simplified model ignores the energy.
    pub fn sample_scattering<R: Rng + ?Sized>(&self, incident: Vec3, kind: RadiationType, _energy: f32, rng: &mut R) -> Vec3 {
        sample_scattering(incident, kind, rng)
    }

    pub fn sample_energy_loss<R: Rng + ?Sized>(&self, energy: f32, rng: &mut R) -> f32 {
        self.model.sample_energy_loss(energy, rng)
    }

    pub fn summary(&self) -> String {
        let mut kinds = self.tables.keys().copied().collect::<Vec<_>>();
        kinds.sort();
        format!(
            "Material{{{}, density = {} g/cm3, elements = [{}], tables = {:?}}}",
            self.name,
            self.density,
            self.composition
                .iter()
                .map(|e| e.symbol.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            kinds
        )
    }
}
