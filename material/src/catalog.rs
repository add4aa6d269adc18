use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use radiometry::RadiationType;

use crate::{AttenuationSample, AttenuationTable, InteractionModel, Material, MaterialError};

/// Index of a material inside a `MaterialCatalog`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub usize);

impl Display for MaterialId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "material#{}", self.0)
    }
}

/// Named set of materials. Built up front, then shared read-only with the engine.
#[derive(Debug, Clone, Default)]
pub struct MaterialCatalog {
    materials: Vec<Material>,
    by_name: HashMap<String, MaterialId>,
}

impl MaterialCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with the built-in shielding materials: Lead, Steel, Copper, Polyethylene,
    /// Concrete, Water, Air and Vacuum.
    pub fn with_defaults() -> Self {
        let mut catalog = Self::new();
        for m in [lead(), steel(), copper(), polyethylene(), concrete(), water(), air(), vacuum()] {
            catalog.push(m);
        }
        catalog
    }

    pub fn add(&mut self, material: Material) -> Result<MaterialId, MaterialError> {
        if self.by_name.contains_key(material.name()) {
            return Err(MaterialError::DuplicateName(material.name().to_owned()));
        }
        Ok(self.push(material))
    }

    fn push(&mut self, material: Material) -> MaterialId {
        let id = MaterialId(self.materials.len());
        self.by_name.insert(material.name().to_owned(), id);
        self.materials.push(material);
        id
    }

    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0)
    }
    pub fn id_of(&self, name: &str) -> Option<MaterialId> {
        self.by_name.get(name).copied()
    }
    pub fn by_name(&self, name: &str) -> Option<&Material> {
        self.id_of(name).and_then(|id| self.get(id))
    }
    pub fn len(&self) -> usize {
        self.materials.len()
    }
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.materials.iter().map(|m| m.name())
    }
    pub fn iter(&self) -> impl Iterator<Item = (MaterialId, &Material)> {
        self.materials.iter().enumerate().map(|(i, m)| (MaterialId(i), m))
    }
}

// Built-in materials
// ------------------------------------------------------------------------------------------------

/// Energies from 10 keV to 10 MeV in steps of x1.5.
fn default_energies() -> Vec<f32> {
    std::iter::successors(Some(10.0f32), |e| Some(e * 1.5))
        .take_while(|&e| e <= 10_000.0)
        .collect()
}

/// Gamma table following `mu(E) = density * scale * (E / 1 MeV)^exponent`.
fn gamma_power_law(density: f32, scale: f32, exponent: f32) -> AttenuationTable {
    let samples = default_energies()
        .into_iter()
        .map(|e| {
            let mu = density * scale * (e / 1000.0).powf(exponent);
            AttenuationSample::new(e, mu, mu / density, 0.0)
        })
        .collect();
    AttenuationTable { samples }
}

fn preset(name: &str, density: f32, elements: &[(u32, &str, f32, f32)]) -> Material {
    let mut m = Material {
        name: name.to_owned(),
        density,
        composition: vec![],
        tables: HashMap::new(),
        model: InteractionModel::default(),
    };
    for &(z, symbol, fraction, mass) in elements {
        m.add_element(z, symbol, fraction, mass);
    }
    m
}

pub fn lead() -> Material {
    let mut m = preset("Lead", 11.34, &[(82, "Pb", 1.0, 207.2)]);
    m.set_table(RadiationType::Gamma, gamma_power_law(11.34, 5.0, -0.7));
    m
}

pub fn steel() -> Material {
    let mut m = preset("Steel", 7.87, &[(26, "Fe", 0.98, 55.845), (6, "C", 0.02, 12.011)]);
    m.set_table(RadiationType::Gamma, gamma_power_law(7.87, 0.8, -0.5));
    m
}

pub fn copper() -> Material {
    let mut m = preset("Copper", 8.96, &[(29, "Cu", 1.0, 63.546)]);
    m.set_table(RadiationType::Gamma, gamma_power_law(8.96, 1.2, -0.6));
    m
}

/// Hydrogen-rich moderator. Only neutron cross sections are tabulated, `sigma = 20 E^-1/2` barns
/// from 10 eV to about 1 MeV.
pub fn polyethylene() -> Material {
    let mut m = preset("Polyethylene", 0.92, &[(1, "H", 0.143, 1.008), (6, "C", 0.857, 12.011)]);
    let samples = std::iter::successors(Some(0.01f32), |e| Some(e * 2.0))
        .take_while(|&e| e <= 1000.0)
        .map(|e| AttenuationSample::new(e, 0.0, 0.0, 20.0 * e.powf(-0.5)))
        .collect();
    m.set_table(RadiationType::Neutron, AttenuationTable { samples });
    m
}

pub fn concrete() -> Material {
    let mut m = preset(
        "Concrete",
        2.3,
        &[(14, "Si", 0.315, 28.085), (20, "Ca", 0.444, 40.078), (8, "O", 0.241, 15.999)],
    );
    m.set_table(RadiationType::Gamma, gamma_power_law(2.3, 0.3, -0.4));
    m
}

pub fn water() -> Material {
    let mut m = preset("Water", 1.0, &[(1, "H", 0.111, 1.008), (8, "O", 0.889, 15.999)]);
    m.set_table(RadiationType::Gamma, gamma_power_law(1.0, 0.15, -0.3));
    m
}

pub fn air() -> Material {
    let mut m = preset(
        "Air",
        0.001225,
        &[(7, "N", 0.781, 14.007), (8, "O", 0.209, 15.999), (18, "Ar", 0.01, 39.948)],
    );
    m.set_table(RadiationType::Gamma, gamma_power_law(0.001225, 0.001, -0.3));
    m
}

pub fn vacuum() -> Material {
    preset("Vacuum", 0.0, &[])
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_are_registered_by_name() {
        let catalog = MaterialCatalog::with_defaults();
        assert_eq!(catalog.len(), 8);
        let names = catalog.names().collect::<Vec<_>>();
        assert_eq!(
            names,
            vec!["Lead", "Steel", "Copper", "Polyethylene", "Concrete", "Water", "Air", "Vacuum"]
        );
        let lead_id = catalog.id_of("Lead").unwrap();
        assert_eq!(catalog.get(lead_id).unwrap().density(), 11.34);
        assert!(catalog.by_name("Unobtainium").is_none());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut catalog = MaterialCatalog::with_defaults();
        assert_eq!(
            catalog.add(water()).unwrap_err(),
            MaterialError::DuplicateName("Water".to_owned())
        );
        let id = catalog.add(Material::new("Boron", 2.34).unwrap()).unwrap();
        assert_eq!(id, MaterialId(8));
    }

    #[test]
    fn lead_attenuates_more_at_low_energy() {
        let lead = lead();
        let at_100 = lead.linear_attenuation(RadiationType::Gamma, 100.0);
        let at_1000 = lead.linear_attenuation(RadiationType::Gamma, 1000.0);
        assert!(at_100 > at_1000);
        // 1 MeV is not a grid point; log-log interpolation of a power law is exact.
        assert!((at_1000 - 11.34 * 5.0).abs() / (11.34 * 5.0) < 1e-3, "mu = {}", at_1000);
        assert_eq!(lead.linear_attenuation(RadiationType::Neutron, 1000.0), 0.0);
    }

    #[test]
    fn polyethylene_uses_cross_sections_for_neutrons() {
        let poly = polyethylene();
        assert!(poly.linear_attenuation(RadiationType::Neutron, 1.0) > 0.0);
        assert_eq!(poly.linear_attenuation(RadiationType::Gamma, 1.0), 0.0);
        assert_eq!(vacuum().linear_attenuation(RadiationType::Gamma, 100.0), 0.0);
    }
}
