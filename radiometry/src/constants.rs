/// Speed of light in cm/ns.
pub const SPEED_OF_LIGHT: f64 = 29.979_245_8;

/// Avogadro's number, 1/mol.
pub const AVOGADRO: f64 = 6.022_140_76e23;

/// One barn in cm^2.
pub const BARN_CM2: f64 = 1.0e-24;

/// Joules per keV.
pub const JOULES_PER_KEV: f64 = 1.602_176_634e-16;

/// Rest energies in keV.
pub const NEUTRON_REST_ENERGY: f32 = 939_600.0;
pub const MUON_REST_ENERGY: f32 = 105_700.0;
pub const ELECTRON_REST_ENERGY: f32 = 511.0;
pub const ALPHA_REST_ENERGY: f32 = 3_728_000.0;
