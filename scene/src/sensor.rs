use std::sync::atomic::{AtomicU64, Ordering};

use geometry::bbox::BBox;
use geometry::ray::Ray;
use math::float::Interval;
use math::hcm::{Point3, Vec3};
use radiometry::constants::JOULES_PER_KEV;
use radiometry::{Particle, RadiationType};

/// Thickness along z of surface sensors, cm.
pub const SURFACE_SENSOR_THICKNESS: f32 = 0.02;
/// Point sensors never get a radius below this, cm.
pub const MIN_SENSOR_RADIUS: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorGeometry {
    /// Sphere around the sensor position.
    Point { radius: f32 },
    /// Axis-aligned box of the given full size centered on the sensor position.
    Volume { size: Vec3 },
    /// Thin axis-aligned slab lying in the xy-plane, centered on the sensor position.
    Surface { width: f32, height: f32 },
}

/// f64 accumulator on top of an `AtomicU64` holding the bit pattern.
#[derive(Debug, Default)]
struct AtomicF64(AtomicU64);

impl AtomicF64 {
    fn add(&self, x: f64) {
        let _ = self.0.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
            Some((f64::from_bits(bits) + x).to_bits())
        });
    }
    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }
    fn reset(&self) {
        self.0.store(0.0f64.to_bits(), Ordering::Relaxed);
    }
}

#[derive(Debug, Default)]
struct SensorStats {
    total_counts: AtomicU64,
    gamma_counts: AtomicU64,
    neutron_counts: AtomicU64,
    muon_counts: AtomicU64,
    weighted_counts: AtomicF64,
    /// keV, weighted
    energy: AtomicF64,
}

/// Plain snapshot of a sensor's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorTally {
    pub total_counts: u64,
    /// Gamma and X-ray counts.
    pub gamma_counts: u64,
    pub neutron_counts: u64,
    pub muon_counts: u64,
    /// Sum of the statistical weights of the recorded particles.
    pub weighted_counts: f64,
    /// Deposited energy in keV, weighted.
    pub energy_kev: f64,
    /// Dose in J, quality factor 1.
    pub dose_joules: f64,
}

impl SensorTally {
    pub fn merge(&mut self, other: &SensorTally) {
        self.total_counts += other.total_counts;
        self.gamma_counts += other.gamma_counts;
        self.neutron_counts += other.neutron_counts;
        self.muon_counts += other.muon_counts;
        self.weighted_counts += other.weighted_counts;
        self.energy_kev += other.energy_kev;
        self.dose_joules += other.dose_joules;
    }

    /// Counts per second over `elapsed_secs`.
    pub fn count_rate(&self, elapsed_secs: f64) -> f64 {
        if elapsed_secs > 0.0 {
            self.total_counts as f64 / elapsed_secs
        } else {
            0.0
        }
    }

    pub fn dose_rate_usv_per_h(&self, elapsed_secs: f64) -> f64 {
        let hours = elapsed_secs / 3600.0;
        if hours > 0.0 {
            self.dose_joules * 1e6 / hours
        } else {
            0.0
        }
    }

    /// Intrinsic detection efficiency; every particle that reaches a sensor is counted.
    pub fn efficiency(&self) -> f64 {
        1.0
    }

    /// Detected count rate relative to an incident rate.
    pub fn attenuation_factor(&self, incident_rate: f64, elapsed_secs: f64) -> f64 {
        if incident_rate > 0.0 {
            self.count_rate(elapsed_secs) / incident_rate
        } else {
            0.0
        }
    }
}

/// A detector placed in the scene.
///
/// Passive sensors only tally the particles crossing them; absorbing sensors also stop them.
/// Counters are atomic so that every transport worker can record through a shared reference.
#[derive(Debug)]
pub struct Sensor {
    name: String,
    geometry: SensorGeometry,
    position: Point3,
    enabled: bool,
    energy_window: Option<Interval>,
    radiation_filter: Vec<RadiationType>,
    absorbing: bool,
    stats: SensorStats,
}

impl Sensor {
    pub fn new(name: &str, geometry: SensorGeometry, position: Point3) -> Self {
        Self {
            name: name.to_owned(),
            geometry,
            position,
            enabled: true,
            energy_window: None,
            radiation_filter: vec![],
            absorbing: false,
            stats: SensorStats::default(),
        }
    }

    pub fn point(name: &str, position: Point3, radius: f32) -> Self {
        Self::new(name, SensorGeometry::Point { radius }, position)
    }
    pub fn volume(name: &str, position: Point3, size: Vec3) -> Self {
        Self::new(name, SensorGeometry::Volume { size }, position)
    }
    pub fn surface(name: &str, position: Point3, width: f32, height: f32) -> Self {
        Self::new(name, SensorGeometry::Surface { width, height }, position)
    }

    pub fn with_energy_window(mut self, min: f32, max: f32) -> Self {
        self.set_energy_window(Some(Interval::new(min, max)));
        self
    }
    pub fn with_radiation_filter(mut self, kinds: &[RadiationType]) -> Self {
        self.radiation_filter = kinds.to_vec();
        self
    }
    pub fn absorbing(mut self) -> Self {
        self.absorbing = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn geometry(&self) -> SensorGeometry {
        self.geometry
    }
    pub fn position(&self) -> Point3 {
        self.position
    }
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
    pub fn is_absorbing(&self) -> bool {
        self.absorbing
    }
    pub fn energy_window(&self) -> Option<Interval> {
        self.energy_window
    }
    pub fn radiation_filter(&self) -> &[RadiationType] {
        &self.radiation_filter
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_owned();
    }
    pub fn set_geometry(&mut self, geometry: SensorGeometry) {
        self.geometry = geometry;
    }
    pub fn set_position(&mut self, position: Point3) {
        self.position = position;
    }
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
    pub fn set_absorbing(&mut self, absorbing: bool) {
        self.absorbing = absorbing;
    }
    pub fn set_energy_window(&mut self, window: Option<Interval>) {
        self.energy_window = window;
    }
    pub fn set_radiation_filter(&mut self, kinds: Vec<RadiationType>) {
        self.radiation_filter = kinds;
    }

    fn effective_radius(radius: f32) -> f32 {
        radius.max(MIN_SENSOR_RADIUS)
    }

    /// Detection volume as a box; for point sensors, the sphere's bounding box.
    pub fn bbox(&self) -> BBox {
        let size = match self.geometry {
            SensorGeometry::Point { radius } => Vec3::ONE * (2.0 * Self::effective_radius(radius)),
            SensorGeometry::Volume { size } => size,
            SensorGeometry::Surface { width, height } => {
                Vec3::new(width, height, SURFACE_SENSOR_THICKNESS)
            }
        };
        BBox::centered(self.position, size)
    }

    /// Enabled, and the particle passes the type and energy filters.
    pub fn accepts(&self, p: &Particle) -> bool {
        self.enabled
            && (self.radiation_filter.is_empty() || self.radiation_filter.contains(&p.kind()))
            && self.energy_window.map_or(true, |w| w.contains(p.energy()))
    }

    pub fn contains(&self, point: Point3) -> bool {
        match self.geometry {
            SensorGeometry::Point { radius } => {
                point.distance_to(self.position) <= Self::effective_radius(radius)
            }
            _ => self.bbox().contains(point),
        }
    }

    /// Whether the particle, where it stands, would be detected.
    pub fn detects(&self, p: &Particle) -> bool {
        self.accepts(p) && self.contains(p.position())
    }

    /// Distance along the segment `origin + t * dir`, `t` in `[0, length]`, at which the segment
    /// first enters the detection volume; zero if `origin` is already inside. `dir` must be unit.
    pub fn intersects_segment(&self, origin: Point3, dir: Vec3, length: f32) -> Option<f32> {
        if !self.enabled || !(length >= 0.0) {
            return None;
        }
        match self.geometry {
            SensorGeometry::Point { radius } => {
                let r = Self::effective_radius(radius);
                let oc = origin - self.position;
                let c = oc.norm_squared() - r * r;
                if c <= 0.0 {
                    return Some(0.0);
                }
                let b = dir.dot(oc);
                let disc = b * b - c;
                if b > 0.0 || disc < 0.0 {
                    return None;
                }
                let t = -b - disc.sqrt();
                if t <= length {
                    Some(t.max(0.0))
                } else {
                    None
                }
            }
            _ => {
                let ray = Ray::new(origin, dir).with_t_min(0.0).with_extent(length);
                self.bbox().hit_range(&ray).map(|(t_enter, _)| t_enter)
            }
        }
    }

    /// Tallies the particle if it passes the filters. Returns whether it was counted.
    pub fn record(&self, p: &Particle) -> bool {
        if !self.accepts(p) {
            return false;
        }
        let stats = &self.stats;
        stats.total_counts.fetch_add(1, Ordering::Relaxed);
        match p.kind() {
            RadiationType::Gamma | RadiationType::XRay => {
                stats.gamma_counts.fetch_add(1, Ordering::Relaxed);
            }
            RadiationType::Neutron => {
                stats.neutron_counts.fetch_add(1, Ordering::Relaxed);
            }
            RadiationType::Muon => {
                stats.muon_counts.fetch_add(1, Ordering::Relaxed);
            }
            RadiationType::Beta | RadiationType::Alpha => (),
        }
        let weight = p.weight() as f64;
        stats.weighted_counts.add(weight);
        stats.energy.add(p.energy() as f64 * weight);
        true
    }

    pub fn tally(&self) -> SensorTally {
        let energy_kev = self.stats.energy.load();
        SensorTally {
            total_counts: self.stats.total_counts.load(Ordering::Relaxed),
            gamma_counts: self.stats.gamma_counts.load(Ordering::Relaxed),
            neutron_counts: self.stats.neutron_counts.load(Ordering::Relaxed),
            muon_counts: self.stats.muon_counts.load(Ordering::Relaxed),
            weighted_counts: self.stats.weighted_counts.load(),
            energy_kev,
            dose_joules: energy_kev * JOULES_PER_KEV,
        }
    }

    pub fn clear_stats(&self) {
        let stats = &self.stats;
        for counter in [
            &stats.total_counts,
            &stats.gamma_counts,
            &stats.neutron_counts,
            &stats.muon_counts,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        stats.weighted_counts.reset();
        stats.energy.reset();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use math::hcm::point3;

    fn gamma_at(p: Point3, energy: f32) -> Particle {
        Particle::new(RadiationType::Gamma, energy, p, Vec3::Z)
    }

    #[test]
    fn filters_on_type_and_energy() {
        let s = Sensor::point("s", Point3::ORIGIN, 1.0)
            .with_energy_window(600.0, 700.0)
            .with_radiation_filter(&[RadiationType::Gamma]);
        assert!(s.detects(&gamma_at(point3(0.5, 0.0, 0.0), 662.0)));
        assert!(!s.detects(&gamma_at(point3(0.5, 0.0, 0.0), 100.0)));
        assert!(!s.detects(&gamma_at(point3(1.5, 0.0, 0.0), 662.0)));
        let n = Particle::new(RadiationType::Neutron, 662.0, Point3::ORIGIN, Vec3::Z);
        assert!(!s.detects(&n));
        assert!(!s.record(&n));
    }

    #[test]
    fn disabled_sensor_sees_nothing() {
        let mut s = Sensor::volume("v", Point3::ORIGIN, Vec3::ONE);
        s.set_enabled(false);
        assert!(!s.detects(&gamma_at(Point3::ORIGIN, 10.0)));
        assert!(s.intersects_segment(point3(0.0, 0.0, -5.0), Vec3::Z, 10.0).is_none());
    }

    #[test]
    fn segment_entry_distances() {
        let sphere = Sensor::point("p", point3(0.0, 0.0, 5.0), 1.0);
        assert_eq!(sphere.intersects_segment(Point3::ORIGIN, Vec3::Z, 10.0), Some(4.0));
        assert_eq!(sphere.intersects_segment(Point3::ORIGIN, Vec3::Z, 3.0), None);
        assert_eq!(sphere.intersects_segment(Point3::ORIGIN, -Vec3::Z, 10.0), None);
        assert_eq!(sphere.intersects_segment(point3(0.0, 0.0, 5.5), Vec3::X, 0.0), Some(0.0));

        let plate = Sensor::surface("plate", point3(0.0, 0.0, 2.0), 4.0, 4.0);
        let t = plate.intersects_segment(Point3::ORIGIN, Vec3::Z, 10.0).unwrap();
        assert!((t - (2.0 - SURFACE_SENSOR_THICKNESS * 0.5)).abs() < 1e-6);
        // Grazing parallel to the plate, outside its thickness.
        assert!(plate.intersects_segment(point3(-5.0, 0.0, 1.0), Vec3::X, 10.0).is_none());
    }

    #[test]
    fn tallies_accumulate_and_clear() {
        let s = Sensor::volume("v", Point3::ORIGIN, Vec3::ONE);
        let mut p = gamma_at(Point3::ORIGIN, 100.0);
        p.set_weight(0.5);
        assert!(s.record(&p));
        assert!(s.record(&Particle::new(RadiationType::XRay, 20.0, Point3::ORIGIN, Vec3::Z)));
        assert!(s.record(&Particle::new(RadiationType::Alpha, 5000.0, Point3::ORIGIN, Vec3::Z)));
        let tally = s.tally();
        assert_eq!(tally.total_counts, 3);
        assert_eq!(tally.gamma_counts, 2);
        assert_eq!(tally.muon_counts, 0);
        assert!((tally.weighted_counts - 2.5).abs() < 1e-12);
        assert!((tally.energy_kev - 5070.0).abs() < 1e-9);
        assert!((tally.dose_joules - 5070.0 * JOULES_PER_KEV).abs() < 1e-24);
        assert_eq!(tally.count_rate(2.0), 1.5);
        assert_eq!(tally.count_rate(0.0), 0.0);

        let mut merged = tally;
        merged.merge(&tally);
        assert_eq!(merged.total_counts, 6);

        s.clear_stats();
        assert_eq!(s.tally(), SensorTally::default());
    }
}
