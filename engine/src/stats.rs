use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Plain counters of a (part of a) run. Workers fill one locally and flush it into the shared
/// `SimulationStats` at batch boundaries.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatsSnapshot {
    /// Primary particles emitted by the sources.
    pub particles_emitted: u64,
    /// Histories run to termination, split copies included.
    pub particles_transported: u64,
    pub particles_absorbed: u64,
    pub particles_detected: u64,
    pub particles_escaped: u64,
    /// Histories cut at the step limit; also counted as absorbed.
    pub particles_truncated: u64,
    pub total_collisions: u64,
    pub ray_intersections: u64,
    pub elapsed_secs: f64,
}

impl StatsSnapshot {
    /// Adds the counters of `other`. Elapsed times overlap, so the longer one is kept.
    pub fn merge(&mut self, other: &StatsSnapshot) {
        self.particles_emitted += other.particles_emitted;
        self.particles_transported += other.particles_transported;
        self.particles_absorbed += other.particles_absorbed;
        self.particles_detected += other.particles_detected;
        self.particles_escaped += other.particles_escaped;
        self.particles_truncated += other.particles_truncated;
        self.total_collisions += other.total_collisions;
        self.ray_intersections += other.ray_intersections;
        self.elapsed_secs = self.elapsed_secs.max(other.elapsed_secs);
    }

    /// Transported histories per second.
    pub fn particle_rate(&self) -> f64 {
        if self.elapsed_secs > 0.0 {
            self.particles_transported as f64 / self.elapsed_secs
        } else {
            0.0
        }
    }

    pub fn terminated(&self) -> u64 {
        self.particles_absorbed + self.particles_detected + self.particles_escaped
    }
}

impl Display for StatsSnapshot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "emitted      {:>12}", self.particles_emitted)?;
        writeln!(f, "transported  {:>12}", self.particles_transported)?;
        writeln!(f, "absorbed     {:>12}", self.particles_absorbed)?;
        writeln!(f, "detected     {:>12}", self.particles_detected)?;
        writeln!(f, "escaped      {:>12}", self.particles_escaped)?;
        writeln!(f, "truncated    {:>12}", self.particles_truncated)?;
        writeln!(f, "collisions   {:>12}", self.total_collisions)?;
        writeln!(f, "ray casts    {:>12}", self.ray_intersections)?;
        write!(
            f,
            "elapsed      {:>12.3} s ({:.0} particles/s)",
            self.elapsed_secs,
            self.particle_rate()
        )
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Run statistics shared by every worker.
#[derive(Debug, Default)]
pub struct SimulationStats {
    particles_emitted: AtomicU64,
    particles_transported: AtomicU64,
    particles_absorbed: AtomicU64,
    particles_detected: AtomicU64,
    particles_escaped: AtomicU64,
    particles_truncated: AtomicU64,
    total_collisions: AtomicU64,
    ray_intersections: AtomicU64,
    start_time: Mutex<Option<Instant>>,
    end_time: Mutex<Option<Instant>>,
}

impl SimulationStats {
    pub fn add(&self, s: &StatsSnapshot) {
        let pairs = [
            (&self.particles_emitted, s.particles_emitted),
            (&self.particles_transported, s.particles_transported),
            (&self.particles_absorbed, s.particles_absorbed),
            (&self.particles_detected, s.particles_detected),
            (&self.particles_escaped, s.particles_escaped),
            (&self.particles_truncated, s.particles_truncated),
            (&self.total_collisions, s.total_collisions),
            (&self.ray_intersections, s.ray_intersections),
        ];
        for (counter, value) in pairs.iter() {
            if *value > 0 {
                counter.fetch_add(*value, Ordering::Relaxed);
            }
        }
    }

    pub fn particles_emitted(&self) -> u64 {
        self.particles_emitted.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            particles_emitted: self.particles_emitted.load(Ordering::Relaxed),
            particles_transported: self.particles_transported.load(Ordering::Relaxed),
            particles_absorbed: self.particles_absorbed.load(Ordering::Relaxed),
            particles_detected: self.particles_detected.load(Ordering::Relaxed),
            particles_escaped: self.particles_escaped.load(Ordering::Relaxed),
            particles_truncated: self.particles_truncated.load(Ordering::Relaxed),
            total_collisions: self.total_collisions.load(Ordering::Relaxed),
            ray_intersections: self.ray_intersections.load(Ordering::Relaxed),
            elapsed_secs: self.elapsed_secs(),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.particles_emitted,
            &self.particles_transported,
            &self.particles_absorbed,
            &self.particles_detected,
            &self.particles_escaped,
            &self.particles_truncated,
            &self.total_collisions,
            &self.ray_intersections,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        *lock(&self.start_time) = None;
        *lock(&self.end_time) = None;
    }

    pub fn mark_start(&self) {
        *lock(&self.start_time) = Some(Instant::now());
        *lock(&self.end_time) = None;
    }

    /// Starts the clock unless it is already running or has run.
    pub fn mark_start_if_unset(&self) {
        let mut start = lock(&self.start_time);
        if start.is_none() {
            *start = Some(Instant::now());
        }
    }

    pub fn mark_end(&self) {
        *lock(&self.end_time) = Some(Instant::now());
    }

    /// Seconds between start and end, or until now while running.
    pub fn elapsed_secs(&self) -> f64 {
        let start = match *lock(&self.start_time) {
            Some(t) => t,
            None => return 0.0,
        };
        let end = *lock(&self.end_time);
        let end = end.unwrap_or_else(Instant::now);
        end.saturating_duration_since(start).as_secs_f64()
    }

    pub fn particle_rate(&self) -> f64 {
        self.snapshot().particle_rate()
    }
}
