use rand::Rng;
use serde::Serialize;

use crate::reveal::VIRUS_DURATION;

/// Particles spawned by the takeover.
pub const BURST_SIZE: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", content = "index", rename_all = "snake_case")]
pub enum BurstSource {
    /// Index into the page's gallery images.
    Image(usize),
    /// The takeover message.
    Message,
}

/// One element of the takeover. Positions are percentages of the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub scale: f32,
    pub delay_ms: u32,
    pub source: BurstSource,
}

/// Scatters `count` particles over the viewport. Spawn delays stay within
/// the first 80% of the takeover so every particle is seen before it ends.
pub fn burst_layout<R: Rng + ?Sized>(rng: &mut R, count: usize, images: usize) -> Vec<Particle> {
    let max_delay = (VIRUS_DURATION.as_millis() as u32) * 4 / 5;
    (0..count)
        .map(|_| {
            let source = if images > 0 && rng.random_bool(0.6) {
                BurstSource::Image(rng.random_range(0..images))
            } else {
                BurstSource::Message
            };
            Particle {
                x: rng.random_range(0.0..100.0),
                y: rng.random_range(0.0..100.0),
                rotation: rng.random_range(-30.0..30.0),
                scale: rng.random_range(0.6..1.4),
                delay_ms: rng.random_range(0..max_delay),
                source,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn same_seed_same_layout() {
        let a = burst_layout(&mut StdRng::seed_from_u64(7), BURST_SIZE, 5);
        let b = burst_layout(&mut StdRng::seed_from_u64(7), BURST_SIZE, 5);
        assert_eq!(a, b);
        assert_eq!(a.len(), BURST_SIZE);
    }

    #[test]
    fn particles_stay_in_bounds() {
        let layout = burst_layout(&mut StdRng::seed_from_u64(42), 200, 3);
        for p in &layout {
            assert!((0.0..100.0).contains(&p.x) && (0.0..100.0).contains(&p.y));
            assert!(p.delay_ms < 2400);
            if let BurstSource::Image(i) = p.source {
                assert!(i < 3);
            }
        }
        assert!(layout.iter().any(|p| matches!(p.source, BurstSource::Image(_))));
    }

    #[test]
    fn without_images_only_messages() {
        let layout = burst_layout(&mut StdRng::seed_from_u64(1), 30, 0);
        assert!(layout.iter().all(|p| p.source == BurstSource::Message));
    }
}
