//! Initial conditions: uniform noise or a brightness image.

use rand::prelude::*;
use rand_distr::Uniform;

use super::{EngineError, FieldPair};
use crate::schema::{BrightnessGrid, DEFAULT_NOISE_AMPLITUDE, Pattern, Seed};

#[inline]
fn centered_noise() -> Uniform<f32> {
    Uniform::new(-0.5, 0.5)
}

/// Fill every cell of `A`, then every cell of `B`, with
/// `uniform(-0.5, 0.5) * amplitude`.
pub fn seed_noise<R: Rng + ?Sized>(fields: &mut FieldPair, rng: &mut R, amplitude: f32) {
    let noise = centered_noise();
    let layer = fields.live_mut();
    for v in layer.a.iter_mut().chain(layer.b.iter_mut()) {
        *v = rng.sample(noise) * amplitude;
    }
}

/// Map brightness `[0, 1]` to activator `[-1, 1]`; the inhibitor gets
/// low-amplitude noise.
///
/// Brightness outside `[0, 1]` is clamped.
pub fn seed_image<R: Rng + ?Sized>(
    fields: &mut FieldPair,
    brightness: &BrightnessGrid,
    rng: &mut R,
) -> Result<(), EngineError> {
    let expected = (fields.width(), fields.height());
    let actual = (brightness.width(), brightness.height());
    if expected != actual {
        return Err(EngineError::ShapeMismatch { expected, actual });
    }
    if brightness.values().len() != fields.len() {
        return Err(EngineError::FieldLengthMismatch {
            expected: fields.len(),
            actual: brightness.values().len(),
        });
    }

    let noise = centered_noise();
    let layer = fields.live_mut();
    for (a, &v) in layer.a.iter_mut().zip(brightness.values()) {
        *a = v.clamp(0.0, 1.0) * 2.0 - 1.0;
    }
    for b in layer.b.iter_mut() {
        *b = rng.sample(noise) * DEFAULT_NOISE_AMPLITUDE;
    }
    Ok(())
}

/// Apply a declarative seed using a generator seeded from its `seed` value.
pub fn apply_seed(fields: &mut FieldPair, seed: &Seed) -> Result<(), EngineError> {
    match &seed.pattern {
        Pattern::Noise { amplitude, seed } => {
            let mut rng = StdRng::seed_from_u64(*seed);
            seed_noise(fields, &mut rng, *amplitude);
            Ok(())
        }
        Pattern::Image { brightness, seed } => {
            let mut rng = StdRng::seed_from_u64(*seed);
            seed_image(fields, brightness, &mut rng)
        }
    }
}
