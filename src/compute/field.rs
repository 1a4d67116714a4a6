//! Double-buffered activator/inhibitor storage on a periodic grid.

use crate::schema::ConfigError;

/// One of the two simulated species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Species {
    /// Fast-diffusing activator.
    A,
    /// Slow-diffusing inhibitor.
    B,
}

/// One full snapshot of both species, row-major.
#[derive(Debug, Clone)]
pub(crate) struct Layer {
    pub(crate) a: Vec<f32>,
    pub(crate) b: Vec<f32>,
}

impl Layer {
    fn zeros(size: usize) -> Self {
        Self {
            a: vec![0.0; size],
            b: vec![0.0; size],
        }
    }
}

/// Live fields plus their scratch twins.
///
/// Exactly one layer is live at any time. The integrator writes the next
/// state into the other layer and then calls [`swap`](Self::swap), which only
/// flips the live indicator.
#[derive(Debug, Clone)]
pub struct FieldPair {
    width: usize,
    height: usize,
    layers: [Layer; 2],
    live: usize,
}

impl FieldPair {
    /// Allocate a zeroed `width x height` pair.
    pub fn new(width: usize, height: usize) -> Result<Self, ConfigError> {
        if width == 0 || height == 0 {
            return Err(ConfigError::InvalidDimensions { width, height });
        }
        let size = width
            .checked_mul(height)
            .ok_or(ConfigError::InvalidDimensions { width, height })?;
        Ok(Self {
            width,
            height,
            layers: [Layer::zeros(size), Layer::zeros(size)],
            live: 0,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of cells per field. Never zero.
    #[allow(clippy::len_without_is_empty)]
    #[inline]
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    /// Flat index of `(x, y)` with toroidal wraparound on both axes.
    #[inline]
    pub fn index(&self, x: isize, y: isize) -> usize {
        let wx = x.rem_euclid(self.width as isize) as usize;
        let wy = y.rem_euclid(self.height as isize) as usize;
        wy * self.width + wx
    }

    /// Value of `species` at `(x, y)`, wrapping out-of-range coordinates.
    #[inline]
    pub fn get(&self, species: Species, x: isize, y: isize) -> f32 {
        self.field(species)[self.index(x, y)]
    }

    /// Overwrite the live value of `species` at `(x, y)`, wrapping coordinates.
    #[inline]
    pub fn set(&mut self, species: Species, x: isize, y: isize, value: f32) {
        let idx = self.index(x, y);
        let layer = &mut self.layers[self.live];
        match species {
            Species::A => layer.a[idx] = value,
            Species::B => layer.b[idx] = value,
        }
    }

    /// Exchange live and scratch layers. O(1), no element copies.
    #[inline]
    pub fn swap(&mut self) {
        self.live ^= 1;
    }

    /// Live field of `species`.
    #[inline]
    pub fn field(&self, species: Species) -> &[f32] {
        let layer = &self.layers[self.live];
        match species {
            Species::A => &layer.a,
            Species::B => &layer.b,
        }
    }

    /// Live activator field, row-major.
    #[inline]
    pub fn a(&self) -> &[f32] {
        &self.layers[self.live].a
    }

    /// Live inhibitor field, row-major.
    #[inline]
    pub fn b(&self) -> &[f32] {
        &self.layers[self.live].b
    }

    /// Mutable access to the live layer (seeding).
    pub(crate) fn live_mut(&mut self) -> &mut Layer {
        &mut self.layers[self.live]
    }

    /// Borrow the live layer for reading and the scratch layer for writing.
    pub(crate) fn live_and_scratch(&mut self) -> (&Layer, &mut Layer) {
        let (first, second) = self.layers.split_at_mut(1);
        if self.live == 0 {
            (&first[0], &mut second[0])
        } else {
            (&second[0], &mut first[0])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ramp(width: usize, height: usize) -> FieldPair {
        let mut fields = FieldPair::new(width, height).unwrap();
        for y in 0..height as isize {
            for x in 0..width as isize {
                fields.set(Species::A, x, y, (y * 100 + x) as f32);
                fields.set(Species::B, x, y, -((y * 100 + x) as f32));
            }
        }
        fields
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert!(matches!(
            FieldPair::new(0, 4),
            Err(ConfigError::InvalidDimensions {
                width: 0,
                height: 4
            })
        ));
        assert!(FieldPair::new(4, 0).is_err());
    }

    #[test]
    fn test_overflowing_dimensions_rejected() {
        assert!(matches!(
            FieldPair::new(usize::MAX, 2),
            Err(ConfigError::InvalidDimensions {
                width: usize::MAX,
                height: 2
            })
        ));
    }

    #[test]
    fn test_index_is_row_major() {
        let fields = FieldPair::new(5, 3).unwrap();
        assert_eq!(fields.index(0, 0), 0);
        assert_eq!(fields.index(4, 0), 4);
        assert_eq!(fields.index(0, 1), 5);
        assert_eq!(fields.index(-1, -1), 14);
        assert_eq!(fields.index(5, 3), 0);
    }

    #[test]
    fn test_swap_exchanges_without_copy() {
        let mut fields = ramp(4, 4);
        let before = fields.a().as_ptr();
        {
            let (live, scratch) = fields.live_and_scratch();
            assert_eq!(live.a.as_ptr(), before);
            scratch.a.fill(7.0);
        }
        fields.swap();
        assert_ne!(fields.a().as_ptr(), before);
        assert!(fields.a().iter().all(|&v| v == 7.0));

        fields.swap();
        assert_eq!(fields.a().as_ptr(), before);
        assert_eq!(fields.get(Species::A, 1, 2), 201.0);
    }

    #[test]
    fn test_set_writes_live_layer_only() {
        let mut fields = FieldPair::new(3, 3).unwrap();
        fields.set(Species::B, 1, 1, 2.5);
        assert_eq!(fields.get(Species::B, 1, 1), 2.5);
        assert_eq!(fields.get(Species::A, 1, 1), 0.0);
        fields.swap();
        assert_eq!(fields.get(Species::B, 1, 1), 0.0);
    }

    proptest! {
        #[test]
        fn prop_periodic_wrap(width in 1usize..12, height in 1usize..12, y in -30isize..30) {
            let fields = ramp(width, height);
            let w = width as isize;
            let h = height as isize;
            for species in [Species::A, Species::B] {
                prop_assert_eq!(fields.get(species, -1, y), fields.get(species, w - 1, y));
                prop_assert_eq!(fields.get(species, w, y), fields.get(species, 0, y));
                prop_assert_eq!(fields.get(species, y, -1), fields.get(species, y, h - 1));
                prop_assert_eq!(fields.get(species, y, h), fields.get(species, y, 0));
            }
        }
    }
}
