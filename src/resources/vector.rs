//! # Per-kind quantity vectors.
//!
//! [`ResourceVector`] holds one `u32` quantity per [`ResourceKind`]. All ledger
//! bookkeeping (total, available, max, allocated, need) is expressed with it.
//!
//! Arithmetic is componentwise. The `Sub` operator assumes the right-hand side
//! fits within the left (callers check with [`ResourceVector::fits_within`]
//! first); use [`ResourceVector::checked_sub`] when that is not known.
//!
//! ```rust
//! use safevax::{ResourceKind, ResourceVector};
//!
//! let need = ResourceVector::new(6, 4, 1);
//! let ask = ResourceVector::new(4, 2, 0);
//! assert!(ask.fits_within(&need));
//! assert_eq!(need - ask, ResourceVector::new(2, 2, 1));
//! assert_eq!(ask[ResourceKind::Vaccines], 4);
//! assert_eq!(ask.to_string(), "V:4 S:2 T:0");
//! ```

use std::fmt;
use std::ops::{Add, AddAssign, Index, IndexMut, RangeInclusive, Sub, SubAssign};

use rand::Rng;

use super::kind::ResourceKind;

/// One non-negative quantity per resource kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ResourceVector([u32; ResourceKind::COUNT]);

impl ResourceVector {
    /// The all-zero vector.
    pub const ZERO: ResourceVector = ResourceVector([0; ResourceKind::COUNT]);

    /// Builds a vector from vaccine, syringe and truck quantities.
    #[inline]
    pub const fn new(vaccines: u32, syringes: u32, trucks: u32) -> Self {
        Self([vaccines, syringes, trucks])
    }

    /// Builds a vector by evaluating `f` once per kind.
    pub fn from_fn(mut f: impl FnMut(ResourceKind) -> u32) -> Self {
        let mut out = Self::ZERO;
        for kind in ResourceKind::ALL {
            out[kind] = f(kind);
        }
        out
    }

    /// Applies `f` to every component.
    pub fn map(self, mut f: impl FnMut(u32) -> u32) -> Self {
        Self::from_fn(|kind| f(self[kind]))
    }

    /// Iterates `(kind, quantity)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, u32)> + '_ {
        ResourceKind::ALL.into_iter().map(move |k| (k, self[k]))
    }

    /// True when every component is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&q| q == 0)
    }

    /// Componentwise `self <= other`.
    #[inline]
    pub fn fits_within(&self, other: &ResourceVector) -> bool {
        self.0.iter().zip(other.0.iter()).all(|(a, b)| a <= b)
    }

    /// Componentwise subtraction, `None` if any component would go negative.
    pub fn checked_sub(&self, other: &ResourceVector) -> Option<ResourceVector> {
        let mut out = Self::ZERO;
        for kind in ResourceKind::ALL {
            out[kind] = self[kind].checked_sub(other[kind])?;
        }
        Some(out)
    }

    /// Componentwise addition, `None` on overflow.
    pub fn checked_add(&self, other: &ResourceVector) -> Option<ResourceVector> {
        let mut out = Self::ZERO;
        for kind in ResourceKind::ALL {
            out[kind] = self[kind].checked_add(other[kind])?;
        }
        Some(out)
    }

    /// Multiplies every component by `factor` and floors the result.
    ///
    /// `factor` is clamped to `[0, 1]`, so the result never exceeds `self`.
    pub fn scaled_down(&self, factor: f64) -> ResourceVector {
        let factor = if factor.is_finite() {
            factor.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.map(|q| (f64::from(q) * factor).floor() as u32)
    }

    /// Sum of all components.
    pub fn sum(&self) -> u64 {
        self.0.iter().map(|&q| u64::from(q)).sum()
    }
}

impl Index<ResourceKind> for ResourceVector {
    type Output = u32;

    #[inline]
    fn index(&self, kind: ResourceKind) -> &u32 {
        &self.0[kind.index()]
    }
}

impl IndexMut<ResourceKind> for ResourceVector {
    #[inline]
    fn index_mut(&mut self, kind: ResourceKind) -> &mut u32 {
        &mut self.0[kind.index()]
    }
}

impl Add for ResourceVector {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::from_fn(|k| self[k] + other[k])
    }
}

impl AddAssign for ResourceVector {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sub for ResourceVector {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::from_fn(|k| self[k] - other[k])
    }
}

impl SubAssign for ResourceVector {
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

impl std::iter::Sum for ResourceVector {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(ResourceVector::ZERO, |acc, v| acc + v)
    }
}

impl From<[u32; ResourceKind::COUNT]> for ResourceVector {
    fn from(raw: [u32; ResourceKind::COUNT]) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ResourceVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (kind, qty) in self.iter() {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{}:{}", kind.short(), qty)?;
            first = false;
        }
        Ok(())
    }
}

/// Inclusive per-kind bounds used to draw random vectors.
///
/// Drawn components are uniform in `low[k]..=high[k]`. If a `low` component
/// is above its `high` the bounds are swapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorRange {
    /// Lower bound per kind (inclusive).
    pub low: ResourceVector,
    /// Upper bound per kind (inclusive).
    pub high: ResourceVector,
}

impl VectorRange {
    /// Creates a range from its inclusive bounds.
    pub const fn new(low: ResourceVector, high: ResourceVector) -> Self {
        Self { low, high }
    }

    /// Bounds for one kind, normalized so that `start <= end`.
    pub fn bounds(&self, kind: ResourceKind) -> RangeInclusive<u32> {
        let (a, b) = (self.low[kind], self.high[kind]);
        a.min(b)..=a.max(b)
    }

    /// Draws one vector.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> ResourceVector {
        ResourceVector::from_fn(|kind| rng.random_range(self.bounds(kind)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fits_within_is_componentwise() {
        let a = ResourceVector::new(1, 5, 0);
        assert!(a.fits_within(&ResourceVector::new(1, 5, 0)));
        assert!(a.fits_within(&ResourceVector::new(2, 9, 1)));
        assert!(!a.fits_within(&ResourceVector::new(9, 4, 9)));
    }

    #[test]
    fn test_checked_sub_rejects_underflow() {
        let a = ResourceVector::new(3, 3, 1);
        assert_eq!(
            a.checked_sub(&ResourceVector::new(1, 3, 0)),
            Some(ResourceVector::new(2, 0, 1))
        );
        assert_eq!(a.checked_sub(&ResourceVector::new(0, 0, 2)), None);
    }

    #[test]
    fn test_scaled_down_floors() {
        let v = ResourceVector::new(21, 20, 3);
        assert_eq!(v.scaled_down(0.5), ResourceVector::new(10, 10, 1));
        assert_eq!(v.scaled_down(2.0), v);
        assert_eq!(v.scaled_down(f64::NAN), ResourceVector::ZERO);
    }

    #[test]
    fn test_sum_over_vectors() {
        let total: ResourceVector = [
            ResourceVector::new(1, 2, 3),
            ResourceVector::new(4, 5, 6),
        ]
        .into_iter()
        .sum();
        assert_eq!(total, ResourceVector::new(5, 7, 9));
        assert_eq!(total.sum(), 21);
    }

    #[test]
    fn test_range_sample_stays_in_bounds() {
        let range = VectorRange::new(ResourceVector::new(15, 25, 2), ResourceVector::new(25, 15, 5));
        let mut rng = rand::rng();
        for _ in 0..200 {
            let v = range.sample(&mut rng);
            assert!((15..=25).contains(&v[ResourceKind::Vaccines]));
            assert!((15..=25).contains(&v[ResourceKind::Syringes]));
            assert!((2..=5).contains(&v[ResourceKind::Trucks]));
        }
    }
}
