//! Coordinate kinds and rectangles.
//!
//! Every index stores its boxes with one numeric kind. The kind is part of the
//! serialized header, so the set of kinds is closed: [`CoordKind`] names them
//! and [`IndexCoord`] is implemented for exactly the matching primitive types.

use core::fmt::Debug;
use core::mem::size_of;

use crate::error::{IndexError, Result};
use crate::format::IndexHeader;

/// Numeric kind of the rectangle coordinates held by an index.
///
/// The discriminant is the kind index written to the low nibble of the
/// second header byte. Index 2 is reserved for a clamped byte kind that has
/// no Rust counterpart and is rejected on read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CoordKind {
    /// `i8`
    Int8 = 0,
    /// `u8`
    Uint8 = 1,
    /// `i16`
    Int16 = 3,
    /// `u16`
    Uint16 = 4,
    /// `i32`
    Int32 = 5,
    /// `u32`
    Uint32 = 6,
    /// `f32`
    Float32 = 7,
    /// `f64`
    Float64 = 8,
}

impl CoordKind {
    /// Looks up the kind stored under a header kind index.
    ///
    /// # Errors
    /// Returns [`IndexError::UnknownCoordKind`] for indices with no supported kind.
    pub fn from_index(index: u8) -> Result<Self> {
        match index {
            0 => Ok(Self::Int8),
            1 => Ok(Self::Uint8),
            3 => Ok(Self::Int16),
            4 => Ok(Self::Uint16),
            5 => Ok(Self::Int32),
            6 => Ok(Self::Uint32),
            7 => Ok(Self::Float32),
            8 => Ok(Self::Float64),
            other => Err(IndexError::UnknownCoordKind(other)),
        }
    }

    /// Header kind index of this kind.
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Width of one coordinate in bytes.
    pub fn byte_width(self) -> usize {
        match self {
            Self::Int8 | Self::Uint8 => 1,
            Self::Int16 | Self::Uint16 => 2,
            Self::Int32 | Self::Uint32 | Self::Float32 => 4,
            Self::Float64 => 8,
        }
    }

    /// Reads the coordinate kind out of a serialized index without building it.
    ///
    /// Useful when the kind of a received buffer is not known in advance.
    ///
    /// # Errors
    /// Fails when the header is truncated, malformed, or names an unknown kind.
    pub fn from_buffer(data: &[u8]) -> Result<Self> {
        IndexHeader::parse(data).map(|header| header.kind)
    }
}

/// A coordinate type that can be stored in a [`HilbertRTree`](crate::HilbertRTree).
///
/// Distances and Hilbert keys are computed in `f64`; intersection tests run in
/// the native type.
pub trait IndexCoord: Copy + PartialOrd + Debug + Send + Sync + 'static {
    /// Kind written to the serialized header.
    const KIND: CoordKind;
    /// Identity for `min` accumulation (largest value, or +inf).
    const HIGHEST: Self;
    /// Identity for `max` accumulation (smallest value, or -inf).
    const LOWEST: Self;

    /// Widens the value for distance and Hilbert computations.
    fn to_f64(self) -> f64;

    /// Writes the little-endian encoding into the front of `out`.
    fn write_le(self, out: &mut [u8]);

    /// Reads a little-endian value from the front of `bytes`.
    fn read_le(bytes: &[u8]) -> Self;

    /// Byte width of one value.
    fn byte_width() -> usize {
        Self::KIND.byte_width()
    }
}

macro_rules! impl_index_coord {
    ($t:ty, $kind:ident, $highest:expr, $lowest:expr) => {
        impl IndexCoord for $t {
            const KIND: CoordKind = CoordKind::$kind;
            const HIGHEST: Self = $highest;
            const LOWEST: Self = $lowest;

            #[inline]
            fn to_f64(self) -> f64 {
                f64::from(self)
            }

            #[inline]
            fn write_le(self, out: &mut [u8]) {
                out[..size_of::<$t>()].copy_from_slice(&self.to_le_bytes());
            }

            #[inline]
            fn read_le(bytes: &[u8]) -> Self {
                let mut buf = [0_u8; size_of::<$t>()];
                buf.copy_from_slice(&bytes[..size_of::<$t>()]);
                <$t>::from_le_bytes(buf)
            }
        }
    };
}

impl_index_coord!(i8, Int8, i8::MAX, i8::MIN);
impl_index_coord!(u8, Uint8, u8::MAX, u8::MIN);
impl_index_coord!(i16, Int16, i16::MAX, i16::MIN);
impl_index_coord!(u16, Uint16, u16::MAX, u16::MIN);
impl_index_coord!(i32, Int32, i32::MAX, i32::MIN);
impl_index_coord!(u32, Uint32, u32::MAX, u32::MIN);
impl_index_coord!(f32, Float32, f32::INFINITY, f32::NEG_INFINITY);
impl_index_coord!(f64, Float64, f64::INFINITY, f64::NEG_INFINITY);

#[inline]
fn partial_min<T: PartialOrd>(a: T, b: T) -> T {
    if b < a { b } else { a }
}

#[inline]
fn partial_max<T: PartialOrd>(a: T, b: T) -> T {
    if b > a { b } else { a }
}

/// Axis-aligned rectangle: `min_x, min_y, max_x, max_y`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect<T> {
    /// Left edge.
    pub min_x: T,
    /// Bottom edge.
    pub min_y: T,
    /// Right edge.
    pub max_x: T,
    /// Top edge.
    pub max_y: T,
}

impl<T: IndexCoord> Rect<T> {
    /// Creates a rectangle from its edges.
    pub fn new(min_x: T, min_y: T, max_x: T, max_y: T) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// An inverted rectangle that any [`extend`](Self::extend) replaces.
    pub fn empty() -> Self {
        Self::new(T::HIGHEST, T::HIGHEST, T::LOWEST, T::LOWEST)
    }

    /// Grows this rectangle to cover `other`.
    #[inline]
    pub fn extend(&mut self, other: &Self) {
        self.min_x = partial_min(self.min_x, other.min_x);
        self.min_y = partial_min(self.min_y, other.min_y);
        self.max_x = partial_max(self.max_x, other.max_x);
        self.max_y = partial_max(self.max_y, other.max_y);
    }

    /// Closed-interval overlap test; touching edges intersect.
    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        !(other.max_x < self.min_x
            || other.max_y < self.min_y
            || other.min_x > self.max_x
            || other.min_y > self.max_y)
    }

    /// Whether `other` lies fully inside this rectangle.
    pub fn contains_rect(&self, other: &Self) -> bool {
        self.min_x <= other.min_x
            && self.min_y <= other.min_y
            && self.max_x >= other.max_x
            && self.max_y >= other.max_y
    }

    /// Squared distance from a point to the nearest point of the rectangle;
    /// zero when the point is inside.
    #[inline]
    pub fn distance_sq(&self, x: f64, y: f64) -> f64 {
        let dx = axis_distance(x, self.min_x.to_f64(), self.max_x.to_f64());
        let dy = axis_distance(y, self.min_y.to_f64(), self.max_y.to_f64());
        dx * dx + dy * dy
    }

    pub(crate) fn write_le(&self, out: &mut [u8]) {
        let w = T::byte_width();
        self.min_x.write_le(&mut out[..w]);
        self.min_y.write_le(&mut out[w..2 * w]);
        self.max_x.write_le(&mut out[2 * w..3 * w]);
        self.max_y.write_le(&mut out[3 * w..4 * w]);
    }

    pub(crate) fn read_le(bytes: &[u8]) -> Self {
        let w = T::byte_width();
        Self::new(
            T::read_le(&bytes[..w]),
            T::read_le(&bytes[w..2 * w]),
            T::read_le(&bytes[2 * w..3 * w]),
            T::read_le(&bytes[3 * w..4 * w]),
        )
    }
}

#[inline]
fn axis_distance(k: f64, min: f64, max: f64) -> f64 {
    if k < min {
        min - k
    } else if k <= max {
        0.0
    } else {
        k - max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_indices_round_trip() {
        for index in 0..=15_u8 {
            match CoordKind::from_index(index) {
                Ok(kind) => assert_eq!(kind.index(), index, "kind index should round trip"),
                Err(err) => assert_eq!(err, IndexError::UnknownCoordKind(index)),
            }
        }
        assert!(CoordKind::from_index(2).is_err(), "clamped byte kind is unsupported");
        assert!(CoordKind::from_index(9).is_err(), "9 is past the last kind");
    }

    #[test]
    fn byte_widths_match_primitive_sizes() {
        assert_eq!(<i8 as IndexCoord>::byte_width(), 1);
        assert_eq!(<u16 as IndexCoord>::byte_width(), 2);
        assert_eq!(<i32 as IndexCoord>::byte_width(), 4);
        assert_eq!(<f32 as IndexCoord>::byte_width(), 4);
        assert_eq!(<f64 as IndexCoord>::byte_width(), 8);
    }

    #[test]
    fn rect_le_encoding_round_trips() {
        let rect = Rect::new(-3_i16, 7, 1200, -1);
        let mut buf = [0_u8; 8];
        rect.write_le(&mut buf);
        assert_eq!(Rect::<i16>::read_le(&buf), rect);
    }

    #[test]
    fn empty_rect_is_replaced_by_extend() {
        let mut rect = Rect::<i32>::empty();
        rect.extend(&Rect::new(2, 3, 4, 5));
        rect.extend(&Rect::new(-1, 4, 3, 9));
        assert_eq!(rect, Rect::new(-1, 3, 4, 9));
    }

    #[test]
    fn touching_rects_intersect() {
        let a = Rect::new(0.0, 0.0, 1.0, 1.0);
        assert!(a.intersects(&Rect::new(1.0, 1.0, 2.0, 2.0)), "corner contact counts");
        assert!(!a.intersects(&Rect::new(1.0 + 1e-9, 0.0, 2.0, 1.0)));
    }

    #[test]
    fn distance_is_zero_inside_and_axis_based_outside() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(r.distance_sq(5.0, 5.0), 0.0);
        assert_eq!(r.distance_sq(13.0, 5.0), 9.0);
        assert_eq!(r.distance_sq(13.0, 14.0), 25.0);
    }
}
