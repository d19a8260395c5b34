//! Tagged JSON element: the value and key type stored by [`Object`](crate::Object).

use alloc::boxed::Box;
use alloc::string::String;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::mem;

use crate::error::Error;

// =============================================================================
// Kind
// =============================================================================

/// The primitive kind held by an [`Element`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Null,
    Boolean,
    Integer,
    Float,
    String,
}

impl Kind {
    pub const fn name(self) -> &'static str {
        match self {
            Kind::Null => "null",
            Kind::Boolean => "boolean",
            Kind::Integer => "integer",
            Kind::Float => "float",
            Kind::String => "string",
        }
    }

    /// Discriminant fed to the hasher ahead of the payload.
    #[inline]
    pub(crate) const fn tag(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Element
// =============================================================================

/// A JSON primitive: null, boolean, 64-bit integer, 64-bit float or string.
///
/// Only the `String` kind owns heap memory. Two elements are equal when they
/// have the same kind and the same payload; an integer `5` and a float `5.0`
/// are different elements. Floats compare by bit pattern, which keeps `Eq`
/// and `Hash` lawful so elements can be used as keys.
#[derive(Debug, Clone, Default)]
pub enum Element {
    #[default]
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(Box<str>),
}

/// The canonical null element.
pub static NULL: Element = Element::Null;

/// Returns the canonical null element, usable as a sentinel.
#[inline]
pub fn null() -> &'static Element {
    &NULL
}

impl Element {
    /// Copies `s` into a new string element, reporting allocation failure
    /// instead of aborting.
    pub fn try_from_str(s: &str) -> Result<Self, Error> {
        let mut buf = String::new();
        if buf.try_reserve_exact(s.len()).is_err() {
            log::debug!("string payload allocation of {} bytes refused", s.len());
            return Err(Error::AllocationFailure { bytes: s.len() });
        }
        buf.push_str(s);
        Ok(Element::String(buf.into_boxed_str()))
    }

    #[inline]
    pub fn kind(&self) -> Kind {
        match self {
            Element::Null => Kind::Null,
            Element::Boolean(_) => Kind::Boolean,
            Element::Integer(_) => Kind::Integer,
            Element::Float(_) => Kind::Float,
            Element::String(_) => Kind::String,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Element::Null)
    }

    /// Borrowed view of this element, the form used for hashing and lookups.
    #[inline]
    pub fn view(&self) -> ElementRef<'_> {
        match self {
            Element::Null => ElementRef::Null,
            Element::Boolean(b) => ElementRef::Boolean(*b),
            Element::Integer(n) => ElementRef::Integer(*n),
            Element::Float(x) => ElementRef::Float(*x),
            Element::String(s) => ElementRef::String(s),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Element::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Element::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Element::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Element::String(s) => Some(s),
            _ => None,
        }
    }

    /// Reads the payload as `T`.
    ///
    /// Extraction is strict: the element's kind must match `T`. The only
    /// conversions are integer to float, float to `f32`, and integer to a
    /// narrower integer type when the value fits.
    ///
    /// ```
    /// use wjson::{Element, Error, Kind};
    ///
    /// let e = Element::from(42);
    /// assert_eq!(e.extract::<u8>(), Ok(42));
    /// assert_eq!(e.extract::<f64>(), Ok(42.0));
    /// assert_eq!(
    ///     e.extract::<&str>(),
    ///     Err(Error::TypeMismatch { expected: "string", found: Kind::Integer })
    /// );
    /// ```
    #[inline]
    pub fn extract<'a, T: FromElement<'a>>(&'a self) -> Result<T, Error> {
        T::from_element(self)
    }

    /// Moves the element out, leaving null behind.
    #[inline]
    pub fn take(&mut self) -> Element {
        mem::take(self)
    }

    /// Stores `value`, returning the previous element.
    #[inline]
    pub fn replace(&mut self, value: impl Into<Element>) -> Element {
        mem::replace(self, value.into())
    }

    /// Heap bytes owned by this element.
    #[inline]
    pub fn heap_size(&self) -> usize {
        match self {
            Element::String(s) => s.len(),
            _ => 0,
        }
    }
}

impl PartialEq for Element {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.view() == other.view()
    }
}

impl Eq for Element {}

impl Hash for Element {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.view().hash(state);
    }
}

// =============================================================================
// ElementRef
// =============================================================================

/// A borrowed element. Lookups take keys in this form so probing with a
/// `&str` or an `&Element` never copies string payloads.
#[derive(Debug, Clone, Copy)]
pub enum ElementRef<'a> {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(&'a str),
}

impl<'a> ElementRef<'a> {
    #[inline]
    pub fn kind(self) -> Kind {
        match self {
            ElementRef::Null => Kind::Null,
            ElementRef::Boolean(_) => Kind::Boolean,
            ElementRef::Integer(_) => Kind::Integer,
            ElementRef::Float(_) => Kind::Float,
            ElementRef::String(_) => Kind::String,
        }
    }

    pub fn to_element(self) -> Element {
        match self {
            ElementRef::Null => Element::Null,
            ElementRef::Boolean(b) => Element::Boolean(b),
            ElementRef::Integer(n) => Element::Integer(n),
            ElementRef::Float(x) => Element::Float(x),
            ElementRef::String(s) => Element::String(Box::from(s)),
        }
    }

    pub fn try_to_element(self) -> Result<Element, Error> {
        match self {
            ElementRef::String(s) => Element::try_from_str(s),
            other => Ok(other.to_element()),
        }
    }
}

impl PartialEq for ElementRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (*self, *other) {
            (ElementRef::Null, ElementRef::Null) => true,
            (ElementRef::Boolean(a), ElementRef::Boolean(b)) => a == b,
            (ElementRef::Integer(a), ElementRef::Integer(b)) => a == b,
            (ElementRef::Float(a), ElementRef::Float(b)) => a.to_bits() == b.to_bits(),
            (ElementRef::String(a), ElementRef::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ElementRef<'_> {}

impl Hash for ElementRef<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u8(self.kind().tag());
        match *self {
            ElementRef::Null => {}
            ElementRef::Boolean(b) => state.write_u8(u8::from(b)),
            ElementRef::Integer(n) => state.write_i64(n),
            ElementRef::Float(x) => state.write_u64(x.to_bits()),
            ElementRef::String(s) => {
                state.write(s.as_bytes());
                // Terminator so adjacent strings in a composite hash stay distinct.
                state.write_u8(0xff);
            }
        }
    }
}

// =============================================================================
// Conversions
// =============================================================================

macro_rules! from_integer {
    ($($ty:ty),*) => {$(
        impl From<$ty> for Element {
            #[inline]
            fn from(n: $ty) -> Self {
                Element::Integer(i64::from(n))
            }
        }

        impl<'a> From<$ty> for ElementRef<'a> {
            #[inline]
            fn from(n: $ty) -> Self {
                ElementRef::Integer(i64::from(n))
            }
        }
    )*};
}

from_integer!(i8, i16, i32, i64, u8, u16, u32);

// isize is at most 64 bits on every supported target.
impl From<isize> for Element {
    #[inline]
    fn from(n: isize) -> Self {
        Element::Integer(n as i64)
    }
}

impl<'a> From<isize> for ElementRef<'a> {
    #[inline]
    fn from(n: isize) -> Self {
        ElementRef::Integer(n as i64)
    }
}

impl From<bool> for Element {
    #[inline]
    fn from(b: bool) -> Self {
        Element::Boolean(b)
    }
}

impl<'a> From<bool> for ElementRef<'a> {
    #[inline]
    fn from(b: bool) -> Self {
        ElementRef::Boolean(b)
    }
}

impl From<f32> for Element {
    #[inline]
    fn from(x: f32) -> Self {
        Element::Float(f64::from(x))
    }
}

impl<'a> From<f32> for ElementRef<'a> {
    #[inline]
    fn from(x: f32) -> Self {
        ElementRef::Float(f64::from(x))
    }
}

impl From<f64> for Element {
    #[inline]
    fn from(x: f64) -> Self {
        Element::Float(x)
    }
}

impl<'a> From<f64> for ElementRef<'a> {
    #[inline]
    fn from(x: f64) -> Self {
        ElementRef::Float(x)
    }
}

impl From<()> for Element {
    #[inline]
    fn from(_: ()) -> Self {
        Element::Null
    }
}

impl<'a> From<()> for ElementRef<'a> {
    #[inline]
    fn from(_: ()) -> Self {
        ElementRef::Null
    }
}

impl From<&str> for Element {
    #[inline]
    fn from(s: &str) -> Self {
        Element::String(Box::from(s))
    }
}

impl From<&String> for Element {
    #[inline]
    fn from(s: &String) -> Self {
        Element::String(Box::from(s.as_str()))
    }
}

impl From<String> for Element {
    #[inline]
    fn from(s: String) -> Self {
        Element::String(s.into_boxed_str())
    }
}

impl From<Box<str>> for Element {
    #[inline]
    fn from(s: Box<str>) -> Self {
        Element::String(s)
    }
}

impl<'a> From<&'a str> for ElementRef<'a> {
    #[inline]
    fn from(s: &'a str) -> Self {
        ElementRef::String(s)
    }
}

impl<'a> From<&'a String> for ElementRef<'a> {
    #[inline]
    fn from(s: &'a String) -> Self {
        ElementRef::String(s.as_str())
    }
}

impl From<&Element> for Element {
    #[inline]
    fn from(e: &Element) -> Self {
        e.clone()
    }
}

impl<'a> From<&'a Element> for ElementRef<'a> {
    #[inline]
    fn from(e: &'a Element) -> Self {
        e.view()
    }
}

impl<'a> From<ElementRef<'a>> for Element {
    #[inline]
    fn from(e: ElementRef<'a>) -> Self {
        e.to_element()
    }
}

/// `None` is the null element.
impl<T: Into<Element>> From<Option<T>> for Element {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Element::Null,
        }
    }
}

impl<'a, T: Into<ElementRef<'a>>> From<Option<T>> for ElementRef<'a> {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => ElementRef::Null,
        }
    }
}

// === Comparison against primitives ===

macro_rules! partial_eq_primitive {
    ($($ty:ty),*) => {$(
        impl PartialEq<$ty> for Element {
            #[inline]
            fn eq(&self, other: &$ty) -> bool {
                self.view() == ElementRef::from(*other)
            }
        }

        impl PartialEq<Element> for $ty {
            #[inline]
            fn eq(&self, other: &Element) -> bool {
                other == self
            }
        }
    )*};
}

partial_eq_primitive!(bool, i8, i16, i32, i64, u8, u16, u32, isize, f32, f64, &str);

impl PartialEq<str> for Element {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.view() == ElementRef::String(other)
    }
}

impl PartialEq<Element> for str {
    #[inline]
    fn eq(&self, other: &Element) -> bool {
        other == self
    }
}

impl PartialEq<String> for Element {
    #[inline]
    fn eq(&self, other: &String) -> bool {
        self.view() == ElementRef::String(other)
    }
}

// =============================================================================
// Typed extraction
// =============================================================================

/// Types that can be read out of an [`Element`] by [`Element::extract`].
pub trait FromElement<'a>: Sized {
    fn from_element(element: &'a Element) -> Result<Self, Error>;
}

#[inline]
fn mismatch(expected: &'static str, element: &Element) -> Error {
    Error::TypeMismatch {
        expected,
        found: element.kind(),
    }
}

impl<'a> FromElement<'a> for bool {
    fn from_element(element: &'a Element) -> Result<Self, Error> {
        element
            .as_bool()
            .ok_or_else(|| mismatch(Kind::Boolean.name(), element))
    }
}

macro_rules! from_element_integer {
    ($($ty:ty),*) => {$(
        impl<'a> FromElement<'a> for $ty {
            fn from_element(element: &'a Element) -> Result<Self, Error> {
                let n = element
                    .as_i64()
                    .ok_or_else(|| mismatch(Kind::Integer.name(), element))?;
                <$ty>::try_from(n).map_err(|_| Error::OutOfRange {
                    value: n,
                    target: stringify!($ty),
                })
            }
        }
    )*};
}

from_element_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl<'a> FromElement<'a> for f64 {
    fn from_element(element: &'a Element) -> Result<Self, Error> {
        match element {
            Element::Float(x) => Ok(*x),
            Element::Integer(n) => Ok(*n as f64),
            other => Err(mismatch(Kind::Float.name(), other)),
        }
    }
}

impl<'a> FromElement<'a> for f32 {
    fn from_element(element: &'a Element) -> Result<Self, Error> {
        match element {
            Element::Float(x) => Ok(*x as f32),
            Element::Integer(n) => Ok(*n as f32),
            other => Err(mismatch(Kind::Float.name(), other)),
        }
    }
}

impl<'a> FromElement<'a> for &'a str {
    fn from_element(element: &'a Element) -> Result<Self, Error> {
        element
            .as_str()
            .ok_or_else(|| mismatch(Kind::String.name(), element))
    }
}

impl<'a> FromElement<'a> for ElementRef<'a> {
    #[inline]
    fn from_element(element: &'a Element) -> Result<Self, Error> {
        Ok(element.view())
    }
}
