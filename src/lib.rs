//! # wjson
//!
//! A compact in-memory JSON document model for constrained targets: a tagged
//! [`Element`] (null, boolean, integer, float, string) and an [`Object`] hash
//! table keyed by elements.
//!
//! Works without the standard library (disable the default `std` feature);
//! only `alloc` is required.
//!
//! ## Example
//!
//! ```rust
//! use wjson::{null, object, Element, Error};
//!
//! let mut obj = object! { "first", 1, "second", 2 };
//! assert_eq!(obj.len(), 2);
//!
//! // Keys of different kinds never collide.
//! obj.insert(5, "integer key");
//! obj.insert(5.0, "float key");
//! assert_eq!(obj[5], "integer key");
//! assert_eq!(obj[5.0], "float key");
//!
//! // `insert` never overwrites; `insert_or_assign` does.
//! assert!(!obj.insert("first", 100).1);
//! assert!(!obj.insert_or_assign("first", 100).1);
//! assert_eq!(obj.at("first")?.extract::<i32>()?, 100);
//!
//! assert_eq!(obj.at("missing"), Err(Error::NotFound));
//! assert_eq!(obj["missing"], *null());
//!
//! let mut key = Element::from("second");
//! assert!(obj.erase(&key));
//! let moved = key.take();
//! assert!(key.is_null());
//! assert_eq!(moved, "second");
//! # Ok::<(), Error>(())
//! ```

#![cfg_attr(not(any(feature = "std", test)), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

mod element;
mod error;
mod hash;
mod object;

pub use element::{null, Element, ElementRef, FromElement, Kind, NULL};
pub use error::Error;
pub use hash::ElementHasher;
pub use object::{IntoIter, Iter, IterMut, Keys, Object, Values, ValuesMut};

#[cfg(test)]
mod proptests;
