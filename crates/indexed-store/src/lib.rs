//!
//! # Indexed Store
//!
//! An in-memory, thread safe key -> object table that also keeps any number of secondary indices
//! over its objects. It's the storage layer for local mirrors of remote objects, where lookups are
//! needed both by key and by attributes derived from the objects, like every object in a namespace.
//!
//! Each index is built by an [`IndexFunc`] registered under a unique name, mapping an object to
//! zero or more index values. The store keeps, for every index, the set of keys whose objects
//! produced each value, and updates those sets on every mutation under the same lock as the
//! primary table:
//! - Queries share a read lock, mutations take the write lock for the whole call;
//! - Buckets left empty by an update or delete are dropped right away;
//! - [`ThreadSafeStore::replace`] swaps every entry and rebuilds every index without readers ever
//!   seeing a mix of old and new contents;
//! - An index function failing during a mutation refuses the mutation and yields a fatal
//!   [`Error::Unrecoverable`], callers must stop feeding the store when they get one.
//!
//! ## Basic example
//!
//! ```
//! use sd_indexed_store::{IndexFunc, ThreadSafeMap, ThreadSafeStore};
//!
//! # fn main() -> Result<(), sd_indexed_store::Error> {
//! let store = ThreadSafeMap::builder()
//! 	.indexer(
//! 		"by_first_char",
//! 		IndexFunc::infallible(|fruit: &String| {
//! 			fruit.chars().take(1).map(String::from).collect()
//! 		}),
//! 	)
//! 	.build()?;
//!
//! store.add("k1".to_string(), "apple".to_string())?;
//! store.add("k2".to_string(), "avocado".to_string())?;
//! store.update("k1".to_string(), "banana".to_string())?;
//!
//! assert_eq!(store.by_index("by_first_char", "a")?, vec!["avocado".to_string()]);
//! assert_eq!(store.index_keys("by_first_char", "b")?, vec!["k1".to_string()]);
//! # Ok(())
//! # }
//! ```

#![warn(
	clippy::all,
	clippy::pedantic,
	clippy::correctness,
	clippy::perf,
	clippy::style,
	clippy::suspicious,
	clippy::complexity,
	clippy::nursery,
	clippy::unwrap_used,
	unused_qualifications,
	rust_2018_idioms,
	trivial_casts,
	trivial_numeric_casts,
	unused_allocation,
	clippy::unnecessary_cast,
	clippy::cast_lossless,
	clippy::cast_possible_truncation,
	clippy::cast_possible_wrap,
	clippy::cast_precision_loss,
	clippy::cast_sign_loss,
	clippy::dbg_macro,
	clippy::deprecated_cfg_attr,
	clippy::separated_literal_suffix,
	deprecated
)]
#![forbid(deprecated_in_future)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

mod error;
mod index;
mod store;

pub use error::{Error, IndexFuncError, Result};
pub use index::{Index, IndexFunc, Indexers, Indices};
pub use store::{StoreBuilder, ThreadSafeMap, ThreadSafeStore};
