use std::{collections::HashMap, fmt};

use parking_lot::RwLock;
use tracing::{debug, instrument, warn};

use super::{
	error::{Error, Result},
	index::{IndexFunc, Indexers, StoreIndex},
};

/// A concurrent key -> object table that keeps secondary indices over its objects.
///
/// Mutations take exclusive access for the whole call and queries take shared access, so a reader
/// never sees the table and its indices disagree.
pub trait ThreadSafeStore<T>: Send + Sync {
	/// Inserts or overwrites the object stored under `key`.
	fn add(&self, key: String, obj: T) -> Result<()>;
	/// Same as [`ThreadSafeStore::add`], creating and overwriting aren't told apart.
	fn update(&self, key: String, obj: T) -> Result<()>;
	/// Removes `key`, deleting a key that isn't stored is a no-op.
	fn delete(&self, key: &str) -> Result<()>;
	fn get(&self, key: &str) -> Option<T>;
	fn list(&self) -> Vec<T>;
	fn list_keys(&self) -> Vec<String>;
	/// Swaps the whole table for `items` and rebuilds every index from it in one go.
	///
	/// `resource_version` belongs to whoever feeds the store and isn't interpreted here.
	fn replace(&self, items: HashMap<String, T>, resource_version: &str) -> Result<()>;
	/// Objects sharing at least one index value with `obj` on the index named `index_name`.
	fn index(&self, index_name: &str, obj: &T) -> Result<Vec<T>>;
	/// Objects currently bucketed under `indexed_value` on the index named `index_name`.
	fn by_index(&self, index_name: &str, indexed_value: &str) -> Result<Vec<T>>;
	fn index_keys(&self, index_name: &str, indexed_value: &str) -> Result<Vec<String>>;
	fn list_index_func_values(&self, index_name: &str) -> Vec<String>;
	/// A snapshot of the registered indexers, changing it doesn't touch the store.
	fn get_indexers(&self) -> Indexers<T>;
	/// Registers more indexers, only allowed while the store is still empty.
	fn add_indexers(&self, new_indexers: Indexers<T>) -> Result<()>;
	fn resync(&self) -> Result<()>;
}

struct Inner<T> {
	items: HashMap<String, T>,
	index: StoreIndex<T>,
}

pub struct ThreadSafeMap<T> {
	inner: RwLock<Inner<T>>,
}

impl<T: Clone + Send + Sync + 'static> ThreadSafeMap<T> {
	#[must_use]
	pub fn new(indexers: Indexers<T>) -> Self {
		Self::with_parts(HashMap::new(), indexers)
	}

	#[must_use]
	pub fn builder() -> StoreBuilder<T> {
		StoreBuilder::new()
	}

	fn with_parts(items: HashMap<String, T>, indexers: Indexers<T>) -> Self {
		Self {
			inner: RwLock::new(Inner {
				items,
				index: StoreIndex::new(indexers),
			}),
		}
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.inner.read().items.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.inner.read().items.is_empty()
	}
}

impl<T: Clone + Send + Sync + 'static> Default for ThreadSafeMap<T> {
	fn default() -> Self {
		Self::new(Indexers::new())
	}
}

impl<T> fmt::Debug for ThreadSafeMap<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let inner = self.inner.read();

		f.debug_struct("ThreadSafeMap")
			.field("items_count", &inner.items.len())
			.field("indexers", &inner.index.indexers().keys())
			.finish()
	}
}

impl<T: Clone + Send + Sync + 'static> ThreadSafeStore<T> for ThreadSafeMap<T> {
	fn add(&self, key: String, obj: T) -> Result<()> {
		self.update(key, obj)
	}

	fn update(&self, key: String, obj: T) -> Result<()> {
		let mut inner = self.inner.write();
		let Inner { items, index } = &mut *inner;

		let delta = index.diff(items.get(&key), Some(&obj), &key)?;
		items.insert(key, obj);
		index.apply(delta);

		Ok(())
	}

	fn delete(&self, key: &str) -> Result<()> {
		let mut inner = self.inner.write();
		let Inner { items, index } = &mut *inner;

		if let Some(old) = items.get(key) {
			index.reconcile(Some(old), None, key)?;
			items.remove(key);
		}

		Ok(())
	}

	fn get(&self, key: &str) -> Option<T> {
		self.inner.read().items.get(key).cloned()
	}

	fn list(&self) -> Vec<T> {
		self.inner.read().items.values().cloned().collect()
	}

	fn list_keys(&self) -> Vec<String> {
		self.inner.read().items.keys().cloned().collect()
	}

	#[instrument(skip(self, items), fields(items_count = items.len()), err)]
	fn replace(&self, items: HashMap<String, T>, resource_version: &str) -> Result<()> {
		let mut inner = self.inner.write();

		let deltas = items
			.iter()
			.map(|(key, obj)| inner.index.diff(None, Some(obj), key))
			.collect::<Result<Vec<_>>>()?;

		inner.index.reset();
		for delta in deltas {
			inner.index.apply(delta);
		}
		inner.items = items;

		debug!("Replaced store contents;");

		Ok(())
	}

	fn index(&self, index_name: &str, obj: &T) -> Result<Vec<T>> {
		let inner = self.inner.read();

		let objs = inner
			.index
			.lookup(index_name, obj)?
			.into_iter()
			.filter_map(|key| inner.items.get(key).cloned())
			.collect();

		Ok(objs)
	}

	fn by_index(&self, index_name: &str, indexed_value: &str) -> Result<Vec<T>> {
		let inner = self.inner.read();

		let objs = inner
			.index
			.lookup_by_value(index_name, indexed_value)?
			.filter_map(|key| inner.items.get(key).cloned())
			.collect();

		Ok(objs)
	}

	fn index_keys(&self, index_name: &str, indexed_value: &str) -> Result<Vec<String>> {
		Ok(self
			.inner
			.read()
			.index
			.lookup_by_value(index_name, indexed_value)?
			.map(ToOwned::to_owned)
			.collect())
	}

	fn list_index_func_values(&self, index_name: &str) -> Vec<String> {
		self.inner
			.read()
			.index
			.values(index_name)
			.map(ToOwned::to_owned)
			.collect()
	}

	fn get_indexers(&self) -> Indexers<T> {
		self.inner.read().index.indexers().clone()
	}

	#[instrument(skip_all, fields(indexers_count = new_indexers.len()), err)]
	fn add_indexers(&self, new_indexers: Indexers<T>) -> Result<()> {
		let mut inner = self.inner.write();

		if !inner.items.is_empty() {
			warn!(
				items_count = inner.items.len(),
				"Refusing to register indexers on a store that already holds entries;"
			);
			return Err(Error::IndexerRegistrationOnNonEmptyStore);
		}

		inner.index.add_indexers(new_indexers)
	}

	fn resync(&self) -> Result<()> {
		Ok(())
	}
}

/// Configures a [`ThreadSafeMap`] before it holds any entries.
#[derive(Debug)]
pub struct StoreBuilder<T> {
	capacity: usize,
	indexers: Indexers<T>,
	conflicts: Vec<String>,
}

impl<T: Clone + Send + Sync + 'static> StoreBuilder<T> {
	#[must_use]
	pub fn new() -> Self {
		Self {
			capacity: 0,
			indexers: Indexers::new(),
			conflicts: Vec::new(),
		}
	}

	/// Pre-sizes the primary table for `capacity` entries.
	#[must_use]
	pub fn with_capacity(mut self, capacity: usize) -> Self {
		self.capacity = capacity;
		self
	}

	#[must_use]
	pub fn indexer(mut self, name: impl Into<String>, index_func: IndexFunc<T>) -> Self {
		let name = name.into();

		if self.indexers.contains_key(&name) {
			self.conflicts.push(name);
		} else {
			self.indexers.insert(name, index_func);
		}

		self
	}

	#[must_use]
	pub fn indexers(self, indexers: Indexers<T>) -> Self {
		indexers
			.into_iter()
			.fold(self, |builder, (name, index_func)| {
				builder.indexer(name, index_func)
			})
	}

	pub fn build(self) -> Result<ThreadSafeMap<T>> {
		let Self {
			capacity,
			indexers,
			mut conflicts,
		} = self;

		if !conflicts.is_empty() {
			conflicts.sort_unstable();
			conflicts.dedup();
			return Err(Error::IndexerConflict(conflicts));
		}

		Ok(ThreadSafeMap::with_parts(
			HashMap::with_capacity(capacity),
			indexers,
		))
	}
}

impl<T: Clone + Send + Sync + 'static> Default for StoreBuilder<T> {
	fn default() -> Self {
		Self::new()
	}
}
