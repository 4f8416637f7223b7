use std::{
	collections::{HashMap, HashSet},
	fmt,
	sync::Arc,
};

use tracing::{debug, error, trace, warn};

use super::error::{Error, IndexFuncError, Result};

type DynIndexFunc<T> = dyn Fn(&T) -> Result<Vec<String>, IndexFuncError> + Send + Sync;

/// Computes the index values of a stored object.
///
/// Must be deterministic and free of side effects, it is called on both the previous and the new
/// object of every mutation, always while the store lock is held, so it must never call back into
/// the store.
pub struct IndexFunc<T>(Arc<DynIndexFunc<T>>);

impl<T: 'static> IndexFunc<T> {
	#[must_use]
	pub fn new<F>(index_func: F) -> Self
	where
		F: Fn(&T) -> Result<Vec<String>, IndexFuncError> + Send + Sync + 'static,
	{
		Self(Arc::new(index_func))
	}

	#[must_use]
	pub fn infallible<F>(index_func: F) -> Self
	where
		F: Fn(&T) -> Vec<String> + Send + Sync + 'static,
	{
		Self(Arc::new(move |obj| Ok(index_func(obj))))
	}
}

impl<T> IndexFunc<T> {
	pub fn call(&self, obj: &T) -> Result<Vec<String>, IndexFuncError> {
		(self.0)(obj)
	}
}

impl<T> Clone for IndexFunc<T> {
	fn clone(&self) -> Self {
		Self(Arc::clone(&self.0))
	}
}

impl<T> fmt::Debug for IndexFunc<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("IndexFunc").finish_non_exhaustive()
	}
}

/// Index function name -> index function
pub type Indexers<T> = HashMap<String, IndexFunc<T>>;

/// Index value -> keys of the objects producing that value
pub type Index = HashMap<String, HashSet<String>>;

/// Index function name -> its index
pub type Indices = HashMap<String, Index>;

#[derive(Debug)]
struct IndexChange {
	name: String,
	removed: Vec<String>,
	added: Vec<String>,
}

/// Every index change a single key needs, computed before anything is mutated.
#[derive(Debug)]
pub(crate) struct IndexDelta {
	key: String,
	changes: Vec<IndexChange>,
}

/// Bookkeeping for the secondary indices of a store.
///
/// Holds no lock of its own, callers must hold the store lock for the whole call: a shared one for
/// queries and an exclusive one for anything taking `&mut self`.
pub(crate) struct StoreIndex<T> {
	indexers: Indexers<T>,
	indices: Indices,
}

impl<T> StoreIndex<T> {
	pub fn new(indexers: Indexers<T>) -> Self {
		Self {
			indexers,
			indices: Indices::new(),
		}
	}

	pub const fn indexers(&self) -> &Indexers<T> {
		&self.indexers
	}

	/// Drops every index bucket, registered indexers are kept.
	pub fn reset(&mut self) {
		self.indices = Indices::new();
	}

	/// Computes what every index must change when `key` goes from `old` to `new`.
	///
	/// `None` as `old` means the key is being created, `None` as `new` means it's being deleted.
	/// Nothing is touched here, so a failing index function leaves the indices as they were.
	pub fn diff(&self, old: Option<&T>, new: Option<&T>, key: &str) -> Result<IndexDelta> {
		let mut changes = Vec::new();

		for (name, index_func) in &self.indexers {
			let compute = |obj: Option<&T>| {
				obj.map_or_else(|| Ok(Vec::new()), |obj| index_func.call(obj))
					.map_err(|source| {
						error!(%key, index = %name, %source, "Index function failed on a store mutation;");
						Error::Unrecoverable {
							key: key.to_owned(),
							index: name.clone(),
							source,
						}
					})
			};

			let old_values = compute(old)?;
			let new_values = compute(new)?;

			// Single valued indices whose value didn't change are by far the most common case
			if old_values.len() == 1 && new_values.len() == 1 && old_values[0] == new_values[0] {
				continue;
			}

			let removed = {
				let kept = new_values.iter().map(String::as_str).collect::<HashSet<_>>();
				old_values
					.into_iter()
					.filter(|value| !kept.contains(value.as_str()))
					.collect::<Vec<_>>()
			};

			if removed.is_empty() && new_values.is_empty() {
				continue;
			}

			changes.push(IndexChange {
				name: name.clone(),
				removed,
				added: new_values,
			});
		}

		Ok(IndexDelta {
			key: key.to_owned(),
			changes,
		})
	}

	pub fn apply(&mut self, IndexDelta { key, changes }: IndexDelta) {
		for IndexChange {
			name,
			removed,
			added,
		} in changes
		{
			trace!(%key, index = %name, ?removed, ?added, "Updating index;");

			let index = self.indices.entry(name).or_default();

			for value in removed {
				delete_key_from_index(index, &key, value);
			}

			for value in added {
				index.entry(value).or_default().insert(key.clone());
			}
		}
	}

	pub fn reconcile(&mut self, old: Option<&T>, new: Option<&T>, key: &str) -> Result<()> {
		let delta = self.diff(old, new, key)?;
		self.apply(delta);
		Ok(())
	}

	fn indexer(&self, index_name: &str) -> Result<&IndexFunc<T>> {
		self.indexers
			.get(index_name)
			.ok_or_else(|| Error::IndexNotFound(index_name.to_owned()))
	}

	/// Keys of every object sharing at least one index value with `obj`.
	pub fn lookup<'a>(&'a self, index_name: &str, obj: &T) -> Result<HashSet<&'a str>> {
		let values = self
			.indexer(index_name)?
			.call(obj)
			.map_err(|source| Error::IndexFunc {
				index: index_name.to_owned(),
				source,
			})?;

		let Some(index) = self.indices.get(index_name) else {
			return Ok(HashSet::new());
		};

		Ok(values
			.iter()
			.filter_map(|value| index.get(value))
			.flatten()
			.map(String::as_str)
			.collect())
	}

	/// Keys currently bucketed under `indexed_value`.
	///
	/// Reads the bucket as is, an unknown value yields no keys instead of an error.
	pub fn lookup_by_value<'a>(
		&'a self,
		index_name: &str,
		indexed_value: &str,
	) -> Result<impl Iterator<Item = &'a str> + 'a> {
		self.indexer(index_name)?;

		Ok(self
			.indices
			.get(index_name)
			.and_then(|index| index.get(indexed_value))
			.into_iter()
			.flatten()
			.map(String::as_str))
	}

	pub fn values<'a>(&'a self, index_name: &str) -> impl Iterator<Item = &'a str> + 'a {
		self.indices
			.get(index_name)
			.into_iter()
			.flat_map(HashMap::keys)
			.map(String::as_str)
	}

	pub fn add_indexers(&mut self, new_indexers: Indexers<T>) -> Result<()> {
		let mut conflicts = new_indexers
			.keys()
			.filter(|name| self.indexers.contains_key(*name))
			.cloned()
			.collect::<Vec<_>>();

		if !conflicts.is_empty() {
			conflicts.sort_unstable();
			warn!(?conflicts, "Refusing to register indexers with names already in use;");
			return Err(Error::IndexerConflict(conflicts));
		}

		debug!(
			new_indexers = ?new_indexers.keys().collect::<Vec<_>>(),
			"Registering indexers;"
		);

		self.indexers.extend(new_indexers);

		Ok(())
	}
}

fn delete_key_from_index(index: &mut Index, key: &str, indexed_value: String) {
	let Some(keys) = index.get_mut(&indexed_value) else {
		return;
	};

	keys.remove(key);

	// Empty buckets are dropped right away, otherwise short lived index values on a high
	// cardinality index would grow memory usage forever
	if keys.is_empty() {
		index.remove(&indexed_value);
	}
}
