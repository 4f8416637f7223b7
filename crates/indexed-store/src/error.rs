use thiserror::Error;

/// Error produced by an index function when it can't compute values for an object.
pub type IndexFuncError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
	#[error("index with name <name='{0}'> does not exist")]
	IndexNotFound(String),
	#[error("indexer conflict: {0:?}")]
	IndexerConflict(Vec<String>),
	#[error("cannot add indexers to a store that already holds entries")]
	IndexerRegistrationOnNonEmptyStore,

	#[error("index function <name='{index}'> failed: {source}")]
	IndexFunc {
		index: String,
		#[source]
		source: IndexFuncError,
	},

	/// An index function rejected an object during a mutation.
	///
	/// The mutation was refused before anything was committed, but the caller handed the store an
	/// object that a registered index function can't handle, so every later write of the same shape
	/// would fail too. Callers must treat this as fatal and stop feeding the store.
	#[error(
		"unable to calculate an index entry for key <key='{key}'> on index <name='{index}'>: {source}"
	)]
	Unrecoverable {
		key: String,
		index: String,
		#[source]
		source: IndexFuncError,
	},
}

impl Error {
	#[must_use]
	pub const fn is_fatal(&self) -> bool {
		matches!(self, Self::Unrecoverable { .. })
	}
}
