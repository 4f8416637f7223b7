#![allow(dead_code)]

use sd_indexed_store::{IndexFunc, ThreadSafeStore};

pub const FIRST_CHAR: &str = "by_first_char";
pub const VALUES: &str = "values";

pub fn first_char() -> IndexFunc<String> {
	IndexFunc::infallible(|obj: &String| obj.chars().take(1).map(String::from).collect())
}

pub fn split_on_commas() -> IndexFunc<String> {
	IndexFunc::infallible(|obj: &String| {
		obj.split(',')
			.filter(|value| !value.is_empty())
			.map(ToOwned::to_owned)
			.collect()
	})
}

pub fn sorted<T: Ord>(mut items: Vec<T>) -> Vec<T> {
	items.sort_unstable();
	items
}

pub fn strings(items: &[&str]) -> Vec<String> {
	items.iter().map(ToString::to_string).collect()
}

/// Checks that every index holds exactly the keys its index function yields for the stored
/// objects, and that no empty bucket was left behind.
pub fn assert_consistent(store: &impl ThreadSafeStore<String>) {
	let indexers = store.get_indexers();

	for (name, index_func) in &indexers {
		for key in store.list_keys() {
			let obj = store.get(&key).expect("listed key must be stored");
			for value in index_func.call(&obj).expect("index function must not fail") {
				assert!(
					store
						.index_keys(name, &value)
						.expect("registered index")
						.contains(&key),
					"key <key='{key}'> missing from bucket <value='{value}'> of index <name='{name}'>"
				);
			}
		}

		for value in store.list_index_func_values(name) {
			let keys = store.index_keys(name, &value).expect("registered index");
			assert!(
				!keys.is_empty(),
				"empty bucket <value='{value}'> left on index <name='{name}'>"
			);

			for key in keys {
				let obj = store
					.get(&key)
					.unwrap_or_else(|| panic!("indexed key <key='{key}'> isn't stored"));
				assert!(
					index_func
						.call(&obj)
						.expect("index function must not fail")
						.contains(&value),
					"key <key='{key}'> is bucketed under <value='{value}'> but doesn't produce it"
				);
			}
		}
	}
}
