// lib.rs - Library root for the filter and autocomplete core.
//
// The demo binary in main.rs drives these modules from a command script;
// tests and benches import them from here.

pub mod autocomplete;
pub mod catalog;
pub mod config;
pub mod debounce;
pub mod dom;
pub mod filter;
pub mod sorted_set;
// test_utils is available in test builds and when the `test-support` feature is enabled.
#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;

#[cfg(test)]
mod property_tests;

pub use autocomplete::{AutocompleteSession, SuggestionItem, SuggestionSource};
pub use config::AutocompleteConfig;
pub use filter::{CategoryFilter, FilteredListing, SelectedItems};
pub use sorted_set::{CategoryId, SortedIndexSet};
