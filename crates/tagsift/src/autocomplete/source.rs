//
// autocomplete/source.rs
//
// Collaborator contracts consumed by autocomplete sessions
//

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A (value, label) pair offered in the suggestion popover
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SuggestionItem<T> {
    pub value: T,
    pub text: String,
}

impl<T> SuggestionItem<T> {
    pub fn new(value: T, text: impl Into<String>) -> Self {
        Self {
            value,
            text: text.into(),
        }
    }
}

/// Future returned by a creation that does not complete immediately
pub type CreateFuture<T> =
    Pin<Box<dyn Future<Output = anyhow::Result<Option<SuggestionItem<T>>>> + Send + 'static>>;

/// Result of [`SuggestionSource::create`]
pub enum Creation<T> {
    /// Creation finished synchronously, possibly without producing an item
    Ready(Option<SuggestionItem<T>>),
    /// Creation is still running; the session shows a loading indicator until it settles
    Pending(CreateFuture<T>),
}

impl<T> std::fmt::Debug for Creation<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Creation::Ready(item) => f
                .debug_tuple("Ready")
                .field(&item.as_ref().map(|i| i.text.as_str()))
                .finish(),
            Creation::Pending(_) => f.write_str("Pending"),
        }
    }
}

/// Remote lookup (and optional creation) backing one autocomplete use site.
///
/// Matching and ranking are entirely up to the implementation. Errors are
/// never shown by the session; reporting them to the user is the source's job.
#[async_trait]
pub trait SuggestionSource<T>: Send + Sync {
    /// Look up suggestions for `text`
    async fn query(&self, text: &str) -> anyhow::Result<Vec<SuggestionItem<T>>>;

    /// Whether the "create new" affordance is offered when a lookup finds nothing
    fn supports_create(&self) -> bool {
        false
    }

    /// Create a new option named `text`
    fn create(&self, _text: &str) -> Creation<T> {
        Creation::Ready(None)
    }
}
