//! Scripted [`SuggestionSource`] with per-text latency, failures and a call log.
//!
//! Time is read from `tokio::time`, so tests running with a paused clock get
//! exact, reproducible call instants.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use tokio::time::Instant;

use crate::autocomplete::{Creation, SuggestionItem, SuggestionSource};

#[derive(Clone)]
enum Reply<T> {
    Items(Vec<SuggestionItem<T>>),
    Fail(String),
    Panic,
}

#[derive(Clone)]
enum CreateScript<T> {
    Disabled,
    Ready(Option<SuggestionItem<T>>),
    After(Duration, Result<Option<SuggestionItem<T>>, String>),
}

/// Lookup source driven by a script of canned replies.
///
/// Texts without a scripted reply resolve immediately to an empty list.
pub struct ScriptedSource<T> {
    replies: HashMap<String, (Duration, Reply<T>)>,
    create: CreateScript<T>,
    calls: Mutex<Vec<(Instant, String)>>,
    create_calls: Arc<Mutex<Vec<String>>>,
}

impl<T> Default for ScriptedSource<T> {
    fn default() -> Self {
        Self {
            replies: HashMap::new(),
            create: CreateScript::Disabled,
            calls: Mutex::new(Vec::new()),
            create_calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

fn items<T>(pairs: Vec<(T, &str)>) -> Vec<SuggestionItem<T>> {
    pairs
        .into_iter()
        .map(|(value, text)| SuggestionItem::new(value, text))
        .collect()
}

impl<T> ScriptedSource<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `text` immediately with `pairs`
    pub fn respond(self, text: &str, pairs: Vec<(T, &str)>) -> Self {
        self.respond_after(text, Duration::ZERO, pairs)
    }

    /// Resolve `text` with `pairs` after `latency`
    pub fn respond_after(mut self, text: &str, latency: Duration, pairs: Vec<(T, &str)>) -> Self {
        self.replies
            .insert(text.to_string(), (latency, Reply::Items(items(pairs))));
        self
    }

    /// Reject lookups of `text`
    pub fn fail_on(mut self, text: &str) -> Self {
        self.replies.insert(
            text.to_string(),
            (Duration::ZERO, Reply::Fail(format!("lookup of {text:?} rejected"))),
        );
        self
    }

    /// Panic while looking up `text`
    pub fn panic_on(mut self, text: &str) -> Self {
        self.replies
            .insert(text.to_string(), (Duration::ZERO, Reply::Panic));
        self
    }

    /// Support creation, finishing synchronously
    pub fn create_ready(mut self, created: Option<(T, &str)>) -> Self {
        self.create = CreateScript::Ready(created.map(|(v, t)| SuggestionItem::new(v, t)));
        self
    }

    /// Support creation, settling after `delay`
    pub fn create_after(
        mut self,
        delay: Duration,
        outcome: Result<Option<(T, &str)>, &str>,
    ) -> Self {
        let outcome = outcome
            .map(|created| created.map(|(v, t)| SuggestionItem::new(v, t)))
            .map_err(str::to_string);
        self.create = CreateScript::After(delay, outcome);
        self
    }

    /// Texts looked up so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }

    /// Instants (tokio clock) and texts of every lookup
    pub fn call_log(&self) -> Vec<(Instant, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn create_calls(&self) -> Vec<String> {
        self.create_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl<T> SuggestionSource<T> for ScriptedSource<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn query(&self, text: &str) -> anyhow::Result<Vec<SuggestionItem<T>>> {
        self.calls
            .lock()
            .unwrap()
            .push((Instant::now(), text.to_string()));

        let Some((latency, reply)) = self.replies.get(text).cloned() else {
            return Ok(Vec::new());
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        match reply {
            Reply::Items(items) => Ok(items),
            Reply::Fail(message) => Err(anyhow!(message)),
            Reply::Panic => panic!("scripted panic for {text:?}"),
        }
    }

    fn supports_create(&self) -> bool {
        !matches!(self.create, CreateScript::Disabled)
    }

    fn create(&self, text: &str) -> Creation<T> {
        self.create_calls.lock().unwrap().push(text.to_string());
        match self.create.clone() {
            CreateScript::Disabled => Creation::Ready(None),
            CreateScript::Ready(item) => Creation::Ready(item),
            CreateScript::After(delay, outcome) => Creation::Pending(Box::pin(async move {
                tokio::time::sleep(delay).await;
                outcome.map_err(|message| anyhow!(message))
            })),
        }
    }
}

/// Collects items handed to an `on_selected` callback
#[derive(Clone)]
pub struct SelectionLog<T> {
    items: Arc<Mutex<Vec<SuggestionItem<T>>>>,
}

impl<T> Default for SelectionLog<T> {
    fn default() -> Self {
        Self {
            items: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T> SelectionLog<T>
where
    T: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn callback(&self) -> impl FnMut(SuggestionItem<T>) + Send + 'static {
        let items = self.items.clone();
        move |item| items.lock().unwrap().push(item)
    }

    pub fn items(&self) -> Vec<SuggestionItem<T>> {
        self.items.lock().unwrap().clone()
    }
}
