//
// autocomplete/session.rs
//
// Async driver that runs an autocomplete state machine as a task
//

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::machine::{AutocompleteMachine, Command, Event, Phase, SessionView};
use super::source::{Creation, SuggestionItem, SuggestionSource};
use crate::config::AutocompleteConfig;
use crate::debounce::Debouncer;
use crate::dom::{Document, NodeId, OutsideClickGuard};

type SelectedCallback<T> = Box<dyn FnMut(SuggestionItem<T>) + Send>;
type EnterCallback = Box<dyn FnMut(String) + Send>;

enum Message<T> {
    Event(Event<T>),
    /// Acknowledged once every message queued before it has been processed
    Barrier(oneshot::Sender<()>),
}

/// Builder for [`AutocompleteSession`]
pub struct SessionBuilder<T> {
    source: Arc<dyn SuggestionSource<T>>,
    document: Arc<Document>,
    root: NodeId,
    config: AutocompleteConfig,
    on_selected: Option<SelectedCallback<T>>,
    on_enter: Option<EnterCallback>,
}

impl<T> SessionBuilder<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn config(mut self, config: AutocompleteConfig) -> Self {
        self.config = config;
        self
    }

    /// Called once per selected suggestion (and per created item)
    pub fn on_selected<F>(mut self, callback: F) -> Self
    where
        F: FnMut(SuggestionItem<T>) + Send + 'static,
    {
        self.on_selected = Some(Box::new(callback));
        self
    }

    /// Called with the current text when Enter is pressed
    pub fn on_enter<F>(mut self, callback: F) -> Self
    where
        F: FnMut(String) + Send + 'static,
    {
        self.on_enter = Some(Box::new(callback));
        self
    }

    /// Start the session task. Must be called within a tokio runtime.
    pub fn mount(self) -> AutocompleteSession<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        let machine = AutocompleteMachine::new(self.config, self.source.supports_create());
        let (view_tx, view_rx) = watch::channel(machine.view());
        let shutdown = CancellationToken::new();

        let driver = Driver {
            machine,
            source: self.source,
            document: self.document,
            root: self.root,
            tx: tx.clone(),
            debouncer: Debouncer::new(),
            dismiss: None,
            on_selected: self.on_selected,
            on_enter: self.on_enter,
            view_tx,
        };
        let task = tokio::spawn(driver.run(rx, shutdown.clone()));

        AutocompleteSession {
            tx,
            view: view_rx,
            shutdown,
            task: Some(task),
        }
    }
}

/// A mounted autocomplete component.
///
/// Every interaction is queued to the session task and processed in order.
/// Dropping the session unmounts it: the debounce timer is cancelled and the
/// outside-click listener detached.
pub struct AutocompleteSession<T> {
    tx: mpsc::UnboundedSender<Message<T>>,
    view: watch::Receiver<SessionView<T>>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl<T> AutocompleteSession<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Start building a session for the component rooted at `root`
    pub fn builder<S>(source: Arc<S>, document: Arc<Document>, root: NodeId) -> SessionBuilder<T>
    where
        S: SuggestionSource<T> + 'static,
    {
        let source: Arc<dyn SuggestionSource<T>> = source;
        SessionBuilder {
            source,
            document,
            root,
            config: AutocompleteConfig::default(),
            on_selected: None,
            on_enter: None,
        }
    }

    fn send(&self, event: Event<T>) {
        if self.tx.send(Message::Event(event)).is_err() {
            log::trace!("Autocomplete session already stopped; dropping input");
        }
    }

    /// Replace the search text (one keystroke)
    pub fn input(&self, text: impl Into<String>) {
        self.send(Event::Keystroke(text.into()));
    }

    /// Click the suggestion at `index`
    pub fn select(&self, index: usize) {
        self.send(Event::SuggestionClicked(index));
    }

    /// Click the "create new" affordance
    pub fn create_new(&self) {
        self.send(Event::CreateClicked);
    }

    pub fn press_enter(&self) {
        self.send(Event::Enter);
    }

    /// Latest render snapshot
    pub fn view(&self) -> SessionView<T> {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView<T>> {
        self.view.clone()
    }

    /// Wait until every interaction sent so far has been processed
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(Message::Barrier(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }

    /// Unmount and wait for the session task to release its resources
    pub async fn unmount(mut self) {
        self.send(Event::Unmount);
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                log::warn!("Autocomplete session task failed: {}", err);
            }
        }
    }
}

impl<T> Drop for AutocompleteSession<T> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

struct Driver<T> {
    machine: AutocompleteMachine<T>,
    source: Arc<dyn SuggestionSource<T>>,
    document: Arc<Document>,
    root: NodeId,
    tx: mpsc::UnboundedSender<Message<T>>,
    debouncer: Debouncer,
    dismiss: Option<OutsideClickGuard>,
    on_selected: Option<SelectedCallback<T>>,
    on_enter: Option<EnterCallback>,
    view_tx: watch::Sender<SessionView<T>>,
}

impl<T> Driver<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn run(
        mut self,
        mut rx: mpsc::UnboundedReceiver<Message<T>>,
        shutdown: CancellationToken,
    ) {
        loop {
            let message = tokio::select! {
                biased;
                _ = shutdown.cancelled() => Message::Event(Event::Unmount),
                message = rx.recv() => message.unwrap_or(Message::Event(Event::Unmount)),
            };

            match message {
                Message::Barrier(ack) => {
                    let _ = ack.send(());
                }
                Message::Event(event) => {
                    self.process(event);
                    self.view_tx.send_replace(self.machine.view());
                }
            }

            if self.machine.phase() == Phase::Unmounted {
                break;
            }
        }

        debug_assert!(self.dismiss.is_none());
        debug_assert!(!self.debouncer.is_armed());
        log::trace!("Autocomplete session for root {:?} unmounted", self.root);
    }

    /// Feed `event` to the machine, along with any event produced synchronously
    /// while executing its commands.
    fn process(&mut self, event: Event<T>) {
        let mut queue = VecDeque::from([event]);
        while let Some(event) = queue.pop_front() {
            for command in self.machine.handle(event) {
                if let Some(follow_up) = self.execute(command) {
                    queue.push_back(follow_up);
                }
            }
        }
    }

    fn post(tx: &mpsc::UnboundedSender<Message<T>>, event: Event<T>) {
        if tx.send(Message::Event(event)).is_err() {
            log::trace!("Autocomplete session stopped before async work completed");
        }
    }

    fn execute(&mut self, command: Command<T>) -> Option<Event<T>> {
        match command {
            Command::ArmTimer { cycle, delay } => {
                let tx = self.tx.clone();
                self.debouncer.arm(delay, move || {
                    Self::post(&tx, Event::TimerFired(cycle));
                });
                None
            }
            Command::CancelTimer => {
                self.debouncer.cancel();
                None
            }
            Command::Query { cycle, text } => {
                let source = self.source.clone();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    // Run the lookup in its own task so a panicking source
                    // still resolves the cycle.
                    let lookup = tokio::spawn(async move { source.query(&text).await });
                    let result = match lookup.await {
                        Ok(result) => result,
                        Err(err) => Err(anyhow::anyhow!("lookup task failed: {err}")),
                    };
                    Self::post(&tx, Event::LookupResolved { cycle, result });
                });
                None
            }
            Command::Create { id, text } => match self.source.create(&text) {
                Creation::Ready(item) => Some(Event::CreateSettled {
                    id,
                    result: Ok(item),
                }),
                Creation::Pending(future) => {
                    let tx = self.tx.clone();
                    tokio::spawn(async move {
                        let result = match tokio::spawn(future).await {
                            Ok(result) => result,
                            Err(err) => Err(anyhow::anyhow!("create task failed: {err}")),
                        };
                        Self::post(&tx, Event::CreateSettled { id, result });
                    });
                    None
                }
            },
            Command::AttachDismissListener => {
                let tx = self.tx.clone();
                let previous = self.dismiss.replace(OutsideClickGuard::attach(
                    self.document.clone(),
                    self.root,
                    move || Self::post(&tx, Event::OutsideClick),
                ));
                debug_assert!(previous.is_none());
                None
            }
            Command::DetachDismissListener => {
                self.dismiss = None;
                None
            }
            Command::NotifySelected(item) => {
                if let Some(callback) = self.on_selected.as_mut() {
                    callback(item);
                }
                None
            }
            Command::NotifyEnter(text) => {
                if let Some(callback) = self.on_enter.as_mut() {
                    callback(text);
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::NodeTree;
    use crate::test_utils::{ScriptedSource, SelectionLog};
    use std::time::Duration;

    fn document() -> (Arc<Document>, NodeId, NodeId) {
        let mut tree = NodeTree::new();
        let root = tree.append_child(tree.root());
        let outside = tree.append_child(tree.root());
        (Arc::new(Document::new(tree)), root, outside)
    }

    #[tokio::test(start_paused = true)]
    async fn test_view_published_after_lookup() {
        let (document, root, _) = document();
        let source = Arc::new(ScriptedSource::new().respond("cat", vec![(1, "cats")]));
        let session = AutocompleteSession::builder(source.clone(), document.clone(), root).mount();

        session.input("cat");
        session.flush().await;
        assert_eq!(session.view().search_text, "cat");
        assert_eq!(session.view().phase, Phase::Typing);

        tokio::time::sleep(Duration::from_millis(850)).await;
        session.flush().await;
        let view = session.view();
        assert!(view.popover_visible);
        assert_eq!(view.suggestions, vec![SuggestionItem::new(1, "cats")]);
        assert_eq!(document.listener_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_detaches_listener() {
        let (document, root, _) = document();
        let source = Arc::new(ScriptedSource::new().respond("cat", vec![(1, "cats")]));
        let session = AutocompleteSession::builder(source, document.clone(), root).mount();
        session.input("cat");
        tokio::time::sleep(Duration::from_millis(850)).await;
        session.flush().await;
        assert_eq!(document.listener_count(), 1);

        drop(session);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(document.listener_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_synchronous_create_settles_immediately() {
        let (document, root, _) = document();
        let source = Arc::new(ScriptedSource::new().create_ready(Some((5, "zebra"))));
        let log = SelectionLog::new();
        let session = AutocompleteSession::builder(source.clone(), document.clone(), root)
            .on_selected(log.callback())
            .mount();

        session.input("zebra");
        tokio::time::sleep(Duration::from_millis(850)).await;
        session.flush().await;
        assert!(session.view().can_create);

        session.create_new();
        session.flush().await;
        let view = session.view();
        assert!(!view.pending);
        assert!(!view.popover_visible);
        assert_eq!(log.items(), vec![SuggestionItem::new(5, "zebra")]);
        assert_eq!(source.create_calls(), vec!["zebra".to_string()]);
        assert_eq!(document.listener_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_lookup_treated_as_failure() {
        let (document, root, _) = document();
        let source = Arc::new(ScriptedSource::<i64>::new().panic_on("boom"));
        let session = AutocompleteSession::builder(source, document.clone(), root).mount();

        session.input("boom");
        tokio::time::sleep(Duration::from_millis(850)).await;
        session.flush().await;
        let view = session.view();
        assert_eq!(view.phase, Phase::Idle);
        assert!(!view.pending);
        assert!(!view.popover_visible);
        assert_eq!(document.listener_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enter_callback() {
        let (document, root, _) = document();
        let source = Arc::new(ScriptedSource::<i64>::new());
        let entered = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = entered.clone();
        let session = AutocompleteSession::builder(source, document, root)
            .on_enter(move |text| sink.lock().unwrap().push(text))
            .mount();

        session.input("hello");
        session.press_enter();
        session.flush().await;
        assert_eq!(*entered.lock().unwrap(), vec!["hello".to_string()]);
    }
}
