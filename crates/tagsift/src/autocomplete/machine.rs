//
// autocomplete/machine.rs
//
// Pure autocomplete state machine: events in, commands out
//

use std::time::Duration;

use serde::Serialize;

use super::source::SuggestionItem;
use crate::config::AutocompleteConfig;

/// Monotonic id of a debounce cycle; bumped by every keystroke
pub type CycleId = u64;

/// Id of a creation request
pub type CreateId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Idle,
    /// Debounce timer armed
    Typing,
    /// Lookup for the current cycle outstanding
    AwaitingLookup,
    ShowingSuggestions,
    /// Creation outstanding with the popover open
    Creating,
    /// Terminal; every further event is ignored
    Unmounted,
}

/// Input to [`AutocompleteMachine::handle`]
#[derive(Debug)]
pub enum Event<T> {
    Keystroke(String),
    TimerFired(CycleId),
    LookupResolved {
        cycle: CycleId,
        result: anyhow::Result<Vec<SuggestionItem<T>>>,
    },
    SuggestionClicked(usize),
    CreateClicked,
    CreateSettled {
        id: CreateId,
        result: anyhow::Result<Option<SuggestionItem<T>>>,
    },
    OutsideClick,
    Enter,
    Unmount,
}

/// Side effect requested by the machine; executed by the session driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<T> {
    /// (Re)arm the debounce timer, replacing any armed one
    ArmTimer { cycle: CycleId, delay: Duration },
    CancelTimer,
    Query { cycle: CycleId, text: String },
    Create { id: CreateId, text: String },
    AttachDismissListener,
    DetachDismissListener,
    NotifySelected(SuggestionItem<T>),
    NotifyEnter(String),
}

/// Render snapshot of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView<T> {
    pub search_text: String,
    pub suggestions: Vec<SuggestionItem<T>>,
    pub popover_visible: bool,
    /// A lookup for the current text or a creation is outstanding
    pub pending: bool,
    /// The empty-result "create new" affordance is offered
    pub can_create: bool,
    pub phase: Phase,
}

impl<T> Default for SessionView<T> {
    fn default() -> Self {
        Self {
            search_text: String::new(),
            suggestions: Vec::new(),
            popover_visible: false,
            pending: false,
            can_create: false,
            phase: Phase::Idle,
        }
    }
}

/// Autocomplete session state.
///
/// The popover and the outside-click listener are coupled: the listener is
/// attached exactly when the popover becomes visible and detached exactly when
/// it is hidden, so `AttachDismissListener` and `DetachDismissListener`
/// strictly alternate.
#[derive(Debug)]
pub struct AutocompleteMachine<T> {
    config: AutocompleteConfig,
    create_enabled: bool,
    phase: Phase,
    search_text: String,
    suggestions: Vec<SuggestionItem<T>>,
    popover_visible: bool,
    cycle: CycleId,
    lookup_in_flight: bool,
    creating: Option<CreateId>,
    next_create_id: CreateId,
}

impl<T: Clone> AutocompleteMachine<T> {
    pub fn new(config: AutocompleteConfig, create_enabled: bool) -> Self {
        Self {
            config,
            create_enabled,
            phase: Phase::Idle,
            search_text: String::new(),
            suggestions: Vec::new(),
            popover_visible: false,
            cycle: 0,
            lookup_in_flight: false,
            creating: None,
            next_create_id: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn cycle(&self) -> CycleId {
        self.cycle
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn suggestions(&self) -> &[SuggestionItem<T>] {
        &self.suggestions
    }

    pub fn popover_visible(&self) -> bool {
        self.popover_visible
    }

    pub fn is_pending(&self) -> bool {
        self.lookup_in_flight || self.creating.is_some()
    }

    fn can_create(&self) -> bool {
        self.create_enabled
            && self.phase == Phase::ShowingSuggestions
            && self.popover_visible
            && self.suggestions.is_empty()
            && self.creating.is_none()
    }

    pub fn view(&self) -> SessionView<T> {
        SessionView {
            search_text: self.search_text.clone(),
            suggestions: self.suggestions.clone(),
            popover_visible: self.popover_visible,
            pending: self.is_pending(),
            can_create: self.can_create(),
            phase: self.phase,
        }
    }

    fn show_popover(&mut self, commands: &mut Vec<Command<T>>) {
        if !self.popover_visible {
            self.popover_visible = true;
            commands.push(Command::AttachDismissListener);
        }
    }

    fn hide_popover(&mut self, commands: &mut Vec<Command<T>>) {
        if self.popover_visible {
            self.popover_visible = false;
            commands.push(Command::DetachDismissListener);
        }
    }

    /// Apply one event and return the side effects it requires
    pub fn handle(&mut self, event: Event<T>) -> Vec<Command<T>> {
        let mut commands = Vec::new();

        if self.phase == Phase::Unmounted {
            log::trace!("Ignoring {:?} on unmounted session", EventKind::of(&event));
            return commands;
        }

        match event {
            Event::Keystroke(text) => {
                self.search_text = text;
                self.cycle += 1;
                self.lookup_in_flight = false;
                self.suggestions.clear();
                self.hide_popover(&mut commands);
                self.phase = Phase::Typing;
                commands.push(Command::ArmTimer {
                    cycle: self.cycle,
                    delay: self.config.debounce(),
                });
            }

            Event::TimerFired(cycle) => {
                if cycle != self.cycle || self.phase != Phase::Typing {
                    log::trace!(
                        "Ignoring timer for cycle {} (current {}, {:?})",
                        cycle,
                        self.cycle,
                        self.phase
                    );
                    return commands;
                }
                if !self.config.accepts_query(&self.search_text) {
                    log::trace!(
                        "Skipping lookup for {:?}: shorter than {} chars",
                        self.search_text,
                        self.config.min_query_chars
                    );
                    self.phase = Phase::Idle;
                    return commands;
                }
                self.phase = Phase::AwaitingLookup;
                self.lookup_in_flight = true;
                commands.push(Command::Query {
                    cycle,
                    text: self.search_text.clone(),
                });
            }

            Event::LookupResolved { cycle, result } => {
                if cycle != self.cycle || self.phase != Phase::AwaitingLookup {
                    log::trace!(
                        "Discarding stale lookup result for cycle {} (current {})",
                        cycle,
                        self.cycle
                    );
                    return commands;
                }
                self.lookup_in_flight = false;
                match result {
                    Ok(items) => {
                        self.suggestions = items;
                        self.show_popover(&mut commands);
                        self.phase = Phase::ShowingSuggestions;
                    }
                    Err(err) => {
                        log::debug!("Lookup for {:?} failed: {:#}", self.search_text, err);
                        self.suggestions.clear();
                        self.hide_popover(&mut commands);
                        self.phase = Phase::Idle;
                    }
                }
            }

            Event::SuggestionClicked(index) => {
                if self.phase != Phase::ShowingSuggestions || !self.popover_visible {
                    log::trace!("Ignoring suggestion click in {:?}", self.phase);
                    return commands;
                }
                let Some(item) = self.suggestions.get(index).cloned() else {
                    log::debug!(
                        "Suggestion index {} out of range ({} shown)",
                        index,
                        self.suggestions.len()
                    );
                    return commands;
                };
                commands.push(Command::NotifySelected(item));
                self.hide_popover(&mut commands);
                if self.config.clear_after_select {
                    self.search_text.clear();
                    self.suggestions.clear();
                }
                self.phase = Phase::Idle;
            }

            Event::CreateClicked => {
                if !self.can_create() {
                    log::trace!("Ignoring create request in {:?}", self.phase);
                    return commands;
                }
                let id = self.next_create_id;
                self.next_create_id += 1;
                self.creating = Some(id);
                self.phase = Phase::Creating;
                commands.push(Command::Create {
                    id,
                    text: self.search_text.clone(),
                });
            }

            Event::CreateSettled { id, result } => {
                if self.creating != Some(id) {
                    log::trace!("Ignoring settlement of unknown creation {}", id);
                    return commands;
                }
                self.creating = None;
                match result {
                    Ok(Some(item)) => commands.push(Command::NotifySelected(item)),
                    Ok(None) => {}
                    Err(err) => log::debug!("Creating {:?} failed: {:#}", self.search_text, err),
                }
                if self.phase == Phase::Creating {
                    self.hide_popover(&mut commands);
                    self.phase = Phase::Idle;
                }
            }

            Event::OutsideClick => {
                if !self.popover_visible {
                    log::trace!("Outside click with popover already hidden");
                    return commands;
                }
                self.hide_popover(&mut commands);
                if matches!(self.phase, Phase::ShowingSuggestions | Phase::Creating) {
                    self.phase = Phase::Idle;
                }
            }

            Event::Enter => {
                commands.push(Command::NotifyEnter(self.search_text.clone()));
            }

            Event::Unmount => {
                commands.push(Command::CancelTimer);
                self.hide_popover(&mut commands);
                self.lookup_in_flight = false;
                self.creating = None;
                self.phase = Phase::Unmounted;
            }
        }

        commands
    }
}

/// Payload-free event tag for logging
#[derive(Debug, Clone, Copy)]
enum EventKind {
    Keystroke,
    TimerFired,
    LookupResolved,
    SuggestionClicked,
    CreateClicked,
    CreateSettled,
    OutsideClick,
    Enter,
    Unmount,
}

impl EventKind {
    fn of<T>(event: &Event<T>) -> Self {
        match event {
            Event::Keystroke(_) => Self::Keystroke,
            Event::TimerFired(_) => Self::TimerFired,
            Event::LookupResolved { .. } => Self::LookupResolved,
            Event::SuggestionClicked(_) => Self::SuggestionClicked,
            Event::CreateClicked => Self::CreateClicked,
            Event::CreateSettled { .. } => Self::CreateSettled,
            Event::OutsideClick => Self::OutsideClick,
            Event::Enter => Self::Enter,
            Event::Unmount => Self::Unmount,
        }
    }
}
