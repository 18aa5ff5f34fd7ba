//
// autocomplete/mod.rs
//
// Debounced asynchronous autocomplete
//
// A keystroke re-arms the debounce timer; when it fires the current text is
// looked up, and the result is shown only if no newer keystroke started a
// later cycle in the meantime. The popover owns a document-level
// outside-click listener for exactly as long as it is visible.
//

pub mod machine;
pub mod session;
pub mod source;


pub use machine::{AutocompleteMachine, Command, CreateId, CycleId, Event, Phase, SessionView};
pub use session::{AutocompleteSession, SessionBuilder};
pub use source::{CreateFuture, Creation, SuggestionItem, SuggestionSource};
