//! The `app` module holds the application state and its input handling.
//!
//! `mod.rs` declares the submodules and re-exports the types the UI layer
//! and the binary need.

/// `form`: the create/edit agreement dialog.
pub mod form;
/// `init`: construction of [`App`].
mod init;
/// `input`: single-line text field used by forms and filters.
pub mod input;
/// `keyboard`: routing of key events.
mod keyboard;
/// `list`: the agreement table, filters and pagination.
pub mod list;
/// `overlays`: confirmation and modal key handling.
mod overlays;
/// `rates`: the rate assignment dialog.
pub mod rates;
/// `state`: `App` and the overlay types.
mod state;
/// `tasks`: background requests and how their results are applied.
mod tasks;
/// `tick`: periodic housekeeping.
mod tick;

pub use form::{AgreementFormState, FormField};
pub use input::TextInput;
pub use list::ListFocus;
pub use rates::{MIN_ASSIGNED_RATES, RateAssignmentState, RatesPane};
pub use state::{App, ConfirmAction, ConfirmState, ModalOutcome, Overlay};
pub use tasks::TaskResult;

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use super::App;
    use crate::api::fake::FakeApi;
    use crate::notify::testing::RecordingNotifier;

    /// An `App` over `api` whose notifications are recorded.
    pub fn test_app(api: Arc<FakeApi>) -> (App, RecordingNotifier) {
        let notes = RecordingNotifier::default();
        let app = App::new(api, Box::new(notes.clone()), 10);
        (app, notes)
    }
}
