//! Defines the core state structures for the application.
//!
//! `App` is the single source of truth for what the terminal shows: the
//! agreement list view-model, the overlay currently on top of it (a form,
//! the rate assignment dialog or a confirmation), and the injected API and
//! notification capabilities every handler reports through.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use super::form::AgreementFormState;
use super::list::AgreementList;
use super::rates::RateAssignmentState;
use super::tasks::TaskResult;
use crate::api::AcuerdosApi;
use crate::notify::Notifier;

/// The main application state.
pub struct App {
    /// Flag to indicate if the application should quit.
    pub should_quit: bool,
    /// The agreement table, its filters and pagination.
    pub list: AgreementList,
    /// The currently active overlay, if any. Overlays capture all input.
    pub overlay: Option<Overlay>,

    /// Backend every view talks to.
    pub(crate) api: Arc<dyn AcuerdosApi>,
    /// Where handlers report success and failure.
    pub(crate) notifier: Box<dyn Notifier>,

    /// Finished background requests flow from `tasks_tx` to `tasks_rx`.
    pub(crate) tasks_tx: UnboundedSender<TaskResult>,
    pub(crate) tasks_rx: UnboundedReceiver<TaskResult>,
    /// Requests still in flight.
    pub(crate) pending: usize,
    /// Bumped on every list fetch; older responses are dropped.
    pub(crate) list_generation: u64,
    /// Last id handed to a form or rate dialog.
    pub(crate) modal_seq: u64,

    /// The configured tick rate for the application.
    pub(crate) tick_rate: Duration,
}

impl App {
    pub fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }
}

/// Temporary panels drawn over the agreement list.
#[derive(Debug, Clone)]
pub enum Overlay {
    AgreementForm(AgreementFormState),
    Rates(RateAssignmentState),
    Confirm(ConfirmState),
}

/// What a modal reports back when it finishes handling an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalOutcome {
    /// The modal stays open (validation failure, request in flight, ...).
    Stay,
    /// The modal closes; `changed` tells the list whether to refetch.
    Closed { changed: bool },
}

/// Actions that wait behind a yes/no confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmAction {
    DeleteAgreement(i64),
    CloseApplication,
}

/// State for the yes/no confirmation overlay.
#[derive(Debug, Clone)]
pub struct ConfirmState {
    pub action: ConfirmAction,
    pub title: String,
    pub message: String,
    pub confirm_label: String,
    pub cancel_label: String,
    /// The index of the selected button (0 for Confirm, 1 for Cancel).
    pub selected_index: usize,
}

impl ConfirmState {
    pub fn new(action: ConfirmAction) -> Self {
        let (title, message, confirm_label) = match action {
            ConfirmAction::DeleteAgreement(_) => (
                "¿Estás seguro?",
                "Se eliminará este acuerdo de forma permanente.",
                "Sí, eliminar",
            ),
            ConfirmAction::CloseApplication => (
                "¿Desea cerrar la pestaña?",
                "No podrá continuar con la aplicación.",
                "Sí, cerrar",
            ),
        };
        Self {
            action,
            title: title.to_string(),
            message: message.to_string(),
            confirm_label: confirm_label.to_string(),
            cancel_label: String::from("Cancelar"),
            // Cancel starts selected.
            selected_index: 1,
        }
    }

    /// Toggles the selection between the "Confirm" and "Cancel" buttons.
    pub fn toggle_selection(&mut self) {
        self.selected_index = (self.selected_index + 1) % 2;
    }

    /// Returns true if the "Confirm" button is currently selected.
    pub fn confirm_selected(&self) -> bool {
        self.selected_index == 0
    }
}
