//! Rate assignment dialog.
//!
//! Holds a working copy of the agreement's assigned rates. Toggles only touch
//! that copy; nothing reaches the server until a save with at least
//! [`MIN_ASSIGNED_RATES`] entries.

use std::sync::Arc;

use log::{debug, error, info};

use super::input::TextInput;
use super::{App, ModalOutcome, Overlay, TaskResult};
use crate::api::{Agreement, ApiError, AssignedRate, Rate, RateAssignment};
use crate::notify::{Notification, Notifier};

pub const MIN_ASSIGNED_RATES: usize = 20;

/// Focusable regions of the dialog, in tab order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatesPane {
    AvailableFilter,
    Available,
    AssignedFilter,
    Assigned,
}

impl RatesPane {
    pub fn next(self) -> Self {
        match self {
            RatesPane::AvailableFilter => RatesPane::Available,
            RatesPane::Available => RatesPane::AssignedFilter,
            RatesPane::AssignedFilter => RatesPane::Assigned,
            RatesPane::Assigned => RatesPane::AvailableFilter,
        }
    }

    pub fn previous(self) -> Self {
        match self {
            RatesPane::AvailableFilter => RatesPane::Assigned,
            RatesPane::Available => RatesPane::AvailableFilter,
            RatesPane::AssignedFilter => RatesPane::Available,
            RatesPane::Assigned => RatesPane::AssignedFilter,
        }
    }

    pub fn is_filter(self) -> bool {
        matches!(self, RatesPane::AvailableFilter | RatesPane::AssignedFilter)
    }
}

#[derive(Debug, Clone)]
pub struct RateAssignmentState {
    pub agreement: Agreement,
    pub catalog: Vec<Rate>,
    /// Working set; replaces the server's set on save.
    pub assigned: Vec<AssignedRate>,
    pub available_filter: TextInput,
    pub assigned_filter: TextInput,
    pub focus: RatesPane,
    pub available_selected: usize,
    pub assigned_selected: usize,
    /// Id matching background results to this dialog.
    pub modal: u64,
    pub loading: bool,
    /// A replacement is in flight.
    pub saving: bool,
}

fn name_matches(name: &str, filter: &TextInput) -> bool {
    name.to_lowercase().contains(&filter.value().to_lowercase())
}

impl RateAssignmentState {
    pub fn new(agreement: Agreement, catalog: Vec<Rate>, assigned: Vec<AssignedRate>) -> Self {
        Self {
            agreement,
            catalog,
            assigned,
            available_filter: TextInput::new(),
            assigned_filter: TextInput::new(),
            focus: RatesPane::Available,
            available_selected: 0,
            assigned_selected: 0,
            modal: 0,
            loading: false,
            saving: false,
        }
    }

    /// The dialog as shown while its two lists are being fetched.
    pub fn loading(modal: u64, agreement: Agreement) -> Self {
        let mut state = Self::new(agreement, Vec::new(), Vec::new());
        state.modal = modal;
        state.loading = true;
        state
    }

    /// Either fetch failing leaves that list empty.
    pub fn apply_loaded(
        &mut self,
        assigned: Result<Vec<AssignedRate>, ApiError>,
        catalog: Result<Vec<Rate>, ApiError>,
    ) {
        let id = self.agreement.id_acuerdo;
        self.loading = false;
        self.assigned = assigned.unwrap_or_else(|err| {
            error!("Error fetching rates of agreement {}: {}", id, err);
            Vec::new()
        });
        self.catalog = catalog.unwrap_or_else(|err| {
            error!("Error fetching rate catalog: {}", err);
            Vec::new()
        });
        self.clamp_selection();
    }

    pub fn title(&self) -> String {
        let client = self
            .agreement
            .agent_name()
            .filter(|name| !name.is_empty())
            .unwrap_or("Sin Cliente");
        format!(
            "Tarifas del Acuerdo #{} - Cliente: {}",
            self.agreement.id_acuerdo, client
        )
    }

    pub fn visible_available(&self) -> Vec<&Rate> {
        self.catalog
            .iter()
            .filter(|rate| name_matches(&rate.nombre, &self.available_filter))
            .collect()
    }

    pub fn visible_assigned(&self) -> Vec<&AssignedRate> {
        self.assigned
            .iter()
            .filter(|rate| name_matches(&rate.nombre, &self.assigned_filter))
            .collect()
    }

    pub fn is_assigned(&self, rate_id: i64) -> bool {
        self.assigned.iter().any(|rate| rate.id_tarifa == rate_id)
    }

    /// Checks (appends a pending entry) or unchecks (drops every entry) a rate.
    pub fn set_checked(&mut self, rate: &Rate, checked: bool) {
        if checked {
            if !self.is_assigned(rate.id_tarifa) {
                self.assigned
                    .push(AssignedRate::pending(self.agreement.id_acuerdo, rate));
            }
        } else {
            self.remove(rate.id_tarifa);
        }
    }

    pub fn toggle(&mut self, rate: &Rate) {
        let checked = self.is_assigned(rate.id_tarifa);
        self.set_checked(rate, !checked);
    }

    pub fn toggle_selected(&mut self) {
        let selected = self
            .visible_available()
            .get(self.available_selected)
            .map(|rate| (*rate).clone());
        if let Some(rate) = selected {
            self.toggle(&rate);
            self.clamp_selection();
        }
    }

    pub fn remove(&mut self, rate_id: i64) {
        self.assigned.retain(|rate| rate.id_tarifa != rate_id);
        self.clamp_selection();
    }

    pub fn remove_selected(&mut self) {
        let selected = self
            .visible_assigned()
            .get(self.assigned_selected)
            .map(|rate| rate.id_tarifa);
        if let Some(rate_id) = selected {
            self.remove(rate_id);
        }
    }

    pub fn move_selection(&mut self, delta: isize) {
        let on_assigned = matches!(self.focus, RatesPane::Assigned | RatesPane::AssignedFilter);
        let len = if on_assigned {
            self.visible_assigned().len()
        } else {
            self.visible_available().len()
        };
        let selected = if on_assigned {
            &mut self.assigned_selected
        } else {
            &mut self.available_selected
        };
        if len == 0 {
            *selected = 0;
            return;
        }
        *selected = (*selected as isize + delta).clamp(0, len as isize - 1) as usize;
    }

    pub fn clamp_selection(&mut self) {
        let available = self.visible_available().len();
        let assigned = self.visible_assigned().len();
        self.available_selected = self.available_selected.min(available.saturating_sub(1));
        self.assigned_selected = self.assigned_selected.min(assigned.saturating_sub(1));
    }

    pub fn focused_filter_mut(&mut self) -> Option<&mut TextInput> {
        match self.focus {
            RatesPane::AvailableFilter => Some(&mut self.available_filter),
            RatesPane::AssignedFilter => Some(&mut self.assigned_filter),
            RatesPane::Available | RatesPane::Assigned => None,
        }
    }

    pub fn payload(&self) -> Vec<RateAssignment> {
        self.assigned.iter().map(AssignedRate::to_payload).collect()
    }

    /// The body replacing the server's set, or `None` while a save is in
    /// flight or the working set is below [`MIN_ASSIGNED_RATES`].
    pub fn submission(&mut self, notifier: &mut dyn Notifier) -> Option<Vec<RateAssignment>> {
        if self.saving {
            debug!("Rate save already in flight");
            return None;
        }
        if self.assigned.len() < MIN_ASSIGNED_RATES {
            notifier.notify(Notification::error(
                "Error",
                format!(
                    "Debes asignar al menos {} tarifas a este acuerdo.",
                    MIN_ASSIGNED_RATES
                ),
            ));
            return None;
        }
        self.saving = true;
        Some(self.payload())
    }

    pub fn apply_save(
        &mut self,
        result: Result<(), ApiError>,
        notifier: &mut dyn Notifier,
    ) -> ModalOutcome {
        self.saving = false;
        let id = self.agreement.id_acuerdo;
        notifier.notify(rates_saved_notification(&result));
        match result {
            Ok(()) => {
                info!("Assigned {} rates to agreement {}", self.assigned.len(), id);
                ModalOutcome::Closed { changed: true }
            }
            Err(err) => {
                error!("Error saving rates of agreement {}: {}", id, err);
                ModalOutcome::Stay
            }
        }
    }

    pub fn close(&self) -> ModalOutcome {
        ModalOutcome::Closed { changed: false }
    }
}

fn rates_saved_notification(result: &Result<(), ApiError>) -> Notification {
    match result {
        Ok(()) => Notification::success("¡Guardado!", "Las tarifas se han asignado correctamente."),
        Err(_) => Notification::error("Error", "No se pudo actualizar la asignación de tarifas."),
    }
}

// Implementation block for the rate dialog's server round-trips.
impl App {
    /// Opens the dialog and fetches the assignment and the catalog together.
    pub(crate) fn start_rates(&mut self, agreement: Agreement) {
        let modal = self.next_modal_id();
        let id = agreement.id_acuerdo;
        self.overlay = Some(Overlay::Rates(RateAssignmentState::loading(modal, agreement)));
        let api = Arc::clone(&self.api);
        self.spawn_task(async move {
            let (assigned, catalog) = tokio::join!(api.assigned_rates(id), api.rate_catalog());
            TaskResult::RatesLoaded {
                modal,
                assigned,
                catalog,
            }
        });
    }

    pub(crate) fn save_rates(&mut self, rates: &mut RateAssignmentState) {
        let Some(assignments) = rates.submission(self.notifier.as_mut()) else {
            return;
        };
        let (modal, agreement_id) = (rates.modal, rates.agreement.id_acuerdo);
        let api = Arc::clone(&self.api);
        self.spawn_task(async move {
            TaskResult::RatesSaved {
                modal,
                agreement_id,
                result: api.replace_rates(agreement_id, &assignments).await,
            }
        });
    }

    pub(crate) fn on_rates_loaded(
        &mut self,
        modal: u64,
        assigned: Result<Vec<AssignedRate>, ApiError>,
        catalog: Result<Vec<Rate>, ApiError>,
    ) {
        match self.overlay.as_mut() {
            Some(Overlay::Rates(rates)) if rates.modal == modal => {
                rates.apply_loaded(assigned, catalog)
            }
            _ => debug!("Rates for closed dialog #{} dropped", modal),
        }
    }

    pub(crate) fn on_rates_saved(
        &mut self,
        modal: u64,
        agreement_id: i64,
        result: Result<(), ApiError>,
    ) {
        if let Some(Overlay::Rates(rates)) = self.overlay.as_mut()
            && rates.modal == modal
        {
            let outcome = rates.apply_save(result, self.notifier.as_mut());
            self.finish_modal(outcome);
            return;
        }
        // The dialog was closed while the request was in flight.
        self.notifier.notify(rates_saved_notification(&result));
        match result {
            Ok(()) => self.reload_agreements(),
            Err(err) => error!("Error saving rates of agreement {}: {}", agreement_id, err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use proptest::prelude::*;

    use super::*;
    use crate::api::fake::{Call, FakeApi, Failure, agent, agreement, assigned, rate};
    use crate::app::testing::test_app;
    use crate::notify::testing::RecordingNotifier;

    fn catalog(count: i64) -> Vec<Rate> {
        (1..=count).map(|id| rate(id, &format!("Tarifa {id}"))).collect()
    }

    fn ids(state: &RateAssignmentState) -> Vec<i64> {
        state.assigned.iter().map(|rate| rate.id_tarifa).collect()
    }

    fn save_chord() -> KeyEvent {
        KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL)
    }

    #[tokio::test]
    async fn open_marks_assigned_rates_as_checked() {
        let api = FakeApi::with_agreements(
            vec![agreement(9, Some(agent(1, " Energía Sur ", "B1")))],
            1,
        );
        *api.catalog.lock().unwrap() = catalog(5);
        *api.assigned.lock().unwrap() = vec![
            assigned(9, 1, "Tarifa 1"),
            assigned(9, 2, "Tarifa 2"),
            assigned(9, 3, "Tarifa 3"),
        ];
        let api = Arc::new(api);
        let (mut app, _) = test_app(api.clone());
        app.load_page();
        app.settle().await;
        app.open_rates();
        assert!(matches!(&app.overlay, Some(Overlay::Rates(rates)) if rates.loading));
        app.settle().await;

        assert!(api.calls().contains(&Call::AssignedRates(9)));
        assert!(api.calls().contains(&Call::RateCatalog));
        let Some(Overlay::Rates(state)) = app.overlay.as_mut() else {
            panic!("rates dialog should be open");
        };
        assert!(!state.loading);
        assert_eq!(state.title(), "Tarifas del Acuerdo #9 - Cliente: Energía Sur");

        let checked: Vec<i64> = state
            .visible_available()
            .iter()
            .filter(|rate| state.is_assigned(rate.id_tarifa))
            .map(|rate| rate.id_tarifa)
            .collect();
        assert_eq!(checked, vec![1, 2, 3]);

        let second = state.catalog[1].clone();
        state.set_checked(&second, false);
        assert_eq!(ids(state), vec![1, 3]);
    }

    #[test]
    fn open_tolerates_fetch_failures() {
        let mut state = RateAssignmentState::loading(4, agreement(2, None));
        let failure = || ApiError::Status {
            status: 500,
            body: String::new(),
        };
        state.apply_loaded(Err(failure()), Err(failure()));
        assert!(!state.loading);
        assert!(state.catalog.is_empty());
        assert!(state.assigned.is_empty());
        assert_eq!(state.title(), "Tarifas del Acuerdo #2 - Cliente: Sin Cliente");
    }

    #[test]
    fn checking_appends_a_pending_entry() {
        let rates = catalog(3);
        let mut state = RateAssignmentState::new(agreement(4, None), rates.clone(), Vec::new());
        state.set_checked(&rates[2], true);
        state.set_checked(&rates[2], true);
        assert_eq!(state.assigned.len(), 1);
        let entry = &state.assigned[0];
        assert_eq!(entry.id_tarifa_acuerdo, Some(0));
        assert_eq!(entry.id_acuerdo, 4);
        assert_eq!(entry.porc_renovacion, Some(0.0));
        assert_eq!(entry.nombre, "Tarifa 3");
    }

    #[test]
    fn filters_are_case_insensitive_and_independent() {
        let rates = vec![rate(1, "Indexada Plus"), rate(2, "Fija 2.0TD"), rate(3, "INDEXADA base")];
        let mut state = RateAssignmentState::new(
            agreement(1, None),
            rates,
            vec![assigned(1, 2, "Fija 2.0TD")],
        );
        state.available_filter = TextInput::with_value("indexada");
        let names: Vec<&str> = state
            .visible_available()
            .iter()
            .map(|rate| rate.nombre.as_str())
            .collect();
        assert_eq!(names, vec!["Indexada Plus", "INDEXADA base"]);
        assert_eq!(state.visible_assigned().len(), 1);

        state.assigned_filter = TextInput::with_value("zzz");
        assert!(state.visible_assigned().is_empty());
        assert_eq!(state.assigned.len(), 1);
    }

    #[test]
    fn remove_selected_drops_the_filtered_row() {
        let mut state = RateAssignmentState::new(
            agreement(1, None),
            Vec::new(),
            vec![assigned(1, 5, "Alfa"), assigned(1, 6, "Beta"), assigned(1, 5, "Alfa")],
        );
        state.assigned_filter = TextInput::with_value("alf");
        state.focus = RatesPane::Assigned;
        state.remove_selected();
        assert_eq!(ids(&state), vec![6]);
    }

    #[test]
    fn save_below_minimum_issues_no_request() {
        let mut notes = RecordingNotifier::default();
        let rates = catalog(19);
        let mut state = RateAssignmentState::new(agreement(3, None), rates.clone(), Vec::new());
        for rate in &rates {
            state.toggle(rate);
        }

        assert!(state.submission(&mut notes).is_none());
        assert!(!state.saving);
        assert_eq!(
            notes.last().unwrap().message,
            "Debes asignar al menos 20 tarifas a este acuerdo."
        );
    }

    #[tokio::test]
    async fn save_sends_the_whole_stripped_set_once() {
        let api = Arc::new(FakeApi::default());
        let (mut app, notes) = test_app(api.clone());
        let rates = catalog(20);
        let mut state = RateAssignmentState::new(
            agreement(3, None),
            rates.clone(),
            vec![assigned(3, 1, "Tarifa 1")],
        );
        for rate in &rates[1..] {
            state.set_checked(rate, true);
        }
        app.overlay = Some(Overlay::Rates(state));

        app.handle_key(save_chord());
        app.handle_key(save_chord());
        app.settle().await;

        assert!(app.overlay.is_none());
        let writes = api.writes();
        assert_eq!(writes.len(), 1, "a second save waits for the first");
        let Call::ReplaceRates(id, body) = &writes[0] else {
            panic!("expected a rate replacement, got {writes:?}");
        };
        assert_eq!(*id, 3);
        assert_eq!(body.len(), 20);
        assert_eq!(body[0].id_tarifa_acuerdo, 101);
        assert_eq!(body[0].porc_renovacion, 2.5);
        assert!(body[1..].iter().all(|entry| entry.id_tarifa_acuerdo == 0));
        assert_eq!(notes.last().unwrap().title, "¡Guardado!");
        assert!(matches!(
            api.calls().last(),
            Some(Call::ListAgreements { .. })
        ));
    }

    #[tokio::test]
    async fn failed_save_stays_open() {
        let api = Arc::new(FakeApi::default());
        api.fail_writes(Failure::Status(500));
        let (mut app, notes) = test_app(api.clone());
        let rates = catalog(20);
        let mut state = RateAssignmentState::new(agreement(3, None), rates.clone(), Vec::new());
        rates.iter().for_each(|rate| state.toggle(rate));
        app.overlay = Some(Overlay::Rates(state));

        app.handle_key(save_chord());
        app.settle().await;

        let Some(Overlay::Rates(state)) = app.overlay.as_ref() else {
            panic!("rates dialog should stay open");
        };
        assert_eq!(state.assigned.len(), 20);
        assert!(!state.saving);
        assert_eq!(
            notes.last().unwrap().message,
            "No se pudo actualizar la asignación de tarifas."
        );
    }

    proptest! {
        #[test]
        fn toggling_twice_restores_membership(
            initial in proptest::collection::btree_set(1i64..30, 0..15),
            target in 1i64..30,
        ) {
            let rates = catalog(30);
            let start: Vec<AssignedRate> = initial
                .iter()
                .map(|id| assigned(8, *id, &format!("Tarifa {id}")))
                .collect();
            let mut state = RateAssignmentState::new(agreement(8, None), rates.clone(), start);
            let before = state.is_assigned(target);
            let rate = &rates[(target - 1) as usize];

            state.toggle(rate);
            prop_assert_ne!(state.is_assigned(target), before);
            state.toggle(rate);
            prop_assert_eq!(state.is_assigned(target), before);

            let mut after: Vec<i64> = ids(&state);
            after.sort_unstable();
            let expected: Vec<i64> = initial.iter().copied().collect();
            prop_assert_eq!(after, expected);
        }
    }
}
