//! Agreement list view: the fetched page, its client-side filters and the
//! actions dispatched from a selected row.

use std::sync::Arc;

use log::{debug, error, info, warn};

use super::input::TextInput;
use super::{App, ConfirmAction, ModalOutcome, TaskResult};
use crate::api::{Agent, Agreement, AgreementPage, ApiError, display_date};
use crate::notify::Notification;

/// Which part of the list view receives typed keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFocus {
    Table,
    NifFilter,
}

/// View-model of the agreement table.
///
/// Filters only ever look at the page that was fetched last; they never
/// query the server.
#[derive(Debug, Clone)]
pub struct AgreementList {
    pub agreements: Vec<Agreement>,
    pub agents: Vec<Agent>,
    /// 1-based page number.
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    /// `None` shows every agent.
    pub agent_filter: Option<i64>,
    pub nif_filter: TextInput,
    pub focus: ListFocus,
    /// Index into the filtered rows.
    pub selected: usize,
    /// A fetch of this page is in flight.
    pub loading: bool,
}

/// One rendered table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgreementRow {
    pub id: i64,
    pub agent: String,
    pub nif: String,
    pub start_date: String,
    pub scope: String,
    pub duration: String,
}

impl AgreementRow {
    fn from_agreement(agreement: &Agreement) -> Self {
        let scope = agreement
            .ambito
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("-");
        let duration = match agreement.duracion_meses {
            Some(months) if months != 0 => months.to_string(),
            _ => String::from("-"),
        };
        Self {
            id: agreement.id_acuerdo,
            agent: agreement.agent_name().unwrap_or("Sin Agente").to_string(),
            nif: agreement.agent_nif().to_string(),
            start_date: display_date(agreement.fecha_alta.as_deref()),
            scope: scope.to_string(),
            duration,
        }
    }
}

impl AgreementList {
    pub fn new(page_size: u32) -> Self {
        Self {
            agreements: Vec::new(),
            agents: Vec::new(),
            page: 1,
            page_size,
            total_pages: 1,
            agent_filter: None,
            nif_filter: TextInput::new(),
            focus: ListFocus::Table,
            selected: 0,
            loading: false,
        }
    }

    fn matches(&self, agreement: &Agreement) -> bool {
        if let Some(agent_id) = self.agent_filter
            && agreement.agent_id() != Some(agent_id)
        {
            return false;
        }
        let needle = self.nif_filter.value().trim().to_lowercase();
        if !needle.is_empty() && !agreement.agent_nif().to_lowercase().contains(&needle) {
            return false;
        }
        true
    }

    /// Agreements of the current page that pass both filters.
    pub fn visible(&self) -> Vec<&Agreement> {
        self.agreements
            .iter()
            .filter(|agreement| self.matches(agreement))
            .collect()
    }

    pub fn rows(&self) -> Vec<AgreementRow> {
        self.visible()
            .into_iter()
            .map(AgreementRow::from_agreement)
            .collect()
    }

    pub fn selected_agreement(&self) -> Option<&Agreement> {
        self.visible().get(self.selected).copied()
    }

    pub fn move_selection(&mut self, delta: isize) {
        let len = self.visible().len();
        if len == 0 {
            self.selected = 0;
            return;
        }
        let next = (self.selected as isize + delta).clamp(0, len as isize - 1);
        self.selected = next as usize;
    }

    pub fn select_last(&mut self) {
        self.selected = self.visible().len().saturating_sub(1);
    }

    pub fn clamp_selection(&mut self) {
        let len = self.visible().len();
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
    }

    /// Steps the agent filter through `Todos` and every agent of the roster.
    pub fn cycle_agent_filter(&mut self, delta: isize) {
        let options = self.agents.len() as isize + 1;
        let current = match self.agent_filter {
            None => 0,
            Some(id) => self
                .agents
                .iter()
                .position(|agent| agent.id_agente == id)
                .map(|idx| idx as isize + 1)
                .unwrap_or(0),
        };
        let next = (current + delta).rem_euclid(options);
        self.agent_filter = if next == 0 {
            None
        } else {
            self.agents.get(next as usize - 1).map(|agent| agent.id_agente)
        };
        self.clamp_selection();
    }

    pub fn agent_filter_label(&self) -> String {
        match self.agent_filter {
            None => String::from("Todos los agentes"),
            Some(id) => self
                .agents
                .iter()
                .find(|agent| agent.id_agente == id)
                .map(Agent::label)
                .unwrap_or_else(|| format!("Agente #{}", id)),
        }
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

// Implementation block for the list view's server round-trips.
impl App {
    /// Fetches the current page and the agent roster.
    pub fn load_page(&mut self) {
        self.fetch_page(true);
    }

    /// Re-fetches the current page only; the roster is left as is.
    pub fn reload_agreements(&mut self) {
        self.fetch_page(false);
    }

    fn fetch_page(&mut self, with_agents: bool) {
        self.list_generation += 1;
        self.list.loading = true;
        let generation = self.list_generation;
        let (page, page_size) = (self.list.page, self.list.page_size);
        debug!("Loading agreements page {} (size {})", page, page_size);
        let api = Arc::clone(&self.api);
        self.spawn_task(async move {
            if with_agents {
                let (agreements, agents) =
                    tokio::join!(api.list_agreements(page, page_size), api.list_agents());
                TaskResult::Page {
                    generation,
                    agreements,
                    agents: Some(agents),
                }
            } else {
                TaskResult::Page {
                    generation,
                    agreements: api.list_agreements(page, page_size).await,
                    agents: None,
                }
            }
        });
    }

    pub(crate) fn on_page(
        &mut self,
        generation: u64,
        agreements: Result<AgreementPage, ApiError>,
        agents: Option<Result<Vec<Agent>, ApiError>>,
    ) {
        if generation != self.list_generation {
            debug!("Dropping stale page response #{}", generation);
            return;
        }
        self.list.loading = false;
        match agreements {
            Ok(result) => {
                self.list.total_pages = result.page_count();
                self.list.agreements = result.data;
            }
            Err(err) => {
                error!("Error fetching agreements: {}", err);
                self.list.agreements.clear();
            }
        }
        match agents {
            Some(Ok(agents)) => self.list.agents = agents,
            Some(Err(err)) => {
                error!("Error fetching agents: {}", err);
                self.list.agents.clear();
            }
            None => {}
        }
        self.list.clamp_selection();
    }

    pub fn next_page(&mut self) {
        if !self.list.has_next() {
            return;
        }
        self.list.page += 1;
        self.list.selected = 0;
        self.load_page();
    }

    pub fn previous_page(&mut self) {
        if !self.list.has_previous() {
            return;
        }
        self.list.page -= 1;
        self.list.selected = 0;
        self.load_page();
    }

    /// Asks for confirmation before deleting the selected agreement.
    pub fn request_delete(&mut self) {
        if let Some(id) = self.list.selected_agreement().map(|a| a.id_acuerdo) {
            self.open_confirm(ConfirmAction::DeleteAgreement(id));
        }
    }

    pub(crate) fn delete_agreement(&mut self, id: i64) {
        let api = Arc::clone(&self.api);
        self.spawn_task(async move {
            TaskResult::Deleted {
                id,
                result: api.delete_agreement(id).await,
            }
        });
    }

    pub(crate) fn on_deleted(&mut self, id: i64, result: Result<(), ApiError>) {
        match result {
            Ok(()) => {
                info!("Deleted agreement {}", id);
                self.notifier.notify(Notification::success(
                    "¡Eliminado!",
                    "El acuerdo ha sido eliminado.",
                ));
                self.reload_agreements();
            }
            Err(err) => {
                warn!("Error deleting agreement {}: {}", id, err);
                self.notifier
                    .notify(Notification::error("Error", "No se pudo eliminar el acuerdo."));
            }
        }
    }

    pub fn open_create_form(&mut self) {
        self.start_form(None);
    }

    pub fn open_edit_form(&mut self) {
        if let Some(agreement) = self.list.selected_agreement().cloned() {
            self.start_form(Some(agreement));
        }
    }

    pub fn open_rates(&mut self) {
        if let Some(agreement) = self.list.selected_agreement().cloned() {
            self.start_rates(agreement);
        }
    }

    /// Applies what a modal reported; a change refetches the page.
    pub fn finish_modal(&mut self, outcome: ModalOutcome) {
        if let ModalOutcome::Closed { changed } = outcome {
            self.close_overlay();
            if changed {
                self.reload_agreements();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::api::fake::{Call, FakeApi, Failure, agent, agreement};
    use crate::app::{ConfirmState, Overlay};
    use crate::app::testing::test_app;

    fn roster() -> Vec<Agent> {
        vec![
            agent(1, "Energía Sur", "B11111111"),
            agent(2, "Luz Norte ", " b22222222"),
            agent(3, "Gas Centro", "C33333333"),
        ]
    }

    fn page_api() -> Arc<FakeApi> {
        let agents = roster();
        let api = FakeApi::with_agreements(
            vec![
                agreement(10, Some(agents[0].clone())),
                agreement(11, Some(agents[1].clone())),
                agreement(12, Some(agents[0].clone())),
                agreement(13, None),
            ],
            3,
        );
        *api.agents.lock().unwrap() = agents;
        Arc::new(api)
    }

    #[tokio::test]
    async fn load_page_fetches_agreements_and_agents() {
        let api = page_api();
        let (mut app, _) = test_app(api.clone());
        app.load_page();
        app.settle().await;

        assert_eq!(app.list.agreements.len(), 4);
        assert_eq!(app.list.agents.len(), 3);
        assert_eq!(app.list.total_pages, 3);
        let calls = api.calls();
        assert!(calls.contains(&Call::ListAgreements {
            page: 1,
            page_size: 10
        }));
        assert!(calls.contains(&Call::ListAgents));
    }

    #[tokio::test]
    async fn rows_are_the_filtered_subset_of_the_page() {
        let (mut app, _) = test_app(page_api());
        app.load_page();
        app.settle().await;
        assert_eq!(app.list.rows().len(), 4);

        app.list.agent_filter = Some(1);
        let ids: Vec<i64> = app.list.rows().iter().map(|row| row.id).collect();
        assert_eq!(ids, vec![10, 12]);

        app.list.agent_filter = None;
        app.list.nif_filter = TextInput::with_value(" B2222 ");
        let ids: Vec<i64> = app.list.rows().iter().map(|row| row.id).collect();
        assert_eq!(ids, vec![11], "NIF filter is trimmed and case-insensitive");

        app.list.agent_filter = Some(3);
        assert!(app.list.rows().is_empty());
        assert!(app.list.rows().len() <= app.list.agreements.len());
    }

    #[tokio::test]
    async fn rows_format_missing_values() {
        let (mut app, _) = test_app(page_api());
        app.load_page();
        app.settle().await;
        let mut missing = agreement(13, None);
        missing.fecha_alta = None;
        missing.ambito = Some("  ".into());
        missing.duracion_meses = Some(0);
        app.list.agreements = vec![missing];

        let row = &app.list.rows()[0];
        assert_eq!(row.agent, "Sin Agente");
        assert_eq!(row.nif, "");
        assert_eq!(row.start_date, "-");
        assert_eq!(row.scope, "-");
        assert_eq!(row.duration, "-");
    }

    #[tokio::test]
    async fn cycling_the_agent_filter_wraps_through_todos() {
        let (mut app, _) = test_app(page_api());
        app.load_page();
        app.settle().await;
        app.list.cycle_agent_filter(1);
        assert_eq!(app.list.agent_filter, Some(1));
        assert_eq!(app.list.agent_filter_label(), "Energía Sur (B11111111)");
        app.list.cycle_agent_filter(-1);
        assert_eq!(app.list.agent_filter, None);
        app.list.cycle_agent_filter(-1);
        assert_eq!(app.list.agent_filter, Some(3));
    }

    #[tokio::test]
    async fn pagination_stops_at_bounds() {
        let api = page_api();
        let (mut app, _) = test_app(api.clone());
        app.load_page();
        app.settle().await;
        api.clear_calls();

        app.previous_page();
        assert_eq!(app.list.page, 1);
        assert!(!app.is_busy(), "no fetch before the first page");

        app.next_page();
        app.next_page();
        assert_eq!(app.list.page, 3);
        app.next_page();
        assert_eq!(app.list.page, 3);
        app.settle().await;
        assert!(api.calls().contains(&Call::ListAgreements {
            page: 3,
            page_size: 10
        }));
        assert!(!api.calls().iter().any(|call| matches!(
            call,
            Call::ListAgreements { page: 4, .. }
        )));
    }

    #[tokio::test]
    async fn failed_fetch_empties_the_table() {
        let api = page_api();
        let (mut app, _) = test_app(api.clone());
        app.load_page();
        app.settle().await;
        api.fail_reads(Failure::Status(503));
        app.load_page();
        app.settle().await;
        assert!(app.list.agreements.is_empty());
        assert!(app.list.agents.is_empty());
        assert_eq!(app.list.total_pages, 3);
    }

    #[tokio::test]
    async fn delete_waits_for_confirmation() {
        let api = page_api();
        let (mut app, _) = test_app(api.clone());
        app.load_page();
        app.settle().await;
        app.list.selected = 1;

        app.request_delete();
        assert!(matches!(
            app.overlay,
            Some(Overlay::Confirm(ConfirmState {
                action: ConfirmAction::DeleteAgreement(11),
                ..
            }))
        ));
        app.resolve_confirm(false);
        assert!(app.overlay.is_none());
        assert!(!app.is_busy());
        assert!(api.writes().is_empty());

        app.request_delete();
        api.clear_calls();
        app.resolve_confirm(true);
        app.settle().await;
        assert_eq!(api.writes(), vec![Call::Delete(11)]);
        assert!(
            api.calls().contains(&Call::ListAgreements {
                page: 1,
                page_size: 10
            }),
            "successful delete refetches the page"
        );
    }

    #[tokio::test]
    async fn failed_delete_notifies_without_refetch() {
        let api = page_api();
        let (mut app, notes) = test_app(api.clone());
        app.load_page();
        app.settle().await;
        api.fail_writes(Failure::Status(500));
        app.request_delete();
        api.clear_calls();
        app.resolve_confirm(true);
        app.settle().await;

        assert_eq!(api.calls(), vec![Call::Delete(10)]);
        let last = notes.last().unwrap();
        assert_eq!(last.message, "No se pudo eliminar el acuerdo.");
    }

    #[tokio::test]
    async fn modal_outcome_controls_refetch() {
        let api = page_api();
        let (mut app, _) = test_app(api.clone());
        app.load_page();
        app.settle().await;

        app.open_edit_form();
        app.settle().await;
        api.clear_calls();
        app.finish_modal(ModalOutcome::Closed { changed: false });
        assert!(app.overlay.is_none());
        assert!(!app.is_busy());

        app.open_rates();
        app.settle().await;
        api.clear_calls();
        app.finish_modal(ModalOutcome::Stay);
        assert!(matches!(app.overlay, Some(Overlay::Rates(_))));
        app.finish_modal(ModalOutcome::Closed { changed: true });
        app.settle().await;
        assert_eq!(
            api.calls(),
            vec![Call::ListAgreements {
                page: 1,
                page_size: 10
            }]
        );
    }
}
