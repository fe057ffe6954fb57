//! Background requests.
//!
//! Key handlers never wait on the network. Each request runs on its own
//! `tokio` task and sends a [`TaskResult`] back over an unbounded channel;
//! the event loop receives it as a `select!` branch and hands it to
//! [`App::apply_task`] between draws.

use std::future::Future;

use log::debug;

use super::App;
use crate::api::{Agent, AgreementPage, ApiError, AssignedRate, Rate};

/// What a finished background request reports.
#[derive(Debug)]
pub enum TaskResult {
    /// A list fetch; `agents` is `None` when only the page was requested.
    Page {
        generation: u64,
        agreements: Result<AgreementPage, ApiError>,
        agents: Option<Result<Vec<Agent>, ApiError>>,
    },
    Deleted {
        id: i64,
        result: Result<(), ApiError>,
    },
    FormAgents {
        modal: u64,
        result: Result<Vec<Agent>, ApiError>,
    },
    FormSaved {
        modal: u64,
        edit: bool,
        result: Result<(), ApiError>,
    },
    RatesLoaded {
        modal: u64,
        assigned: Result<Vec<AssignedRate>, ApiError>,
        catalog: Result<Vec<Rate>, ApiError>,
    },
    RatesSaved {
        modal: u64,
        agreement_id: i64,
        result: Result<(), ApiError>,
    },
}

impl App {
    /// Runs `task` in the background; its result comes back through
    /// [`App::next_task`].
    pub(crate) fn spawn_task<F>(&mut self, task: F)
    where
        F: Future<Output = TaskResult> + Send + 'static,
    {
        self.pending += 1;
        let tx = self.tasks_tx.clone();
        tokio::spawn(async move {
            // The receiver lives as long as the app.
            let _ = tx.send(task.await);
        });
    }

    /// True while at least one request is in flight.
    pub fn is_busy(&self) -> bool {
        self.pending > 0
    }

    /// Waits for the next finished request.
    pub async fn next_task(&mut self) -> Option<TaskResult> {
        self.tasks_rx.recv().await
    }

    /// Id for a newly opened modal; results carry it back.
    pub(crate) fn next_modal_id(&mut self) -> u64 {
        self.modal_seq += 1;
        self.modal_seq
    }

    pub fn apply_task(&mut self, result: TaskResult) {
        self.pending = self.pending.saturating_sub(1);
        match result {
            TaskResult::Page {
                generation,
                agreements,
                agents,
            } => self.on_page(generation, agreements, agents),
            TaskResult::Deleted { id, result } => self.on_deleted(id, result),
            TaskResult::FormAgents { modal, result } => self.on_form_agents(modal, result),
            TaskResult::FormSaved {
                modal,
                edit,
                result,
            } => self.on_form_saved(modal, edit, result),
            TaskResult::RatesLoaded {
                modal,
                assigned,
                catalog,
            } => self.on_rates_loaded(modal, assigned, catalog),
            TaskResult::RatesSaved {
                modal,
                agreement_id,
                result,
            } => self.on_rates_saved(modal, agreement_id, result),
        }
        debug!("{} request(s) still in flight", self.pending);
    }

    /// Applies results until nothing is in flight, including the follow-up
    /// requests those results start.
    #[cfg(test)]
    pub(crate) async fn settle(&mut self) {
        while self.pending > 0 {
            match self.tasks_rx.recv().await {
                Some(result) => self.apply_task(result),
                None => break,
            }
        }
    }
}
