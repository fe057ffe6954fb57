use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::sync::mpsc;

use super::App;
use super::list::AgreementList;
use crate::api::AcuerdosApi;
use crate::notify::Notifier;

impl App {
    /// Creates the application state around an API client and a notifier.
    ///
    /// Nothing is fetched here; the shell calls [`App::load_page`] once the
    /// terminal is ready, and must run inside a tokio runtime from then on.
    pub fn new(api: Arc<dyn AcuerdosApi>, notifier: Box<dyn Notifier>, page_size: u32) -> Self {
        debug!("Initializing App with page size {}", page_size);
        let (tasks_tx, tasks_rx) = mpsc::unbounded_channel();
        Self {
            should_quit: false,
            list: AgreementList::new(page_size),
            overlay: None,
            api,
            notifier,
            tasks_tx,
            tasks_rx,
            pending: 0,
            list_generation: 0,
            modal_seq: 0,
            tick_rate: Duration::from_millis(250), // Set a default tick rate.
        }
    }

    pub fn tick_rate(&self) -> Duration {
        self.tick_rate
    }
}
