use std::time::Instant;

use super::App;

// Implementation block for tick-related logic in the App.
impl App {
    /// Called on every tick of the event loop; ages out notifications.
    pub(crate) fn on_tick(&mut self) {
        self.notifier.expire(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::api::fake::FakeApi;
    use crate::app::App;
    use crate::notify::{Notification, ToastNotifier};

    #[test]
    fn tick_expires_shown_notifications() {
        let mut app = App::new(
            Arc::new(FakeApi::default()),
            Box::new(ToastNotifier::new(Duration::ZERO)),
            10,
        );
        app.notifier.notify(Notification::success("¡Guardado!", "ok"));
        assert!(app.notifier().current().is_some());
        app.on_tick();
        assert!(app.notifier().current().is_none());
    }
}
