use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::debug;

use super::form::{AgreementFormState, FormField};
use super::rates::{RateAssignmentState, RatesPane};
use super::{App, ConfirmAction, ConfirmState, Overlay};

fn is_save_chord(key: &KeyEvent) -> bool {
    matches!(key.code, KeyCode::Char('s') | KeyCode::Char('S'))
        && key.modifiers.contains(KeyModifiers::CONTROL)
}

// Implementation block for overlay-related logic in the App.
impl App {
    /// Shows a yes/no question in front of `action`.
    pub(crate) fn open_confirm(&mut self, action: ConfirmAction) {
        debug!("Asking for confirmation: {:?}", action);
        self.overlay = Some(Overlay::Confirm(ConfirmState::new(action)));
    }

    pub(crate) fn close_overlay(&mut self) {
        self.overlay = None;
    }

    /// Runs or drops the pending confirmation.
    pub(crate) fn resolve_confirm(&mut self, accepted: bool) {
        let Some(Overlay::Confirm(state)) = self.overlay.take() else {
            return;
        };
        if !accepted {
            debug!("Declined: {:?}", state.action);
            return;
        }
        match state.action {
            ConfirmAction::DeleteAgreement(id) => self.delete_agreement(id),
            ConfirmAction::CloseApplication => self.should_quit = true,
        }
    }

    /// Handles key events when any overlay is active.
    /// Each handler takes the overlay out and puts it back if it stays open.
    pub(crate) fn handle_overlay_key(&mut self, key: KeyEvent) {
        if let Some(overlay) = self.overlay.take() {
            match overlay {
                Overlay::Confirm(state) => self.handle_confirm_key(key, state),
                Overlay::AgreementForm(form) => self.handle_form_key(key, form),
                Overlay::Rates(rates) => self.handle_rates_key(key, rates),
            }
        }
    }

    fn handle_confirm_key(&mut self, key: KeyEvent, mut state: ConfirmState) {
        let decision = match key.code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => Some(false),
            KeyCode::Char('s') | KeyCode::Char('S') | KeyCode::Char('y') | KeyCode::Char('Y') => {
                Some(true)
            }
            KeyCode::Enter => Some(state.confirm_selected()),
            KeyCode::Left | KeyCode::Up => {
                state.selected_index = 0;
                None
            }
            KeyCode::Right | KeyCode::Down => {
                state.selected_index = 1;
                None
            }
            KeyCode::Tab | KeyCode::BackTab => {
                state.toggle_selection();
                None
            }
            _ => None,
        };

        self.overlay = Some(Overlay::Confirm(state));
        if let Some(accepted) = decision {
            self.resolve_confirm(accepted);
        }
    }

    fn handle_form_key(&mut self, key: KeyEvent, mut form: AgreementFormState) {
        if is_save_chord(&key) {
            self.submit_form(&mut form);
            self.overlay = Some(Overlay::AgreementForm(form));
            return;
        }

        match key.code {
            KeyCode::Esc => {
                let outcome = form.cancel();
                self.finish_modal(outcome);
                return;
            }
            KeyCode::Tab | KeyCode::Down => form.focus_next(),
            KeyCode::BackTab | KeyCode::Up => form.focus_previous(),
            KeyCode::Enter => {
                if form.focus == FormField::CodFormaPago {
                    self.submit_form(&mut form);
                } else {
                    form.focus_next();
                }
            }
            _ => match form.focus {
                FormField::Agent => match key.code {
                    KeyCode::Left => form.cycle_agent(-1),
                    KeyCode::Right | KeyCode::Char(' ') => form.cycle_agent(1),
                    _ => {}
                },
                FormField::Prorroga => {
                    if matches!(key.code, KeyCode::Char(' ') | KeyCode::Left | KeyCode::Right) {
                        form.toggle_prorroga();
                    }
                }
                field => {
                    if let Some(input) = form.input_mut(field) {
                        input.handle_key(key);
                    }
                }
            },
        }
        self.overlay = Some(Overlay::AgreementForm(form));
    }

    fn handle_rates_key(&mut self, key: KeyEvent, mut rates: RateAssignmentState) {
        if is_save_chord(&key) {
            self.save_rates(&mut rates);
            self.overlay = Some(Overlay::Rates(rates));
            return;
        }

        match key.code {
            KeyCode::Esc => {
                let outcome = rates.close();
                self.finish_modal(outcome);
                return;
            }
            KeyCode::Tab => rates.focus = rates.focus.next(),
            KeyCode::BackTab => rates.focus = rates.focus.previous(),
            KeyCode::Up => rates.move_selection(-1),
            KeyCode::Down => rates.move_selection(1),
            KeyCode::PageUp => rates.move_selection(-10),
            KeyCode::PageDown => rates.move_selection(10),
            _ if rates.focus.is_filter() => {
                if let Some(filter) = rates.focused_filter_mut() {
                    filter.handle_key(key);
                }
                rates.clamp_selection();
            }
            KeyCode::Char(' ') | KeyCode::Enter if rates.focus == RatesPane::Available => {
                rates.toggle_selected();
            }
            KeyCode::Char('x') | KeyCode::Delete | KeyCode::Enter
                if rates.focus == RatesPane::Assigned =>
            {
                rates.remove_selected();
            }
            _ => {}
        }
        self.overlay = Some(Overlay::Rates(rates));
    }
}
