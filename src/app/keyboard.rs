use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::list::ListFocus;
use super::{App, ConfirmAction};

impl App {
    /// The main entry point for handling keyboard events.
    ///
    /// This function acts as a router, dispatching the key event to the appropriate
    /// handler based on the application's current state. It never waits on the
    /// network; requests it starts report back through [`App::apply_task`].
    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        // Overlays capture all input.
        if self.overlay.is_some() {
            self.handle_overlay_key(key);
            return;
        }

        if self.handle_global_shortcuts(key) {
            return;
        }

        match self.list.focus {
            ListFocus::NifFilter => self.handle_nif_filter_key(key),
            ListFocus::Table => self.handle_table_key(key),
        }
    }

    /// Returns `true` if a shortcut was handled, `false` otherwise.
    fn handle_global_shortcuts(&mut self, key: KeyEvent) -> bool {
        match (key.code, key.modifiers) {
            // Ctrl+Q: Close
            (KeyCode::Char('q'), m) if m.contains(KeyModifiers::CONTROL) => {
                self.open_confirm(ConfirmAction::CloseApplication);
            }
            _ => return false,
        }
        true
    }

    /// Typing into the NIF filter; Enter or Esc hand focus back to the table.
    fn handle_nif_filter_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter | KeyCode::Esc | KeyCode::Tab => self.list.focus = ListFocus::Table,
            _ => {
                self.list.nif_filter.handle_key(key);
                self.list.clamp_selection();
            }
        }
    }

    fn handle_table_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return;
        }
        match key.code {
            KeyCode::Char('q') => self.open_confirm(ConfirmAction::CloseApplication),
            KeyCode::Up => self.list.move_selection(-1),
            KeyCode::Down => self.list.move_selection(1),
            KeyCode::Home => self.list.selected = 0,
            KeyCode::End => self.list.select_last(),
            KeyCode::PageUp | KeyCode::Left => self.previous_page(),
            KeyCode::PageDown | KeyCode::Right => self.next_page(),
            KeyCode::Char('n') => self.open_create_form(),
            KeyCode::Char('e') | KeyCode::Enter => self.open_edit_form(),
            KeyCode::Char('d') | KeyCode::Delete => self.request_delete(),
            KeyCode::Char('t') => self.open_rates(),
            KeyCode::Char('a') => self.list.cycle_agent_filter(1),
            KeyCode::Char('A') => self.list.cycle_agent_filter(-1),
            KeyCode::Char('/') | KeyCode::Tab => self.list.focus = ListFocus::NifFilter,
            KeyCode::Char('r') => self.load_page(),
            KeyCode::Esc => {
                self.list.agent_filter = None;
                self.list.nif_filter.clear();
                self.list.clamp_selection();
            }
            _ => {}
        }
    }
}
