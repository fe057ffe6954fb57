//! Create/edit dialog for a single agreement.

use std::sync::Arc;

use log::{debug, error, info, warn};
use serde_json::{Map, Value};

use super::input::TextInput;
use super::{App, ModalOutcome, Overlay, TaskResult};
use crate::api::{Agent, Agreement, ApiError, FieldErrors, calendar_date, parse_calendar_date};
use crate::notify::{Notification, Notifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    Agent,
    FechaAlta,
    FechaBaja,
    Ambito,
    DuracionMeses,
    Prorroga,
    Exclusividad,
    CodFormaPago,
}

impl FormField {
    pub const ALL: [FormField; 8] = [
        FormField::Agent,
        FormField::FechaAlta,
        FormField::FechaBaja,
        FormField::Ambito,
        FormField::DuracionMeses,
        FormField::Prorroga,
        FormField::Exclusividad,
        FormField::CodFormaPago,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FormField::Agent => "Agente Comercial",
            FormField::FechaAlta => "Fecha Alta",
            FormField::FechaBaja => "Fecha Baja",
            FormField::Ambito => "Ámbito",
            FormField::DuracionMeses => "Duración Meses",
            FormField::Prorroga => "Prórroga Automática",
            FormField::Exclusividad => "Exclusividad",
            FormField::CodFormaPago => "Código Forma de Pago",
        }
    }

    /// Key of the field in the request body.
    pub fn key(self) -> &'static str {
        match self {
            FormField::Agent => "idAgente",
            FormField::FechaAlta => "fechaAlta",
            FormField::FechaBaja => "fechaBaja",
            FormField::Ambito => "ambito",
            FormField::DuracionMeses => "duracionMeses",
            FormField::Prorroga => "prorrogaAutomatica",
            FormField::Exclusividad => "exclusividad",
            FormField::CodFormaPago => "codFormaPago",
        }
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|field| *field == self).unwrap_or(0)
    }

    fn offset(self, delta: isize) -> FormField {
        let len = Self::ALL.len() as isize;
        let next = (self.index() as isize + delta).rem_euclid(len);
        Self::ALL[next as usize]
    }
}

#[derive(Debug, Clone)]
pub struct AgreementFormState {
    /// The record being edited; `None` when creating.
    pub original: Option<Agreement>,
    pub agents: Vec<Agent>,
    pub agent_id: Option<i64>,
    pub fecha_alta: TextInput,
    pub fecha_baja: TextInput,
    pub ambito: TextInput,
    pub duracion_meses: TextInput,
    pub prorroga: bool,
    pub exclusividad: TextInput,
    pub cod_forma_pago: TextInput,
    pub focus: FormField,
    /// Client and server messages, keyed by request field.
    pub errors: FieldErrors,
    /// Id matching background results to this dialog.
    pub modal: u64,
    pub loading_agents: bool,
    /// A create/update is in flight.
    pub saving: bool,
}

/// A validated request, ready to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    /// `None` creates a new agreement.
    pub agreement_id: Option<i64>,
    pub payload: Value,
}

fn non_empty(value: Option<&str>) -> &str {
    value.unwrap_or("")
}

impl AgreementFormState {
    /// Builds the form without touching the network.
    pub fn new(existing: Option<Agreement>, agents: Vec<Agent>) -> Self {
        let mut form = Self {
            original: None,
            agents,
            agent_id: None,
            fecha_alta: TextInput::new(),
            fecha_baja: TextInput::new(),
            ambito: TextInput::new(),
            duracion_meses: TextInput::new(),
            prorroga: false,
            exclusividad: TextInput::with_value("0"),
            cod_forma_pago: TextInput::new(),
            focus: FormField::Agent,
            errors: FieldErrors::new(),
            modal: 0,
            loading_agents: false,
            saving: false,
        };
        if let Some(agreement) = existing {
            form.agent_id = agreement.id_agente.filter(|id| *id != 0);
            form.fecha_alta =
                TextInput::with_value(calendar_date(non_empty(agreement.fecha_alta.as_deref())));
            form.fecha_baja =
                TextInput::with_value(calendar_date(non_empty(agreement.fecha_baja.as_deref())));
            form.ambito = TextInput::with_value(non_empty(agreement.ambito.as_deref()));
            form.duracion_meses = TextInput::with_value(
                agreement
                    .duracion_meses
                    .filter(|months| *months != 0)
                    .map(|months| months.to_string())
                    .unwrap_or_default(),
            );
            form.prorroga = agreement.prorroga_automatica.unwrap_or(false);
            form.exclusividad =
                TextInput::with_value(agreement.exclusividad.unwrap_or(0).to_string());
            form.cod_forma_pago =
                TextInput::with_value(non_empty(agreement.cod_forma_pago.as_deref()));
            form.original = Some(agreement);
        }
        form
    }

    /// The form as shown while its agent roster is being fetched.
    pub fn loading(modal: u64, existing: Option<Agreement>) -> Self {
        let mut form = Self::new(existing, Vec::new());
        form.modal = modal;
        form.loading_agents = true;
        form
    }

    /// A failed roster fetch leaves the selector with "no agent" only.
    pub fn set_agents(&mut self, result: Result<Vec<Agent>, ApiError>) {
        self.loading_agents = false;
        self.agents = result.unwrap_or_else(|err| {
            error!("Error fetching agents: {}", err);
            Vec::new()
        });
    }

    pub fn is_edit(&self) -> bool {
        self.original.is_some()
    }

    pub fn title(&self) -> &'static str {
        if self.is_edit() {
            "Editar Acuerdo"
        } else {
            "Crear Acuerdo"
        }
    }

    pub fn focus_next(&mut self) {
        self.focus = self.focus.offset(1);
    }

    pub fn focus_previous(&mut self) {
        self.focus = self.focus.offset(-1);
    }

    /// Text input behind `field`; the agent selector and the checkbox have none.
    pub fn input(&self, field: FormField) -> Option<&TextInput> {
        match field {
            FormField::FechaAlta => Some(&self.fecha_alta),
            FormField::FechaBaja => Some(&self.fecha_baja),
            FormField::Ambito => Some(&self.ambito),
            FormField::DuracionMeses => Some(&self.duracion_meses),
            FormField::Exclusividad => Some(&self.exclusividad),
            FormField::CodFormaPago => Some(&self.cod_forma_pago),
            FormField::Agent | FormField::Prorroga => None,
        }
    }

    pub fn input_mut(&mut self, field: FormField) -> Option<&mut TextInput> {
        match field {
            FormField::FechaAlta => Some(&mut self.fecha_alta),
            FormField::FechaBaja => Some(&mut self.fecha_baja),
            FormField::Ambito => Some(&mut self.ambito),
            FormField::DuracionMeses => Some(&mut self.duracion_meses),
            FormField::Exclusividad => Some(&mut self.exclusividad),
            FormField::CodFormaPago => Some(&mut self.cod_forma_pago),
            FormField::Agent | FormField::Prorroga => None,
        }
    }

    /// Steps the agent selector; position 0 is "no agent".
    pub fn cycle_agent(&mut self, delta: isize) {
        let options = self.agents.len() as isize + 1;
        let current = self
            .agent_id
            .and_then(|id| self.agents.iter().position(|agent| agent.id_agente == id))
            .map(|idx| idx as isize + 1)
            .unwrap_or(0);
        let next = (current + delta).rem_euclid(options);
        self.agent_id = if next == 0 {
            None
        } else {
            self.agents.get(next as usize - 1).map(|agent| agent.id_agente)
        };
    }

    pub fn agent_label(&self) -> String {
        match self.agent_id {
            None if self.loading_agents => String::from("Cargando agentes..."),
            None => String::from("-- Seleccione un agente --"),
            Some(id) => self
                .agents
                .iter()
                .find(|agent| agent.id_agente == id)
                .map(Agent::label)
                .unwrap_or_else(|| format!("Agente #{}", id)),
        }
    }

    pub fn toggle_prorroga(&mut self) {
        self.prorroga = !self.prorroga;
    }

    /// Client-side format checks. Blank fields always pass.
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        for field in [FormField::FechaAlta, FormField::FechaBaja] {
            let value = self.input(field).map(TextInput::value).unwrap_or("").trim();
            if !value.is_empty() && parse_calendar_date(value).is_none() {
                errors.insert(
                    field.key().to_string(),
                    vec![String::from("Formato de fecha inválido (AAAA-MM-DD)")],
                );
            }
        }
        for field in [FormField::DuracionMeses, FormField::Exclusividad] {
            let value = self.input(field).map(TextInput::value).unwrap_or("").trim();
            if !value.is_empty() && value.parse::<i64>().is_err() {
                errors.insert(
                    field.key().to_string(),
                    vec![String::from("Debe ser un número entero")],
                );
            }
        }
        errors
    }

    fn date_value(input: &TextInput) -> Value {
        match input.value().trim() {
            "" => Value::Null,
            date => Value::from(date),
        }
    }

    fn integer_value(input: &TextInput) -> Value {
        input
            .value()
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or(Value::Null)
    }

    /// Request body: the form fields, merged over the original on edit.
    pub fn payload(&self) -> Result<Value, FieldErrors> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(errors);
        }

        let mut body = match self.original.as_ref().map(serde_json::to_value) {
            Some(Ok(Value::Object(map))) => map,
            Some(Err(err)) => {
                warn!("Could not serialize the original agreement: {}", err);
                Map::new()
            }
            _ => Map::new(),
        };
        body.insert(
            FormField::Agent.key().into(),
            self.agent_id.map(Value::from).unwrap_or(Value::Null),
        );
        body.insert(
            FormField::FechaAlta.key().into(),
            Self::date_value(&self.fecha_alta),
        );
        body.insert(
            FormField::FechaBaja.key().into(),
            Self::date_value(&self.fecha_baja),
        );
        body.insert(
            FormField::Ambito.key().into(),
            Value::from(self.ambito.value()),
        );
        body.insert(
            FormField::DuracionMeses.key().into(),
            Self::integer_value(&self.duracion_meses),
        );
        body.insert(FormField::Prorroga.key().into(), Value::from(self.prorroga));
        body.insert(
            FormField::Exclusividad.key().into(),
            Self::integer_value(&self.exclusividad),
        );
        body.insert(
            FormField::CodFormaPago.key().into(),
            Value::from(self.cod_forma_pago.value()),
        );
        Ok(Value::Object(body))
    }

    /// Validates the form and marks it as saving. `None` when there is
    /// nothing to send: a save is already in flight or a field is malformed.
    pub fn submission(&mut self, notifier: &mut dyn Notifier) -> Option<Submission> {
        if self.saving {
            debug!("Save already in flight");
            return None;
        }
        match self.payload() {
            Ok(payload) => {
                self.saving = true;
                Some(Submission {
                    agreement_id: self.original.as_ref().map(|a| a.id_acuerdo),
                    payload,
                })
            }
            Err(errors) => {
                self.errors = errors;
                notifier.notify(Notification::warning(
                    "Error de validación",
                    self.error_lines().join("\n"),
                ));
                None
            }
        }
    }

    /// Applies the server's answer. Failures keep the dialog open with the
    /// edits intact.
    pub fn apply_save(
        &mut self,
        result: Result<(), ApiError>,
        notifier: &mut dyn Notifier,
    ) -> ModalOutcome {
        self.saving = false;
        notifier.notify(save_notification(self.is_edit(), &result));
        match result {
            Ok(()) => {
                info!("{} agreement saved", if self.is_edit() { "Edited" } else { "New" });
                self.errors.clear();
                ModalOutcome::Closed { changed: true }
            }
            Err(ApiError::Validation(errors)) => {
                self.errors = errors;
                ModalOutcome::Stay
            }
            Err(err) => {
                error!("Error saving agreement: {}", err);
                self.errors.clear();
                ModalOutcome::Stay
            }
        }
    }

    pub fn cancel(&self) -> ModalOutcome {
        ModalOutcome::Closed { changed: false }
    }

    /// `field: msg1, msg2`, one line per field with errors.
    pub fn error_lines(&self) -> Vec<String> {
        self.errors
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
            .collect()
    }

    /// Messages for one field. Server keys may differ in case.
    pub fn field_errors(&self, field: FormField) -> Option<&Vec<String>> {
        self.errors
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(field.key()))
            .map(|(_, messages)| messages)
    }
}

fn save_notification(edit: bool, result: &Result<(), ApiError>) -> Notification {
    match result {
        Ok(()) if edit => Notification::success(
            "¡Actualizado!",
            "El acuerdo se ha actualizado correctamente.",
        ),
        Ok(()) => Notification::success("¡Creado!", "El acuerdo se ha creado correctamente."),
        Err(err) => match err.validation_lines() {
            Some(lines) => Notification::error("Error de validación", lines.join("\n")),
            None => Notification::error("Error", "No se pudo guardar el acuerdo."),
        },
    }
}

// Implementation block for the form's server round-trips.
impl App {
    pub(crate) fn start_form(&mut self, existing: Option<Agreement>) {
        let modal = self.next_modal_id();
        self.overlay = Some(Overlay::AgreementForm(AgreementFormState::loading(
            modal, existing,
        )));
        let api = Arc::clone(&self.api);
        self.spawn_task(async move {
            TaskResult::FormAgents {
                modal,
                result: api.list_agents().await,
            }
        });
    }

    pub(crate) fn submit_form(&mut self, form: &mut AgreementFormState) {
        let Some(submission) = form.submission(self.notifier.as_mut()) else {
            return;
        };
        let (modal, edit) = (form.modal, form.is_edit());
        let api = Arc::clone(&self.api);
        self.spawn_task(async move {
            let result = match submission.agreement_id {
                Some(id) => api.update_agreement(id, &submission.payload).await,
                None => api.create_agreement(&submission.payload).await,
            };
            TaskResult::FormSaved {
                modal,
                edit,
                result,
            }
        });
    }

    pub(crate) fn on_form_agents(&mut self, modal: u64, result: Result<Vec<Agent>, ApiError>) {
        match self.overlay.as_mut() {
            Some(Overlay::AgreementForm(form)) if form.modal == modal => form.set_agents(result),
            _ => debug!("Agent roster for closed form #{} dropped", modal),
        }
    }

    pub(crate) fn on_form_saved(&mut self, modal: u64, edit: bool, result: Result<(), ApiError>) {
        if let Some(Overlay::AgreementForm(form)) = self.overlay.as_mut()
            && form.modal == modal
        {
            let outcome = form.apply_save(result, self.notifier.as_mut());
            self.finish_modal(outcome);
            return;
        }
        // The dialog was closed while the request was in flight.
        self.notifier.notify(save_notification(edit, &result));
        match result {
            Ok(()) => self.reload_agreements(),
            Err(err) => error!("Error saving agreement: {}", err),
        }
    }
}
