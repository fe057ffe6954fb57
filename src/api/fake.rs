//! In-memory [`AcuerdosApi`] that records every call.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::{
    AcuerdosApi, Agent, Agreement, AgreementPage, ApiError, AssignedRate, FieldErrors, Rate,
    RateAssignment,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListAgreements { page: u32, page_size: u32 },
    ListAgents,
    Create(Value),
    Update(i64, Value),
    Delete(i64),
    AssignedRates(i64),
    RateCatalog,
    ReplaceRates(i64, Vec<RateAssignment>),
}

/// How a mutating call should fail.
#[derive(Debug, Clone)]
pub enum Failure {
    Validation(FieldErrors),
    Status(u16),
}

impl Failure {
    fn to_error(&self) -> ApiError {
        match self {
            Failure::Validation(errors) => ApiError::Validation(errors.clone()),
            Failure::Status(status) => ApiError::Status {
                status: *status,
                body: String::from("fake failure"),
            },
        }
    }
}

#[derive(Default)]
pub struct FakeApi {
    pub agreements: Mutex<Vec<Agreement>>,
    pub total_pages: Mutex<Option<u32>>,
    pub agents: Mutex<Vec<Agent>>,
    pub assigned: Mutex<Vec<AssignedRate>>,
    pub catalog: Mutex<Vec<Rate>>,
    /// Applied to reads when set.
    pub read_failure: Mutex<Option<Failure>>,
    /// Applied to create/update/delete/replace when set.
    pub write_failure: Mutex<Option<Failure>>,
    /// Every call after [`FakeApi::stall`] never returns.
    stalled: Mutex<bool>,
    calls: Mutex<Vec<Call>>,
}

impl FakeApi {
    pub fn with_agreements(agreements: Vec<Agreement>, total_pages: u32) -> Self {
        let api = Self::default();
        *api.agreements.lock().unwrap() = agreements;
        *api.total_pages.lock().unwrap() = Some(total_pages);
        api
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Calls that change server state.
    pub fn writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| {
                matches!(
                    call,
                    Call::Create(_) | Call::Update(..) | Call::Delete(_) | Call::ReplaceRates(..)
                )
            })
            .collect()
    }

    pub fn fail_writes(&self, failure: Failure) {
        *self.write_failure.lock().unwrap() = Some(failure);
    }

    pub fn fail_reads(&self, failure: Failure) {
        *self.read_failure.lock().unwrap() = Some(failure);
    }

    /// Makes every later call hang, like a server that stopped answering.
    pub fn stall(&self) {
        *self.stalled.lock().unwrap() = true;
    }

    async fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
        let stalled = *self.stalled.lock().unwrap();
        if stalled {
            std::future::pending::<()>().await;
        }
    }

    fn check_read(&self) -> Result<(), ApiError> {
        match self.read_failure.lock().unwrap().as_ref() {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }

    fn check_write(&self) -> Result<(), ApiError> {
        match self.write_failure.lock().unwrap().as_ref() {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AcuerdosApi for FakeApi {
    async fn list_agreements(&self, page: u32, page_size: u32) -> Result<AgreementPage, ApiError> {
        self.record(Call::ListAgreements { page, page_size }).await;
        self.check_read()?;
        Ok(AgreementPage {
            data: self.agreements.lock().unwrap().clone(),
            total_pages: *self.total_pages.lock().unwrap(),
        })
    }

    async fn list_agents(&self) -> Result<Vec<Agent>, ApiError> {
        self.record(Call::ListAgents).await;
        self.check_read()?;
        Ok(self.agents.lock().unwrap().clone())
    }

    async fn create_agreement(&self, payload: &Value) -> Result<(), ApiError> {
        self.record(Call::Create(payload.clone())).await;
        self.check_write()
    }

    async fn update_agreement(&self, id: i64, payload: &Value) -> Result<(), ApiError> {
        self.record(Call::Update(id, payload.clone())).await;
        self.check_write()
    }

    async fn delete_agreement(&self, id: i64) -> Result<(), ApiError> {
        self.record(Call::Delete(id)).await;
        self.check_write()
    }

    async fn assigned_rates(&self, agreement_id: i64) -> Result<Vec<AssignedRate>, ApiError> {
        self.record(Call::AssignedRates(agreement_id)).await;
        self.check_read()?;
        Ok(self.assigned.lock().unwrap().clone())
    }

    async fn rate_catalog(&self) -> Result<Vec<Rate>, ApiError> {
        self.record(Call::RateCatalog).await;
        self.check_read()?;
        Ok(self.catalog.lock().unwrap().clone())
    }

    async fn replace_rates(
        &self,
        agreement_id: i64,
        assignments: &[RateAssignment],
    ) -> Result<(), ApiError> {
        self.record(Call::ReplaceRates(agreement_id, assignments.to_vec())).await;
        self.check_write()
    }
}

// --- Fixtures ---

pub fn agent(id: i64, nombre: &str, nif: &str) -> Agent {
    Agent {
        id_agente: id,
        nombre: nombre.to_string(),
        nif: nif.to_string(),
    }
}

pub fn agreement(id: i64, agent: Option<Agent>) -> Agreement {
    Agreement {
        id_acuerdo: id,
        id_agente: agent.as_ref().map(|a| a.id_agente),
        fecha_alta: Some(String::from("2024-01-15T00:00:00")),
        ambito: Some(String::from("Residencial")),
        duracion_meses: Some(12),
        prorroga_automatica: Some(false),
        exclusividad: Some(0),
        cod_forma_pago: Some(String::from("TR")),
        agente_comercial: agent,
        ..Agreement::default()
    }
}

pub fn rate(id: i64, nombre: &str) -> Rate {
    Rate {
        id_tarifa: id,
        nombre: nombre.to_string(),
        inicio_vigencia: Some(String::from("2024-01-01T00:00:00")),
        fin_vigencia: None,
    }
}

pub fn assigned(agreement_id: i64, rate_id: i64, nombre: &str) -> AssignedRate {
    AssignedRate {
        id_tarifa_acuerdo: Some(100 + rate_id),
        id_acuerdo: agreement_id,
        id_tarifa: rate_id,
        porc_renovacion: Some(2.5),
        fecha_vigor: Some(String::from("2024-01-01T00:00:00.000Z")),
        nombre: nombre.to_string(),
        inicio_vigencia: None,
        fin_vigencia: None,
    }
}
