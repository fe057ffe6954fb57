//! Wire types for the agreements API, plus the date helpers the views share.

use chrono::{NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// --- Agents ---
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id_agente: i64,
    #[serde(default)]
    pub nombre: String,
    #[serde(default)]
    pub nif: String,
}

impl Agent {
    /// `Nombre (NIF)` label used by the selectors.
    pub fn label(&self) -> String {
        format!("{} ({})", self.nombre.trim(), self.nif.trim())
    }
}

// --- Agreements ---
/// An agreement as served by `GET /Acuerdos`.
///
/// Fields this client does not model are kept in `extra` so an edit can send
/// the original record back with only the form fields replaced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agreement {
    pub id_acuerdo: i64,
    #[serde(default)]
    pub id_agente: Option<i64>,
    #[serde(default)]
    pub fecha_alta: Option<String>,
    #[serde(default)]
    pub fecha_baja: Option<String>,
    #[serde(default)]
    pub ambito: Option<String>,
    #[serde(default)]
    pub duracion_meses: Option<i64>,
    #[serde(default)]
    pub prorroga_automatica: Option<bool>,
    #[serde(default)]
    pub exclusividad: Option<i64>,
    #[serde(default)]
    pub cod_forma_pago: Option<String>,
    #[serde(default)]
    pub agente_comercial: Option<Agent>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Agreement {
    pub fn agent_id(&self) -> Option<i64> {
        self.agente_comercial.as_ref().map(|agent| agent.id_agente)
    }

    pub fn agent_name(&self) -> Option<&str> {
        self.agente_comercial.as_ref().map(|agent| agent.nombre.trim())
    }

    pub fn agent_nif(&self) -> &str {
        self.agente_comercial
            .as_ref()
            .map(|agent| agent.nif.trim())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgreementPage {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub data: Vec<Agreement>,
    #[serde(default)]
    pub total_pages: Option<u32>,
}

/// Reads an explicit `null` list as empty.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl AgreementPage {
    /// Server page count, read as 1 when missing or zero.
    pub fn page_count(&self) -> u32 {
        match self.total_pages {
            Some(pages) if pages > 0 => pages,
            _ => 1,
        }
    }
}

// --- Rates ---
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rate {
    pub id_tarifa: i64,
    #[serde(default)]
    pub nombre: String,
    #[serde(default)]
    pub inicio_vigencia: Option<String>,
    #[serde(default)]
    pub fin_vigencia: Option<String>,
}

/// A rate linked to an agreement, as listed by `GET /Acuerdos/{id}/tarifas`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedRate {
    #[serde(default)]
    pub id_tarifa_acuerdo: Option<i64>,
    #[serde(default)]
    pub id_acuerdo: i64,
    pub id_tarifa: i64,
    #[serde(default)]
    pub porc_renovacion: Option<f64>,
    #[serde(default)]
    pub fecha_vigor: Option<String>,
    #[serde(default)]
    pub nombre: String,
    #[serde(default)]
    pub inicio_vigencia: Option<String>,
    #[serde(default)]
    pub fin_vigencia: Option<String>,
}

impl AssignedRate {
    /// A not-yet-persisted assignment of `rate` to `agreement_id`.
    pub fn pending(agreement_id: i64, rate: &Rate) -> Self {
        Self {
            id_tarifa_acuerdo: Some(0),
            id_acuerdo: agreement_id,
            id_tarifa: rate.id_tarifa,
            porc_renovacion: Some(0.0),
            fecha_vigor: Some(now_timestamp()),
            nombre: rate.nombre.clone(),
            inicio_vigencia: rate.inicio_vigencia.clone(),
            fin_vigencia: rate.fin_vigencia.clone(),
        }
    }

    /// Strips the record down to what `PUT /Acuerdos/{id}/tarifas` accepts.
    pub fn to_payload(&self) -> RateAssignment {
        RateAssignment {
            id_tarifa_acuerdo: self.id_tarifa_acuerdo.unwrap_or(0),
            id_acuerdo: self.id_acuerdo,
            id_tarifa: self.id_tarifa,
            porc_renovacion: self.porc_renovacion.unwrap_or(0.0),
            fecha_vigor: self
                .fecha_vigor
                .clone()
                .filter(|value| !value.is_empty())
                .unwrap_or_else(now_timestamp),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateAssignment {
    pub id_tarifa_acuerdo: i64,
    pub id_acuerdo: i64,
    pub id_tarifa: i64,
    pub porc_renovacion: f64,
    pub fecha_vigor: String,
}

// --- Dates ---

/// Current UTC instant as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Calendar-date prefix (`YYYY-MM-DD`) of a server date-time.
pub fn calendar_date(raw: &str) -> String {
    raw.chars().take(10).collect()
}

pub fn parse_calendar_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Table rendering of an optional server date: `dd/mm/YYYY`, or `-`.
pub fn display_date(raw: Option<&str>) -> String {
    raw.and_then(|value| parse_calendar_date(&calendar_date(value)))
        .map(|date| date.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| String::from("-"))
}
