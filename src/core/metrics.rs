//! Dashboard metrics and chart data.
//!
//! Both projections are recomputed from the tables on every call; nothing here
//! is stored. The `*_at` variants take the reference time explicitly.

use super::store::RecordStore;
use crate::{
    errors::Result,
    models::{Record, Table},
    storage::Storage,
};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Month labels used by the chart, January first.
pub const MONTH_LABELS: [&str; 12] = [
    "Ene", "Feb", "Mar", "Abr", "May", "Jun", "Jul", "Ago", "Sep", "Oct", "Nov", "Dic",
];

/// Number of trailing months in the services chart.
pub const CHART_MONTHS: u32 = 6;

/// Service status counted as pending.
pub const ESTADO_PENDIENTE: &str = "pendiente";
/// Service status counted as in progress.
pub const ESTADO_EN_PROCESO: &str = "en_proceso";
/// Service status counted as completed.
pub const ESTADO_COMPLETADO: &str = "completado";

/// Derived dashboard figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metricas {
    /// All customers
    pub total_clientes: usize,
    /// Customers whose `activo` flag is not `false`
    pub clientes_activos: usize,
    /// All vehicles
    pub total_vehiculos: usize,
    /// Vehicles whose `activo` flag is not `false`
    pub vehiculos_activos: usize,
    /// All services, whatever their status
    pub total_servicios: usize,
    /// Services with status `pendiente`
    pub servicios_pendientes: usize,
    /// Services with status `en_proceso`
    pub servicios_en_proceso: usize,
    /// Services with status `completado`
    pub servicios_completados: usize,
    /// Sum of `costo` over services completed in the current month
    pub ingresos_mes: f64,
    /// `ingresosMes` divided by active customers, 0 without any
    pub ingresos_por_cliente: f64,
    /// Completed services as a percentage of all services
    pub satisfaccion: f64,
    /// Mean `duracion` in hours over services that carry one
    pub tiempo_promedio_servicio: f64,
    /// Stored uptime percentage
    pub uptime: f64,
}

/// One bar of a chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartPoint {
    /// Three-letter Spanish month name
    pub label: String,
    /// Services dated in that month
    pub value: usize,
}

/// Chart series for the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    /// Services per month, oldest first, ending with the current month
    pub monthly_services: Vec<ChartPoint>,
}

impl<S: Storage> RecordStore<S> {
    /// Metrics for the current month.
    pub async fn get_metricas(&self) -> Result<Metricas> {
        self.metricas_at(Utc::now()).await
    }

    /// Metrics with `now` deciding which month counts as current.
    pub async fn metricas_at(&self, now: DateTime<Utc>) -> Result<Metricas> {
        let clientes = self.load_table(Table::Clientes).await?;
        let vehiculos = self.load_table(Table::Vehiculos).await?;
        let servicios = self.load_table(Table::Servicios).await?;
        let uptime = self.stored_uptime().await?;
        Ok(compute_metricas(&clientes, &vehiculos, &servicios, uptime, now))
    }

    /// Services chart for the six months ending now.
    pub async fn get_chart_data(&self) -> Result<ChartData> {
        self.chart_data_at(Utc::now()).await
    }

    /// Services chart for the six months ending with the month of `now`.
    pub async fn chart_data_at(&self, now: DateTime<Utc>) -> Result<ChartData> {
        let servicios = self.load_table(Table::Servicios).await?;
        Ok(compute_chart_data(&servicios, now))
    }
}

#[allow(clippy::cast_precision_loss)]
fn compute_metricas(
    clientes: &[Record],
    vehiculos: &[Record],
    servicios: &[Record],
    uptime: f64,
    now: DateTime<Utc>,
) -> Metricas {
    let clientes_activos = clientes.iter().filter(|r| is_active(r)).count();
    let vehiculos_activos = vehiculos.iter().filter(|r| is_active(r)).count();

    let count_estado = |estado: &str| servicios.iter().filter(|r| has_estado(r, estado)).count();
    let servicios_pendientes = count_estado(ESTADO_PENDIENTE);
    let servicios_en_proceso = count_estado(ESTADO_EN_PROCESO);
    let servicios_completados = count_estado(ESTADO_COMPLETADO);

    let current_month = (now.year(), now.month());
    let ingresos_mes: f64 = servicios
        .iter()
        .filter(|r| has_estado(r, ESTADO_COMPLETADO))
        .filter(|r| fecha(r).is_some_and(|d| (d.year(), d.month()) == current_month))
        .filter_map(|r| r.get("costo").and_then(Value::as_f64))
        .sum();

    let ingresos_por_cliente = if clientes_activos == 0 {
        0.0
    } else {
        ingresos_mes / clientes_activos as f64
    };

    let satisfaccion = if servicios.is_empty() {
        0.0
    } else {
        servicios_completados as f64 / servicios.len() as f64 * 100.0
    };

    let duraciones: Vec<f64> = servicios
        .iter()
        .filter_map(|r| r.get("duracion").and_then(Value::as_f64))
        .collect();
    let tiempo_promedio_servicio = if duraciones.is_empty() {
        0.0
    } else {
        duraciones.iter().sum::<f64>() / duraciones.len() as f64
    };

    Metricas {
        total_clientes: clientes.len(),
        clientes_activos,
        total_vehiculos: vehiculos.len(),
        vehiculos_activos,
        total_servicios: servicios.len(),
        servicios_pendientes,
        servicios_en_proceso,
        servicios_completados,
        ingresos_mes,
        ingresos_por_cliente,
        satisfaccion,
        tiempo_promedio_servicio,
        uptime,
    }
}

fn compute_chart_data(servicios: &[Record], now: DateTime<Utc>) -> ChartData {
    let monthly_services = (0..CHART_MONTHS)
        .rev()
        .map(|months_back| {
            let (year, month) = shift_month(now.year(), now.month(), months_back);
            let value = servicios
                .iter()
                .filter(|r| fecha(r).is_some_and(|d| d.year() == year && d.month() == month))
                .count();
            ChartPoint {
                label: MONTH_LABELS[(month - 1) as usize].to_string(),
                value,
            }
        })
        .collect();
    ChartData { monthly_services }
}

/// `(year, month)` of the month `back` months before `(year, month)`.
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
const fn shift_month(year: i32, month: u32, back: u32) -> (i32, u32) {
    let index = year * 12 + (month as i32 - 1) - back as i32;
    (index.div_euclid(12), (index.rem_euclid(12) + 1) as u32)
}

fn is_active(record: &Record) -> bool {
    record.get("activo").and_then(Value::as_bool) != Some(false)
}

fn has_estado(record: &Record, estado: &str) -> bool {
    record.get("estado").and_then(Value::as_str) == Some(estado)
}

/// Parses a service `fecha`: plain `YYYY-MM-DD` or an RFC 3339 timestamp.
fn fecha(record: &Record) -> Option<NaiveDate> {
    let raw = record.get("fecha")?.as_str()?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.with_timezone(&Utc).date_naive())
        })
}
