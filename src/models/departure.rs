//! Modelo de Departure (viaje despachado)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Estado del viaje - mapea al ENUM departure_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "departure_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DepartureStatus {
    Pending,
    Scheduled,
    Departed,
    Completed,
    Cancelled,
}

impl DepartureStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DepartureStatus::Completed | DepartureStatus::Cancelled)
    }

    fn rank(&self) -> u8 {
        match self {
            DepartureStatus::Pending => 0,
            DepartureStatus::Scheduled => 1,
            DepartureStatus::Departed => 2,
            DepartureStatus::Completed => 3,
            DepartureStatus::Cancelled => 3,
        }
    }

    /// Transición "esperada": hacia adelante, o cancelación desde un estado no terminal.
    /// Sólo informativa: ninguna transición se rechaza.
    pub fn is_forward_transition(&self, next: DepartureStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            DepartureStatus::Cancelled => true,
            _ => next.rank() > self.rank(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Departure {
    pub id: Uuid,
    pub truck_id: String,
    pub driver_id: String,
    pub scheduled_at: DateTime<Utc>,
    pub assigned_route_id: Option<Uuid>,
    pub current_hub: Option<String>,
    pub next_hub: Option<String>,
    pub est_fuel: Decimal,
    pub est_driver1: Decimal,
    pub est_driver2: Decimal,
    pub other_costs: Decimal,
    pub toll_total: Decimal,
    pub grand_total: Decimal,
    pub status: DepartureStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Departure {
    /// `grand_total` siempre es la suma de los cinco costos.
    /// `None` si la suma desborda; el total anterior queda intacto.
    pub fn recompute_grand_total(&mut self) -> Option<Decimal> {
        let total = [self.est_driver1, self.est_driver2, self.other_costs, self.toll_total]
            .into_iter()
            .try_fold(self.est_fuel, Decimal::checked_add)?;
        self.grand_total = total;
        Some(total)
    }
}

/// Última posición conocida de un chofer (telemetría "lat,lng")
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct DriverPosition {
    pub driver_id: String,
    pub position: String,
    pub recorded_at: DateTime<Utc>,
}
