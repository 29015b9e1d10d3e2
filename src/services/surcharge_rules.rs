//! Condiciones de recargo
//! 
//! Las condiciones se guardan como expresión etiquetada
//! (`SurchargeCondition`). Los textos heredados tipo `"DISTANCE>300"` se
//! convierten aquí antes de persistir.

use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::OnceLock;

use crate::models::tariff::{
    Comparator, ConditionField, Surcharge, SurchargeCalculation, SurchargeCondition,
};

/// Hechos del envío contra los que se evalúan las condiciones
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ShipmentFacts {
    pub distance_km: Option<f64>,
    pub weight_kg: Option<f64>,
    pub days: Option<f64>,
    pub volume_cbm: Option<f64>,
}

impl ShipmentFacts {
    fn value_of(&self, field: ConditionField) -> Option<f64> {
        match field {
            ConditionField::DistanceKm => self.distance_km,
            ConditionField::WeightKg => self.weight_kg,
            ConditionField::Days => self.days,
            ConditionField::VolumeCbm => self.volume_cbm,
        }
    }
}

fn condition_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*([A-Za-z_]+)\s*(>=|<=|!=|==|=|>|<)\s*(-?\d+(?:\.\d+)?)\s*$").ok()
    })
    .as_ref()
}

fn parse_field(raw: &str) -> Option<ConditionField> {
    match raw.to_ascii_lowercase().as_str() {
        "distance" | "distance_km" | "km" => Some(ConditionField::DistanceKm),
        "weight" | "weight_kg" | "kg" => Some(ConditionField::WeightKg),
        "days" | "day" => Some(ConditionField::Days),
        "volume" | "volume_cbm" | "cbm" => Some(ConditionField::VolumeCbm),
        _ => None,
    }
}

fn parse_comparator(raw: &str) -> Option<Comparator> {
    match raw {
        ">" => Some(Comparator::Gt),
        ">=" => Some(Comparator::Gte),
        "<" => Some(Comparator::Lt),
        "<=" => Some(Comparator::Lte),
        "=" | "==" => Some(Comparator::Eq),
        "!=" => Some(Comparator::Ne),
        _ => None,
    }
}

/// Convertir `"distance > 300"` en una condición etiquetada
pub fn parse_condition(raw: &str) -> Result<SurchargeCondition, String> {
    let captures = condition_regex()
        .and_then(|re| re.captures(raw))
        .ok_or_else(|| format!("cannot parse surcharge condition '{}'", raw))?;

    let field = parse_field(&captures[1])
        .ok_or_else(|| format!("unknown condition field '{}'", &captures[1]))?;
    let comparator = parse_comparator(&captures[2])
        .ok_or_else(|| format!("unknown comparator '{}'", &captures[2]))?;
    let threshold = captures[3]
        .parse::<f64>()
        .map_err(|_| format!("invalid threshold '{}'", &captures[3]))?;

    Ok(SurchargeCondition {
        field,
        comparator,
        threshold,
    })
}

/// Evaluar la condición; un dato ausente nunca la satisface
pub fn evaluate(condition: &SurchargeCondition, facts: &ShipmentFacts) -> bool {
    let Some(value) = facts.value_of(condition.field) else {
        return false;
    };
    let t = condition.threshold;
    match condition.comparator {
        Comparator::Gt => value > t,
        Comparator::Gte => value >= t,
        Comparator::Lt => value < t,
        Comparator::Lte => value <= t,
        Comparator::Eq => (value - t).abs() < f64::EPSILON,
        Comparator::Ne => (value - t).abs() >= f64::EPSILON,
    }
}

/// Recargo aplicado a un monto base
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct AppliedSurcharge {
    pub surcharge_type: String,
    pub amount: Decimal,
}

/// Recargos cuya condición se cumple (sin condición = siempre); `None` si un porcentaje desborda
pub fn applicable_surcharges(
    surcharges: &[Surcharge],
    base: Decimal,
    facts: &ShipmentFacts,
) -> Option<Vec<AppliedSurcharge>> {
    surcharges
        .iter()
        .filter(|s| match &s.condition {
            Some(condition) => evaluate(&condition.0, facts),
            None => true,
        })
        .map(|s| {
            let amount = match s.calculation {
                SurchargeCalculation::Percent => (base.checked_mul(s.value)? / Decimal::ONE_HUNDRED).round_dp(2),
                SurchargeCalculation::Fixed => s.value,
            };
            Some(AppliedSurcharge {
                surcharge_type: s.surcharge_type.clone(),
                amount,
            })
        })
        .collect()
}

/// Representación de texto, útil para logs y export
pub fn describe(condition: &SurchargeCondition) -> String {
    let field = match condition.field {
        ConditionField::DistanceKm => "distance",
        ConditionField::WeightKg => "weight",
        ConditionField::Days => "days",
        ConditionField::VolumeCbm => "volume",
    };
    let op = match condition.comparator {
        Comparator::Gt => ">",
        Comparator::Gte => ">=",
        Comparator::Lt => "<",
        Comparator::Lte => "<=",
        Comparator::Eq => "==",
        Comparator::Ne => "!=",
    };
    format!("{} {} {}", field, op, condition.threshold)
}

/// Monto decimal → f64 para los hechos del envío
pub fn decimal_fact(value: Option<Decimal>) -> Option<f64> {
    value.and_then(|v| v.to_f64())
}
