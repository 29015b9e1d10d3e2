//! Importación de tarifas desde planilla CSV
//! 
//! Sólo valida y prepara filas para un alta masiva posterior; no persiste
//! nada. El archivo subido se borra al terminar, pase lo que pase.

use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use uuid::Uuid;

use crate::dto::tariff_dto::{
    CreateTariffRequest, DistanceConfigInput, ImportReport, ImportedRow, RejectedRow,
    RoutePriceInput, VehicleDailyRateInput, WeightTierInput,
};
use crate::models::tariff::{PricingModel, ServiceType, SubService};
use crate::services::tariff_authoring::build_bundle;
use crate::utils::errors::{bad_request_error, AppError, AppResult};
use crate::utils::validation::validate_date;

/// Borra el archivo al salir de alcance
struct UploadGuard {
    path: PathBuf,
}

impl Drop for UploadGuard {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => log::debug!("🧹 Archivo temporal eliminado: {}", self.path.display()),
            Err(e) => log::warn!("⚠️ No se pudo eliminar {}: {}", self.path.display(), e),
        }
    }
}

/// Guardar el archivo subido en `upload_dir` con un nombre único
pub async fn save_upload(upload_dir: &Path, original_name: &str, bytes: &[u8]) -> AppResult<PathBuf> {
    tokio::fs::create_dir_all(upload_dir)
        .await
        .map_err(|e| AppError::Internal(format!("cannot create upload dir: {}", e)))?;

    let extension = Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("bin")
        .to_ascii_lowercase();
    let path = upload_dir.join(format!("tariff-import-{}.{}", Uuid::new_v4(), extension));

    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| AppError::Internal(format!("cannot store upload: {}", e)))?;
    Ok(path)
}

/// Parsear y validar el archivo; lo borra siempre al terminar
pub fn import_file(path: &Path, file_name: &str) -> AppResult<ImportReport> {
    let _guard = UploadGuard {
        path: path.to_path_buf(),
    };

    let is_csv = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if !is_csv {
        return Err(bad_request_error("only .csv spreadsheets are supported"));
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|e| bad_request_error(&format!("cannot read spreadsheet: {}", e)))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| bad_request_error(&format!("cannot read header row: {}", e)))?
        .iter()
        .map(normalize_header)
        .collect();

    let mut report = ImportReport {
        file_name: file_name.to_string(),
        total_rows: 0,
        valid_rows: Vec::new(),
        invalid_rows: Vec::new(),
    };

    for (index, record) in reader.records().enumerate() {
        let row = index + 1;
        report.total_rows += 1;

        let record = match record {
            Ok(record) => record,
            Err(e) => {
                report.invalid_rows.push(RejectedRow {
                    row,
                    errors: vec![format!("unreadable row: {}", e)],
                });
                continue;
            }
        };

        let cells: HashMap<&str, &str> = headers
            .iter()
            .map(String::as_str)
            .zip(record.iter())
            .filter(|(_, value)| !value.is_empty())
            .collect();

        match parse_row(&cells) {
            Ok(tariff) => report.valid_rows.push(ImportedRow { row, tariff }),
            Err(errors) => report.invalid_rows.push(RejectedRow { row, errors }),
        }
    }

    log::info!(
        "📥 Importación {}: {} filas, {} válidas, {} inválidas",
        file_name,
        report.total_rows,
        report.valid_rows.len(),
        report.invalid_rows.len()
    );
    Ok(report)
}

fn normalize_header(raw: &str) -> String {
    raw.trim().to_ascii_lowercase().replace([' ', '-'], "_")
}

fn parse_row(cells: &HashMap<&str, &str>) -> Result<CreateTariffRequest, Vec<String>> {
    let mut errors = Vec::new();

    let mut required = |column: &str| -> Option<String> {
        match cells.get(column) {
            Some(value) => Some(value.to_string()),
            None => {
                errors.push(format!("{} is required", column));
                None
            }
        }
    };
    let origin = required("origin");
    let destination = required("destination");
    let model_raw = required("pricing_model");

    let pricing_model = model_raw.and_then(|raw| match PricingModel::from_str(&raw) {
        Ok(model) => Some(model),
        Err(_) => {
            errors.push(format!(
                "pricing_model '{}' must be one of: {}",
                raw,
                PricingModel::ALL.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ")
            ));
            None
        }
    });

    let service_type = parse_enum(cells, "service_type", ServiceType::ShipGoods, &mut errors);
    let sub_service = parse_enum(cells, "sub_service", SubService::Regular, &mut errors);

    let min_charge = amount(cells, "min_charge", &mut errors).unwrap_or(Decimal::ZERO);
    let rate = amount(cells, "rate", &mut errors);
    let base_price = amount(cells, "base_price", &mut errors);
    let max_km = amount(cells, "max_km", &mut errors);
    let min_weight = amount(cells, "min_weight_kg", &mut errors);
    let max_weight = amount(cells, "max_weight_kg", &mut errors);

    let effective_start = match cells.get("effective_start") {
        Some(raw) => match validate_date(raw) {
            Ok(date) => Some(date),
            Err(_) => {
                errors.push(format!("effective_start '{}' must be YYYY-MM-DD", raw));
                None
            }
        },
        None => Some(Utc::now().date_naive()),
    };

    let (Some(origin), Some(destination), Some(pricing_model), Some(effective_start)) =
        (origin, destination, pricing_model, effective_start)
    else {
        return Err(errors);
    };

    let text = |column: &str| cells.get(column).map(|v| v.to_string());
    let name = text("name").unwrap_or_else(|| format!("{} {} - {}", pricing_model, origin, destination));

    let mut request = CreateTariffRequest {
        name,
        service_type,
        sub_service,
        pricing_model,
        customer_id: text("customer_id"),
        origin_zone: Some(origin.clone()),
        destination_zone: Some(destination.clone()),
        vehicle_type: text("vehicle_type"),
        currency: text("currency").unwrap_or_else(|| "IDR".to_string()),
        min_charge,
        sla_hours: None,
        is_active: true,
        effective_start,
        effective_end: None,
        weight_tiers: vec![],
        route_prices: vec![],
        distance_config: None,
        vehicle_daily_rates: vec![],
        sea_freight_configs: vec![],
        surcharges: vec![],
    };

    match pricing_model {
        PricingModel::WeightBased => match (rate, max_weight) {
            (Some(rate), Some(max)) => request.weight_tiers.push(WeightTierInput {
                min_weight_kg: min_weight.unwrap_or(Decimal::ZERO),
                max_weight_kg: max,
                rate_per_kg: rate,
            }),
            _ => errors.push("weight-based rows need rate and max_weight_kg".to_string()),
        },
        PricingModel::RouteBased => match base_price.or(rate) {
            Some(price) => request.route_prices.push(RoutePriceInput {
                origin_city: origin,
                destination_city: destination,
                item_type: text("item_type"),
                price,
            }),
            None => errors.push("route-based rows need base_price or rate".to_string()),
        },
        PricingModel::DistanceBased => match rate {
            Some(rate) => {
                request.distance_config = Some(DistanceConfigInput {
                    base_price: base_price.unwrap_or(Decimal::ZERO),
                    rate_per_km: rate,
                    max_km,
                })
            }
            None => errors.push("distance-based rows need rate".to_string()),
        },
        PricingModel::DailyBased => match (request.vehicle_type.clone(), rate) {
            (Some(vehicle_type), Some(rate)) => {
                request.vehicle_daily_rates.push(VehicleDailyRateInput {
                    vehicle_type,
                    daily_rate: rate,
                    max_hours: None,
                })
            }
            _ => errors.push("daily-based rows need vehicle_type and rate".to_string()),
        },
    }

    if errors.is_empty() {
        // mismas reglas que el alta masiva
        if let Err(reasons) = build_bundle(&request, String::new()) {
            errors.extend(reasons);
        }
    }

    if errors.is_empty() {
        Ok(request)
    } else {
        Err(errors)
    }
}

fn parse_enum<T: FromStr>(
    cells: &HashMap<&str, &str>,
    column: &str,
    default: T,
    errors: &mut Vec<String>,
) -> T {
    match cells.get(column) {
        None => default,
        Some(raw) => T::from_str(raw).unwrap_or_else(|_| {
            errors.push(format!("{} '{}' is not recognised", column, raw));
            default
        }),
    }
}

/// Monto opcional no negativo; acepta separador de miles "1.250.000" o "1,250,000"
fn amount(cells: &HashMap<&str, &str>, column: &str, errors: &mut Vec<String>) -> Option<Decimal> {
    let raw = cells.get(column)?;
    match parse_amount(raw) {
        Some(value) if value >= Decimal::ZERO => Some(value),
        Some(_) => {
            errors.push(format!("{} must be non-negative", column));
            None
        }
        None => {
            errors.push(format!("{} '{}' is not a number", column, raw));
            None
        }
    }
}

fn parse_amount(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches("Rp")
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if let Ok(value) = Decimal::from_str(&cleaned) {
        return Some(value);
    }
    // agrupado de miles sin decimales
    let grouped = cleaned.replace(['.', ','], "");
    let looks_grouped = cleaned.contains(['.', ',']) && cleaned.split(['.', ',']).skip(1).all(|g| g.len() == 3);
    if looks_grouped {
        return Decimal::from_str(&grouped).ok();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1250000"), Some(Decimal::from(1_250_000)));
        assert_eq!(parse_amount("Rp 1.250.000"), Some(Decimal::from(1_250_000)));
        assert_eq!(parse_amount("1,250,000"), Some(Decimal::from(1_250_000)));
        assert_eq!(parse_amount("12.5"), Some(Decimal::new(125, 1)));
        assert_eq!(parse_amount("abc"), None);
    }

    #[test]
    fn test_import_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "upload.csv",
            "Name,Origin,Destination,Pricing Model,Rate,Base Price,Max Weight KG,Vehicle Type\n\
             Reguler,Jakarta,Bandung,weight-based,5000,,100,\n\
             Rute,Jakarta,Surabaya,Route Based,,2500000,,\n\
             ,Jakarta,,flat-rate,-5,,,\n\
             Harian,Jakarta,Bogor,daily_based,1500000,,,CDD\n",
        );

        let report = import_file(&path, "tarif.csv").unwrap();
        assert_eq!(report.total_rows, 4);
        assert_eq!(report.valid_rows.len(), 3);
        assert_eq!(report.invalid_rows.len(), 1);

        let rejected = &report.invalid_rows[0];
        assert_eq!(rejected.row, 3);
        assert!(rejected.errors.iter().any(|e| e.contains("destination is required")));
        assert!(rejected.errors.iter().any(|e| e.contains("pricing_model")));
        assert!(rejected.errors.iter().any(|e| e.contains("rate must be non-negative")));

        assert_eq!(report.valid_rows[1].tariff.route_prices[0].price, Decimal::from(2_500_000));
        assert!(!path.exists());
    }

    #[test]
    fn test_rejects_non_csv_and_still_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), "upload.xlsx", "garbage");

        assert!(matches!(import_file(&path, "tarif.xlsx"), Err(AppError::BadRequest(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_rate_for_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "upload.csv",
            "origin,destination,pricing_model\nJakarta,Bandung,distance-based\n",
        );
        let report = import_file(&path, "t.csv").unwrap();
        assert_eq!(report.invalid_rows[0].errors, vec!["distance-based rows need rate".to_string()]);
    }

    #[tokio::test]
    async fn test_save_upload() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_upload(&dir.path().join("nested"), "Tarif Maret.CSV", b"a,b\n").await.unwrap();
        assert!(path.exists());
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("csv"));
    }
}
