//! Configuración del proyecto
//! 
//! Este módulo contiene la configuración de base de datos, variables de entorno
//! y las reglas de precios inyectadas en los calculadores.

pub mod database;
pub mod environment;
pub mod pricing_rules;

pub use environment::*;
pub use pricing_rules::PricingRules;
