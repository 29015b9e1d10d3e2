//! Utilidades del sistema
//! 
//! Este módulo contiene utilidades para manejo de errores, validación,
//! geometría y formato de moneda.

pub mod currency;
pub mod errors;
pub mod geo;
pub mod validation;
