//! Módulo de base de datos
//! 
//! Maneja la conexión y migraciones de PostgreSQL

pub mod connection;

pub use connection::connect_and_migrate;
