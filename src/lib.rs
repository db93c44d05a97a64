pub mod analysis;
pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod identifiers;
pub mod kegg;
pub mod mapping;
pub mod output;
pub mod pathways;
pub mod retry;
pub mod store;
pub mod uniprot;
