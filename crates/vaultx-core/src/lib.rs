//! VaultX Core - Domain types and port contracts
//!
//! This crate contains the hexagonal core of the vault:
//! - **Domain entities** - `FileRecord`, `PermissionGrant`, `AuditEntry`, identifiers
//! - **Port definitions** - Traits for adapters: `IMetadataStore`, `ITransport`
//! - **Configuration** - YAML-backed `Config` with validation and a builder
//!
//! # Architecture
//!
//! The domain module is pure data and rules with no I/O. Ports define the
//! trait interfaces that adapter crates (`vaultx-store`, `vaultx-remote`)
//! implement and that the sync crate consumes.

pub mod config;
pub mod domain;
pub mod ports;
