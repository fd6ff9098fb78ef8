//! drivekeep Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `RemoteEntry`, `PathEntry`, `DomainAllowList`
//! - **Use cases** - path resolution, folder ensuring, tree walking,
//!   foreign-file mirroring and alias pruning
//! - **Port definitions** - the `IRemoteStore` trait implemented by the Drive adapter
//!
//! # Architecture
//!
//! The domain module contains pure business logic with no external dependencies.
//! Ports define trait interfaces that adapter crates implement.
//! Use cases orchestrate domain entities through port interfaces.

pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;
