//! Warehouse access for the ingestion pipeline.
//!
//! This module provides the core [`Warehouse`] trait and implementations for
//! the relational store the pipeline loads into. The trait covers the two
//! key-set lookups used by duplicate resolution and the two per-record
//! inserts. Inserts are one durable write per record, never an all-or-nothing
//! batch, so outcomes can be attributed back to individual sheet rows.

mod base;
pub mod memory;
pub mod postgres;

pub use base::Warehouse;
