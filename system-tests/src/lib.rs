// system-tests/src/lib.rs
// ============================================================================
// Module: Shardrow System Tests Library
// Description: Shared fixtures and helpers for system test scenarios.
// Purpose: Provide common store/model setup for shardrow system tests.
// Dependencies: shardrow-core, shardrow-store-sqlite
// ============================================================================

//! ## Overview
//! This crate hosts shared fixtures used by the shardrow system-test
//! binaries in `system-tests/tests`: in-memory store construction and the
//! hotel-rates model schema the scenarios revolve around.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod harness;
