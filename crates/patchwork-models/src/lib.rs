/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Entity definitions and the database schema shared by the patchwork crates.
pub mod models;
pub mod schema;
