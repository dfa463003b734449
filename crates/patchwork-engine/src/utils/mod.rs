/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Utility modules for the patchwork engine: the lifecycle event bus and
//! parameter template rendering.

pub mod event_bus;
pub mod templating;
