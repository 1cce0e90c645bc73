/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Data-plane layer.
//!
//! Owns the outbound path: the emitter trait that concrete bus adapters
//! (NATS or otherwise) implement, and the wire subjects batches are
//! published on. The watcher bounds each publish with a timeout and treats
//! failures as droppable; the periodic full re-emit is the recovery path.

pub mod emitter;

pub use emitter::{EmitError, RegistryEmitter, ROUTER_REGISTER_SUBJECT, ROUTER_UNREGISTER_SUBJECT};
