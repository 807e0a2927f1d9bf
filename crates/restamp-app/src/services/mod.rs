// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer — bridges the command line to the restamp backend crates.
//
// The CLI only parses arguments and prints; everything that touches documents,
// settings, or history goes through here.

pub mod app_services;
pub mod data_dir;
pub mod generator;
pub mod prompt;
