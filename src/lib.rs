// Copyright (c) 2025 Tallybook Authors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod cli;
pub mod commands;
pub mod db;
pub mod error;
pub mod models;
pub mod reconstruct;
pub mod recorder;
pub mod reversal;
pub mod store;
pub mod trends;
pub mod utils;
