// SPDX-License-Identifier: MIT

pub mod compiler;
pub mod config;
pub mod nodes;
pub mod server;
