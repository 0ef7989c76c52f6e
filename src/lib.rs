// SPDX-License-Identifier: MIT

//! flowsmith-rs: compiles visual workflow graphs into LangGraph Python modules

pub mod core;
pub mod flowsmith;
