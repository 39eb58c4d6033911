//! Public engine façade: configuration, the state/bindings/job-board
//! composite shared by both variants, and the two concrete engines
//! (continuous, private-thread driven; manual, caller-driven).

pub mod config;
pub mod continuous;
pub mod manual;
pub mod shared;

pub use config::EngineConfig;
pub use continuous::ContinuousEngine;
pub use manual::ManualEngine;
pub use shared::Shared;

pub use engine_core::{
    Action, ActionContext, ActionId, Actor, Bindings, EngineError, EngineHandle, EngineListener,
    EngineResult, EngineState, TickInfo,
};
