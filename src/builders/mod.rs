//! Builders to construct schedulers from inputs and configuration.

pub mod scheduler_builder;

pub use scheduler_builder::SchedulerBuilder;
