//! Controller layer: form state, UI events, and command orchestration.

pub mod events;
pub mod form;
pub mod orchestration;
