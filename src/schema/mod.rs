//! Chapter data: handles, events, conditions, moments and scenes.

pub mod condition;
pub mod event;
pub mod handle;
pub mod scene;
