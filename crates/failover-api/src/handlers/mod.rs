//! HTTP request handlers.
//!
//! This module contains all the endpoint handlers for the control surface.

pub mod control;
pub mod health;
pub mod modes;
pub mod status;
