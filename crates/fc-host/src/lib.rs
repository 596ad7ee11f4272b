//! Transport lifecycle host (C11) and the top-level application wiring that
//! ties the mediator core's background workers together under one
//! coordinated shutdown.

pub mod application;
pub mod transport_host;

pub use application::{ApplicationHost, ApplicationHostConfig};
pub use transport_host::{TransportLifecycleHost, TransportLifecycleHostConfig};
