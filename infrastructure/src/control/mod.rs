//! Local control plane over a Unix domain socket

mod client;
mod protocol;
mod server;

pub use client::{ControlClient, ControlClientError};
pub use protocol::{ControlErrorCode, ControlRequest, ControlResponse};
pub use server::ControlServer;
