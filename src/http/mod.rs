//! HTTP layer: the axum router exposing repository provisioning plus the
//! operational health and metrics endpoints.

pub mod handler;
