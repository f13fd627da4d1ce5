//! HTTP transport (§4.12): deserializes requests, authenticates the caller,
//! calls into the coordinator, and serializes the `Envelope`. No business
//! logic lives here.

pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
