//! Side-effecting collaborators: the service transport and artifact reads.

pub mod http;
pub mod resolver;
pub mod transport;
