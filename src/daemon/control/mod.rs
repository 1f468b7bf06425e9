//! Local control channel of the daemon. Clients connect over localhost TCP and exchange one JSON
//! object per line, see [protocol].

pub mod protocol;
pub mod server;
