// Interface adapters: HTTP protocol, handlers, stores and generator backends.

pub mod generators;
pub mod handlers;
pub mod protocol;
pub mod routes;
pub mod state;
