// Interface adapters: device storage, the local clock, and the service client.

pub mod clients;
pub mod clock;
pub mod protocol;
pub mod stores;
