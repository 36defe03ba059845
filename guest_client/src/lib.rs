pub mod domain;
pub mod frameworks;
pub mod interface_adapters;
pub mod use_cases;

pub use frameworks::cli::run;
pub use frameworks::config::ClientConfig;
pub use interface_adapters::clients::GenerationClient;
pub use interface_adapters::stores::{FileStore, InMemoryStore, SelectedStore, probe_store};
pub use use_cases::gate::{BlockReason, GateOutcome, GatePhase, GenerationGate, GuestPrompt};
