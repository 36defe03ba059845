mod generation;

pub use generation::GenerationClient;
