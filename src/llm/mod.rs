pub mod guard;
pub mod hashing;
pub mod openai;
pub mod provider;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use guard::{TimeoutEmbedder, TimeoutGenerator};
pub use hashing::HashingEmbedder;
pub use openai::OpenAiCompatProvider;
pub use provider::{Embedder, Generator};
pub use types::{GenerationOptions, GenerationProfiles};
