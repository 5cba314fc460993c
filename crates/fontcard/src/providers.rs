pub mod base;
pub mod configs;
pub mod factory;
pub mod gemini;
pub mod groq;
pub mod sse;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
