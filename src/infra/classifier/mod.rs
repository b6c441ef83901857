pub mod gemini_client;
pub mod openrouter_client;

pub use gemini_client::GeminiClassifier;
pub use openrouter_client::OpenRouterClassifier;
