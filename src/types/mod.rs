// Public modules
pub mod generate_content;
pub mod generation_config;
pub mod image;
pub mod message;
pub mod model;

// Re-exports
pub use generate_content::{
    Candidate, Content, GenerateContentRequest, GenerateContentResponse, InlineData, Part,
};
pub use generation_config::GenerationConfig;
pub use image::{ImageAttachment, ImageMediaType, ImageRef};
pub use message::{Message, Role};
pub use model::{KnownModel, Model};
