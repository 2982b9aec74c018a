//! Prompt composition.
//!
//! Every send is a stand-alone request: the fixed first-aid preamble, the
//! user's latest text, and optionally one inline image. No history is sent.

use crate::types::{
    Content, GenerateContentRequest, GenerationConfig, ImageAttachment, Part,
};

/// Role-priming instruction placed in front of every user message.
pub const SYSTEM_PREAMBLE: &str = "You are AidSnap, a calm and knowledgeable first-aid assistant. \
Give clear, step-by-step first-aid guidance using short numbered steps and bullet points. \
Start critical safety information with \"Warning:\" and helpful remarks with \"Note:\". \
Always advise calling local emergency services when a situation may be life-threatening. \
You are not a substitute for professional medical care.";

/// User text substituted when only an image is attached.
pub const IMAGE_ONLY_REQUEST: &str =
    "Analyze the injury shown in this image and explain how to provide first aid for it.";

/// Suggested questions offered on the chat page.
pub const QUICK_PROMPTS: [&str; 4] = [
    "Step-by-step instructions to reduce swelling and pain.",
    "Find out how to perform hands-only CPR in under a minute.",
    "Tips to clean and protect cuts to avoid infection.",
    "Get step-by-step guidance for treating minor burns.",
];

/// Build the request for one send.
///
/// This is a pure function of its inputs.
pub fn compose(
    text: &str,
    image: Option<&ImageAttachment>,
    generation: &GenerationConfig,
) -> GenerateContentRequest {
    let text = text.trim();
    let user_text = if text.is_empty() && image.is_some() {
        IMAGE_ONLY_REQUEST
    } else {
        text
    };

    let mut parts = vec![Part::text(format!("{SYSTEM_PREAMBLE}\n\nUser: {user_text}"))];
    if let Some(image) = image {
        parts.push(Part::inline_data(
            image.media_type.mime_type(),
            image.to_base64(),
        ));
    }

    GenerateContentRequest {
        contents: vec![Content::user(parts)],
        generation_config: Some(*generation),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ImageMediaType;

    #[test]
    fn text_only_request() {
        let request = compose("  How do I stop a nosebleed?  ", None, &GenerationConfig::default());
        assert_eq!(request.contents.len(), 1);
        assert_eq!(request.contents[0].role.as_deref(), Some("user"));
        assert_eq!(request.contents[0].parts.len(), 1);

        let text = request.text();
        assert!(text.starts_with(SYSTEM_PREAMBLE));
        assert!(text.ends_with("User: How do I stop a nosebleed?"));
        assert!(request.inline_data().is_none());
        assert_eq!(request.generation_config, Some(GenerationConfig::default()));
    }

    #[test]
    fn image_is_inlined_with_media_type() {
        let image = ImageAttachment::new("cut.png", ImageMediaType::Png, b"Hello World".to_vec());
        let request = compose("What is this?", Some(&image), &GenerationConfig::unset());

        let inline = request.inline_data().unwrap();
        assert_eq!(inline.mime_type, "image/png");
        assert_eq!(inline.data, "SGVsbG8gV29ybGQ=");
        assert!(request.text().ends_with("User: What is this?"));
    }

    #[test]
    fn image_only_uses_analysis_request() {
        let image = ImageAttachment::new("burn.jpg", ImageMediaType::Jpeg, vec![1, 2, 3]);
        let request = compose("", Some(&image), &GenerationConfig::default());
        assert!(request.text().ends_with(IMAGE_ONLY_REQUEST));
    }

    #[test]
    fn compose_is_pure() {
        let config = GenerationConfig::default();
        let first = compose("Burns", None, &config);
        let second = compose("Burns", None, &config);
        assert_eq!(first, second);
    }
}
