use crate::providers::openai::OpenAIMessage;

pub const STORY_SYSTEM_PROMPT: &str = "You are a children story writer. \
Your job is to write a story based on the following prompt.";

pub const IMAGE_PROMPTS_SYSTEM_PROMPT: &str = "You are a friendly assistant. \
Your job is to generate image prompts based on the following story. \
Each prompt should be a short descriptive sentence. \
Please list all three prompts, separated by a \"|\" symbol. \
For example, \"a bright sunny day|a dark spooky night|a bustling city street\".";

pub const CAPTION_SEPARATOR: char = '|';

pub fn story_messages(prompt: &str) -> Vec<OpenAIMessage> {
    vec![
        OpenAIMessage::system(STORY_SYSTEM_PROMPT),
        OpenAIMessage::user(format!("prompt: {}\n", prompt)),
    ]
}

pub fn image_prompt_messages(story: &str) -> Vec<OpenAIMessage> {
    vec![
        OpenAIMessage::system(IMAGE_PROMPTS_SYSTEM_PROMPT),
        OpenAIMessage::user(format!("story: {}\n", story)),
    ]
}

/// Splits a `a|b|c` completion into at most `limit` captions, in order.
/// Blank segments (stray or trailing separators) are dropped.
pub fn split_image_prompts(content: &str, limit: usize) -> Vec<String> {
    content
        .trim()
        .split(CAPTION_SEPARATOR)
        .map(|caption| caption.trim().trim_matches('"').trim())
        .filter(|caption| !caption.is_empty())
        .take(limit)
        .map(str::to_string)
        .collect()
}
