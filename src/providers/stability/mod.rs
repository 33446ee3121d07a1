pub mod stability_artifact;
pub mod stability_request;
pub mod stability_response;
pub mod stability_text_prompt;

pub use stability_artifact::StabilityArtifact;
pub use stability_request::StabilityRequest;
pub use stability_response::StabilityResponse;
pub use stability_text_prompt::StabilityTextPrompt;
