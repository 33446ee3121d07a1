use crate::providers::stability::StabilityArtifact;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StabilityResponse {
    #[serde(default)]
    pub artifacts: Vec<StabilityArtifact>,
}

impl StabilityResponse {
    pub fn into_first_image(self) -> Option<String> {
        self.artifacts.into_iter().next().map(|artifact| artifact.base64)
    }
}
