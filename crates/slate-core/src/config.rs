use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub max_normalize_iterations: usize,
    /// Block kind used when a block is reset or created from nothing.
    pub default_block: String,
    pub list_types: Vec<String>,
    pub list_item_type: String,
    /// Lower-case extensions a pasted URL must end with to become an image.
    pub image_extensions: Vec<String>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_normalize_iterations: 100,
            default_block: "paragraph".to_string(),
            list_types: vec!["numbered-list".to_string(), "bulleted-list".to_string()],
            list_item_type: "list-item".to_string(),
            image_extensions: ["png", "jpg", "jpeg", "gif", "webp", "bmp", "svg", "avif"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl EditorConfig {
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Self>(s).map(Self::with_defaults)
    }

    pub(crate) fn with_defaults(mut self) -> Self {
        let defaults = Self::default();
        if self.max_normalize_iterations == 0 {
            self.max_normalize_iterations = defaults.max_normalize_iterations;
        }
        if self.default_block.is_empty() {
            self.default_block = defaults.default_block;
        }
        if self.list_item_type.is_empty() {
            self.list_item_type = defaults.list_item_type;
        }
        self
    }

    pub fn is_list_type(&self, kind: &str) -> bool {
        self.list_types.iter().any(|t| t == kind)
    }
}
