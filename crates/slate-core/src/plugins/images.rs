use crate::config::EditorConfig;
use crate::data::{DataTransfer, data_url};
use crate::editor::Editor;
use crate::error::{CommandError, EditorError};
use crate::node::ElementNode;
use crate::plugin::{CommandSpec, Next, NodeSpec, Plugin};

use super::{command_str_arg, is_url};

pub const IMAGE: &str = "image";

/// Void `image` blocks. Dropped image files are read in the background and
/// inserted as `data:` URLs; a pasted image URL becomes an image.
pub struct ImagesPlugin;

impl Plugin for ImagesPlugin {
    fn id(&self) -> &'static str {
        "images"
    }

    fn is_void(&self, element: &ElementNode, next: Next<'_>) -> bool {
        element.kind == IMAGE || next.is_void(element)
    }

    fn insert_data(
        &self,
        editor: &mut Editor,
        data: DataTransfer,
        next: Next<'_>,
    ) -> Result<(), EditorError> {
        let DataTransfer { text, files } = data;

        let mut other_files = Vec::new();
        let mut claimed = 0;
        for file in files {
            if file.top_level_type() != "image" {
                other_files.push(file);
                continue;
            }
            claimed += 1;
            let media_type = file.media_type.clone();
            let label = file.name.clone();
            editor.spawn_read(label, file.into_loader(), move |editor, bytes| {
                editor.insert_image(&data_url(&media_type, &bytes))
            });
        }
        if claimed > 0 {
            tracing::debug!(files = claimed, "reading dropped images");
            if text.is_none() && other_files.is_empty() {
                return Ok(());
            }
        }

        if let Some(url) = text.as_deref().filter(|t| is_image_url(t, editor.config())) {
            tracing::debug!(url, "inserting pasted image url");
            return editor.insert_image(url);
        }
        next.insert_data(
            editor,
            DataTransfer {
                text,
                files: other_files,
            },
        )
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::block(IMAGE).void()]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("image.insert", "Insert image", |editor, args| {
                let url = command_str_arg(&args, "url")?;
                editor
                    .insert_image(&url)
                    .map_err(|e| CommandError::new(format!("Failed to insert image: {e}")))
            })
            .description("Insert an image block at the selection.")
            .keywords(["image", "picture", "photo"])
            .args_example(serde_json::json!({ "url": "https://example.com/cat.png" })),
        ]
    }
}

pub(crate) fn is_image_url(text: &str, config: &EditorConfig) -> bool {
    if !is_url(text) {
        return false;
    }
    let path = text.split(['?', '#']).next().unwrap_or(text);
    let Some((_, ext)) = path.rsplit_once('.') else {
        return false;
    };
    let ext = ext.to_ascii_lowercase();
    !ext.contains('/') && config.image_extensions.iter().any(|e| *e == ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_urls_are_recognized_by_extension() {
        let config = EditorConfig::default();
        assert!(is_image_url("https://example.com/cat.PNG", &config));
        assert!(is_image_url("https://example.com/a/b.jpg?size=2", &config));
        assert!(!is_image_url("https://example.com/page.html", &config));
        assert!(!is_image_url("https://example.com", &config));
        assert!(!is_image_url("cat.png", &config));
    }
}
