//! Built-in plugins. [`PluginRegistry::richtext`] stacks all of them.
//!
//! [`PluginRegistry::richtext`]: crate::PluginRegistry::richtext

mod checklists;
mod core;
mod images;
mod links;
mod lists;
mod math;

use serde_json::Value;

pub use checklists::{CHECK_LIST_ITEM, ChecklistsPlugin};
pub use self::core::CorePlugin;
pub use images::{IMAGE, ImagesPlugin};
pub use links::{LINK, LinksPlugin, is_url};
pub use lists::ListsPlugin;
pub use math::{MATH_BLOCK, MATH_MARK, MathDrafts, MathEditSession, MathPlugin};

use crate::error::{CommandError, QueryError};

fn command_str_arg(args: &Option<Value>, key: &str) -> Result<String, CommandError> {
    args.as_ref()
        .and_then(|v| v.get(key))
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| CommandError::new(format!("Missing args.{key}")))
}

fn query_str_arg(args: &Option<Value>, key: &str) -> Result<String, QueryError> {
    args.as_ref()
        .and_then(|v| v.get(key))
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| QueryError::new(format!("Missing args.{key}")))
}
