mod commands;
mod config;
mod data;
mod editor;
mod error;
mod history;
mod hotkeys;
mod node;
mod ops;
mod path;
mod plugin;
pub mod plugins;
mod query;
mod range;
mod render;
mod tasks;
pub mod transforms;
mod value;

pub use crate::commands::TEXT_ALIGN_TYPES;
pub use crate::config::*;
pub use crate::data::*;
pub use crate::editor::*;
pub use crate::error::*;
pub use crate::history::*;
pub use crate::hotkeys::*;
pub use crate::node::*;
pub use crate::ops::*;
pub use crate::path::*;
pub use crate::plugin::*;
pub use crate::plugins::{
    CHECK_LIST_ITEM, ChecklistsPlugin, CorePlugin, IMAGE, ImagesPlugin, LINK, LinksPlugin,
    ListsPlugin, MATH_BLOCK, MATH_MARK, MathDrafts, MathEditSession, MathPlugin, is_url,
};
pub use crate::query::*;
pub use crate::range::*;
pub use crate::render::*;
pub use crate::tasks::{BlobLoader, Task, TaskSpawner, ThreadSpawner};
pub use crate::transforms::{DeleteOptions, InsertOptions, MoveOptions, NodeOptions, SplitOptions};
pub use crate::value::*;
