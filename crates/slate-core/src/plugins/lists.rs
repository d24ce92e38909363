use crate::config::EditorConfig;
use crate::node::{AttrPatch, Node};
use crate::ops::Op;
use crate::plugin::{NodeSpec, NormalizeContext, NormalizePass, Plugin, PluginRegistry};

/// Numbered and bulleted lists. List containers hold only list items; two
/// adjacent lists of the same type are left as they are.
pub struct ListsPlugin;

impl Plugin for ListsPlugin {
    fn id(&self) -> &'static str {
        "lists"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        let config = EditorConfig::default();
        config
            .list_types
            .into_iter()
            .map(NodeSpec::block)
            .chain([NodeSpec::block(config.list_item_type)])
            .collect()
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![Box::new(NormalizeListChildren)]
    }
}

struct NormalizeListChildren;

impl NormalizePass for NormalizeListChildren {
    fn id(&self) -> &'static str {
        "lists.normalize_children"
    }

    fn run(&self, cx: &NormalizeContext<'_>) -> Vec<Op> {
        let mut ops = Vec::new();

        fn walk(
            children: &[Node],
            path: &mut Vec<usize>,
            cx: &NormalizeContext<'_>,
            in_list: bool,
            ops: &mut Vec<Op>,
        ) {
            for (ix, node) in children.iter().enumerate() {
                let Node::Element(el) = node else {
                    continue;
                };
                path.push(ix);
                if in_list
                    && el.kind != cx.config.list_item_type
                    && !cx.registry.is_void(el)
                    && is_block(cx.registry, node)
                {
                    ops.push(Op::SetNode {
                        path: path.clone(),
                        patch: AttrPatch::set("type", cx.config.list_item_type.clone()),
                    });
                }
                if !cx.registry.is_void(el) {
                    walk(&el.children, path, cx, cx.config.is_list_type(&el.kind), ops);
                }
                path.pop();
            }
        }

        walk(&cx.doc.children, &mut Vec::new(), cx, false, &mut ops);
        ops
    }
}

fn is_block(registry: &PluginRegistry, node: &Node) -> bool {
    node.as_element().is_some_and(|el| !registry.is_inline(el))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Document;

    #[test]
    fn paragraphs_inside_lists_become_list_items() {
        let registry = PluginRegistry::richtext();
        let config = EditorConfig::default();
        let doc = Document::new(vec![Node::element(
            "bulleted-list",
            vec![
                Node::element("list-item", vec![Node::text("a")]),
                Node::paragraph("b"),
            ],
        )]);
        let cx = NormalizeContext {
            doc: &doc,
            registry: &registry,
            config: &config,
        };
        assert_eq!(
            NormalizeListChildren.run(&cx),
            vec![Op::SetNode {
                path: vec![0, 1],
                patch: AttrPatch::set("type", "list-item"),
            }]
        );
    }

    #[test]
    fn void_blocks_inside_lists_keep_their_type() {
        let registry = PluginRegistry::richtext();
        let config = EditorConfig::default();
        let image = crate::node::ElementNode::new("image", vec![Node::text("")])
            .with_attr("url", "https://example.com/a.png");
        let doc = Document::new(vec![Node::element(
            "numbered-list",
            vec![Node::element("list-item", vec![Node::text("a")]), image.into()],
        )]);
        let cx = NormalizeContext {
            doc: &doc,
            registry: &registry,
            config: &config,
        };
        assert!(NormalizeListChildren.run(&cx).is_empty());
    }
}
