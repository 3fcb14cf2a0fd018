use relgraph_core::model::{ItemId, RelationRecord, Tree};
use std::collections::HashMap;

/// What each node of a printed tree shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeLabel {
    Title,
    VideoId,
    ChannelId,
    ChannelName,
}

impl TreeLabel {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "title" => Some(TreeLabel::Title),
            "videoid" => Some(TreeLabel::VideoId),
            "channelid" => Some(TreeLabel::ChannelId),
            "channelname" => Some(TreeLabel::ChannelName),
            _ => None,
        }
    }
}

/// Indented text rendering of `tree`, root first, children in discovery
/// order. Each item is drawn once, under the parent it was first found from.
/// `channel_names` is consulted for [`TreeLabel::ChannelName`].
pub fn render_tree(tree: &Tree, label: TreeLabel, channel_names: &HashMap<ItemId, String>) -> String {
    let Some(root) = tree.root() else {
        return String::new();
    };

    let mut first_records: HashMap<&str, &RelationRecord> = HashMap::new();
    for record in tree.records() {
        first_records.entry(record.item.as_str()).or_insert(record);
    }

    let mut children: HashMap<String, Vec<ItemId>> = HashMap::new();
    for (parent, child) in tree.edges() {
        children.entry(parent).or_default().push(child);
    }

    let text = |item: &str| -> String {
        let record = first_records.get(item);
        match label {
            TreeLabel::Title => record.map(|r| r.title.clone()).unwrap_or_default(),
            TreeLabel::VideoId => item.to_string(),
            TreeLabel::ChannelId => record.map(|r| r.channel.clone()).unwrap_or_default(),
            TreeLabel::ChannelName => channel_names.get(item).cloned().unwrap_or_default(),
        }
    };

    let mut out = format!("{}\n", text(&root.item));
    // (item, prefix for its children, is last sibling)
    let mut stack: Vec<(ItemId, String, bool)> = children
        .get(&root.item)
        .map(|kids| {
            kids.iter()
                .enumerate()
                .rev()
                .map(|(i, kid)| (kid.clone(), String::new(), i + 1 == kids.len()))
                .collect()
        })
        .unwrap_or_default();

    while let Some((item, prefix, last)) = stack.pop() {
        let branch = if last { "└── " } else { "├── " };
        out.push_str(&format!("{}{}{}\n", prefix, branch, text(&item)));

        if let Some(kids) = children.get(&item) {
            let child_prefix = format!("{}{}", prefix, if last { "    " } else { "│   " });
            for (i, kid) in kids.iter().enumerate().rev() {
                stack.push((kid.clone(), child_prefix.clone(), i + 1 == kids.len()));
            }
        }
    }
    out
}
