pub mod commands;
pub mod handlers;
pub mod logging;
pub mod render;

pub use handlers::{crawl_options, data_layout, graph_stem, load_credentials, seed_id};
pub use render::{TreeLabel, render_tree};

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
