pub mod aggregate;
pub mod checkpoint;
pub mod config;
pub mod crawl;
pub mod error;
pub mod export;
pub mod fetcher;
pub mod forest;
pub mod model;
pub mod resolver;
pub mod seed;
pub mod titles;
pub mod tree;

pub use aggregate::{AggregateStats, Aggregation, ChannelAggregator, ChannelGraph, aggregate, aggregate_forest};
pub use checkpoint::{Checkpoint, CheckpointStore};
pub use config::{CrawlTarget, CredentialSources, Credentials, DataLayout};
pub use crawl::{CrawlEvent, CrawlOptions, CrawlOutcome, CrawlPhase, CrawlProgressCallback, CrawlReport, ForestCrawler};
pub use error::{CrawlError, Result};
pub use export::{ExportFormat, export_graph, sanitize_file_stem};
pub use forest::ForestLog;
pub use model::{ChannelId, ItemId, Layer, RelationRecord, Tree};
pub use resolver::{ChannelName, ChannelResolver, EndpointRotation, NOT_FOUND, RootResolver};
pub use seed::parse_video_id;
pub use titles::extract_titles;
pub use tree::TreeBuilder;
