use std::sync::LazyLock;

/// The number of records returned by a collection query when no page size is requested (defaults to 25)
pub static DEFAULT_PER_PAGE: LazyLock<usize> =
	lazy_env_parse!("FORMGRAPH_DEFAULT_PER_PAGE", usize, 25);

/// The largest page size a collection query may request (defaults to 500)
pub static MAX_PER_PAGE: LazyLock<usize> = lazy_env_parse!("FORMGRAPH_MAX_PER_PAGE", usize, 500);

/// The number of zero-padded digits in an incremental identifier (defaults to 8)
pub static ID_NUMBER_WIDTH: LazyLock<usize> =
	lazy_env_parse!("FORMGRAPH_ID_NUMBER_WIDTH", usize, 8);

/// How deep relationship metadata is nested inside a meta descriptor
pub const RELATION_META_DEPTH: usize = 1;

/// The capacity of the change notification channel
pub const RELOAD_CHANNEL_SIZE: usize = 1;
