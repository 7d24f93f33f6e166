use std::sync::LazyLock;

pub const LOGO: &str = "
  __                                            _
 / _| ___  _ __ _ __ ___   __ _ _ __ __ _ _ __ | |__
| |_ / _ \\| '__| '_ ` _ \\ / _` | '__/ _` | '_ \\| '_ \\
|  _| (_) | |  | | | | | | (_| | | | (_| | |_) | | | |
|_|  \\___/|_|  |_| |_| |_|\\__, |_|  \\__,_| .__/|_| |_|
                          |___/          |_|
";

/// The publicly visible name of the server
pub const PKG_NAME: &str = "formgraph";

/// The version of the server
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The path the GraphQL endpoint is served on
pub const GRAPHQL_PATH: &str = "/graphql";

/// Whether the GraphiQL dashboard is served on GET requests to the GraphQL endpoint
pub static GRAPHQL_DASHBOARD: LazyLock<bool> =
	formgraph_core::lazy_env_parse!("FORMGRAPH_GRAPHQL_DASHBOARD", bool);
