// Storage layout, relative to the platform base directory

pub const USER_DIR: &str = ".agent1215-client";
pub const CONF_DIR: &str = ".agent1215-client/.conf";
pub const INDEX_FILE: &str = ".agent1215-client/index.json";
pub const SYSTEM_CONFIG_FILE: &str = ".agent1215-client/config.json";

pub const TUNNEL_FILE_EXT: &str = "json";

pub const APP_IDENTIFIER: &str = "com.puppet4105.client";
