pub mod handlers;

pub use handlers::{
    AppContext, expand_config_dir, initialize_config, open_database, scan_options_skipping,
};
