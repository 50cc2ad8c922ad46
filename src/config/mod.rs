mod settings;

pub use settings::{
    ClassifierConfig, Config, ConfigError, ExportConfig, FetchConfig, TomlConfig, EXAMPLE_CONFIG,
};
