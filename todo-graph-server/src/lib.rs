pub mod config {
    use serde::Deserialize;

    #[derive(Deserialize, Debug)]
    pub struct Config {
        /// Database to persist tasks in. Tasks are kept in memory when unset.
        #[serde(default)]
        pub db_url: Option<String>,
        #[serde(default = "default_port")]
        pub port: u16,
    }

    impl Config {
        /// Loads configuration from environment variables.
        pub fn from_env() -> anyhow::Result<Self> {
            Self::from_environment(config::Environment::default())
        }

        /// Loads configuration from the given environment source.
        pub fn from_environment(environment: config::Environment) -> anyhow::Result<Self> {
            let settings = config::Config::builder()
                .add_source(environment)
                .build()?;

            let config: Config = settings.try_deserialize()?;
            Ok(config)
        }
    }

    fn default_port() -> u16 {
        8080
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::collections::HashMap;

        fn environment(vars: &[(&str, &str)]) -> config::Environment {
            let source: HashMap<String, String> = vars
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect();
            config::Environment::default().source(Some(source))
        }

        #[test]
        fn can_default_to_in_memory_store_on_port_8080() {
            let config = Config::from_environment(environment(&[])).unwrap();
            assert_eq!(config.db_url, None);
            assert_eq!(config.port, 8080);
        }

        #[test]
        fn can_read_db_url_and_port() {
            let config = Config::from_environment(environment(&[
                ("DB_URL", "sqlite://tasks.db?mode=rwc"),
                ("PORT", "9000"),
            ]))
            .unwrap();
            assert_eq!(config.db_url.as_deref(), Some("sqlite://tasks.db?mode=rwc"));
            assert_eq!(config.port, 9000);
        }
    }
}
pub mod entities;
pub mod task;
pub mod web;
