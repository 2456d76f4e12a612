use failure::Fail;
use log::LevelFilter;
use serde::{Deserialize, Deserializer, de::Error as _};
use std::{collections::HashMap, fs, path::{Path, PathBuf}, str::FromStr};

use crate::{
    db::types::{Role, Status},
    files,
    lifecycle::TransitionPolicy,
    models::journal_id,
};

/// Default location of the configuration file.
pub const DEFAULT_PATH: &str = "config.toml";

/// Load configuration from a file.
///
/// A missing file at the default location yields the default configuration;
/// a missing file given explicitly is an error.
pub fn load<P: AsRef<Path>>(path: Option<P>) -> crate::Result<Config> {
    let path = match path {
        Some(ref path) => path.as_ref(),
        None if !Path::new(DEFAULT_PATH).exists() => {
            debug!("No {} found, using defaults", DEFAULT_PATH);
            return Ok(Config::default());
        }
        None => Path::new(DEFAULT_PATH),
    };

    let data = fs::read_to_string(path).map_err(ReadConfigurationError)?;
    parse(&data).map_err(Into::into)
}

/// Parse configuration from a string.
pub fn parse(data: &str) -> Result<Config, ConfigurationError> {
    toml::from_str(data).map_err(ConfigurationError)
}

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub journal: Journal,
    #[serde(default)]
    pub lifecycle: Lifecycle,
    #[serde(default)]
    pub logging: Logging,
    /// Accounts created by `scriptorium bootstrap`.
    #[serde(default = "default_bootstrap")]
    pub bootstrap: Vec<BootstrapAccount>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Storage {
    /// Snapshot file holding the state.
    pub state: PathBuf,
    /// Directory into which uploaded files are stored.
    pub uploads: PathBuf,
    /// Maximum size of an uploaded file, in bytes.
    pub max_upload_size: u64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Journal {
    /// Prefix of generated journal IDs.
    pub prefix: String,
}

/// Transition policy configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Lifecycle {
    /// Only allow status changes listed in the transition table.
    pub strict: bool,
    /// Replacements for rows of the default transition table.
    #[serde(deserialize_with = "deserialize_transitions")]
    pub transitions: HashMap<Status, Vec<Status>>,
}

impl Lifecycle {
    pub fn policy(&self) -> TransitionPolicy {
        if self.strict {
            TransitionPolicy::strict().with_overrides(self.transitions.clone())
        } else {
            TransitionPolicy::permissive()
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct Logging {
    /// Default logging level.
    #[serde(default = "default_level_filter")]
    pub level: LevelFilter,
    /// Custom filters.
    #[serde(default)]
    pub filters: HashMap<String, LevelFilter>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct BootstrapAccount {
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub institution: Option<String>,
}

#[derive(Debug, Fail)]
#[fail(display = "Cannot read configuration file")]
pub struct ReadConfigurationError(#[fail(cause)] std::io::Error);

#[derive(Debug, Fail)]
#[fail(display = "Invalid configuration: {}", _0)]
pub struct ConfigurationError(#[fail(cause)] toml::de::Error);

/// TOML table keys are always strings, so parse them by hand.
fn deserialize_transitions<'de, D>(d: D)
-> Result<HashMap<Status, Vec<Status>>, D::Error>
where
    D: Deserializer<'de>,
{
    HashMap::<String, Vec<Status>>::deserialize(d)?
        .into_iter()
        .map(|(from, to)| {
            let from = Status::from_str(&from).map_err(D::Error::custom)?;
            Ok((from, to))
        })
        .collect()
}

fn default_level_filter() -> LevelFilter {
    LevelFilter::Info
}

fn default_bootstrap() -> Vec<BootstrapAccount> {
    vec![
        BootstrapAccount {
            name: "System Administrator".to_string(),
            email: "admin@cspgindia.com".to_string(),
            role: Role::Admin,
            institution: Some("CSPG India".to_string()),
        },
        BootstrapAccount {
            name: "Editor in Chief".to_string(),
            email: "editor@cspgindia.com".to_string(),
            role: Role::Editor,
            institution: Some("CSPG India".to_string()),
        },
    ]
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage: Storage::default(),
            journal: Journal::default(),
            lifecycle: Lifecycle::default(),
            logging: Logging::default(),
            bootstrap: default_bootstrap(),
        }
    }
}

impl Default for Storage {
    fn default() -> Self {
        Storage {
            state: PathBuf::from("scriptorium.state"),
            uploads: PathBuf::from("uploads"),
            max_upload_size: files::DEFAULT_MAX_SIZE,
        }
    }
}

impl Default for Journal {
    fn default() -> Self {
        Journal {
            prefix: journal_id::DEFAULT_PREFIX.to_string(),
        }
    }
}

impl Default for Logging {
    fn default() -> Self {
        Logging {
            level: default_level_filter(),
            filters: HashMap::new(),
        }
    }
}
