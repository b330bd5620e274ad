//! Configuration for the threads this crate spawns.
//!
//! Every continuation, combinator branch and producer bridge runs on its own
//! thread. The settings here control how those threads are built. They are
//! read once: either from an explicit [`configure`] call made before the
//! first promise is chained, or from the environment.
use crate::Error;
use std::sync::{Arc, OnceLock};
use std::thread;

/// Environment variable overriding the thread name prefix.
pub const THREAD_NAME_ENV: &str = "PROMISE_KIT_THREAD_NAME";
/// Environment variable overriding the thread stack size, in bytes.
pub const STACK_SIZE_ENV: &str = "PROMISE_KIT_STACK_SIZE";

const DEFAULT_THREAD_NAME: &str = "promise";

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Thread settings for spawned promise tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    thread_name: String,
    stack_size: Option<usize>,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Reads [`THREAD_NAME_ENV`] and [`STACK_SIZE_ENV`].
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        let mut builder = ConfigBuilder::new();
        if let Ok(name) = std::env::var(THREAD_NAME_ENV) {
            if !name.is_empty() {
                builder = builder.thread_name(name);
            }
        }
        if let Ok(raw) = std::env::var(STACK_SIZE_ENV) {
            match raw.trim().parse::<usize>() {
                Ok(size) if size > 0 => builder = builder.stack_size(size),
                _ => tracing::warn!(
                    variable = STACK_SIZE_ENV,
                    value = %raw,
                    "ignoring invalid stack size"
                ),
            }
        }
        builder.build()
    }

    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }

    pub fn stack_size(&self) -> Option<usize> {
        self.stack_size
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            thread_name: DEFAULT_THREAD_NAME.to_owned(),
            stack_size: None,
        }
    }
}

/// Builder for [`Config`].
///
/// # Examples
///
/// ```
/// use promise_kit::spawn::Config;
/// let config = Config::builder()
///     .thread_name("fetch")
///     .stack_size(256 * 1024)
///     .build();
/// assert_eq!(config.thread_name(), "fetch");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the name prefix; each thread is named `<prefix>-<role>`.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.config.thread_name = name.into();
        self
    }

    /// Sets the stack size of spawned threads.
    ///
    /// # Panics
    ///
    /// Panics if `bytes == 0`.
    pub fn stack_size(mut self, bytes: usize) -> Self {
        assert!(bytes > 0, "stack_size must be > 0");

        self.config.stack_size = Some(bytes);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

/// Installs the process-wide configuration.
///
/// Fails with [`Error::AlreadyConfigured`] once a configuration is in place,
/// including the one loaded implicitly by the first spawned task.
pub fn configure(config: Config) -> Result<(), Error> {
    CONFIG.set(config).map_err(|_| Error::AlreadyConfigured)
}

/// The configuration in effect.
pub fn config() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Runs `work` on a new thread built from the active configuration.
///
/// Tasks are detached: nothing joins them, and they always run to completion.
pub(crate) fn spawn<F>(role: &'static str, work: F) -> Result<(), Error>
where
    F: FnOnce() + Send + 'static,
{
    let config = config();
    let mut builder = thread::Builder::new().name(format!("{}-{}", config.thread_name, role));
    if let Some(size) = config.stack_size {
        builder = builder.stack_size(size);
    }
    builder.spawn(work).map(drop).map_err(|err| {
        tracing::warn!(role, error = %err, "failed to spawn promise task");
        Error::Spawn(Arc::new(err))
    })
}
