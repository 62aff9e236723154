use clap::Parser;
use clap::ValueEnum;
use supports_color::Stream;

/// Setting this to `true` (any case) turns the stderr thought panels off.
pub const DISABLE_THOUGHT_LOGGING_ENV_VAR: &str = "DISABLE_THOUGHT_LOGGING";

#[derive(Parser, Debug, Default)]
#[command(version, about = "Sequential thinking MCP server over stdio")]
pub struct Cli {
    /// Do not render thought panels on stderr. The protocol output is
    /// unaffected.
    #[arg(long = "disable-thought-logging", default_value_t = false)]
    pub disable_thought_logging: bool,

    /// Specifies color settings for the thought panels and log output.
    #[arg(long = "color", value_enum, default_value_t = Color::Auto)]
    pub color: Color,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum Color {
    Always,
    Never,
    #[default]
    Auto,
}

impl Color {
    fn enabled(self, stderr_supports_color: impl FnOnce() -> bool) -> bool {
        match self {
            Color::Always => true,
            Color::Never => false,
            Color::Auto => stderr_supports_color(),
        }
    }
}

/// Settings resolved once at startup and handed to [`crate::run_main`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    /// Render the human-facing thought panels on stderr.
    pub thought_logging: bool,
    /// Emit ANSI colour on stderr.
    pub color: bool,
}

impl ServerConfig {
    /// Combines the command line with the process environment and the
    /// terminal's colour support.
    pub fn from_cli(cli: &Cli) -> Self {
        let env_value = std::env::var(DISABLE_THOUGHT_LOGGING_ENV_VAR).ok();
        Self::resolve(cli, env_value.as_deref(), || {
            supports_color::on_cached(Stream::Stderr).is_some()
        })
    }

    fn resolve(
        cli: &Cli,
        disable_thought_logging_env: Option<&str>,
        stderr_supports_color: impl FnOnce() -> bool,
    ) -> Self {
        let disabled_by_env =
            disable_thought_logging_env.is_some_and(|value| value.eq_ignore_ascii_case("true"));
        Self {
            thought_logging: !(cli.disable_thought_logging || disabled_by_env),
            color: cli.color.enabled(stderr_supports_color),
        }
    }
}
