use std::time::Duration;

use shared_types::Viewport;

use crate::apps::AppId;

/// Tunables for the window manager, taskbar and app host.
///
/// `Default` carries the stock desktop values; `from_env` overrides them from
/// `DESKTOP_*` environment variables (a `.env` file is honored).
#[derive(Debug, Clone)]
pub struct DesktopConfig {
    /// Initial viewport size until the environment reports one
    pub viewport: Viewport,
    /// Height reserved at the bottom of the viewport for the taskbar
    pub taskbar_height: i32,
    /// First z-index handed out, and the base compaction renumbers from
    pub z_index_base: u32,
    /// Counter value that triggers z-index compaction
    pub z_index_ceiling: u32,
    pub default_width: i32,
    pub default_height: i32,
    pub default_min_width: i32,
    pub default_min_height: i32,
    /// Length of the closing transition between `Closing` and `Closed`
    pub close_transition: Duration,
    /// Delay before an application's content init starts
    pub content_init_delay: Duration,
    /// Apps pinned to quick launch at startup
    pub quick_launch: Vec<AppId>,
}

impl Default for DesktopConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            taskbar_height: 50,
            z_index_base: 100,
            z_index_ceiling: 1_000_000,
            default_width: 800,
            default_height: 600,
            default_min_width: 400,
            default_min_height: 300,
            close_transition: Duration::from_millis(300),
            content_init_delay: Duration::from_millis(500),
            quick_launch: vec![AppId::Scrolldit, AppId::OuijaGpt],
        }
    }
}

impl DesktopConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let z_index_base = env_parse("DESKTOP_Z_INDEX_BASE", defaults.z_index_base)?;
        let z_index_ceiling = env_parse("DESKTOP_Z_INDEX_CEILING", defaults.z_index_ceiling)?;
        if z_index_ceiling <= z_index_base {
            return Err(anyhow::anyhow!(
                "DESKTOP_Z_INDEX_CEILING ({z_index_ceiling}) must be above DESKTOP_Z_INDEX_BASE ({z_index_base})"
            ));
        }

        let quick_launch = env_csv("DESKTOP_QUICK_LAUNCH", &["scrolldit", "ouijagpt"])
            .iter()
            .map(|raw| {
                raw.parse::<AppId>()
                    .map_err(|_| anyhow::anyhow!("Unknown app in DESKTOP_QUICK_LAUNCH: {raw}"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self {
            viewport: Viewport::new(
                env_parse("DESKTOP_VIEWPORT_WIDTH", defaults.viewport.width)?,
                env_parse("DESKTOP_VIEWPORT_HEIGHT", defaults.viewport.height)?,
            ),
            taskbar_height: env_parse("DESKTOP_TASKBAR_HEIGHT", defaults.taskbar_height)?,
            z_index_base,
            z_index_ceiling,
            default_width: env_parse("DESKTOP_DEFAULT_WIDTH", defaults.default_width)?,
            default_height: env_parse("DESKTOP_DEFAULT_HEIGHT", defaults.default_height)?,
            default_min_width: env_parse("DESKTOP_DEFAULT_MIN_WIDTH", defaults.default_min_width)?,
            default_min_height: env_parse(
                "DESKTOP_DEFAULT_MIN_HEIGHT",
                defaults.default_min_height,
            )?,
            close_transition: Duration::from_millis(env_parse(
                "DESKTOP_CLOSE_TRANSITION_MS",
                300,
            )?),
            content_init_delay: Duration::from_millis(env_parse(
                "DESKTOP_CONTENT_INIT_DELAY_MS",
                500,
            )?),
            quick_launch,
        })
    }

    /// Config with no transition or init delays, for driving the desktop
    /// synchronously in tests and headless runs
    pub fn immediate() -> Self {
        Self {
            close_transition: Duration::ZERO,
            content_init_delay: Duration::ZERO,
            ..Self::default()
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Failed to parse env var {key}={val}: {e}")),
        Err(_) => Ok(default),
    }
}

fn env_csv(key: &str, default: &[&str]) -> Vec<String> {
    match std::env::var(key) {
        Ok(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect(),
        Err(_) => default.iter().map(|s| (*s).to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_stock_desktop() {
        let config = DesktopConfig::default();
        assert_eq!(config.z_index_base, 100);
        assert_eq!(config.taskbar_height, 50);
        assert_eq!((config.default_width, config.default_height), (800, 600));
        assert_eq!(
            (config.default_min_width, config.default_min_height),
            (400, 300)
        );
        assert_eq!(config.quick_launch, vec![AppId::Scrolldit, AppId::OuijaGpt]);
    }

    #[test]
    fn test_immediate_has_no_delays() {
        let config = DesktopConfig::immediate();
        assert!(config.close_transition.is_zero());
        assert!(config.content_init_delay.is_zero());
    }

    #[test]
    fn test_env_csv_falls_back_to_default() {
        let values = env_csv("DESKTOP_TEST_UNSET_CSV_KEY", &["a", "b"]);
        assert_eq!(values, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_env_parse_falls_back_to_default() {
        let value: i32 = env_parse("DESKTOP_TEST_UNSET_INT_KEY", 42).unwrap();
        assert_eq!(value, 42);
    }
}
