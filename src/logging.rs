use env_logger::Env;
use log::LevelFilter;
use once_cell::sync::OnceCell;

static RUST_LOG_LEVEL: OnceCell<LevelFilter> = OnceCell::new();

/// Level from `IM540_LOG`, falling back to `RUST_LOG`, then `info`.
pub fn env_level() -> LevelFilter {
    let im540 = std::env::var("IM540_LOG").ok();
    let rust = std::env::var("RUST_LOG").ok();
    parse_level(im540.as_deref())
        .or_else(|| parse_level(rust.as_deref()))
        .unwrap_or(LevelFilter::Info)
}

pub fn parse_level(input: Option<&str>) -> Option<LevelFilter> {
    input.and_then(|s| s.trim().parse::<LevelFilter>().ok())
}

/// Initialize stderr logging based on `IM540_LOG`/`RUST_LOG`.
///
/// Only the first call installs the logger; later calls return the level it was
/// installed with. If another logger is already registered it is left alone.
pub fn init_rust_logging() -> LevelFilter {
    *RUST_LOG_LEVEL.get_or_init(|| {
        let level = env_level();
        let env = Env::default().default_filter_or(level.as_str().to_ascii_lowercase());
        let installed = env_logger::Builder::from_env(env)
            .filter_level(level)
            .format_timestamp_millis()
            .format_module_path(true)
            .format_target(true)
            .try_init();
        if installed.is_err() {
            log::debug!("a logger was already installed; keeping it");
        }
        level
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_levels() {
        assert_eq!(parse_level(Some("debug")), Some(LevelFilter::Debug));
        assert_eq!(parse_level(Some(" WARN ")), Some(LevelFilter::Warn));
        assert_eq!(parse_level(Some("off")), Some(LevelFilter::Off));
    }

    #[test]
    fn rejects_unknown_levels() {
        assert_eq!(parse_level(Some("loud")), None);
        assert_eq!(parse_level(Some("im540=debug")), None);
        assert_eq!(parse_level(None), None);
    }

    #[test]
    fn init_is_idempotent() {
        let first = init_rust_logging();
        assert_eq!(init_rust_logging(), first);
    }
}
