//! Tunables threaded through the voting tiers, with an environment-variable
//! override layer in the style of this codebase's cache configuration: start
//! from defaults, override per-recognized variable, ignore unparseable
//! values rather than failing.

use std::env;

/// The five ratio/limit knobs used across §4.5-§4.8's voting tiers, plus the
/// dead "too many unknown" heuristic feature flag from §9.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tunables {
    /// Std-dev multiplier for inverted (minimum-seeking) threshold votes.
    pub low_ratio: f64,
    /// Std-dev multiplier used by the normalized inter-program route.
    pub high_ratio: f64,
    /// Std-dev multiplier for the final inter-program election vote.
    pub vote_ratio: f64,
    /// Maximum number of distinct observed constraints before a function is
    /// declared infallible by default.
    pub bin_limit: usize,
    /// Minimum number of call sites before a checker verdict is trusted.
    pub min_sites: usize,
    /// The disabled-by-default "too many unknown return values → infallible"
    /// heuristic. Never wired into `generate_votes`/`cast_vote`/the
    /// normalized route unless explicitly enabled; kept as a real,
    /// independently testable function rather than dead code.
    pub too_many_unknown_enabled: bool,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            low_ratio: 1.0,
            high_ratio: 1.0,
            vote_ratio: 1.0,
            bin_limit: 6,
            min_sites: 2,
            too_many_unknown_enabled: false,
        }
    }
}

impl Tunables {
    /// Build `Tunables` from defaults, overriding any field whose
    /// environment variable is set and parses successfully.
    ///
    /// Recognized variables: `RETSPEC_LOW_RATIO`, `RETSPEC_HIGH_RATIO`,
    /// `RETSPEC_VOTE_RATIO`, `RETSPEC_BIN_LIMIT`, `RETSPEC_MIN_SITES`,
    /// `RETSPEC_TOO_MANY_UNKNOWN` (`"true"`/`"1"` enables,
    /// `"false"`/`"0"` disables, anything else is ignored).
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(v) = parse_env_f64("RETSPEC_LOW_RATIO") {
            config.low_ratio = v;
        }
        if let Some(v) = parse_env_f64("RETSPEC_HIGH_RATIO") {
            config.high_ratio = v;
        }
        if let Some(v) = parse_env_f64("RETSPEC_VOTE_RATIO") {
            config.vote_ratio = v;
        }
        if let Some(v) = parse_env_usize("RETSPEC_BIN_LIMIT") {
            config.bin_limit = v;
        }
        if let Some(v) = parse_env_usize("RETSPEC_MIN_SITES") {
            config.min_sites = v;
        }
        if let Ok(raw) = env::var("RETSPEC_TOO_MANY_UNKNOWN") {
            match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => config.too_many_unknown_enabled = true,
                "false" | "0" => config.too_many_unknown_enabled = false,
                _ => {}
            }
        }

        config
    }
}

fn parse_env_f64(key: &str) -> Option<f64> {
    env::var(key).ok()?.trim().parse::<f64>().ok()
}

fn parse_env_usize(key: &str) -> Option<usize> {
    env::var(key).ok()?.trim().parse::<usize>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_env<F: FnOnce()>(key: &str, value: &str, f: F) {
        let old = env::var(key).ok();
        unsafe {
            env::set_var(key, value);
        }
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));
        match old {
            Some(v) => unsafe { env::set_var(key, v) },
            None => unsafe { env::remove_var(key) },
        }
        if let Err(panic) = result {
            std::panic::resume_unwind(panic);
        }
    }

    fn with_env_removed<F: FnOnce()>(key: &str, f: F) {
        let old = env::var(key).ok();
        unsafe {
            env::remove_var(key);
        }
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));
        if let Some(v) = old {
            unsafe { env::set_var(key, v) }
        }
        if let Err(panic) = result {
            std::panic::resume_unwind(panic);
        }
    }

    #[test]
    fn defaults_match_spec() {
        let t = Tunables::default();
        assert_eq!(t.low_ratio, 1.0);
        assert_eq!(t.high_ratio, 1.0);
        assert_eq!(t.vote_ratio, 1.0);
        assert_eq!(t.bin_limit, 6);
        assert_eq!(t.min_sites, 2);
        assert!(!t.too_many_unknown_enabled);
    }

    #[test]
    fn from_env_no_vars_matches_defaults() {
        with_env_removed("RETSPEC_LOW_RATIO", || {
            with_env_removed("RETSPEC_HIGH_RATIO", || {
                with_env_removed("RETSPEC_VOTE_RATIO", || {
                    with_env_removed("RETSPEC_BIN_LIMIT", || {
                        with_env_removed("RETSPEC_MIN_SITES", || {
                            with_env_removed("RETSPEC_TOO_MANY_UNKNOWN", || {
                                assert_eq!(Tunables::from_env(), Tunables::default());
                            });
                        });
                    });
                });
            });
        });
    }

    #[test]
    fn from_env_overrides_ratios() {
        with_env("RETSPEC_LOW_RATIO", "2.5", || {
            assert_eq!(Tunables::from_env().low_ratio, 2.5);
        });
    }

    #[test]
    fn from_env_ignores_unparseable_ratio() {
        with_env("RETSPEC_LOW_RATIO", "not-a-number", || {
            assert_eq!(Tunables::from_env().low_ratio, Tunables::default().low_ratio);
        });
    }

    #[test]
    fn from_env_overrides_bin_limit_and_min_sites() {
        with_env("RETSPEC_BIN_LIMIT", "10", || {
            with_env("RETSPEC_MIN_SITES", "3", || {
                let t = Tunables::from_env();
                assert_eq!(t.bin_limit, 10);
                assert_eq!(t.min_sites, 3);
            });
        });
    }

    #[test]
    fn from_env_too_many_unknown_flag() {
        with_env("RETSPEC_TOO_MANY_UNKNOWN", "true", || {
            assert!(Tunables::from_env().too_many_unknown_enabled);
        });
        with_env("RETSPEC_TOO_MANY_UNKNOWN", "1", || {
            assert!(Tunables::from_env().too_many_unknown_enabled);
        });
        with_env("RETSPEC_TOO_MANY_UNKNOWN", "false", || {
            assert!(!Tunables::from_env().too_many_unknown_enabled);
        });
        with_env("RETSPEC_TOO_MANY_UNKNOWN", "garbage", || {
            assert!(!Tunables::from_env().too_many_unknown_enabled);
        });
    }
}
