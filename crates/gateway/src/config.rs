//! Gateway runtime configuration.

use std::path::PathBuf;

/// A session to create at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedSession {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

/// Everything `serve` needs. The CLI fills this from flags and env vars.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Bind address, e.g. `0.0.0.0`.
    pub bind: String,
    pub port: u16,
    /// SQLite database file. `None` keeps everything in memory, which is
    /// only useful for demos: records vanish on restart.
    pub database_path: Option<PathBuf>,
    /// Country code prefixed to bare 10-digit numbers.
    pub country_code: String,
    /// Sessions created (and connected) at startup.
    pub seed_sessions: Vec<SeedSession>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 3000,
            database_path: None,
            country_code: "91".into(),
            seed_sessions: Vec::new(),
        }
    }
}

impl GatewayConfig {
    /// Resolve the seed list from `WAMUX_SESSIONS` / `WAMUX_SESSION_COUNT`.
    ///
    /// `WAMUX_SESSIONS` wins when both are set. Invalid entries are skipped;
    /// an unparseable count falls back to zero seeds.
    #[must_use]
    pub fn seed_sessions_from_env() -> Vec<SeedSession> {
        if let Ok(list) = std::env::var("WAMUX_SESSIONS") {
            return parse_seed_list(&list);
        }
        if let Ok(count) = std::env::var("WAMUX_SESSION_COUNT") {
            let count: usize = count.trim().parse().unwrap_or(0);
            return generated_seeds(count);
        }
        Vec::new()
    }
}

/// Parse `id:name:description,id:name,...`. Name defaults to the id and the
/// description is optional. Entries without an id are dropped.
#[must_use]
pub fn parse_seed_list(raw: &str) -> Vec<SeedSession> {
    raw.split(',')
        .filter_map(|entry| {
            let mut parts = entry.splitn(3, ':');
            let id = parts.next()?.trim();
            if id.is_empty() {
                return None;
            }
            let name = parts
                .next()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .unwrap_or(id);
            let description = parts
                .next()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(String::from);
            Some(SeedSession {
                id: id.to_string(),
                name: name.to_string(),
                description,
            })
        })
        .collect()
}

/// `session1..sessionN`, named `Session 1..N`.
#[must_use]
pub fn generated_seeds(count: usize) -> Vec<SeedSession> {
    (1..=count)
        .map(|n| SeedSession {
            id: format!("session{n}"),
            name: format!("Session {n}"),
            description: None,
        })
        .collect()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_entries() {
        let seeds = parse_seed_list("main:Primary:Customer support,backup:Standby");
        assert_eq!(seeds.len(), 2);
        assert_eq!(seeds[0].id, "main");
        assert_eq!(seeds[0].name, "Primary");
        assert_eq!(seeds[0].description.as_deref(), Some("Customer support"));
        assert_eq!(seeds[1].id, "backup");
        assert_eq!(seeds[1].name, "Standby");
        assert_eq!(seeds[1].description, None);
    }

    #[test]
    fn name_defaults_to_id() {
        let seeds = parse_seed_list("solo");
        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].name, "solo");
    }

    #[test]
    fn skips_blank_entries() {
        let seeds = parse_seed_list("a:A,,  ,b:B");
        assert_eq!(seeds.len(), 2);
    }

    #[test]
    fn generates_numbered_seeds() {
        let seeds = generated_seeds(3);
        assert_eq!(seeds[0].id, "session1");
        assert_eq!(seeds[2].name, "Session 3");
    }

    #[test]
    fn zero_count_means_no_seeds() {
        assert!(generated_seeds(0).is_empty());
    }
}
