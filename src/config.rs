//! Router configuration (spec §6). Parsed from the command line with
//! `clap`'s derive API, mirroring the flat key/value surface the spec
//! enumerates.

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "wamp-router", version, about = "A WAMP v2 router implementing the basic broker and dealer profile")]
pub struct RouterConfig {
    /// Interface to bind the WebSocket listener on.
    #[arg(long, default_value = "0.0.0.0")]
    pub iface: String,

    /// Port to bind the WebSocket listener on.
    #[arg(long, default_value_t = 8080)]
    pub port: u16,

    /// HTTP path the WebSocket upgrade is served on.
    #[arg(long, default_value = "/ws")]
    pub wspath: String,

    /// Static-file root for non-upgrade GETs. Not served by the core;
    /// accepted here only so the binary's CLI surface matches the spec.
    #[arg(long)]
    pub webroot: Option<String>,

    /// Realms to create at startup, comma-separated.
    #[arg(long, value_delimiter = ',')]
    pub realms: Vec<String>,

    /// Validate URIs against the strict character class instead of loose.
    #[arg(long, default_value_t = false)]
    pub validate_strict_uris: bool,

    /// Create a realm on first HELLO to an unknown realm URI.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub auto_create_realms: bool,

    /// Always ABORT a HELLO to an unknown realm, even with auto-create-realms on.
    #[arg(long, default_value_t = false)]
    pub abort_unknown_realms: bool,

    /// Log and discard malformed inbound frames instead of disconnecting.
    #[arg(long, default_value_t = false)]
    pub drop_offending_messages: bool,
}

impl RouterConfig {
    /// Whether a HELLO to realm `realm_exists == false` should be
    /// rejected rather than auto-created (spec §4.5: `abort-unknown-realms`
    /// dominates `auto-create-realms`).
    pub fn rejects_unknown_realm(&self) -> bool {
        self.abort_unknown_realms || !self.auto_create_realms
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn abort_unknown_realms_dominates_auto_create() {
        let mut config = RouterConfig::parse_from(["wamp-router"]);
        config.auto_create_realms = true;
        config.abort_unknown_realms = true;
        assert!(config.rejects_unknown_realm());
    }

    #[test]
    fn auto_create_realms_permits_unknown_realm_by_default() {
        let config = RouterConfig::parse_from(["wamp-router"]);
        assert!(!config.rejects_unknown_realm());
    }
}
