use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Map as JsonMap;
use serde_json::Value as JsonValue;

/// The roles a client may advertise in `HELLO.details.roles`.
#[derive(Hash, Eq, PartialEq, Debug, Clone, Copy)]
pub enum ClientRole {
    Publisher,
    Subscriber,
    Caller,
    Callee,
}

impl ClientRole {
    fn as_str(&self) -> &'static str {
        match self {
            ClientRole::Publisher => "publisher",
            ClientRole::Subscriber => "subscriber",
            ClientRole::Caller => "caller",
            ClientRole::Callee => "callee",
        }
    }

    fn from_str(s: &str) -> Option<ClientRole> {
        match s {
            "publisher" => Some(ClientRole::Publisher),
            "subscriber" => Some(ClientRole::Subscriber),
            "caller" => Some(ClientRole::Caller),
            "callee" => Some(ClientRole::Callee),
            _ => None,
        }
    }
}

impl fmt::Display for ClientRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The roles the router advertises back on `WELCOME.details.roles`.
#[derive(Hash, Eq, PartialEq, Debug, Clone, Copy)]
pub enum RouterRole {
    Broker,
    Dealer,
}

impl RouterRole {
    fn as_str(&self) -> &'static str {
        match self {
            RouterRole::Broker => "broker",
            RouterRole::Dealer => "dealer",
        }
    }
}

/// `HELLO.details.roles`: a non-empty dict whose keys must all be known
/// client role names (spec §4.1(d)). Per-role feature sub-dicts are
/// accepted but ignored — advanced-profile features are a spec Non-goal.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct ClientRoles {
    roles: HashSet<ClientRole>,
}

impl ClientRoles {
    pub fn new(roles: HashSet<ClientRole>) -> ClientRoles {
        ClientRoles { roles }
    }

    pub fn basic() -> ClientRoles {
        ClientRoles {
            roles: [
                ClientRole::Publisher,
                ClientRole::Subscriber,
                ClientRole::Caller,
                ClientRole::Callee,
            ]
            .into_iter()
            .collect(),
        }
    }

    pub fn contains(&self, role: ClientRole) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn into_set(self) -> HashSet<ClientRole> {
        self.roles
    }
}

impl Serialize for ClientRoles {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = JsonMap::new();
        for role in &self.roles {
            map.insert(role.as_str().to_string(), JsonValue::Object(JsonMap::new()));
        }
        map.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ClientRoles {
    fn deserialize<D>(deserializer: D) -> Result<ClientRoles, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = JsonMap::<String, JsonValue>::deserialize(deserializer)?;
        if raw.is_empty() {
            return Err(serde::de::Error::custom("roles must be a non-empty dict"));
        }
        let mut roles = HashSet::with_capacity(raw.len());
        for key in raw.keys() {
            match ClientRole::from_str(key) {
                Some(role) => {
                    roles.insert(role);
                }
                None => {
                    return Err(serde::de::Error::custom(format!(
                        "unknown client role: {}",
                        key
                    )))
                }
            }
        }
        Ok(ClientRoles { roles })
    }
}

/// `WELCOME.details.roles`: always `{broker: {}, dealer: {}}` for this
/// router (spec §4.5).
#[derive(Debug, PartialEq, Clone)]
pub struct RouterRoles {
    roles: HashSet<RouterRole>,
}

impl RouterRoles {
    pub fn basic() -> RouterRoles {
        RouterRoles {
            roles: [RouterRole::Broker, RouterRole::Dealer].into_iter().collect(),
        }
    }
}

impl Default for RouterRoles {
    fn default() -> RouterRoles {
        RouterRoles::basic()
    }
}

impl Serialize for RouterRoles {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = JsonMap::new();
        for role in &self.roles {
            map.insert(role.as_str().to_string(), JsonValue::Object(JsonMap::new()));
        }
        map.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RouterRoles {
    fn deserialize<D>(deserializer: D) -> Result<RouterRoles, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = JsonMap::<String, JsonValue>::deserialize(deserializer)?;
        let mut roles = HashSet::with_capacity(raw.len());
        for key in raw.keys() {
            match key.as_str() {
                "broker" => {
                    roles.insert(RouterRole::Broker);
                }
                "dealer" => {
                    roles.insert(RouterRole::Dealer);
                }
                other => {
                    return Err(serde::de::Error::custom(format!(
                        "unknown router role: {}",
                        other
                    )))
                }
            }
        }
        Ok(RouterRoles { roles })
    }
}
