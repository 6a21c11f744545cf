use serde::{Deserialize, Serialize};

use super::{ClientRoles, RouterRoles};

/// `HELLO.details`. Unknown top-level keys are tolerated (serde's default
/// "ignore unrecognized fields" behavior); only `roles` is validated.
#[derive(Serialize, Deserialize, PartialEq, Debug, Default, Clone)]
pub struct HelloDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    agent: Option<String>,
    roles: ClientRoles,
}

/// `WELCOME.details`.
#[derive(Serialize, Deserialize, PartialEq, Debug, Default, Clone)]
pub struct WelcomeDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    agent: Option<String>,
    roles: RouterRoles,
}

/// `ABORT.details` / `GOODBYE.details`.
#[derive(Serialize, Deserialize, PartialEq, Debug, Default, Clone)]
pub struct ErrorDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

#[derive(Serialize, Deserialize, PartialEq, Debug, Default, Clone)]
pub struct SubscribeOptions {}

/// `PUBLISH.options`. `exclude_me` defaults to `true` (spec §9 open
/// question, resolved per the WAMP advanced-profile default): a
/// publisher does not receive its own event unless it opts in with
/// `exclude_me: false`.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct PublishOptions {
    #[serde(default, skip_serializing_if = "is_false")]
    acknowledge: bool,

    #[serde(default = "default_true")]
    exclude_me: bool,
}

fn default_true() -> bool {
    true
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Default for PublishOptions {
    fn default() -> PublishOptions {
        PublishOptions {
            acknowledge: false,
            exclude_me: true,
        }
    }
}

#[derive(Serialize, Deserialize, PartialEq, Debug, Default, Clone)]
pub struct RegisterOptions {}

#[derive(PartialEq, Debug, Default, Serialize, Deserialize, Clone)]
pub struct CallOptions {}

#[derive(PartialEq, Debug, Default, Serialize, Deserialize, Clone)]
pub struct YieldOptions {}

#[derive(Serialize, Deserialize, PartialEq, Debug, Default, Clone)]
pub struct EventDetails {}

#[derive(Serialize, Deserialize, PartialEq, Debug, Default, Clone)]
pub struct InvocationDetails {}

#[derive(PartialEq, Debug, Default, Serialize, Deserialize, Clone)]
pub struct ResultDetails {}

impl HelloDetails {
    pub fn new(roles: ClientRoles) -> HelloDetails {
        HelloDetails { roles, agent: None }
    }

    pub fn new_with_agent(roles: ClientRoles, agent: &str) -> HelloDetails {
        HelloDetails {
            roles,
            agent: Some(agent.to_string()),
        }
    }

    pub fn roles(&self) -> &ClientRoles {
        &self.roles
    }
}

impl WelcomeDetails {
    pub fn new(roles: RouterRoles) -> WelcomeDetails {
        WelcomeDetails { roles, agent: None }
    }

    pub fn new_with_agent(roles: RouterRoles, agent: &str) -> WelcomeDetails {
        WelcomeDetails {
            roles,
            agent: Some(agent.to_string()),
        }
    }
}

impl ErrorDetails {
    pub fn new() -> ErrorDetails {
        ErrorDetails { message: None }
    }

    pub fn new_with_message(message: &str) -> ErrorDetails {
        ErrorDetails {
            message: Some(message.to_string()),
        }
    }
}

impl SubscribeOptions {
    pub fn new() -> SubscribeOptions {
        SubscribeOptions {}
    }
}

impl PublishOptions {
    pub fn new(acknowledge: bool) -> PublishOptions {
        PublishOptions {
            acknowledge,
            exclude_me: true,
        }
    }

    pub fn should_acknowledge(&self) -> bool {
        self.acknowledge
    }

    pub fn excludes_publisher(&self) -> bool {
        self.exclude_me
    }
}

impl RegisterOptions {
    pub fn new() -> RegisterOptions {
        RegisterOptions {}
    }
}

impl CallOptions {
    pub fn new() -> CallOptions {
        CallOptions {}
    }
}

impl YieldOptions {
    pub fn new() -> YieldOptions {
        YieldOptions {}
    }
}

impl EventDetails {
    pub fn new() -> EventDetails {
        EventDetails {}
    }
}

impl InvocationDetails {
    pub fn new() -> InvocationDetails {
        InvocationDetails {}
    }
}

impl ResultDetails {
    pub fn new() -> ResultDetails {
        ResultDetails {}
    }
}
