//! Notification routing tree written for each migrated organization.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use unialert_common::types::ROUTING_LABEL;
use unialert_storage::SecretService;

use crate::error::{MigrationError, Result};
use crate::loader::Channel;

/// Receiver of the root route.
pub const DEFAULT_RECEIVER: &str = "default_route";

/// Persisted routing configuration of one organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingConfiguration {
    pub route: Route,
    #[serde(default)]
    pub receivers: Vec<Receiver>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub receiver: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matchers: Vec<Matcher>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<Route>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receiver {
    pub name: String,
    #[serde(default)]
    pub integrations: Vec<Integration>,
}

/// One notifier of a receiver, carried over from a legacy channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Integration {
    pub uid: String,
    pub name: String,
    #[serde(rename = "type")]
    pub integration_type: String,
    #[serde(default)]
    pub disable_resolve_message: bool,
    #[serde(default)]
    pub settings: Value,
    /// Plaintext until [`encrypt_secure_settings`] runs.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub secure_settings: BTreeMap<String, String>,
}

impl From<&Channel> for Integration {
    fn from(channel: &Channel) -> Self {
        Self {
            uid: channel.uid.clone(),
            name: channel.name.clone(),
            integration_type: channel.channel_type.clone(),
            disable_resolve_message: channel.disable_resolve_message,
            settings: channel.settings.clone(),
            secure_settings: channel.secure_settings.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOp {
    Equal,
    NotEqual,
}

impl MatchOp {
    fn as_str(self) -> &'static str {
        match self {
            MatchOp::Equal => "=",
            MatchOp::NotEqual => "!=",
        }
    }
}

/// A label matcher, persisted in its textual form: `rule_uid="abc"`.
///
/// # Examples
///
/// ```
/// use unialert_migrate::routing::{MatchOp, Matcher};
///
/// let m: Matcher = r#"team!="db""#.parse().unwrap();
/// assert_eq!(m.op, MatchOp::NotEqual);
/// assert_eq!(m.to_string(), r#"team!="db""#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Matcher {
    pub name: String,
    pub op: MatchOp,
    pub value: String,
}

impl Matcher {
    pub fn equal(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            op: MatchOp::Equal,
            value: value.into(),
        }
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        let value = labels.get(&self.name).map(String::as_str).unwrap_or("");
        match self.op {
            MatchOp::Equal => value == self.value,
            MatchOp::NotEqual => value != self.value,
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}\"", self.name, self.op.as_str())?;
        for c in self.value.chars() {
            match c {
                '\\' => f.write_str("\\\\")?,
                '"' => f.write_str("\\\"")?,
                '\n' => f.write_str("\\n")?,
                c => write!(f, "{c}")?,
            }
        }
        f.write_str("\"")
    }
}

impl FromStr for Matcher {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let eq = s
            .find('=')
            .ok_or_else(|| format!("matcher {s:?} has no operator"))?;
        let (name, op) = match s[..eq].strip_suffix('!') {
            Some(name) => (name, MatchOp::NotEqual),
            None => (&s[..eq], MatchOp::Equal),
        };
        let name = name.trim();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(format!("matcher {s:?} has an invalid label name"));
        }

        let raw = s[eq + 1..].trim();
        if raw.starts_with('~') {
            return Err(format!("matcher {s:?} uses an unsupported regex operator"));
        }
        let value = match raw
            .strip_prefix('"')
            .and_then(|inner| inner.strip_suffix('"'))
        {
            Some(quoted) => {
                unescape(quoted).ok_or_else(|| format!("matcher {s:?} has a malformed quoted value"))?
            }
            None if is_bare_value(raw) => raw.to_string(),
            None => return Err(format!("matcher {s:?} has a malformed value")),
        };

        Ok(Self {
            name: name.to_string(),
            op,
            value,
        })
    }
}

fn is_bare_value(raw: &str) -> bool {
    !raw.is_empty()
        && raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':' | '/'))
}

/// `None` on a dangling backslash or an unescaped quote.
fn unescape(quoted: &str) -> Option<String> {
    let mut out = String::with_capacity(quoted.len());
    let mut chars = quoted.chars();
    while let Some(c) = chars.next() {
        if c == '"' {
            return None;
        }
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            other => out.push(other),
        }
    }
    Some(out)
}

impl TryFrom<String> for Matcher {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Matcher> for String {
    fn from(matcher: Matcher) -> Self {
        matcher.to_string()
    }
}

/// Receiver wrapping every channel of `channels`, in order.
pub fn build_receiver(name: &str, channels: &[&Channel]) -> Receiver {
    Receiver {
        name: name.to_string(),
        integrations: channels.iter().map(|c| Integration::from(*c)).collect(),
    }
}

/// Child route selecting exactly the rule carrying `rule_uid`.
pub fn rule_route(receiver: &str, rule_uid: &str) -> Route {
    Route {
        receiver: receiver.to_string(),
        matchers: vec![Matcher::equal(ROUTING_LABEL, rule_uid)],
        routes: Vec::new(),
    }
}

/// Collects receivers and routes of one organization.
#[derive(Debug, Clone)]
pub struct OrgRouting {
    default_receiver: Receiver,
    receivers: Vec<Receiver>,
    routes: Vec<Route>,
}

impl OrgRouting {
    /// Starts a tree whose root receiver wraps the organization's default
    /// channels, or nothing when there are none.
    pub fn new(defaults: &[&Channel]) -> Self {
        Self {
            default_receiver: build_receiver(DEFAULT_RECEIVER, defaults),
            receivers: Vec::new(),
            routes: Vec::new(),
        }
    }

    /// Adds a receiver and route for a rule. Rules without channels fall
    /// through to the root route and get neither.
    pub fn add_rule(&mut self, rule_uid: &str, channels: &[&Channel]) -> bool {
        if channels.is_empty() {
            return false;
        }
        self.receivers.push(build_receiver(rule_uid, channels));
        self.routes.push(rule_route(rule_uid, rule_uid));
        true
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    pub fn assemble(self) -> RoutingConfiguration {
        let mut receivers = Vec::with_capacity(self.receivers.len() + 1);
        receivers.push(self.default_receiver);
        receivers.extend(self.receivers);
        RoutingConfiguration {
            route: Route {
                receiver: DEFAULT_RECEIVER.to_string(),
                matchers: Vec::new(),
                routes: self.routes,
            },
            receivers,
        }
    }
}

impl RoutingConfiguration {
    /// Child routes of the root whose matchers all select `labels`.
    pub fn routes_for(&self, labels: &BTreeMap<String, String>) -> Vec<&Route> {
        self.route
            .routes
            .iter()
            .filter(|r| !r.matchers.is_empty() && r.matchers.iter().all(|m| m.matches(labels)))
            .collect()
    }

    pub fn receiver(&self, name: &str) -> Option<&Receiver> {
        self.receivers.iter().find(|r| r.name == name)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Replaces every secure setting in the tree by its ciphertext.
pub fn encrypt_secure_settings(
    config: &mut RoutingConfiguration,
    secrets: &dyn SecretService,
) -> Result<()> {
    for receiver in &mut config.receivers {
        for integration in &mut receiver.integrations {
            for value in integration.secure_settings.values_mut() {
                *value = secrets.encrypt(value).map_err(MigrationError::Encryption)?;
            }
        }
    }
    Ok(())
}
