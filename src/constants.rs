//! Backend names, configuration keys and the event data keys the relays read.
//!
//! Event actions are not listed: they are plain identifiers the dispatcher only
//! uses to look up post-hooks.

// Backend names, also the keys of `EventsConfigMap`.
pub const MAILGUN: &str = "mailgun";
pub const SLACK: &str = "slack";
pub const INFOBIP: &str = "infobip";
pub const AUDIT: &str = "audit";
pub const GATEWAY: &str = "gateway";
pub const BILLMGR: &str = "bill";
/// Shared slice read by the mail relay and the internal sinks.
pub const META: &str = "meta";

/// Backends whose enablement is tracked even when they have no configuration.
pub const KNOWN_ENABLEMENT: [&str; 4] = [MAILGUN, INFOBIP, SLACK, BILLMGR];

// Config keys.
pub const ENABLED: &str = "enabled";
pub const TRUE: &str = "true";
pub const API_KEY: &str = "api_key";
pub const DOMAIN: &str = "domain";
pub const SENDER: &str = "sender";
pub const TOKEN: &str = "token";
pub const CHANNEL: &str = "channel";
pub const USERNAME: &str = "username";
pub const PASSWORD: &str = "password";
pub const APPLICATION_ID: &str = "application_id";
pub const API_URL: &str = "url";
pub const AUDIT_LOG: &str = "audit_log";
pub const VERTICE_EMAIL: &str = "vertice_email";
pub const VERTICE_APIKEY: &str = "vertice_apikey";

// Event data keys.
pub const EMAIL: &str = "email";
pub const PHONE: &str = "phone";
pub const ASSEMBLY_NAME: &str = "assembly_name";
pub const COST: &str = "cost";

