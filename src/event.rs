use serde::Deserialize;
use serde_json::Value;

/// Raw webhook envelope as delivered by the upstream registry.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub event: String,
    #[serde(default)]
    pub data: Value,
    pub meta: Meta,
}

#[derive(Debug, Deserialize)]
pub struct Meta {
    pub monitor_id: String,
}

/// One inbound monitoring event, decoded into its kind-specific shape.
/// Constructed once per request and consumed only by the formatter.
#[derive(Debug)]
pub struct WebhookEvent {
    pub monitor_id: String,
    pub kind: EventKind,
}

#[derive(Debug)]
pub enum EventKind {
    NewTweet(TweetPayload),
    /// The payload is the followed user's record.
    NewFollow(UserPayload),
    ProfileUpdate(ProfilePayload),
    /// Unrecognized event kind, carried through for a generic notification.
    Unknown(String),
}

#[derive(Debug, Default, Deserialize)]
pub struct TweetPayload {
    #[serde(default)]
    pub full_text: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub id_str: Option<String>,
    #[serde(default)]
    pub user: Option<TweetUser>,
    #[serde(default)]
    pub tweet_created_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub entities: Option<Entities>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TweetUser {
    #[serde(default)]
    pub screen_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Entities {
    #[serde(default)]
    pub user_mentions: Vec<Mention>,
    #[serde(default)]
    pub hashtags: Vec<Hashtag>,
}

#[derive(Debug, Deserialize)]
pub struct Mention {
    #[serde(default)]
    pub screen_name: String,
}

#[derive(Debug, Deserialize)]
pub struct Hashtag {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserPayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub screen_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub followers_count: Option<u64>,
    #[serde(default)]
    pub friends_count: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfilePayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl WebhookEvent {
    /// Decode an envelope into a typed event. Total: unrecognized kinds map
    /// to `Unknown`, and undecodable kind-specific data degrades to an empty
    /// payload so a best-effort notification still goes out.
    pub fn from_envelope(envelope: Envelope) -> Self {
        let kind = match envelope.event.as_str() {
            "new_tweet" => {
                EventKind::NewTweet(decode_or_default(envelope.data))
            }
            "new_following" => {
                EventKind::NewFollow(decode_or_default(envelope.data))
            }
            "profile_update" => {
                EventKind::ProfileUpdate(decode_or_default(envelope.data))
            }
            other => EventKind::Unknown(other.to_string()),
        };

        Self {
            monitor_id: envelope.meta.monitor_id,
            kind,
        }
    }
}

fn decode_or_default<T: Default + serde::de::DeserializeOwned>(data: Value) -> T {
    serde_json::from_value(data).unwrap_or_default()
}
