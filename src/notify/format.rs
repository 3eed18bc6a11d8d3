use crate::event::{EventKind, ProfilePayload, TweetPayload, UserPayload, WebhookEvent};

/// One notification in both renditions. `plain` is always derived from
/// `rich` by `strip_tags`, so the two can never diverge in content.
#[derive(Debug, Clone)]
pub struct NotificationMessage {
    pub rich: String,
    pub plain: String,
}

impl NotificationMessage {
    pub fn from_rich(rich: String) -> Self {
        let plain = strip_tags(&rich);
        Self { rich, plain }
    }
}

/// Remove markup tags, keeping everything outside them. Total and pure;
/// output contains no `<` and stripping is idempotent.
pub fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for c in input.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

/// Render one webhook event as a notification. Never fails: missing or
/// malformed fields degrade to placeholder text.
pub fn format(event: &WebhookEvent) -> NotificationMessage {
    let mut msg = match &event.kind {
        EventKind::NewTweet(tweet) => format_new_tweet(tweet),
        EventKind::NewFollow(user) => format_new_follow(user),
        EventKind::ProfileUpdate(profile) => format_profile_update(profile),
        EventKind::Unknown(kind) => format!("ℹ️ <b>Event \"{}\" received.</b>\n", kind),
    };

    msg.push_str(&format!("\n<b>Monitor ID:</b> {}", event.monitor_id));

    NotificationMessage::from_rich(msg)
}

fn format_new_tweet(tweet: &TweetPayload) -> String {
    let text = tweet
        .full_text
        .as_deref()
        .or(tweet.text.as_deref())
        .unwrap_or("No tweet text available.");
    let handle = tweet
        .user
        .as_ref()
        .and_then(|u| u.screen_name.as_deref())
        .unwrap_or("unknown");
    let id = tweet.id_str.as_deref().unwrap_or("unknown");
    let url = format!("https://twitter.com/{}/status/{}", handle, id);
    let created = tweet
        .tweet_created_at
        .as_deref()
        .or(tweet.created_at.as_deref())
        .unwrap_or("unknown");

    let mut msg = format!("🐦 <b>New Tweet from @{}</b>\n", handle);
    msg.push_str(&format!("<b>Tweet:</b> {}\n", text));
    msg.push_str(&format!("<b>Link:</b> <a href=\"{}\">{}</a>\n", url, url));
    msg.push_str(&format!("<b>Created:</b> {}\n", created));

    if let Some(entities) = &tweet.entities {
        if !entities.user_mentions.is_empty() {
            let mentions: Vec<String> = entities
                .user_mentions
                .iter()
                .map(|m| format!("@{}", m.screen_name))
                .collect();
            msg.push_str(&format!("<b>Mentions:</b> {}\n", mentions.join(", ")));
        }
        if !entities.hashtags.is_empty() {
            let hashtags: Vec<String> = entities
                .hashtags
                .iter()
                .map(|h| format!("#{}", h.text))
                .collect();
            msg.push_str(&format!("<b>Hashtags:</b> {}\n", hashtags.join(", ")));
        }
    }

    msg
}

fn format_new_follow(user: &UserPayload) -> String {
    let name = user.name.as_deref().unwrap_or("unknown");
    let screen_name = user.screen_name.as_deref().unwrap_or("unknown");
    let description = user.description.as_deref().unwrap_or("No description");

    let mut msg = String::from("🤝 <b>New Following</b>\n");
    msg.push_str(&format!("<b>Name:</b> {}\n", name));
    msg.push_str(&format!(
        "<b>Twitter:</b> <a href=\"https://twitter.com/{}\">@{}</a>\n",
        screen_name, screen_name
    ));
    msg.push_str(&format!("<b>Description:</b> {}\n", description));
    if let Some(url) = &user.url {
        msg.push_str(&format!("<b>Link:</b> {}\n", url));
    }
    msg.push_str(&format!(
        "<b>Followers:</b> {}\n",
        user.followers_count.unwrap_or(0)
    ));
    msg.push_str(&format!(
        "<b>Following:</b> {}\n",
        user.friends_count.unwrap_or(0)
    ));

    msg
}

fn format_profile_update(profile: &ProfilePayload) -> String {
    let name = profile.name.as_deref().unwrap_or("unknown");
    let bio = profile.description.as_deref().unwrap_or("No bio");
    let location = profile.location.as_deref().unwrap_or("No location");

    let mut msg = String::from("🔄 <b>Profile Update</b>\n");
    msg.push_str(&format!("<b>Name:</b> {}\n", name));
    msg.push_str(&format!("<b>Bio:</b> {}\n", bio));
    msg.push_str(&format!("<b>Location:</b> {}\n", location));
    if let Some(url) = &profile.url {
        msg.push_str(&format!("<b>Website:</b> {}\n", url));
    }

    msg
}
