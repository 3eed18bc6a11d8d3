use crate::settings::SettingKey;
use crate::socialdata::MonitorType;

/// Inline-keyboard actions, decoded once at the Telegram boundary.
/// Handle-bearing tokens always carry the handle lower-cased so that later
/// matching against monitor records is case-insensitive by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    StartMonitor,
    StartMonitorType(MonitorType),
    StopMonitor,
    ListMonitors,
    MonitorDetails,
    ViewMonitor(String),
    DeleteMonitor(String),
    SettingsMenu,
    UpdateSetting(SettingKey),
}

impl CallbackAction {
    /// Encode as callback data. Inverse of `parse`.
    pub fn encode(&self) -> String {
        match self {
            CallbackAction::StartMonitor => "start_monitor".to_string(),
            CallbackAction::StartMonitorType(t) => format!("start_monitor_{}", t),
            CallbackAction::StopMonitor => "stop_monitor".to_string(),
            CallbackAction::ListMonitors => "list_monitors".to_string(),
            CallbackAction::MonitorDetails => "monitor_details".to_string(),
            CallbackAction::ViewMonitor(handle) => {
                format!("view_monitor_{}", handle.to_lowercase())
            }
            CallbackAction::DeleteMonitor(handle) => {
                format!("delete_monitor_{}", handle.to_lowercase())
            }
            CallbackAction::SettingsMenu => "settings_menu".to_string(),
            CallbackAction::UpdateSetting(key) => format!("update_setting_{}", key.token()),
        }
    }

    pub fn parse(data: &str) -> Option<Self> {
        // Longest prefixes first: "start_monitor_<type>" shadows "start_monitor".
        if let Some(rest) = data.strip_prefix("start_monitor_") {
            let monitor_type = match rest {
                "user_tweets" => MonitorType::UserTweets,
                "user_following" => MonitorType::UserFollowing,
                "user_profile" => MonitorType::UserProfile,
                _ => return None,
            };
            return Some(CallbackAction::StartMonitorType(monitor_type));
        }
        if let Some(handle) = data.strip_prefix("view_monitor_") {
            return Some(CallbackAction::ViewMonitor(handle.to_lowercase()));
        }
        if let Some(handle) = data.strip_prefix("delete_monitor_") {
            return Some(CallbackAction::DeleteMonitor(handle.to_lowercase()));
        }
        if let Some(token) = data.strip_prefix("update_setting_") {
            return SettingKey::parse(token).map(CallbackAction::UpdateSetting);
        }

        match data {
            "start_monitor" => Some(CallbackAction::StartMonitor),
            "stop_monitor" => Some(CallbackAction::StopMonitor),
            "list_monitors" => Some(CallbackAction::ListMonitors),
            "monitor_details" => Some(CallbackAction::MonitorDetails),
            "settings_menu" => Some(CallbackAction::SettingsMenu),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_parse_roundtrip() {
        let actions = [
            CallbackAction::StartMonitor,
            CallbackAction::StartMonitorType(MonitorType::UserTweets),
            CallbackAction::StartMonitorType(MonitorType::UserFollowing),
            CallbackAction::StartMonitorType(MonitorType::UserProfile),
            CallbackAction::StopMonitor,
            CallbackAction::ListMonitors,
            CallbackAction::MonitorDetails,
            CallbackAction::ViewMonitor("elonmusk".to_string()),
            CallbackAction::DeleteMonitor("elonmusk".to_string()),
            CallbackAction::SettingsMenu,
            CallbackAction::UpdateSetting(crate::settings::SettingKey::AllowedUsers),
        ];
        for action in actions {
            assert_eq!(CallbackAction::parse(&action.encode()), Some(action));
        }
    }

    #[test]
    fn test_handles_are_lowercased() {
        let encoded = CallbackAction::ViewMonitor("ElonMusk".to_string()).encode();
        assert_eq!(encoded, "view_monitor_elonmusk");

        assert_eq!(
            CallbackAction::parse("delete_monitor_ElonMusk"),
            Some(CallbackAction::DeleteMonitor("elonmusk".to_string()))
        );
    }

    #[test]
    fn test_unknown_tokens_rejected() {
        assert_eq!(CallbackAction::parse("pump_fun_disabled"), None);
        assert_eq!(CallbackAction::parse("start_monitor_pump_fun"), None);
        assert_eq!(CallbackAction::parse("update_setting_nope"), None);
        assert_eq!(CallbackAction::parse(""), None);
    }
}
