//! Mapping from the file/env config to each component's settings.

use std::time::Duration;

use hermes_agent::{DispatcherSettings, FollowUpSettings};
use hermes_channels::SplitSettings;
use hermes_config::HermesConfig;
use hermes_logging::LogSettings;
use hermes_relay::RelaySettings;
use hermes_scheduler::PollPolicy;

pub fn relay_settings(config: &HermesConfig) -> RelaySettings {
    let c = &config.completion;
    RelaySettings {
        mode: c.mode,
        api_key: c.api_key.clone().unwrap_or_default(),
        base_url: c.base_url.clone(),
        model: c.model.clone(),
        max_tokens: c.max_tokens,
        temperature: c.temperature,
        request_timeout: Duration::from_secs(c.request_timeout_secs),
        assistant_id: c.assistant_id.clone(),
        poll: PollPolicy::new(
            Duration::from_millis(c.poll_interval_ms),
            c.poll_max_attempts,
        ),
    }
}

pub fn dispatcher_settings(config: &HermesConfig) -> DispatcherSettings {
    let follow_up = (config.follow_up.after_messages > 0).then(|| FollowUpSettings {
        after_messages: config.follow_up.after_messages,
        delay: Duration::from_secs(config.follow_up.delay_secs),
        text: config.follow_up.text.clone(),
    });
    DispatcherSettings {
        instructions: config.prompt.instructions.clone(),
        context_turns: config.session.context_turns,
        retention_turns: config.session.retention_turns,
        command_prefix: config.telegram.command_prefix,
        fallback_text: config.prompt.fallback_text.clone(),
        follow_up,
    }
}

pub fn split_settings(config: &HermesConfig) -> Option<SplitSettings> {
    config.reply.split.then(|| SplitSettings {
        target_chars: config.reply.target_chars,
        delay: Duration::from_millis(config.reply.delay_ms),
    })
}

pub fn log_settings(config: &HermesConfig) -> LogSettings {
    LogSettings {
        level: config.logging.level.clone(),
        dir: config.logging.dir.clone(),
        json: config.logging.json,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::CompletionMode;

    #[test]
    fn maps_polling_and_mode() {
        let mut config = HermesConfig::default();
        config.completion.mode = CompletionMode::Assistants;
        config.completion.poll_interval_ms = 250;
        config.completion.poll_max_attempts = 8;
        config.completion.assistant_id = Some("asst_1".into());

        let relay = relay_settings(&config);
        assert_eq!(relay.mode, CompletionMode::Assistants);
        assert_eq!(relay.poll.interval, Duration::from_millis(250));
        assert_eq!(relay.poll.max_attempts, 8);
        assert_eq!(relay.poll.ceiling(), Duration::from_secs(2));
        assert_eq!(relay.assistant_id.as_deref(), Some("asst_1"));
    }

    #[test]
    fn follow_up_disabled_at_zero() {
        let config = HermesConfig::default();
        assert!(dispatcher_settings(&config).follow_up.is_none());

        let mut config = HermesConfig::default();
        config.follow_up.after_messages = 3;
        let follow_up = dispatcher_settings(&config).follow_up.unwrap();
        assert_eq!(follow_up.after_messages, 3);
    }

    #[test]
    fn split_only_when_enabled() {
        let mut config = HermesConfig::default();
        assert!(split_settings(&config).is_none());
        config.reply.split = true;
        assert_eq!(split_settings(&config).unwrap().target_chars, 100);
    }
}
