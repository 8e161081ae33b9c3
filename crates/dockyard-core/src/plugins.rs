/// Plugins that ship inside the application image. Cloning one of them again
/// from a config makes the build fail.
pub const BUNDLED_PLUGINS: &[&str] = &[
    "discourse-reactions",
    "discourse-apple-auth",
    "discourse-login-with-amazon",
    "discourse-lti",
    "discourse-microsoft-auth",
    "discourse-oauth2-basic",
    "discourse-openid-connect",
    "discourse-zendesk-plugin",
    "discourse-patreon",
    "discourse-graphviz",
    "discourse-rss-polling",
    "discourse-math",
    "discourse-chat-integration",
    "discourse-data-explorer",
    "discourse-post-voting",
    "discourse-user-notes",
    "discourse-staff-notes",
    "discourse-assign",
    "discourse-subscriptions",
    "discourse-hcaptcha",
    "discourse-gamification",
    "discourse-calendar",
    "discourse-question-answer",
    "discourse-adplugin",
    "discourse-affiliate",
    "discourse-github",
    "discourse-templates",
    "discourse-topic-voting",
    "discourse-policy",
    "discourse-solved",
    "discourse-ai",
];

/// Best-effort classification of a failed build's output.
///
/// Returns the bundled plugin whose clone target `plugins/<name>` is reported
/// as already existing, if any.
pub fn detect_bundled_plugin(output: &str) -> Option<&'static str> {
    output
        .lines()
        .filter(|line| line.contains("already exists"))
        .find_map(|line| {
            BUNDLED_PLUGINS
                .iter()
                .copied()
                .find(|plugin| mentions_plugin_dir(line, plugin))
        })
}

fn mentions_plugin_dir(line: &str, plugin: &str) -> bool {
    let needle = format!("plugins/{plugin}");
    line.match_indices(&needle).any(|(at, _)| {
        !matches!(
            line[at + needle.len()..].chars().next(),
            Some(c) if c.is_ascii_alphanumeric() || c == '-' || c == '_'
        )
    })
}
