//! Fix suggestion database for opsyield errors.
//!
//! Provides actionable fix suggestions mapped to specific error types,
//! including commands, context explanations, and prevention tips.

// =============================================================================
// Fix Suggestion Types
// =============================================================================

/// A fix suggestion for an error.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FixSuggestion {
    /// Fix commands in order of preference, copy-paste ready.
    pub commands: Vec<String>,

    /// Explanation of why this error occurred.
    pub context: String,

    /// Tips to prevent this error in the future.
    pub prevention: Option<String>,

    /// Link to documentation for more information.
    pub doc_url: Option<String>,
}

impl FixSuggestion {
    /// Creates a new fix suggestion with required fields.
    #[must_use]
    pub fn new(commands: Vec<String>, context: impl Into<String>) -> Self {
        Self {
            commands,
            context: context.into(),
            prevention: None,
            doc_url: None,
        }
    }

    /// Builder: adds prevention tips.
    #[must_use]
    pub fn with_prevention(mut self, prevention: impl Into<String>) -> Self {
        self.prevention = Some(prevention.into());
        self
    }

    /// Builder: adds documentation URL.
    #[must_use]
    pub fn with_doc_url(mut self, url: impl Into<String>) -> Self {
        self.doc_url = Some(url.into());
        self
    }
}

// =============================================================================
// Cloud CLI Helpers
// =============================================================================

/// Returns installation commands for a cloud CLI.
#[must_use]
pub fn install_commands_for_cli(name: &str) -> Vec<String> {
    match name.to_lowercase().as_str() {
        "gcloud" | "bq" | "gcp" => vec![
            "curl https://sdk.cloud.google.com | bash".to_string(),
            "# Or via homebrew: brew install --cask google-cloud-sdk".to_string(),
        ],
        "aws" => vec![
            "pip install awscli".to_string(),
            "# Or via homebrew: brew install awscli".to_string(),
        ],
        "az" | "azure" => vec![
            "curl -sL https://aka.ms/InstallAzureCLIDeb | sudo bash".to_string(),
            "# Or via homebrew: brew install azure-cli".to_string(),
        ],
        _ => vec![format!(
            "# Install {name} following its official documentation"
        )],
    }
}

/// Returns documentation URL for a cloud CLI.
#[must_use]
pub fn install_doc_for_cli(name: &str) -> Option<String> {
    match name.to_lowercase().as_str() {
        "gcloud" | "bq" | "gcp" => Some("https://cloud.google.com/sdk/docs/install".to_string()),
        "aws" => Some(
            "https://docs.aws.amazon.com/cli/latest/userguide/getting-started-install.html"
                .to_string(),
        ),
        "az" | "azure" => {
            Some("https://learn.microsoft.com/cli/azure/install-azure-cli".to_string())
        }
        _ => None,
    }
}

/// Returns the login command for a cloud CLI.
#[must_use]
pub fn login_command_for_cli(name: &str) -> String {
    match name.to_lowercase().as_str() {
        "gcloud" | "bq" | "gcp" => "gcloud auth login".to_string(),
        "aws" => "aws configure".to_string(),
        "az" | "azure" => "az login".to_string(),
        other => format!("# Authenticate {other} following its documentation"),
    }
}

// =============================================================================
// Suggestion Generators
// =============================================================================

/// Suggestions for an unregistered provider name.
#[must_use]
pub fn unknown_provider_suggestions(name: &str, valid: &str) -> Vec<FixSuggestion> {
    vec![FixSuggestion::new(
        vec![
            "opsyield analyze --provider gcp".to_string(),
            "opsyield status".to_string(),
        ],
        format!("'{name}' is not a known provider. Known providers: {valid}."),
    )]
}

/// Suggestions for configuration problems.
#[must_use]
pub fn config_suggestions(message: &str) -> Vec<FixSuggestion> {
    vec![
        FixSuggestion::new(
            vec![
                "# Check the file at $OPSYIELD_CONFIG or the default config path".to_string(),
            ],
            format!("The configuration could not be used: {message}."),
        )
        .with_prevention("Keep `days` between 1 and 365 and use provider names gcp, aws or azure."),
    ]
}

/// Suggestions for a cloud CLI missing from PATH.
#[must_use]
pub fn cli_not_found_suggestions(name: &str) -> Vec<FixSuggestion> {
    let mut suggestion = FixSuggestion::new(
        install_commands_for_cli(name),
        format!("The `{name}` CLI is not installed or not on PATH."),
    )
    .with_prevention("Run `opsyield status` to see which cloud CLIs are available.");
    if let Some(url) = install_doc_for_cli(name) {
        suggestion = suggestion.with_doc_url(url);
    }
    vec![suggestion]
}

/// Suggestions when a cloud CLI rejected a call, usually for lack of credentials.
#[must_use]
pub fn auth_suggestions(program: &str) -> Vec<FixSuggestion> {
    vec![FixSuggestion::new(
        vec![login_command_for_cli(program), "opsyield status".to_string()],
        format!(
            "`{program}` returned an error. The session may be missing, expired, or \
             lack billing permissions."
        ),
    )]
}

/// Suggestions for a provider call that exceeded its time bound.
#[must_use]
pub fn timeout_suggestions(provider: &str, seconds: u64) -> Vec<FixSuggestion> {
    vec![
        FixSuggestion::new(
            vec!["opsyield status".to_string()],
            format!(
                "The {provider} provider did not respond within {seconds}s. The cloud CLI \
                 may be waiting on a prompt or a slow network."
            ),
        )
        .with_prevention("Check network connectivity and that the CLI does not prompt for input."),
    ]
}

/// Suggestions for adapter construction or call failures.
#[must_use]
pub fn provider_failure_suggestions(provider: &str) -> Vec<FixSuggestion> {
    vec![FixSuggestion::new(
        vec![
            "opsyield status".to_string(),
            login_command_for_cli(provider),
        ],
        format!(
            "The {provider} adapter failed. Its data was left out of the result; \
             check authentication and provider settings."
        ),
    )]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fix_suggestion_builder() {
        let suggestion = FixSuggestion::new(vec!["cmd1".to_string()], "Test context")
            .with_prevention("Prevent tip")
            .with_doc_url("https://example.com");

        assert_eq!(suggestion.commands, vec!["cmd1"]);
        assert_eq!(suggestion.context, "Test context");
        assert_eq!(suggestion.prevention, Some("Prevent tip".to_string()));
        assert_eq!(suggestion.doc_url, Some("https://example.com".to_string()));
    }

    #[test]
    fn install_commands_for_cloud_clis() {
        assert!(install_commands_for_cli("aws").iter().any(|c| c.contains("awscli")));
        assert!(!install_commands_for_cli("gcloud").is_empty());
        assert!(!install_commands_for_cli("unknown_tool").is_empty());
    }

    #[test]
    fn install_docs_for_cloud_clis() {
        assert!(install_doc_for_cli("az").is_some());
        assert!(install_doc_for_cli("bq").is_some());
        assert!(install_doc_for_cli("oracle").is_none());
    }

    #[test]
    fn timeout_suggestions_include_provider() {
        let suggestions = timeout_suggestions("aws", 20);
        assert!(suggestions[0].context.contains("aws"));
        assert!(suggestions[0].context.contains("20"));
    }

    #[test]
    fn cli_not_found_has_doc_url() {
        let suggestions = cli_not_found_suggestions("gcloud");
        assert!(suggestions[0].doc_url.is_some());
        assert!(suggestions[0].commands.iter().any(|c| c.contains("sdk")));
    }

    #[test]
    fn auth_suggestions_use_provider_login() {
        let suggestions = auth_suggestions("az");
        assert_eq!(suggestions[0].commands[0], "az login");
    }
}
