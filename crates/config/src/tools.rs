//! Per-language correction tool chains
//!
//! Each language owns one [`LanguageChain`]. Roles are typed fields rather
//! than dictionary keys, so a missing secondary or fallback tool is an
//! explicit `None` and the attempt order is fixed by [`LanguageChain::plan`].

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use syntaxfix_core::{Error, Language, Result, ToolRole};

/// An external command run as `program args... <file>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

/// A remote correction endpoint accepting JSON over HTTP
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSpec {
    pub endpoint: String,
}

/// How a tool is invoked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolInvocation {
    Command(CommandSpec),
    Remote(RemoteSpec),
    /// In-process heuristic over language-characteristic patterns
    Patterns(Vec<String>),
}

/// One step of a fallback chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSpec {
    pub role: ToolRole,
    pub invocation: ToolInvocation,
}

impl ToolSpec {
    /// Human readable identifier used in outcome details and logs
    pub fn id(&self) -> String {
        match &self.invocation {
            ToolInvocation::Command(command) => command.program.clone(),
            ToolInvocation::Remote(remote) => remote.endpoint.clone(),
            ToolInvocation::Patterns(_) => "pattern_heuristic".to_string(),
        }
    }
}

impl fmt::Display for ToolSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id(), self.role)
    }
}

/// Ordered correction capabilities for one language
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageChain {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<CommandSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<CommandSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<CommandSpec>,
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl LanguageChain {
    /// Attempt order for one file. The remote step leads the chain only when
    /// requested and configured; the pattern heuristic always closes it.
    pub fn plan(&self, include_remote: bool) -> Vec<ToolSpec> {
        let mut steps = Vec::with_capacity(5);

        if include_remote {
            if let Some(remote) = &self.remote {
                steps.push(ToolSpec {
                    role: ToolRole::Remote,
                    invocation: ToolInvocation::Remote(remote.clone()),
                });
            }
        }

        let local = [
            (ToolRole::Primary, &self.primary),
            (ToolRole::Secondary, &self.secondary),
            (ToolRole::Fallback, &self.fallback),
        ];
        for (role, command) in local {
            if let Some(command) = command {
                steps.push(ToolSpec {
                    role,
                    invocation: ToolInvocation::Command(command.clone()),
                });
            }
        }

        steps.push(ToolSpec {
            role: ToolRole::PatternBased,
            invocation: ToolInvocation::Patterns(self.patterns.clone()),
        });
        steps
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Check patterns compile and endpoints parse
    pub fn validate(&self, language: Language) -> Result<()> {
        for pattern in &self.patterns {
            Regex::new(pattern).map_err(|e| {
                Error::configuration(format!("invalid {language} pattern '{pattern}': {e}"))
            })?;
        }
        if let Some(remote) = &self.remote {
            let url = url::Url::parse(&remote.endpoint).map_err(|e| {
                Error::configuration(format!(
                    "invalid {language} remote endpoint '{}': {e}",
                    remote.endpoint
                ))
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(Error::configuration(format!(
                    "remote endpoint for {language} must be http(s), got '{}'",
                    url.scheme()
                )));
            }
        }
        for command in [&self.primary, &self.secondary, &self.fallback]
            .into_iter()
            .flatten()
        {
            if command.program.trim().is_empty() {
                return Err(Error::configuration(format!(
                    "empty program name in {language} tool chain"
                )));
            }
        }
        Ok(())
    }
}

/// Registry of tool chains keyed by language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolRegistry {
    chains: BTreeMap<Language, LanguageChain>,
}

impl ToolRegistry {
    /// A registry with no chains; every file is `unsupported_language`
    pub fn empty() -> Self {
        Self {
            chains: BTreeMap::new(),
        }
    }

    pub fn get(&self, language: Language) -> Option<&LanguageChain> {
        self.chains.get(&language)
    }

    /// Replace the chain for `language`
    pub fn insert(&mut self, language: Language, chain: LanguageChain) -> Option<LanguageChain> {
        self.chains.insert(language, chain)
    }

    pub fn remove(&mut self, language: Language) -> Option<LanguageChain> {
        self.chains.remove(&language)
    }

    pub fn languages(&self) -> impl Iterator<Item = Language> + '_ {
        self.chains.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Overlay chains from another registry, replacing whole languages
    pub fn merge(&mut self, other: ToolRegistry) {
        self.chains.extend(other.chains);
    }

    pub fn validate(&self) -> Result<()> {
        for (language, chain) in &self.chains {
            chain.validate(*language)?;
        }
        Ok(())
    }
}

const PYTHON_MISSING_COLON: &str =
    r"(?m)^[ \t]*(?:if|elif|else|for|while|def|class|try|except|finally|with)\b[^:\n]*$";

impl Default for ToolRegistry {
    fn default() -> Self {
        let c_family = LanguageChain {
            primary: Some(CommandSpec::new("clang-format", ["-i", "-style=Google"])),
            fallback: Some(CommandSpec::new("astyle", ["--style=google"])),
            patterns: vec![r#"#include\s*[<"]"#.into(), r"int\s+main\s*\(".into()],
            ..Default::default()
        };

        let chains = BTreeMap::from([
            (
                Language::JavaScript,
                LanguageChain {
                    primary: Some(CommandSpec::new("eslint", ["--fix", "--quiet"])),
                    fallback: Some(CommandSpec::new("prettier", ["--write"])),
                    patterns: vec![
                        r"var\s+\w+\s*=".into(),
                        r"function\s+\w+\(".into(),
                        r"const\s+\w+\s*=".into(),
                    ],
                    ..Default::default()
                },
            ),
            (
                Language::TypeScript,
                LanguageChain {
                    primary: Some(CommandSpec::new("tsc", ["--noEmit", "--strict"])),
                    fallback: Some(CommandSpec::new(
                        "prettier",
                        ["--write", "--parser", "typescript"],
                    )),
                    patterns: vec![r"interface\s+\w+".into(), r"type\s+\w+\s*=".into()],
                    ..Default::default()
                },
            ),
            (
                Language::Python,
                LanguageChain {
                    primary: Some(CommandSpec::new("black", ["--quiet", "--line-length", "88"])),
                    fallback: Some(CommandSpec::new("autopep8", ["--in-place", "--aggressive"])),
                    patterns: vec![
                        r"def\s+\w+\(".into(),
                        r"class\s+\w+:".into(),
                        r"import\s+\w+".into(),
                        PYTHON_MISSING_COLON.into(),
                    ],
                    ..Default::default()
                },
            ),
            (
                Language::Go,
                LanguageChain {
                    primary: Some(CommandSpec::new("gofmt", ["-w"])),
                    secondary: Some(CommandSpec::new("goimports", ["-w"])),
                    patterns: vec![r"func\s+\w+\(".into(), r"type\s+\w+\s+struct".into()],
                    ..Default::default()
                },
            ),
            (
                Language::Rust,
                LanguageChain {
                    primary: Some(CommandSpec::new("rustfmt", ["--edition", "2021"])),
                    patterns: vec![r"fn\s+\w+\(".into(), r"struct\s+\w+".into()],
                    ..Default::default()
                },
            ),
            (
                Language::Java,
                LanguageChain {
                    primary: Some(CommandSpec::new("google-java-format", ["--replace"])),
                    fallback: Some(CommandSpec::new("astyle", ["--style=java"])),
                    patterns: vec![r"public\s+class\s+\w+".into()],
                    ..Default::default()
                },
            ),
            (Language::Cpp, c_family),
        ]);

        Self { chains }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_covers_every_language() {
        let registry = ToolRegistry::default();
        for language in Language::ALL {
            let chain = registry.get(language).expect("chain registered");
            assert!(chain.primary.is_some(), "{language} has a primary tool");
            assert!(!chain.patterns.is_empty(), "{language} has patterns");
        }
        registry.validate().unwrap();
    }

    #[test]
    fn test_plan_order_without_remote() {
        let chain = ToolRegistry::default()
            .get(Language::Go)
            .cloned()
            .unwrap();
        let roles: Vec<_> = chain.plan(true).iter().map(|s| s.role).collect();
        assert_eq!(
            roles,
            vec![ToolRole::Primary, ToolRole::Secondary, ToolRole::PatternBased]
        );
    }

    #[test]
    fn test_plan_puts_remote_first_only_when_requested() {
        let chain = LanguageChain {
            remote: Some(RemoteSpec {
                endpoint: "https://fix.example.com/v1/python".into(),
            }),
            primary: Some(CommandSpec::new("black", Vec::<String>::new())),
            fallback: Some(CommandSpec::new("autopep8", ["--in-place"])),
            ..Default::default()
        };

        let preferred: Vec<_> = chain.plan(true).iter().map(|s| s.role).collect();
        assert_eq!(
            preferred,
            vec![
                ToolRole::Remote,
                ToolRole::Primary,
                ToolRole::Fallback,
                ToolRole::PatternBased
            ]
        );

        let local: Vec<_> = chain.plan(false).iter().map(|s| s.role).collect();
        assert_eq!(
            local,
            vec![ToolRole::Primary, ToolRole::Fallback, ToolRole::PatternBased]
        );
    }

    #[test]
    fn test_empty_chain_still_ends_with_patterns() {
        let plan = LanguageChain::default().plan(true);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].role, ToolRole::PatternBased);
        assert_eq!(plan[0].id(), "pattern_heuristic");
    }

    #[test]
    fn test_validate_rejects_bad_pattern_and_endpoint() {
        let bad_pattern = LanguageChain {
            patterns: vec!["(unclosed".into()],
            ..Default::default()
        };
        assert!(bad_pattern.validate(Language::Python).is_err());

        let bad_endpoint = LanguageChain {
            remote: Some(RemoteSpec {
                endpoint: "ftp://fix.example.com".into(),
            }),
            ..Default::default()
        };
        assert!(bad_endpoint.validate(Language::Go).is_err());
    }

    #[test]
    fn test_python_missing_colon_signature() {
        let re = Regex::new(PYTHON_MISSING_COLON).unwrap();
        let source = "import os\ndef main()\n    if x > 1:\n        pass\nclass Foo:\n";
        assert_eq!(re.find_iter(source).count(), 1);
    }

    #[test]
    fn test_registry_deserializes_from_language_map() {
        let json = r#"{
            "python": { "primary": { "program": "ruff", "args": ["format"] }, "patterns": ["def\\s+"] }
        }"#;
        let registry: ToolRegistry = serde_json::from_str(json).unwrap();
        let chain = registry.get(Language::Python).unwrap();
        assert_eq!(chain.primary.as_ref().unwrap().program, "ruff");
        assert!(chain.fallback.is_none());
        assert!(registry.get(Language::Go).is_none());
    }
}
