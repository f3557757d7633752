use std::collections::BTreeMap;

use serde::Serialize;

use crate::{config::RunnerConfig, CoderunnerError, CoderunnerResult};

use super::{Language, LanguageInfo};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

const PYTHON_DOCKERFILE: &str = include_str!("../../dockerfiles/Dockerfile.python");
const JAVA_DOCKERFILE: &str = include_str!("../../dockerfiles/Dockerfile.java");
const CPP_DOCKERFILE: &str = include_str!("../../dockerfiles/Dockerfile.cpp");

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A pre-built execution environment selected by language tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SandboxImage {
    /// The language this image runs.
    pub language: Language,

    /// The image reference containers are started from.
    pub image_ref: String,

    /// The image's default command.
    pub entrypoint: Vec<String>,

    /// The Dockerfile the image is built from.
    #[serde(skip)]
    pub dockerfile: &'static str,
}

/// The facts about an image that can be read off its Dockerfile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageDefinition {
    /// The `FROM` reference.
    pub base: String,

    /// Users created by `RUN useradd`/`adduser`, with their uid when given.
    pub created_users: Vec<(String, Option<u32>)>,

    /// The last `WORKDIR`.
    pub workdir: Option<String>,

    /// The last `USER`.
    pub user: Option<String>,

    /// The `CMD` in exec form.
    pub cmd: Vec<String>,

    /// Ports from `EXPOSE`.
    pub exposed_ports: Vec<String>,

    /// Keys set by `ENV`.
    pub env: Vec<String>,

    /// Paths from `VOLUME`.
    pub volumes: Vec<String>,
}

/// Maps languages to the images their submissions run in.
#[derive(Debug, Clone)]
pub struct ImageRegistry {
    images: BTreeMap<Language, SandboxImage>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl SandboxImage {
    /// The image shipped for a language, tagged `codezy-<language>-runner:latest`.
    pub fn builtin(language: Language) -> Self {
        let dockerfile = match language {
            Language::Python => PYTHON_DOCKERFILE,
            Language::Java => JAVA_DOCKERFILE,
            Language::Cpp => CPP_DOCKERFILE,
        };

        Self {
            language,
            image_ref: format!("codezy-{}-runner:latest", language.as_str()),
            entrypoint: ImageDefinition::parse(dockerfile).cmd,
            dockerfile,
        }
    }

    /// Parses the Dockerfile this image is built from.
    pub fn definition(&self) -> ImageDefinition {
        ImageDefinition::parse(self.dockerfile)
    }
}

impl ImageDefinition {
    /// Reads the instructions relevant to sandboxing from a Dockerfile.
    ///
    /// Line continuations and multi-stage builds are not interpreted; the shipped Dockerfiles do
    /// not use them.
    pub fn parse(dockerfile: &str) -> Self {
        let mut definition = Self::default();

        for line in dockerfile.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (instruction, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
            let rest = rest.trim();

            match instruction.to_ascii_uppercase().as_str() {
                "FROM" => definition.base = rest.to_string(),
                "WORKDIR" => definition.workdir = Some(rest.to_string()),
                "USER" => definition.user = Some(rest.to_string()),
                "CMD" => definition.cmd = parse_command(rest),
                "EXPOSE" => definition
                    .exposed_ports
                    .extend(rest.split_whitespace().map(str::to_string)),
                "ENV" => definition.env.extend(
                    rest.split_whitespace()
                        .next()
                        .map(|kv| kv.split('=').next().unwrap_or(kv).to_string()),
                ),
                "VOLUME" => definition.volumes.extend(parse_command(rest)),
                "RUN" => {
                    if let Some(user) = parse_user_creation(rest) {
                        definition.created_users.push(user);
                    }
                }
                _ => {}
            }
        }

        definition
    }

    /// Whether the image drops to a non-root identity by default.
    pub fn runs_as_non_root(&self) -> bool {
        match self.user.as_deref() {
            None => false,
            Some(user) => {
                let name = user.split(':').next().unwrap_or(user);
                name != "root" && name != "0"
            }
        }
    }
}

impl ImageRegistry {
    /// Creates a registry holding the shipped images with the configured overrides applied.
    pub fn from_config(config: &RunnerConfig) -> Self {
        let mut registry = Self::default();
        for (language, image_ref) in config.get_image_overrides() {
            registry = registry.with_image(*language, image_ref.clone());
        }
        registry
    }

    /// Replaces the image reference used for a language.
    pub fn with_image(mut self, language: Language, image_ref: impl Into<String>) -> Self {
        let image = self
            .images
            .entry(language)
            .or_insert_with(|| SandboxImage::builtin(language));
        image.image_ref = image_ref.into();
        self
    }

    /// Looks up the image for a language.
    pub fn get(&self, language: Language) -> CoderunnerResult<&SandboxImage> {
        self.images
            .get(&language)
            .ok_or_else(|| CoderunnerError::UnsupportedLanguage(language.to_string()))
    }

    /// Iterates over the registered images in language order.
    pub fn iter(&self) -> impl Iterator<Item = &SandboxImage> {
        self.images.values()
    }

    /// Describes the registered languages.
    pub fn languages(&self) -> Vec<LanguageInfo> {
        self.images.keys().map(Language::info).collect()
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Default for ImageRegistry {
    fn default() -> Self {
        Self {
            images: Language::ALL
                .into_iter()
                .map(|language| (language, SandboxImage::builtin(language)))
                .collect(),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Functions: Helpers
//--------------------------------------------------------------------------------------------------

fn parse_command(rest: &str) -> Vec<String> {
    if rest.starts_with('[') {
        if let Ok(args) = serde_json::from_str::<Vec<String>>(rest) {
            return args;
        }
    }
    rest.split_whitespace().map(str::to_string).collect()
}

fn parse_user_creation(run: &str) -> Option<(String, Option<u32>)> {
    let tokens: Vec<&str> = run.split_whitespace().collect();
    let start = tokens
        .iter()
        .position(|t| *t == "useradd" || *t == "adduser")?;

    let args = &tokens[start + 1..];
    let end = args
        .iter()
        .position(|t| *t == "&&" || *t == ";")
        .unwrap_or(args.len());
    let args = &args[..end];

    let uid = args
        .iter()
        .position(|t| *t == "-u" || *t == "--uid")
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok());

    let name = args.iter().rev().find(|t| !t.starts_with('-'))?;
    Some((name.to_string(), uid))
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpp_image_definition() {
        let definition = SandboxImage::builtin(Language::Cpp).definition();

        assert_eq!(definition.base, "gcc:13-bookworm");
        assert_eq!(
            definition.created_users,
            vec![("coderunner".to_string(), Some(1000))]
        );
        assert_eq!(definition.user.as_deref(), Some("coderunner"));
        assert!(definition.runs_as_non_root());
        assert_eq!(definition.workdir.as_deref(), Some("/app"));
        assert_eq!(definition.cmd, vec!["g++".to_string()]);
        assert!(definition.exposed_ports.is_empty());
        assert!(definition.env.is_empty());
        assert!(definition.volumes.is_empty());
    }

    #[test]
    fn test_every_shipped_image_is_non_root_in_app() {
        for image in ImageRegistry::default().iter() {
            let definition = image.definition();
            assert!(definition.runs_as_non_root(), "{} runs as root", image.language);
            assert_eq!(definition.workdir.as_deref(), Some("/app"));
            assert!(definition
                .created_users
                .iter()
                .any(|(name, uid)| name == "coderunner" && *uid == Some(1000)));
        }
    }

    #[test]
    fn test_java_adduser_with_flags() {
        let definition = SandboxImage::builtin(Language::Java).definition();
        assert_eq!(definition.base, "eclipse-temurin:17-jdk-alpine");
        assert_eq!(
            definition.created_users,
            vec![("coderunner".to_string(), Some(1000))]
        );
        assert_eq!(definition.cmd, vec!["java".to_string()]);
    }

    #[test]
    fn test_registry_overrides() {
        let registry = ImageRegistry::default().with_image(Language::Cpp, "registry.local/cpp:13");
        assert_eq!(
            registry.get(Language::Cpp).unwrap().image_ref,
            "registry.local/cpp:13"
        );
        assert_eq!(
            registry.get(Language::Python).unwrap().image_ref,
            "codezy-python-runner:latest"
        );

        let ids: Vec<_> = registry.languages().into_iter().map(|l| l.id).collect();
        assert_eq!(ids, vec!["python", "java", "cpp"]);
    }

    #[test]
    fn test_root_user_detection() {
        let definition = ImageDefinition::parse("FROM alpine\nUSER 0:0\n");
        assert!(!definition.runs_as_non_root());
        assert!(!ImageDefinition::parse("FROM alpine\n").runs_as_non_root());
    }
}
