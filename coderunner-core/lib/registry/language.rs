use std::{fmt, str::FromStr, sync::LazyLock};

use coderunner_utils::GUEST_WORKDIR;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::CoderunnerError;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

static JAVA_PUBLIC_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"public\s+class\s+(\w+)").expect("valid java class pattern"));

const DEFAULT_JAVA_CLASS: &str = "Main";

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A language submissions can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Python 3.11
    Python,
    /// Java 17
    Java,
    /// C++17 compiled with GCC 13
    Cpp,
}

/// How a submission is placed in and started inside its container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    /// File name of the source under the guest working directory.
    pub file_name: String,

    /// The command the container runs. Stdin is attached to it directly.
    pub command: Vec<String>,
}

/// Public description of a supported language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageInfo {
    /// The language tag accepted by the API.
    pub id: &'static str,

    /// Human readable name.
    pub name: &'static str,

    /// Toolchain version.
    pub version: &'static str,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Language {
    /// Every supported language in listing order.
    pub const ALL: [Language; 3] = [Language::Python, Language::Java, Language::Cpp];

    /// The language tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::Java => "java",
            Self::Cpp => "cpp",
        }
    }

    /// The public description of the language.
    pub fn info(&self) -> LanguageInfo {
        let (name, version) = match self {
            Self::Python => ("Python", "3.11"),
            Self::Java => ("Java", "17"),
            Self::Cpp => ("C++", "C++17"),
        };

        LanguageInfo {
            id: self.as_str(),
            name,
            version,
        }
    }

    /// Guesses the language from a file extension.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "py" => Some(Self::Python),
            "java" => Some(Self::Java),
            "cpp" | "cc" | "cxx" | "c++" => Some(Self::Cpp),
            _ => None,
        }
    }

    /// Builds the launch plan for a submission.
    pub fn launch_plan(&self, source: &str) -> LaunchPlan {
        match self {
            Self::Python => LaunchPlan {
                file_name: "main.py".to_string(),
                command: shell(format!("python3 {}/main.py", GUEST_WORKDIR)),
            },
            Self::Java => {
                let class = java_class_name(source);
                LaunchPlan {
                    file_name: format!("{}.java", class),
                    command: shell(format!(
                        "cp {dir}/{class}.java /tmp/ && cd /tmp && javac {class}.java && java {class}",
                        dir = GUEST_WORKDIR,
                        class = class
                    )),
                }
            }
            Self::Cpp => LaunchPlan {
                file_name: "main.cpp".to_string(),
                command: shell(format!(
                    "g++ -o /tmp/main {}/main.cpp && /tmp/main",
                    GUEST_WORKDIR
                )),
            },
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Returns the name of the first public class, which javac requires to match the file name.
pub fn java_class_name(source: &str) -> &str {
    JAVA_PUBLIC_CLASS
        .captures(source)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(DEFAULT_JAVA_CLASS)
}

fn shell(script: String) -> Vec<String> {
    vec!["/bin/sh".to_string(), "-c".to_string(), script]
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Language {
    type Err = CoderunnerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "python" => Ok(Self::Python),
            "java" => Ok(Self::Java),
            "cpp" | "c++" => Ok(Self::Cpp),
            _ => Err(CoderunnerError::UnsupportedLanguage(s.to_string())),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_parsing() {
        assert_eq!("python".parse::<Language>().unwrap(), Language::Python);
        assert_eq!("CPP".parse::<Language>().unwrap(), Language::Cpp);
        assert_eq!("c++".parse::<Language>().unwrap(), Language::Cpp);
        assert!(matches!(
            "ruby".parse::<Language>(),
            Err(CoderunnerError::UnsupportedLanguage(tag)) if tag == "ruby"
        ));
    }

    #[test]
    fn test_java_class_name_detection() {
        let source = "import java.util.*;\npublic class Solution {\n}\n";
        assert_eq!(java_class_name(source), "Solution");
        assert_eq!(java_class_name("class Hidden {}"), "Main");

        let plan = Language::Java.launch_plan(source);
        assert_eq!(plan.file_name, "Solution.java");
        assert!(plan.command[2].ends_with("javac Solution.java && java Solution"));
    }

    #[test]
    fn test_cpp_plan_compiles_then_runs() {
        let plan = Language::Cpp.launch_plan("int main() {}");
        assert_eq!(plan.file_name, "main.cpp");
        assert_eq!(
            plan.command,
            vec![
                "/bin/sh".to_string(),
                "-c".to_string(),
                "g++ -o /tmp/main /app/main.cpp && /tmp/main".to_string()
            ]
        );
    }

    #[test]
    fn test_extension_mapping() {
        assert_eq!(Language::from_extension("PY"), Some(Language::Python));
        assert_eq!(Language::from_extension("cc"), Some(Language::Cpp));
        assert_eq!(Language::from_extension("rs"), None);
    }
}
