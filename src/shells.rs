use clap_complete_nushell::Nushell;

use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

use clap::ValueEnum;

use clap_complete::Generator;
use clap_complete::shells;

/// Extended shell support including Nushell
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, ValueEnum)]
#[non_exhaustive]
#[value(rename_all = "lower")]
pub enum Shell {
    /// Bourne Again `SHell` (bash)
    Bash,
    /// Elvish shell  
    Elvish,
    /// Friendly Interactive `SHell` (fish)
    Fish,
    /// `PowerShell`
    PowerShell,
    /// Z `SHell` (zsh)
    Zsh,
    /// Nushell
    Nushell,
}

impl Display for Shell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Shell::Bash => write!(f, "bash"),
            Shell::Elvish => write!(f, "elvish"),
            Shell::Fish => write!(f, "fish"),
            Shell::PowerShell => write!(f, "powershell"),
            Shell::Zsh => write!(f, "zsh"),
            Shell::Nushell => write!(f, "nushell"),
        }
    }
}

impl FromStr for Shell {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bash" => Ok(Shell::Bash),
            "elvish" => Ok(Shell::Elvish),
            "fish" => Ok(Shell::Fish),
            "powershell" => Ok(Shell::PowerShell),
            "zsh" => Ok(Shell::Zsh),
            "nushell" => Ok(Shell::Nushell),
            _ => Err(format!("invalid variant: {s}")),
        }
    }
}

impl Generator for Shell {
    fn file_name(&self, name: &str) -> String {
        match self {
            Shell::Bash => shells::Bash.file_name(name),
            Shell::Elvish => shells::Elvish.file_name(name),
            Shell::Fish => shells::Fish.file_name(name),
            Shell::PowerShell => shells::PowerShell.file_name(name),
            Shell::Zsh => shells::Zsh.file_name(name),
            Shell::Nushell => Nushell.file_name(name),
        }
    }

    fn generate(&self, cmd: &clap::Command, buf: &mut dyn std::io::Write) {
        match self {
            Shell::Bash => shells::Bash.generate(cmd, buf),
            Shell::Elvish => shells::Elvish.generate(cmd, buf),
            Shell::Fish => shells::Fish.generate(cmd, buf),
            Shell::PowerShell => shells::PowerShell.generate(cmd, buf),
            Shell::Zsh => shells::Zsh.generate(cmd, buf),
            Shell::Nushell => Nushell.generate(cmd, buf),
        }
    }
}

impl Shell {
    /// Parse a shell from a path to the executable for the shell
    pub fn from_shell_path<P: AsRef<Path>>(path: P) -> Option<Shell> {
        let path = path.as_ref();
        let name = path.file_stem()?.to_str()?;

        match name {
            "bash" => Some(Shell::Bash),
            "zsh" => Some(Shell::Zsh),
            "fish" => Some(Shell::Fish),
            "elvish" => Some(Shell::Elvish),
            "powershell" | "powershell_ise" => Some(Shell::PowerShell),
            "nu" | "nushell" => Some(Shell::Nushell),
            _ => None,
        }
    }

    /// Determine the user's current shell from the environment
    pub fn from_env() -> Option<Shell> {
        if let Some(env_shell) = std::env::var_os("SHELL") {
            Shell::from_shell_path(env_shell)
        } else if cfg!(windows) {
            Some(Shell::PowerShell)
        } else {
            None
        }
    }

    /// Convert to the standard shell type if possible, for compatibility
    pub fn to_standard_shell(&self) -> Option<shells::Shell> {
        match self {
            Shell::Bash => Some(shells::Shell::Bash),
            Shell::Elvish => Some(shells::Shell::Elvish),
            Shell::Fish => Some(shells::Shell::Fish),
            Shell::PowerShell => Some(shells::Shell::PowerShell),
            Shell::Zsh => Some(shells::Shell::Zsh),
            Shell::Nushell => None, // Not supported by standard shells
        }
    }
}


#[cfg(test)]
mod more_shell_tests {
    // Test framework: Rust built-in test harness (`cargo test`) with #[test]; no external testing libraries detected.
    use super::*;
    use clap::Command;
    use clap_complete::shells;

    #[test]
    fn test_from_str_rejects_aliases_and_whitespace() {
        use std::str::FromStr;
        let cases = [
            "nu",             // alias not supported by FromStr
            " pwsh",          // unsupported alias with leading space
            "pwsh",           // unsupported alias
            "bash ",          // trailing whitespace
            " powerShell ",   // mixed case and surrounding whitespace
            " elvish ",
            " fish ",
            " zsh ",
        ];
        for case in cases {
            let res = <Shell as FromStr>::from_str(case);
            assert!(res.is_err(), "Expected error for input {:?}", case);
            assert_eq!(res.unwrap_err(), format!("invalid variant: {}", case));
        }
    }

    #[test]
    fn test_from_shell_path_recognizes_powershell_ise_and_nushell_exe() {
        assert_eq!(
            Shell::from_shell_path("powershell_ise.exe"),
            Some(Shell::PowerShell)
        );
        assert_eq!(
            Shell::from_shell_path("nushell.exe"),
            Some(Shell::Nushell)
        );
    }

    #[test]
    fn test_from_shell_path_pwsh_not_recognized() {
        assert_eq!(Shell::from_shell_path("pwsh"), None);
        assert_eq!(Shell::from_shell_path("pwsh.exe"), None);
    }

    #[test]
    fn test_from_shell_path_case_sensitivity_for_nu() {
        // Ensure case-sensitive file stem behavior for Nushell detection
        assert_eq!(Shell::from_shell_path("NU"), None);
    }

    #[test]
    fn test_file_name_extensions_by_shell() {
        let name = "comp-test";

        // Shells with well-known completion file extensions
        let cases = [
            (Shell::Bash, ".bash"),
            (Shell::Fish, ".fish"),
            (Shell::Elvish, ".elvish"),
            (Shell::PowerShell, ".ps1"),
        ];
        for (shell, ext) in cases {
            let fname = shell.file_name(name);
            assert!(fname.ends_with(ext), "{:?} file_name should end with {}", shell, ext);
            assert!(fname.contains(name), "Filename should contain app name: {}", fname);
        }

        // Zsh typically uses a leading underscore file (e.g., "_comp-test") but allow .zsh too
        let z = Shell::Zsh.file_name(name);
        assert!(
            z.starts_with('_') || z.ends_with(".zsh"),
            "Zsh filename unexpected: {}",
            z
        );
        assert!(
            z.contains(name) || z.starts_with('_'),
            "Zsh filename should indicate the app name: {}",
            z
        );

        // Nushell should use .nu extension
        let nu = Shell::Nushell.file_name(name);
        assert!(nu.ends_with(".nu"), "Nushell filename should end with .nu; got {}", nu);
        assert!(nu.contains(name), "Nushell filename should contain app name: {}", nu);
    }

    #[test]
    fn test_generate_non_empty_all_shells() {
        let cmd = Command::new("comp-test").bin_name("comp-test");
        for shell in [Shell::Bash, Shell::Elvish, Shell::Fish, Shell::PowerShell, Shell::Zsh, Shell::Nushell] {
            let mut buf = Vec::new();
            shell.generate(&cmd, &mut buf);
            assert!(!buf.is_empty(), "Expected non-empty completion for {:?}", shell);
            let content = String::from_utf8_lossy(&buf);
            if matches!(shell, Shell::Zsh) {
                assert!(
                    content.contains("comp-test") || content.contains("_comp-test"),
                    "Zsh completion should reference the app name or function; got: {}",
                    &*content
                );
            } else {
                assert!(
                    content.contains("comp-test"),
                    "Completion should contain app name for {:?}. Output: {}",
                    shell,
                    &*content
                );
            }
        }
    }

    #[test]
    fn test_to_standard_shell_exact_values() {
        assert_eq!(Shell::Bash.to_standard_shell(), Some(shells::Shell::Bash));
        assert_eq!(Shell::Elvish.to_standard_shell(), Some(shells::Shell::Elvish));
        assert_eq!(Shell::Fish.to_standard_shell(), Some(shells::Shell::Fish));
        assert_eq!(Shell::PowerShell.to_standard_shell(), Some(shells::Shell::PowerShell));
        assert_eq!(Shell::Zsh.to_standard_shell(), Some(shells::Shell::Zsh));
        assert_eq!(Shell::Nushell.to_standard_shell(), None);
    }
}
