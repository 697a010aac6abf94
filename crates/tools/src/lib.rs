//! Built-in tool catalogue.
//!
//! A small set proving the registry contract end-to-end: one read-only
//! tool and one destructive tool that routes through the confirmation
//! gate. Platform-specific catalogues register alongside or instead of
//! these.

pub mod file_read;
pub mod shell;

pub use file_read::FileReadTool;
pub use shell::ShellTool;

use steward_core::ToolRegistry;

/// Registry with the built-in tools, scoped to the current directory.
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(FileReadTool::new(".")));
    // Shell allowlist: common read-only commands. The tool is gated
    // behind confirmation on top of this.
    let safe_commands = vec![
        "ls".into(),
        "cat".into(),
        "head".into(),
        "tail".into(),
        "grep".into(),
        "find".into(),
        "du".into(),
        "df".into(),
        "ps".into(),
        "uptime".into(),
        "git".into(),
    ];
    registry.register(Box::new(ShellTool::new(safe_commands)));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_contents() {
        let registry = default_registry();
        let mut names = registry.names();
        names.sort();
        assert_eq!(names, vec!["file_read", "shell"]);
        assert!(registry.is_destructive("shell"));
        assert!(!registry.is_destructive("file_read"));
    }
}
