//! Seams to the hosting platform. A host plugs in its own permission and
//! text systems; the console implementations back the standalone binary.

use async_trait::async_trait;
use std::collections::HashSet;

pub type Error = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub tone: Tone,
    pub text: String,
    pub link: Option<String>,
}

impl Message {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            tone: Tone::Success,
            text: text.into(),
            link: None,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            tone: Tone::Error,
            text: text.into(),
            link: None,
        }
    }

    pub fn with_link(mut self, url: impl Into<String>) -> Self {
        self.link = Some(url.into());
        self
    }
}

pub trait PermissionService<S>: Send + Sync {
    fn has_permission(&self, source: &S, permission: &str) -> bool;
}

#[async_trait]
pub trait TextService<S>: Send + Sync {
    async fn send(&self, source: &S, message: Message);
}

/// One command as seen by a host's dispatcher.
#[async_trait]
pub trait CommandAdapter<S>: Send + Sync {
    fn name(&self) -> &str;
    async fn execute(&self, source: &S, args: &[String]) -> Result<(), Error>;
    async fn suggest(&self, source: &S, args: &[String]) -> Vec<String>;
}

/// The operator running the binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Console;

/// Grants everything unless a deny list names the permission.
#[derive(Debug, Default, Clone)]
pub struct ConsolePermissions {
    denied: HashSet<String>,
}

impl ConsolePermissions {
    pub fn deny(mut self, permission: impl Into<String>) -> Self {
        self.denied.insert(permission.into());
        self
    }
}

impl PermissionService<Console> for ConsolePermissions {
    fn has_permission(&self, _source: &Console, permission: &str) -> bool {
        !self.denied.contains(permission)
    }
}

#[derive(Debug, Default, Clone)]
pub struct ConsoleText;

#[async_trait]
impl TextService<Console> for ConsoleText {
    async fn send(&self, _source: &Console, message: Message) {
        let prefix = match message.tone {
            Tone::Success => "[Anvil]",
            Tone::Error => "[Anvil] error:",
        };
        match message.link {
            Some(link) => println!("{} {}\n{}", prefix, message.text, link),
            None => println!("{} {}", prefix, message.text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_permissions_honour_deny_list() {
        let permissions = ConsolePermissions::default().deny("anvil.admin.dump");
        assert!(!permissions.has_permission(&Console, "anvil.admin.dump"));
        assert!(permissions.has_permission(&Console, "anvil.admin.regedit"));
    }
}
