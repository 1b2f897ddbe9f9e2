use super::error::PublishError;
use super::publisher::{DiagnosticPublisher, Selection};
use crate::host::{CommandAdapter, Error, Message, PermissionService, TextService};
use crate::registry::{keys, Registry};
use crate::tasks::InFlight;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::trace;

const SUCCESS_TEXT: &str =
    "If a developer has requested you run this command, please provide them with the following link:";

/// `dump [--all|-a] [<plugin>...]`
pub struct DumpCommand<S> {
    publisher: Arc<DiagnosticPublisher>,
    registry: Registry,
    permissions: Arc<dyn PermissionService<S>>,
    text: Arc<dyn TextService<S>>,
    in_flight: Arc<InFlight>,
}

impl<S> DumpCommand<S> {
    pub fn new(
        publisher: Arc<DiagnosticPublisher>,
        registry: Registry,
        permissions: Arc<dyn PermissionService<S>>,
        text: Arc<dyn TextService<S>>,
        in_flight: Arc<InFlight>,
    ) -> Self {
        Self {
            publisher,
            registry,
            permissions,
            text,
            in_flight,
        }
    }
}

#[async_trait]
impl<S> CommandAdapter<S> for DumpCommand<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        "dump"
    }

    async fn execute(&self, source: &S, args: &[String]) -> Result<(), Error> {
        let permission = self.registry.get_or_default(&keys::dump_permission()).await;
        let permission = permission.as_text().unwrap_or_default();
        if !self.permissions.has_permission(source, permission) {
            let message = PublishError::PermissionDenied.user_message();
            self.text.send(source, Message::error(message)).await;
            return Ok(());
        }

        let selection = match args.first().map(String::as_str) {
            None => {
                self.text
                    .send(source, Message::error("Plugin is required if '--all' is not set"))
                    .await;
                return Ok(());
            }
            Some("-a" | "--all") => Selection::All,
            Some(_) => Selection::Named(args.to_vec()),
        };
        trace!("Dump requested for {:?}", selection);

        let text = Arc::clone(&self.text);
        let source = source.clone();
        let handle = self.publisher.spawn(selection, move |result| async move {
            let message = match result {
                Ok(url) => Message::success(SUCCESS_TEXT).with_link(url),
                Err(e) => Message::error(e.user_message()),
            };
            text.send(&source, message).await;
        });
        self.in_flight.track(handle).await;
        Ok(())
    }

    async fn suggest(&self, _source: &S, _args: &[String]) -> Vec<String> {
        let mut suggestions: Vec<String> = self
            .publisher
            .environments()
            .list()
            .await
            .iter()
            .map(|e| e.name().to_string())
            .collect();
        suggestions.sort();
        suggestions.push("--all".to_string());
        suggestions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DumpConfig;
    use crate::environment::{Environment, EnvironmentManager, PluginInfo};
    use crate::host::{Console, ConsolePermissions, Tone};
    use tokio::sync::Mutex;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct Recorder {
        messages: Mutex<Vec<Message>>,
    }

    #[async_trait]
    impl TextService<Console> for Recorder {
        async fn send(&self, _source: &Console, message: Message) {
            self.messages.lock().await.push(message);
        }
    }

    struct Harness {
        command: DumpCommand<Console>,
        recorder: Arc<Recorder>,
        in_flight: Arc<InFlight>,
    }

    impl Harness {
        async fn new(endpoint: &str, permissions: ConsolePermissions) -> Self {
            let registry = Registry::in_memory();
            let manager = EnvironmentManager::new(Environment::core(registry.clone()));
            for name in ["zeta", "catalyst"] {
                manager
                    .register(Environment::new(name, PluginInfo::default(), vec![], registry.clone()))
                    .await
                    .unwrap();
            }
            let config = DumpConfig::default().with_endpoint(endpoint).unwrap();
            let publisher = Arc::new(DiagnosticPublisher::new(config, Arc::new(manager)));
            let recorder = Arc::new(Recorder::default());
            let in_flight = Arc::new(InFlight::new());
            let command: DumpCommand<Console> = DumpCommand::new(
                publisher,
                registry,
                Arc::new(permissions),
                recorder.clone(),
                in_flight.clone(),
            );
            Self {
                command,
                recorder,
                in_flight,
            }
        }

        async fn run(&self, args: &[&str]) -> Vec<Message> {
            let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
            self.command.execute(&Console, &args).await.unwrap();
            self.in_flight.wait().await;
            self.recorder.messages.lock().await.drain(..).collect()
        }
    }

    async fn collector(body: &str, expected: u64) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(expected)
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn denies_without_permission() {
        let server = collector(r#"{"key":"k"}"#, 0).await;
        let harness = Harness::new(
            &server.uri(),
            ConsolePermissions::default().deny("anvil.admin.dump"),
        )
        .await;

        let messages = harness.run(&["--all"]).await;
        assert_eq!(
            messages,
            [Message::error("You do not have permission for this command!")]
        );
    }

    #[tokio::test]
    async fn requires_arguments() {
        let server = collector(r#"{"key":"k"}"#, 0).await;
        let harness = Harness::new(&server.uri(), ConsolePermissions::default()).await;

        let messages = harness.run(&[]).await;
        assert_eq!(
            messages,
            [Message::error("Plugin is required if '--all' is not set")]
        );
    }

    #[tokio::test]
    async fn all_flag_replies_with_link() {
        let server = collector(r#"{"key":"abc123"}"#, 2).await;
        let harness = Harness::new(&server.uri(), ConsolePermissions::default()).await;

        for flag in ["-a", "--all"] {
            let messages = harness.run(&[flag]).await;
            assert_eq!(messages.len(), 1);
            assert_eq!(messages[0].tone, Tone::Success);
            assert_eq!(
                messages[0].link.as_deref(),
                Some(format!("{}/abc123.json", server.uri()).as_str())
            );
        }
    }

    #[tokio::test]
    async fn unknown_plugins_are_named_back() {
        let server = collector(r#"{"key":"k"}"#, 0).await;
        let harness = Harness::new(&server.uri(), ConsolePermissions::default()).await;

        let messages = harness.run(&["foo", "bar"]).await;
        assert_eq!(messages, [Message::error("Could not find plugin(s) foo bar")]);
    }

    #[tokio::test]
    async fn server_errors_get_generic_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let harness = Harness::new(&server.uri(), ConsolePermissions::default()).await;

        let messages = harness.run(&["catalyst"]).await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].tone, Tone::Error);
        assert!(messages[0].link.is_none());
        assert!(!messages[0].text.contains("500"));
    }

    #[tokio::test]
    async fn suggests_sorted_names_then_all() {
        let server = collector(r#"{"key":"k"}"#, 0).await;
        let harness = Harness::new(&server.uri(), ConsolePermissions::default()).await;

        let suggestions = harness.command.suggest(&Console, &[]).await;
        assert_eq!(suggestions, ["anvil", "catalyst", "zeta", "--all"]);
    }
}
