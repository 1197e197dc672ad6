use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use pretty_assertions::assert_eq;

use playroom_assistant::agent::{ChunkStream, Generator};
use playroom_assistant::host::{FileHost, HostBridge};
use playroom_assistant::models::{ActiveSuggestion, Catalog, GenerationRequest, MessageRole, Snippet};
use playroom_assistant::preamble::{WELCOME_EMPTY, WELCOME_WITH_CODE};
use playroom_assistant::{AssistantError, AssistantService, TurnOutcome};

/// One scripted reply: the chunks to stream, or an error before streaming.
enum Script {
    Chunks(Vec<Result<String, String>>),
    Refuse(String),
}

#[derive(Clone, Default)]
struct ScriptedGenerator {
    scripts: Arc<Mutex<VecDeque<Script>>>,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
}

impl ScriptedGenerator {
    fn reply(self, chunks: &[&str]) -> Self {
        let chunks = chunks.iter().map(|c| Ok(c.to_string())).collect();
        self.scripts.lock().unwrap().push_back(Script::Chunks(chunks));
        self
    }

    fn broken_stream(self, chunks: &[&str], error: &str) -> Self {
        let mut items: Vec<_> = chunks.iter().map(|c| Ok(c.to_string())).collect();
        items.push(Err(error.to_string()));
        self.scripts.lock().unwrap().push_back(Script::Chunks(items));
        self
    }

    fn refuse(self, error: &str) -> Self {
        self.scripts.lock().unwrap().push_back(Script::Refuse(error.to_string()));
        self
    }

    fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<ChunkStream, AssistantError> {
        self.requests.lock().unwrap().push(request);
        match self.scripts.lock().unwrap().pop_front() {
            Some(Script::Chunks(items)) => {
                let items: Vec<_> = items
                    .into_iter()
                    .map(|item| item.map_err(|message| AssistantError::StreamInterrupted { message }))
                    .collect();
                Ok(stream::iter(items).boxed())
            }
            Some(Script::Refuse(body)) => Err(AssistantError::GenerationFailed { status: 500, body }),
            None => Err(AssistantError::Unexpected("no scripted reply".into())),
        }
    }
}

#[derive(Default)]
struct RecordingHost {
    code: Option<String>,
    previews: Vec<String>,
    updates: Vec<String>,
}

impl HostBridge for RecordingHost {
    fn current_code(&self) -> Option<String> {
        self.code.clone()
    }

    fn catalog(&self) -> Catalog {
        Catalog {
            components: vec!["Card".into(), "Text".into()],
            snippets: vec![Snippet {
                name: "Card".into(),
                code: "<Card><Text>Hi</Text></Card>".into(),
                group: "Content".into(),
            }],
            examples: Vec::new(),
        }
    }

    fn preview_code(&mut self, code: &str) -> Result<(), AssistantError> {
        self.previews.push(code.to_string());
        Ok(())
    }

    fn update_code(&mut self, code: &str) -> Result<(), AssistantError> {
        self.updates.push(code.to_string());
        self.code = Some(code.to_string());
        Ok(())
    }
}

const TWO_VARIANTS: &str = r#"{"1":"<Card />","2":"<Card tone=\"dark\" />","message":"Here are two cards."}"#;

#[tokio::test]
async fn structured_reply_is_previewed_automatically() {
    let generator = ScriptedGenerator::default().reply(&[r#"{"1":"<Card />","#, r#""2":"<Card tone=\"dark\" />","message":"Here are two cards."}"#]);
    let mut service = AssistantService::new(Box::new(generator.clone()), RecordingHost::default());

    let outcome = service.submit("a card", None).await;
    assert_eq!(outcome, TurnOutcome::Completed { previewed: true });
    assert_eq!(service.host().previews, ["<Card />"]);

    let reply = service.session().messages().last().unwrap().clone();
    assert_eq!(reply.role, MessageRole::Assistant);
    assert_eq!(
        service.session().active_suggestion(),
        Some(&ActiveSuggestion { message_id: reply.id.clone(), variant_index: 0 })
    );

    let shown = service.session().display_messages();
    let last = shown.last().unwrap();
    assert_eq!(last.text, "Here are two cards.");
    assert_eq!(last.variants.len(), 2);
}

#[tokio::test]
async fn request_carries_preamble_and_history() {
    let generator = ScriptedGenerator::default().reply(&["First answer"]).reply(&[TWO_VARIANTS]);
    let host = RecordingHost { code: Some("<Text />".into()), ..Default::default() };
    let mut service = AssistantService::new(Box::new(generator.clone()), host);

    service.submit("first", None).await;
    service
        .submit("second", Some("data:image/png;base64,AA".into()))
        .await;

    let requests = generator.requests();
    assert_eq!(requests.len(), 2);

    let roles: Vec<_> = requests[1].messages.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        [
            MessageRole::System,
            MessageRole::System,
            MessageRole::Assistant,
            MessageRole::User,
            MessageRole::Assistant,
            MessageRole::User,
        ]
    );
    assert!(requests[1].messages[0].content.contains("### Card (Content)"));
    assert!(requests[1].messages[1].content.ends_with("<Text />"));
    assert_eq!(requests[1].messages[2].content, WELCOME_WITH_CODE);
    assert_eq!(requests[1].messages[4].content, "First answer");
    let prompt = requests[1].prompt().unwrap();
    assert_eq!(prompt.content, "second");
    assert_eq!(prompt.attachments.len(), 1);
}

#[tokio::test]
async fn blank_input_sends_nothing() {
    let generator = ScriptedGenerator::default();
    let mut service = AssistantService::new(Box::new(generator.clone()), RecordingHost::default());
    let before = service.session().messages().len();

    assert_eq!(service.submit("  \t ", None).await, TurnOutcome::Ignored);
    assert_eq!(service.session().messages().len(), before);
    assert!(generator.requests().is_empty());
}

#[tokio::test]
async fn prose_reply_streams_and_never_previews() {
    let generator = ScriptedGenerator::default().reply(&["Could you ", "say more about {layout}?"]);
    let mut service = AssistantService::new(Box::new(generator), RecordingHost::default());

    let mut seen = Vec::new();
    let outcome = service
        .submit_with("something", None, |session| {
            if let Some(last) = session.display_messages().last() {
                seen.push(last.text.clone());
            }
        })
        .await;

    assert_eq!(outcome, TurnOutcome::Completed { previewed: false });
    assert!(seen.contains(&"Could you ".to_string()));
    assert_eq!(seen.last().unwrap(), "Could you say more about {layout}?");
    assert!(service.host().previews.is_empty());
    assert!(service.session().active_suggestion().is_none());
}

#[tokio::test]
async fn failed_request_keeps_conversation() {
    let generator = ScriptedGenerator::default()
        .refuse("model overloaded")
        .reply(&[TWO_VARIANTS]);
    let mut service = AssistantService::new(Box::new(generator.clone()), RecordingHost::default());

    service.session_mut().set_input("a card");
    let outcome = service.submit_input_with(|_| {}).await;
    assert!(matches!(outcome, TurnOutcome::Failed { .. }));

    let session = service.session();
    assert_eq!(session.error(), Some("Generation endpoint returned 500: model overloaded"));
    assert!(!session.is_loading());
    assert_eq!(session.input(), "a card");
    assert_eq!(session.display_messages().last().unwrap().role, MessageRole::User);

    // manual resubmit
    let outcome = service.submit_input_with(|_| {}).await;
    assert_eq!(outcome, TurnOutcome::Completed { previewed: true });
    assert!(service.session().error().is_none());
    assert_eq!(generator.requests().len(), 2);
}

#[tokio::test]
async fn interrupted_stream_keeps_partial_reply() {
    let generator = ScriptedGenerator::default().broken_stream(&["Working on it"], "connection reset");
    let mut service = AssistantService::new(Box::new(generator), RecordingHost::default());

    let outcome = service.submit("card", None).await;
    assert_eq!(
        outcome,
        TurnOutcome::Failed { message: "Response stream interrupted: connection reset".into() }
    );
    let last = service.session().display_messages().pop().unwrap();
    assert_eq!(last.role, MessageRole::Assistant);
    assert_eq!(last.text, "Working on it");
}

#[tokio::test]
async fn preview_apply_and_reset() {
    let generator = ScriptedGenerator::default().reply(&[TWO_VARIANTS]);
    let mut service = AssistantService::new(Box::new(generator), RecordingHost::default());
    assert_eq!(service.session().messages().len(), 2);
    assert_eq!(service.session().messages()[1].content, WELCOME_EMPTY);

    service.submit("cards", None).await;
    let id = service.session().messages().last().unwrap().id.clone();

    service.preview_variant(&id, 1).unwrap();
    assert_eq!(service.host().previews.last().unwrap(), "<Card tone=\"dark\" />");
    assert_eq!(
        service.session().active_suggestion(),
        Some(&ActiveSuggestion { message_id: id.clone(), variant_index: 1 })
    );

    let err = service.preview_variant(&id, 5).unwrap_err();
    assert!(err.is_not_found());

    service.apply_variant(&id, 1).unwrap();
    assert_eq!(service.host().updates, ["<Card tone=\"dark\" />"]);
    assert!(service.session().active_suggestion().is_none());

    service.session_mut().attach_image(Some("data:image/png;base64,AA".into()));
    service.reset();
    let session = service.session();
    assert_eq!(session.messages().len(), 3);
    assert_eq!(session.messages()[2].content, WELCOME_WITH_CODE);
    assert!(session.pending_image().is_none());
    assert!(session.active_suggestion().is_none());
}

#[tokio::test]
async fn apply_clears_preview_even_if_stale_preview_file_survives() {
    let dir = tempfile::tempdir().unwrap();
    let host = FileHost::new(dir.path().join("playroom.jsx"), Catalog::default());
    let generator = ScriptedGenerator::default().reply(&[TWO_VARIANTS]);
    let mut service = AssistantService::new(Box::new(generator), host);

    service.submit("cards", None).await;
    let id = service.session().messages().last().unwrap().id.clone();
    assert!(service.session().active_suggestion().is_some());

    // a directory in place of the preview file cannot be removed
    let preview = service.host().preview_path().to_path_buf();
    std::fs::remove_file(&preview).unwrap();
    std::fs::create_dir(&preview).unwrap();

    service.apply_variant(&id, 1).unwrap();
    assert_eq!(service.host().current_code().as_deref(), Some("<Card tone=\"dark\" />"));
    assert!(service.session().active_suggestion().is_none());
}
