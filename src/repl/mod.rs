//! Line-oriented host for one assistant session.

pub mod commands;
pub mod transcript;

use std::io::Write as _;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use crate::attachment;
use crate::clipboard::{ClipboardSink, CopyFeedback};
use crate::errors::AssistantError;
use crate::host::HostBridge;
use crate::service::{AssistantService, TurnOutcome};
use crate::speech::{self, SpeechCapabilities};

use commands::{Command, VariantRef};
use transcript::{format_message, StreamPrinter};

const DICTATION_POLL: Duration = Duration::from_millis(100);
const DICTATION_START_POLLS: usize = 50;

pub struct Repl<H: HostBridge, C: ClipboardSink> {
    service: AssistantService<H>,
    copy: CopyFeedback<C>,
    speech: SpeechCapabilities,
}

impl<H: HostBridge, C: ClipboardSink> Repl<H, C> {
    pub fn new(service: AssistantService<H>, clipboard: C, speech: SpeechCapabilities) -> Self {
        Self { service, copy: CopyFeedback::new(clipboard), speech }
    }

    pub fn service(&self) -> &AssistantService<H> {
        &self.service
    }

    fn print_transcript(&self) {
        for message in self.service.session().display_messages() {
            print!("{}", format_message(&message));
        }
    }

    fn print_help(&self) {
        println!(
            "{}",
            commands::help(self.speech.synthesizer.is_some(), self.speech.dictation.is_some())
        );
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        self.print_transcript();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            print!("> ");
            std::io::stdout().flush()?;
            let Some(line) = lines.next_line().await? else {
                break;
            };

            let command = match commands::parse(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(message) => {
                    println!("{message}");
                    continue;
                }
            };

            if command == Command::Quit {
                break;
            }
            if let Err(e) = self.dispatch(command).await {
                println!("error: {}", e.user_message());
            }
        }
        Ok(())
    }

    /// Resolves a 1-based variant reference against the latest reply when no
    /// message id is given.
    fn resolve(&self, variant: &VariantRef) -> Result<(String, usize), AssistantError> {
        let message_id = match &variant.message_id {
            Some(id) => id.clone(),
            None => self
                .service
                .session()
                .latest_with_variants()
                .map(|m| m.id.clone())
                .ok_or_else(|| AssistantError::MessageNotFound { id: "latest".to_string() })?,
        };
        Ok((message_id, variant.index))
    }

    pub async fn dispatch(&mut self, command: Command) -> Result<(), AssistantError> {
        match command {
            Command::Prompt(text) => {
                self.service.session_mut().set_input(text);
                self.submit().await;
            }
            Command::Image(path) => {
                let selected: Vec<_> = path.into_iter().collect();
                if attachment::capture(self.service.session_mut(), &selected)? {
                    println!("Image attached to the next prompt.");
                } else {
                    println!("Image cleared.");
                }
            }
            Command::Preview(variant) => {
                let (id, index) = self.resolve(&variant)?;
                self.service.preview_variant(&id, index)?;
                println!("Previewing variant {}.", index + 1);
            }
            Command::Apply(variant) => {
                let (id, index) = self.resolve(&variant)?;
                self.service.apply_variant(&id, index)?;
                println!("Applied variant {}.", index + 1);
            }
            Command::Unpreview => {
                self.service.clear_preview();
                println!("Preview cleared.");
            }
            Command::Copy(variant) => {
                let (id, index) = self.resolve(&variant)?;
                let code = self.service.session().variant(&id, index)?;
                if self.copy.copy(&code, Instant::now())? {
                    println!("Copied variant {}.", index + 1);
                } else {
                    println!("Already copied.");
                }
            }
            Command::Speak => self.speak()?,
            Command::Talk => self.talk().await?,
            Command::Send => self.submit().await,
            Command::Reset => {
                if self.service.session().can_reset() {
                    self.service.reset();
                }
                self.print_transcript();
            }
            Command::Help => self.print_help(),
            Command::Quit => {}
        }
        Ok(())
    }

    async fn submit(&mut self) {
        let mut printer = StreamPrinter::default();
        let outcome = self
            .service
            .submit_input_with(|session| {
                if let Some(text) = printer.update(session) {
                    print!("{text}");
                    let _ = std::io::stdout().flush();
                }
            })
            .await;

        match outcome {
            TurnOutcome::Ignored => println!("Nothing to send."),
            TurnOutcome::Completed { .. } | TurnOutcome::Failed { .. } => {
                print!("{}", printer.finish(self.service.session()));
            }
        }
    }

    fn speak(&self) -> Result<(), AssistantError> {
        let Some(synth) = self.speech.synthesizer.as_deref() else {
            println!("Speech playback is not available.");
            return Ok(());
        };
        let latest = self
            .service
            .session()
            .display_messages()
            .into_iter()
            .rev()
            .find(|m| m.role == crate::models::MessageRole::Assistant);
        if let Some(message) = latest {
            speech::speak(synth, &message.text)?;
        }
        Ok(())
    }

    async fn talk(&mut self) -> Result<(), AssistantError> {
        let Some(dictation) = self.speech.dictation.as_mut() else {
            println!("Speech recognition is not available.");
            return Ok(());
        };

        dictation.start()?;
        println!("Listening...");
        let mut transcript = None;
        let mut settled = false;
        for _ in 0..DICTATION_START_POLLS {
            if let Some(text) = dictation.pump() {
                transcript = Some(text);
            }
            settled = dictation.is_listening() || transcript.is_some();
            if settled {
                break;
            }
            tokio::time::sleep(DICTATION_POLL).await;
        }
        if !settled {
            dictation.stop();
        }
        while dictation.is_listening() {
            tokio::time::sleep(DICTATION_POLL).await;
            if let Some(text) = dictation.pump() {
                transcript = Some(text);
            }
        }

        match transcript {
            Some(text) => {
                println!("Heard: {text}\n(/send to submit it, or type a new prompt)");
                self.service.session_mut().set_input(text);
            }
            None => warn!("Dictation ended without a transcript"),
        }
        Ok(())
    }
}
