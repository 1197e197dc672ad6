//! Speech dictation and playback behind capability traits.
//!
//! Capabilities are resolved once at startup. A missing capability is `None`
//! and the matching command is simply not offered.

use std::io::Write as _;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::thread::JoinHandle;

use tracing::{debug, warn};

use crate::errors::AssistantError;

/// Voices tried in order before falling back to the platform default.
pub const PREFERRED_VOICES: [&str; 3] = ["Google UK English Female", "Moira", "Karen"];

pub const RECOGNITION_LANG: &str = "en_US";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub name: String,
    pub lang: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub voice: Option<String>,
    pub pitch: f32,
    pub rate: f32,
}

pub trait SpeechSynthesizer {
    fn voices(&self) -> Vec<Voice>;
    fn speak(&self, utterance: &Utterance) -> Result<(), AssistantError>;
}

pub fn preferred_voice(voices: &[Voice]) -> Option<&Voice> {
    PREFERRED_VOICES
        .iter()
        .find_map(|name| voices.iter().find(|v| v.name == *name))
}

/// Speaks `text` with the preferred voice when one is installed.
pub fn speak(synth: &dyn SpeechSynthesizer, text: &str) -> Result<Utterance, AssistantError> {
    let voices = synth.voices();
    let utterance = Utterance {
        text: text.to_string(),
        voice: preferred_voice(&voices).map(|v| v.name.clone()),
        pitch: 1.0,
        rate: 1.0,
    };
    synth.speak(&utterance)?;
    Ok(utterance)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    Started,
    /// Alternatives per result, best first.
    Results(Vec<Vec<String>>),
    Ended,
    Error(String),
}

pub trait SpeechRecognizer {
    fn start(&mut self, lang: &str) -> Result<(), AssistantError>;
    fn stop(&mut self);
    /// Next pending event, if any.
    fn poll_event(&mut self) -> Option<RecognitionEvent>;
}

/// A single dictation session on top of a recognizer.
pub struct Dictation {
    recognizer: Box<dyn SpeechRecognizer>,
    listening: bool,
}

impl Dictation {
    pub fn new(recognizer: Box<dyn SpeechRecognizer>) -> Self {
        Self { recognizer, listening: false }
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn start(&mut self) -> Result<(), AssistantError> {
        if self.listening {
            return Ok(());
        }
        self.recognizer.start(RECOGNITION_LANG)
    }

    pub fn stop(&mut self) {
        self.recognizer.stop();
    }

    /// Drains pending events. Returns the first transcript of the first
    /// result when one arrived.
    pub fn pump(&mut self) -> Option<String> {
        let mut transcript = None;
        while let Some(event) = self.recognizer.poll_event() {
            match event {
                RecognitionEvent::Started => self.listening = true,
                RecognitionEvent::Ended => self.listening = false,
                RecognitionEvent::Error(message) => {
                    warn!("Speech recognition error: {message}");
                    self.listening = false;
                }
                RecognitionEvent::Results(results) => {
                    let first = results
                        .first()
                        .and_then(|alternatives| alternatives.first())
                        .filter(|t| !t.is_empty());
                    if let Some(text) = first {
                        transcript = Some(text.clone());
                    }
                }
            }
        }
        transcript
    }
}

/// Capabilities available on this machine.
pub struct SpeechCapabilities {
    pub synthesizer: Option<Box<dyn SpeechSynthesizer>>,
    pub dictation: Option<Dictation>,
}

impl SpeechCapabilities {
    pub fn detect() -> Self {
        let synthesizer = CommandSynthesizer::detect()
            .map(|s| Box::new(s) as Box<dyn SpeechSynthesizer>);
        debug!(
            "Speech capabilities: synthesis={}, recognition=false",
            synthesizer.is_some()
        );
        Self { synthesizer, dictation: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpeechProgram {
    Say,
    Espeak,
}

/// Text-to-speech through `say` (macOS) or `espeak-ng`/`espeak`.
#[derive(Debug, Clone)]
pub struct CommandSynthesizer {
    program: SpeechProgram,
    binary: PathBuf,
}

impl CommandSynthesizer {
    pub fn detect() -> Option<Self> {
        let candidates = [
            ("say", SpeechProgram::Say),
            ("espeak-ng", SpeechProgram::Espeak),
            ("espeak", SpeechProgram::Espeak),
        ];
        candidates
            .into_iter()
            .find_map(|(name, program)| {
                which::which(name).ok().map(|binary| Self { program, binary })
            })
    }

    /// Arguments for one utterance. The text itself goes through stdin so
    /// a reply starting with `-` is never read as an option.
    fn speak_args(&self, voice: Option<&str>) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(voice) = voice {
            args.extend(["-v".to_string(), voice.to_string()]);
        }
        match self.program {
            SpeechProgram::Say => args.extend(["-f".to_string(), "-".to_string()]),
            SpeechProgram::Espeak => args.push("--stdin".to_string()),
        }
        args
    }
}

impl SpeechSynthesizer for CommandSynthesizer {
    fn voices(&self) -> Vec<Voice> {
        let args: &[&str] = match self.program {
            SpeechProgram::Say => &["-v", "?"],
            SpeechProgram::Espeak => &["--voices"],
        };
        let output = match Command::new(&self.binary).args(args).output() {
            Ok(output) => output,
            Err(e) => {
                warn!("Failed to list voices: {e}");
                return Vec::new();
            }
        };
        let listing = String::from_utf8_lossy(&output.stdout);
        match self.program {
            SpeechProgram::Say => parse_say_voices(&listing),
            SpeechProgram::Espeak => parse_espeak_voices(&listing),
        }
    }

    fn speak(&self, utterance: &Utterance) -> Result<(), AssistantError> {
        let mut command = Command::new(&self.binary);
        command.args(self.speak_args(utterance.voice.as_deref()));
        spawn_with_input(command, utterance.text.clone())
            .map(|_| ())
            .map_err(|e| AssistantError::Speech(format!("Failed to start {}: {e}", self.binary.display())))
    }
}

/// Starts `command`, feeds `input` on stdin and reaps the child on a
/// background thread so playback does not block the caller.
fn spawn_with_input(
    mut command: Command,
    input: String,
) -> std::io::Result<JoinHandle<Option<ExitStatus>>> {
    let mut child = command
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    let stdin = child.stdin.take();

    Ok(std::thread::spawn(move || {
        if let Some(mut stdin) = stdin {
            if let Err(e) = stdin.write_all(input.as_bytes()) {
                warn!("Failed to pass text to speech process: {e}");
            }
        }
        match child.wait() {
            Ok(status) => {
                if !status.success() {
                    warn!("Speech process exited with {status}");
                }
                Some(status)
            }
            Err(e) => {
                warn!("Failed to wait for speech process: {e}");
                None
            }
        }
    }))
}

/// `say -v ?` lines look like `Moira               en_IE    # Hello...`.
fn parse_say_voices(listing: &str) -> Vec<Voice> {
    listing
        .lines()
        .filter_map(|line| {
            let (head, _) = line.split_once('#').unwrap_or((line, ""));
            let mut fields = head.split("  ").map(str::trim).filter(|f| !f.is_empty());
            let name = fields.next()?.to_string();
            Some(Voice { name, lang: fields.next().map(str::to_string) })
        })
        .collect()
}

/// `espeak --voices` prints a header then `Pty Language Age/Gender VoiceName File Other`.
fn parse_espeak_voices(listing: &str) -> Vec<Voice> {
    listing
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let name = fields.get(3)?.to_string();
            Some(Voice { name, lang: fields.get(1).map(|l| l.to_string()) })
        })
        .collect()
}
