//! Confirmation policies and the prompt rendezvous between an engine and
//! whatever owns user interaction.
//!
//! Engines never read input themselves. They ask an injected
//! [`ConfirmationPolicy`]; an interactive policy forwards the question to a
//! [`Prompter`]. When the engine runs on a worker thread, [`input_channel`]
//! gives a prompter that blocks the worker until the front end answers.

use crossbeam_channel::{Receiver, Sender};
use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// Something the engine wants the user to approve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmRequest {
    DeleteFile {
        path: PathBuf,
    },
    ReplaceLine {
        path: PathBuf,
        line_number: usize,
        line: String,
        /// The line as it will read after substitution.
        replaced: String,
        keyword: String,
        replacement: String,
    },
    ClearWorkspace {
        path: PathBuf,
        entries: usize,
    },
}

impl fmt::Display for ConfirmRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfirmRequest::DeleteFile { path } => {
                write!(f, "File matched for deletion: {}", path.display())
            }
            ConfirmRequest::ReplaceLine {
                path,
                line_number,
                line,
                ..
            } => write!(f, "File: {}\nLine {}: {}", path.display(), line_number, line.trim()),
            ConfirmRequest::ClearWorkspace { path, entries } => write!(
                f,
                "{} entries in {} will be removed (dependencies are kept)",
                entries,
                path.display()
            ),
        }
    }
}

impl ConfirmRequest {
    /// The yes/no question asked for this request.
    pub fn question(&self) -> String {
        match self {
            ConfirmRequest::DeleteFile { .. } => "Delete this file? (y/n)".to_string(),
            ConfirmRequest::ReplaceLine {
                keyword,
                replacement,
                ..
            } => format!("Replace '{keyword}' with '{replacement}' in this line? (y/n)"),
            ConfirmRequest::ClearWorkspace { .. } => {
                "Clear all old APK files and folders? (y/n)".to_string()
            }
        }
    }
}

/// Text shown to the user when input is required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// Context lines shown before the question.
    pub detail: String,
    pub question: String,
    pub kind: PromptKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    YesNo,
    Text,
}

impl Prompt {
    pub fn yes_no(detail: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            question: question.into(),
            kind: PromptKind::YesNo,
        }
    }

    pub fn text(question: impl Into<String>) -> Self {
        Self {
            detail: String::new(),
            question: question.into(),
            kind: PromptKind::Text,
        }
    }
}

/// Decides whether each mutation goes ahead.
pub trait ConfirmationPolicy: Send {
    fn confirm(&mut self, request: &ConfirmRequest) -> bool;
}

impl<P: ConfirmationPolicy + ?Sized> ConfirmationPolicy for Box<P> {
    fn confirm(&mut self, request: &ConfirmRequest) -> bool {
        (**self).confirm(request)
    }
}

/// Pre-selected "yes to all".
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfirmAll;

impl ConfirmationPolicy for ConfirmAll {
    fn confirm(&mut self, _request: &ConfirmRequest) -> bool {
        true
    }
}

/// Declines everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeclineAll;

impl ConfirmationPolicy for DeclineAll {
    fn confirm(&mut self, _request: &ConfirmRequest) -> bool {
        false
    }
}

/// Source of free-form answers.
pub trait Prompter: Send {
    fn ask(&mut self, prompt: &Prompt) -> String;
}

/// Asks a [`Prompter`] about every item.
pub struct AskEach<P> {
    prompter: P,
    detail: Option<Box<dyn Fn(&ConfirmRequest) -> Option<String> + Send>>,
}

impl<P: Prompter> AskEach<P> {
    pub fn new(prompter: P) -> Self {
        Self {
            prompter,
            detail: None,
        }
    }

    /// Appends extra context, such as a change preview, to each prompt.
    pub fn with_detail(
        mut self,
        f: impl Fn(&ConfirmRequest) -> Option<String> + Send + 'static,
    ) -> Self {
        self.detail = Some(Box::new(f));
        self
    }
}

impl<P: Prompter> ConfirmationPolicy for AskEach<P> {
    fn confirm(&mut self, request: &ConfirmRequest) -> bool {
        let mut detail = request.to_string();
        if let Some(extra) = self.detail.as_ref().and_then(|f| f(request)) {
            detail.push('\n');
            detail.push_str(&extra);
        }
        let answer = self.prompter.ask(&Prompt::yes_no(detail, request.question()));
        is_affirmative(&answer)
    }
}

/// `y` or `yes`, ignoring case and surrounding whitespace.
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Reads answers from standard input.
#[derive(Debug, Default)]
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn ask(&mut self, prompt: &Prompt) -> String {
        let mut stderr = io::stderr().lock();
        if !prompt.detail.is_empty() {
            let _ = writeln!(stderr, "\n{}", prompt.detail);
        }
        let _ = write!(stderr, "{} ", prompt.question);
        let _ = stderr.flush();

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => answer.trim_end_matches(['\r', '\n']).to_string(),
            Err(err) => {
                tracing::warn!(error = %err, "failed to read answer, treating as empty");
                String::new()
            }
        }
    }
}

/// A pending question from a worker, answered exactly once.
#[derive(Debug)]
pub struct InputRequest {
    pub prompt: Prompt,
    reply: Sender<String>,
}

impl InputRequest {
    /// Hands the answer back and wakes the waiting worker.
    pub fn respond(self, answer: impl Into<String>) {
        // The worker may have gone away; nothing is waiting in that case.
        let _ = self.reply.send(answer.into());
    }
}

/// Engine side of the rendezvous.
#[derive(Debug, Clone)]
pub struct ChannelPrompter {
    requests: Sender<InputRequest>,
}

impl Prompter for ChannelPrompter {
    fn ask(&mut self, prompt: &Prompt) -> String {
        let (reply, answer) = crossbeam_channel::bounded(1);
        let request = InputRequest {
            prompt: prompt.clone(),
            reply,
        };
        if self.requests.send(request).is_err() {
            tracing::warn!("input front end is gone, treating answer as empty");
            return String::new();
        }
        answer.recv().unwrap_or_default()
    }
}

/// Front-end side of the rendezvous.
#[derive(Debug, Clone)]
pub struct InputRequests {
    requests: Receiver<InputRequest>,
}

impl InputRequests {
    /// Blocks until the next request, or `None` once every prompter is dropped.
    pub fn recv(&self) -> Option<InputRequest> {
        self.requests.recv().ok()
    }

    /// Serves every request with `prompter` until the worker side hangs up.
    pub fn serve(&self, prompter: &mut impl Prompter) {
        while let Some(request) = self.recv() {
            let answer = prompter.ask(&request.prompt);
            request.respond(answer);
        }
    }
}

/// Creates a connected prompter / request-queue pair.
pub fn input_channel() -> (ChannelPrompter, InputRequests) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (ChannelPrompter { requests: tx }, InputRequests { requests: rx })
}
