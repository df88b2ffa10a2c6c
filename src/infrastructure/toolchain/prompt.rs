use async_trait::async_trait;
use std::io::{self, BufRead, BufReader, Write};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

/// Asks the user yes/no questions
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Ask `question`. Empty input or no answer within `timeout` counts as yes.
    async fn confirm(&self, question: &str, timeout: Duration) -> bool;
}

#[async_trait]
impl<P: Prompter + ?Sized> Prompter for Box<P> {
    async fn confirm(&self, question: &str, timeout: Duration) -> bool {
        (**self).confirm(question, timeout).await
    }
}

/// `true` for empty input, `y` or `yes` (any case)
pub fn interpret_answer(input: &str) -> bool {
    matches!(input.trim().to_ascii_lowercase().as_str(), "" | "y" | "yes")
}

/// Prompts on stdout and reads answers line by line.
///
/// One reader thread lives as long as the prompter, so a prompt that timed
/// out never leaves a reader behind to swallow the next answer. Lines typed
/// before a question is shown are discarded.
pub struct StdinPrompter {
    lines: Mutex<mpsc::UnboundedReceiver<String>>,
}

impl StdinPrompter {
    pub fn new() -> Self {
        Self::from_reader(BufReader::new(io::stdin()))
    }

    pub fn from_reader<R: BufRead + Send + 'static>(mut reader: R) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        std::thread::spawn(move || loop {
            let mut line = String::new();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    debug!("Prompt input closed: {}", e);
                    break;
                }
            }
        });

        Self {
            lines: Mutex::new(rx),
        }
    }
}

impl Default for StdinPrompter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Prompter for StdinPrompter {
    async fn confirm(&self, question: &str, timeout: Duration) -> bool {
        let mut lines = self.lines.lock().await;
        while let Ok(stale) = lines.try_recv() {
            debug!("Discarding input typed before the prompt: {:?}", stale.trim_end());
        }

        print!("{question} (Y/n): ");
        let _ = io::stdout().flush();

        match tokio::time::timeout(timeout, lines.recv()).await {
            Ok(Some(line)) => interpret_answer(&line),
            // Input closed: nobody can answer.
            Ok(None) => true,
            Err(_) => {
                println!();
                println!("Input timed out!");
                true
            }
        }
    }
}

/// Answers every question the same way, for `--yes` and non-interactive runs
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

#[async_trait]
impl Prompter for FixedAnswer {
    async fn confirm(&self, _question: &str, _timeout: Duration) -> bool {
        self.0
    }
}
