//! Question answering over a single chapter.
//!
//! [`Tutor`] ties the pieces together: it looks the chapter up in the
//! [`Corpus`], wraps the chapter text and the student's question in a
//! [`Conversation`] behind the tutor persona, sends it to the [`ChatModel`],
//! and times the call.
//!
//! # Outcomes
//!
//! | Situation | [`Answer::text`] | [`Answer::elapsed_secs`] |
//! |-----------|------------------|--------------------------|
//! | chapter unknown or unavailable | `None` | `0.0`, model not called |
//! | model returned non-blank text | trimmed text | time spent in the call |
//! | model failed or returned blank text | `None` | time spent in the call |
//! | model call panicked | `None` | `0.0` |
//!
//! [`Tutor::answer`] never fails; [`Tutor::ask`] turns a missing answer into
//! [`TutorError::Generation`] for the HTTP layer.

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::corpus::Corpus;
use crate::error::TutorError;
use crate::llm::{create_model, ChatModel, Conversation};

/// System instruction used when `[tutor].persona` is not configured.
pub const DEFAULT_PERSONA: &str = "\
You are a friendly and engaging Science tutor for 7th grade CBSE students. Your role is to:
- Explain scientific concepts in simple, relatable terms
- Use everyday examples to illustrate scientific principles
- Encourage scientific thinking and curiosity
- Help students understand the practical applications of what they learn
- Break down complex scientific concepts into easier parts
- Ask questions to ensure understanding";

/// Raw result of [`Tutor::answer`].
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: Option<String>,
    pub elapsed_secs: f64,
}

impl Answer {
    fn absent() -> Self {
        Self {
            text: None,
            elapsed_secs: 0.0,
        }
    }
}

/// A successful answer, as returned to API clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerResult {
    pub chapter: String,
    pub question: String,
    pub response: String,
    pub time_taken: f64,
}

pub struct Tutor {
    corpus: Arc<Corpus>,
    model: Arc<dyn ChatModel>,
    persona: String,
}

impl Tutor {
    pub fn new(corpus: Arc<Corpus>, model: Arc<dyn ChatModel>) -> Self {
        Self {
            corpus,
            model,
            persona: DEFAULT_PERSONA.to_string(),
        }
    }

    /// Loads the corpus and builds the model client described by `config`.
    ///
    /// Corpus loading never fails; only an unusable model configuration does.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let corpus = Corpus::load(&config.corpus.dir, &config.corpus.extensions);
        let model = create_model(&config.llm)?;
        let tutor = Self::new(Arc::new(corpus), model);
        Ok(match &config.tutor.persona {
            Some(persona) => tutor.with_persona(persona.clone()),
            None => tutor,
        })
    }

    /// Replaces the system instruction sent with every question.
    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = persona.into();
        self
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    /// Builds the conversation for `question` against `chapter_text`.
    pub fn conversation(&self, chapter_text: &str, question: &str) -> Conversation {
        Conversation::new(
            self.persona.clone(),
            format!(
                "Using this chapter content: {}\n\nStudent question: {}",
                chapter_text, question
            ),
        )
    }

    /// Answers `question` about `chapter`.
    pub async fn answer(&self, chapter: &str, question: &str) -> Answer {
        let Some(text) = self.corpus.get(chapter) else {
            debug!("Chapter {} not available; skipping model call", chapter);
            return Answer::absent();
        };

        let conversation = self.conversation(text, question);
        let model = Arc::clone(&self.model);

        // The call runs on its own task so a panicking client cannot take
        // the request handler down with it.
        let start = Instant::now();
        let outcome = tokio::spawn(async move { model.chat(&conversation).await }).await;
        let elapsed_secs = start.elapsed().as_secs_f64();

        match outcome {
            Ok(Ok(reply)) => {
                let reply = reply.trim();
                if reply.is_empty() {
                    warn!("Model returned an empty reply for {}", chapter);
                    Answer {
                        text: None,
                        elapsed_secs,
                    }
                } else {
                    debug!("Answered question on {} in {:.2}s", chapter, elapsed_secs);
                    Answer {
                        text: Some(reply.to_string()),
                        elapsed_secs,
                    }
                }
            }
            Ok(Err(e)) => {
                error!("Model call for {} failed: {:#}", chapter, e);
                Answer {
                    text: None,
                    elapsed_secs,
                }
            }
            Err(e) => {
                error!("Model call for {} aborted: {}", chapter, e);
                Answer::absent()
            }
        }
    }

    /// Like [`Tutor::answer`], but reports a missing answer as
    /// [`TutorError::Generation`].
    pub async fn ask(&self, chapter: &str, question: &str) -> Result<AnswerResult, TutorError> {
        let answer = self.answer(chapter, question).await;
        match answer.text {
            Some(response) => Ok(AnswerResult {
                chapter: chapter.to_string(),
                question: question.to_string(),
                response,
                time_taken: answer.elapsed_secs,
            }),
            None => Err(TutorError::Generation {
                chapter: chapter.to_string(),
            }),
        }
    }
}
