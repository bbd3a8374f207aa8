use std::sync::Arc;

use crate::config::Config;

use self::presentation::PresentationControl;
use self::question_provider::QuestionProvider;
use self::score_store::ScoreStore;

/// Shared collaborators handed to each session engine: configuration plus
/// the external seams for questions, score persistence, and presentation
/// mode.
#[derive(Clone)]
pub struct EngineContext {
    pub config: Config,
    pub questions: Arc<dyn QuestionProvider>,
    pub scores: Arc<dyn ScoreStore>,
    pub presentation: Arc<dyn PresentationControl>,
}

impl EngineContext {
    pub fn new(
        config: Config,
        questions: Arc<dyn QuestionProvider>,
        scores: Arc<dyn ScoreStore>,
        presentation: Arc<dyn PresentationControl>,
    ) -> Self {
        Self {
            config,
            questions,
            scores,
            presentation,
        }
    }
}

pub mod answer_service;
pub mod checkpoint_service;
pub mod presentation;
pub mod proctor_service;
pub mod question_provider;
pub mod score_store;
pub mod session_service;
pub mod timer_service;
