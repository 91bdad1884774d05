use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, warn};

use exam_core::model::{QuestionCategory, QuestionSet, QuestionSetError, SchemeId};

use crate::error::LoadError;
use crate::portal::QuestionBank;

/// Fetches a scheme's units and their theory questions as one ordered set.
#[derive(Clone)]
pub struct QuestionSetLoader {
    bank: Arc<dyn QuestionBank>,
}

impl QuestionSetLoader {
    #[must_use]
    pub fn new(bank: Arc<dyn QuestionBank>) -> Self {
        Self { bank }
    }

    /// Load every unit and its theory questions.
    ///
    /// Question lists are fetched concurrently and merged back in unit order,
    /// so the result is deterministic. Any failure aborts the whole load.
    ///
    /// # Errors
    ///
    /// Returns `LoadError` if a fetch fails or the scheme has no units or no
    /// questions.
    pub async fn load(&self, scheme: &SchemeId) -> Result<QuestionSet, LoadError> {
        let units = self
            .bank
            .units_for_scheme(scheme)
            .await
            .map_err(LoadError::Units)?;
        if units.is_empty() {
            warn!(%scheme, "scheme has no units");
            return Err(QuestionSetError::NoUnits.into());
        }

        let fetches = units.iter().map(|unit| async move {
            self.bank
                .questions_for_unit(&unit.id, QuestionCategory::Theory)
                .await
                .map_err(|source| LoadError::Questions {
                    unit: unit.id.clone(),
                    source,
                })
        });
        let per_unit = try_join_all(fetches).await?;

        let set = QuestionSet::from_parts(units, per_unit)?;
        debug!(
            %scheme,
            units = set.details().len(),
            questions = set.len(),
            total_seconds = set.total_duration_seconds(),
            "question set loaded"
        );
        Ok(set)
    }
}
