mod answers;
mod exam_state;
mod ids;
mod phase;
mod question_set;
mod schedule;
mod unit;

pub use answers::AnswerMap;
pub use exam_state::{EXAM_STATE_VERSION, ExamState, ExamStateError, ExamStateKey};
pub use ids::{CandidateId, ParseIdError, QuestionId, SchemeId, UnitId};
pub use phase::SessionPhase;
pub use question_set::{
    ExamSummary, LOW_TIME_THRESHOLD_SECONDS, QuestionSet, QuestionSetError, format_clock,
};
pub use schedule::{EligibilityRecord, ScheduleError, ScheduleInfo, parse_schedule_date};
pub use unit::{DEFAULT_THEORY_MINUTES, Question, QuestionCategory, Unit, UnitDetail};
