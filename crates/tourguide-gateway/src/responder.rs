//! Answer generation.
//!
//! The gateway does not care where answers come from; handlers only see the
//! [`Responder`] trait. [`GuideResponder`] is a canned implementation backed
//! by a small attraction catalog, enough to exercise both response modes.

use async_trait::async_trait;
use tourguide_core::AgeGroup;

use crate::error::ApiError;

/// A question as the responder sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuideQuery {
    /// Trimmed user message.
    pub message: String,
    /// Answer language code.
    pub language: String,
    /// Audience.
    pub age_group: AgeGroup,
    /// Conversation handle.
    pub session_id: String,
    /// 1-based position of this question in the conversation.
    pub turn: u32,
}

/// An answer with its citations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuideAnswer {
    /// Display text.
    pub text: String,
    /// Citation names, possibly empty.
    pub sources: Vec<String>,
}

/// Produces answers for chat questions.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Answer one question.
    ///
    /// # Errors
    ///
    /// Returns an `ApiError` if no answer can be produced; the handler passes it
    /// through unchanged.
    async fn respond(&self, query: &GuideQuery) -> Result<GuideAnswer, ApiError>;
}

// =============================================================================
// Guide Responder
// =============================================================================

struct Attraction {
    keywords: &'static [&'static str],
    answer_ko: &'static str,
    answer_en: &'static str,
    sources: &'static [&'static str],
}

const CATALOG: &[Attraction] = &[
    Attraction {
        keywords: &["경복궁", "gyeongbokgung"],
        answer_ko: "경복궁은 09:00부터 18:00까지 관람할 수 있으며 화요일은 휴궁입니다.",
        answer_en: "Gyeongbokgung is open 09:00 to 18:00 and closed on Tuesdays.",
        sources: &["Cultural Heritage Administration", "Visit Seoul"],
    },
    Attraction {
        keywords: &["남산", "namsan", "n seoul tower"],
        answer_ko: "N서울타워 전망대는 매일 10:00부터 23:00까지 운영합니다.",
        answer_en: "The N Seoul Tower observatory is open daily from 10:00 to 23:00.",
        sources: &["Visit Seoul"],
    },
    Attraction {
        keywords: &["제주", "jeju", "한라산", "hallasan"],
        answer_ko: "한라산 탐방은 사전 예약이 필요하며 성판악 코스는 왕복 약 9시간이 걸립니다.",
        answer_en: "Hallasan trails need a reservation; the Seongpanak route takes about nine hours return.",
        sources: &["Hallasan National Park", "Visit Jeju"],
    },
];

const UNKNOWN_KO: &str = "아직 그 장소에 대한 정보가 없어요. 다른 관광지를 물어봐 주세요.";
const UNKNOWN_EN: &str = "I don't have information on that place yet. Try asking about another attraction.";

/// Canned, audience-aware responder.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuideResponder;

impl GuideResponder {
    /// Create a new responder.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn compose(query: &GuideQuery) -> GuideAnswer {
        let english = query.language.eq_ignore_ascii_case("en");
        let message = query.message.to_lowercase();

        let Some(attraction) = CATALOG
            .iter()
            .find(|a| a.keywords.iter().any(|k| message.contains(k)))
        else {
            let text = if english { UNKNOWN_EN } else { UNKNOWN_KO };
            return GuideAnswer {
                text: text.to_string(),
                sources: Vec::new(),
            };
        };

        let mut text = if english {
            attraction.answer_en.to_string()
        } else {
            attraction.answer_ko.to_string()
        };
        if query.age_group == AgeGroup::Child {
            text.push_str(if english {
                " Ask a grown-up to check the times with you!"
            } else {
                " 어른과 함께 시간을 꼭 확인해요!"
            });
        }

        GuideAnswer {
            text,
            sources: attraction.sources.iter().map(ToString::to_string).collect(),
        }
    }
}

#[async_trait]
impl Responder for GuideResponder {
    async fn respond(&self, query: &GuideQuery) -> Result<GuideAnswer, ApiError> {
        let answer = Self::compose(query);
        tracing::debug!(
            session = %query.session_id,
            turn = query.turn,
            sources = answer.sources.len(),
            "Composed answer"
        );
        Ok(answer)
    }
}
