use crate::StateType;
use crate::identity::{AuthSession, current_user};
use crate::known_errors::KnownErrors;
use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::routing::post;
use axum_login::login_required;
use serde::{Deserialize, Serialize};

pub fn router() -> Router<crate::StateType> {
    Router::new()
        .route("/summary", post(generate))
        .route_layer(login_required!(crate::BackendType))
}

/// The three supported backlog read times, in minutes. Anything else is a
/// form validation error.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(into = "u8")]
pub enum ReadTime {
    One,
    Three,
    Five,
}

impl ReadTime {
    pub fn minutes(self) -> u8 {
        match self {
            ReadTime::One => 1,
            ReadTime::Three => 3,
            ReadTime::Five => 5,
        }
    }
}

impl From<ReadTime> for u8 {
    fn from(value: ReadTime) -> u8 {
        value.minutes()
    }
}

impl TryFrom<u8> for ReadTime {
    type Error = KnownErrors;

    fn try_from(value: u8) -> Result<Self, KnownErrors> {
        match value {
            1 => Ok(ReadTime::One),
            3 => Ok(ReadTime::Three),
            5 => Ok(ReadTime::Five),
            _ => Err(KnownErrors::InvalidInput),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SummaryFormat {
    Text,
    /// The audio rendition is mocked and returns the same text.
    Audio,
}

const ONE_MINUTE: &str = "Quick 1-minute overview: Climate change is affecting global food security through reduced crop yields and disrupted supply chains. Quantum computing is making significant breakthroughs that could revolutionize data processing capabilities. Companies are adopting hybrid work models as a permanent solution post-pandemic. Recent studies show spending just 20 minutes in nature daily significantly improves mental health outcomes.";

const THREE_MINUTE: &str = "3-minute summary: Climate change impacts on global food security are accelerating, with crop yields in tropical regions declining by up to 15% in the past decade. Heat stress, unpredictable rainfall patterns, and extreme weather events are disrupting food production worldwide.\n\nIn quantum computing, researchers have achieved stable qubits at room temperature for the first time, potentially removing one of the biggest barriers to practical quantum computers. This breakthrough could lead to exponential processing power increases within five years.\n\nThe remote work landscape has permanently shifted, with 85% of companies planning to maintain some form of hybrid work indefinitely. Productivity has remained stable or improved for 70% of knowledge workers in distributed teams.\n\nNew mental health research demonstrates that even brief nature exposure—as little as 20 minutes daily—provides measurable reductions in cortisol levels and improvements in cognitive function, particularly for urban residents with limited green space access.";

const FIVE_MINUTE: &str = "5-minute detailed summary: Climate change is now considered the single greatest threat to global food security in the coming decades. Recent research has documented crop yield reductions of 5-15% across major staple foods including wheat, rice, and corn, primarily in equatorial regions. Disrupted weather patterns, including more frequent droughts and floods, are affecting seasonal planting schedules and harvest yields. Additionally, changing temperatures are expanding the range of crop pests and diseases into previously unaffected regions. Food distribution systems are also vulnerable, with extreme weather events disrupting transportation networks and cold chains.\n\nIn quantum computing, the achievement of room-temperature quantum coherence represents a paradigm shift in the field. Previous quantum computing systems required cooling to near absolute zero, requiring massive infrastructure and energy costs. The new approach uses specially engineered diamond lattice structures to maintain qubit stability at standard conditions, potentially making quantum computing commercially viable for industries including pharmaceuticals, logistics, and cryptography. Experts project this could lead to practical quantum advantage within 3-5 years, decades ahead of previous estimates.\n\nThe future of work has been permanently altered by pandemic-accelerated changes, with hybrid models becoming standard across most knowledge industries. Research indicates that 85% of companies have implemented permanent flexible work policies, with productivity metrics showing stability or improvement in 70% of cases. However, challenges remain around collaboration equity between remote and in-office workers, mentoring of junior staff, and maintaining company culture. Leading organizations are reimagining office spaces as collaboration hubs rather than daily work locations, investing heavily in digital infrastructure and asynchronous communication tools.\n\nA comprehensive five-year longitudinal study on nature exposure and mental health has delivered compelling evidence of physiological and psychological benefits from regular nature contact. The research documents dose-dependent reductions in cortisol (18-25%) and blood pressure (5-8%), along with improvements in attention, working memory, and creative problem-solving from just 20-30 minutes of daily nature exposure. Urban planning experts are now calling for integration of these findings into city design, healthcare practices, and workplace wellness programs. The evidence suggests that nature exposure could provide a cost-effective complementary approach to addressing rising rates of anxiety and depression worldwide.";

/// The whole "summarization engine": a lookup table keyed by read time.
pub fn summary_text(read_time: ReadTime) -> &'static str {
    match read_time {
        ReadTime::One => ONE_MINUTE,
        ReadTime::Three => THREE_MINUTE,
        ReadTime::Five => FIVE_MINUTE,
    }
}

#[derive(Deserialize)]
pub struct SummaryForm {
    read_time: u8,
    format: SummaryFormat,
}

#[derive(Serialize)]
pub struct SummaryResponse {
    pub read_time: ReadTime,
    pub format: SummaryFormat,
    pub summary: &'static str,
}

async fn generate(
    State(state): State<StateType>,
    auth_session: AuthSession,
    Json(form): Json<SummaryForm>,
) -> Result<Json<SummaryResponse>, KnownErrors> {
    let user = current_user(&auth_session)?;
    let read_time = ReadTime::try_from(form.read_time)?;

    // nothing to summarize without saved articles
    if state.list_articles(&user.id).await?.is_empty() {
        return Err(KnownErrors::EmptyBacklog);
    }

    Ok(Json(SummaryResponse {
        read_time,
        format: form.format,
        summary: summary_text(read_time),
    }))
}

#[cfg(test)]
mod test_summary {
    use super::*;

    #[test]
    fn test_each_read_time_has_its_text() {
        assert!(summary_text(ReadTime::One).starts_with("Quick 1-minute overview"));
        assert!(summary_text(ReadTime::Three).starts_with("3-minute summary"));
        assert!(summary_text(ReadTime::Five).starts_with("5-minute detailed summary"));
    }

    #[test]
    fn test_only_the_three_read_times_parse() {
        assert_eq!(ReadTime::try_from(1), Ok(ReadTime::One));
        assert_eq!(ReadTime::try_from(3), Ok(ReadTime::Three));
        assert_eq!(ReadTime::try_from(5), Ok(ReadTime::Five));

        for invalid in [0u8, 2, 4, 6, 10] {
            assert_eq!(ReadTime::try_from(invalid), Err(KnownErrors::InvalidInput));
        }
    }

    #[test]
    fn test_read_time_serializes_as_minutes() {
        let json = serde_json::to_string(&ReadTime::Three).expect("read time should serialize");
        assert_eq!(json, "3");
    }
}
