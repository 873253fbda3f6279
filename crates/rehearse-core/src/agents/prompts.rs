//! Prompt construction for the interviewer and coach agents.
//!
//! Prompts are plain strings assembled from the session config and a
//! bounded window of conversation history. The coach summary prompt asks
//! for strict JSON matching [`FinalSummary`].
//!
//! [`FinalSummary`]: rehearse_types::summary::FinalSummary

use rehearse_types::session::SessionConfig;
use rehearse_types::turn::{ConversationTurn, TurnRole};

/// Max history entries included in a prompt window.
const HISTORY_WINDOW: usize = 10;
/// Max characters per history entry in a prompt window.
const HISTORY_ENTRY_LEN: usize = 400;

const NOT_PROVIDED: &str = "Not provided";

/// Marker an interviewer reply may lead with to signal a follow-up probe
/// rather than a new question.
pub const FOLLOW_UP_MARKER: &str = "FOLLOW_UP:";

/// System prompt for the interviewer persona.
pub fn interviewer_system(config: &SessionConfig) -> String {
    let company = config.company_name.as_deref().unwrap_or("the company");
    format!(
        "You are a {style} interviewer conducting a {difficulty}-difficulty mock \
         interview for the role of {role} at {company}. Ask one question at a \
         time. Keep questions realistic for the role and difficulty. Never \
         evaluate answers; that is another agent's job.",
        style = config.style,
        difficulty = config.difficulty,
        role = config.job_role,
    )
}

/// Prompt for the opening interviewer turn.
pub fn interviewer_introduction(config: &SessionConfig) -> String {
    format!(
        "Open the interview: briefly introduce yourself as the interviewer for \
         the {role} position, set expectations for the session, and ask the \
         candidate to tell you about themselves and their background.\n\n\
         Candidate resume:\n{resume}\n\nJob description:\n{jd}",
        role = config.job_role,
        resume = config.resume_content.as_deref().unwrap_or(NOT_PROVIDED),
        jd = config.job_description.as_deref().unwrap_or(NOT_PROVIDED),
    )
}

/// Prompt for the next interviewer question given the conversation so far.
///
/// `time_context` describes remaining time (time-based sessions) or
/// remaining question budget (count-based sessions).
pub fn interviewer_next_question(
    config: &SessionConfig,
    history: &[ConversationTurn],
    time_context: &str,
) -> String {
    format!(
        "Conversation so far:\n{history}\n\n{time_context}\n\n\
         Produce the next interviewer turn. If the candidate's last answer \
         deserves a deeper probe, lead your reply with the literal marker \
         `{marker}` followed by the follow-up question; otherwise ask the \
         next new question.\n\n\
         Candidate resume:\n{resume}\n\nJob description:\n{jd}",
        history = format_history(history, HISTORY_WINDOW, HISTORY_ENTRY_LEN),
        marker = FOLLOW_UP_MARKER,
        resume = config.resume_content.as_deref().unwrap_or(NOT_PROVIDED),
        jd = config.job_description.as_deref().unwrap_or(NOT_PROVIDED),
    )
}

/// System prompt for the coach persona.
pub fn coach_system() -> String {
    "You are an expert interview coach. You give candid, encouraging, and \
     specific feedback grounded in what the candidate actually said."
        .to_string()
}

/// Prompt evaluating one question/answer pair.
pub fn coach_evaluate(
    resume: Option<&str>,
    job_description: Option<&str>,
    history: &[ConversationTurn],
    question: &str,
    answer: &str,
) -> String {
    format!(
        "Candidate resume:\n{resume}\n\nJob description:\n{jd}\n\n\
         Conversation history (context only; focus on the current \
         exchange):\n{history}\n\n\
         Question asked:\n{question}\n\nCandidate's answer:\n{answer}\n\n\
         Give conversational coaching feedback on this answer as one flowing \
         paragraph: overall impression, one or two things done well, one or \
         two concrete improvements. Plain text only, no lists, no JSON.",
        resume = resume.unwrap_or(NOT_PROVIDED),
        jd = job_description.unwrap_or(NOT_PROVIDED),
        history = format_history(history, HISTORY_WINDOW, 200),
    )
}

/// Prompt for the terminal coaching summary. Requests strict JSON.
pub fn coach_final_summary(
    resume: Option<&str>,
    job_description: Option<&str>,
    history: &[ConversationTurn],
) -> String {
    format!(
        "Candidate resume:\n{resume}\n\nJob description:\n{jd}\n\n\
         Full interview transcript:\n{history}\n\n\
         Write the final coaching summary for this session. Return ONLY a \
         well-formed JSON object with these keys:\n\
         \"patterns_tendencies\": observed patterns across answers,\n\
         \"strengths\": key strengths with examples,\n\
         \"weaknesses\": the most significant areas for development,\n\
         \"improvement_focus_areas\": the top 2-3 areas to focus future \
         preparation on,\n\
         \"resource_search_topics\": a list of 2-3 specific web-search \
         phrases derived from the weaknesses.",
        resume = resume.unwrap_or(NOT_PROVIDED),
        jd = job_description.unwrap_or(NOT_PROVIDED),
        history = format_history(history, usize::MAX, HISTORY_ENTRY_LEN),
    )
}

/// Render a bounded window of history as `role: text` lines.
pub fn format_history(history: &[ConversationTurn], max_entries: usize, max_len: usize) -> String {
    let skip = history.len().saturating_sub(max_entries);
    history
        .iter()
        .skip(skip)
        .filter(|turn| turn.role != TurnRole::System)
        .map(|turn| {
            let label = match turn.agent {
                Some(agent) => format!("{} ({agent})", turn.role),
                None => turn.role.to_string(),
            };
            let text = turn.content.as_text();
            let text: String = if text.chars().count() > max_len {
                text.chars().take(max_len).collect::<String>() + "…"
            } else {
                text.to_string()
            };
            format!("{label}: {text}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rehearse_types::turn::ResponseType;

    fn history() -> Vec<ConversationTurn> {
        let now = Utc::now();
        vec![
            ConversationTurn::interviewer("Tell me about yourself.", ResponseType::Introduction, now),
            ConversationTurn::user("I build backends.", now),
        ]
    }

    #[test]
    fn test_system_prompt_mentions_config() {
        let config = SessionConfig {
            job_role: "Staff Engineer".to_string(),
            company_name: Some("Acme".to_string()),
            ..SessionConfig::default()
        };
        let prompt = interviewer_system(&config);
        assert!(prompt.contains("Staff Engineer"));
        assert!(prompt.contains("Acme"));
        assert!(prompt.contains("formal"));
        assert!(prompt.contains("medium"));
    }

    #[test]
    fn test_format_history_window_and_truncation() {
        let now = Utc::now();
        let mut long_history = Vec::new();
        for i in 0..20 {
            long_history.push(ConversationTurn::user(format!("answer {i}"), now));
        }
        let rendered = format_history(&long_history, 5, 400);
        assert!(!rendered.contains("answer 14"));
        assert!(rendered.contains("answer 15"));
        assert!(rendered.contains("answer 19"));

        let big = vec![ConversationTurn::user("x".repeat(1000), now)];
        let rendered = format_history(&big, 10, 100);
        assert!(rendered.chars().count() < 120);
        assert!(rendered.ends_with('…'));
    }

    #[test]
    fn test_final_summary_prompt_lists_keys() {
        let prompt = coach_final_summary(None, None, &history());
        for key in [
            "patterns_tendencies",
            "strengths",
            "weaknesses",
            "improvement_focus_areas",
            "resource_search_topics",
        ] {
            assert!(prompt.contains(key), "missing key {key}");
        }
        assert!(prompt.contains("Not provided"));
    }

    #[test]
    fn test_next_question_prompt_includes_marker() {
        let prompt = interviewer_next_question(&SessionConfig::default(), &history(), "5 minutes left");
        assert!(prompt.contains(FOLLOW_UP_MARKER));
        assert!(prompt.contains("5 minutes left"));
        assert!(prompt.contains("I build backends."));
    }
}
