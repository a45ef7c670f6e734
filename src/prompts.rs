//! Instruction prompts for audio-ready summarization.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing the summary style (e.g. a new
//!    structural rule or a different register) requires editing exactly one
//!    place.
//!
//! 2. **Testability** — unit tests can inspect the assembled prompt
//!    directly without spinning up a real LLM, so prompt regressions are
//!    easy to catch.

/// Instruction template for turning paper text into a spoken summary.
///
/// Placeholders: `{minutes}`, `{words}`, `{content}`. Use
/// [`build_summary_prompt`] to fill them in — the template is public only
/// so tests and documentation can show what is sent.
pub const SUMMARY_PROMPT_TEMPLATE: &str = r#"You are an expert scientific communicator tasked with creating audio-ready summaries of research papers.

TASK: Create a {minutes}-minute spoken summary (approximately {words} words) of the following scientific paper.

REQUIREMENTS:
1. AUDIO-FIRST DESIGN
   - Write for listening, not reading
   - Use clear, conversational language
   - Avoid complex jargon without explanation

2. STRUCTURE FOR AUDIO
   - Start with a compelling hook about the research significance
   - Provide clear spoken transitions ("Now, let's look at the methodology...")
   - End with practical implications and future directions

3. SCIENTIFIC ACCURACY
   - Preserve key technical details and findings
   - Explain methodology in accessible terms
   - Include specific numbers and results where they matter

4. TARGET LENGTH: approximately {words} words (within 50 words either way)

PAPER CONTENT:
{content}

OUTPUT FORMAT:
Provide only the summary text, ready for text-to-speech conversion. No headers, bullet points, or formatting - just flowing, natural speech."#;

/// Assemble the summarization prompt for the given content and target.
///
/// The word budget is `duration × rate`, rounded down to whole words; the
/// duration is rendered in whole minutes (minimum 1) because the template
/// speaks to the model in minutes.
pub fn build_summary_prompt(content: &str, target_duration_secs: u64, words_per_minute: u32) -> String {
    let minutes = (target_duration_secs / 60).max(1);
    let words = (target_duration_secs as usize * words_per_minute as usize) / 60;

    SUMMARY_PROMPT_TEMPLATE
        .replace("{minutes}", &minutes.to_string())
        .replace("{words}", &words.to_string())
        .replace("{content}", content)
}
