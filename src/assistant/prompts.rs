// src/assistant/prompts.rs
//! Prompt templates for the query pipeline.

/// Style/system template for the final generation call.
pub const ANALYST_PROMPT: &str = r#"You are a quantitative financial analyst assistant.
When market context data is provided, structure your answer as a short report:

**1. Technicals:**
- Price, trend and RSI from the context data.

**2. Sentiment:**
- Synthesize the news snippets. If the user asked about a specific event,
  focus on that. If no news is available, state "No relevant news data available".

**3. Verdict:**
- A logical conclusion that answers the user's specific question directly.

Without context data, answer conversationally and note that live data was
not available when the question needed it."#;

/// Stage 1 instruction: structured ticker/intent extraction.
pub fn extraction_prompt(user_query: &str) -> String {
    format!(
        r#"Analyze this user query: "{user_query}"

Task: Extract the stock ticker symbol if a company is mentioned.

Output format (JSON only):
{{"ticker": "AAPL" or null, "intent": "analysis" or "chat"}}"#
    )
}

/// Stage 3 final prompt assembly.
pub fn final_prompt(now: &str, context_block: &str, user_query: &str) -> String {
    format!(
        "Current Date: {now}\n\n{ANALYST_PROMPT}\n\nCONTEXT DATA:\n{context_block}\n\nUSER QUERY: {user_query}"
    )
}
